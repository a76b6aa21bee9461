pub mod models;
pub mod openapi;
pub mod routes;
pub mod store;

use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;
use axum::Router;
use bookstore_kernel::{InitCtx, Module};

use models::CreateBook;
use store::BookCatalog;

/// Books module serving the catalog from the in-process store
pub struct BooksModule {
    catalog: Arc<BookCatalog>,
}

impl BooksModule {
    pub fn new(catalog: Arc<BookCatalog>) -> Self {
        Self { catalog }
    }

    pub fn catalog(&self) -> &Arc<BookCatalog> {
        &self.catalog
    }
}

/// Read a JSON array of create requests.
async fn load_seed(path: &Path) -> anyhow::Result<Vec<CreateBook>> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("failed to read seed file {}", path.display()))?;
    serde_json::from_str(&raw)
        .with_context(|| format!("failed to parse seed file {}", path.display()))
}

#[async_trait]
impl Module for BooksModule {
    fn name(&self) -> &'static str {
        "books"
    }

    async fn init(&self, ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        if let Some(seed_path) = &ctx.settings.catalog.seed_path {
            let books = load_seed(seed_path).await?;
            let total = self.catalog.seed(books).await?;
            tracing::info!(
                module = self.name(),
                seed = %seed_path.display(),
                total,
                "catalog seeded"
            );
        }

        tracing::info!(
            module = self.name(),
            environment = ?ctx.settings.environment,
            "books module initialized"
        );
        Ok(())
    }

    fn routes(&self) -> Router {
        routes::router(self.catalog.clone())
    }

    fn openapi(&self) -> Option<serde_json::Value> {
        Some(openapi::fragment())
    }
}

/// Create a new instance of the books module with an empty catalog
pub fn create_module() -> Arc<dyn Module> {
    Arc::new(BooksModule::new(Arc::new(BookCatalog::new())))
}
