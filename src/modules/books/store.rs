//! The book catalog: CRUD and search over a single in-process table.

use anyhow::Context;
use bookstore_db::{DbError, RowId, Table};
use bookstore_http::error::AppError;
use serde_json::json;
use thiserror::Error;

use super::models::{Book, BookIndex, CreateBook, FieldError, UpdateBook};

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("book validation failed on {} field(s)", .0.len())]
    Validation(Vec<FieldError>),

    #[error("book with ISBN {isbn} already exists")]
    DuplicateIsbn { isbn: String },

    #[error("book not found with id: {0}")]
    NotFound(RowId),

    #[error("book not found with ISBN: {0}")]
    IsbnNotFound(String),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl From<DbError> for CatalogError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::UniqueViolation { value, .. } => CatalogError::DuplicateIsbn { isbn: value },
            DbError::RowNotFound { id, .. } => CatalogError::NotFound(id),
        }
    }
}

impl From<CatalogError> for AppError {
    fn from(err: CatalogError) -> Self {
        let message = err.to_string();
        match err {
            CatalogError::Validation(errors) => AppError::validation(
                errors
                    .iter()
                    .map(|e| json!({"field": e.field, "error": e.error}))
                    .collect(),
                message,
            ),
            CatalogError::DuplicateIsbn { isbn } => {
                AppError::conflict(vec![json!({"field": "isbn", "value": isbn})], message)
            }
            CatalogError::NotFound(_) | CatalogError::IsbnNotFound(_) => {
                AppError::not_found(message)
            }
            CatalogError::Internal(e) => AppError::Internal(e),
        }
    }
}

/// Case-insensitive substring test used by every search filter.
fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

/// Owner of every [`Book`] record.
///
/// Constructed once at startup and shared with request handlers through an
/// `Arc`.
pub struct BookCatalog {
    books: Table<Book>,
}

impl BookCatalog {
    pub fn new() -> Self {
        Self {
            books: Table::new(),
        }
    }

    /// All books in insertion order.
    pub async fn list(&self) -> Vec<Book> {
        self.books.all().await
    }

    pub async fn get_by_id(&self, id: RowId) -> Result<Book, CatalogError> {
        self.books.get(id).await.ok_or(CatalogError::NotFound(id))
    }

    pub async fn get_by_isbn(&self, isbn: &str) -> Result<Book, CatalogError> {
        self.books
            .find_unique(BookIndex::Isbn, isbn)
            .await
            .ok_or_else(|| CatalogError::IsbnNotFound(isbn.to_string()))
    }

    pub async fn search_by_author(&self, author: &str) -> Vec<Book> {
        self.books
            .scan(|book| contains_ignore_case(&book.author, author))
            .await
    }

    pub async fn search_by_title(&self, title: &str) -> Vec<Book> {
        self.books
            .scan(|book| contains_ignore_case(&book.title, title))
            .await
    }

    /// Books without a genre never match.
    pub async fn search_by_genre(&self, genre: &str) -> Vec<Book> {
        self.books
            .scan(|book| {
                book.genre
                    .as_deref()
                    .is_some_and(|g| contains_ignore_case(g, genre))
            })
            .await
    }

    pub async fn create(&self, request: CreateBook) -> Result<Book, CatalogError> {
        let book = request.validate().map_err(CatalogError::Validation)?;
        let book = self.books.insert(book).await?;

        tracing::info!(book_id = book.id, isbn = %book.isbn, "book created");
        Ok(book)
    }

    /// Merge-patch the book with `id`. Only fields present in `patch` change.
    pub async fn update(&self, id: RowId, patch: UpdateBook) -> Result<Book, CatalogError> {
        patch.validate().map_err(CatalogError::Validation)?;
        let book = self.books.update(id, |book| patch.apply(book)).await?;

        tracing::info!(book_id = book.id, "book updated");
        Ok(book)
    }

    pub async fn delete(&self, id: RowId) -> Result<Book, CatalogError> {
        let book = self.books.delete(id).await?;

        tracing::info!(book_id = book.id, isbn = %book.isbn, "book deleted");
        Ok(book)
    }

    pub async fn count(&self) -> usize {
        self.books.count().await
    }

    /// Create every entry in order, stopping at the first failure.
    pub async fn seed(&self, books: Vec<CreateBook>) -> anyhow::Result<usize> {
        for (position, request) in books.into_iter().enumerate() {
            let label = request.isbn.clone().unwrap_or_else(|| "<no isbn>".to_string());
            self.create(request)
                .await
                .with_context(|| format!("seed entry {} ({}) rejected", position, label))?;
        }
        Ok(self.count().await)
    }
}

impl Default for BookCatalog {
    fn default() -> Self {
        Self::new()
    }
}
