pub mod books;
pub mod proxy;

use bookstore_kernel::{
    settings::{BackendMode, Settings},
    ModuleRegistry,
};

/// Register the module serving `/api/books` for the configured backend mode
pub fn register_all(registry: &mut ModuleRegistry, settings: &Settings) -> anyhow::Result<()> {
    match settings.backend.mode {
        BackendMode::Store => registry.register(books::create_module()),
        BackendMode::Proxy => registry.register(proxy::create_module(&settings.backend)?),
    }
    Ok(())
}
