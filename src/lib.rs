//! Bookstore application library
//!
//! Hosts the catalog and proxy modules and the process lifecycle that runs
//! them behind the HTTP server.

pub mod app;
pub mod modules;

/// Re-export commonly used types
pub use modules::*;
