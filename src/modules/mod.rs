pub mod authors;
pub mod books;

use bookstore_db::Database;
use bookstore_kernel::ModuleRegistry;
use serde::Serialize;

/// Register all domain modules with the registry.
/// Authors come first: books reference them.
pub fn register_all(registry: &mut ModuleRegistry, db: &Database) {
    registry.register(authors::create_module(db.clone()));
    registry.register(books::create_module(db.clone()));
}

/// Body returned by delete endpoints
#[derive(Debug, Clone, Serialize)]
pub struct Acknowledgement {
    pub message: &'static str,
}

impl Acknowledgement {
    pub fn new(message: &'static str) -> Self {
        Self { message }
    }
}
