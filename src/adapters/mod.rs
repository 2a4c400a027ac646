// Adapters layer: concrete implementations for external systems (sales database, dataset files).

pub mod sqlite;
pub mod storage;

pub use sqlite::SqliteSalesSource;
pub use storage::LocalStorage;
