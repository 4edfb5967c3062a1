pub mod manager;
pub mod memory;
pub mod models;
pub mod postgres;
pub mod repository;
pub mod store;

pub use manager::DatabaseManager;
pub use memory::MemoryStore;
pub use postgres::PgStore;
pub use repository::{Entity, Repository};
pub use store::{Document, DocumentStore, StoreError, COLLECTIONS, ID_FIELD};
