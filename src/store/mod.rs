mod errors;
pub mod models;
pub mod repository;

pub use errors::StoreError;
pub use models::{KeySnapshot, Value, WriteOp};
pub use repository::{InMemoryKeyValueStore, KeyValueStore};
