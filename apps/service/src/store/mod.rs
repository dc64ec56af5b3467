//! Record persistence contract and its implementations.
//!
//! Records are loose JSON values keyed by `(collection, id)`. Validation is the
//! caller's job; the store only moves bytes.

mod file;
mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

use async_trait::async_trait;
use rand::Rng;
use serde_json::Value;
use thiserror::Error;

/// Collection holding check records
pub const CHECKS: &str = "checks";

const ID_ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Record {collection}/{id} not found")]
    NotFound { collection: String, id: String },

    #[error("Record {collection}/{id} already exists")]
    AlreadyExists { collection: String, id: String },

    #[error("Storage I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Record could not be (de)serialized: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Create/read/update/delete/list over keyed JSON records
#[async_trait]
pub trait Store: Send + Sync {
    /// Insert a new record, failing if the id is taken
    async fn create(&self, collection: &str, id: &str, record: &Value) -> Result<(), StoreError>;

    async fn read(&self, collection: &str, id: &str) -> Result<Value, StoreError>;

    /// Replace an existing record, failing if it does not exist
    async fn update(&self, collection: &str, id: &str, record: &Value) -> Result<(), StoreError>;

    async fn delete(&self, collection: &str, id: &str) -> Result<(), StoreError>;

    /// Ids of every record in the collection, in no particular order
    async fn list(&self, collection: &str) -> Result<Vec<String>, StoreError>;
}

/// Random lowercase alphanumeric id of `len` characters
pub fn random_id(len: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..len)
        .map(|_| char::from(ID_ALPHABET[rng.gen_range(0..ID_ALPHABET.len())]))
        .collect()
}
