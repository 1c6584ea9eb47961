pub mod kv_store;
pub use kv_store::{FileStore, KeyValueStore, MemoryStore};
pub mod session_store;
pub use session_store::SessionStore;
