//! Persisted session state.
//!
//! This module provides:
//! - `KeyValueStore`: the injected storage seam, with `MemoryStore` and `FileStore`
//! - `SessionStore`: at most one serialized `Session` under a single key
//!
//! Absence of the key means "no session".

pub mod session;
pub mod storage;

pub use session::{Session, SessionStore, SESSION_KEY};
pub use storage::{FileStore, KeyValueStore, MemoryStore, StoreError};
