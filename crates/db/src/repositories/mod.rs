//! Backends for the expiring key/value contract in `switchboard_core::kv`.

pub mod kv;
pub mod memory;

pub use kv::SqlKvStore;
pub use memory::InMemoryKvStore;

use switchboard_core::KvError;

fn unavailable(error: sqlx::Error) -> KvError {
    KvError::Unavailable(error.to_string())
}
