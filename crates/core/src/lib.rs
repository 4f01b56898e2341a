pub mod config;
pub mod kv;

pub use config::{AppConfig, ConfigError, ConfigOverrides, CorrelationBackend, LoadOptions};
pub use kv::{ExpiringKvStore, KvError};
