//! Persistence for the secret vault and the application configuration.

pub mod config;
pub mod vault_store;

pub use config::{load_config, save_config, AppConfig, ConfigError, DeviceConfig, SyncConfig};
pub use vault_store::{StoreError, VaultStore};
