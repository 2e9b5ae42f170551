//! Infrastructure services: network discovery and transfer, plus the vault
//! and configuration stores.

pub mod network;
pub mod storage;
