//! Receiver-side pairing orchestration.
//!
//! The receiver role is sequential: scan for announcing devices, let the
//! operator pick one and enter the PIN, fetch the payload, and hand the
//! received set to the vault store for merging. Merge policy (overwrite on
//! name collision) belongs to the store, not to this layer or the protocol.

use std::time::Duration;

use otpauth_core::{DeviceDescriptor, PairingSession, TransferState};
use thiserror::Error;
use tracing::debug;

use crate::infrastructure::network::{fetch, scan_for_devices, DiscoveryError, TransferError};
use crate::infrastructure::storage::{StoreError, SyncConfig, VaultStore};

/// Error type for the receive use case.
#[derive(Debug, Error)]
pub enum ReceiveError {
    /// The transfer itself failed (connection, PIN rejection, bad payload).
    #[error(transparent)]
    Transfer(#[from] TransferError),

    /// The received set could not be merged into the vault.
    #[error("failed to merge received secrets: {0}")]
    Store(#[from] StoreError),
}

/// Scans for announcing devices for the configured window.
///
/// The scan is blocking socket I/O, so it runs on a dedicated blocking
/// thread. An empty list means no device announced itself, which the caller
/// reports as "no devices found" without attempting any connection.
///
/// # Errors
///
/// Returns [`DiscoveryError`] when the discovery socket cannot be bound.
pub async fn discover(config: &SyncConfig) -> Result<Vec<DeviceDescriptor>, DiscoveryError> {
    let window = Duration::from_secs(config.scan_window_secs);
    let discovery_port = config.discovery_port;
    let max_devices = config.max_devices;

    tokio::task::spawn_blocking(move || scan_for_devices(window, discovery_port, max_devices))
        .await
        .expect("scan task must not panic")
}

/// Fetches the secret set from `descriptor` using `pin` and merges it into
/// the vault. Returns the number of entries merged.
///
/// # Errors
///
/// Returns [`ReceiveError::Transfer`] for protocol failures (including
/// [`TransferError::PinRejected`]) and [`ReceiveError::Store`] when the
/// vault cannot be updated. On any error the vault is left unchanged.
pub async fn receive_from(
    store: &VaultStore,
    descriptor: &DeviceDescriptor,
    pin: &str,
    config: &SyncConfig,
) -> Result<usize, ReceiveError> {
    let mut session = PairingSession::receiver(pin.to_string());

    let result = fetch(
        descriptor,
        pin,
        Duration::from_secs(config.connect_timeout_secs),
        Duration::from_secs(config.read_timeout_secs),
    )
    .await;

    let secrets = match result {
        Ok(secrets) => secrets,
        Err(e) => {
            session.advance(TransferState::Closed);
            debug!(role = ?session.role, state = ?session.state, "receiver session failed");
            return Err(e.into());
        }
    };

    session.advance(TransferState::Done);
    debug!(
        role = ?session.role,
        state = ?session.state,
        "receiver session fetched {} entries",
        secrets.len()
    );

    Ok(store.merge(secrets)?)
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::UdpSocket;

    #[tokio::test]
    async fn test_discover_with_no_announcers_returns_empty() {
        // Arrange: a free discovery port with nobody broadcasting.
        let probe = UdpSocket::bind("127.0.0.1:0").unwrap();
        let port = probe.local_addr().unwrap().port();
        drop(probe);

        let mut config = SyncConfig::default();
        config.discovery_port = port;
        config.scan_window_secs = 1;

        // Act
        let devices = discover(&config).await.expect("scan must succeed");

        // Assert
        assert!(devices.is_empty(), "silence must yield an empty device list");
    }
}
