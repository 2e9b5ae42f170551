//! Sender-side pairing orchestration.
//!
//! The sender role needs two concurrently active operations: the announcer's
//! periodic broadcast loop (background thread) and the transfer listener's
//! blocking accept (foreground, on the async runtime). They share nothing
//! mutable beyond the stop flag; ports and names are copied into the
//! announcer up front.
//!
//! The announcer's lifecycle is tied to the listener's session: it is
//! started right before `serve` and explicitly stopped as soon as `serve`
//! returns, whether the outcome is success, rejection, or timeout. It is not
//! left to run out its own fixed duration.

use std::net::Ipv4Addr;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::Duration;

use otpauth_core::{PairingSession, SecretSet, TransferState};
use rand::Rng;
use tracing::{debug, warn};

use crate::infrastructure::network::{
    serve, start_announcer, AnnouncerConfig, ServeOutcome, TransferError,
};
use crate::infrastructure::storage::SyncConfig;

/// Generates a uniformly random 6-digit PIN, leading zeros included.
pub fn generate_pin() -> String {
    let n: u32 = rand::rng().random_range(0..1_000_000);
    format!("{n:06}")
}

/// Runs one complete sender session: announce in the background, serve one
/// PIN-gated connection in the foreground, then stop announcing.
///
/// Announcement failures are logged and swallowed; discovery is best-effort
/// and a receiver that knows this machine's address can still connect.
///
/// # Errors
///
/// Returns the [`TransferError`] from the listener; announcer errors never
/// abort the session.
pub async fn run_sender(
    config: &SyncConfig,
    device_name: &str,
    secrets: &SecretSet,
    pin: &str,
) -> Result<ServeOutcome, TransferError> {
    let mut session = PairingSession::sender(pin.to_string());

    let running = Arc::new(AtomicBool::new(true));
    let announcer = start_announcer(announcer_config(config, device_name), Arc::clone(&running));
    if let Err(e) = &announcer {
        warn!("announcements unavailable; receivers must connect by address: {e}");
    }

    let outcome = serve(
        pin,
        secrets,
        config.transfer_port,
        Duration::from_secs(config.accept_timeout_secs),
    )
    .await;

    // Stop the announcer now even if its own duration has not elapsed, and
    // wait for the thread off the async runtime.
    running.store(false, Ordering::Relaxed);
    if let Ok(handle) = announcer {
        let _ = tokio::task::spawn_blocking(move || handle.join()).await;
    }

    session.advance(match &outcome {
        Ok(ServeOutcome::Sent(_)) => TransferState::Done,
        Ok(ServeOutcome::Rejected) | Ok(ServeOutcome::TimedOut) | Err(_) => TransferState::Closed,
    });
    debug!(role = ?session.role, state = ?session.state, "sender session finished");

    outcome
}

/// Builds the announcer parameters from the sync config.
///
/// An unparseable broadcast address falls back to the limited broadcast
/// address rather than failing the session, because discovery is
/// best-effort.
fn announcer_config(config: &SyncConfig, device_name: &str) -> AnnouncerConfig {
    let broadcast_addr: Ipv4Addr = match config.broadcast_addr.parse() {
        Ok(addr) => addr,
        Err(_) => {
            warn!(
                "invalid broadcast_addr '{}' in config; using {}",
                config.broadcast_addr,
                Ipv4Addr::BROADCAST
            );
            Ipv4Addr::BROADCAST
        }
    };

    AnnouncerConfig {
        discovery_port: config.discovery_port,
        transfer_port: config.transfer_port,
        device_name: device_name.to_string(),
        interval: Duration::from_secs(config.announce_interval_secs),
        duration: Duration::from_secs(config.announce_duration_secs),
        broadcast_addr,
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_pin_is_six_ascii_digits() {
        for _ in 0..100 {
            let pin = generate_pin();
            assert_eq!(pin.len(), 6, "PIN must be exactly 6 characters");
            assert!(
                pin.chars().all(|c| c.is_ascii_digit()),
                "PIN must contain only digits, got '{pin}'"
            );
        }
    }

    #[test]
    fn test_generate_pin_varies() {
        // Six-digit PINs collide once in a million; 5 identical draws in a
        // row would mean the generator is broken.
        let pins: std::collections::HashSet<String> = (0..5).map(|_| generate_pin()).collect();
        assert!(pins.len() > 1, "PINs must not be constant");
    }

    #[test]
    fn test_announcer_config_carries_sync_settings() {
        let mut sync = SyncConfig::default();
        sync.discovery_port = 4000;
        sync.transfer_port = 4001;
        sync.announce_interval_secs = 2;
        sync.broadcast_addr = "192.168.1.255".to_string();

        let cfg = announcer_config(&sync, "my-laptop");
        assert_eq!(cfg.discovery_port, 4000);
        assert_eq!(cfg.transfer_port, 4001);
        assert_eq!(cfg.interval, Duration::from_secs(2));
        assert_eq!(cfg.device_name, "my-laptop");
        assert_eq!(cfg.broadcast_addr, "192.168.1.255".parse::<Ipv4Addr>().unwrap());
    }

    #[test]
    fn test_announcer_config_falls_back_on_bad_broadcast_addr() {
        let mut sync = SyncConfig::default();
        sync.broadcast_addr = "not-an-address".to_string();

        let cfg = announcer_config(&sync, "x");
        assert_eq!(cfg.broadcast_addr, Ipv4Addr::BROADCAST);
    }
}
