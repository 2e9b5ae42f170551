//! UDP broadcast announcer for the sender role.
//!
//! While the transfer listener waits for a connection, the announcer
//! repeatedly broadcasts an `Announce` frame (transfer port + display name)
//! so that a scanning receiver can find this instance without knowing its
//! address. The loop runs as a blocking task on a dedicated thread to avoid
//! blocking the Tokio runtime with synchronous socket I/O, and stops on its
//! own once the configured duration elapses.
//!
//! # Lifecycle
//!
//! The thread's lifetime is tied to the transfer listener's session: the
//! caller clears the shared `running` flag as soon as the listener returns,
//! and the loop observes the flag within one sleep slice (50 ms). Discovery
//! is best-effort; a send failure is logged and the loop keeps going,
//! because a peer that already knows this machine's address can still
//! connect over TCP.

use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4, UdpSocket};
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::thread;
use std::time::{Duration, Instant};

use otpauth_core::encode_message;
use otpauth_core::protocol::messages::{
    AnnounceMessage, SyncMessage, DEFAULT_DISCOVERY_PORT, DEFAULT_TRANSFER_PORT,
};
use tracing::{debug, error, warn};

use super::DiscoveryError;

/// Granularity at which the loop re-checks the stop flag while sleeping.
const STOP_POLL_SLICE: Duration = Duration::from_millis(50);

/// Parameters for one announce window.
#[derive(Debug, Clone)]
pub struct AnnouncerConfig {
    /// UDP port announcements are sent to.
    pub discovery_port: u16,
    /// TCP port advertised in the announcement.
    pub transfer_port: u16,
    /// Display name advertised in the announcement.
    pub device_name: String,
    /// Delay between broadcasts.
    pub interval: Duration,
    /// Total time to keep broadcasting before the loop stops on its own.
    pub duration: Duration,
    /// Destination address for broadcasts. The limited broadcast address in
    /// production; tests point this at 127.0.0.1.
    pub broadcast_addr: Ipv4Addr,
}

impl Default for AnnouncerConfig {
    fn default() -> Self {
        Self {
            discovery_port: DEFAULT_DISCOVERY_PORT,
            transfer_port: DEFAULT_TRANSFER_PORT,
            device_name: "otpauth".to_string(),
            interval: Duration::from_secs(1),
            duration: Duration::from_secs(10),
            broadcast_addr: Ipv4Addr::BROADCAST,
        }
    }
}

/// Binds a UDP socket and spawns a background thread that broadcasts the
/// announcement once per `config.interval` until `config.duration` elapses
/// or `running` is cleared, whichever comes first.
///
/// Returns the thread's join handle so the caller can wait for a clean stop.
///
/// # Errors
///
/// Returns [`DiscoveryError::BindFailed`] if the socket cannot be bound, or
/// [`DiscoveryError::Socket`] if it cannot be put into broadcast mode.
pub fn start_announcer(
    config: AnnouncerConfig,
    running: Arc<AtomicBool>,
) -> Result<thread::JoinHandle<()>, DiscoveryError> {
    // Bind to an OS-assigned source port; only the destination port matters.
    let addr: SocketAddr = (Ipv4Addr::UNSPECIFIED, 0).into();
    let socket =
        UdpSocket::bind(addr).map_err(|source| DiscoveryError::BindFailed { addr, source })?;
    socket.set_broadcast(true)?;

    let handle = thread::Builder::new()
        .name("otpauth-announce".to_string())
        .spawn(move || {
            announce_loop(socket, config, running);
        })
        .expect("failed to spawn announcer thread");

    Ok(handle)
}

/// The broadcast loop executed on the announcer thread.
fn announce_loop(socket: UdpSocket, config: AnnouncerConfig, running: Arc<AtomicBool>) {
    let dest = SocketAddrV4::new(config.broadcast_addr, config.discovery_port);
    let deadline = Instant::now() + config.duration;

    let frame = match encode_message(&SyncMessage::Announce(AnnounceMessage {
        transfer_port: config.transfer_port,
        device_name: config.device_name.clone(),
    })) {
        Ok(bytes) => bytes,
        Err(e) => {
            error!("failed to encode announcement: {e}");
            return;
        }
    };

    debug!(
        "announcing '{}' (transfer port {}) to {dest} every {:?} for {:?}",
        config.device_name, config.transfer_port, config.interval, config.duration
    );

    while running.load(Ordering::Relaxed) && Instant::now() < deadline {
        if let Err(e) = socket.send_to(&frame, dest) {
            // Best-effort: losing the announce channel is non-fatal as long
            // as the TCP listener stays reachable by other means.
            warn!("announce broadcast failed: {e}");
        }

        // Sleep in short slices so a stop signal is honored promptly.
        let tick_end = Instant::now() + config.interval;
        while running.load(Ordering::Relaxed) && Instant::now() < tick_end.min(deadline) {
            thread::sleep(STOP_POLL_SLICE);
        }
    }

    debug!("announcer stopped");
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_uses_reference_ports_and_timing() {
        let cfg = AnnouncerConfig::default();
        assert_eq!(cfg.discovery_port, DEFAULT_DISCOVERY_PORT);
        assert_eq!(cfg.transfer_port, DEFAULT_TRANSFER_PORT);
        assert_eq!(cfg.interval, Duration::from_secs(1));
        assert_eq!(cfg.duration, Duration::from_secs(10));
        assert_eq!(cfg.broadcast_addr, Ipv4Addr::BROADCAST);
    }

    #[test]
    fn test_start_announcer_binds_and_stops_on_flag() {
        // Arrange: a stopped flag makes the loop exit on its first check.
        let running = Arc::new(AtomicBool::new(false));
        let config = AnnouncerConfig {
            broadcast_addr: Ipv4Addr::LOCALHOST,
            ..Default::default()
        };

        // Act
        let handle = start_announcer(config, running).expect("announcer must bind");

        // Assert: the thread terminates promptly instead of running out the
        // full 10-second duration.
        handle.join().expect("announcer thread must not panic");
    }

    #[test]
    fn test_announcer_stops_after_duration() {
        let running = Arc::new(AtomicBool::new(true));
        let config = AnnouncerConfig {
            broadcast_addr: Ipv4Addr::LOCALHOST,
            interval: Duration::from_millis(20),
            duration: Duration::from_millis(100),
            ..Default::default()
        };

        let started = Instant::now();
        let handle = start_announcer(config, running).expect("announcer must bind");
        handle.join().expect("announcer thread must not panic");

        let elapsed = started.elapsed();
        assert!(
            elapsed < Duration::from_secs(2),
            "announcer must stop on its own after its duration, took {elapsed:?}"
        );
    }
}
