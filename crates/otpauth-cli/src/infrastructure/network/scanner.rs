//! UDP discovery scanner for the receiver role.
//!
//! Listens on the discovery port for `Announce` broadcasts and accumulates
//! distinct devices until either the window elapses or enough devices have
//! been found. The receive loop uses a short socket read timeout re-checked
//! against an overall deadline, so the scan can never block past its window
//! no matter how many (or how few) packets arrive.
//!
//! Deduplication is by `(source address, transfer port)`; a device that
//! re-announces with a different display name stays a single entry under its
//! first-seen name. Malformed datagrams are discarded without terminating
//! the scan.

use std::net::{Ipv4Addr, SocketAddr, UdpSocket};
use std::time::{Duration, Instant};

use otpauth_core::{decode_message, DeviceDescriptor, SyncMessage};
use tracing::{debug, info, warn};

use super::DiscoveryError;

/// Upper bound on a discovery datagram; announcements are far smaller.
const MAX_DATAGRAM_LEN: usize = 2048;

/// Slice granularity for the socket read timeout.
const READ_SLICE: Duration = Duration::from_millis(200);

/// Collects announcing devices for at most `window`, returning them in
/// first-seen order.
///
/// Returns early once `max_devices` distinct devices have been seen. An
/// empty list is a valid outcome, not an error: it means no device announced
/// itself during the window.
///
/// This call blocks the current thread for up to `window`; async callers run
/// it via `spawn_blocking`.
///
/// # Errors
///
/// Returns [`DiscoveryError::BindFailed`] if the discovery port cannot be
/// bound (typically because another scan or sender instance holds it), or
/// [`DiscoveryError::Socket`] if the socket cannot be configured.
pub fn scan_for_devices(
    window: Duration,
    discovery_port: u16,
    max_devices: usize,
) -> Result<Vec<DeviceDescriptor>, DiscoveryError> {
    let addr: SocketAddr = (Ipv4Addr::UNSPECIFIED, discovery_port).into();
    let socket =
        UdpSocket::bind(addr).map_err(|source| DiscoveryError::BindFailed { addr, source })?;

    let deadline = Instant::now() + window;
    let mut devices: Vec<DeviceDescriptor> = Vec::new();
    let mut buf = [0u8; MAX_DATAGRAM_LEN];

    debug!("scanning for devices on UDP {addr} for {window:?}");

    while devices.len() < max_devices {
        let now = Instant::now();
        if now >= deadline {
            break;
        }
        // Never sleep in recv_from past the overall deadline.
        let slice = READ_SLICE.min(deadline - now);
        socket.set_read_timeout(Some(slice))?;

        let (len, src) = match socket.recv_from(&mut buf) {
            Ok(pair) => pair,
            Err(e) if is_timeout_error(&e) => continue,
            Err(e) => {
                warn!("discovery recv error: {e}");
                continue;
            }
        };

        let announce = match decode_message(&buf[..len]) {
            Ok((SyncMessage::Announce(msg), _)) => msg,
            Ok((other, _)) => {
                debug!(
                    "unexpected message on discovery port from {src}: {:?}",
                    other.message_type()
                );
                continue;
            }
            Err(e) => {
                debug!("discarding malformed datagram from {src}: {e}");
                continue;
            }
        };

        let descriptor = DeviceDescriptor {
            address: src.ip(),
            name: announce.device_name,
            port: announce.transfer_port,
        };

        // Identity is (address, port); re-announcements keep the first-seen
        // entry and its name.
        if !devices.contains(&descriptor) {
            info!("discovered {descriptor}");
            devices.push(descriptor);
        }
    }

    debug!("scan finished with {} device(s)", devices.len());
    Ok(devices)
}

/// Returns `true` for OS timeout / would-block errors that end a read slice.
fn is_timeout_error(e: &std::io::Error) -> bool {
    matches!(
        e.kind(),
        std::io::ErrorKind::WouldBlock | std::io::ErrorKind::TimedOut
    )
}

// ── Tests ─────────────────────────────────────────────────────────────────────
