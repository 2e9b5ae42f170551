//! Transfer listener: the sender role's TCP side.
//!
//! Serves exactly one connection per invocation, gated by the session PIN:
//!
//! ```text
//! Listening ──► Connected ──► AwaitingPin ──► Transferring ──► Done
//!     │                            │
//!     │ (accept timeout)           └────► Rejected ──► Closed
//!     ▼
//!  TimedOut
//! ```
//!
//! The PIN check always precedes the payload write: not a single payload
//! byte reaches the wire before a matching PIN submission has been read and
//! verified. A mismatch closes the connection immediately, with no second
//! attempt on the same connection; retrying requires a whole new session
//! with a fresh PIN, which bounds guessing to one attempt per broadcast
//! window.

use std::net::{Ipv4Addr, SocketAddr};
use std::time::Duration;

use otpauth_core::protocol::codec::{decode_payload, encode_message, parse_header};
use otpauth_core::protocol::messages::{
    SecretPayloadMessage, SyncMessage, HEADER_SIZE, MAX_PIN_FRAME_LEN,
};
use otpauth_core::{ProtocolError, SecretSet, TransferState};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::time;
use tracing::{debug, info};

use super::TransferError;

/// How long the listener waits for the PIN frame once a peer has connected.
const PIN_READ_TIMEOUT: Duration = Duration::from_secs(30);

/// Result of one [`serve`] invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServeOutcome {
    /// The PIN matched and the full payload was written; carries the number
    /// of entries sent. `Sent(0)` is a successful transfer of an empty
    /// vault, distinct from `Rejected`.
    Sent(usize),
    /// The submitted PIN did not match; the connection was closed without
    /// writing any payload bytes.
    Rejected,
    /// No peer connected within the accept timeout.
    TimedOut,
}

/// Binds `listen_port`, accepts one connection, verifies the submitted PIN,
/// and on a match writes the serialized `secrets` to the peer.
///
/// # Errors
///
/// Returns [`TransferError::BindFailed`] when the port cannot be bound,
/// [`TransferError::ReadTimedOut`] when a connected peer never submits a
/// PIN, and [`TransferError::MalformedPayload`] /
/// [`TransferError::UnexpectedMessage`] when the first frame is not a valid
/// PIN submission.
pub async fn serve(
    pin: &str,
    secrets: &SecretSet,
    listen_port: u16,
    accept_timeout: Duration,
) -> Result<ServeOutcome, TransferError> {
    let addr: SocketAddr = (Ipv4Addr::UNSPECIFIED, listen_port).into();
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|source| TransferError::BindFailed { addr, source })?;

    let mut state = TransferState::Listening;
    debug!(state = ?state, "transfer listener bound on {addr}");

    let (mut stream, peer) = match time::timeout(accept_timeout, listener.accept()).await {
        Ok(Ok(pair)) => pair,
        Ok(Err(e)) => return Err(TransferError::Io(e)),
        Err(_elapsed) => {
            info!("no receiver connected within {accept_timeout:?}");
            return Ok(ServeOutcome::TimedOut);
        }
    };

    state = TransferState::Connected;
    info!(state = ?state, "receiver connected from {}", peer.ip());

    state = TransferState::AwaitingPin;
    debug!(state = ?state, "waiting for PIN submission");
    let submitted = read_pin_frame(&mut stream).await?;

    // Exact full-string match; a prefix of the PIN must not pass.
    if submitted != pin {
        state = TransferState::Rejected;
        info!(state = ?state, "PIN mismatch; closing without payload");
        drop(stream);
        return Ok(ServeOutcome::Rejected);
    }

    state = TransferState::Transferring;
    debug!(state = ?state, "PIN verified; sending {} entries", secrets.len());

    let payload = encode_message(&SyncMessage::SecretPayload(
        SecretPayloadMessage::from_secret_set(secrets),
    ))?;
    stream.write_all(&payload).await?;
    stream.shutdown().await?;

    state = TransferState::Done;
    info!(state = ?state, "sent {} entries to {}", secrets.len(), peer.ip());
    Ok(ServeOutcome::Sent(secrets.len()))
}

/// Reads the single length-bounded PIN submission frame.
async fn read_pin_frame(stream: &mut TcpStream) -> Result<String, TransferError> {
    let mut header_buf = [0u8; HEADER_SIZE];
    match time::timeout(PIN_READ_TIMEOUT, stream.read_exact(&mut header_buf)).await {
        Ok(Ok(_)) => {}
        Ok(Err(e)) => return Err(TransferError::Io(e)),
        Err(_elapsed) => return Err(TransferError::ReadTimedOut),
    }

    let header = parse_header(&header_buf)?;
    if header.payload_len > MAX_PIN_FRAME_LEN {
        return Err(TransferError::MalformedPayload(
            ProtocolError::OversizedPayload {
                declared: header.payload_len,
                limit: MAX_PIN_FRAME_LEN,
            },
        ));
    }

    let mut payload = vec![0u8; header.payload_len];
    match time::timeout(PIN_READ_TIMEOUT, stream.read_exact(&mut payload)).await {
        Ok(Ok(_)) => {}
        Ok(Err(e)) => return Err(TransferError::Io(e)),
        Err(_elapsed) => return Err(TransferError::ReadTimedOut),
    }

    match decode_payload(header.message_type, &payload)? {
        SyncMessage::PinSubmit(m) => Ok(m.pin),
        other => Err(TransferError::UnexpectedMessage(other.message_type())),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
