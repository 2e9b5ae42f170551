//! Transfer client: the receiver role's TCP side.
//!
//! Connects to a discovered device, submits the operator-entered PIN as the
//! first frame, and reads back the secret payload. Every blocking step is
//! individually time-bounded: the connect, the payload header read, and the
//! payload body read.
//!
//! A listener that rejects the PIN closes the connection without writing
//! anything, so the client maps a clean end-of-stream before the payload
//! header into [`TransferError::PinRejected`]. A connection that dies midway
//! through a declared payload is a truncation and maps to
//! [`TransferError::MalformedPayload`] instead, never to an empty success.

use std::time::Duration;

use otpauth_core::protocol::codec::{decode_payload, encode_message, parse_header};
use otpauth_core::protocol::messages::{PinSubmitMessage, SyncMessage, HEADER_SIZE};
use otpauth_core::{DeviceDescriptor, ProtocolError, SecretSet};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time;
use tracing::{debug, info};

use super::TransferError;

/// Connects to `descriptor`'s transfer port, submits `pin`, and reads the
/// full secret payload.
///
/// # Errors
///
/// - [`TransferError::ConnectionFailed`] when the TCP connect fails or times
///   out.
/// - [`TransferError::PinRejected`] when the remote closes without sending a
///   payload.
/// - [`TransferError::MalformedPayload`] when the payload frame is invalid
///   or truncated.
/// - [`TransferError::ReadTimedOut`] when the payload does not arrive within
///   `read_timeout`.
pub async fn fetch(
    descriptor: &DeviceDescriptor,
    pin: &str,
    connect_timeout: Duration,
    read_timeout: Duration,
) -> Result<SecretSet, TransferError> {
    let addr = descriptor.transfer_addr();

    let mut stream = match time::timeout(connect_timeout, TcpStream::connect(addr)).await {
        Ok(Ok(stream)) => stream,
        Ok(Err(source)) => return Err(TransferError::ConnectionFailed { addr, source }),
        Err(_elapsed) => {
            return Err(TransferError::ConnectionFailed {
                addr,
                source: std::io::Error::new(std::io::ErrorKind::TimedOut, "connect timed out"),
            })
        }
    };
    debug!("connected to {descriptor}");

    let submit = encode_message(&SyncMessage::PinSubmit(PinSubmitMessage {
        pin: pin.to_string(),
    }))?;
    stream.write_all(&submit).await?;

    // ── Payload header ────────────────────────────────────────────────────────
    let mut header_buf = [0u8; HEADER_SIZE];
    match time::timeout(read_timeout, stream.read_exact(&mut header_buf)).await {
        Ok(Ok(_)) => {}
        // End-of-stream before any payload: the listener rejected the PIN.
        Ok(Err(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
            info!("remote closed without payload; PIN rejected");
            return Err(TransferError::PinRejected);
        }
        Ok(Err(e)) => return Err(TransferError::Io(e)),
        Err(_elapsed) => return Err(TransferError::ReadTimedOut),
    }
    let header = parse_header(&header_buf)?;

    // ── Payload body ──────────────────────────────────────────────────────────
    let mut payload = vec![0u8; header.payload_len];
    match time::timeout(read_timeout, stream.read_exact(&mut payload)).await {
        Ok(Ok(_)) => {}
        // End-of-stream inside a declared payload is a truncated frame.
        Ok(Err(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
            return Err(TransferError::MalformedPayload(
                ProtocolError::PayloadLengthMismatch {
                    declared: header.payload_len,
                    available: 0,
                },
            ));
        }
        Ok(Err(e)) => return Err(TransferError::Io(e)),
        Err(_elapsed) => return Err(TransferError::ReadTimedOut),
    }

    match decode_payload(header.message_type, &payload)? {
        SyncMessage::SecretPayload(m) => {
            let secrets = m.into_secret_set();
            info!("received {} entries from {descriptor}", secrets.len());
            Ok(secrets)
        }
        other => Err(TransferError::UnexpectedMessage(other.message_type())),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::IpAddr;

    fn descriptor(port: u16) -> DeviceDescriptor {
        DeviceDescriptor {
            address: IpAddr::from([127, 0, 0, 1]),
            name: "test-device".to_string(),
            port,
        }
    }

    #[tokio::test]
    async fn test_fetch_fails_fast_when_nothing_listens() {
        // Reserve a port and leave it closed, so connect is refused.
        let probe = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = probe.local_addr().unwrap().port();
        drop(probe);

        let result = fetch(
            &descriptor(port),
            "482913",
            Duration::from_secs(2),
            Duration::from_secs(2),
        )
        .await;

        assert!(
            matches!(result, Err(TransferError::ConnectionFailed { .. })),
            "got: {result:?}"
        );
    }

    #[tokio::test]
    async fn test_fetch_maps_immediate_close_to_pin_rejected() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        // A listener that accepts, reads the PIN frame, and closes without
        // writing anything, mimicking the real listener's rejection path.
        tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 64];
            let _ = stream.read(&mut buf).await;
            drop(stream);
        });

        let result = fetch(
            &descriptor(port),
            "000000",
            Duration::from_secs(2),
            Duration::from_secs(2),
        )
        .await;

        assert!(matches!(result, Err(TransferError::PinRejected)), "got: {result:?}");
    }

    #[tokio::test]
    async fn test_fetch_maps_truncated_payload_to_malformed() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        // Write a valid header declaring a payload, then close mid-payload.
        tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 64];
            let _ = stream.read(&mut buf).await;

            let full = encode_message(&SyncMessage::SecretPayload(
                otpauth_core::protocol::messages::SecretPayloadMessage {
                    entries: vec![("github".to_string(), "JBSWY3DPEHPK3PXP".to_string())],
                },
            ))
            .unwrap();
            stream.write_all(&full[..HEADER_SIZE + 3]).await.unwrap();
            drop(stream);
        });

        let result = fetch(
            &descriptor(port),
            "482913",
            Duration::from_secs(2),
            Duration::from_secs(2),
        )
        .await;

        assert!(
            matches!(result, Err(TransferError::MalformedPayload(_))),
            "got: {result:?}"
        );
    }

    #[tokio::test]
    async fn test_fetch_times_out_on_silent_listener() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        // Accept and then say nothing, keeping the connection open.
        let guard = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            tokio::time::sleep(Duration::from_secs(10)).await;
            drop(stream);
        });

        let result = fetch(
            &descriptor(port),
            "482913",
            Duration::from_secs(2),
            Duration::from_millis(300),
        )
        .await;

        assert!(matches!(result, Err(TransferError::ReadTimedOut)), "got: {result:?}");
        guard.abort();
    }
}
