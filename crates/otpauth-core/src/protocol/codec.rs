//! Binary codec for encoding and decoding sync protocol frames.
//!
//! Wire format:
//! ```text
//! [version:1][msg_type:1][reserved:2][payload_len:4][payload:N]
//! ```
//! Total header size: 8 bytes. All multi-byte integers are big-endian.
//! Strings are length-prefixed with a 2-byte big-endian length.

use crate::protocol::messages::{
    AnnounceMessage, MessageType, PinSubmitMessage, SecretPayloadMessage, SyncMessage,
    HEADER_SIZE, MAX_FRAME_LEN, PROTOCOL_VERSION,
};
use thiserror::Error;

/// Errors that can occur during frame encoding or decoding.
#[derive(Debug, Error, PartialEq)]
pub enum ProtocolError {
    /// The byte slice is shorter than the minimum required length.
    #[error("insufficient data: need at least {needed} bytes, got {available}")]
    InsufficientData { needed: usize, available: usize },

    /// The message type byte in the header is not a recognized value.
    #[error("unknown message type: 0x{0:02X}")]
    UnknownMessageType(u8),

    /// The protocol version in the header is not supported.
    #[error("unsupported protocol version: {0}")]
    UnsupportedVersion(u8),

    /// The payload could not be parsed (field out of range, UTF-8 error, etc.).
    #[error("malformed payload: {0}")]
    MalformedPayload(String),

    /// The encoded payload length field does not match the data available.
    #[error("payload length mismatch: header says {declared}, available is {available}")]
    PayloadLengthMismatch { declared: usize, available: usize },

    /// The declared payload length exceeds the frame size limit.
    #[error("payload of {declared} bytes exceeds the {limit}-byte frame limit")]
    OversizedPayload { declared: usize, limit: usize },
}

/// Parsed frame header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    /// Protocol version; always [`PROTOCOL_VERSION`].
    pub version: u8,
    /// Identifies the payload type.
    pub message_type: MessageType,
    /// Length of the payload in bytes (not including the header).
    pub payload_len: usize,
}

// ── Public API ────────────────────────────────────────────────────────────────

/// Encodes a [`SyncMessage`] into a byte vector including the 8-byte header.
///
/// # Errors
///
/// Returns [`ProtocolError::OversizedPayload`] when the encoded payload would
/// exceed [`MAX_FRAME_LEN`].
pub fn encode_message(msg: &SyncMessage) -> Result<Vec<u8>, ProtocolError> {
    let payload = encode_payload(msg);
    if payload.len() > MAX_FRAME_LEN {
        return Err(ProtocolError::OversizedPayload {
            declared: payload.len(),
            limit: MAX_FRAME_LEN,
        });
    }

    let mut buf = Vec::with_capacity(HEADER_SIZE + payload.len());

    // Header: version (1) + msg_type (1) + reserved (2) + payload_len (4) = 8 bytes
    buf.push(PROTOCOL_VERSION);
    buf.push(msg.message_type() as u8);
    buf.push(0x00); // reserved
    buf.push(0x00); // reserved
    buf.extend_from_slice(&(payload.len() as u32).to_be_bytes());

    buf.extend_from_slice(&payload);
    Ok(buf)
}

/// Parses and validates the 8-byte header at the beginning of `bytes`.
///
/// Used by stream readers that read the header first, then read exactly
/// `payload_len` more bytes before calling [`decode_payload`].
///
/// # Errors
///
/// Returns [`ProtocolError`] when the header is truncated, the version or
/// message type is unknown, or the declared payload exceeds the frame limit.
pub fn parse_header(bytes: &[u8]) -> Result<FrameHeader, ProtocolError> {
    if bytes.len() < HEADER_SIZE {
        return Err(ProtocolError::InsufficientData {
            needed: HEADER_SIZE,
            available: bytes.len(),
        });
    }

    let version = bytes[0];
    if version != PROTOCOL_VERSION {
        return Err(ProtocolError::UnsupportedVersion(version));
    }

    let msg_type_byte = bytes[1];
    let message_type = MessageType::try_from(msg_type_byte)
        .map_err(|_| ProtocolError::UnknownMessageType(msg_type_byte))?;

    // bytes[2..4] are reserved – ignored on decode

    let payload_len = u32::from_be_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]) as usize;
    if payload_len > MAX_FRAME_LEN {
        return Err(ProtocolError::OversizedPayload {
            declared: payload_len,
            limit: MAX_FRAME_LEN,
        });
    }

    Ok(FrameHeader {
        version,
        message_type,
        payload_len,
    })
}

/// Decodes one [`SyncMessage`] from the beginning of `bytes`.
///
/// Returns the decoded message and the total number of bytes consumed
/// (header + payload), so the caller can advance their read cursor. Used for
/// self-contained buffers such as UDP datagrams.
///
/// # Errors
///
/// Returns [`ProtocolError`] when the bytes are malformed.
pub fn decode_message(bytes: &[u8]) -> Result<(SyncMessage, usize), ProtocolError> {
    let header = parse_header(bytes)?;

    let total_needed = HEADER_SIZE + header.payload_len;
    if bytes.len() < total_needed {
        return Err(ProtocolError::PayloadLengthMismatch {
            declared: header.payload_len,
            available: bytes.len() - HEADER_SIZE,
        });
    }

    let payload = &bytes[HEADER_SIZE..total_needed];
    let msg = decode_payload(header.message_type, payload)?;
    Ok((msg, total_needed))
}

/// Decodes a payload of a known type, as read after [`parse_header`].
///
/// # Errors
///
/// Returns [`ProtocolError::MalformedPayload`] when the payload bytes do not
/// form a valid message of `msg_type`.
pub fn decode_payload(msg_type: MessageType, payload: &[u8]) -> Result<SyncMessage, ProtocolError> {
    match msg_type {
        MessageType::Announce => decode_announce(payload).map(SyncMessage::Announce),
        MessageType::PinSubmit => decode_pin_submit(payload).map(SyncMessage::PinSubmit),
        MessageType::SecretPayload => {
            decode_secret_payload(payload).map(SyncMessage::SecretPayload)
        }
    }
}

// ── Payload encoding ──────────────────────────────────────────────────────────

fn encode_payload(msg: &SyncMessage) -> Vec<u8> {
    let mut buf = Vec::new();
    match msg {
        SyncMessage::Announce(m) => {
            buf.extend_from_slice(&m.transfer_port.to_be_bytes());
            write_length_prefixed_string(&mut buf, &m.device_name);
        }
        SyncMessage::PinSubmit(m) => {
            write_length_prefixed_string(&mut buf, &m.pin);
        }
        SyncMessage::SecretPayload(m) => {
            buf.extend_from_slice(&(m.entries.len() as u32).to_be_bytes());
            for (name, secret) in &m.entries {
                write_length_prefixed_string(&mut buf, name);
                write_length_prefixed_string(&mut buf, secret);
            }
        }
    }
    buf
}

// ── Per-message decode helpers ────────────────────────────────────────────────

fn decode_announce(p: &[u8]) -> Result<AnnounceMessage, ProtocolError> {
    // 2 (port) + 2 (name_len) + name
    require_len(p, 4, "Announce")?;
    let transfer_port = u16::from_be_bytes([p[0], p[1]]);
    let (device_name, _) = read_length_prefixed_string(p, 2)?;
    Ok(AnnounceMessage {
        transfer_port,
        device_name,
    })
}

fn decode_pin_submit(p: &[u8]) -> Result<PinSubmitMessage, ProtocolError> {
    require_len(p, 2, "PinSubmit")?;
    let (pin, _) = read_length_prefixed_string(p, 0)?;
    Ok(PinSubmitMessage { pin })
}

fn decode_secret_payload(p: &[u8]) -> Result<SecretPayloadMessage, ProtocolError> {
    require_len(p, 4, "SecretPayload")?;
    let count = u32::from_be_bytes([p[0], p[1], p[2], p[3]]) as usize;
    let mut entries = Vec::with_capacity(count.min(1024));
    let mut off = 4;
    for _ in 0..count {
        let (name, name_end) = read_length_prefixed_string(p, off)?;
        let (secret, secret_end) = read_length_prefixed_string(p, name_end)?;
        entries.push((name, secret));
        off = secret_end;
    }
    if off != p.len() {
        return Err(ProtocolError::MalformedPayload(format!(
            "SecretPayload: {} trailing bytes after {count} entries",
            p.len() - off
        )));
    }
    Ok(SecretPayloadMessage { entries })
}

// ── Utility helpers ───────────────────────────────────────────────────────────

fn require_len(buf: &[u8], needed: usize, context: &str) -> Result<(), ProtocolError> {
    if buf.len() < needed {
        Err(ProtocolError::MalformedPayload(format!(
            "{context}: need {needed} bytes, got {}",
            buf.len()
        )))
    } else {
        Ok(())
    }
}

/// Writes a 2-byte length prefix followed by the UTF-8 string bytes.
fn write_length_prefixed_string(buf: &mut Vec<u8>, s: &str) {
    let bytes = s.as_bytes();
    let len = bytes.len().min(u16::MAX as usize) as u16;
    buf.extend_from_slice(&len.to_be_bytes());
    buf.extend_from_slice(&bytes[..len as usize]);
}

/// Reads a 2-byte length prefix and then that many UTF-8 bytes.
/// Returns the string and the offset of the byte after the string.
fn read_length_prefixed_string(buf: &[u8], offset: usize) -> Result<(String, usize), ProtocolError> {
    if buf.len() < offset + 2 {
        return Err(ProtocolError::MalformedPayload(format!(
            "need 2 bytes for string length at offset {offset}"
        )));
    }
    let len = u16::from_be_bytes([buf[offset], buf[offset + 1]]) as usize;
    let start = offset + 2;
    if buf.len() < start + len {
        return Err(ProtocolError::MalformedPayload(format!(
            "string of length {len} at offset {start} exceeds buffer"
        )));
    }
    let s = std::str::from_utf8(&buf[start..start + len])
        .map_err(|e| ProtocolError::MalformedPayload(format!("invalid UTF-8: {e}")))?
        .to_string();
    Ok((s, start + len))
}

// ── Tests ─────────────────────────────────────────────────────────────────────
