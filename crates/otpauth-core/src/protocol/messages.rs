//! All otpauth sync protocol message types.
//!
//! The same framed record travels over both channels: UDP broadcast datagrams
//! for discovery, and the TCP transfer connection for the PIN submission and
//! the secret payload. A payload frame is always self-describing; the reader
//! knows its length from the header before interpreting a single payload
//! byte, and never infers end-of-message from connection close.

use serde::{Deserialize, Serialize};

use crate::domain::vault::SecretSet;

// ── Protocol constants ────────────────────────────────────────────────────────

/// Current protocol version byte.
pub const PROTOCOL_VERSION: u8 = 0x01;

/// Total size of the frame header in bytes.
pub const HEADER_SIZE: usize = 8;

/// Upper bound on any frame payload. A vault of secrets is tiny; anything
/// larger than this on the wire is garbage or abuse.
pub const MAX_FRAME_LEN: usize = 64 * 1024;

/// Upper bound on the PIN submission payload. The PIN is a 6-digit string;
/// the listener must never buffer an unbounded first frame.
pub const MAX_PIN_FRAME_LEN: usize = 64;

/// UDP port announcements are broadcast to.
pub const DEFAULT_DISCOVERY_PORT: u16 = 9998;

/// Default TCP port for the transfer listener.
pub const DEFAULT_TRANSFER_PORT: u16 = 9999;

// ── Message type codes ────────────────────────────────────────────────────────

/// All message type codes in the sync protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum MessageType {
    /// UDP broadcast advertising a sender's transfer port and display name.
    Announce = 0x01,
    /// First TCP frame, receiver to sender: the PIN submission.
    PinSubmit = 0x02,
    /// Second TCP frame, sender to receiver: the full secret set.
    SecretPayload = 0x03,
}

impl TryFrom<u8> for MessageType {
    type Error = ();

    fn try_from(value: u8) -> Result<Self, ()> {
        match value {
            0x01 => Ok(MessageType::Announce),
            0x02 => Ok(MessageType::PinSubmit),
            0x03 => Ok(MessageType::SecretPayload),
            _ => Err(()),
        }
    }
}

// ── Per-message payload structs ───────────────────────────────────────────────

/// ANNOUNCE (0x01): broadcast by the sender so peers can find it.
///
/// The announcement is ephemeral; it is re-sent on every broadcast tick for
/// the duration of the announce window. The receiving scanner pairs the
/// advertised transfer port with the datagram's source address to build a
/// [`crate::DeviceDescriptor`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnnounceMessage {
    /// TCP port the announcing instance's transfer listener is bound to.
    pub transfer_port: u16,
    /// Human-readable name shown in the receiver's device list.
    pub device_name: String,
}

/// PIN_SUBMIT (0x02): the receiver's one PIN attempt for this connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PinSubmitMessage {
    /// The operator-entered digit string.
    pub pin: String,
}

/// SECRET_PAYLOAD (0x03): the full secret set, written only after the PIN
/// submission matched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecretPayloadMessage {
    /// `(name, secret)` pairs in name order.
    pub entries: Vec<(String, String)>,
}

impl SecretPayloadMessage {
    /// Builds a payload message from a secret set.
    pub fn from_secret_set(secrets: &SecretSet) -> Self {
        Self {
            entries: secrets
                .iter()
                .map(|(name, secret)| (name.to_string(), secret.to_string()))
                .collect(),
        }
    }

    /// Consumes the message into a fresh secret set.
    pub fn into_secret_set(self) -> SecretSet {
        self.entries.into_iter().collect()
    }
}

// ── Top-level message enum ────────────────────────────────────────────────────

/// All valid sync messages, discriminated by type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SyncMessage {
    Announce(AnnounceMessage),
    PinSubmit(PinSubmitMessage),
    SecretPayload(SecretPayloadMessage),
}

impl SyncMessage {
    /// Returns the [`MessageType`] discriminant for this message.
    pub fn message_type(&self) -> MessageType {
        match self {
            SyncMessage::Announce(_) => MessageType::Announce,
            SyncMessage::PinSubmit(_) => MessageType::PinSubmit,
            SyncMessage::SecretPayload(_) => MessageType::SecretPayload,
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
