//! Protocol module containing the sync message types and the binary codec.

pub mod codec;
pub mod messages;

pub use codec::{decode_message, decode_payload, encode_message, parse_header, FrameHeader, ProtocolError};
pub use messages::*;
