//! # otpauth-core
//!
//! Shared library for otpauth containing the domain types, the LAN sync
//! protocol codec, and the TOTP code generator.
//!
//! This crate is used by the `otpauth` CLI binary. It has zero dependencies
//! on sockets, the file system, or terminal I/O, so every type here is
//! testable without network or disk access.
//!
//! # Architecture overview
//!
//! otpauth is a TOTP credential manager whose instances can exchange their
//! stored secrets over the local network. Two instances pair ad hoc: the
//! sending side broadcasts its presence over UDP and shows a 6-digit PIN;
//! the receiving side discovers it, submits the PIN over TCP, and receives
//! the full secret set if the PIN matches.
//!
//! This crate defines:
//!
//! - **`domain`** – Pure data types: the [`SecretSet`] mapping of account
//!   name to secret, the [`DeviceDescriptor`] a scanner records about an
//!   announcing peer, and the pairing session state machine.
//!
//! - **`protocol`** – How bytes travel over the network. Messages are
//!   encoded into a compact binary format (8-byte header + payload) and
//!   decoded back into typed Rust structs on the other end.
//!
//! - **`totp`** – RFC 6238 time-based one-time password generation from a
//!   base32-encoded shared secret.

pub mod domain;
pub mod protocol;
pub mod totp;

// Re-export the most-used types at the crate root so callers can write
// `otpauth_core::SecretSet` instead of `otpauth_core::domain::vault::SecretSet`.
pub use domain::device::DeviceDescriptor;
pub use domain::session::{PairingSession, SyncRole, TransferState};
pub use domain::vault::SecretSet;
pub use protocol::codec::{decode_message, encode_message, ProtocolError};
pub use protocol::messages::SyncMessage;
pub use totp::{TotpError, TotpGenerator};
