//! Network infrastructure for the sync protocol.
//!
//! Two channels, each owned exclusively by one component for a session:
//!
//! - **Discovery (UDP)**: the [`announcer`] broadcasts the sender's presence;
//!   the [`scanner`] collects announcements into a device list. Both run as
//!   blocking socket loops on dedicated threads so their I/O never stalls
//!   the async runtime.
//! - **Transfer (TCP)**: the [`listener`] serves exactly one PIN-gated
//!   connection; the [`transfer_client`] submits the PIN and reads the
//!   payload. Both are async with every blocking step individually
//!   time-bounded.

pub mod announcer;
pub mod listener;
pub mod scanner;
pub mod transfer_client;

pub use announcer::{start_announcer, AnnouncerConfig};
pub use listener::{serve, ServeOutcome};
pub use scanner::scan_for_devices;
pub use transfer_client::fetch;

use std::net::SocketAddr;

use otpauth_core::protocol::messages::MessageType;
use otpauth_core::ProtocolError;
use thiserror::Error;

/// Error type for UDP discovery operations.
#[derive(Debug, Error)]
pub enum DiscoveryError {
    /// The UDP socket could not be bound.
    #[error("failed to bind discovery socket on {addr}: {source}")]
    BindFailed {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    /// An I/O error occurred while configuring or using the socket.
    #[error("discovery socket error: {0}")]
    Socket(#[from] std::io::Error),
}

/// Error type for TCP transfer operations.
#[derive(Debug, Error)]
pub enum TransferError {
    /// The TCP listening socket could not be bound.
    #[error("failed to bind transfer listener on {addr}: {source}")]
    BindFailed {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    /// The TCP connection to the chosen device failed.
    #[error("failed to connect to {addr}: {source}")]
    ConnectionFailed {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    /// The remote closed the connection without sending a payload, which is
    /// how the listener signals a PIN mismatch.
    #[error("PIN rejected by the sending device")]
    PinRejected,

    /// A frame on the connection could not be decoded, or was truncated.
    #[error("malformed payload: {0}")]
    MalformedPayload(#[from] ProtocolError),

    /// The remote sent a syntactically valid frame of the wrong type.
    #[error("unexpected {0:?} frame on the transfer connection")]
    UnexpectedMessage(MessageType),

    /// A bounded read did not complete in time.
    #[error("timed out waiting for the remote")]
    ReadTimedOut,

    /// Any other I/O error on the established connection.
    #[error("connection I/O error: {0}")]
    Io(#[from] std::io::Error),
}
