//! Pairing session state.
//!
//! A pairing session is the bounded interaction from PIN generation (sender)
//! or PIN entry (receiver) through transfer completion or failure. The PIN is
//! generated fresh for each session and never persisted; trust between the
//! two instances only exists for the lifetime of the session.
//!
//! The transfer side of a session progresses through [`TransferState`]:
//!
//! ```text
//! Listening ──► Connected ──► AwaitingPin ──► Transferring ──► Done
//!                                  │
//!                                  └────────► Rejected ──────► Closed
//! ```

/// Which side of a sync exchange this instance plays.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncRole {
    /// Generates the PIN, announces itself, and serves the secret set.
    Sender,
    /// Scans for devices, submits the PIN, and receives the secret set.
    Receiver,
}

/// State of the transfer connection within a pairing session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferState {
    /// Socket bound; waiting for the peer to connect.
    Listening,
    /// A peer connected; no PIN received yet.
    Connected,
    /// Waiting for the PIN submission frame.
    AwaitingPin,
    /// PIN verified; payload write in progress.
    Transferring,
    /// Payload fully written; the session succeeded.
    Done,
    /// PIN mismatch; the connection was closed without any payload bytes.
    Rejected,
    /// Connection closed after a rejection or timeout.
    Closed,
}

impl TransferState {
    /// Returns `true` for states from which no further transition occurs.
    pub fn is_terminal(&self) -> bool {
        matches!(self, TransferState::Done | TransferState::Closed)
    }
}

/// A single pairing session, created when a sync operation starts and
/// discarded when it terminates.
#[derive(Debug, Clone)]
pub struct PairingSession {
    /// This instance's role for the session.
    pub role: SyncRole,
    /// The 6-digit numeric PIN authorizing the transfer.
    pub pin: String,
    /// Current transfer state.
    pub state: TransferState,
}

impl PairingSession {
    /// Creates a sender-side session around a freshly generated PIN.
    pub fn sender(pin: String) -> Self {
        Self {
            role: SyncRole::Sender,
            pin,
            state: TransferState::Listening,
        }
    }

    /// Creates a receiver-side session around the operator-entered PIN.
    pub fn receiver(pin: String) -> Self {
        Self {
            role: SyncRole::Receiver,
            pin,
            state: TransferState::Listening,
        }
    }

    /// Records a state transition.
    pub fn advance(&mut self, next: TransferState) {
        self.state = next;
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sender_session_starts_listening() {
        let session = PairingSession::sender("482913".to_string());
        assert_eq!(session.role, SyncRole::Sender);
        assert_eq!(session.state, TransferState::Listening);
        assert_eq!(session.pin, "482913");
    }

    #[test]
    fn test_advance_updates_state() {
        let mut session = PairingSession::receiver("000000".to_string());
        session.advance(TransferState::Connected);
        session.advance(TransferState::AwaitingPin);
        assert_eq!(session.state, TransferState::AwaitingPin);
    }

    #[test]
    fn test_terminal_states() {
        assert!(TransferState::Done.is_terminal());
        assert!(TransferState::Closed.is_terminal());
        assert!(!TransferState::Rejected.is_terminal());
        assert!(!TransferState::Listening.is_terminal());
    }
}
