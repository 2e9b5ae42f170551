//! Domain module containing the vault, device, and pairing session types.

pub mod device;
pub mod session;
pub mod vault;

pub use device::DeviceDescriptor;
pub use session::{PairingSession, SyncRole, TransferState};
pub use vault::SecretSet;
