//! Types and methods for interacting with the DICOM Upper Layer
//! Protocol: PDU encoding and decoding, the association state
//! machine, and client/server association APIs.

pub mod association;
pub mod machine;
pub mod pdu;
pub mod transport;

pub use association::{ClientAssociation, ClientAssociationOptions};
pub use association::{ServerAssociation, ServerAssociationOptions};
pub use machine::{Action, Event, Role, State, StateMachine};
pub use pdu::{read_pdu, write_pdu, Pdu};
pub use transport::Transport;

/// The implementation class UID advertised by this toolkit
/// during association negotiation.
pub const IMPLEMENTATION_CLASS_UID: &str = "2.25.922661943209363517416813422112852730";

/// The implementation version name advertised by this toolkit.
pub const IMPLEMENTATION_VERSION_NAME: &str = "DCMKIT_010";

/// The well-known privileged port of the DICOM Upper Layer.
pub const DEFAULT_PORT: u16 = 104;

/// The commonly used unprivileged port of the DICOM Upper Layer.
pub const COMMON_PORT: u16 = 11112;
