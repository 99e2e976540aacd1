//! The DICOM message service element: command sets, status
//! classification, message fragmentation and reassembly, and
//! query/retrieve primitives.
//!
//! DIMSE messages travel through an established association as
//! pairs of a command set (always Implicit VR Little Endian) and
//! an optional data set (in the negotiated transfer syntax),
//! fragmented into presentation data values.

pub mod command;
pub mod message;
pub mod query;
pub mod service;
pub mod status;

pub use command::{CommandField, CommandSet, Priority, SubOperations};
pub use message::{fragment_message, Message, PendingRequests, Reassembler};
pub use query::{InformationModel, MatchingKind, QueryRetrieveLevel};
pub use service::{QueryHandler, RetrieveSource, ServiceError, StorageSink};
pub use status::StatusClass;
