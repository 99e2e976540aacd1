//! Establishing and driving DICOM associations over TCP/IP.
//!
//! [`ClientAssociationOptions`] negotiates an association as the
//! requesting node; [`ServerAssociationOptions`] accepts one as
//! the listening node. Both produce an association value which
//! owns the transport, the state machine and the ARTIM timer.

use snafu::{Backtrace, Snafu};
use std::time::Duration;

use crate::machine::State;
use crate::pdu::{AbortSource, AssociationRjResult, AssociationRjSource};

pub mod client;
pub mod pdata;
pub mod server;

pub use client::{ClientAssociation, ClientAssociationOptions};
pub use pdata::{PDataReader, PDataWriter};
pub use server::{
    AcceptAny, AcceptCalledAeTitle, AccessControl, ServerAssociation, ServerAssociationOptions,
};

/// Which configured limit a timeout belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimeoutClass {
    /// Establishing the transport connection.
    Connect,
    /// Waiting for a remote association or release response (ARTIM).
    Association,
    /// Waiting for a response to a DIMSE request.
    Request,
}

/// An error while negotiating or driving an association.
#[derive(Debug, Snafu)]
#[non_exhaustive]
pub enum Error {
    /// missing abstract syntax to begin negotiation
    MissingAbstractSyntax { backtrace: Backtrace },

    #[snafu(display("application entity title `{}` is invalid", title))]
    InvalidAeTitle { title: String, backtrace: Backtrace },

    /// could not connect to the peer node
    ConnectFailed {
        source: std::io::Error,
        backtrace: Backtrace,
    },

    /// could not configure the transport socket
    ConfigureSocket {
        source: std::io::Error,
        backtrace: Backtrace,
    },

    /// failed to send a PDU
    SendPdu {
        #[snafu(backtrace)]
        source: crate::pdu::writer::Error,
    },

    /// failed to receive a PDU
    ReceivePdu {
        #[snafu(backtrace)]
        source: crate::pdu::reader::Error,
    },

    /// the transport connection was closed by the peer
    ConnectionClosed { backtrace: Backtrace },

    #[snafu(display("the {:?} limit was exceeded", class))]
    Timeout {
        class: TimeoutClass,
        backtrace: Backtrace,
    },

    /// the association request was rejected by the peer
    #[snafu(display("association rejected ({:?}, {:?})", result, source_info))]
    Rejected {
        result: AssociationRjResult,
        source_info: AssociationRjSource,
        backtrace: Backtrace,
    },

    /// the peer aborted the association
    #[snafu(display("association aborted by the peer ({:?})", source_info))]
    PeerAborted {
        source_info: AbortSource,
        backtrace: Backtrace,
    },

    /// no presentation context was accepted
    NoAcceptedContext { backtrace: Backtrace },

    #[snafu(display("unexpected {} in state {:?}", pdu, state))]
    UnexpectedPdu {
        pdu: &'static str,
        state: State,
        backtrace: Backtrace,
    },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// One successfully negotiated presentation context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NegotiatedContext {
    /// the presentation context identifier
    pub id: u8,
    /// the abstract syntax the context is scoped to
    pub abstract_syntax: String,
    /// the single transfer syntax chosen for the context
    pub transfer_syntax: String,
}

/// The outcome of a successful association negotiation.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NegotiatedOptions {
    /// the accepted presentation contexts
    pub presentation_contexts: Vec<NegotiatedContext>,
    /// the maximum PDU length admitted by the peer
    pub peer_max_pdu_length: u32,
    /// the remote application entity title
    pub peer_ae_title: String,
    /// the peer's implementation class UID, when provided
    pub peer_implementation_class_uid: Option<String>,
    /// the peer's implementation version name, when provided
    pub peer_implementation_version_name: Option<String>,
}

impl NegotiatedOptions {
    /// Find the accepted context for the given abstract syntax.
    pub fn context_for(&self, abstract_syntax: &str) -> Option<&NegotiatedContext> {
        let wanted = trim_uid(abstract_syntax);
        self.presentation_contexts
            .iter()
            .find(|pc| pc.abstract_syntax == wanted)
    }
}

pub(crate) fn trim_uid(uid: &str) -> &str {
    uid.trim_end_matches(|c: char| c.is_whitespace() || c == '\0')
}

/// The default connect, read and write timeout for associations.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
