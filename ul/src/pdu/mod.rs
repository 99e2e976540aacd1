//! Protocol data unit types of the DICOM Upper Layer Protocol.
//!
//! Seven PDU kinds exist, each with a 6-byte header
//! (type, reserved, big-endian length) and a kind-specific
//! payload of items and sub-items.

pub mod reader;
pub mod writer;

pub use self::reader::read_pdu;
pub use self::writer::write_pdu;

/// The default maximum PDU size, in bytes.
pub const DEFAULT_MAX_PDU: u32 = 16_384;

/// The minimum admitted maximum-PDU size, in bytes.
pub const MINIMUM_PDU_SIZE: u32 = 8_192;

/// The largest PDU size accepted by this implementation, in bytes.
pub const MAXIMUM_PDU_SIZE: u32 = 131_072;

/// The length of the PDU header: type (1), reserved (1)
/// and length (4).
pub const PDU_HEADER_SIZE: u32 = 6;

/// A proposed presentation context: an odd identifier,
/// one abstract syntax, and the transfer syntaxes offered for it.
#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub struct PresentationContextProposed {
    /// the presentation context identifier (odd integer)
    pub id: u8,
    /// the abstract syntax UID (SOP class)
    pub abstract_syntax: String,
    /// the proposed transfer syntax UIDs, in order of preference
    pub transfer_syntaxes: Vec<String>,
}

/// The result of negotiating one presentation context.
#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub struct PresentationContextResult {
    /// the presentation context identifier
    pub id: u8,
    /// the outcome of the negotiation
    pub reason: PresentationContextResultReason,
    /// the chosen transfer syntax
    /// (not meaningful unless accepted)
    pub transfer_syntax: String,
}

impl PresentationContextResult {
    /// Whether the context was accepted.
    pub fn accepted(&self) -> bool {
        self.reason == PresentationContextResultReason::Acceptance
    }
}

/// The outcome code of a presentation context negotiation.
#[derive(Clone, Copy, Eq, PartialEq, Hash, Debug)]
pub enum PresentationContextResultReason {
    /// The context was accepted with the given transfer syntax.
    Acceptance,
    /// The user rejected the context.
    UserRejection,
    /// The provider rejected the context without a reason.
    NoReason,
    /// The abstract syntax is not supported.
    AbstractSyntaxNotSupported,
    /// None of the proposed transfer syntaxes is supported.
    TransferSyntaxesNotSupported,
}

impl PresentationContextResultReason {
    /// Interpret the result/reason field code.
    pub fn from_code(code: u8) -> Option<Self> {
        use PresentationContextResultReason::*;
        match code {
            0 => Some(Acceptance),
            1 => Some(UserRejection),
            2 => Some(NoReason),
            3 => Some(AbstractSyntaxNotSupported),
            4 => Some(TransferSyntaxesNotSupported),
            _ => None,
        }
    }

    /// The result/reason field code.
    pub fn code(self) -> u8 {
        use PresentationContextResultReason::*;
        match self {
            Acceptance => 0,
            UserRejection => 1,
            NoReason => 2,
            AbstractSyntaxNotSupported => 3,
            TransferSyntaxesNotSupported => 4,
        }
    }
}

/// The result field of an association rejection.
#[derive(Clone, Copy, Eq, PartialEq, Hash, Debug)]
pub enum AssociationRjResult {
    /// rejected-permanent
    Permanent,
    /// rejected-transient
    Transient,
}

impl AssociationRjResult {
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            1 => Some(AssociationRjResult::Permanent),
            2 => Some(AssociationRjResult::Transient),
            _ => None,
        }
    }

    pub fn code(self) -> u8 {
        match self {
            AssociationRjResult::Permanent => 1,
            AssociationRjResult::Transient => 2,
        }
    }
}

/// The source and reason of an association rejection.
#[derive(Clone, Copy, Eq, PartialEq, Hash, Debug)]
pub enum AssociationRjSource {
    /// DICOM UL service-user
    ServiceUser(ServiceUserReason),
    /// DICOM UL service-provider (ACSE related function)
    ServiceProviderAcse(ServiceProviderAcseReason),
    /// DICOM UL service-provider (presentation related function)
    ServiceProviderPresentation(ServiceProviderPresentationReason),
}

impl AssociationRjSource {
    /// Interpret the source and reason field codes.
    pub fn from_codes(source: u8, reason: u8) -> Option<Self> {
        match source {
            1 => ServiceUserReason::from_code(reason).map(AssociationRjSource::ServiceUser),
            2 => ServiceProviderAcseReason::from_code(reason)
                .map(AssociationRjSource::ServiceProviderAcse),
            3 => ServiceProviderPresentationReason::from_code(reason)
                .map(AssociationRjSource::ServiceProviderPresentation),
            _ => None,
        }
    }

    /// The `(source, reason)` field codes.
    pub fn codes(self) -> (u8, u8) {
        match self {
            AssociationRjSource::ServiceUser(r) => (1, r.code()),
            AssociationRjSource::ServiceProviderAcse(r) => (2, r.code()),
            AssociationRjSource::ServiceProviderPresentation(r) => (3, r.code()),
        }
    }
}

/// Rejection reasons attributed to the service user.
#[derive(Clone, Copy, Eq, PartialEq, Hash, Debug)]
pub enum ServiceUserReason {
    NoReasonGiven,
    ApplicationContextNameNotSupported,
    CallingAeTitleNotRecognized,
    CalledAeTitleNotRecognized,
    Reserved(u8),
}

impl ServiceUserReason {
    fn from_code(code: u8) -> Option<Self> {
        use ServiceUserReason::*;
        match code {
            1 => Some(NoReasonGiven),
            2 => Some(ApplicationContextNameNotSupported),
            3 => Some(CallingAeTitleNotRecognized),
            7 => Some(CalledAeTitleNotRecognized),
            4..=6 | 8..=10 => Some(Reserved(code)),
            _ => None,
        }
    }

    fn code(self) -> u8 {
        use ServiceUserReason::*;
        match self {
            NoReasonGiven => 1,
            ApplicationContextNameNotSupported => 2,
            CallingAeTitleNotRecognized => 3,
            CalledAeTitleNotRecognized => 7,
            Reserved(code) => code,
        }
    }
}

/// Rejection reasons attributed to the ACSE function
/// of the service provider.
#[derive(Clone, Copy, Eq, PartialEq, Hash, Debug)]
pub enum ServiceProviderAcseReason {
    NoReasonGiven,
    ProtocolVersionNotSupported,
}

impl ServiceProviderAcseReason {
    fn from_code(code: u8) -> Option<Self> {
        match code {
            1 => Some(ServiceProviderAcseReason::NoReasonGiven),
            2 => Some(ServiceProviderAcseReason::ProtocolVersionNotSupported),
            _ => None,
        }
    }

    fn code(self) -> u8 {
        match self {
            ServiceProviderAcseReason::NoReasonGiven => 1,
            ServiceProviderAcseReason::ProtocolVersionNotSupported => 2,
        }
    }
}

/// Rejection reasons attributed to the presentation function
/// of the service provider.
#[derive(Clone, Copy, Eq, PartialEq, Hash, Debug)]
pub enum ServiceProviderPresentationReason {
    TemporaryCongestion,
    LocalLimitExceeded,
    Reserved(u8),
}

impl ServiceProviderPresentationReason {
    fn from_code(code: u8) -> Option<Self> {
        use ServiceProviderPresentationReason::*;
        match code {
            1 => Some(TemporaryCongestion),
            2 => Some(LocalLimitExceeded),
            0 | 3..=7 => Some(Reserved(code)),
            _ => None,
        }
    }

    fn code(self) -> u8 {
        use ServiceProviderPresentationReason::*;
        match self {
            TemporaryCongestion => 1,
            LocalLimitExceeded => 2,
            Reserved(code) => code,
        }
    }
}

/// The source of an A-ABORT.
#[derive(Clone, Copy, Eq, PartialEq, Hash, Debug)]
pub enum AbortSource {
    /// DICOM UL service-user initiated abort
    ServiceUser,
    /// DICOM UL service-provider initiated abort
    ServiceProvider(AbortServiceProviderReason),
    /// reserved source value
    Reserved,
}

impl AbortSource {
    /// Interpret the source and reason field codes.
    pub fn from_codes(source: u8, reason: u8) -> Option<Self> {
        match source {
            0 => Some(AbortSource::ServiceUser),
            1 => Some(AbortSource::Reserved),
            2 => AbortServiceProviderReason::from_code(reason)
                .map(AbortSource::ServiceProvider),
            _ => None,
        }
    }

    /// The `(source, reason)` field codes.
    pub fn codes(self) -> (u8, u8) {
        match self {
            AbortSource::ServiceUser => (0, 0),
            AbortSource::Reserved => (1, 0),
            AbortSource::ServiceProvider(r) => (2, r.code()),
        }
    }
}

/// Abort reasons attributed to the service provider.
#[derive(Clone, Copy, Eq, PartialEq, Hash, Debug)]
pub enum AbortServiceProviderReason {
    ReasonNotSpecified,
    UnrecognizedPdu,
    UnexpectedPdu,
    Reserved,
    UnrecognizedPduParameter,
    UnexpectedPduParameter,
    InvalidPduParameterValue,
}

impl AbortServiceProviderReason {
    fn from_code(code: u8) -> Option<Self> {
        use AbortServiceProviderReason::*;
        match code {
            0 => Some(ReasonNotSpecified),
            1 => Some(UnrecognizedPdu),
            2 => Some(UnexpectedPdu),
            3 => Some(Reserved),
            4 => Some(UnrecognizedPduParameter),
            5 => Some(UnexpectedPduParameter),
            6 => Some(InvalidPduParameterValue),
            _ => None,
        }
    }

    fn code(self) -> u8 {
        use AbortServiceProviderReason::*;
        match self {
            ReasonNotSpecified => 0,
            UnrecognizedPdu => 1,
            UnexpectedPdu => 2,
            Reserved => 3,
            UnrecognizedPduParameter => 4,
            UnexpectedPduParameter => 5,
            InvalidPduParameterValue => 6,
        }
    }
}

/// A presentation data value: one fragment of a DIMSE message.
#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub struct PDataValue {
    /// the presentation context carrying the message
    pub presentation_context_id: u8,
    /// whether the fragment belongs to a command set or a data set
    pub value_type: PDataValueType,
    /// whether this is the last fragment of its group
    pub is_last: bool,
    /// the fragment data
    pub data: Vec<u8>,
}

/// Whether a PDV fragment carries command or data set content.
#[derive(Clone, Copy, Eq, PartialEq, Hash, Debug)]
pub enum PDataValueType {
    /// command set content (control bit 0 set)
    Command,
    /// data set content (control bit 0 clear)
    Data,
}

/// User identity as negotiated in the user information item.
#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub struct UserIdentity {
    /// whether a positive server response is requested
    pub positive_response_requested: bool,
    /// the identity form
    pub identity_type: UserIdentityType,
    /// user name, Kerberos ticket or SAML assertion
    pub primary_field: Vec<u8>,
    /// pass code, when the identity form carries one
    pub secondary_field: Vec<u8>,
}

/// The form of a negotiated user identity.
#[derive(Clone, Copy, Eq, PartialEq, Hash, Debug)]
pub enum UserIdentityType {
    Username,
    UsernameAndPasscode,
    KerberosServiceTicket,
    SamlAssertion,
    Jwt,
}

impl UserIdentityType {
    pub fn from_code(code: u8) -> Option<Self> {
        use UserIdentityType::*;
        match code {
            1 => Some(Username),
            2 => Some(UsernameAndPasscode),
            3 => Some(KerberosServiceTicket),
            4 => Some(SamlAssertion),
            5 => Some(Jwt),
            _ => None,
        }
    }

    pub fn code(self) -> u8 {
        use UserIdentityType::*;
        match self {
            Username => 1,
            UsernameAndPasscode => 2,
            KerberosServiceTicket => 3,
            SamlAssertion => 4,
            Jwt => 5,
        }
    }
}

/// A sub-item of the user information item.
#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub enum UserVariableItem {
    /// maximum length receivable (sub-item 0x51)
    MaxLength(u32),
    /// implementation class UID (sub-item 0x52)
    ImplementationClassUid(String),
    /// implementation version name (sub-item 0x55)
    ImplementationVersionName(String),
    /// asynchronous operations window (sub-item 0x53):
    /// maximum operations invoked and performed
    AsynchronousOperationsWindow(u16, u16),
    /// SCP/SCU role selection (sub-item 0x54)
    RoleSelection {
        /// the SOP class the roles apply to
        sop_class_uid: String,
        /// proposed/accepted SCU role
        scu: bool,
        /// proposed/accepted SCP role
        scp: bool,
    },
    /// SOP class extended negotiation (sub-item 0x56)
    SopClassExtendedNegotiation(String, Vec<u8>),
    /// user identity negotiation (sub-item 0x58)
    UserIdentity(UserIdentity),
    /// any other sub-item, kept with its raw content
    Unknown(u8, Vec<u8>),
}

/// An A-ASSOCIATE-RQ payload.
#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub struct AssociationRq {
    pub protocol_version: u16,
    pub calling_ae_title: String,
    pub called_ae_title: String,
    pub application_context_name: String,
    pub presentation_contexts: Vec<PresentationContextProposed>,
    pub user_variables: Vec<UserVariableItem>,
}

/// An A-ASSOCIATE-AC payload. The echoed AE titles are preserved
/// but carry no meaning.
#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub struct AssociationAc {
    pub protocol_version: u16,
    pub calling_ae_title: String,
    pub called_ae_title: String,
    pub application_context_name: String,
    pub presentation_contexts: Vec<PresentationContextResult>,
    pub user_variables: Vec<UserVariableItem>,
}

/// An A-ASSOCIATE-RJ payload.
#[derive(Clone, Copy, Eq, PartialEq, Hash, Debug)]
pub struct AssociationRj {
    pub result: AssociationRjResult,
    pub source: AssociationRjSource,
}

/// A protocol data unit of the Upper Layer Protocol.
#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub enum Pdu {
    /// A-ASSOCIATE-RQ (type 0x01)
    AssociationRq(AssociationRq),
    /// A-ASSOCIATE-AC (type 0x02)
    AssociationAc(AssociationAc),
    /// A-ASSOCIATE-RJ (type 0x03)
    AssociationRj(AssociationRj),
    /// P-DATA-TF (type 0x04)
    PData {
        /// the presentation data values carried
        data: Vec<PDataValue>,
    },
    /// A-RELEASE-RQ (type 0x05)
    ReleaseRq,
    /// A-RELEASE-RP (type 0x06)
    ReleaseRp,
    /// A-ABORT (type 0x07)
    AbortRq {
        /// who initiated the abort, and why
        source: AbortSource,
    },
    /// A PDU of an unrecognized type, kept with its raw payload.
    Unknown {
        pdu_type: u8,
        data: Vec<u8>,
    },
}

impl Pdu {
    /// A short name of the PDU kind, for diagnostics.
    pub fn short_description(&self) -> &'static str {
        match self {
            Pdu::AssociationRq(_) => "A-ASSOCIATE-RQ",
            Pdu::AssociationAc(_) => "A-ASSOCIATE-AC",
            Pdu::AssociationRj(_) => "A-ASSOCIATE-RJ",
            Pdu::PData { .. } => "P-DATA-TF",
            Pdu::ReleaseRq => "A-RELEASE-RQ",
            Pdu::ReleaseRp => "A-RELEASE-RP",
            Pdu::AbortRq { .. } => "A-ABORT",
            Pdu::Unknown { .. } => "unknown PDU",
        }
    }
}
