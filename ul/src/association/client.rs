//! Association requester (client) module.

use std::borrow::Cow;
use std::io::Write;
use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;

use snafu::{ensure, ResultExt};
use tracing::{debug, warn};

use super::{
    trim_uid, ConfigureSocketSnafu, ConnectFailedSnafu, ConnectionClosedSnafu, Error,
    InvalidAeTitleSnafu, MissingAbstractSyntaxSnafu, NegotiatedContext, NegotiatedOptions,
    NoAcceptedContextSnafu, PeerAbortedSnafu, RejectedSnafu, Result, SendPduSnafu, TimeoutClass,
    TimeoutSnafu, UnexpectedPduSnafu, DEFAULT_TIMEOUT,
};
use crate::machine::{Action, Event, Role, State, StateMachine};
use crate::pdu::writer::is_valid_ae_title;
use crate::pdu::{
    read_pdu, write_pdu, AbortServiceProviderReason, AbortSource, AssociationRq, Pdu,
    PresentationContextProposed, UserVariableItem, DEFAULT_MAX_PDU, MAXIMUM_PDU_SIZE,
    MINIMUM_PDU_SIZE,
};
use crate::transport::Transport;

use super::pdata::{PDataReader, PDataWriter};

/// A builder for negotiating an association as the requesting
/// node, usually in the service class user role.
///
/// # Example
///
/// ```no_run
/// # use dcmkit_ul::association::ClientAssociationOptions;
/// # fn run() -> Result<(), Box<dyn std::error::Error>> {
/// let mut association = ClientAssociationOptions::new()
///     .with_presentation_context("1.2.840.10008.1.1", vec!["1.2.840.10008.1.2.1"])
///     .calling_ae_title("ECHO-SCU")
///     .establish("192.168.0.5:11112")?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct ClientAssociationOptions {
    calling_ae_title: Cow<'static, str>,
    called_ae_title: Cow<'static, str>,
    application_context_name: Cow<'static, str>,
    presentation_contexts: Vec<(String, Vec<String>)>,
    protocol_version: u16,
    max_pdu_length: u32,
    strict: bool,
    connect_timeout: Option<Duration>,
    artim_timeout: Option<Duration>,
    request_timeout: Option<Duration>,
    implementation_class_uid: String,
    implementation_version_name: String,
    user_identity: Option<crate::pdu::UserIdentity>,
}

impl Default for ClientAssociationOptions {
    fn default() -> Self {
        ClientAssociationOptions {
            calling_ae_title: "THIS-SCU".into(),
            called_ae_title: "ANY-SCP".into(),
            application_context_name: "1.2.840.10008.3.1.1.1".into(),
            presentation_contexts: Vec::new(),
            protocol_version: 1,
            max_pdu_length: DEFAULT_MAX_PDU,
            strict: true,
            connect_timeout: Some(DEFAULT_TIMEOUT),
            artim_timeout: Some(DEFAULT_TIMEOUT),
            request_timeout: Some(DEFAULT_TIMEOUT),
            implementation_class_uid: crate::IMPLEMENTATION_CLASS_UID.to_string(),
            implementation_version_name: crate::IMPLEMENTATION_VERSION_NAME.to_string(),
            user_identity: None,
        }
    }
}

impl ClientAssociationOptions {
    /// Create a new set of options with the defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Define the calling application entity title,
    /// which names this node. The default is `THIS-SCU`.
    pub fn calling_ae_title<T>(mut self, value: T) -> Self
    where
        T: Into<Cow<'static, str>>,
    {
        self.calling_ae_title = value.into();
        self
    }

    /// Define the called application entity title,
    /// which names the peer node. The default is `ANY-SCP`.
    pub fn called_ae_title<T>(mut self, value: T) -> Self
    where
        T: Into<Cow<'static, str>>,
    {
        self.called_ae_title = value.into();
        self
    }

    /// Propose a presentation context with the given abstract
    /// syntax and transfer syntax list. An empty list proposes
    /// Explicit and Implicit VR Little Endian.
    pub fn with_presentation_context<A, T>(
        mut self,
        abstract_syntax: A,
        transfer_syntaxes: Vec<T>,
    ) -> Self
    where
        A: Into<String>,
        T: Into<String>,
    {
        self.presentation_contexts.push((
            abstract_syntax.into(),
            transfer_syntaxes.into_iter().map(Into::into).collect(),
        ));
        self
    }

    /// Propose a presentation context for the given abstract
    /// syntax with the default transfer syntaxes.
    pub fn with_abstract_syntax<A>(self, abstract_syntax: A) -> Self
    where
        A: Into<String>,
    {
        self.with_presentation_context(abstract_syntax, Vec::<String>::new())
    }

    /// Override the maximum PDU length announced to the peer.
    pub fn max_pdu_length(mut self, value: u32) -> Self {
        self.max_pdu_length = value.clamp(MINIMUM_PDU_SIZE, MAXIMUM_PDU_SIZE);
        self
    }

    /// Accept oversized incoming PDUs with a warning
    /// instead of failing.
    pub fn tolerate_oversized_pdus(mut self) -> Self {
        self.strict = false;
        self
    }

    /// Override the transport connect timeout.
    pub fn connect_timeout(mut self, value: Option<Duration>) -> Self {
        self.connect_timeout = value;
        self
    }

    /// Override the association (ARTIM) timeout.
    /// `None` disables the timer.
    pub fn artim_timeout(mut self, value: Option<Duration>) -> Self {
        self.artim_timeout = value;
        self
    }

    /// Override the per-request read timeout.
    pub fn request_timeout(mut self, value: Option<Duration>) -> Self {
        self.request_timeout = value;
        self
    }

    /// Negotiate a user identity with the peer.
    pub fn user_identity(mut self, value: crate::pdu::UserIdentity) -> Self {
        self.user_identity = Some(value);
        self
    }

    /// Connect to the peer over TCP and negotiate the association.
    pub fn establish<A: ToSocketAddrs>(self, address: A) -> Result<ClientAssociation> {
        let socket = connect(address, self.connect_timeout)?;
        self.establish_on(socket)
    }

    /// Negotiate the association on an already connected
    /// transport, such as a TLS-wrapped stream.
    pub fn establish_on<T: Transport>(self, mut transport: T) -> Result<ClientAssociation<T>> {
        let ClientAssociationOptions {
            calling_ae_title,
            called_ae_title,
            application_context_name,
            presentation_contexts,
            protocol_version,
            max_pdu_length,
            strict,
            connect_timeout: _,
            artim_timeout,
            request_timeout,
            implementation_class_uid,
            implementation_version_name,
            user_identity,
        } = self;

        // abstract syntaxes represent intent and must not be omitted
        ensure!(!presentation_contexts.is_empty(), MissingAbstractSyntaxSnafu);
        ensure!(
            is_valid_ae_title(&calling_ae_title),
            InvalidAeTitleSnafu {
                title: calling_ae_title.to_string(),
            }
        );
        ensure!(
            is_valid_ae_title(&called_ae_title),
            InvalidAeTitleSnafu {
                title: called_ae_title.to_string(),
            }
        );

        let presentation_contexts: Vec<PresentationContextProposed> = presentation_contexts
            .into_iter()
            .enumerate()
            .map(|(i, (abstract_syntax, mut transfer_syntaxes))| {
                if transfer_syntaxes.is_empty() {
                    transfer_syntaxes.push("1.2.840.10008.1.2.1".to_string());
                    transfer_syntaxes.push("1.2.840.10008.1.2".to_string());
                }
                PresentationContextProposed {
                    // presentation context identifiers are odd
                    id: (i as u8) * 2 + 1,
                    abstract_syntax,
                    transfer_syntaxes,
                }
            })
            .collect();

        let mut user_variables = vec![
            UserVariableItem::MaxLength(max_pdu_length),
            UserVariableItem::ImplementationClassUid(implementation_class_uid),
            UserVariableItem::ImplementationVersionName(implementation_version_name),
        ];
        if let Some(identity) = user_identity {
            user_variables.push(UserVariableItem::UserIdentity(identity));
        }

        let request = Pdu::AssociationRq(AssociationRq {
            protocol_version,
            calling_ae_title: calling_ae_title.to_string(),
            called_ae_title: called_ae_title.to_string(),
            application_context_name: application_context_name.to_string(),
            presentation_contexts: presentation_contexts.clone(),
            user_variables,
        });

        let mut machine = StateMachine::new(Role::Requestor, artim_timeout);
        machine.handle(Event::TransportConnected);

        // send the association request and await the answer
        // under the ARTIM deadline
        write_pdu(&mut transport, &request).context(SendPduSnafu)?;
        machine.handle(Event::AssociateRequestSent);
        transport
            .set_read_timeout(artim_timeout)
            .context(ConfigureSocketSnafu)?;

        let response = match read_pdu(&mut transport, MAXIMUM_PDU_SIZE, strict) {
            Ok(pdu) => pdu,
            Err(e) if is_timeout(&e) => {
                for action in machine.handle(Event::ArtimTimerExpired) {
                    perform_abort_action(action, &mut transport);
                }
                let _ = transport.close();
                machine.handle(Event::TransportConnectionClosed);
                return TimeoutSnafu {
                    class: TimeoutClass::Association,
                }
                .fail();
            }
            Err(e) => return Err(Error::ReceivePdu { source: e }),
        };

        match response {
            Pdu::AssociationAc(ac) => {
                machine.handle(Event::AssociateAcceptReceived);

                let mut negotiated = NegotiatedOptions {
                    peer_max_pdu_length: DEFAULT_MAX_PDU,
                    peer_ae_title: called_ae_title.to_string(),
                    ..Default::default()
                };
                for item in &ac.user_variables {
                    match item {
                        UserVariableItem::MaxLength(len) => {
                            negotiated.peer_max_pdu_length =
                                (*len).clamp(MINIMUM_PDU_SIZE, MAXIMUM_PDU_SIZE);
                        }
                        UserVariableItem::ImplementationClassUid(uid) => {
                            negotiated.peer_implementation_class_uid = Some(uid.clone());
                        }
                        UserVariableItem::ImplementationVersionName(name) => {
                            negotiated.peer_implementation_version_name = Some(name.clone());
                        }
                        _ => {}
                    }
                }

                for result in &ac.presentation_contexts {
                    if !result.accepted() {
                        debug!(
                            "presentation context {} refused ({:?})",
                            result.id, result.reason
                        );
                        continue;
                    }
                    let proposed = presentation_contexts.iter().find(|pc| pc.id == result.id);
                    match proposed {
                        Some(pc) => negotiated.presentation_contexts.push(NegotiatedContext {
                            id: result.id,
                            abstract_syntax: trim_uid(&pc.abstract_syntax).to_string(),
                            transfer_syntax: trim_uid(&result.transfer_syntax).to_string(),
                        }),
                        None => warn!(
                            "peer accepted unproposed presentation context {}",
                            result.id
                        ),
                    }
                }

                let mut association = ClientAssociation {
                    machine,
                    transport,
                    negotiated,
                    max_pdu_length,
                    strict,
                    artim_timeout,
                };

                if association.negotiated.presentation_contexts.is_empty() {
                    let _ = association.abort();
                    return NoAcceptedContextSnafu.fail();
                }

                association
                    .transport
                    .set_read_timeout(request_timeout)
                    .context(ConfigureSocketSnafu)?;
                Ok(association)
            }
            Pdu::AssociationRj(rj) => {
                machine.handle(Event::AssociateRejectReceived);
                let _ = transport.close();
                machine.handle(Event::TransportConnectionClosed);
                RejectedSnafu {
                    result: rj.result,
                    source_info: rj.source,
                }
                .fail()
            }
            Pdu::AbortRq { source } => {
                machine.handle(Event::AbortReceived);
                let _ = transport.close();
                PeerAbortedSnafu {
                    source_info: source,
                }
                .fail()
            }
            pdu => {
                let state = machine.state();
                for action in machine.handle(Event::LocalAbortRequest) {
                    perform_abort_action(action, &mut transport);
                }
                let _ = transport.close();
                UnexpectedPduSnafu {
                    pdu: pdu.short_description(),
                    state,
                }
                .fail()
            }
        }
    }
}

fn connect<A: ToSocketAddrs>(address: A, timeout: Option<Duration>) -> Result<TcpStream> {
    match timeout {
        None => TcpStream::connect(address).context(ConnectFailedSnafu),
        Some(timeout) => {
            let mut last_err: Option<std::io::Error> = None;
            let addrs = address.to_socket_addrs().context(ConnectFailedSnafu)?;
            for addr in addrs {
                match TcpStream::connect_timeout(&addr, timeout) {
                    Ok(socket) => return Ok(socket),
                    Err(e) => last_err = Some(e),
                }
            }
            let source = last_err.unwrap_or_else(|| {
                std::io::Error::new(std::io::ErrorKind::NotFound, "no addresses resolved")
            });
            if source.kind() == std::io::ErrorKind::TimedOut {
                TimeoutSnafu {
                    class: TimeoutClass::Connect,
                }
                .fail()
            } else {
                Err(source).context(ConnectFailedSnafu)
            }
        }
    }
}

pub(crate) fn is_timeout(e: &crate::pdu::reader::Error) -> bool {
    use std::error::Error as _;
    let mut source: Option<&(dyn std::error::Error + 'static)> = e.source();
    while let Some(err) = source {
        if let Some(io_err) = err.downcast_ref::<std::io::Error>() {
            return matches!(
                io_err.kind(),
                std::io::ErrorKind::WouldBlock | std::io::ErrorKind::TimedOut
            );
        }
        source = err.source();
    }
    false
}

pub(crate) fn perform_abort_action<W: Write>(action: Action, transport: &mut W) {
    if let Action::SendAbort { reason } = action {
        let _ = write_pdu(
            transport,
            &Pdu::AbortRq {
                source: AbortSource::ServiceProvider(reason),
            },
        );
    }
}

/// An established association from the requester's perspective.
///
/// Dropping the value releases the association gracefully when
/// it is still established.
#[derive(Debug)]
pub struct ClientAssociation<T: Transport = TcpStream> {
    machine: StateMachine,
    transport: T,
    negotiated: NegotiatedOptions,
    max_pdu_length: u32,
    strict: bool,
    artim_timeout: Option<Duration>,
}

impl<T: Transport> ClientAssociation<T> {
    /// The outcome of the negotiation.
    pub fn negotiated(&self) -> &NegotiatedOptions {
        &self.negotiated
    }

    /// The accepted presentation contexts.
    pub fn presentation_contexts(&self) -> &[NegotiatedContext] {
        &self.negotiated.presentation_contexts
    }

    /// The current state of the association.
    pub fn state(&self) -> State {
        self.machine.state()
    }

    /// The peer identification reported by the transport, if any.
    pub fn peer_identity(&self) -> Option<String> {
        self.transport.peer_identity()
    }

    /// The maximum PDU length for outbound data,
    /// as negotiated with the peer.
    pub fn send_max_pdu_length(&self) -> u32 {
        self.negotiated.peer_max_pdu_length
    }

    /// Send a PDU message to the peer.
    pub fn send(&mut self, pdu: &Pdu) -> Result<()> {
        if matches!(pdu, Pdu::PData { .. }) && !self.machine.can_transfer_data() {
            return UnexpectedPduSnafu {
                pdu: pdu.short_description(),
                state: self.machine.state(),
            }
            .fail();
        }
        write_pdu(&mut self.transport, pdu).context(SendPduSnafu)
    }

    /// Receive a PDU message from the peer.
    ///
    /// Protocol PDUs which are unexpected while established cause
    /// a local abort; an incoming abort or release is reflected
    /// in the state machine before being surfaced.
    pub fn receive(&mut self) -> Result<Pdu> {
        let pdu = match read_pdu(&mut self.transport, MAXIMUM_PDU_SIZE, self.strict) {
            Ok(pdu) => pdu,
            Err(crate::pdu::reader::Error::NoPduAvailable { .. }) => {
                self.machine.handle(Event::TransportConnectionClosed);
                return ConnectionClosedSnafu.fail();
            }
            Err(e) if is_timeout(&e) => {
                // a request timeout aborts the association by default
                let _ = self.abort();
                return TimeoutSnafu {
                    class: TimeoutClass::Request,
                }
                .fail();
            }
            Err(e) => return Err(Error::ReceivePdu { source: e }),
        };

        match &pdu {
            Pdu::PData { .. } => {
                let actions = self.machine.handle(Event::DataTransferReceived);
                if actions.is_empty() && !self.machine.can_transfer_data() {
                    // data outside of an established association
                    return self.abort_unexpected(pdu.short_description());
                }
                Ok(pdu)
            }
            Pdu::AbortRq { source } => {
                self.machine.handle(Event::AbortReceived);
                let _ = self.transport.close();
                PeerAbortedSnafu {
                    source_info: *source,
                }
                .fail()
            }
            Pdu::ReleaseRq => {
                // the machine decides whether the transport closes
                // here: it does not during a release collision
                let mut closed = false;
                for action in self.machine.handle(Event::ReleaseRequestReceived) {
                    match action {
                        Action::SendReleaseResponse => {
                            write_pdu(&mut self.transport, &Pdu::ReleaseRp)
                                .context(SendPduSnafu)?;
                        }
                        Action::CloseTransport => {
                            let _ = self.transport.close();
                            closed = true;
                        }
                        _ => {}
                    }
                }
                if closed {
                    self.machine.handle(Event::TransportConnectionClosed);
                }
                Ok(pdu)
            }
            Pdu::AssociationAc { .. } | Pdu::AssociationRj { .. } | Pdu::AssociationRq { .. } => {
                self.abort_unexpected(pdu.short_description())
            }
            _ => Ok(pdu),
        }
    }

    fn abort_unexpected(&mut self, description: &'static str) -> Result<Pdu> {
        let state = self.machine.state();
        let _ = write_pdu(
            &mut self.transport,
            &Pdu::AbortRq {
                source: AbortSource::ServiceProvider(AbortServiceProviderReason::UnexpectedPdu),
            },
        );
        let _ = self.transport.close();
        self.machine.handle(Event::LocalAbortRequest);
        self.machine.handle(Event::TransportConnectionClosed);
        UnexpectedPduSnafu {
            pdu: description,
            state,
        }
        .fail()
    }

    /// Obtain a writer which fragments data set content into
    /// P-DATA-TF PDUs for the given presentation context.
    pub fn send_pdata(&mut self, presentation_context_id: u8) -> PDataWriter<&mut T> {
        PDataWriter::new(
            &mut self.transport,
            presentation_context_id,
            self.negotiated.peer_max_pdu_length,
        )
    }

    /// Obtain a reader over the data set fragments of incoming
    /// P-DATA-TF PDUs, ending at the last fragment.
    pub fn receive_pdata(&mut self) -> PDataReader<&mut T> {
        PDataReader::new(&mut self.transport, self.max_pdu_length)
    }

    /// Gracefully release the association.
    pub fn release(&mut self) -> Result<()> {
        if self.machine.state() != State::Established {
            return Ok(());
        }
        for action in self.machine.handle(Event::LocalReleaseRequest) {
            if action == Action::SendReleaseRequest {
                write_pdu(&mut self.transport, &Pdu::ReleaseRq).context(SendPduSnafu)?;
            }
        }
        self.transport
            .set_read_timeout(self.artim_timeout)
            .context(ConfigureSocketSnafu)?;

        loop {
            let pdu = match read_pdu(&mut self.transport, MAXIMUM_PDU_SIZE, self.strict) {
                Ok(pdu) => pdu,
                Err(crate::pdu::reader::Error::NoPduAvailable { .. }) => {
                    // closure without a response still completes the release
                    self.machine.handle(Event::TransportConnectionClosed);
                    return Ok(());
                }
                Err(e) if is_timeout(&e) => {
                    for action in self.machine.handle(Event::ArtimTimerExpired) {
                        perform_abort_action(action, &mut self.transport);
                    }
                    let _ = self.transport.close();
                    self.machine.handle(Event::TransportConnectionClosed);
                    return TimeoutSnafu {
                        class: TimeoutClass::Association,
                    }
                    .fail();
                }
                Err(e) => return Err(Error::ReceivePdu { source: e }),
            };

            match pdu {
                Pdu::ReleaseRp => {
                    for action in self.machine.handle(Event::ReleaseResponseReceived) {
                        match action {
                            Action::SendReleaseResponse => {
                                write_pdu(&mut self.transport, &Pdu::ReleaseRp)
                                    .context(SendPduSnafu)?;
                            }
                            Action::CloseTransport => {
                                let _ = self.transport.close();
                            }
                            _ => {}
                        }
                    }
                    if self.machine.state() == State::Idle {
                        return Ok(());
                    }
                }
                Pdu::ReleaseRq => {
                    // release collision; the peer may close right
                    // after answering, so a failed response write
                    // does not fail the release
                    for action in self.machine.handle(Event::ReleaseRequestReceived) {
                        if action == Action::SendReleaseResponse {
                            if let Err(e) = write_pdu(&mut self.transport, &Pdu::ReleaseRp) {
                                debug!("release response not delivered: {}", e);
                            }
                        }
                    }
                }
                Pdu::AbortRq { source } => {
                    self.machine.handle(Event::AbortReceived);
                    let _ = self.transport.close();
                    return PeerAbortedSnafu {
                        source_info: source,
                    }
                    .fail();
                }
                Pdu::PData { .. } => {
                    // late data while releasing is dropped
                    debug!("dropping P-DATA-TF received during release");
                }
                pdu => {
                    return self.abort_unexpected(pdu.short_description()).map(|_| ());
                }
            }
        }
    }

    /// Abort the association immediately.
    pub fn abort(&mut self) -> Result<()> {
        for action in self.machine.handle(Event::LocalAbortRequest) {
            perform_abort_action(action, &mut self.transport);
        }
        let _ = self.transport.close();
        self.machine.handle(Event::TransportConnectionClosed);
        Ok(())
    }
}

impl<T: Transport> Drop for ClientAssociation<T> {
    fn drop(&mut self) {
        if self.machine.state() == State::Established {
            let _ = self.release();
        }
    }
}
