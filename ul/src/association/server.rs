//! Association acceptor (server) module.
//!
//! [`ServerAssociationOptions`] listens for an incoming
//! association request on an accepted TCP stream, negotiates its
//! presentation contexts, and produces a [`ServerAssociation`].
//! Unlike the client options, a value of this type can be reused
//! across connections.

use std::borrow::Cow;
use std::io::Write;
use std::net::TcpStream;
use std::time::Duration;

use snafu::{ensure, ResultExt};
use tracing::debug;

use super::client::{is_timeout, perform_abort_action};
use super::{
    trim_uid, ConfigureSocketSnafu, Error, InvalidAeTitleSnafu, NegotiatedContext,
    NegotiatedOptions, PeerAbortedSnafu, Result, SendPduSnafu, TimeoutClass, TimeoutSnafu,
    UnexpectedPduSnafu, DEFAULT_TIMEOUT,
};
use crate::machine::{Action, Event, Role, State, StateMachine};
use crate::pdu::writer::is_valid_ae_title;
use crate::pdu::{
    read_pdu, write_pdu, AbortServiceProviderReason, AbortSource, AssociationAc, AssociationRj,
    AssociationRjResult, AssociationRjSource, Pdu, PresentationContextResult,
    PresentationContextResultReason, ServiceUserReason, UserIdentity, UserVariableItem,
    DEFAULT_MAX_PDU, MAXIMUM_PDU_SIZE, MINIMUM_PDU_SIZE,
};

use super::pdata::{PDataReader, PDataWriter};
use crate::transport::Transport;

/// Common interface for application entity access control
/// policies, deciding whether an incoming association request
/// is given clearance.
pub trait AccessControl {
    /// Returns `Ok(())` to accept the request, or the rejection
    /// reason to convey otherwise.
    fn check_access(
        &self,
        this_ae_title: &str,
        calling_ae_title: &str,
        called_ae_title: &str,
        user_identity: Option<&UserIdentity>,
    ) -> Result<(), ServiceUserReason>;
}

/// An access control rule that accepts any request.
#[derive(Debug, Default, Copy, Clone, Eq, Hash, PartialEq)]
pub struct AcceptAny;

impl AccessControl for AcceptAny {
    fn check_access(
        &self,
        _this_ae_title: &str,
        _calling_ae_title: &str,
        _called_ae_title: &str,
        _user_identity: Option<&UserIdentity>,
    ) -> Result<(), ServiceUserReason> {
        Ok(())
    }
}

/// An access control rule that accepts requests whose called AE
/// title matches this node's AE title.
#[derive(Debug, Default, Copy, Clone, Eq, Hash, PartialEq)]
pub struct AcceptCalledAeTitle;

impl AccessControl for AcceptCalledAeTitle {
    fn check_access(
        &self,
        this_ae_title: &str,
        _calling_ae_title: &str,
        called_ae_title: &str,
        _user_identity: Option<&UserIdentity>,
    ) -> Result<(), ServiceUserReason> {
        if this_ae_title == called_ae_title {
            Ok(())
        } else {
            Err(ServiceUserReason::CalledAeTitleNotRecognized)
        }
    }
}

/// A builder for accepting associations as the listening node,
/// usually in the service class provider role.
#[derive(Debug, Clone)]
pub struct ServerAssociationOptions<A = AcceptAny> {
    ae_title: Cow<'static, str>,
    application_context_name: Cow<'static, str>,
    abstract_syntaxes: Vec<String>,
    transfer_syntaxes: Vec<String>,
    protocol_version: u16,
    max_pdu_length: u32,
    strict: bool,
    artim_timeout: Option<Duration>,
    access_control: A,
}

impl Default for ServerAssociationOptions<AcceptAny> {
    fn default() -> Self {
        ServerAssociationOptions {
            ae_title: "THIS-SCP".into(),
            application_context_name: "1.2.840.10008.3.1.1.1".into(),
            abstract_syntaxes: Vec::new(),
            transfer_syntaxes: vec![
                // Explicit VR Little Endian
                "1.2.840.10008.1.2.1".to_string(),
                // Implicit VR Little Endian
                "1.2.840.10008.1.2".to_string(),
            ],
            protocol_version: 1,
            max_pdu_length: DEFAULT_MAX_PDU,
            strict: true,
            artim_timeout: Some(DEFAULT_TIMEOUT),
            access_control: AcceptAny,
        }
    }
}

impl ServerAssociationOptions<AcceptAny> {
    /// Create a new set of options with the defaults.
    pub fn new() -> Self {
        Self::default()
    }
}

impl<A> ServerAssociationOptions<A>
where
    A: AccessControl,
{
    /// Define this node's application entity title.
    pub fn ae_title<T>(mut self, value: T) -> Self
    where
        T: Into<Cow<'static, str>>,
    {
        self.ae_title = value.into();
        self
    }

    /// Admit the given abstract syntax. When none is registered,
    /// every proposed abstract syntax is admitted.
    pub fn with_abstract_syntax<T>(mut self, value: T) -> Self
    where
        T: Into<String>,
    {
        self.abstract_syntaxes.push(trim_uid(&value.into()).to_string());
        self
    }

    /// Admit the given transfer syntax, in addition to the
    /// defaults.
    pub fn with_transfer_syntax<T>(mut self, value: T) -> Self
    where
        T: Into<String>,
    {
        self.transfer_syntaxes.push(trim_uid(&value.into()).to_string());
        self
    }

    /// Override the maximum PDU length announced to the peer.
    pub fn max_pdu_length(mut self, value: u32) -> Self {
        self.max_pdu_length = value.clamp(MINIMUM_PDU_SIZE, MAXIMUM_PDU_SIZE);
        self
    }

    /// Override the association (ARTIM) timeout.
    pub fn artim_timeout(mut self, value: Option<Duration>) -> Self {
        self.artim_timeout = value;
        self
    }

    /// Replace the access control policy.
    pub fn access_control<P>(self, access_control: P) -> ServerAssociationOptions<P>
    where
        P: AccessControl,
    {
        ServerAssociationOptions {
            ae_title: self.ae_title,
            application_context_name: self.application_context_name,
            abstract_syntaxes: self.abstract_syntaxes,
            transfer_syntaxes: self.transfer_syntaxes,
            protocol_version: self.protocol_version,
            max_pdu_length: self.max_pdu_length,
            strict: self.strict,
            artim_timeout: self.artim_timeout,
            access_control,
        }
    }

    /// Negotiate an association on the given accepted stream
    /// or any other connected transport.
    pub fn establish<T: Transport>(&self, mut transport: T) -> Result<ServerAssociation<T>> {
        ensure!(
            is_valid_ae_title(&self.ae_title),
            InvalidAeTitleSnafu {
                title: self.ae_title.to_string(),
            }
        );

        let mut machine = StateMachine::new(Role::Acceptor, self.artim_timeout);
        machine.handle(Event::TransportConnected);
        transport
            .set_read_timeout(self.artim_timeout)
            .context(ConfigureSocketSnafu)?;

        let request = match read_pdu(&mut transport, MAXIMUM_PDU_SIZE, self.strict) {
            Ok(Pdu::AssociationRq(rq)) => rq,
            Ok(Pdu::AbortRq { source }) => {
                machine.handle(Event::AbortReceived);
                return PeerAbortedSnafu {
                    source_info: source,
                }
                .fail();
            }
            Ok(pdu) => {
                let state = machine.state();
                for action in machine.handle(Event::LocalAbortRequest) {
                    perform_abort_action(action, &mut transport);
                }
                return UnexpectedPduSnafu {
                    pdu: pdu.short_description(),
                    state,
                }
                .fail();
            }
            Err(e) if is_timeout(&e) => {
                for action in machine.handle(Event::ArtimTimerExpired) {
                    perform_abort_action(action, &mut transport);
                }
                return TimeoutSnafu {
                    class: TimeoutClass::Association,
                }
                .fail();
            }
            Err(e) => return Err(Error::ReceivePdu { source: e }),
        };

        // reject on application context or access control failure
        let reject = |transport: &mut T, reason: ServiceUserReason| -> Result<()> {
            let rejection = Pdu::AssociationRj(AssociationRj {
                result: AssociationRjResult::Permanent,
                source: AssociationRjSource::ServiceUser(reason),
            });
            write_pdu(transport, &rejection).context(SendPduSnafu)?;
            let _ = transport.close();
            Ok(())
        };

        if trim_uid(&request.application_context_name) != self.application_context_name {
            reject(
                &mut transport,
                ServiceUserReason::ApplicationContextNameNotSupported,
            )?;
            return super::RejectedSnafu {
                result: AssociationRjResult::Permanent,
                source_info: AssociationRjSource::ServiceUser(
                    ServiceUserReason::ApplicationContextNameNotSupported,
                ),
            }
            .fail();
        }

        let user_identity = request.user_variables.iter().find_map(|uv| match uv {
            UserVariableItem::UserIdentity(identity) => Some(identity),
            _ => None,
        });
        if let Err(reason) = self.access_control.check_access(
            &self.ae_title,
            &request.calling_ae_title,
            &request.called_ae_title,
            user_identity,
        ) {
            debug!(
                "rejecting association from `{}`: {:?}",
                request.calling_ae_title, reason
            );
            reject(&mut transport, reason)?;
            return super::RejectedSnafu {
                result: AssociationRjResult::Permanent,
                source_info: AssociationRjSource::ServiceUser(reason),
            }
            .fail();
        }

        // negotiate each proposed presentation context
        let mut results = Vec::with_capacity(request.presentation_contexts.len());
        let mut negotiated_contexts = Vec::new();
        for pc in &request.presentation_contexts {
            let abstract_syntax = trim_uid(&pc.abstract_syntax).to_string();
            let syntax_supported = self.abstract_syntaxes.is_empty()
                || self.abstract_syntaxes.iter().any(|s| *s == abstract_syntax);
            if !syntax_supported {
                results.push(PresentationContextResult {
                    id: pc.id,
                    reason: PresentationContextResultReason::AbstractSyntaxNotSupported,
                    transfer_syntax: "1.2.840.10008.1.2".to_string(),
                });
                continue;
            }
            let chosen = pc
                .transfer_syntaxes
                .iter()
                .map(|ts| trim_uid(ts).to_string())
                .find(|ts| self.transfer_syntaxes.iter().any(|s| s == ts));
            match chosen {
                Some(transfer_syntax) => {
                    negotiated_contexts.push(NegotiatedContext {
                        id: pc.id,
                        abstract_syntax,
                        transfer_syntax: transfer_syntax.clone(),
                    });
                    results.push(PresentationContextResult {
                        id: pc.id,
                        reason: PresentationContextResultReason::Acceptance,
                        transfer_syntax,
                    });
                }
                None => {
                    results.push(PresentationContextResult {
                        id: pc.id,
                        reason: PresentationContextResultReason::TransferSyntaxesNotSupported,
                        transfer_syntax: "1.2.840.10008.1.2".to_string(),
                    });
                }
            }
        }

        let mut peer_max_pdu_length = DEFAULT_MAX_PDU;
        let mut peer_implementation_class_uid = None;
        let mut peer_implementation_version_name = None;
        for item in &request.user_variables {
            match item {
                UserVariableItem::MaxLength(len) => {
                    peer_max_pdu_length = (*len).clamp(MINIMUM_PDU_SIZE, MAXIMUM_PDU_SIZE);
                }
                UserVariableItem::ImplementationClassUid(uid) => {
                    peer_implementation_class_uid = Some(uid.clone());
                }
                UserVariableItem::ImplementationVersionName(name) => {
                    peer_implementation_version_name = Some(name.clone());
                }
                _ => {}
            }
        }

        let response = Pdu::AssociationAc(AssociationAc {
            protocol_version: self.protocol_version,
            // the AE title fields are echoes of the request
            calling_ae_title: request.calling_ae_title.clone(),
            called_ae_title: request.called_ae_title.clone(),
            application_context_name: request.application_context_name.clone(),
            presentation_contexts: results,
            user_variables: vec![
                UserVariableItem::MaxLength(self.max_pdu_length),
                UserVariableItem::ImplementationClassUid(
                    crate::IMPLEMENTATION_CLASS_UID.to_string(),
                ),
                UserVariableItem::ImplementationVersionName(
                    crate::IMPLEMENTATION_VERSION_NAME.to_string(),
                ),
            ],
        });
        write_pdu(&mut transport, &response).context(SendPduSnafu)?;
        machine.handle(Event::AssociateRequestReceived);

        transport
            .set_read_timeout(None)
            .context(ConfigureSocketSnafu)?;

        Ok(ServerAssociation {
            machine,
            transport,
            negotiated: NegotiatedOptions {
                presentation_contexts: negotiated_contexts,
                peer_max_pdu_length,
                peer_ae_title: request.calling_ae_title.clone(),
                peer_implementation_class_uid,
                peer_implementation_version_name,
            },
            max_pdu_length: self.max_pdu_length,
            strict: self.strict,
            artim_timeout: self.artim_timeout,
        })
    }
}

/// An established association from the acceptor's perspective.
#[derive(Debug)]
pub struct ServerAssociation<T: Transport = TcpStream> {
    machine: StateMachine,
    transport: T,
    negotiated: NegotiatedOptions,
    max_pdu_length: u32,
    strict: bool,
    artim_timeout: Option<Duration>,
}

impl<T: Transport> ServerAssociation<T> {
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

    /// The maximum PDU length for outbound data.
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
    /// When the peer requests release, the release response is
    /// sent automatically and the A-RELEASE-RQ PDU is returned so
    /// that the service loop can finish.
    pub fn receive(&mut self) -> Result<Pdu> {
        let pdu = match read_pdu(&mut self.transport, MAXIMUM_PDU_SIZE, self.strict) {
            Ok(pdu) => pdu,
            Err(crate::pdu::reader::Error::NoPduAvailable { .. }) => {
                self.machine.handle(Event::TransportConnectionClosed);
                return super::ConnectionClosedSnafu.fail();
            }
            Err(e) => return Err(Error::ReceivePdu { source: e }),
        };

        match &pdu {
            Pdu::PData { .. } => {
                self.machine.handle(Event::DataTransferReceived);
                if !self.machine.can_transfer_data() {
                    return self.abort_unexpected(pdu.short_description());
                }
                Ok(pdu)
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
            Pdu::AbortRq { source } => {
                self.machine.handle(Event::AbortReceived);
                let _ = self.transport.close();
                PeerAbortedSnafu {
                    source_info: *source,
                }
                .fail()
            }
            Pdu::AssociationRq { .. } | Pdu::AssociationAc { .. } | Pdu::AssociationRj { .. } => {
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
    /// P-DATA-TF PDUs.
    pub fn receive_pdata(&mut self) -> PDataReader<&mut T> {
        PDataReader::new(&mut self.transport, self.max_pdu_length)
    }

    /// Gracefully release the association from the acceptor side.
    ///
    /// When the peer's own release request crosses ours, the
    /// acceptor waits for the peer's response and answers last,
    /// completing the release first.
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
                    // release collision; the acceptor holds its
                    // answer until the peer's response arrives
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn access_control_policies() {
        assert!(AcceptAny
            .check_access("THIS-SCP", "SCU", "OTHER", None)
            .is_ok());
        assert!(AcceptCalledAeTitle
            .check_access("THIS-SCP", "SCU", "THIS-SCP", None)
            .is_ok());
        assert_eq!(
            AcceptCalledAeTitle.check_access("THIS-SCP", "SCU", "OTHER", None),
            Err(ServiceUserReason::CalledAeTitleNotRecognized)
        );
    }
}
