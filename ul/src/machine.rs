//! The association state machine.
//!
//! A pure event-driven formulation of the upper layer state
//! machine: callers feed [`Event`]s and execute the returned
//! [`Action`]s against the transport. The machine itself performs
//! no I/O, which keeps every transition testable in isolation.
//!
//! The ARTIM timer is modelled as an armed/disarmed flag plus a
//! deadline; the I/O driver checks [`StateMachine::artim_deadline`]
//! between reads and feeds [`Event::ArtimTimerExpired`] on expiry.

use crate::pdu::AbortServiceProviderReason;
use smallvec::{smallvec, SmallVec};
use std::time::{Duration, Instant};
use tracing::debug;

/// The states of an association.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum State {
    /// No association and no transport.
    Idle,
    /// The transport is connected; negotiation has not started.
    AwaitingTransportOpen,
    /// An A-ASSOCIATE-RQ was sent; awaiting the peer's answer.
    AwaitingRemoteAssociateResponse,
    /// The association is established; data may be transferred.
    Established,
    /// An A-RELEASE-RQ was sent; awaiting the peer's answer.
    AwaitingRemoteReleaseResponse,
    /// Both sides requested release simultaneously.
    ReleaseCollision,
    /// An A-ABORT was sent; awaiting transport closure.
    AwaitingTransportClose,
}

/// The role this node took when the association was negotiated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    /// This node proposed the association (service class user).
    Requestor,
    /// This node accepted the association (service class provider).
    Acceptor,
}

/// An input to the state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    /// The transport connection is up.
    TransportConnected,
    /// The transport connection could not be established.
    TransportConnectionFailed,
    /// The transport connection was closed.
    TransportConnectionClosed,
    /// The local node sent an A-ASSOCIATE-RQ.
    AssociateRequestSent,
    /// An A-ASSOCIATE-AC arrived.
    AssociateAcceptReceived,
    /// An A-ASSOCIATE-RJ arrived.
    AssociateRejectReceived,
    /// An A-ASSOCIATE-RQ arrived (acceptor side).
    AssociateRequestReceived,
    /// A P-DATA-TF arrived.
    DataTransferReceived,
    /// The local user asked to release the association.
    LocalReleaseRequest,
    /// An A-RELEASE-RQ arrived.
    ReleaseRequestReceived,
    /// An A-RELEASE-RP arrived.
    ReleaseResponseReceived,
    /// The local user asked to abort the association.
    LocalAbortRequest,
    /// An A-ABORT arrived.
    AbortReceived,
    /// The ARTIM timer expired.
    ArtimTimerExpired,
}

/// An instruction for the I/O driver, produced by a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Send an A-ABORT with the given service provider reason.
    SendAbort {
        /// the reason conveyed in the PDU
        reason: AbortServiceProviderReason,
    },
    /// Send an A-RELEASE-RQ.
    SendReleaseRequest,
    /// Send an A-RELEASE-RP.
    SendReleaseResponse,
    /// Close the transport connection.
    CloseTransport,
    /// Surface the negotiated association to the caller.
    DeliverAssociation,
    /// Surface the incoming association request to the caller
    /// for an accept/reject decision.
    DeliverAssociationRequest,
    /// Surface the peer's rejection to the caller.
    SurfaceRejection,
    /// Surface the peer's abort to the caller.
    SurfaceAbort,
    /// Surface an ARTIM expiry as a timeout to the caller.
    SurfaceTimeout,
    /// Hand the P-DATA-TF payload to the reassembler.
    RouteToReassembler,
}

/// The actions produced by one transition, in execution order.
pub type Actions = SmallVec<[Action; 3]>;

/// The association state machine with its ARTIM timer bookkeeping.
#[derive(Debug, Clone)]
pub struct StateMachine {
    state: State,
    role: Role,
    artim_timeout: Option<Duration>,
    artim_deadline: Option<Instant>,
}

impl StateMachine {
    /// Create a state machine in `Idle` for the given role.
    /// The ARTIM timeout may be `None` to disable the timer.
    pub fn new(role: Role, artim_timeout: Option<Duration>) -> Self {
        StateMachine {
            state: State::Idle,
            role,
            artim_timeout,
            artim_deadline: None,
        }
    }

    /// The current state.
    pub fn state(&self) -> State {
        self.state
    }

    /// The role of this node.
    pub fn role(&self) -> Role {
        self.role
    }

    /// Whether the ARTIM timer is armed.
    pub fn artim_armed(&self) -> bool {
        self.artim_deadline.is_some()
    }

    /// The instant at which the ARTIM timer fires, when armed.
    pub fn artim_deadline(&self) -> Option<Instant> {
        self.artim_deadline
    }

    /// Whether data transfer is admissible in the current state.
    pub fn can_transfer_data(&self) -> bool {
        self.state == State::Established
    }

    fn arm_artim(&mut self) {
        if let Some(timeout) = self.artim_timeout {
            self.artim_deadline = Some(Instant::now() + timeout);
        }
    }

    fn disarm_artim(&mut self) {
        self.artim_deadline = None;
    }

    /// Feed one event, transitioning the machine and returning the
    /// actions the driver must carry out, in order.
    pub fn handle(&mut self, event: Event) -> Actions {
        use Action::*;
        use Event::*;
        use State::*;

        // events with the same outcome from every state
        match event {
            AbortReceived => {
                // an abort leads to Idle within one transition
                self.disarm_artim();
                self.state = Idle;
                return smallvec![SurfaceAbort, CloseTransport];
            }
            LocalAbortRequest => {
                self.disarm_artim();
                self.state = AwaitingTransportClose;
                return smallvec![SendAbort {
                    reason: AbortServiceProviderReason::ReasonNotSpecified,
                }];
            }
            TransportConnectionClosed | TransportConnectionFailed => {
                self.disarm_artim();
                self.state = Idle;
                return smallvec![];
            }
            _ => {}
        }

        let (next, actions): (State, Actions) = match (self.state, event) {
            (Idle, TransportConnected) => (AwaitingTransportOpen, smallvec![]),

            (AwaitingTransportOpen, AssociateRequestSent) => {
                self.arm_artim();
                (AwaitingRemoteAssociateResponse, smallvec![])
            }
            (AwaitingTransportOpen, AssociateRequestReceived) => {
                // the accept/reject decision is the caller's;
                // an accepted association transitions on delivery
                (Established, smallvec![DeliverAssociationRequest])
            }

            (AwaitingRemoteAssociateResponse, AssociateAcceptReceived) => {
                self.disarm_artim();
                (Established, smallvec![DeliverAssociation])
            }
            (AwaitingRemoteAssociateResponse, AssociateRejectReceived) => {
                self.disarm_artim();
                (Idle, smallvec![SurfaceRejection, CloseTransport])
            }
            (AwaitingRemoteAssociateResponse, ArtimTimerExpired) => {
                self.disarm_artim();
                (
                    AwaitingTransportClose,
                    smallvec![
                        SurfaceTimeout,
                        SendAbort {
                            reason: AbortServiceProviderReason::ReasonNotSpecified,
                        }
                    ],
                )
            }

            (Established, DataTransferReceived) => (Established, smallvec![RouteToReassembler]),
            (Established, LocalReleaseRequest) => {
                self.arm_artim();
                (AwaitingRemoteReleaseResponse, smallvec![SendReleaseRequest])
            }
            (Established, ReleaseRequestReceived) => {
                // peer-initiated release: answer and close
                (
                    AwaitingTransportClose,
                    smallvec![SendReleaseResponse, CloseTransport],
                )
            }
            (
                Established,
                AssociateAcceptReceived | AssociateRejectReceived | AssociateRequestReceived
                | ReleaseResponseReceived,
            ) => {
                // protocol violations while established abort locally
                (
                    AwaitingTransportClose,
                    smallvec![SendAbort {
                        reason: AbortServiceProviderReason::UnexpectedPdu,
                    }],
                )
            }

            (AwaitingRemoteReleaseResponse, ReleaseResponseReceived) => {
                self.disarm_artim();
                (Idle, smallvec![CloseTransport])
            }
            (AwaitingRemoteReleaseResponse, ReleaseRequestReceived) => {
                // release collision; resolution depends on the role
                self.disarm_artim();
                match self.role {
                    Role::Requestor => (ReleaseCollision, smallvec![SendReleaseResponse]),
                    Role::Acceptor => (ReleaseCollision, smallvec![]),
                }
            }
            (AwaitingRemoteReleaseResponse, ArtimTimerExpired) => {
                self.disarm_artim();
                (
                    AwaitingTransportClose,
                    smallvec![
                        SurfaceTimeout,
                        SendAbort {
                            reason: AbortServiceProviderReason::ReasonNotSpecified,
                        }
                    ],
                )
            }

            (ReleaseCollision, ReleaseResponseReceived) => match self.role {
                // the requestor already answered; the exchange is over
                Role::Requestor => (Idle, smallvec![CloseTransport]),
                // the acceptor answers now and completes first
                Role::Acceptor => (Idle, smallvec![SendReleaseResponse, CloseTransport]),
            },

            (state, event) => {
                // everything else is ignored with a diagnostic
                debug!("event {:?} ignored in state {:?}", event, state);
                (state, smallvec![])
            }
        };

        self.state = next;
        actions
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn requestor() -> StateMachine {
        StateMachine::new(Role::Requestor, Some(Duration::from_secs(30)))
    }

    fn established(role: Role) -> StateMachine {
        let mut sm = StateMachine::new(role, Some(Duration::from_secs(30)));
        match role {
            Role::Requestor => {
                sm.handle(Event::TransportConnected);
                sm.handle(Event::AssociateRequestSent);
                sm.handle(Event::AssociateAcceptReceived);
            }
            Role::Acceptor => {
                sm.handle(Event::TransportConnected);
                sm.handle(Event::AssociateRequestReceived);
            }
        }
        assert_eq!(sm.state(), State::Established);
        sm
    }

    #[test]
    fn association_request_happy_path() {
        let mut sm = requestor();
        assert_eq!(sm.state(), State::Idle);

        assert!(sm.handle(Event::TransportConnected).is_empty());
        assert_eq!(sm.state(), State::AwaitingTransportOpen);
        assert!(!sm.artim_armed());

        sm.handle(Event::AssociateRequestSent);
        assert_eq!(sm.state(), State::AwaitingRemoteAssociateResponse);
        assert!(sm.artim_armed(), "ARTIM armed while awaiting the answer");

        let actions = sm.handle(Event::AssociateAcceptReceived);
        assert_eq!(sm.state(), State::Established);
        assert!(!sm.artim_armed(), "ARTIM disarmed on leaving the wait");
        assert_eq!(&actions[..], &[Action::DeliverAssociation]);
    }

    #[test]
    fn association_rejection_returns_to_idle() {
        let mut sm = requestor();
        sm.handle(Event::TransportConnected);
        sm.handle(Event::AssociateRequestSent);
        let actions = sm.handle(Event::AssociateRejectReceived);
        assert_eq!(sm.state(), State::Idle);
        assert!(!sm.artim_armed());
        assert_eq!(
            &actions[..],
            &[Action::SurfaceRejection, Action::CloseTransport]
        );
    }

    #[test]
    fn artim_expiry_during_negotiation() {
        let mut sm = requestor();
        sm.handle(Event::TransportConnected);
        sm.handle(Event::AssociateRequestSent);
        let actions = sm.handle(Event::ArtimTimerExpired);
        assert_eq!(sm.state(), State::AwaitingTransportClose);
        assert!(matches!(actions[1], Action::SendAbort { .. }));

        sm.handle(Event::TransportConnectionClosed);
        assert_eq!(sm.state(), State::Idle);
    }

    #[test]
    fn artim_expiry_during_release() {
        let mut sm = established(Role::Requestor);
        sm.handle(Event::LocalReleaseRequest);
        assert_eq!(sm.state(), State::AwaitingRemoteReleaseResponse);
        assert!(sm.artim_armed());

        let actions = sm.handle(Event::ArtimTimerExpired);
        assert_eq!(sm.state(), State::AwaitingTransportClose);
        assert_eq!(actions[0], Action::SurfaceTimeout);
        assert!(matches!(actions[1], Action::SendAbort { .. }));

        sm.handle(Event::TransportConnectionClosed);
        assert_eq!(sm.state(), State::Idle);
    }

    #[test]
    fn orderly_release() {
        let mut sm = established(Role::Requestor);
        let actions = sm.handle(Event::LocalReleaseRequest);
        assert_eq!(&actions[..], &[Action::SendReleaseRequest]);
        assert!(sm.artim_armed());

        let actions = sm.handle(Event::ReleaseResponseReceived);
        assert_eq!(sm.state(), State::Idle);
        assert!(!sm.artim_armed());
        assert_eq!(&actions[..], &[Action::CloseTransport]);
    }

    #[test]
    fn peer_initiated_release() {
        let mut sm = established(Role::Acceptor);
        let actions = sm.handle(Event::ReleaseRequestReceived);
        assert_eq!(sm.state(), State::AwaitingTransportClose);
        assert_eq!(
            &actions[..],
            &[Action::SendReleaseResponse, Action::CloseTransport]
        );
        sm.handle(Event::TransportConnectionClosed);
        assert_eq!(sm.state(), State::Idle);
    }

    #[test]
    fn release_collision_requestor_side() {
        let mut sm = established(Role::Requestor);
        sm.handle(Event::LocalReleaseRequest);

        // the peer's release request crosses ours in flight
        let actions = sm.handle(Event::ReleaseRequestReceived);
        assert_eq!(sm.state(), State::ReleaseCollision);
        // the requestor answers immediately, then waits
        assert_eq!(&actions[..], &[Action::SendReleaseResponse]);

        let actions = sm.handle(Event::ReleaseResponseReceived);
        assert_eq!(sm.state(), State::Idle);
        assert_eq!(&actions[..], &[Action::CloseTransport]);
    }

    #[test]
    fn release_collision_acceptor_side() {
        let mut sm = established(Role::Acceptor);
        sm.handle(Event::LocalReleaseRequest);

        let actions = sm.handle(Event::ReleaseRequestReceived);
        assert_eq!(sm.state(), State::ReleaseCollision);
        // the acceptor waits for the peer's answer first
        assert!(actions.is_empty());

        let actions = sm.handle(Event::ReleaseResponseReceived);
        assert_eq!(sm.state(), State::Idle);
        assert_eq!(
            &actions[..],
            &[Action::SendReleaseResponse, Action::CloseTransport]
        );
    }

    #[test]
    fn abort_received_reaches_idle_from_any_state() {
        let builds: [fn() -> StateMachine; 4] = [
            || requestor(),
            || {
                let mut sm = requestor();
                sm.handle(Event::TransportConnected);
                sm
            },
            || established(Role::Requestor),
            || {
                let mut sm = established(Role::Requestor);
                sm.handle(Event::LocalReleaseRequest);
                sm
            },
        ];
        for build in builds {
            let mut sm = build();
            sm.handle(Event::AbortReceived);
            assert_eq!(sm.state(), State::Idle);
            assert!(!sm.artim_armed());
        }
    }

    #[test]
    fn unexpected_pdu_in_established_aborts() {
        let mut sm = established(Role::Requestor);
        let actions = sm.handle(Event::AssociateAcceptReceived);
        assert_eq!(sm.state(), State::AwaitingTransportClose);
        assert_eq!(
            &actions[..],
            &[Action::SendAbort {
                reason: AbortServiceProviderReason::UnexpectedPdu,
            }]
        );
    }

    #[test]
    fn data_transfer_only_while_established() {
        let mut sm = requestor();
        assert!(!sm.can_transfer_data());
        sm.handle(Event::TransportConnected);
        sm.handle(Event::AssociateRequestSent);
        assert!(!sm.can_transfer_data());
        // a data event outside Established is ignored with a diagnostic
        let actions = sm.handle(Event::DataTransferReceived);
        assert!(actions.is_empty());
        assert_eq!(sm.state(), State::AwaitingRemoteAssociateResponse);

        sm.handle(Event::AssociateAcceptReceived);
        assert!(sm.can_transfer_data());
        let actions = sm.handle(Event::DataTransferReceived);
        assert_eq!(&actions[..], &[Action::RouteToReassembler]);
    }

    #[test]
    fn artim_disabled_when_timeout_is_none() {
        let mut sm = StateMachine::new(Role::Requestor, None);
        sm.handle(Event::TransportConnected);
        sm.handle(Event::AssociateRequestSent);
        assert!(!sm.artim_armed());
        assert!(sm.artim_deadline().is_none());
    }
}
