//! Integration tests for association negotiation
//! over an in-process TCP loopback.

use std::net::TcpListener;
use std::thread;

use dcmkit_ul::association::{ClientAssociationOptions, Error, ServerAssociationOptions};
use dcmkit_ul::machine::State;
use dcmkit_ul::pdu::{PDataValue, PDataValueType, Pdu};

static VERIFICATION: &str = "1.2.840.10008.1.1";
static CT_STORAGE: &str = "1.2.840.10008.5.1.4.1.1.2";
static EXPLICIT_LE: &str = "1.2.840.10008.1.2.1";
static IMPLICIT_LE: &str = "1.2.840.10008.1.2";

#[test]
fn associate_and_release() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();

    let server = thread::spawn(move || {
        let (stream, _) = listener.accept().unwrap();
        let options = ServerAssociationOptions::new()
            .ae_title("TEST-SCP")
            .with_abstract_syntax(VERIFICATION);
        let mut association = options.establish(stream).unwrap();
        assert_eq!(association.state(), State::Established);
        assert_eq!(association.presentation_contexts().len(), 1);

        // serve until release
        match association.receive() {
            Ok(Pdu::ReleaseRq) => {}
            other => panic!("expected release, got {:?}", other),
        }
        assert_eq!(association.state(), State::Idle);
    });

    let mut association = ClientAssociationOptions::new()
        .calling_ae_title("TEST-SCU")
        .called_ae_title("TEST-SCP")
        .with_presentation_context(VERIFICATION, vec![EXPLICIT_LE, IMPLICIT_LE])
        .establish(addr)
        .unwrap();

    assert_eq!(association.state(), State::Established);
    let contexts = association.presentation_contexts();
    assert_eq!(contexts.len(), 1);
    assert_eq!(contexts[0].abstract_syntax, VERIFICATION);
    assert_eq!(contexts[0].transfer_syntax, EXPLICIT_LE);

    association.release().unwrap();
    assert_eq!(association.state(), State::Idle);

    server.join().unwrap();
}

#[test]
fn no_context_accepted_for_unknown_abstract_syntax() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();

    let server = thread::spawn(move || {
        let (stream, _) = listener.accept().unwrap();
        let options = ServerAssociationOptions::new().with_abstract_syntax(VERIFICATION);
        // the only proposed context is refused; the acceptor side
        // ends up with an association holding no usable context
        let association = options.establish(stream).unwrap();
        assert!(association.presentation_contexts().is_empty());
    });

    let outcome = ClientAssociationOptions::new()
        .with_presentation_context(CT_STORAGE, vec![EXPLICIT_LE])
        .establish(addr);

    // the association is accepted at the PDU level with zero
    // accepted presentation contexts, which the client surfaces
    // as a negotiation failure
    assert!(matches!(outcome, Err(Error::NoAcceptedContext { .. })));
    server.join().unwrap();
}

#[test]
fn association_rejected_by_access_control() {
    use dcmkit_ul::association::AcceptCalledAeTitle;
    use dcmkit_ul::pdu::{
        AssociationRjResult, AssociationRjSource, ServiceUserReason,
    };

    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();

    let server = thread::spawn(move || {
        let (stream, _) = listener.accept().unwrap();
        let options = ServerAssociationOptions::new()
            .ae_title("RIGHT-SCP")
            .access_control(AcceptCalledAeTitle)
            .with_abstract_syntax(VERIFICATION);
        let outcome = options.establish(stream);
        assert!(matches!(outcome, Err(Error::Rejected { .. })));
    });

    let outcome = ClientAssociationOptions::new()
        .called_ae_title("WRONG-SCP")
        .with_presentation_context(VERIFICATION, vec![EXPLICIT_LE])
        .establish(addr);

    match outcome {
        Err(Error::Rejected {
            result,
            source_info,
            ..
        }) => {
            assert_eq!(result, AssociationRjResult::Permanent);
            assert_eq!(
                source_info,
                AssociationRjSource::ServiceUser(
                    ServiceUserReason::CalledAeTitleNotRecognized
                )
            );
        }
        other => panic!("expected rejection, got {:?}", other),
    }
    server.join().unwrap();
}

#[test]
fn pdata_traffic_round_trip() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    let payload: Vec<u8> = (0..40_000u32).map(|i| (i % 253) as u8).collect();
    let payload_clone = payload.clone();

    let server = thread::spawn(move || {
        let (stream, _) = listener.accept().unwrap();
        let options = ServerAssociationOptions::new().with_abstract_syntax(CT_STORAGE);
        let mut association = options.establish(stream).unwrap();

        // receive the fragments back to a full message
        use std::io::Read;
        let mut reader = association.receive_pdata();
        let mut received = Vec::new();
        reader.read_to_end(&mut received).unwrap();
        assert_eq!(received, payload_clone);

        // reply with a single PDV
        association
            .send(&Pdu::PData {
                data: vec![PDataValue {
                    presentation_context_id: 1,
                    value_type: PDataValueType::Command,
                    is_last: true,
                    data: vec![0xAB; 10],
                }],
            })
            .unwrap();

        match association.receive() {
            Ok(Pdu::ReleaseRq) => {}
            other => panic!("expected release, got {:?}", other),
        }
    });

    let mut association = ClientAssociationOptions::new()
        .with_presentation_context(CT_STORAGE, vec![EXPLICIT_LE])
        .establish(addr)
        .unwrap();

    {
        use std::io::Write;
        let mut writer = association.send_pdata(1);
        writer.write_all(&payload).unwrap();
        writer.finish().unwrap();
    }

    match association.receive().unwrap() {
        Pdu::PData { data } => {
            assert_eq!(data.len(), 1);
            assert_eq!(data[0].value_type, PDataValueType::Command);
            assert_eq!(data[0].data, vec![0xAB; 10]);
        }
        pdu => panic!("expected PData, got {:?}", pdu),
    }

    association.release().unwrap();
    server.join().unwrap();
}

#[test]
fn release_collision_resolves_on_both_sides() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    // held until the client association is established, so that
    // both peers request release at the same time
    let (ready_tx, ready_rx) = std::sync::mpsc::channel::<()>();

    let server = thread::spawn(move || {
        let (stream, _) = listener.accept().unwrap();
        let options = ServerAssociationOptions::new().with_abstract_syntax(VERIFICATION);
        let mut association = options.establish(stream).unwrap();
        assert_eq!(association.state(), State::Established);

        // both sides now send A-RELEASE-RQ: each receives the
        // other's request while awaiting a response, entering the
        // collision; the acceptor answers last and completes first
        ready_rx.recv().unwrap();
        association.release().unwrap();
        assert_eq!(association.state(), State::Idle);
    });

    let mut association = ClientAssociationOptions::new()
        .with_presentation_context(VERIFICATION, vec![EXPLICIT_LE])
        .establish(addr)
        .unwrap();
    assert_eq!(association.state(), State::Established);

    ready_tx.send(()).unwrap();
    association.release().unwrap();
    assert_eq!(association.state(), State::Idle);

    server.join().unwrap();
}
