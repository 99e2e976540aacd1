//! End-to-end service scenarios over an in-process TCP loopback.

use std::net::TcpListener;
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use dcmkit_core::{DataElement, PrimitiveValue, Value, VR};
use dcmkit_dictionary_std::{tags, uids};
use dcmkit_dimse::{
    fragment_message, CommandField, CommandSet, Message, Priority, Reassembler, StatusClass,
};
use dcmkit_object::{element, open_file, FileMetaTableBuilder, FileObject, InMemObject};
use dcmkit_ul::association::{ClientAssociationOptions, Error, ServerAssociationOptions, TimeoutClass};
use dcmkit_ul::machine::State;
use dcmkit_ul::pdu::Pdu;

static EXPLICIT_LE: &str = "1.2.840.10008.1.2.1";
static IMPLICIT_LE: &str = "1.2.840.10008.1.2";

/// Receive PDUs on the association until one DIMSE message completes.
fn receive_message(association: &mut dcmkit_ul::ServerAssociation) -> Option<Message> {
    let mut reassembler = Reassembler::new();
    loop {
        match association.receive() {
            Ok(Pdu::PData { data }) => {
                for pdv in data {
                    if let Some(message) = reassembler.ingest(pdv).unwrap() {
                        return Some(message);
                    }
                }
            }
            Ok(Pdu::ReleaseRq) => return None,
            Ok(pdu) => panic!("unexpected PDU {:?}", pdu),
            Err(e) => panic!("receive failed: {:?}", e),
        }
    }
}

/// Receive PDUs on the client association until one message completes.
fn receive_response(association: &mut dcmkit_ul::ClientAssociation) -> Message {
    let mut reassembler = Reassembler::new();
    loop {
        match association.receive() {
            Ok(Pdu::PData { data }) => {
                for pdv in data {
                    if let Some(message) = reassembler.ingest(pdv).unwrap() {
                        return message;
                    }
                }
            }
            Ok(pdu) => panic!("unexpected PDU {:?}", pdu),
            Err(e) => panic!("receive failed: {:?}", e),
        }
    }
}

#[test]
fn c_echo_round_trip() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();

    let server = thread::spawn(move || {
        let (stream, _) = listener.accept().unwrap();
        let mut association = ServerAssociationOptions::new()
            .ae_title("ECHO-SCP")
            .with_abstract_syntax(uids::VERIFICATION)
            .establish(stream)
            .unwrap();

        let message = receive_message(&mut association).expect("echo request");
        let command = &message.command;
        assert_eq!(command.command_field().unwrap(), CommandField::CEchoRq);
        assert_eq!(command.message_id(), Some(1));
        assert!(message.data.is_none());

        let response = CommandSet::echo_rsp(command, 0x0000);
        for pdu in fragment_message(
            message.presentation_context_id,
            &response,
            None,
            association.send_max_pdu_length(),
        )
        .unwrap()
        {
            association.send(&pdu).unwrap();
        }

        // serve until release; both sides end in Idle
        assert!(receive_message(&mut association).is_none());
        assert_eq!(association.state(), State::Idle);
    });

    let mut association = ClientAssociationOptions::new()
        .calling_ae_title("ECHO-SCU")
        .called_ae_title("ECHO-SCP")
        .with_presentation_context(uids::VERIFICATION, vec![EXPLICIT_LE])
        .establish(addr)
        .unwrap();

    let pc_id = association.presentation_contexts()[0].id;
    let request = CommandSet::echo_rq(1);
    for pdu in
        fragment_message(pc_id, &request, None, association.send_max_pdu_length()).unwrap()
    {
        association.send(&pdu).unwrap();
    }

    let response = receive_response(&mut association);
    assert_eq!(
        response.command.command_field().unwrap(),
        CommandField::CEchoRsp
    );
    assert_eq!(response.command.status(), Some(0x0000));
    assert_eq!(response.command.message_id_being_responded_to(), Some(1));
    assert_eq!(StatusClass::of(response.command.status().unwrap()), StatusClass::Success);

    association.release().unwrap();
    assert_eq!(association.state(), State::Idle);
    server.join().unwrap();
}

fn sample_ct_object() -> InMemObject {
    let mut obj = InMemObject::new_empty();
    obj.put(element(tags::SOP_CLASS_UID, uids::CT_IMAGE_STORAGE));
    obj.put(element(tags::SOP_INSTANCE_UID, "1.2.3.4.5"));
    obj.put(element(tags::STUDY_INSTANCE_UID, "1.2.3.4"));
    obj.put(element(tags::SERIES_INSTANCE_UID, "1.2.3.4.1"));
    obj.put(element(tags::MODALITY, "CT"));
    obj.put(element(tags::PATIENT_NAME, "DOE^JOHN"));
    obj.put(element(tags::PATIENT_ID, "P001"));
    obj.put(element(tags::ROWS, 512u16));
    obj.put(element(tags::COLUMNS, 512u16));
    obj.put(element(tags::BITS_ALLOCATED, 16u16));
    obj.put(element(tags::BITS_STORED, 12u16));
    obj.put(element(tags::HIGH_BIT, 11u16));
    obj.put(element(tags::PIXEL_REPRESENTATION, 0u16));
    obj.put(element(tags::SAMPLES_PER_PIXEL, 1u16));
    obj.put(element(tags::PHOTOMETRIC_INTERPRETATION, "MONOCHROME2"));
    let pixels: Vec<u8> = (0..512usize * 512 * 2).map(|i| (i % 256) as u8).collect();
    obj.put(DataElement::new(
        tags::PIXEL_DATA,
        VR::OW,
        Value::Primitive(PrimitiveValue::from(pixels)),
    ));
    obj
}

#[test]
fn c_store_of_a_ct_image() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    let store_dir = tempfile::tempdir().unwrap();
    let stored_path = store_dir.path().join("received.dcm");
    let stored_path_server = stored_path.clone();

    let server = thread::spawn(move || {
        let (stream, _) = listener.accept().unwrap();
        let mut association = ServerAssociationOptions::new()
            .ae_title("STORE-SCP")
            .with_abstract_syntax(uids::CT_IMAGE_STORAGE)
            .establish(stream)
            .unwrap();

        let contexts = association.presentation_contexts().to_vec();
        let message = receive_message(&mut association).expect("store request");
        let command = &message.command;
        assert_eq!(command.command_field().unwrap(), CommandField::CStoreRq);
        assert_eq!(command.affected_sop_instance_uid().unwrap(), "1.2.3.4.5");

        // decode the data set in the negotiated transfer syntax
        let context = contexts
            .iter()
            .find(|pc| pc.id == message.presentation_context_id)
            .unwrap();
        assert_eq!(context.transfer_syntax, EXPLICIT_LE);
        let ts = dcmkit_encoding::TransferSyntaxRegistry
            .get(&context.transfer_syntax)
            .unwrap();
        let dataset =
            InMemObject::read_dataset_with_ts(&message.data.as_deref().unwrap()[..], ts).unwrap();

        // hand the object to storage
        let meta = FileMetaTableBuilder::new()
            .media_storage_sop_class_uid(command.affected_sop_class_uid().unwrap())
            .media_storage_sop_instance_uid(command.affected_sop_instance_uid().unwrap())
            .transfer_syntax(context.transfer_syntax.clone())
            .build()
            .unwrap();
        FileObject::new(meta, dataset)
            .save(&stored_path_server)
            .unwrap();

        let response = CommandSet::store_rsp(command, 0x0000);
        for pdu in fragment_message(
            message.presentation_context_id,
            &response,
            None,
            association.send_max_pdu_length(),
        )
        .unwrap()
        {
            association.send(&pdu).unwrap();
        }

        assert!(receive_message(&mut association).is_none());
    });

    let source = sample_ct_object();

    let mut association = ClientAssociationOptions::new()
        .calling_ae_title("STORE-SCU")
        .called_ae_title("STORE-SCP")
        .with_presentation_context(uids::CT_IMAGE_STORAGE, vec![EXPLICIT_LE, IMPLICIT_LE])
        .establish(addr)
        .unwrap();

    let context = association.presentation_contexts()[0].clone();
    assert_eq!(context.transfer_syntax, EXPLICIT_LE);

    let ts = dcmkit_encoding::TransferSyntaxRegistry
        .get(&context.transfer_syntax)
        .unwrap();
    let mut dataset_bytes = Vec::new();
    source.write_dataset_with_ts(&mut dataset_bytes, ts).unwrap();

    let request = CommandSet::store_rq(
        1,
        uids::CT_IMAGE_STORAGE,
        "1.2.3.4.5",
        Priority::Medium,
    );
    for pdu in fragment_message(
        context.id,
        &request,
        Some(&dataset_bytes),
        association.send_max_pdu_length(),
    )
    .unwrap()
    {
        association.send(&pdu).unwrap();
    }

    let response = receive_response(&mut association);
    assert_eq!(
        response.command.command_field().unwrap(),
        CommandField::CStoreRsp
    );
    assert_eq!(response.command.status(), Some(0x0000));

    association.release().unwrap();
    server.join().unwrap();

    // the stored file re-read from disk equals the source data set
    let read_back = open_file(&stored_path).unwrap();
    assert_eq!(read_back.object(), &source);
}

#[test]
fn c_find_two_matches_then_success() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();

    let server = thread::spawn(move || {
        let (stream, _) = listener.accept().unwrap();
        let mut association = ServerAssociationOptions::new()
            .with_abstract_syntax(uids::STUDY_ROOT_QUERY_RETRIEVE_INFORMATION_MODEL_FIND)
            .establish(stream)
            .unwrap();

        let message = receive_message(&mut association).expect("find request");
        let command = &message.command;
        assert_eq!(command.command_field().unwrap(), CommandField::CFindRq);

        let ts = dcmkit_encoding::transfer_syntax::entries::EXPLICIT_VR_LITTLE_ENDIAN;
        let identifier =
            InMemObject::read_dataset_with_ts(&message.data.as_deref().unwrap()[..], &ts).unwrap();
        let model = dcmkit_dimse::InformationModel::StudyRoot;
        assert_eq!(
            model.level_of(&identifier).unwrap(),
            dcmkit_dimse::QueryRetrieveLevel::Study
        );
        assert_eq!(
            identifier.string_value(tags::PATIENT_NAME).unwrap(),
            "DOE^*"
        );

        // two pending responses, each with a match data set
        for study_uid in ["1.2.3.100", "1.2.3.200"] {
            let mut matched = InMemObject::new_empty();
            matched.put(element(tags::QUERY_RETRIEVE_LEVEL, "STUDY"));
            matched.put(element(tags::STUDY_INSTANCE_UID, study_uid));
            let mut match_bytes = Vec::new();
            matched.write_dataset_with_ts(&mut match_bytes, &ts).unwrap();

            let response = CommandSet::find_rsp(command, 0xFF00, true);
            for pdu in fragment_message(
                message.presentation_context_id,
                &response,
                Some(&match_bytes),
                association.send_max_pdu_length(),
            )
            .unwrap()
            {
                association.send(&pdu).unwrap();
            }
        }

        // the final response carries no data set
        let done = CommandSet::find_rsp(command, 0x0000, false);
        for pdu in fragment_message(
            message.presentation_context_id,
            &done,
            None,
            association.send_max_pdu_length(),
        )
        .unwrap()
        {
            association.send(&pdu).unwrap();
        }

        assert!(receive_message(&mut association).is_none());
    });

    let mut association = ClientAssociationOptions::new()
        .with_presentation_context(
            uids::STUDY_ROOT_QUERY_RETRIEVE_INFORMATION_MODEL_FIND,
            vec![EXPLICIT_LE],
        )
        .establish(addr)
        .unwrap();

    let context = association.presentation_contexts()[0].clone();
    let ts = dcmkit_encoding::TransferSyntaxRegistry
        .get(&context.transfer_syntax)
        .unwrap();

    // identifier: study level, wildcard patient name, study UID returned
    let mut identifier = InMemObject::new_empty();
    identifier.put(element(tags::QUERY_RETRIEVE_LEVEL, "STUDY"));
    identifier.put(element(tags::PATIENT_NAME, "DOE^*"));
    identifier.put(element(tags::STUDY_INSTANCE_UID, ""));
    let mut identifier_bytes = Vec::new();
    identifier
        .write_dataset_with_ts(&mut identifier_bytes, ts)
        .unwrap();

    let request = CommandSet::find_rq(
        1,
        uids::STUDY_ROOT_QUERY_RETRIEVE_INFORMATION_MODEL_FIND,
        Priority::Medium,
    );
    let mut pending = dcmkit_dimse::PendingRequests::new();
    pending.register(context.id, &request).unwrap();
    for pdu in fragment_message(
        context.id,
        &request,
        Some(&identifier_bytes),
        association.send_max_pdu_length(),
    )
    .unwrap()
    {
        association.send(&pdu).unwrap();
    }

    // exactly three responses, in order: pending, pending, success
    let mut study_uids = Vec::new();
    let mut statuses = Vec::new();
    loop {
        let response = receive_response(&mut association);
        let status = response.command.status().unwrap();
        statuses.push(status);
        assert!(pending.take_match(&response).is_some());
        match StatusClass::of(status) {
            StatusClass::Pending => {
                let matched = InMemObject::read_dataset_with_ts(
                    &response.data.as_deref().unwrap()[..],
                    ts,
                )
                .unwrap();
                study_uids.push(matched.string_value(tags::STUDY_INSTANCE_UID).unwrap());
            }
            StatusClass::Success => {
                assert!(response.data.is_none());
                break;
            }
            other => panic!("unexpected status class {:?}", other),
        }
    }
    assert_eq!(statuses, vec![0xFF00, 0xFF00, 0x0000]);
    assert_eq!(study_uids, vec!["1.2.3.100", "1.2.3.200"]);
    assert!(pending.is_empty());

    association.release().unwrap();
    server.join().unwrap();
}

#[test]
fn artim_expiry_during_release() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    let (hold_tx, hold_rx) = mpsc::channel::<()>();

    // a misbehaving peer: accepts the association but never
    // answers the release request
    let server = thread::spawn(move || {
        use dcmkit_ul::pdu::{read_pdu, write_pdu, MAXIMUM_PDU_SIZE};
        let (mut stream, _) = listener.accept().unwrap();
        let request = match read_pdu(&mut stream, MAXIMUM_PDU_SIZE, true).unwrap() {
            Pdu::AssociationRq(rq) => rq,
            pdu => panic!("expected association request, got {:?}", pdu),
        };
        let response = Pdu::AssociationAc(dcmkit_ul::pdu::AssociationAc {
            protocol_version: 1,
            calling_ae_title: request.calling_ae_title.clone(),
            called_ae_title: request.called_ae_title.clone(),
            application_context_name: request.application_context_name.clone(),
            presentation_contexts: request
                .presentation_contexts
                .iter()
                .map(|pc| dcmkit_ul::pdu::PresentationContextResult {
                    id: pc.id,
                    reason: dcmkit_ul::pdu::PresentationContextResultReason::Acceptance,
                    transfer_syntax: pc.transfer_syntaxes[0].clone(),
                })
                .collect(),
            user_variables: vec![],
        });
        write_pdu(&mut stream, &response).unwrap();

        // swallow the release request and go quiet
        let _ = read_pdu(&mut stream, MAXIMUM_PDU_SIZE, true);
        let _ = hold_rx.recv_timeout(Duration::from_secs(10));
    });

    let mut association = ClientAssociationOptions::new()
        .with_presentation_context(uids::VERIFICATION, vec![EXPLICIT_LE])
        .artim_timeout(Some(Duration::from_millis(300)))
        .establish(addr)
        .unwrap();
    assert_eq!(association.state(), State::Established);

    let outcome = association.release();
    assert!(matches!(
        outcome,
        Err(Error::Timeout {
            class: TimeoutClass::Association,
            ..
        })
    ));
    assert_eq!(association.state(), State::Idle);

    let _ = hold_tx.send(());
    server.join().unwrap();
}
