//! Encoding of PDUs into a byte stream.

use super::*;
use byteordered::byteorder::{BigEndian, WriteBytesExt};
use snafu::{ensure, Backtrace, ResultExt, Snafu};
use std::io::Write;

/// An error while encoding a PDU.
#[derive(Debug, Snafu)]
#[non_exhaustive]
pub enum Error {
    #[snafu(display("could not write PDU field `{}`", field))]
    WritePduField {
        field: &'static str,
        source: std::io::Error,
        backtrace: Backtrace,
    },

    #[snafu(display("item of {} bytes does not fit in a 16-bit length field", length))]
    ItemTooLong { length: usize, backtrace: Backtrace },

    #[snafu(display(
        "application entity title `{}` is not 1 to 16 printable characters",
        title
    ))]
    InvalidAeTitle { title: String, backtrace: Backtrace },
}

pub type Result<T> = std::result::Result<T, Error>;

/// Whether a string is a conforming application entity title:
/// 1 to 16 printable ASCII characters, not all spaces.
pub fn is_valid_ae_title(title: &str) -> bool {
    !title.trim().is_empty()
        && title.len() <= 16
        && title
            .bytes()
            .all(|b| (0x20..=0x7E).contains(&b) && b != b'\\')
}

/// Write a PDU to the given stream.
pub fn write_pdu<W>(writer: &mut W, pdu: &Pdu) -> Result<()>
where
    W: Write,
{
    match pdu {
        Pdu::AssociationRq(AssociationRq {
            protocol_version,
            calling_ae_title,
            called_ae_title,
            application_context_name,
            presentation_contexts,
            user_variables,
        }) => {
            let mut payload = Vec::with_capacity(128);
            payload
                .write_u16::<BigEndian>(*protocol_version)
                .context(WritePduFieldSnafu {
                    field: "Protocol-version",
                })?;
            payload.extend_from_slice(&[0, 0]);
            write_ae_title(&mut payload, called_ae_title)?;
            write_ae_title(&mut payload, calling_ae_title)?;
            payload.extend_from_slice(&[0u8; 32]);

            write_application_context(&mut payload, application_context_name)?;
            for pc in presentation_contexts {
                write_presentation_context_proposed(&mut payload, pc)?;
            }
            write_user_information(&mut payload, user_variables)?;

            write_pdu_header(writer, 0x01, &payload)
        }
        Pdu::AssociationAc(AssociationAc {
            protocol_version,
            calling_ae_title,
            called_ae_title,
            application_context_name,
            presentation_contexts,
            user_variables,
        }) => {
            let mut payload = Vec::with_capacity(128);
            payload
                .write_u16::<BigEndian>(*protocol_version)
                .context(WritePduFieldSnafu {
                    field: "Protocol-version",
                })?;
            payload.extend_from_slice(&[0, 0]);
            // the AE title fields of an AC are echoes of the RQ
            write_ae_title(&mut payload, called_ae_title)?;
            write_ae_title(&mut payload, calling_ae_title)?;
            payload.extend_from_slice(&[0u8; 32]);

            write_application_context(&mut payload, application_context_name)?;
            for pc in presentation_contexts {
                write_presentation_context_result(&mut payload, pc)?;
            }
            write_user_information(&mut payload, user_variables)?;

            write_pdu_header(writer, 0x02, &payload)
        }
        Pdu::AssociationRj(AssociationRj { result, source }) => {
            let (source_code, reason_code) = source.codes();
            let payload = [0, result.code(), source_code, reason_code];
            write_pdu_header(writer, 0x03, &payload)
        }
        Pdu::PData { data } => {
            let mut payload = Vec::with_capacity(
                data.iter().map(|pdv| pdv.data.len() + 6).sum::<usize>(),
            );
            for pdv in data {
                payload
                    .write_u32::<BigEndian>(pdv.data.len() as u32 + 2)
                    .context(WritePduFieldSnafu {
                        field: "Item-length",
                    })?;
                payload.push(pdv.presentation_context_id);
                let mut control = 0u8;
                if pdv.value_type == PDataValueType::Command {
                    control |= 0x01;
                }
                if pdv.is_last {
                    control |= 0x02;
                }
                payload.push(control);
                payload.extend_from_slice(&pdv.data);
            }
            write_pdu_header(writer, 0x04, &payload)
        }
        Pdu::ReleaseRq => write_pdu_header(writer, 0x05, &[0u8; 4]),
        Pdu::ReleaseRp => write_pdu_header(writer, 0x06, &[0u8; 4]),
        Pdu::AbortRq { source } => {
            let (source_code, reason_code) = source.codes();
            let payload = [0, 0, source_code, reason_code];
            write_pdu_header(writer, 0x07, &payload)
        }
        Pdu::Unknown { pdu_type, data } => write_pdu_header(writer, *pdu_type, data),
    }
}

fn write_pdu_header<W: Write>(writer: &mut W, pdu_type: u8, payload: &[u8]) -> Result<()> {
    writer
        .write_all(&[pdu_type, 0])
        .context(WritePduFieldSnafu { field: "type" })?;
    writer
        .write_u32::<BigEndian>(payload.len() as u32)
        .context(WritePduFieldSnafu { field: "length" })?;
    writer
        .write_all(payload)
        .context(WritePduFieldSnafu { field: "payload" })
}

fn write_ae_title(writer: &mut Vec<u8>, title: &str) -> Result<()> {
    ensure!(is_valid_ae_title(title), InvalidAeTitleSnafu { title });
    let mut bytes = [b' '; 16];
    bytes[..title.len()].copy_from_slice(title.as_bytes());
    writer.extend_from_slice(&bytes);
    Ok(())
}

fn write_item(writer: &mut Vec<u8>, item_type: u8, content: &[u8]) -> Result<()> {
    ensure!(
        content.len() <= u16::MAX as usize,
        ItemTooLongSnafu {
            length: content.len(),
        }
    );
    writer.push(item_type);
    writer.push(0);
    writer
        .write_u16::<BigEndian>(content.len() as u16)
        .context(WritePduFieldSnafu {
            field: "Item-length",
        })?;
    writer.extend_from_slice(content);
    Ok(())
}

fn write_application_context(writer: &mut Vec<u8>, name: &str) -> Result<()> {
    write_item(writer, 0x10, name.as_bytes())
}

fn write_presentation_context_proposed(
    writer: &mut Vec<u8>,
    pc: &PresentationContextProposed,
) -> Result<()> {
    let mut content = Vec::with_capacity(64);
    content.extend_from_slice(&[pc.id, 0, 0, 0]);
    write_item(&mut content, 0x30, pc.abstract_syntax.as_bytes())?;
    for ts in &pc.transfer_syntaxes {
        write_item(&mut content, 0x40, ts.as_bytes())?;
    }
    write_item(writer, 0x20, &content)
}

fn write_presentation_context_result(
    writer: &mut Vec<u8>,
    pc: &PresentationContextResult,
) -> Result<()> {
    let mut content = Vec::with_capacity(48);
    content.extend_from_slice(&[pc.id, 0, pc.reason.code(), 0]);
    write_item(&mut content, 0x40, pc.transfer_syntax.as_bytes())?;
    write_item(writer, 0x21, &content)
}

fn write_user_information(
    writer: &mut Vec<u8>,
    user_variables: &[UserVariableItem],
) -> Result<()> {
    let mut content = Vec::with_capacity(64);
    for item in user_variables {
        match item {
            UserVariableItem::MaxLength(max_length) => {
                content.push(0x51);
                content.push(0);
                content
                    .write_u16::<BigEndian>(4)
                    .context(WritePduFieldSnafu {
                        field: "Item-length",
                    })?;
                content
                    .write_u32::<BigEndian>(*max_length)
                    .context(WritePduFieldSnafu {
                        field: "Maximum-length-received",
                    })?;
            }
            UserVariableItem::ImplementationClassUid(uid) => {
                write_item(&mut content, 0x52, uid.as_bytes())?;
            }
            UserVariableItem::AsynchronousOperationsWindow(invoked, performed) => {
                let mut sub = Vec::with_capacity(4);
                sub.write_u16::<BigEndian>(*invoked)
                    .context(WritePduFieldSnafu {
                        field: "Maximum-number-operations-invoked",
                    })?;
                sub.write_u16::<BigEndian>(*performed)
                    .context(WritePduFieldSnafu {
                        field: "Maximum-number-operations-performed",
                    })?;
                write_item(&mut content, 0x53, &sub)?;
            }
            UserVariableItem::RoleSelection {
                sop_class_uid,
                scu,
                scp,
            } => {
                let mut sub = Vec::with_capacity(sop_class_uid.len() + 4);
                sub.write_u16::<BigEndian>(sop_class_uid.len() as u16)
                    .context(WritePduFieldSnafu {
                        field: "SOP-class-uid-length",
                    })?;
                sub.extend_from_slice(sop_class_uid.as_bytes());
                sub.push(*scu as u8);
                sub.push(*scp as u8);
                write_item(&mut content, 0x54, &sub)?;
            }
            UserVariableItem::ImplementationVersionName(name) => {
                write_item(&mut content, 0x55, name.as_bytes())?;
            }
            UserVariableItem::SopClassExtendedNegotiation(uid, info) => {
                let mut sub = Vec::with_capacity(uid.len() + info.len() + 4);
                sub.write_u16::<BigEndian>(uid.len() as u16)
                    .context(WritePduFieldSnafu {
                        field: "SOP-class-uid-length",
                    })?;
                sub.extend_from_slice(uid.as_bytes());
                sub.write_u16::<BigEndian>(info.len() as u16)
                    .context(WritePduFieldSnafu {
                        field: "Service-class-application-information-length",
                    })?;
                sub.extend_from_slice(info);
                write_item(&mut content, 0x56, &sub)?;
            }
            UserVariableItem::UserIdentity(identity) => {
                let mut sub = Vec::with_capacity(identity.primary_field.len() + 8);
                sub.push(identity.identity_type.code());
                sub.push(identity.positive_response_requested as u8);
                sub.write_u16::<BigEndian>(identity.primary_field.len() as u16)
                    .context(WritePduFieldSnafu {
                        field: "User-Identity-primary-field-length",
                    })?;
                sub.extend_from_slice(&identity.primary_field);
                sub.write_u16::<BigEndian>(identity.secondary_field.len() as u16)
                    .context(WritePduFieldSnafu {
                        field: "User-Identity-secondary-field-length",
                    })?;
                sub.extend_from_slice(&identity.secondary_field);
                write_item(&mut content, 0x58, &sub)?;
            }
            UserVariableItem::Unknown(sub_type, data) => {
                write_item(&mut content, *sub_type, data)?;
            }
        }
    }
    write_item(writer, 0x50, &content)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pdu::{read_pdu, DEFAULT_MAX_PDU};

    fn round_trip(pdu: Pdu) {
        let mut encoded = Vec::new();
        write_pdu(&mut encoded, &pdu).expect("write");
        let decoded = read_pdu(&mut &encoded[..], DEFAULT_MAX_PDU, true).expect("read");
        assert_eq!(decoded, pdu);
    }

    #[test]
    fn association_rq_round_trip() {
        round_trip(Pdu::AssociationRq(AssociationRq {
            protocol_version: 1,
            calling_ae_title: "THIS-SCU".to_string(),
            called_ae_title: "ANY-SCP".to_string(),
            application_context_name: "1.2.840.10008.3.1.1.1".to_string(),
            presentation_contexts: vec![PresentationContextProposed {
                id: 1,
                abstract_syntax: "1.2.840.10008.1.1".to_string(),
                transfer_syntaxes: vec![
                    "1.2.840.10008.1.2.1".to_string(),
                    "1.2.840.10008.1.2".to_string(),
                ],
            }],
            user_variables: vec![
                UserVariableItem::MaxLength(16384),
                UserVariableItem::ImplementationClassUid("1.2.3.4".to_string()),
                UserVariableItem::ImplementationVersionName("DCMKIT_010".to_string()),
                UserVariableItem::AsynchronousOperationsWindow(1, 1),
                UserVariableItem::RoleSelection {
                    sop_class_uid: "1.2.840.10008.5.1.4.1.1.2".to_string(),
                    scu: true,
                    scp: false,
                },
            ],
        }));
    }

    #[test]
    fn association_ac_round_trip() {
        round_trip(Pdu::AssociationAc(AssociationAc {
            protocol_version: 1,
            calling_ae_title: "THIS-SCU".to_string(),
            called_ae_title: "ANY-SCP".to_string(),
            application_context_name: "1.2.840.10008.3.1.1.1".to_string(),
            presentation_contexts: vec![
                PresentationContextResult {
                    id: 1,
                    reason: PresentationContextResultReason::Acceptance,
                    transfer_syntax: "1.2.840.10008.1.2.1".to_string(),
                },
                PresentationContextResult {
                    id: 3,
                    reason: PresentationContextResultReason::AbstractSyntaxNotSupported,
                    transfer_syntax: "1.2.840.10008.1.2".to_string(),
                },
            ],
            user_variables: vec![UserVariableItem::MaxLength(32768)],
        }));
    }

    #[test]
    fn association_rj_round_trip() {
        round_trip(Pdu::AssociationRj(AssociationRj {
            result: AssociationRjResult::Permanent,
            source: AssociationRjSource::ServiceUser(
                ServiceUserReason::ApplicationContextNameNotSupported,
            ),
        }));
    }

    #[test]
    fn pdata_round_trip() {
        round_trip(Pdu::PData {
            data: vec![
                PDataValue {
                    presentation_context_id: 1,
                    value_type: PDataValueType::Command,
                    is_last: true,
                    data: vec![1, 2, 3, 4],
                },
                PDataValue {
                    presentation_context_id: 1,
                    value_type: PDataValueType::Data,
                    is_last: false,
                    data: vec![9; 128],
                },
            ],
        });
    }

    #[test]
    fn release_and_abort_round_trips() {
        round_trip(Pdu::ReleaseRq);
        round_trip(Pdu::ReleaseRp);
        round_trip(Pdu::AbortRq {
            source: AbortSource::ServiceUser,
        });
        round_trip(Pdu::AbortRq {
            source: AbortSource::ServiceProvider(AbortServiceProviderReason::UnexpectedPdu),
        });
    }

    #[test]
    fn user_identity_round_trip() {
        round_trip(Pdu::AssociationRq(AssociationRq {
            protocol_version: 1,
            calling_ae_title: "SCU".to_string(),
            called_ae_title: "SCP".to_string(),
            application_context_name: "1.2.840.10008.3.1.1.1".to_string(),
            presentation_contexts: vec![PresentationContextProposed {
                id: 1,
                abstract_syntax: "1.2.840.10008.1.1".to_string(),
                transfer_syntaxes: vec!["1.2.840.10008.1.2".to_string()],
            }],
            user_variables: vec![UserVariableItem::UserIdentity(UserIdentity {
                positive_response_requested: true,
                identity_type: UserIdentityType::UsernameAndPasscode,
                primary_field: b"user".to_vec(),
                secondary_field: b"secret".to_vec(),
            })],
        }));
    }

    #[test]
    fn ae_title_validation() {
        assert!(is_valid_ae_title("STORE-SCP"));
        assert!(is_valid_ae_title("A"));
        assert!(!is_valid_ae_title(""));
        assert!(!is_valid_ae_title("    "));
        assert!(!is_valid_ae_title("SEVENTEEN-CHARSXX"));
        assert!(!is_valid_ae_title("BAD\\TITLE"));
    }

    #[test]
    fn truncated_pdu_is_malformed() {
        let pdu = Pdu::AssociationRj(AssociationRj {
            result: AssociationRjResult::Permanent,
            source: AssociationRjSource::ServiceUser(ServiceUserReason::NoReasonGiven),
        });
        let mut encoded = Vec::new();
        write_pdu(&mut encoded, &pdu).unwrap();
        // drop the last byte without fixing the length field
        encoded.pop();
        let err = read_pdu(&mut &encoded[..], DEFAULT_MAX_PDU, true).unwrap_err();
        assert!(matches!(
            err,
            crate::pdu::reader::Error::MalformedPdu { pdu_type: 3, .. }
        ));
    }
}
