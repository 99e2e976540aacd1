//! Decoding of PDUs from a byte stream.

use super::*;
use byteordered::byteorder::{BigEndian, ReadBytesExt};
use dcmkit_encoding::text::{DefaultCharacterSetCodec, TextCodec};
use snafu::{ensure, Backtrace, OptionExt, ResultExt, Snafu};
use std::io::{Cursor, ErrorKind, Read, Seek, SeekFrom};
use tracing::warn;

/// An error while decoding a PDU.
#[derive(Debug, Snafu)]
#[non_exhaustive]
pub enum Error {
    #[snafu(display("invalid max PDU length {}", max_pdu_length))]
    InvalidMaxPdu {
        max_pdu_length: u32,
        backtrace: Backtrace,
    },

    /// The stream ended before a PDU could begin.
    #[snafu(display("no PDU available"))]
    NoPduAvailable { backtrace: Backtrace },

    #[snafu(display("could not read PDU"))]
    ReadPdu {
        source: std::io::Error,
        backtrace: Backtrace,
    },

    #[snafu(display("could not read PDU field `{}` at offset {}", field, offset))]
    ReadPduField {
        field: &'static str,
        offset: u64,
        source: std::io::Error,
        backtrace: Backtrace,
    },

    #[snafu(display("PDU of type {:#04x} is malformed at offset {}", pdu_type, offset))]
    MalformedPdu {
        pdu_type: u8,
        offset: u64,
        backtrace: Backtrace,
    },

    #[snafu(display(
        "incoming PDU of {} bytes exceeds the maximum of {}",
        pdu_length,
        max_pdu_length
    ))]
    PduTooLarge {
        pdu_length: u32,
        max_pdu_length: u32,
        backtrace: Backtrace,
    },

    #[snafu(display("could not decode text field `{}`", field))]
    DecodeText {
        field: &'static str,
        #[snafu(backtrace)]
        source: dcmkit_encoding::text::DecodeTextError,
    },

    #[snafu(display("missing application context name item"))]
    MissingApplicationContextName { backtrace: Backtrace },

    #[snafu(display("missing abstract syntax sub-item"))]
    MissingAbstractSyntax { backtrace: Backtrace },

    #[snafu(display("missing transfer syntax sub-item"))]
    MissingTransferSyntax { backtrace: Backtrace },
}

pub type Result<T> = std::result::Result<T, Error>;

/// Read a PDU from the given stream.
///
/// `max_pdu_length` bounds the admitted PDU length; in `strict`
/// mode an oversized PDU is an error, otherwise it is tolerated
/// up to [`MAXIMUM_PDU_SIZE`] with a warning.
pub fn read_pdu<R>(reader: &mut R, max_pdu_length: u32, strict: bool) -> Result<Pdu>
where
    R: Read,
{
    ensure!(
        (MINIMUM_PDU_SIZE..=MAXIMUM_PDU_SIZE).contains(&max_pdu_length),
        InvalidMaxPduSnafu { max_pdu_length }
    );

    // Failing to read the first two bytes means that no PDU
    // arrived at all (e.g. the stream closed between messages),
    // which callers may treat as a non-event.
    let mut head = [0u8; 2];
    if let Err(e) = reader.read_exact(&mut head) {
        ensure!(e.kind() != ErrorKind::UnexpectedEof, NoPduAvailableSnafu);
        return Err(e).context(ReadPduFieldSnafu {
            field: "type",
            offset: 0u64,
        });
    }

    let pdu_type = head[0];
    let pdu_length = reader.read_u32::<BigEndian>().context(ReadPduFieldSnafu {
        field: "length",
        offset: 2u64,
    })?;

    if pdu_length > max_pdu_length {
        if strict {
            return PduTooLargeSnafu {
                pdu_length,
                max_pdu_length,
            }
            .fail();
        }
        ensure!(
            pdu_length <= MAXIMUM_PDU_SIZE,
            PduTooLargeSnafu {
                pdu_length,
                max_pdu_length: MAXIMUM_PDU_SIZE,
            }
        );
        warn!(
            "incoming PDU of {} bytes exceeds the negotiated maximum of {}",
            pdu_length, max_pdu_length
        );
    }

    let payload = read_n(reader, pdu_length as usize).context(ReadPduSnafu)?;
    ensure!(
        payload.len() == pdu_length as usize,
        MalformedPduSnafu {
            pdu_type,
            offset: payload.len() as u64,
        }
    );
    let mut cursor = Cursor::new(payload);
    let codec = DefaultCharacterSetCodec;

    match pdu_type {
        0x01 | 0x02 => {
            // A-ASSOCIATE-RQ and A-ASSOCIATE-AC share their frame:
            // protocol version, reserved, called and calling AE
            // titles, 32 reserved bytes, then variable items.
            let protocol_version =
                cursor.read_u16::<BigEndian>().context(ReadPduFieldSnafu {
                    field: "Protocol-version",
                    offset: cursor.position(),
                })?;
            cursor
                .seek(SeekFrom::Current(2))
                .context(ReadPduFieldSnafu {
                    field: "Reserved",
                    offset: cursor.position(),
                })?;

            let called_ae_title = read_ae_title(&mut cursor, &codec, "Called-AE-title")?;
            let calling_ae_title = read_ae_title(&mut cursor, &codec, "Calling-AE-title")?;

            cursor
                .seek(SeekFrom::Current(32))
                .context(ReadPduFieldSnafu {
                    field: "Reserved",
                    offset: cursor.position(),
                })?;

            let mut application_context_name: Option<String> = None;
            let mut proposed = Vec::new();
            let mut results = Vec::new();
            let mut user_variables = Vec::new();

            while cursor.position() < cursor.get_ref().len() as u64 {
                match read_variable_item(&mut cursor, &codec, pdu_type)? {
                    VariableItem::ApplicationContext(name) => {
                        application_context_name = Some(name);
                    }
                    VariableItem::PresentationContextProposed(pc) => proposed.push(pc),
                    VariableItem::PresentationContextResult(pc) => results.push(pc),
                    VariableItem::UserVariables(uv) => user_variables = uv,
                    VariableItem::Unknown(item_type) => {
                        warn!("ignoring unknown variable item {:#04x}", item_type);
                    }
                }
            }

            let application_context_name =
                application_context_name.context(MissingApplicationContextNameSnafu)?;

            if pdu_type == 0x01 {
                Ok(Pdu::AssociationRq(AssociationRq {
                    protocol_version,
                    calling_ae_title,
                    called_ae_title,
                    application_context_name,
                    presentation_contexts: proposed,
                    user_variables,
                }))
            } else {
                Ok(Pdu::AssociationAc(AssociationAc {
                    protocol_version,
                    calling_ae_title,
                    called_ae_title,
                    application_context_name,
                    presentation_contexts: results,
                    user_variables,
                }))
            }
        }
        0x03 => {
            // A-ASSOCIATE-RJ: reserved, result, source, reason
            cursor.read_u8().context(ReadPduFieldSnafu {
                field: "Reserved",
                offset: cursor.position(),
            })?;
            let result_code = cursor.read_u8().context(ReadPduFieldSnafu {
                field: "Result",
                offset: cursor.position(),
            })?;
            let source_code = cursor.read_u8().context(ReadPduFieldSnafu {
                field: "Source",
                offset: cursor.position(),
            })?;
            let reason_code = cursor.read_u8().context(ReadPduFieldSnafu {
                field: "Reason/Diag.",
                offset: cursor.position(),
            })?;

            let result = AssociationRjResult::from_code(result_code).context(
                MalformedPduSnafu {
                    pdu_type,
                    offset: 1u64,
                },
            )?;
            let source = AssociationRjSource::from_codes(source_code, reason_code).context(
                MalformedPduSnafu {
                    pdu_type,
                    offset: 2u64,
                },
            )?;
            Ok(Pdu::AssociationRj(AssociationRj { result, source }))
        }
        0x04 => {
            // P-DATA-TF: one or more presentation data value items
            let mut values = Vec::new();
            while cursor.position() < cursor.get_ref().len() as u64 {
                let item_length = cursor.read_u32::<BigEndian>().context(ReadPduFieldSnafu {
                    field: "Item-length",
                    offset: cursor.position(),
                })?;
                ensure!(
                    item_length >= 2,
                    MalformedPduSnafu {
                        pdu_type,
                        offset: cursor.position(),
                    }
                );

                let presentation_context_id = cursor.read_u8().context(ReadPduFieldSnafu {
                    field: "Presentation-context-ID",
                    offset: cursor.position(),
                })?;

                // The message control header encodes is-command
                // in bit 0 and is-last-fragment in bit 1.
                let control = cursor.read_u8().context(ReadPduFieldSnafu {
                    field: "Message Control Header",
                    offset: cursor.position(),
                })?;
                let value_type = if control & 0x01 != 0 {
                    PDataValueType::Command
                } else {
                    PDataValueType::Data
                };
                let is_last = control & 0x02 != 0;

                let data = read_n(&mut cursor, (item_length - 2) as usize).context(
                    ReadPduFieldSnafu {
                        field: "Presentation-data-value",
                        offset: 0u64,
                    },
                )?;
                ensure!(
                    data.len() == (item_length - 2) as usize,
                    MalformedPduSnafu {
                        pdu_type,
                        offset: cursor.position(),
                    }
                );

                values.push(PDataValue {
                    presentation_context_id,
                    value_type,
                    is_last,
                    data,
                });
            }
            Ok(Pdu::PData { data: values })
        }
        0x05 => {
            // A-RELEASE-RQ: 4 reserved bytes
            cursor
                .seek(SeekFrom::Current(4))
                .context(ReadPduFieldSnafu {
                    field: "Reserved",
                    offset: 0u64,
                })?;
            Ok(Pdu::ReleaseRq)
        }
        0x06 => {
            // A-RELEASE-RP: 4 reserved bytes
            cursor
                .seek(SeekFrom::Current(4))
                .context(ReadPduFieldSnafu {
                    field: "Reserved",
                    offset: 0u64,
                })?;
            Ok(Pdu::ReleaseRp)
        }
        0x07 => {
            // A-ABORT: 2 reserved bytes, source, reason
            let mut reserved = [0u8; 2];
            cursor.read_exact(&mut reserved).context(ReadPduFieldSnafu {
                field: "Reserved",
                offset: 0u64,
            })?;
            let source_code = cursor.read_u8().context(ReadPduFieldSnafu {
                field: "Source",
                offset: cursor.position(),
            })?;
            let reason_code = cursor.read_u8().context(ReadPduFieldSnafu {
                field: "Reason/Diag",
                offset: cursor.position(),
            })?;
            let source = AbortSource::from_codes(source_code, reason_code).context(
                MalformedPduSnafu {
                    pdu_type,
                    offset: 2u64,
                },
            )?;
            Ok(Pdu::AbortRq { source })
        }
        _ => Ok(Pdu::Unknown {
            pdu_type,
            data: cursor.into_inner(),
        }),
    }
}

fn read_n<R>(reader: &mut R, bytes_to_read: usize) -> std::io::Result<Vec<u8>>
where
    R: Read,
{
    let mut result = Vec::with_capacity(bytes_to_read.min(1 << 20));
    reader
        .take(bytes_to_read as u64)
        .read_to_end(&mut result)?;
    Ok(result)
}

fn read_ae_title<R: Read>(
    reader: &mut R,
    codec: &dyn TextCodec,
    field: &'static str,
) -> Result<String> {
    let mut bytes = [0u8; 16];
    reader.read_exact(&mut bytes).context(ReadPduFieldSnafu {
        field,
        offset: 0u64,
    })?;
    Ok(codec
        .decode(&bytes)
        .context(DecodeTextSnafu { field })?
        .trim()
        .to_string())
}

enum VariableItem {
    Unknown(u8),
    ApplicationContext(String),
    PresentationContextProposed(PresentationContextProposed),
    PresentationContextResult(PresentationContextResult),
    UserVariables(Vec<UserVariableItem>),
}

fn read_variable_item<R: Read>(
    reader: &mut R,
    codec: &dyn TextCodec,
    pdu_type: u8,
) -> Result<VariableItem> {
    let item_type = reader.read_u8().context(ReadPduFieldSnafu {
        field: "Item-type",
        offset: 0u64,
    })?;
    reader.read_u8().context(ReadPduFieldSnafu {
        field: "Reserved",
        offset: 0u64,
    })?;
    let item_length = reader.read_u16::<BigEndian>().context(ReadPduFieldSnafu {
        field: "Item-length",
        offset: 0u64,
    })?;
    let payload = read_n(reader, item_length as usize).context(ReadPduSnafu)?;
    ensure!(
        payload.len() == item_length as usize,
        MalformedPduSnafu {
            pdu_type,
            offset: payload.len() as u64,
        }
    );
    let mut cursor = Cursor::new(payload);

    match item_type {
        0x10 => {
            // application context item
            let name = codec
                .decode(cursor.get_ref())
                .context(DecodeTextSnafu {
                    field: "Application-context-name",
                })?
                .trim()
                .to_string();
            Ok(VariableItem::ApplicationContext(name))
        }
        0x20 => {
            // proposed presentation context item
            let id = cursor.read_u8().context(ReadPduFieldSnafu {
                field: "Presentation-context-ID",
                offset: cursor.position(),
            })?;
            cursor
                .seek(SeekFrom::Current(3))
                .context(ReadPduFieldSnafu {
                    field: "Reserved",
                    offset: cursor.position(),
                })?;

            let mut abstract_syntax: Option<String> = None;
            let mut transfer_syntaxes = Vec::new();
            while cursor.position() < cursor.get_ref().len() as u64 {
                let (sub_type, sub_data) = read_sub_item(&mut cursor, pdu_type)?;
                match sub_type {
                    0x30 => {
                        abstract_syntax = Some(decode_uid_text(&sub_data, codec, "Abstract-syntax-name")?);
                    }
                    0x40 => {
                        transfer_syntaxes.push(decode_uid_text(
                            &sub_data,
                            codec,
                            "Transfer-syntax-name",
                        )?);
                    }
                    other => {
                        warn!("ignoring unknown presentation context sub-item {:#04x}", other);
                    }
                }
            }
            Ok(VariableItem::PresentationContextProposed(
                PresentationContextProposed {
                    id,
                    abstract_syntax: abstract_syntax.context(MissingAbstractSyntaxSnafu)?,
                    transfer_syntaxes,
                },
            ))
        }
        0x21 => {
            // presentation context result item
            let id = cursor.read_u8().context(ReadPduFieldSnafu {
                field: "Presentation-context-ID",
                offset: cursor.position(),
            })?;
            cursor.read_u8().context(ReadPduFieldSnafu {
                field: "Reserved",
                offset: cursor.position(),
            })?;
            let reason_code = cursor.read_u8().context(ReadPduFieldSnafu {
                field: "Result/Reason",
                offset: cursor.position(),
            })?;
            let reason =
                PresentationContextResultReason::from_code(reason_code).context(
                    MalformedPduSnafu {
                        pdu_type,
                        offset: cursor.position(),
                    },
                )?;
            cursor.read_u8().context(ReadPduFieldSnafu {
                field: "Reserved",
                offset: cursor.position(),
            })?;

            let mut transfer_syntax: Option<String> = None;
            while cursor.position() < cursor.get_ref().len() as u64 {
                let (sub_type, sub_data) = read_sub_item(&mut cursor, pdu_type)?;
                match sub_type {
                    0x40 if transfer_syntax.is_none() => {
                        transfer_syntax = Some(decode_uid_text(
                            &sub_data,
                            codec,
                            "Transfer-syntax-name",
                        )?);
                    }
                    other => {
                        warn!("ignoring extra presentation context sub-item {:#04x}", other);
                    }
                }
            }
            Ok(VariableItem::PresentationContextResult(
                PresentationContextResult {
                    id,
                    reason,
                    transfer_syntax: transfer_syntax.context(MissingTransferSyntaxSnafu)?,
                },
            ))
        }
        0x50 => {
            // user information item
            let mut user_variables = Vec::new();
            while cursor.position() < cursor.get_ref().len() as u64 {
                let (sub_type, sub_data) = read_sub_item(&mut cursor, pdu_type)?;
                user_variables.push(read_user_variable(sub_type, sub_data, codec, pdu_type)?);
            }
            Ok(VariableItem::UserVariables(user_variables))
        }
        other => Ok(VariableItem::Unknown(other)),
    }
}

fn read_sub_item<R: Read>(reader: &mut R, pdu_type: u8) -> Result<(u8, Vec<u8>)> {
    let sub_type = reader.read_u8().context(ReadPduFieldSnafu {
        field: "Item-type",
        offset: 0u64,
    })?;
    reader.read_u8().context(ReadPduFieldSnafu {
        field: "Reserved",
        offset: 0u64,
    })?;
    let length = reader.read_u16::<BigEndian>().context(ReadPduFieldSnafu {
        field: "Item-length",
        offset: 0u64,
    })?;
    let data = read_n(reader, length as usize).context(ReadPduSnafu)?;
    ensure!(
        data.len() == length as usize,
        MalformedPduSnafu {
            pdu_type,
            offset: data.len() as u64,
        }
    );
    Ok((sub_type, data))
}

fn decode_uid_text(data: &[u8], codec: &dyn TextCodec, field: &'static str) -> Result<String> {
    Ok(codec
        .decode(data)
        .context(DecodeTextSnafu { field })?
        .trim()
        .trim_end_matches('\0')
        .to_string())
}

fn read_user_variable(
    sub_type: u8,
    data: Vec<u8>,
    codec: &dyn TextCodec,
    pdu_type: u8,
) -> Result<UserVariableItem> {
    let mut cursor = Cursor::new(&data);
    match sub_type {
        0x51 => {
            let max_length = cursor.read_u32::<BigEndian>().context(ReadPduFieldSnafu {
                field: "Maximum-length-received",
                offset: 0u64,
            })?;
            Ok(UserVariableItem::MaxLength(max_length))
        }
        0x52 => Ok(UserVariableItem::ImplementationClassUid(decode_uid_text(
            &data,
            codec,
            "Implementation-class-uid",
        )?)),
        0x53 => {
            let invoked = cursor.read_u16::<BigEndian>().context(ReadPduFieldSnafu {
                field: "Maximum-number-operations-invoked",
                offset: 0u64,
            })?;
            let performed = cursor.read_u16::<BigEndian>().context(ReadPduFieldSnafu {
                field: "Maximum-number-operations-performed",
                offset: 2u64,
            })?;
            Ok(UserVariableItem::AsynchronousOperationsWindow(
                invoked, performed,
            ))
        }
        0x54 => {
            let uid_length = cursor.read_u16::<BigEndian>().context(ReadPduFieldSnafu {
                field: "SOP-class-uid-length",
                offset: 0u64,
            })?;
            let uid_bytes = read_n(&mut cursor, uid_length as usize).context(ReadPduSnafu)?;
            let sop_class_uid = decode_uid_text(&uid_bytes, codec, "SOP-class-uid")?;
            let scu = cursor.read_u8().context(ReadPduFieldSnafu {
                field: "SCU-role",
                offset: 0u64,
            })? != 0;
            let scp = cursor.read_u8().context(ReadPduFieldSnafu {
                field: "SCP-role",
                offset: 0u64,
            })? != 0;
            Ok(UserVariableItem::RoleSelection {
                sop_class_uid,
                scu,
                scp,
            })
        }
        0x55 => Ok(UserVariableItem::ImplementationVersionName(
            codec
                .decode(&data)
                .context(DecodeTextSnafu {
                    field: "Implementation-version-name",
                })?
                .trim()
                .to_string(),
        )),
        0x56 => {
            let uid_length = cursor.read_u16::<BigEndian>().context(ReadPduFieldSnafu {
                field: "SOP-class-uid-length",
                offset: 0u64,
            })?;
            let uid_bytes = read_n(&mut cursor, uid_length as usize).context(ReadPduSnafu)?;
            let sop_class_uid = decode_uid_text(&uid_bytes, codec, "SOP-class-uid")?;
            let info_length = cursor.read_u16::<BigEndian>().context(ReadPduFieldSnafu {
                field: "Service-class-application-information-length",
                offset: 0u64,
            })?;
            let info = read_n(&mut cursor, info_length as usize).context(ReadPduSnafu)?;
            Ok(UserVariableItem::SopClassExtendedNegotiation(
                sop_class_uid,
                info,
            ))
        }
        0x58 => {
            let identity_code = cursor.read_u8().context(ReadPduFieldSnafu {
                field: "User-Identity-type",
                offset: 0u64,
            })?;
            let positive_response_requested = cursor.read_u8().context(ReadPduFieldSnafu {
                field: "User-Identity-positive-response-requested",
                offset: 1u64,
            })? == 1;
            let primary_length = cursor.read_u16::<BigEndian>().context(ReadPduFieldSnafu {
                field: "User-Identity-primary-field-length",
                offset: 2u64,
            })?;
            let primary_field =
                read_n(&mut cursor, primary_length as usize).context(ReadPduSnafu)?;
            let secondary_length = cursor.read_u16::<BigEndian>().context(ReadPduFieldSnafu {
                field: "User-Identity-secondary-field-length",
                offset: 0u64,
            })?;
            let secondary_field =
                read_n(&mut cursor, secondary_length as usize).context(ReadPduSnafu)?;

            match UserIdentityType::from_code(identity_code) {
                Some(identity_type) => Ok(UserVariableItem::UserIdentity(UserIdentity {
                    positive_response_requested,
                    identity_type,
                    primary_field,
                    secondary_field,
                })),
                None => {
                    warn!("unknown user identity type code {}", identity_code);
                    Ok(UserVariableItem::Unknown(sub_type, data))
                }
            }
        }
        other => Ok(UserVariableItem::Unknown(other, data)),
    }
}
