//! Fragmentation and reassembly of DIMSE messages.
//!
//! Outbound, a message (command set plus optional data set) is
//! fragmented into presentation data values bounded by the
//! negotiated maximum PDU size, and the fragments are packed into
//! as few P-DATA-TF PDUs as the budget admits. Inbound, fragments
//! are accumulated until the final flags are seen, yielding
//! `(command bytes, optional data set bytes)` pairs.

use crate::command::{self, CommandSet};
use dcmkit_ul::pdu::{PDataValue, PDataValueType, Pdu, MINIMUM_PDU_SIZE, PDU_HEADER_SIZE};
use snafu::{ensure, Backtrace, ResultExt, Snafu};
use std::collections::HashMap;

/// An error during fragmentation, reassembly or pairing.
#[derive(Debug, Snafu)]
#[non_exhaustive]
pub enum Error {
    #[snafu(display("maximum PDU size {} is below the minimum {}", max_pdu, MINIMUM_PDU_SIZE))]
    MaxPduTooSmall { max_pdu: u32, backtrace: Backtrace },

    #[snafu(display("could not encode command set"))]
    EncodeCommand {
        #[snafu(backtrace)]
        source: command::Error,
    },

    #[snafu(display("could not decode command set"))]
    DecodeCommand {
        #[snafu(backtrace)]
        source: command::Error,
    },

    #[snafu(display(
        "presentation context changed mid-message: expected {}, got {}",
        expected,
        got
    ))]
    ProtocolViolation {
        expected: u8,
        got: u8,
        backtrace: Backtrace,
    },

    #[snafu(display("data fragments arrived before the command set was complete"))]
    DataBeforeCommand { backtrace: Backtrace },

    #[snafu(display("message id {} is already pending", message_id))]
    DuplicateMessageId {
        message_id: u16,
        backtrace: Backtrace,
    },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// A fully reassembled DIMSE message.
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    /// the presentation context the message arrived on
    pub presentation_context_id: u8,
    /// the decoded command set
    pub command: CommandSet,
    /// the data set bytes, when the command announces one
    pub data: Option<Vec<u8>>,
}

/// Fragment a message into P-DATA-TF PDUs.
///
/// Every produced PDV carries the given presentation context id
/// and at most `max_pdu_size - 12` bytes of payload; command
/// fragments come first, and the final fragment of each group is
/// flagged as last. Consecutive fragments are packed into a
/// common PDU while they fit.
pub fn fragment_message(
    presentation_context_id: u8,
    command: &CommandSet,
    data: Option<&[u8]>,
    max_pdu_size: u32,
) -> Result<Vec<Pdu>> {
    ensure!(
        max_pdu_size >= MINIMUM_PDU_SIZE,
        MaxPduTooSmallSnafu {
            max_pdu: max_pdu_size,
        }
    );
    let command_bytes = command.encode().context(EncodeCommandSnafu)?;

    // each PDV costs 6 bytes on top of its data
    let budget = (max_pdu_size - PDU_HEADER_SIZE) as usize;
    let max_fragment = budget - 6;

    let mut pdvs = Vec::new();
    push_fragments(
        &mut pdvs,
        presentation_context_id,
        PDataValueType::Command,
        &command_bytes,
        max_fragment,
    );
    if let Some(data) = data {
        push_fragments(
            &mut pdvs,
            presentation_context_id,
            PDataValueType::Data,
            data,
            max_fragment,
        );
    }

    // pack consecutive fragments into common PDUs within budget
    let mut pdus = Vec::new();
    let mut current: Vec<PDataValue> = Vec::new();
    let mut current_size = 0usize;
    for pdv in pdvs {
        let size = pdv.data.len() + 6;
        if !current.is_empty() && current_size + size > budget {
            pdus.push(Pdu::PData {
                data: std::mem::take(&mut current),
            });
            current_size = 0;
        }
        current_size += size;
        current.push(pdv);
    }
    if !current.is_empty() {
        pdus.push(Pdu::PData { data: current });
    }
    Ok(pdus)
}

fn push_fragments(
    pdvs: &mut Vec<PDataValue>,
    presentation_context_id: u8,
    value_type: PDataValueType,
    payload: &[u8],
    max_fragment: usize,
) {
    if payload.is_empty() {
        pdvs.push(PDataValue {
            presentation_context_id,
            value_type,
            is_last: true,
            data: Vec::new(),
        });
        return;
    }
    let mut chunks = payload.chunks(max_fragment).peekable();
    while let Some(chunk) = chunks.next() {
        pdvs.push(PDataValue {
            presentation_context_id,
            value_type,
            is_last: chunks.peek().is_none(),
            data: chunk.to_vec(),
        });
    }
}

#[derive(Debug, Default)]
struct PartialMessage {
    command: Vec<u8>,
    command_complete: bool,
    data: Vec<u8>,
    data_complete: bool,
}

/// Accumulates presentation data values into complete DIMSE
/// messages.
///
/// At most one message is in transit at a time: every fragment of
/// a message carries the same presentation context id, and a
/// context switch before the message completes is a protocol
/// violation.
#[derive(Debug, Default)]
pub struct Reassembler {
    active: Option<(u8, PartialMessage)>,
}

impl Reassembler {
    /// Create an empty reassembler.
    pub fn new() -> Self {
        Reassembler::default()
    }

    /// Ingest one PDV. Returns the completed message once the
    /// final fragment of the message is seen.
    pub fn ingest(&mut self, pdv: PDataValue) -> Result<Option<Message>> {
        let context_id = pdv.presentation_context_id;
        match &self.active {
            Some((expected, _)) if *expected != context_id => {
                return ProtocolViolationSnafu {
                    expected: *expected,
                    got: context_id,
                }
                .fail();
            }
            Some(_) => {}
            None => self.active = Some((context_id, PartialMessage::default())),
        }
        let (_, entry) = self.active.as_mut().expect("partial message present");

        match pdv.value_type {
            PDataValueType::Command => {
                // data in flight means the peer interleaved illegally
                ensure!(!entry.command_complete, DataBeforeCommandSnafu);
                entry.command.extend_from_slice(&pdv.data);
                if pdv.is_last {
                    entry.command_complete = true;
                }
            }
            PDataValueType::Data => {
                ensure!(entry.command_complete, DataBeforeCommandSnafu);
                entry.data.extend_from_slice(&pdv.data);
                if pdv.is_last {
                    entry.data_complete = true;
                }
            }
        }

        if !entry.command_complete {
            return Ok(None);
        }
        let command = CommandSet::decode(&entry.command).context(DecodeCommandSnafu)?;
        let wants_data = command.has_data_set();
        if wants_data && !entry.data_complete {
            return Ok(None);
        }

        let (_, entry) = self.active.take().expect("partial message present");
        Ok(Some(Message {
            presentation_context_id: context_id,
            command,
            data: if wants_data { Some(entry.data) } else { None },
        }))
    }

    /// Ingest every PDV of a P-DATA-TF PDU, returning the messages
    /// completed by it.
    pub fn ingest_pdu(&mut self, pdu: Pdu) -> Result<Vec<Message>> {
        let mut complete = Vec::new();
        if let Pdu::PData { data } = pdu {
            for pdv in data {
                if let Some(message) = self.ingest(pdv)? {
                    complete.push(message);
                }
            }
        }
        Ok(complete)
    }
}

/// Tracks requests awaiting responses, pairing them by
/// `(presentation context id, message id)`.
///
/// Multiple responses for the same message id are admitted until
/// a final status arrives (C-FIND, C-MOVE and C-GET emit pending
/// responses first).
#[derive(Debug, Default)]
pub struct PendingRequests {
    pending: HashMap<(u8, u16), CommandSet>,
}

impl PendingRequests {
    /// Create an empty tracker.
    pub fn new() -> Self {
        PendingRequests::default()
    }

    /// Record an outgoing request. Fails when the message id is
    /// already pending on the same context.
    pub fn register(&mut self, presentation_context_id: u8, request: &CommandSet) -> Result<()> {
        let message_id = request.message_id().unwrap_or(0);
        let key = (presentation_context_id, message_id);
        ensure!(
            !self.pending.contains_key(&key),
            DuplicateMessageIdSnafu { message_id }
        );
        self.pending.insert(key, request.clone());
        Ok(())
    }

    /// Match a response to its pending request. A final status
    /// removes the pairing; pending statuses keep it.
    /// Returns the paired request, if any.
    pub fn take_match(&mut self, message: &Message) -> Option<CommandSet> {
        let message_id = message.command.message_id_being_responded_to()?;
        let key = (message.presentation_context_id, message_id);
        let is_final = message
            .command
            .status()
            .map(|s| crate::status::StatusClass::of(s).is_final())
            .unwrap_or(true);
        if is_final {
            self.pending.remove(&key)
        } else {
            self.pending.get(&key).cloned()
        }
    }

    /// The number of requests awaiting a final response.
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// Whether no request is awaiting a final response.
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Drain all pending requests, e.g. when the association
    /// breaks and every outstanding operation fails.
    pub fn drain(&mut self) -> Vec<CommandSet> {
        self.pending.drain().map(|(_, v)| v).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::Priority;
    use dcmkit_ul::pdu::DEFAULT_MAX_PDU;

    fn pdvs_of(pdus: Vec<Pdu>) -> Vec<PDataValue> {
        pdus.into_iter()
            .flat_map(|pdu| match pdu {
                Pdu::PData { data } => data,
                _ => panic!("expected PData"),
            })
            .collect()
    }

    #[test]
    fn fragment_small_message() {
        let cmd = CommandSet::echo_rq(1);
        let pdus = fragment_message(3, &cmd, None, DEFAULT_MAX_PDU).unwrap();
        assert_eq!(pdus.len(), 1);
        let pdvs = pdvs_of(pdus);
        assert_eq!(pdvs.len(), 1);
        assert_eq!(pdvs[0].presentation_context_id, 3);
        assert_eq!(pdvs[0].value_type, PDataValueType::Command);
        assert!(pdvs[0].is_last);
    }

    #[test]
    fn fragment_concatenation_law() {
        let cmd = CommandSet::store_rq(5, "1.2.840.10008.5.1.4.1.1.2", "1.2.3", Priority::Medium);
        let data: Vec<u8> = (0..100_000u32).map(|i| (i % 255) as u8).collect();
        let pdus = fragment_message(1, &cmd, Some(&data), MINIMUM_PDU_SIZE).unwrap();

        let pdvs = pdvs_of(pdus);
        // all PDVs share the context id and fit the budget
        for pdv in &pdvs {
            assert_eq!(pdv.presentation_context_id, 1);
            assert!(pdv.data.len() <= (MINIMUM_PDU_SIZE - PDU_HEADER_SIZE) as usize - 6);
        }

        // concatenating per group restores the original payloads
        let command_bytes: Vec<u8> = pdvs
            .iter()
            .filter(|p| p.value_type == PDataValueType::Command)
            .flat_map(|p| p.data.iter().copied())
            .collect();
        let data_bytes: Vec<u8> = pdvs
            .iter()
            .filter(|p| p.value_type == PDataValueType::Data)
            .flat_map(|p| p.data.iter().copied())
            .collect();
        assert_eq!(command_bytes, cmd.encode().unwrap());
        assert_eq!(data_bytes, data);

        // exactly one last fragment per group, at the end
        let command_last: Vec<bool> = pdvs
            .iter()
            .filter(|p| p.value_type == PDataValueType::Command)
            .map(|p| p.is_last)
            .collect();
        assert_eq!(command_last.iter().filter(|&&l| l).count(), 1);
        assert!(command_last.last().unwrap());
        let data_last: Vec<bool> = pdvs
            .iter()
            .filter(|p| p.value_type == PDataValueType::Data)
            .map(|p| p.is_last)
            .collect();
        assert_eq!(data_last.iter().filter(|&&l| l).count(), 1);
        assert!(data_last.last().unwrap());
    }

    #[test]
    fn reassembler_restores_fragmented_message() {
        let cmd = CommandSet::store_rq(9, "1.2.840.10008.5.1.4.1.1.4", "9.8.7", Priority::Low);
        let data: Vec<u8> = (0..50_000u32).map(|i| (i % 251) as u8).collect();
        let pdus = fragment_message(5, &cmd, Some(&data), MINIMUM_PDU_SIZE).unwrap();

        let mut reassembler = Reassembler::new();
        let mut messages = Vec::new();
        for pdu in pdus {
            messages.extend(reassembler.ingest_pdu(pdu).unwrap());
        }
        assert_eq!(messages.len(), 1);
        let message = &messages[0];
        assert_eq!(message.presentation_context_id, 5);
        assert_eq!(message.command, cmd);
        assert_eq!(message.data.as_deref(), Some(&data[..]));
    }

    #[test]
    fn command_without_data_completes_at_end_of_command() {
        let cmd = CommandSet::echo_rq(2);
        let pdus = fragment_message(1, &cmd, None, DEFAULT_MAX_PDU).unwrap();
        let mut reassembler = Reassembler::new();
        let messages = reassembler.ingest_pdu(pdus.into_iter().next().unwrap()).unwrap();
        assert_eq!(messages.len(), 1);
        assert!(messages[0].data.is_none());
    }

    #[test]
    fn data_before_command_is_a_violation() {
        let mut reassembler = Reassembler::new();
        let err = reassembler
            .ingest(PDataValue {
                presentation_context_id: 1,
                value_type: PDataValueType::Data,
                is_last: true,
                data: vec![1, 2, 3],
            })
            .unwrap_err();
        assert!(matches!(err, Error::DataBeforeCommand { .. }));
    }

    #[test]
    fn consecutive_messages_on_different_contexts() {
        let cmd_a = CommandSet::echo_rq(1);
        let cmd_b = CommandSet::echo_rq(2);
        let pdus_a = fragment_message(1, &cmd_a, None, DEFAULT_MAX_PDU).unwrap();
        let pdus_b = fragment_message(3, &cmd_b, None, DEFAULT_MAX_PDU).unwrap();

        let mut reassembler = Reassembler::new();
        let mut messages = Vec::new();
        for pdu in pdus_a.into_iter().chain(pdus_b) {
            messages.extend(reassembler.ingest_pdu(pdu).unwrap());
        }
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].presentation_context_id, 1);
        assert_eq!(messages[1].presentation_context_id, 3);
    }

    #[test]
    fn context_switch_mid_message_is_a_violation() {
        let cmd = CommandSet::store_rq(1, "1.2.840.10008.5.1.4.1.1.2", "1.2.3", Priority::Medium);
        let data = vec![0u8; 60_000];
        let pdus = fragment_message(1, &cmd, Some(&data), MINIMUM_PDU_SIZE).unwrap();
        let mut pdvs = pdvs_of(pdus);
        // corrupt a middle fragment's context id
        pdvs[1].presentation_context_id = 3;

        let mut reassembler = Reassembler::new();
        let outcome: Result<Vec<_>> = pdvs
            .into_iter()
            .map(|pdv| reassembler.ingest(pdv))
            .collect();
        assert!(matches!(
            outcome,
            Err(Error::ProtocolViolation {
                expected: 1,
                got: 3,
                ..
            })
        ));
    }

    #[test]
    fn pending_request_pairing() {
        let rq = CommandSet::find_rq(10, "1.2.840.10008.5.1.4.1.2.2.1", Priority::Medium);
        let mut pending = PendingRequests::new();
        pending.register(1, &rq).unwrap();
        assert!(matches!(
            pending.register(1, &rq),
            Err(Error::DuplicateMessageId { message_id: 10, .. })
        ));

        // a pending response keeps the pairing alive
        let pending_rsp = Message {
            presentation_context_id: 1,
            command: CommandSet::find_rsp(&rq, 0xFF00, true),
            data: Some(vec![]),
        };
        assert!(pending.take_match(&pending_rsp).is_some());
        assert_eq!(pending.len(), 1);

        // the final response removes it
        let final_rsp = Message {
            presentation_context_id: 1,
            command: CommandSet::find_rsp(&rq, 0x0000, false),
            data: None,
        };
        assert!(pending.take_match(&final_rsp).is_some());
        assert!(pending.is_empty());
    }
}
