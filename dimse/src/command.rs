//! DIMSE command sets.
//!
//! A command set is a data set in the command group (0000,xxxx),
//! always encoded in Implicit VR Little Endian and led by the
//! mandatory command group length element.

use dcmkit_core::Tag;
use dcmkit_dictionary_std::tags;
use dcmkit_encoding::transfer_syntax::entries;
use dcmkit_object::mem::{self, element, InMemObject};
use snafu::{OptionExt, ResultExt, Snafu};
use tracing::warn;

/// An error while encoding or interpreting a command set.
#[derive(Debug, Snafu)]
#[non_exhaustive]
pub enum Error {
    #[snafu(display("could not encode command set"))]
    EncodeSet {
        #[snafu(backtrace)]
        source: mem::Error,
    },

    #[snafu(display("could not decode command set"))]
    DecodeSet {
        #[snafu(backtrace)]
        source: mem::Error,
    },

    #[snafu(display("command set is missing element {}", tag))]
    MissingElement { tag: Tag },

    #[snafu(display("element {} does not hold an unsigned short", tag))]
    InvalidElement { tag: Tag },

    #[snafu(display("unknown command field {:#06x}", code))]
    UnknownCommandField { code: u16 },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// The value of the command data set type element which signals
/// the absence of a data set; any other value means a data set
/// follows the command.
pub const NO_DATA_SET: u16 = 0x0101;

/// The command field codes. Responses carry the request code
/// with bit 15 set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum CommandField {
    CStoreRq,
    CStoreRsp,
    CGetRq,
    CGetRsp,
    CFindRq,
    CFindRsp,
    CMoveRq,
    CMoveRsp,
    CEchoRq,
    CEchoRsp,
    NEventReportRq,
    NEventReportRsp,
    NGetRq,
    NGetRsp,
    NSetRq,
    NSetRsp,
    NActionRq,
    NActionRsp,
    NCreateRq,
    NCreateRsp,
    NDeleteRq,
    NDeleteRsp,
    CCancelRq,
}

impl CommandField {
    /// The numeric command field code.
    pub fn code(self) -> u16 {
        use CommandField::*;
        match self {
            CStoreRq => 0x0001,
            CStoreRsp => 0x8001,
            CGetRq => 0x0010,
            CGetRsp => 0x8010,
            CFindRq => 0x0020,
            CFindRsp => 0x8020,
            CMoveRq => 0x0021,
            CMoveRsp => 0x8021,
            CEchoRq => 0x0030,
            CEchoRsp => 0x8030,
            NEventReportRq => 0x0100,
            NEventReportRsp => 0x8100,
            NGetRq => 0x0110,
            NGetRsp => 0x8110,
            NSetRq => 0x0120,
            NSetRsp => 0x8120,
            NActionRq => 0x0130,
            NActionRsp => 0x8130,
            NCreateRq => 0x0140,
            NCreateRsp => 0x8140,
            NDeleteRq => 0x0150,
            NDeleteRsp => 0x8150,
            CCancelRq => 0x0FFF,
        }
    }

    /// Interpret a numeric command field code.
    pub fn from_code(code: u16) -> Option<Self> {
        use CommandField::*;
        match code {
            0x0001 => Some(CStoreRq),
            0x8001 => Some(CStoreRsp),
            0x0010 => Some(CGetRq),
            0x8010 => Some(CGetRsp),
            0x0020 => Some(CFindRq),
            0x8020 => Some(CFindRsp),
            0x0021 => Some(CMoveRq),
            0x8021 => Some(CMoveRsp),
            0x0030 => Some(CEchoRq),
            0x8030 => Some(CEchoRsp),
            0x0100 => Some(NEventReportRq),
            0x8100 => Some(NEventReportRsp),
            0x0110 => Some(NGetRq),
            0x8110 => Some(NGetRsp),
            0x0120 => Some(NSetRq),
            0x8120 => Some(NSetRsp),
            0x0130 => Some(NActionRq),
            0x8130 => Some(NActionRsp),
            0x0140 => Some(NCreateRq),
            0x8140 => Some(NCreateRsp),
            0x0150 => Some(NDeleteRq),
            0x8150 => Some(NDeleteRsp),
            0x0FFF => Some(CCancelRq),
            _ => None,
        }
    }

    /// Whether this is a response command.
    pub fn is_response(self) -> bool {
        self.code() & 0x8000 != 0
    }

    /// The response field matching this request,
    /// or `None` for commands without a response (C-CANCEL).
    pub fn response(self) -> Option<CommandField> {
        if self == CommandField::CCancelRq || self.is_response() {
            return None;
        }
        CommandField::from_code(self.code() | 0x8000)
    }
}

/// The priority of a composite service request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Priority {
    #[default]
    Medium,
    High,
    Low,
}

impl Priority {
    pub fn code(self) -> u16 {
        match self {
            Priority::Medium => 0x0000,
            Priority::High => 0x0001,
            Priority::Low => 0x0002,
        }
    }

    pub fn from_code(code: u16) -> Option<Self> {
        match code {
            0x0000 => Some(Priority::Medium),
            0x0001 => Some(Priority::High),
            0x0002 => Some(Priority::Low),
            _ => None,
        }
    }
}

/// The four suboperation counters of C-MOVE and C-GET responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SubOperations {
    pub remaining: u16,
    pub completed: u16,
    pub failed: u16,
    pub warnings: u16,
}

/// A DIMSE command set: the command group elements of one message.
///
/// The command group length element is not stored; it is computed
/// on encoding and verified on decoding.
#[derive(Debug, Clone, PartialEq)]
pub struct CommandSet {
    obj: InMemObject,
}

impl CommandSet {
    /// Start a request command set from its mandatory elements.
    fn new_request(
        field: CommandField,
        affected_sop_class_uid: &str,
        message_id: u16,
        has_data_set: bool,
    ) -> Self {
        let mut obj = InMemObject::new_empty();
        obj.put(element(tags::AFFECTED_SOP_CLASS_UID, affected_sop_class_uid));
        obj.put(element(tags::COMMAND_FIELD, field.code()));
        obj.put(element(tags::MESSAGE_ID, message_id));
        obj.put(element(
            tags::COMMAND_DATA_SET_TYPE,
            if has_data_set { 0x0000u16 } else { NO_DATA_SET },
        ));
        CommandSet { obj }
    }

    /// Start a response command set from its mandatory elements.
    fn new_response(
        field: CommandField,
        affected_sop_class_uid: &str,
        message_id_being_responded_to: u16,
        status: u16,
        has_data_set: bool,
    ) -> Self {
        let mut obj = InMemObject::new_empty();
        obj.put(element(tags::AFFECTED_SOP_CLASS_UID, affected_sop_class_uid));
        obj.put(element(tags::COMMAND_FIELD, field.code()));
        obj.put(element(
            tags::MESSAGE_ID_BEING_RESPONDED_TO,
            message_id_being_responded_to,
        ));
        obj.put(element(
            tags::COMMAND_DATA_SET_TYPE,
            if has_data_set { 0x0000u16 } else { NO_DATA_SET },
        ));
        obj.put(element(tags::STATUS, status));
        CommandSet { obj }
    }

    /// Build a C-ECHO request.
    pub fn echo_rq(message_id: u16) -> Self {
        CommandSet::new_request(
            CommandField::CEchoRq,
            dcmkit_dictionary_std::uids::VERIFICATION,
            message_id,
            false,
        )
    }

    /// Build the C-ECHO response to the given request.
    pub fn echo_rsp(request: &CommandSet, status: u16) -> Self {
        CommandSet::new_response(
            CommandField::CEchoRsp,
            &request.affected_sop_class_uid().unwrap_or_default(),
            request.message_id().unwrap_or(0),
            status,
            false,
        )
    }

    /// Build a C-STORE request.
    pub fn store_rq(
        message_id: u16,
        affected_sop_class_uid: &str,
        affected_sop_instance_uid: &str,
        priority: Priority,
    ) -> Self {
        let mut cmd = CommandSet::new_request(
            CommandField::CStoreRq,
            affected_sop_class_uid,
            message_id,
            true,
        );
        cmd.obj.put(element(tags::PRIORITY, priority.code()));
        cmd.obj.put(element(
            tags::AFFECTED_SOP_INSTANCE_UID,
            affected_sop_instance_uid,
        ));
        cmd
    }

    /// Build the C-STORE response to the given request.
    pub fn store_rsp(request: &CommandSet, status: u16) -> Self {
        let mut cmd = CommandSet::new_response(
            CommandField::CStoreRsp,
            &request.affected_sop_class_uid().unwrap_or_default(),
            request.message_id().unwrap_or(0),
            status,
            false,
        );
        if let Some(instance) = request.affected_sop_instance_uid() {
            cmd.obj
                .put(element(tags::AFFECTED_SOP_INSTANCE_UID, instance));
        }
        cmd
    }

    /// Build a C-FIND request. The identifier travels as the
    /// message data set.
    pub fn find_rq(message_id: u16, sop_class_uid: &str, priority: Priority) -> Self {
        let mut cmd =
            CommandSet::new_request(CommandField::CFindRq, sop_class_uid, message_id, true);
        cmd.obj.put(element(tags::PRIORITY, priority.code()));
        cmd
    }

    /// Build a C-FIND response. Pending responses carry a match
    /// in the data set; final responses have none.
    pub fn find_rsp(request: &CommandSet, status: u16, has_match: bool) -> Self {
        CommandSet::new_response(
            CommandField::CFindRsp,
            &request.affected_sop_class_uid().unwrap_or_default(),
            request.message_id().unwrap_or(0),
            status,
            has_match,
        )
    }

    /// Build a C-MOVE request with the destination AE title.
    pub fn move_rq(
        message_id: u16,
        sop_class_uid: &str,
        destination_ae_title: &str,
        priority: Priority,
    ) -> Self {
        let mut cmd =
            CommandSet::new_request(CommandField::CMoveRq, sop_class_uid, message_id, true);
        cmd.obj.put(element(tags::PRIORITY, priority.code()));
        cmd.obj
            .put(element(tags::MOVE_DESTINATION, destination_ae_title));
        cmd
    }

    /// Build a C-MOVE response with the suboperation counters.
    pub fn move_rsp(request: &CommandSet, status: u16, progress: SubOperations) -> Self {
        let mut cmd = CommandSet::new_response(
            CommandField::CMoveRsp,
            &request.affected_sop_class_uid().unwrap_or_default(),
            request.message_id().unwrap_or(0),
            status,
            false,
        );
        cmd.put_sub_operations(progress);
        cmd
    }

    /// Build a C-GET request.
    pub fn get_rq(message_id: u16, sop_class_uid: &str, priority: Priority) -> Self {
        let mut cmd =
            CommandSet::new_request(CommandField::CGetRq, sop_class_uid, message_id, true);
        cmd.obj.put(element(tags::PRIORITY, priority.code()));
        cmd
    }

    /// Build a C-GET response with the suboperation counters.
    pub fn get_rsp(request: &CommandSet, status: u16, progress: SubOperations) -> Self {
        let mut cmd = CommandSet::new_response(
            CommandField::CGetRsp,
            &request.affected_sop_class_uid().unwrap_or_default(),
            request.message_id().unwrap_or(0),
            status,
            false,
        );
        cmd.put_sub_operations(progress);
        cmd
    }

    /// Build a C-CANCEL request for the given message.
    pub fn cancel_rq(message_id_being_responded_to: u16) -> Self {
        let mut obj = InMemObject::new_empty();
        obj.put(element(tags::COMMAND_FIELD, CommandField::CCancelRq.code()));
        obj.put(element(
            tags::MESSAGE_ID_BEING_RESPONDED_TO,
            message_id_being_responded_to,
        ));
        obj.put(element(tags::COMMAND_DATA_SET_TYPE, NO_DATA_SET));
        CommandSet { obj }
    }

    /// Build a normalized service request (the N-DIMSE family).
    /// The instance UID element is the requested SOP instance.
    pub fn n_request(
        field: CommandField,
        message_id: u16,
        requested_sop_class_uid: &str,
        requested_sop_instance_uid: &str,
        has_data_set: bool,
    ) -> Self {
        let mut obj = InMemObject::new_empty();
        obj.put(element(
            tags::REQUESTED_SOP_CLASS_UID,
            requested_sop_class_uid,
        ));
        obj.put(element(tags::COMMAND_FIELD, field.code()));
        obj.put(element(tags::MESSAGE_ID, message_id));
        obj.put(element(
            tags::COMMAND_DATA_SET_TYPE,
            if has_data_set { 0x0000u16 } else { NO_DATA_SET },
        ));
        obj.put(element(
            tags::REQUESTED_SOP_INSTANCE_UID,
            requested_sop_instance_uid,
        ));
        CommandSet { obj }
    }

    /// Build the response to a normalized service request.
    pub fn n_response(request: &CommandSet, status: u16, has_data_set: bool) -> Result<Self> {
        let field = request
            .command_field()?
            .response()
            .context(UnknownCommandFieldSnafu {
                code: request.us(tags::COMMAND_FIELD).unwrap_or(0),
            })?;
        let mut obj = InMemObject::new_empty();
        if let Some(class_uid) = request.obj.string_value(tags::REQUESTED_SOP_CLASS_UID) {
            obj.put(element(tags::AFFECTED_SOP_CLASS_UID, class_uid));
        }
        obj.put(element(tags::COMMAND_FIELD, field.code()));
        obj.put(element(
            tags::MESSAGE_ID_BEING_RESPONDED_TO,
            request.message_id().unwrap_or(0),
        ));
        obj.put(element(
            tags::COMMAND_DATA_SET_TYPE,
            if has_data_set { 0x0000u16 } else { NO_DATA_SET },
        ));
        obj.put(element(tags::STATUS, status));
        if let Some(instance_uid) = request.obj.string_value(tags::REQUESTED_SOP_INSTANCE_UID) {
            obj.put(element(tags::AFFECTED_SOP_INSTANCE_UID, instance_uid));
        }
        Ok(CommandSet { obj })
    }

    fn put_sub_operations(&mut self, progress: SubOperations) {
        self.obj.put(element(
            tags::NUMBER_OF_REMAINING_SUBOPERATIONS,
            progress.remaining,
        ));
        self.obj.put(element(
            tags::NUMBER_OF_COMPLETED_SUBOPERATIONS,
            progress.completed,
        ));
        self.obj.put(element(
            tags::NUMBER_OF_FAILED_SUBOPERATIONS,
            progress.failed,
        ));
        self.obj.put(element(
            tags::NUMBER_OF_WARNING_SUBOPERATIONS,
            progress.warnings,
        ));
    }

    /// The suboperation counters of a C-MOVE or C-GET response.
    pub fn sub_operations(&self) -> SubOperations {
        SubOperations {
            remaining: self.us(tags::NUMBER_OF_REMAINING_SUBOPERATIONS).unwrap_or(0),
            completed: self.us(tags::NUMBER_OF_COMPLETED_SUBOPERATIONS).unwrap_or(0),
            failed: self.us(tags::NUMBER_OF_FAILED_SUBOPERATIONS).unwrap_or(0),
            warnings: self.us(tags::NUMBER_OF_WARNING_SUBOPERATIONS).unwrap_or(0),
        }
    }

    /// Wrap an already decoded command group data set.
    pub fn from_object(obj: InMemObject) -> Self {
        CommandSet { obj }
    }

    /// Borrow the underlying data set.
    pub fn object(&self) -> &InMemObject {
        &self.obj
    }

    fn us(&self, tag: Tag) -> Option<u16> {
        self.obj.get(tag).and_then(|e| e.value().to_int::<u16>().ok())
    }

    /// The command field of this command set.
    pub fn command_field(&self) -> Result<CommandField> {
        let code = self.us(tags::COMMAND_FIELD).context(MissingElementSnafu {
            tag: tags::COMMAND_FIELD,
        })?;
        CommandField::from_code(code).context(UnknownCommandFieldSnafu { code })
    }

    /// The message identifier of a request.
    pub fn message_id(&self) -> Option<u16> {
        self.us(tags::MESSAGE_ID)
    }

    /// The identifier of the message a response answers.
    pub fn message_id_being_responded_to(&self) -> Option<u16> {
        self.us(tags::MESSAGE_ID_BEING_RESPONDED_TO)
    }

    /// The status of a response.
    pub fn status(&self) -> Option<u16> {
        self.us(tags::STATUS)
    }

    /// The priority of a request, when given.
    pub fn priority(&self) -> Option<Priority> {
        self.us(tags::PRIORITY).and_then(Priority::from_code)
    }

    /// Whether a data set follows this command.
    pub fn has_data_set(&self) -> bool {
        self.us(tags::COMMAND_DATA_SET_TYPE)
            .map(|v| v != NO_DATA_SET)
            .unwrap_or(false)
    }

    /// The affected SOP class UID, when given.
    pub fn affected_sop_class_uid(&self) -> Option<String> {
        self.obj.string_value(tags::AFFECTED_SOP_CLASS_UID)
    }

    /// The affected SOP instance UID, when given.
    pub fn affected_sop_instance_uid(&self) -> Option<String> {
        self.obj.string_value(tags::AFFECTED_SOP_INSTANCE_UID)
    }

    /// The move destination AE title of a C-MOVE request.
    pub fn move_destination(&self) -> Option<String> {
        self.obj.string_value(tags::MOVE_DESTINATION)
    }

    /// Encode the command set in Implicit VR Little Endian,
    /// with the command group length element first.
    pub fn encode(&self) -> Result<Vec<u8>> {
        let mut body = Vec::new();
        self.obj
            .write_dataset_with_ts(&mut body, &entries::IMPLICIT_VR_LITTLE_ENDIAN)
            .context(EncodeSetSnafu)?;

        let mut out = Vec::with_capacity(body.len() + 12);
        // (0000,0000) UL, 4 bytes: the length of the remainder
        out.extend_from_slice(&[0x00, 0x00, 0x00, 0x00, 0x04, 0x00, 0x00, 0x00]);
        out.extend_from_slice(&(body.len() as u32).to_le_bytes());
        out.extend_from_slice(&body);
        Ok(out)
    }

    /// Decode a command set from its encoded form.
    ///
    /// A command group length mismatch is recoverable
    /// and reported as a warning.
    pub fn decode(data: &[u8]) -> Result<Self> {
        let mut obj =
            InMemObject::read_dataset_with_ts(data, &entries::IMPLICIT_VR_LITTLE_ENDIAN)
                .context(DecodeSetSnafu)?;
        if let Some(group_length) = obj.remove(tags::COMMAND_GROUP_LENGTH) {
            let declared = group_length
                .value()
                .to_int::<u32>()
                .map_err(|_| Error::InvalidElement {
                    tag: tags::COMMAND_GROUP_LENGTH,
                })?;
            let actual = data.len() as u32 - 12;
            if declared != actual {
                warn!(
                    "command group length declares {} bytes, content has {}",
                    declared, actual
                );
            }
        }
        Ok(CommandSet { obj })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_field_numbering() {
        assert_eq!(CommandField::CStoreRq.code(), 0x0001);
        assert_eq!(CommandField::CStoreRsp.code(), 0x8001);
        assert_eq!(CommandField::CEchoRq.code(), 0x0030);
        assert_eq!(
            CommandField::CEchoRq.response(),
            Some(CommandField::CEchoRsp)
        );
        assert_eq!(CommandField::CCancelRq.response(), None);
        assert!(CommandField::NCreateRsp.is_response());
        // response = request | 0x8000 across the n-family
        for rq in [
            CommandField::NEventReportRq,
            CommandField::NGetRq,
            CommandField::NSetRq,
            CommandField::NActionRq,
            CommandField::NCreateRq,
            CommandField::NDeleteRq,
        ] {
            let rsp = rq.response().unwrap();
            assert_eq!(rsp.code(), rq.code() | 0x8000);
        }
    }

    #[test]
    fn echo_round_trip_with_group_length() {
        let cmd = CommandSet::echo_rq(1);
        let encoded = cmd.encode().unwrap();

        // the group length element declares the remainder
        assert_eq!(&encoded[0..4], &[0x00, 0x00, 0x00, 0x00]);
        let declared = u32::from_le_bytes([encoded[8], encoded[9], encoded[10], encoded[11]]);
        assert_eq!(declared as usize, encoded.len() - 12);

        let decoded = CommandSet::decode(&encoded).unwrap();
        assert_eq!(decoded, cmd);
        assert_eq!(decoded.command_field().unwrap(), CommandField::CEchoRq);
        assert_eq!(decoded.message_id(), Some(1));
        assert!(!decoded.has_data_set());
    }

    #[test]
    fn store_request_and_response() {
        let rq = CommandSet::store_rq(
            7,
            "1.2.840.10008.5.1.4.1.1.2",
            "1.2.3.4.5",
            Priority::Medium,
        );
        assert!(rq.has_data_set());
        assert_eq!(rq.priority(), Some(Priority::Medium));
        assert_eq!(rq.affected_sop_instance_uid().unwrap(), "1.2.3.4.5");

        let rsp = CommandSet::store_rsp(&rq, 0x0000);
        assert_eq!(rsp.command_field().unwrap(), CommandField::CStoreRsp);
        assert_eq!(rsp.message_id_being_responded_to(), Some(7));
        assert_eq!(rsp.status(), Some(0x0000));
        assert!(!rsp.has_data_set());
    }

    #[test]
    fn move_response_counters() {
        let rq = CommandSet::move_rq(
            3,
            "1.2.840.10008.5.1.4.1.2.2.2",
            "STORE-SCP",
            Priority::Medium,
        );
        assert_eq!(rq.move_destination().unwrap(), "STORE-SCP");
        let rsp = CommandSet::move_rsp(
            &rq,
            0xFF00,
            SubOperations {
                remaining: 5,
                completed: 2,
                failed: 0,
                warnings: 1,
            },
        );
        let counters = rsp.sub_operations();
        assert_eq!(counters.remaining, 5);
        assert_eq!(counters.completed, 2);
        assert_eq!(counters.failed, 0);
        assert_eq!(counters.warnings, 1);

        let encoded = rsp.encode().unwrap();
        let decoded = CommandSet::decode(&encoded).unwrap();
        assert_eq!(decoded.sub_operations(), counters);
    }

    #[test]
    fn n_family_round_trip() {
        let rq = CommandSet::n_request(
            CommandField::NGetRq,
            11,
            "1.2.840.10008.1.20.1",
            "1.2.840.10008.1.20.1.1",
            false,
        );
        let encoded = rq.encode().unwrap();
        let decoded = CommandSet::decode(&encoded).unwrap();
        assert_eq!(decoded.command_field().unwrap(), CommandField::NGetRq);

        let rsp = CommandSet::n_response(&rq, 0x0000, false).unwrap();
        assert_eq!(rsp.command_field().unwrap(), CommandField::NGetRsp);
        assert_eq!(rsp.message_id_being_responded_to(), Some(11));
        assert_eq!(
            rsp.affected_sop_instance_uid().unwrap(),
            "1.2.840.10008.1.20.1.1"
        );
    }

    #[test]
    fn cancel_request() {
        let cancel = CommandSet::cancel_rq(42);
        assert_eq!(cancel.command_field().unwrap(), CommandField::CCancelRq);
        assert_eq!(cancel.message_id_being_responded_to(), Some(42));
        assert!(!cancel.has_data_set());
    }
}
