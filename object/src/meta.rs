//! The DICOM file meta information group.
//!
//! The file meta group (0002,xxxx) is always encoded in Explicit
//! VR Little Endian, prefixed with the `DICM` magic code, and led
//! by a mandatory group length element covering the remainder of
//! the group.

use dcmkit_core::header::{DataElementHeader, Header, Length};
use dcmkit_core::{trim_uid, Tag, VR};
use dcmkit_dictionary_std::tags;
use dcmkit_encoding::decode::{file_header_decoder, Decode};
use dcmkit_encoding::encode::explicit_le::ExplicitVrLeEncoder;
use dcmkit_encoding::encode::Encode;
use snafu::{ensure, Backtrace, OptionExt, ResultExt, Snafu};
use std::io::{Read, Write};

const DICM_MAGIC_CODE: [u8; 4] = [b'D', b'I', b'C', b'M'];

/// An error while reading or writing the file meta group.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
#[non_exhaustive]
pub enum Error {
    /// The `DICM` magic code could not be read.
    #[snafu(display("could not start reading DICOM data"))]
    ReadMagicCode {
        backtrace: Backtrace,
        source: std::io::Error,
    },

    /// Invalid DICOM data, detected by checking the `DICM` code.
    #[snafu(display("invalid DICOM file (magic code check failed)"))]
    MissingMagic { backtrace: Backtrace },

    #[snafu(display("could not read data value of {}", tag))]
    ReadValueData {
        tag: Tag,
        backtrace: Backtrace,
        source: std::io::Error,
    },

    #[snafu(display("could not decode data element"))]
    DecodeElement {
        #[snafu(backtrace)]
        source: dcmkit_encoding::decode::Error,
    },

    #[snafu(display("could not decode text in {}", tag))]
    DecodeText {
        tag: Tag,
        #[snafu(backtrace)]
        source: dcmkit_encoding::text::DecodeTextError,
    },

    /// The first element of the group was not the group length.
    #[snafu(display("expected group length element (0002,0000), got {}", tag))]
    UnexpectedElement { tag: Tag, backtrace: Backtrace },

    /// The declared group length does not match the group content.
    #[snafu(display("group length declares {} bytes but the group has {}", declared, actual))]
    GroupLengthMismatch {
        declared: u32,
        actual: u32,
        backtrace: Backtrace,
    },

    /// A required file meta element is missing.
    #[snafu(display("missing data element `{}`", alias))]
    MissingElement {
        alias: &'static str,
        backtrace: Backtrace,
    },

    #[snafu(display("unexpected undefined length of element {}", tag))]
    UndefinedValueLength { tag: Tag, backtrace: Backtrace },

    #[snafu(display("could not write file meta group"))]
    WriteGroup {
        #[snafu(backtrace)]
        source: dcmkit_encoding::encode::Error,
    },

    #[snafu(display("could not write data value"))]
    WriteValueData {
        backtrace: Backtrace,
        source: std::io::Error,
    },
}

type Result<T> = std::result::Result<T, Error>;

/// DICOM file meta information table.
///
/// Carries the attributes of the file meta group. Building one
/// from scratch is most convenient through [`FileMetaTableBuilder`].
#[derive(Debug, Clone, PartialEq)]
pub struct FileMetaTable {
    /// File Meta Information Group Length
    pub information_group_length: u32,
    /// File Meta Information Version
    pub information_version: [u8; 2],
    /// Media Storage SOP Class UID
    pub media_storage_sop_class_uid: String,
    /// Media Storage SOP Instance UID
    pub media_storage_sop_instance_uid: String,
    /// Transfer Syntax UID
    pub transfer_syntax: String,
    /// Implementation Class UID
    pub implementation_class_uid: String,
    /// Implementation Version Name
    pub implementation_version_name: Option<String>,
    /// Source Application Entity Title
    pub source_application_entity_title: Option<String>,
    /// Private Information Creator UID
    pub private_information_creator_uid: Option<String>,
    /// Private Information
    pub private_information: Option<Vec<u8>>,
}

impl FileMetaTable {
    /// Parse a file meta group, starting at the `DICM` magic code.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        FileMetaTable::read_from(reader)
    }

    /// Getter for the transfer syntax UID, with trailing padding
    /// already excluded.
    pub fn transfer_syntax(&self) -> &str {
        trim_uid(&self.transfer_syntax)
    }

    /// Getter for the media storage SOP class UID,
    /// with trailing padding already excluded.
    pub fn media_storage_sop_class_uid(&self) -> &str {
        trim_uid(&self.media_storage_sop_class_uid)
    }

    /// Getter for the media storage SOP instance UID,
    /// with trailing padding already excluded.
    pub fn media_storage_sop_instance_uid(&self) -> &str {
        trim_uid(&self.media_storage_sop_instance_uid)
    }

    /// Replace the transfer syntax UID and refresh the group length.
    pub fn set_transfer_syntax(&mut self, uid: &str) {
        self.transfer_syntax = trim_uid(uid).to_string();
        self.update_information_group_length();
    }

    /// Recompute the information group length field from the
    /// attributes currently set.
    pub fn update_information_group_length(&mut self) {
        self.information_group_length = self.calculate_information_group_length();
    }

    fn calculate_information_group_length(&self) -> u32 {
        // short-form element: 8-byte header plus even-padded value
        fn elem(len: usize) -> u32 {
            8 + ((len as u32 + 1) & !1)
        }
        let mut length = 12 + 2; // (0002,0001) OB takes the long header form
        length += elem(self.media_storage_sop_class_uid.len());
        length += elem(self.media_storage_sop_instance_uid.len());
        length += elem(self.transfer_syntax.len());
        length += elem(self.implementation_class_uid.len());
        if let Some(v) = &self.implementation_version_name {
            length += elem(v.len());
        }
        if let Some(v) = &self.source_application_entity_title {
            length += elem(v.len());
        }
        if let Some(v) = &self.private_information_creator_uid {
            length += elem(v.len());
        }
        if let Some(v) = &self.private_information {
            length += 12 + ((v.len() as u32 + 1) & !1);
        }
        length
    }

    fn read_from<R: Read>(mut source: R) -> Result<Self> {
        let mut magic = [0u8; 4];
        source.read_exact(&mut magic).context(ReadMagicCodeSnafu)?;
        ensure!(magic == DICM_MAGIC_CODE, MissingMagicSnafu);

        let decoder = file_header_decoder();

        // the group length element must come first
        let (header, _) = decoder
            .decode_header(&mut source)
            .context(DecodeElementSnafu)?;
        ensure!(
            header.tag == tags::FILE_META_INFORMATION_GROUP_LENGTH,
            UnexpectedElementSnafu { tag: header.tag }
        );
        let mut buf = [0u8; 4];
        source.read_exact(&mut buf).context(ReadValueDataSnafu {
            tag: header.tag,
        })?;
        let group_length = u32::from_le_bytes(buf);

        let mut table = FileMetaTable {
            information_group_length: group_length,
            information_version: [0, 1],
            media_storage_sop_class_uid: String::new(),
            media_storage_sop_instance_uid: String::new(),
            transfer_syntax: String::new(),
            implementation_class_uid: String::new(),
            implementation_version_name: None,
            source_application_entity_title: None,
            private_information_creator_uid: None,
            private_information: None,
        };

        let mut consumed = 0u32;
        while consumed < group_length {
            let (header, header_len) = decoder
                .decode_header(&mut source)
                .context(DecodeElementSnafu)?;
            let len = header
                .length()
                .get()
                .context(UndefinedValueLengthSnafu { tag: header.tag })?;
            let mut data = vec![0u8; len as usize];
            source.read_exact(&mut data).context(ReadValueDataSnafu {
                tag: header.tag,
            })?;
            consumed += header_len as u32 + len;

            let text_value = |data: &[u8]| -> String {
                String::from_utf8_lossy(data)
                    .trim_end_matches([' ', '\0'])
                    .to_string()
            };

            match header.tag {
                tags::FILE_META_INFORMATION_VERSION => {
                    if data.len() >= 2 {
                        table.information_version = [data[0], data[1]];
                    }
                }
                tags::MEDIA_STORAGE_SOP_CLASS_UID => {
                    table.media_storage_sop_class_uid = text_value(&data)
                }
                tags::MEDIA_STORAGE_SOP_INSTANCE_UID => {
                    table.media_storage_sop_instance_uid = text_value(&data)
                }
                tags::TRANSFER_SYNTAX_UID => table.transfer_syntax = text_value(&data),
                tags::IMPLEMENTATION_CLASS_UID => {
                    table.implementation_class_uid = text_value(&data)
                }
                tags::IMPLEMENTATION_VERSION_NAME => {
                    table.implementation_version_name = Some(text_value(&data))
                }
                tags::SOURCE_APPLICATION_ENTITY_TITLE => {
                    table.source_application_entity_title = Some(text_value(&data))
                }
                tags::PRIVATE_INFORMATION_CREATOR_UID => {
                    table.private_information_creator_uid = Some(text_value(&data))
                }
                tags::PRIVATE_INFORMATION => table.private_information = Some(data),
                _ => {
                    // other group 2 attributes are skipped
                }
            }
        }

        // a mismatch in file meta is fatal
        ensure!(
            consumed == group_length,
            GroupLengthMismatchSnafu {
                declared: group_length,
                actual: consumed,
            }
        );

        ensure!(
            !table.transfer_syntax.is_empty(),
            MissingElementSnafu {
                alias: "TransferSyntaxUID"
            }
        );

        Ok(table)
    }

    /// Write the file meta group, starting with the `DICM` magic
    /// code. The group length field is refreshed beforehand.
    pub fn write_to<W: Write>(&mut self, mut sink: W) -> Result<()> {
        self.update_information_group_length();

        let encoder = ExplicitVrLeEncoder::default();
        sink.write_all(&DICM_MAGIC_CODE)
            .context(WriteValueDataSnafu)?;

        let mut write_element =
            |sink: &mut W, tag: Tag, vr: VR, data: &[u8]| -> Result<()> {
                let mut padded;
                let data = if data.len() % 2 != 0 {
                    padded = data.to_vec();
                    padded.push(vr.padding());
                    padded.as_slice()
                } else {
                    data
                };
                encoder
                    .encode_element_header(
                        sink,
                        DataElementHeader::new(tag, vr, Length(data.len() as u32)),
                    )
                    .context(WriteGroupSnafu)?;
                sink.write_all(data).context(WriteValueDataSnafu)?;
                Ok(())
            };

        write_element(
            &mut sink,
            tags::FILE_META_INFORMATION_GROUP_LENGTH,
            VR::UL,
            &self.information_group_length.to_le_bytes(),
        )?;
        write_element(
            &mut sink,
            tags::FILE_META_INFORMATION_VERSION,
            VR::OB,
            &self.information_version,
        )?;
        write_element(
            &mut sink,
            tags::MEDIA_STORAGE_SOP_CLASS_UID,
            VR::UI,
            self.media_storage_sop_class_uid.as_bytes(),
        )?;
        write_element(
            &mut sink,
            tags::MEDIA_STORAGE_SOP_INSTANCE_UID,
            VR::UI,
            self.media_storage_sop_instance_uid.as_bytes(),
        )?;
        write_element(
            &mut sink,
            tags::TRANSFER_SYNTAX_UID,
            VR::UI,
            self.transfer_syntax.as_bytes(),
        )?;
        write_element(
            &mut sink,
            tags::IMPLEMENTATION_CLASS_UID,
            VR::UI,
            self.implementation_class_uid.as_bytes(),
        )?;
        if let Some(v) = self.implementation_version_name.clone() {
            write_element(
                &mut sink,
                tags::IMPLEMENTATION_VERSION_NAME,
                VR::SH,
                v.as_bytes(),
            )?;
        }
        if let Some(v) = self.source_application_entity_title.clone() {
            write_element(
                &mut sink,
                tags::SOURCE_APPLICATION_ENTITY_TITLE,
                VR::AE,
                v.as_bytes(),
            )?;
        }
        if let Some(v) = self.private_information_creator_uid.clone() {
            write_element(
                &mut sink,
                tags::PRIVATE_INFORMATION_CREATOR_UID,
                VR::UI,
                v.as_bytes(),
            )?;
        }
        if let Some(v) = self.private_information.clone() {
            write_element(&mut sink, tags::PRIVATE_INFORMATION, VR::OB, &v)?;
        }
        Ok(())
    }
}

/// A builder for a file meta information table.
#[derive(Debug, Default, Clone)]
pub struct FileMetaTableBuilder {
    media_storage_sop_class_uid: Option<String>,
    media_storage_sop_instance_uid: Option<String>,
    transfer_syntax: Option<String>,
    implementation_class_uid: Option<String>,
    implementation_version_name: Option<String>,
    source_application_entity_title: Option<String>,
}

impl FileMetaTableBuilder {
    /// Create a new, empty builder.
    pub fn new() -> Self {
        FileMetaTableBuilder::default()
    }

    /// Define the media storage SOP class UID.
    pub fn media_storage_sop_class_uid<T: Into<String>>(mut self, value: T) -> Self {
        self.media_storage_sop_class_uid = Some(value.into());
        self
    }

    /// Define the media storage SOP instance UID.
    pub fn media_storage_sop_instance_uid<T: Into<String>>(mut self, value: T) -> Self {
        self.media_storage_sop_instance_uid = Some(value.into());
        self
    }

    /// Define the transfer syntax UID.
    pub fn transfer_syntax<T: Into<String>>(mut self, value: T) -> Self {
        self.transfer_syntax = Some(value.into());
        self
    }

    /// Define the implementation class UID.
    pub fn implementation_class_uid<T: Into<String>>(mut self, value: T) -> Self {
        self.implementation_class_uid = Some(value.into());
        self
    }

    /// Define the implementation version name.
    pub fn implementation_version_name<T: Into<String>>(mut self, value: T) -> Self {
        self.implementation_version_name = Some(value.into());
        self
    }

    /// Define the source application entity title.
    pub fn source_application_entity_title<T: Into<String>>(mut self, value: T) -> Self {
        self.source_application_entity_title = Some(value.into());
        self
    }

    /// Build the table. The SOP class and instance UIDs and the
    /// transfer syntax are mandatory; implementation identifiers
    /// default to this toolkit's.
    pub fn build(self) -> Result<FileMetaTable> {
        let media_storage_sop_class_uid =
            self.media_storage_sop_class_uid.context(MissingElementSnafu {
                alias: "MediaStorageSOPClassUID",
            })?;
        let media_storage_sop_instance_uid =
            self.media_storage_sop_instance_uid
                .context(MissingElementSnafu {
                    alias: "MediaStorageSOPInstanceUID",
                })?;
        let transfer_syntax = self.transfer_syntax.context(MissingElementSnafu {
            alias: "TransferSyntaxUID",
        })?;
        let mut table = FileMetaTable {
            information_group_length: 0,
            information_version: [0, 1],
            media_storage_sop_class_uid,
            media_storage_sop_instance_uid,
            transfer_syntax: trim_uid(&transfer_syntax).to_string(),
            implementation_class_uid: self
                .implementation_class_uid
                .unwrap_or_else(|| crate::IMPLEMENTATION_CLASS_UID.to_string()),
            implementation_version_name: Some(
                self.implementation_version_name
                    .unwrap_or_else(|| crate::IMPLEMENTATION_VERSION_NAME.to_string()),
            ),
            source_application_entity_title: self.source_application_entity_title,
            private_information_creator_uid: None,
            private_information: None,
        };
        table.update_information_group_length();
        Ok(table)
    }
}
