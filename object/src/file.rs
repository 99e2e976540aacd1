//! Reading and writing DICOM Part-10 file objects.

use crate::mem::{self, InMemObject};
use crate::meta::{self, FileMetaTable, FileMetaTableBuilder};
use dcmkit_core::header::{Header, Length};
use dcmkit_core::value::Value;
use dcmkit_core::{DataElement, PrimitiveValue, Tag, VR};
use dcmkit_dictionary_std::{tags, uids};
use dcmkit_encoding::transfer_syntax::{deflate, entries, TransferSyntax, TransferSyntaxRegistry};
use dcmkit_parser::dataset::read::DataSetReader;
use dcmkit_parser::dataset::DataToken;
use snafu::{OptionExt, ResultExt, Snafu};
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

/// An error when reading or writing a Part-10 file object.
#[derive(Debug, Snafu)]
#[non_exhaustive]
pub enum Error {
    #[snafu(display("could not open file {}", path.display()))]
    OpenFile {
        path: PathBuf,
        source: std::io::Error,
    },

    #[snafu(display("could not read from file"))]
    ReadFile { source: std::io::Error },

    #[snafu(display("could not write to file"))]
    WriteFile { source: std::io::Error },

    #[snafu(display("could not read file meta group"))]
    ReadMeta {
        #[snafu(backtrace)]
        source: meta::Error,
    },

    #[snafu(display("could not build file meta group"))]
    BuildMeta {
        #[snafu(backtrace)]
        source: meta::Error,
    },

    #[snafu(display("could not write file meta group"))]
    WriteMeta {
        #[snafu(backtrace)]
        source: meta::Error,
    },

    #[snafu(display("transfer syntax {} is not supported", uid))]
    UnsupportedTransferSyntax { uid: String },

    #[snafu(display("could not read data set body"))]
    ReadBody {
        #[snafu(backtrace)]
        source: mem::Error,
    },

    #[snafu(display("could not read data set body"))]
    ReadBodyTokens {
        #[snafu(backtrace)]
        source: dcmkit_parser::dataset::read::Error,
    },

    #[snafu(display("could not write data set body"))]
    WriteBody {
        #[snafu(backtrace)]
        source: mem::Error,
    },

    #[snafu(display("the object has no pixel data element"))]
    PixelDataNotFound,
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// How much of a file's body to materialize while reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReadMode {
    /// Decode the whole body into memory.
    #[default]
    Full,
    /// Stop before the value of the first element at or past the
    /// sentinel tag, and before pixel data in any case.
    MetadataOnly {
        /// the first tag that is no longer read
        until: Tag,
    },
    /// Decode the body but defer the pixel data value,
    /// keeping a record of its byte range in the source.
    LazyPixelData,
}

/// Options controlling how Part-10 content is read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ReadOptions {
    /// How much of the body to materialize.
    pub mode: ReadMode,
    /// Accept files without a preamble, and files without a file
    /// meta group (assumed Explicit VR Little Endian).
    pub tolerant: bool,
}

/// The position of an unread pixel data value within its source.
#[derive(Debug, Clone, PartialEq, Eq)]
struct LazyPixelData {
    path: PathBuf,
    offset: u64,
    len: u32,
    vr: VR,
}

/// A DICOM Part-10 file object: preamble, file meta group
/// and body data set.
///
/// The preamble read from a source is preserved and re-emitted
/// on write; objects built from scratch write a zero preamble.
#[derive(Debug, Clone, PartialEq)]
pub struct FileObject {
    preamble: [u8; 128],
    meta: FileMetaTable,
    object: InMemObject,
    lazy_pixel: Option<LazyPixelData>,
}

impl FileObject {
    /// Create a file object from a meta table and a body data set.
    pub fn new(meta: FileMetaTable, object: InMemObject) -> Self {
        FileObject {
            preamble: [0; 128],
            meta,
            object,
            lazy_pixel: None,
        }
    }

    /// The 128-byte preamble.
    pub fn preamble(&self) -> &[u8; 128] {
        &self.preamble
    }

    /// The file meta table.
    pub fn meta(&self) -> &FileMetaTable {
        &self.meta
    }

    /// The body data set.
    pub fn object(&self) -> &InMemObject {
        &self.object
    }

    /// A mutable reference to the body data set.
    pub fn object_mut(&mut self) -> &mut InMemObject {
        &mut self.object
    }

    /// Discard the envelope, returning the body data set.
    pub fn into_inner(self) -> InMemObject {
        self.object
    }

    /// Materialize the native pixel data bytes.
    ///
    /// When the object was read in lazy mode, the bytes are
    /// fetched from the source file on demand.
    pub fn pixel_data_bytes(&self) -> Result<Vec<u8>> {
        if let Some(elem) = self.object.get(tags::PIXEL_DATA) {
            return match elem.value() {
                Value::Primitive(v) => Ok(v.to_bytes().into_owned()),
                Value::PixelSequence { fragments, .. } => {
                    Ok(fragments.iter().flatten().copied().collect())
                }
                Value::Sequence { .. } => PixelDataNotFoundSnafu.fail(),
            };
        }
        let lazy = self.lazy_pixel.as_ref().context(PixelDataNotFoundSnafu)?;
        let mut file = File::open(&lazy.path).context(OpenFileSnafu {
            path: lazy.path.clone(),
        })?;
        file.seek(SeekFrom::Start(lazy.offset))
            .context(ReadFileSnafu)?;
        let mut data = vec![0; lazy.len as usize];
        file.read_exact(&mut data).context(ReadFileSnafu)?;
        Ok(data)
    }

    /// Write the whole file object: preamble, magic code,
    /// file meta group, then the body in the transfer syntax
    /// named by the meta group.
    pub fn write_to<W: Write>(&self, sink: W) -> Result<()> {
        let mut sink = BufWriter::new(sink);
        sink.write_all(&self.preamble).context(WriteFileSnafu)?;

        let mut meta = self.meta.clone();
        // refresh the identifiers of the writing implementation
        meta.implementation_class_uid = crate::IMPLEMENTATION_CLASS_UID.to_string();
        meta.implementation_version_name = Some(crate::IMPLEMENTATION_VERSION_NAME.to_string());
        meta.write_to(&mut sink).context(WriteMetaSnafu)?;

        let ts = TransferSyntaxRegistry
            .get(meta.transfer_syntax())
            .context(UnsupportedTransferSyntaxSnafu {
                uid: meta.transfer_syntax().to_string(),
            })?;

        let mut body = self.object.clone();
        if self.lazy_pixel.is_some() && self.object.get(tags::PIXEL_DATA).is_none() {
            let bytes = self.pixel_data_bytes()?;
            let vr = self.lazy_pixel.as_ref().map(|l| l.vr).unwrap_or(VR::OW);
            body.put(DataElement::new(
                tags::PIXEL_DATA,
                vr,
                Value::Primitive(PrimitiveValue::from(bytes)),
            ));
        }

        if ts.is_deflated() {
            let mut encoder = deflate::deflate_stream(&mut sink);
            body.write_dataset_with_ts(&mut encoder, ts)
                .context(WriteBodySnafu)?;
            encoder.finish().context(WriteFileSnafu)?;
        } else {
            body.write_dataset_with_ts(&mut sink, ts)
                .context(WriteBodySnafu)?;
        }
        sink.flush().context(WriteFileSnafu)
    }

    /// Write the file object to the file system.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let file = File::create(path.as_ref()).context(OpenFileSnafu {
            path: path.as_ref().to_path_buf(),
        })?;
        self.write_to(file)
    }
}

/// Open a Part-10 file with the default options.
pub fn open_file<P: AsRef<Path>>(path: P) -> Result<FileObject> {
    open_file_with(path, ReadOptions::default())
}

/// Open a Part-10 file with the given options.
pub fn open_file_with<P: AsRef<Path>>(path: P, options: ReadOptions) -> Result<FileObject> {
    let path = path.as_ref();
    let mut file = File::open(path).context(OpenFileSnafu {
        path: path.to_path_buf(),
    })?;

    // locate the magic code
    let mut head = [0u8; 132];
    let head_n = read_up_to(&mut file, &mut head).context(ReadFileSnafu)?;

    let mut preamble = [0u8; 128];
    let (meta, body_base, naked) = if head_n == 132 && &head[128..132] == b"DICM" {
        preamble.copy_from_slice(&head[..128]);
        file.seek(SeekFrom::Start(128)).context(ReadFileSnafu)?;
        let meta = FileMetaTable::from_reader(&mut file).context(ReadMetaSnafu)?;
        let base = 132 + 12 + u64::from(meta.information_group_length);
        (meta, base, false)
    } else if head_n >= 4 && &head[0..4] == b"DICM" && options.tolerant {
        debug!("file {} has no preamble", path.display());
        file.seek(SeekFrom::Start(0)).context(ReadFileSnafu)?;
        let meta = FileMetaTable::from_reader(&mut file).context(ReadMetaSnafu)?;
        let base = 4 + 12 + u64::from(meta.information_group_length);
        (meta, base, false)
    } else if options.tolerant {
        // no preamble and no file meta group: parse as a naked
        // Explicit VR Little Endian data set from offset 0
        debug!(
            "file {} has no file meta group; assuming explicit VR LE",
            path.display()
        );
        file.seek(SeekFrom::Start(0)).context(ReadFileSnafu)?;
        let meta = FileMetaTableBuilder::new()
            .media_storage_sop_class_uid("")
            .media_storage_sop_instance_uid("")
            .transfer_syntax(uids::EXPLICIT_VR_LITTLE_ENDIAN)
            .build()
            .context(BuildMetaSnafu)?;
        (meta, 0, true)
    } else {
        return Err(Error::ReadMeta {
            source: meta::MissingMagicSnafu.build(),
        });
    };

    let ts = TransferSyntaxRegistry
        .get(meta.transfer_syntax())
        .context(UnsupportedTransferSyntaxSnafu {
            uid: meta.transfer_syntax().to_string(),
        })?;

    let source = BufReader::new(file);
    let (object, lazy_pixel) = if ts.is_deflated() {
        // a deflated stream cannot be revisited by byte offset,
        // so the lazy mode falls back to a full read
        let inflated = deflate::inflate_stream(source);
        (read_body(inflated, ts, options, None, path)?.0, None)
    } else {
        let (object, lazy) = read_body(source, ts, options, Some(body_base), path)?;
        (object, lazy)
    };

    let mut meta = meta;
    if naked {
        // fill in the identifiers the synthesized meta is missing
        if let Some(sop_class) = object.string_value(tags::SOP_CLASS_UID) {
            meta.media_storage_sop_class_uid = sop_class;
        }
        if let Some(sop_instance) = object.string_value(tags::SOP_INSTANCE_UID) {
            meta.media_storage_sop_instance_uid = sop_instance;
        }
        meta.update_information_group_length();
    }

    Ok(FileObject {
        preamble,
        meta,
        object,
        lazy_pixel,
    })
}

/// Read the body data set honoring the requested read mode.
fn read_body<R: Read>(
    source: R,
    ts: &'static TransferSyntax,
    options: ReadOptions,
    body_base: Option<u64>,
    path: &Path,
) -> Result<(InMemObject, Option<LazyPixelData>)> {
    let mut reader = DataSetReader::new(source, ts);
    let mut object = InMemObject::new_empty();
    let mut lazy_pixel = None;
    let mut pending: Option<dcmkit_core::DataElementHeader> = None;

    while let Some(token) = reader.next() {
        let token = token.context(ReadBodyTokensSnafu)?;
        match token {
            DataToken::ElementHeader(header) => {
                let stop = match options.mode {
                    ReadMode::MetadataOnly { until } => {
                        header.tag >= until || header.tag == tags::PIXEL_DATA
                    }
                    _ => false,
                };
                if stop {
                    break;
                }
                if options.mode == ReadMode::LazyPixelData && header.tag == tags::PIXEL_DATA {
                    if let (Some(base), Some(len)) = (body_base, header.length().get()) {
                        let offset = base + reader.position();
                        reader.skip_pending_value().context(ReadBodyTokensSnafu)?;
                        lazy_pixel = Some(LazyPixelData {
                            path: path.to_path_buf(),
                            offset,
                            len,
                            vr: header.vr,
                        });
                        continue;
                    }
                }
                pending = Some(header);
            }
            DataToken::PrimitiveValue(value) => {
                let header = pending.take().expect("value follows its header");
                object.put(DataElement::new(
                    header.tag,
                    header.vr,
                    Value::Primitive(value),
                ));
            }
            DataToken::SequenceStart { tag, .. } => {
                let items = InMemObject::build_sequence(&mut reader).context(ReadBodySnafu)?;
                object.put(DataElement::new(
                    tag,
                    VR::SQ,
                    Value::new_sequence(items, Length::UNDEFINED),
                ));
            }
            DataToken::PixelSequenceStart => {
                if matches!(options.mode, ReadMode::MetadataOnly { .. }) {
                    break;
                }
                let (offset_table, fragments) =
                    InMemObject::build_pixel_sequence(&mut reader).context(ReadBodySnafu)?;
                object.put(DataElement::new(
                    tags::PIXEL_DATA,
                    VR::OB,
                    Value::new_pixel_sequence(offset_table, fragments),
                ));
            }
            token => {
                return Err(Error::ReadBody {
                    source: mem::UnexpectedTokenSnafu { token }.build(),
                })
            }
        }
    }
    Ok((object, lazy_pixel))
}

fn read_up_to<R: Read>(reader: &mut R, buf: &mut [u8]) -> std::io::Result<usize> {
    let mut read = 0;
    while read < buf.len() {
        match reader.read(&mut buf[read..]) {
            Ok(0) => break,
            Ok(n) => read += n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(read)
}

/// Read a file object from an arbitrary reader, starting at the
/// preamble or the `DICM` magic code. Lazy pixel data is not
/// available through this entry point.
pub fn from_reader<R: Read>(source: R) -> Result<FileObject> {
    let mut source = BufReader::new(source);
    let mut head = [0u8; 132];
    let head_n = read_up_to(&mut source, &mut head).context(ReadFileSnafu)?;

    // keep the unconsumed part of the head in front of the source
    let mut preamble = [0u8; 128];
    let mut rest: Box<dyn Read> = if head_n == 132 && &head[128..132] == b"DICM" {
        preamble.copy_from_slice(&head[..128]);
        Box::new(std::io::Cursor::new(head[128..head_n].to_vec()).chain(source))
    } else if head_n >= 4 && &head[0..4] == b"DICM" {
        Box::new(std::io::Cursor::new(head[..head_n].to_vec()).chain(source))
    } else {
        return Err(Error::ReadMeta {
            source: meta::MissingMagicSnafu.build(),
        });
    };

    let meta = FileMetaTable::from_reader(&mut rest).context(ReadMetaSnafu)?;

    let ts = TransferSyntaxRegistry
        .get(meta.transfer_syntax())
        .context(UnsupportedTransferSyntaxSnafu {
            uid: meta.transfer_syntax().to_string(),
        })?;

    let object = if ts.is_deflated() {
        InMemObject::read_dataset_with_ts(deflate::inflate_stream(rest), ts)
            .context(ReadBodySnafu)?
    } else {
        InMemObject::read_dataset_with_ts(rest, ts).context(ReadBodySnafu)?
    };

    Ok(FileObject {
        preamble,
        meta,
        object,
        lazy_pixel: None,
    })
}

/// Convenience: the explicit VR little endian syntax,
/// the common default for new files.
pub fn default_transfer_syntax() -> &'static TransferSyntax {
    &entries::EXPLICIT_VR_LITTLE_ENDIAN
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mem::element;
    use smallvec::smallvec;

    fn sample_file_object() -> FileObject {
        let mut obj = InMemObject::new_empty();
        obj.put(element(tags::SOP_CLASS_UID, uids::CT_IMAGE_STORAGE));
        obj.put(element(tags::SOP_INSTANCE_UID, "1.2.3.4.5"));
        obj.put(element(tags::MODALITY, "CT"));
        obj.put(element(tags::PATIENT_NAME, "DOE^JOHN"));
        obj.put(element(tags::ROWS, 16u16));
        obj.put(element(tags::COLUMNS, 16u16));
        obj.put(element(tags::BITS_ALLOCATED, 16u16));
        let pixels: Vec<u8> = (0..16u32 * 16 * 2).map(|i| (i % 256) as u8).collect();
        obj.put(DataElement::new(
            tags::PIXEL_DATA,
            VR::OW,
            Value::Primitive(PrimitiveValue::from(pixels)),
        ));

        let meta = FileMetaTableBuilder::new()
            .media_storage_sop_class_uid(uids::CT_IMAGE_STORAGE)
            .media_storage_sop_instance_uid("1.2.3.4.5")
            .transfer_syntax(uids::EXPLICIT_VR_LITTLE_ENDIAN)
            .build()
            .unwrap();
        FileObject::new(meta, obj)
    }

    #[test]
    fn file_round_trip() {
        let original = sample_file_object();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ct.dcm");
        original.save(&path).unwrap();

        let read_back = open_file(&path).unwrap();
        assert_eq!(read_back.object(), original.object());
        assert_eq!(
            read_back.meta().transfer_syntax(),
            original.meta().transfer_syntax()
        );

        // a second round trip is byte-stable at the data set level
        let path2 = dir.path().join("ct2.dcm");
        read_back.save(&path2).unwrap();
        let read_again = open_file(&path2).unwrap();
        assert_eq!(read_again.object(), read_back.object());
    }

    #[test]
    fn deflated_file_round_trip() {
        let mut original = sample_file_object();
        original
            .meta
            .set_transfer_syntax(uids::DEFLATED_EXPLICIT_VR_LITTLE_ENDIAN);
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("deflated.dcm");
        original.save(&path).unwrap();

        let read_back = open_file(&path).unwrap();
        assert_eq!(read_back.object(), original.object());
    }

    #[test]
    fn metadata_only_stops_before_pixel_data() {
        let original = sample_file_object();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ct.dcm");
        original.save(&path).unwrap();

        let read_back = open_file_with(
            &path,
            ReadOptions {
                mode: ReadMode::MetadataOnly {
                    until: tags::PIXEL_DATA,
                },
                tolerant: false,
            },
        )
        .unwrap();
        assert!(read_back.object().get(tags::PIXEL_DATA).is_none());
        assert_eq!(
            read_back.object().string_value(tags::MODALITY).unwrap(),
            "CT"
        );
    }

    #[test]
    fn lazy_pixel_data_materializes_on_demand() {
        let original = sample_file_object();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ct.dcm");
        original.save(&path).unwrap();

        let read_back = open_file_with(
            &path,
            ReadOptions {
                mode: ReadMode::LazyPixelData,
                tolerant: false,
            },
        )
        .unwrap();
        // the element is not in memory
        assert!(read_back.object().get(tags::PIXEL_DATA).is_none());
        // but the bytes can still be materialized
        let bytes = read_back.pixel_data_bytes().unwrap();
        assert_eq!(bytes, original.pixel_data_bytes().unwrap());
    }

    #[test]
    fn missing_magic_is_rejected_unless_tolerant() {
        // a naked data set: explicit VR LE body only
        let mut obj = InMemObject::new_empty();
        obj.put(element(tags::SOP_CLASS_UID, uids::CT_IMAGE_STORAGE));
        obj.put(element(tags::SOP_INSTANCE_UID, "1.2.3.4.5"));
        obj.put(element(tags::MODALITY, "CT"));
        let mut encoded = Vec::new();
        obj.write_dataset_with_ts(&mut encoded, default_transfer_syntax())
            .unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("naked.dcm");
        std::fs::write(&path, &encoded).unwrap();

        assert!(open_file(&path).is_err());

        let read_back = open_file_with(
            &path,
            ReadOptions {
                mode: ReadMode::Full,
                tolerant: true,
            },
        )
        .unwrap();
        assert_eq!(
            read_back.object().string_value(tags::MODALITY).unwrap(),
            "CT"
        );
        // the synthesized meta group is filled from the body
        assert_eq!(
            read_back.meta().media_storage_sop_instance_uid(),
            "1.2.3.4.5"
        );
    }

    #[test]
    fn preamble_is_preserved() {
        let original = sample_file_object();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ct.dcm");
        original.save(&path).unwrap();

        // plant vendor bytes into the preamble
        let mut raw = std::fs::read(&path).unwrap();
        raw[0..8].copy_from_slice(b"VENDOR00");
        std::fs::write(&path, &raw).unwrap();

        let read_back = open_file(&path).unwrap();
        assert_eq!(&read_back.preamble()[0..8], b"VENDOR00");

        let path2 = dir.path().join("ct2.dcm");
        read_back.save(&path2).unwrap();
        let raw2 = std::fs::read(&path2).unwrap();
        assert_eq!(&raw2[0..8], b"VENDOR00");
    }

    #[test]
    fn encapsulated_pixel_data_survives() {
        let mut obj = InMemObject::new_empty();
        obj.put(element(tags::SOP_CLASS_UID, uids::CT_IMAGE_STORAGE));
        obj.put(element(tags::SOP_INSTANCE_UID, "1.2.3.4.5"));
        obj.put(DataElement::new(
            tags::PIXEL_DATA,
            VR::OB,
            Value::new_pixel_sequence(smallvec![0u32], smallvec![vec![1u8, 2, 3, 4]]),
        ));
        let meta = FileMetaTableBuilder::new()
            .media_storage_sop_class_uid(uids::CT_IMAGE_STORAGE)
            .media_storage_sop_instance_uid("1.2.3.4.5")
            .transfer_syntax(uids::JPEG_BASELINE8_BIT)
            .build()
            .unwrap();
        let original = FileObject::new(meta, obj);

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("encapsulated.dcm");
        original.save(&path).unwrap();
        let read_back = open_file(&path).unwrap();
        assert_eq!(read_back.object(), original.object());
        assert_eq!(read_back.pixel_data_bytes().unwrap(), vec![1, 2, 3, 4]);
    }
}
