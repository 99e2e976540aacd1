//! Transfer syntax descriptors and the built-in registry.
//!
//! A transfer syntax fixes the byte order, the VR style
//! (implicit or explicit) and the form of the data set stream
//! (plain, wrapped in a deflate frame, or with encapsulated
//! pixel data).

pub mod codec;
pub mod deflate;

use crate::decode::explicit_be::ExplicitVrBeDecoder;
use crate::decode::explicit_le::ExplicitVrLeDecoder;
use crate::decode::implicit_le::ImplicitVrLeDecoder;
use crate::decode::Decode;
use crate::encode::explicit_be::ExplicitVrBeEncoder;
use crate::encode::explicit_le::ExplicitVrLeEncoder;
use crate::encode::implicit_le::ImplicitVrLeEncoder;
use crate::encode::Encode;
use byteordered::Endianness;
use dcmkit_core::trim_uid;
use dcmkit_dictionary_std::uids;
use once_cell::sync::Lazy;
use std::collections::HashMap;

/// How value representations appear on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VrStyle {
    /// VRs are inferred from the attribute dictionary.
    Implicit,
    /// VRs are carried inline.
    Explicit,
}

/// The form of the encoded data set stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataSetForm {
    /// Elements follow each other directly; pixel data is native.
    Plain,
    /// The whole data set (after file meta) is wrapped
    /// in a raw deflate frame.
    Deflated,
    /// Pixel data is encapsulated in fragments and decoded
    /// through an [`ImageCodec`](codec::ImageCodec) collaborator.
    Encapsulated,
}

/// A transfer syntax descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferSyntax {
    uid: &'static str,
    name: &'static str,
    endianness: Endianness,
    vr_style: VrStyle,
    form: DataSetForm,
}

impl TransferSyntax {
    /// Create a new transfer syntax descriptor.
    pub const fn new(
        uid: &'static str,
        name: &'static str,
        endianness: Endianness,
        vr_style: VrStyle,
        form: DataSetForm,
    ) -> Self {
        TransferSyntax {
            uid,
            name,
            endianness,
            vr_style,
            form,
        }
    }

    /// The transfer syntax UID.
    pub fn uid(&self) -> &'static str {
        self.uid
    }

    /// A human readable name for the transfer syntax.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// The byte order of encoded values.
    pub fn endianness(&self) -> Endianness {
        self.endianness
    }

    /// The VR style of encoded element headers.
    pub fn vr_style(&self) -> VrStyle {
        self.vr_style
    }

    /// The form of the data set stream.
    pub fn form(&self) -> DataSetForm {
        self.form
    }

    /// Whether the data set stream is wrapped in a deflate frame.
    pub fn is_deflated(&self) -> bool {
        self.form == DataSetForm::Deflated
    }

    /// Whether pixel data is encapsulated under this syntax.
    pub fn is_encapsulated(&self) -> bool {
        self.form == DataSetForm::Encapsulated
    }

    /// Obtain an element header decoder for this transfer syntax.
    pub fn decoder(&self) -> Box<dyn Decode> {
        match (self.vr_style, self.endianness) {
            (VrStyle::Implicit, _) => Box::new(ImplicitVrLeDecoder::default()),
            (VrStyle::Explicit, Endianness::Little) => Box::new(ExplicitVrLeDecoder::default()),
            (VrStyle::Explicit, Endianness::Big) => Box::new(ExplicitVrBeDecoder::default()),
        }
    }

    /// Obtain an element header encoder for this transfer syntax.
    pub fn encoder(&self) -> Box<dyn Encode> {
        match (self.vr_style, self.endianness) {
            (VrStyle::Implicit, _) => Box::new(ImplicitVrLeEncoder::default()),
            (VrStyle::Explicit, Endianness::Little) => Box::new(ExplicitVrLeEncoder::default()),
            (VrStyle::Explicit, Endianness::Big) => Box::new(ExplicitVrBeEncoder::default()),
        }
    }
}

/// The built-in transfer syntax descriptors.
pub mod entries {
    use super::*;

    pub const IMPLICIT_VR_LITTLE_ENDIAN: TransferSyntax = TransferSyntax::new(
        uids::IMPLICIT_VR_LITTLE_ENDIAN,
        "Implicit VR Little Endian",
        Endianness::Little,
        VrStyle::Implicit,
        DataSetForm::Plain,
    );

    pub const EXPLICIT_VR_LITTLE_ENDIAN: TransferSyntax = TransferSyntax::new(
        uids::EXPLICIT_VR_LITTLE_ENDIAN,
        "Explicit VR Little Endian",
        Endianness::Little,
        VrStyle::Explicit,
        DataSetForm::Plain,
    );

    pub const DEFLATED_EXPLICIT_VR_LITTLE_ENDIAN: TransferSyntax = TransferSyntax::new(
        uids::DEFLATED_EXPLICIT_VR_LITTLE_ENDIAN,
        "Deflated Explicit VR Little Endian",
        Endianness::Little,
        VrStyle::Explicit,
        DataSetForm::Deflated,
    );

    pub const EXPLICIT_VR_BIG_ENDIAN: TransferSyntax = TransferSyntax::new(
        uids::EXPLICIT_VR_BIG_ENDIAN,
        "Explicit VR Big Endian",
        Endianness::Big,
        VrStyle::Explicit,
        DataSetForm::Plain,
    );

    pub const JPEG_BASELINE: TransferSyntax = TransferSyntax::new(
        uids::JPEG_BASELINE8_BIT,
        "JPEG Baseline (Process 1)",
        Endianness::Little,
        VrStyle::Explicit,
        DataSetForm::Encapsulated,
    );

    pub const JPEG_EXTENDED: TransferSyntax = TransferSyntax::new(
        uids::JPEG_EXTENDED12_BIT,
        "JPEG Extended (Process 2 & 4)",
        Endianness::Little,
        VrStyle::Explicit,
        DataSetForm::Encapsulated,
    );

    pub const JPEG_LOSSLESS: TransferSyntax = TransferSyntax::new(
        uids::JPEG_LOSSLESS,
        "JPEG Lossless, Non-Hierarchical (Process 14)",
        Endianness::Little,
        VrStyle::Explicit,
        DataSetForm::Encapsulated,
    );

    pub const JPEG_LOSSLESS_SV1: TransferSyntax = TransferSyntax::new(
        uids::JPEG_LOSSLESS_SV1,
        "JPEG Lossless, Non-Hierarchical, First-Order Prediction",
        Endianness::Little,
        VrStyle::Explicit,
        DataSetForm::Encapsulated,
    );

    pub const JPEG_LS_LOSSLESS: TransferSyntax = TransferSyntax::new(
        uids::JPEG_LS_LOSSLESS,
        "JPEG-LS Lossless Image Compression",
        Endianness::Little,
        VrStyle::Explicit,
        DataSetForm::Encapsulated,
    );

    pub const JPEG_LS_NEAR_LOSSLESS: TransferSyntax = TransferSyntax::new(
        uids::JPEG_LS_NEAR_LOSSLESS,
        "JPEG-LS Lossy (Near-Lossless) Image Compression",
        Endianness::Little,
        VrStyle::Explicit,
        DataSetForm::Encapsulated,
    );

    pub const JPEG_2000_LOSSLESS: TransferSyntax = TransferSyntax::new(
        uids::JPEG2000_LOSSLESS,
        "JPEG 2000 Image Compression (Lossless Only)",
        Endianness::Little,
        VrStyle::Explicit,
        DataSetForm::Encapsulated,
    );

    pub const JPEG_2000: TransferSyntax = TransferSyntax::new(
        uids::JPEG2000,
        "JPEG 2000 Image Compression",
        Endianness::Little,
        VrStyle::Explicit,
        DataSetForm::Encapsulated,
    );

    pub const RLE_LOSSLESS: TransferSyntax = TransferSyntax::new(
        uids::RLE_LOSSLESS,
        "RLE Lossless",
        Endianness::Little,
        VrStyle::Explicit,
        DataSetForm::Encapsulated,
    );

    pub(super) static ALL: &[&TransferSyntax] = &[
        &IMPLICIT_VR_LITTLE_ENDIAN,
        &EXPLICIT_VR_LITTLE_ENDIAN,
        &DEFLATED_EXPLICIT_VR_LITTLE_ENDIAN,
        &EXPLICIT_VR_BIG_ENDIAN,
        &JPEG_BASELINE,
        &JPEG_EXTENDED,
        &JPEG_LOSSLESS,
        &JPEG_LOSSLESS_SV1,
        &JPEG_LS_LOSSLESS,
        &JPEG_LS_NEAR_LOSSLESS,
        &JPEG_2000_LOSSLESS,
        &JPEG_2000,
        &RLE_LOSSLESS,
    ];
}

static REGISTRY: Lazy<HashMap<&'static str, &'static TransferSyntax>> =
    Lazy::new(|| entries::ALL.iter().map(|ts| (ts.uid(), *ts)).collect());

/// The registry of built-in transfer syntaxes.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TransferSyntaxRegistry;

impl TransferSyntaxRegistry {
    /// Obtain the descriptor of the transfer syntax with the given
    /// UID, tolerating trailing padding in the value.
    pub fn get(&self, uid: &str) -> Option<&'static TransferSyntax> {
        REGISTRY.get(trim_uid(uid)).copied()
    }

    /// Whether the given UID names a known transfer syntax.
    pub fn contains(&self, uid: &str) -> bool {
        self.get(uid).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_lookup() {
        let ts = TransferSyntaxRegistry.get("1.2.840.10008.1.2.1").unwrap();
        assert_eq!(ts.name(), "Explicit VR Little Endian");
        assert_eq!(ts.vr_style(), VrStyle::Explicit);
        assert_eq!(ts.endianness(), Endianness::Little);
        assert!(!ts.is_deflated());
        assert!(!ts.is_encapsulated());

        // trailing padding tolerated
        assert!(TransferSyntaxRegistry.contains("1.2.840.10008.1.2\0"));
        assert!(!TransferSyntaxRegistry.contains("1.2.3.4"));
    }

    #[test]
    fn deflated_and_encapsulated_forms() {
        let ts = TransferSyntaxRegistry.get("1.2.840.10008.1.2.1.99").unwrap();
        assert!(ts.is_deflated());
        let ts = TransferSyntaxRegistry.get("1.2.840.10008.1.2.4.90").unwrap();
        assert!(ts.is_encapsulated());
        // encapsulated syntaxes still parse data sets as explicit LE
        assert_eq!(ts.vr_style(), VrStyle::Explicit);
    }
}
