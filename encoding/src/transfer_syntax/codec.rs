//! The pluggable image codec seam for encapsulated pixel data.
//!
//! Compression algorithms themselves live outside this crate;
//! implementations of [`ImageCodec`] are registered by the
//! application for the transfer syntaxes it wishes to transcode.

use snafu::Snafu;
use std::fmt;

/// An error raised by an image codec implementation.
#[derive(Debug, Snafu)]
#[snafu(display("image codec error: {}", message))]
pub struct ImageCodecError {
    message: String,
}

impl ImageCodecError {
    /// Create a new image codec error with the given message.
    pub fn new(message: impl Into<String>) -> Self {
        ImageCodecError {
            message: message.into(),
        }
    }
}

/// The pixel description attributes a codec needs to interpret
/// or produce frame data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelMeta {
    pub rows: u16,
    pub columns: u16,
    pub samples_per_pixel: u16,
    pub bits_allocated: u16,
    pub bits_stored: u16,
    pub high_bit: u16,
    pub pixel_representation: u16,
    pub photometric_interpretation: String,
    pub number_of_frames: u32,
}

impl PixelMeta {
    /// The byte length of a single decoded frame.
    pub fn frame_byte_len(&self) -> usize {
        self.rows as usize
            * self.columns as usize
            * self.samples_per_pixel as usize
            * (self.bits_allocated as usize / 8)
    }
}

/// A pluggable decoder/encoder for one encapsulated pixel data
/// encoding.
pub trait ImageCodec: fmt::Debug {
    /// The UID of the transfer syntax this codec handles.
    fn supported_transfer_syntax_uid(&self) -> &str;

    /// Decode the concatenated fragment data of one frame
    /// into native pixel data.
    fn decode_frame(&self, data: &[u8], meta: &PixelMeta) -> Result<Vec<u8>, ImageCodecError>;

    /// Encode one frame of native pixel data into the compressed
    /// form carried by a single fragment.
    fn encode_frame(&self, frame: &[u8], meta: &PixelMeta) -> Result<Vec<u8>, ImageCodecError>;
}
