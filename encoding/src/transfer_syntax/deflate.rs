//! Raw deflate framing for the Deflated Explicit VR Little Endian
//! transfer syntax. Everything after the file meta group is a
//! single deflate stream (RFC 1951, no zlib header).

use flate2::read::DeflateDecoder;
use flate2::write::DeflateEncoder;
use flate2::Compression;
use std::io::{Read, Write};

/// Wrap a reader so that the deflated data set stream is inflated
/// on the fly.
pub fn inflate_stream<R: Read>(source: R) -> DeflateDecoder<R> {
    DeflateDecoder::new(source)
}

/// Wrap a writer so that the written data set stream is deflated
/// on the fly. The encoder must be finished (or dropped) to flush
/// the final block.
pub fn deflate_stream<W: Write>(sink: W) -> DeflateEncoder<W> {
    DeflateEncoder::new(sink, Compression::default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Read, Write};

    #[test]
    fn round_trip() {
        let payload: Vec<u8> = (0..2048u32).map(|i| (i % 251) as u8).collect();

        let mut compressed = Vec::new();
        {
            let mut encoder = deflate_stream(&mut compressed);
            encoder.write_all(&payload).unwrap();
            encoder.finish().unwrap();
        }
        assert!(compressed.len() < payload.len());

        let mut restored = Vec::new();
        inflate_stream(&compressed[..])
            .read_to_end(&mut restored)
            .unwrap();
        assert_eq!(restored, payload);
    }
}
