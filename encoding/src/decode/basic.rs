//! Basic decoders for fixed byte orders.

use super::BasicDecode;
use byteordered::byteorder::{BigEndian, LittleEndian, ReadBytesExt};
use byteordered::Endianness;
use std::io::{self, Read};

/// A basic decoder for values in little endian.
#[derive(Debug, Default, Clone, Copy)]
pub struct LittleEndianBasicDecoder;

impl BasicDecode for LittleEndianBasicDecoder {
    fn endianness(&self) -> Endianness {
        Endianness::Little
    }

    fn decode_us(&self, source: &mut dyn Read) -> io::Result<u16> {
        source.read_u16::<LittleEndian>()
    }

    fn decode_ul(&self, source: &mut dyn Read) -> io::Result<u32> {
        source.read_u32::<LittleEndian>()
    }

    fn decode_uv(&self, source: &mut dyn Read) -> io::Result<u64> {
        source.read_u64::<LittleEndian>()
    }

    fn decode_ss(&self, source: &mut dyn Read) -> io::Result<i16> {
        source.read_i16::<LittleEndian>()
    }

    fn decode_sl(&self, source: &mut dyn Read) -> io::Result<i32> {
        source.read_i32::<LittleEndian>()
    }

    fn decode_sv(&self, source: &mut dyn Read) -> io::Result<i64> {
        source.read_i64::<LittleEndian>()
    }

    fn decode_fl(&self, source: &mut dyn Read) -> io::Result<f32> {
        source.read_f32::<LittleEndian>()
    }

    fn decode_fd(&self, source: &mut dyn Read) -> io::Result<f64> {
        source.read_f64::<LittleEndian>()
    }
}

/// A basic decoder for values in big endian.
#[derive(Debug, Default, Clone, Copy)]
pub struct BigEndianBasicDecoder;

impl BasicDecode for BigEndianBasicDecoder {
    fn endianness(&self) -> Endianness {
        Endianness::Big
    }

    fn decode_us(&self, source: &mut dyn Read) -> io::Result<u16> {
        source.read_u16::<BigEndian>()
    }

    fn decode_ul(&self, source: &mut dyn Read) -> io::Result<u32> {
        source.read_u32::<BigEndian>()
    }

    fn decode_uv(&self, source: &mut dyn Read) -> io::Result<u64> {
        source.read_u64::<BigEndian>()
    }

    fn decode_ss(&self, source: &mut dyn Read) -> io::Result<i16> {
        source.read_i16::<BigEndian>()
    }

    fn decode_sl(&self, source: &mut dyn Read) -> io::Result<i32> {
        source.read_i32::<BigEndian>()
    }

    fn decode_sv(&self, source: &mut dyn Read) -> io::Result<i64> {
        source.read_i64::<BigEndian>()
    }

    fn decode_fl(&self, source: &mut dyn Read) -> io::Result<f32> {
        source.read_f32::<BigEndian>()
    }

    fn decode_fd(&self, source: &mut dyn Read) -> io::Result<f64> {
        source.read_f64::<BigEndian>()
    }
}

/// A basic decoder with the byte order chosen at run time.
#[derive(Debug, Clone, Copy)]
pub enum BasicDecoder {
    /// a little endian decoder
    Le(LittleEndianBasicDecoder),
    /// a big endian decoder
    Be(BigEndianBasicDecoder),
}

impl BasicDecoder {
    /// Create a basic decoder for the given byte order.
    pub fn new(endianness: Endianness) -> Self {
        match endianness {
            Endianness::Little => BasicDecoder::Le(LittleEndianBasicDecoder),
            Endianness::Big => BasicDecoder::Be(BigEndianBasicDecoder),
        }
    }
}

impl From<Endianness> for BasicDecoder {
    fn from(endianness: Endianness) -> Self {
        BasicDecoder::new(endianness)
    }
}

macro_rules! dispatch {
    ($name:ident, $typ:ty) => {
        fn $name(&self, source: &mut dyn Read) -> io::Result<$typ> {
            match self {
                BasicDecoder::Le(d) => d.$name(source),
                BasicDecoder::Be(d) => d.$name(source),
            }
        }
    };
}

impl BasicDecode for BasicDecoder {
    fn endianness(&self) -> Endianness {
        match self {
            BasicDecoder::Le(_) => Endianness::Little,
            BasicDecoder::Be(_) => Endianness::Big,
        }
    }

    dispatch!(decode_us, u16);
    dispatch!(decode_ul, u32);
    dispatch!(decode_uv, u64);
    dispatch!(decode_ss, i16);
    dispatch!(decode_sl, i32);
    dispatch!(decode_sv, i64);
    dispatch!(decode_fl, f32);
    dispatch!(decode_fd, f64);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn little_endian_values() {
        let data = [0x01, 0x02, 0x03, 0x04];
        let d = LittleEndianBasicDecoder;
        assert_eq!(d.decode_us(&mut &data[..]).unwrap(), 0x0201);
        assert_eq!(d.decode_ul(&mut &data[..]).unwrap(), 0x0403_0201);
    }

    #[test]
    fn big_endian_values() {
        let data = [0x01, 0x02, 0x03, 0x04];
        let d = BigEndianBasicDecoder;
        assert_eq!(d.decode_us(&mut &data[..]).unwrap(), 0x0102);
        assert_eq!(d.decode_ul(&mut &data[..]).unwrap(), 0x0102_0304);
    }

    #[test]
    fn tag_decoding_by_endianness() {
        let data = [0x08, 0x00, 0x60, 0x00];
        let le = BasicDecoder::new(Endianness::Little);
        assert_eq!(
            le.decode_tag(&mut &data[..]).unwrap(),
            dcmkit_core::Tag(0x0008, 0x0060)
        );
        let data = [0x00, 0x08, 0x00, 0x60];
        let be = BasicDecoder::new(Endianness::Big);
        assert_eq!(
            be.decode_tag(&mut &data[..]).unwrap(),
            dcmkit_core::Tag(0x0008, 0x0060)
        );
    }
}
