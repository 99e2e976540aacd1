//! Basic encoders for fixed byte orders.

use super::BasicEncode;
use byteordered::byteorder::{BigEndian, LittleEndian, WriteBytesExt};
use byteordered::Endianness;
use std::io::{self, Write};

/// A basic encoder for values in little endian.
#[derive(Debug, Default, Clone, Copy)]
pub struct LittleEndianBasicEncoder;

impl BasicEncode for LittleEndianBasicEncoder {
    fn endianness(&self) -> Endianness {
        Endianness::Little
    }

    fn encode_us(&self, to: &mut dyn Write, value: u16) -> io::Result<()> {
        to.write_u16::<LittleEndian>(value)
    }

    fn encode_ul(&self, to: &mut dyn Write, value: u32) -> io::Result<()> {
        to.write_u32::<LittleEndian>(value)
    }

    fn encode_uv(&self, to: &mut dyn Write, value: u64) -> io::Result<()> {
        to.write_u64::<LittleEndian>(value)
    }

    fn encode_ss(&self, to: &mut dyn Write, value: i16) -> io::Result<()> {
        to.write_i16::<LittleEndian>(value)
    }

    fn encode_sl(&self, to: &mut dyn Write, value: i32) -> io::Result<()> {
        to.write_i32::<LittleEndian>(value)
    }

    fn encode_sv(&self, to: &mut dyn Write, value: i64) -> io::Result<()> {
        to.write_i64::<LittleEndian>(value)
    }

    fn encode_fl(&self, to: &mut dyn Write, value: f32) -> io::Result<()> {
        to.write_f32::<LittleEndian>(value)
    }

    fn encode_fd(&self, to: &mut dyn Write, value: f64) -> io::Result<()> {
        to.write_f64::<LittleEndian>(value)
    }
}

/// A basic encoder for values in big endian.
#[derive(Debug, Default, Clone, Copy)]
pub struct BigEndianBasicEncoder;

impl BasicEncode for BigEndianBasicEncoder {
    fn endianness(&self) -> Endianness {
        Endianness::Big
    }

    fn encode_us(&self, to: &mut dyn Write, value: u16) -> io::Result<()> {
        to.write_u16::<BigEndian>(value)
    }

    fn encode_ul(&self, to: &mut dyn Write, value: u32) -> io::Result<()> {
        to.write_u32::<BigEndian>(value)
    }

    fn encode_uv(&self, to: &mut dyn Write, value: u64) -> io::Result<()> {
        to.write_u64::<BigEndian>(value)
    }

    fn encode_ss(&self, to: &mut dyn Write, value: i16) -> io::Result<()> {
        to.write_i16::<BigEndian>(value)
    }

    fn encode_sl(&self, to: &mut dyn Write, value: i32) -> io::Result<()> {
        to.write_i32::<BigEndian>(value)
    }

    fn encode_sv(&self, to: &mut dyn Write, value: i64) -> io::Result<()> {
        to.write_i64::<BigEndian>(value)
    }

    fn encode_fl(&self, to: &mut dyn Write, value: f32) -> io::Result<()> {
        to.write_f32::<BigEndian>(value)
    }

    fn encode_fd(&self, to: &mut dyn Write, value: f64) -> io::Result<()> {
        to.write_f64::<BigEndian>(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dcmkit_core::value::PrimitiveValue;
    use smallvec::smallvec;

    #[test]
    fn binary_value_round() {
        let mut out = Vec::new();
        LittleEndianBasicEncoder.encode_us(&mut out, 0x0201).unwrap();
        assert_eq!(out, vec![0x01, 0x02]);

        let mut out = Vec::new();
        BigEndianBasicEncoder.encode_us(&mut out, 0x0201).unwrap();
        assert_eq!(out, vec![0x02, 0x01]);
    }

    #[test]
    fn primitive_multi_value_encoding() {
        let value = PrimitiveValue::U16(smallvec![1, 2]);
        let mut out = Vec::new();
        let n = LittleEndianBasicEncoder
            .encode_primitive(&mut out, &value)
            .unwrap();
        assert_eq!(n, 4);
        assert_eq!(out, vec![0x01, 0x00, 0x02, 0x00]);
    }

    #[test]
    fn primitive_text_encoding_joins_values() {
        let value = PrimitiveValue::Strs(smallvec!["ORIGINAL".into(), "PRIMARY".into()]);
        let mut out = Vec::new();
        let n = LittleEndianBasicEncoder
            .encode_primitive(&mut out, &value)
            .unwrap();
        assert_eq!(n, 16);
        assert_eq!(out, b"ORIGINAL\\PRIMARY");
    }
}
