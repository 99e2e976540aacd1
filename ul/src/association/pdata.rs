//! Streaming of data set content through P-DATA-TF PDUs.

use byteordered::byteorder::{BigEndian, ReadBytesExt};
use bytes::{Buf, BytesMut};
use std::io::{Read, Write};

use crate::pdu::PDU_HEADER_SIZE;

/// A P-Data value writer.
///
/// Writing through this value automatically splits the content
/// into data PDVs bounded by the negotiated maximum PDU size.
/// The last PDV is flagged as the final fragment when the writer
/// is finished (or dropped).
///
/// Use an association's `send_pdata` method to create one.
#[must_use]
pub struct PDataWriter<W: Write> {
    buffer: Vec<u8>,
    stream: W,
    presentation_context_id: u8,
    max_data_length: u32,
    finished: bool,
}

impl<W> PDataWriter<W>
where
    W: Write,
{
    /// Construct a new P-Data value writer.
    pub(crate) fn new(stream: W, presentation_context_id: u8, max_pdu_length: u32) -> Self {
        let max_data_length = max_pdu_length - PDU_HEADER_SIZE - 6;
        PDataWriter {
            stream,
            presentation_context_id,
            max_data_length,
            buffer: Vec::with_capacity(max_data_length as usize),
            finished: false,
        }
    }

    /// Send the header of a single P-DATA-TF PDU
    /// holding a single data fragment.
    fn send_pdata_header(&mut self, data_len: u32, is_last: bool) -> std::io::Result<()> {
        let mut control = 0x00;
        if is_last {
            control |= 0x02;
        }

        let pdu_len_bytes = (data_len + 2 + 4).to_be_bytes();
        let pdv_len_bytes = (data_len + 2).to_be_bytes();
        let header = [
            // PDU type and reserved byte
            0x04,
            0x00,
            // full PDU length
            pdu_len_bytes[0],
            pdu_len_bytes[1],
            pdu_len_bytes[2],
            pdu_len_bytes[3],
            // PDV length (data plus context id and control byte)
            pdv_len_bytes[0],
            pdv_len_bytes[1],
            pdv_len_bytes[2],
            pdv_len_bytes[3],
            self.presentation_context_id,
            control,
        ];
        self.stream.write_all(&header)
    }

    /// Send the remaining buffered content as the final fragment.
    pub fn finish(&mut self) -> std::io::Result<()> {
        if self.finished {
            return Ok(());
        }
        self.dispatch_excess_data()?;
        // the trailing PDV carries the last-fragment flag,
        // even when it is empty
        self.send_pdata_header(self.buffer.len() as u32, true)?;
        self.stream.write_all(&self.buffer)?;
        self.buffer.clear();
        self.finished = true;
        self.stream.flush()
    }

    fn dispatch_excess_data(&mut self) -> std::io::Result<()> {
        while self.buffer.len() > self.max_data_length as usize {
            self.send_pdata_header(self.max_data_length, false)?;
            self.stream
                .write_all(&self.buffer[..self.max_data_length as usize])?;
            self.buffer.drain(..self.max_data_length as usize);
        }
        Ok(())
    }
}

impl<W> Write for PDataWriter<W>
where
    W: Write,
{
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.buffer.extend_from_slice(buf);
        self.dispatch_excess_data()?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl<W> Drop for PDataWriter<W>
where
    W: Write,
{
    fn drop(&mut self) {
        let _ = self.finish();
    }
}

/// A reader over the data set fragments of incoming P-DATA-TF
/// PDUs, presenting them as one continuous byte stream which ends
/// at the fragment flagged as last.
///
/// Command fragments are not expected through this reader;
/// the caller separates command and data traffic beforehand.
#[must_use]
pub struct PDataReader<R: Read> {
    stream: R,
    buffer: BytesMut,
    max_pdu_length: u32,
    last_seen: bool,
    presentation_context_id: Option<u8>,
}

impl<R> PDataReader<R>
where
    R: Read,
{
    pub(crate) fn new(stream: R, max_pdu_length: u32) -> Self {
        PDataReader {
            stream,
            buffer: BytesMut::with_capacity(max_pdu_length as usize),
            max_pdu_length,
            last_seen: false,
            presentation_context_id: None,
        }
    }

    /// The presentation context the fragments arrived on,
    /// known after the first fragment.
    pub fn presentation_context_id(&self) -> Option<u8> {
        self.presentation_context_id
    }

    fn fetch_pdu(&mut self) -> std::io::Result<()> {
        // read a raw P-DATA-TF PDU and queue its PDV data
        let mut head = [0u8; 2];
        self.stream.read_exact(&mut head)?;
        if head[0] != 0x04 {
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                format!("expected P-DATA-TF, got PDU type {:#04x}", head[0]),
            ));
        }
        let pdu_length = self.stream.read_u32::<BigEndian>()?;
        if pdu_length > self.max_pdu_length.max(crate::pdu::MAXIMUM_PDU_SIZE) {
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                "PDU length exceeds the admitted maximum",
            ));
        }
        let mut payload = vec![0u8; pdu_length as usize];
        self.stream.read_exact(&mut payload)?;

        let mut cursor = &payload[..];
        while !cursor.is_empty() {
            let pdv_length = cursor.read_u32::<BigEndian>()?;
            let context_id = cursor.read_u8()?;
            let control = cursor.read_u8()?;
            match self.presentation_context_id {
                None => self.presentation_context_id = Some(context_id),
                Some(expected) if expected != context_id => {
                    return Err(std::io::Error::new(
                        std::io::ErrorKind::InvalidData,
                        "presentation context id changed mid-message",
                    ));
                }
                Some(_) => {}
            }
            let data_len = pdv_length as usize - 2;
            if cursor.len() < data_len {
                return Err(std::io::Error::new(
                    std::io::ErrorKind::UnexpectedEof,
                    "PDV data cut short",
                ));
            }
            self.buffer.extend_from_slice(&cursor[..data_len]);
            cursor = &cursor[data_len..];
            if control & 0x02 != 0 {
                self.last_seen = true;
            }
        }
        Ok(())
    }
}

impl<R> Read for PDataReader<R>
where
    R: Read,
{
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        while self.buffer.is_empty() {
            if self.last_seen {
                return Ok(0);
            }
            self.fetch_pdu()?;
        }
        let n = buf.len().min(self.buffer.len());
        self.buffer.copy_to_slice(&mut buf[..n]);
        Ok(n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pdu::{read_pdu, Pdu, PDataValueType, MINIMUM_PDU_SIZE};
    use std::io::{Read, Write};

    #[test]
    fn write_small_pdata() {
        let presentation_context_id = 12;
        let mut buf = Vec::new();
        {
            let mut writer =
                PDataWriter::new(&mut buf, presentation_context_id, MINIMUM_PDU_SIZE);
            writer.write_all(&(0..64).collect::<Vec<u8>>()).unwrap();
            writer.finish().unwrap();
        }

        let pdu = read_pdu(&mut &buf[..], MINIMUM_PDU_SIZE, true).unwrap();
        match pdu {
            Pdu::PData { data } => {
                assert_eq!(data.len(), 1);
                assert_eq!(data[0].value_type, PDataValueType::Data);
                assert_eq!(data[0].presentation_context_id, presentation_context_id);
                assert!(data[0].is_last);
                assert_eq!(data[0].data, (0..64).collect::<Vec<u8>>());
            }
            pdu => panic!("expected PData, got {:?}", pdu),
        }
    }

    #[test]
    fn write_large_pdata_splits_into_pdus() {
        let presentation_context_id = 32;
        let payload: Vec<u8> = (0..20_000u32).map(|i| i as u8).collect();

        let mut buf = Vec::new();
        {
            let mut writer =
                PDataWriter::new(&mut buf, presentation_context_id, MINIMUM_PDU_SIZE);
            writer.write_all(&payload).unwrap();
            writer.finish().unwrap();
        }

        let mut cursor = &buf[..];
        let mut collected = Vec::new();
        let mut last_flags = Vec::new();
        while !cursor.is_empty() {
            match read_pdu(&mut cursor, MINIMUM_PDU_SIZE, true).unwrap() {
                Pdu::PData { data } => {
                    for pdv in data {
                        assert_eq!(pdv.presentation_context_id, presentation_context_id);
                        assert!(
                            pdv.data.len() as u32 <= MINIMUM_PDU_SIZE - PDU_HEADER_SIZE - 6
                        );
                        last_flags.push(pdv.is_last);
                        collected.extend(pdv.data);
                    }
                }
                pdu => panic!("expected PData, got {:?}", pdu),
            }
        }
        assert_eq!(collected, payload);
        // only the trailing PDV carries the last-fragment flag
        assert!(last_flags.pop().unwrap());
        assert!(last_flags.iter().all(|&f| !f));
    }

    #[test]
    fn reader_reassembles_writer_output() {
        let payload: Vec<u8> = (0..12_345u32).map(|i| (i % 251) as u8).collect();
        let mut wire = Vec::new();
        {
            let mut writer = PDataWriter::new(&mut wire, 5, MINIMUM_PDU_SIZE);
            writer.write_all(&payload).unwrap();
            writer.finish().unwrap();
        }

        let mut reader = PDataReader::new(&wire[..], MINIMUM_PDU_SIZE);
        let mut restored = Vec::new();
        reader.read_to_end(&mut restored).unwrap();
        assert_eq!(restored, payload);
        assert_eq!(reader.presentation_context_id(), Some(5));
    }
}
