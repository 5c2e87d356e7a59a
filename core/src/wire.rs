//! Wire-level message framing and field primitives
//!
//! A recording is a sequence of framed records, each carrying one opcoded
//! message body. [`FramedReader`] walks the records; [`MsgReader`] reads
//! the fixed- and variable-width fields inside one body. The bit-level
//! codec underneath is fixed: little-endian integers, NUL-terminated
//! strings, and delta payloads as `(field index, value)` pairs.

use byteorder::{ByteOrder, LittleEndian};

use crate::error::{Error, Result};
use crate::{BIG_INFO_STRING, MAX_MESSAGE_LENGTH};

/// Sequence value of the terminator record
pub const TERMINATOR_SEQUENCE: i32 = -1;

/// Byte-count value of the terminator record
pub const TERMINATOR_BYTE_COUNT: u32 = 0xFFFF_FFFF;

/// Server-to-client message opcodes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Opcode {
    Bad,
    Nop,
    Gamestate,
    ConfigString,
    Baseline,
    ServerCommand,
    Download,
    Snapshot,
    Eof,
    Extension,
    Voip,
}

impl Opcode {
    /// Decode an opcode byte. Unknown values are reported, not mapped to
    /// [`Opcode::Bad`], so the caller can name the offender.
    pub fn from_u8(value: u8) -> Result<Opcode> {
        Ok(match value {
            0 => Opcode::Bad,
            1 => Opcode::Nop,
            2 => Opcode::Gamestate,
            3 => Opcode::ConfigString,
            4 => Opcode::Baseline,
            5 => Opcode::ServerCommand,
            6 => Opcode::Download,
            7 => Opcode::Snapshot,
            8 => Opcode::Eof,
            9 => Opcode::Extension,
            10 => Opcode::Voip,
            other => {
                return Err(Error::InvalidDemoFile(format!("unknown opcode {other}")));
            }
        })
    }
}

/// One framed message, borrowed from the recording bytes
#[derive(Debug, Clone, Copy)]
pub struct FramedMessage<'a> {
    /// Sequence number assigned by the server
    pub sequence: i32,
    /// Byte offset of this record's header within the recording
    pub offset: u64,
    /// Byte offset one past this record's body within the recording
    pub end_offset: u64,
    /// The message body
    pub body: &'a [u8],
}

/// Walks the framed records of one recording held in memory.
pub struct FramedReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> FramedReader<'a> {
    /// Wrap a whole recording.
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Read the next framed message.
    ///
    /// Returns `Ok(None)` at the terminator record and on a cleanly
    /// truncated final record (both are normal termination). A body
    /// longer than [`MAX_MESSAGE_LENGTH`] is fatal for the recording.
    pub fn next_message(&mut self) -> Result<Option<FramedMessage<'a>>> {
        let offset = self.pos as u64;
        let remaining = self.data.len() - self.pos;
        if remaining < 8 {
            return Ok(None);
        }

        let sequence = LittleEndian::read_i32(&self.data[self.pos..]);
        let byte_count = LittleEndian::read_u32(&self.data[self.pos + 4..]);
        if sequence == TERMINATOR_SEQUENCE && byte_count == TERMINATOR_BYTE_COUNT {
            self.pos += 8;
            return Ok(None);
        }

        let byte_count = byte_count as usize;
        if byte_count > MAX_MESSAGE_LENGTH {
            return Err(Error::InvalidDemoFile(format!(
                "message body of {byte_count} bytes exceeds the {MAX_MESSAGE_LENGTH} byte limit"
            )));
        }
        if remaining - 8 < byte_count {
            // Truncated final record: everything before it stands.
            self.pos = self.data.len();
            return Ok(None);
        }

        let body_start = self.pos + 8;
        let body = &self.data[body_start..body_start + byte_count];
        self.pos = body_start + byte_count;

        Ok(Some(FramedMessage {
            sequence,
            offset,
            end_offset: self.pos as u64,
            body,
        }))
    }

}

/// Reads the fields inside one message body.
pub struct MsgReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> MsgReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Bytes not yet consumed.
    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    fn need(&self, count: usize) -> Result<()> {
        if self.remaining() < count {
            return Err(Error::InvalidDemoFile(format!(
                "message truncated: wanted {count} more bytes, have {}",
                self.remaining()
            )));
        }
        Ok(())
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        self.need(1)?;
        let v = self.data[self.pos];
        self.pos += 1;
        Ok(v)
    }

    pub fn read_u16(&mut self) -> Result<u16> {
        self.need(2)?;
        let v = LittleEndian::read_u16(&self.data[self.pos..]);
        self.pos += 2;
        Ok(v)
    }

    pub fn read_i32(&mut self) -> Result<i32> {
        self.need(4)?;
        let v = LittleEndian::read_i32(&self.data[self.pos..]);
        self.pos += 4;
        Ok(v)
    }

    /// Read the next opcode, looking through `Extension` wrappers.
    pub fn read_opcode(&mut self) -> Result<Opcode> {
        loop {
            let op = Opcode::from_u8(self.read_u8()?)?;
            if op != Opcode::Extension {
                return Ok(op);
            }
            // Extension wraps the following opcode for legacy clients.
        }
    }

    /// Read `count` raw bytes.
    pub fn read_bytes(&mut self, count: usize) -> Result<&'a [u8]> {
        self.need(count)?;
        let slice = &self.data[self.pos..self.pos + count];
        self.pos += count;
        Ok(slice)
    }

    /// Discard everything left in the body.
    pub fn skip_to_end(&mut self) {
        self.pos = self.data.len();
    }

    /// Skip a `u16`-length-prefixed blob (downloads, voip).
    pub fn skip_blob(&mut self) -> Result<()> {
        let len = self.read_u16()? as usize;
        self.need(len)?;
        self.pos += len;
        Ok(())
    }

    /// Read a NUL-terminated string, capped at [`BIG_INFO_STRING`] bytes.
    ///
    /// Bytes that are not valid UTF-8 are replaced; demo text is ASCII in
    /// practice, color escapes included.
    pub fn read_string(&mut self) -> Result<String> {
        let start = self.pos;
        let limit = (start + BIG_INFO_STRING).min(self.data.len());
        let mut end = start;
        while end < limit && self.data[end] != 0 {
            end += 1;
        }
        if end == limit {
            return Err(Error::InvalidDemoFile(
                "unterminated string in message".into(),
            ));
        }
        let text = String::from_utf8_lossy(&self.data[start..end]).into_owned();
        self.pos = end + 1;
        Ok(text)
    }

    /// Read a delta field block: `u8 count`, then `count` pairs of
    /// `(u8 field index, i32 value)`, visited in wire order.
    pub fn read_field_block(&mut self, mut apply: impl FnMut(u8, i32) -> Result<()>) -> Result<()> {
        let count = self.read_u8()?;
        for _ in 0..count {
            let index = self.read_u8()?;
            let value = self.read_i32()?;
            apply(index, value)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(seq: i32, body: &[u8]) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(&seq.to_le_bytes());
        out.extend_from_slice(&(body.len() as u32).to_le_bytes());
        out.extend_from_slice(body);
        out
    }

    #[test]
    fn test_framing_roundtrip() {
        let mut data = frame(3, b"abc");
        data.extend_from_slice(&frame(4, b"defg"));
        data.extend_from_slice(&TERMINATOR_SEQUENCE.to_le_bytes());
        data.extend_from_slice(&TERMINATOR_BYTE_COUNT.to_le_bytes());

        let mut reader = FramedReader::new(&data);
        let first = reader.next_message().unwrap().unwrap();
        assert_eq!(first.sequence, 3);
        assert_eq!(first.body, b"abc");
        assert_eq!(first.offset, 0);
        let second = reader.next_message().unwrap().unwrap();
        assert_eq!(second.sequence, 4);
        assert_eq!(second.body, b"defg");
        assert!(reader.next_message().unwrap().is_none());
    }

    #[test]
    fn test_truncated_final_record_is_normal_termination() {
        let mut data = frame(1, b"abc");
        data.extend_from_slice(&frame(2, b"full body"));
        data.truncate(data.len() - 4);

        let mut reader = FramedReader::new(&data);
        assert!(reader.next_message().unwrap().is_some());
        assert!(reader.next_message().unwrap().is_none());
    }

    #[test]
    fn test_oversized_body_is_fatal() {
        let mut data = Vec::new();
        data.extend_from_slice(&1i32.to_le_bytes());
        data.extend_from_slice(&(MAX_MESSAGE_LENGTH as u32 + 1).to_le_bytes());
        let mut reader = FramedReader::new(&data);
        assert!(matches!(
            reader.next_message(),
            Err(Error::InvalidDemoFile(_))
        ));
    }

    #[test]
    fn test_msg_primitives() {
        let mut body = Vec::new();
        body.push(7u8);
        body.extend_from_slice(&0x1234u16.to_le_bytes());
        body.extend_from_slice(&(-5i32).to_le_bytes());
        body.extend_from_slice(b"hello\0");

        let mut msg = MsgReader::new(&body);
        assert_eq!(msg.read_u8().unwrap(), 7);
        assert_eq!(msg.read_u16().unwrap(), 0x1234);
        assert_eq!(msg.read_i32().unwrap(), -5);
        assert_eq!(msg.read_string().unwrap(), "hello");
        assert_eq!(msg.remaining(), 0);
        assert!(msg.read_u8().is_err());
    }

    #[test]
    fn test_extension_is_transparent() {
        let body = [9u8, 9, 8];
        let mut msg = MsgReader::new(&body);
        assert_eq!(msg.read_opcode().unwrap(), Opcode::Eof);
    }

    #[test]
    fn test_field_block() {
        let body = [2u8, 0, 1, 0, 0, 0, 3, 2, 0, 0, 0];
        let mut msg = MsgReader::new(&body);
        let mut seen = Vec::new();
        msg.read_field_block(|idx, val| {
            seen.push((idx, val));
            Ok(())
        })
        .unwrap();
        assert_eq!(seen, vec![(0, 1), (3, 2)]);
    }
}
