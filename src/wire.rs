// Binary framing: a fixed header of big-endian message type and payload length,
// followed by a JSON payload. Partial input is buffered, never an error.

use byteorder::{BigEndian, ByteOrder};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::ProtocolError;


pub const HEADER_SIZE: usize = 6;
pub const MAX_PAYLOAD_SIZE: u32 = 64 * 1024;

#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Frame {
    pub message_type: u16,
    pub payload: Vec<u8>,
}

impl Frame {
    pub fn new(message_type: u16, payload: Vec<u8>) -> Self {
        Frame { message_type, payload }
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut buf = vec![0; HEADER_SIZE + self.payload.len()];
        BigEndian::write_u16(&mut buf[0..2], self.message_type);
        BigEndian::write_u32(&mut buf[2..6], self.payload.len() as u32);
        buf[HEADER_SIZE..].copy_from_slice(&self.payload);
        buf
    }

    // Returns the frame and the number of bytes consumed, or `None` if `buf` does
    // not yet hold a complete frame.
    pub fn decode(buf: &[u8]) -> Result<Option<(Frame, usize)>, ProtocolError> {
        if buf.len() < HEADER_SIZE {
            return Ok(None);
        }
        let message_type = BigEndian::read_u16(&buf[0..2]);
        let payload_len = BigEndian::read_u32(&buf[2..6]);
        if payload_len > MAX_PAYLOAD_SIZE {
            return Err(ProtocolError::PayloadTooLarge(payload_len));
        }
        let total = HEADER_SIZE + payload_len as usize;
        if buf.len() < total {
            return Ok(None);
        }
        let payload = buf[HEADER_SIZE..total].to_vec();
        Ok(Some((Frame { message_type, payload }, total)))
    }
}

// Accumulates raw socket bytes and yields complete frames.
#[derive(Default, Debug)]
pub struct FrameReader {
    buf: Vec<u8>,
}

impl FrameReader {
    pub fn new() -> Self {
        FrameReader { buf: Vec::new() }
    }

    pub fn push(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    pub fn next_frame(&mut self) -> Result<Option<Frame>, ProtocolError> {
        match Frame::decode(&self.buf)? {
            Some((frame, consumed)) => {
                self.buf.drain(..consumed);
                Ok(Some(frame))
            }
            None => Ok(None),
        }
    }
}

pub fn encode_payload<T: Serialize>(value: &T) -> Vec<u8> {
    serde_json::to_vec(value).unwrap_or_default()
}

// Lenient decoding for client payloads: anything unparseable is treated as an
// empty record, so missing fields fall back to their defaults.
pub fn parse_payload<T: DeserializeOwned + Default>(bytes: &[u8]) -> T {
    serde_json::from_slice(bytes).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn frame_round_trip() {
        let frame = Frame::new(0x0020, br#"{"game_id":"pvp_1","move":"e2e4"}"#.to_vec());
        let bytes = frame.encode();
        let (decoded, consumed) = Frame::decode(&bytes).unwrap().unwrap();
        assert_eq!(consumed, bytes.len());
        assert_eq!(decoded, frame);
    }

    #[test]
    fn incomplete_input_is_buffered() {
        let frame = Frame::new(0x0002, br#"{"username":"alice"}"#.to_vec());
        let bytes = frame.encode();
        let mut reader = FrameReader::new();
        reader.push(&bytes[..3]);
        assert_eq!(reader.next_frame().unwrap(), None);
        reader.push(&bytes[3..10]);
        assert_eq!(reader.next_frame().unwrap(), None);
        reader.push(&bytes[10..]);
        assert_eq!(reader.next_frame().unwrap(), Some(frame));
        assert_eq!(reader.next_frame().unwrap(), None);
    }

    #[test]
    fn two_frames_in_one_push() {
        let a = Frame::new(0x0010, vec![]);
        let b = Frame::new(0x0011, br#"{}"#.to_vec());
        let mut reader = FrameReader::new();
        let mut bytes = a.encode();
        bytes.extend_from_slice(&b.encode());
        reader.push(&bytes);
        assert_eq!(reader.next_frame().unwrap(), Some(a));
        assert_eq!(reader.next_frame().unwrap(), Some(b));
        assert_eq!(reader.next_frame().unwrap(), None);
    }

    #[test]
    fn oversized_payload_is_rejected() {
        let mut bytes = vec![0; HEADER_SIZE];
        BigEndian::write_u16(&mut bytes[0..2], 0x0001);
        BigEndian::write_u32(&mut bytes[2..6], MAX_PAYLOAD_SIZE + 1);
        assert_eq!(
            Frame::decode(&bytes),
            Err(ProtocolError::PayloadTooLarge(MAX_PAYLOAD_SIZE + 1))
        );
    }

    #[test]
    fn garbage_payload_parses_as_default() {
        #[derive(Default, PartialEq, Debug, serde::Deserialize)]
        struct P {
            name: String,
        }
        let p: P = parse_payload(b"not json at all");
        assert_eq!(p, P::default());
    }
}
