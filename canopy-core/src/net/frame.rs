use crate::address::NodeAddr;
use thiserror::Error as ThisError;

/// Wire sentinel for "no identifier supplied". Kept for the frame contract;
/// the Rust API surfaces use `Option` instead.
pub const BLANK_ID: u16 = 65535;

/// The kind of a frame, carried in the header's `msg_type` byte.
///
/// Values above 127 are system types owned by the routing layer and this
/// core; 1-127 are free for applications (65-127 are acknowledged by the
/// routing layer, 1-64 are not).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageType {
    /// No frame was received.
    None,
    /// Coordinator's answer to an address request.
    AddrResponse,
    /// Joiner telling the coordinator its assignment arrived.
    AddrConfirm,
    /// Keep-alive probe toward the coordinator.
    Ping,
    /// Neighbor discovery, multicast by a joiner and answered unicast.
    Poll,
    /// A joiner asking for a route-address under a named parent.
    ReqAddress,
    /// Id-to-address lookup.
    AddrLookup,
    /// A member handing its address back.
    AddrRelease,
    /// Address-to-id lookup.
    IdLookup,
    /// Application-defined type, 1-127.
    User(u8),
    /// A system type this core does not interpret.
    System(u8),
}

impl From<u8> for MessageType {
    fn from(value: u8) -> Self {
        match value {
            0 => MessageType::None,
            128 => MessageType::AddrResponse,
            129 => MessageType::AddrConfirm,
            130 => MessageType::Ping,
            194 => MessageType::Poll,
            195 => MessageType::ReqAddress,
            196 => MessageType::AddrLookup,
            197 => MessageType::AddrRelease,
            198 => MessageType::IdLookup,
            value @ 1..=127 => MessageType::User(value),
            value => MessageType::System(value),
        }
    }
}

impl From<MessageType> for u8 {
    fn from(kind: MessageType) -> Self {
        match kind {
            MessageType::None => 0,
            MessageType::AddrResponse => 128,
            MessageType::AddrConfirm => 129,
            MessageType::Ping => 130,
            MessageType::Poll => 194,
            MessageType::ReqAddress => 195,
            MessageType::AddrLookup => 196,
            MessageType::AddrRelease => 197,
            MessageType::IdLookup => 198,
            MessageType::User(value) | MessageType::System(value) => value,
        }
    }
}

/// The fixed 8-byte frame header. Multi-byte fields are little-endian on
/// the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    pub src: NodeAddr,
    pub dst: NodeAddr,
    /// Routing-layer frame counter; opaque to this core.
    pub frame_id: u16,
    pub msg_type: MessageType,
    /// Carries the joiner's id during address assignment.
    pub reserved: u8,
}

/// The number of bytes a serialized [`Header`] occupies.
pub const HEADER_OCTETS: usize = 8;

impl Header {
    pub fn new(dst: NodeAddr, msg_type: MessageType) -> Self {
        Self {
            src: NodeAddr::DEFAULT,
            dst,
            frame_id: 0,
            msg_type,
            reserved: 0,
        }
    }

    /// Parses a header from a byte iterator.
    pub fn from_bytes(mut bytes: impl Iterator<Item = u8>) -> Result<Self, ParseError> {
        const HTS: ParseError = ParseError::HeaderTooShort;
        let src = bytes.next_u16_le().ok_or(HTS)?;
        let dst = bytes.next_u16_le().ok_or(HTS)?;
        let frame_id = bytes.next_u16_le().ok_or(HTS)?;
        let msg_type = bytes.next_u8().ok_or(HTS)?;
        let reserved = bytes.next_u8().ok_or(HTS)?;
        Ok(Self {
            src: src.into(),
            dst: dst.into(),
            frame_id,
            msg_type: msg_type.into(),
            reserved,
        })
    }

    pub fn to_bytes(&self) -> [u8; HEADER_OCTETS] {
        let src = self.src.to_u16().to_le_bytes();
        let dst = self.dst.to_u16().to_le_bytes();
        let id = self.frame_id.to_le_bytes();
        [
            src[0],
            src[1],
            dst[0],
            dst[1],
            id[0],
            id[1],
            self.msg_type.into(),
            self.reserved,
        ]
    }
}

/// A parsed frame: header plus raw payload bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub header: Header,
    pub payload: Vec<u8>,
}

impl Frame {
    pub fn new(header: Header, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            header,
            payload: payload.into(),
        }
    }

    /// Parses a frame out of a raw buffer as handed over by the routing
    /// layer. The payload is whatever follows the header.
    pub fn parse(buffer: &[u8]) -> Result<Self, ParseError> {
        let header = Header::from_bytes(buffer.iter().copied())?;
        Ok(Self {
            header,
            payload: buffer[HEADER_OCTETS..].to_vec(),
        })
    }

    /// Serializes the frame back into wire bytes.
    pub fn build(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(HEADER_OCTETS + self.payload.len());
        bytes.extend_from_slice(&self.header.to_bytes());
        bytes.extend_from_slice(&self.payload);
        bytes
    }

    /// Reads a little-endian `u16` at the given payload offset.
    pub fn payload_u16(&self, offset: usize) -> Option<u16> {
        let bytes = self.payload.get(offset..offset + 2)?;
        Some(u16::from_le_bytes([bytes[0], bytes[1]]))
    }

    /// Reads a little-endian `i16` at the given payload offset. Lookup
    /// responses use this to carry "not found" as a negative value.
    pub fn payload_i16(&self, offset: usize) -> Option<i16> {
        self.payload_u16(offset).map(|value| value as i16)
    }
}

#[derive(Debug, ThisError, Clone, Copy, PartialEq, Eq)]
pub enum ParseError {
    #[error("the frame is shorter than a header")]
    HeaderTooShort,
}

/// Byte-iterator helpers for little-endian wire fields.
trait BytesExt: Iterator<Item = u8> {
    fn next_u8(&mut self) -> Option<u8> {
        self.next()
    }

    fn next_u16_le(&mut self) -> Option<u16> {
        let low = self.next()?;
        let high = self.next()?;
        Some(u16::from_le_bytes([low, high]))
    }
}

impl<I: Iterator<Item = u8>> BytesExt for I {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_basic_header() -> anyhow::Result<()> {
        let bytes = [0x01, 0x00, 0x0A, 0x01, 0x2A, 0x00, 195, 7, 0x12, 0x00];
        let frame = Frame::parse(&bytes)?;
        let expected = Header {
            src: NodeAddr::new(0o1),
            dst: NodeAddr::new(0o412),
            frame_id: 42,
            msg_type: MessageType::ReqAddress,
            reserved: 7,
        };
        assert_eq!(frame.header, expected);
        assert_eq!(frame.payload, vec![0x12, 0x00]);
        assert_eq!(frame.payload_u16(0), Some(0o22));
        assert_eq!(frame.build(), bytes);
        Ok(())
    }

    #[test]
    fn rejects_short_buffer() {
        assert_eq!(
            Frame::parse(&[1, 2, 3]),
            Err(ParseError::HeaderTooShort)
        );
    }

    #[test]
    fn negative_lookup_result_round_trips() {
        let mut header = Header::new(NodeAddr::new(0o1), MessageType::AddrLookup);
        header.src = NodeAddr::COORDINATOR;
        let frame = Frame::new(header, (-1i16).to_le_bytes().to_vec());
        let parsed = Frame::parse(&frame.build()).unwrap();
        assert_eq!(parsed.payload_i16(0), Some(-1));
    }

    #[test]
    fn message_type_round_trips() {
        for value in 0..=255u8 {
            let kind = MessageType::from(value);
            assert_eq!(u8::from(kind), value);
        }
    }

    #[test]
    fn user_and_system_split() {
        assert_eq!(MessageType::from(64), MessageType::User(64));
        assert_eq!(MessageType::from(131), MessageType::System(131));
        assert_eq!(MessageType::from(194), MessageType::Poll);
    }
}
