/// `{length, type, stream_id}` header size in bytes. Payload follows
/// immediately after, so a frame occupies `FRAME_HEADER_SIZE + length`.
pub const FRAME_HEADER_SIZE: usize = 3;

/// Largest payload a single frame may carry: `3 + 252 = 255` is the largest
/// frame that still leaves [`crate::ring::RING_SIZE`]'s one reserved slot
/// free.
pub const MAX_PAYLOAD_LEN: usize = 252;

/// Wire-visible packet type. Numeric assignments are ABI-frozen: both peers
/// of a `ComArea` must agree on them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum PacketType {
    Connect = 0,
    ConnectResponse = 1,
    Data = 2,
    Eos = 3,
    Reset = 4,
}

impl PacketType {
    fn from_u8(v: u8) -> Option<Self> {
        match v {
            0 => Some(Self::Connect),
            1 => Some(Self::ConnectResponse),
            2 => Some(Self::Data),
            3 => Some(Self::Eos),
            4 => Some(Self::Reset),
            _ => None,
        }
    }
}

/// Decoded `{length, type, stream_id}` frame header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    pub length: u8,
    pub typ: PacketType,
    pub stream_id: u8,
}

impl Header {
    pub fn encode(&self) -> [u8; FRAME_HEADER_SIZE] {
        [self.length, self.typ as u8, self.stream_id]
    }

    /// Decodes a raw header. Unknown type codes are not expected to appear
    /// on the wire (both peers agree on the fixed set) so this panics rather
    /// than silently misinterpreting a payload as a different frame; this
    /// mirrors treating a garbled header as a hard protocol bug rather than
    /// a recoverable one.
    pub fn decode(raw: [u8; FRAME_HEADER_SIZE]) -> Self {
        let typ = PacketType::from_u8(raw[1])
            .unwrap_or_else(|| panic!("unknown packet type code {}", raw[1]));
        Self { length: raw[0], typ, stream_id: raw[2] }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_round_trips() {
        let header = Header { length: 5, typ: PacketType::Data, stream_id: 42 };
        assert_eq!(Header::decode(header.encode()), header);
    }

    #[test]
    #[should_panic(expected = "unknown packet type code")]
    fn decode_rejects_unknown_type() {
        Header::decode([0, 0xFF, 0]);
    }
}
