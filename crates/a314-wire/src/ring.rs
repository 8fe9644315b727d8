use crate::{
    error::WireError,
    frame::{FRAME_HEADER_SIZE, Header, MAX_PAYLOAD_LEN, PacketType},
};

/// Capacity of a single [`Ring`] in bytes. One slot is always reserved so
/// `used == RING_SIZE` never happens, which is what lets an empty ring
/// (`head == tail`) be told apart from a full one.
pub const RING_SIZE: usize = 256;

/// One direction of the `ComArea`'s shared-memory mailbox: a 256-byte ring of
/// `{length, type, stream_id}` framed records, addressed by free-running
/// `u8` head/tail counters.
///
/// `head` is advanced only by the reader, `tail` only by the writer; the two
/// sides never touch the other's index. Byte offsets wrap modulo
/// [`RING_SIZE`] but frames themselves are never required to NOT straddle
/// the wrap point.
#[repr(C)]
pub struct Ring {
    buf: [u8; RING_SIZE],
    head: u8,
    tail: u8,
}

impl Default for Ring {
    fn default() -> Self {
        Self { buf: [0; RING_SIZE], head: 0, tail: 0 }
    }
}

impl Ring {
    /// Bytes currently occupied. Invariant I1: always `<= 255`.
    #[inline]
    pub fn used(&self) -> usize {
        self.tail.wrapping_sub(self.head) as usize
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.head == self.tail
    }

    /// Whether a frame carrying `payload_len` bytes would fit without
    /// exceeding 255 used bytes (one slot always kept free).
    #[inline]
    pub fn room_for(&self, payload_len: usize) -> bool {
        self.used() + FRAME_HEADER_SIZE + payload_len <= RING_SIZE - 1
    }

    /// Writes `{length, type, stream_id}` followed by `payload` at `tail`,
    /// advancing `tail` by `3 + payload.len()`. Never partially writes: the
    /// caller must have already checked [`Ring::room_for`].
    pub fn append(
        &mut self,
        typ: PacketType,
        stream_id: u8,
        payload: &[u8],
    ) -> Result<(), WireError> {
        if payload.len() > MAX_PAYLOAD_LEN {
            return Err(WireError::PayloadTooLarge(payload.len()));
        }
        if !self.room_for(payload.len()) {
            return Err(WireError::RingFull(FRAME_HEADER_SIZE + payload.len()));
        }

        let header = Header { length: payload.len() as u8, typ, stream_id };
        self.write_bytes(&header.encode());
        self.write_bytes(payload);
        Ok(())
    }

    #[inline]
    fn write_bytes(&mut self, bytes: &[u8]) {
        for &b in bytes {
            let idx = self.tail as usize % RING_SIZE;
            self.buf[idx] = b;
            self.tail = self.tail.wrapping_add(1);
        }
    }

    /// Reads the 3-byte header at `head` without advancing it. Returns
    /// `None` if fewer than 3 bytes are available.
    pub fn peek_header(&self) -> Option<Header> {
        if self.used() < FRAME_HEADER_SIZE {
            return None;
        }
        let mut raw = [0u8; FRAME_HEADER_SIZE];
        for (i, slot) in raw.iter_mut().enumerate() {
            let idx = (self.head as usize + i) % RING_SIZE;
            *slot = self.buf[idx];
        }
        Some(Header::decode(raw))
    }

    /// Copies `len` payload bytes starting right after the header (offset
    /// `3`) without advancing `head`. Caller must have already confirmed via
    /// [`Ring::peek_header`] that the full frame is present.
    pub fn peek_payload(&self, len: usize) -> Vec<u8> {
        let mut out = Vec::with_capacity(len);
        for i in 0..len {
            let idx = (self.head as usize + FRAME_HEADER_SIZE + i) % RING_SIZE;
            out.push(self.buf[idx]);
        }
        out
    }

    /// Advances `head` by `n` bytes, releasing them back to the writer.
    #[inline]
    pub fn consume(&mut self, n: usize) {
        self.head = self.head.wrapping_add(n as u8);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_ring_has_no_header() {
        let ring = Ring::default();
        assert!(ring.is_empty());
        assert_eq!(ring.used(), 0);
        assert!(ring.peek_header().is_none());
    }

    #[test]
    fn append_then_consume_round_trips() {
        let mut ring = Ring::default();
        ring.append(PacketType::Data, 7, b"hello").unwrap();
        assert_eq!(ring.used(), FRAME_HEADER_SIZE + 5);

        let header = ring.peek_header().unwrap();
        assert_eq!(header.typ, PacketType::Data);
        assert_eq!(header.stream_id, 7);
        assert_eq!(header.length, 5);

        let payload = ring.peek_payload(header.length as usize);
        assert_eq!(payload, b"hello");

        ring.consume(FRAME_HEADER_SIZE + header.length as usize);
        assert!(ring.is_empty());
    }

    #[test]
    fn payload_of_252_fits_but_253_is_rejected() {
        let mut ring = Ring::default();
        assert!(ring.room_for(252));
        assert!(!ring.room_for(253));
        let err = ring.append(PacketType::Data, 0, &[0u8; 253]).unwrap_err();
        assert!(matches!(err, WireError::PayloadTooLarge(253)));
    }

    #[test]
    fn full_ring_rejects_append() {
        let mut ring = Ring::default();
        // 255 used bytes is the max; fill it with one big frame.
        ring.append(PacketType::Data, 0, &[0u8; 252]).unwrap();
        assert_eq!(ring.used(), 255);
        assert!(!ring.room_for(0));
        let err = ring.append(PacketType::Eos, 0, &[]).unwrap_err();
        assert!(matches!(err, WireError::RingFull(_)));
    }

    #[test]
    fn indices_wrap_past_256() {
        let mut ring = Ring::default();
        // Push head/tail near the wrap boundary, then drain and refill.
        for _ in 0..40 {
            ring.append(PacketType::Data, 1, &[0xAB; 5]).unwrap();
            let header = ring.peek_header().unwrap();
            ring.consume(FRAME_HEADER_SIZE + header.length as usize);
        }
        assert!(ring.is_empty());
        ring.append(PacketType::Data, 2, b"wrap!").unwrap();
        let header = ring.peek_header().unwrap();
        assert_eq!(ring.peek_payload(header.length as usize), b"wrap!");
    }
}
