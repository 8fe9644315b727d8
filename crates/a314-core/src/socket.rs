use std::collections::VecDeque;

use crate::{flags::SocketFlags, ids::OwnerId, ids::StreamId, request::ReplyTx};

/// Which frame a stashed [`PendingWrite`] eventually becomes; a WRITE and an
/// EOS client request share one slot since at most one may be outstanding
/// at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteKind {
    Data,
    Eos,
}

/// An outstanding client CONNECT, stashed until either the send queue frees
/// up (to emit the `CONNECT` frame) or a `CONNECT_RESPONSE` arrives (to
/// reply). The service name is kept around in case emission is deferred.
pub struct PendingConnect {
    pub service: Vec<u8>,
    pub reply: ReplyTx,
}

/// An outstanding client READ, stashed until data, peer EOS, or a RESET
/// resolves it.
pub struct PendingRead {
    pub capacity: usize,
    pub reply: ReplyTx,
}

/// An outstanding client WRITE or EOS, stashed until the send queue frees up
/// enough ring space to emit the frame.
pub struct PendingWrite {
    pub kind: WriteKind,
    pub payload: Vec<u8>,
    pub reply: ReplyTx,
}

/// One multiplexed stream's full state.
pub struct Socket {
    pub stream_id: StreamId,
    pub owner: OwnerId,
    pub local_id: u32,
    pub flags: SocketFlags,
    pub pending_connect: Option<PendingConnect>,
    pub pending_read: Option<PendingRead>,
    pub pending_write: Option<PendingWrite>,
    pub rq: VecDeque<Vec<u8>>,
    pub in_send_queue: bool,
}

impl Socket {
    pub fn new(stream_id: StreamId, owner: OwnerId, local_id: u32) -> Self {
        Self {
            stream_id,
            owner,
            local_id,
            flags: SocketFlags::empty(),
            pending_connect: None,
            pending_read: None,
            pending_write: None,
            rq: VecDeque::new(),
            in_send_queue: false,
        }
    }

    /// The payload length the outbound drain needs room for before it can
    /// emit this socket's next frame, in the same priority order the drain
    /// applies: `pending_connect` → `pending_write` → `SHOULD_SEND_RESET`.
    /// `None` means this socket has nothing eligible to send at all, which
    /// is a protocol invariant violation if it is sitting in the send queue.
    pub fn pending_payload_len(&self) -> Option<usize> {
        if let Some(pc) = &self.pending_connect {
            return Some(pc.service.len());
        }
        if let Some(pw) = &self.pending_write {
            return Some(match pw.kind {
                WriteKind::Data => pw.payload.len(),
                WriteKind::Eos => 0,
            });
        }
        if self.flags.contains(SocketFlags::SHOULD_SEND_RESET) {
            return Some(0);
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::reply_channel;

    fn socket() -> Socket {
        Socket::new(StreamId(4), OwnerId(1), 7)
    }

    #[test]
    fn fresh_socket_has_nothing_pending_to_send() {
        assert_eq!(socket().pending_payload_len(), None);
    }

    #[test]
    fn pending_connect_wins_priority() {
        let mut s = socket();
        let (tx, _rx) = reply_channel();
        s.pending_connect = Some(PendingConnect { service: b"svc".to_vec(), reply: tx });
        let (tx2, _rx2) = reply_channel();
        s.pending_write =
            Some(PendingWrite { kind: WriteKind::Data, payload: vec![1, 2, 3], reply: tx2 });
        assert_eq!(s.pending_payload_len(), Some(3));
    }

    #[test]
    fn should_send_reset_is_zero_length() {
        let mut s = socket();
        s.flags.insert(SocketFlags::SHOULD_SEND_RESET);
        assert_eq!(s.pending_payload_len(), Some(0));
    }
}
