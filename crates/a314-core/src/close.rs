use a314_wire::{PacketType, Ring};
use tracing::debug;

use crate::{
    flags::SocketFlags,
    ids::StreamId,
    request::ReplyCode,
    send_queue::SendQueue,
    socket::WriteKind,
    table::SocketTable,
};

/// Tears down a socket: replies to and clears any pending
/// client request, frees the receive queue, removes it from the send queue,
/// and marks it `CLOSED`. If `send_reset` is set and a `RESET` frame fits
/// immediately with an empty send queue, emits it and deletes the socket
/// right away; otherwise defers emission via `SHOULD_SEND_RESET` and leaves
/// deletion to the outbound drain (invariant I3).
pub fn close_socket(
    stream_id: StreamId,
    table: &mut SocketTable,
    queue: &mut SendQueue,
    send_reset: bool,
    outbound: &mut Ring,
    iteration: u64,
) {
    let Some(socket) = table.find_by_stream_mut(stream_id) else { return };
    if socket.flags.contains(SocketFlags::CLOSED) {
        return;
    }

    if let Some(pc) = socket.pending_connect.take() {
        let _ = pc.reply.send(ReplyCode::ConnectReset);
    }
    if let Some(pr) = socket.pending_read.take() {
        let _ = pr.reply.send(ReplyCode::ReadReset);
    }
    if let Some(pw) = socket.pending_write.take() {
        let code = match pw.kind {
            WriteKind::Data => ReplyCode::WriteReset,
            WriteKind::Eos => ReplyCode::EosReset,
        };
        let _ = pw.reply.send(code);
    }
    socket.rq.clear();
    if socket.in_send_queue {
        queue.remove(stream_id);
        socket.in_send_queue = false;
    }
    socket.flags.insert(SocketFlags::CLOSED);

    if !send_reset {
        debug!(?stream_id, "socket closed");
        table.delete(stream_id, iteration);
        return;
    }

    let can_send_now = queue.is_empty() && outbound.room_for(0);
    if can_send_now {
        let _ = outbound.append(PacketType::Reset, stream_id.0, &[]);
        debug!(?stream_id, "socket closed, reset sent");
        table.delete(stream_id, iteration);
        return;
    }

    let socket = table.find_by_stream_mut(stream_id).expect("just looked this socket up above");
    socket.flags.insert(SocketFlags::SHOULD_SEND_RESET);
    socket.in_send_queue = true;
    queue.push_back(stream_id);
    debug!(?stream_id, "socket closed, reset deferred to send queue");
}

#[cfg(test)]
mod tests {
    use a314_wire::RING_SIZE;

    use super::*;
    use crate::{ids::OwnerId, request::reply_channel};

    #[test]
    fn reset_emits_immediately_when_ring_has_room() {
        let mut table = SocketTable::new(1);
        let mut queue = SendQueue::default();
        let mut ring = Ring::default();

        let id = table.create_socket(OwnerId(1), 1, 0).unwrap();
        close_socket(id, &mut table, &mut queue, true, &mut ring, 0);

        assert!(table.find_by_stream(id).is_none());
        let header = ring.peek_header().unwrap();
        assert_eq!(header.typ, PacketType::Reset);
    }

    #[test]
    fn reset_defers_when_ring_full() {
        let mut table = SocketTable::new(1);
        let mut queue = SendQueue::default();
        let mut ring = Ring::default();
        ring.append(PacketType::Data, 0, &[0u8; 252]).unwrap();
        assert_eq!(ring.used(), RING_SIZE - 1);

        let id = table.create_socket(OwnerId(1), 1, 0).unwrap();
        close_socket(id, &mut table, &mut queue, true, &mut ring, 0);

        let socket = table.find_by_stream(id).unwrap();
        assert!(socket.flags.contains(SocketFlags::SHOULD_SEND_RESET));
        assert_eq!(queue.front(), Some(id));
    }

    #[test]
    fn close_replies_to_pending_requests_exactly_once() {
        let mut table = SocketTable::new(1);
        let mut queue = SendQueue::default();
        let mut ring = Ring::default();

        let id = table.create_socket(OwnerId(1), 1, 0).unwrap();
        let (tx, rx) = reply_channel();
        table.find_by_stream_mut(id).unwrap().pending_read =
            Some(crate::socket::PendingRead { capacity: 4, reply: tx });

        close_socket(id, &mut table, &mut queue, false, &mut ring, 0);
        assert_eq!(rx.try_recv(), Ok(ReplyCode::ReadReset));
        assert_eq!(rx.try_recv(), Err(std::sync::mpsc::TryRecvError::Disconnected));
    }
}
