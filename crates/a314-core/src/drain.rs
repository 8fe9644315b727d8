use a314_support::safe_panic;
use a314_wire::{PacketType, Ring};
use tracing::debug;

use crate::{
    close::close_socket, error::ProtocolViolation, flags::SocketFlags, ids::StreamId,
    request::ReplyCode, send_queue::SendQueue, socket::WriteKind, table::SocketTable,
};

/// Drains the send queue into `a2r` while frames fit, in FIFO/head-of-line
/// order (invariant I6): a socket deeper in the queue never bypasses a
/// blocked head even if its own frame would fit.
pub fn handle_room_in_a2r(
    outbound: &mut Ring,
    table: &mut SocketTable,
    queue: &mut SendQueue,
    iteration: u64,
) {
    loop {
        let Some(stream_id) = queue.front() else { break };

        let Some(socket) = table.find_by_stream(stream_id) else {
            // Stale queue entry referencing a socket that is already gone;
            // shouldn't happen (close_socket always removes its entry) but
            // drop it defensively rather than spin forever.
            queue.pop_front();
            continue;
        };

        let Some(required) = socket.pending_payload_len() else {
            queue.pop_front();
            safe_panic!(
                "protocol violation, resetting stream: {}",
                ProtocolViolation::EmptySendQueueEntry(stream_id)
            );
            close_socket(stream_id, table, queue, true, outbound, iteration);
            continue;
        };

        if !outbound.room_for(required) {
            break;
        }

        queue.pop_front();
        emit_for(stream_id, table, outbound, queue, iteration);
    }
}

fn emit_for(
    stream_id: StreamId,
    table: &mut SocketTable,
    outbound: &mut Ring,
    queue: &mut SendQueue,
    iteration: u64,
) {
    {
        let socket = table.find_by_stream_mut(stream_id).expect("just popped from queue");
        socket.in_send_queue = false;
    }

    let has_connect =
        table.find_by_stream(stream_id).is_some_and(|s| s.pending_connect.is_some());
    if has_connect {
        let socket = table.find_by_stream_mut(stream_id).expect("checked above");
        let service = socket.pending_connect.as_ref().expect("checked above").service.clone();
        outbound
            .append(PacketType::Connect, stream_id.0, &service)
            .expect("room already checked by caller");
        return;
    }

    let pending_write = table
        .find_by_stream_mut(stream_id)
        .expect("checked above")
        .pending_write
        .take();
    if let Some(pw) = pending_write {
        match pw.kind {
            WriteKind::Data => {
                outbound
                    .append(PacketType::Data, stream_id.0, &pw.payload)
                    .expect("room already checked by caller");
                let _ = pw.reply.send(ReplyCode::WriteOk);
            }
            WriteKind::Eos => {
                outbound
                    .append(PacketType::Eos, stream_id.0, &[])
                    .expect("room already checked by caller");
                let _ = pw.reply.send(ReplyCode::EosOk);
                let socket = table.find_by_stream_mut(stream_id).expect("checked above");
                socket.flags.insert(SocketFlags::SENT_EOS_TO_PEER);
                if socket.flags.contains(SocketFlags::SENT_EOS_TO_CLIENT) {
                    close_socket(stream_id, table, queue, false, outbound, iteration);
                }
            }
        }
        return;
    }

    let should_reset = table
        .find_by_stream(stream_id)
        .is_some_and(|s| s.flags.contains(SocketFlags::SHOULD_SEND_RESET));
    if should_reset {
        outbound
            .append(PacketType::Reset, stream_id.0, &[])
            .expect("room already checked by caller");
        debug!(?stream_id, "deferred reset emitted");
        table.delete(stream_id, iteration);
        return;
    }

    unreachable!("pending_payload_len guaranteed one of the above branches had something to send");
}

#[cfg(test)]
mod tests {
    use a314_wire::FRAME_HEADER_SIZE;

    use super::*;
    use crate::{ids::OwnerId, request::reply_channel, socket::PendingConnect};

    #[test]
    fn drains_fifo_and_stops_when_head_blocked() {
        let mut table = SocketTable::new(1);
        let mut queue = SendQueue::default();
        let mut ring = Ring::default();
        // Leave just enough room for one small frame (header + 2 bytes).
        ring.append(PacketType::Data, 99, &vec![0u8; 250 - FRAME_HEADER_SIZE]).unwrap();

        let id_a = table.create_socket(OwnerId(1), 1, 0).unwrap();
        let (tx_a, _rx_a) = reply_channel();
        table.find_by_stream_mut(id_a).unwrap().pending_connect =
            Some(PendingConnect { service: vec![1, 2], reply: tx_a });
        table.find_by_stream_mut(id_a).unwrap().in_send_queue = true;
        queue.push_back(id_a);

        let id_b = table.create_socket(OwnerId(1), 2, 0).unwrap();
        let (tx_b, _rx_b) = reply_channel();
        table.find_by_stream_mut(id_b).unwrap().pending_connect =
            Some(PendingConnect { service: vec![], reply: tx_b });
        table.find_by_stream_mut(id_b).unwrap().in_send_queue = true;
        queue.push_back(id_b);

        handle_room_in_a2r(&mut ring, &mut table, &mut queue, 0);

        // id_a's 2-byte CONNECT fits (room_for checks against the one free
        // byte left after the filler frame), id_b stays queued behind it.
        assert_eq!(queue.front(), Some(id_b));
    }

    #[test]
    fn reset_emission_deletes_socket() {
        let mut table = SocketTable::new(1);
        let mut queue = SendQueue::default();
        let mut ring = Ring::default();

        let id = table.create_socket(OwnerId(1), 1, 0).unwrap();
        let socket = table.find_by_stream_mut(id).unwrap();
        socket.flags.insert(SocketFlags::SHOULD_SEND_RESET);
        socket.in_send_queue = true;
        queue.push_back(id);

        handle_room_in_a2r(&mut ring, &mut table, &mut queue, 3);

        assert!(table.find_by_stream(id).is_none());
        let header = ring.peek_header().unwrap();
        assert_eq!(header.typ, PacketType::Reset);
    }
}
