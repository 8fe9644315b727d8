use a314_support::safe_assert;
use a314_wire::{FRAME_HEADER_SIZE, PacketType, RING_SIZE, Ring};
use tracing::debug;

use crate::{
    close::close_socket,
    flags::SocketFlags,
    ids::OwnerId,
    request::{ClientRequest, Command, ReplyCode, ReplyTx},
    send_queue::SendQueue,
    socket::{PendingConnect, PendingRead, PendingWrite, WriteKind},
    table::SocketTable,
};

/// Largest payload a request handler will accept before rejecting with the
/// appropriate `*_RESET`: `payload_len + 3 > 255` is too big for any frame.
const MAX_REQUEST_PAYLOAD: usize = RING_SIZE - 1 - FRAME_HEADER_SIZE;

/// Dispatches one client request to the appropriate handler.
pub fn handle_request(
    req: ClientRequest,
    outbound: &mut Ring,
    table: &mut SocketTable,
    queue: &mut SendQueue,
    iteration: u64,
) {
    let ClientRequest { owner, local_id, command, reply } = req;
    match command {
        Command::Connect { service } => {
            handle_connect(owner, local_id, service, reply, outbound, table, queue, iteration);
        }
        Command::Read { capacity } => {
            handle_read(owner, local_id, capacity, reply, outbound, table, queue, iteration);
        }
        Command::Write { payload } => {
            handle_write(owner, local_id, payload, reply, outbound, table, queue);
        }
        Command::Eos => {
            handle_eos(owner, local_id, reply, outbound, table, queue, iteration);
        }
        Command::Reset => {
            handle_reset(owner, local_id, reply, outbound, table, queue, iteration);
        }
        Command::Unknown(code) => {
            debug!(code, "unknown request command");
            let _ = reply.send(ReplyCode::NoCmd);
        }
    }
}

fn handle_connect(
    owner: OwnerId,
    local_id: u32,
    service: Vec<u8>,
    reply: ReplyTx,
    outbound: &mut Ring,
    table: &mut SocketTable,
    queue: &mut SendQueue,
    iteration: u64,
) {
    if table.has_key(owner, local_id) {
        let _ = reply.send(ReplyCode::ConnectSocketInUse);
        return;
    }
    if service.len() > MAX_REQUEST_PAYLOAD {
        let _ = reply.send(ReplyCode::ConnectReset);
        return;
    }

    let Some(stream_id) = table.create_socket(owner, local_id, iteration) else {
        // Stream-id space exhausted: a local resource condition, reported
        // the same way as an already-used socket.
        let _ = reply.send(ReplyCode::ConnectSocketInUse);
        return;
    };

    let send_now = queue.is_empty() && outbound.room_for(service.len());
    if send_now {
        outbound
            .append(PacketType::Connect, stream_id.0, &service)
            .expect("room already checked above");
        safe_assert!(outbound.used() <= RING_SIZE - 1, "ring exceeded its reserved capacity");
        let socket = table.find_by_stream_mut(stream_id).expect("just created");
        socket.pending_connect = Some(PendingConnect { service, reply });
    } else {
        let socket = table.find_by_stream_mut(stream_id).expect("just created");
        socket.pending_connect = Some(PendingConnect { service, reply });
        socket.in_send_queue = true;
        queue.push_back(stream_id);
    }
}

fn handle_read(
    owner: OwnerId,
    local_id: u32,
    capacity: usize,
    reply: ReplyTx,
    outbound: &mut Ring,
    table: &mut SocketTable,
    queue: &mut SendQueue,
    iteration: u64,
) {
    let Some(socket) = table.find_by_key_mut(owner, local_id) else {
        let _ = reply.send(ReplyCode::ReadReset);
        return;
    };
    if socket.flags.contains(SocketFlags::CLOSED) {
        let _ = reply.send(ReplyCode::ReadReset);
        return;
    }

    let stream_id = socket.stream_id;
    if socket.pending_connect.is_some() || socket.pending_read.is_some() {
        let _ = reply.send(ReplyCode::ReadReset);
        close_socket(stream_id, table, queue, true, outbound, iteration);
        return;
    }

    let socket = table.find_by_key_mut(owner, local_id).expect("looked up above");
    if let Some(chunk) = socket.rq.front() {
        if chunk.len() <= capacity {
            let chunk = socket.rq.pop_front().expect("front() just returned Some");
            let _ = reply.send(ReplyCode::ReadOk(chunk));
        } else {
            let _ = reply.send(ReplyCode::ReadReset);
            close_socket(stream_id, table, queue, true, outbound, iteration);
        }
        return;
    }

    if socket.flags.contains(SocketFlags::RCVD_EOS_FROM_PEER) {
        let _ = reply.send(ReplyCode::ReadEos);
        socket.flags.insert(SocketFlags::SENT_EOS_TO_CLIENT);
        if socket.flags.contains(SocketFlags::SENT_EOS_TO_PEER) {
            close_socket(stream_id, table, queue, false, outbound, iteration);
        }
        return;
    }

    socket.pending_read = Some(PendingRead { capacity, reply });
}

fn handle_write(
    owner: OwnerId,
    local_id: u32,
    payload: Vec<u8>,
    reply: ReplyTx,
    outbound: &mut Ring,
    table: &mut SocketTable,
    queue: &mut SendQueue,
) {
    let Some(socket) = table.find_by_key_mut(owner, local_id) else {
        let _ = reply.send(ReplyCode::WriteReset);
        return;
    };

    let rejected = socket.flags.contains(SocketFlags::CLOSED)
        || socket.pending_connect.is_some()
        || socket.pending_write.is_some()
        || socket.flags.contains(SocketFlags::RCVD_EOS_FROM_CLIENT)
        || payload.len() > MAX_REQUEST_PAYLOAD;
    if rejected {
        let _ = reply.send(ReplyCode::WriteReset);
        return;
    }

    let stream_id = socket.stream_id;
    let send_now = queue.is_empty() && outbound.room_for(payload.len());
    if send_now {
        outbound
            .append(PacketType::Data, stream_id.0, &payload)
            .expect("room already checked above");
        safe_assert!(outbound.used() <= RING_SIZE - 1, "ring exceeded its reserved capacity");
        let _ = reply.send(ReplyCode::WriteOk);
    } else {
        safe_assert!(
            socket.pending_write.is_none(),
            "stream {stream_id:?} already has a pending write slot occupied"
        );
        socket.pending_write = Some(PendingWrite { kind: WriteKind::Data, payload, reply });
        socket.in_send_queue = true;
        queue.push_back(stream_id);
    }
}

fn handle_eos(
    owner: OwnerId,
    local_id: u32,
    reply: ReplyTx,
    outbound: &mut Ring,
    table: &mut SocketTable,
    queue: &mut SendQueue,
    iteration: u64,
) {
    let Some(socket) = table.find_by_key_mut(owner, local_id) else {
        let _ = reply.send(ReplyCode::EosReset);
        return;
    };
    if socket.flags.contains(SocketFlags::CLOSED) {
        let _ = reply.send(ReplyCode::EosReset);
        return;
    }

    let stream_id = socket.stream_id;
    if socket.pending_connect.is_some()
        || socket.pending_write.is_some()
        || socket.flags.contains(SocketFlags::RCVD_EOS_FROM_CLIENT)
    {
        let _ = reply.send(ReplyCode::EosReset);
        close_socket(stream_id, table, queue, true, outbound, iteration);
        return;
    }

    socket.flags.insert(SocketFlags::RCVD_EOS_FROM_CLIENT);

    let send_now = queue.is_empty() && outbound.room_for(0);
    if send_now {
        outbound.append(PacketType::Eos, stream_id.0, &[]).expect("room already checked above");
        safe_assert!(outbound.used() <= RING_SIZE - 1, "ring exceeded its reserved capacity");
        let _ = reply.send(ReplyCode::EosOk);
        let socket = table.find_by_key_mut(owner, local_id).expect("looked up above");
        socket.flags.insert(SocketFlags::SENT_EOS_TO_PEER);
        if socket.flags.contains(SocketFlags::SENT_EOS_TO_CLIENT) {
            close_socket(stream_id, table, queue, false, outbound, iteration);
        }
    } else {
        safe_assert!(
            socket.pending_write.is_none(),
            "stream {stream_id:?} already has a pending write slot occupied"
        );
        socket.pending_write =
            Some(PendingWrite { kind: WriteKind::Eos, payload: Vec::new(), reply });
        socket.in_send_queue = true;
        queue.push_back(stream_id);
    }
}

fn handle_reset(
    owner: OwnerId,
    local_id: u32,
    reply: ReplyTx,
    outbound: &mut Ring,
    table: &mut SocketTable,
    queue: &mut SendQueue,
    iteration: u64,
) {
    let _ = reply.send(ReplyCode::ResetOk);

    let Some(socket) = table.find_by_key(owner, local_id) else { return };
    if socket.flags.contains(SocketFlags::CLOSED) {
        return;
    }
    let stream_id = socket.stream_id;
    close_socket(stream_id, table, queue, true, outbound, iteration);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::reply_channel;

    fn new_ctx() -> (Ring, SocketTable, SendQueue) {
        (Ring::default(), SocketTable::new(1), SendQueue::default())
    }

    #[test]
    fn connect_appends_directly_when_ring_has_room() {
        let (mut ring, mut table, mut queue) = new_ctx();
        let (tx, rx) = reply_channel();
        handle_connect(OwnerId(1), 1, b"echo".to_vec(), tx, &mut ring, &mut table, &mut queue, 0);

        let header = ring.peek_header().unwrap();
        assert_eq!(header.typ, PacketType::Connect);
        assert_eq!(rx.try_recv(), Err(std::sync::mpsc::TryRecvError::Empty));
        assert!(table.find_by_key(OwnerId(1), 1).unwrap().pending_connect.is_some());
    }

    #[test]
    fn connect_rejects_duplicate_key() {
        let (mut ring, mut table, mut queue) = new_ctx();
        let (tx1, _rx1) = reply_channel();
        handle_connect(OwnerId(1), 1, vec![], tx1, &mut ring, &mut table, &mut queue, 0);

        let (tx2, rx2) = reply_channel();
        handle_connect(OwnerId(1), 1, vec![], tx2, &mut ring, &mut table, &mut queue, 0);
        assert_eq!(rx2.try_recv(), Ok(ReplyCode::ConnectSocketInUse));
    }

    #[test]
    fn write_without_socket_is_reset() {
        let (mut ring, mut table, mut queue) = new_ctx();
        let (tx, rx) = reply_channel();
        handle_write(OwnerId(1), 1, vec![1, 2, 3], tx, &mut ring, &mut table, &mut queue);
        assert_eq!(rx.try_recv(), Ok(ReplyCode::WriteReset));
    }

    #[test]
    fn oversized_write_is_rejected() {
        let (mut ring, mut table, mut queue) = new_ctx();
        table.create_socket(OwnerId(1), 1, 0).unwrap();
        let (tx, rx) = reply_channel();
        handle_write(OwnerId(1), 1, vec![0u8; 253], tx, &mut ring, &mut table, &mut queue);
        assert_eq!(rx.try_recv(), Ok(ReplyCode::WriteReset));
    }

    #[test]
    fn reset_request_is_idempotent() {
        let (mut ring, mut table, mut queue) = new_ctx();
        table.create_socket(OwnerId(1), 1, 0).unwrap();

        let (tx1, rx1) = reply_channel();
        handle_reset(OwnerId(1), 1, tx1, &mut ring, &mut table, &mut queue, 0);
        assert_eq!(rx1.try_recv(), Ok(ReplyCode::ResetOk));

        let (tx2, rx2) = reply_channel();
        handle_reset(OwnerId(1), 1, tx2, &mut ring, &mut table, &mut queue, 1);
        assert_eq!(rx2.try_recv(), Ok(ReplyCode::ResetOk));
    }
}
