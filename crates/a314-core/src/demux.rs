use a314_support::safe_panic;
use a314_wire::{FRAME_HEADER_SIZE, PacketType, Ring};

use crate::{
    close::close_socket,
    error::ProtocolViolation,
    flags::SocketFlags,
    ids::StreamId,
    request::ReplyCode,
    send_queue::SendQueue,
    table::SocketTable,
};

/// Parses and dispatches every complete frame currently sitting in `r2a`.
/// Drains the ring fully; demux never suspends.
pub fn handle_packets_received_r2a(
    inbound: &mut Ring,
    outbound: &mut Ring,
    table: &mut SocketTable,
    queue: &mut SendQueue,
    iteration: u64,
) {
    while inbound.used() > 0 {
        let Some(header) = inbound.peek_header() else { break };
        let payload = inbound.peek_payload(header.length as usize);
        inbound.consume(FRAME_HEADER_SIZE + header.length as usize);

        let stream_id = StreamId(header.stream_id);

        // Only CONNECT could create a socket on this side, and inbound
        // CONNECT (peer-initiated streams) is unimplemented; every other
        // type on a missing or already-closed socket is ignored.
        let exists_and_open = table
            .find_by_stream(stream_id)
            .is_some_and(|s| !s.flags.contains(SocketFlags::CLOSED));
        if !exists_and_open {
            continue;
        }

        match header.typ {
            PacketType::Reset => {
                close_socket(stream_id, table, queue, false, outbound, iteration);
            }
            PacketType::ConnectResponse => {
                handle_connect_response(stream_id, &payload, table, queue, outbound, iteration);
            }
            PacketType::Data => {
                handle_data(stream_id, payload, table, queue, outbound, iteration);
            }
            PacketType::Eos => {
                handle_eos_from_peer(stream_id, table, queue, outbound, iteration);
            }
            PacketType::Connect => {
                // Peer-initiated CONNECT: unimplemented.
            }
        }
    }
}

fn handle_connect_response(
    stream_id: StreamId,
    payload: &[u8],
    table: &mut SocketTable,
    queue: &mut SendQueue,
    outbound: &mut Ring,
    iteration: u64,
) {
    let socket = table.find_by_stream_mut(stream_id).expect("checked present and open above");
    if socket.pending_connect.is_none() || payload.len() != 1 {
        let violation = if socket.pending_connect.is_none() {
            ProtocolViolation::UnexpectedConnectResponse(stream_id)
        } else {
            ProtocolViolation::BadConnectResponseLength(stream_id, payload.len())
        };
        on_protocol_violation(violation, stream_id, table, queue, outbound, iteration);
        return;
    }

    let pending = socket.pending_connect.take().expect("checked Some above");
    if payload[0] == 0 {
        let _ = pending.reply.send(ReplyCode::ConnectOk);
    } else {
        let _ = pending.reply.send(ReplyCode::ConnectUnknownService);
        close_socket(stream_id, table, queue, false, outbound, iteration);
    }
}

fn handle_data(
    stream_id: StreamId,
    payload: Vec<u8>,
    table: &mut SocketTable,
    queue: &mut SendQueue,
    outbound: &mut Ring,
    iteration: u64,
) {
    let socket = table.find_by_stream_mut(stream_id).expect("checked present and open above");

    let Some(pending) = &socket.pending_read else {
        socket.rq.push_back(payload);
        return;
    };

    if pending.capacity >= payload.len() {
        let pending = socket.pending_read.take().expect("checked Some above");
        let _ = pending.reply.send(ReplyCode::ReadOk(payload));
    } else {
        let pending = socket.pending_read.take().expect("checked Some above");
        let _ = pending.reply.send(ReplyCode::ReadReset);
        close_socket(stream_id, table, queue, true, outbound, iteration);
    }
}

fn handle_eos_from_peer(
    stream_id: StreamId,
    table: &mut SocketTable,
    queue: &mut SendQueue,
    outbound: &mut Ring,
    iteration: u64,
) {
    let socket = table.find_by_stream_mut(stream_id).expect("checked present and open above");

    let Some(pending) = socket.pending_read.take() else {
        socket.flags.insert(SocketFlags::RCVD_EOS_FROM_PEER);
        return;
    };

    let _ = pending.reply.send(ReplyCode::ReadEos);
    socket.flags.insert(SocketFlags::SENT_EOS_TO_CLIENT);
    if socket.flags.contains(SocketFlags::SENT_EOS_TO_PEER) {
        close_socket(stream_id, table, queue, false, outbound, iteration);
    }
}

fn on_protocol_violation(
    violation: ProtocolViolation,
    stream_id: StreamId,
    table: &mut SocketTable,
    queue: &mut SendQueue,
    outbound: &mut Ring,
    iteration: u64,
) {
    safe_panic!("protocol violation, resetting stream: {violation}");
    close_socket(stream_id, table, queue, true, outbound, iteration);
}
