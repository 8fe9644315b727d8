use std::collections::HashSet;

use a314_wire::{ComArea, FRAME_HEADER_SIZE, PacketType, Role};
use tracing::debug;

/// A minimal stand-in for the remote side of a mailbox:
/// accepts `CONNECT`s for a fixed set of known service names and echoes
/// whatever `DATA`/`EOS` it receives back to the sender. Used by the `demo`
/// CLI subcommand and by integration tests that need a live peer without a
/// second process.
pub struct EchoPeer {
    comarea: ComArea,
    known_services: HashSet<Vec<u8>>,
    open_streams: HashSet<u8>,
}

impl EchoPeer {
    /// Builds a peer over `comarea` (expected to be the `Role::Remote` side
    /// of a [`ComArea::loopback_pair`] or a real attach) that accepts
    /// connections to any of `known_services`.
    pub fn new(comarea: ComArea, known_services: impl IntoIterator<Item = Vec<u8>>) -> Self {
        assert_eq!(comarea.role(), Role::Remote, "EchoPeer only drives the remote side");
        Self {
            comarea,
            known_services: known_services.into_iter().collect(),
            open_streams: HashSet::new(),
        }
    }

    /// Processes every frame currently sitting in the inbound ring, writing
    /// replies directly back (no queueing: the demo harness never contends
    /// for ring space the way the full send queue does).
    pub fn service(&mut self) {
        let inbound = self.comarea.inbound();
        let mut frames = Vec::new();
        while inbound.used() >= FRAME_HEADER_SIZE {
            let Some(header) = inbound.peek_header() else { break };
            let payload = inbound.peek_payload(header.length as usize);
            inbound.consume(FRAME_HEADER_SIZE + header.length as usize);
            frames.push((header, payload));
        }

        for (header, payload) in frames {
            match header.typ {
                PacketType::Connect => self.handle_connect(header.stream_id, &payload),
                PacketType::Data => self.handle_data(header.stream_id, payload),
                PacketType::Eos => self.handle_eos(header.stream_id),
                PacketType::Reset => {
                    self.open_streams.remove(&header.stream_id);
                }
                PacketType::ConnectResponse => {
                    debug!(stream_id = header.stream_id, "unexpected CONNECT_RESPONSE, ignoring");
                }
            }
        }
    }

    fn handle_connect(&mut self, stream_id: u8, service: &[u8]) {
        let outbound = self.comarea.outbound();
        if self.known_services.contains(service) {
            self.open_streams.insert(stream_id);
            let _ = outbound.append(PacketType::ConnectResponse, stream_id, &[0]);
        } else {
            let _ = outbound.append(PacketType::ConnectResponse, stream_id, &[1]);
        }
    }

    fn handle_data(&mut self, stream_id: u8, payload: Vec<u8>) {
        if !self.open_streams.contains(&stream_id) {
            return;
        }
        let _ = self.comarea.outbound().append(PacketType::Data, stream_id, &payload);
    }

    fn handle_eos(&mut self, stream_id: u8) {
        if !self.open_streams.remove(&stream_id) {
            return;
        }
        let _ = self.comarea.outbound().append(PacketType::Eos, stream_id, &[]);
    }
}

#[cfg(test)]
mod tests {
    use a314_wire::Role;

    use super::*;

    #[test]
    fn unknown_service_is_refused() {
        let (mut local, remote) = ComArea::loopback_pair();
        let mut peer = EchoPeer::new(remote, [b"echo".to_vec()]);

        local.outbound().append(PacketType::Connect, 4, b"nope").unwrap();
        peer.service();

        let header = local.inbound().peek_header().unwrap();
        assert_eq!(header.typ, PacketType::ConnectResponse);
        assert_eq!(local.inbound().peek_payload(1), vec![1]);
    }

    #[test]
    fn known_service_echoes_data_and_eos() {
        let (mut local, remote) = ComArea::loopback_pair();
        let mut peer = EchoPeer::new(remote, [b"echo".to_vec()]);
        assert_eq!(peer.comarea.role(), Role::Remote);

        local.outbound().append(PacketType::Connect, 6, b"echo").unwrap();
        peer.service();
        let header = local.inbound().peek_header().unwrap();
        assert_eq!(header.typ, PacketType::ConnectResponse);
        assert_eq!(local.inbound().peek_payload(1), vec![0]);
        local.inbound().consume(3 + header.length as usize);

        local.outbound().append(PacketType::Data, 6, b"hi").unwrap();
        peer.service();
        let header = local.inbound().peek_header().unwrap();
        assert_eq!(header.typ, PacketType::Data);
        assert_eq!(local.inbound().peek_payload(header.length as usize), b"hi");
        local.inbound().consume(3 + header.length as usize);

        local.outbound().append(PacketType::Eos, 6, &[]).unwrap();
        peer.service();
        let header = local.inbound().peek_header().unwrap();
        assert_eq!(header.typ, PacketType::Eos);
    }
}
