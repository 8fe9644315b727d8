use a314_wire::{ComArea, PeerEvents, PeerLink, Role};
use tracing::{debug, info};

use crate::{
    config::Config,
    demux::handle_packets_received_r2a,
    drain::handle_room_in_a2r,
    request::RequestSource,
    requests::handle_request,
    send_queue::SendQueue,
    table::SocketTable,
    wake::{SignalSource, Wake},
};

/// The event this side should arm to be woken next time it matters: either
/// "the peer wrote to my inbound ring" when the send queue is empty, or
/// additionally "the peer consumed from my outbound ring" when the queue
/// head is blocked on room.
fn inbound_tail_event(role: Role) -> PeerEvents {
    match role {
        Role::Local => PeerEvents::R2A_TAIL,
        Role::Remote => PeerEvents::A2R_TAIL,
    }
}

fn outbound_head_event(role: Role) -> PeerEvents {
    match role {
        Role::Local => PeerEvents::A2R_HEAD,
        Role::Remote => PeerEvents::R2A_HEAD,
    }
}

/// One side of the mailbox's protocol engine: a `ComArea`, a socket table, a
/// send queue, and a source of client requests, driven by repeated calls to
/// [`Service::run_iteration`].
pub struct Service<R: RequestSource> {
    config: Config,
    comarea: ComArea,
    table: SocketTable,
    queue: SendQueue,
    requests: R,
    iteration: u64,
}

impl<R: RequestSource> Service<R> {
    pub fn new(config: Config, comarea: ComArea, requests: R) -> Self {
        let table = SocketTable::new(config.stream_id_grace_iterations());
        Self { config, comarea, table, queue: SendQueue::default(), requests, iteration: 0 }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn table(&self) -> &SocketTable {
        &self.table
    }

    /// Number of sockets currently blocked on outbound ring capacity; used
    /// by CLI status inspection, and handy for tests probing backpressure
    /// directly.
    pub fn pending_send_queue_len(&self) -> usize {
        self.queue.len()
    }

    /// Runs the main loop until `signal.wait()` never returns again, i.e.
    /// forever in production; tests call [`Service::run_iteration`] directly
    /// instead of driving this.
    pub fn run(&mut self, signal: &impl SignalSource) -> ! {
        info!(mailbox = self.config.mailbox_name(), "service starting");
        loop {
            let woken = signal.wait();
            self.run_iteration(woken);
        }
    }

    /// Services one wake-up: optionally drains queued client requests, runs
    /// demux and drain to a fixed point, then re-arms the peer signal and
    /// publishes any edges this iteration produced.
    pub fn run_iteration(&mut self, woken: Wake) {
        self.iteration += 1;
        let iteration = self.iteration;

        if woken.contains(Wake::REQUEST) {
            while let Some(req) = self.requests.try_recv() {
                let (_, outbound) = self.comarea.rings_mut();
                handle_request(req, outbound, &mut self.table, &mut self.queue, iteration);
            }
        }

        let inbound_used_before = {
            let (inbound, _) = self.comarea.rings_mut();
            inbound.used()
        };

        loop {
            let (inbound, outbound) = self.comarea.rings_mut();
            handle_packets_received_r2a(
                inbound,
                outbound,
                &mut self.table,
                &mut self.queue,
                iteration,
            );
            let queue_len_before = self.queue.len();
            let (_, outbound) = self.comarea.rings_mut();
            handle_room_in_a2r(outbound, &mut self.table, &mut self.queue, iteration);

            // A fixed point within one wake-up: demux only ever shrinks the
            // inbound ring and never re-feeds itself new frames to dispatch
            // within this call, so one pass each suffices unless draining
            // the queue unblocked a head that can now be emitted in the same
            // breath (queue shrank further than the loop already accounted
            // for would only happen via demux replying into a pending slot,
            // which doesn't requeue synchronously) — reconfirm by re-running
            // until a pass changes nothing.
            if self.queue.len() == queue_len_before {
                break;
            }
        }

        let (inbound, outbound) = self.comarea.rings_mut();
        let inbound_used_after = inbound.used();
        let wrote_outbound = outbound.used() > 0 || !self.queue.is_empty();
        let consumed_inbound = inbound_used_after < inbound_used_before;

        self.rearm();

        if wrote_outbound {
            let event = match self.comarea.role() {
                Role::Local => PeerEvents::A2R_TAIL,
                Role::Remote => PeerEvents::R2A_TAIL,
            };
            self.comarea.link().publish(event);
        }
        if consumed_inbound {
            let event = match self.comarea.role() {
                Role::Local => PeerEvents::R2A_HEAD,
                Role::Remote => PeerEvents::A2R_HEAD,
            };
            self.comarea.link().publish(event);
        }
    }

    /// Re-arms the peer signal for the next wake-up: if anything is still
    /// queued and blocked on room, defensively re-drain
    /// first (closing the race where the peer freed room between the drain
    /// above and the arm below) before committing to which edges to wait on.
    fn rearm(&mut self) {
        let role = self.comarea.role();
        loop {
            let Some(head) = self.queue.front() else {
                let events = inbound_tail_event(role);
                let link = self.comarea.link();
                link.with_gate(|| link.arm(events));
                return;
            };

            let required =
                self.table.find_by_stream(head).and_then(|s| s.pending_payload_len());
            let Some(required) = required else {
                // Invariant violation already handled by drain on the next
                // pass; arm broadly so the loop isn't stuck waiting forever.
                let events = inbound_tail_event(role) | outbound_head_event(role);
                let link = self.comarea.link();
                link.with_gate(|| link.arm(events));
                return;
            };

            if self.comarea.outbound_room_for(required) {
                let (_, outbound) = self.comarea.rings_mut();
                handle_room_in_a2r(outbound, &mut self.table, &mut self.queue, self.iteration);
                continue;
            }

            let events = inbound_tail_event(role) | outbound_head_event(role);
            let link = self.comarea.link();
            link.with_gate(|| link.arm(events));
            return;
        }
    }
}
