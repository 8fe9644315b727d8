use std::collections::VecDeque;

use crate::ids::StreamId;

/// FIFO of sockets blocked on outbound ring capacity. Head of line blocking
/// is deliberate (invariant I6): the drain never skips a blocked head to
/// serve a socket further back even if its frame would fit.
#[derive(Default)]
pub struct SendQueue {
    queue: VecDeque<StreamId>,
}

impl SendQueue {
    pub fn push_back(&mut self, id: StreamId) {
        self.queue.push_back(id);
    }

    pub fn front(&self) -> Option<StreamId> {
        self.queue.front().copied()
    }

    pub fn pop_front(&mut self) -> Option<StreamId> {
        self.queue.pop_front()
    }

    /// Removes `id` wherever it sits in the queue. Used by `close_socket`
    /// when a socket is torn down without ever reaching the head.
    pub fn remove(&mut self, id: StreamId) {
        self.queue.retain(|&queued| queued != id);
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fifo_order_preserved() {
        let mut q = SendQueue::default();
        q.push_back(StreamId(1));
        q.push_back(StreamId(2));
        q.push_back(StreamId(3));
        assert_eq!(q.pop_front(), Some(StreamId(1)));
        assert_eq!(q.pop_front(), Some(StreamId(2)));
        assert_eq!(q.pop_front(), Some(StreamId(3)));
        assert_eq!(q.pop_front(), None);
    }

    #[test]
    fn remove_mid_queue_preserves_remaining_order() {
        let mut q = SendQueue::default();
        q.push_back(StreamId(1));
        q.push_back(StreamId(2));
        q.push_back(StreamId(3));
        q.remove(StreamId(2));
        assert_eq!(q.pop_front(), Some(StreamId(1)));
        assert_eq!(q.pop_front(), Some(StreamId(3)));
    }
}
