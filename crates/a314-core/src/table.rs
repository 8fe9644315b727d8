use std::collections::{HashMap, VecDeque};

use a314_support::safe_assert;
use indexmap::IndexMap;

use crate::{
    ids::{OwnerId, StreamId},
    socket::Socket,
};

/// Stream-id allocation: a monotonic even-parity cursor (odd ids are
/// reserved for a peer-initiated stream, which this implementation never
/// creates) plus a free list gated by a grace period measured in main-loop
/// iterations (invariant I3: a stream_id is not reused until both sides have
/// observed it as deleted).
pub struct StreamIdAllocator {
    next: u16,
    free: VecDeque<(StreamId, u64)>,
    grace_iterations: u64,
}

impl StreamIdAllocator {
    pub fn new(grace_iterations: u64) -> Self {
        Self { next: 0, free: VecDeque::new(), grace_iterations }
    }

    /// Hands out a fresh id, preferring to mint a brand-new one while the
    /// even-parity space isn't exhausted, then falling back to the oldest
    /// freed id once it has sat for `grace_iterations`. Returns `None` if no
    /// id is currently available (local resource exhaustion, handled the
    /// same way as `CONNECT_SOCKET_IN_USE` by the caller).
    pub fn alloc(&mut self, iteration: u64) -> Option<StreamId> {
        if self.next <= 254 {
            let id = StreamId(self.next as u8);
            self.next += 2;
            return Some(id);
        }
        let &(id, freed_at) = self.free.front()?;
        if iteration.saturating_sub(freed_at) < self.grace_iterations {
            return None;
        }
        self.free.pop_front();
        Some(id)
    }

    /// Marks `id` as dead as of `iteration`; it won't be handed out again
    /// until `grace_iterations` have passed.
    pub fn free(&mut self, id: StreamId, iteration: u64) {
        self.free.push_back((id, iteration));
    }
}

/// Dual-indexed set of active streams: by `stream_id` for inbound dispatch,
/// by `(owner, local_id)` for client requests.
pub struct SocketTable {
    by_stream: IndexMap<StreamId, Socket>,
    by_key: HashMap<(OwnerId, u32), StreamId>,
    allocator: StreamIdAllocator,
}

impl SocketTable {
    pub fn new(grace_iterations: u64) -> Self {
        Self {
            by_stream: IndexMap::new(),
            by_key: HashMap::new(),
            allocator: StreamIdAllocator::new(grace_iterations),
        }
    }

    pub fn has_key(&self, owner: OwnerId, local_id: u32) -> bool {
        self.by_key.contains_key(&(owner, local_id))
    }

    /// Creates and inserts a new socket for `(owner, local_id)`. Returns
    /// `None` if the stream-id space is currently exhausted (caller must
    /// have already checked `has_key` for the `SOCKET_IN_USE` case).
    pub fn create_socket(&mut self, owner: OwnerId, local_id: u32, iteration: u64) -> Option<StreamId> {
        let stream_id = self.allocator.alloc(iteration)?;
        let inserted = self.by_stream.insert(stream_id, Socket::new(stream_id, owner, local_id));
        safe_assert!(inserted.is_none(), "allocator handed out a stream_id still in the table");
        self.by_key.insert((owner, local_id), stream_id);
        Some(stream_id)
    }

    pub fn find_by_stream(&self, id: StreamId) -> Option<&Socket> {
        self.by_stream.get(&id)
    }

    pub fn find_by_stream_mut(&mut self, id: StreamId) -> Option<&mut Socket> {
        self.by_stream.get_mut(&id)
    }

    pub fn find_by_key(&self, owner: OwnerId, local_id: u32) -> Option<&Socket> {
        let id = *self.by_key.get(&(owner, local_id))?;
        self.by_stream.get(&id)
    }

    pub fn find_by_key_mut(&mut self, owner: OwnerId, local_id: u32) -> Option<&mut Socket> {
        let id = *self.by_key.get(&(owner, local_id))?;
        self.by_stream.get_mut(&id)
    }

    /// Removes `id` entirely and frees it back to the allocator (invariant
    /// I3: only called once any owed RESET frame is already in the ring).
    pub fn delete(&mut self, id: StreamId, iteration: u64) {
        if let Some(socket) = self.by_stream.shift_remove(&id) {
            self.by_key.remove(&(socket.owner, socket.local_id));
            self.allocator.free(id, iteration);
        }
    }

    pub fn len(&self) -> usize {
        self.by_stream.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_stream.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Socket> {
        self.by_stream.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allocator_hands_out_even_parity_ids() {
        let mut a = StreamIdAllocator::new(1);
        assert_eq!(a.alloc(0), Some(StreamId(0)));
        assert_eq!(a.alloc(0), Some(StreamId(2)));
        assert_eq!(a.alloc(0), Some(StreamId(4)));
    }

    #[test]
    fn freed_id_is_not_reused_within_grace() {
        let mut a = StreamIdAllocator::new(2);
        for _ in 0..128 {
            a.alloc(0);
        }
        // space is now exhausted (ids 0,2,..,254 minted)
        assert_eq!(a.alloc(0), None);
        a.free(StreamId(10), 5);
        assert_eq!(a.alloc(5), None); // grace not elapsed yet
        assert_eq!(a.alloc(6), None);
        assert_eq!(a.alloc(7), Some(StreamId(10)));
    }

    #[test]
    fn create_socket_rejects_existing_key_is_caller_responsibility() {
        let mut table = SocketTable::new(1);
        let owner = OwnerId(1);
        table.create_socket(owner, 9, 0).unwrap();
        assert!(table.has_key(owner, 9));
        assert!(table.find_by_key(owner, 9).is_some());
    }

    #[test]
    fn delete_frees_both_indices() {
        let mut table = SocketTable::new(1);
        let owner = OwnerId(1);
        let id = table.create_socket(owner, 9, 0).unwrap();
        table.delete(id, 0);
        assert!(!table.has_key(owner, 9));
        assert!(table.find_by_stream(id).is_none());
    }
}
