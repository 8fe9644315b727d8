/// Wire-visible stream identity: 8-bit, allocated locally, parity-disjoint
/// from whatever the peer would hand out for a peer-initiated stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StreamId(pub u8);

/// Opaque identity of whatever the embedding application uses to name a
/// client task; task bootstrap itself is out of scope here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OwnerId(pub u32);

/// The client-facing half of a socket's identity: unique per owner, chosen
/// by the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SocketKey {
    pub owner: OwnerId,
    pub local_id: u32,
}

impl SocketKey {
    pub const fn new(owner: OwnerId, local_id: u32) -> Self {
        Self { owner, local_id }
    }
}
