use std::{cell::UnsafeCell, path::Path, sync::Arc};

use crate::{
    error::WireError,
    ring::Ring,
    shmem_data::ShmemData,
    signal::{RegisterFile, RegisterLink, Role},
};

/// The full contents of a `ComArea`: the two 256-byte rings plus the
/// peer-signal register file, laid out for placement in a single
/// shared-memory region.
#[repr(C)]
#[derive(Default)]
pub struct ComAreaState {
    a2r: Ring,
    r2a: Ring,
    registers: RegisterFile,
}

/// In-process stand-in for shared memory used by the loopback test harness:
/// both ends alias the same `ComAreaState` the way two real processes would
/// alias the same shmem mapping.
struct MemoryCell(UnsafeCell<ComAreaState>);

unsafe impl Sync for MemoryCell {}

enum Backing {
    Shmem(ShmemData<ComAreaState>),
    Memory(Arc<MemoryCell>),
}

/// One side's handle onto a `ComArea`: two 256-byte rings and a
/// peer-signalling register file.
///
/// Backed either by real POSIX shared memory (two-process deployment) or by
/// an in-memory cell shared between two `ComArea` values in the same process
/// (test/demo loopback).
pub struct ComArea {
    backing: Backing,
    role: Role,
}

impl ComArea {
    /// Attaches to (creating if necessary) the shared-memory region at
    /// `path`, as the given `role`.
    pub fn create_or_open(path: &Path, role: Role) -> Result<Self, WireError> {
        let data = ShmemData::open_or_init(path, ComAreaState::default)?;
        Ok(Self { backing: Backing::Shmem(data), role })
    }

    /// Builds a same-process pair of `ComArea` handles sharing one
    /// `ComAreaState`, for tests and the `demo` CLI subcommand.
    pub fn loopback_pair() -> (ComArea, ComArea) {
        let cell = Arc::new(MemoryCell(UnsafeCell::new(ComAreaState::default())));
        let local = ComArea { backing: Backing::Memory(Arc::clone(&cell)), role: Role::Local };
        let remote = ComArea { backing: Backing::Memory(cell), role: Role::Remote };
        (local, remote)
    }

    #[inline]
    fn state(&self) -> &ComAreaState {
        match &self.backing {
            Backing::Shmem(data) => data,
            Backing::Memory(cell) => unsafe { &*cell.0.get() },
        }
    }

    #[inline]
    #[allow(clippy::mut_from_ref)]
    fn state_mut(&self) -> &mut ComAreaState {
        match &self.backing {
            Backing::Shmem(data) => unsafe { &mut *(data.as_ref() as *const _ as *mut _) },
            Backing::Memory(cell) => unsafe { &mut *cell.0.get() },
        }
    }

    pub fn role(&self) -> Role {
        self.role
    }

    /// The ring this side writes frames into: `a2r` for `Role::Local`,
    /// `r2a` for `Role::Remote`.
    #[inline]
    pub fn outbound(&mut self) -> &mut Ring {
        match self.role {
            Role::Local => &mut self.state_mut().a2r,
            Role::Remote => &mut self.state_mut().r2a,
        }
    }

    /// The ring this side reads frames from: `r2a` for `Role::Local`, `a2r`
    /// for `Role::Remote`.
    #[inline]
    pub fn inbound(&mut self) -> &mut Ring {
        match self.role {
            Role::Local => &mut self.state_mut().r2a,
            Role::Remote => &mut self.state_mut().a2r,
        }
    }

    /// Both rings this side uses, split from one borrow so the caller can
    /// hold `&mut` references to inbound and outbound simultaneously without
    /// going through `state_mut()` twice (which would alias).
    #[inline]
    pub fn rings_mut(&mut self) -> (&mut Ring, &mut Ring) {
        let state = self.state_mut();
        match self.role {
            Role::Local => (&mut state.r2a, &mut state.a2r),
            Role::Remote => (&mut state.a2r, &mut state.r2a),
        }
    }

    /// Whether this side's outbound ring currently has room for a
    /// `payload_len`-byte frame, without requiring a `&mut` borrow.
    pub fn outbound_room_for(&self, payload_len: usize) -> bool {
        match self.role {
            Role::Local => self.state().a2r.room_for(payload_len),
            Role::Remote => self.state().r2a.room_for(payload_len),
        }
    }

    /// This side's view of the peer-signal register file.
    pub fn link(&self) -> RegisterLink<'_> {
        RegisterLink::new(&self.state().registers, self.role)
    }

    /// A read-only, role-independent view of both rings' occupancy, for
    /// operator tooling that attaches to a mailbox without running its
    /// protocol engine.
    pub fn snapshot(&self) -> ComAreaSnapshot {
        let state = self.state();
        ComAreaSnapshot { a2r_used: state.a2r.used(), r2a_used: state.r2a.used() }
    }
}

/// Occupancy of both rings at a point in time, independent of which side is
/// asking.
#[derive(Debug, Clone, Copy)]
pub struct ComAreaSnapshot {
    pub a2r_used: usize,
    pub r2a_used: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{frame::PacketType, signal::PeerLink};

    #[test]
    fn loopback_pair_shares_rings() {
        let (mut local, mut remote) = ComArea::loopback_pair();

        local.outbound().append(PacketType::Connect, 2, b"svc").unwrap();
        local.link().publish(crate::signal::PeerEvents::A2R_TAIL);

        assert_eq!(remote.link().take(), crate::signal::PeerEvents::A2R_TAIL);

        let header = remote.inbound().peek_header().unwrap();
        assert_eq!(header.stream_id, 2);
        let payload = remote.inbound().peek_payload(header.length as usize);
        assert_eq!(payload, b"svc");
    }

    #[test]
    fn real_shmem_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("comarea");

        let mut a = ComArea::create_or_open(&path, Role::Local).unwrap();
        a.outbound().append(PacketType::Data, 9, b"hi").unwrap();

        let mut b = ComArea::create_or_open(&path, Role::Remote).unwrap();
        let header = b.inbound().peek_header().unwrap();
        assert_eq!(header.stream_id, 9);
        assert_eq!(b.inbound().peek_payload(header.length as usize), b"hi");
    }
}
