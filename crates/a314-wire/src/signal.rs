use std::sync::atomic::{AtomicU8, Ordering};

use bitflags::bitflags;

bitflags! {
    /// Edges carried by the peer-signal register file.
    ///
    /// `A2R_TAIL`/`R2A_HEAD` are posted by the local side to tell the remote
    /// "I advanced my ring index"; `A2R_HEAD`/`R2A_TAIL` are posted by the
    /// remote side to tell the local side the same thing about its own
    /// indices.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct PeerEvents: u8 {
        const A2R_TAIL = 0b0001;
        const A2R_HEAD = 0b0010;
        const R2A_TAIL = 0b0100;
        const R2A_HEAD = 0b1000;
    }
}

/// Which half of a [`crate::ComArea`] this process is. This crate implements
/// the `Local` side's main loop in full; `Remote` is only ever driven by
/// test/demo peers — the remote side's own protocol logic belongs to
/// whatever system is on the other end of the mailbox.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Role {
    Local,
    Remote,
}

impl Role {
    #[inline]
    const fn other(self) -> Self {
        match self {
            Self::Local => Self::Remote,
            Self::Remote => Self::Local,
        }
    }
}

/// The shared peer-signal register file: one "events" byte per side (written
/// by that side, read by the other) plus the per-side "enable" byte and a
/// shared gate bit standing in for "disable the specific peer interrupt"
/// during arming.
#[repr(C)]
#[derive(Default)]
pub struct RegisterFile {
    local_events: AtomicU8,
    remote_events: AtomicU8,
    local_enable: AtomicU8,
    remote_enable: AtomicU8,
    gate: AtomicU8,
}

impl RegisterFile {
    fn events(&self, role: Role) -> &AtomicU8 {
        match role {
            Role::Local => &self.local_events,
            Role::Remote => &self.remote_events,
        }
    }

    fn enable(&self, role: Role) -> &AtomicU8 {
        match role {
            Role::Local => &self.local_enable,
            Role::Remote => &self.remote_enable,
        }
    }
}

/// Interface over the peer-signal register file, from one side's point of
/// view.
pub trait PeerLink {
    /// Publishes edges to the peer (sets bits in the peer-visible events
    /// byte). Never blocks; the actual cross-process wake-up is the ISR's
    /// job and lives outside this interface.
    fn publish(&self, events: PeerEvents);

    /// Arms which edges should wake this side, replacing whatever was armed
    /// before.
    fn arm(&self, events: PeerEvents);

    /// Reads and clears the edges the peer has posted for this side.
    fn take(&self) -> PeerEvents;

    /// Runs `f` with the shared gate bit held, standing in for disabling the
    /// peer interrupt so arming and index publication are atomic.
    fn with_gate<R>(&self, f: impl FnOnce() -> R) -> R;
}

/// A [`PeerLink`] view onto a [`RegisterFile`] from one [`Role`]'s side.
/// Both the real shared-memory-backed `ComArea` and the in-memory loopback
/// pair hand these out; only the bytes they read/write differ by role.
pub struct RegisterLink<'a> {
    registers: &'a RegisterFile,
    role: Role,
}

impl<'a> RegisterLink<'a> {
    pub(crate) fn new(registers: &'a RegisterFile, role: Role) -> Self {
        Self { registers, role }
    }
}

impl PeerLink for RegisterLink<'_> {
    fn publish(&self, events: PeerEvents) {
        self.registers.events(self.role).fetch_or(events.bits(), Ordering::AcqRel);
    }

    fn arm(&self, events: PeerEvents) {
        self.registers.enable(self.role).store(events.bits(), Ordering::Release);
    }

    fn take(&self) -> PeerEvents {
        let bits = self.registers.events(self.role.other()).swap(0, Ordering::AcqRel);
        PeerEvents::from_bits_truncate(bits)
    }

    fn with_gate<R>(&self, f: impl FnOnce() -> R) -> R {
        self.registers.gate.store(1, Ordering::Release);
        let result = f();
        self.registers.gate.store(0, Ordering::Release);
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn publish_is_visible_to_the_other_role() {
        let registers = RegisterFile::default();
        let local = RegisterLink::new(&registers, Role::Local);
        let remote = RegisterLink::new(&registers, Role::Remote);

        local.publish(PeerEvents::A2R_TAIL);
        assert_eq!(remote.take(), PeerEvents::A2R_TAIL);
        // take() clears it; a second read sees nothing new.
        assert_eq!(remote.take(), PeerEvents::empty());
    }

    #[test]
    fn arm_is_per_side() {
        let registers = RegisterFile::default();
        let local = RegisterLink::new(&registers, Role::Local);
        local.arm(PeerEvents::R2A_TAIL | PeerEvents::A2R_HEAD);
        assert_eq!(registers.local_enable.load(Ordering::Acquire), 0b0110);
    }
}
