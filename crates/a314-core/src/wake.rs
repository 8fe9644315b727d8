use std::sync::{Condvar, Mutex};

use bitflags::bitflags;

bitflags! {
    /// Reasons the main loop's single suspension point can be
    /// woken: a client request arrived, or the peer posted a signal.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct Wake: u8 {
        const REQUEST = 0b01;
        const PEER = 0b10;
    }
}

/// Source of wake-ups for the main loop. `wait` blocks until at least one
/// reason is pending and returns (and clears) the accumulated set.
pub trait SignalSource {
    fn notify(&self, reason: Wake);
    fn wait(&self) -> Wake;
}

/// `Mutex` + `Condvar`-backed [`SignalSource`] for production use: any
/// thread (the request-submitting client threads, the peer ISR stand-in)
/// calls `notify`, the main loop thread calls `wait`.
#[derive(Default)]
pub struct CondvarSignal {
    pending: Mutex<Wake>,
    condvar: Condvar,
}

impl CondvarSignal {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SignalSource for CondvarSignal {
    fn notify(&self, reason: Wake) {
        let mut pending = self.pending.lock().expect("wake mutex poisoned");
        pending.insert(reason);
        self.condvar.notify_one();
    }

    fn wait(&self) -> Wake {
        let mut pending = self.pending.lock().expect("wake mutex poisoned");
        while pending.is_empty() {
            pending = self.condvar.wait(pending).expect("wake mutex poisoned");
        }
        std::mem::replace(&mut *pending, Wake::empty())
    }
}
