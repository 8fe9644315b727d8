use shared_memory::ShmemError;
use thiserror::Error;

/// Errors raised while opening or sizing the shared-memory backed
/// [`crate::ComArea`].
#[derive(Error, Debug)]
pub enum WireError {
    #[error("shmem error")]
    Shmem(#[from] ShmemError),

    #[error("payload length {0} exceeds the 252-byte max frame payload")]
    PayloadTooLarge(usize),

    #[error("ring has no room for a {0}-byte frame")]
    RingFull(usize),
}
