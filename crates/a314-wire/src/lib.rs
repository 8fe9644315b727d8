//! Shared-memory wire primitives for the `ComArea` mailbox: the two
//! fixed-size rings, frame header encode/decode, the peer-signal register
//! file, and the create-or-open-by-name shared-memory handle that backs them.

mod comarea;
mod error;
mod frame;
mod ring;
mod shmem_data;
mod signal;

pub use comarea::{ComArea, ComAreaSnapshot};
pub use error::WireError;
pub use frame::{FRAME_HEADER_SIZE, Header, MAX_PAYLOAD_LEN, PacketType};
pub use ring::{RING_SIZE, Ring};
pub use shmem_data::ShmemData;
pub use signal::{PeerEvents, PeerLink, RegisterLink, Role};
