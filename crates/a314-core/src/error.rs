use thiserror::Error;

use crate::ids::StreamId;

/// Conditions flagged as invariant violations. These panic on a debug build
/// via `a314_support::safe_panic!` and, in release, log at `error!` and reset
/// the affected stream rather than being silently ignored.
#[derive(Debug, Error)]
pub enum ProtocolViolation {
    #[error("CONNECT_RESPONSE on stream {0:?} with no pending CONNECT")]
    UnexpectedConnectResponse(StreamId),

    #[error("CONNECT_RESPONSE on stream {0:?} had payload length {1}, expected 1")]
    BadConnectResponseLength(StreamId, usize),

    #[error("stream {0:?} was in the send queue with nothing eligible to send")]
    EmptySendQueueEntry(StreamId),
}
