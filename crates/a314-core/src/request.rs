use std::sync::mpsc;

use crate::ids::OwnerId;

/// A client socket-like request. Each carries its own reply channel: the
/// reply is owned by whichever side currently holds the message.
pub struct ClientRequest {
    pub owner: OwnerId,
    pub local_id: u32,
    pub command: Command,
    pub reply: ReplyTx,
}

/// The five request-handler commands, plus `Unknown` for a request-ABI
/// command code this build doesn't recognise (replied to with `NoCmd`).
pub enum Command {
    Connect { service: Vec<u8> },
    Read { capacity: usize },
    Write { payload: Vec<u8> },
    Eos,
    Reset,
    Unknown(u8),
}

/// Request completion codes. These are expected flow-control outcomes
/// rather than `std::error::Error`s.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplyCode {
    ConnectOk,
    ConnectReset,
    ConnectUnknownService,
    ConnectSocketInUse,
    ReadOk(Vec<u8>),
    ReadReset,
    ReadEos,
    WriteOk,
    WriteReset,
    EosOk,
    EosReset,
    ResetOk,
    NoCmd,
}

/// One-shot reply channel: a client request is completed by sending exactly
/// one [`ReplyCode`], never more and never fewer.
pub type ReplyTx = mpsc::Sender<ReplyCode>;
pub type ReplyRx = mpsc::Receiver<ReplyCode>;

/// Builds a fresh one-shot reply channel for a single [`ClientRequest`].
pub fn reply_channel() -> (ReplyTx, ReplyRx) {
    mpsc::channel()
}

/// The abstract inbox of client request messages. The application-facing
/// request queue delivery mechanism is an external collaborator; this is
/// its interface.
pub trait RequestSource {
    /// Returns the next queued request, if any, without blocking.
    fn try_recv(&mut self) -> Option<ClientRequest>;
}

/// A [`RequestSource`] backed by an `mpsc` channel; the production wiring
/// for whatever delivers requests from client tasks into the service loop.
pub struct ChannelRequestSource {
    rx: mpsc::Receiver<ClientRequest>,
}

impl ChannelRequestSource {
    pub const fn new(rx: mpsc::Receiver<ClientRequest>) -> Self {
        Self { rx }
    }
}

impl RequestSource for ChannelRequestSource {
    fn try_recv(&mut self) -> Option<ClientRequest> {
        self.rx.try_recv().ok()
    }
}

/// Builds a sender/`RequestSource` pair for feeding [`ClientRequest`]s into
/// a [`crate::service::Service`].
pub fn request_channel() -> (mpsc::Sender<ClientRequest>, ChannelRequestSource) {
    let (tx, rx) = mpsc::channel();
    (tx, ChannelRequestSource::new(rx))
}

/// A [`RequestSource`] that never has anything queued, for standalone
/// deployments with no client-request transport wired up yet (the
/// `a314-ctl serve` default).
#[derive(Default)]
pub struct NullRequestSource;

impl RequestSource for NullRequestSource {
    fn try_recv(&mut self) -> Option<ClientRequest> {
        None
    }
}
