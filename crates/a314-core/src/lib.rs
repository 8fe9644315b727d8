mod close;
pub mod config;
mod demux;
mod drain;
mod error;
pub mod flags;
pub mod ids;
pub mod loopback;
pub mod request;
mod requests;
pub mod send_queue;
pub mod service;
pub mod socket;
pub mod table;
pub mod wake;

pub use config::Config;
pub use error::ProtocolViolation;
pub use flags::SocketFlags;
pub use ids::{OwnerId, SocketKey, StreamId};
pub use loopback::EchoPeer;
pub use request::{
    ChannelRequestSource, ClientRequest, Command, NullRequestSource, ReplyCode, ReplyRx, ReplyTx,
    RequestSource, reply_channel, request_channel,
};
pub use send_queue::SendQueue;
pub use service::Service;
pub use socket::Socket;
pub use table::SocketTable;
pub use wake::{CondvarSignal, SignalSource, Wake};
