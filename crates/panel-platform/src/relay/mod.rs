pub mod http;
pub mod channel;

pub use http::FetchTransport;
pub use channel::{ChannelRelay, WorkerTransport, MEDIATOR_SCRIPT};
