pub mod storage;
pub mod relay;
pub mod mediator;
pub mod speech;

pub use mediator::Mediator;
pub use relay::{ChannelRelay, FetchTransport};
pub use speech::WebSpeechRecognizer;
