pub mod message;
pub mod session;
pub mod protocol;
pub mod event;
pub mod config;
pub mod error;


pub use error::PanelError;
pub type Result<T> = std::result::Result<T, PanelError>;
