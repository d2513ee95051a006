pub mod ports;
pub mod event_bus;
pub mod store;
pub mod config_store;
pub mod draft;
pub mod relay;
pub mod channel;
pub mod manager;
