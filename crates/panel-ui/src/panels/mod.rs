pub mod sessions;
pub mod chat;
pub mod settings;
