//! Port traits — the hexagonal architecture boundary.
//!
//! These traits are defined here in `panel-core` (pure Rust).
//! Implementations live in `panel-platform` (browser adapters).
//! The core never imports platform code; it only depends on these traits.

use std::pin::Pin;
use async_trait::async_trait;
use futures::Stream;
use panel_types::{
    Result,
    config::RelayConfig,
    event::SpeechEvent,
    protocol::{ChannelRequest, QueryPayload},
};

// ─── Storage Port ────────────────────────────────────────────

/// Key/value scope shared by every execution context of the extension.
/// Last writer wins per key.
#[async_trait(?Send)]
pub trait StoragePort {
    /// Get a value by key
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Set a value
    async fn set(&self, key: &str, value: &[u8]) -> Result<()>;

    /// Read several keys, in order. Backends with transactions override
    /// this so every value comes from the same committed state.
    async fn get_many(&self, keys: &[&str]) -> Result<Vec<Option<Vec<u8>>>> {
        let mut values = Vec::with_capacity(keys.len());
        for key in keys {
            values.push(self.get(key).await?);
        }
        Ok(values)
    }

    /// Write several keys together. Backends with transactions override
    /// this so the whole batch lands at once.
    async fn set_many(&self, entries: &[(String, Vec<u8>)]) -> Result<()> {
        for (key, value) in entries {
            self.set(key, value).await?;
        }
        Ok(())
    }

    /// Write `entries` only if the counter under `counter_key` still equals
    /// `expected`, and return the counter that was found. Nothing is written
    /// when it differs. Backends override this to check and write in one
    /// step.
    async fn set_many_if_counter(
        &self,
        counter_key: &str,
        expected: u64,
        entries: &[(String, Vec<u8>)],
    ) -> Result<u64> {
        let found = parse_counter(self.get(counter_key).await?.as_deref())?;
        if found == expected {
            self.set_many(entries).await?;
        }
        Ok(found)
    }

    /// Name of this backend (for logging/debug)
    fn backend_name(&self) -> &str;
}

/// Decode a stored counter (a JSON integer). A missing key reads as 0.
pub fn parse_counter(raw: Option<&[u8]>) -> Result<u64> {
    match raw {
        Some(bytes) => Ok(serde_json::from_slice(bytes)?),
        None => Ok(0),
    }
}

// ─── Configuration Port ──────────────────────────────────────

#[async_trait(?Send)]
pub trait ConfigPort {
    /// Read the current endpoint settings. Called once per relay call.
    async fn load_relay_config(&self) -> Result<RelayConfig>;

    async fn save_relay_config(&self, config: &RelayConfig) -> Result<()>;
}

// ─── Relay Port ──────────────────────────────────────────────

/// One transcript in, exactly one outcome out. No retries, no streaming.
#[async_trait(?Send)]
pub trait RelayPort {
    /// Resolve to the assistant's reply text or the failure reason
    async fn query(&self, payload: QueryPayload) -> Result<String>;

    /// Name of this relay (for logging/debug)
    fn relay_name(&self) -> &str;
}

/// Raw HTTP exchange with the remote endpoint
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpReply {
    pub status: u16,
    pub body: String,
}

#[async_trait(?Send)]
pub trait HttpTransport {
    /// POST a JSON body. Transport failures are `Err`; any HTTP status is `Ok`.
    async fn post_json(
        &self,
        url: &str,
        authorization: Option<&str>,
        body: String,
    ) -> Result<HttpReply>;
}

// ─── Channel Port ────────────────────────────────────────────

/// Outbound half of the panel ↔ background channel. Replies come back
/// through [`crate::channel::PendingCalls::resolve`].
pub trait ChannelTransport {
    fn post(&self, request: &ChannelRequest) -> Result<()>;
}

// ─── Speech Port ─────────────────────────────────────────────

pub trait SpeechPort {
    /// False when the browser has no recognition engine
    fn is_supported(&self) -> bool;

    /// Begin a recognition pass. The stream ends when recognition stops;
    /// calling `start` again begins a new pass.
    fn start(&self) -> Pin<Box<dyn Stream<Item = SpeechEvent>>>;

    fn stop(&self);

    fn is_listening(&self) -> bool;
}
