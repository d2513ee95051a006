//! Wire shapes shared by the panel, the background mediator, and the
//! remote endpoint.

use serde::{Deserialize, Serialize};
use crate::message::WireMessage;
use crate::{PanelError, Result};

/// Body of a relay call: the full transcript, oldest first.
/// Also the JSON body POSTed to the remote endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryPayload {
    pub messages: Vec<WireMessage>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub model: Option<String>,
}

impl QueryPayload {
    pub fn new(messages: Vec<WireMessage>) -> Self {
        Self { messages, model: None }
    }
}

/// Panel → mediator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ChannelRequest {
    Query { id: u64, payload: QueryPayload },
}

impl ChannelRequest {
    pub fn id(&self) -> u64 {
        match self {
            ChannelRequest::Query { id, .. } => *id,
        }
    }
}

/// `{ok: true, content}` or `{ok: false, error}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryResponse {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub error: Option<String>,
}

impl QueryResponse {
    pub fn success(content: impl Into<String>) -> Self {
        Self { ok: true, content: Some(content.into()), error: None }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self { ok: false, content: None, error: Some(error.into()) }
    }

    pub fn into_result(self) -> Result<String> {
        if self.ok {
            Ok(self.content.unwrap_or_default())
        } else {
            Err(PanelError::Relay(
                self.error.unwrap_or_else(|| "Unknown".to_string()),
            ))
        }
    }
}

impl From<Result<String>> for QueryResponse {
    fn from(outcome: Result<String>) -> Self {
        match outcome {
            Ok(content) => QueryResponse::success(content),
            Err(e) => QueryResponse::failure(e.to_string()),
        }
    }
}

/// Mediator → panel, correlated by request id
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelReply {
    pub id: u64,
    #[serde(flatten)]
    pub response: QueryResponse,
}
