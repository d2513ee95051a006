//! Relay client: one POST of the transcript to the configured endpoint,
//! one typed outcome back.
//!
//! Response handling:
//! - non-2xx → `Http { status, body }`
//! - JSON with a non-empty `content`, `message` or `reply` string (in that
//!   order) → that string
//! - any other JSON → the JSON text itself
//! - not JSON → the raw body

use std::rc::Rc;
use async_trait::async_trait;
use serde_json::Value;
use panel_types::{
    PanelError, Result,
    config::{RelayConfig, NOT_CONFIGURED_MESSAGE},
    protocol::QueryPayload,
};
use crate::ports::{ConfigPort, HttpTransport, RelayPort};

/// Reply fields tried in order
pub const REPLY_FIELDS: [&str; 3] = ["content", "message", "reply"];

/// Map an HTTP exchange to the relay outcome.
pub fn interpret_response(status: u16, body: &str) -> Result<String> {
    if !(200..300).contains(&status) {
        return Err(PanelError::Http {
            status,
            body: body.to_string(),
        });
    }
    match serde_json::from_str::<Value>(body) {
        Ok(value) => Ok(extract_reply(&value)),
        Err(_) => Ok(body.to_string()),
    }
}

pub fn extract_reply(value: &Value) -> String {
    if let Value::String(text) = value {
        return text.clone();
    }
    REPLY_FIELDS
        .iter()
        .find_map(|field| match value.get(field) {
            Some(Value::String(text)) if !text.is_empty() => Some(text.clone()),
            _ => None,
        })
        .unwrap_or_else(|| value.to_string())
}

pub fn ensure_configured(config: &RelayConfig) -> Result<()> {
    if config.is_configured() {
        Ok(())
    } else {
        Err(PanelError::Config(NOT_CONFIGURED_MESSAGE.to_string()))
    }
}

/// Request body with the model resolved against the settings
pub fn request_body(config: &RelayConfig, payload: QueryPayload) -> Result<String> {
    let model = config.effective_model(payload.model.as_deref());
    let body = QueryPayload {
        messages: payload.messages,
        model: Some(model),
    };
    Ok(serde_json::to_string(&body)?)
}

/// Issue one relay call with explicitly supplied settings.
pub async fn post_query(
    transport: &dyn HttpTransport,
    config: &RelayConfig,
    payload: QueryPayload,
) -> Result<String> {
    ensure_configured(config)?;
    let body = request_body(config, payload)?;
    let bearer = config.bearer();
    let reply = transport
        .post_json(config.endpoint_url.trim(), bearer.as_deref(), body)
        .await?;
    interpret_response(reply.status, &reply.body)
}

/// Relay that talks to the endpoint directly. Settings are re-read for every
/// call and never kept between calls.
pub struct HttpRelay<T: HttpTransport> {
    config: Rc<dyn ConfigPort>,
    transport: T,
}

impl<T: HttpTransport> HttpRelay<T> {
    pub fn new(config: Rc<dyn ConfigPort>, transport: T) -> Self {
        Self { config, transport }
    }
}

#[async_trait(?Send)]
impl<T: HttpTransport> RelayPort for HttpRelay<T> {
    async fn query(&self, payload: QueryPayload) -> Result<String> {
        let config = self.config.load_relay_config().await?;
        post_query(&self.transport, &config, payload).await
    }

    fn relay_name(&self) -> &str {
        "http"
    }
}
