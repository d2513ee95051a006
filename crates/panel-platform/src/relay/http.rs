//! Browser `fetch()` transport for the relay, via gloo-net.

use async_trait::async_trait;
use gloo_net::http::Request;

use panel_core::ports::{HttpReply, HttpTransport};
use panel_types::{PanelError, Result};

/// Plain POST over `fetch()`. Any status the server answers with is
/// returned as-is; only a failed exchange is an error.
#[derive(Debug, Clone, Copy, Default)]
pub struct FetchTransport;

#[async_trait(?Send)]
impl HttpTransport for FetchTransport {
    async fn post_json(
        &self,
        url: &str,
        authorization: Option<&str>,
        body: String,
    ) -> Result<HttpReply> {
        let mut builder = Request::post(url).header("Content-Type", "application/json");
        if let Some(value) = authorization {
            builder = builder.header("Authorization", value);
        }

        let response = builder
            .body(body)
            .map_err(|e| PanelError::Network(e.to_string()))?
            .send()
            .await
            .map_err(|e| PanelError::Network(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| PanelError::Network(e.to_string()))?;
        log::debug!("Relay endpoint answered HTTP {} ({} bytes)", status, body.len());

        Ok(HttpReply { status, body })
    }
}
