use serde::{Deserialize, Serialize};

/// Model label sent when neither the request nor the settings name one
pub const DEFAULT_MODEL: &str = "smartsat-default";

/// Shown in the transcript when a turn is relayed with no endpoint set
pub const NOT_CONFIGURED_MESSAGE: &str = "API URL is not configured. Set it in Options.";

/// Remote endpoint settings, edited from the settings panel.
/// Read fresh for every relay call so edits apply without a restart.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RelayConfig {
    pub endpoint_url: String,
    pub api_key: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

impl RelayConfig {
    pub fn new(endpoint_url: impl Into<String>) -> Self {
        Self {
            endpoint_url: endpoint_url.into(),
            ..Self::default()
        }
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = api_key.into();
        self
    }

    pub fn is_configured(&self) -> bool {
        !self.endpoint_url.trim().is_empty()
    }

    /// `Authorization` header value, if a key is set
    pub fn bearer(&self) -> Option<String> {
        let key = self.api_key.trim();
        if key.is_empty() {
            None
        } else {
            Some(format!("Bearer {}", key))
        }
    }

    pub fn effective_model(&self, requested: Option<&str>) -> String {
        requested
            .filter(|m| !m.trim().is_empty())
            .or(self.model.as_deref().filter(|m| !m.trim().is_empty()))
            .unwrap_or(DEFAULT_MODEL)
            .to_string()
    }

    /// Trim user-entered fields before saving.
    pub fn normalized(&self) -> Self {
        Self {
            endpoint_url: self.endpoint_url.trim().to_string(),
            api_key: self.api_key.trim().to_string(),
            model: self
                .model
                .as_ref()
                .map(|m| m.trim().to_string())
                .filter(|m| !m.is_empty()),
        }
    }
}
