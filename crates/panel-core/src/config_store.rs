//! Relay settings kept in storage under their own key, apart from sessions.

use std::rc::Rc;
use async_trait::async_trait;
use panel_types::{Result, config::RelayConfig};
use crate::ports::{ConfigPort, StoragePort};

pub const RELAY_CONFIG_KEY: &str = "config:relay";

pub struct StorageConfigSource {
    storage: Rc<dyn StoragePort>,
}

impl StorageConfigSource {
    pub fn new(storage: Rc<dyn StoragePort>) -> Self {
        Self { storage }
    }
}

#[async_trait(?Send)]
impl ConfigPort for StorageConfigSource {
    async fn load_relay_config(&self) -> Result<RelayConfig> {
        match self.storage.get(RELAY_CONFIG_KEY).await? {
            Some(bytes) => Ok(serde_json::from_slice(&bytes)?),
            None => Ok(RelayConfig::default()),
        }
    }

    async fn save_relay_config(&self, config: &RelayConfig) -> Result<()> {
        let json = serde_json::to_vec(&config.normalized())?;
        self.storage.set(RELAY_CONFIG_KEY, &json).await?;
        log::info!("Relay settings saved");
        Ok(())
    }
}
