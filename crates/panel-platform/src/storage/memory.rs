//! In-memory storage backend.
//! Used when IndexedDB is unavailable; nothing survives a reload.

use std::cell::RefCell;
use std::collections::HashMap;
use async_trait::async_trait;
use panel_core::ports::{parse_counter, StoragePort};
use panel_types::Result;

#[derive(Default)]
pub struct MemoryStorage {
    data: RefCell<HashMap<String, Vec<u8>>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait(?Send)]
impl StoragePort for MemoryStorage {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.data.borrow().get(key).cloned())
    }

    async fn set(&self, key: &str, value: &[u8]) -> Result<()> {
        self.data
            .borrow_mut()
            .insert(key.to_string(), value.to_vec());
        Ok(())
    }

    /// All entries land under one borrow, so no reader sees half a batch.
    async fn set_many(&self, entries: &[(String, Vec<u8>)]) -> Result<()> {
        let mut data = self.data.borrow_mut();
        for (key, value) in entries {
            data.insert(key.clone(), value.clone());
        }
        Ok(())
    }

    /// Check and write under one borrow.
    async fn set_many_if_counter(
        &self,
        counter_key: &str,
        expected: u64,
        entries: &[(String, Vec<u8>)],
    ) -> Result<u64> {
        let mut data = self.data.borrow_mut();
        let found = parse_counter(data.get(counter_key).map(Vec::as_slice))?;
        if found == expected {
            for (key, value) in entries {
                data.insert(key.clone(), value.clone());
            }
        }
        Ok(found)
    }

    fn backend_name(&self) -> &str {
        "memory"
    }
}
