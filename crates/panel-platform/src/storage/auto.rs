//! Pick the best available storage backend.
//!
//! Priority: IndexedDB → Memory (fallback)

use std::rc::Rc;
use panel_core::ports::StoragePort;
use super::{IndexedDbStorage, MemoryStorage};

/// Open IndexedDB if this context has it, otherwise fall back to memory.
/// Works in both the panel window and the background worker.
pub async fn auto_detect_storage() -> Rc<dyn StoragePort> {
    match IndexedDbStorage::open().await {
        Ok(idb) => {
            log::info!("Storage backend: IndexedDB");
            Rc::new(idb)
        }
        Err(e) => {
            log::warn!("IndexedDB unavailable ({}), falling back to memory", e);
            Rc::new(MemoryStorage::new())
        }
    }
}
