//! Persisted material mapping.

use crate::error::{RenderError, Result};
use crate::materials::defaults::default_mapping;
use crate::materials::store::KeyValueStore;
use crate::materials::types::{MaterialMapping, MaterialRecord};
use std::sync::{Arc, Mutex};

/// Store key holding the serialized mapping.
pub const MATERIALS_KEY: &str = "sketchup-materials";

/// Loads and saves the whole material mapping against a [`KeyValueStore`].
///
/// The mapping is persisted as one JSON object; there are no partial writes.
/// Writers going through the same registry are serialized, so concurrent
/// [`update`](Self::update) calls on a shared registry never drop each other's
/// change. Separate registries over the same store are still last-write-wins.
pub struct MaterialRegistry {
    store: Arc<dyn KeyValueStore>,
    write_lock: Mutex<()>,
}

impl MaterialRegistry {
    /// Creates a registry over the given store.
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            store,
            write_lock: Mutex::new(()),
        }
    }

    /// Returns the persisted mapping, or the built-in defaults if nothing
    /// usable is stored. Never fails.
    pub fn load(&self) -> MaterialMapping {
        let raw = match self.store.get(MATERIALS_KEY) {
            Ok(Some(raw)) => raw,
            Ok(None) => return default_mapping(),
            Err(e) => {
                tracing::warn!("failed to read material mapping, using defaults: {e}");
                return default_mapping();
            }
        };

        match serde_json::from_str::<MaterialMapping>(&raw) {
            Ok(mapping) => mapping,
            Err(e) => {
                tracing::warn!("stored material mapping is corrupt, using defaults: {e}");
                default_mapping()
            }
        }
    }

    /// Replaces the persisted mapping.
    pub fn save(&self, mapping: &MaterialMapping) -> Result<()> {
        let _guard = self.write_lock.lock().unwrap_or_else(|e| e.into_inner());
        self.write(mapping)
    }

    /// Sets `mapping[key] = record` and persists the result.
    ///
    /// The record's own key is overwritten with `key`, so keys stay unique.
    /// Returns the mapping as saved.
    pub fn update(&self, key: &str, mut record: MaterialRecord) -> Result<MaterialMapping> {
        let key = key.trim();
        if key.is_empty() {
            return Err(RenderError::InvalidRequest(
                "material key must not be empty".into(),
            ));
        }
        record.key = key.to_string();

        let _guard = self.write_lock.lock().unwrap_or_else(|e| e.into_inner());
        let mut mapping = self.load();
        mapping.set(key, record);
        self.write(&mapping)?;
        Ok(mapping)
    }

    /// Forgets the persisted mapping so the next [`load`](Self::load) yields defaults.
    pub fn reset(&self) -> Result<()> {
        let _guard = self.write_lock.lock().unwrap_or_else(|e| e.into_inner());
        self.store.remove(MATERIALS_KEY)
    }

    fn write(&self, mapping: &MaterialMapping) -> Result<()> {
        let raw = serde_json::to_string(mapping)?;
        self.store.set(MATERIALS_KEY, &raw)?;
        tracing::debug!(records = mapping.len(), "saved material mapping");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::materials::store::{FileStore, MemoryStore};

    fn registry() -> (Arc<MemoryStore>, MaterialRegistry) {
        let store = Arc::new(MemoryStore::new());
        let registry = MaterialRegistry::new(store.clone());
        (store, registry)
    }

    #[test]
    fn test_load_empty_store_returns_defaults() {
        let (_, registry) = registry();
        assert_eq!(registry.load(), default_mapping());
    }

    #[test]
    fn test_save_then_load_round_trip() {
        let (_, registry) = registry();
        let mapping: MaterialMapping = [
            MaterialRecord::new("red", "#FF0000")
                .with_material("Oak")
                .with_finish("Oiled"),
            MaterialRecord::new("blue", "#0000FF")
                .with_component("Tap")
                .with_extra("frame", "Chrome"),
        ]
        .into_iter()
        .collect();

        registry.save(&mapping).unwrap();
        assert_eq!(registry.load(), mapping);
    }

    #[test]
    fn test_save_empty_mapping_is_not_defaults() {
        let (_, registry) = registry();
        registry.save(&MaterialMapping::new()).unwrap();
        assert!(registry.load().is_empty());
    }

    #[test]
    fn test_corrupt_value_falls_back_to_defaults() {
        let (store, registry) = registry();
        store.set(MATERIALS_KEY, "{not json").unwrap();
        assert_eq!(registry.load(), default_mapping());

        store.set(MATERIALS_KEY, "[1, 2, 3]").unwrap();
        assert_eq!(registry.load(), default_mapping());
    }

    #[test]
    fn test_update_sets_record_and_persists() {
        let (_, registry) = registry();
        let record = MaterialRecord::new("", "#FFD700").with_material("Brushed Brass");

        let saved = registry.update("yellow", record).unwrap();
        assert_eq!(saved.len(), 7);

        let loaded = registry.load();
        let yellow = loaded.get("yellow").unwrap();
        assert_eq!(yellow.key, "yellow");
        assert_eq!(yellow.material.as_deref(), Some("Brushed Brass"));
        assert_eq!(loaded, saved);
    }

    #[test]
    fn test_update_overrides_mismatched_record_key() {
        let (_, registry) = registry();
        let saved = registry
            .update("blue", MaterialRecord::new("yellow", "#0000FF"))
            .unwrap();

        assert_eq!(saved.get("blue").unwrap().key, "blue");
        let yellows = saved.records().filter(|r| r.key == "yellow").count();
        assert_eq!(yellows, 1);
        assert_eq!(saved.get("yellow").unwrap().preview_color, "#FFD700");
        assert_eq!(registry.load(), saved);
    }

    #[test]
    fn test_update_rejects_empty_key() {
        let (_, registry) = registry();
        let err = registry
            .update("  ", MaterialRecord::new("", "#FFFFFF"))
            .unwrap_err();
        assert!(matches!(err, RenderError::InvalidRequest(_)));
    }

    #[test]
    fn test_reset_restores_defaults() {
        let (_, registry) = registry();
        registry.save(&MaterialMapping::new()).unwrap();
        registry.reset().unwrap();
        assert_eq!(registry.load(), default_mapping());
    }

    #[test]
    fn test_concurrent_updates_on_shared_registry_keep_every_write() {
        let (_, registry) = registry();
        registry.save(&MaterialMapping::new()).unwrap();
        let registry = Arc::new(registry);

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let registry = Arc::clone(&registry);
                std::thread::spawn(move || {
                    let key = format!("k{i}");
                    registry
                        .update(&key, MaterialRecord::new(key.clone(), format!("#00000{i}")))
                        .unwrap();
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(registry.load().len(), 8);
    }

    #[test]
    fn test_file_backed_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(FileStore::open(dir.path()).unwrap());
        let registry = MaterialRegistry::new(store.clone());

        let mut mapping = default_mapping();
        mapping.remove("grey");
        registry.save(&mapping).unwrap();

        let reopened = MaterialRegistry::new(Arc::new(FileStore::open(dir.path()).unwrap()));
        assert_eq!(reopened.load(), mapping);
    }
}
