//! Material record and mapping types.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// One entry in the color-to-material table.
///
/// `preview_color` is the flat color used in the source image; the provider is
/// told to find parts painted in that color and render them as the described
/// material or component.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MaterialRecord {
    /// Stable identifier, unique within a mapping.
    #[serde(rename = "id", alias = "key", default)]
    pub key: String,
    /// Human label; falls back to `key`.
    #[serde(rename = "name", alias = "displayName", default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    /// Color as it appears in the source image (e.g. `#FFD700`).
    #[serde(default)]
    pub preview_color: String,
    /// Real-world material name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub material: Option<String>,
    /// Surface finish (matte, satin, polished).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finish: Option<String>,
    /// Color of the real material.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color_code: Option<String>,
    /// Surface pattern (veins, grain).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    /// Component label for non-material entries (oven, sink).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub component: Option<String>,
    /// Free-text description of the component.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Any other fields, kept so a save/load round trip is lossless.
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl MaterialRecord {
    /// Creates a record with the given key and preview color.
    pub fn new(key: impl Into<String>, preview_color: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            preview_color: preview_color.into(),
            ..Default::default()
        }
    }

    /// Sets the display name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }

    /// Sets the material name.
    pub fn with_material(mut self, material: impl Into<String>) -> Self {
        self.material = Some(material.into());
        self
    }

    /// Sets the finish.
    pub fn with_finish(mut self, finish: impl Into<String>) -> Self {
        self.finish = Some(finish.into());
        self
    }

    /// Sets the real-world color code.
    pub fn with_color_code(mut self, color_code: impl Into<String>) -> Self {
        self.color_code = Some(color_code.into());
        self
    }

    /// Sets the pattern.
    pub fn with_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.pattern = Some(pattern.into());
        self
    }

    /// Sets the component label.
    pub fn with_component(mut self, component: impl Into<String>) -> Self {
        self.component = Some(component.into());
        self
    }

    /// Sets the component description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Adds an extra free-form field.
    pub fn with_extra(mut self, field: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra.insert(field.into(), Value::String(value.into()));
        self
    }

    /// Returns the display name, or the key if none is set.
    pub fn label(&self) -> &str {
        non_empty(self.display_name.as_deref()).unwrap_or(&self.key)
    }
}

/// Returns the value if it holds something other than whitespace.
pub(crate) fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// The full color-to-material table, keyed by record key.
///
/// Serializes as a plain JSON object `{ "<key>": { ...record } }`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MaterialMapping(BTreeMap<String, MaterialRecord>);

impl MaterialMapping {
    /// Creates an empty mapping.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a record under its own key, replacing any previous entry.
    pub fn insert(&mut self, record: MaterialRecord) -> Option<MaterialRecord> {
        self.0.insert(record.key.clone(), record)
    }

    /// Sets `mapping[key] = record`.
    pub fn set(&mut self, key: impl Into<String>, record: MaterialRecord) -> Option<MaterialRecord> {
        self.0.insert(key.into(), record)
    }

    /// Looks up a record by key.
    pub fn get(&self, key: &str) -> Option<&MaterialRecord> {
        self.0.get(key)
    }

    /// Removes a record by key.
    pub fn remove(&mut self, key: &str) -> Option<MaterialRecord> {
        self.0.remove(key)
    }

    /// Iterates over records in key order.
    pub fn records(&self) -> impl Iterator<Item = &MaterialRecord> {
        self.0.values()
    }

    /// Iterates over `(key, record)` pairs in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &MaterialRecord)> {
        self.0.iter()
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if there are no records.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<MaterialRecord> for MaterialMapping {
    fn from_iter<I: IntoIterator<Item = MaterialRecord>>(iter: I) -> Self {
        let mut mapping = Self::new();
        for record in iter {
            mapping.insert(record);
        }
        mapping
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_wire_names() {
        let record = MaterialRecord::new("yellow", "#FFD700")
            .with_name("Yellow Mapping")
            .with_material("Matte White Sprayed MDF")
            .with_color_code("#f8f8f8");
        let json = serde_json::to_value(&record).unwrap();

        assert_eq!(json["id"], "yellow");
        assert_eq!(json["name"], "Yellow Mapping");
        assert_eq!(json["previewColor"], "#FFD700");
        assert_eq!(json["colorCode"], "#f8f8f8");
        assert!(json.get("finish").is_none());
        assert!(json.get("component").is_none());
    }

    #[test]
    fn test_record_keeps_unknown_fields() {
        let json = r##"{
            "id": "lightblue",
            "name": "Light Blue Mapping",
            "component": "Wine Fridge",
            "door": "Glass",
            "frame": "Black",
            "previewColor": "#ADD8E6"
        }"##;
        let record: MaterialRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.component.as_deref(), Some("Wine Fridge"));
        assert_eq!(record.extra["door"], "Glass");
        assert_eq!(record.extra["frame"], "Black");

        let back = serde_json::to_value(&record).unwrap();
        assert_eq!(back["door"], "Glass");
        assert_eq!(back["frame"], "Black");
    }

    #[test]
    fn test_record_accepts_aliases() {
        let json = r##"{"key": "k", "displayName": "Kitchen", "previewColor": "#111111"}"##;
        let record: MaterialRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.key, "k");
        assert_eq!(record.label(), "Kitchen");
    }

    #[test]
    fn test_label_falls_back_to_key() {
        let record = MaterialRecord::new("grey", "#808080");
        assert_eq!(record.label(), "grey");

        let blank = MaterialRecord::new("grey", "#808080").with_name("  ");
        assert_eq!(blank.label(), "grey");
    }

    #[test]
    fn test_mapping_serializes_as_object() {
        let mapping: MaterialMapping = [
            MaterialRecord::new("b", "#000000"),
            MaterialRecord::new("a", "#FFFFFF"),
        ]
        .into_iter()
        .collect();

        let json = serde_json::to_value(&mapping).unwrap();
        assert!(json.is_object());
        assert_eq!(json["a"]["previewColor"], "#FFFFFF");

        let keys: Vec<&String> = mapping.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["a", "b"]);
    }

    #[test]
    fn test_set_replaces_entry() {
        let mut mapping = MaterialMapping::new();
        mapping.insert(MaterialRecord::new("a", "#FFFFFF"));
        let previous = mapping.set("a", MaterialRecord::new("a", "#000000"));

        assert_eq!(previous.unwrap().preview_color, "#FFFFFF");
        assert_eq!(mapping.len(), 1);
        assert_eq!(mapping.get("a").unwrap().preview_color, "#000000");
    }
}
