//! Preset data model
//!
//! A preset is a named snapshot of setting values for one category (node
//! type). Presets are grouped per category in ordered sequences; the position
//! inside a sequence is the only identity a preset has.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Name given to a preset whose name was cleared
pub const UNTITLED: &str = "untitled";

/// Setting values captured by a preset, keyed by setting name
pub type PresetValues = Map<String, Value>;

/// Every category mapped to its ordered presets
pub type PresetCollection = BTreeMap<String, Vec<Preset>>;

/// A named snapshot of settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Preset {
    pub name: String,
    #[serde(default)]
    pub values: PresetValues,
}

impl Preset {
    pub fn new(name: impl Into<String>, values: PresetValues) -> Self {
        Self {
            name: name.into(),
            values,
        }
    }

    /// Set the name, falling back to [`UNTITLED`] for blank input
    pub fn rename(&mut self, name: &str) {
        self.name = normalize_name(name);
    }

    /// Copy this preset's values onto `target`
    ///
    /// Only keys already present in `target` are written; values for settings
    /// the target does not have are ignored. Returns how many were applied.
    pub fn apply_to(&self, target: &mut PresetValues) -> usize {
        let mut applied = 0;
        for (key, slot) in target.iter_mut() {
            if let Some(value) = self.values.get(key) {
                *slot = value.clone();
                applied += 1;
            }
        }
        applied
    }
}

/// Trim a user-entered name, replacing blank input with [`UNTITLED`]
pub fn normalize_name(name: &str) -> String {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        UNTITLED.to_string()
    } else {
        trimmed.to_string()
    }
}

/// Total number of presets across all categories
pub fn preset_count(collection: &PresetCollection) -> usize {
    collection.values().map(Vec::len).sum()
}
