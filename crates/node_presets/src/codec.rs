//! Preset document serialization
//!
//! The persisted document and export files share one shape:
//!
//! ```text
//! { "presets": { "<category>": [ { "name": "...", "values": { ... } } ] } }
//! ```

use crate::{Preset, PresetCollection, Result};
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Indentation used when writing to the remote store
const STORE_INDENT: &[u8] = b"    ";

/// Indentation used for export files
const EXPORT_INDENT: &[u8] = b"  ";

#[derive(Serialize)]
struct PresetDocumentRef<'a> {
    presets: &'a PresetCollection,
}

/// Categories as stored; a `null` category reads as an empty list
type StoredCategories = BTreeMap<String, Option<Vec<Preset>>>;

/// Serialize a collection as a compact document
pub fn encode(collection: &PresetCollection) -> Result<Vec<u8>> {
    Ok(serde_json::to_vec(&PresetDocumentRef { presets: collection })?)
}

/// Serialize a collection with four-space indentation
pub fn encode_pretty(collection: &PresetCollection) -> Result<Vec<u8>> {
    encode_indented(collection, STORE_INDENT)
}

/// Serialize a collection the way export files are written
pub fn encode_export(collection: &PresetCollection) -> Result<Vec<u8>> {
    encode_indented(collection, EXPORT_INDENT)
}

fn encode_indented(collection: &PresetCollection, indent: &[u8]) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(indent);
    let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
    PresetDocumentRef { presets: collection }.serialize(&mut serializer)?;
    Ok(buf)
}

/// Parse a preset document
///
/// `null`, `{}` and `{"presets": null}` all decode to an empty collection,
/// and a `null` category decodes as an empty list. Anything that is not a
/// JSON object (or `null`), or whose `presets` entry is not a map of
/// category to preset list, fails with `MalformedDocument`.
pub fn decode(bytes: &[u8]) -> Result<PresetCollection> {
    let document: Option<Map<String, Value>> = serde_json::from_slice(bytes)?;
    let presets = document
        .and_then(|mut document| document.remove("presets"))
        .unwrap_or(Value::Null);

    let categories: Option<StoredCategories> = serde_json::from_value(presets)?;
    Ok(categories
        .unwrap_or_default()
        .into_iter()
        .map(|(category, presets)| (category, presets.unwrap_or_default()))
        .collect())
}
