//! Preset import and export
//!
//! Exports are projections of the collection into standalone preset
//! documents. Imports decode each file on its own, skip the ones that fail,
//! append everything else to the store and persist once at the end.

use crate::backend::sanitize_filename;
use crate::{codec, PresetCollection, PresetError, PresetStore, Result, UNTITLED};
use std::path::{Path, PathBuf};

/// File name used when exporting every preset
pub const EXPORT_ALL_FILE_NAME: &str = "node_presets.json";

/// A preset document ready to be saved or downloaded
#[derive(Debug, Clone, PartialEq)]
pub struct ExportFile {
    pub file_name: String,
    pub contents: Vec<u8>,
}

impl ExportFile {
    fn new(stem: &str, collection: &PresetCollection) -> Result<Self> {
        let stem = sanitize_filename(stem.trim());
        let stem = if stem.is_empty() { UNTITLED.to_string() } else { stem };
        Ok(Self {
            file_name: format!("{}.json", stem),
            contents: codec::encode_export(collection)?,
        })
    }

    /// Write the export into `dir` under its file name
    pub fn write_to(&self, dir: impl AsRef<Path>) -> Result<PathBuf> {
        let dir = dir.as_ref();
        std::fs::create_dir_all(dir)?;
        let path = dir.join(&self.file_name);
        std::fs::write(&path, &self.contents)?;
        Ok(path)
    }
}

/// Export one category with all of its presets
pub fn export_category(collection: &PresetCollection, category: &str) -> Result<ExportFile> {
    let mut projection = PresetCollection::new();
    projection.insert(
        category.to_string(),
        collection.get(category).cloned().unwrap_or_default(),
    );
    ExportFile::new(category, &projection)
}

/// Export a single preset, named after the preset
pub fn export_preset(collection: &PresetCollection, category: &str, index: usize) -> Result<ExportFile> {
    let list = collection.get(category).map(Vec::as_slice).unwrap_or(&[]);
    let preset = list.get(index).ok_or_else(|| PresetError::IndexOutOfRange {
        category: category.to_string(),
        index,
        len: list.len(),
    })?;

    let mut projection = PresetCollection::new();
    projection.insert(category.to_string(), vec![preset.clone()]);
    ExportFile::new(&preset.name, &projection)
}

/// Export the whole collection
///
/// Fails with `EmptyExport` when there is nothing to export.
pub fn export_all(collection: &PresetCollection) -> Result<ExportFile> {
    if collection.is_empty() {
        return Err(PresetError::EmptyExport);
    }
    Ok(ExportFile {
        file_name: EXPORT_ALL_FILE_NAME.to_string(),
        contents: codec::encode_export(collection)?,
    })
}

/// A file left out of an import
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedFile {
    pub source: String,
    pub reason: String,
}

/// Outcome of an import batch
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportSummary {
    pub files_imported: usize,
    pub presets_added: usize,
    pub skipped: Vec<SkippedFile>,
}

#[derive(Default)]
struct ImportBatch {
    decoded: Vec<PresetCollection>,
    skipped: Vec<SkippedFile>,
}

impl ImportBatch {
    fn add(&mut self, source: String, bytes: &[u8]) {
        match codec::decode(bytes) {
            Ok(collection) => self.decoded.push(collection),
            Err(e) => self.skip(source, e.to_string()),
        }
    }

    fn skip(&mut self, source: String, reason: String) {
        tracing::warn!("Skipping preset import {}: {}", source, reason);
        self.skipped.push(SkippedFile { source, reason });
    }

    fn finish(self, store: &mut PresetStore) -> ImportSummary {
        let mut summary = ImportSummary {
            skipped: self.skipped,
            ..Default::default()
        };
        for collection in self.decoded {
            summary.presets_added += store.merge_without_persist(collection);
            summary.files_imported += 1;
        }
        store.persist();

        tracing::info!(
            "Imported {} presets from {} file(s), skipped {}",
            summary.presets_added,
            summary.files_imported,
            summary.skipped.len()
        );
        summary
    }
}

/// Import a batch of preset documents
///
/// A file that fails to decode is skipped without affecting the others.
pub fn import_batch<I, B>(store: &mut PresetStore, files: I) -> ImportSummary
where
    I: IntoIterator<Item = B>,
    B: AsRef<[u8]>,
{
    let mut batch = ImportBatch::default();
    for (i, file) in files.into_iter().enumerate() {
        batch.add(format!("file #{}", i + 1), file.as_ref());
    }
    batch.finish(store)
}

/// Import preset documents from disk
///
/// Only `.json` files are considered. Files that cannot be read or decoded
/// are skipped.
pub async fn import_paths<I, P>(store: &mut PresetStore, paths: I) -> ImportSummary
where
    I: IntoIterator<Item = P>,
    P: AsRef<Path>,
{
    let mut batch = ImportBatch::default();
    for path in paths {
        let path = path.as_ref();
        let source = path.display().to_string();

        if !is_json_file(path) {
            batch.skip(source, "not a .json file".to_string());
            continue;
        }
        match tokio::fs::read(path).await {
            Ok(bytes) => batch.add(source, &bytes),
            Err(e) => batch.skip(source, e.to_string()),
        }
    }
    batch.finish(store)
}

fn is_json_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case("json"))
        .unwrap_or(false)
}

impl PresetStore {
    pub fn export_category(&self, category: &str) -> Result<ExportFile> {
        export_category(self.presets(), category)
    }

    pub fn export_preset(&self, category: &str, index: usize) -> Result<ExportFile> {
        export_preset(self.presets(), category, index)
    }

    pub fn export_all(&self) -> Result<ExportFile> {
        export_all(self.presets())
    }

    pub fn import_batch<I, B>(&mut self, files: I) -> ImportSummary
    where
        I: IntoIterator<Item = B>,
        B: AsRef<[u8]>,
    {
        import_batch(self, files)
    }

    pub async fn import_paths<I, P>(&mut self, paths: I) -> ImportSummary
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        import_paths(self, paths).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{MemoryLocalStorage, MemoryUserDataStore};
    use crate::{Preset, PresetStoreConfig, PresetValues};
    use serde_json::{json, Value};
    use std::sync::Arc;
    use tempfile::TempDir;

    fn sample() -> PresetCollection {
        let mut collection = PresetCollection::new();
        collection.insert(
            "KSampler".into(),
            vec![
                Preset::new("fast", json!({"steps": 12}).as_object().cloned().unwrap()),
                Preset::new("slow/careful", json!({"steps": 60}).as_object().cloned().unwrap()),
            ],
        );
        collection.insert("VAEDecode".into(), vec![Preset::new("tiled", PresetValues::new())]);
        collection
    }

    async fn empty_store() -> PresetStore {
        PresetStore::open(
            PresetStoreConfig::default(),
            Arc::new(MemoryLocalStorage::new()),
            Arc::new(MemoryUserDataStore::new()),
        )
        .await
    }

    #[test]
    fn test_export_all() {
        let file = export_all(&sample()).unwrap();
        assert_eq!(file.file_name, EXPORT_ALL_FILE_NAME);
        assert_eq!(codec::decode(&file.contents).unwrap(), sample());
        assert!(String::from_utf8(file.contents).unwrap().starts_with("{\n  \"presets\""));
    }

    #[test]
    fn test_export_all_empty() {
        assert!(matches!(
            export_all(&PresetCollection::new()),
            Err(PresetError::EmptyExport)
        ));
    }

    #[test]
    fn test_export_category_only_contains_category() {
        let file = export_category(&sample(), "KSampler").unwrap();
        let decoded = codec::decode(&file.contents).unwrap();

        assert_eq!(file.file_name, "KSampler.json");
        assert_eq!(decoded.len(), 1);
        assert_eq!(decoded["KSampler"], sample()["KSampler"]);
    }

    #[test]
    fn test_export_preset_single_element() {
        let file = export_preset(&sample(), "KSampler", 1).unwrap();
        let value: Value = serde_json::from_slice(&file.contents).unwrap();

        assert_eq!(file.file_name, "slow_careful.json");
        assert_eq!(
            value,
            json!({"presets": {"KSampler": [{"name": "slow/careful", "values": {"steps": 60}}]}})
        );
        assert!(export_preset(&sample(), "KSampler", 2).is_err());
    }

    #[test]
    fn test_export_preset_blank_name() {
        let mut collection = PresetCollection::new();
        collection.insert("A".into(), vec![Preset::new("  ", PresetValues::new())]);
        assert_eq!(export_preset(&collection, "A", 0).unwrap().file_name, "untitled.json");
    }

    #[test]
    fn test_write_to() {
        let temp_dir = TempDir::new().unwrap();
        let file = export_all(&sample()).unwrap();

        let path = file.write_to(temp_dir.path().join("exports")).unwrap();

        assert_eq!(path, temp_dir.path().join("exports").join(EXPORT_ALL_FILE_NAME));
        assert_eq!(std::fs::read(path).unwrap(), file.contents);
    }

    #[tokio::test]
    async fn test_import_batch_skips_malformed() {
        let mut store = empty_store().await;
        let good = export_all(&sample()).unwrap().contents;

        let summary = store.import_batch(vec![good.clone(), b"{broken".to_vec(), good]);

        assert_eq!(summary.files_imported, 2);
        assert_eq!(summary.presets_added, 6);
        assert_eq!(summary.skipped.len(), 1);
        assert_eq!(summary.skipped[0].source, "file #2");
        assert_eq!(store.list_presets("KSampler").len(), 4);
    }

    #[tokio::test]
    async fn test_import_batch_ignores_documents_without_presets() {
        let mut store = empty_store().await;
        let files: [&[u8]; 3] = [b"{}", b"null", br#"{"presets":null}"#];
        let summary = store.import_batch(files);

        assert_eq!(summary.files_imported, 3);
        assert_eq!(summary.presets_added, 0);
        assert!(store.presets().is_empty());
    }

    #[tokio::test]
    async fn test_import_paths() {
        let temp_dir = TempDir::new().unwrap();
        let good = export_all(&sample()).unwrap().write_to(temp_dir.path()).unwrap();
        let broken = temp_dir.path().join("broken.json");
        std::fs::write(&broken, "not json").unwrap();
        let text = temp_dir.path().join("notes.txt");
        std::fs::write(&text, export_all(&sample()).unwrap().contents).unwrap();
        let missing = temp_dir.path().join("missing.json");

        let mut store = empty_store().await;
        let summary = store.import_paths([good, broken, text, missing]).await;

        assert_eq!(summary.files_imported, 1);
        assert_eq!(summary.presets_added, 3);
        assert_eq!(summary.skipped.len(), 3);
        assert_eq!(*store.presets(), sample());
    }

    #[test]
    fn test_is_json_file() {
        assert!(is_json_file(Path::new("a.json")));
        assert!(is_json_file(Path::new("A.JSON")));
        assert!(!is_json_file(Path::new("a.txt")));
        assert!(!is_json_file(Path::new("json")));
    }
}
