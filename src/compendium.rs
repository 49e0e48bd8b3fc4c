//! Compendium packs: a directory of JSON documents becomes one `.db` file
//! with a document per line.

use anyhow::{Context, Result, anyhow};
use serde_json::{Map, Value};
use std::fs;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct CompendiumPack {
    pub name: String,
    pub documents: Vec<Map<String, Value>>,
}

impl CompendiumPack {
    /// Loads every `*.json` file in `dir`, sorted by file name. A file holds
    /// either one document or an array of documents.
    pub fn load_json(dir: &Path) -> Result<Self> {
        let name = dir
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| anyhow!("Invalid pack directory: {}", dir.display()))?;

        let mut files: Vec<PathBuf> = fs::read_dir(dir)
            .with_context(|| format!("Failed to read pack directory {}", dir.display()))?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| path.is_file() && path.extension().is_some_and(|ext| ext == "json"))
            .collect();
        files.sort();

        let mut documents = Vec::new();
        for file in &files {
            let contents = fs::read_to_string(file)
                .with_context(|| format!("Failed to read {}", file.display()))?;
            let value: Value = serde_json::from_str(&contents)
                .with_context(|| format!("Invalid JSON in {}", file.display()))?;

            match value {
                Value::Object(document) => documents.push(document),
                Value::Array(items) => {
                    for (index, item) in items.into_iter().enumerate() {
                        match item {
                            Value::Object(document) => documents.push(document),
                            _ => {
                                return Err(anyhow!(
                                    "Entry {} in {} is not a JSON object",
                                    index,
                                    file.display()
                                ));
                            }
                        }
                    }
                }
                _ => return Err(anyhow!("{} does not contain a JSON object", file.display())),
            }
        }

        tracing::debug!(pack = %name, documents = documents.len(), "loaded compendium source");
        Ok(Self { name, documents })
    }

    pub fn db_file_name(&self) -> String {
        format!("{}.db", self.name)
    }

    /// Writes `<packs_dir>/<name>.db` and returns its path.
    pub fn save(&self, packs_dir: &Path) -> Result<PathBuf> {
        fs::create_dir_all(packs_dir)
            .with_context(|| format!("Failed to create directory: {}", packs_dir.display()))?;

        let path = packs_dir.join(self.db_file_name());
        let file = fs::File::create(&path)
            .with_context(|| format!("Failed to create {}", path.display()))?;
        let mut writer = BufWriter::new(file);

        for document in &self.documents {
            serde_json::to_writer(&mut writer, document)?;
            writer.write_all(b"\n")?;
        }
        writer
            .flush()
            .with_context(|| format!("Failed to write {}", path.display()))?;

        tracing::info!(pack = %self.name, documents = self.documents.len(), "saved compendium pack");
        Ok(path)
    }
}

/// Builds one pack per subdirectory of `source_dir`. A missing directory
/// builds nothing.
pub fn build_packs(source_dir: &Path, packs_dir: &Path) -> Result<Vec<PathBuf>> {
    if !source_dir.is_dir() {
        return Ok(Vec::new());
    }

    let mut dirs: Vec<PathBuf> = fs::read_dir(source_dir)
        .with_context(|| format!("Failed to read {}", source_dir.display()))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.is_dir())
        .collect();
    dirs.sort();

    dirs.iter()
        .map(|dir| CompendiumPack::load_json(dir)?.save(packs_dir))
        .collect()
}
