//! Copying localization files and image assets into the output directory.

use anyhow::{Context, Result, anyhow};
use glob::{Pattern, glob};
use rayon::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};

use crate::manifest::relative_name;
use crate::optimize::{ImageKind, optimize_image};

pub const LANG_PATTERN: &str = "lang/**/*.json";
pub const IMAGE_PATTERNS: [&str; 3] = ["assets/**/*.png", "assets/**/*.svg", "assets/**/*.webp"];

#[derive(Debug, Clone)]
pub struct DiscoveredAsset {
    /// `/`-separated, relative to the source directory
    pub name: String,
    pub source_path: PathBuf,
}

pub struct AssetCopier {
    source_dir: PathBuf,
    out_dir: PathBuf,
    optimize: bool,
}

impl AssetCopier {
    pub fn new(source_dir: impl AsRef<Path>, out_dir: impl AsRef<Path>) -> Self {
        Self {
            source_dir: source_dir.as_ref().to_path_buf(),
            out_dir: out_dir.as_ref().to_path_buf(),
            optimize: true,
        }
    }

    pub fn optimize(mut self, optimize: bool) -> Self {
        self.optimize = optimize;
        self
    }

    pub fn discover(&self, pattern: &str) -> Result<Vec<DiscoveredAsset>> {
        // The directory part is literal; only `pattern` may contain wildcards.
        let prefix = Pattern::escape(&self.source_dir.to_string_lossy());
        let pattern_str = format!("{}/{}", prefix.trim_end_matches(['/', '\\']), pattern);

        let paths = glob(&pattern_str).map_err(|e| anyhow!("Invalid glob pattern '{}': {}", pattern, e))?;

        let mut assets = Vec::new();
        for entry in paths {
            match entry {
                Ok(path) if path.is_file() => {
                    assets.push(DiscoveredAsset {
                        name: relative_name(&self.source_dir, &path)?,
                        source_path: path,
                    });
                }
                Ok(_) => {}
                Err(e) => tracing::warn!(error = %e, "error reading path"),
            }
        }

        assets.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(assets)
    }

    /// Writes every localization file minified. Returns the emitted names.
    pub fn copy_lang(&self) -> Result<Vec<String>> {
        let assets = self.discover(LANG_PATTERN)?;

        for asset in &assets {
            let contents = fs::read_to_string(&asset.source_path)
                .with_context(|| format!("Failed to read {}", asset.source_path.display()))?;
            let value: serde_json::Value = serde_json::from_str(&contents)
                .with_context(|| format!("Invalid JSON in {}", asset.source_path.display()))?;

            self.emit(&asset.name, serde_json::to_string(&value)?.as_bytes())?;
        }

        tracing::info!(count = assets.len(), "copied localization files");
        Ok(assets.into_iter().map(|a| a.name).collect())
    }

    /// Copies images, optimizing them in parallel. Returns the emitted names.
    pub fn copy_images(&self) -> Result<Vec<String>> {
        let mut assets = Vec::new();
        for pattern in IMAGE_PATTERNS {
            assets.extend(self.discover(pattern)?);
        }
        assets.sort_by(|a, b| a.name.cmp(&b.name));

        let saved: Vec<u64> = assets
            .par_iter()
            .map(|asset| self.copy_image(asset))
            .collect::<Result<_>>()?;

        tracing::info!(
            count = assets.len(),
            bytes_saved = saved.iter().sum::<u64>(),
            "copied image assets"
        );
        Ok(assets.into_iter().map(|a| a.name).collect())
    }

    fn copy_image(&self, asset: &DiscoveredAsset) -> Result<u64> {
        let content = fs::read(&asset.source_path)
            .with_context(|| format!("Failed to read {}", asset.source_path.display()))?;

        let output = match ImageKind::from_path(&asset.source_path) {
            Some(kind) if self.optimize => optimize_image(kind, &content),
            _ => content.clone(),
        };

        self.emit(&asset.name, &output)?;
        tracing::debug!(asset = %asset.name, before = content.len(), after = output.len(), "image");

        Ok(content.len().saturating_sub(output.len()) as u64)
    }

    fn emit(&self, name: &str, content: &[u8]) -> Result<PathBuf> {
        let target = self.out_dir.join(name);
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }
        fs::write(&target, content)
            .with_context(|| format!("Failed to write {}", target.display()))?;
        Ok(target)
    }
}
