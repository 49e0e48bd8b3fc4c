//! Project inputs: `package.json` for the module identity and an optional
//! `bundle.toml` for everything Foundry-specific.

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fs;
use std::path::{Path, PathBuf};

use crate::modules_dir::normalize_path;

pub const PACKAGE_FILE: &str = "package.json";
pub const CONFIG_FILE: &str = "bundle.toml";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PackageJson {
    pub name: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
    /// Free-form; Foundry accepts objects with `name`, `url`, `discord`, ...
    #[serde(default)]
    pub authors: Option<Value>,
    #[serde(default)]
    pub author: Option<Value>,
    #[serde(default)]
    pub homepage: Option<String>,
}

impl PackageJson {
    pub fn load(project_root: &Path) -> Result<Self> {
        let path = project_root.join(PACKAGE_FILE);
        let contents = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse {}", path.display()))
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Compatibility {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minimum: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verified: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub maximum: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Relationship {
    pub id: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compatibility: Option<Compatibility>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Relationships {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub systems: Vec<Relationship>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub requires: Vec<Relationship>,
}

impl Relationships {
    pub fn is_empty(&self) -> bool {
        self.systems.is_empty() && self.requires.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PackDescriptor {
    pub name: String,
    pub label: String,
    pub path: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BundleConfig {
    #[serde(default = "default_source_dir")]
    pub source_dir: PathBuf,
    #[serde(default = "default_out_dir")]
    pub out_dir: PathBuf,
    #[serde(default = "default_protected")]
    pub protected: bool,
    /// Legacy `minimumCoreVersion` for pre-v10 cores.
    #[serde(default)]
    pub minimum_core_version: Option<String>,
    /// Legacy `system` list.
    #[serde(default)]
    pub systems: Vec<String>,
    #[serde(default)]
    pub compatibility: Option<Compatibility>,
    #[serde(default)]
    pub relationships: Relationships,
    #[serde(default)]
    pub packs: Vec<PackDescriptor>,
    #[serde(default)]
    pub flags: Map<String, Value>,
}

fn default_source_dir() -> PathBuf {
    PathBuf::from("src")
}

fn default_out_dir() -> PathBuf {
    PathBuf::from("dist")
}

fn default_protected() -> bool {
    true
}

impl Default for BundleConfig {
    fn default() -> Self {
        Self {
            source_dir: default_source_dir(),
            out_dir: default_out_dir(),
            protected: default_protected(),
            minimum_core_version: None,
            systems: Vec::new(),
            compatibility: None,
            relationships: Relationships::default(),
            packs: Vec::new(),
            flags: Map::new(),
        }
    }
}

impl BundleConfig {
    /// Missing `bundle.toml` yields the defaults.
    pub fn load(project_root: &Path) -> Result<Self> {
        let path = project_root.join(CONFIG_FILE);
        if !path.exists() {
            tracing::debug!(path = %path.display(), "no bundle config, using defaults");
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        Self::parse(&contents).with_context(|| format!("Failed to parse {}", path.display()))
    }

    pub fn parse(contents: &str) -> Result<Self> {
        Ok(toml::from_str(contents)?)
    }

    /// Resolves `out_dir` against the project root and refuses locations the
    /// build would wipe out: the root itself, any ancestor of it, or the
    /// source directory and its ancestors.
    pub fn resolve_out_dir(&self, project_root: &Path) -> Result<PathBuf> {
        let root = fs::canonicalize(project_root)
            .with_context(|| format!("Failed to resolve project root {}", project_root.display()))?;
        let out_dir = normalize_path(&root.join(&self.out_dir));
        let source_dir = normalize_path(&root.join(&self.source_dir));

        if root.starts_with(&out_dir) {
            return Err(anyhow!(
                "out_dir '{}' would remove the project root {}",
                self.out_dir.display(),
                root.display()
            ));
        }
        if source_dir.starts_with(&out_dir) {
            return Err(anyhow!(
                "out_dir '{}' would remove the sources in {}",
                self.out_dir.display(),
                source_dir.display()
            ));
        }

        Ok(out_dir)
    }
}
