use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::config::{BundleConfig, Compatibility, PackDescriptor, PackageJson, Relationships};
use crate::deploy::MANIFEST_FILE;
use crate::languages::LanguageNames;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModuleManifest {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authors: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compatibility: Option<Compatibility>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minimum_core_version: Option<String>,
    #[serde(default, skip_serializing_if = "Relationships::is_empty")]
    pub relationships: Relationships,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub system: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub protected: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub download: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manifest: Option<String>,
    #[serde(default)]
    pub esmodules: Vec<String>,
    #[serde(default)]
    pub languages: Vec<LanguageEntry>,
    #[serde(default)]
    pub packs: Vec<PackDescriptor>,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub flags: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LanguageEntry {
    pub lang: String,
    pub name: String,
    pub path: String,
}

pub struct ManifestGenerator {
    language_names: LanguageNames,
}

impl ManifestGenerator {
    pub fn new() -> Self {
        Self {
            language_names: LanguageNames::new(),
        }
    }

    /// Builds the manifest from the package identity, the bundle config and
    /// the files emitted into the output directory (relative, `/`-separated).
    pub fn generate_manifest(
        &self,
        package: &PackageJson,
        config: &BundleConfig,
        files: &[String],
    ) -> ModuleManifest {
        let files: Vec<&str> = files
            .iter()
            .map(String::as_str)
            .filter(|name| name.ends_with(".js") || name.ends_with(".json"))
            .collect();

        let esmodules = files
            .iter()
            .filter(|name| name.starts_with("scripts/") && name.ends_with(".js"))
            .map(|name| name.to_string())
            .collect();

        let languages = files
            .iter()
            .filter(|name| name.starts_with("lang/") && name.ends_with(".json"))
            .map(|name| self.language_entry(name))
            .collect();

        let homepage = package.homepage.as_deref().map(|h| h.trim_end_matches('/'));

        ModuleManifest {
            id: package.name.clone(),
            title: package.title.clone(),
            description: package.description.clone(),
            version: package.version.clone(),
            authors: package.authors.clone(),
            author: package.author.clone(),
            compatibility: config.compatibility.clone(),
            minimum_core_version: config.minimum_core_version.clone(),
            relationships: config.relationships.clone(),
            system: config.systems.clone(),
            url: package.homepage.clone(),
            protected: config.protected,
            download: homepage.map(|h| format!("{}/releases/download/latest/module.zip", h)),
            manifest: homepage.map(|h| format!("{}/releases/download/latest/module.json", h)),
            esmodules,
            languages,
            packs: config.packs.clone(),
            flags: config.flags.clone(),
        }
    }

    fn language_entry(&self, file_name: &str) -> LanguageEntry {
        let base = file_name.rsplit('/').next().unwrap_or(file_name);
        let lang = strip_json_extension(base).to_string();

        LanguageEntry {
            name: self.language_names.display_name_or_code(&lang),
            lang,
            path: file_name.to_string(),
        }
    }

    pub fn write_manifest(&self, manifest: &ModuleManifest, out_dir: &Path) -> Result<PathBuf> {
        let manifest_path = out_dir.join(MANIFEST_FILE);

        fs::create_dir_all(out_dir)
            .with_context(|| format!("Failed to create output directory: {}", out_dir.display()))?;

        let mut manifest_json = serde_json::to_string_pretty(manifest)
            .context("Failed to serialize manifest to JSON")?;
        manifest_json.push('\n');

        fs::write(&manifest_path, manifest_json)
            .with_context(|| format!("Failed to write manifest to {}", manifest_path.display()))?;

        tracing::info!(path = %manifest_path.display(), "generated manifest");

        Ok(manifest_path)
    }

    pub fn read_manifest(&self, manifest_path: &Path) -> Result<ModuleManifest> {
        let manifest_content = fs::read_to_string(manifest_path)
            .with_context(|| format!("Failed to read manifest from {}", manifest_path.display()))?;

        let manifest: ModuleManifest = serde_json::from_str(&manifest_content)
            .with_context(|| format!("Failed to parse manifest JSON from {}", manifest_path.display()))?;

        Ok(manifest)
    }

    /// Checks that every file the manifest points into the output directory
    /// actually exists there.
    pub fn validate_manifest(&self, manifest: &ModuleManifest, out_dir: &Path) -> Result<()> {
        let referenced = manifest
            .esmodules
            .iter()
            .chain(manifest.languages.iter().map(|l| &l.path));

        for path in referenced {
            if !out_dir.join(path).exists() {
                return Err(anyhow::anyhow!(
                    "Manifest references missing file: {}",
                    out_dir.join(path).display()
                ));
            }
        }

        for pack in &manifest.packs {
            if !out_dir.join(&pack.path).exists() {
                tracing::warn!(pack = %pack.name, path = %pack.path, "compendium pack was not built");
            }
        }

        Ok(())
    }
}

impl Default for ManifestGenerator {
    fn default() -> Self {
        Self::new()
    }
}

fn strip_json_extension(name: &str) -> &str {
    match name.len().checked_sub(5) {
        Some(split) if name.is_char_boundary(split) && name[split..].eq_ignore_ascii_case(".json") => {
            &name[..split]
        }
        _ => name,
    }
}

/// Every file under `out_dir` as a sorted list of `/`-separated relative names,
/// skipping the manifest itself.
pub fn manifest_files(out_dir: &Path) -> Result<Vec<String>> {
    let mut files = Vec::new();

    for entry in WalkDir::new(out_dir).min_depth(1).sort_by_file_name() {
        let entry = entry.with_context(|| format!("Failed to scan {}", out_dir.display()))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let name = relative_name(out_dir, entry.path())?;
        if name != MANIFEST_FILE {
            files.push(name);
        }
    }

    files.sort();
    Ok(files)
}

/// `/`-separated path of `path` relative to `base`.
pub fn relative_name(base: &Path, path: &Path) -> Result<String> {
    let relative = path
        .strip_prefix(base)
        .with_context(|| format!("{} is outside {}", path.display(), base.display()))?;

    Ok(relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn package() -> PackageJson {
        PackageJson {
            name: "ponyfinder-tribes".to_string(),
            title: Some("Ponyfinder Tribes".to_string()),
            description: Some("Tribes of Everglow".to_string()),
            version: Some("1.0.0".to_string()),
            authors: Some(serde_json::json!([{ "name": "GM" }])),
            author: None,
            homepage: Some("https://github.com/example/ponyfinder-tribes".to_string()),
        }
    }

    fn emitted() -> Vec<String> {
        [
            "assets/icon.png",
            "lang/en.json",
            "lang/pt-BR.JSON",
            "lang/readme.txt",
            "scripts/main.js",
            "scripts/main.js.map",
            "styles/module.css",
            "vendor/lib.js",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect()
    }

    #[test]
    fn test_manifest_generation() {
        let generator = ManifestGenerator::new();
        let manifest = generator.generate_manifest(&package(), &BundleConfig::default(), &emitted());

        assert_eq!(manifest.id, "ponyfinder-tribes");
        assert_eq!(manifest.esmodules, vec!["scripts/main.js".to_string()]);
        assert_eq!(
            manifest.languages,
            vec![LanguageEntry {
                lang: "en".to_string(),
                name: "English".to_string(),
                path: "lang/en.json".to_string(),
            }]
        );
        assert!(manifest.protected);
        assert_eq!(
            manifest.download.as_deref(),
            Some("https://github.com/example/ponyfinder-tribes/releases/download/latest/module.zip")
        );
        assert_eq!(
            manifest.manifest.as_deref(),
            Some("https://github.com/example/ponyfinder-tribes/releases/download/latest/module.json")
        );
    }

    #[test]
    fn test_language_code_strips_extension_case_insensitively() {
        let generator = ManifestGenerator::new();
        let entry = generator.language_entry("lang/nested/pt-BR.JSON");
        assert_eq!(entry.lang, "pt-BR");
        assert_eq!(entry.name, "Brazilian Portuguese");
        assert_eq!(entry.path, "lang/nested/pt-BR.JSON");
    }

    #[test]
    fn test_config_sections_flow_into_manifest() {
        let config = BundleConfig::parse(
            r#"
minimum_core_version = "9"
systems = ["pf2e"]

[compatibility]
minimum = "13"
verified = "13.351"
maximum = "13"

[[relationships.systems]]
id = "pf2e"
type = "system"

[[packs]]
name = "tribes-actions"
label = "Actions"
path = "packs/actions.db"
type = "Item"
system = "pf2e"

[flags.ponyfinder-tribes]
enabled = true
"#,
        )
        .unwrap();

        let manifest = ManifestGenerator::new().generate_manifest(&package(), &config, &[]);
        let json = serde_json::to_value(&manifest).unwrap();

        assert_eq!(json["compatibility"]["maximum"], "13");
        assert_eq!(json["minimumCoreVersion"], "9");
        assert_eq!(json["system"][0], "pf2e");
        assert_eq!(json["relationships"]["systems"][0]["type"], "system");
        assert_eq!(json["packs"][0]["type"], "Item");
        assert_eq!(json["flags"]["ponyfinder-tribes"]["enabled"], true);
        assert!(json.get("author").is_none());
    }

    #[test]
    fn test_optional_fields_are_omitted() {
        let package = PackageJson {
            name: "bare".to_string(),
            ..Default::default()
        };
        let config = BundleConfig {
            protected: false,
            ..Default::default()
        };
        let manifest = ManifestGenerator::new().generate_manifest(&package, &config, &[]);
        let json = serde_json::to_value(&manifest).unwrap();
        let keys: Vec<&str> = json.as_object().unwrap().keys().map(String::as_str).collect();

        assert_eq!(keys, vec!["id", "esmodules", "languages", "packs"]);
    }

    #[test]
    fn test_write_and_read_manifest() {
        let dir = TempDir::new().unwrap();
        let generator = ManifestGenerator::new();
        let manifest = generator.generate_manifest(&package(), &BundleConfig::default(), &emitted());

        let path = generator.write_manifest(&manifest, dir.path()).unwrap();
        assert_eq!(path, dir.path().join("module.json"));
        assert!(fs::read_to_string(&path).unwrap().ends_with("}\n"));
        assert_eq!(generator.read_manifest(&path).unwrap(), manifest);
    }

    #[test]
    fn test_validate_manifest_reports_missing_script() {
        let dir = TempDir::new().unwrap();
        let generator = ManifestGenerator::new();
        let files = vec!["scripts/main.js".to_string()];
        let manifest = generator.generate_manifest(&package(), &BundleConfig::default(), &files);

        assert!(generator.validate_manifest(&manifest, dir.path()).is_err());

        fs::create_dir_all(dir.path().join("scripts")).unwrap();
        fs::write(dir.path().join("scripts/main.js"), "").unwrap();
        assert!(generator.validate_manifest(&manifest, dir.path()).is_ok());
    }

    #[test]
    fn test_manifest_files_lists_relative_names() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("lang")).unwrap();
        fs::write(dir.path().join("lang/en.json"), "{}").unwrap();
        fs::write(dir.path().join("module.json"), "{}").unwrap();
        fs::create_dir_all(dir.path().join("scripts")).unwrap();
        fs::write(dir.path().join("scripts/main.js"), "").unwrap();

        assert_eq!(
            manifest_files(dir.path()).unwrap(),
            vec!["lang/en.json".to_string(), "scripts/main.js".to_string()]
        );
    }
}
