//! The end-to-end build: sources under `src/` become a deployable `dist/`.

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

use crate::archive::{ARCHIVE_FILE, archive_dir};
use crate::assets::AssetCopier;
use crate::compendium::build_packs;
use crate::config::{BundleConfig, PackageJson};
use crate::manifest::{ManifestGenerator, ModuleManifest};
use crate::scripts::ScriptCompiler;

#[derive(Debug, Clone)]
pub struct BundleReport {
    pub manifest: ModuleManifest,
    pub manifest_path: PathBuf,
    pub emitted: Vec<String>,
    pub packs: Vec<PathBuf>,
    pub archive: Option<PathBuf>,
}

pub struct BundleBuilder {
    project_root: PathBuf,
    optimize_images: bool,
    minify_scripts: bool,
    archive: bool,
}

impl BundleBuilder {
    pub fn new(project_root: impl AsRef<Path>) -> Self {
        Self {
            project_root: project_root.as_ref().to_path_buf(),
            optimize_images: true,
            minify_scripts: true,
            archive: true,
        }
    }

    pub fn optimize_images(mut self, optimize: bool) -> Self {
        self.optimize_images = optimize;
        self
    }

    pub fn minify_scripts(mut self, minify: bool) -> Self {
        self.minify_scripts = minify;
        self
    }

    pub fn archive(mut self, archive: bool) -> Self {
        self.archive = archive;
        self
    }

    pub fn build(&self) -> Result<BundleReport> {
        let package = PackageJson::load(&self.project_root)?;
        let config = BundleConfig::load(&self.project_root)?;
        let source_dir = self.project_root.join(&config.source_dir);
        let out_dir = config.resolve_out_dir(&self.project_root)?;

        tracing::info!(module = %package.name, out_dir = %out_dir.display(), "building bundle");
        clean_dir(&out_dir)?;

        let mut emitted = ScriptCompiler::new(&source_dir, &out_dir)
            .minify(self.minify_scripts)
            .compile()
            .context("Failed to build scripts")?;

        let assets = AssetCopier::new(&source_dir, &out_dir).optimize(self.optimize_images);
        emitted.extend(assets.copy_lang().context("Failed to copy localization files")?);
        emitted.extend(assets.copy_images().context("Failed to copy image assets")?);

        let generator = ManifestGenerator::new();
        let manifest = generator.generate_manifest(&package, &config, &emitted);
        let manifest_path = generator.write_manifest(&manifest, &out_dir)?;

        let packs = build_packs(&source_dir.join("packs"), &out_dir.join("packs"))
            .context("Failed to build compendium packs")?;
        generator.validate_manifest(&manifest, &out_dir)?;

        let archive = if self.archive {
            let archive_path = out_dir.join(ARCHIVE_FILE);
            archive_dir(&out_dir, &archive_path).context("Failed to archive build output")?;
            Some(archive_path)
        } else {
            None
        };

        Ok(BundleReport {
            manifest,
            manifest_path,
            emitted,
            packs,
            archive,
        })
    }
}

fn clean_dir(dir: &Path) -> Result<()> {
    if dir.exists() {
        fs::remove_dir_all(dir)
            .with_context(|| format!("Failed to clean output directory: {}", dir.display()))?;
    }
    fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create output directory: {}", dir.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deploy::deploy;
    use crate::modules_dir::FoundryEnv;
    use tempfile::TempDir;

    fn write(path: &Path, contents: &str) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, contents).unwrap();
    }

    fn fixture_project() -> TempDir {
        let project = TempDir::new().unwrap();
        let root = project.path();
        write(
            &root.join("package.json"),
            r#"{
  "name": "ponyfinder-tribes",
  "title": "Ponyfinder Tribes",
  "version": "0.4.0",
  "homepage": "https://github.com/example/ponyfinder-tribes"
}"#,
        );
        write(
            &root.join("bundle.toml"),
            r#"
[[packs]]
name = "ponyfinder-tribes-feats"
label = "Ponyfinder Feats"
path = "packs/ponyfinder-feats.db"
type = "Item"
system = "pf2e"
"#,
        );
        write(&root.join("src/scripts/main.js"), "Hooks.once('init', () => {});");
        write(&root.join("src/lang/en.json"), "{\n  \"PONY.Title\": \"Tribes\"\n}");
        write(&root.join("src/lang/de.json"), "{\n  \"PONY.Title\": \"Stämme\"\n}");
        write(&root.join("src/assets/icon.svg"), "<svg>\n  <circle r=\"4\"/>\n</svg>\n");
        write(
            &root.join("src/packs/ponyfinder-feats/feat.json"),
            r#"{"_id":"f1","name":"Hoof Stomp","type":"feat"}"#,
        );
        project
    }

    #[test]
    fn test_full_build() {
        let project = fixture_project();
        let dist = fs::canonicalize(project.path()).unwrap().join("dist");
        write(&dist.join("stale.txt"), "left over from last build");

        let report = BundleBuilder::new(project.path()).build().unwrap();

        assert!(!dist.join("stale.txt").exists());
        assert_eq!(report.manifest.id, "ponyfinder-tribes");
        assert_eq!(report.manifest.esmodules, vec!["scripts/main.js".to_string()]);
        let langs: Vec<(&str, &str)> = report
            .manifest
            .languages
            .iter()
            .map(|l| (l.lang.as_str(), l.name.as_str()))
            .collect();
        assert_eq!(langs, vec![("de", "German"), ("en", "English")]);

        assert_eq!(report.packs, vec![dist.join("packs/ponyfinder-feats.db")]);
        assert_eq!(report.archive, Some(dist.join("module.zip")));
        assert!(dist.join("assets/icon.svg").is_file());
        assert!(dist.join("module.json").is_file());
    }

    #[test]
    fn test_build_then_deploy() {
        let project = fixture_project();
        let modules = TempDir::new().unwrap();

        BundleBuilder::new(project.path()).archive(false).build().unwrap();
        let env = FoundryEnv {
            modules_path: Some(modules.path().to_path_buf()),
            ..Default::default()
        };
        let report = deploy(project.path(), &env).unwrap();

        let deployed: serde_json::Value = serde_json::from_str(
            &fs::read_to_string(report.destination.join("module.json")).unwrap(),
        )
        .unwrap();
        assert_eq!(deployed["id"], "ponyfinder-tribes");
        assert!(deployed.get("protected").is_none());
        assert!(report.destination.join("packs/ponyfinder-feats.db").is_file());
        assert!(!report.destination.join("module.zip").exists());
    }

    #[test]
    fn test_out_dir_over_project_root_is_refused() {
        let project = fixture_project();
        let root = project.path();
        fs::write(root.join("bundle.toml"), "out_dir = \".\"\n").unwrap();

        let err = BundleBuilder::new(root).archive(false).build().unwrap_err();

        assert!(err.to_string().contains("project root"));
        assert!(root.join("package.json").is_file());
        assert!(root.join("src/lang/en.json").is_file());
    }

    #[test]
    fn test_missing_package_json() {
        let project = TempDir::new().unwrap();
        let err = BundleBuilder::new(project.path()).build().unwrap_err();
        assert!(err.to_string().contains("package.json"));
    }
}
