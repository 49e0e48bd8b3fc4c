use anyhow::{Context, Result, anyhow};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use walkdir::WalkDir;

use crate::manifest::relative_name;

pub const SCRIPTS_DIR: &str = "scripts";
pub const ESBUILD: &str = "esbuild";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptKind {
    JavaScript,
    TypeScript,
}

impl ScriptKind {
    pub fn from_path(path: &Path) -> Option<Self> {
        let name = path.file_name()?.to_str()?;
        if name.ends_with(".d.ts") {
            return None;
        }
        match path.extension()?.to_str()? {
            "js" | "mjs" => Some(ScriptKind::JavaScript),
            "ts" | "mts" => Some(ScriptKind::TypeScript),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ScriptSource {
    pub path: PathBuf,
    pub kind: ScriptKind,
}

/// Produces `scripts/**/*.js` in the output directory. Plain JavaScript is
/// copied; TypeScript goes through esbuild as ES modules.
pub struct ScriptCompiler {
    scripts_dir: PathBuf,
    out_dir: PathBuf,
    minify: bool,
}

impl ScriptCompiler {
    pub fn new(source_dir: impl AsRef<Path>, out_dir: impl AsRef<Path>) -> Self {
        Self {
            scripts_dir: source_dir.as_ref().join(SCRIPTS_DIR),
            out_dir: out_dir.as_ref().join(SCRIPTS_DIR),
            minify: true,
        }
    }

    pub fn minify(mut self, minify: bool) -> Self {
        self.minify = minify;
        self
    }

    pub fn discover_sources(&self) -> Result<Vec<ScriptSource>> {
        if !self.scripts_dir.is_dir() {
            return Ok(Vec::new());
        }

        let mut sources = Vec::new();
        for entry in WalkDir::new(&self.scripts_dir).sort_by_file_name() {
            let entry = entry.with_context(|| format!("Failed to scan {}", self.scripts_dir.display()))?;
            if !entry.file_type().is_file() {
                continue;
            }
            if let Some(kind) = ScriptKind::from_path(entry.path()) {
                sources.push(ScriptSource {
                    path: entry.into_path(),
                    kind,
                });
            }
        }
        Ok(sources)
    }

    /// Returns emitted names relative to the output root (`scripts/...`).
    pub fn compile(&self) -> Result<Vec<String>> {
        let sources = self.discover_sources()?;
        let mut emitted = Vec::new();
        let mut typescript = Vec::new();

        for source in &sources {
            match source.kind {
                ScriptKind::JavaScript => {
                    let relative = relative_name(&self.scripts_dir, &source.path)?;
                    let relative = match relative.strip_suffix(".mjs") {
                        Some(stem) => format!("{}.js", stem),
                        None => relative,
                    };
                    let target = self.out_dir.join(&relative);
                    if let Some(parent) = target.parent() {
                        fs::create_dir_all(parent)
                            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
                    }
                    fs::copy(&source.path, &target).with_context(|| {
                        format!("Failed to copy {} to {}", source.path.display(), target.display())
                    })?;
                    emitted.push(format!("{}/{}", SCRIPTS_DIR, relative));
                }
                ScriptKind::TypeScript => typescript.push(source.path.clone()),
            }
        }

        if !typescript.is_empty() {
            self.run_esbuild(&typescript)?;
            for path in &typescript {
                emitted.push(format!("{}/{}", SCRIPTS_DIR, compiled_name(&self.scripts_dir, path)?));
            }
        }

        emitted.sort();
        tracing::info!(count = emitted.len(), "emitted scripts");
        Ok(emitted)
    }

    fn run_esbuild(&self, entry_points: &[PathBuf]) -> Result<()> {
        let esbuild = which::which(ESBUILD).map_err(|_| {
            anyhow!(
                "TypeScript sources found but {} is not in PATH. Install it with: npm install -g esbuild",
                ESBUILD
            )
        })?;

        let mut cmd = Command::new(esbuild);
        cmd.args(entry_points);
        cmd.arg("--bundle");
        cmd.arg("--format=esm");
        cmd.arg(format!("--outbase={}", self.scripts_dir.display()));
        cmd.arg(format!("--outdir={}", self.out_dir.display()));

        if self.minify {
            cmd.arg("--minify");
        }

        tracing::debug!(command = ?cmd, "running esbuild");
        let output = cmd.output().context("Failed to execute esbuild")?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(anyhow!("esbuild failed: {}", stderr));
        }

        Ok(())
    }
}

/// `scripts/sheet/main.ts` -> `sheet/main.js`
fn compiled_name(scripts_dir: &Path, path: &Path) -> Result<String> {
    let relative = relative_name(scripts_dir, &path.with_extension("js"))?;
    Ok(relative)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_script_kind_detection() {
        assert_eq!(ScriptKind::from_path(Path::new("main.js")), Some(ScriptKind::JavaScript));
        assert_eq!(ScriptKind::from_path(Path::new("main.mjs")), Some(ScriptKind::JavaScript));
        assert_eq!(ScriptKind::from_path(Path::new("main.ts")), Some(ScriptKind::TypeScript));
        assert_eq!(ScriptKind::from_path(Path::new("types.d.ts")), None);
        assert_eq!(ScriptKind::from_path(Path::new("style.css")), None);
    }

    #[test]
    fn test_javascript_is_copied() {
        let src = TempDir::new().unwrap();
        let dist = TempDir::new().unwrap();
        fs::create_dir_all(src.path().join("scripts/hooks")).unwrap();
        fs::write(src.path().join("scripts/main.js"), "export const a = 1;").unwrap();
        fs::write(src.path().join("scripts/hooks/ready.mjs"), "export {};").unwrap();
        fs::write(src.path().join("scripts/globals.d.ts"), "declare const game: any;").unwrap();

        let emitted = ScriptCompiler::new(src.path(), dist.path()).compile().unwrap();

        assert_eq!(
            emitted,
            vec!["scripts/hooks/ready.js".to_string(), "scripts/main.js".to_string()]
        );
        assert_eq!(
            fs::read_to_string(dist.path().join("scripts/main.js")).unwrap(),
            "export const a = 1;"
        );
        assert!(dist.path().join("scripts/hooks/ready.js").is_file());
    }

    #[test]
    fn test_missing_scripts_dir() {
        let src = TempDir::new().unwrap();
        let dist = TempDir::new().unwrap();
        assert!(ScriptCompiler::new(src.path(), dist.path()).compile().unwrap().is_empty());
    }

    #[test]
    fn test_compiled_name() {
        assert_eq!(
            compiled_name(Path::new("src/scripts"), Path::new("src/scripts/sheet/main.ts")).unwrap(),
            "sheet/main.js"
        );
    }
}
