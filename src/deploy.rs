//! Copying a finished build into a local Foundry installation.

use serde_json::Value;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::error::DeployError;
use crate::modules_dir::{FoundryEnv, resolve_modules_dir};

pub const MANIFEST_FILE: &str = "module.json";
pub const SIGNATURE_FILE: &str = "signature.json";

#[derive(Debug, Clone)]
pub struct DeployReport {
    pub module_id: String,
    pub source: PathBuf,
    pub destination: PathBuf,
}

/// Prefers `dist/` over the project root.
pub fn resolve_build_dir(project_root: &Path) -> Result<PathBuf, DeployError> {
    let dist_dir = project_root.join("dist");
    if dist_dir.join(MANIFEST_FILE).exists() {
        return Ok(dist_dir);
    }
    if project_root.join(MANIFEST_FILE).exists() {
        return Ok(project_root.to_path_buf());
    }
    Err(DeployError::ManifestNotFound {
        root: project_root.to_path_buf(),
    })
}

pub fn deploy(project_root: &Path, env: &FoundryEnv) -> Result<DeployReport, DeployError> {
    let build_dir = resolve_build_dir(project_root)?;
    let manifest_path = build_dir.join(MANIFEST_FILE);
    let manifest = read_json(&manifest_path)?;

    let module_id = match manifest.get("id") {
        Some(Value::String(id)) if !id.is_empty() => id.clone(),
        _ => return Err(DeployError::InvalidModuleId { path: manifest_path }),
    };

    let modules_dir = resolve_modules_dir(env)?;
    let destination = modules_dir.join(&module_id);
    tracing::info!(
        module = %module_id,
        source = %build_dir.display(),
        destination = %destination.display(),
        "deploying module"
    );

    fs::create_dir_all(&modules_dir)?;
    remove_destination(&destination)?;
    copy_tree(&build_dir, &destination)?;

    strip_protected_flag(&destination.join(MANIFEST_FILE))?;
    let removed = remove_signatures(&destination)?;
    if removed > 0 {
        tracing::debug!(count = removed, "removed signature files");
    }

    Ok(DeployReport {
        module_id,
        source: build_dir,
        destination,
    })
}

/// Force-removes a previous deployment. Missing is fine; locked is reported
/// as `DestinationLocked`.
fn remove_destination(destination: &Path) -> Result<(), DeployError> {
    let result = if destination.is_dir() {
        fs::remove_dir_all(destination)
    } else {
        fs::remove_file(destination)
    };

    classify_removal(result, destination)
}

fn classify_removal(result: io::Result<()>, destination: &Path) -> Result<(), DeployError> {
    match result {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) if is_locked(&e) => Err(DeployError::DestinationLocked {
            path: destination.to_path_buf(),
            source: e,
        }),
        Err(e) => Err(e.into()),
    }
}

/// Whether an I/O error means another process holds the files open.
pub fn is_locked(error: &io::Error) -> bool {
    if matches!(
        error.kind(),
        io::ErrorKind::ResourceBusy | io::ErrorKind::PermissionDenied
    ) {
        return true;
    }

    // ERROR_SHARING_VIOLATION, ERROR_LOCK_VIOLATION
    #[cfg(windows)]
    if matches!(error.raw_os_error(), Some(32) | Some(33)) {
        return true;
    }

    false
}

/// Recursively copies `source` into `destination`, skipping `destination`
/// itself when it lives inside `source`. Both sides are canonicalized so a
/// relative source still recognizes an absolute destination.
pub fn copy_tree(source: &Path, destination: &Path) -> io::Result<u64> {
    fs::create_dir_all(destination)?;
    let source = fs::canonicalize(source)?;
    let destination = fs::canonicalize(destination)?;
    let mut copied = 0;

    let walker = WalkDir::new(&source)
        .min_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| entry.path() != destination);

    for entry in walker {
        let entry = entry?;
        let relative = entry
            .path()
            .strip_prefix(&source)
            .map_err(|e| io::Error::other(e.to_string()))?;
        let target = destination.join(relative);

        if entry.file_type().is_dir() {
            fs::create_dir_all(&target)?;
        } else {
            fs::copy(entry.path(), &target)?;
            copied += 1;
        }
    }

    Ok(copied)
}

/// Drops a truthy `protected` key from a deployed manifest so the local copy
/// is not treated as premium content. Returns whether the file was rewritten.
pub fn strip_protected_flag(manifest_path: &Path) -> Result<bool, DeployError> {
    if !manifest_path.exists() {
        return Ok(false);
    }

    let mut manifest = read_json(manifest_path)?;
    let Some(object) = manifest.as_object_mut() else {
        return Ok(false);
    };
    if !object.get("protected").is_some_and(is_truthy) {
        return Ok(false);
    }

    object.shift_remove("protected");
    let mut contents = serde_json::to_string_pretty(&manifest).map_err(|source| DeployError::Json {
        path: manifest_path.to_path_buf(),
        source,
    })?;
    contents.push('\n');
    fs::write(manifest_path, contents)?;

    tracing::debug!(path = %manifest_path.display(), "stripped protected flag");
    Ok(true)
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|n| n != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Deletes every `signature.json` under `root`, returning how many were removed.
pub fn remove_signatures(root: &Path) -> io::Result<usize> {
    let mut signatures = Vec::new();
    for entry in WalkDir::new(root) {
        let entry = entry?;
        if entry.file_type().is_file() && entry.file_name() == SIGNATURE_FILE {
            signatures.push(entry.into_path());
        }
    }

    for path in &signatures {
        fs::remove_file(path)?;
    }
    Ok(signatures.len())
}

fn read_json(path: &Path) -> Result<Value, DeployError> {
    let contents = fs::read_to_string(path)?;
    serde_json::from_str(&contents).map_err(|source| DeployError::Json {
        path: path.to_path_buf(),
        source,
    })
}
