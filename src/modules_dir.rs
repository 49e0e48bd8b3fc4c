//! Locating the Foundry VTT `modules` directory on this machine.
//!
//! The lookup is driven by environment variables only. `FoundryEnv` captures
//! them up front so resolution can be exercised without touching the process
//! environment.

use std::path::{Component, Path, PathBuf};

use crate::error::DeployError;

pub const MODULES_PATH_VAR: &str = "FOUNDRY_MODULES_PATH";
pub const DATA_PATH_VAR: &str = "FOUNDRY_DATA_PATH";
pub const LOCAL_APP_DATA_VAR: &str = "LOCALAPPDATA";
pub const APP_DATA_VAR: &str = "APPDATA";

const INSTALL_DIR_NAMES: [&str; 2] = ["FoundryVTT", "Foundry Virtual Tabletop"];

#[derive(Debug, Clone, Default)]
pub struct FoundryEnv {
    pub modules_path: Option<PathBuf>,
    pub data_path: Option<PathBuf>,
    pub local_app_data: Option<PathBuf>,
    pub app_data: Option<PathBuf>,
}

impl FoundryEnv {
    pub fn from_process_env() -> Self {
        Self {
            modules_path: env_path(MODULES_PATH_VAR),
            data_path: env_path(DATA_PATH_VAR),
            local_app_data: env_path(LOCAL_APP_DATA_VAR),
            app_data: env_path(APP_DATA_VAR),
        }
    }

    /// Every `<appdata>/<install>/Data/modules` location worth probing, in
    /// lookup order.
    pub fn candidates(&self) -> Vec<PathBuf> {
        let mut candidates = Vec::new();
        for install in INSTALL_DIR_NAMES {
            for base in [&self.local_app_data, &self.app_data].into_iter().flatten() {
                candidates.push(base.join(install).join("Data").join("modules"));
            }
        }
        candidates
    }
}

fn env_path(name: &str) -> Option<PathBuf> {
    std::env::var_os(name)
        .filter(|value| !value.is_empty())
        .map(PathBuf::from)
}

pub fn resolve_modules_dir(env: &FoundryEnv) -> Result<PathBuf, DeployError> {
    if let Some(modules_path) = &env.modules_path {
        tracing::debug!(path = %modules_path.display(), "using {}", MODULES_PATH_VAR);
        return Ok(modules_path.clone());
    }

    if let Some(data_path) = &env.data_path {
        return Ok(modules_dir_from_data_path(data_path));
    }

    let candidates = env.candidates();
    if let Some(existing) = candidates.iter().find(|candidate| candidate.exists()) {
        tracing::debug!(path = %existing.display(), "found existing Foundry install");
        return Ok(existing.clone());
    }

    // Nothing installed yet; fall back to the default install location.
    [&env.local_app_data, &env.app_data]
        .into_iter()
        .flatten()
        .next()
        .map(|base| base.join(INSTALL_DIR_NAMES[0]).join("Data").join("modules"))
        .ok_or(DeployError::ModulesPathUnresolved)
}

/// `FOUNDRY_DATA_PATH` may point at the user-data root, at `Data`, or directly
/// at `Data/modules`.
pub fn modules_dir_from_data_path(data_path: &Path) -> PathBuf {
    let normalized = normalize_path(data_path);
    let base_name = normalized
        .file_name()
        .map(|name| name.to_string_lossy().to_lowercase());

    match base_name.as_deref() {
        Some("modules") => normalized,
        Some("data") => normalized.join("modules"),
        _ => normalized.join("Data").join("modules"),
    }
}

/// Lexical normalization: drops `.` and trailing separators and folds `..`
/// into the preceding component. Never touches the filesystem.
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();

    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match normalized.components().next_back() {
                Some(Component::Normal(_)) => {
                    normalized.pop();
                }
                Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
                _ => normalized.push(".."),
            },
            other => normalized.push(other.as_os_str()),
        }
    }

    if normalized.as_os_str().is_empty() {
        normalized.push(".");
    }
    normalized
}
