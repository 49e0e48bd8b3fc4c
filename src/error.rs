use std::path::PathBuf;
use thiserror::Error;

/// Failures a user can fix before rerunning deploy.
///
/// Anything not classified here is passed through untouched in `Io` or `Json`.
#[derive(Error, Debug)]
pub enum DeployError {
    #[error("module.json was not found in dist/ or the repo root ({root}).")]
    ManifestNotFound { root: PathBuf },

    #[error("module.json at {path} is missing a valid id.")]
    InvalidModuleId { path: PathBuf },

    #[error("Cannot replace {path} because files are locked. Close Foundry VTT and rerun deploy.")]
    DestinationLocked {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Could not resolve Foundry modules path. Set FOUNDRY_MODULES_PATH.")]
    ModulesPathUnresolved,

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("failed to parse {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}
