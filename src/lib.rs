pub mod archive;
pub mod assets;
pub mod bundle;
pub mod cli;
pub mod compendium;
pub mod config;
pub mod deploy;
pub mod error;
pub mod languages;
pub mod logging;
pub mod manifest;
pub mod modules_dir;
pub mod optimize;
pub mod scripts;

pub use error::DeployError;
pub use manifest::ModuleManifest;
