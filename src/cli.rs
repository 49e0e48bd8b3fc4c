use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

use crate::bundle::BundleBuilder;
use crate::config::{BundleConfig, PackageJson};
use crate::deploy::{MANIFEST_FILE, deploy, resolve_build_dir};
use crate::logging::init_logging;
use crate::manifest::{ManifestGenerator, manifest_files};
use crate::modules_dir::{
    APP_DATA_VAR, DATA_PATH_VAR, FoundryEnv, LOCAL_APP_DATA_VAR, MODULES_PATH_VAR,
    resolve_modules_dir,
};
use crate::scripts::ESBUILD;

#[derive(Parser)]
#[command(name = "foundry-bundle")]
#[command(about = "Build and deploy Foundry VTT content modules")]
#[command(version)]
pub struct Cli {
    /// Project root containing package.json
    #[arg(long, global = true, default_value = ".")]
    pub project_dir: PathBuf,

    /// Show debug output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Only show errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Build scripts, assets, manifest, compendium packs and module.zip
    Build {
        /// Copy images without optimizing them
        #[arg(long)]
        no_optimize: bool,

        /// Pass scripts to esbuild without --minify
        #[arg(long)]
        no_minify: bool,

        /// Skip writing module.zip
        #[arg(long)]
        no_archive: bool,
    },

    /// Regenerate module.json from the files already in the output directory
    Manifest,

    /// Copy the build output into the local Foundry modules directory
    Deploy,

    /// Show where deploy would go and check external tools
    Doctor,
}

pub fn run_cli() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);

    match cli.command {
        Commands::Build {
            no_optimize,
            no_minify,
            no_archive,
        } => build_command(&cli.project_dir, !no_optimize, !no_minify, !no_archive),
        Commands::Manifest => manifest_command(&cli.project_dir),
        Commands::Deploy => deploy_command(&cli.project_dir),
        Commands::Doctor => doctor_command(&cli.project_dir),
    }
}

fn build_command(project_dir: &Path, optimize: bool, minify: bool, archive: bool) -> Result<()> {
    let report = BundleBuilder::new(project_dir)
        .optimize_images(optimize)
        .minify_scripts(minify)
        .archive(archive)
        .build()
        .context("Build failed")?;

    println!("Built {}", report.manifest.id);
    println!("  Files: {}", report.emitted.len());
    println!("  Packs: {}", report.packs.len());
    println!("  Manifest: {}", report.manifest_path.display());
    if let Some(archive) = &report.archive {
        println!("  Archive: {}", archive.display());
    }

    Ok(())
}

fn manifest_command(project_dir: &Path) -> Result<()> {
    let package = PackageJson::load(project_dir)?;
    let config = BundleConfig::load(project_dir)?;
    let out_dir = config.resolve_out_dir(project_dir)?;

    let files = manifest_files(&out_dir)?;
    let generator = ManifestGenerator::new();
    let manifest = generator.generate_manifest(&package, &config, &files);
    let manifest_path = generator.write_manifest(&manifest, &out_dir)?;
    generator.validate_manifest(&manifest, &out_dir)?;

    println!("{}", manifest_path.display());
    Ok(())
}

fn deploy_command(project_dir: &Path) -> Result<()> {
    let env = FoundryEnv::from_process_env();
    let report = deploy(project_dir, &env)?;

    println!("Deployed {}", report.module_id);
    println!("Source: {}", report.source.display());
    println!("Destination: {}", report.destination.display());

    Ok(())
}

fn doctor_command(project_dir: &Path) -> Result<()> {
    println!("foundry-bundle doctor\n");

    let env = FoundryEnv::from_process_env();
    for (name, value) in [
        (MODULES_PATH_VAR, &env.modules_path),
        (DATA_PATH_VAR, &env.data_path),
        (LOCAL_APP_DATA_VAR, &env.local_app_data),
        (APP_DATA_VAR, &env.app_data),
    ] {
        match value {
            Some(path) => println!("  {} = {}", name, path.display()),
            None => println!("  {} is not set", name),
        }
    }

    match resolve_modules_dir(&env) {
        Ok(modules_dir) => {
            let marker = if modules_dir.is_dir() { "✓" } else { "✗ (will be created)" };
            println!("\n{} Modules directory: {}", marker, modules_dir.display());
        }
        Err(e) => println!("\n✗ {}", e),
    }

    match resolve_build_dir(project_dir) {
        Ok(build_dir) => println!("✓ Build output: {}", build_dir.join(MANIFEST_FILE).display()),
        Err(e) => println!("✗ {}", e),
    }

    match which::which(ESBUILD) {
        Ok(path) => println!("✓ esbuild found at: {}", path.display()),
        Err(_) => {
            println!("✗ esbuild not found (only needed for TypeScript sources)");
            println!("  Install with: npm install -g esbuild");
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_deploy_takes_no_arguments() {
        assert!(Cli::try_parse_from(["foundry-bundle", "deploy"]).is_ok());
        assert!(Cli::try_parse_from(["foundry-bundle", "deploy", "somewhere"]).is_err());
    }

    #[test]
    fn test_global_flags() {
        let cli = Cli::try_parse_from(["foundry-bundle", "build", "--no-archive", "-v", "--project-dir", "mod"])
            .unwrap();
        assert!(cli.verbose);
        assert_eq!(cli.project_dir, PathBuf::from("mod"));
        assert!(matches!(cli.command, Commands::Build { no_archive: true, .. }));
    }
}
