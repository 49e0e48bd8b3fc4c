use anyhow::{Context, Result};
use std::fs::{self, File};
use std::io;
use std::path::Path;
use walkdir::WalkDir;
use zip::CompressionMethod;
use zip::write::{SimpleFileOptions, ZipWriter};

use crate::manifest::relative_name;

pub const ARCHIVE_FILE: &str = "module.zip";

/// Zips everything under `source_dir` into `archive_path`, leaving the
/// archive itself out. Returns the number of files stored.
pub fn archive_dir(source_dir: &Path, archive_path: &Path) -> Result<usize> {
    if archive_path.exists() {
        fs::remove_file(archive_path)
            .with_context(|| format!("Failed to remove old archive {}", archive_path.display()))?;
    }

    let file = File::create(archive_path)
        .with_context(|| format!("Failed to create archive {}", archive_path.display()))?;
    let mut zip = ZipWriter::new(file);
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    let mut stored = 0;
    for entry in WalkDir::new(source_dir).min_depth(1).sort_by_file_name() {
        let entry = entry.with_context(|| format!("Failed to scan {}", source_dir.display()))?;
        if entry.path() == archive_path {
            continue;
        }

        let name = relative_name(source_dir, entry.path())?;
        if entry.file_type().is_dir() {
            zip.add_directory(name, options)?;
        } else {
            zip.start_file(name, options)?;
            let mut source = File::open(entry.path())
                .with_context(|| format!("Failed to open {}", entry.path().display()))?;
            io::copy(&mut source, &mut zip)?;
            stored += 1;
        }
    }

    zip.finish().context("Failed to finalize archive")?;
    tracing::info!(path = %archive_path.display(), files = stored, "wrote archive");

    Ok(stored)
}
