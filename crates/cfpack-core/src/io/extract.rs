//! Archive extraction module
//!
//! Unpacks upstream zip and tar.gz archives into a platform directory and
//! makes sure the executable ends up under its canonical name. Windows
//! archives already carry `cf.exe`; Unix tarballs ship a version-suffixed
//! binary (`cf7`, `cf8`) that is renamed to `cf`.

use std::fs::{self, File};
use std::io::{self, BufReader, Read};
use std::path::{Component, Path, PathBuf};

use cfpack_schema::{ArchiveFormat, PlatformDescriptor};
use regex::Regex;
use tracing::{debug, info};
use zip::ZipArchive;

use crate::PipelineError;

/// Extract `archive` for `platform` into `dest_dir` and return the path of
/// the canonically named binary.
///
/// # Errors
///
/// Returns [`PipelineError::BinaryNotFound`] when neither the canonical name
/// nor a version-suffixed variant exists after extraction,
/// [`PipelineError::AmbiguousBinary`] when several suffixed variants exist,
/// and [`PipelineError::Archive`] / [`PipelineError::Io`] for unreadable
/// archives.
pub fn extract(
    archive: &Path,
    platform: &PlatformDescriptor,
    dest_dir: &Path,
) -> Result<PathBuf, PipelineError> {
    let files = match platform.archive_format {
        ArchiveFormat::Zip => extract_zip(archive, dest_dir)?,
        ArchiveFormat::TarGz => extract_tar_gz(archive, dest_dir)?,
    };
    debug!(
        platform = platform.platform_id,
        files,
        "extracted archive"
    );

    match platform.archive_format {
        ArchiveFormat::Zip => locate_binary(dest_dir, platform),
        ArchiveFormat::TarGz => normalize_binary(dest_dir, platform),
    }
}

/// Extract a tar.gz archive to a destination directory and return the
/// number of files written.
///
/// # Errors
///
/// Fails on IO errors, on entries that would escape `dest_dir`, and on
/// symbolic or hard links.
pub fn extract_tar_gz(archive_path: &Path, dest_dir: &Path) -> Result<usize, PipelineError> {
    let file = File::open(archive_path)?;
    let reader = BufReader::new(file);
    let gz_decoder = flate2::read::GzDecoder::new(reader);

    extract_tar(gz_decoder, dest_dir)
}

/// Extract a tar archive from a reader
fn extract_tar<R: Read>(reader: R, dest_dir: &Path) -> Result<usize, PipelineError> {
    fs::create_dir_all(dest_dir)?;

    let mut archive = tar::Archive::new(reader);
    let mut count = 0;

    for entry in archive.entries()? {
        let mut entry = entry?;

        // Skip directories
        if entry.header().entry_type().is_dir() {
            continue;
        }

        let relative_path: PathBuf = entry.path()?.components().collect();

        let entry_type = entry.header().entry_type();
        if entry_type.is_symlink() || entry_type.is_hard_link() {
            return Err(PipelineError::Archive(format!(
                "Link entries are not allowed: {}",
                relative_path.display()
            )));
        }

        // Reject absolute paths and `..` so nothing lands outside dest_dir
        if relative_path
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir))
        {
            return Err(PipelineError::Archive(format!(
                "Invalid path in archive: {}",
                relative_path.display()
            )));
        }

        let absolute_path = dest_dir.join(&relative_path);
        if let Some(parent) = absolute_path.parent() {
            fs::create_dir_all(parent)?;
        }

        entry.unpack(&absolute_path)?;
        count += 1;
    }

    Ok(count)
}

/// Extract a zip archive and return the number of files written
///
/// # Errors
///
/// Fails on IO errors and malformed archives. Entries with unsafe paths are
/// skipped.
pub fn extract_zip(archive_path: &Path, dest_dir: &Path) -> Result<usize, PipelineError> {
    let file = File::open(archive_path)?;
    let mut archive = ZipArchive::new(file)?;

    fs::create_dir_all(dest_dir)?;
    let mut count = 0;

    for i in 0..archive.len() {
        let mut file = archive.by_index(i)?;
        let Some(relative_path) = file.enclosed_name() else {
            continue;
        };

        if file.is_dir() {
            fs::create_dir_all(dest_dir.join(&relative_path))?;
            continue;
        }

        let absolute_path = dest_dir.join(&relative_path);
        if let Some(p) = absolute_path.parent() {
            fs::create_dir_all(p)?;
        }

        let mut outfile = File::create(&absolute_path)?;
        io::copy(&mut file, &mut outfile)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            if let Some(mode) = file.unix_mode() {
                fs::set_permissions(&absolute_path, fs::Permissions::from_mode(mode))?;
            }
        }

        count += 1;
    }

    Ok(count)
}

/// Return the canonical binary path if it exists.
///
/// # Errors
///
/// Returns [`PipelineError::BinaryNotFound`] if it does not.
pub fn locate_binary(dir: &Path, platform: &PlatformDescriptor) -> Result<PathBuf, PipelineError> {
    let canonical = dir.join(platform.binary_name);
    if canonical.is_file() {
        Ok(canonical)
    } else {
        Err(binary_not_found(dir, platform))
    }
}

/// Give the extracted binary its canonical name.
///
/// If `dir` already holds the canonical name nothing changes. Otherwise the
/// single top-level file matching `<stem><digits><ext>` is renamed.
///
/// # Errors
///
/// Returns [`PipelineError::BinaryNotFound`] for zero candidates and
/// [`PipelineError::AmbiguousBinary`] for more than one.
pub fn normalize_binary(
    dir: &Path,
    platform: &PlatformDescriptor,
) -> Result<PathBuf, PipelineError> {
    let canonical = dir.join(platform.binary_name);
    if canonical.is_file() {
        return Ok(canonical);
    }

    let pattern = versioned_binary_pattern(platform)?;
    let mut candidates = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        if let Some(name) = entry.file_name().to_str()
            && pattern.is_match(name)
        {
            candidates.push(name.to_string());
        }
    }
    candidates.sort();

    match candidates.as_slice() {
        [] => Err(binary_not_found(dir, platform)),
        [single] => {
            fs::rename(dir.join(single), &canonical)?;
            info!(
                platform = platform.platform_id,
                from = %single,
                to = platform.binary_name,
                "renamed version-suffixed binary"
            );
            Ok(canonical)
        }
        _ => Err(PipelineError::AmbiguousBinary {
            dir: dir.to_path_buf(),
            candidates,
        }),
    }
}

/// `^cf[0-9]+$` for `cf`, `^cf[0-9]+\.exe$` for `cf.exe`.
fn versioned_binary_pattern(platform: &PlatformDescriptor) -> Result<Regex, PipelineError> {
    let stem = platform.binary_stem();
    let ext = &platform.binary_name[stem.len()..];
    let pattern = format!("^{}[0-9]+{}$", regex::escape(stem), regex::escape(ext));
    Regex::new(&pattern).map_err(|e| PipelineError::Archive(e.to_string()))
}

fn binary_not_found(dir: &Path, platform: &PlatformDescriptor) -> PipelineError {
    PipelineError::BinaryNotFound {
        expected: platform.binary_name.to_string(),
        dir: dir.to_path_buf(),
    }
}
