//! External archive-codec collaborator (spec.md §6). The engine
//! consumes this interface; it does not implement archive formats
//! itself beyond the one concrete `.zip` codec shipped here for the
//! Real provider.

use std::fs::{self, File};
use std::io;

use camino::{Utf8Path, Utf8PathBuf};

use crate::core::fs_provider::ArchiveEntry;
use crate::models::error::InstallError;

pub trait ArchiveCodec {
    fn list_entries(&self, archive_path: &Utf8Path) -> Result<Vec<ArchiveEntry>, InstallError>;
    fn extract(
        &self,
        archive_path: &Utf8Path,
        dest_dir: &Utf8Path,
    ) -> Result<Vec<Utf8PathBuf>, InstallError>;
}

fn is_supported(path: &Utf8Path) -> bool {
    matches!(
        path.extension().map(|e| e.to_ascii_lowercase()).as_deref(),
        Some("zip")
    )
}

/// The one archive format this crate actually decodes. `.7z`/`.rar`
/// are a recognized-but-unimplemented external collaborator surface
/// per spec.md §1/§6 — they report a typed `ArchiveFailure` rather
/// than panicking or silently doing nothing.
pub struct ZipCodec;

impl ArchiveCodec for ZipCodec {
    fn list_entries(&self, archive_path: &Utf8Path) -> Result<Vec<ArchiveEntry>, InstallError> {
        reject_unsupported(archive_path)?;
        let file = File::open(archive_path)?;
        let mut archive = zip::ZipArchive::new(file)?;

        let mut entries = Vec::with_capacity(archive.len());
        for i in 0..archive.len() {
            let entry = archive.by_index(i)?;
            let Some(relative) = entry.enclosed_name() else {
                continue;
            };
            let Some(relative) = Utf8PathBuf::from_path_buf(relative).ok() else {
                continue;
            };
            entries.push(ArchiveEntry {
                relative_path: relative,
                size: entry.size(),
            });
        }
        Ok(entries)
    }

    fn extract(
        &self,
        archive_path: &Utf8Path,
        dest_dir: &Utf8Path,
    ) -> Result<Vec<Utf8PathBuf>, InstallError> {
        reject_unsupported(archive_path)?;
        let file = File::open(archive_path)?;
        let mut archive = zip::ZipArchive::new(file)?;

        let mut materialized = Vec::with_capacity(archive.len());
        for i in 0..archive.len() {
            let mut entry = archive.by_index(i)?;

            // Zip Slip guard: `enclosed_name()` rejects absolute paths
            // and `..` traversal, same as the teacher's Decompression.
            let Some(safe_relative) = entry.enclosed_name() else {
                continue;
            };
            let output_path = dest_dir.as_std_path().join(&safe_relative);

            if entry.is_dir() {
                fs::create_dir_all(&output_path)?;
                continue;
            }

            if let Some(parent) = output_path.parent() {
                fs::create_dir_all(parent)?;
            }
            let mut outfile = File::create(&output_path)?;
            io::copy(&mut entry, &mut outfile)?;

            #[cfg(unix)]
            {
                use std::os::unix::fs::PermissionsExt;
                if let Some(mode) = entry.unix_mode() {
                    let _ = fs::set_permissions(&output_path, fs::Permissions::from_mode(mode));
                }
            }

            if let Ok(utf8) = Utf8PathBuf::from_path_buf(output_path) {
                materialized.push(utf8);
            }
        }
        Ok(materialized)
    }
}

fn reject_unsupported(archive_path: &Utf8Path) -> Result<(), InstallError> {
    if is_supported(archive_path) {
        return Ok(());
    }
    let ext = archive_path.extension().unwrap_or("<none>");
    match ext.to_ascii_lowercase().as_str() {
        "7z" | "rar" => Err(InstallError::ArchiveFailure(format!(
            "{ext} archives require an external codec not bundled with this engine: {archive_path}"
        ))),
        _ => Err(InstallError::ArchiveFailure(format!(
            "unsupported archive format .{ext}: {archive_path}"
        ))),
    }
}
