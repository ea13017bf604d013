//! OS-backed `FsProvider`. Grounded on the teacher's
//! `core/decompression.rs` (Zip Slip guard, permission preservation)
//! and `utils/file.rs::FileUtils::copy_recursive` (create-parent-dirs,
//! walk-and-copy idiom).

use std::fs;

use camino::{Utf8Path, Utf8PathBuf};
use walkdir::WalkDir;

use crate::core::archive::{ArchiveCodec, ZipCodec};
use crate::core::fs_provider::FsProvider;
use crate::models::error::InstallError;

pub struct RealFsProvider {
    codec: ZipCodec,
}

impl Default for RealFsProvider {
    fn default() -> Self {
        Self { codec: ZipCodec }
    }
}

impl RealFsProvider {
    pub fn new() -> Self {
        Self::default()
    }

    fn ensure_parent(path: &Utf8Path) -> Result<(), InstallError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        Ok(())
    }

    /// Falls back to copy+delete when `src`/`dst` straddle distinct
    /// volumes and a direct rename fails (spec.md §4.B).
    fn move_via_copy(&mut self, src: &Utf8Path, dst: &Utf8Path) -> Result<(), InstallError> {
        if src.is_dir() {
            Self::copy_dir_recursive(src, dst)?;
            fs::remove_dir_all(src)?;
        } else {
            fs::copy(src, dst)?;
            fs::remove_file(src)?;
        }
        Ok(())
    }

    fn copy_dir_recursive(src: &Utf8Path, dst: &Utf8Path) -> Result<(), InstallError> {
        fs::create_dir_all(dst)?;
        for entry in WalkDir::new(src.as_std_path()) {
            let entry = entry?;
            let entry_path = Utf8Path::from_path(entry.path())
                .ok_or_else(|| InstallError::Unexpected(format!("non-UTF8 path: {:?}", entry.path())))?;
            let relative = entry_path.strip_prefix(src)?;
            let target = dst.join(relative);

            if entry.file_type().is_dir() {
                fs::create_dir_all(&target)?;
            } else {
                if let Some(parent) = target.parent() {
                    fs::create_dir_all(parent)?;
                }
                fs::copy(entry_path, &target)?;
            }
        }
        Ok(())
    }
}

impl FsProvider for RealFsProvider {
    fn file_exists(&self, path: &Utf8Path) -> bool {
        path.is_file()
    }

    fn dir_exists(&self, path: &Utf8Path) -> bool {
        path.is_dir()
    }

    fn enumerate_files(
        &self,
        dir: &Utf8Path,
        recursive: bool,
    ) -> Result<Vec<Utf8PathBuf>, InstallError> {
        if !dir.is_dir() {
            return Err(InstallError::FileNotFoundPre(dir.to_string()));
        }

        let mut out = Vec::new();
        let walker = WalkDir::new(dir.as_std_path()).min_depth(1);
        let walker = if recursive { walker } else { walker.max_depth(1) };

        for entry in walker {
            let entry = entry?;
            if let Some(p) = Utf8Path::from_path(entry.path()) {
                out.push(p.to_path_buf());
            }
        }
        out.sort();
        Ok(out)
    }

    fn read_all_bytes(&self, path: &Utf8Path) -> Result<Vec<u8>, InstallError> {
        if !path.is_file() {
            return Err(InstallError::FileNotFoundPre(path.to_string()));
        }
        Ok(fs::read(path)?)
    }

    fn write_all_bytes(&mut self, path: &Utf8Path, bytes: &[u8], overwrite: bool) -> Result<(), InstallError> {
        if !overwrite && path.exists() {
            return Err(InstallError::AlreadyExists(path.to_string()));
        }
        Self::ensure_parent(path)?;
        fs::write(path, bytes)?;
        Ok(())
    }

    fn copy(&mut self, src: &Utf8Path, dst: &Utf8Path, overwrite: bool) -> Result<(), InstallError> {
        if !src.exists() {
            return Err(InstallError::FileNotFoundPre(src.to_string()));
        }
        if !overwrite && dst.exists() {
            return Err(InstallError::AlreadyExists(dst.to_string()));
        }
        Self::ensure_parent(dst)?;
        if src.is_dir() {
            Self::copy_dir_recursive(src, dst)?;
        } else {
            fs::copy(src, dst)?;
        }
        Ok(())
    }

    fn move_(&mut self, src: &Utf8Path, dst: &Utf8Path, overwrite: bool) -> Result<(), InstallError> {
        if !src.exists() {
            return Err(InstallError::FileNotFoundPre(src.to_string()));
        }
        if !overwrite && dst.exists() {
            return Err(InstallError::AlreadyExists(dst.to_string()));
        }
        Self::ensure_parent(dst)?;

        // `rename` fails whenever src/dst straddle distinct volumes
        // (errno EXDEV on Unix); rather than match that unstably,
        // fall back to copy+delete on any rename failure.
        match fs::rename(src, dst) {
            Ok(()) => Ok(()),
            Err(_) => self.move_via_copy(src, dst),
        }
    }

    fn rename(&mut self, src: &Utf8Path, new_name: &str, overwrite: bool) -> Result<(), InstallError> {
        if new_name.contains('/') || new_name.contains('\\') {
            return Err(InstallError::BadInput(format!(
                "rename target must be a bare filename: {new_name}"
            )));
        }
        let dst = src
            .parent()
            .ok_or_else(|| InstallError::BadInput(format!("no parent directory for {src}")))?
            .join(new_name);
        self.move_(src, &dst, overwrite)
    }

    fn delete(&mut self, path: &Utf8Path, missing_ok: bool) -> Result<(), InstallError> {
        if !path.exists() {
            return if missing_ok {
                Ok(())
            } else {
                Err(InstallError::FileNotFoundPre(path.to_string()))
            };
        }
        if path.is_dir() {
            fs::remove_dir_all(path)?;
        } else {
            fs::remove_file(path)?;
        }
        Ok(())
    }

    fn extract_archive(
        &mut self,
        archive_path: &Utf8Path,
        dest_dir: &Utf8Path,
    ) -> Result<Vec<Utf8PathBuf>, InstallError> {
        if !archive_path.is_file() {
            return Err(InstallError::FileNotFoundPre(archive_path.to_string()));
        }
        fs::create_dir_all(dest_dir)?;
        self.codec.extract(archive_path, dest_dir)
    }
}
