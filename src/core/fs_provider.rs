//! Filesystem abstraction (spec.md component B): a uniform capability
//! set implemented identically by a Real (OS-backed) and a Virtual
//! (in-memory, dry-run) provider.

use camino::{Utf8Path, Utf8PathBuf};

use crate::models::error::InstallError;
use crate::models::issue::ValidationIssue;

/// One materialized archive entry, as either a Real extraction or a
/// Virtual simulation reports it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ArchiveEntry {
    pub relative_path: Utf8PathBuf,
    pub size: u64,
}

pub trait FsProvider {
    fn file_exists(&self, path: &Utf8Path) -> bool;
    fn dir_exists(&self, path: &Utf8Path) -> bool;

    /// Lists absolute paths under `dir`. Non-recursive listings are
    /// used by wildcard expansion (spec.md §4.A); `recursive = true`
    /// is the bulk-capability form callers use directly.
    fn enumerate_files(
        &self,
        dir: &Utf8Path,
        recursive: bool,
    ) -> Result<Vec<Utf8PathBuf>, InstallError>;

    fn read_all_bytes(&self, path: &Utf8Path) -> Result<Vec<u8>, InstallError>;
    fn write_all_bytes(&mut self, path: &Utf8Path, bytes: &[u8], overwrite: bool) -> Result<(), InstallError>;

    fn copy(&mut self, src: &Utf8Path, dst: &Utf8Path, overwrite: bool) -> Result<(), InstallError>;
    fn move_(&mut self, src: &Utf8Path, dst: &Utf8Path, overwrite: bool) -> Result<(), InstallError>;

    /// `new_name` must be a bare filename; a separator in it is
    /// `BadInput` (spec.md §4.B).
    fn rename(&mut self, src: &Utf8Path, new_name: &str, overwrite: bool) -> Result<(), InstallError>;

    /// `missing_ok` mirrors the instruction's `overwrite=false` flag:
    /// a missing source is silent when `missing_ok`, `NotFound`-mapped
    /// otherwise (spec.md §4.C "Delete").
    fn delete(&mut self, path: &Utf8Path, missing_ok: bool) -> Result<(), InstallError>;

    fn extract_archive(
        &mut self,
        archive_path: &Utf8Path,
        dest_dir: &Utf8Path,
    ) -> Result<Vec<Utf8PathBuf>, InstallError>;

    /// Non-recursive direct-child listing, the form the wildcard
    /// expander needs. Default impl delegates to `enumerate_files`.
    fn list_dir(&self, dir: &Utf8Path) -> Result<Vec<Utf8PathBuf>, InstallError> {
        self.enumerate_files(dir, false)
    }

    /// Advisory issues recorded so far. Only the virtual provider
    /// accumulates these; the real provider returns an empty slice.
    fn issues(&self) -> &[ValidationIssue] {
        &[]
    }

    /// Records an issue raised by a caller outside the provider's own
    /// operations (e.g. the interpreter's `Choose` restriction-conflict
    /// warning). No-op on the real provider.
    fn record_issue(&mut self, _issue: ValidationIssue) {}
}
