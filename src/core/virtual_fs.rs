//! In-memory dry-run `FsProvider`. Modeled as a pure data structure
//! per spec.md §9: an ordered map from normalized path to entry kind,
//! plus a separate ordered map tracking what each catalogued archive
//! contains. Every operation is a pure transform over these two maps,
//! which is what makes the provider-parity property (spec.md §8) a
//! structural consequence rather than something only a test can prove.
//!
//! Grounded in shape on the teacher's `core/cache.rs::LibraryCache`
//! (a `BTreeMap`-keyed authoritative view built by walking a real
//! root once) generalized into a simulation that also survives
//! Move/Copy/Rename of the archives themselves.

use std::collections::BTreeMap;
use std::fs;

use camino::{Utf8Path, Utf8PathBuf};
use walkdir::WalkDir;

use crate::core::archive::ArchiveCodec;
use crate::core::fs_provider::{ArchiveEntry, FsProvider};
use crate::models::error::InstallError;
use crate::models::issue::{Severity, ValidationIssue};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Dir,
}

#[derive(Clone, Debug)]
struct TrackedEntry {
    actual: Utf8PathBuf,
    kind: EntryKind,
}

#[derive(Clone, Debug)]
struct ArchiveRecord {
    actual_path: Utf8PathBuf,
    entries: BTreeMap<Utf8PathBuf, ArchiveEntry>,
}

fn normalized_key(path: &Utf8Path) -> String {
    path.as_str().to_lowercase()
}

#[derive(Default)]
pub struct VirtualFsProvider {
    tracked: BTreeMap<String, TrackedEntry>,
    archives: BTreeMap<String, ArchiveRecord>,
    issues: Vec<ValidationIssue>,
}

impl VirtualFsProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Walks `real_root` once, populating the tracked set with every
    /// file/dir found, and probes every discovered archive through
    /// `codec` to seed the archive-contents map (spec.md §4.B).
    pub fn initialize(real_root: &Utf8Path, codec: &dyn ArchiveCodec) -> Result<Self, InstallError> {
        let mut provider = Self::new();
        if !real_root.is_dir() {
            return Ok(provider);
        }

        for entry in WalkDir::new(real_root.as_std_path()) {
            let entry = entry?;
            let Some(path) = Utf8Path::from_path(entry.path()) else {
                continue;
            };
            if entry.file_type().is_dir() {
                provider.insert_entry(path, EntryKind::Dir);
            } else {
                provider.insert_entry(path, EntryKind::File);
                if path
                    .extension()
                    .map(|e| e.eq_ignore_ascii_case("zip"))
                    .unwrap_or(false)
                {
                    if let Ok(entries) = codec.list_entries(path) {
                        provider.archives.insert(
                            normalized_key(path),
                            ArchiveRecord {
                                actual_path: path.to_path_buf(),
                                entries: entries
                                    .into_iter()
                                    .map(|e| (e.relative_path.clone(), e))
                                    .collect(),
                            },
                        );
                    }
                }
            }
        }

        Ok(provider)
    }

    /// Directly catalogues an archive without touching the tracked
    /// set — useful for tests that fabricate archive contents rather
    /// than walking a real zip file.
    pub fn catalogue_archive(&mut self, archive_path: &Utf8Path, entries: Vec<ArchiveEntry>) {
        self.insert_entry(archive_path, EntryKind::File);
        self.archives.insert(
            normalized_key(archive_path),
            ArchiveRecord {
                actual_path: archive_path.to_path_buf(),
                entries: entries.into_iter().map(|e| (e.relative_path.clone(), e)).collect(),
            },
        );
    }

    fn push_issue(&mut self, severity: Severity, category: &str, message: impl Into<String>, path: &Utf8Path) {
        self.issues.push(
            ValidationIssue::new(severity, category, message.into()).with_path(path.to_path_buf()),
        );
    }

    fn ensure_ancestors(&mut self, path: &Utf8Path) {
        for ancestor in path.ancestors().skip(1) {
            if ancestor.as_str().is_empty() {
                break;
            }
            let key = normalized_key(ancestor);
            self.tracked.entry(key).or_insert(TrackedEntry {
                actual: ancestor.to_path_buf(),
                kind: EntryKind::Dir,
            });
        }
    }

    fn insert_entry(&mut self, path: &Utf8Path, kind: EntryKind) {
        self.ensure_ancestors(path);
        self.tracked
            .insert(normalized_key(path), TrackedEntry { actual: path.to_path_buf(), kind });
    }

    /// Removes `path` (and, if it is a directory, every tracked
    /// descendant) from the tracked set.
    fn remove_entry(&mut self, path: &Utf8Path) {
        let key = normalized_key(path);
        let prefix = format!("{key}{}", std::path::MAIN_SEPARATOR);
        self.tracked.remove(&key);
        self.tracked.retain(|k, _| !k.starts_with(&prefix));
        self.archives.remove(&key);
        self.archives.retain(|k, _| !k.starts_with(&prefix));
    }

    /// Relocates a tracked path (and any archive catalogue keyed on
    /// it) from `src` to `dst`, preserving archive-entry metadata so a
    /// later simulated extract still yields the original catalogue
    /// (spec.md §4.B "Move/Copy/Rename of an archive must update the
    /// archive-contents map's key").
    fn relocate(&mut self, src: &Utf8Path, dst: &Utf8Path, keep_src: bool) {
        let src_key = normalized_key(src);
        let src_prefix = format!("{src_key}{}", std::path::MAIN_SEPARATOR);

        let moved: Vec<(String, TrackedEntry)> = self
            .tracked
            .iter()
            .filter(|(k, _)| **k == src_key || k.starts_with(&src_prefix))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();

        for (old_key, entry) in moved {
            let relative = entry.actual.as_str()[entry.actual.as_str().len().min(src.as_str().len())..]
                .trim_start_matches(['/', '\\']);
            let new_actual = if old_key == src_key {
                dst.to_path_buf()
            } else {
                dst.join(relative)
            };
            if !keep_src {
                self.tracked.remove(&old_key);
            }
            self.tracked
                .insert(normalized_key(&new_actual), TrackedEntry { actual: new_actual, kind: entry.kind });
        }
        self.ensure_ancestors(dst);

        let moved_archives: Vec<(String, ArchiveRecord)> = self
            .archives
            .iter()
            .filter(|(k, _)| **k == src_key || k.starts_with(&src_prefix))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();

        for (old_key, record) in moved_archives {
            let relative = record.actual_path.as_str()
                [record.actual_path.as_str().len().min(src.as_str().len())..]
                .trim_start_matches(['/', '\\']);
            let new_actual = if old_key == src_key {
                dst.to_path_buf()
            } else {
                dst.join(relative)
            };
            if !keep_src {
                self.archives.remove(&old_key);
            }
            self.archives.insert(
                normalized_key(&new_actual),
                ArchiveRecord { actual_path: new_actual, entries: record.entries },
            );
        }
    }

    /// `true` if the write may proceed (target untracked, or the
    /// instruction asked to overwrite); otherwise records the
    /// `Overwrite` issue and leaves state untouched — per the seed
    /// scenario in spec.md §8 ("Overwrite=false guard"), this resolves
    /// to `Success` with a Warning, not a thrown error.
    fn allow_overwrite(&mut self, target: &Utf8Path, overwrite: bool) -> bool {
        let tracked = self.tracked.contains_key(&normalized_key(target));
        if tracked && !overwrite {
            self.push_issue(
                Severity::Warning,
                "Overwrite",
                format!("target already exists and overwrite=false: {target}"),
                target,
            );
            return false;
        }
        true
    }

    fn require_tracked(&mut self, path: &Utf8Path, category: &str) -> Result<(), InstallError> {
        if !self.tracked.contains_key(&normalized_key(path)) {
            self.push_issue(
                Severity::Error,
                category,
                format!("source not tracked by virtual filesystem: {path}"),
                path,
            );
            return Err(InstallError::FileNotFoundPre(path.to_string()));
        }
        Ok(())
    }

    pub fn tracked_paths(&self) -> Vec<Utf8PathBuf> {
        self.tracked.values().map(|e| e.actual.clone()).collect()
    }
}

impl FsProvider for VirtualFsProvider {
    fn file_exists(&self, path: &Utf8Path) -> bool {
        matches!(
            self.tracked.get(&normalized_key(path)),
            Some(TrackedEntry { kind: EntryKind::File, .. })
        )
    }

    fn dir_exists(&self, path: &Utf8Path) -> bool {
        matches!(
            self.tracked.get(&normalized_key(path)),
            Some(TrackedEntry { kind: EntryKind::Dir, .. })
        )
    }

    fn enumerate_files(
        &self,
        dir: &Utf8Path,
        recursive: bool,
    ) -> Result<Vec<Utf8PathBuf>, InstallError> {
        if !self.dir_exists(dir) {
            return Err(InstallError::FileNotFoundPre(dir.to_string()));
        }
        let dir_key = normalized_key(dir);
        let prefix = format!("{dir_key}{}", std::path::MAIN_SEPARATOR);

        let mut out: Vec<Utf8PathBuf> = self
            .tracked
            .iter()
            .filter(|(k, v)| {
                v.kind == EntryKind::File
                    && k.starts_with(&prefix)
                    && (recursive || !k[prefix.len()..].contains(std::path::MAIN_SEPARATOR))
            })
            .map(|(_, v)| v.actual.clone())
            .collect();
        out.sort();
        Ok(out)
    }

    fn read_all_bytes(&self, path: &Utf8Path) -> Result<Vec<u8>, InstallError> {
        if !self.file_exists(path) {
            return Err(InstallError::FileNotFoundPre(path.to_string()));
        }
        // The simulation never models byte contents, only presence.
        Ok(Vec::new())
    }

    fn write_all_bytes(&mut self, path: &Utf8Path, _bytes: &[u8], overwrite: bool) -> Result<(), InstallError> {
        if !self.allow_overwrite(path, overwrite) {
            return Ok(());
        }
        self.insert_entry(path, EntryKind::File);
        Ok(())
    }

    fn copy(&mut self, src: &Utf8Path, dst: &Utf8Path, overwrite: bool) -> Result<(), InstallError> {
        self.require_tracked(src, "Copy")?;
        if !self.allow_overwrite(dst, overwrite) {
            return Ok(());
        }
        self.relocate(src, dst, true);
        Ok(())
    }

    fn move_(&mut self, src: &Utf8Path, dst: &Utf8Path, overwrite: bool) -> Result<(), InstallError> {
        self.require_tracked(src, "Move")?;
        if !self.allow_overwrite(dst, overwrite) {
            return Ok(());
        }
        self.relocate(src, dst, false);
        Ok(())
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
        if !self.tracked.contains_key(&normalized_key(path)) {
            return if missing_ok {
                Ok(())
            } else {
                Err(InstallError::FileNotFoundPre(path.to_string()))
            };
        }
        self.remove_entry(path);
        Ok(())
    }

    fn extract_archive(
        &mut self,
        archive_path: &Utf8Path,
        dest_dir: &Utf8Path,
    ) -> Result<Vec<Utf8PathBuf>, InstallError> {
        self.require_tracked(archive_path, "Extract")?;
        let Some(record) = self.archives.get(&normalized_key(archive_path)).cloned() else {
            self.push_issue(
                Severity::Error,
                "Extract",
                format!("no catalogued contents for archive: {archive_path}"),
                archive_path,
            );
            return Err(InstallError::ArchiveFailure(format!(
                "no catalogued contents for archive: {archive_path}"
            )));
        };

        let mut materialized = Vec::with_capacity(record.entries.len());
        for relative in record.entries.keys() {
            let target = dest_dir.join(relative);
            self.insert_entry(&target, EntryKind::File);
            materialized.push(target);
        }
        materialized.sort();
        Ok(materialized)
    }

    fn issues(&self) -> &[ValidationIssue] {
        &self.issues
    }

    fn record_issue(&mut self, issue: ValidationIssue) {
        self.issues.push(issue);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overwrite_false_records_error_issue_and_keeps_target() {
        let mut vfs = VirtualFsProvider::new();
        vfs.write_all_bytes(Utf8Path::new("/game/dst.txt"), b"orig", true).unwrap();
        vfs.write_all_bytes(Utf8Path::new("/game/src.txt"), b"new", true).unwrap();

        vfs.copy(Utf8Path::new("/game/src.txt"), Utf8Path::new("/game/dst.txt"), false)
            .unwrap();

        assert!(vfs.file_exists(Utf8Path::new("/game/dst.txt")));
        assert_eq!(vfs.issues().len(), 1);
        assert_eq!(vfs.issues()[0].severity, Severity::Warning);
        assert_eq!(vfs.issues()[0].category, "Overwrite");
    }

    #[test]
    fn move_then_extract_chain_relocates_archive_catalogue() {
        let mut vfs = VirtualFsProvider::new();
        vfs.catalogue_archive(
            Utf8Path::new("/stage/chain_a.zip"),
            vec![ArchiveEntry { relative_path: Utf8PathBuf::from("a.txt"), size: 3 }],
        );

        vfs.rename(Utf8Path::new("/stage/chain_a.zip"), "chain_b.zip", true)
            .unwrap();
        vfs.rename(Utf8Path::new("/stage/chain_b.zip"), "chain_c.zip", true)
            .unwrap();

        let extracted = vfs
            .extract_archive(Utf8Path::new("/stage/chain_c.zip"), Utf8Path::new("/game/out"))
            .unwrap();

        assert_eq!(extracted, vec![Utf8PathBuf::from("/game/out/a.txt")]);
        assert!(vfs.file_exists(Utf8Path::new("/game/out/a.txt")));
    }

    #[test]
    fn directory_copy_relocates_every_nested_archive_entry() {
        let mut vfs = VirtualFsProvider::new();
        vfs.insert_entry(Utf8Path::new("/stage/bundle/readme.txt"), EntryKind::File);
        vfs.catalogue_archive(
            Utf8Path::new("/stage/bundle/data.zip"),
            vec![ArchiveEntry { relative_path: Utf8PathBuf::from("x.bin"), size: 1 }],
        );

        vfs.copy(Utf8Path::new("/stage/bundle"), Utf8Path::new("/game/bundle"), true)
            .unwrap();

        assert!(vfs.file_exists(Utf8Path::new("/game/bundle/readme.txt")));
        let extracted = vfs
            .extract_archive(Utf8Path::new("/game/bundle/data.zip"), Utf8Path::new("/game/out"))
            .unwrap();
        assert_eq!(extracted, vec![Utf8PathBuf::from("/game/out/x.bin")]);
    }

    #[test]
    fn delete_removes_directory_and_descendants() {
        let mut vfs = VirtualFsProvider::new();
        vfs.insert_entry(Utf8Path::new("/game/dir/a.txt"), EntryKind::File);
        vfs.insert_entry(Utf8Path::new("/game/dir/b.txt"), EntryKind::File);

        vfs.delete(Utf8Path::new("/game/dir"), false).unwrap();

        assert!(!vfs.file_exists(Utf8Path::new("/game/dir/a.txt")));
        assert!(!vfs.file_exists(Utf8Path::new("/game/dir/b.txt")));
    }

    #[test]
    fn missing_source_without_overwrite_is_silent() {
        let mut vfs = VirtualFsProvider::new();
        assert!(vfs.delete(Utf8Path::new("/game/ghost.txt"), true).is_ok());
    }
}
