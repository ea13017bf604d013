//! Engine runtime configuration. Grounded on the teacher's
//! `utils/toml.rs`-backed `AppSettings` read/write pattern, generalized
//! to the roots and tunables this engine actually needs.

use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};

use crate::core::resolver::ResolverContext;
use crate::models::error::InstallError;
use crate::utils::toml::Toml;

/// Process-wide configuration the caller owns for the duration of a
/// run (spec.md §5 "Shared resources"): the three ambient roots, plus
/// the tunables the rest of the engine treats as defaults rather than
/// hard-coded constants.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct RunConfig {
    pub source_root: Utf8PathBuf,
    pub dest_root: Utf8PathBuf,
    pub temp_root: Utf8PathBuf,
    /// `CleanList` Jaro-Winkler acceptance threshold (spec.md §9 Open
    /// Questions: frozen default `0.85`).
    pub fuzzy_match_threshold: f64,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            source_root: Utf8PathBuf::from("."),
            dest_root: Utf8PathBuf::from("."),
            temp_root: std::env::temp_dir()
                .try_into()
                .unwrap_or_else(|_| Utf8PathBuf::from(".")),
            fuzzy_match_threshold: 0.85,
        }
    }
}

impl RunConfig {
    pub fn load(path: &Utf8Path) -> Result<Self, InstallError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        Toml::read(path)
    }

    pub fn save(&self, path: &Utf8Path) -> Result<(), InstallError> {
        Toml::write(path, self)
    }

    pub fn resolver_context(&self) -> ResolverContext {
        ResolverContext {
            source_root: self.source_root.clone(),
            dest_root: self.dest_root.clone(),
            temp_root: self.temp_root.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_config_file_yields_default() {
        let loaded = RunConfig::load(Utf8Path::new("/nonexistent/run_config.toml")).unwrap();
        assert_eq!(loaded.fuzzy_match_threshold, 0.85);
    }

    #[test]
    fn roundtrips_through_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = Utf8Path::from_path(dir.path()).unwrap().join("run_config.toml");

        let mut cfg = RunConfig::default();
        cfg.fuzzy_match_threshold = 0.9;
        cfg.save(&path).unwrap();

        let loaded = RunConfig::load(&path).unwrap();
        assert_eq!(loaded.fuzzy_match_threshold, 0.9);
    }
}
