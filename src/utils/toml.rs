//! Small TOML read/write helper, reused near-verbatim from the
//! teacher's `utils/toml.rs::Toml`.

use camino::Utf8Path;

use crate::models::error::InstallError;

pub struct Toml;

impl Toml {
    pub fn write<T: serde::Serialize>(path: &Utf8Path, data: &T) -> Result<(), InstallError> {
        let text = toml::to_string_pretty(data)?;
        std::fs::write(path, text)?;
        Ok(())
    }

    pub fn read<T: serde::de::DeserializeOwned>(path: &Utf8Path) -> Result<T, InstallError> {
        let text = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&text)?)
    }
}
