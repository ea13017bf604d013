use derive_more::Display;

use crate::models::ids::ComponentId;

#[derive(Display, Debug, Clone, PartialEq, Eq)]
pub enum InstallError {
    BadInput(String),
    #[display("dependency unmet for component {_0}")]
    DependencyUnmet(ComponentId),
    #[display("restriction hit for component {_0}")]
    RestrictionHit(ComponentId),
    FileNotFoundPre(String),
    FileNotFoundPost(String),
    AlreadyExists(String),
    Cancelled,
    IoFailure(String),
    ArchiveFailure(String),
    MissingExecutable(String),
    UnsatisfiableOrder(String),
    Unexpected(String),
}

macro_rules! impl_from {
    ($from_type:ty, $variant:ident) => {
        impl From<$from_type> for InstallError {
            fn from(err: $from_type) -> Self {
                InstallError::$variant(err.to_string())
            }
        }
    };
}

impl_from!(std::io::Error, IoFailure);
impl_from!(walkdir::Error, IoFailure);
impl_from!(zip::result::ZipError, ArchiveFailure);
impl_from!(std::path::StripPrefixError, Unexpected);
impl_from!(toml::de::Error, Unexpected);
impl_from!(toml::ser::Error, Unexpected);
