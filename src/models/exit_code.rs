use crate::models::error::InstallError;

/// Stable, closed taxonomy surfaced to callers. `Success` maps to `0`;
/// the remaining variants map to consecutive positive integers in
/// declaration order, per the spec's recommended CLI wrapper mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum ActionExitCode {
    Success = 0,
    BadInput,
    DependencyUnmet,
    RestrictionHit,
    FileNotFoundPre,
    FileNotFoundPost,
    AlreadyExists,
    Cancelled,
    IoFailure,
    ArchiveFailure,
    UserAbort,
}

impl ActionExitCode {
    pub fn as_i32(self) -> i32 {
        self as i32
    }
}

impl From<&InstallError> for ActionExitCode {
    fn from(err: &InstallError) -> Self {
        match err {
            InstallError::BadInput(_) => ActionExitCode::BadInput,
            InstallError::DependencyUnmet(_) => ActionExitCode::DependencyUnmet,
            InstallError::RestrictionHit(_) => ActionExitCode::RestrictionHit,
            InstallError::FileNotFoundPre(_) => ActionExitCode::FileNotFoundPre,
            InstallError::FileNotFoundPost(_) => ActionExitCode::FileNotFoundPost,
            InstallError::AlreadyExists(_) => ActionExitCode::AlreadyExists,
            InstallError::Cancelled => ActionExitCode::Cancelled,
            InstallError::IoFailure(_) => ActionExitCode::IoFailure,
            InstallError::ArchiveFailure(_) => ActionExitCode::ArchiveFailure,
            InstallError::MissingExecutable(_) => ActionExitCode::FileNotFoundPost,
            InstallError::UnsatisfiableOrder(_) => ActionExitCode::BadInput,
            InstallError::Unexpected(_) => ActionExitCode::IoFailure,
        }
    }
}
