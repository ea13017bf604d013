//! External process collaborator for Patcher/Execute (spec.md §6).

use std::process::Command;

use camino::Utf8Path;

use crate::models::error::InstallError;

pub trait ProcessRunner {
    /// Runs `executable` with `arguments` in `working_dir`, returning
    /// its exit code. A missing executable is a distinct error from a
    /// generic I/O failure (spec.md §6).
    fn run(
        &self,
        executable: &Utf8Path,
        working_dir: &Utf8Path,
        arguments: &[String],
    ) -> Result<i32, InstallError>;
}

pub struct RealProcessRunner;

impl ProcessRunner for RealProcessRunner {
    fn run(
        &self,
        executable: &Utf8Path,
        working_dir: &Utf8Path,
        arguments: &[String],
    ) -> Result<i32, InstallError> {
        if !executable.exists() {
            return Err(InstallError::MissingExecutable(executable.to_string()));
        }

        let output = Command::new(executable.as_std_path())
            .args(arguments)
            .current_dir(working_dir.as_std_path())
            .output()
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    InstallError::MissingExecutable(executable.to_string())
                } else {
                    InstallError::IoFailure(e.to_string())
                }
            })?;

        Ok(output.status.code().unwrap_or(-1))
    }
}
