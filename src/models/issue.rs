use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Info,
    Warning,
    Error,
}

/// Advisory-and-authoritative record from the virtual provider (and
/// the interpreter's `Choose` tie-break). A dry run with any
/// `Severity::Error` issue is not a pass even if every simulated
/// operation nominally succeeded (spec.md §3, §7).
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct ValidationIssue {
    pub severity: Severity,
    /// Matches the offending instruction's action name.
    pub category: String,
    pub message: String,
    pub path: Option<Utf8PathBuf>,
}

impl ValidationIssue {
    pub fn new(severity: Severity, category: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            severity,
            category: category.into(),
            message: message.into(),
            path: None,
        }
    }

    pub fn with_path(mut self, path: impl Into<Utf8PathBuf>) -> Self {
        self.path = Some(path.into());
        self
    }
}
