use std::collections::BTreeSet;

use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};

use crate::models::ids::{ComponentId, OptionId};

/// Tri-valued overwrite flag. `Inherit` resolves to the engine's
/// default policy (currently `false`) at dispatch time.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Overwrite {
    Inherit,
    True,
    False,
}

impl Overwrite {
    pub fn resolve(self) -> bool {
        match self {
            Overwrite::Inherit => false,
            Overwrite::True => true,
            Overwrite::False => false,
        }
    }
}

/// One declarative installation step. A sum type over the ten action
/// kinds so every variant only ever carries the fields that action
/// needs — there is no single "did I forget to check this field"
/// dispatch bug possible once the match in the interpreter is
/// exhaustive.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub enum Action {
    Extract,
    Move,
    Copy,
    Rename,
    Delete,
    DelDuplicate,
    CleanList,
    Choose { options: Vec<OptionId> },
    Patcher { executable: Utf8PathBuf },
    Execute { executable: Utf8PathBuf },
}

impl Action {
    pub fn name(&self) -> &'static str {
        match self {
            Action::Extract => "Extract",
            Action::Move => "Move",
            Action::Copy => "Copy",
            Action::Rename => "Rename",
            Action::Delete => "Delete",
            Action::DelDuplicate => "DelDuplicate",
            Action::CleanList => "CleanList",
            Action::Choose { .. } => "Choose",
            Action::Patcher { .. } => "Patcher",
            Action::Execute { .. } => "Execute",
        }
    }

    /// Actions that require a non-empty `source` list (spec.md §3).
    pub fn requires_source(&self) -> bool {
        matches!(
            self,
            Action::Extract
                | Action::Move
                | Action::Copy
                | Action::Rename
                | Action::Delete
                | Action::DelDuplicate
                | Action::CleanList
        )
    }
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Instruction {
    pub action: Action,
    /// Ordered, possibly placeholder-/wildcard-bearing source paths.
    pub source: Vec<String>,
    /// Single destination path; empty when the action doesn't need one.
    pub destination: String,
    pub overwrite: Overwrite,
    /// Action-specific free-form argument (e.g. the `arguments` field
    /// naming the extension to delete for `DelDuplicate`).
    pub arguments: String,
    pub dependencies: BTreeSet<ComponentId>,
    pub restrictions: BTreeSet<ComponentId>,
}

impl Instruction {
    pub fn new(action: Action) -> Self {
        Self {
            action,
            source: Vec::new(),
            destination: String::new(),
            overwrite: Overwrite::Inherit,
            arguments: String::new(),
            dependencies: BTreeSet::new(),
            restrictions: BTreeSet::new(),
        }
    }
}
