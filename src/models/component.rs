use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::models::ids::{ComponentId, OptionId};
use crate::models::instruction::Instruction;

/// Archive basename -> {contained file name -> required?}. Feeds the
/// interpreter's auto-extract fallback (spec.md §4.C).
pub type ResourceRegistry = BTreeMap<String, BTreeMap<String, bool>>;

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum InstallState {
    NotStarted,
    InProgress,
    Completed,
    Failed,
}

impl InstallState {
    /// Enforces the strictly-monotonic state machine in spec.md §4.C:
    /// `NotStarted -> InProgress -> {Completed | Failed}`.
    pub fn can_transition_to(self, next: InstallState) -> bool {
        matches!(
            (self, next),
            (InstallState::NotStarted, InstallState::InProgress)
                | (InstallState::InProgress, InstallState::Completed)
                | (InstallState::InProgress, InstallState::Failed)
        )
    }
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct InstallOption {
    pub id: OptionId,
    pub name: String,
    pub selected: bool,
    /// Identifiers of mutually-exclusive sibling options.
    pub restrictions: BTreeSet<OptionId>,
    pub instructions: Vec<Instruction>,
}

impl InstallOption {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: OptionId::new(),
            name: name.into(),
            selected: false,
            restrictions: BTreeSet::new(),
            instructions: Vec::new(),
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Component {
    pub id: ComponentId,
    pub name: String,
    /// Author/metadata blob, opaque to the engine.
    pub metadata: String,
    pub instructions: Vec<Instruction>,
    pub options: Vec<InstallOption>,
    pub selected: bool,
    pub state: InstallState,
    pub install_before: BTreeSet<ComponentId>,
    pub install_after: BTreeSet<ComponentId>,
    pub resources: ResourceRegistry,
}

impl Component {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: ComponentId::new(),
            name: name.into(),
            metadata: String::new(),
            instructions: Vec::new(),
            options: Vec::new(),
            selected: false,
            state: InstallState::NotStarted,
            install_before: BTreeSet::new(),
            install_after: BTreeSet::new(),
            resources: ResourceRegistry::new(),
        }
    }

    pub fn option(&self, id: OptionId) -> Option<&InstallOption> {
        self.options.iter().find(|o| o.id == id)
    }
}
