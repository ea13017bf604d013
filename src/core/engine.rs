//! Component engine (spec.md component D): orders components, drives
//! each through the interpreter instruction-by-instruction, threads
//! cancellation, and reports a final exit code per component plus the
//! accumulated validation issues.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::{info, info_span};

use crate::config::RunConfig;
use crate::core::fs_provider::FsProvider;
use crate::core::interpreter::Interpreter;
use crate::core::ordering::confirm_components_install_order;
use crate::core::process::ProcessRunner;
use crate::core::resolver::ResolverContext;
use crate::models::component::{Component, InstallState};
use crate::models::error::InstallError;
use crate::models::exit_code::ActionExitCode;
use crate::models::ids::ComponentId;
use crate::models::issue::ValidationIssue;

/// Cooperative cancellation signal shared between the caller and a
/// running `execute_batch`. Checked before each instruction and before
/// each expanded-source iteration (spec.md §5); an in-flight operation
/// is never interrupted.
#[derive(Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

pub struct BatchOutcome {
    pub exit_codes: BTreeMap<ComponentId, ActionExitCode>,
    pub issues: Vec<ValidationIssue>,
}

/// `ExecuteBatch` (spec.md §4.D): orders `components`, then runs each
/// in order through the interpreter. A failed, non-cancelled component
/// stops that component but the batch continues to the next one.
///
/// Uses the frozen default `CleanList` fuzzy threshold (spec.md §9).
/// Callers that carry a `RunConfig` should use
/// [`execute_batch_with_config`] instead so a configured threshold
/// actually reaches the interpreter.
pub fn execute_batch(
    components: &[Component],
    ctx: &ResolverContext,
    process_runner: &dyn ProcessRunner,
    provider: &mut dyn FsProvider,
    cancel: &CancelToken,
) -> Result<BatchOutcome, InstallError> {
    let interpreter = Interpreter::new(ctx, process_runner);
    run_batch(components, &interpreter, provider, cancel)
}

/// Same as [`execute_batch`], but derives the resolver context and the
/// `CleanList` fuzzy threshold from `config` instead of hardcoding the
/// default (spec.md §5 "Shared resources").
pub fn execute_batch_with_config(
    components: &[Component],
    config: &RunConfig,
    process_runner: &dyn ProcessRunner,
    provider: &mut dyn FsProvider,
    cancel: &CancelToken,
) -> Result<BatchOutcome, InstallError> {
    let ctx = config.resolver_context();
    let interpreter = Interpreter::with_threshold(&ctx, process_runner, config.fuzzy_match_threshold);
    run_batch(components, &interpreter, provider, cancel)
}

fn run_batch(
    components: &[Component],
    interpreter: &Interpreter,
    provider: &mut dyn FsProvider,
    cancel: &CancelToken,
) -> Result<BatchOutcome, InstallError> {
    let (_already_ordered, ordered) = confirm_components_install_order(components)?;
    let selected: std::collections::BTreeSet<ComponentId> =
        ordered.iter().filter(|c| c.selected).map(|c| c.id).collect();

    let mut exit_codes = BTreeMap::new();

    for component in &ordered {
        let span = info_span!("component", name = %component.name, id = %component.id);
        let _enter = span.enter();

        if !component.selected {
            continue;
        }
        if cancel.is_cancelled() {
            exit_codes.insert(component.id, ActionExitCode::Cancelled);
            continue;
        }

        let mut state = InstallState::NotStarted;
        state = transition(state, InstallState::InProgress);

        let mut final_code = ActionExitCode::Success;
        for (index, instr) in component.instructions.iter().enumerate() {
            let code = interpreter.execute_single_instruction(
                instr,
                index,
                &ordered,
                &selected,
                component,
                provider,
                false,
                cancel,
            );
            if code != ActionExitCode::Success {
                final_code = code;
                break;
            }
        }

        let next_state = if final_code == ActionExitCode::Success {
            InstallState::Completed
        } else {
            InstallState::Failed
        };
        transition(state, next_state);
        info!(code = ?final_code, "component finished");
        exit_codes.insert(component.id, final_code);
    }

    Ok(BatchOutcome { exit_codes, issues: provider.issues().to_vec() })
}

fn transition(from: InstallState, to: InstallState) -> InstallState {
    debug_assert!(from.can_transition_to(to), "illegal install-state transition {from:?} -> {to:?}");
    to
}

#[cfg(test)]
mod tests {
    use camino::Utf8PathBuf;

    use super::*;
    use crate::core::process::RealProcessRunner;
    use crate::core::virtual_fs::VirtualFsProvider;
    use crate::models::instruction::{Action, Instruction};

    fn ctx() -> ResolverContext {
        ResolverContext {
            source_root: Utf8PathBuf::from("/mods"),
            dest_root: Utf8PathBuf::from("/game"),
            temp_root: Utf8PathBuf::from("/tmp"),
        }
    }

    #[test]
    fn unselected_components_are_skipped() {
        let component = Component::new("unselected");
        let runner = RealProcessRunner;
        let mut provider = VirtualFsProvider::new();

        let outcome =
            execute_batch(&[component], &ctx(), &runner, &mut provider, &CancelToken::new()).unwrap();
        assert!(outcome.exit_codes.is_empty());
    }

    #[test]
    fn selected_component_with_no_instructions_completes() {
        let mut component = Component::new("empty");
        component.selected = true;
        let id = component.id;

        let runner = RealProcessRunner;
        let mut provider = VirtualFsProvider::new();
        let outcome =
            execute_batch(&[component], &ctx(), &runner, &mut provider, &CancelToken::new()).unwrap();

        assert_eq!(outcome.exit_codes.get(&id), Some(&ActionExitCode::Success));
    }

    #[test]
    fn missing_source_stops_component_with_file_not_found_pre() {
        let mut component = Component::new("broken");
        component.selected = true;
        let mut instr = Instruction::new(Action::Delete);
        instr.source = vec!["<<modDirectory>>/ghost.txt".to_string()];
        instr.overwrite = crate::models::instruction::Overwrite::True;
        component.instructions.push(instr);
        let id = component.id;

        let runner = RealProcessRunner;
        let mut provider = VirtualFsProvider::new();
        let outcome =
            execute_batch(&[component], &ctx(), &runner, &mut provider, &CancelToken::new()).unwrap();

        assert_eq!(outcome.exit_codes.get(&id), Some(&ActionExitCode::FileNotFoundPre));
    }

    #[test]
    fn config_driven_batch_uses_the_configured_resolver_roots() {
        let mut config = RunConfig::default();
        config.source_root = Utf8PathBuf::from("/mods");
        config.dest_root = Utf8PathBuf::from("/game");

        let mut component = Component::new("configured");
        component.selected = true;
        let id = component.id;

        let runner = RealProcessRunner;
        let mut provider = VirtualFsProvider::new();
        let outcome = execute_batch_with_config(
            &[component],
            &config,
            &runner,
            &mut provider,
            &CancelToken::new(),
        )
        .unwrap();

        assert_eq!(outcome.exit_codes.get(&id), Some(&ActionExitCode::Success));
    }
}
