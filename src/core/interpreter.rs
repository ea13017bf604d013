//! Instruction interpreter (spec.md component C): per-instruction
//! dispatch that resolves sources, enforces dependency/restriction/
//! overwrite policy, drives the filesystem provider, and reports a
//! stable `ActionExitCode`.

use std::collections::BTreeSet;

use camino::{Utf8Path, Utf8PathBuf};
use tracing::{instrument, warn};

use crate::core::cleanlist::clean_list;
use crate::core::engine::CancelToken;
use crate::core::fs_provider::FsProvider;
use crate::core::process::ProcessRunner;
use crate::core::resolver::{self, DefaultRoot, ResolverContext};
use crate::models::component::Component;
use crate::models::error::InstallError;
use crate::models::exit_code::ActionExitCode;
use crate::models::ids::ComponentId;
use crate::models::instruction::{Action, Instruction};
use crate::models::issue::{Severity, ValidationIssue};

pub struct Interpreter<'a> {
    pub ctx: &'a ResolverContext,
    pub process_runner: &'a dyn ProcessRunner,
    /// Jaro-Winkler threshold for `CleanList` fuzzy matching (spec.md
    /// §9 Open Questions: "case-insensitive substring OR Jaro-Winkler
    /// >= 0.85" frozen as the default).
    pub fuzzy_threshold: f64,
}

impl<'a> Interpreter<'a> {
    pub fn new(ctx: &'a ResolverContext, process_runner: &'a dyn ProcessRunner) -> Self {
        Self::with_threshold(ctx, process_runner, 0.85)
    }

    pub fn with_threshold(ctx: &'a ResolverContext, process_runner: &'a dyn ProcessRunner, fuzzy_threshold: f64) -> Self {
        Self { ctx, process_runner, fuzzy_threshold }
    }

    /// `ExecuteSingleInstruction` (spec.md §4.C). Never panics and
    /// never propagates a raw error to the caller: every failure path
    /// is mapped to the closest `ActionExitCode` (spec.md §7).
    #[instrument(skip_all, fields(action = instr.action.name(), index, component = %owner.id))]
    #[allow(clippy::too_many_arguments)]
    pub fn execute_single_instruction(
        &self,
        instr: &Instruction,
        index: usize,
        components: &[Component],
        selected: &BTreeSet<ComponentId>,
        owner: &Component,
        provider: &mut dyn FsProvider,
        skip_dep_check: bool,
        cancel: &CancelToken,
    ) -> ActionExitCode {
        if cancel.is_cancelled() {
            return ActionExitCode::Cancelled;
        }
        if !skip_dep_check {
            if let Some(missing) = instr.dependencies.iter().find(|d| !selected.contains(d)) {
                warn!(dependency = %missing, "dependency unmet");
                return ActionExitCode::DependencyUnmet;
            }
        }
        if let Some(hit) = instr.restrictions.iter().find(|r| selected.contains(r)) {
            warn!(restriction = %hit, "restriction hit");
            return ActionExitCode::RestrictionHit;
        }

        match self.dispatch(instr, components, selected, owner, provider, skip_dep_check, cancel) {
            Ok(code) => code,
            Err(err) => {
                warn!(error = %err, "instruction failed");
                ActionExitCode::from(&err)
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn dispatch(
        &self,
        instr: &Instruction,
        components: &[Component],
        selected: &BTreeSet<ComponentId>,
        owner: &Component,
        provider: &mut dyn FsProvider,
        skip_dep_check: bool,
        cancel: &CancelToken,
    ) -> Result<ActionExitCode, InstallError> {
        match &instr.action {
            Action::Extract => self.do_extract(instr, owner, provider),
            Action::Move => self.do_move_or_copy(instr, owner, provider, true),
            Action::Copy => self.do_move_or_copy(instr, owner, provider, false),
            Action::Rename => self.do_rename(instr, owner, provider),
            Action::Delete => self.do_delete(instr, owner, provider),
            Action::DelDuplicate => self.do_del_duplicate(instr, provider),
            Action::CleanList => {
                let names: Vec<&str> = components
                    .iter()
                    .filter(|c| selected.contains(&c.id))
                    .map(|c| c.name.as_str())
                    .collect();
                clean_list(self, instr, &names, provider)
            }
            Action::Choose { options } => {
                self.do_choose(options, components, selected, owner, provider, skip_dep_check, cancel)
            }
            Action::Patcher { executable } => self.do_run(executable, instr, provider, true),
            Action::Execute { executable } => self.do_run(executable, instr, provider, false),
        }
    }

    pub(crate) fn resolve_source(&self, raw: &str) -> Result<Utf8PathBuf, InstallError> {
        resolver::resolve(raw, self.ctx, DefaultRoot::Source)
    }

    pub(crate) fn resolve_dest(&self, raw: &str) -> Result<Utf8PathBuf, InstallError> {
        resolver::resolve(raw, self.ctx, DefaultRoot::Dest)
    }

    fn list_dir_or_empty(
        provider: &dyn FsProvider,
        dir: &Utf8Path,
    ) -> Result<Vec<Utf8PathBuf>, InstallError> {
        match provider.list_dir(dir) {
            Ok(entries) => Ok(entries),
            Err(InstallError::FileNotFoundPre(_)) => Ok(Vec::new()),
            Err(e) => Err(e),
        }
    }

    /// Resolves every `source` entry, applying the auto-extract
    /// fallback (spec.md §4.C) before wildcard expansion.
    fn expand_sources(
        &self,
        instr: &Instruction,
        owner: &Component,
        provider: &mut dyn FsProvider,
    ) -> Result<Vec<Utf8PathBuf>, InstallError> {
        if instr.source.is_empty() {
            return Err(InstallError::BadInput(format!(
                "{} requires a non-empty source list",
                instr.action.name()
            )));
        }

        let mut out = Vec::new();
        for raw in &instr.source {
            let candidate = self.resolve_source(raw)?;
            let is_literal = !candidate.as_str().contains('*') && !candidate.as_str().contains('?');
            if is_literal && !provider.file_exists(&candidate) && !provider.dir_exists(&candidate) {
                self.try_auto_extract(&candidate, owner, provider)?;
            }
            let expanded =
                resolver::expand_wildcards(&candidate, |dir| Self::list_dir_or_empty(provider, dir))?;
            out.extend(expanded);
        }
        Ok(out)
    }

    /// Looks `candidate`'s basename up in `owner.resources`; if a
    /// catalogued archive in the source root contains it, extracts
    /// that archive into the source root so a re-resolve can succeed
    /// (spec.md §4.C "Auto-extract fallback").
    fn try_auto_extract(
        &self,
        candidate: &Utf8Path,
        owner: &Component,
        provider: &mut dyn FsProvider,
    ) -> Result<(), InstallError> {
        let Some(basename) = candidate.file_name() else {
            return Ok(());
        };
        for (archive_name, files) in &owner.resources {
            if !files.contains_key(basename) {
                continue;
            }
            let archive_path = self.ctx.source_root.join(archive_name);
            if provider.file_exists(&archive_path) {
                provider.extract_archive(&archive_path, &self.ctx.source_root)?;
                return Ok(());
            }
        }
        Ok(())
    }

    fn do_extract(
        &self,
        instr: &Instruction,
        owner: &Component,
        provider: &mut dyn FsProvider,
    ) -> Result<ActionExitCode, InstallError> {
        let sources = self.expand_sources(instr, owner, provider)?;
        if sources.is_empty() {
            return Err(InstallError::FileNotFoundPre(format!(
                "no archive matched for Extract: {:?}",
                instr.source
            )));
        }

        for archive in &sources {
            let dest = if instr.destination.is_empty() {
                archive
                    .parent()
                    .unwrap_or(Utf8Path::new("."))
                    .join(archive.file_stem().unwrap_or(archive.as_str()))
            } else {
                self.resolve_dest(&instr.destination)?
            };
            provider.extract_archive(archive, &dest)?;
        }
        Ok(ActionExitCode::Success)
    }

    fn do_move_or_copy(
        &self,
        instr: &Instruction,
        owner: &Component,
        provider: &mut dyn FsProvider,
        is_move: bool,
    ) -> Result<ActionExitCode, InstallError> {
        let sources = self.expand_sources(instr, owner, provider)?;
        if sources.is_empty() {
            return Err(InstallError::FileNotFoundPre(format!(
                "no source matched for {}: {:?}",
                instr.action.name(),
                instr.source
            )));
        }

        let dest_root = self.resolve_dest(&instr.destination)?;
        let dest_is_dir = provider.dir_exists(&dest_root);
        if !dest_is_dir && sources.len() > 1 {
            return Err(InstallError::BadInput(format!(
                "{} with multiple sources requires an existing directory destination",
                instr.action.name()
            )));
        }

        let overwrite = instr.overwrite.resolve();
        for src in &sources {
            let target = if dest_is_dir {
                let basename = src
                    .file_name()
                    .ok_or_else(|| InstallError::BadInput(format!("source has no file name: {src}")))?;
                dest_root.join(basename)
            } else {
                dest_root.clone()
            };
            if is_move {
                provider.move_(src, &target, overwrite)?;
            } else {
                provider.copy(src, &target, overwrite)?;
            }
        }
        Ok(ActionExitCode::Success)
    }

    fn do_rename(
        &self,
        instr: &Instruction,
        owner: &Component,
        provider: &mut dyn FsProvider,
    ) -> Result<ActionExitCode, InstallError> {
        let sources = self.expand_sources(instr, owner, provider)?;
        if sources.len() != 1 {
            return Err(InstallError::BadInput(format!(
                "Rename requires exactly one source, got {}",
                sources.len()
            )));
        }
        provider.rename(&sources[0], &instr.destination, instr.overwrite.resolve())?;
        Ok(ActionExitCode::Success)
    }

    fn do_delete(
        &self,
        instr: &Instruction,
        owner: &Component,
        provider: &mut dyn FsProvider,
    ) -> Result<ActionExitCode, InstallError> {
        let overwrite = instr.overwrite.resolve();
        let sources = match self.expand_sources(instr, owner, provider) {
            Ok(s) => s,
            Err(InstallError::FileNotFoundPre(_)) if !overwrite => return Ok(ActionExitCode::Success),
            Err(e) => return Err(e),
        };
        if sources.is_empty() {
            // Empty-after-expansion with overwrite=false is the
            // documented silent no-op (spec.md §4.C preflight step 4).
            return if overwrite {
                Err(InstallError::FileNotFoundPre(format!(
                    "no source matched for Delete: {:?}",
                    instr.source
                )))
            } else {
                Ok(ActionExitCode::Success)
            };
        }

        // This coupling is intentionally counter-intuitive and frozen
        // as-is per spec.md §9 Open Questions: overwrite=true makes a
        // missing individual source fatal, overwrite=false makes it
        // silent.
        let missing_ok = !overwrite;
        for src in &sources {
            provider.delete(src, missing_ok)?;
        }
        Ok(ActionExitCode::Success)
    }

    fn do_del_duplicate(
        &self,
        instr: &Instruction,
        provider: &mut dyn FsProvider,
    ) -> Result<ActionExitCode, InstallError> {
        if instr.source.len() != 2 {
            return Err(InstallError::BadInput(
                "DelDuplicate requires exactly two extension strings in source".to_string(),
            ));
        }
        let [ext_a, ext_b] = [instr.source[0].trim_start_matches('.'), instr.source[1].trim_start_matches('.')];
        let victim_ext = instr.arguments.trim_start_matches('.');
        let keep_ext = if victim_ext.eq_ignore_ascii_case(ext_a) {
            ext_b
        } else if victim_ext.eq_ignore_ascii_case(ext_b) {
            ext_a
        } else {
            return Err(InstallError::BadInput(format!(
                "DelDuplicate arguments {victim_ext} does not match either source extension"
            )));
        };

        let dir = self.resolve_dest(&instr.destination)?;
        let entries = provider.enumerate_files(&dir, false)?;

        let mut stems_with_keep_ext: BTreeSet<String> = BTreeSet::new();
        for entry in &entries {
            if entry.extension().map(|e| e.eq_ignore_ascii_case(keep_ext)).unwrap_or(false) {
                if let Some(stem) = entry.file_stem() {
                    stems_with_keep_ext.insert(stem.to_lowercase());
                }
            }
        }

        for entry in &entries {
            let is_victim = entry.extension().map(|e| e.eq_ignore_ascii_case(victim_ext)).unwrap_or(false);
            if !is_victim {
                continue;
            }
            let Some(stem) = entry.file_stem() else { continue };
            if stems_with_keep_ext.contains(&stem.to_lowercase()) {
                provider.delete(entry, true)?;
            }
        }
        Ok(ActionExitCode::Success)
    }

    #[allow(clippy::too_many_arguments)]
    fn do_choose(
        &self,
        options: &[crate::models::ids::OptionId],
        components: &[Component],
        selected: &BTreeSet<ComponentId>,
        owner: &Component,
        provider: &mut dyn FsProvider,
        skip_dep_check: bool,
        cancel: &CancelToken,
    ) -> Result<ActionExitCode, InstallError> {
        let mut excluded = BTreeSet::new();
        for &opt_id in options {
            let Some(opt) = owner.option(opt_id) else { continue };
            if !opt.selected {
                continue;
            }
            if excluded.contains(&opt_id) {
                provider.record_issue(
                    ValidationIssue::new(
                        Severity::Warning,
                        "Choose",
                        format!("option {opt_id} ignored: conflicts with an earlier selection in its restriction group"),
                    )
                    .with_path(Utf8PathBuf::from(owner.name.clone())),
                );
                continue;
            }
            excluded.insert(opt_id);
            excluded.extend(opt.restrictions.iter().copied());

            for (sub_index, sub_instr) in opt.instructions.iter().enumerate() {
                let code = self.execute_single_instruction(
                    sub_instr,
                    sub_index,
                    components,
                    selected,
                    owner,
                    provider,
                    skip_dep_check,
                    cancel,
                );
                if code != ActionExitCode::Success {
                    return Ok(code);
                }
            }
        }
        Ok(ActionExitCode::Success)
    }

    fn do_run(
        &self,
        executable: &Utf8Path,
        instr: &Instruction,
        provider: &mut dyn FsProvider,
        _is_patcher: bool,
    ) -> Result<ActionExitCode, InstallError> {
        let _ = provider;
        let exe = resolver::resolve(executable.as_str(), self.ctx, DefaultRoot::Dest)?;
        let working_dir = if instr.destination.is_empty() {
            self.ctx.dest_root.clone()
        } else {
            self.resolve_dest(&instr.destination)?
        };
        let args: Vec<String> = instr.arguments.split_whitespace().map(str::to_string).collect();

        let code = self.process_runner.run(&exe, &working_dir, &args)?;
        if code == 0 {
            Ok(ActionExitCode::Success)
        } else {
            Err(InstallError::IoFailure(format!("process exited with code {code}")))
        }
    }
}

