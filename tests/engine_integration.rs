use std::collections::BTreeMap;
use std::fs;
use std::io::Write;

use camino::Utf8PathBuf;
use mod_install_engine::core::engine::{execute_batch, CancelToken};
use mod_install_engine::core::ordering::confirm_components_install_order;
use mod_install_engine::core::process::RealProcessRunner;
use mod_install_engine::core::real_fs::RealFsProvider;
use mod_install_engine::core::resolver::ResolverContext;
use mod_install_engine::models::component::Component;
use mod_install_engine::models::exit_code::ActionExitCode;
use mod_install_engine::models::instruction::{Action, Instruction, Overwrite};

fn root() -> (tempfile::TempDir, Utf8PathBuf) {
    let tmp = tempfile::tempdir().unwrap();
    let root = Utf8PathBuf::from_path_buf(tmp.path().to_path_buf()).unwrap();
    (tmp, root)
}

fn ctx(root: &Utf8PathBuf) -> ResolverContext {
    ResolverContext {
        source_root: root.join("mods"),
        dest_root: root.join("game"),
        temp_root: root.join("tmp"),
    }
}

#[test]
fn move_instruction_relocates_a_real_file() {
    let (_tmp, root) = root();
    let c = ctx(&root);
    fs::create_dir_all(&c.source_root).unwrap();
    fs::create_dir_all(c.dest_root.join("Override")).unwrap();
    fs::write(c.source_root.join("mod.tpc"), b"data").unwrap();

    let mut component = Component::new("Loose Texture Mod");
    component.selected = true;
    let mut instr = Instruction::new(Action::Move);
    instr.source = vec!["<<modDirectory>>/mod.tpc".to_string()];
    instr.destination = "<<kotorDirectory>>/Override".to_string();
    component.instructions.push(instr);
    let id = component.id;

    let runner = RealProcessRunner;
    let mut provider = RealFsProvider::new();
    let outcome = execute_batch(&[component], &c, &runner, &mut provider, &CancelToken::new()).unwrap();

    assert_eq!(outcome.exit_codes.get(&id), Some(&ActionExitCode::Success));
    assert!(c.dest_root.join("Override/mod.tpc").is_file());
    assert!(!c.source_root.join("mod.tpc").exists());
}

#[test]
fn clean_list_deletes_matched_files_and_mandatory_rows_only() {
    let (_tmp, root) = root();
    let c = ctx(&root);
    fs::create_dir_all(&c.source_root).unwrap();
    let override_dir = c.dest_root.join("Override");
    fs::create_dir_all(&override_dir).unwrap();

    for name in ["C_DrdAstro01.tpc", "C_DrdAstro02.tpc", "Unrelated_KeepMe.tpc", "old_manifest.txt"] {
        fs::write(override_dir.join(name), b"x").unwrap();
    }
    let csv = "HD Astromech Droids - Dark Hope Edition,C_DrdAstro01.tpc,C_DrdAstro02.tpc\nMandatory Legacy Cleanup,old_manifest.txt\n";
    fs::write(c.source_root.join("cleanlist.csv"), csv).unwrap();

    let mut component = Component::new("HD Astromech Droids");
    component.selected = true;
    let mut instr = Instruction::new(Action::CleanList);
    instr.source = vec!["<<modDirectory>>/cleanlist.csv".to_string()];
    instr.destination = "<<kotorDirectory>>/Override".to_string();
    component.instructions.push(instr);
    let id = component.id;

    let runner = RealProcessRunner;
    let mut provider = RealFsProvider::new();
    let outcome = execute_batch(&[component], &c, &runner, &mut provider, &CancelToken::new()).unwrap();

    assert_eq!(outcome.exit_codes.get(&id), Some(&ActionExitCode::Success));
    assert!(!override_dir.join("C_DrdAstro01.tpc").exists());
    assert!(!override_dir.join("C_DrdAstro02.tpc").exists());
    assert!(!override_dir.join("old_manifest.txt").exists());
    assert!(override_dir.join("Unrelated_KeepMe.tpc").exists());
}

#[test]
fn auto_extract_fallback_materializes_a_missing_source_from_the_resource_registry() {
    let (_tmp, root) = root();
    let c = ctx(&root);
    fs::create_dir_all(&c.source_root).unwrap();
    fs::create_dir_all(&c.dest_root).unwrap();

    let archive_path = c.source_root.join("resource.zip").into_std_path_buf();
    let file = fs::File::create(&archive_path).unwrap();
    let mut writer = zip::ZipWriter::new(file);
    let options = zip::write::SimpleFileOptions::default();
    writer.start_file("missing.dat", options).unwrap();
    writer.write_all(b"payload").unwrap();
    writer.finish().unwrap();

    let mut component = Component::new("Auto-extract Mod");
    component.selected = true;
    let mut required = BTreeMap::new();
    required.insert("missing.dat".to_string(), true);
    component.resources.insert("resource.zip".to_string(), required);

    let mut instr = Instruction::new(Action::Move);
    instr.source = vec!["<<modDirectory>>/missing.dat".to_string()];
    instr.destination = "<<kotorDirectory>>".to_string();
    component.instructions.push(instr);
    let id = component.id;

    let runner = RealProcessRunner;
    let mut provider = RealFsProvider::new();
    let outcome = execute_batch(&[component], &c, &runner, &mut provider, &CancelToken::new()).unwrap();

    assert_eq!(outcome.exit_codes.get(&id), Some(&ActionExitCode::Success));
    assert!(c.dest_root.join("missing.dat").is_file());
}

#[test]
fn overwrite_false_guard_leaves_destination_untouched() {
    let (_tmp, root) = root();
    let c = ctx(&root);
    fs::create_dir_all(&c.source_root).unwrap();
    fs::create_dir_all(&c.dest_root).unwrap();
    fs::write(c.source_root.join("src.txt"), b"new").unwrap();
    fs::write(c.dest_root.join("dst.txt"), b"original").unwrap();

    let mut component = Component::new("Conflicting Mod");
    component.selected = true;
    let mut instr = Instruction::new(Action::Copy);
    instr.source = vec!["<<modDirectory>>/src.txt".to_string()];
    instr.destination = "<<kotorDirectory>>/dst.txt".to_string();
    instr.overwrite = Overwrite::False;
    component.instructions.push(instr);
    let id = component.id;

    let runner = RealProcessRunner;
    let mut provider = RealFsProvider::new();
    let outcome = execute_batch(&[component], &c, &runner, &mut provider, &CancelToken::new()).unwrap();

    // The Real provider enforces overwrite strictly (spec.md §4.B table),
    // unlike the Virtual provider's advisory-only Warning discipline.
    assert_eq!(outcome.exit_codes.get(&id), Some(&ActionExitCode::AlreadyExists));
    assert_eq!(fs::read_to_string(c.dest_root.join("dst.txt")).unwrap(), "original");
}

#[test]
fn install_after_reorders_components_before_batch_execution() {
    let mut first = Component::new("installs second logically");
    let mut second = Component::new("installs first logically");
    second.install_after.insert(first.id);
    first.install_before.insert(second.id);

    // Deliberately submitted out of dependency order.
    let input = vec![second.clone(), first.clone()];
    let (already_ordered, ordered) = confirm_components_install_order(&input).unwrap();

    assert!(!already_ordered);
    assert_eq!(ordered[0].id, first.id);
    assert_eq!(ordered[1].id, second.id);
}
