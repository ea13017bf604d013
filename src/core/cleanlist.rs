//! `CleanList` instruction support (spec.md §4.C, §6): a hand-rolled
//! CSV reader (no quoting, per the format's own definition) paired with
//! fuzzy component-name matching so a row survives minor author-vs-
//! catalogue name drift.

use strsim::jaro_winkler;

use crate::core::fs_provider::FsProvider;
use crate::core::interpreter::Interpreter;
use crate::models::error::InstallError;
use crate::models::exit_code::ActionExitCode;
use crate::models::instruction::Instruction;

/// Runs a `CleanList` instruction: `instr.source[0]` is the CSV path,
/// `instr.destination` the directory the listed basenames live under.
/// `selected_component_names` drives the fuzzy-match gate; rows whose
/// name begins with `Mandatory` (case-insensitive) always apply.
pub fn clean_list(
    interpreter: &Interpreter,
    instr: &Instruction,
    selected_component_names: &[&str],
    provider: &mut dyn FsProvider,
) -> Result<ActionExitCode, InstallError> {
    if instr.source.len() != 1 {
        return Err(InstallError::BadInput(
            "CleanList requires exactly one source: the CSV path".to_string(),
        ));
    }
    let csv_path = interpreter.resolve_source(&instr.source[0])?;
    if !provider.file_exists(&csv_path) {
        return Err(InstallError::FileNotFoundPre(csv_path.to_string()));
    }
    let bytes = provider.read_all_bytes(&csv_path)?;
    let text = String::from_utf8(bytes)
        .map_err(|e| InstallError::Unexpected(format!("CleanList CSV is not valid UTF-8: {e}")))?;

    let dest_dir = interpreter.resolve_dest(&instr.destination)?;

    for row in parse_rows(&text) {
        let matches = row.mod_name.to_ascii_lowercase().starts_with("mandatory")
            || selected_component_names
                .iter()
                .any(|name| fuzzy_matches(name, &row.mod_name, interpreter.fuzzy_threshold));

        if !matches {
            continue;
        }
        for file in &row.files {
            let target = dest_dir.join(file);
            provider.delete(&target, true)?;
        }
    }

    Ok(ActionExitCode::Success)
}

struct Row {
    mod_name: String,
    files: Vec<String>,
}

/// Splits UTF-8 text into CSV rows, tolerating both LF and CRLF line
/// endings (spec.md §6). The format has no quoting, so a plain split
/// on commas is faithful.
fn parse_rows(text: &str) -> Vec<Row> {
    text.lines()
        .map(|l| l.trim_end_matches('\r'))
        .filter(|l| !l.trim().is_empty())
        .filter_map(|line| {
            let mut fields = line.split(',');
            let mod_name = fields.next()?.to_string();
            let files = fields.map(str::to_string).collect();
            Some(Row { mod_name, files })
        })
        .collect()
}

fn fuzzy_matches(component_name: &str, mod_name: &str, threshold: f64) -> bool {
    let a = component_name.to_lowercase();
    let b = mod_name.to_lowercase();
    if a.contains(&b) || b.contains(&a) {
        return true;
    }
    jaro_winkler(&a, &b) >= threshold
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fuzzy_match_accepts_substring_either_direction() {
        assert!(fuzzy_matches("Astromech", "HD Astromechs by Dark Hope", 0.85));
    }

    #[test]
    fn fuzzy_match_rejects_unrelated_names() {
        assert!(!fuzzy_matches("Totally Unrelated Mod", "HD Astromechs by Dark Hope", 0.85));
    }

    #[test]
    fn fuzzy_match_tolerates_minor_drift_via_jaro_winkler() {
        assert!(fuzzy_matches("HD Astromech Droids", "HD Astromech Droid", 0.85));
    }

    #[test]
    fn parse_rows_tolerates_crlf_and_blank_lines() {
        let text = "HD Astromechs by Dark Hope,a.tpc,b.tpc\r\n\r\nMandatory Cleanup,c.tpc\n";
        let rows = parse_rows(text);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].files, vec!["a.tpc", "b.tpc"]);
        assert_eq!(rows[1].mod_name, "Mandatory Cleanup");
    }
}
