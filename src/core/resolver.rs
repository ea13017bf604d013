//! Path resolution & wildcard expansion (spec.md component A).
//!
//! Deterministic, case-aware matching that must behave identically
//! whether the caller's `enumerate_fn` is backed by the real or the
//! virtual filesystem provider (spec.md §8 "wildcard parity").

use camino::{Utf8Path, Utf8PathBuf};
use regex::RegexBuilder;

use crate::models::error::InstallError;

const MOD_DIRECTORY: &str = "<<modDirectory>>";
const KOTOR_DIRECTORY: &str = "<<kotorDirectory>>";
const TEMP_DIR: &str = "%temp%";

/// The three ambient roots a resolve call may need. Passed explicitly
/// rather than read from globals (spec.md §9 design note).
#[derive(Clone, Debug)]
pub struct ResolverContext {
    pub source_root: Utf8PathBuf,
    pub dest_root: Utf8PathBuf,
    pub temp_root: Utf8PathBuf,
}

/// Which root a still-relative path (after placeholder substitution)
/// should be combined with. The spec's placeholders disambiguate most
/// paths explicitly; this only matters for a bare relative path with
/// no placeholder at all, and the interpreter picks it based on
/// whether it's resolving a source (source root) or a destination
/// (dest root).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DefaultRoot {
    Source,
    Dest,
    Temp,
}

fn substitute_placeholders(path: &str, ctx: &ResolverContext) -> Result<String, InstallError> {
    let mut out = path.to_string();
    out = out.replace(MOD_DIRECTORY, ctx.source_root.as_str());
    out = out.replace(KOTOR_DIRECTORY, ctx.dest_root.as_str());
    out = out.replace(TEMP_DIR, ctx.temp_root.as_str());

    // Any remaining `<<...>>` token is a reserved, unrecognized
    // placeholder and is fatal per spec.md §6.
    if let (Some(start), Some(end)) = (out.find("<<"), out.find(">>")) {
        if start < end {
            return Err(InstallError::BadInput(format!(
                "unknown placeholder in path: {}",
                &out[start..end + 2]
            )));
        }
    }

    Ok(out)
}

fn normalize_separators(path: &str) -> String {
    path.replace(['/', '\\'], std::path::MAIN_SEPARATOR_STR)
}

/// Substitutes placeholders, normalizes separators, then combines with
/// `default_root` if the result is still relative.
pub fn resolve(
    path: &str,
    ctx: &ResolverContext,
    default_root: DefaultRoot,
) -> Result<Utf8PathBuf, InstallError> {
    let substituted = substitute_placeholders(path, ctx)?;
    let normalized = normalize_separators(&substituted);
    let candidate = Utf8PathBuf::from(normalized);

    if candidate.is_absolute() {
        return Ok(candidate);
    }

    let root = match default_root {
        DefaultRoot::Source => &ctx.source_root,
        DefaultRoot::Dest => &ctx.dest_root,
        DefaultRoot::Temp => &ctx.temp_root,
    };
    Ok(root.join(candidate))
}

fn has_wildcard(pattern: &str) -> bool {
    pattern.contains('*') || pattern.contains('?')
}

/// Translates a single path-segment wildcard pattern (`*`, `?`) into an
/// anchored, case-insensitive regex. `*` matches any run excluding the
/// path separator; `?` matches exactly one non-separator character.
fn wildcard_to_regex(segment: &str) -> Result<regex::Regex, InstallError> {
    let mut pattern = String::from("^");
    for ch in segment.chars() {
        match ch {
            '*' => pattern.push_str("[^/\\\\]*"),
            '?' => pattern.push_str("[^/\\\\]"),
            c => pattern.push_str(&regex::escape(&c.to_string())),
        }
    }
    pattern.push('$');

    RegexBuilder::new(&pattern)
        .case_insensitive(true)
        .build()
        .map_err(|e| InstallError::BadInput(format!("invalid wildcard pattern: {e}")))
}

/// Expands a single already-resolved absolute path pattern against
/// directory contents produced by `enumerate_fn`, which is handed the
/// parent directory and must return the absolute paths of its direct
/// children (real or virtual — the matcher is identical either way).
///
/// Patterns apply only to the final path segment; everything before
/// the last separator is treated as a literal directory.
pub fn expand_wildcards(
    pattern: &Utf8Path,
    enumerate_fn: impl Fn(&Utf8Path) -> Result<Vec<Utf8PathBuf>, InstallError>,
) -> Result<Vec<Utf8PathBuf>, InstallError> {
    if !has_wildcard(pattern.as_str()) {
        return Ok(vec![pattern.to_path_buf()]);
    }

    let file_pattern = pattern
        .file_name()
        .ok_or_else(|| InstallError::BadInput(format!("pattern has no file name: {pattern}")))?;
    let dir = pattern
        .parent()
        .ok_or_else(|| InstallError::BadInput(format!("pattern has no parent dir: {pattern}")))?;

    let matcher = wildcard_to_regex(file_pattern)?;

    let mut matches: Vec<Utf8PathBuf> = enumerate_fn(dir)?
        .into_iter()
        .filter(|candidate| {
            candidate
                .file_name()
                .map(|name| matcher.is_match(name))
                .unwrap_or(false)
        })
        .collect();

    matches.sort();
    Ok(matches)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> ResolverContext {
        ResolverContext {
            source_root: Utf8PathBuf::from("/mods"),
            dest_root: Utf8PathBuf::from("/game"),
            temp_root: Utf8PathBuf::from("/tmp"),
        }
    }

    #[test]
    fn substitutes_known_placeholders() {
        let resolved = resolve("<<modDirectory>>/Data/x.tpc", &ctx(), DefaultRoot::Source).unwrap();
        assert_eq!(resolved, Utf8PathBuf::from("/mods/Data/x.tpc"));
    }

    #[test]
    fn unknown_placeholder_is_bad_input() {
        let err = resolve("<<unknownToken>>/x", &ctx(), DefaultRoot::Source).unwrap_err();
        assert!(matches!(err, InstallError::BadInput(_)));
    }

    #[test]
    fn relative_path_joins_default_root() {
        let resolved = resolve("Override/x.tpc", &ctx(), DefaultRoot::Dest).unwrap();
        assert_eq!(resolved, Utf8PathBuf::from("/game/Override/x.tpc"));
    }

    #[test]
    fn no_wildcard_returns_pattern_unchanged_even_if_missing() {
        let result = expand_wildcards(Utf8Path::new("/mods/missing.tpc"), |_| Ok(vec![])).unwrap();
        assert_eq!(result, vec![Utf8PathBuf::from("/mods/missing.tpc")]);
    }

    #[test]
    fn wildcard_matches_case_insensitively_and_excludes_separator() {
        let entries = vec![
            Utf8PathBuf::from("/mods/Data/FOO.TPC"),
            Utf8PathBuf::from("/mods/Data/bar.tpc"),
            Utf8PathBuf::from("/mods/Data/foo.txt"),
        ];
        let result = expand_wildcards(Utf8Path::new("/mods/Data/*.tpc"), |dir| {
            assert_eq!(dir, Utf8Path::new("/mods/Data"));
            Ok(entries.clone())
        })
        .unwrap();
        assert_eq!(
            result,
            vec![
                Utf8PathBuf::from("/mods/Data/FOO.TPC"),
                Utf8PathBuf::from("/mods/Data/bar.tpc"),
            ]
        );
    }

    #[test]
    fn question_mark_matches_exactly_one_character() {
        let entries = vec![
            Utf8PathBuf::from("/mods/a1.tpc"),
            Utf8PathBuf::from("/mods/a12.tpc"),
        ];
        let result =
            expand_wildcards(Utf8Path::new("/mods/a?.tpc"), |_| Ok(entries.clone())).unwrap();
        assert_eq!(result, vec![Utf8PathBuf::from("/mods/a1.tpc")]);
    }
}
