//! School Builder Library
//!
//! File-level workflows over the school database:
//! school.txt → reclassified school.txt (stage column)
//! school.txt + merge_preview.txt → merged school.txt
//! school.txt → school.json → static bundle + SHA-512 manifest
//!
//! Every workflow reads one snapshot and writes a different path; the input
//! file is never rewritten in place.

pub mod bundle;

use anyhow::{bail, Context, Result};
use school_core::{
    merge, reclassify, ClassifiedSchool, Classifier, DatabaseFormat, LoadStats, MergeScript,
    MergeSummary, ReclassifyReport, Ruleset, SchoolStore,
};
use std::fs;
use std::path::Path;

pub use bundle::{build_bundle, verify_bundle, BundleInfo, BundlePaths};

/// Load the ruleset from `path`, or the embedded one
pub fn load_ruleset(path: Option<&Path>) -> Result<Ruleset> {
    match path {
        Some(path) => Ruleset::from_path(path)
            .with_context(|| format!("Failed to load ruleset: {}", path.display())),
        None => Ok(Ruleset::builtin().clone()),
    }
}

/// Read and parse a database file
pub fn load_store(path: &Path, format: DatabaseFormat) -> Result<SchoolStore> {
    load_store_with_stats(path, format).map(|(store, _)| store)
}

/// Read and parse a database file, keeping the load statistics
pub fn load_store_with_stats(path: &Path, format: DatabaseFormat) -> Result<(SchoolStore, LoadStats)> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read school database: {}", path.display()))?;
    SchoolStore::load_with_stats(&text, format)
        .with_context(|| format!("Invalid school database: {}", path.display()))
}

/// Classify every record of `input` and write the staged database to `output`
pub fn reclassify_file(
    input: &Path,
    input_format: DatabaseFormat,
    output: &Path,
    ruleset: &Ruleset,
) -> Result<ReclassifyReport> {
    ensure_distinct(input, output)?;
    let (mut store, stats) = load_store_with_stats(input, input_format)?;

    let mut report = reclassify(&mut store, &Classifier::new(ruleset));
    report.unknown_provinces = stats.unknown_provinces;

    write_file(output, store.dump_as(DatabaseFormat::Staged).as_bytes())?;
    Ok(report)
}

/// Apply the merge commands of `commands` to `database`, writing to `output`
///
/// Nothing is written when any command fails.
pub fn merge_file(
    database: &Path,
    format: DatabaseFormat,
    commands: &Path,
    output: &Path,
) -> Result<MergeSummary> {
    ensure_distinct(database, output)?;
    let mut store = load_store(database, format)?;

    let text = fs::read_to_string(commands)
        .with_context(|| format!("Failed to read merge commands: {}", commands.display()))?;
    let script = MergeScript::parse(&text)
        .with_context(|| format!("Invalid merge commands: {}", commands.display()))?;

    let summary = merge::apply(&script, &mut store)
        .with_context(|| format!("Merge aborted, {} left unchanged", output.display()))?;

    write_file(output, store.dump().as_bytes())?;
    Ok(summary)
}

/// Write the classified-schools JSON consumed by the bundler
///
/// Plain databases are classified on the fly; staged ones are exported as
/// stored. Returns the number of exported schools.
pub fn export_schools(
    input: &Path,
    input_format: DatabaseFormat,
    output: &Path,
    ruleset: &Ruleset,
) -> Result<usize> {
    ensure_distinct(input, output)?;
    let mut store = load_store(input, input_format)?;

    if input_format == DatabaseFormat::Plain {
        reclassify(&mut store, &Classifier::new(ruleset));
    }

    let schools: Vec<ClassifiedSchool> = store.records().iter().map(ClassifiedSchool::from).collect();
    let json = serde_json::to_vec(&schools).context("Failed to serialize schools")?;
    write_file(output, &json)?;
    Ok(schools.len())
}

/// Write `bytes`, creating parent directories
pub fn write_file(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create output directory: {}", parent.display()))?;
    }
    fs::write(path, bytes)
        .with_context(|| format!("Failed to write output file: {}", path.display()))
}

fn ensure_distinct(input: &Path, output: &Path) -> Result<()> {
    let same = match (fs::canonicalize(input), fs::canonicalize(output)) {
        (Ok(a), Ok(b)) => a == b,
        _ => input == output,
    };
    if same {
        bail!(
            "Output {} would overwrite input {}",
            output.display(),
            input.display()
        );
    }
    Ok(())
}
