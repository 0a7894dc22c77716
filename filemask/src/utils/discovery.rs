// filemask/src/utils/discovery.rs
//! Input discovery: expands the INPUT argument into a sorted list of files,
//! filters it by extension, locates the rule file, and plans output paths.

use anyhow::{Context, Result};
use log::{debug, warn};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Suffix added to the file stem of every masked output.
pub const MASKED_SUFFIX: &str = "_masked";

/// Problems that stop a run before any file is touched.
#[derive(Debug, Error)]
pub enum DiscoveryError {
    #[error("No input files found for '{0}'.")]
    NoInputs(String),

    #[error("No .json rule file found in {0}. Use --config.")]
    NoRuleFile(String),

    #[error("Several .json files in {dir} ({names}); pick one with --config.")]
    AmbiguousRuleFile { dir: String, names: String },
}

/// One unit of work: where to read and where to write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilePlan {
    pub input: PathBuf,
    pub output: PathBuf,
}

/// Expands `input` into files. A file is taken as is, a directory contributes
/// its regular files (not recursively), and anything else is treated as a
/// glob whose matched directories contribute their files the same way.
pub fn collect_inputs(input: &str) -> Result<Vec<PathBuf>> {
    let path = Path::new(input);
    let mut files = if path.is_file() {
        vec![path.to_path_buf()]
    } else if path.is_dir() {
        files_in_dir(path)?
    } else {
        expand_glob(input)?
    };

    files.sort();
    files.dedup();
    debug!("Input '{}' expanded to {} file(s).", input, files.len());
    Ok(files)
}

fn files_in_dir(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    let entries =
        fs::read_dir(dir).with_context(|| format!("Failed to list directory {}", dir.display()))?;
    for entry in entries {
        let entry = entry.with_context(|| format!("Failed to list directory {}", dir.display()))?;
        let path = entry.path();
        if path.is_file() {
            files.push(path);
        }
    }
    Ok(files)
}

fn expand_glob(pattern: &str) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    let paths =
        glob::glob(pattern).with_context(|| format!("Invalid input pattern '{}'", pattern))?;
    for entry in paths {
        match entry {
            Ok(path) if path.is_file() => files.push(path),
            Ok(path) if path.is_dir() => files.extend(files_in_dir(&path)?),
            Ok(_) => {}
            Err(e) => warn!("Skipping unreadable path while expanding '{}': {}", pattern, e),
        }
    }
    Ok(files)
}

/// Normalizes `--ext` values: lowercase, leading dot stripped, blanks dropped.
pub fn normalize_extensions(raw: &[String]) -> Vec<String> {
    let mut exts: Vec<String> = raw
        .iter()
        .flat_map(|value| value.split(','))
        .map(|ext| ext.trim().trim_start_matches('.').to_ascii_lowercase())
        .filter(|ext| !ext.is_empty())
        .collect();
    exts.sort();
    exts.dedup();
    exts
}

fn has_extension(path: &Path, ext: &str) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case(ext))
        .unwrap_or(false)
}

/// Keeps files whose extension is one of `exts`. An empty filter keeps all.
pub fn filter_by_extension(files: Vec<PathBuf>, exts: &[String]) -> Vec<PathBuf> {
    if exts.is_empty() {
        return files;
    }
    files
        .into_iter()
        .filter(|f| exts.iter().any(|ext| has_extension(f, ext)))
        .collect()
}

/// Removes JSON files from the inputs. Used when the rule file was located
/// automatically, since it lives among the inputs.
pub fn exclude_json(files: Vec<PathBuf>) -> Vec<PathBuf> {
    files.into_iter().filter(|f| !has_extension(f, "json")).collect()
}

/// Returns the rule file to use: `explicit` if given, otherwise the single
/// `.json` file in the directory of the first input.
pub fn resolve_config_path(explicit: Option<&Path>, inputs: &[PathBuf]) -> Result<PathBuf> {
    if let Some(path) = explicit {
        return Ok(path.to_path_buf());
    }

    let Some(first) = inputs.first() else {
        return Err(DiscoveryError::NoRuleFile(".".to_string()).into());
    };
    let dir = match first.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };

    let mut candidates: Vec<PathBuf> = files_in_dir(&dir)?
        .into_iter()
        .filter(|f| has_extension(f, "json"))
        .collect();
    candidates.sort();

    match candidates.len() {
        0 => Err(DiscoveryError::NoRuleFile(dir.display().to_string()).into()),
        1 => Ok(candidates.remove(0)),
        _ => {
            let names: Vec<String> = candidates
                .iter()
                .filter_map(|c| c.file_name().map(|n| n.to_string_lossy().into_owned()))
                .collect();
            Err(DiscoveryError::AmbiguousRuleFile {
                dir: dir.display().to_string(),
                names: names.join(", "),
            }
            .into())
        }
    }
}

/// `<stem>_masked<.ext>`, either beside the input or in `outdir`.
pub fn masked_output_path(input: &Path, outdir: Option<&Path>) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let name = match input.extension() {
        Some(ext) => format!("{}{}.{}", stem, MASKED_SUFFIX, ext.to_string_lossy()),
        None => format!("{}{}", stem, MASKED_SUFFIX),
    };
    match outdir {
        Some(dir) => dir.join(name),
        None => input.with_file_name(name),
    }
}

/// Pairs every input with its output path. An explicit `output` applies only
/// when there is exactly one input.
pub fn plan_outputs(inputs: Vec<PathBuf>, output: Option<&Path>, outdir: Option<&Path>) -> Vec<FilePlan> {
    if let (Some(output), 1) = (output, inputs.len()) {
        return inputs
            .into_iter()
            .map(|input| FilePlan {
                input,
                output: output.to_path_buf(),
            })
            .collect();
    }
    if output.is_some() {
        warn!("OUTPUT is ignored because INPUT matched {} files.", inputs.len());
    }
    inputs
        .into_iter()
        .map(|input| {
            let output = masked_output_path(&input, outdir);
            FilePlan { input, output }
        })
        .collect()
}
