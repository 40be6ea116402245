//! Copy engine that turns an unpacked source tree into a package layout.
//!
//! Rules are plain data ([`CopyRule`]); this module only knows how to apply
//! them. Files that match no rule are skipped without error.

mod discovery;

use anyhow::{Context, Result, anyhow, bail};
use glob::{MatchOptions, Pattern};
use log::{debug, info};
use std::path::{Component, Path, PathBuf};

use crate::error::RecipeError;
use crate::recipe::CopyRule;
use crate::runtime::{Runtime, is_path_under, relative_path_from_dir};

pub use discovery::find_all_files;

/// `*` crosses directory separators and matching is case sensitive
const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: false,
    require_literal_leading_dot: false,
};

/// One file placed in the output directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CopiedFile {
    /// Pattern of the rule that selected the file
    pub pattern: String,
    pub source: PathBuf,
    /// Destination path relative to the output directory
    pub destination: PathBuf,
}

/// Everything `package` copied, in rule order
#[derive(Debug, Default)]
pub struct PackageReport {
    pub copied: Vec<CopiedFile>,
}

impl PackageReport {
    pub fn len(&self) -> usize {
        self.copied.len()
    }

    pub fn is_empty(&self) -> bool {
        self.copied.is_empty()
    }

    pub fn destinations(&self) -> impl Iterator<Item = &Path> {
        self.copied.iter().map(|c| c.destination.as_path())
    }
}

/// Apply `rules` in order, copying from `work_dir` into `output_dir`.
#[tracing::instrument(skip(runtime, rules))]
pub fn apply_rules<R: Runtime>(
    runtime: &R,
    rules: &[CopyRule],
    work_dir: &Path,
    output_dir: &Path,
) -> Result<PackageReport> {
    let mut report = PackageReport::default();
    for rule in rules {
        let copied = copy_matching(runtime, rule, work_dir, output_dir)?;
        info!(
            "Rule '{}' -> '{}': {} file(s)",
            rule.pattern,
            rule.destination_dir,
            copied.len()
        );
        report.copied.extend(copied);
    }
    Ok(report)
}

/// Copy every file under `work_dir/<rule.source_dir>` whose relative path matches `rule.pattern`.
pub fn copy_matching<R: Runtime>(
    runtime: &R,
    rule: &CopyRule,
    work_dir: &Path,
    output_dir: &Path,
) -> Result<Vec<CopiedFile>> {
    let source_root = work_dir.join(&rule.source_dir);
    if !runtime.is_dir(&source_root) {
        return Err(RecipeError::NotFound(source_root).into());
    }

    let pattern = Pattern::new(&rule.pattern)
        .with_context(|| format!("Invalid copy pattern '{}'", rule.pattern))?;

    let dest_root = output_dir.join(&rule.destination_dir);
    if !is_path_under(&dest_root, output_dir) {
        bail!(
            "Destination '{}' escapes the output directory",
            rule.destination_dir
        );
    }

    let files = find_all_files(runtime, &source_root)
        .map_err(|e| RecipeError::io(&source_root, e))?;

    let mut copied = Vec::new();
    for file in files {
        let relative = relative_path_from_dir(&source_root, &file).ok_or_else(|| {
            anyhow!(
                "Cannot express {:?} relative to {:?}",
                file,
                source_root
            )
        })?;

        if !pattern.matches_with(&match_key(&relative), MATCH_OPTIONS) {
            continue;
        }

        let destination = if rule.preserve_path_structure {
            dest_root.join(&relative)
        } else {
            match file.file_name() {
                Some(name) => dest_root.join(name),
                None => continue,
            }
        };

        if let Some(parent) = destination.parent() {
            runtime
                .create_dir_all(parent)
                .map_err(|e| RecipeError::io(parent, e))?;
        }
        runtime.copy(&file, &destination).map_err(|e| {
            RecipeError::io(
                &destination,
                format!("copy from {}: {:#}", file.display(), e),
            )
        })?;
        debug!("Copied {:?} -> {:?}", file, destination);

        let destination = relative_path_from_dir(output_dir, &destination).unwrap_or(destination);
        copied.push(CopiedFile {
            pattern: rule.pattern.clone(),
            source: file,
            destination,
        });
    }

    Ok(copied)
}

/// Relative path rendered with `/` separators on every platform
fn match_key(relative: &Path) -> String {
    relative
        .components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}
