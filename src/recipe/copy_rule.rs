//! Copy rule describing which unpacked files land where in the package.

use serde::Serialize;

/// A pattern-to-destination mapping applied during `package`
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct CopyRule {
    /// Glob matched against each file's path relative to `source_dir`.
    /// `*` also matches `/`, so `*.cmake` reaches nested files.
    pub pattern: String,
    /// Directory under the output root; empty means the root itself
    pub destination_dir: String,
    /// Directory under the working directory to search
    pub source_dir: String,
    /// Keep the file's relative subpath under `destination_dir`
    pub preserve_path_structure: bool,
}

impl CopyRule {
    pub fn new(
        pattern: impl Into<String>,
        destination_dir: impl Into<String>,
        source_dir: impl Into<String>,
        preserve_path_structure: bool,
    ) -> Self {
        Self {
            pattern: pattern.into(),
            destination_dir: destination_dir.into(),
            source_dir: source_dir.into(),
            preserve_path_structure,
        }
    }
}
