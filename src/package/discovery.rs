use anyhow::Result;
use log::debug;
use std::path::{Path, PathBuf};

use crate::runtime::Runtime;

/// Find every non-directory entry under `root`, recursively.
///
/// Symlinked directories are not descended into, so a link cycle cannot
/// stall the walk. Results are sorted so repeated runs copy in the same
/// order.
#[tracing::instrument(skip(runtime, root))]
pub fn find_all_files<R: Runtime>(runtime: &R, root: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    let mut pending = vec![root.to_path_buf()];

    while let Some(dir) = pending.pop() {
        for entry in runtime.read_dir(&dir)? {
            if runtime.is_dir(&entry) {
                if runtime.is_symlink(&entry) {
                    debug!("Skipping symlinked directory {:?}", entry);
                    continue;
                }
                pending.push(entry);
            } else {
                files.push(entry);
            }
        }
    }

    files.sort();
    Ok(files)
}
