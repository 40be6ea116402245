//! The `verapp-target-cmake` recipe descriptor.
//!
//! A [`Recipe`] carries immutable identity metadata and implements the two
//! lifecycle hooks an orchestrator calls in order: [`Recipe::fetch`] then
//! [`Recipe::package`].

mod copy_rule;
mod dependency;

use anyhow::Result;
use log::{info, warn};
use serde::Serialize;
use std::path::{Path, PathBuf};

use crate::archive::ArchiveExtractor;
use crate::cleanup::{CleanupGuard, SharedCleanupContext};
use crate::download::download_file;
use crate::error::RecipeError;
use crate::http::HttpClient;
use crate::package::{self, PackageReport};
use crate::runtime::Runtime;

pub use copy_rule::CopyRule;
pub use dependency::DependencyRef;

pub const RECIPE_NAME: &str = "verapp-target-cmake";

/// Version used when no override is supplied
pub const DEFAULT_VERSION: &str = "0.0.2";

/// Environment variable the CLI binds to the version override
pub const VERSION_OVERRIDE_ENV: &str = "CONAN_VERSION_OVERRIDE";

pub const LICENSE: &str = "MIT";

/// Project homepage
pub const HOMEPAGE_URL: &str = "http://github.com/polysquare/verapp-target-cmake";

/// Base that `/archive/v<version>.zip` is appended to
pub const DEFAULT_SOURCE_URL: &str = "https://github.com/polysquare/verapp-target-cmake";

pub const DEPENDENCIES: [&str; 4] = [
    "cmake-include-guard/master@smspillaz/cmake-include-guard",
    "tooling-find-pkg-util/master@smspillaz/tooling-find-pkg-util",
    "tooling-cmake-util/master@smspillaz/tooling-cmake-util",
    "cmake-unit/master@smspillaz/cmake-unit",
];

pub const GENERATORS: [&str; 1] = ["cmake"];

/// Pick the version: a non-empty override wins over [`DEFAULT_VERSION`] and
/// is used verbatim.
pub fn resolve_version(version_override: Option<&str>) -> String {
    match version_override {
        Some(v) if !v.is_empty() => v.to_string(),
        _ => DEFAULT_VERSION.to_string(),
    }
}

/// Identity surfaced to the orchestrator
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct RecipeMetadata {
    pub name: String,
    pub version: String,
    pub license: String,
    pub url: String,
    pub source_url: String,
    pub generators: Vec<String>,
    pub dependencies: Vec<DependencyRef>,
}

#[derive(Debug, Clone)]
pub struct Recipe {
    metadata: RecipeMetadata,
}

impl Recipe {
    /// Build the descriptor. `version_override` usually comes from
    /// [`VERSION_OVERRIDE_ENV`], read by the caller.
    pub fn new(version_override: Option<&str>) -> Self {
        Self {
            metadata: RecipeMetadata {
                name: RECIPE_NAME.to_string(),
                version: resolve_version(version_override),
                license: LICENSE.to_string(),
                url: HOMEPAGE_URL.to_string(),
                source_url: DEFAULT_SOURCE_URL.to_string(),
                generators: GENERATORS.iter().map(|g| g.to_string()).collect(),
                dependencies: DEPENDENCIES.iter().map(|d| DependencyRef::new(*d)).collect(),
            },
        }
    }

    /// Replace the archive base URL (mirrors, local test servers).
    pub fn with_source_url(mut self, source_url: impl Into<String>) -> Self {
        self.metadata.source_url = source_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn metadata(&self) -> &RecipeMetadata {
        &self.metadata
    }

    pub fn name(&self) -> &str {
        &self.metadata.name
    }

    pub fn version(&self) -> &str {
        &self.metadata.version
    }

    /// `<source_url>/archive/v<version>.zip`
    pub fn archive_url(&self) -> String {
        format!(
            "{}/archive/v{}.zip",
            self.metadata.source_url, self.metadata.version
        )
    }

    /// Deterministic download name inside the working directory
    pub fn archive_file_name(&self) -> String {
        format!("{}.zip", self.metadata.name)
    }

    /// Top-level directory the archive unpacks to: `<name>-<version>`
    pub fn source_dir_name(&self) -> String {
        format!("{}-{}", self.metadata.name, self.metadata.version)
    }

    pub fn source_dir(&self, work_dir: &Path) -> PathBuf {
        work_dir.join(self.source_dir_name())
    }

    /// Rules applied by [`Recipe::package`], in order.
    pub fn copy_rules(&self) -> Vec<CopyRule> {
        let source_dir = self.source_dir_name();
        vec![
            CopyRule::new("Find*.cmake", "", source_dir.clone(), true),
            CopyRule::new(
                "*.cmake",
                format!("cmake/{}", self.metadata.name),
                source_dir,
                true,
            ),
        ]
    }

    /// Download the source archive into `work_dir`, unpack it there and
    /// delete the archive.
    ///
    /// On failure the archive and any partial extraction are removed. Paths
    /// in flight are registered in `cleanup_ctx` so an interrupt handler can
    /// remove them too.
    #[tracing::instrument(skip(self, runtime, http_client, extractor, cleanup_ctx))]
    pub async fn fetch<R: Runtime + 'static, E: ArchiveExtractor>(
        &self,
        runtime: &R,
        http_client: &HttpClient,
        extractor: &E,
        work_dir: &Path,
        cleanup_ctx: SharedCleanupContext,
    ) -> Result<()> {
        let url = self.archive_url();
        let archive_path = work_dir.join(self.archive_file_name());
        let source_dir = self.source_dir(work_dir);

        if !extractor.can_handle(&archive_path) {
            return Err(RecipeError::archive(&archive_path, "unsupported archive format").into());
        }

        runtime
            .create_dir_all(work_dir)
            .map_err(|e| RecipeError::io(work_dir, e))?;

        if runtime.exists(&source_dir) {
            info!("Removing previous extraction at {:?}", source_dir);
            runtime
                .remove_dir_all(&source_dir)
                .map_err(|e| RecipeError::io(&source_dir, e))?;
        }

        let archive_guard = CleanupGuard::new(cleanup_ctx.clone(), archive_path.clone());
        download_file(runtime, &url, &archive_path, http_client).await?;

        let source_guard = CleanupGuard::new(cleanup_ctx, source_dir.clone());
        extractor.extract(runtime, &archive_path, work_dir)?;

        runtime
            .remove_file(&archive_path)
            .map_err(|e| RecipeError::io(&archive_path, e))?;
        archive_guard.success();
        source_guard.success();

        if !runtime.is_dir(&source_dir) {
            let found: Vec<String> = runtime
                .read_dir(work_dir)
                .unwrap_or_default()
                .iter()
                .filter_map(|p| p.file_name().map(|n| n.to_string_lossy().into_owned()))
                .collect();
            warn!(
                "Archive did not unpack to {:?}; found [{}]. Packaging will fail.",
                self.source_dir_name(),
                found.join(", ")
            );
        }

        info!("Fetched {} {} into {:?}", self.name(), self.version(), source_dir);
        Ok(())
    }

    /// Copy the packaged files from `work_dir` into `output_dir`.
    ///
    /// Fails with [`RecipeError::NotFound`] if `fetch` has not populated
    /// `work_dir`. Files matching no rule are left behind silently.
    #[tracing::instrument(skip(self, runtime))]
    pub fn package<R: Runtime>(
        &self,
        runtime: &R,
        work_dir: &Path,
        output_dir: &Path,
    ) -> Result<PackageReport> {
        let source_dir = self.source_dir(work_dir);
        if !runtime.is_dir(&source_dir) {
            return Err(RecipeError::NotFound(source_dir).into());
        }

        runtime
            .create_dir_all(output_dir)
            .map_err(|e| RecipeError::io(output_dir, e))?;

        package::apply_rules(runtime, &self.copy_rules(), work_dir, output_dir)
    }
}
