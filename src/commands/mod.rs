use anyhow::{Context, Result};
use std::future::Future;
use std::path::Path;
use std::sync::Arc;
use tokio::task::JoinHandle;

use crate::cleanup::{self, SharedCleanupContext};
use crate::{archive::ArchiveExtractor, package::PackageReport, runtime::Runtime};

pub mod config;
mod info;

pub use config::{Config, RecipeOptions};
pub use info::{info, render_info};

/// Fetch phase: download and unpack the source archive into `work_dir`.
#[tracing::instrument(skip(runtime, options))]
pub async fn fetch<R: Runtime + 'static>(
    runtime: R,
    work_dir: &Path,
    options: RecipeOptions,
) -> Result<()> {
    let config = Config::new(runtime, &options).context("fetch failed")?;
    run_fetch(&config, work_dir).await.context("fetch failed")
}

#[tracing::instrument(skip(config))]
pub async fn run_fetch<R: Runtime + 'static, E: ArchiveExtractor>(
    config: &Config<R, E>,
    work_dir: &Path,
) -> Result<()> {
    let cleanup_ctx = cleanup::new_shared();
    let ctrl_c_handler = spawn_interrupt_handler(Arc::clone(&cleanup_ctx))?;

    let result = config
        .recipe
        .fetch(
            &config.runtime,
            &config.http_client,
            &config.extractor,
            work_dir,
            cleanup_ctx,
        )
        .await;

    ctrl_c_handler.abort();
    result?;

    println!(
        "   Fetched {} {} into {}",
        config.recipe.name(),
        config.recipe.version(),
        config.recipe.source_dir(work_dir).display()
    );
    Ok(())
}

/// Remove every registered path and exit with status 130 on Ctrl-C.
///
/// The signal listener is installed before this returns, so an interrupt
/// that lands before the handler task is first polled is still seen. The
/// handler runs on a worker thread and fires even while the fetch is busy
/// in synchronous extraction.
fn spawn_interrupt_handler(cleanup_ctx: SharedCleanupContext) -> Result<JoinHandle<()>> {
    let interrupted = interrupt_signal().context("Failed to install Ctrl-C handler")?;
    Ok(tokio::spawn(async move {
        if interrupted.await {
            eprintln!("\nInterrupted, cleaning up...");
            cleanup_ctx
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner())
                .cleanup();
            std::process::exit(130); // Standard exit code for Ctrl-C
        }
    }))
}

#[cfg(unix)]
fn interrupt_signal() -> Result<impl Future<Output = bool> + Send + 'static> {
    use tokio::signal::unix::{SignalKind, signal};
    let mut sigint = signal(SignalKind::interrupt())?;
    Ok(async move { sigint.recv().await.is_some() })
}

#[cfg(windows)]
fn interrupt_signal() -> Result<impl Future<Output = bool> + Send + 'static> {
    let mut ctrl_c = tokio::signal::windows::ctrl_c()?;
    Ok(async move { ctrl_c.recv().await.is_some() })
}

/// Package phase: copy the selected files from `work_dir` into `output_dir`.
#[tracing::instrument(skip(runtime, options))]
pub fn package<R: Runtime>(
    runtime: R,
    work_dir: &Path,
    output_dir: &Path,
    options: RecipeOptions,
) -> Result<PackageReport> {
    let recipe = options.recipe();
    let report = recipe
        .package(&runtime, work_dir, output_dir)
        .context("package failed")?;

    for copied in &report.copied {
        log::info!("  {} -> {}", copied.pattern, copied.destination.display());
    }
    println!(
        "   Packaged {} {}: {} file(s) into {}",
        recipe.name(),
        recipe.version(),
        report.len(),
        output_dir.display()
    );
    Ok(report)
}
