use crate::error::RecipeError;
use crate::http::HttpClient;
use crate::runtime::Runtime;
use anyhow::Result;
use log::info;
use std::path::Path;

/// Downloads a file from a URL to `dest`, going through the runtime for file creation.
///
/// Network failures come back as [`RecipeError::Network`]; failing to create or
/// write `dest` comes back as [`RecipeError::Io`].
#[tracing::instrument(skip(runtime, dest, http_client))]
pub async fn download_file<R: Runtime>(
    runtime: &R,
    url: &str,
    dest: &Path,
    http_client: &HttpClient,
) -> Result<u64> {
    info!("Downloading {}...", url);

    let bytes = http_client
        .download_file(url, || runtime.create_file(dest))
        .await
        .map_err(|e| {
            if e.downcast_ref::<RecipeError>().is_some() {
                e
            } else {
                RecipeError::io(dest, e).into()
            }
        })?;

    info!("Download complete ({} bytes).", bytes);
    Ok(bytes)
}
