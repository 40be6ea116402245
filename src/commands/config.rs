use anyhow::Result;
use log::debug;
use reqwest::Client;
use std::time::Duration;

use crate::{
    archive::{ArchiveExtractor, ZipExtractor},
    http::{HttpClient, USER_AGENT},
    recipe::Recipe,
    runtime::Runtime,
};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Caller-supplied knobs; the CLI fills these from flags and environment.
#[derive(Debug, Clone, Default)]
pub struct RecipeOptions {
    /// Replaces the default version when non-empty
    pub version_override: Option<String>,
    /// Replaces the archive base URL
    pub source_url: Option<String>,
}

impl RecipeOptions {
    pub fn recipe(&self) -> Recipe {
        let recipe = Recipe::new(self.version_override.as_deref());
        match &self.source_url {
            Some(url) => recipe.with_source_url(url.clone()),
            None => recipe,
        }
    }
}

pub struct Config<R: Runtime, E: ArchiveExtractor> {
    pub runtime: R,
    pub recipe: Recipe,
    pub http_client: HttpClient,
    pub extractor: E,
}

impl<R: Runtime> Config<R, ZipExtractor> {
    pub fn new(runtime: R, options: &RecipeOptions) -> Result<Self> {
        let recipe = options.recipe();
        debug!(
            "Recipe {} {} from {}",
            recipe.name(),
            recipe.version(),
            recipe.archive_url()
        );

        let client = Client::builder()
            .user_agent(USER_AGENT)
            .connect_timeout(CONNECT_TIMEOUT)
            .build()?;

        Ok(Self {
            runtime,
            recipe,
            http_client: HttpClient::new(client),
            extractor: ZipExtractor,
        })
    }
}
