use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use verapp_recipe::commands::{self, RecipeOptions};
use verapp_recipe::recipe::VERSION_OVERRIDE_ENV;

/// verapp-recipe - package recipe for verapp-target-cmake
///
/// Fetches the verapp-target-cmake source archive and packages its CMake
/// modules for downstream builds. Run `fetch` first, then `package`.
///
/// Set CONAN_VERSION_OVERRIDE to package a different upstream tag.
///
/// Examples:
///   verapp-recipe fetch build/src
///   verapp-recipe package build/src build/package
#[derive(Parser, Debug)]
#[command(author, version = env!("VERAPP_RECIPE_VERSION"), about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Upstream version to package (defaults to the recipe's pinned version)
    #[arg(
        long = "version-override",
        env = VERSION_OVERRIDE_ENV,
        value_name = "VERSION",
        global = true
    )]
    pub version_override: Option<String>,

    /// Base URL the source archive is fetched from
    #[arg(long = "source-url", value_name = "URL", global = true)]
    pub source_url: Option<String>,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Download and unpack the source archive into WORK_DIR
    Fetch(FetchArgs),

    /// Copy the CMake modules from WORK_DIR into OUTPUT_DIR
    Package(PackageArgs),

    /// Show recipe name, version, license, source and dependencies
    Info(InfoArgs),
}

#[derive(clap::Args, Debug)]
pub struct FetchArgs {
    /// Working directory that receives the unpacked sources
    #[arg(value_name = "WORK_DIR")]
    pub work_dir: PathBuf,
}

#[derive(clap::Args, Debug)]
pub struct PackageArgs {
    /// Working directory populated by `fetch`
    #[arg(value_name = "WORK_DIR")]
    pub work_dir: PathBuf,

    /// Package output directory (created if absent)
    #[arg(value_name = "OUTPUT_DIR")]
    pub output_dir: PathBuf,
}

#[derive(clap::Args, Debug)]
pub struct InfoArgs {
    /// Print as JSON
    #[arg(long)]
    pub json: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();
    let runtime = verapp_recipe::runtime::RealRuntime;
    let options = RecipeOptions {
        version_override: cli.version_override,
        source_url: cli.source_url,
    };

    match cli.command {
        Commands::Fetch(args) => commands::fetch(runtime, &args.work_dir, options).await?,
        Commands::Package(args) => {
            commands::package(runtime, &args.work_dir, &args.output_dir, options)?;
        }
        Commands::Info(args) => commands::info(options, args.json)?,
    }
    Ok(())
}
