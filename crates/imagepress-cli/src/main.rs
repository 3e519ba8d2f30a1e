mod commands;

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use imagepress_build::repo::RepoError;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "imagepress")]
#[command(about = "Stamp, build, and publish container images for repository components")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Record the build stamp (UTC timestamp plus abbreviated commit)
    Stamp,
    /// Build component images against the current stamp
    Build {
        /// Components to build (default: all, in manifest order)
        targets: Vec<String>,
        /// Continue with the remaining components after a failure
        #[arg(long)]
        keep_going: bool,
    },
    /// Tag and push built images to the remote registry
    Publish {
        /// Components to publish (default: all, in manifest order)
        targets: Vec<String>,
        /// Continue with the remaining components after a failure
        #[arg(long)]
        keep_going: bool,
    },
    /// Run the full pipeline: stamp, build, publish
    Run {
        /// Components to process (default: all, in manifest order)
        targets: Vec<String>,
        /// Stop after the build stage
        #[arg(long)]
        skip_publish: bool,
        /// Continue with the remaining components after a failure
        #[arg(long)]
        keep_going: bool,
    },
    /// Check the manifest against the repository layout
    Validate,
    /// Remove the scratch directory and staged stamp copies
    Clean,
    /// Check the tooling and configuration the pipeline depends on
    Doctor,
    /// Manage the CI workflow and its secrets
    Ci {
        #[command(subcommand)]
        action: CiAction,
    },
}

#[derive(Subcommand)]
enum CiAction {
    /// Generate the GitHub Actions workflow file
    Init {
        /// Overwrite an existing workflow file
        #[arg(long)]
        force: bool,
    },
    /// Store the registry settings as GitHub Actions secrets
    Setup,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    match dispatch(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {err:#}");
            exit_code_for(&err)
        }
    }
}

async fn dispatch(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Stamp => commands::stamp().await,
        Commands::Build { targets, keep_going } => commands::build(&targets, keep_going).await,
        Commands::Publish { targets, keep_going } => commands::publish(&targets, keep_going).await,
        Commands::Run { targets, skip_publish, keep_going } => {
            commands::run(&targets, skip_publish, keep_going).await
        }
        Commands::Validate => commands::validate().await,
        Commands::Clean => commands::clean().await,
        Commands::Doctor => commands::doctor().await,
        Commands::Ci { action } => match action {
            CiAction::Init { force } => commands::ci_init(force).await,
            CiAction::Setup => commands::ci_setup().await,
        },
    }
}

/// Working-directory violations exit with 2 so scripts and CI steps can
/// tell "wrong directory" apart from ordinary failures.
fn exit_code_for(err: &anyhow::Error) -> ExitCode {
    let wrong_dir = err.chain().any(|cause| {
        matches!(
            cause.downcast_ref::<RepoError>(),
            Some(RepoError::NotRepoRoot { .. })
        )
    });
    if wrong_dir { ExitCode::from(2) } else { ExitCode::FAILURE }
}
