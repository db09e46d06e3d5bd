use anyhow::Result;
use clap::Parser;
use nupkg_tidy::commands::{self, config::Config};
use nupkg_tidy::reconcile::ChangeBatch;
use std::path::PathBuf;

/// nupkg-tidy - NuGet package tree normalizer
///
/// Prunes NuGet packages installed into a Unity embedded package down to what
/// the editor can import: one netstandard folder, no build or docs folders,
/// a single ruleset and no localized satellite assemblies.
///
/// The repository root is read from `repositoryPath` in nuget.config and the
/// installed packages from packages.config, both in the project root.
///
/// Examples:
///   nupkg-tidy clean                 # Clean every installed package
///   nupkg-tidy clean Newtonsoft.Json # Clean one package
///   nupkg-tidy list                  # Show installed packages
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Unity project root (defaults to the current directory; also via NUPKG_TIDY_PROJECT)
    #[arg(
        long = "project",
        short = 'p',
        env = "NUPKG_TIDY_PROJECT",
        value_name = "PATH",
        global = true
    )]
    pub project: Option<PathBuf>,

    /// Log more (-v for info, -vv for debug)
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Process one batch of asset change notifications
    Reconcile(ReconcileArgs),

    /// Clean installed packages without a change batch
    Clean(CleanArgs),

    /// List installed packages and their asset paths
    List,
}

#[derive(clap::Args, Debug)]
pub struct ReconcileArgs {
    /// Imported (created or modified) asset paths
    #[arg(value_name = "IMPORTED", required = true)]
    pub imported: Vec<String>,

    /// Deleted asset paths
    #[arg(long = "deleted", value_name = "PATH")]
    pub deleted: Vec<String>,

    /// Moved asset paths (new locations)
    #[arg(long = "moved", value_name = "PATH")]
    pub moved: Vec<String>,

    /// Previous locations of moved assets
    #[arg(long = "moved-from", value_name = "PATH")]
    pub moved_from: Vec<String>,
}

impl ReconcileArgs {
    fn into_batch(self) -> ChangeBatch {
        ChangeBatch {
            deleted: self.deleted,
            moved: self.moved,
            moved_from: self.moved_from,
            ..ChangeBatch::imported(self.imported)
        }
    }
}

#[derive(clap::Args, Debug)]
pub struct CleanArgs {
    /// Package ids to clean (all when omitted)
    #[arg(value_name = "ID")]
    pub ids: Vec<String>,
}

fn default_filter(verbose: u8) -> &'static str {
    match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(default_filter(cli.verbose)),
    )
    .init();
    let runtime = nupkg_tidy::runtime::RealRuntime;
    let config = Config::new(runtime, cli.project)?;

    match cli.command {
        Commands::Reconcile(args) => commands::reconcile(config, args.into_batch()).await?,
        Commands::Clean(args) => commands::clean(config, args.ids).await?,
        Commands::List => commands::list(config).await?,
    }
    Ok(())
}
