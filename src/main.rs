#![warn(clippy::pedantic)]

use std::{
    env,
    path::{Path, PathBuf},
};

use anyhow::Context;
use clap::{Parser, Subcommand};
use console::Term;
use human_panic::setup_panic;

use pkg_update::{
    commands::update::Update,
    config,
    context::{Flags, RuntimeContext},
    diagnostics::TermDiagnostics,
    engine::ProcessEngineFactory,
    finish::ReifyFinish,
};

#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the configuration file
    #[arg(long, default_value = "~/.config/pkg-update/config.toml")]
    config_path: PathBuf,

    /// Path to the file recording the last update
    #[arg(long, default_value = "~/.cache/pkg-update/state.json")]
    state_path: PathBuf,

    /// Operate on globally installed packages
    #[arg(short, long, global = true)]
    global: bool,

    /// Local prefix to use instead of searching upwards for package.json
    #[arg(long, global = true)]
    prefix: Option<PathBuf>,

    /// Global prefix to use instead of the configured or derived one
    #[arg(long, global = true)]
    global_prefix: Option<PathBuf>,

    /// Print machine-readable output
    #[arg(long, global = true)]
    json: bool,

    /// Ask the resolver to report what it would do without touching the filesystem
    #[arg(long, global = true)]
    dry_run: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Update installed packages to the latest versions their ranges allow
    #[command(visible_alias = "up", alias = "upgrade", alias = "udpate")]
    Update {
        /// Packages to update; every dependency is updated when none are given
        packages: Vec<String>,

        /// No longer has any effect
        #[arg(long, hide = true, allow_hyphen_values = true)]
        depth: Option<String>,
    },
}

fn expand_homedir(path: &Path) -> anyhow::Result<PathBuf> {
    let path = path.to_string_lossy();
    match path.strip_prefix('~') {
        Some(rest) => Ok(format!("{}{rest}", env::var("HOME")?).into()),
        None => Ok(PathBuf::from(path.as_ref())),
    }
}

fn announcement(packages: &[String]) -> String {
    if packages.is_empty() {
        "Updating all dependencies...".to_string()
    } else {
        format!("Updating {} package(s)...", packages.len())
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    setup_panic!();
    env_logger::init();

    log::debug!("Parsing command line arguments...");
    let args = Args::parse();
    log::trace!("Parsed command line arguments: {args:#?}");

    let config_path = expand_homedir(&args.config_path)?;
    let state_path = expand_homedir(&args.state_path)?;
    let config = config::load(&config_path)?;
    let cwd = env::current_dir().context("could not determine the working directory")?;

    match args.command {
        Command::Update { packages, depth } => {
            let flags = Flags {
                global: args.global,
                depth,
                json: args.json,
                dry_run: args.dry_run,
                prefix: args.prefix,
                global_prefix: args.global_prefix,
            };
            let ctx = RuntimeContext::resolve(&config, &flags, &cwd)?;

            log::info!("{}", announcement(&packages));
            let update = Update::new(
                ProcessEngineFactory::new(&config.resolver),
                ReifyFinish::new(state_path, Term::stdout()),
                TermDiagnostics,
            );
            update.exec(&ctx, &packages).await
        }
    }
}
