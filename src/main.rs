use anyhow::Result;
use clap::{Parser, Subcommand};

use stagehand::commands::{self, Workspace};
use stagehand::config::Config;
use stagehand::confirm::{Confirmation, PresetConfirmation, StdinConfirmation};
use stagehand::logging;

/// Check that git is available before doing anything else
fn check_git_available() -> Result<()> {
    if which::which("git").is_err() {
        eprintln!("Error: git is not installed or not in PATH.");
        eprintln!();
        eprintln!("Install git:");
        eprintln!("  macOS:         brew install git");
        eprintln!("  Ubuntu/Debian: sudo apt install git");
        eprintln!("  Fedora/RHEL:   sudo dnf install git");
        eprintln!("  Arch:          sudo pacman -S git");
        std::process::exit(1);
    }
    Ok(())
}

#[derive(Parser)]
#[command(name = "stagehand")]
#[command(about = "Declarative git-worktree orchestrator for multi-branch deployment workflows")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file path
    #[arg(short, long)]
    config: Option<String>,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Scaffold worktrees.toml and the state directory
    Init {
        /// Overwrite an existing configuration
        #[arg(long)]
        force: bool,
    },

    /// Show declared vs observed worktree state
    Status,

    /// Reconcile disk state with the configuration
    Sync {
        /// Also remove orphaned worktrees (confirmed per worktree)
        #[arg(long)]
        prune: bool,

        /// Skip confirmation prompts
        #[arg(short = 'y', long)]
        yes: bool,
    },

    /// List the declared deployment chains
    List,

    /// Create an ad hoc worktree
    Add {
        /// Worktree name
        name: String,

        /// Branch to create or check out (default: the worktree name)
        #[arg(short, long)]
        branch: Option<String>,

        /// Base ref for a new branch (default: the production branch)
        #[arg(long)]
        base: Option<String>,
    },

    /// Remove a worktree
    Remove {
        /// Worktree name
        name: String,

        /// Skip confirmation prompt
        #[arg(short = 'y', long)]
        yes: bool,
    },

    /// Create a hotfix worktree off the production branch
    Hotfix {
        /// Issue key (e.g. PROJ-123), used to decorate the branch name
        issue_key: String,
    },

    /// Plan and execute the next pending mergeback
    Mergeback {
        /// Merge from this worktree (default: walk the dependency tree)
        #[arg(long)]
        source: Option<String>,

        /// Merge into this worktree (default: the source's merge-into target)
        #[arg(long)]
        target: Option<String>,

        /// Skip confirmation prompt
        #[arg(short = 'y', long)]
        yes: bool,
    },

    /// Scan recent activity for a mergeback candidate
    Check {
        /// History window in days (default: since the last check)
        #[arg(long)]
        days: Option<u32>,
    },
}

fn confirmer(yes: bool) -> Box<dyn Confirmation> {
    if yes {
        Box::new(PresetConfirmation(true))
    } else {
        Box::new(StdinConfirmation)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    check_git_available()?;

    // Load configuration first (needed for logging setup)
    let config = Config::load(cli.config.as_deref())?;

    // File logging needs the repository root; outside a repository it falls
    // back to stderr and the real error surfaces from the command itself.
    let repo_root = match std::env::current_dir() {
        Ok(cwd) => stagehand::git::GitCli::repo_root(&cwd)
            .await
            .ok()
            .map(std::path::PathBuf::from),
        Err(_) => None,
    };
    let _logging_handle = logging::init_logging(&config, repo_root.as_deref(), cli.debug)?;

    match cli.command {
        Commands::Init { force } => {
            commands::init::run(&config, force).await?;
        }
        Commands::Status => {
            let ws = Workspace::load(&config).await?;
            commands::status::run(&ws)?;
        }
        Commands::Sync { prune, yes } => {
            let ws = Workspace::load(&config).await?;
            commands::sync::run(&ws, &*confirmer(yes), prune).await?;
        }
        Commands::List => {
            let ws = Workspace::load(&config).await?;
            commands::list::run(&ws).await?;
        }
        Commands::Add { name, branch, base } => {
            let mut ws = Workspace::load(&config).await?;
            commands::add::run(&mut ws, &name, branch.as_deref(), base.as_deref()).await?;
        }
        Commands::Remove { name, yes } => {
            let mut ws = Workspace::load(&config).await?;
            commands::remove::run(&mut ws, &name, &*confirmer(yes)).await?;
        }
        Commands::Hotfix { issue_key } => {
            let mut ws = Workspace::load(&config).await?;
            commands::hotfix::run(&mut ws, &issue_key).await?;
        }
        Commands::Mergeback {
            source,
            target,
            yes,
        } => {
            let mut ws = Workspace::load(&config).await?;
            commands::mergeback::run(
                &mut ws,
                &config,
                source.as_deref(),
                target.as_deref(),
                &*confirmer(yes),
            )
            .await?;
        }
        Commands::Check { days } => {
            let mut ws = Workspace::load(&config).await?;
            commands::check::run(&mut ws, &config, days).await?;
        }
    }

    Ok(())
}
