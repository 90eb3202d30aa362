//! archindex-cli: CLI entry point for the project architecture indexer.

mod commands;

use archindex_core::IndexerConfig;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(
    name = "archindex",
    about = "Index codebases into a searchable architecture map"
)]
#[command(version, propagate_version = true)]
struct Cli {
    /// Config file (defaults to ~/.archindex/config.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Index a project directory
    Index {
        /// Project root (defaults to current directory)
        path: Option<PathBuf>,

        /// Extra exclude glob, repeatable (e.g. -x 'tests/**')
        #[arg(short = 'x', long = "exclude")]
        exclude: Vec<String>,
    },

    /// Re-index the files of a project that changed since the last run
    Update {
        /// Project ID
        project_id: String,

        /// Re-parse every file
        #[arg(long)]
        force_full: bool,
    },

    /// Search indexed files and symbols
    Search {
        /// Search query
        query: String,

        /// Restrict to one project
        #[arg(short, long)]
        project_id: Option<String>,

        /// Number of results
        #[arg(short, long, default_value = "10")]
        limit: usize,
    },

    /// List indexed projects
    List,

    /// Remove a project from the index
    Delete {
        /// Project ID
        project_id: String,
    },

    /// Start MCP server (stdio)
    Serve,

    /// Print tool definitions as JSON
    Tools {
        /// OpenAI function-calling format instead of MCP
        #[arg(long)]
        openai: bool,
    },
}

fn main() -> anyhow::Result<()> {
    // Initialize tracing to stderr (stdout reserved for JSON-RPC in serve mode)
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive("archindex=info".parse()?),
        )
        .with_target(false)
        .init();

    let cli = Cli::parse();

    if let Commands::Tools { openai } = cli.command {
        return commands::cmd_tools(openai);
    }

    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Index { path, exclude } => {
            let root = match path {
                Some(p) => p,
                None => std::env::current_dir()?,
            };
            commands::cmd_index(config, &root, &exclude)?;
        }
        Commands::Update {
            project_id,
            force_full,
        } => {
            commands::cmd_update(config, &project_id, force_full)?;
        }
        Commands::Search {
            query,
            project_id,
            limit,
        } => {
            commands::cmd_search(config, &query, project_id.as_deref(), limit)?;
        }
        Commands::List => {
            commands::cmd_list(config)?;
        }
        Commands::Delete { project_id } => {
            commands::cmd_delete(config, &project_id)?;
        }
        Commands::Serve => {
            commands::cmd_serve(config)?;
        }
        Commands::Tools { .. } => {}
    }

    Ok(())
}

/// Explicit file (must exist), else the default path, then env overrides.
fn load_config(path: Option<&Path>) -> anyhow::Result<IndexerConfig> {
    let mut config = match path {
        Some(p) => IndexerConfig::load(p)
            .map_err(|e| anyhow::anyhow!("Failed to load config {}: {e}", p.display()))?,
        None => IndexerConfig::load_or_default(),
    };
    config.apply_env();
    Ok(config)
}
