use anyhow::{Context, Result};
use clap::Parser;
use dgm_etl::Config;
use std::path::PathBuf;

mod commands;

#[derive(Debug, Parser)]
#[command(name = "dgm", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to the catalog database (default: ~/.local/share/dgm-bot/dgm.db)
    #[arg(long, global = true)]
    db: Option<PathBuf>,
}

#[derive(Debug, clap::Subcommand)]
enum Commands {
    /// Download show pages into the local page cache
    ///
    /// Pages are requested in increasing id order at the configured rate and
    /// saved as `<id>.html`. Pages already cached are skipped unless --force
    /// is given. Missing shows are cached too, so later runs do not ask for
    /// them again.
    Fetch {
        /// First show id (default: first_id from the config)
        #[arg(long)]
        from: Option<u32>,

        /// Last show id, inclusive (default: last_id from the config)
        #[arg(long)]
        to: Option<u32>,

        /// Download pages even when they are cached
        #[arg(long)]
        force: bool,
    },
    /// Extract cached pages into the catalog
    Load,
    /// Rebuild the search index from the catalog
    Index,
    /// Fetch, load and index in one pipeline run
    ///
    /// Runs the three steps as pipeline stages with progress output. Uses
    /// the configured id range and keeps cached pages.
    Scrape,
    /// Search the catalog
    Search {
        /// Words to search venues, locations and dates for
        #[arg(required = true)]
        query: Vec<String>,
    },
    /// Show one show with its setlist and lineup
    Show {
        /// DGM Live show id
        dgm_id: u32,
    },
    /// Show catalog, index and cache counts
    Status,
    /// Run the chat bot
    Bot {
        /// Talk on this terminal instead of Discord
        #[arg(long)]
        console: bool,
    },
    /// Manage configuration
    #[command(subcommand)]
    Config(ConfigCommand),
}

#[derive(Debug, clap::Subcommand)]
enum ConfigCommand {
    /// Show the effective configuration
    Show,
    /// Print the config file path
    Path,
    /// Create the config file with defaults
    Init,
    /// Print an example config file
    Example,
    /// Print one value, or the whole config file
    Get {
        key: Option<String>,
    },
    /// Set a value in the config file
    Set {
        key: String,
        value: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    if let Commands::Config(command) = cli.command {
        return match command {
            ConfigCommand::Show => commands::config::show_config(),
            ConfigCommand::Path => commands::config::show_path(),
            ConfigCommand::Init => commands::config::init_config(),
            ConfigCommand::Example => commands::config::show_example(),
            ConfigCommand::Get { key } => commands::config::get_config(key),
            ConfigCommand::Set { key, value } => commands::config::set_config(&key, &value),
        };
    }

    let config = match cli.db {
        Some(db_path) => Config::load_with_db_path(db_path)?,
        None => Config::load()?,
    };

    // Ensure data directories exist
    for path in [&config.database_path, &config.index_path] {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
    }

    match cli.command {
        Commands::Fetch { from, to, force } => {
            commands::run_fetch(&config, from, to, force).await?;
        }
        Commands::Load => commands::run_load(&config)?,
        Commands::Index => commands::run_index(&config)?,
        Commands::Scrape => commands::run_scrape(&config).await?,
        Commands::Search { query } => commands::run_search(&config, &query.join(" "))?,
        Commands::Show { dgm_id } => commands::show_show(&config, dgm_id)?,
        Commands::Status => commands::show_status(&config)?,
        Commands::Bot { console } => commands::run_bot(&config, console).await?,
        Commands::Config(_) => {}
    }

    Ok(())
}
