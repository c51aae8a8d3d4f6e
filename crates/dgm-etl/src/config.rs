use anyhow::{Context, Result};
use confyg::{env, Confygery};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Site pages are served at `<base_url><dgm_id>`.
pub const DEFAULT_BASE_URL: &str = "https://www.dgmlive.com/tour-dates/";

/// Configuration for dgm-bot.
///
/// Configuration is loaded from multiple sources with the following priority:
/// 1. CLI arguments (highest priority)
/// 2. Environment variables (DGM_* prefix)
/// 3. Config file (~/.config/dgm-bot/config.toml)
/// 4. Built-in defaults (lowest priority)
///
/// It is read once at startup and not changed afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Discord bot token (required for `dgm bot` without `--console`).
    ///
    /// Can be set via:
    /// - ENV: DGM_BOT_TOKEN
    /// - Config: bot_token = "..."
    #[serde(default)]
    pub bot_token: Option<String>,

    /// Command prefix the bot listens for.
    #[serde(default = "default_prefix")]
    pub prefix: String,

    /// Path to the SQLite catalog.
    ///
    /// Can be set via:
    /// - CLI: --db /path/to/db
    /// - ENV: DGM_DATABASE_PATH
    /// - Config: database_path = "/path/to/db"
    /// - Default: ~/.local/share/dgm-bot/dgm.db
    #[serde(default = "default_db_path")]
    pub database_path: PathBuf,

    /// Path to the full-text search index.
    #[serde(default = "default_index_path")]
    pub index_path: PathBuf,

    /// Directory holding fetched pages as `<dgm_id>.html`.
    #[serde(default = "default_html_dir")]
    pub html_dir: PathBuf,

    /// Prefix of show page URLs; the show id is appended.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Fetch rate limit.
    #[serde(default = "default_requests_per_second")]
    pub requests_per_second: u32,

    /// First show id fetched by `dgm fetch`.
    #[serde(default = "default_first_id")]
    pub first_id: u32,

    /// Last show id fetched by `dgm fetch` (inclusive).
    #[serde(default = "default_last_id")]
    pub last_id: u32,

    /// Discord channel ids the bot polls.
    #[serde(default)]
    pub channels: Vec<String>,

    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,

    /// How long guidance notices stay up before being deleted.
    #[serde(default = "default_notice_ttl_secs")]
    pub notice_ttl_secs: u64,

    /// Sessions idle for longer than this are dropped.
    #[serde(default = "default_session_idle_secs")]
    pub session_idle_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bot_token: None,
            prefix: default_prefix(),
            database_path: default_db_path(),
            index_path: default_index_path(),
            html_dir: default_html_dir(),
            base_url: default_base_url(),
            requests_per_second: default_requests_per_second(),
            first_id: default_first_id(),
            last_id: default_last_id(),
            channels: Vec::new(),
            poll_interval_secs: default_poll_interval_secs(),
            notice_ttl_secs: default_notice_ttl_secs(),
            session_idle_secs: default_session_idle_secs(),
        }
    }
}

impl Config {
    /// Load configuration from file and environment variables.
    ///
    /// Searches for config file at: ~/.config/dgm-bot/config.toml
    /// Reads environment variables with DGM_ prefix.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed.
    pub fn load() -> Result<Self> {
        Self::load_from(&config_file_path())
    }

    /// Load configuration from an explicit file plus the environment.
    pub fn load_from(config_path: &std::path::Path) -> Result<Self> {
        let mut builder = Confygery::new().context("Failed to create config builder")?;

        if config_path.exists() {
            let path_str = config_path
                .to_str()
                .ok_or_else(|| anyhow::anyhow!("Config path contains invalid UTF-8"))?;
            builder
                .add_file(path_str)
                .context("Failed to load config file")?;
        }

        let env_opts = env::Options::with_top_level("dgm");
        builder
            .add_env(env_opts)
            .context("Failed to load environment variables")?;

        let config: Self = builder.build().context("Failed to build configuration")?;
        log::debug!("Loaded configuration from {}", config_path.display());

        Ok(config)
    }

    /// Load configuration with custom database path.
    ///
    /// This is used when the --db CLI flag is provided.
    pub fn load_with_db_path(db_path: PathBuf) -> Result<Self> {
        let mut config = Self::load()?;
        config.database_path = db_path;
        Ok(config)
    }
}

fn data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("dgm-bot")
}

fn default_prefix() -> String {
    "$".to_string()
}

/// Returns: ~/.local/share/dgm-bot/dgm.db (or platform equivalent)
fn default_db_path() -> PathBuf {
    data_dir().join("dgm.db")
}

fn default_index_path() -> PathBuf {
    data_dir().join("search.db")
}

fn default_html_dir() -> PathBuf {
    data_dir().join("html")
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_requests_per_second() -> u32 {
    1
}

fn default_first_id() -> u32 {
    1
}

fn default_last_id() -> u32 {
    2231
}

fn default_poll_interval_secs() -> u64 {
    2
}

fn default_notice_ttl_secs() -> u64 {
    3
}

fn default_session_idle_secs() -> u64 {
    3600
}

/// Get the config file path.
///
/// Returns:
/// - Linux: ~/.config/dgm-bot/config.toml
/// - macOS: ~/Library/Application Support/dgm-bot/config.toml
/// - Windows: %APPDATA%\dgm-bot\config.toml
pub fn config_file_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("dgm-bot")
        .join("config.toml")
}

/// Get the example config file content.
pub fn example_config() -> &'static str {
    r#"# dgm-bot Configuration File
#
# Configuration is loaded from multiple sources with the following priority:
# 1. CLI arguments (highest priority)
# 2. Environment variables (DGM_* prefix)
# 3. This config file
# 4. Built-in defaults (lowest priority)

# Discord bot token, required to run the bot against Discord
#
# Can also be set via:
# - Environment: DGM_BOT_TOKEN=your-token-here
bot_token = "your-discord-bot-token-here"

# Command prefix, e.g. "$search fripp"
prefix = "$"

# Discord channel ids to listen in
channels = []

# Path to the SQLite catalog
#
# Can also be set via:
# - CLI: dgm --db /custom/path.db status
# - Environment: DGM_DATABASE_PATH=/custom/path.db
#
# Default: Platform-specific data directory
#database_path = "/path/to/custom/dgm.db"

# Path to the full-text search index
#index_path = "/path/to/custom/search.db"

# Directory where fetched pages are cached
#html_dir = "/path/to/html"

# Show pages are fetched from <base_url><id>
#base_url = "https://www.dgmlive.com/tour-dates/"
#requests_per_second = 1
#first_id = 1
#last_id = 2231

# Bot behaviour
#poll_interval_secs = 2
#notice_ttl_secs = 3
#session_idle_secs = 3600
"#
}

/// Create default config file if it doesn't exist.
///
/// Returns true if a new file was created, false if it already existed.
pub fn ensure_config_file() -> Result<bool> {
    let config_path = config_file_path();

    if config_path.exists() {
        return Ok(false);
    }

    if let Some(parent) = config_path.parent() {
        std::fs::create_dir_all(parent).context("Failed to create config directory")?;
    }

    std::fs::write(&config_path, example_config()).context("Failed to write config file")?;

    Ok(true)
}
