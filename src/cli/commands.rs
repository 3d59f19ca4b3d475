use std::path::PathBuf;

use anyhow::Context;
use clap::{Args, Parser, Subcommand, ValueEnum};
use url::Url;

use crate::core::config::AppConfig;

#[derive(Parser, Debug)]
#[command(name = "precoview")]
#[command(author, version, about = "Terminal product price viewer", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress output
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Launch the interactive table browser
    Browse {
        #[command(flatten)]
        config: ConfigArgs,

        /// Skip authentication and browse whatever local data exists
        #[arg(long)]
        offline: bool,

        /// Fail at startup when no local data file exists yet
        #[arg(long)]
        strict_startup: bool,
    },

    /// Fetch the data file once and print a summary (no UI)
    Fetch {
        #[command(flatten)]
        config: ConfigArgs,

        /// Only try the remote stage; never fall back to cache or
        /// placeholder data
        #[arg(long)]
        remote_only: bool,

        /// Username for an authenticated session
        #[arg(long, env = "PRECOVIEW_USER")]
        username: Option<String>,

        /// Password for an authenticated session
        #[arg(long, env = "PRECOVIEW_PASS", hide_env_values = true)]
        password: Option<String>,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Endpoint and cache overrides shared by every subcommand that talks to
/// the service.
#[derive(Args, Debug, Clone)]
pub struct ConfigArgs {
    /// Login endpoint URL
    #[arg(long, env = "PRECOVIEW_AUTH_URL", global = true)]
    pub auth_url: Option<String>,

    /// Candidate base URL for the data file; repeat to try several in order
    #[arg(long = "base-url", global = true)]
    pub base_urls: Vec<String>,

    /// Data file name on the server and in the local cache
    #[arg(long, global = true)]
    pub filename: Option<String>,

    /// Directory for the local data file (skips automatic resolution)
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,
}

impl ConfigArgs {
    /// Validate the overrides and fold them into the default configuration.
    pub fn build(&self) -> anyhow::Result<AppConfig> {
        let mut config = AppConfig::default();
        if let Some(auth_url) = &self.auth_url {
            Url::parse(auth_url).with_context(|| format!("invalid auth URL: {auth_url}"))?;
            config.auth_url = auth_url.clone();
        }
        if !self.base_urls.is_empty() {
            for base in &self.base_urls {
                Url::parse(base).with_context(|| format!("invalid base URL: {base}"))?;
            }
            config.base_urls = self.base_urls.clone();
        }
        if let Some(filename) = &self.filename {
            config.filename = filename.clone();
        }
        config.data_dir = self.data_dir.clone();
        Ok(config)
    }
}

#[derive(ValueEnum, Clone, Debug)]
pub enum Shell {
    Bash,
    Fish,
    Zsh,
}

impl From<Shell> for clap_complete::Shell {
    fn from(shell: Shell) -> Self {
        match shell {
            Shell::Bash => clap_complete::Shell::Bash,
            Shell::Fish => clap_complete::Shell::Fish,
            Shell::Zsh => clap_complete::Shell::Zsh,
        }
    }
}
