use anyhow::{Result, bail};
use clap::Parser;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use precoview::cli::{
    commands::{Cli, Commands},
    completions::generate_completions,
    run::run_fetch,
};
use precoview::core::fetch;
use precoview::tui;

fn setup_logging(verbosity: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbosity {
            0 => EnvFilter::new("warn"),
            1 => EnvFilter::new("info"),
            2 => EnvFilter::new("debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false))
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    match cli.command {
        Commands::Browse {
            config,
            offline,
            strict_startup,
        } => {
            let mut config = config.build()?;
            config.offline = offline;
            config.strict_startup = strict_startup;

            if config.strict_startup {
                let cache = fetch::cache_path(&config);
                if !cache.exists() {
                    bail!(
                        "data file not found at {} and strict startup is enabled",
                        cache.display()
                    );
                }
            }

            tui::run(config)?;
        }

        Commands::Fetch {
            config,
            remote_only,
            username,
            password,
        } => {
            let config = config.build()?;
            run_fetch(config, remote_only, username, password).await?;
        }

        Commands::Completions { shell } => {
            generate_completions(shell);
        }
    }

    Ok(())
}
