use std::time::Duration;

use anyhow::{Result, anyhow};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, warn};

use crate::PrecoError;
use crate::core::auth::{Credentials, LoginOutcome};
use crate::core::client::ApiClient;
use crate::core::config::AppConfig;
use crate::core::fetch::{self, Acquired};
use crate::core::table::TableView;

const PREVIEW_ROWS: usize = 10;

/// Headless fetch: run the acquisition chain once and print where the data
/// ended up, plus a short preview of the table.
pub async fn run_fetch(
    config: AppConfig,
    remote_only: bool,
    username: Option<String>,
    password: Option<String>,
) -> Result<()> {
    let mut client = ApiClient::new(config.clone())?;

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner} {msg}")
            .unwrap(),
    );
    spinner.enable_steady_tick(Duration::from_millis(80));

    if let (Some(username), Some(password)) = (username, password) {
        spinner.set_message("Logging in...");
        match client
            .login(&Credentials::new(username, password))
            .await?
        {
            LoginOutcome::Authenticated(user) => {
                info!("Logged in as {}", user.display_name());
            }
            LoginOutcome::Blocked => {
                // Blocked is a normal shutdown, not a process failure.
                spinner.finish_and_clear();
                eprintln!("{}", PrecoError::AccountBlocked);
                return Ok(());
            }
            LoginOutcome::InvalidCredentials => {
                spinner.finish_and_clear();
                return Err(PrecoError::InvalidCredentials.into());
            }
            LoginOutcome::ServerError(status) => {
                spinner.finish_and_clear();
                return Err(PrecoError::Server(status).into());
            }
            LoginOutcome::Unreachable => {
                warn!("Login endpoint unreachable, fetching without a session");
            }
        }
    }

    spinner.set_message("Fetching data...");
    let acquired = if remote_only {
        fetch::fetch_remote(&client, &config)
            .await
            .ok_or_else(|| anyhow!("no candidate URL produced a valid data file"))?
    } else {
        fetch::acquire(&client, &config).await?
    };
    spinner.finish_and_clear();

    print_summary(&acquired);
    Ok(())
}

fn print_summary(acquired: &Acquired) {
    println!("Source: {}", acquired.source.label());
    println!("File:   {}", acquired.path.display());
    println!("Rows:   {}", acquired.dataset.len());

    if acquired.dataset.is_empty() {
        return;
    }
    println!();

    let view = TableView::new(acquired.dataset.clone());
    let columns = view.columns().to_vec();
    let preview = acquired.dataset.len().min(PREVIEW_ROWS);

    // Column widths sized to the preview content.
    let mut widths: Vec<usize> = columns.iter().map(|c| c.trim().len()).collect();
    for row in 0..preview {
        for (col, width) in widths.iter_mut().enumerate() {
            *width = (*width).max(view.display_cell(row, col).chars().count());
        }
    }

    let header: Vec<String> = columns
        .iter()
        .enumerate()
        .map(|(i, c)| format!("{:<width$}", c.trim(), width = widths[i]))
        .collect();
    println!("{}", header.join("  "));

    for row in 0..preview {
        let cells: Vec<String> = (0..columns.len())
            .map(|col| format!("{:<width$}", view.display_cell(row, col), width = widths[col]))
            .collect();
        println!("{}", cells.join("  "));
    }

    if acquired.dataset.len() > preview {
        println!("... and {} more rows", acquired.dataset.len() - preview);
    }
}
