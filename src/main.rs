//! `caresre`: command-line front end for the OPD queue backend.
//!
//! Snapshots are printed to stdout as pretty JSON; logs go to stderr.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::{error, info, warn};

use caresre_opd_client::config::Config;
use caresre_opd_client::logging::init_tracing;
use caresre_opd_client::queue_client::{
    HttpGateway, QueueClient, RegistrationForm, TokenId, DEFAULT_DEPARTMENT,
};
use caresre_opd_client::sync::{DashboardAggregator, RegistrationFlow, TokenStatusTracker};
use caresre_opd_client::types::ClientError;

#[derive(Parser, Debug)]
#[command(name = "caresre", version, about = "Talk to the CareSRE OPD queue backend")]
struct Cli {
    /// Configuration file (defaults to config.json next to the app, or CARESRE_CONFIG)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Override the polling interval in milliseconds
    #[arg(long, global = true)]
    interval_ms: Option<u64>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Register a patient and print the issued token
    Register {
        #[arg(long)]
        name: String,
        #[arg(long)]
        age: String,
        #[arg(long)]
        symptoms: String,
        #[arg(long)]
        contact: Option<String>,
        #[arg(long)]
        history: Option<String>,
        /// Keep polling the new token until it completes
        #[arg(long)]
        track: bool,
    },
    /// Follow a token until it completes or Ctrl-C
    Status { token: String },
    /// Refresh the admin dashboard on every interval
    Dashboard {
        /// Exit after this many published snapshots
        #[arg(long)]
        cycles: Option<u64>,
    },
    /// Fetch the crowd prediction for a department
    Crowd {
        #[arg(long, default_value = DEFAULT_DEPARTMENT)]
        department: String,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(error = %err, "caresre failed");
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<(), ClientError> {
    let mut config = match &cli.config {
        Some(path) => Config::from_path(path).await?,
        None => Config::load().await,
    };
    if let Some(interval_ms) = cli.interval_ms {
        config.interval_ms = interval_ms;
        config.validate()?;
    }

    let gateway = HttpGateway::new(&config)?;
    info!(base_url = %gateway.base_url(), "Using queue backend");
    let client = QueueClient::new(Arc::new(gateway));

    match cli.command {
        Command::Register {
            name,
            age,
            symptoms,
            contact,
            history,
            track,
        } => {
            let flow = RegistrationFlow::new(client.clone());
            let receipt = flow
                .submit_form(RegistrationForm {
                    name,
                    age,
                    symptoms,
                    contact: contact.unwrap_or_default(),
                    history: history.unwrap_or_default(),
                })
                .await?;
            print_json(&receipt)?;
            if track {
                follow_token(client, &config, receipt.token).await?;
            }
        }
        Command::Status { token } => {
            follow_token(client, &config, TokenId::from(token)).await?;
        }
        Command::Dashboard { cycles } => watch_dashboard(client, &config, cycles).await?,
        Command::Crowd { department } => {
            let prediction = client.crowd_prediction(&department).await?;
            print_json(&prediction)?;
        }
    }

    Ok(())
}

async fn follow_token(
    client: QueueClient,
    config: &Config,
    token: TokenId,
) -> Result<(), ClientError> {
    let mut tracker = TokenStatusTracker::new(client, config.polling())
        .with_terminal_statuses(config.terminal_statuses.clone());
    let mut updates = tracker.subscribe();
    tracker.bind(token);

    let mut last_printed = None;
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted, stopping token tracking");
                break;
            }
            changed = updates.changed() => {
                if changed.is_err() {
                    break;
                }
                let state = updates.borrow_and_update().clone();
                if let Some(err) = &state.last_error {
                    warn!(error = %err, "Showing last known status");
                }
                if let Some(snapshot) = &state.snapshot {
                    if last_printed != Some(snapshot.fetched_at) {
                        last_printed = Some(snapshot.fetched_at);
                        print_json(snapshot)?;
                    }
                }
                if state.finished {
                    break;
                }
            }
        }
    }

    tracker.unbind();
    Ok(())
}

async fn watch_dashboard(
    client: QueueClient,
    config: &Config,
    cycles: Option<u64>,
) -> Result<(), ClientError> {
    let dashboard = DashboardAggregator::new(client, config.polling());
    let mut updates = dashboard.subscribe();
    dashboard.start();

    let mut printed = 0;
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted, stopping dashboard");
                break;
            }
            changed = updates.changed() => {
                if changed.is_err() {
                    break;
                }
                let state = updates.borrow_and_update().clone();
                if let Some(err) = &state.last_error {
                    warn!(error = %err, "Dashboard refresh failed, showing previous snapshot");
                }
                if state.published > printed {
                    printed = state.published;
                    if let Some(snapshot) = &state.snapshot {
                        print_json(snapshot.as_ref())?;
                    }
                }
                if cycles.is_some_and(|limit| printed >= limit) {
                    break;
                }
            }
        }
    }

    dashboard.stop();
    Ok(())
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<(), ClientError> {
    let rendered = serde_json::to_string_pretty(value)
        .map_err(|err| ClientError::Config(format!("Failed to render output: {err}")))?;
    println!("{rendered}");
    Ok(())
}
