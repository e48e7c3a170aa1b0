//! `tasklist` -- command-line client for the task endpoint.
//!
//! Runs one command against the endpoint and prints the resulting list, or
//! starts an interactive shell. Configuration via CLI flags, environment
//! variables, or config file (`~/.config/tasklist/config.toml`).
//!
//! ```bash
//! # Show the list (newest first by default)
//! cargo run --bin tasklist
//!
//! # Add, toggle, remove
//! cargo run --bin tasklist -- add "Buy milk"
//! cargo run --bin tasklist -- toggle 3
//! cargo run --bin tasklist -- remove 3
//!
//! # Point at another endpoint
//! TASKLIST_API_URL=http://127.0.0.1:8080/api cargo run --bin tasklist -- shell
//! ```

use std::path::Path;
use std::process::ExitCode;

use clap::Parser;
use tokio::io::BufReader;
use tracing_appender::non_blocking::WorkerGuard;

use tasklist::app::{App, AppError};
use tasklist::config::{CliArgs, ClientConfig, Command};
use tasklist::service::TaskService;
use tasklist::{shell, ui};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = CliArgs::parse();

    let config = match ClientConfig::load(&cli) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error loading configuration: {e}");
            return ExitCode::FAILURE;
        }
    };

    // Logs go to a file so stdout only carries command output.
    let _log_guard = init_logging(&cli.log_level, cli.log_file.as_deref());

    tracing::info!(api_url = %config.api_url, "tasklist starting");

    let service = match TaskService::new(config.api_url.clone()) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Error: {e}");
            return ExitCode::FAILURE;
        }
    };

    let command = cli.command.unwrap_or_default();
    match run(command, &config, &service).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "command failed");
            eprintln!("{}", ui::render_error(&e));
            ExitCode::FAILURE
        }
    }
}

/// Initialize file-based logging.
///
/// Returns a [`WorkerGuard`] that must be held until shutdown to ensure all
/// buffered log entries are flushed.
fn init_logging(level: &str, file_path: Option<&Path>) -> Option<WorkerGuard> {
    let default_path = std::env::temp_dir().join("tasklist.log");
    let log_path = file_path.unwrap_or(&default_path);

    let log_dir = log_path.parent()?;
    let file_name = log_path.file_name()?.to_str()?;

    let file_appender = tracing_appender::rolling::never(log_dir, file_name);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_env_filter(env_filter)
        .with_ansi(false)
        .init();

    Some(guard)
}

/// Executes one subcommand, printing the refreshed list afterwards.
async fn run(command: Command, config: &ClientConfig, service: &TaskService) -> Result<(), AppError> {
    let mut app = App::new(config.order);

    match command {
        Command::Shell => {
            println!(
                "{}",
                ui::render_header(&config.app_name, env!("CARGO_PKG_VERSION"))
            );
            println!("{}", shell::HELP);
            let stdin = BufReader::new(tokio::io::stdin());
            if let Err(e) = shell::run(&mut app, service, stdin, tokio::io::stdout()).await {
                tracing::error!(error = %e, "shell I/O failed");
                eprintln!("Error: {e}");
            }
            return Ok(());
        }
        Command::NextId => {
            let id = service.next_id().await?;
            println!("{id}");
            return Ok(());
        }
        Command::List => {}
        Command::Add { title, completed } => {
            app.form.title = title;
            app.form.completed = completed;
            let task = app.submit_form(service).await?;
            println!("Added {}", ui::render_task(&task, false));
        }
        Command::Edit {
            id,
            title,
            completed,
        } => {
            app.load(service).await?;
            app.begin_edit(id)?;
            app.form.title = title;
            app.form.completed = completed;
            let task = app.submit_form(service).await?;
            println!("Updated {}", ui::render_task(&task, false));
        }
        Command::Toggle { id } => {
            app.load(service).await?;
            let task = app.toggle(service, id).await?;
            println!("Toggled {}", ui::render_task(&task, false));
        }
        Command::Remove { id } => {
            app.remove(service, id).await?;
            println!("Removed task {id}");
        }
        Command::Clear => {
            app.load(service).await?;
            app.clear(service).await?;
            println!("Cleared the list");
        }
        Command::Reset => {
            app.reset(service).await?;
            println!("Restored the sample tasks");
        }
    }

    app.load(service).await?;
    println!("{}", ui::render_list(&app));
    Ok(())
}
