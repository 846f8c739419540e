//! Blogline CLI - read and write posts on a blogline backend from the terminal.
//!
//! The session is settled once at startup from the stored tokens; commands
//! that need a signed-in user are gated on it.

mod commands;
mod output;

use std::io;

use anyhow::Result;
use blogline_core::{Config, SessionClient};
use tracing::{debug, info};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Directory for an optional daily log file
const ENV_LOG_DIR: &str = "BLOGLINE_LOG_DIR";

/// Initialize the tracing subscriber for logging.
///
/// The returned guard flushes the file writer and must live until exit.
fn init_tracing() -> Option<WorkerGuard> {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    let (file_layer, guard) = match std::env::var(ENV_LOG_DIR) {
        Ok(dir) if !dir.trim().is_empty() => {
            let appender = tracing_appender::rolling::daily(dir, "blogline.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (
                Some(fmt::layer().with_ansi(false).with_writer(writer)),
                Some(guard),
            )
        }
        _ => (None, None),
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(file_layer)
        .with(filter)
        .init();

    guard
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let _log_guard = init_tracing();
    info!("Blogline CLI starting");

    let args: Vec<String> = std::env::args().skip(1).collect();
    let Some(command) = args.first().map(String::as_str) else {
        output::print_usage();
        return Ok(());
    };
    if matches!(command, "help" | "--help" | "-h") {
        output::print_usage();
        return Ok(());
    }

    let mut config = Config::load()?;
    let client = config.build_client()?;

    // Settle the session from persisted tokens before anything else
    let user = client.check_session().await;
    debug!(signed_in = user.is_some(), "Startup session check finished");

    let result = commands::run(&client, &mut config, command, &args[1..]).await;
    report_session_end(&client);
    result
}

/// Tell the user when the command ended their session.
fn report_session_end(client: &SessionClient) {
    if client.session().ended.is_some_and(|reason| reason.requires_login()) {
        eprintln!("Session ended, please log in again (blogline login).");
    }
}
