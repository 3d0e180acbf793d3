//! # deckbd
//!
//! Drive keyboard-only software with the Steam Deck controller.
//!
//! This daemon reads button events from the Steam Deck's built-in controller
//! and re-emits them as key taps on a uinput virtual keyboard.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{error, info};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

use deckbd::config::Config;
use deckbd::controller::locator::{find_controller, EvdevBackend};
use deckbd::controller::source::ControllerEvents;
use deckbd::controller::translator::Translator;
use deckbd::daemon::{Remapper, RunStats};
use deckbd::error::DeckbdError;
use deckbd::output::sink::VirtualKeyboard;
use deckbd::shutdown::{install_signal_handlers, ShutdownToken};

/// Exit status of `query` when no controller is present
const QUERY_NOT_FOUND: u8 = 1;

#[derive(Debug, Parser)]
#[command(name = "deckbd", version, about = "Steam Deck controller to keyboard remapper")]
struct Cli {
    /// Configuration file (default: /etc/deckbd/config.toml if present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Default, Subcommand)]
enum Command {
    /// Remap controller buttons until interrupted
    #[default]
    Run,
    /// Only check whether the controller is present (exit 0 if found)
    Query,
}

/// Main entry point for deckbd
///
/// # Control Flow
///
/// 1. **Initialization**
///    - Load configuration, set up logging
///    - Install SIGINT/SIGTERM handlers
///    - Find the controller, create the virtual keyboard
///
/// 2. **Main Loop**
///    - Translate controller button cycles into key taps
///
/// 3. **Graceful Shutdown**
///    - Close the virtual keyboard, then the controller
///    - Log run totals
///
/// # Examples
///
/// ```bash
/// sudo deckbd
/// deckbd query && echo "controller present"
/// ```
#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = Config::discover(cli.config.as_deref());
    let level = config
        .as_ref()
        .map(|config| config.logging.level.clone())
        .unwrap_or_else(|_| "info".to_string());
    let _log_guard = init_logging(&level);

    let config = match config {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            return ExitCode::from(e.exit_code());
        }
    };

    match cli.command.unwrap_or_default() {
        Command::Query => ExitCode::from(query(&config)),
        Command::Run => match run(config).await {
            Ok(stats) => {
                info!(
                    "Deactivated. Events read: {}, keys emitted: {}, read errors: {}",
                    stats.events_read, stats.keystrokes_emitted, stats.read_errors
                );
                ExitCode::SUCCESS
            }
            Err(e) => {
                error!("{:#}", e);
                ExitCode::from(exit_code_of(&e))
            }
        },
    }
}

/// Initialize logging. `RUST_LOG` overrides the configured level.
fn init_logging(level: &str) -> WorkerGuard {
    let (writer, guard) = tracing_appender::non_blocking(std::io::stderr());

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .init();

    guard
}

/// Discovery only: report presence through the exit status.
fn query(config: &Config) -> u8 {
    let found = config.matcher().and_then(|matcher| {
        find_controller(&EvdevBackend::new(&config.controller.device_dir), &matcher)
    });

    match found {
        Ok(found) => {
            info!("Controller present at {}", found.path.display());
            0
        }
        Err(e) => {
            info!("{}", e);
            QUERY_NOT_FOUND
        }
    }
}

async fn run(config: Config) -> Result<RunStats> {
    info!("deckbd v{} starting...", env!("CARGO_PKG_VERSION"));

    let shutdown = ShutdownToken::new();
    let _signals = install_signal_handlers(shutdown.clone())?;

    let matcher = config.matcher()?;
    let backend = EvdevBackend::new(&config.controller.device_dir);
    let found = find_controller(&backend, &matcher).with_context(|| {
        format!(
            "no device in {} with vendor 0x{:04x}, product 0x{:04x}",
            backend.device_dir().display(),
            matcher.identity.vendor,
            matcher.identity.product
        )
    })?;

    let events = ControllerEvents::new(found.handle, found.path)
        .map_err(DeckbdError::from)
        .context("failed to watch controller")?;
    if let Some(name) = events.name() {
        info!("Controller: {} ({})", name, events.device_path().display());
    }

    let table = config.mapping_table()?;
    let keyboard = VirtualKeyboard::create(&config.virtual_device.name, &table.output_keys())?;

    let mut remapper = Remapper::new(events, Translator::new(table), keyboard, shutdown);
    let result = remapper.run().await;
    remapper.close();

    Ok(result?)
}

/// Exit status for a failed run, taken from the underlying [`DeckbdError`].
fn exit_code_of(error: &anyhow::Error) -> u8 {
    error
        .downcast_ref::<DeckbdError>()
        .map(DeckbdError::exit_code)
        .unwrap_or(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_defaults_to_run() {
        let cli = Cli::parse_from(["deckbd"]);
        assert!(cli.config.is_none());
        assert!(matches!(cli.command.unwrap_or_default(), Command::Run));
    }

    #[test]
    fn test_cli_query_with_config() {
        let cli = Cli::parse_from(["deckbd", "query", "--config", "/tmp/deckbd.toml"]);
        assert!(matches!(cli.command, Some(Command::Query)));
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/deckbd.toml")));
    }

    #[test]
    fn test_exit_code_through_context() {
        let err = anyhow::Error::new(DeckbdError::ControllerNotFound).context("while starting");
        assert_eq!(exit_code_of(&err), 3);
    }

    #[test]
    fn test_exit_code_for_foreign_error() {
        let err = anyhow::anyhow!("something else");
        assert_eq!(exit_code_of(&err), 1);
    }

    #[test]
    fn test_query_exit_code_when_directory_missing() {
        let mut config = Config::default();
        config.controller.device_dir = "/nonexistent/deckbd/input".to_string();
        assert_eq!(query(&config), QUERY_NOT_FOUND);
    }
}
