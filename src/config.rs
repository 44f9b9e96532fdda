//! Command line and environment configuration

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

use crate::constants::{APP_NAME, APP_VERSION, DEFAULT_DB_DIR_NAME, LOG_FILE};
use crate::error::StorageError;
use crate::network::EngineConfig;
use crate::storage::ensure_dir;

/// Save, replay and inspect HTTP requests from the terminal
#[derive(Parser, Debug)]
#[command(name = "tanker")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Database directory (defaults to ~/tanker)
    #[arg(long, env = "TANKER_DB")]
    pub db: Option<PathBuf>,

    /// HTTP timeout in seconds
    #[arg(long, default_value = "30", env = "TANKER_TIMEOUT")]
    pub timeout: u64,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info", env = "TANKER_LOG_LEVEL")]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Serve the saved requests as agent tools over stdio
    Mcp,
}

/// Resolved settings for one run
#[derive(Debug, Clone)]
pub struct Config {
    pub db_dir: PathBuf,
    pub timeout: Duration,
    pub log_level: String,
    pub mode: Mode,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Interactive,
    AgentTools,
}

impl From<Cli> for Config {
    fn from(cli: Cli) -> Self {
        Config {
            db_dir: cli.db.unwrap_or_else(default_db_dir),
            timeout: Duration::from_secs(cli.timeout.max(1)),
            log_level: cli.log_level,
            mode: match cli.command {
                Some(Command::Mcp) => Mode::AgentTools,
                None => Mode::Interactive,
            },
        }
    }
}

impl Config {
    pub fn engine(&self) -> EngineConfig {
        EngineConfig {
            timeout: self.timeout,
            user_agent: format!("{}/{}", APP_NAME, APP_VERSION),
        }
    }

    /// File logger writing to `<db_dir>/tanker.log`; the directory is
    /// created first so nothing the store does on open is lost.
    /// Keep the guard alive until exit to flush buffered lines.
    pub fn log_subscriber(
        &self,
    ) -> Result<(impl tracing::Subscriber + Send + Sync, WorkerGuard), StorageError> {
        ensure_dir(&self.db_dir)?;
        let appender = tracing_appender::rolling::never(&self.db_dir, LOG_FILE);
        let (writer, guard) = tracing_appender::non_blocking(appender);
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&self.log_level));

        let subscriber = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(writer)
            .with_ansi(false)
            .finish();
        Ok((subscriber, guard))
    }
}

fn default_db_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(DEFAULT_DB_DIR_NAME)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::from(Cli::parse_from(["tanker"]));
        assert_eq!(config.mode, Mode::Interactive);
        assert_eq!(config.timeout, Duration::from_secs(30));
        assert!(config.db_dir.ends_with(DEFAULT_DB_DIR_NAME));
        assert_eq!(config.engine().timeout, Duration::from_secs(30));
    }

    #[test]
    fn test_flags_and_subcommand() {
        let cli = Cli::parse_from(["tanker", "--db", "/tmp/t", "--timeout", "5", "mcp"]);
        let config = Config::from(cli);
        assert_eq!(config.mode, Mode::AgentTools);
        assert_eq!(config.db_dir, PathBuf::from("/tmp/t"));
        assert_eq!(config.timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_first_run_seeding_reaches_the_log_file() {
        let dir = tempfile::tempdir().unwrap();
        let db = dir.path().join("fresh");
        let config = Config::from(Cli::parse_from([
            "tanker",
            "--db",
            db.to_str().unwrap(),
            "--log-level",
            "info",
        ]));

        let (subscriber, guard) = config.log_subscriber().unwrap();
        tracing::subscriber::with_default(subscriber, || {
            crate::storage::Storage::open(&config.db_dir).unwrap();
        });
        drop(guard);

        let log = std::fs::read_to_string(db.join(LOG_FILE)).unwrap();
        assert!(log.contains("Seeding request database"), "{log}");
    }
}
