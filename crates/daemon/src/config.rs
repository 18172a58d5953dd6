//! Daemon configuration from ROSTER_* environment variables

use roster_core::application::{EngineConfig, LateJoinPolicy};
use roster_core::error::{AppError, Result};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

const DEFAULT_DB_PATH: &str = "~/.roster/roster.db";
const DEFAULT_RPC_HOST: &str = "127.0.0.1";
const DEFAULT_RPC_PORT: u16 = 9630;
const DEFAULT_OP_TIMEOUT_MS: u64 = 5_000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Backend {
    Sqlite { db_path: String },
    /// `None` keeps the collection in memory only
    Document { path: Option<PathBuf> },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

impl FromStr for LogFormat {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "pretty" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            other => Err(AppError::Config(format!(
                "ROSTER_LOG_FORMAT must be pretty or json, got {}",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone)]
pub struct DaemonConfig {
    pub backend: Backend,
    pub rpc_host: String,
    pub rpc_port: u16,
    pub op_timeout: Duration,
    pub late_join: LateJoinPolicy,
    pub log_format: LogFormat,
}

impl DaemonConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup (the process environment in production)
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let backend = match var("ROSTER_BACKEND").as_deref().map(str::to_ascii_lowercase) {
            None => sqlite_backend(var("ROSTER_DB_PATH")),
            Some(name) if name == "sqlite" => sqlite_backend(var("ROSTER_DB_PATH")),
            Some(name) if name == "document" => Backend::Document {
                path: var("ROSTER_DOCUMENT_PATH")
                    .map(|p| PathBuf::from(shellexpand::tilde(&p).into_owned())),
            },
            Some(other) => {
                return Err(AppError::Config(format!(
                    "ROSTER_BACKEND must be sqlite or document, got {}",
                    other
                )))
            }
        };

        let rpc_port = match var("ROSTER_RPC_PORT") {
            Some(raw) => raw.parse().map_err(|_| {
                AppError::Config(format!("ROSTER_RPC_PORT is not a port number: {}", raw))
            })?,
            None => DEFAULT_RPC_PORT,
        };

        let op_timeout_ms = match var("ROSTER_OP_TIMEOUT_MS") {
            Some(raw) => raw.parse::<u64>().ok().filter(|ms| *ms > 0).ok_or_else(|| {
                AppError::Config(format!(
                    "ROSTER_OP_TIMEOUT_MS must be a positive integer, got {}",
                    raw
                ))
            })?,
            None => DEFAULT_OP_TIMEOUT_MS,
        };

        let late_join = match var("ROSTER_LATE_JOIN") {
            Some(raw) => raw.parse()?,
            None => LateJoinPolicy::default(),
        };

        let log_format = match var("ROSTER_LOG_FORMAT") {
            Some(raw) => raw.parse()?,
            None => LogFormat::Pretty,
        };

        Ok(Self {
            backend,
            rpc_host: var("ROSTER_RPC_HOST").unwrap_or_else(|| DEFAULT_RPC_HOST.to_string()),
            rpc_port,
            op_timeout: Duration::from_millis(op_timeout_ms),
            late_join,
            log_format,
        })
    }

    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            op_timeout: self.op_timeout,
            late_join: self.late_join,
            ..EngineConfig::default()
        }
    }
}

fn sqlite_backend(db_path: Option<String>) -> Backend {
    let raw = db_path.unwrap_or_else(|| DEFAULT_DB_PATH.to_string());
    Backend::Sqlite {
        db_path: shellexpand::tilde(&raw).into_owned(),
    }
}
