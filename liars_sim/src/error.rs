//! Error types for the orchestrator and the command surface.

use liars_env::{AgentId, EnvError};
use std::path::PathBuf;
use thiserror::Error;

/// Hard failures. Each names the operation that failed.
#[derive(Debug, Error)]
pub enum SimError {
    /// An agent could not be created
    #[error("launch failed: {0}")]
    Launch(#[source] EnvError),

    /// A direct query round could not be completed
    #[error("query failed: {0}")]
    Query(#[source] EnvError),

    /// The proxy could not be reached or its fan-out failed
    #[error("proxied query failed: {0}")]
    ProxiedQuery(#[source] EnvError),

    #[error("stopping agent {id} failed: {source}")]
    Stop {
        id: AgentId,
        #[source]
        source: EnvError,
    },

    /// Port ledger I/O
    #[error("ledger {op} failed for {}: {source}", .path.display())]
    Ledger {
        op: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// No liar value exists in `[1, max_value]` besides the honest one
    #[error("no liar value available: value {value}, max value {max_value}")]
    NoLiarValue { value: i32, max_value: i32 },

    #[error("no agents are running")]
    EmptyNetwork,

    #[error("reading commands failed: {0}")]
    Input(#[source] std::io::Error),
}

impl SimError {
    pub(crate) fn ledger(op: &'static str, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Ledger {
            op,
            path: path.into(),
            source,
        }
    }
}

/// A command line that was rejected before reaching the orchestrator.
///
/// These are reported to the user and the session goes on.
#[derive(Debug, Error)]
pub enum CommandError {
    /// Grammar errors, rendered by clap with usage text
    #[error("{0}")]
    Usage(String),

    #[error(
        "value and max-value cannot both be 1, because a liar value x needs \
         1 <= x <= max-value and x != value"
    )]
    NoLiarValue,

    #[error("num-agents must be <= the number of running agents ({running}), got {requested}")]
    TooManyAgents { requested: usize, running: usize },
}
