//! Error types for the liars network transport layer.

use thiserror::Error;

/// Errors that can occur while serving or issuing a `LieQuery`.
#[derive(Debug, Error)]
pub enum EnvError {
    /// The agent could not obtain a listening port.
    #[error("Failed to bind listener on {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    /// Target agent could not be reached or the connection broke mid-call.
    #[error("Agent {agent} unreachable: {source}")]
    Unreachable {
        agent: String,
        #[source]
        source: std::io::Error,
    },

    /// An accepted connection failed while an agent was serving it.
    #[error("Connection from {peer} failed: {source}")]
    Connection {
        peer: String,
        #[source]
        source: std::io::Error,
    },

    /// The remote agent answered with an error (e.g. a failed proxy fan-out).
    #[error("Agent {agent} failed the query: {message}")]
    Remote { agent: String, message: String },

    /// The peer closed the connection or sent something that is not a frame.
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// An agent task ended before it could report back or be joined.
    #[error("Agent task failed: {0}")]
    Task(String),

    /// Frame serialization/deserialization failed
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl EnvError {
    /// Creates an unreachable error.
    pub fn unreachable(agent: impl std::fmt::Display, source: std::io::Error) -> Self {
        Self::Unreachable {
            agent: agent.to_string(),
            source,
        }
    }

    /// Creates a server-side connection error.
    pub fn connection(peer: impl std::fmt::Display, source: std::io::Error) -> Self {
        Self::Connection {
            peer: peer.to_string(),
            source,
        }
    }

    /// Creates a protocol error.
    pub fn protocol(msg: impl Into<String>) -> Self {
        Self::Protocol(msg.into())
    }
}
