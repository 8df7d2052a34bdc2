//! Configuration for a liars network session.

use liars_core::AgentConfig;
use std::net::{IpAddr, Ipv4Addr};
use std::path::PathBuf;

/// Which command set the session accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum Mode {
    /// start / play / stop
    #[default]
    Standard,

    /// extend / playexpert / kill
    Expert,
}

impl Mode {
    /// Commands accepted in this mode, for error messages.
    pub fn commands(&self) -> &'static str {
        match self {
            Mode::Standard => "start, play & stop",
            Mode::Expert => "extend, playexpert & kill",
        }
    }
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Mode::Standard => write!(f, "standard"),
            Mode::Expert => write!(f, "expert"),
        }
    }
}

/// Configuration for a session.
#[derive(Debug, Clone)]
pub struct NetworkConfig {
    /// Command set
    pub mode: Mode,

    /// Port ledger file
    pub ledger_path: PathBuf,

    /// Interface agents bind on and are queried at
    pub bind_host: IpAddr,

    /// Seed for liar values (0 = random from time)
    pub seed: u64,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            mode: Mode::Standard,
            ledger_path: PathBuf::from("agents.config"),
            bind_host: IpAddr::V4(Ipv4Addr::LOCALHOST),
            seed: 0,
        }
    }
}

impl NetworkConfig {
    pub fn with_mode(mut self, mode: Mode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_ledger_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.ledger_path = path.into();
        self
    }

    pub fn with_bind_host(mut self, host: IpAddr) -> Self {
        self.bind_host = host;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Returns the configured seed, or one taken from the clock if it is 0.
    pub fn resolved_seed(&self) -> u64 {
        if self.seed != 0 {
            return self.seed;
        }
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_nanos() as u64)
            .unwrap_or(1)
    }

    /// Agent settings derived from this configuration.
    pub fn agent_config(&self) -> AgentConfig {
        AgentConfig::default().with_bind_host(self.bind_host)
    }
}
