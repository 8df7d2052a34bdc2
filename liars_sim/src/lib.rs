//! Liars network orchestration
//!
//! Launches agents on ephemeral TCP ports, decides which of them lie,
//! records their ports in a ledger file, and resolves the network value
//! from their answers.
//!
//! # Architecture
//!
//! ```text
//!  stdin line ──► Command::parse_line ──► Session::execute
//!                                              │
//!                                              ▼
//!                                        AgentNetwork ──► PortLedger
//!                                         │        │
//!                        direct query ────┘        └──── proxied query
//!                              │                             │
//!                     ┌────────▼───┐ ┌────────────┐   ┌──────▼─────┐
//!                     │  Agent #1  │ │  Agent #2  │◄──┤  Agent #0  │
//!                     └────────────┘ └────────────┘   │  (proxy)   │
//!                                                     └────────────┘
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use liars_sim::{NetworkConfig, Session};
//!
//! let mut session = Session::new(NetworkConfig::default());
//! session.execute("start --value 7 --max-value 50 --num-agents 5 --liar-ratio 0.4").await?;
//! println!("{}", session.execute("play").await?);
//! ```

pub mod command;
pub mod config;
mod error;
pub mod ledger;
pub mod orchestrator;
mod session;

pub use command::Command;
pub use config::{Mode, NetworkConfig};
pub use error::{CommandError, SimError};
pub use ledger::PortLedger;
pub use orchestrator::{AgentNetwork, KillOutcome, LaunchParams};
pub use session::{Reply, Session};
