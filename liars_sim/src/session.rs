//! Interactive session - turns command lines into orchestrator calls.
//!
//! A session accepts one command set (standard or expert). Rejected input
//! comes back as `Reply::Rejected` and the session carries on; only
//! `SimError`s (bind failures, unreachable agents, ledger I/O) end it.

use crate::command::{Command, LaunchArgs};
use crate::config::{Mode, NetworkConfig};
use crate::error::SimError;
use crate::ledger::PortLedger;
use crate::orchestrator::{assumed_honest_count, AgentNetwork, KillOutcome, LaunchParams};

use liars_core::Resolution;
use liars_env::{AgentId, TcpTransport};
use serde::Serialize;
use tracing::{debug, info, warn};

/// What the user sees after a command.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Reply {
    /// Agents launched or extended
    Ready { agents: usize, honest: usize },

    /// A query round finished
    Resolved {
        resolution: Resolution,
        #[serde(skip_serializing_if = "Option::is_none")]
        warning: Option<String>,
    },

    Killed { id: AgentId },

    NotFound { id: AgentId },

    /// Input rejected before reaching the network
    Rejected { message: String },

    /// Every agent stopped; the session is over
    Stopped,
}

impl Reply {
    fn rejected(message: impl Into<String>) -> Self {
        Reply::Rejected {
            message: message.into(),
        }
    }

    /// Returns true if the session should end after this reply.
    pub fn is_final(&self) -> bool {
        matches!(self, Reply::Stopped)
    }
}

impl std::fmt::Display for Reply {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Reply::Ready { .. } => write!(f, "Ready"),
            Reply::Resolved {
                resolution,
                warning,
            } => {
                if let Some(warning) = warning {
                    writeln!(f, "Warning: {}", warning)?;
                }
                match resolution.value() {
                    Some(value) => write!(f, "The network value is {}", value),
                    None => write!(
                        f,
                        "The network value cannot be decided because the liar agents \
                         successfully fooled the client."
                    ),
                }
            }
            Reply::Killed { id } => write!(f, "Agent {} stopped", id),
            Reply::NotFound { id } => {
                write!(f, "Fails to find a matching agent whose id/port number is {}", id)
            }
            Reply::Rejected { message } => write!(f, "{}", message.trim_end()),
            Reply::Stopped => write!(f, "All agents stopped"),
        }
    }
}

/// One interactive session.
pub struct Session {
    config: NetworkConfig,
    network: AgentNetwork<TcpTransport>,

    /// `start` already ran
    started: bool,

    /// This session created or appended to the ledger
    ledger_written: bool,
}

impl Session {
    /// Creates a session with no agents.
    pub fn new(config: NetworkConfig) -> Self {
        let seed = config.resolved_seed();
        info!("Session in {} mode (seed={})", config.mode, seed);

        let network = AgentNetwork::new(
            config.agent_config(),
            TcpTransport::shared(config.bind_host),
            seed,
        );
        Self {
            config,
            network,
            started: false,
            ledger_written: false,
        }
    }

    pub fn mode(&self) -> Mode {
        self.config.mode
    }

    pub fn network(&self) -> &AgentNetwork<TcpTransport> {
        &self.network
    }

    /// Executes one input line.
    pub async fn execute(&mut self, line: &str) -> Result<Reply, SimError> {
        let command = match Command::parse_line(line) {
            Ok(command) => command,
            Err(e) => return Ok(Reply::rejected(e.to_string())),
        };

        if !self.accepts(&command) {
            debug!("Rejecting {} in {} mode", command.name(), self.mode());
            return Ok(Reply::rejected(format!(
                "Please only enter the available commands in {} mode: {}.",
                self.config.mode,
                self.config.mode.commands()
            )));
        }

        match command {
            Command::Start(args) => {
                if self.started {
                    return Ok(Reply::rejected(
                        "The start command has already been run. You cannot rerun it.",
                    ));
                }
                let mut ledger = PortLedger::create(&self.config.ledger_path)?;
                self.ledger_written = true;
                let reply = self.launch(&args, &mut ledger).await?;
                self.started = true;
                Ok(reply)
            }
            Command::Extend(args) => {
                let mut ledger = PortLedger::open_append(&self.config.ledger_path)?;
                self.ledger_written = true;
                self.launch(&args, &mut ledger).await
            }
            Command::Play => {
                if self.network.is_empty() {
                    return Ok(Reply::rejected(
                        "Please make sure you enter the start command first before you play.",
                    ));
                }
                let resolution = self.network.query().await?;
                Ok(Reply::Resolved {
                    resolution,
                    warning: None,
                })
            }
            Command::PlayExpert(args) => {
                if self.network.is_empty() {
                    return Ok(Reply::rejected(
                        "Please make sure you enter the extend command first before you playexpert.",
                    ));
                }
                if let Err(e) = args.validate(self.network.len()) {
                    return Ok(Reply::rejected(e.to_string()));
                }

                let assumed = assumed_honest_count(self.network.len(), args.liar_ratio);
                let warning = (assumed != self.network.honest_count()).then(|| {
                    warn!(
                        "Assumed honest count {} differs from {}",
                        assumed,
                        self.network.honest_count()
                    );
                    "the input of liar-ratio in playexpert differs from that of the most recent extend."
                        .to_string()
                });

                let resolution = self.network.proxied_query(assumed).await?;
                Ok(Reply::Resolved {
                    resolution,
                    warning,
                })
            }
            Command::Kill(args) => {
                let id = AgentId(args.id);
                match self.network.kill(id).await? {
                    KillOutcome::Killed => Ok(Reply::Killed { id }),
                    KillOutcome::NotFound => Ok(Reply::NotFound { id }),
                }
            }
            Command::Stop => {
                self.shutdown().await?;
                Ok(Reply::Stopped)
            }
        }
    }

    /// Stops every agent.
    ///
    /// In standard mode the ledger is deleted too, but only if this session
    /// wrote it. Expert mode keeps the ledger so a later session can extend it.
    pub async fn shutdown(&mut self) -> Result<(), SimError> {
        self.network.stop_all().await?;

        let path = &self.config.ledger_path;
        if self.mode() == Mode::Expert || !self.ledger_written {
            debug!("Keeping {}", path.display());
            return Ok(());
        }
        if path.exists() {
            info!("Deleting {}", path.display());
            PortLedger::remove(path)?;
        }
        self.ledger_written = false;
        Ok(())
    }

    fn accepts(&self, command: &Command) -> bool {
        match self.config.mode {
            Mode::Standard => matches!(command, Command::Start(_) | Command::Play | Command::Stop),
            Mode::Expert => matches!(
                command,
                Command::Extend(_) | Command::PlayExpert(_) | Command::Kill(_)
            ),
        }
    }

    async fn launch(&mut self, args: &LaunchArgs, ledger: &mut PortLedger) -> Result<Reply, SimError> {
        let params = LaunchParams {
            value: args.value,
            max_value: args.max_value,
            num_agents: args.num_agents as usize,
            liar_ratio: args.liar_ratio,
        };
        self.network.launch_or_extend(&params, ledger).await?;

        Ok(Reply::Ready {
            agents: self.network.len(),
            honest: self.network.honest_count(),
        })
    }
}
