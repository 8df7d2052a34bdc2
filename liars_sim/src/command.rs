//! Interactive command grammar.
//!
//! Each stdin line is parsed with clap as if it were its own command line.
//! Flags may come in any order; unknown, missing or out-of-range flags are
//! rejected with clap's usage text.

use crate::error::CommandError;
use clap::{Args, Parser, Subcommand};

/// One parsed input line.
#[derive(Parser, Debug)]
#[command(name = "liars", no_binary_name = true)]
pub struct CommandLine {
    #[command(subcommand)]
    pub command: Command,
}

/// Session commands.
#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Launch a fresh network (standard mode)
    Start(LaunchArgs),

    /// Query every agent and resolve the network value (standard mode)
    Play,

    /// Stop every agent, delete the ledger and exit (standard mode)
    Stop,

    /// Add agents and re-split honest/liar values (expert mode)
    Extend(LaunchArgs),

    /// Query through agent 0 as proxy (expert mode)
    #[command(name = "playexpert")]
    PlayExpert(PlayExpertArgs),

    /// Stop a single agent by id (expert mode)
    Kill(KillArgs),
}

impl Command {
    /// Parses one input line.
    pub fn parse_line(line: &str) -> Result<Command, CommandError> {
        let line = CommandLine::try_parse_from(line.split_whitespace())
            .map_err(|e| CommandError::Usage(e.render().to_string()))?;

        if let Command::Start(args) | Command::Extend(args) = &line.command {
            args.validate()?;
        }
        Ok(line.command)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Command::Start(_) => "start",
            Command::Play => "play",
            Command::Stop => "stop",
            Command::Extend(_) => "extend",
            Command::PlayExpert(_) => "playexpert",
            Command::Kill(_) => "kill",
        }
    }
}

/// Flags shared by `start` and `extend`.
#[derive(Args, Debug, Clone, PartialEq)]
pub struct LaunchArgs {
    /// The true network value
    #[arg(long, allow_negative_numbers = true)]
    pub value: i32,

    /// Upper bound of liar values, drawn from [1, max-value]
    #[arg(long, value_parser = clap::value_parser!(i32).range(1..))]
    pub max_value: i32,

    /// Number of agents to create
    #[arg(long, value_parser = clap::value_parser!(u16).range(1..))]
    pub num_agents: u16,

    /// Fraction of the whole network that lies, in [0, 1]
    #[arg(long, value_parser = parse_liar_ratio)]
    pub liar_ratio: f64,
}

impl LaunchArgs {
    /// Rejects combinations that leave liars nothing to say.
    pub fn validate(&self) -> Result<(), CommandError> {
        if self.max_value == 1 && self.value == 1 {
            return Err(CommandError::NoLiarValue);
        }
        Ok(())
    }
}

/// Flags of `playexpert`.
#[derive(Args, Debug, Clone, PartialEq)]
pub struct PlayExpertArgs {
    /// Number of agents assumed present; must not exceed the running count
    #[arg(long, value_parser = clap::value_parser!(u16).range(1..))]
    pub num_agents: u16,

    /// Assumed liar ratio, in [0, 1]
    #[arg(long, value_parser = parse_liar_ratio)]
    pub liar_ratio: f64,
}

impl PlayExpertArgs {
    pub fn validate(&self, running: usize) -> Result<(), CommandError> {
        let requested = self.num_agents as usize;
        if requested > running {
            return Err(CommandError::TooManyAgents { requested, running });
        }
        Ok(())
    }
}

/// Flags of `kill`.
#[derive(Args, Debug, Clone, PartialEq)]
pub struct KillArgs {
    /// Agent id (its port), in [1, 65535]
    #[arg(long, value_parser = clap::value_parser!(u16).range(1..))]
    pub id: u16,
}

fn parse_liar_ratio(s: &str) -> Result<f64, String> {
    let ratio: f64 = s
        .parse()
        .map_err(|e| format!("cannot parse liar ratio {:?}: {}", s, e))?;
    if !(0.0..=1.0).contains(&ratio) {
        return Err("liar ratio must be >= 0 and <= 1".to_string());
    }
    Ok(ratio)
}
