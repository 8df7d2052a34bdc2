//! Liars Network Core - agents that may lie, and how to see through them
//!
//! This library provides the two pieces with actual distributed-systems content:
//! 1. **Agent runtime**: a node bound to an ephemeral port answering Direct and
//!    Proxied `LieQuery` calls, plus the handle used to control it
//! 2. **Resolution**: the frequency rule that recovers the network value from
//!    reported values and the number of agents assumed honest

pub mod agent_runtime;
pub mod handle;
pub mod resolution;

// Re-export key types for convenience
pub use agent_runtime::{AgentConfig, AgentNode, ServingState};
pub use handle::AgentHandle;
pub use resolution::{find_network_value, Resolution};
