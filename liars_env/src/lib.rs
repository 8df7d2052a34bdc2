//! Liars Network Environment Layer
//!
//! This crate holds everything an agent needs to talk to other agents:
//! identifiers, the `LieQuery` wire messages, the service trait an agent
//! implements, and the client trait used to query one.
//!
//! # Core Concept: one RPC, two modes
//!
//! - **Direct**: the agent answers with its own value
//! - **Proxied**: the agent queries a list of peers (Direct) and returns
//!   their values alongside its own
//!
//! Agents are addressed by the TCP port they bound, so an `AgentId` is
//! enough to reach one on a known host.
//!
//! # Example
//!
//! ```ignore
//! use liars_env::{AgentId, LieRequest, QueryTransport, TcpTransport};
//!
//! let transport = TcpTransport::localhost();
//! let response = transport.query(AgentId(50123), LieRequest::direct()).await?;
//! println!("agent says {}", response.value);
//! ```

mod error;
mod network;
mod service;
mod types;
mod tokio_impl;

pub use error::EnvError;
pub use network::QueryTransport;
pub use service::LieService;
pub use types::{AgentId, LieRequest, LieResponse, QueryMode, WireReply};
pub use tokio_impl::{bind, serve, TcpTransport};
