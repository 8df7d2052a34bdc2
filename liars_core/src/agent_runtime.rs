//! Agent Runtime - the service each agent node runs.
//!
//! An agent holds a single integer it claims is the network value. Honest
//! agents hold the true value, liars hold something else; the node itself
//! does not know which one it is.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────┐
//! │                    AgentNode                    │
//! │  value: AtomicI32  (shared with AgentHandle)    │
//! │                                                 │
//! │  lie_query(Direct)  → { value }                 │
//! │  lie_query(Proxied) → { value, [peer values] }  │
//! │          │                                      │
//! │  ┌───────▼─────────────────────────────────┐    │
//! │  │  network: QueryTransport (Direct only)  │    │
//! │  └─────────────────────────────────────────┘    │
//! └─────────────────────────────────────────────────┘
//! ```
//!
//! Fan-out sub-queries are always Direct, so a peer never proxies on behalf
//! of a proxy.

use async_trait::async_trait;
use liars_env::{AgentId, EnvError, LieRequest, LieResponse, LieService, QueryTransport};
use std::net::{IpAddr, Ipv4Addr};
use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::Arc;
use tracing::debug;

/// Configuration for spawning agents.
#[derive(Debug, Clone)]
pub struct AgentConfig {
    /// Logical name used in logs
    pub name: String,

    /// Interface agents bind their ephemeral port on (default: 127.0.0.1)
    pub bind_host: IpAddr,
}

impl AgentConfig {
    /// Sets the bind host.
    pub fn with_bind_host(mut self, host: IpAddr) -> Self {
        self.bind_host = host;
        self
    }
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            name: "liar-agent".to_string(),
            bind_host: IpAddr::V4(Ipv4Addr::LOCALHOST),
        }
    }
}

/// Lifecycle of an agent node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServingState {
    /// Spawned, port not yet assigned
    Unbound,

    /// Port assigned, answering queries
    Listening,

    /// Serving loop ended, port released
    Stopped,
}

/// The service half of an agent.
///
/// Generic over the transport used for proxy fan-out so the same node
/// can be exercised over TCP or an in-memory stub.
pub struct AgentNode<Net>
where
    Net: QueryTransport,
{
    /// Bound port, fixed for the node's lifetime
    pub id: AgentId,

    /// Claimed network value
    value: Arc<AtomicI32>,

    /// Transport for fan-out sub-queries
    network: Arc<Net>,
}

impl<Net> AgentNode<Net>
where
    Net: QueryTransport,
{
    /// Creates a node that reads its value from `value`.
    pub fn new(id: AgentId, value: Arc<AtomicI32>, network: Arc<Net>) -> Self {
        Self { id, value, network }
    }

    /// Returns the currently held value.
    pub fn value(&self) -> i32 {
        self.value.load(Ordering::SeqCst)
    }

    /// Queries every peer in order and collects their values.
    ///
    /// The first failure aborts the whole fan-out.
    async fn fan_out(&self, peers: &[AgentId]) -> Result<Vec<i32>, EnvError> {
        let mut collected = Vec::with_capacity(peers.len());
        for peer in peers {
            let response = self.network.query(*peer, LieRequest::direct()).await?;
            collected.push(response.value);
        }
        Ok(collected)
    }
}

#[async_trait]
impl<Net> LieService for AgentNode<Net>
where
    Net: QueryTransport,
{
    async fn lie_query(&self, request: LieRequest) -> Result<LieResponse, EnvError> {
        let value = self.value();

        if !request.is_proxied() {
            debug!("Agent {} answering direct query with {}", self.id, value);
            return Ok(LieResponse::direct(value));
        }

        debug!(
            "Agent {} proxying query to {} peers",
            self.id,
            request.peers.len()
        );
        let collected_values = self.fan_out(&request.peers).await?;

        Ok(LieResponse {
            value,
            collected_values,
        })
    }
}
