//! Client-side transport abstraction for querying agents.

use async_trait::async_trait;
use crate::error::EnvError;
use crate::types::{AgentId, LieRequest, LieResponse};

/// Abstraction for issuing a `LieQuery` to an agent.
///
/// # Implementations
///
/// - **Production**: `TcpTransport` - one JSON-lines connection per call
///
/// # Call Flow
///
/// ```text
/// Caller                     Transport                   Agent
///   |                           |                          |
///   |-- query(id, request) ---->|-- connect + frame ------>|
///   |                           |<------------ reply frame-|
///   |<-- Ok(response) ----------|                          |
/// ```
///
/// There is no timeout and no retry: a hung agent stalls the caller,
/// an unreachable one fails it.
#[async_trait]
pub trait QueryTransport: Send + Sync + 'static {
    /// Sends `request` to `target` and waits for its answer.
    ///
    /// # Returns
    /// * `Ok(response)` - The agent answered
    /// * `Err(EnvError::Unreachable)` - Connect, write or read failed
    /// * `Err(EnvError::Remote)` - The agent answered with an error frame
    async fn query(&self, target: AgentId, request: LieRequest) -> Result<LieResponse, EnvError>;
}
