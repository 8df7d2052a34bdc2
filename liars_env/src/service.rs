//! The RPC service every agent exposes.

use async_trait::async_trait;
use crate::error::EnvError;
use crate::types::{LieRequest, LieResponse};

/// The single capability of an agent: answer a `LieQuery`.
///
/// # Implementations
///
/// - **Agent**: `liars_core::AgentNode` - holds one value, proxies on request
/// - **Tests**: fixed-value stubs served over real sockets
///
/// An `Err` is sent back to the caller as an error frame, so the caller
/// sees it as `EnvError::Remote`.
#[async_trait]
pub trait LieService: Send + Sync + 'static {
    /// Answers one request.
    async fn lie_query(&self, request: LieRequest) -> Result<LieResponse, EnvError>;
}
