//! Common types for the liars network transport.

use serde::{Deserialize, Serialize};
use std::net::{IpAddr, SocketAddr};

/// Identifier of a running agent.
///
/// This is the ephemeral TCP port the agent was bound to, so it is
/// unique among the agents of one host and never changes after bind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AgentId(pub u16);

impl AgentId {
    /// Returns the port number.
    pub fn port(&self) -> u16 {
        self.0
    }

    /// Returns the socket address of this agent on `host`.
    pub fn socket_addr(&self, host: IpAddr) -> SocketAddr {
        SocketAddr::new(host, self.0)
    }
}

impl std::fmt::Display for AgentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for AgentId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse::<u16>().map(AgentId)
    }
}

/// How a `LieQuery` should be answered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryMode {
    /// Answer with the agent's own value only.
    #[default]
    Direct,

    /// Fan out Direct queries to `peers` and return their values as well.
    Proxied,
}

/// A `LieQuery` request.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LieRequest {
    pub mode: QueryMode,

    /// Peers a proxy must query, in order. Empty for Direct.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub peers: Vec<AgentId>,
}

impl LieRequest {
    /// A plain request for the agent's own value.
    pub fn direct() -> Self {
        Self::default()
    }

    /// A request asking the receiver to act as proxy for `peers`.
    pub fn proxied(peers: Vec<AgentId>) -> Self {
        Self {
            mode: QueryMode::Proxied,
            peers,
        }
    }

    pub fn is_proxied(&self) -> bool {
        self.mode == QueryMode::Proxied
    }
}

/// A `LieQuery` response.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LieResponse {
    /// The responder's own claimed value.
    pub value: i32,

    /// Values gathered from the peers of a Proxied request, in request order.
    /// Never contains the responder's own value.
    #[serde(default)]
    pub collected_values: Vec<i32>,
}

impl LieResponse {
    pub fn direct(value: i32) -> Self {
        Self {
            value,
            collected_values: Vec::new(),
        }
    }

    /// Flattens the response into the sequence used for resolution:
    /// the responder's value first, then the collected values.
    pub fn all_values(&self) -> Vec<i32> {
        let mut values = Vec::with_capacity(1 + self.collected_values.len());
        values.push(self.value);
        values.extend_from_slice(&self.collected_values);
        values
    }
}

/// One reply frame on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum WireReply {
    Ok(LieResponse),
    Error { message: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_agent_id_parse_and_display() {
        let id: AgentId = " 50123 ".parse().unwrap();
        assert_eq!(id, AgentId(50123));
        assert_eq!(id.to_string(), "50123");
        assert!("70000".parse::<AgentId>().is_err());
    }

    #[test]
    fn test_direct_request_wire_shape() {
        let json = serde_json::to_string(&LieRequest::direct()).unwrap();
        assert_eq!(json, r#"{"mode":"direct"}"#);

        let parsed: LieRequest = serde_json::from_str(r#"{"mode":"direct"}"#).unwrap();
        assert!(!parsed.is_proxied());
        assert!(parsed.peers.is_empty());
    }

    #[test]
    fn test_proxied_request_wire_shape() {
        let request = LieRequest::proxied(vec![AgentId(4001), AgentId(4002)]);
        let json = serde_json::to_string(&request).unwrap();
        assert_eq!(json, r#"{"mode":"proxied","peers":[4001,4002]}"#);
    }

    #[test]
    fn test_reply_tagging() {
        let ok = WireReply::Ok(LieResponse {
            value: 7,
            collected_values: vec![1, 2],
        });
        let json = serde_json::to_string(&ok).unwrap();
        assert_eq!(json, r#"{"status":"ok","value":7,"collected_values":[1,2]}"#);

        let err: WireReply = serde_json::from_str(r#"{"status":"error","message":"boom"}"#).unwrap();
        assert_eq!(
            err,
            WireReply::Error {
                message: "boom".to_string()
            }
        );
    }

    #[test]
    fn test_all_values_puts_own_value_first() {
        let response = LieResponse {
            value: 9,
            collected_values: vec![3, 4],
        };
        assert_eq!(response.all_values(), vec![9, 3, 4]);
        assert_eq!(LieResponse::direct(5).all_values(), vec![5]);
    }
}
