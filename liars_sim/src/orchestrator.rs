//! AgentNetwork - launches agents, assigns liars, and resolves queries.
//!
//! All orchestrator state (the live handles, the honest count, the RNG)
//! lives in one `AgentNetwork` value that each operation takes by
//! reference, so a test can drive several independent networks at once.

use crate::error::SimError;
use crate::ledger::PortLedger;

use liars_core::{find_network_value, AgentConfig, AgentHandle, Resolution};
use liars_env::{AgentId, LieRequest, QueryTransport, TcpTransport};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::sync::Arc;
use tracing::{debug, info};

/// Parameters of a launch or extend.
#[derive(Debug, Clone, PartialEq)]
pub struct LaunchParams {
    /// The true network value
    pub value: i32,

    /// Liar values are drawn from `[1, max_value]`
    pub max_value: i32,

    /// Agents to create
    pub num_agents: usize,

    /// Fraction of the whole network (old + new agents) that lies
    pub liar_ratio: f64,
}

/// Result of a kill.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KillOutcome {
    Killed,
    NotFound,
}

/// Number of liars in a network of `total` agents.
pub fn liar_count(total: usize, liar_ratio: f64) -> usize {
    (liar_ratio * total as f64).floor() as usize
}

/// Number of honest agents implied by `liar_ratio` over `total` agents.
pub fn assumed_honest_count(total: usize, liar_ratio: f64) -> usize {
    total - liar_count(total, liar_ratio).min(total)
}

/// The running set of agents.
pub struct AgentNetwork<Net = TcpTransport>
where
    Net: QueryTransport,
{
    /// Live agents; index 0 is the proxy for proxied queries
    agents: Vec<AgentHandle>,

    /// Honest agents as of the last launch/extend
    honest_count: usize,

    /// Settings for newly spawned agents
    agent_config: AgentConfig,

    /// Transport for queries (shared with the agents for fan-out)
    network: Arc<Net>,

    /// Liar value source
    rng: ChaCha8Rng,
}

impl<Net> AgentNetwork<Net>
where
    Net: QueryTransport,
{
    /// Creates an empty network.
    pub fn new(agent_config: AgentConfig, network: Arc<Net>, seed: u64) -> Self {
        Self {
            agents: Vec::new(),
            honest_count: 0,
            agent_config,
            network,
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    pub fn agents(&self) -> &[AgentHandle] {
        &self.agents
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }

    pub fn honest_count(&self) -> usize {
        self.honest_count
    }

    pub fn liar_count(&self) -> usize {
        self.agents.len().saturating_sub(self.honest_count)
    }

    /// Ids of all live agents, in order.
    pub fn ids(&self) -> Vec<AgentId> {
        self.agents.iter().map(AgentHandle::id).collect()
    }

    /// Creates `params.num_agents` agents and re-splits the whole network.
    ///
    /// The first `liar_count` indices lie. Indices below `num_agents` are
    /// new agents (appended after the existing ones); the rest map onto the
    /// pre-existing agents, whose values are overwritten. Each new agent is
    /// bound and its port written to `ledger` before the next one starts.
    pub async fn launch_or_extend(
        &mut self,
        params: &LaunchParams,
        ledger: &mut PortLedger,
    ) -> Result<(), SimError> {
        let existing = self.agents.len();
        let total = existing + params.num_agents;
        let liars = liar_count(total, params.liar_ratio).min(total);

        if liars > 0 && (params.max_value < 1 || (params.max_value == 1 && params.value == 1)) {
            return Err(SimError::NoLiarValue {
                value: params.value,
                max_value: params.max_value,
            });
        }

        info!(
            "Launching {} agents ({} existing, {} liars of {})",
            params.num_agents, existing, liars, total
        );

        for i in 0..total {
            let value = if i < liars {
                self.draw_liar_value(params.value, params.max_value)
            } else {
                params.value
            };

            if i < params.num_agents {
                let agent = AgentHandle::spawn(&self.agent_config, Arc::clone(&self.network), value)
                    .await
                    .map_err(SimError::Launch)?;
                let id = agent.id();
                self.agents.push(agent);
                ledger.append(id)?;
                debug!("Agent {} up with value {}", id, value);
            } else {
                let agent = &self.agents[i - params.num_agents];
                info!("Existing agent {} updating its value", agent.id());
                agent.update_value(value);
            }
        }

        self.honest_count = total - liars;
        Ok(())
    }

    /// Queries every agent directly and resolves with the recorded honest count.
    pub async fn query(&self) -> Result<Resolution, SimError> {
        if self.agents.is_empty() {
            return Err(SimError::EmptyNetwork);
        }

        let mut values = Vec::with_capacity(self.agents.len());
        for agent in &self.agents {
            let response = self
                .network
                .query(agent.id(), LieRequest::direct())
                .await
                .map_err(SimError::Query)?;
            values.push(response.value);
        }

        debug!("Collected {} values: {:?}", values.len(), values);
        Ok(find_network_value(&values, self.honest_count))
    }

    /// Queries through agent 0, which fans out to every other agent.
    pub async fn proxied_query(&self, assumed_honest_count: usize) -> Result<Resolution, SimError> {
        let (proxy, others) = self.agents.split_first().ok_or(SimError::EmptyNetwork)?;
        let peers: Vec<AgentId> = others.iter().map(AgentHandle::id).collect();

        let response = self
            .network
            .query(proxy.id(), LieRequest::proxied(peers))
            .await
            .map_err(SimError::ProxiedQuery)?;

        let values = response.all_values();
        debug!("Proxy {} collected {} values: {:?}", proxy.id(), values.len(), values);
        Ok(find_network_value(&values, assumed_honest_count))
    }

    /// Stops and removes the agent with `id`.
    ///
    /// Removal swaps the last agent into the freed slot.
    pub async fn kill(&mut self, id: AgentId) -> Result<KillOutcome, SimError> {
        let Some(index) = self.agents.iter().position(|agent| agent.matches(id)) else {
            return Ok(KillOutcome::NotFound);
        };

        let agent = self.agents.swap_remove(index);
        agent
            .stop()
            .await
            .map_err(|source| SimError::Stop { id, source })?;
        Ok(KillOutcome::Killed)
    }

    /// Stops every agent and empties the network.
    pub async fn stop_all(&mut self) -> Result<(), SimError> {
        for agent in std::mem::take(&mut self.agents) {
            let id = agent.id();
            agent
                .stop()
                .await
                .map_err(|source| SimError::Stop { id, source })?;
        }
        self.honest_count = 0;
        Ok(())
    }

    fn draw_liar_value(&mut self, honest: i32, max_value: i32) -> i32 {
        loop {
            let candidate = self.rng.gen_range(1..=max_value);
            if candidate != honest {
                return candidate;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use liars_core::ServingState;
    use proptest::prelude::*;
    use std::net::{IpAddr, Ipv4Addr};
    use tempfile::TempDir;

    fn network(seed: u64) -> AgentNetwork {
        AgentNetwork::new(AgentConfig::default(), Arc::new(TcpTransport::localhost()), seed)
    }

    fn ledger() -> (TempDir, PortLedger) {
        let dir = tempfile::tempdir().unwrap();
        let ledger = PortLedger::create(dir.path().join("agents.config")).unwrap();
        (dir, ledger)
    }

    fn params(value: i32, num_agents: usize, liar_ratio: f64) -> LaunchParams {
        LaunchParams {
            value,
            max_value: 1_000,
            num_agents,
            liar_ratio,
        }
    }

    #[test]
    fn test_counts() {
        assert_eq!(liar_count(5, 0.4), 2);
        assert_eq!(liar_count(3, 0.5), 1);
        assert_eq!(liar_count(4, 1.0), 4);
        assert_eq!(assumed_honest_count(5, 0.4), 3);
        assert_eq!(assumed_honest_count(7, 0.0), 7);
    }

    proptest! {
        #[test]
        fn prop_liars_and_honest_partition_total(total in 0usize..10_000, ratio in 0.0f64..=1.0) {
            let liars = liar_count(total, ratio);
            prop_assert!(liars <= total);
            prop_assert_eq!(liars + assumed_honest_count(total, ratio), total);
        }
    }

    #[tokio::test]
    async fn test_launch_assigns_partition_and_records_ports() {
        let (_dir, mut ledger) = ledger();
        let mut net = network(7);

        net.launch_or_extend(&params(42, 5, 0.4), &mut ledger).await.unwrap();

        assert_eq!(net.len(), 5);
        assert_eq!(net.honest_count(), 3);
        assert_eq!(net.liar_count(), 2);

        let values: Vec<i32> = net.agents().iter().map(AgentHandle::value).collect();
        assert_eq!(values.iter().filter(|v| **v == 42).count(), 3);
        assert!(values[..2].iter().all(|v| *v != 42 && (1..=1_000).contains(v)));
        assert!(net.agents().iter().all(|a| a.state() == ServingState::Listening));

        // Ledger holds the ports in creation order
        assert_eq!(PortLedger::read_all(ledger.path()).unwrap(), net.ids());

        net.stop_all().await.unwrap();
    }

    #[tokio::test]
    async fn test_direct_query_resolves_true_value() {
        let (_dir, mut ledger) = ledger();
        let mut net = network(11);
        net.launch_or_extend(&params(42, 5, 0.4), &mut ledger).await.unwrap();

        // 2 liars can never reach the honest frequency of 3
        assert_eq!(net.query().await.unwrap(), Resolution::Decided(42));

        net.stop_all().await.unwrap();
    }

    #[tokio::test]
    async fn test_proxied_query_matches_direct_query() {
        let (_dir, mut ledger) = ledger();
        let mut net = network(3);
        net.launch_or_extend(&params(-8, 7, 0.25), &mut ledger).await.unwrap();

        let direct = net.query().await.unwrap();
        let proxied = net.proxied_query(net.honest_count()).await.unwrap();
        assert_eq!(direct, Resolution::Decided(-8));
        assert_eq!(proxied, direct);

        net.stop_all().await.unwrap();
    }

    #[tokio::test]
    async fn test_colluding_liars_leave_round_undecided() {
        let (_dir, mut ledger) = ledger();
        let mut net = network(5);
        net.launch_or_extend(&params(10, 4, 0.5), &mut ledger).await.unwrap();
        assert_eq!(net.honest_count(), 2);

        // Both liars agree on 99 and tie with the two honest agents
        net.agents()[0].update_value(99);
        net.agents()[1].update_value(99);
        assert_eq!(net.query().await.unwrap(), Resolution::Undecided);
        assert_eq!(net.proxied_query(2).await.unwrap(), Resolution::Undecided);

        net.stop_all().await.unwrap();
    }

    #[tokio::test]
    async fn test_extend_reassigns_existing_agents() {
        let (_dir, mut ledger) = ledger();
        let mut net = network(9);
        net.launch_or_extend(&params(5, 3, 0.0), &mut ledger).await.unwrap();
        let original_ids = net.ids();
        assert!(net.agents().iter().all(|a| a.value() == 5));

        net.launch_or_extend(&params(6, 2, 0.4), &mut ledger).await.unwrap();

        // total 5, 2 liars, the two new agents take the liar slots
        assert_eq!(net.len(), 5);
        assert_eq!(net.honest_count() + net.liar_count(), 5);
        assert_eq!(net.honest_count(), 3);
        assert_eq!(&net.ids()[..3], original_ids.as_slice());
        assert!(net.agents()[..3].iter().all(|a| a.value() == 6));
        assert!(net.agents()[3..].iter().all(|a| a.value() != 6));

        assert_eq!(PortLedger::read_all(ledger.path()).unwrap(), net.ids());
        assert_eq!(net.query().await.unwrap(), Resolution::Decided(6));

        net.stop_all().await.unwrap();
    }

    #[tokio::test]
    async fn test_kill_removes_exactly_one_agent() {
        let (_dir, mut ledger) = ledger();
        let mut net = network(1);
        net.launch_or_extend(&params(3, 4, 0.0), &mut ledger).await.unwrap();

        let ids = net.ids();
        let victim = ids[1];
        assert_eq!(net.kill(victim).await.unwrap(), KillOutcome::Killed);
        assert_eq!(net.len(), 3);

        let mut remaining = net.ids();
        remaining.sort();
        let mut expected: Vec<AgentId> = ids.iter().copied().filter(|id| *id != victim).collect();
        expected.sort();
        assert_eq!(remaining, expected);
        assert!(net.agents().iter().all(|a| a.value() == 3));

        // Unknown id leaves everything alone
        assert_eq!(net.kill(victim).await.unwrap(), KillOutcome::NotFound);
        assert_eq!(net.len(), 3);

        net.stop_all().await.unwrap();
        assert!(net.is_empty());
    }

    #[tokio::test]
    async fn test_unreachable_agents_fail_the_round() {
        let (_dir, mut ledger) = ledger();
        // Agents bind on 127.0.0.1 but are looked for on 127.0.0.2
        let mut net = AgentNetwork::new(
            AgentConfig::default(),
            Arc::new(TcpTransport::new(IpAddr::V4(Ipv4Addr::new(127, 0, 0, 2)))),
            4,
        );
        net.launch_or_extend(&params(3, 3, 0.0), &mut ledger).await.unwrap();

        assert!(matches!(net.query().await, Err(SimError::Query(_))));
        assert!(matches!(net.proxied_query(3).await, Err(SimError::ProxiedQuery(_))));

        net.stop_all().await.unwrap();
    }

    #[tokio::test]
    async fn test_empty_network_errors() {
        let net = network(1);
        assert!(matches!(net.query().await, Err(SimError::EmptyNetwork)));
        assert!(matches!(net.proxied_query(1).await, Err(SimError::EmptyNetwork)));
    }

    #[tokio::test]
    async fn test_impossible_liar_value_is_rejected() {
        let (_dir, mut ledger) = ledger();
        let mut net = network(1);
        let params = LaunchParams {
            value: 1,
            max_value: 1,
            num_agents: 2,
            liar_ratio: 0.5,
        };
        let err = net.launch_or_extend(&params, &mut ledger).await.unwrap_err();
        assert!(matches!(err, SimError::NoLiarValue { .. }));
        assert!(net.is_empty());
    }
}
