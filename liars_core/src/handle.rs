//! AgentHandle - the orchestrator's grip on a running agent.
//!
//! `AgentHandle::spawn` starts the agent task and waits for it to report
//! its bound port over a one-shot channel. Only then does it return, so
//! a caller that records the id (e.g. in the port ledger) always records
//! a port that is already bound.

use crate::agent_runtime::{AgentConfig, AgentNode, ServingState};
use liars_env::{AgentId, EnvError, QueryTransport};
use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::Arc;
use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// Handle to a running agent.
///
/// Dropping the handle without calling `stop` also shuts the agent down,
/// since the shutdown channel closes.
#[derive(Debug)]
pub struct AgentHandle {
    /// Agent's bound port
    id: AgentId,

    /// Value cell shared with the node
    value: Arc<AtomicI32>,

    /// Serving state published by the agent task
    state: watch::Receiver<ServingState>,

    /// Fires the serving loop's shutdown
    shutdown: oneshot::Sender<()>,

    /// The agent task
    task: JoinHandle<()>,
}

impl AgentHandle {
    /// Spawns an agent holding `value` and waits until it is bound.
    ///
    /// # Errors
    /// * `EnvError::Bind` - no port could be bound; nothing keeps running
    /// * `EnvError::Task` - the agent task died before reporting
    pub async fn spawn<Net>(
        config: &AgentConfig,
        network: Arc<Net>,
        value: i32,
    ) -> Result<Self, EnvError>
    where
        Net: QueryTransport,
    {
        let value = Arc::new(AtomicI32::new(value));
        let (bound_tx, bound_rx) = oneshot::channel::<Result<AgentId, EnvError>>();
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let (state_tx, state_rx) = watch::channel(ServingState::Unbound);

        let host = config.bind_host;
        let name = config.name.clone();
        let node_value = Arc::clone(&value);

        let task = tokio::spawn(async move {
            let (listener, id) = match liars_env::bind(host).await {
                Ok(bound) => bound,
                Err(e) => {
                    let _ = bound_tx.send(Err(e));
                    return;
                }
            };

            let node = Arc::new(AgentNode::new(id, node_value, network));
            state_tx.send_replace(ServingState::Listening);
            if bound_tx.send(Ok(id)).is_err() {
                // Creator went away before the handoff
                state_tx.send_replace(ServingState::Stopped);
                return;
            }

            debug!("{} listening on port {}", name, id);
            liars_env::serve(listener, node, shutdown_rx).await;
            state_tx.send_replace(ServingState::Stopped);
            debug!("{} on port {} stopped", name, id);
        });

        let id = match bound_rx.await {
            Ok(bound) => bound?,
            Err(_) => {
                return Err(EnvError::Task(
                    "agent task exited before reporting its port".to_string(),
                ))
            }
        };

        Ok(Self {
            id,
            value,
            state: state_rx,
            shutdown: shutdown_tx,
            task,
        })
    }

    /// Returns the agent's id (its bound port).
    pub fn id(&self) -> AgentId {
        self.id
    }

    /// Returns true if this handle refers to agent `id`.
    pub fn matches(&self, id: AgentId) -> bool {
        self.id == id
    }

    /// Returns the value the agent currently claims.
    pub fn value(&self) -> i32 {
        self.value.load(Ordering::SeqCst)
    }

    /// Replaces the agent's value for all subsequent queries.
    pub fn update_value(&self, value: i32) {
        self.value.store(value, Ordering::SeqCst);
    }

    /// Returns the agent's serving state.
    pub fn state(&self) -> ServingState {
        *self.state.borrow()
    }

    /// Stops the serving loop and waits for the port to be released.
    pub async fn stop(self) -> Result<(), EnvError> {
        info!("Stopping agent on port {}", self.id);
        // The task may already be gone; joining it below still succeeds
        let _ = self.shutdown.send(());
        self.task
            .await
            .map_err(|e| EnvError::Task(e.to_string()))
    }
}
