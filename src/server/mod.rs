//! HTTP front end for the task manager
//!
//! One listener serves the JSON-RPC endpoint, the agent card and the
//! health/metrics endpoints.

pub mod dispatcher;
pub mod routes;

pub use dispatcher::Dispatcher;

use crate::agent::Agent;
use crate::config::AgentConfig;
use crate::observability::HealthReporter;
use crate::protocol::agent_card::AgentCard;
use crate::task::{TaskManager, TaskStore};
use std::future::Future;
use std::net::{SocketAddr, ToSocketAddrs};
use std::sync::Arc;
use thiserror::Error;
use tracing::info;
use warp::Filter;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Invalid listen address {0}")]
    InvalidAddress(String),
    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: warp::Error,
    },
}

/// The assembled A2A server
pub struct A2aServer {
    addr: SocketAddr,
    card: AgentCard,
    dispatcher: Dispatcher,
    reporter: HealthReporter,
}

impl A2aServer {
    /// Wire the task manager, agent card and health reporter from config
    pub fn new(
        config: &AgentConfig,
        agent: Arc<dyn Agent>,
        store: Arc<dyn TaskStore>,
    ) -> Result<Self, ServerError> {
        let addr = resolve_addr(&config.server.host, config.server.port)?;
        let manager = TaskManager::new(store.clone(), agent, config.tasks.invoke_timeout());

        Ok(Self {
            addr,
            card: config.agent_card(),
            dispatcher: Dispatcher::new(Arc::new(manager)),
            reporter: HealthReporter::new(config.agent.name.clone(), store),
        })
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn card(&self) -> &AgentCard {
        &self.card
    }

    pub fn manager(&self) -> &Arc<TaskManager> {
        self.dispatcher.manager()
    }

    /// All routes, ready for `warp::serve` or `warp::test`
    pub fn routes(
        &self,
    ) -> impl Filter<Extract = (impl warp::Reply,), Error = warp::Rejection> + Clone {
        routes::all(
            self.dispatcher.clone(),
            self.card.clone(),
            self.reporter.clone(),
        )
    }

    /// Bind the listener and return the bound address with the serving future.
    ///
    /// The future resolves once `shutdown` does and in-flight requests have
    /// drained.
    pub fn bind_with_shutdown(
        &self,
        shutdown: impl Future<Output = ()> + Send + 'static,
    ) -> Result<(SocketAddr, impl Future<Output = ()>), ServerError> {
        let (bound, server) = warp::serve(self.routes())
            .try_bind_with_graceful_shutdown(self.addr, shutdown)
            .map_err(|source| ServerError::Bind {
                addr: self.addr,
                source,
            })?;

        info!(
            addr = %bound,
            agent = %self.card.name,
            url = %self.card.url,
            "A2A server listening"
        );
        Ok((bound, server))
    }

    /// Serve until `shutdown` resolves
    pub async fn serve(
        self,
        shutdown: impl Future<Output = ()> + Send + 'static,
    ) -> Result<(), ServerError> {
        let (_, server) = self.bind_with_shutdown(shutdown)?;
        server.await;
        info!("A2A server stopped");
        Ok(())
    }
}

fn resolve_addr(host: &str, port: u16) -> Result<SocketAddr, ServerError> {
    (host, port)
        .to_socket_addrs()
        .map_err(|e| ServerError::InvalidAddress(format!("{host}:{port} ({e})")))?
        .next()
        .ok_or_else(|| ServerError::InvalidAddress(format!("{host}:{port}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::InMemoryTaskStore;
    use crate::testing::mocks::ScriptedAgent;
    use serde_json::{json, Value};

    fn server(config: &AgentConfig) -> A2aServer {
        A2aServer::new(
            config,
            Arc::new(ScriptedAgent::echo()),
            Arc::new(InMemoryTaskStore::new()),
        )
        .unwrap()
    }

    #[test]
    fn test_resolve_addr() {
        let addr = resolve_addr("127.0.0.1", 10002).unwrap();
        assert_eq!(addr.port(), 10002);
        assert!(addr.ip().is_loopback());

        assert!(matches!(
            resolve_addr("not a host name", 80),
            Err(ServerError::InvalidAddress(_))
        ));
    }

    #[tokio::test]
    async fn test_routes_serve_card_and_rpc() {
        let server = server(&AgentConfig::default());
        let routes = server.routes();

        let card = warp::test::request()
            .method("GET")
            .path("/.well-known/agent.json")
            .reply(&routes)
            .await;
        assert_eq!(card.status(), 200);
        let body: Value = serde_json::from_slice(card.body()).unwrap();
        assert_eq!(body["name"], "TellTimeAgent");

        let rpc = warp::test::request()
            .method("POST")
            .path("/")
            .json(&json!({"jsonrpc": "2.0", "id": 1, "method": "foo/bar"}))
            .reply(&routes)
            .await;
        assert_eq!(rpc.status(), 200);
    }

    #[tokio::test]
    async fn test_bind_and_shutdown() {
        let mut server = server(&AgentConfig::default());
        server.addr = "127.0.0.1:0".parse().unwrap();

        let (tx, rx) = tokio::sync::oneshot::channel::<()>();
        let (bound, serving) = server
            .bind_with_shutdown(async {
                rx.await.ok();
            })
            .unwrap();
        assert_ne!(bound.port(), 0);

        let handle = tokio::spawn(serving);
        tx.send(()).unwrap();
        handle.await.unwrap();
    }
}
