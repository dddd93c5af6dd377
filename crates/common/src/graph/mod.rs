//! Knowledge graph store abstraction
//!
//! The engine only ever reads the graph. Two backends implement
//! [`GraphStore`]:
//! - [`MemoryGraph`]: adjacency lists seeded from a JSON document
//! - [`Neo4jGraph`]: Bolt connection to a Neo4j database
//!
//! Engine code talks to the store through [`GuardedGraph`], which puts a
//! deadline on every call and records latency metrics.

pub mod memory;
pub mod neo4j;
pub mod schema;

pub use memory::MemoryGraph;
pub use neo4j::Neo4jGraph;
pub use schema::{DiseaseProperty, Direction, Entity, NodeType, Relation, RelationTuple, Row, Value};

use crate::config::{GraphBackend, GraphConfig};
use crate::errors::{AppError, Result};
use async_trait::async_trait;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Read-only access to the medical knowledge graph
#[async_trait]
pub trait GraphStore: Send + Sync {
    /// Look up a node by exact type and name.
    ///
    /// When several nodes of the same type share the name, the first one
    /// known to the store is returned.
    async fn find_node(&self, node_type: NodeType, name: &str) -> Result<Option<Entity>>;

    /// Follow `relation` from `source` in `direction`, keeping neighbours of
    /// type `target`, and project each neighbour's name as `column`.
    async fn run_traversal(
        &self,
        source: &Entity,
        relation: Relation,
        direction: Direction,
        target: NodeType,
        column: &str,
    ) -> Result<Vec<Row>>;

    /// Read properties of `source`. Missing keys are omitted; a node that
    /// is absent or has none of the keys yields no rows.
    async fn fetch_properties(&self, source: &Entity, keys: &[&str]) -> Result<Vec<Row>>;

    /// Every edge touching `source`, both directions, deterministic order
    async fn all_relations(&self, source: &Entity) -> Result<Vec<RelationTuple>>;

    /// Cheap liveness probe
    async fn ping(&self) -> Result<()>;

    /// Backend name for logs and metrics
    fn backend_name(&self) -> &'static str;
}

/// Run a store call under a deadline.
///
/// An elapsed deadline becomes [`AppError::GraphTimeout`], never an empty
/// result.
pub async fn guarded<T, F>(timeout: Duration, fut: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match tokio::time::timeout(timeout, fut).await {
        Ok(result) => result,
        Err(_) => Err(AppError::GraphTimeout {
            timeout_ms: timeout.as_millis() as u64,
        }),
    }
}

/// Shared handle used by every engine stage
#[derive(Clone)]
pub struct GuardedGraph {
    store: Arc<dyn GraphStore>,
    timeout: Duration,
}

impl GuardedGraph {
    pub fn new(store: Arc<dyn GraphStore>, timeout: Duration) -> Self {
        Self { store, timeout }
    }

    pub fn backend_name(&self) -> &'static str {
        self.store.backend_name()
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    async fn observe<T, F>(&self, operation: &'static str, fut: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        let start = Instant::now();
        let result = guarded(self.timeout, fut).await;
        let elapsed = start.elapsed();

        crate::metrics::record_graph_query(
            elapsed.as_secs_f64(),
            operation,
            self.backend_name(),
            result.is_ok(),
        );

        if let Err(e) = &result {
            tracing::warn!(
                operation = operation,
                backend = self.backend_name(),
                elapsed_ms = elapsed.as_millis() as u64,
                error = %e,
                "Graph store call failed"
            );
        }

        result
    }

    pub async fn find_node(&self, node_type: NodeType, name: &str) -> Result<Option<Entity>> {
        self.observe("find_node", self.store.find_node(node_type, name))
            .await
    }

    pub async fn run_traversal(
        &self,
        source: &Entity,
        relation: Relation,
        direction: Direction,
        target: NodeType,
        column: &str,
    ) -> Result<Vec<Row>> {
        self.observe(
            "run_traversal",
            self.store
                .run_traversal(source, relation, direction, target, column),
        )
        .await
    }

    pub async fn fetch_properties(&self, source: &Entity, keys: &[&str]) -> Result<Vec<Row>> {
        self.observe("fetch_properties", self.store.fetch_properties(source, keys))
            .await
    }

    pub async fn all_relations(&self, source: &Entity) -> Result<Vec<RelationTuple>> {
        self.observe("all_relations", self.store.all_relations(source))
            .await
    }

    pub async fn ping(&self) -> Result<()> {
        self.observe("ping", self.store.ping()).await
    }
}

/// Build the configured graph store
pub async fn connect(config: &GraphConfig) -> Result<Arc<dyn GraphStore>> {
    match config.backend {
        GraphBackend::Memory => {
            let graph = match &config.seed_path {
                Some(path) => MemoryGraph::from_path(path)?,
                None => {
                    tracing::warn!("No graph.seed_path configured, starting with an empty graph");
                    MemoryGraph::new()
                }
            };
            tracing::info!(
                nodes = graph.node_count(),
                edges = graph.edge_count(),
                "In-memory knowledge graph loaded"
            );
            Ok(Arc::new(graph))
        }
        GraphBackend::Neo4j => Ok(Arc::new(Neo4jGraph::connect(config).await?)),
    }
}


#[cfg(test)]
mod tests {
    use super::testing::{FailingGraph, SlowGraph};
    use super::*;

    #[tokio::test]
    async fn test_guarded_times_out() {
        let result: Result<()> = guarded(Duration::from_millis(10), async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(())
        })
        .await;

        match result {
            Err(AppError::GraphTimeout { timeout_ms }) => assert_eq!(timeout_ms, 10),
            other => panic!("expected timeout, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_slow_store_surfaces_timeout_not_empty() {
        let mut inner = MemoryGraph::new();
        inner.add_node(NodeType::Disease, "感冒");
        let graph = GuardedGraph::new(
            Arc::new(SlowGraph {
                inner,
                delay: Duration::from_millis(200),
            }),
            Duration::from_millis(20),
        );

        let err = graph
            .find_node(NodeType::Disease, "感冒")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::GraphTimeout { .. }));
        assert!(err.is_transient());
    }

    #[tokio::test]
    async fn test_failing_store_propagates() {
        let graph = GuardedGraph::new(Arc::new(FailingGraph), Duration::from_secs(1));
        let err = graph.ping().await.unwrap_err();
        assert!(err.is_store_unavailable());
    }

    #[tokio::test]
    async fn test_connect_memory_without_seed() {
        let config = GraphConfig::default();
        let store = connect(&config).await.unwrap();
        assert_eq!(store.backend_name(), "memory");
        assert!(store
            .find_node(NodeType::Disease, "感冒")
            .await
            .unwrap()
            .is_none());
    }
}
