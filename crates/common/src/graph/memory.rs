//! In-process knowledge graph
//!
//! Adjacency-list store with outgoing and incoming edge indices. Node and
//! edge order follow insertion order, so every read is deterministic.

use super::schema::{Direction, Entity, NodeType, Relation, RelationTuple, Row, Value};
use super::GraphStore;
use crate::errors::{AppError, Result};
use async_trait::async_trait;
use indexmap::IndexMap;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

/// Seed document accepted by [`MemoryGraph::from_json`]
#[derive(Debug, Deserialize)]
struct SeedDocument {
    #[serde(default)]
    nodes: Vec<SeedNode>,
    #[serde(default)]
    relations: Vec<SeedRelation>,
}

#[derive(Debug, Deserialize)]
struct SeedNode {
    #[serde(rename = "type")]
    node_type: NodeType,
    name: String,
    #[serde(default)]
    properties: IndexMap<String, Value>,
}

#[derive(Debug, Deserialize)]
struct SeedRelation {
    relation: Relation,
    from: SeedEndpoint,
    to: SeedEndpoint,
}

#[derive(Debug, Deserialize)]
struct SeedEndpoint {
    #[serde(rename = "type")]
    node_type: NodeType,
    name: String,
}

#[derive(Debug)]
struct NodeRecord {
    entity: Entity,
    properties: IndexMap<String, Value>,
}

#[derive(Debug)]
struct Edge {
    relation: Relation,
    from: usize,
    to: usize,
}

/// In-memory graph store
#[derive(Debug, Default)]
pub struct MemoryGraph {
    nodes: Vec<NodeRecord>,

    /// (type, name) -> node id; first inserted node wins
    index: HashMap<(NodeType, String), usize>,

    edges: Vec<Edge>,

    /// node id -> ids of edges leaving it
    outgoing: HashMap<usize, Vec<usize>>,

    /// node id -> ids of edges entering it
    incoming: HashMap<usize, Vec<usize>>,
}

impl MemoryGraph {
    /// Create an empty graph
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a seed document from disk
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| AppError::Configuration {
            message: format!("Failed to read graph seed {}: {}", path.display(), e),
        })?;
        Self::from_json(&raw)
    }

    /// Build a graph from a JSON seed document.
    ///
    /// Relation endpoints that were not listed under `nodes` are created
    /// on the fly. A node listed twice keeps the first entry's properties.
    pub fn from_json(raw: &str) -> Result<Self> {
        let doc: SeedDocument = serde_json::from_str(raw)?;
        let mut graph = Self::new();

        for node in doc.nodes {
            if graph.lookup(node.node_type, &node.name).is_some() {
                tracing::warn!(
                    node_type = %node.node_type,
                    name = %node.name,
                    "Duplicate node in seed, keeping the first one"
                );
                continue;
            }
            let id = graph.add_node(node.node_type, &node.name);
            graph.nodes[id].properties = node.properties;
        }

        for rel in doc.relations {
            graph.add_relation(
                rel.relation,
                (rel.from.node_type, &rel.from.name),
                (rel.to.node_type, &rel.to.name),
            )?;
        }

        Ok(graph)
    }

    /// Insert a node, returning its id. An existing node is reused.
    pub fn add_node(&mut self, node_type: NodeType, name: &str) -> usize {
        if let Some(id) = self.lookup(node_type, name) {
            return id;
        }
        let id = self.nodes.len();
        self.nodes.push(NodeRecord {
            entity: Entity::new(node_type, name),
            properties: IndexMap::new(),
        });
        self.index.insert((node_type, name.to_string()), id);
        id
    }

    /// Set a property, creating the node if needed
    pub fn set_property(
        &mut self,
        node_type: NodeType,
        name: &str,
        key: &str,
        value: impl Into<Value>,
    ) {
        let id = self.add_node(node_type, name);
        self.nodes[id].properties.insert(key.to_string(), value.into());
    }

    /// Add a directed edge. Duplicate edges are kept as-is.
    pub fn add_relation(
        &mut self,
        relation: Relation,
        from: (NodeType, &str),
        to: (NodeType, &str),
    ) -> Result<()> {
        if !relation.allows(from.0, to.0) {
            return Err(AppError::InvalidFormat {
                message: format!(
                    "Relation {} cannot link {} to {}",
                    relation, from.0, to.0
                ),
            });
        }

        let from_id = self.add_node(from.0, from.1);
        let to_id = self.add_node(to.0, to.1);
        let edge_id = self.edges.len();

        self.edges.push(Edge {
            relation,
            from: from_id,
            to: to_id,
        });
        self.outgoing.entry(from_id).or_default().push(edge_id);
        self.incoming.entry(to_id).or_default().push(edge_id);
        Ok(())
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    fn lookup(&self, node_type: NodeType, name: &str) -> Option<usize> {
        self.index.get(&(node_type, name.to_string())).copied()
    }

    fn id_of(&self, entity: &Entity) -> Option<usize> {
        self.lookup(entity.node_type, &entity.name)
    }

    /// Edges touching `id` in `direction`, paired with the node on the other end
    fn neighbors(&self, id: usize, direction: Direction) -> impl Iterator<Item = (&Edge, &NodeRecord)> {
        let edge_ids = match direction {
            Direction::Outgoing => self.outgoing.get(&id),
            Direction::Incoming => self.incoming.get(&id),
        };

        edge_ids
            .map(|ids| ids.as_slice())
            .unwrap_or(&[])
            .iter()
            .map(move |&edge_id| {
                let edge = &self.edges[edge_id];
                let other = match direction {
                    Direction::Outgoing => edge.to,
                    Direction::Incoming => edge.from,
                };
                (edge, &self.nodes[other])
            })
    }
}

#[async_trait]
impl GraphStore for MemoryGraph {
    async fn find_node(&self, node_type: NodeType, name: &str) -> Result<Option<Entity>> {
        Ok(self
            .lookup(node_type, name)
            .map(|id| self.nodes[id].entity.clone()))
    }

    async fn run_traversal(
        &self,
        source: &Entity,
        relation: Relation,
        direction: Direction,
        target: NodeType,
        column: &str,
    ) -> Result<Vec<Row>> {
        let Some(id) = self.id_of(source) else {
            return Ok(Vec::new());
        };

        let rows = self
            .neighbors(id, direction)
            .filter(|(edge, other)| edge.relation == relation && other.entity.node_type == target)
            .map(|(_, other)| {
                let mut row = Row::new();
                row.insert(column.to_string(), Value::Text(other.entity.name.clone()));
                row
            })
            .collect();

        Ok(rows)
    }

    async fn fetch_properties(&self, source: &Entity, keys: &[&str]) -> Result<Vec<Row>> {
        let Some(id) = self.id_of(source) else {
            return Ok(Vec::new());
        };

        let properties = &self.nodes[id].properties;
        let row: Row = keys
            .iter()
            .filter_map(|key| {
                properties
                    .get(*key)
                    .map(|value| (key.to_string(), value.clone()))
            })
            .collect();

        if row.is_empty() {
            Ok(Vec::new())
        } else {
            Ok(vec![row])
        }
    }

    async fn all_relations(&self, source: &Entity) -> Result<Vec<RelationTuple>> {
        let Some(id) = self.id_of(source) else {
            return Ok(Vec::new());
        };

        let tuples = [Direction::Outgoing, Direction::Incoming]
            .into_iter()
            .flat_map(|direction| {
                self.neighbors(id, direction)
                    .map(move |(edge, other)| RelationTuple {
                        relation: edge.relation,
                        direction,
                        neighbor_type: other.entity.node_type,
                        neighbor_name: other.entity.name.clone(),
                    })
            })
            .collect();

        Ok(tuples)
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
