//! Entity resolution
//!
//! Maps a name (and optionally its type) to a node in the graph.

use crate::errors::Result;
use crate::graph::{Entity, GuardedGraph, NodeType};
use indexmap::IndexMap;

/// Priority used to pick the primary entity from the semantic analysis
pub const PRIMARY_ENTITY_ORDER: [NodeType; 7] = [
    NodeType::Disease,
    NodeType::Symptom,
    NodeType::Drug,
    NodeType::Check,
    NodeType::Food,
    NodeType::Department,
    NodeType::Producer,
];

/// Outcome of a lookup. Not finding a node is a normal result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Found(Entity),
    NotFound { name: String },
}

/// Name to resolve, with the type the upstream analysis assigned to it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub name: String,
    pub expected: Option<NodeType>,
}

/// Pick the primary entity from `{type label -> names}`.
///
/// Known types are tried in [`PRIMARY_ENTITY_ORDER`]; names under labels
/// that are not node types come last and are resolved without a type.
pub fn primary_candidate(entities: &IndexMap<String, Vec<String>>) -> Option<Candidate> {
    let first_name = |names: &Vec<String>| {
        names
            .iter()
            .map(|n| n.trim())
            .find(|n| !n.is_empty())
            .map(str::to_string)
    };

    for wanted in PRIMARY_ENTITY_ORDER {
        let hit = entities
            .iter()
            .filter(|(label, _)| NodeType::from_label(label) == Some(wanted))
            .find_map(|(_, names)| first_name(names));
        if let Some(name) = hit {
            return Some(Candidate {
                name,
                expected: Some(wanted),
            });
        }
    }

    entities
        .iter()
        .filter(|(label, _)| NodeType::from_label(label).is_none())
        .find_map(|(_, names)| first_name(names))
        .map(|name| Candidate {
            name,
            expected: None,
        })
}

/// Looks up entities in the graph store
#[derive(Clone)]
pub struct EntityResolver {
    graph: GuardedGraph,
}

impl EntityResolver {
    pub fn new(graph: GuardedGraph) -> Self {
        Self { graph }
    }

    /// Resolve `name`, restricted to `expected` when given, otherwise
    /// probing [`NodeType::RESOLUTION_ORDER`] until the first hit.
    pub async fn resolve(&self, name: &str, expected: Option<NodeType>) -> Result<Resolution> {
        let name = name.trim();
        if name.is_empty() {
            return Ok(Resolution::NotFound {
                name: String::new(),
            });
        }

        let probe: &[NodeType] = match &expected {
            Some(node_type) => std::slice::from_ref(node_type),
            None => &NodeType::RESOLUTION_ORDER,
        };

        for node_type in probe {
            if let Some(entity) = self.graph.find_node(*node_type, name).await? {
                tracing::debug!(name = name, node_type = %entity.node_type, "Entity resolved");
                return Ok(Resolution::Found(entity));
            }
        }

        tracing::debug!(name = name, expected = ?expected, "Entity not found");
        Ok(Resolution::NotFound {
            name: name.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::testing::FailingGraph;
    use crate::graph::MemoryGraph;
    use std::sync::Arc;
    use std::time::Duration;

    fn resolver(graph: MemoryGraph) -> EntityResolver {
        EntityResolver::new(GuardedGraph::new(Arc::new(graph), Duration::from_secs(1)))
    }

    fn entities(pairs: &[(&str, &str)]) -> IndexMap<String, Vec<String>> {
        pairs
            .iter()
            .map(|(label, name)| (label.to_string(), vec![name.to_string()]))
            .collect()
    }

    #[tokio::test]
    async fn test_expected_type_only_probes_that_type() {
        let mut g = MemoryGraph::new();
        g.add_node(NodeType::Food, "苦瓜");
        let resolver = resolver(g);

        let miss = resolver.resolve("苦瓜", Some(NodeType::Disease)).await.unwrap();
        assert_eq!(miss, Resolution::NotFound { name: "苦瓜".into() });

        let hit = resolver.resolve("苦瓜", Some(NodeType::Food)).await.unwrap();
        assert_eq!(hit, Resolution::Found(Entity::new(NodeType::Food, "苦瓜")));
    }

    #[tokio::test]
    async fn test_unknown_type_follows_priority_order() {
        let mut g = MemoryGraph::new();
        g.add_node(NodeType::Food, "苦瓜");
        g.add_node(NodeType::Disease, "苦瓜");
        let resolver = resolver(g);

        let hit = resolver.resolve("苦瓜", None).await.unwrap();
        assert_eq!(hit, Resolution::Found(Entity::new(NodeType::Disease, "苦瓜")));
    }

    #[tokio::test]
    async fn test_not_found_is_not_an_error() {
        let resolver = resolver(MemoryGraph::new());
        let res = resolver.resolve(" 不存在的病 ", None).await.unwrap();
        assert_eq!(res, Resolution::NotFound { name: "不存在的病".into() });
    }

    #[tokio::test]
    async fn test_store_failure_is_not_not_found() {
        let resolver =
            EntityResolver::new(GuardedGraph::new(Arc::new(FailingGraph), Duration::from_secs(1)));
        let err = resolver.resolve("感冒", None).await.unwrap_err();
        assert!(err.is_store_unavailable());
    }

    #[test]
    fn test_primary_candidate_priority() {
        let map = entities(&[("Drug", "布洛芬"), ("Symptom", "发热"), ("Disease", "感冒")]);
        assert_eq!(
            primary_candidate(&map),
            Some(Candidate {
                name: "感冒".into(),
                expected: Some(NodeType::Disease)
            })
        );

        let map = entities(&[("Check", "血常规"), ("药品", "布洛芬")]);
        assert_eq!(primary_candidate(&map).unwrap().name, "布洛芬");
    }

    #[test]
    fn test_primary_candidate_skips_blank_and_falls_back_to_untyped() {
        let map = entities(&[("Disease", "  "), ("keyword", "阿司匹林")]);
        assert_eq!(
            primary_candidate(&map),
            Some(Candidate {
                name: "阿司匹林".into(),
                expected: None
            })
        );

        assert_eq!(primary_candidate(&IndexMap::new()), None);
    }
}
