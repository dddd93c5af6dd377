//! Query executor
//!
//! Runs a [`TraversalDescriptor`] against the guarded graph store. No match
//! is an empty vector; store failures are errors and never become empty.

use super::query_builder::{Pattern, TraversalDescriptor};
use crate::errors::Result;
use crate::graph::{Direction, GuardedGraph, RelationTuple, Row, Value};

#[derive(Clone)]
pub struct QueryExecutor {
    graph: GuardedGraph,
}

impl QueryExecutor {
    pub fn new(graph: GuardedGraph) -> Self {
        Self { graph }
    }

    /// Execute a descriptor and return its rows
    pub async fn execute(&self, descriptor: &TraversalDescriptor) -> Result<Vec<Row>> {
        let source = &descriptor.source;

        let rows = match descriptor.pattern {
            Pattern::Properties { keys } => self.graph.fetch_properties(source, keys).await?,
            Pattern::Related {
                relations,
                direction,
                target,
                column,
            } => {
                let mut rows = Vec::new();
                for relation in relations {
                    let mut batch = self
                        .graph
                        .run_traversal(source, *relation, direction, target, column)
                        .await?;
                    rows.append(&mut batch);
                }
                rows
            }
            Pattern::AllNeighbors => self
                .relations(descriptor)
                .await?
                .into_iter()
                .map(neighbor_row)
                .collect(),
        };

        tracing::debug!(
            source = %source.name,
            node_type = %source.node_type,
            pattern = ?descriptor.pattern,
            rows = rows.len(),
            "Traversal executed"
        );
        Ok(rows)
    }

    /// Edges touching the descriptor's source, restricted to its pattern
    pub async fn relations(&self, descriptor: &TraversalDescriptor) -> Result<Vec<RelationTuple>> {
        let all = match descriptor.pattern {
            Pattern::Properties { .. } => return Ok(Vec::new()),
            _ => self.graph.all_relations(&descriptor.source).await?,
        };

        let tuples = match descriptor.pattern {
            Pattern::Related {
                relations,
                direction,
                target,
                ..
            } => all
                .into_iter()
                .filter(|t| {
                    t.direction == direction
                        && t.neighbor_type == target
                        && relations.contains(&t.relation)
                })
                .collect(),
            _ => all,
        };
        Ok(tuples)
    }
}

fn neighbor_row(tuple: RelationTuple) -> Row {
    let direction = match tuple.direction {
        Direction::Outgoing => "outgoing",
        Direction::Incoming => "incoming",
    };

    let mut row = Row::new();
    row.insert("relation".into(), Value::from(tuple.relation.as_str()));
    row.insert("direction".into(), Value::from(direction));
    row.insert("neighbor_type".into(), Value::from(tuple.neighbor_type.label()));
    row.insert("neighbor_name".into(), Value::Text(tuple.neighbor_name));
    row
}
