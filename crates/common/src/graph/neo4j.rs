//! Neo4j-backed graph store
//!
//! Labels and relationship types are rendered from the closed schema enums;
//! only node names travel as query parameters.

use super::schema::{DiseaseProperty, Direction, Entity, NodeType, Relation, RelationTuple, Row, Value};
use super::GraphStore;
use crate::config::GraphConfig;
use crate::errors::{AppError, Result};
use async_trait::async_trait;
use neo4rs::{query, ConfigBuilder, Graph};

/// Neo4j graph store
pub struct Neo4jGraph {
    graph: Graph,
}

impl Neo4jGraph {
    /// Connect using the `graph` configuration section
    pub async fn connect(config: &GraphConfig) -> Result<Self> {
        tracing::info!(uri = %config.uri, database = %config.database, "Connecting to Neo4j");

        let password = config.password.as_deref().ok_or_else(|| AppError::Configuration {
            message: "graph.password is required for the neo4j backend".to_string(),
        })?;

        let neo_config = ConfigBuilder::default()
            .uri(config.uri.as_str())
            .user(config.user.as_str())
            .password(password)
            .db(config.database.as_str())
            .fetch_size(config.fetch_size)
            .max_connections(config.max_connections)
            .build()
            .map_err(|e| AppError::Configuration {
                message: format!("Invalid Neo4j configuration: {}", e),
            })?;

        let graph = Graph::connect(neo_config).await?;
        let store = Self { graph };
        store.ping().await?;

        tracing::info!("Neo4j connection established");
        Ok(store)
    }
}

/// A row whose values do not decode is a data defect, not an outage
fn malformed(context: &str, err: impl std::fmt::Display) -> AppError {
    AppError::Internal {
        message: format!("{}: {}", context, err),
    }
}

/// Property keys are interpolated into Cypher, so only plain identifiers pass
fn is_property_key(key: &str) -> bool {
    !key.is_empty() && key.chars().all(|c| c.is_ascii_lowercase() || c == '_')
}

fn traversal_cypher(
    source: NodeType,
    relation: Relation,
    direction: Direction,
    target: NodeType,
) -> String {
    let pattern = match direction {
        Direction::Outgoing => format!("-[:{}]->", relation.as_str()),
        Direction::Incoming => format!("<-[:{}]-", relation.as_str()),
    };
    format!(
        "{} MATCH (n){}(m:{}) RETURN m.name AS value",
        anchor(source),
        pattern,
        target.label()
    )
}

/// Bind `n` to the first node with the given name, like `find_node`
fn anchor(source: NodeType) -> String {
    format!("MATCH (n:{} {{name: $name}}) WITH n LIMIT 1", source.label())
}

fn relations_cypher(source: NodeType, direction: Direction) -> String {
    let pattern = match direction {
        Direction::Outgoing => "-[r]->",
        Direction::Incoming => "<-[r]-",
    };
    format!(
        "{} MATCH (n){}(m) \
         RETURN type(r) AS rel, labels(m)[0] AS label, m.name AS name \
         ORDER BY rel, name",
        anchor(source),
        pattern
    )
}

#[async_trait]
impl GraphStore for Neo4jGraph {
    async fn find_node(&self, node_type: NodeType, name: &str) -> Result<Option<Entity>> {
        let cypher = format!(
            "MATCH (n:{} {{name: $name}}) RETURN n.name AS name LIMIT 1",
            node_type.label()
        );
        let mut result = self
            .graph
            .execute(query(&cypher).param("name", name))
            .await?;

        match result.next().await? {
            Some(row) => {
                let found: String = row
                    .get("name")
                    .map_err(|e| malformed("Malformed node row", e))?;
                Ok(Some(Entity::new(node_type, found)))
            }
            None => Ok(None),
        }
    }

    async fn run_traversal(
        &self,
        source: &Entity,
        relation: Relation,
        direction: Direction,
        target: NodeType,
        column: &str,
    ) -> Result<Vec<Row>> {
        let cypher = traversal_cypher(source.node_type, relation, direction, target);
        let mut result = self
            .graph
            .execute(query(&cypher).param("name", source.name.as_str()))
            .await?;

        let mut rows = Vec::new();
        while let Some(row) = result.next().await? {
            let value: String = row
                .get("value")
                .map_err(|e| malformed("Malformed traversal row", e))?;
            let mut out = Row::new();
            out.insert(column.to_string(), Value::Text(value));
            rows.push(out);
        }
        Ok(rows)
    }

    async fn fetch_properties(&self, source: &Entity, keys: &[&str]) -> Result<Vec<Row>> {
        let keys: Vec<&str> = keys.iter().copied().filter(|k| is_property_key(k)).collect();
        if keys.is_empty() {
            return Ok(Vec::new());
        }

        let projection = keys
            .iter()
            .map(|k| format!("n.{k} AS {k}"))
            .collect::<Vec<_>>()
            .join(", ");
        let cypher = format!(
            "MATCH (n:{} {{name: $name}}) RETURN {} LIMIT 1",
            source.node_type.label(),
            projection
        );
        let mut result = self
            .graph
            .execute(query(&cypher).param("name", source.name.as_str()))
            .await?;

        let Some(row) = result.next().await? else {
            return Ok(Vec::new());
        };

        let mut out = Row::new();
        for key in keys {
            let is_list = DiseaseProperty::from_key(key).is_some_and(|p| p.is_list());
            let value = if is_list {
                row.get::<Option<Vec<String>>>(key)
                    .map_err(|e| malformed("Malformed property row", e))?
                    .map(Value::List)
            } else {
                row.get::<Option<String>>(key)
                    .map_err(|e| malformed("Malformed property row", e))?
                    .map(Value::Text)
            };
            if let Some(value) = value {
                out.insert(key.to_string(), value);
            }
        }

        if out.is_empty() {
            Ok(Vec::new())
        } else {
            Ok(vec![out])
        }
    }

    async fn all_relations(&self, source: &Entity) -> Result<Vec<RelationTuple>> {
        let mut tuples = Vec::new();

        for direction in [Direction::Outgoing, Direction::Incoming] {
            let cypher = relations_cypher(source.node_type, direction);
            let mut result = self
                .graph
                .execute(query(&cypher).param("name", source.name.as_str()))
                .await?;

            while let Some(row) = result.next().await? {
                let rel: String = row
                    .get("rel")
                    .map_err(|e| malformed("Malformed relation row", e))?;
                let label: String = row
                    .get("label")
                    .map_err(|e| malformed("Malformed relation row", e))?;
                let name: String = row
                    .get("name")
                    .map_err(|e| malformed("Malformed relation row", e))?;

                // Edges outside the ontology are skipped
                let (Some(relation), Some(neighbor_type)) =
                    (Relation::parse(&rel), NodeType::from_label(&label))
                else {
                    tracing::debug!(relation = %rel, label = %label, "Skipping unknown edge");
                    continue;
                };

                tuples.push(RelationTuple {
                    relation,
                    direction,
                    neighbor_type,
                    neighbor_name: name,
                });
            }
        }

        Ok(tuples)
    }

    async fn ping(&self) -> Result<()> {
        let mut result = self.graph.execute(query("RETURN 1 AS ok")).await?;
        result.next().await?;
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "neo4j"
    }
}
