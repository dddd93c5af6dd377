//! Knowledge card lookup
//!
//! Everything the graph knows about one keyword: the node's properties and
//! its neighbours grouped by relation.

use super::executor::QueryExecutor;
use super::query_builder::{Pattern, TraversalDescriptor};
use super::resolver::{EntityResolver, Resolution};
use crate::errors::Result;
use crate::graph::{DiseaseProperty, Direction, Entity, GuardedGraph, NodeType, Relation, Row};
use indexmap::{IndexMap, IndexSet};
use serde::Serialize;

/// Summary of one node and its neighbourhood
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct KnowledgeCard {
    #[serde(rename = "type")]
    pub node_type: NodeType,
    pub type_name: &'static str,
    pub name: String,
    #[serde(skip_serializing_if = "Row::is_empty")]
    pub properties: Row,
    pub relations: IndexMap<&'static str, Vec<String>>,
}

struct Section {
    key: &'static str,
    relation: Relation,
    direction: Direction,
    neighbor: NodeType,
}

const fn section(key: &'static str, relation: Relation, direction: Direction, neighbor: NodeType) -> Section {
    Section {
        key,
        relation,
        direction,
        neighbor,
    }
}

fn sections(node_type: NodeType) -> &'static [Section] {
    use Direction::{Incoming, Outgoing};

    const DISEASE: &[Section] = &[
        section("symptoms", Relation::HasSymptom, Outgoing, NodeType::Symptom),
        section("common_drugs", Relation::CommonDrug, Outgoing, NodeType::Drug),
        section("recommand_drugs", Relation::RecommandDrug, Outgoing, NodeType::Drug),
        section("no_eat_foods", Relation::NoEat, Outgoing, NodeType::Food),
        section("do_eat_foods", Relation::DoEat, Outgoing, NodeType::Food),
        section("recommand_eat_foods", Relation::RecommandEat, Outgoing, NodeType::Food),
        section("needed_checks", Relation::NeedCheck, Outgoing, NodeType::Check),
        section("departments", Relation::BelongsTo, Outgoing, NodeType::Department),
        section("acompany_diseases", Relation::AcompanyWith, Outgoing, NodeType::Disease),
    ];
    const SYMPTOM: &[Section] = &[section(
        "caused_by_diseases",
        Relation::HasSymptom,
        Incoming,
        NodeType::Disease,
    )];
    const DRUG: &[Section] = &[
        section("produced_by", Relation::Produces, Incoming, NodeType::Producer),
        section("common_for_diseases", Relation::CommonDrug, Incoming, NodeType::Disease),
        section("recommand_for_diseases", Relation::RecommandDrug, Incoming, NodeType::Disease),
    ];
    const FOOD: &[Section] = &[
        section("do_eat_for_diseases", Relation::DoEat, Incoming, NodeType::Disease),
        section("no_eat_for_diseases", Relation::NoEat, Incoming, NodeType::Disease),
        section("recommand_eat_for_diseases", Relation::RecommandEat, Incoming, NodeType::Disease),
    ];
    const CHECK: &[Section] = &[section(
        "diseases_requiring_check",
        Relation::NeedCheck,
        Incoming,
        NodeType::Disease,
    )];
    const DEPARTMENT: &[Section] = &[
        section("diseases_treated_here", Relation::BelongsTo, Incoming, NodeType::Disease),
        section("sub_departments", Relation::BelongsTo, Incoming, NodeType::Department),
        section("parent_departments", Relation::BelongsTo, Outgoing, NodeType::Department),
    ];
    const PRODUCER: &[Section] = &[section(
        "produced_drugs",
        Relation::Produces,
        Outgoing,
        NodeType::Drug,
    )];

    match node_type {
        NodeType::Disease => DISEASE,
        NodeType::Symptom => SYMPTOM,
        NodeType::Drug => DRUG,
        NodeType::Food => FOOD,
        NodeType::Check => CHECK,
        NodeType::Department => DEPARTMENT,
        NodeType::Producer => PRODUCER,
    }
}

fn property_keys(node_type: NodeType) -> &'static [&'static str] {
    match node_type {
        NodeType::Disease => &DiseaseProperty::KEYS,
        _ => &[],
    }
}

#[derive(Clone)]
pub struct KnowledgeCardService {
    resolver: EntityResolver,
    executor: QueryExecutor,
}

impl KnowledgeCardService {
    pub fn new(graph: GuardedGraph) -> Self {
        Self {
            resolver: EntityResolver::new(graph.clone()),
            executor: QueryExecutor::new(graph),
        }
    }

    /// Card for `keyword`, or `None` when no node has that name
    pub async fn lookup(&self, keyword: &str) -> Result<Option<KnowledgeCard>> {
        let entity = match self.resolver.resolve(keyword, None).await? {
            Resolution::Found(entity) => entity,
            Resolution::NotFound { .. } => return Ok(None),
        };

        let neighbours = TraversalDescriptor::all_neighbors(entity.clone());
        let (properties, tuples) = futures::try_join!(
            self.properties(&entity),
            self.executor.relations(&neighbours)
        )?;

        let mut relations = IndexMap::new();
        for section in sections(entity.node_type) {
            let names: IndexSet<&str> = tuples
                .iter()
                .filter(|t| {
                    t.relation == section.relation
                        && t.direction == section.direction
                        && t.neighbor_type == section.neighbor
                })
                .map(|t| t.neighbor_name.as_str())
                .collect();
            relations.insert(
                section.key,
                names.into_iter().map(str::to_string).collect(),
            );
        }

        tracing::debug!(
            keyword = keyword,
            node_type = %entity.node_type,
            relations = tuples.len(),
            "Knowledge card assembled"
        );

        Ok(Some(KnowledgeCard {
            node_type: entity.node_type,
            type_name: entity.node_type.display_name(),
            name: entity.name,
            properties,
            relations,
        }))
    }

    async fn properties(&self, entity: &Entity) -> Result<Row> {
        let keys = property_keys(entity.node_type);
        if keys.is_empty() {
            return Ok(Row::new());
        }
        let descriptor = TraversalDescriptor {
            source: entity.clone(),
            pattern: Pattern::Properties { keys },
        };
        let mut rows = self.executor.execute(&descriptor).await?;
        Ok(if rows.is_empty() {
            Row::new()
        } else {
            rows.swap_remove(0)
        })
    }
}
