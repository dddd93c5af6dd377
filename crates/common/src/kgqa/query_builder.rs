//! Query builder
//!
//! `(intent, entity type)` is looked up in [`QUERY_TABLE`]; the entry says
//! which relation(s) to follow, in which direction, and what to project.
//! Pairs missing from the table are [`QueryPlan::Unsupported`].

use super::intent::Intent;
use crate::graph::{Direction, Entity, NodeType, Relation};

/// Projection column names
pub mod columns {
    pub const SYMPTOM: &str = "symptom";
    pub const DRUG: &str = "drug_name";
    pub const FOOD: &str = "food_name";
    pub const CHECK: &str = "check_name";
    pub const DEPARTMENT: &str = "department_name";
    pub const DISEASE: &str = "disease_name";
    pub const PRODUCER: &str = "producer_name";
}

/// Shape of a single traversal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pattern {
    /// Read properties stored on the source node
    Properties { keys: &'static [&'static str] },

    /// Follow each relation in turn and project neighbour names as `column`
    Related {
        relations: &'static [Relation],
        direction: Direction,
        target: NodeType,
        column: &'static str,
    },

    /// Every edge touching the source, both directions
    AllNeighbors,
}

/// A data value describing one read against the graph
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraversalDescriptor {
    pub source: Entity,
    pub pattern: Pattern,
}

impl TraversalDescriptor {
    pub fn all_neighbors(source: Entity) -> Self {
        Self {
            source,
            pattern: Pattern::AllNeighbors,
        }
    }

    /// Column names the rows will carry
    pub fn columns(&self) -> Vec<&'static str> {
        match self.pattern {
            Pattern::Properties { keys } => keys.to_vec(),
            Pattern::Related { column, .. } => vec![column],
            Pattern::AllNeighbors => vec!["relation", "direction", "neighbor_type", "neighbor_name"],
        }
    }
}

/// Result of planning a query
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryPlan {
    Built(TraversalDescriptor),
    Unsupported,
}

/// One row of the dispatch table
#[derive(Debug, Clone, Copy)]
pub struct QueryRoute {
    pub intent: Intent,
    pub source: NodeType,
    pub pattern: Pattern,
}

const fn property(intent: Intent, key: &'static [&'static str]) -> QueryRoute {
    QueryRoute {
        intent,
        source: NodeType::Disease,
        pattern: Pattern::Properties { keys: key },
    }
}

const fn related(
    intent: Intent,
    source: NodeType,
    relations: &'static [Relation],
    direction: Direction,
    target: NodeType,
    column: &'static str,
) -> QueryRoute {
    QueryRoute {
        intent,
        source,
        pattern: Pattern::Related {
            relations,
            direction,
            target,
            column,
        },
    }
}

use columns::*;
use Direction::{Incoming, Outgoing};

pub const QUERY_TABLE: &[QueryRoute] = &[
    // Disease properties
    property(Intent::Desc, &["desc"]),
    property(Intent::Cause, &["cause"]),
    property(Intent::Prevent, &["prevent"]),
    property(Intent::EasyGet, &["easy_get"]),
    property(Intent::CureLasttime, &["cure_lasttime"]),
    property(Intent::CuredProb, &["cured_prob"]),
    property(Intent::CureWay, &["cure_way"]),
    // Disease relations
    related(Intent::Symptom, NodeType::Disease, &[Relation::HasSymptom], Outgoing, NodeType::Symptom, SYMPTOM),
    related(Intent::RecommandDrug, NodeType::Disease, &[Relation::RecommandDrug], Outgoing, NodeType::Drug, DRUG),
    related(Intent::CommonDrug, NodeType::Disease, &[Relation::CommonDrug], Outgoing, NodeType::Drug, DRUG),
    related(
        Intent::TreatmentDrug,
        NodeType::Disease,
        &[Relation::RecommandDrug, Relation::CommonDrug],
        Outgoing,
        NodeType::Drug,
        DRUG,
    ),
    related(Intent::NoEat, NodeType::Disease, &[Relation::NoEat], Outgoing, NodeType::Food, FOOD),
    related(Intent::DoEat, NodeType::Disease, &[Relation::DoEat], Outgoing, NodeType::Food, FOOD),
    related(Intent::RecommandEat, NodeType::Disease, &[Relation::RecommandEat], Outgoing, NodeType::Food, FOOD),
    related(Intent::NeedCheck, NodeType::Disease, &[Relation::NeedCheck], Outgoing, NodeType::Check, CHECK),
    related(Intent::Department, NodeType::Disease, &[Relation::BelongsTo], Outgoing, NodeType::Department, DEPARTMENT),
    related(Intent::AcompanyDisease, NodeType::Disease, &[Relation::AcompanyWith], Outgoing, NodeType::Disease, DISEASE),
    // Reverse lookups
    related(
        Intent::DrugDisease,
        NodeType::Drug,
        &[Relation::CommonDrug, Relation::RecommandDrug],
        Incoming,
        NodeType::Disease,
        DISEASE,
    ),
    related(Intent::DrugProducer, NodeType::Drug, &[Relation::Produces], Incoming, NodeType::Producer, PRODUCER),
    related(Intent::SymptomDisease, NodeType::Symptom, &[Relation::HasSymptom], Incoming, NodeType::Disease, DISEASE),
    related(Intent::CheckDisease, NodeType::Check, &[Relation::NeedCheck], Incoming, NodeType::Disease, DISEASE),
    related(Intent::DepartmentDisease, NodeType::Department, &[Relation::BelongsTo], Incoming, NodeType::Disease, DISEASE),
    related(Intent::SubDepartment, NodeType::Department, &[Relation::BelongsTo], Incoming, NodeType::Department, DEPARTMENT),
    related(Intent::ProducerDrug, NodeType::Producer, &[Relation::Produces], Outgoing, NodeType::Drug, DRUG),
    related(
        Intent::FoodSuitsDisease,
        NodeType::Food,
        &[Relation::DoEat, Relation::RecommandEat],
        Incoming,
        NodeType::Disease,
        DISEASE,
    ),
    related(Intent::FoodAvoidDisease, NodeType::Food, &[Relation::NoEat], Incoming, NodeType::Disease, DISEASE),
];

/// Table entry for a known intent and source type
pub fn lookup(intent: Intent, source: NodeType) -> Option<&'static QueryRoute> {
    QUERY_TABLE
        .iter()
        .find(|route| route.intent == intent && route.source == source)
}

/// Plan a query from the raw intent label
pub fn build(intent: &str, entity_type: NodeType, entity_name: &str) -> QueryPlan {
    match Intent::parse(intent) {
        Some(parsed) => build_for(parsed, &Entity::new(entity_type, entity_name)),
        None => QueryPlan::Unsupported,
    }
}

/// Plan a query for an already parsed intent
pub fn build_for(intent: Intent, entity: &Entity) -> QueryPlan {
    match lookup(intent, entity.node_type) {
        Some(route) => QueryPlan::Built(TraversalDescriptor {
            source: entity.clone(),
            pattern: route.pattern,
        }),
        None => QueryPlan::Unsupported,
    }
}
