//! Domain ontology of the medical knowledge graph
//!
//! Node types, directed relations, and the row shape returned by
//! traversals. No behaviour beyond naming and endpoint rules.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of node stored in the graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeType {
    Disease,
    Symptom,
    Drug,
    Food,
    Check,
    Department,
    Producer,
}

impl NodeType {
    /// Probe order used when the caller does not know the type of a name
    pub const RESOLUTION_ORDER: [NodeType; 7] = [
        NodeType::Disease,
        NodeType::Symptom,
        NodeType::Drug,
        NodeType::Food,
        NodeType::Check,
        NodeType::Department,
        NodeType::Producer,
    ];

    /// Graph label, also used as the Neo4j node label
    pub fn label(&self) -> &'static str {
        match self {
            NodeType::Disease => "Disease",
            NodeType::Symptom => "Symptom",
            NodeType::Drug => "Drug",
            NodeType::Food => "Food",
            NodeType::Check => "Check",
            NodeType::Department => "Department",
            NodeType::Producer => "Producer",
        }
    }

    /// Chinese display name
    pub fn display_name(&self) -> &'static str {
        match self {
            NodeType::Disease => "疾病",
            NodeType::Symptom => "症状",
            NodeType::Drug => "药品",
            NodeType::Food => "食物",
            NodeType::Check => "检查项目",
            NodeType::Department => "科室",
            NodeType::Producer => "生产商",
        }
    }

    /// Parse a type label as sent by the semantic collaborator.
    ///
    /// Accepts the graph label in any case and the common Chinese names.
    pub fn from_label(label: &str) -> Option<NodeType> {
        let trimmed = label.trim();
        let found = match trimmed.to_ascii_lowercase().as_str() {
            "disease" | "diseases" => NodeType::Disease,
            "symptom" | "symptoms" => NodeType::Symptom,
            "drug" | "drugs" => NodeType::Drug,
            "food" | "foods" => NodeType::Food,
            "check" | "checks" => NodeType::Check,
            "department" | "departments" => NodeType::Department,
            "producer" | "producers" => NodeType::Producer,
            _ => match trimmed {
                "疾病" => NodeType::Disease,
                "症状" => NodeType::Symptom,
                "药品" | "药物" => NodeType::Drug,
                "食物" => NodeType::Food,
                "检查" | "检查项目" => NodeType::Check,
                "科室" => NodeType::Department,
                "生产商" | "厂家" => NodeType::Producer,
                _ => return None,
            },
        };
        Some(found)
    }
}

impl fmt::Display for NodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Directed relation between two nodes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Relation {
    HasSymptom,
    BelongsTo,
    RecommandDrug,
    CommonDrug,
    NoEat,
    DoEat,
    RecommandEat,
    NeedCheck,
    AcompanyWith,
    Produces,
}

impl Relation {
    pub const ALL: [Relation; 10] = [
        Relation::HasSymptom,
        Relation::BelongsTo,
        Relation::RecommandDrug,
        Relation::CommonDrug,
        Relation::NoEat,
        Relation::DoEat,
        Relation::RecommandEat,
        Relation::NeedCheck,
        Relation::AcompanyWith,
        Relation::Produces,
    ];

    /// Relationship type as stored in the graph
    pub fn as_str(&self) -> &'static str {
        match self {
            Relation::HasSymptom => "has_symptom",
            Relation::BelongsTo => "belongs_to",
            Relation::RecommandDrug => "recommand_drug",
            Relation::CommonDrug => "common_drug",
            Relation::NoEat => "no_eat",
            Relation::DoEat => "do_eat",
            Relation::RecommandEat => "recommand_eat",
            Relation::NeedCheck => "need_check",
            Relation::AcompanyWith => "acompany_with",
            Relation::Produces => "produces",
        }
    }

    pub fn parse(raw: &str) -> Option<Relation> {
        Relation::ALL.into_iter().find(|r| r.as_str() == raw)
    }

    /// Whether `from -[self]-> to` is a legal edge.
    ///
    /// `belongs_to` also links a sub-department to its parent category.
    pub fn allows(&self, from: NodeType, to: NodeType) -> bool {
        use NodeType::*;
        match self {
            Relation::HasSymptom => from == Disease && to == Symptom,
            Relation::BelongsTo => {
                (from == Disease || from == Department) && to == Department
            }
            Relation::RecommandDrug | Relation::CommonDrug => from == Disease && to == Drug,
            Relation::NoEat | Relation::DoEat | Relation::RecommandEat => {
                from == Disease && to == Food
            }
            Relation::NeedCheck => from == Disease && to == Check,
            Relation::AcompanyWith => from == Disease && to == Disease,
            Relation::Produces => from == Producer && to == Drug,
        }
    }
}

impl fmt::Display for Relation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which way a relation is followed from the source node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Outgoing,
    Incoming,
}

/// A named node, identified by type and name
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Entity {
    #[serde(rename = "type")]
    pub node_type: NodeType,
    pub name: String,
}

impl Entity {
    pub fn new(node_type: NodeType, name: impl Into<String>) -> Self {
        Self {
            node_type,
            name: name.into(),
        }
    }
}

/// Cell value of a result row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Text(String),
    List(Vec<String>),
}

impl Value {
    /// Items of the value; a text is a single item
    pub fn items(&self) -> Vec<&str> {
        match self {
            Value::Text(s) => vec![s.as_str()],
            Value::List(items) => items.iter().map(String::as_str).collect(),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Text(s) => f.write_str(s),
            Value::List(items) => f.write_str(&items.join("、")),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<Vec<String>> for Value {
    fn from(items: Vec<String>) -> Self {
        Value::List(items)
    }
}

/// One traversal result: column name to value, in projection order
pub type Row = IndexMap<String, Value>;

/// One edge touching a node, seen from that node
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationTuple {
    pub relation: Relation,
    pub direction: Direction,
    pub neighbor_type: NodeType,
    pub neighbor_name: String,
}

/// Properties stored on Disease nodes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiseaseProperty {
    Desc,
    Prevent,
    Cause,
    EasyGet,
    CureLasttime,
    CuredProb,
    CureWay,
}

impl DiseaseProperty {
    pub const ALL: [DiseaseProperty; 7] = [
        DiseaseProperty::Desc,
        DiseaseProperty::Prevent,
        DiseaseProperty::Cause,
        DiseaseProperty::EasyGet,
        DiseaseProperty::CureLasttime,
        DiseaseProperty::CuredProb,
        DiseaseProperty::CureWay,
    ];

    pub const KEYS: [&'static str; 7] = [
        "desc",
        "prevent",
        "cause",
        "easy_get",
        "cure_lasttime",
        "cured_prob",
        "cure_way",
    ];

    /// Property key on the node
    pub fn key(&self) -> &'static str {
        match self {
            DiseaseProperty::Desc => "desc",
            DiseaseProperty::Prevent => "prevent",
            DiseaseProperty::Cause => "cause",
            DiseaseProperty::EasyGet => "easy_get",
            DiseaseProperty::CureLasttime => "cure_lasttime",
            DiseaseProperty::CuredProb => "cured_prob",
            DiseaseProperty::CureWay => "cure_way",
        }
    }

    /// Chinese name used in answer sentences
    pub fn display_name(&self) -> &'static str {
        match self {
            DiseaseProperty::Desc => "描述",
            DiseaseProperty::Prevent => "预防方法",
            DiseaseProperty::Cause => "病因",
            DiseaseProperty::EasyGet => "易感人群",
            DiseaseProperty::CureLasttime => "治疗持续时间",
            DiseaseProperty::CuredProb => "治愈概率",
            DiseaseProperty::CureWay => "治疗方法",
        }
    }

    /// `cure_way` is stored as a list, everything else as text
    pub fn is_list(&self) -> bool {
        matches!(self, DiseaseProperty::CureWay)
    }

    pub fn from_key(key: &str) -> Option<DiseaseProperty> {
        DiseaseProperty::ALL.into_iter().find(|p| p.key() == key)
    }
}
