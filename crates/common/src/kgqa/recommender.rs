//! Follow-up question generation
//!
//! Looks at the edges around an entity and turns each kind of edge into a
//! question about that entity. When the neighbourhood yields nothing, a
//! fixed list of popular questions is used instead.

use super::executor::QueryExecutor;
use super::query_builder::TraversalDescriptor;
use crate::errors::Result;
use crate::graph::{Direction, Entity, NodeType, Relation};
use indexmap::IndexSet;

pub const DEFAULT_LIMIT: usize = 3;

/// Used when an entity has no usable neighbours
pub const FILLER_QUESTIONS: [&str; 4] = [
    "什么是感冒？",
    "发烧应该怎么办？",
    "什么是高血压？",
    "感冒了应该怎么办？",
];

/// Offered after a greeting
pub const STARTER_QUESTIONS: [&str; 3] = [
    "感冒有什么症状？",
    "高血压怎么治疗？",
    "糖尿病不能吃什么？",
];

/// Question template for one kind of edge, seen from `source`
struct EdgeQuestion {
    source: NodeType,
    relation: Relation,
    direction: Direction,
    neighbor: NodeType,
    template: &'static str,
}

const fn edge(
    source: NodeType,
    relation: Relation,
    direction: Direction,
    neighbor: NodeType,
    template: &'static str,
) -> EdgeQuestion {
    EdgeQuestion {
        source,
        relation,
        direction,
        neighbor,
        template,
    }
}

use Direction::{Incoming, Outgoing};
use NodeType::{Check, Department, Disease, Drug, Food, Producer, Symptom};

const EDGE_QUESTIONS: &[EdgeQuestion] = &[
    // Disease as source
    edge(Disease, Relation::HasSymptom, Outgoing, Symptom, "{entity}有什么症状？"),
    edge(Disease, Relation::AcompanyWith, Outgoing, Disease, "{entity}会引起什么并发症？"),
    edge(Disease, Relation::BelongsTo, Outgoing, Department, "{entity}看哪个科室？"),
    edge(Disease, Relation::RecommandDrug, Outgoing, Drug, "{entity}推荐用什么药？"),
    edge(Disease, Relation::CommonDrug, Outgoing, Drug, "{entity}常用药有哪些？"),
    edge(Disease, Relation::NoEat, Outgoing, Food, "{entity}不能吃什么？"),
    edge(Disease, Relation::DoEat, Outgoing, Food, "{entity}宜吃什么？"),
    edge(Disease, Relation::RecommandEat, Outgoing, Food, "{entity}推荐食谱有哪些？"),
    edge(Disease, Relation::NeedCheck, Outgoing, Check, "{entity}需要做哪些检查？"),
    edge(Disease, Relation::AcompanyWith, Incoming, Disease, "哪些疾病会并发{entity}？"),
    // Reverse views
    edge(Drug, Relation::Produces, Incoming, Producer, "{entity}的生产厂家是？"),
    edge(Drug, Relation::CommonDrug, Incoming, Disease, "{entity}是哪些病的常用药？"),
    edge(Drug, Relation::RecommandDrug, Incoming, Disease, "{entity}是哪些病的推荐药？"),
    edge(Symptom, Relation::HasSymptom, Incoming, Disease, "什么病会有{entity}这个症状？"),
    edge(Check, Relation::NeedCheck, Incoming, Disease, "{entity}能诊断哪些疾病？"),
    edge(Department, Relation::BelongsTo, Incoming, Department, "{entity}下面有哪些科室？"),
    edge(Department, Relation::BelongsTo, Incoming, Disease, "{entity}擅长治疗哪些疾病？"),
    edge(Department, Relation::BelongsTo, Outgoing, Department, "{entity}属于哪个大科室？"),
    edge(Food, Relation::DoEat, Incoming, Disease, "哪些疾病适合吃{entity}？"),
    edge(Food, Relation::RecommandEat, Incoming, Disease, "哪些疾病适合吃{entity}？"),
    edge(Food, Relation::NoEat, Incoming, Disease, "哪些疾病不能吃{entity}？"),
    edge(Producer, Relation::Produces, Outgoing, Drug, "{entity}生产哪些药品？"),
];

fn template_for(
    source: NodeType,
    relation: Relation,
    direction: Direction,
    neighbor: NodeType,
) -> Option<&'static str> {
    EDGE_QUESTIONS
        .iter()
        .find(|q| {
            q.source == source
                && q.relation == relation
                && q.direction == direction
                && q.neighbor == neighbor
        })
        .map(|q| q.template)
}

/// Follow-up questions plus whether the filler list supplied them
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recommendations {
    pub questions: Vec<String>,
    pub used_filler: bool,
}

/// First `limit` filler questions
pub fn filler(limit: usize) -> Vec<String> {
    FILLER_QUESTIONS
        .iter()
        .take(limit.max(1))
        .map(|q| q.to_string())
        .collect()
}

/// First `limit` greeting starters
pub fn starters(limit: usize) -> Vec<String> {
    STARTER_QUESTIONS
        .iter()
        .take(limit.max(1))
        .map(|q| q.to_string())
        .collect()
}

#[derive(Clone)]
pub struct RecommendationGenerator {
    executor: QueryExecutor,
}

impl RecommendationGenerator {
    pub fn new(executor: QueryExecutor) -> Self {
        Self { executor }
    }

    /// Up to `limit` questions about the named entity, never empty
    pub async fn recommend(
        &self,
        entity_name: &str,
        entity_type: NodeType,
        limit: usize,
    ) -> Result<Vec<String>> {
        let entity = Entity::new(entity_type, entity_name);
        Ok(self.recommend_for(&entity, limit).await?.questions)
    }

    pub async fn recommend_for(&self, entity: &Entity, limit: usize) -> Result<Recommendations> {
        let limit = limit.max(1);
        let descriptor = TraversalDescriptor::all_neighbors(entity.clone());
        let tuples = self.executor.relations(&descriptor).await?;

        let mut questions: IndexSet<String> = IndexSet::new();
        for tuple in &tuples {
            if questions.len() >= limit {
                break;
            }
            if let Some(template) =
                template_for(entity.node_type, tuple.relation, tuple.direction, tuple.neighbor_type)
            {
                questions.insert(template.replace("{entity}", &entity.name));
            }
        }

        let result = if questions.is_empty() {
            tracing::debug!(
                entity = %entity.name,
                relations = tuples.len(),
                "No neighbour-based questions, using filler"
            );
            Recommendations {
                questions: filler(limit),
                used_filler: true,
            }
        } else {
            Recommendations {
                questions: questions.into_iter().collect(),
                used_filler: false,
            }
        };

        crate::metrics::record_recommendations(result.questions.len(), result.used_filler);
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::testing::FailingGraph;
    use crate::graph::{GuardedGraph, MemoryGraph};
    use std::sync::Arc;
    use std::time::Duration;

    fn generator(graph: MemoryGraph) -> RecommendationGenerator {
        let guarded = GuardedGraph::new(Arc::new(graph), Duration::from_secs(1));
        RecommendationGenerator::new(QueryExecutor::new(guarded))
    }

    fn rich_disease() -> MemoryGraph {
        let mut g = MemoryGraph::new();
        let d = (NodeType::Disease, "感冒");
        g.add_relation(Relation::HasSymptom, d, (NodeType::Symptom, "咳嗽")).unwrap();
        g.add_relation(Relation::HasSymptom, d, (NodeType::Symptom, "发热")).unwrap();
        g.add_relation(Relation::RecommandDrug, d, (NodeType::Drug, "感冒灵")).unwrap();
        g.add_relation(Relation::NoEat, d, (NodeType::Food, "辣椒")).unwrap();
        g.add_relation(Relation::NeedCheck, d, (NodeType::Check, "血常规")).unwrap();
        g.add_relation(Relation::Produces, (NodeType::Producer, "华润"), (NodeType::Drug, "感冒灵"))
            .unwrap();
        g
    }

    #[tokio::test]
    async fn test_questions_from_neighbours_are_deduplicated_and_capped() {
        let recommender = generator(rich_disease());
        let questions = recommender.recommend("感冒", NodeType::Disease, 3).await.unwrap();

        assert_eq!(
            questions,
            vec!["感冒有什么症状？", "感冒推荐用什么药？", "感冒不能吃什么？"]
        );
    }

    #[tokio::test]
    async fn test_limit_respected() {
        let recommender = generator(rich_disease());
        for limit in 1..=6 {
            let questions = recommender.recommend("感冒", NodeType::Disease, limit).await.unwrap();
            assert!(!questions.is_empty());
            assert!(questions.len() <= limit);
        }
    }

    #[tokio::test]
    async fn test_reverse_relation_templates() {
        let recommender = generator(rich_disease());
        let questions = recommender.recommend("感冒灵", NodeType::Drug, 3).await.unwrap();
        assert_eq!(questions, vec!["感冒灵是哪些病的推荐药？", "感冒灵的生产厂家是？"]);
    }

    #[tokio::test]
    async fn test_isolated_entity_gets_filler() {
        let mut g = MemoryGraph::new();
        g.add_node(NodeType::Symptom, "耳鸣");
        let recommender = generator(g);

        let recs = recommender
            .recommend_for(&Entity::new(NodeType::Symptom, "耳鸣"), 3)
            .await
            .unwrap();
        assert!(recs.used_filler);
        assert_eq!(recs.questions, filler(3));
        assert_eq!(recs.questions.len(), 3);
    }

    #[tokio::test]
    async fn test_absent_entity_gets_filler() {
        let mut g = MemoryGraph::new();
        g.add_relation(Relation::HasSymptom, (NodeType::Disease, "感冒"), (NodeType::Symptom, "咳嗽"))
            .unwrap();
        let recommender = generator(g);

        let recs = recommender
            .recommend_for(&Entity::new(NodeType::Disease, "不存在"), 2)
            .await
            .unwrap();
        assert!(recs.used_filler);
        assert_eq!(recs.questions, vec!["什么是感冒？", "发烧应该怎么办？"]);
    }

    #[tokio::test]
    async fn test_zero_limit_still_returns_one() {
        let recommender = generator(rich_disease());
        let questions = recommender.recommend("感冒", NodeType::Disease, 0).await.unwrap();
        assert_eq!(questions.len(), 1);
    }

    #[tokio::test]
    async fn test_store_failure_propagates() {
        let guarded = GuardedGraph::new(Arc::new(FailingGraph), Duration::from_secs(1));
        let recommender = RecommendationGenerator::new(QueryExecutor::new(guarded));
        assert!(recommender.recommend("感冒", NodeType::Disease, 3).await.is_err());
    }

    #[test]
    fn test_starters_and_filler_truncate() {
        assert_eq!(starters(3).len(), 3);
        assert_eq!(starters(10).len(), STARTER_QUESTIONS.len());
        assert_eq!(filler(2), vec!["什么是感冒？", "发烧应该怎么办？"]);
    }

    #[test]
    fn test_edge_questions_respect_schema() {
        for q in EDGE_QUESTIONS {
            let ok = match q.direction {
                Direction::Outgoing => q.relation.allows(q.source, q.neighbor),
                Direction::Incoming => q.relation.allows(q.neighbor, q.source),
            };
            assert!(ok, "{}", q.template);
            assert!(q.template.contains("{entity}"));
        }
    }
}
