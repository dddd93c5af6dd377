//! QA pipeline
//!
//! One call walks `Received → EntityResolved | EntityNotFound → QueryBuilt |
//! QueryUnsupported → RowsFetched → AnswerReady → Done`. Every terminal
//! state yields an answer; only a store failure returns `Err`.

use super::intent::Intent;
use super::query_builder::{build_for, QueryPlan};
use super::recommender::{filler, starters, RecommendationGenerator};
use super::resolver::{primary_candidate, EntityResolver, Resolution};
use super::{synthesizer, QueryExecutor};
use crate::errors::Result;
use crate::graph::{Entity, GuardedGraph};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::time::Instant;

pub const GREETING_ANSWER: &str = "您好！我是医疗问答机器人，请问有什么可以帮助您的？";

pub const NO_ENTITY_ANSWER: &str =
    "抱歉，我未能识别出您问题中的主要医疗实体，也无法理解您的意图。";

/// Output of the semantic-understanding service
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SemanticResult {
    #[serde(default)]
    pub original_question: String,

    #[serde(default)]
    pub identified_intent: String,

    /// Entity type label -> names found in the question
    #[serde(default)]
    pub identified_entities: IndexMap<String, Vec<String>>,
}

/// How a question was handled
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Answered,
    EmptyResult,
    EntityNotFound,
    QueryUnsupported,
    Greeting,
    NoEntity,
}

impl Outcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Answered => "answered",
            Outcome::EmptyResult => "empty_result",
            Outcome::EntityNotFound => "entity_not_found",
            Outcome::QueryUnsupported => "query_unsupported",
            Outcome::Greeting => "greeting",
            Outcome::NoEntity => "no_entity",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Received,
    EntityResolved,
    EntityNotFound,
    QueryBuilt,
    QueryUnsupported,
    RowsFetched,
    AnswerReady,
    Done,
}

/// Engine response
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct QaAnswer {
    pub answer: String,
    pub recommended_questions: Vec<String>,
    pub outcome: Outcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entity: Option<Entity>,

    /// States visited, for logs and tests
    #[serde(skip)]
    pub states: Vec<PipelineState>,
}

/// Per-call bookkeeping; nothing here outlives one question
struct Trace {
    states: Vec<PipelineState>,
}

impl Trace {
    fn new() -> Self {
        Self {
            states: vec![PipelineState::Received],
        }
    }

    fn enter(&mut self, state: PipelineState) {
        tracing::trace!(state = ?state, "Pipeline transition");
        self.states.push(state);
    }

    fn finish(
        mut self,
        answer: String,
        recommended_questions: Vec<String>,
        outcome: Outcome,
        entity: Option<Entity>,
    ) -> QaAnswer {
        self.enter(PipelineState::Done);
        QaAnswer {
            answer,
            recommended_questions,
            outcome,
            entity,
            states: self.states,
        }
    }
}

/// Knowledge-graph question answering engine
#[derive(Clone)]
pub struct QaEngine {
    resolver: EntityResolver,
    executor: QueryExecutor,
    recommender: RecommendationGenerator,
    recommendation_limit: usize,
}

impl QaEngine {
    pub fn new(graph: GuardedGraph, recommendation_limit: usize) -> Self {
        let executor = QueryExecutor::new(graph.clone());
        Self {
            resolver: EntityResolver::new(graph),
            recommender: RecommendationGenerator::new(executor.clone()),
            executor,
            recommendation_limit: recommendation_limit.max(1),
        }
    }

    pub fn recommendation_limit(&self) -> usize {
        self.recommendation_limit
    }

    /// Answer one analysed question
    pub async fn answer(&self, input: &SemanticResult) -> Result<QaAnswer> {
        let start = Instant::now();
        let result = self.run(input).await;
        let elapsed = start.elapsed().as_secs_f64();

        match &result {
            Ok(answer) => {
                crate::metrics::record_question(elapsed, answer.outcome.as_str());
                tracing::info!(
                    intent = %input.identified_intent,
                    outcome = answer.outcome.as_str(),
                    entity = answer.entity.as_ref().map(|e| e.name.as_str()).unwrap_or(""),
                    recommendations = answer.recommended_questions.len(),
                    elapsed_ms = (elapsed * 1000.0) as u64,
                    "Question answered"
                );
            }
            Err(e) => {
                crate::metrics::record_question(elapsed, "store_unavailable");
                tracing::error!(
                    intent = %input.identified_intent,
                    error = %e,
                    "Question failed on graph store"
                );
            }
        }

        result
    }

    async fn run(&self, input: &SemanticResult) -> Result<QaAnswer> {
        let mut trace = Trace::new();
        let limit = self.recommendation_limit;
        let intent = Intent::parse(&input.identified_intent);

        if intent == Some(Intent::Greeting) {
            return Ok(trace.finish(
                GREETING_ANSWER.to_string(),
                starters(limit),
                Outcome::Greeting,
                None,
            ));
        }

        let Some(candidate) = primary_candidate(&input.identified_entities) else {
            trace.enter(PipelineState::EntityNotFound);
            return Ok(trace.finish(
                NO_ENTITY_ANSWER.to_string(),
                filler(limit),
                Outcome::NoEntity,
                None,
            ));
        };

        let entity = match self
            .resolver
            .resolve(&candidate.name, candidate.expected)
            .await?
        {
            Resolution::Found(entity) => entity,
            Resolution::NotFound { name } => {
                trace.enter(PipelineState::EntityNotFound);
                return Ok(trace.finish(
                    synthesizer::empty_answer(&input.identified_intent, &name),
                    filler(limit),
                    Outcome::EntityNotFound,
                    None,
                ));
            }
        };
        trace.enter(PipelineState::EntityResolved);

        let plan = match intent {
            Some(intent) => build_for(intent, &entity),
            None => QueryPlan::Unsupported,
        };

        let descriptor = match plan {
            QueryPlan::Built(descriptor) => descriptor,
            QueryPlan::Unsupported => {
                trace.enter(PipelineState::QueryUnsupported);
                tracing::debug!(
                    intent = %input.identified_intent,
                    node_type = %entity.node_type,
                    "No query for intent and entity type"
                );
                let recs = self.recommender.recommend_for(&entity, limit).await?;
                return Ok(trace.finish(
                    synthesizer::empty_answer(&input.identified_intent, &entity.name),
                    recs.questions,
                    Outcome::QueryUnsupported,
                    Some(entity),
                ));
            }
        };
        trace.enter(PipelineState::QueryBuilt);

        let rows = self.executor.execute(&descriptor).await?;
        trace.enter(PipelineState::RowsFetched);

        let answer = synthesizer::synthesize(
            &input.original_question,
            &input.identified_intent,
            &entity.name,
            &rows,
        );
        trace.enter(PipelineState::AnswerReady);

        let recs = self.recommender.recommend_for(&entity, limit).await?;
        let outcome = if rows.is_empty() {
            Outcome::EmptyResult
        } else {
            Outcome::Answered
        };

        Ok(trace.finish(answer, recs.questions, outcome, Some(entity)))
    }
}
