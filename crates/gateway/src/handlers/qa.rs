//! Question answering handlers

use axum::{extract::State, Json};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use validator::Validate;

use crate::AppState;
use medqa_common::{
    errors::{AppError, Result},
    graph::Entity,
    kgqa::{Outcome, QaAnswer, SemanticResult},
};

/// Already-analysed question
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AnswerRequest {
    #[serde(default)]
    #[validate(length(max = 500))]
    pub original_question: String,

    #[serde(default)]
    #[validate(length(max = 64))]
    pub identified_intent: String,

    #[serde(default)]
    pub identified_entities: IndexMap<String, Vec<String>>,
}

impl From<AnswerRequest> for SemanticResult {
    fn from(request: AnswerRequest) -> Self {
        SemanticResult {
            original_question: request.original_question,
            identified_intent: request.identified_intent,
            identified_entities: request.identified_entities,
        }
    }
}

/// Free-text question
#[derive(Debug, Deserialize, Validate)]
pub struct AskRequest {
    #[validate(length(min = 1, max = 500))]
    pub question: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerResponse {
    pub answer: String,
    pub recommended_questions: Vec<String>,
    pub outcome: Outcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entity: Option<Entity>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub intent: Option<String>,
    pub disclaimer: String,
    pub processing_time_ms: u64,
}

impl AnswerResponse {
    fn new(answer: QaAnswer, disclaimer: &str, start: Instant) -> Self {
        Self {
            answer: answer.answer,
            recommended_questions: answer.recommended_questions,
            outcome: answer.outcome,
            entity: answer.entity,
            intent: None,
            disclaimer: disclaimer.to_string(),
            processing_time_ms: start.elapsed().as_millis() as u64,
        }
    }
}

fn invalid(e: validator::ValidationErrors) -> AppError {
    AppError::Validation {
        message: e.to_string(),
        field: None,
    }
}

/// Answer a question the caller has already analysed
pub async fn answer(
    State(state): State<AppState>,
    Json(request): Json<AnswerRequest>,
) -> Result<Json<AnswerResponse>> {
    let start = Instant::now();
    request.validate().map_err(invalid)?;

    let input = SemanticResult::from(request);
    let answer = state.engine.answer(&input).await?;

    Ok(Json(AnswerResponse::new(
        answer,
        &state.config.answer.disclaimer,
        start,
    )))
}

/// Analyse a free-text question, then answer it
pub async fn ask(
    State(state): State<AppState>,
    Json(request): Json<AskRequest>,
) -> Result<Json<AnswerResponse>> {
    let start = Instant::now();
    request.validate().map_err(invalid)?;

    let question = request.question.trim();
    if question.is_empty() {
        return Err(AppError::Validation {
            message: "Question must not be blank".to_string(),
            field: Some("question".to_string()),
        });
    }

    let input = state.analyzer.analyze(question).await.map_err(|e| {
        tracing::warn!(analyzer = state.analyzer.name(), error = %e, "Question analysis failed");
        e
    })?;

    let answer = state.engine.answer(&input).await?;
    let mut response = AnswerResponse::new(answer, &state.config.answer.disclaimer, start);
    response.intent = Some(input.identified_intent);

    Ok(Json(response))
}
