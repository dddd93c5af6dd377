//! Knowledge card handler

use axum::{
    extract::{Path, State},
    Json,
};

use crate::AppState;
use medqa_common::{
    errors::{AppError, Result},
    kgqa::KnowledgeCard,
};

/// Everything the graph holds about one keyword
pub async fn get_card(
    State(state): State<AppState>,
    Path(keyword): Path<String>,
) -> Result<Json<KnowledgeCard>> {
    let keyword = keyword.trim();
    if keyword.is_empty() {
        return Err(AppError::MissingField {
            field: "keyword".to_string(),
        });
    }

    match state.cards.lookup(keyword).await? {
        Some(card) => Ok(Json(card)),
        None => Err(AppError::NotFound {
            resource_type: "knowledge".to_string(),
            name: keyword.to_string(),
        }),
    }
}
