//! Semantic-understanding client
//!
//! The analysis service turns free text into an intent label and typed
//! entity names. This module only speaks its HTTP protocol and reshapes the
//! response into the engine's [`SemanticResult`]; it never retries.

use crate::config::SemanticConfig;
use crate::errors::{AppError, Result};
use crate::kgqa::SemanticResult;
use async_trait::async_trait;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

/// Anything that can turn a question into intent + entities
#[async_trait]
pub trait SemanticAnalyzer: Send + Sync {
    async fn analyze(&self, question: &str) -> Result<SemanticResult>;

    /// Short name for logs
    fn name(&self) -> &str;
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ProcessQueryRequest<'a> {
    query_text: &'a str,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProcessQueryResponse {
    #[serde(default)]
    original_query: Option<String>,
    #[serde(default)]
    identified_intent: Option<String>,
    #[serde(default)]
    identified_entities: IndexMap<String, Vec<String>>,
    #[serde(default)]
    recommended_questions: Vec<SuggestedQuestion>,
    #[serde(default)]
    api_response: Option<ApiStatus>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SuggestedQuestion {
    #[serde(default)]
    relevant_entities: Vec<TypedEntity>,
}

#[derive(Debug, Deserialize)]
struct TypedEntity {
    #[serde(default)]
    name: String,
    #[serde(default, rename = "type")]
    entity_type: String,
}

#[derive(Debug, Deserialize)]
struct ApiStatus {
    code: u16,
    #[serde(default)]
    message: String,
}

/// Reshape a `/process_query` response.
///
/// Entities listed directly win; typed entities attached to suggested
/// questions are appended under their type label without repeats.
fn into_semantic_result(question: &str, response: ProcessQueryResponse) -> Result<SemanticResult> {
    if let Some(status) = response.api_response {
        if status.code >= 400 {
            return Err(AppError::UpstreamError {
                message: format!("analysis service returned {}: {}", status.code, status.message),
            });
        }
    }

    let mut entities = response.identified_entities;
    for entity in response
        .recommended_questions
        .into_iter()
        .flat_map(|q| q.relevant_entities)
    {
        let name = entity.name.trim();
        let label = entity.entity_type.trim();
        if name.is_empty() || label.is_empty() {
            continue;
        }
        let names = entities.entry(label.to_string()).or_default();
        if !names.iter().any(|n| n == name) {
            names.push(name.to_string());
        }
    }

    Ok(SemanticResult {
        original_question: response
            .original_query
            .filter(|q| !q.trim().is_empty())
            .unwrap_or_else(|| question.to_string()),
        identified_intent: response.identified_intent.unwrap_or_default(),
        identified_entities: entities,
    })
}

/// HTTP client for the analysis service
pub struct SemanticClient {
    client: reqwest::Client,
    endpoint: String,
    timeout: Duration,
}

impl SemanticClient {
    pub fn new(config: &SemanticConfig) -> Result<Self> {
        let timeout = config.timeout();
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::Configuration {
                message: format!("Failed to create HTTP client: {}", e),
            })?;

        Ok(Self {
            client,
            endpoint: format!("{}/process_query", config.base_url.trim_end_matches('/')),
            timeout,
        })
    }

    fn map_error(&self, err: reqwest::Error) -> AppError {
        if err.is_timeout() {
            AppError::UpstreamTimeout {
                timeout_ms: self.timeout.as_millis() as u64,
            }
        } else {
            AppError::UpstreamError {
                message: format!("Request failed: {}", err),
            }
        }
    }
}

#[async_trait]
impl SemanticAnalyzer for SemanticClient {
    async fn analyze(&self, question: &str) -> Result<SemanticResult> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(&ProcessQueryRequest { query_text: question })
            .send()
            .await
            .map_err(|e| self.map_error(e))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::UpstreamError {
                message: format!("API error {}: {}", status, body),
            });
        }

        let parsed: ProcessQueryResponse = response.json().await.map_err(|e| {
            AppError::UpstreamError {
                message: format!("Failed to parse response: {}", e),
            }
        })?;

        let result = into_semantic_result(question, parsed)?;
        tracing::debug!(
            intent = %result.identified_intent,
            entity_types = result.identified_entities.len(),
            "Question analysed"
        );
        Ok(result)
    }

    fn name(&self) -> &str {
        "http"
    }
}

/// Create the analyzer for the configured service
pub fn create_analyzer(config: &SemanticConfig) -> Result<Arc<dyn SemanticAnalyzer>> {
    Ok(Arc::new(SemanticClient::new(config)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> ProcessQueryResponse {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_direct_entities() {
        let response = parse(
            r#"{
                "originalQuery": "感冒有什么症状？",
                "identifiedIntent": "查询症状",
                "identifiedEntities": {"Disease": ["感冒"]}
            }"#,
        );
        let result = into_semantic_result("感冒有什么症状？", response).unwrap();
        assert_eq!(result.identified_intent, "查询症状");
        assert_eq!(result.identified_entities["Disease"], vec!["感冒"]);
    }

    #[test]
    fn test_entities_folded_from_suggestions() {
        let response = parse(
            r#"{
                "originalQuery": "高血压吃什么药",
                "identifiedKeywords": ["高血压"],
                "identifiedIntent": "query_common_drug",
                "recommendedQuestions": [
                    {"questionText": "高血压的常见症状有哪些？",
                     "relevantEntities": [{"id": "kg_id_Disease_高血压", "name": "高血压", "type": "Disease"}]},
                    {"questionText": "高血压需要做什么检查？",
                     "relevantEntities": [{"name": "高血压", "type": "Disease"}]},
                    {"questionText": "我能为您提供哪些帮助？", "relevantEntities": []}
                ],
                "apiResponse": {"code": 200, "message": "Success"}
            }"#,
        );
        let result = into_semantic_result("高血压吃什么药", response).unwrap();
        assert_eq!(result.identified_entities.len(), 1);
        assert_eq!(result.identified_entities["Disease"], vec!["高血压"]);
        assert_eq!(result.original_question, "高血压吃什么药");
    }

    #[test]
    fn test_missing_fields_default() {
        let result = into_semantic_result("你好", parse("{}")).unwrap();
        assert_eq!(result.original_question, "你好");
        assert!(result.identified_intent.is_empty());
        assert!(result.identified_entities.is_empty());
    }

    #[test]
    fn test_error_status_in_body() {
        let response = parse(r#"{"apiResponse": {"code": 400, "message": "Missing 'queryText'"}}"#);
        let err = into_semantic_result("", response).unwrap_err();
        assert!(matches!(err, AppError::UpstreamError { .. }));
    }

    #[test]
    fn test_endpoint_strips_trailing_slash() {
        let config = SemanticConfig {
            base_url: "http://analysis:5000/".into(),
            timeout_secs: 2,
        };
        let client = SemanticClient::new(&config).unwrap();
        assert_eq!(client.endpoint, "http://analysis:5000/process_query");
        assert_eq!(client.timeout, Duration::from_secs(2));
        assert_eq!(client.name(), "http");
    }

    #[tokio::test]
    async fn test_unreachable_service_is_upstream_error() {
        let config = SemanticConfig {
            base_url: "http://127.0.0.1:1".into(),
            timeout_secs: 2,
        };
        let client = SemanticClient::new(&config).unwrap();
        let err = client.analyze("感冒").await.unwrap_err();
        assert!(matches!(
            err,
            AppError::UpstreamError { .. } | AppError::UpstreamTimeout { .. }
        ));
    }
}
