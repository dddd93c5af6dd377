//! MedQA Common Library
//!
//! Shared code for the MedQA services:
//! - Knowledge-graph QA engine (`kgqa`)
//! - Graph store seam with in-memory and Neo4j backends
//! - Semantic-understanding client
//! - Error types and handling
//! - Configuration management
//! - Metrics and observability

pub mod config;
pub mod errors;
pub mod graph;
pub mod kgqa;
pub mod metrics;
pub mod semantic;

// Re-export commonly used types
pub use config::AppConfig;
pub use errors::{AppError, Result};
pub use graph::{GraphStore, GuardedGraph};
pub use kgqa::{KnowledgeCardService, QaAnswer, QaEngine, SemanticResult};
pub use semantic::SemanticAnalyzer;

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
