//! Knowledge-graph question answering
//!
//! Turns an analysed question (intent plus typed entity names) into an
//! answer sentence and a few follow-up questions by walking the medical
//! knowledge graph.
//!
//! ```text
//! SemanticResult -> EntityResolver -> query_builder -> QueryExecutor
//!                -> synthesizer -> RecommendationGenerator -> QaAnswer
//! ```

pub mod executor;
pub mod intent;
pub mod knowledge_card;
pub mod orchestrator;
pub mod query_builder;
pub mod recommender;
pub mod resolver;
pub mod synthesizer;

pub use executor::QueryExecutor;
pub use intent::Intent;
pub use knowledge_card::{KnowledgeCard, KnowledgeCardService};
pub use orchestrator::{Outcome, PipelineState, QaAnswer, QaEngine, SemanticResult};
pub use query_builder::{QueryPlan, TraversalDescriptor};
pub use recommender::{RecommendationGenerator, Recommendations};
pub use resolver::{EntityResolver, Resolution};
