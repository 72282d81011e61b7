pub mod llm;

pub use llm::{GameSummaryRequest, LlmClient, StrategyResponse, Summarizer};
