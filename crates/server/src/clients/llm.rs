use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chess_core::Color;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::config::LlmConfig;
use crate::error::AppError;

/// One game in a strategy batch: the sampled position and how the game went on.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GameSummaryRequest {
    pub game_id: String,
    pub fen: String,
    /// Movetext from the sampled position to the end of the game.
    pub moves: String,
    pub side: Color,
}

#[derive(Serialize)]
struct StrategyRequest<'a> {
    positions: &'a [GameSummaryRequest],
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all(serialize = "camelCase", deserialize = "snake_case"))]
pub struct PerGameSummary {
    pub game_id: String,
    pub summary: String,
}

/// Service response, passed through to callers unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all(serialize = "camelCase", deserialize = "snake_case"))]
pub struct StrategyResponse {
    pub aggregated_summary: String,
    #[serde(default)]
    pub per_game_summaries: Vec<PerGameSummary>,
}

pub trait Summarizer: Send + Sync {
    /// Summarize a whole batch in a single call.
    fn analyze_strategy(
        &self,
        positions: &[GameSummaryRequest],
    ) -> impl Future<Output = Result<StrategyResponse, AppError>> + Send;
}

impl<L: Summarizer> Summarizer for Arc<L> {
    fn analyze_strategy(
        &self,
        positions: &[GameSummaryRequest],
    ) -> impl Future<Output = Result<StrategyResponse, AppError>> + Send {
        (**self).analyze_strategy(positions)
    }
}

#[derive(Clone)]
pub struct LlmClient {
    client: Client,
    endpoint: String,
    timeout_secs: u64,
}

impl LlmClient {
    pub fn new(config: &LlmConfig) -> Result<Self, AppError> {
        let client = Client::builder()
            .user_agent("PositionSearch/1.0")
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            timeout_secs: config.timeout_secs,
        })
    }

    pub fn url(&self) -> String {
        format!("{}/analyze-strategy", self.endpoint)
    }
}

impl Summarizer for LlmClient {
    async fn analyze_strategy(
        &self,
        positions: &[GameSummaryRequest],
    ) -> Result<StrategyResponse, AppError> {
        tracing::info!(batch = positions.len(), "Requesting strategy summary");

        let resp = self
            .client
            .post(self.url())
            .json(&StrategyRequest { positions })
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    AppError::Upstream(format!("timed out after {}s", self.timeout_secs))
                } else {
                    AppError::Upstream(format!("Request error: {e}"))
                }
            })?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(AppError::Upstream(format!("HTTP {status}: {body}")));
        }

        resp.json::<StrategyResponse>()
            .await
            .map_err(|e| AppError::Upstream(format!("Invalid response body: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_body_shape() {
        let positions = vec![GameSummaryRequest {
            game_id: "abc123".into(),
            fen: "8/8/8/8/8/8/8/8 w - - 0 1".into(),
            moves: "12.Nf3 Nc6".into(),
            side: Color::Black,
        }];
        let body = serde_json::to_value(StrategyRequest { positions: &positions }).unwrap();
        assert_eq!(
            body,
            json!({"positions": [{
                "gameId": "abc123",
                "fen": "8/8/8/8/8/8/8/8 w - - 0 1",
                "moves": "12.Nf3 Nc6",
                "side": "black",
            }]})
        );
    }

    #[test]
    fn test_response_read_snake_written_camel() {
        let raw = json!({
            "aggregated_summary": "Both games castle short.",
            "per_game_summaries": [{"game_id": "g1", "summary": "Kingside attack."}],
        });
        let resp: StrategyResponse = serde_json::from_value(raw).unwrap();
        assert_eq!(resp.per_game_summaries[0].game_id, "g1");

        let out = serde_json::to_value(&resp).unwrap();
        assert_eq!(out["aggregatedSummary"], "Both games castle short.");
        assert_eq!(out["perGameSummaries"][0]["gameId"], "g1");
    }

    #[test]
    fn test_url_trims_trailing_slash() {
        let config = LlmConfig {
            endpoint: "http://llm.internal:8001/".into(),
            ..LlmConfig::default()
        };
        let client = LlmClient::new(&config).unwrap();
        assert_eq!(client.url(), "http://llm.internal:8001/analyze-strategy");
    }
}
