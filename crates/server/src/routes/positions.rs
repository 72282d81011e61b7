use axum::{extract::Path, Extension, Json};
use chess_core::Position;
use serde::Deserialize;

use crate::clients::{StrategyResponse, Summarizer};
use crate::config::Config;
use crate::error::AppError;
use crate::services::matching::{self, SimilarityResult};
use crate::services::summary;
use crate::store::PositionStore;

const DEFAULT_LIMIT: i64 = 12;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimilarRequest {
    pub fen: String,
    #[serde(default)]
    pub piece_types: Vec<String>,
    pub limit: Option<i64>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryRequest {
    pub position_ids: Vec<i64>,
    pub side: String,
}

/// POST /api/positions/similar
pub async fn find_similar<S: PositionStore>(
    Extension(store): Extension<S>,
    Extension(config): Extension<Config>,
    Json(body): Json<SimilarRequest>,
) -> Result<Json<Vec<SimilarityResult>>, AppError> {
    let results = matching::find_similar_positions(
        &store,
        &body.fen,
        &body.piece_types,
        body.limit.unwrap_or(DEFAULT_LIMIT),
        config.search_max_limit,
    )
    .await?;

    Ok(Json(results))
}

/// POST /api/positions/summary
pub async fn summarize<S: PositionStore, L: Summarizer>(
    Extension(store): Extension<S>,
    Extension(llm): Extension<L>,
    Extension(config): Extension<Config>,
    Json(body): Json<SummaryRequest>,
) -> Result<Json<StrategyResponse>, AppError> {
    let side = summary::parse_side(&body.side)?;
    let resp = summary::summarize_positions(
        &store,
        &llm,
        &body.position_ids,
        side,
        config.llm.max_batch_size,
    )
    .await?;

    Ok(Json(resp))
}

/// GET /api/positions/{position_id}
pub async fn get_position<S: PositionStore>(
    Extension(store): Extension<S>,
    Path(position_id): Path<i64>,
) -> Result<Json<Position>, AppError> {
    let position = store
        .position(position_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Position {position_id} not found")))?;

    Ok(Json(position))
}
