//! Similarity search: validate, rank through the store, then enrich.

use chess_core::{ChannelSelection, Game, Limit, Position, ScoredPosition, SimilarityQuery};
use futures::future::try_join_all;
use serde::Serialize;

use crate::error::AppError;
use crate::store::PositionStore;

/// A ranked match with its full position and game attached.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SimilarityResult {
    pub position_id: i64,
    pub game_id: String,
    pub move_number: i32,
    pub similarity_score: f64,
    pub position: Position,
    pub game: Game,
}

pub fn validate_limit(limit: i64, max_limit: i64) -> Result<Limit, AppError> {
    if limit > max_limit {
        return Err(AppError::BadRequest(format!(
            "limit must be at most {max_limit}, got {limit}"
        )));
    }
    Ok(Limit::new(limit)?)
}

/// Rank stored positions against `fen` over the named piece types.
///
/// Channel names, limit and FEN are all checked before the store is touched.
pub async fn find_similar_positions<S: PositionStore>(
    store: &S,
    fen: &str,
    piece_types: &[String],
    limit: i64,
    max_limit: i64,
) -> Result<Vec<SimilarityResult>, AppError> {
    let selection = ChannelSelection::parse(piece_types)?;
    let limit = validate_limit(limit, max_limit)?;
    let query_position = Position::from_fen(fen)?;
    let query = SimilarityQuery::build(&query_position, &selection);

    let ranked = store.find_similar(&query, limit).await?;
    tracing::debug!(
        channels = selection.len(),
        limit = limit.get(),
        found = ranked.len(),
        "Ranked similar positions"
    );

    enrich_all(store, ranked).await
}

pub async fn enrich<S: PositionStore>(
    store: &S,
    scored: ScoredPosition,
) -> Result<SimilarityResult, AppError> {
    let position = store.position(scored.position_id).await?.ok_or_else(|| {
        AppError::Consistency(format!("ranked position {} does not exist", scored.position_id))
    })?;

    let game = store.game(&position.game_id).await?.ok_or_else(|| {
        AppError::Consistency(format!(
            "game {} of position {} does not exist",
            position.game_id, scored.position_id
        ))
    })?;

    Ok(SimilarityResult {
        position_id: scored.position_id,
        game_id: scored.game_id,
        move_number: scored.move_number,
        similarity_score: scored.score,
        position,
        game,
    })
}

/// Enrich every ranked result concurrently; output keeps the rank order and
/// the first failure fails the whole batch.
pub async fn enrich_all<S: PositionStore>(
    store: &S,
    ranked: Vec<ScoredPosition>,
) -> Result<Vec<SimilarityResult>, AppError> {
    try_join_all(ranked.into_iter().map(|scored| enrich(store, scored))).await
}
