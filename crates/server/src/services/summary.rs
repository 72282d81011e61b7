//! Strategy summaries over a batch of stored positions.

use chess_core::{pgn, Color, Game, Position};
use futures::future::try_join_all;

use crate::clients::{GameSummaryRequest, StrategyResponse, Summarizer};
use crate::error::AppError;
use crate::services::matching::SimilarityResult;
use crate::store::PositionStore;

/// Accepts exactly `"white"` or `"black"`.
pub fn parse_side(side: &str) -> Result<Color, AppError> {
    match side {
        "white" => Ok(Color::White),
        "black" => Ok(Color::Black),
        other => Err(AppError::BadRequest(format!(
            "side must be \"white\" or \"black\", got {other:?}"
        ))),
    }
}

fn check_batch(len: usize, max_batch: usize) -> Result<(), AppError> {
    if len == 0 {
        return Err(AppError::BadRequest("No positions to summarize".into()));
    }
    if len > max_batch {
        return Err(AppError::BadRequest(format!(
            "At most {max_batch} positions can be summarized at once, got {len}"
        )));
    }
    Ok(())
}

pub fn summary_request(position: &Position, game: &Game, side: Color) -> GameSummaryRequest {
    GameSummaryRequest {
        game_id: game.id.clone(),
        fen: position.fen.clone(),
        moves: pgn::remaining_moves(position.move_number, &game.pgn),
        side,
    }
}

/// Summarize already enriched results with one call to the summarizer.
pub async fn summarize<L: Summarizer>(
    llm: &L,
    results: &[SimilarityResult],
    side: Color,
    max_batch: usize,
) -> Result<StrategyResponse, AppError> {
    check_batch(results.len(), max_batch)?;

    let batch: Vec<GameSummaryRequest> = results
        .iter()
        .map(|r| summary_request(&r.position, &r.game, side))
        .collect();

    llm.analyze_strategy(&batch).await
}

async fn load_request<S: PositionStore>(
    store: &S,
    position_id: i64,
    side: Color,
) -> Result<GameSummaryRequest, AppError> {
    let position = store
        .position(position_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Position {position_id} not found")))?;

    let game = store.game(&position.game_id).await?.ok_or_else(|| {
        AppError::Consistency(format!(
            "game {} of position {position_id} does not exist",
            position.game_id
        ))
    })?;

    Ok(summary_request(&position, &game, side))
}

/// Look up positions by id, in the caller's order, and summarize them.
pub async fn summarize_positions<S: PositionStore, L: Summarizer>(
    store: &S,
    llm: &L,
    position_ids: &[i64],
    side: Color,
    max_batch: usize,
) -> Result<StrategyResponse, AppError> {
    check_batch(position_ids.len(), max_batch)?;

    let batch = try_join_all(position_ids.iter().map(|id| load_request(store, *id, side))).await?;
    tracing::info!(positions = batch.len(), side = side.as_str(), "Summarizing positions");

    llm.analyze_strategy(&batch).await
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::clients::llm::PerGameSummary;
    use crate::store::MemoryStore;

    #[derive(Default)]
    struct RecordingSummarizer {
        calls: Mutex<Vec<Vec<GameSummaryRequest>>>,
    }

    impl Summarizer for RecordingSummarizer {
        async fn analyze_strategy(
            &self,
            positions: &[GameSummaryRequest],
        ) -> Result<StrategyResponse, AppError> {
            self.calls.lock().unwrap().push(positions.to_vec());
            Ok(StrategyResponse {
                aggregated_summary: format!("{} games", positions.len()),
                per_game_summaries: positions
                    .iter()
                    .map(|p| PerGameSummary {
                        game_id: p.game_id.clone(),
                        summary: p.moves.clone(),
                    })
                    .collect(),
            })
        }
    }

    struct DownSummarizer;

    impl Summarizer for DownSummarizer {
        async fn analyze_strategy(
            &self,
            _positions: &[GameSummaryRequest],
        ) -> Result<StrategyResponse, AppError> {
            Err(AppError::Upstream("timed out after 120s".into()))
        }
    }

    const PGN: &str = "11.e4 e5 12.Nf3 Nc6 13.Bb5";
    const FEN: &str = "r1bqkbnr/pppp1ppp/2n5/4p3/4P3/5N2/PPPP1PPP/RNBQKB1R w KQkq - 2 13";

    fn store() -> MemoryStore {
        let mut store = MemoryStore::new();
        for id in ["g1", "g2"] {
            store.insert_game(Game {
                id: id.into(),
                pgn: PGN.into(),
                ..Game::default()
            });
        }
        store.insert_position(Position::from_fen(FEN).unwrap().in_game("g1", 24));
        store.insert_position(Position::from_fen(FEN).unwrap().in_game("g2", 26));
        store.insert_position(Position::from_fen(FEN).unwrap().in_game("missing", 4));
        store
    }

    #[test]
    fn test_parse_side() {
        assert_eq!(parse_side("white").unwrap(), Color::White);
        assert_eq!(parse_side("black").unwrap(), Color::Black);
        assert!(matches!(parse_side("w"), Err(AppError::BadRequest(_))));
        assert!(matches!(parse_side("White"), Err(AppError::BadRequest(_))));
    }

    #[tokio::test]
    async fn test_single_call_in_input_order() {
        let store = store();
        let llm = RecordingSummarizer::default();

        let resp = summarize_positions(&store, &llm, &[2, 1], Color::White, 30)
            .await
            .unwrap();

        let calls = llm.calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        let batch = &calls[0];
        assert_eq!(batch[0].game_id, "g2");
        assert_eq!(batch[0].moves, "13.Bb5");
        assert_eq!(batch[1].game_id, "g1");
        assert_eq!(batch[1].moves, "12.Nf3 Nc6 13.Bb5");
        assert!(batch.iter().all(|r| r.side == Color::White && r.fen == FEN));

        assert_eq!(resp.aggregated_summary, "2 games");
        assert_eq!(resp.per_game_summaries[0].game_id, "g2");
    }

    #[tokio::test]
    async fn test_unknown_id_is_not_found_and_skips_call() {
        let store = store();
        let llm = RecordingSummarizer::default();

        let err = summarize_positions(&store, &llm, &[1, 99], Color::Black, 30)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
        assert!(llm.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_position_without_game_is_consistency_error() {
        let store = store();
        let llm = RecordingSummarizer::default();

        let err = summarize_positions(&store, &llm, &[3], Color::Black, 30)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Consistency(_)));
    }

    #[tokio::test]
    async fn test_batch_bounds() {
        let store = store();
        let llm = RecordingSummarizer::default();

        let err = summarize_positions(&store, &llm, &[], Color::White, 30)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));

        let err = summarize_positions(&store, &llm, &[1, 2], Color::White, 1)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
        assert!(llm.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_upstream_failure_is_surfaced() {
        let store = store();
        let err = summarize_positions(&store, &DownSummarizer, &[1], Color::White, 30)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Upstream(_)));
    }

    #[tokio::test]
    async fn test_summarize_enriched_results() {
        let store = store();
        let position = store.position(1).await.unwrap().unwrap();
        let game = store.game("g1").await.unwrap().unwrap();
        let results = vec![SimilarityResult {
            position_id: 1,
            game_id: "g1".into(),
            move_number: 24,
            similarity_score: 1.0,
            position,
            game,
        }];

        let llm = RecordingSummarizer::default();
        summarize(&llm, &results, Color::Black, 30).await.unwrap();
        let calls = llm.calls.lock().unwrap();
        assert_eq!(calls[0][0].moves, "12.Nf3 Nc6 13.Bb5");
        assert_eq!(calls[0][0].side, Color::Black);
    }
}
