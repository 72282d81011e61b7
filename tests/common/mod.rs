#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use chess_core::{Game, Position};
use server::clients::llm::PerGameSummary;
use server::clients::{GameSummaryRequest, StrategyResponse, Summarizer};
use server::config::{Config, LlmConfig};
use server::error::AppError;
use server::store::MemoryStore;

/// Eight white pawns on the second rank.
pub const RANK_TWO_PAWNS: &str = "4k3/8/8/8/8/8/PPPPPPPP/4K3 w - - 0 1";
pub const NO_PAWNS: &str = "4k3/8/8/8/8/8/8/4K3 w - - 0 1";

pub fn config() -> Config {
    Config {
        database_url: "postgres://unused".to_string(),
        database_max_connections: 1,
        host: "127.0.0.1".to_string(),
        port: 0,
        search_max_limit: 50,
        llm: LlmConfig::default(),
    }
}

pub fn game(id: &str, pgn: &str) -> Game {
    Game {
        id: id.to_string(),
        pgn: pgn.to_string(),
        white_name: Some("alice".to_string()),
        black_name: Some("bob".to_string()),
        ..Game::default()
    }
}

/// Store one position per `(fen, game_id, move_number)`, creating each game once.
pub fn store_with(entries: &[(&str, &str, i32)], pgn: &str) -> MemoryStore {
    let mut store = MemoryStore::new();
    for (fen, game_id, move_number) in entries {
        store.insert_game(game(game_id, pgn));
        store.insert_position(
            Position::from_fen(fen)
                .expect("test FEN")
                .in_game(*game_id, *move_number),
        );
    }
    store
}

/// Summarizer that records every batch and echoes the moves back.
#[derive(Default, Clone)]
pub struct RecordingSummarizer {
    pub calls: Arc<Mutex<Vec<Vec<GameSummaryRequest>>>>,
}

impl RecordingSummarizer {
    pub fn batches(&self) -> Vec<Vec<GameSummaryRequest>> {
        self.calls.lock().unwrap().clone()
    }
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
