use std::collections::HashMap;

use chess_core::{rank_query, Game, Limit, Position, ScoredPosition, SimilarityQuery};

use super::PositionStore;
use crate::error::AppError;

/// Position store held entirely in memory. Ids are assigned on insert,
/// starting at 1, in insertion order.
#[derive(Debug, Default)]
pub struct MemoryStore {
    positions: Vec<Position>,
    games: HashMap<String, Game>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_game(&mut self, game: Game) {
        self.games.insert(game.id.clone(), game);
    }

    /// Store a position and return its assigned id.
    pub fn insert_position(&mut self, mut position: Position) -> i64 {
        let id = self.positions.len() as i64 + 1;
        position.id = id;
        self.positions.push(position);
        id
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}

impl PositionStore for MemoryStore {
    async fn find_similar(
        &self,
        query: &SimilarityQuery,
        limit: Limit,
    ) -> Result<Vec<ScoredPosition>, AppError> {
        Ok(rank_query(&self.positions, query, limit))
    }

    async fn position(&self, id: i64) -> Result<Option<Position>, AppError> {
        Ok(id
            .checked_sub(1)
            .and_then(|idx| usize::try_from(idx).ok())
            .and_then(|idx| self.positions.get(idx))
            .cloned())
    }

    async fn game(&self, id: &str) -> Result<Option<Game>, AppError> {
        Ok(self.games.get(id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chess_core::ChannelSelection;

    fn position(fen: &str, game_id: &str) -> Position {
        Position::from_fen(fen).unwrap().in_game(game_id, 12)
    }

    #[tokio::test]
    async fn test_ids_assigned_in_order() {
        let mut store = MemoryStore::new();
        let a = store.insert_position(position("4k3/8/8/8/8/8/P7/4K3 w - - 0 1", "g1"));
        let b = store.insert_position(position("4k3/8/8/8/8/8/1P6/4K3 w - - 0 1", "g1"));
        assert_eq!((a, b), (1, 2));

        assert_eq!(store.position(2).await.unwrap().unwrap().white_pawns, 1 << 9);
        assert!(store.position(0).await.unwrap().is_none());
        assert!(store.position(3).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_extreme_ids_are_absent() {
        let mut store = MemoryStore::new();
        store.insert_position(position("4k3/8/8/8/8/8/P7/4K3 w - - 0 1", "g1"));

        assert!(store.position(i64::MIN).await.unwrap().is_none());
        assert!(store.position(-1).await.unwrap().is_none());
        assert!(store.position(i64::MAX).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_find_similar_ranks_stored_positions() {
        let mut store = MemoryStore::new();
        store.insert_position(position("4k3/8/8/8/8/8/PP6/4K3 w - - 0 1", "g1"));
        store.insert_position(position("4k3/8/8/8/8/8/P7/4K3 w - - 0 1", "g2"));

        let query = Position::from_fen("4k3/8/8/8/8/8/PP6/4K3 w - - 0 1").unwrap();
        let selection = ChannelSelection::parse(&["whitePawn"]).unwrap();
        let q = SimilarityQuery::build(&query, &selection);
        let results = store.find_similar(&q, Limit::new(5).unwrap()).await.unwrap();

        let ids: Vec<i64> = results.iter().map(|r| r.position_id).collect();
        assert_eq!(ids, vec![1, 2]);
        assert_eq!(results[1].score, 0.5);
        assert_eq!(results[1].game_id, "g2");
    }
}
