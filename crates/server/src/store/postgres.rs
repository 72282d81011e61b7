use chess_core::{Game, Limit, Position, ScoredPosition, SimilarityQuery};
use sqlx::PgPool;

use super::PositionStore;
use crate::db::{games, positions};
use crate::error::AppError;

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

impl PositionStore for PgStore {
    async fn find_similar(
        &self,
        query: &SimilarityQuery,
        limit: Limit,
    ) -> Result<Vec<ScoredPosition>, AppError> {
        positions::find_similar(&self.pool, query, limit).await
    }

    async fn position(&self, id: i64) -> Result<Option<Position>, AppError> {
        positions::get_position(&self.pool, id).await
    }

    async fn game(&self, id: &str) -> Result<Option<Game>, AppError> {
        games::get_game(&self.pool, id).await
    }
}
