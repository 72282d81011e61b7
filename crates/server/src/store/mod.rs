//! Read access to stored positions and games.
//!
//! Services are written against [`PositionStore`] so the same pipeline runs
//! over Postgres in production and over [`MemoryStore`] in tests.

mod memory;
mod postgres;

use std::future::Future;
use std::sync::Arc;

use chess_core::{Game, Limit, Position, ScoredPosition, SimilarityQuery};

use crate::error::AppError;

pub use memory::MemoryStore;
pub use postgres::PgStore;

pub trait PositionStore: Send + Sync {
    /// Filtered, scored scan returning at most `limit` candidates, best first,
    /// ties broken by ascending position id.
    fn find_similar(
        &self,
        query: &SimilarityQuery,
        limit: Limit,
    ) -> impl Future<Output = Result<Vec<ScoredPosition>, AppError>> + Send;

    fn position(&self, id: i64) -> impl Future<Output = Result<Option<Position>, AppError>> + Send;

    fn game(&self, id: &str) -> impl Future<Output = Result<Option<Game>, AppError>> + Send;
}

impl<S: PositionStore> PositionStore for Arc<S> {
    fn find_similar(
        &self,
        query: &SimilarityQuery,
        limit: Limit,
    ) -> impl Future<Output = Result<Vec<ScoredPosition>, AppError>> + Send {
        (**self).find_similar(query, limit)
    }

    fn position(&self, id: i64) -> impl Future<Output = Result<Option<Position>, AppError>> + Send {
        (**self).position(id)
    }

    fn game(&self, id: &str) -> impl Future<Output = Result<Option<Game>, AppError>> + Send {
        (**self).game(id)
    }
}
