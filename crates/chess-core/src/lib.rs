//! Position model, similarity scoring and PGN helpers for the position search engine.

pub mod channel;
pub mod error;
pub mod game;
pub mod pgn;
pub mod position;
pub mod ranking;
pub mod similarity;

pub use channel::{Channel, ChannelKind, ChannelSelection, ChannelValue};
pub use error::CoreError;
pub use game::Game;
pub use position::{Color, Position, SquareList};
pub use ranking::{rank, rank_query, search, Limit, ScoredPosition};
pub use similarity::SimilarityQuery;
