pub mod health;
pub mod positions;

use axum::{
    routing::{get, post},
    Extension, Router,
};
use tower_http::compression::CompressionLayer;
use tower_http::cors::{Any, CorsLayer};

use crate::clients::Summarizer;
use crate::config::Config;
use crate::store::PositionStore;

/// All HTTP routes with their shared state attached.
pub fn router<S, L>(store: S, llm: L, config: Config) -> Router
where
    S: PositionStore + Clone + 'static,
    L: Summarizer + Clone + 'static,
{
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health::health_check))
        .route("/api/positions/similar", post(positions::find_similar::<S>))
        .route("/api/positions/summary", post(positions::summarize::<S, L>))
        .route("/api/positions/{position_id}", get(positions::get_position::<S>))
        .layer(Extension(store))
        .layer(Extension(llm))
        .layer(Extension(config))
        .layer(CompressionLayer::new())
        .layer(cors)
}
