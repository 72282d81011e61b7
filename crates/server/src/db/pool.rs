use sqlx::postgres::{PgPool, PgPoolOptions};

pub async fn create_pool(database_url: &str, max_connections: u32) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(database_url)
        .await
}

/// Run the full Postgres schema migration inline.
pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::Error> {
    sqlx::raw_sql(SCHEMA_SQL).execute(pool).await?;
    Ok(())
}

const SCHEMA_SQL: &str = r#"
-- Population count of a 64-bit pawn bitboard
CREATE OR REPLACE FUNCTION popcount64(val BIGINT)
RETURNS INTEGER AS $$
    SELECT length(replace((val::bit(64))::text, '0', ''))::int;
$$ LANGUAGE SQL IMMUTABLE STRICT;

-- Recorded games
CREATE TABLE IF NOT EXISTS games (
    id           TEXT PRIMARY KEY,
    result       TEXT,
    white_elo    INTEGER,
    black_elo    INTEGER,
    game_type    TEXT,
    date         TEXT,
    white_name   TEXT,
    black_name   TEXT,
    eco          TEXT,
    time_control TEXT,
    site         TEXT,
    opening      TEXT,
    pgn          TEXT NOT NULL DEFAULT '',
    created_at   TIMESTAMPTZ NOT NULL DEFAULT NOW()
);

-- One row per sampled board state; square lists are comma-separated indices
CREATE TABLE IF NOT EXISTS positions (
    id                BIGSERIAL PRIMARY KEY,
    game_id           TEXT NOT NULL REFERENCES games(id) ON DELETE CASCADE,
    move_number       INTEGER NOT NULL,
    white_king        INTEGER,
    black_king        INTEGER,
    white_queens      TEXT,
    white_rooks       TEXT,
    white_bishops     TEXT,
    white_knights     TEXT,
    black_queens      TEXT,
    black_rooks       TEXT,
    black_bishops     TEXT,
    black_knights     TEXT,
    white_pawns       BIGINT NOT NULL DEFAULT 0,
    black_pawns       BIGINT NOT NULL DEFAULT 0,
    side_to_move      TEXT NOT NULL,
    castling_rights   INTEGER NOT NULL DEFAULT 0,
    en_passant_square INTEGER,
    half_move_clock   INTEGER NOT NULL DEFAULT 0,
    full_move_number  INTEGER NOT NULL DEFAULT 1,
    fen               TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_positions_game_id     ON positions (game_id);
CREATE INDEX IF NOT EXISTS idx_positions_white_pawns ON positions (white_pawns);
CREATE INDEX IF NOT EXISTS idx_positions_black_pawns ON positions (black_pawns);
CREATE INDEX IF NOT EXISTS idx_positions_white_king  ON positions (white_king);
CREATE INDEX IF NOT EXISTS idx_positions_black_king  ON positions (black_king);
"#;
