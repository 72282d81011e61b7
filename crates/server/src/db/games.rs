use chess_core::Game;
use sqlx::{PgPool, Postgres};

use crate::error::AppError;

#[derive(sqlx::FromRow)]
struct GameRow {
    id: String,
    result: Option<String>,
    white_elo: Option<i32>,
    black_elo: Option<i32>,
    game_type: Option<String>,
    date: Option<String>,
    white_name: Option<String>,
    black_name: Option<String>,
    eco: Option<String>,
    time_control: Option<String>,
    site: Option<String>,
    opening: Option<String>,
    pgn: String,
}

impl From<GameRow> for Game {
    fn from(r: GameRow) -> Self {
        Game {
            id: r.id,
            result: r.result,
            white_elo: r.white_elo,
            black_elo: r.black_elo,
            game_type: r.game_type,
            date: r.date,
            white_name: r.white_name,
            black_name: r.black_name,
            eco: r.eco,
            time_control: r.time_control,
            site: r.site,
            opening: r.opening,
            pgn: r.pgn,
        }
    }
}

pub async fn get_game(pool: &PgPool, game_id: &str) -> Result<Option<Game>, AppError> {
    let row: Option<GameRow> = sqlx::query_as(
        r#"SELECT id, result, white_elo, black_elo, game_type, date, white_name,
                  black_name, eco, time_control, site, opening, pgn
           FROM games
           WHERE id = $1"#,
    )
    .bind(game_id)
    .fetch_optional(pool)
    .await
    .map_err(AppError::Sqlx)?;

    Ok(row.map(Game::from))
}

/// Insert or refresh a game's metadata and movetext.
pub async fn upsert_game<'e, E>(executor: E, game: &Game) -> Result<(), AppError>
where
    E: sqlx::Executor<'e, Database = Postgres>,
{
    sqlx::query(
        r#"INSERT INTO games (
            id, result, white_elo, black_elo, game_type, date, white_name,
            black_name, eco, time_control, site, opening, pgn
        ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
        ON CONFLICT (id) DO UPDATE SET
            result = EXCLUDED.result,
            white_elo = EXCLUDED.white_elo,
            black_elo = EXCLUDED.black_elo,
            game_type = EXCLUDED.game_type,
            date = EXCLUDED.date,
            white_name = EXCLUDED.white_name,
            black_name = EXCLUDED.black_name,
            eco = EXCLUDED.eco,
            time_control = EXCLUDED.time_control,
            site = EXCLUDED.site,
            opening = EXCLUDED.opening,
            pgn = EXCLUDED.pgn"#,
    )
    .bind(&game.id)
    .bind(&game.result)
    .bind(game.white_elo)
    .bind(game.black_elo)
    .bind(&game.game_type)
    .bind(&game.date)
    .bind(&game.white_name)
    .bind(&game.black_name)
    .bind(&game.eco)
    .bind(&game.time_control)
    .bind(&game.site)
    .bind(&game.opening)
    .bind(&game.pgn)
    .execute(executor)
    .await
    .map_err(AppError::Sqlx)?;

    Ok(())
}
