//! Position queries, including the compiled similarity scan.

use chess_core::similarity::{ChannelTerm, FilterTerm, TermValue};
use chess_core::{Color, Game, Limit, Position, ScoredPosition, SimilarityQuery, SquareList};
use sqlx::{PgPool, Postgres, QueryBuilder};

use crate::db::games;
use crate::error::AppError;

const POSITION_COLUMNS: &str = r#"id, game_id, move_number, white_king, black_king,
    white_queens, white_rooks, white_bishops, white_knights,
    black_queens, black_rooks, black_bishops, black_knights,
    white_pawns, black_pawns, side_to_move, castling_rights,
    en_passant_square, half_move_clock, full_move_number, fen"#;

#[derive(sqlx::FromRow)]
struct PositionRow {
    id: i64,
    game_id: String,
    move_number: i32,
    white_king: Option<i32>,
    black_king: Option<i32>,
    white_queens: Option<String>,
    white_rooks: Option<String>,
    white_bishops: Option<String>,
    white_knights: Option<String>,
    black_queens: Option<String>,
    black_rooks: Option<String>,
    black_bishops: Option<String>,
    black_knights: Option<String>,
    white_pawns: i64,
    black_pawns: i64,
    side_to_move: String,
    castling_rights: i32,
    en_passant_square: Option<i32>,
    half_move_clock: i32,
    full_move_number: i32,
    fen: String,
}

fn inconsistent(id: i64, column: &str, value: i32) -> AppError {
    AppError::Consistency(format!("position {id}: {column} = {value}"))
}

fn square(value: Option<i32>, column: &str, id: i64) -> Result<Option<u8>, AppError> {
    value
        .map(|v| {
            u8::try_from(v)
                .ok()
                .filter(|sq| *sq <= 63)
                .ok_or_else(|| inconsistent(id, column, v))
        })
        .transpose()
}

fn squares(value: Option<&str>) -> Result<SquareList, AppError> {
    Ok(SquareList::from_column(value)?)
}

impl TryFrom<PositionRow> for Position {
    type Error = AppError;

    fn try_from(r: PositionRow) -> Result<Self, Self::Error> {
        let side_to_move = Color::parse(&r.side_to_move).ok_or_else(|| {
            AppError::Consistency(format!("position {}: side_to_move = {:?}", r.id, r.side_to_move))
        })?;

        Ok(Position {
            white_king: square(r.white_king, "white_king", r.id)?,
            black_king: square(r.black_king, "black_king", r.id)?,
            white_queens: squares(r.white_queens.as_deref())?,
            white_rooks: squares(r.white_rooks.as_deref())?,
            white_bishops: squares(r.white_bishops.as_deref())?,
            white_knights: squares(r.white_knights.as_deref())?,
            black_queens: squares(r.black_queens.as_deref())?,
            black_rooks: squares(r.black_rooks.as_deref())?,
            black_bishops: squares(r.black_bishops.as_deref())?,
            black_knights: squares(r.black_knights.as_deref())?,
            // BIGINT holds the same 64 bits
            white_pawns: r.white_pawns as u64,
            black_pawns: r.black_pawns as u64,
            side_to_move,
            castling_rights: u8::try_from(r.castling_rights)
                .ok()
                .filter(|rights| *rights <= 0x0F)
                .ok_or_else(|| inconsistent(r.id, "castling_rights", r.castling_rights))?,
            en_passant_square: square(r.en_passant_square, "en_passant_square", r.id)?,
            half_move_clock: u32::try_from(r.half_move_clock)
                .map_err(|_| inconsistent(r.id, "half_move_clock", r.half_move_clock))?,
            full_move_number: u32::try_from(r.full_move_number)
                .ok()
                .filter(|n| *n >= 1)
                .ok_or_else(|| inconsistent(r.id, "full_move_number", r.full_move_number))?,
            id: r.id,
            game_id: r.game_id,
            move_number: r.move_number,
            fen: r.fen,
        })
    }
}

pub async fn get_position(pool: &PgPool, position_id: i64) -> Result<Option<Position>, AppError> {
    let row: Option<PositionRow> =
        sqlx::query_as(&format!("SELECT {POSITION_COLUMNS} FROM positions WHERE id = $1"))
            .bind(position_id)
            .fetch_optional(pool)
            .await
            .map_err(AppError::Sqlx)?;

    row.map(Position::try_from).transpose()
}

fn push_term_score(qb: &mut QueryBuilder<'static, Postgres>, term: &ChannelTerm) {
    let col = term.channel.column();
    match &term.value {
        TermValue::Bitboard(bits) => {
            let bits = *bits as i64;
            qb.push(format!("CASE WHEN popcount64(p.{col} | "))
                .push_bind(bits)
                .push(format!(") = 0 THEN 0.0 ELSE popcount64(p.{col} & "))
                .push_bind(bits)
                .push(format!(")::float8 / popcount64(p.{col} | "))
                .push_bind(bits)
                .push(") END");
        }
        TermValue::Square(Some(sq)) => {
            qb.push(format!("CASE WHEN p.{col} = "))
                .push_bind(i32::from(*sq))
                .push(" THEN 1.0 ELSE 0.0 END");
        }
        TermValue::Square(None) => {
            qb.push("0.0");
        }
        TermValue::Squares(list) if list.is_empty() => {
            qb.push("0.0");
        }
        TermValue::Squares(list) => {
            let count = list.len();
            let list: Vec<i32> = list.iter().map(|sq| i32::from(*sq)).collect();
            qb.push("(SELECT COUNT(*) FROM unnest(")
                .push_bind(list)
                .push(format!(
                    "::int4[]) AS q(sq) WHERE q.sq = ANY(string_to_array(p.{col}, ',')::int4[]))::float8 / {count}"
                ));
        }
    }
}

fn push_filter(qb: &mut QueryBuilder<'static, Postgres>, term: &ChannelTerm) {
    let col = term.channel.column();
    match term.filter {
        Some(FilterTerm::SharesBits(mask)) => {
            qb.push(format!(" AND (p.{col} = 0 OR (p.{col} & "))
                .push_bind(mask as i64)
                .push(") <> 0)");
        }
        Some(FilterTerm::Present) => {
            qb.push(format!(" AND p.{col} IS NOT NULL"));
        }
        None => {}
    }
}

/// Compile a similarity query into a single ranked scan over `positions`.
/// Every query value is bound as a parameter; only column names are inlined.
pub fn similarity_scan(query: &SimilarityQuery, limit: Limit) -> QueryBuilder<'static, Postgres> {
    let terms = query.terms();
    let mut qb = QueryBuilder::new("SELECT p.id, p.game_id, p.move_number, ");

    if terms.is_empty() {
        qb.push("0.0::float8");
    } else {
        qb.push("((");
        for (i, term) in terms.iter().enumerate() {
            if i > 0 {
                qb.push(" + ");
            }
            push_term_score(&mut qb, term);
        }
        qb.push(format!(")::float8 / {})", terms.len()));
    }

    qb.push(" AS similarity_score FROM positions p WHERE TRUE");
    for term in terms {
        push_filter(&mut qb, term);
    }

    qb.push(" ORDER BY similarity_score DESC, p.id ASC LIMIT ");
    qb.push_bind(i64::try_from(limit.get()).unwrap_or(i64::MAX));
    qb
}

pub async fn find_similar(
    pool: &PgPool,
    query: &SimilarityQuery,
    limit: Limit,
) -> Result<Vec<ScoredPosition>, AppError> {
    let mut qb = similarity_scan(query, limit);
    let rows: Vec<(i64, String, i32, f64)> = qb
        .build_query_as()
        .fetch_all(pool)
        .await
        .map_err(AppError::Sqlx)?;

    Ok(rows
        .into_iter()
        .map(|(position_id, game_id, move_number, score)| ScoredPosition {
            position_id,
            game_id,
            move_number,
            score,
        })
        .collect())
}

/// Store a game and replace all of its positions in one transaction.
/// Returns the number of positions written.
pub async fn save_game(pool: &PgPool, game: &Game, positions: &[Position]) -> Result<usize, AppError> {
    let mut tx = pool.begin().await.map_err(AppError::Sqlx)?;

    games::upsert_game(&mut *tx, game).await?;

    sqlx::query("DELETE FROM positions WHERE game_id = $1")
        .bind(&game.id)
        .execute(&mut *tx)
        .await
        .map_err(AppError::Sqlx)?;

    for pos in positions {
        sqlx::query(
            r#"INSERT INTO positions (
                game_id, move_number, white_king, black_king,
                white_queens, white_rooks, white_bishops, white_knights,
                black_queens, black_rooks, black_bishops, black_knights,
                white_pawns, black_pawns, side_to_move, castling_rights,
                en_passant_square, half_move_clock, full_move_number, fen
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18, $19, $20)"#,
        )
        .bind(&game.id)
        .bind(pos.move_number)
        .bind(pos.white_king.map(i32::from))
        .bind(pos.black_king.map(i32::from))
        .bind(pos.white_queens.to_column())
        .bind(pos.white_rooks.to_column())
        .bind(pos.white_bishops.to_column())
        .bind(pos.white_knights.to_column())
        .bind(pos.black_queens.to_column())
        .bind(pos.black_rooks.to_column())
        .bind(pos.black_bishops.to_column())
        .bind(pos.black_knights.to_column())
        .bind(pos.white_pawns as i64)
        .bind(pos.black_pawns as i64)
        .bind(pos.side_to_move.fen_char().to_string())
        .bind(i32::from(pos.castling_rights))
        .bind(pos.en_passant_square.map(i32::from))
        .bind(i32::try_from(pos.half_move_clock).unwrap_or(i32::MAX))
        .bind(i32::try_from(pos.full_move_number).unwrap_or(i32::MAX))
        .bind(&pos.fen)
        .execute(&mut *tx)
        .await
        .map_err(AppError::Sqlx)?;
    }

    tx.commit().await.map_err(AppError::Sqlx)?;
    Ok(positions.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chess_core::ChannelSelection;

    const START_FEN: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

    fn row() -> PositionRow {
        PositionRow {
            id: 7,
            game_id: "g1".into(),
            move_number: 0,
            white_king: Some(4),
            black_king: Some(60),
            white_queens: Some("3".into()),
            white_rooks: Some("0,7".into()),
            white_bishops: Some("2,5".into()),
            white_knights: Some("1,6".into()),
            black_queens: Some("59".into()),
            black_rooks: Some("56,63".into()),
            black_bishops: Some("58,61".into()),
            black_knights: Some("57,62".into()),
            white_pawns: 0xFF00,
            black_pawns: 0x00FF_0000_0000_0000,
            side_to_move: "w".into(),
            castling_rights: 15,
            en_passant_square: None,
            half_move_clock: 0,
            full_move_number: 1,
            fen: START_FEN.into(),
        }
    }

    #[test]
    fn test_row_decodes_to_position() {
        let pos = Position::try_from(row()).unwrap();
        let expected = Position::from_fen(START_FEN).unwrap().in_game("g1", 0);
        assert_eq!(pos, Position { id: 7, ..expected });
    }

    #[test]
    fn test_corrupt_row_is_consistency_error() {
        let corrupt = [
            PositionRow { castling_rights: 16, ..row() },
            PositionRow { castling_rights: -1, ..row() },
            PositionRow { half_move_clock: -3, ..row() },
            PositionRow { full_move_number: 0, ..row() },
            PositionRow { full_move_number: -1, ..row() },
            PositionRow { white_king: Some(64), ..row() },
            PositionRow { white_rooks: Some("0,x".into()), ..row() },
            PositionRow { side_to_move: "green".into(), ..row() },
        ];
        for r in corrupt {
            assert!(matches!(Position::try_from(r), Err(AppError::Consistency(_))));
        }
    }

    #[test]
    fn test_null_square_lists_are_empty() {
        let pos = Position::try_from(PositionRow { white_queens: None, ..row() }).unwrap();
        assert!(pos.white_queens.is_empty());
    }

    fn scan_sql(names: &[&str], limit: i64) -> String {
        let query_pos = Position::from_fen(START_FEN).unwrap();
        let selection = ChannelSelection::parse(names).unwrap();
        let query = SimilarityQuery::build(&query_pos, &selection);
        similarity_scan(&query, Limit::new(limit).unwrap()).sql().to_string()
    }

    #[test]
    fn test_scan_sql_scores_each_channel() {
        let sql = scan_sql(&["whitePawn", "whiteRook", "blackKing"], 10);

        assert!(sql.contains(
            "CASE WHEN popcount64(p.white_pawns | $1) = 0 THEN 0.0 \
             ELSE popcount64(p.white_pawns & $2)::float8 / popcount64(p.white_pawns | $3) END"
        ));
        assert!(sql.contains(
            "(SELECT COUNT(*) FROM unnest($4::int4[]) AS q(sq) \
             WHERE q.sq = ANY(string_to_array(p.white_rooks, ',')::int4[]))::float8 / 2"
        ));
        assert!(sql.contains("CASE WHEN p.black_king = $5 THEN 1.0 ELSE 0.0 END"));
        assert!(sql.contains(")::float8 / 3) AS similarity_score"));
    }

    #[test]
    fn test_scan_sql_filters_and_orders() {
        let sql = scan_sql(&["whitePawn", "whiteRook", "blackKing"], 10);

        assert!(sql.contains(" AND (p.white_pawns = 0 OR (p.white_pawns & $6) <> 0)"));
        assert!(sql.contains(" AND p.white_rooks IS NOT NULL"));
        assert!(sql.contains(" AND p.black_king IS NOT NULL"));
        assert!(sql.ends_with(" ORDER BY similarity_score DESC, p.id ASC LIMIT $7"));
    }

    #[test]
    fn test_scan_sql_empty_selection() {
        let sql = scan_sql(&[], 5);
        assert!(sql.contains("0.0::float8 AS similarity_score FROM positions p WHERE TRUE ORDER BY"));
        assert!(sql.ends_with("LIMIT $1"));
    }

    #[test]
    fn test_scan_sql_absent_pieces_score_zero_without_filter() {
        let query_pos = Position::from_fen("4k3/8/8/8/8/8/8/4K3 w - - 0 1").unwrap();
        let selection = ChannelSelection::parse(&["whitePawn", "whiteQueen"]).unwrap();
        let query = SimilarityQuery::build(&query_pos, &selection);
        let sql = similarity_scan(&query, Limit::new(3).unwrap()).sql().to_string();

        assert!(!sql.contains("IS NOT NULL"));
        assert!(!sql.contains("<> 0"));
        assert!(sql.contains(" + 0.0)::float8 / 2)"));
    }
}
