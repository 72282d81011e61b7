//! Stored board state and its FEN conversion.
//!
//! Squares are indexed a1 = 0 through h8 = 63. Pawns are kept as bitboards,
//! kings as a single optional square and every other piece type as an ordered
//! list of squares.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use shakmaty::fen::{Fen, LossyFenError};
use shakmaty::{Bitboard, Piece, Role, Setup, Square};

use crate::error::CoreError;

/// Castling bitmask flags.
pub const WHITE_KINGSIDE: u8 = 1;
pub const WHITE_QUEENSIDE: u8 = 2;
pub const BLACK_KINGSIDE: u8 = 4;
pub const BLACK_QUEENSIDE: u8 = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Color {
    White,
    Black,
}

impl Color {
    /// FEN side-to-move letter.
    pub fn fen_char(self) -> char {
        match self {
            Color::White => 'w',
            Color::Black => 'b',
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Color::White => "white",
            Color::Black => "black",
        }
    }

    /// Parse either the FEN letter or the full name.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "w" | "white" => Some(Color::White),
            "b" | "black" => Some(Color::Black),
            _ => None,
        }
    }
}

impl From<shakmaty::Color> for Color {
    fn from(color: shakmaty::Color) -> Self {
        match color {
            shakmaty::Color::White => Color::White,
            shakmaty::Color::Black => Color::Black,
        }
    }
}

impl From<Color> for shakmaty::Color {
    fn from(color: Color) -> Self {
        match color {
            Color::White => shakmaty::Color::White,
            Color::Black => shakmaty::Color::Black,
        }
    }
}

/// Ordered squares occupied by one piece type, stored as `"3,12,40"`.
/// An empty list means the piece type is absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct SquareList(Vec<u8>);

impl SquareList {
    pub fn new(squares: Vec<u8>) -> Result<Self, CoreError> {
        if let Some(bad) = squares.iter().find(|sq| **sq > 63) {
            return Err(CoreError::InvalidSquareList(bad.to_string()));
        }
        Ok(Self(squares))
    }

    pub fn from_bitboard(bitboard: Bitboard) -> Self {
        Self(bitboard.into_iter().map(|sq| sq as u8).collect())
    }

    pub fn squares(&self) -> &[u8] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Storage form: `None` when empty.
    pub fn to_column(&self) -> Option<String> {
        if self.is_empty() {
            None
        } else {
            Some(self.to_string())
        }
    }

    pub fn from_column(value: Option<&str>) -> Result<Self, CoreError> {
        value.map_or(Ok(Self::default()), str::parse)
    }
}

impl fmt::Display for SquareList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.0.iter().map(|sq| sq.to_string()).collect();
        f.write_str(&parts.join(","))
    }
}

impl FromStr for SquareList {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Ok(Self::default());
        }

        let squares = s
            .split(',')
            .map(|part| {
                part.trim()
                    .parse::<u8>()
                    .ok()
                    .filter(|sq| *sq <= 63)
                    .ok_or_else(|| CoreError::InvalidSquareList(s.to_string()))
            })
            .collect::<Result<Vec<u8>, CoreError>>()?;

        Ok(Self(squares))
    }
}

impl From<SquareList> for String {
    fn from(list: SquareList) -> Self {
        list.to_string()
    }
}

impl TryFrom<String> for SquareList {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// One board state at a given ply of a stored game.
///
/// A position built from a bare FEN has `id == 0` and an empty `game_id` until
/// storage assigns them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Position {
    pub id: i64,
    pub game_id: String,
    /// Ply count from the start of the game.
    pub move_number: i32,

    pub white_king: Option<u8>,
    pub black_king: Option<u8>,

    pub white_queens: SquareList,
    pub white_rooks: SquareList,
    pub white_bishops: SquareList,
    pub white_knights: SquareList,

    pub black_queens: SquareList,
    pub black_rooks: SquareList,
    pub black_bishops: SquareList,
    pub black_knights: SquareList,

    pub white_pawns: u64,
    pub black_pawns: u64,

    pub side_to_move: Color,
    pub castling_rights: u8,
    pub en_passant_square: Option<u8>,
    pub half_move_clock: u32,
    pub full_move_number: u32,
    pub fen: String,
}

impl Position {
    /// Convert a FEN string into a position. Only the notation is validated,
    /// not the legality of the position.
    pub fn from_fen(fen: &str) -> Result<Self, CoreError> {
        let parsed: Fen = fen
            .trim()
            .parse()
            .map_err(|e| CoreError::InvalidFen(format!("{fen:?}: {e}")))?;
        Ok(Self::from_setup(parsed.as_setup()))
    }

    pub fn from_setup(setup: &Setup) -> Self {
        use shakmaty::Color::{Black, White};

        let board = &setup.board;

        let pieces = |color: shakmaty::Color, role: Role| board.by_piece(Piece { color, role });
        let squares = |color, role| SquareList::from_bitboard(pieces(color, role));
        let king = |color| pieces(color, Role::King).first().map(|sq| sq as u8);

        let rights = setup.castling_rights;
        let mut castling_rights = 0;
        for (square, flag) in [
            (Square::H1, WHITE_KINGSIDE),
            (Square::A1, WHITE_QUEENSIDE),
            (Square::H8, BLACK_KINGSIDE),
            (Square::A8, BLACK_QUEENSIDE),
        ] {
            if rights.contains(square) {
                castling_rights |= flag;
            }
        }

        let side_to_move = Color::from(setup.turn);
        let full_move_number = setup.fullmoves.get();
        let ply = full_move_number
            .saturating_sub(1)
            .saturating_mul(2)
            .saturating_add(u32::from(side_to_move == Color::Black));

        Self {
            id: 0,
            game_id: String::new(),
            move_number: i32::try_from(ply).unwrap_or(i32::MAX),
            white_king: king(White),
            black_king: king(Black),
            white_queens: squares(White, Role::Queen),
            white_rooks: squares(White, Role::Rook),
            white_bishops: squares(White, Role::Bishop),
            white_knights: squares(White, Role::Knight),
            black_queens: squares(Black, Role::Queen),
            black_rooks: squares(Black, Role::Rook),
            black_bishops: squares(Black, Role::Bishop),
            black_knights: squares(Black, Role::Knight),
            white_pawns: u64::from(pieces(White, Role::Pawn)),
            black_pawns: u64::from(pieces(Black, Role::Pawn)),
            side_to_move,
            castling_rights,
            en_passant_square: setup.ep_square.map(|sq| sq as u8),
            half_move_clock: setup.halfmoves,
            full_move_number,
            fen: Fen::try_from_setup(setup.clone())
                .unwrap_or_else(LossyFenError::ignore)
                .to_string(),
        }
    }

    /// Attach storage identity to a position built from a FEN.
    pub fn in_game(mut self, game_id: impl Into<String>, move_number: i32) -> Self {
        self.game_id = game_id.into();
        self.move_number = move_number;
        self
    }
}
