//! Piece-type channels a similarity search can be restricted to.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::position::Position;

/// How a channel is stored and therefore how it is scored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelKind {
    Bitboard,
    Square,
    SquareList,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Channel {
    WhitePawn,
    BlackPawn,
    WhiteKing,
    BlackKing,
    WhiteQueen,
    WhiteRook,
    WhiteBishop,
    WhiteKnight,
    BlackQueen,
    BlackRook,
    BlackBishop,
    BlackKnight,
}

/// A channel's value in one position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ChannelValue<'a> {
    Bitboard(u64),
    Square(Option<u8>),
    Squares(&'a [u8]),
}

impl ChannelValue<'_> {
    /// Whether the piece type occurs at all.
    pub fn is_present(&self) -> bool {
        match self {
            ChannelValue::Bitboard(bits) => *bits != 0,
            ChannelValue::Square(sq) => sq.is_some(),
            ChannelValue::Squares(squares) => !squares.is_empty(),
        }
    }
}

impl Channel {
    pub const ALL: [Channel; 12] = [
        Channel::WhitePawn,
        Channel::BlackPawn,
        Channel::WhiteKing,
        Channel::BlackKing,
        Channel::WhiteQueen,
        Channel::WhiteRook,
        Channel::WhiteBishop,
        Channel::WhiteKnight,
        Channel::BlackQueen,
        Channel::BlackRook,
        Channel::BlackBishop,
        Channel::BlackKnight,
    ];

    pub fn kind(self) -> ChannelKind {
        match self {
            Channel::WhitePawn | Channel::BlackPawn => ChannelKind::Bitboard,
            Channel::WhiteKing | Channel::BlackKing => ChannelKind::Square,
            _ => ChannelKind::SquareList,
        }
    }

    /// Wire name, e.g. `whiteBishop`.
    pub fn name(self) -> &'static str {
        match self {
            Channel::WhitePawn => "whitePawn",
            Channel::BlackPawn => "blackPawn",
            Channel::WhiteKing => "whiteKing",
            Channel::BlackKing => "blackKing",
            Channel::WhiteQueen => "whiteQueen",
            Channel::WhiteRook => "whiteRook",
            Channel::WhiteBishop => "whiteBishop",
            Channel::WhiteKnight => "whiteKnight",
            Channel::BlackQueen => "blackQueen",
            Channel::BlackRook => "blackRook",
            Channel::BlackBishop => "blackBishop",
            Channel::BlackKnight => "blackKnight",
        }
    }

    /// Column holding this channel in the `positions` table.
    pub fn column(self) -> &'static str {
        match self {
            Channel::WhitePawn => "white_pawns",
            Channel::BlackPawn => "black_pawns",
            Channel::WhiteKing => "white_king",
            Channel::BlackKing => "black_king",
            Channel::WhiteQueen => "white_queens",
            Channel::WhiteRook => "white_rooks",
            Channel::WhiteBishop => "white_bishops",
            Channel::WhiteKnight => "white_knights",
            Channel::BlackQueen => "black_queens",
            Channel::BlackRook => "black_rooks",
            Channel::BlackBishop => "black_bishops",
            Channel::BlackKnight => "black_knights",
        }
    }

    pub fn value_of(self, position: &Position) -> ChannelValue<'_> {
        match self {
            Channel::WhitePawn => ChannelValue::Bitboard(position.white_pawns),
            Channel::BlackPawn => ChannelValue::Bitboard(position.black_pawns),
            Channel::WhiteKing => ChannelValue::Square(position.white_king),
            Channel::BlackKing => ChannelValue::Square(position.black_king),
            Channel::WhiteQueen => ChannelValue::Squares(position.white_queens.squares()),
            Channel::WhiteRook => ChannelValue::Squares(position.white_rooks.squares()),
            Channel::WhiteBishop => ChannelValue::Squares(position.white_bishops.squares()),
            Channel::WhiteKnight => ChannelValue::Squares(position.white_knights.squares()),
            Channel::BlackQueen => ChannelValue::Squares(position.black_queens.squares()),
            Channel::BlackRook => ChannelValue::Squares(position.black_rooks.squares()),
            Channel::BlackBishop => ChannelValue::Squares(position.black_bishops.squares()),
            Channel::BlackKnight => ChannelValue::Squares(position.black_knights.squares()),
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Channel {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Channel::ALL
            .into_iter()
            .find(|c| c.name() == s.trim())
            .ok_or_else(|| CoreError::UnknownChannel(s.to_string()))
    }
}

/// Caller-chosen channels in first-seen order, without duplicates.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChannelSelection(Vec<Channel>);

impl ChannelSelection {
    pub fn new(channels: impl IntoIterator<Item = Channel>) -> Self {
        let mut selected = Vec::new();
        for channel in channels {
            if !selected.contains(&channel) {
                selected.push(channel);
            }
        }
        Self(selected)
    }

    /// Parse wire names; the first unknown name fails the whole selection.
    pub fn parse<S: AsRef<str>>(names: &[S]) -> Result<Self, CoreError> {
        let channels = names
            .iter()
            .map(|name| name.as_ref().parse())
            .collect::<Result<Vec<Channel>, CoreError>>()?;
        Ok(Self::new(channels))
    }

    pub fn channels(&self) -> &[Channel] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_names() {
        assert_eq!("whitePawn".parse::<Channel>().unwrap(), Channel::WhitePawn);
        assert_eq!("blackKnight".parse::<Channel>().unwrap(), Channel::BlackKnight);
        assert_eq!(
            "whiteUnicorn".parse::<Channel>().unwrap_err(),
            CoreError::UnknownChannel("whiteUnicorn".into())
        );
    }

    #[test]
    fn test_names_round_trip_for_every_channel() {
        for channel in Channel::ALL {
            assert_eq!(channel.name().parse::<Channel>().unwrap(), channel);
        }
    }

    #[test]
    fn test_selection_deduplicates_in_order() {
        let sel = ChannelSelection::parse(&["blackBishop", "whitePawn", "blackBishop"]).unwrap();
        assert_eq!(sel.channels(), &[Channel::BlackBishop, Channel::WhitePawn]);
    }

    #[test]
    fn test_selection_rejects_unknown() {
        let err = ChannelSelection::parse(&["whitePawn", "king"]).unwrap_err();
        assert_eq!(err, CoreError::UnknownChannel("king".into()));
    }

    #[test]
    fn test_kinds() {
        assert_eq!(Channel::BlackPawn.kind(), ChannelKind::Bitboard);
        assert_eq!(Channel::WhiteKing.kind(), ChannelKind::Square);
        assert_eq!(Channel::WhiteRook.kind(), ChannelKind::SquareList);
    }
}
