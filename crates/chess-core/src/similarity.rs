//! Per-channel scorers and the aggregated similarity query.
//!
//! [`SimilarityQuery`] is a structured description of the score and the hard
//! filter: a list of channel terms carrying the query values. It can be
//! evaluated directly against in-memory positions or compiled by a storage
//! adapter into its own predicate language.

use crate::channel::{Channel, ChannelSelection, ChannelValue};
use crate::position::Position;

/// Shared pawns over the union of pawns. Zero when neither side has any.
pub fn bitboard_score(query: u64, candidate: u64) -> f64 {
    let union = (query | candidate).count_ones();
    if union == 0 {
        return 0.0;
    }
    f64::from((query & candidate).count_ones()) / f64::from(union)
}

/// Exact square match.
pub fn square_score(query: Option<u8>, candidate: Option<u8>) -> f64 {
    match query {
        Some(sq) if candidate == Some(sq) => 1.0,
        _ => 0.0,
    }
}

/// Fraction of query squares also occupied in the candidate list.
/// Candidate squares absent from the query are ignored.
pub fn square_list_score(query: &[u8], candidate: &[u8]) -> f64 {
    if query.is_empty() {
        return 0.0;
    }
    let hits = query.iter().filter(|sq| candidate.contains(sq)).count();
    hits as f64 / query.len() as f64
}

pub fn channel_score(query: ChannelValue<'_>, candidate: ChannelValue<'_>) -> f64 {
    match (query, candidate) {
        (ChannelValue::Bitboard(q), ChannelValue::Bitboard(c)) => bitboard_score(q, c),
        (ChannelValue::Square(q), ChannelValue::Square(c)) => square_score(q, c),
        (ChannelValue::Squares(q), ChannelValue::Squares(c)) => square_list_score(q, c),
        _ => 0.0,
    }
}

/// Query-side value of one channel.
#[derive(Debug, Clone, PartialEq)]
pub enum TermValue {
    Bitboard(u64),
    Square(Option<u8>),
    Squares(Vec<u8>),
}

impl TermValue {
    fn as_channel_value(&self) -> ChannelValue<'_> {
        match self {
            TermValue::Bitboard(bits) => ChannelValue::Bitboard(*bits),
            TermValue::Square(sq) => ChannelValue::Square(*sq),
            TermValue::Squares(squares) => ChannelValue::Squares(squares),
        }
    }
}

/// Hard-filter condition a candidate must meet on one channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterTerm {
    /// The candidate bitboard is empty or shares a bit with the mask.
    SharesBits(u64),
    /// The candidate has the piece type at all.
    Present,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChannelTerm {
    pub channel: Channel,
    pub value: TermValue,
    pub filter: Option<FilterTerm>,
}

impl ChannelTerm {
    fn new(channel: Channel, query: &Position) -> Self {
        let value = match channel.value_of(query) {
            ChannelValue::Bitboard(bits) => TermValue::Bitboard(bits),
            ChannelValue::Square(sq) => TermValue::Square(sq),
            ChannelValue::Squares(squares) => TermValue::Squares(squares.to_vec()),
        };

        let filter = match &value {
            TermValue::Bitboard(0) => None,
            TermValue::Bitboard(bits) => Some(FilterTerm::SharesBits(*bits)),
            _ if value.as_channel_value().is_present() => Some(FilterTerm::Present),
            _ => None,
        };

        Self {
            channel,
            value,
            filter,
        }
    }

    pub fn score(&self, candidate: &Position) -> f64 {
        channel_score(self.value.as_channel_value(), self.channel.value_of(candidate))
    }

    pub fn admits(&self, candidate: &Position) -> bool {
        let value = self.channel.value_of(candidate);
        match (self.filter, value) {
            (None, _) => true,
            (Some(FilterTerm::SharesBits(mask)), ChannelValue::Bitboard(bits)) => {
                bits == 0 || bits & mask != 0
            }
            (Some(FilterTerm::SharesBits(_)), _) => false,
            (Some(FilterTerm::Present), value) => value.is_present(),
        }
    }
}

/// Mean of the selected channel scores plus the hard filter guarding it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SimilarityQuery {
    terms: Vec<ChannelTerm>,
}

impl SimilarityQuery {
    pub fn build(query: &Position, selection: &ChannelSelection) -> Self {
        Self {
            terms: selection
                .channels()
                .iter()
                .map(|channel| ChannelTerm::new(*channel, query))
                .collect(),
        }
    }

    pub fn terms(&self) -> &[ChannelTerm] {
        &self.terms
    }

    pub fn matches(&self, candidate: &Position) -> bool {
        self.terms.iter().all(|term| term.admits(candidate))
    }

    /// Arithmetic mean of the term scores; 0.0 for an empty selection.
    pub fn score(&self, candidate: &Position) -> f64 {
        if self.terms.is_empty() {
            return 0.0;
        }
        let total: f64 = self.terms.iter().map(|term| term.score(candidate)).sum();
        total / self.terms.len() as f64
    }
}
