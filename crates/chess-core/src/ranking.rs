//! In-memory similarity ranking.
//!
//! Candidates are filtered and scored one at a time while a bounded heap keeps
//! only the best `limit` of them, so a scan never holds more than `limit`
//! results regardless of corpus size.

use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;

use serde::Serialize;

use crate::channel::ChannelSelection;
use crate::error::CoreError;
use crate::position::Position;
use crate::similarity::SimilarityQuery;

/// Maximum number of results, always at least 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limit(usize);

impl Limit {
    pub fn new(limit: i64) -> Result<Self, CoreError> {
        if limit <= 0 {
            return Err(CoreError::InvalidLimit(limit));
        }
        usize::try_from(limit)
            .map(Self)
            .map_err(|_| CoreError::InvalidLimit(limit))
    }

    pub fn get(self) -> usize {
        self.0
    }
}

/// One ranked candidate before enrichment.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoredPosition {
    pub position_id: i64,
    pub game_id: String,
    pub move_number: i32,
    pub score: f64,
}

impl ScoredPosition {
    /// Rank order: higher score first, then lower position id.
    pub fn rank_cmp(&self, other: &Self) -> Ordering {
        other
            .score
            .total_cmp(&self.score)
            .then_with(|| self.position_id.cmp(&other.position_id))
    }
}

/// Heap entry ordered so that the greatest entry is the best-ranked one.
struct Ranked(ScoredPosition);

impl PartialEq for Ranked {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Ranked {}

impl PartialOrd for Ranked {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Ranked {
    fn cmp(&self, other: &Self) -> Ordering {
        other.0.rank_cmp(&self.0)
    }
}

/// Filter, score and keep the top `limit` candidates, best first.
pub fn rank_query<'a, I>(corpus: I, query: &SimilarityQuery, limit: Limit) -> Vec<ScoredPosition>
where
    I: IntoIterator<Item = &'a Position>,
{
    let mut heap: BinaryHeap<Reverse<Ranked>> = BinaryHeap::with_capacity(limit.get() + 1);

    for candidate in corpus {
        if !query.matches(candidate) {
            continue;
        }

        heap.push(Reverse(Ranked(ScoredPosition {
            position_id: candidate.id,
            game_id: candidate.game_id.clone(),
            move_number: candidate.move_number,
            score: query.score(candidate),
        })));

        if heap.len() > limit.get() {
            heap.pop();
        }
    }

    heap.into_sorted_vec()
        .into_iter()
        .map(|Reverse(Ranked(scored))| scored)
        .collect()
}

pub fn rank<'a, I>(
    corpus: I,
    query: &Position,
    selection: &ChannelSelection,
    limit: Limit,
) -> Vec<ScoredPosition>
where
    I: IntoIterator<Item = &'a Position>,
{
    rank_query(corpus, &SimilarityQuery::build(query, selection), limit)
}

/// Validate raw caller input, then rank. Nothing is read from the corpus
/// unless the channel names and the limit are valid.
pub fn search<'a, I, S>(
    corpus: I,
    query: &Position,
    channels: &[S],
    limit: i64,
) -> Result<Vec<ScoredPosition>, CoreError>
where
    I: IntoIterator<Item = &'a Position>,
    S: AsRef<str>,
{
    let selection = ChannelSelection::parse(channels)?;
    let limit = Limit::new(limit)?;
    Ok(rank(corpus, query, &selection, limit))
}
