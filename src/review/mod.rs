/// Admin-review sentiment classification
mod classifier;

pub use classifier::ReviewClassifier;

/// Ranking value reserved for the label that never appears in a
/// classification prompt ("Unrated" in the seeded scale).
pub const SENTINEL_RANKING_VALUE: i64 = 999;

/// Outcome of classifying a review. An unmatched completion degrades to
/// value 0 with the raw completion text as label; that is a valid
/// result, not an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub label: String,
    pub value: i64,
}
