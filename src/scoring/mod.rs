//! Heuristic scorers and the ranking combiner.

pub mod condition;
pub mod entry;
pub mod ranking;

pub use condition::condition_score;
pub use entry::entry_score;
pub use ranking::{rank, Ranked};

/// Round to 2 decimal places
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Clamp to [0, 100] and round; non-finite input scores 0
pub fn bounded(value: f64) -> f64 {
    if !value.is_finite() {
        return 0.0;
    }
    round2(value.clamp(0.0, 100.0))
}
