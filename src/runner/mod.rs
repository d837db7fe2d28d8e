//! Query side of the plugin: turning launcher text into match candidates.

pub mod duration;
pub mod matcher;
pub mod types;

pub use matcher::match_query;
pub use types::{DurationIntent, InvalidMatchId, MatchCandidate};
