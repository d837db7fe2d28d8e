use serde::Serialize;
use std::time::Duration;
use thiserror::Error;

/// Match id reserved for "caffeinate until disabled".
///
/// Never collides with a fixed duration id, which is always a positive
/// nanosecond count.
pub const INDEFINITE_ID: &str = "-1";

pub const MATCH_ICON: &str = "accept_time_event";
pub const MATCH_CATEGORY: i32 = 200;
pub const MATCH_RELEVANCE: f64 = 1.0;

/// A match id that is neither the indefinite sentinel nor a positive
/// nanosecond count.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid match id {0:?}")]
pub struct InvalidMatchId(pub String);

/// How long the user asked to stay awake
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DurationIntent {
    Indefinite,
    Fixed(Duration),
}

impl DurationIntent {
    /// Serialize into the id carried from Match to Run.
    pub fn to_match_id(self) -> String {
        match self {
            DurationIntent::Indefinite => INDEFINITE_ID.to_string(),
            DurationIntent::Fixed(duration) => duration.as_nanos().to_string(),
        }
    }

    /// Parse an id previously produced by [`DurationIntent::to_match_id`].
    pub fn from_match_id(id: &str) -> Result<Self, InvalidMatchId> {
        if id == INDEFINITE_ID {
            return Ok(DurationIntent::Indefinite);
        }
        let nanos: i64 = id.parse().map_err(|_| InvalidMatchId(id.to_string()))?;
        if nanos <= 0 {
            return Err(InvalidMatchId(id.to_string()));
        }
        Ok(DurationIntent::Fixed(Duration::from_nanos(nanos.unsigned_abs())))
    }
}

/// A single suggestion handed back to the launcher for one query
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchCandidate {
    pub id: String,
    pub text: String,
    pub icon_name: String,
    pub category: i32,
    pub relevance: f64,
}

impl MatchCandidate {
    fn new(intent: DurationIntent, text: String) -> Self {
        Self {
            id: intent.to_match_id(),
            text,
            icon_name: MATCH_ICON.to_string(),
            category: MATCH_CATEGORY,
            relevance: MATCH_RELEVANCE,
        }
    }

    pub fn indefinite() -> Self {
        Self::new(
            DurationIntent::Indefinite,
            "Caffeinate until disabled".to_string(),
        )
    }

    /// Candidate for a fixed duration, labelled with the literal as typed
    pub fn fixed(duration: Duration, literal: &str) -> Self {
        Self::new(
            DurationIntent::Fixed(duration),
            format!("Caffeinate for {}", literal),
        )
    }
}
