use super::duration::parse_duration;
use super::types::MatchCandidate;
use crate::ui::prelude::*;

/// Words that route a query to this runner, longest first.
pub const TRIGGERS: [&str; 2] = ["caffeinate", "caff"];

/// Match a free-text launcher query.
///
/// Returns at most one candidate. Anything that is not for us, including an
/// unparseable duration, is an empty result rather than an error so the
/// launcher can keep querying as the user types.
pub fn match_query(query: &str) -> Vec<MatchCandidate> {
    let normalized = query.to_lowercase();
    if !TRIGGERS.iter().any(|t| normalized.starts_with(t)) {
        return Vec::new();
    }

    let mut tokens = query.split_whitespace().skip(1);
    let Some(literal) = tokens.next() else {
        return vec![MatchCandidate::indefinite()];
    };

    match parse_duration(&literal.to_lowercase()) {
        Ok(duration) => vec![MatchCandidate::fixed(duration, literal)],
        Err(e) => {
            emit(
                Level::Debug,
                "runner.match.unparsed",
                &format!("Ignoring query {:?}: {}", query, e),
                None,
            );
            Vec::new()
        }
    }
}
