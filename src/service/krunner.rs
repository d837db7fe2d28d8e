//! The `org.kde.krunner1` object KRunner calls into.

use crate::inhibit::{Caffeinator, RunError, SessionBus};
use crate::runner::{MatchCandidate, match_query};
use crate::ui::prelude::*;
use serde::Serialize;
use std::collections::HashMap;
use zbus::zvariant::{OwnedValue, Type};
use zbus::{fdo, interface};

/// Secondary action offered on a match, `(sss)` on the wire
#[derive(Debug, Clone, Serialize, Type)]
pub struct RemoteAction {
    pub id: String,
    pub text: String,
    pub icon_name: String,
}

/// A match as KRunner expects it, `(sssida{sv})` on the wire
#[derive(Debug, Serialize, Type)]
pub struct RemoteMatch {
    pub id: String,
    pub text: String,
    pub icon_name: String,
    pub category: i32,
    pub relevance: f64,
    pub properties: HashMap<String, OwnedValue>,
}

impl From<MatchCandidate> for RemoteMatch {
    fn from(candidate: MatchCandidate) -> Self {
        Self {
            id: candidate.id,
            text: candidate.text,
            icon_name: candidate.icon_name,
            category: candidate.category,
            relevance: candidate.relevance,
            properties: HashMap::new(),
        }
    }
}

impl From<RunError> for fdo::Error {
    fn from(err: RunError) -> Self {
        match err {
            RunError::InvalidArgument(e) => fdo::Error::InvalidArgs(e.to_string()),
            other => fdo::Error::Failed(other.to_string()),
        }
    }
}

pub struct Runner {
    caffeinator: Caffeinator<SessionBus>,
}

impl Runner {
    pub fn new(caffeinator: Caffeinator<SessionBus>) -> Self {
        Self { caffeinator }
    }
}

#[interface(name = "org.kde.krunner1")]
impl Runner {
    #[zbus(out_args("matches"))]
    async fn actions(&self) -> Vec<RemoteAction> {
        Vec::new()
    }

    #[zbus(name = "Match", out_args("matches"))]
    async fn match_query(&self, query: String) -> Vec<RemoteMatch> {
        match_query(&query).into_iter().map(RemoteMatch::from).collect()
    }

    /// `action_id` is ignored: every match has a single implicit action.
    async fn run(&self, match_id: String, action_id: String) -> fdo::Result<()> {
        emit(
            Level::Debug,
            "runner.run",
            &format!("Run {:?} (action {:?})", match_id, action_id),
            None,
        );
        self.caffeinator.run(&match_id).await?;
        Ok(())
    }
}
