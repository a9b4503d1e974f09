//! Transition history tracking.
//!
//! Provides immutable tracking of settled transitions over time,
//! following functional programming principles.

use super::params::RawParams;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// How a recorded transition settled.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", content = "detail", rename_all = "snake_case")]
pub enum RecordedOutcome {
    Success,
    Ignored,
    Superseded,
    Aborted,
    Rejected(String),
    Redirected(String),
    Error(String),
}

/// Record of a single settled transition.
///
/// # Example
///
/// ```rust
/// use waypoint::core::{RawParams, RecordedOutcome, TransitionRecord};
/// use chrono::Utc;
///
/// let record = TransitionRecord {
///     id: 1,
///     from: None,
///     to: "home".to_string(),
///     params: RawParams::new(),
///     outcome: RecordedOutcome::Success,
///     timestamp: Utc::now(),
/// };
/// assert!(record.succeeded());
/// ```
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TransitionRecord {
    /// Transition id
    pub id: u64,
    /// Leaf state of the `from` path (`None` for the first navigation)
    pub from: Option<String>,
    /// Leaf state of the `to` path
    pub to: String,
    /// Merged target param values
    pub params: RawParams,
    pub outcome: RecordedOutcome,
    /// When the transition settled
    pub timestamp: DateTime<Utc>,
}

impl TransitionRecord {
    pub fn succeeded(&self) -> bool {
        self.outcome == RecordedOutcome::Success
    }
}

/// Ordered history of settled transitions.
///
/// History is immutable - `record` returns a new history with the entry
/// added.
///
/// # Example
///
/// ```rust
/// use waypoint::core::{RawParams, RecordedOutcome, TransitionHistory, TransitionRecord};
/// use chrono::Utc;
///
/// let record = |id, from: Option<&str>, to: &str| TransitionRecord {
///     id,
///     from: from.map(str::to_string),
///     to: to.to_string(),
///     params: RawParams::new(),
///     outcome: RecordedOutcome::Success,
///     timestamp: Utc::now(),
/// };
///
/// let history = TransitionHistory::new()
///     .record(record(1, None, "home"))
///     .record(record(2, Some("home"), "about"));
///
/// assert_eq!(history.visited(), vec!["home", "about"]);
/// ```
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct TransitionHistory {
    records: Vec<TransitionRecord>,
}

impl TransitionHistory {
    pub fn new() -> Self {
        Self {
            records: Vec::new(),
        }
    }

    /// Record a transition, returning a new history.
    pub fn record(&self, record: TransitionRecord) -> Self {
        let mut records = self.records.clone();
        records.push(record);
        Self { records }
    }

    /// Record a transition keeping at most `max` records, oldest dropped
    /// first. Consumes the history instead of copying it.
    pub fn record_bounded(mut self, record: TransitionRecord, max: usize) -> Self {
        self.records.push(record);
        if self.records.len() > max {
            let excess = self.records.len() - max;
            self.records.drain(..excess);
        }
        self
    }

    /// States that were actually committed, in order.
    ///
    /// The starting state of the first successful transition is included
    /// when it had one.
    pub fn visited(&self) -> Vec<&str> {
        let successes: Vec<&TransitionRecord> =
            self.records.iter().filter(|r| r.succeeded()).collect();
        let mut path = Vec::new();
        if let Some(from) = successes.first().and_then(|r| r.from.as_deref()) {
            path.push(from);
        }
        path.extend(successes.iter().map(|r| r.to.as_str()));
        path
    }

    /// Time between the first and last recorded settlement.
    pub fn duration(&self) -> Option<Duration> {
        match (self.records.first(), self.records.last()) {
            (Some(first), Some(last)) => last
                .timestamp
                .signed_duration_since(first.timestamp)
                .to_std()
                .ok(),
            _ => None,
        }
    }

    pub fn records(&self) -> &[TransitionRecord] {
        &self.records
    }

    pub fn last(&self) -> Option<&TransitionRecord> {
        self.records.last()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
