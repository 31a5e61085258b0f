//! Execution traces produced by autonomous agents.
//!
//! A trace is a finite, ordered sequence of events. Each event carries the set
//! of predicate labels that held at that point of the execution.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ValidationError;

/// One observed step of an execution.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Event {
    /// Ordinal position in the originating execution
    pub index: usize,

    /// Predicates true at this position
    #[serde(default)]
    pub labels: BTreeSet<String>,

    /// When the step was observed, if known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
}

impl Event {
    pub fn new<I, S>(index: usize, labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            index,
            labels: labels.into_iter().map(Into::into).collect(),
            timestamp: None,
        }
    }

    /// Attach an observation time.
    pub fn at(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    /// Whether `predicate` holds at this event.
    pub fn holds(&self, predicate: &str) -> bool {
        self.labels.contains(predicate)
    }
}

/// Wire shape accepted for traces: `{"events": [...]}` or a bare array.
#[derive(Deserialize)]
#[serde(untagged)]
enum TraceDocument {
    Wrapped { events: Vec<Event> },
    Bare(Vec<Event>),
}

/// A finite, well-ordered sequence of events.
///
/// Construction validates ordering: event indices must be strictly
/// increasing, and timestamps (where present) must never go backwards.
#[derive(Debug, Clone, Serialize, PartialEq, Eq, Default)]
pub struct ExecutionTrace {
    events: Vec<Event>,
}

impl ExecutionTrace {
    /// Build a trace, rejecting ill-ordered events.
    pub fn new(events: Vec<Event>) -> Result<Self, ValidationError> {
        let mut last_timestamp: Option<(usize, DateTime<Utc>)> = None;

        for pair in events.windows(2) {
            if pair[1].index <= pair[0].index {
                return Err(ValidationError::MalformedTrace(format!(
                    "event index {} follows index {}; indices must be strictly increasing",
                    pair[1].index, pair[0].index
                )));
            }
        }

        for event in &events {
            if let Some(ts) = event.timestamp {
                if let Some((prev_index, prev_ts)) = last_timestamp {
                    if ts < prev_ts {
                        return Err(ValidationError::MalformedTrace(format!(
                            "event {} is timestamped {} before event {} at {}",
                            event.index,
                            ts.to_rfc3339(),
                            prev_index,
                            prev_ts.to_rfc3339()
                        )));
                    }
                }
                last_timestamp = Some((event.index, ts));
            }
        }

        Ok(Self { events })
    }

    /// Build a trace from per-step label sets, numbering events from zero.
    pub fn from_labels<I, L, S>(steps: I) -> Self
    where
        I: IntoIterator<Item = L>,
        L: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let events = steps
            .into_iter()
            .enumerate()
            .map(|(index, labels)| Event::new(index, labels))
            .collect();
        Self { events }
    }

    /// Decode a trace from a JSON value.
    pub fn from_value(value: &serde_json::Value) -> Result<Self, ValidationError> {
        let document = TraceDocument::deserialize(value)
            .map_err(|e| ValidationError::MalformedTrace(e.to_string()))?;
        Self::new(document.into_events())
    }

    /// Decode a trace from JSON text.
    pub fn from_json(json: &str) -> Result<Self, ValidationError> {
        let document: TraceDocument = serde_json::from_str(json)
            .map_err(|e| ValidationError::MalformedTrace(e.to_string()))?;
        Self::new(document.into_events())
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// The first `len` events. Prefixes of a well-ordered trace stay ordered.
    pub fn prefix(&self, len: usize) -> ExecutionTrace {
        let end = len.min(self.events.len());
        Self {
            events: self.events[..end].to_vec(),
        }
    }
}

impl TraceDocument {
    fn into_events(self) -> Vec<Event> {
        match self {
            Self::Wrapped { events } | Self::Bare(events) => events,
        }
    }
}

impl<'de> Deserialize<'de> for ExecutionTrace {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let document = TraceDocument::deserialize(deserializer)?;
        Self::new(document.into_events()).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_from_labels_numbers_events() {
        let trace = ExecutionTrace::from_labels(vec![vec!["request"], vec![], vec!["response"]]);
        assert_eq!(trace.len(), 3);
        assert_eq!(trace.events()[2].index, 2);
        assert!(trace.events()[0].holds("request"));
        assert!(!trace.events()[1].holds("request"));
    }

    #[test]
    fn test_rejects_non_increasing_indices() {
        let result = ExecutionTrace::new(vec![Event::new(1, ["a"]), Event::new(1, ["b"])]);
        assert!(matches!(result, Err(ValidationError::MalformedTrace(_))));
    }

    #[test]
    fn test_allows_index_gaps() {
        let trace = ExecutionTrace::new(vec![Event::new(0, ["a"]), Event::new(7, ["b"])]).unwrap();
        assert_eq!(trace.len(), 2);
    }

    #[test]
    fn test_rejects_decreasing_timestamps() {
        let early = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        let late = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 5).unwrap();

        let result = ExecutionTrace::new(vec![
            Event::new(0, ["a"]).at(late),
            Event::new(1, ["b"]),
            Event::new(2, ["c"]).at(early),
        ]);
        assert!(matches!(result, Err(ValidationError::MalformedTrace(_))));
    }

    #[test]
    fn test_decode_wrapped_and_bare() {
        let wrapped = r#"{"events":[{"index":0,"labels":["request"]},{"index":1}]}"#;
        let bare = r#"[{"index":0,"labels":["request"]},{"index":1,"labels":[]}]"#;

        let a = ExecutionTrace::from_json(wrapped).unwrap();
        let b = ExecutionTrace::from_json(bare).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_decode_rejects_disorder() {
        let json = serde_json::json!([{"index": 3}, {"index": 2}]);
        assert!(ExecutionTrace::from_value(&json).is_err());
        assert!(serde_json::from_value::<ExecutionTrace>(json).is_err());
    }

    #[test]
    fn test_prefix_is_clamped() {
        let trace = ExecutionTrace::from_labels(vec![vec!["a"], vec!["b"]]);
        assert_eq!(trace.prefix(1).len(), 1);
        assert_eq!(trace.prefix(10).len(), 2);
        assert!(trace.prefix(0).is_empty());
    }
}
