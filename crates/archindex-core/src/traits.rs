use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::IndexerError;

// ── Vector Store Types ──────────────────────────────────────────────────────

/// JSON payload attached to a point.
pub type Payload = Map<String, Value>;

/// Similarity metric for a collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Distance {
    Cosine,
    Dot,
    Euclid,
}

impl Distance {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cosine => "Cosine",
            Self::Dot => "Dot",
            Self::Euclid => "Euclid",
        }
    }
}

/// Shape of a vector collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionSpec {
    pub name: String,
    pub vector_size: usize,
    pub distance: Distance,
}

/// A stored record: id, vector and payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub id: String,
    #[serde(default)]
    pub vector: Vec<f32>,
    #[serde(default)]
    pub payload: Payload,
}

/// A search result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredPoint {
    pub id: String,
    pub score: f32,
    #[serde(default)]
    pub payload: Payload,
}

/// One page of a filtered scroll.
#[derive(Debug, Clone, Default)]
pub struct ScrollPage {
    pub points: Vec<Point>,
    /// Offset to pass to the next call, `None` when exhausted.
    pub next_offset: Option<Value>,
}

/// A single payload condition.
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    /// `payload[key] == value`
    Match { key: String, value: Value },
    /// `payload[key]` is one of `any`
    MatchAny { key: String, any: Vec<Value> },
}

/// Conjunction of payload conditions. An empty filter matches everything.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PointFilter {
    pub must: Vec<Condition>,
}

impl PointFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an exact-match condition.
    pub fn matching(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.must.push(Condition::Match {
            key: key.to_string(),
            value: value.into(),
        });
        self
    }

    /// Add a match-any condition.
    pub fn matching_any<I, V>(mut self, key: &str, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.must.push(Condition::MatchAny {
            key: key.to_string(),
            any: values.into_iter().map(Into::into).collect(),
        });
        self
    }

    pub fn is_empty(&self) -> bool {
        self.must.is_empty()
    }

    /// Evaluate the filter against a payload.
    pub fn matches(&self, payload: &Payload) -> bool {
        self.must.iter().all(|cond| match cond {
            Condition::Match { key, value } => payload.get(key) == Some(value),
            Condition::MatchAny { key, any } => {
                payload.get(key).is_some_and(|v| any.contains(v))
            }
        })
    }

    /// Qdrant filter JSON (`{"must": [...]}`).
    pub fn to_json(&self) -> Value {
        let must: Vec<Value> = self
            .must
            .iter()
            .map(|cond| match cond {
                Condition::Match { key, value } => {
                    serde_json::json!({"key": key, "match": {"value": value}})
                }
                Condition::MatchAny { key, any } => {
                    serde_json::json!({"key": key, "match": {"any": any}})
                }
            })
            .collect();
        serde_json::json!({ "must": must })
    }
}

// ── Traits ──────────────────────────────────────────────────────────────────

/// Client for a vector database holding payload-tagged points.
///
/// Implementations map connectivity/timeout failures to
/// [`IndexerError::Transient`] so callers can decide what to retry.
pub trait VectorClient: Send + Sync {
    fn collection_exists(&self, collection: &str) -> Result<bool, IndexerError>;

    fn create_collection(&self, spec: &CollectionSpec) -> Result<(), IndexerError>;

    /// Create a keyword index on a payload field.
    fn create_payload_index(&self, collection: &str, field: &str) -> Result<(), IndexerError>;

    /// Insert or overwrite points by id.
    fn upsert(&self, collection: &str, points: Vec<Point>) -> Result<(), IndexerError>;

    /// Fetch points by id. Unknown ids are omitted.
    fn retrieve(&self, collection: &str, ids: &[String]) -> Result<Vec<Point>, IndexerError>;

    /// One page of points matching `filter`.
    fn scroll(
        &self,
        collection: &str,
        filter: &PointFilter,
        limit: usize,
        offset: Option<Value>,
    ) -> Result<ScrollPage, IndexerError>;

    /// Delete every point matching `filter`.
    fn delete(&self, collection: &str, filter: &PointFilter) -> Result<(), IndexerError>;

    /// Nearest-neighbor search restricted by `filter`.
    fn search(
        &self,
        collection: &str,
        vector: &[f32],
        filter: &PointFilter,
        limit: usize,
    ) -> Result<Vec<ScoredPoint>, IndexerError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn payload(v: Value) -> Payload {
        v.as_object().cloned().unwrap()
    }

    #[test]
    fn empty_filter_matches_everything() {
        assert!(PointFilter::new().matches(&Payload::new()));
    }

    #[test]
    fn match_and_match_any_are_conjunctive() {
        let filter = PointFilter::new()
            .matching("project_id", "p1")
            .matching_any("file_path", ["a.py", "b.py"]);

        assert!(filter.matches(&payload(json!({"project_id": "p1", "file_path": "b.py"}))));
        assert!(!filter.matches(&payload(json!({"project_id": "p2", "file_path": "b.py"}))));
        assert!(!filter.matches(&payload(json!({"project_id": "p1", "file_path": "c.py"}))));
        assert!(!filter.matches(&payload(json!({"project_id": "p1"}))));
    }

    #[test]
    fn filter_serializes_to_qdrant_shape() {
        let filter = PointFilter::new()
            .matching("type", "file")
            .matching_any("file_path", ["a.py"]);
        assert_eq!(
            filter.to_json(),
            json!({"must": [
                {"key": "type", "match": {"value": "file"}},
                {"key": "file_path", "match": {"any": ["a.py"]}}
            ]})
        );
    }
}
