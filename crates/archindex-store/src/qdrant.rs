//! Qdrant REST client.
//!
//! Speaks the HTTP API directly over blocking `reqwest`. Connection failures,
//! timeouts and gateway/availability statuses (429, 502, 503, 504) map to
//! [`IndexerError::Transient`]; every other failure is
//! [`IndexerError::Storage`] (or `NotFound` for 404).

use archindex_core::{
    CollectionSpec, IndexerError, Payload, Point, PointFilter, ScoredPoint, ScrollPage,
    StoreConfig, VectorClient,
};
use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::{Method, StatusCode};
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;

/// Blocking client for one Qdrant instance.
pub struct QdrantClient {
    base_url: String,
    api_key: Option<String>,
    client: Client,
}

impl QdrantClient {
    pub fn new(base_url: &str, api_key: Option<&str>, timeout: Duration) -> Result<Self, IndexerError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| IndexerError::Config(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.map(str::to_string),
            client,
        })
    }

    pub fn from_config(config: &StoreConfig) -> Result<Self, IndexerError> {
        Self::new(
            &config.url,
            config.api_key.as_deref(),
            Duration::from_secs(config.timeout_secs),
        )
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let builder = self
            .client
            .request(method, format!("{}{}", self.base_url, path));
        match &self.api_key {
            Some(key) => builder.header("api-key", key),
            None => builder,
        }
    }

    /// Send, check status, and return the `result` field of the envelope.
    fn call(&self, builder: RequestBuilder, what: &str) -> Result<Value, IndexerError> {
        let response = builder.send().map_err(|e| send_error(what, e))?;
        let response = check_status(what, response)?;
        let body: Value = response
            .json()
            .map_err(|e| IndexerError::Storage(format!("{what}: invalid response body: {e}")))?;
        Ok(body.get("result").cloned().unwrap_or(Value::Null))
    }
}

// ── Error Mapping ─────────────────────────────────────────────────────────

fn send_error(what: &str, e: reqwest::Error) -> IndexerError {
    if e.is_connect() || e.is_timeout() {
        IndexerError::Transient(format!("{what}: {e}"))
    } else {
        IndexerError::Storage(format!("{what}: {e}"))
    }
}

fn check_status(what: &str, response: Response) -> Result<Response, IndexerError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().unwrap_or_default();
    let message = format!("{what}: {status}: {body}");
    Err(match status {
        StatusCode::TOO_MANY_REQUESTS => IndexerError::Transient(message),
        s if s.is_server_error() => IndexerError::Transient(message),
        StatusCode::NOT_FOUND => IndexerError::NotFound(message),
        _ => IndexerError::Storage(message),
    })
}

// ── Wire Types ────────────────────────────────────────────────────────────

#[derive(Deserialize)]
struct RawPoint {
    id: Value,
    #[serde(default)]
    payload: Option<Payload>,
    #[serde(default)]
    vector: Option<Value>,
    #[serde(default)]
    score: Option<f32>,
}

#[derive(Deserialize)]
struct RawScroll {
    #[serde(default)]
    points: Vec<RawPoint>,
    #[serde(default)]
    next_page_offset: Option<Value>,
}

/// Qdrant ids are UUID strings or unsigned integers.
fn id_string(id: &Value) -> String {
    match id {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Point ids go back on the wire as integers when they look like one.
fn id_value(id: &str) -> Value {
    id.parse::<u64>().map(Value::from).unwrap_or_else(|_| Value::from(id))
}

impl RawPoint {
    fn into_point(self) -> Point {
        let vector = match self.vector {
            Some(Value::Array(values)) => values
                .iter()
                .map(|v| v.as_f64().unwrap_or(0.0) as f32)
                .collect(),
            _ => Vec::new(),
        };
        Point {
            id: id_string(&self.id),
            vector,
            payload: self.payload.unwrap_or_default(),
        }
    }

    fn into_scored(self) -> ScoredPoint {
        ScoredPoint {
            id: id_string(&self.id),
            score: self.score.unwrap_or(0.0),
            payload: self.payload.unwrap_or_default(),
        }
    }
}

fn decode<T: for<'de> Deserialize<'de>>(what: &str, value: Value) -> Result<T, IndexerError> {
    serde_json::from_value(value)
        .map_err(|e| IndexerError::Storage(format!("{what}: unexpected result shape: {e}")))
}

fn filter_json(filter: &PointFilter) -> Option<Value> {
    (!filter.is_empty()).then(|| filter.to_json())
}

// ── VectorClient ──────────────────────────────────────────────────────────

impl VectorClient for QdrantClient {
    fn collection_exists(&self, collection: &str) -> Result<bool, IndexerError> {
        let result = self.call(
            self.request(Method::GET, &format!("/collections/{collection}/exists")),
            "collection exists",
        )?;
        Ok(result
            .get("exists")
            .and_then(Value::as_bool)
            .unwrap_or(false))
    }

    fn create_collection(&self, spec: &CollectionSpec) -> Result<(), IndexerError> {
        let body = json!({
            "vectors": {
                "size": spec.vector_size,
                "distance": spec.distance.as_str(),
            }
        });
        self.call(
            self.request(Method::PUT, &format!("/collections/{}", spec.name))
                .json(&body),
            "create collection",
        )?;
        Ok(())
    }

    fn create_payload_index(&self, collection: &str, field: &str) -> Result<(), IndexerError> {
        let body = json!({ "field_name": field, "field_schema": "keyword" });
        self.call(
            self.request(Method::PUT, &format!("/collections/{collection}/index?wait=true"))
                .json(&body),
            "create payload index",
        )?;
        Ok(())
    }

    fn upsert(&self, collection: &str, points: Vec<Point>) -> Result<(), IndexerError> {
        if points.is_empty() {
            return Ok(());
        }
        let points: Vec<Value> = points
            .into_iter()
            .map(|p| json!({ "id": id_value(&p.id), "vector": p.vector, "payload": p.payload }))
            .collect();
        self.call(
            self.request(Method::PUT, &format!("/collections/{collection}/points?wait=true"))
                .json(&json!({ "points": points })),
            "upsert",
        )?;
        Ok(())
    }

    fn retrieve(&self, collection: &str, ids: &[String]) -> Result<Vec<Point>, IndexerError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let ids: Vec<Value> = ids.iter().map(|id| id_value(id)).collect();
        let result = self.call(
            self.request(Method::POST, &format!("/collections/{collection}/points"))
                .json(&json!({ "ids": ids, "with_payload": true, "with_vector": false })),
            "retrieve",
        )?;
        let raw: Vec<RawPoint> = decode("retrieve", result)?;
        Ok(raw.into_iter().map(RawPoint::into_point).collect())
    }

    fn scroll(
        &self,
        collection: &str,
        filter: &PointFilter,
        limit: usize,
        offset: Option<Value>,
    ) -> Result<ScrollPage, IndexerError> {
        let mut body = json!({
            "limit": limit,
            "with_payload": true,
            "with_vector": false,
        });
        if let Some(filter) = filter_json(filter) {
            body["filter"] = filter;
        }
        if let Some(offset) = offset {
            body["offset"] = offset;
        }
        let result = self.call(
            self.request(Method::POST, &format!("/collections/{collection}/points/scroll"))
                .json(&body),
            "scroll",
        )?;
        let raw: RawScroll = decode("scroll", result)?;
        Ok(ScrollPage {
            points: raw.points.into_iter().map(RawPoint::into_point).collect(),
            next_offset: raw.next_page_offset.filter(|v| !v.is_null()),
        })
    }

    fn delete(&self, collection: &str, filter: &PointFilter) -> Result<(), IndexerError> {
        // An empty filter would wipe the collection.
        let Some(filter) = filter_json(filter) else {
            return Err(IndexerError::Validation(
                "Refusing to delete with an empty filter".into(),
            ));
        };
        self.call(
            self.request(
                Method::POST,
                &format!("/collections/{collection}/points/delete?wait=true"),
            )
            .json(&json!({ "filter": filter })),
            "delete",
        )?;
        Ok(())
    }

    fn search(
        &self,
        collection: &str,
        vector: &[f32],
        filter: &PointFilter,
        limit: usize,
    ) -> Result<Vec<ScoredPoint>, IndexerError> {
        let mut body = json!({
            "vector": vector,
            "limit": limit,
            "with_payload": true,
        });
        if let Some(filter) = filter_json(filter) {
            body["filter"] = filter;
        }
        let result = self.call(
            self.request(Method::POST, &format!("/collections/{collection}/points/search"))
                .json(&body),
            "search",
        )?;
        let raw: Vec<RawPoint> = decode("search", result)?;
        Ok(raw.into_iter().map(RawPoint::into_scored).collect())
    }
}
