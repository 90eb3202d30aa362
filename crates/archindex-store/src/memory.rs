//! In-process vector client.
//!
//! Brute-force cosine search over points kept in ordered maps. Good for
//! embedded use on small projects and for tests; nothing is persisted.

use archindex_core::{
    CollectionSpec, Distance, IndexerError, Point, PointFilter, ScoredPoint, ScrollPage,
    VectorClient,
};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, RwLock, RwLockReadGuard, RwLockWriteGuard};

struct Collection {
    spec: CollectionSpec,
    points: BTreeMap<String, Point>,
    indexes: BTreeSet<String>,
}

#[derive(Default)]
pub struct InMemoryVectorClient {
    collections: RwLock<HashMap<String, Collection>>,
    /// Remaining calls that fail with a transient error.
    failures: AtomicUsize,
    /// Per-operation failure budgets, keyed by operation name.
    targeted: Mutex<HashMap<String, usize>>,
}

impl InMemoryVectorClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `n` calls fail with [`IndexerError::Transient`].
    pub fn fail_next(&self, n: usize) {
        self.failures.store(n, Ordering::SeqCst);
    }

    /// Make the next `n` calls of one operation (`"scroll"`,
    /// `"create payload index"`, ...) fail; other operations are unaffected.
    pub fn fail_next_on(&self, operation: &str, n: usize) {
        self.targeted
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(operation.to_string(), n);
    }

    /// Number of points in a collection (0 if absent).
    pub fn len(&self, collection: &str) -> usize {
        self.read()
            .get(collection)
            .map(|c| c.points.len())
            .unwrap_or(0)
    }

    pub fn is_empty(&self, collection: &str) -> bool {
        self.len(collection) == 0
    }

    /// Payload fields with a declared index.
    pub fn payload_indexes(&self, collection: &str) -> Vec<String> {
        self.read()
            .get(collection)
            .map(|c| c.indexes.iter().cloned().collect())
            .unwrap_or_default()
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, Collection>> {
        self.collections.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, Collection>> {
        self.collections.write().unwrap_or_else(|e| e.into_inner())
    }

    fn check_failure(&self, op: &str) -> Result<(), IndexerError> {
        let targeted = {
            let mut budgets = self.targeted.lock().unwrap_or_else(|e| e.into_inner());
            match budgets.get_mut(op) {
                Some(n) if *n > 0 => {
                    *n -= 1;
                    true
                }
                _ => false,
            }
        };
        if targeted || take_one(&self.failures) {
            return Err(IndexerError::Transient(format!("{op}: injected failure")));
        }
        Ok(())
    }
}

/// Decrement a failure budget, returning whether a failure was consumed.
fn take_one(budget: &AtomicUsize) -> bool {
    budget
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
        .is_ok()
}

fn missing(collection: &str) -> IndexerError {
    IndexerError::NotFound(format!("Collection `{collection}` doesn't exist"))
}

fn score(distance: Distance, a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    match distance {
        Distance::Dot => dot,
        Distance::Cosine => {
            let na: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
            let nb: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
            if na == 0.0 || nb == 0.0 {
                0.0
            } else {
                dot / (na * nb)
            }
        }
        // Higher is better everywhere, so negate the distance.
        Distance::Euclid => -a
            .iter()
            .zip(b)
            .map(|(x, y)| (x - y) * (x - y))
            .sum::<f32>()
            .sqrt(),
    }
}

impl VectorClient for InMemoryVectorClient {
    fn collection_exists(&self, collection: &str) -> Result<bool, IndexerError> {
        self.check_failure("collection exists")?;
        Ok(self.read().contains_key(collection))
    }

    fn create_collection(&self, spec: &CollectionSpec) -> Result<(), IndexerError> {
        self.check_failure("create collection")?;
        let mut collections = self.write();
        if collections.contains_key(&spec.name) {
            return Err(IndexerError::Storage(format!(
                "Collection `{}` already exists",
                spec.name
            )));
        }
        collections.insert(
            spec.name.clone(),
            Collection {
                spec: spec.clone(),
                points: BTreeMap::new(),
                indexes: BTreeSet::new(),
            },
        );
        Ok(())
    }

    fn create_payload_index(&self, collection: &str, field: &str) -> Result<(), IndexerError> {
        self.check_failure("create payload index")?;
        let mut collections = self.write();
        let coll = collections
            .get_mut(collection)
            .ok_or_else(|| missing(collection))?;
        coll.indexes.insert(field.to_string());
        Ok(())
    }

    fn upsert(&self, collection: &str, points: Vec<Point>) -> Result<(), IndexerError> {
        self.check_failure("upsert")?;
        let mut collections = self.write();
        let coll = collections
            .get_mut(collection)
            .ok_or_else(|| missing(collection))?;
        for point in &points {
            if point.vector.len() != coll.spec.vector_size {
                return Err(IndexerError::Storage(format!(
                    "Wrong vector dimension: expected {}, got {}",
                    coll.spec.vector_size,
                    point.vector.len()
                )));
            }
        }
        for point in points {
            coll.points.insert(point.id.clone(), point);
        }
        Ok(())
    }

    fn retrieve(&self, collection: &str, ids: &[String]) -> Result<Vec<Point>, IndexerError> {
        self.check_failure("retrieve")?;
        let collections = self.read();
        let coll = collections.get(collection).ok_or_else(|| missing(collection))?;
        Ok(ids
            .iter()
            .filter_map(|id| coll.points.get(id).cloned())
            .collect())
    }

    fn scroll(
        &self,
        collection: &str,
        filter: &PointFilter,
        limit: usize,
        offset: Option<Value>,
    ) -> Result<ScrollPage, IndexerError> {
        self.check_failure("scroll")?;
        let collections = self.read();
        let coll = collections.get(collection).ok_or_else(|| missing(collection))?;

        let start = offset
            .as_ref()
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_default();
        let mut matching = coll
            .points
            .range(start..)
            .map(|(_, p)| p)
            .filter(|p| filter.matches(&p.payload));

        let points: Vec<Point> = matching.by_ref().take(limit.max(1)).cloned().collect();
        let next_offset = matching.next().map(|p| Value::String(p.id.clone()));
        Ok(ScrollPage {
            points,
            next_offset,
        })
    }

    fn delete(&self, collection: &str, filter: &PointFilter) -> Result<(), IndexerError> {
        self.check_failure("delete")?;
        if filter.is_empty() {
            return Err(IndexerError::Validation(
                "Refusing to delete with an empty filter".into(),
            ));
        }
        let mut collections = self.write();
        let coll = collections
            .get_mut(collection)
            .ok_or_else(|| missing(collection))?;
        coll.points.retain(|_, p| !filter.matches(&p.payload));
        Ok(())
    }

    fn search(
        &self,
        collection: &str,
        vector: &[f32],
        filter: &PointFilter,
        limit: usize,
    ) -> Result<Vec<ScoredPoint>, IndexerError> {
        self.check_failure("search")?;
        let collections = self.read();
        let coll = collections.get(collection).ok_or_else(|| missing(collection))?;

        let mut hits: Vec<ScoredPoint> = coll
            .points
            .values()
            .filter(|p| filter.matches(&p.payload))
            .map(|p| ScoredPoint {
                id: p.id.clone(),
                score: score(coll.spec.distance, vector, &p.vector),
                payload: p.payload.clone(),
            })
            .collect();
        hits.sort_by(|a, b| b.score.total_cmp(&a.score).then_with(|| a.id.cmp(&b.id)));
        hits.truncate(limit);
        Ok(hits)
    }
}
