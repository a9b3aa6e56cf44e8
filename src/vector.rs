//! Vector space: embedding lookups and context-vector projection.
//!
//! Word vectors and entity vectors come from different training runs and
//! live in different spaces; a fixed learned linear projection maps
//! averaged word vectors into the entity space so cosine similarity
//! between a context vector and an entity vector is meaningful.
//!
//! Absence of a vector is never an error; it reads as "no information"
//! and contributes zero signal downstream.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::sync::RwLock;

/// Read-only boundary to an embedding store.
pub trait EmbeddingStore: Send + Sync {
    /// Fixed-length vector for a key, or `None` when the store has none.
    fn vector(&self, key: &str) -> Option<Vec<f32>>;
}

/// In-memory embedding store, JSON-loadable.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MemoryEmbeddings {
    vectors: HashMap<String, Vec<f32>>,
}

impl MemoryEmbeddings {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a vector under a key.
    pub fn insert(&mut self, key: impl Into<String>, vector: Vec<f32>) {
        self.vectors.insert(key.into(), vector);
    }

    /// Dimensionality of the stored vectors, if any are present.
    #[must_use]
    pub fn dimension(&self) -> Option<usize> {
        self.vectors.values().next().map(Vec::len)
    }
}

impl<K: Into<String>> FromIterator<(K, Vec<f32>)> for MemoryEmbeddings {
    fn from_iter<I: IntoIterator<Item = (K, Vec<f32>)>>(entries: I) -> Self {
        Self {
            vectors: entries.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }
}

impl EmbeddingStore for MemoryEmbeddings {
    fn vector(&self, key: &str) -> Option<Vec<f32>> {
        self.vectors.get(key).cloned()
    }
}

/// A learned linear map `y = x·W + b` loaded once at startup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Projection {
    /// Weight matrix, one row per input dimension.
    pub weights: Vec<Vec<f32>>,
    /// Bias vector, one entry per output dimension.
    pub bias: Vec<f32>,
}

impl Projection {
    /// The identity map for `dim`-dimensional vectors.
    #[must_use]
    pub fn identity(dim: usize) -> Self {
        let weights = (0..dim)
            .map(|i| (0..dim).map(|j| if i == j { 1.0 } else { 0.0 }).collect())
            .collect();
        Self {
            weights,
            bias: vec![0.0; dim],
        }
    }

    /// Apply the map to an input vector.
    #[must_use]
    pub fn apply(&self, input: &[f32]) -> Vec<f32> {
        let mut out = self.bias.clone();
        for (x, row) in input.iter().zip(&self.weights) {
            for (o, w) in out.iter_mut().zip(row) {
                *o += x * w;
            }
        }
        out
    }
}

/// Embedding lookups plus the context-vector projection.
///
/// Lookup results are memoized for the duration of one corpus run;
/// call [`VectorSpace::reset`] between independent runs.
pub struct VectorSpace<E: EmbeddingStore> {
    store: E,
    projection: Projection,
    entity_prefix: String,
    words: RwLock<HashMap<String, Option<Vec<f32>>>>,
    entities: RwLock<HashMap<String, Option<Vec<f32>>>>,
}

impl<E: EmbeddingStore> VectorSpace<E> {
    /// Create a vector space over a store and projection.
    #[must_use]
    pub fn new(store: E, projection: Projection) -> Self {
        Self {
            store,
            projection,
            entity_prefix: String::new(),
            words: RwLock::new(HashMap::new()),
            entities: RwLock::new(HashMap::new()),
        }
    }

    /// Prefix prepended to KB ids when looking up entity vectors
    /// (e.g. `"en.wikipedia.org/wiki/"` for a Wikipedia-keyed store).
    #[must_use]
    pub fn with_entity_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.entity_prefix = prefix.into();
        self
    }

    /// Word vector lookup, memoized. Callers pass lowercased words.
    #[must_use]
    pub fn word_vector(&self, word: &str) -> Option<Vec<f32>> {
        if let Some(hit) = self.words.read().expect("word cache poisoned").get(word) {
            return hit.clone();
        }
        let vector = self.store.vector(word);
        self.words
            .write()
            .expect("word cache poisoned")
            .insert(word.to_string(), vector.clone());
        vector
    }

    /// Entity vector lookup, memoized.
    #[must_use]
    pub fn entity_vector(&self, kb_id: &str) -> Option<Vec<f32>> {
        if let Some(hit) = self
            .entities
            .read()
            .expect("entity cache poisoned")
            .get(kb_id)
        {
            return hit.clone();
        }
        let key = format!("{}{}", self.entity_prefix, kb_id);
        let vector = self.store.vector(&key);
        self.entities
            .write()
            .expect("entity cache poisoned")
            .insert(kb_id.to_string(), vector.clone());
        vector
    }

    /// Project a bag of context tokens into the entity space.
    ///
    /// Averages the known word vectors (tokens are lowercased for
    /// lookup), applies the projection, and L2-normalizes. Returns
    /// `None` when the token set is empty, no token has a vector, or
    /// the projected vector has zero norm.
    #[must_use]
    pub fn context_vector(&self, tokens: &BTreeSet<String>) -> Option<Vec<f32>> {
        let known: Vec<Vec<f32>> = tokens
            .iter()
            .filter_map(|t| self.word_vector(&t.to_lowercase()))
            .collect();
        if known.is_empty() {
            return None;
        }

        let dim = known[0].len();
        let mut mean = vec![0.0f32; dim];
        for v in &known {
            for (m, x) in mean.iter_mut().zip(v) {
                *m += x;
            }
        }
        let n = known.len() as f32;
        for m in mean.iter_mut() {
            *m /= n;
        }

        let projected = self.projection.apply(&mean);
        let norm = projected.iter().map(|x| f64::from(*x) * f64::from(*x)).sum::<f64>().sqrt();
        if norm == 0.0 {
            return None;
        }
        Some(projected.iter().map(|x| (f64::from(*x) / norm) as f32).collect())
    }

    /// Drop memoized lookups. Run between independent corpus batches.
    pub fn reset(&self) {
        self.words.write().expect("word cache poisoned").clear();
        self.entities.write().expect("entity cache poisoned").clear();
    }
}

/// Similarity between two vectors: `1 - cosine_distance`, clamped to
/// `>= 0`. Negative similarity is zero evidence, never a penalty term.
/// Mismatched or empty vectors score 0.
#[must_use]
pub fn similarity(a: &[f32], b: &[f32]) -> f64 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let dot: f64 = a
        .iter()
        .zip(b)
        .map(|(x, y)| f64::from(*x) * f64::from(*y))
        .sum();
    let norm_a: f64 = a.iter().map(|x| f64::from(*x) * f64::from(*x)).sum::<f64>().sqrt();
    let norm_b: f64 = b.iter().map(|x| f64::from(*x) * f64::from(*x)).sum::<f64>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    (dot / (norm_a * norm_b)).max(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    fn space_with(entries: Vec<(&str, Vec<f32>)>) -> VectorSpace<MemoryEmbeddings> {
        VectorSpace::new(entries.into_iter().collect(), Projection::identity(2))
    }

    #[test]
    fn test_similarity_identical() {
        let sim = similarity(&[1.0, 0.0], &[1.0, 0.0]);
        assert!((sim - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_similarity_clamped_at_zero() {
        // Opposite vectors: cosine -1, clamped to zero evidence.
        assert_eq!(similarity(&[1.0, 0.0], &[-1.0, 0.0]), 0.0);
    }

    #[test]
    fn test_similarity_mismatched_lengths() {
        assert_eq!(similarity(&[1.0, 0.0], &[1.0]), 0.0);
        assert_eq!(similarity(&[], &[]), 0.0);
    }

    #[test]
    fn test_context_vector_empty_tokens() {
        let space = space_with(vec![("computer", vec![1.0, 0.0])]);
        assert!(space.context_vector(&BTreeSet::new()).is_none());
    }

    #[test]
    fn test_context_vector_no_known_tokens() {
        let space = space_with(vec![("computer", vec![1.0, 0.0])]);
        let tokens: BTreeSet<String> = ["zzz".to_string()].into_iter().collect();
        assert!(space.context_vector(&tokens).is_none());
    }

    #[test]
    fn test_context_vector_averages_and_normalizes() {
        let space = space_with(vec![
            ("computer", vec![1.0, 0.0]),
            ("company", vec![0.0, 1.0]),
        ]);
        let tokens: BTreeSet<String> =
            ["Computer".to_string(), "COMPANY".to_string()].into_iter().collect();
        let v = space.context_vector(&tokens).unwrap();
        // Mean (0.5, 0.5) normalized to unit length.
        let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-6);
        assert!((v[0] - v[1]).abs() < 1e-6);
    }

    #[test]
    fn test_projection_applies_bias() {
        let projection = Projection {
            weights: vec![vec![2.0]],
            bias: vec![1.0],
        };
        assert_eq!(projection.apply(&[3.0]), vec![7.0]);
    }

    #[test]
    fn test_entity_prefix() {
        let space: VectorSpace<MemoryEmbeddings> = VectorSpace::new(
            [("kb/apple_inc", vec![1.0, 0.0])].into_iter().collect(),
            Projection::identity(2),
        )
        .with_entity_prefix("kb/");
        assert!(space.entity_vector("apple_inc").is_some());
        assert!(space.entity_vector("missing").is_none());
    }

    struct CountingStore {
        calls: Mutex<usize>,
    }

    impl EmbeddingStore for CountingStore {
        fn vector(&self, _key: &str) -> Option<Vec<f32>> {
            *self.calls.lock().unwrap() += 1;
            Some(vec![1.0, 0.0])
        }
    }

    #[test]
    fn test_word_lookup_memoized_until_reset() {
        let space = VectorSpace::new(
            CountingStore {
                calls: Mutex::new(0),
            },
            Projection::identity(2),
        );
        space.word_vector("apple");
        space.word_vector("apple");
        assert_eq!(*space.store.calls.lock().unwrap(), 1);

        space.reset();
        space.word_vector("apple");
        assert_eq!(*space.store.calls.lock().unwrap(), 2);
    }
}
