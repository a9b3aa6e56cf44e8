//! Knowledge-base lookup boundary and candidate retrieval.
//!
//! [`KbStore`] is the read-only contract with the external KB service:
//! a lowercased surface form maps to a prior-ranked `(kb_id, score)`
//! list, and a KB id maps to an entity type. [`CandidateStore`] wraps a
//! store with corpus-scoped memoization and assembles [`Candidate`]
//! values, fresh per mention and never shared, with `COMMONNESS` and
//! `ETYPE_COMMONNESS` features attached.

use crate::mention::{Candidate, EntityType, Feature, Mention};
use crate::vector::{EmbeddingStore, VectorSpace};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// Language tag of the KB's native surface forms.
pub const NATIVE_LANG: &str = "eng";

/// Read-only boundary to the knowledge-base lookup service.
pub trait KbStore: Send + Sync {
    /// Prior-ranked `(kb_id, score)` pairs for a lowercased surface
    /// form; `None` when the surface is unknown.
    fn lookup(&self, surface: &str) -> Option<Vec<(String, f64)>>;

    /// Entity type for a KB id, if the KB records one.
    fn lookup_type(&self, kb_id: &str) -> Option<EntityType>;
}

/// In-memory KB store, JSON-loadable.
///
/// Surface keys are expected lowercased; type values are TAC labels
/// (`"PER"`, `"ORG"`, `"GPE"`, …).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MemoryKb {
    #[serde(default)]
    mentions: HashMap<String, Vec<(String, f64)>>,
    #[serde(default)]
    types: HashMap<String, String>,
}

impl MemoryKb {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the prior-ranked entities for a surface form.
    pub fn insert_surface(
        &mut self,
        surface: impl Into<String>,
        entities: Vec<(String, f64)>,
    ) {
        self.mentions.insert(surface.into().to_lowercase(), entities);
    }

    /// Register an entity's type label.
    pub fn insert_type(&mut self, kb_id: impl Into<String>, label: impl Into<String>) {
        self.types.insert(kb_id.into(), label.into());
    }
}

impl KbStore for MemoryKb {
    fn lookup(&self, surface: &str) -> Option<Vec<(String, f64)>> {
        self.mentions.get(surface).cloned()
    }

    fn lookup_type(&self, kb_id: &str) -> Option<EntityType> {
        self.types.get(kb_id).map(|l| EntityType::from_label(l))
    }
}

/// Memoizing candidate retrieval over a [`KbStore`].
///
/// Raw store responses are cached for one corpus run; candidates are
/// rebuilt per call so no two mentions alias the same candidate.
/// Call [`CandidateStore::reset`] between independent runs.
pub struct CandidateStore<K: KbStore, E: EmbeddingStore> {
    kb: K,
    vectors: Arc<VectorSpace<E>>,
    limit: usize,
    lookups: RwLock<HashMap<String, Option<Vec<(String, f64)>>>>,
    types: RwLock<HashMap<String, Option<EntityType>>>,
}

impl<K: KbStore, E: EmbeddingStore> CandidateStore<K, E> {
    /// Create a candidate store with the default retrieval limit of 10.
    #[must_use]
    pub fn new(kb: K, vectors: Arc<VectorSpace<E>>) -> Self {
        Self {
            kb,
            vectors,
            limit: 10,
            lookups: RwLock::new(HashMap::new()),
            types: RwLock::new(HashMap::new()),
        }
    }

    /// Set the per-surface retrieval limit.
    #[must_use]
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    fn cached_lookup(&self, key: &str) -> Option<Vec<(String, f64)>> {
        if let Some(hit) = self.lookups.read().expect("lookup cache poisoned").get(key) {
            return hit.clone();
        }
        let response = self.kb.lookup(key);
        self.lookups
            .write()
            .expect("lookup cache poisoned")
            .insert(key.to_string(), response.clone());
        response
    }

    fn cached_type(&self, kb_id: &str) -> Option<EntityType> {
        if let Some(hit) = self.types.read().expect("type cache poisoned").get(kb_id) {
            return hit.clone();
        }
        let response = self.kb.lookup_type(kb_id);
        self.types
            .write()
            .expect("type cache poisoned")
            .insert(kb_id.to_string(), response.clone());
        response
    }

    fn build_candidate(&self, kb_id: &str, prior: f64) -> Candidate {
        let mut candidate = Candidate::new(kb_id);
        candidate.entity_type = self.cached_type(kb_id);
        candidate.embedding = self.vectors.entity_vector(kb_id);
        candidate.set_feature(Feature::Commonness, prior);
        candidate
    }

    /// Candidates for one surface form, prior-ranked, at most `limit`.
    /// An unknown surface yields an empty list, not an error.
    #[must_use]
    pub fn candidates_for(&self, surface: &str) -> Vec<Candidate> {
        let key = surface.to_lowercase();
        let mut candidates: Vec<Candidate> = self
            .cached_lookup(&key)
            .unwrap_or_default()
            .into_iter()
            .take(self.limit)
            .map(|(kb_id, score)| self.build_candidate(&kb_id, score))
            .collect();
        add_etype_commonness(&mut candidates);
        candidates
    }

    /// Candidates merged across alternate surface forms (e.g. all
    /// translation glosses of a non-native mention).
    ///
    /// `COMMONNESS` is summed across forms for the same KB id, then
    /// renormalized over the merged set so it stays probability-like.
    /// Candidate order is first-seen order across the given forms.
    #[must_use]
    pub fn candidates_for_any(&self, surfaces: &[String]) -> Vec<Candidate> {
        let mut merged: Vec<Candidate> = Vec::new();
        let mut by_id: HashMap<String, usize> = HashMap::new();

        for surface in surfaces {
            let key = surface.to_lowercase();
            for (kb_id, score) in self
                .cached_lookup(&key)
                .unwrap_or_default()
                .into_iter()
                .take(self.limit)
            {
                match by_id.get(&kb_id) {
                    Some(&idx) => {
                        let summed = merged[idx].feature(Feature::Commonness) + score;
                        merged[idx].set_feature(Feature::Commonness, summed);
                    }
                    None => {
                        by_id.insert(kb_id.clone(), merged.len());
                        merged.push(self.build_candidate(&kb_id, score));
                    }
                }
            }
        }

        let total: f64 = merged.iter().map(|c| c.feature(Feature::Commonness)).sum();
        if total > 0.0 {
            for candidate in merged.iter_mut() {
                let normalized = candidate.feature(Feature::Commonness) / total;
                candidate.set_feature(Feature::Commonness, normalized);
            }
        }
        add_etype_commonness(&mut merged);
        merged
    }

    /// Attach candidates to a mention.
    ///
    /// Native-language mentions use a direct surface lookup. Other
    /// languages look up every translation gloss and merge; when no
    /// gloss yields a candidate, fall back to the direct lookup.
    pub fn attach_candidates(&self, mention: &mut Mention, lang: &str) {
        if lang == NATIVE_LANG {
            mention.candidates = self.candidates_for(&mention.text);
            return;
        }
        let merged = self.candidates_for_any(&mention.translations);
        mention.candidates = if merged.is_empty() {
            self.candidates_for(&mention.text)
        } else {
            merged
        };
    }

    /// Drop memoized store responses. Run between independent batches.
    pub fn reset(&self) {
        self.lookups.write().expect("lookup cache poisoned").clear();
        self.types.write().expect("type cache poisoned").clear();
    }
}

/// Compute `ETYPE_COMMONNESS`: each candidate's commonness divided by
/// the summed commonness of same-typed candidates in the list: how
/// dominant the candidate is among its typed competitors, independent
/// of cross-type competition.
fn add_etype_commonness(candidates: &mut [Candidate]) {
    let mut type_mass: HashMap<Option<EntityType>, f64> = HashMap::new();
    for c in candidates.iter() {
        *type_mass.entry(c.entity_type.clone()).or_insert(0.0) +=
            c.feature(Feature::Commonness);
    }
    for c in candidates.iter_mut() {
        let mass = type_mass
            .get(&c.entity_type)
            .copied()
            .unwrap_or(0.0);
        let share = if mass > 0.0 {
            c.feature(Feature::Commonness) / mass
        } else {
            0.0
        };
        c.set_feature(Feature::EtypeCommonness, share);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vector::{MemoryEmbeddings, Projection};

    fn store(kb: MemoryKb) -> CandidateStore<MemoryKb, MemoryEmbeddings> {
        let vectors = Arc::new(VectorSpace::new(
            [("apple_inc", vec![1.0, 0.0])].into_iter().collect(),
            Projection::identity(2),
        ));
        CandidateStore::new(kb, vectors)
    }

    fn apple_kb() -> MemoryKb {
        let mut kb = MemoryKb::new();
        kb.insert_surface(
            "apple",
            vec![("apple_inc".to_string(), 0.7), ("apple_fruit".to_string(), 0.3)],
        );
        kb.insert_type("apple_inc", "ORG");
        kb
    }

    #[test]
    fn test_unknown_surface_yields_empty() {
        let store = store(MemoryKb::new());
        assert!(store.candidates_for("nonesuch").is_empty());
    }

    #[test]
    fn test_candidates_carry_commonness_type_and_vector() {
        let store = store(apple_kb());
        let candidates = store.candidates_for("Apple");
        assert_eq!(candidates.len(), 2);
        assert_eq!(candidates[0].kb_id, "apple_inc");
        assert_eq!(candidates[0].feature(Feature::Commonness), 0.7);
        assert_eq!(candidates[0].entity_type, Some(EntityType::Organization));
        assert!(candidates[0].embedding.is_some());
        // No type record and no vector for the fruit sense.
        assert_eq!(candidates[1].entity_type, None);
        assert!(candidates[1].embedding.is_none());
    }

    #[test]
    fn test_limit_truncates() {
        let mut kb = MemoryKb::new();
        kb.insert_surface(
            "x",
            (0..20).map(|i| (format!("e{i}"), 1.0 / (i + 1) as f64)).collect(),
        );
        let store = store(kb).with_limit(5);
        assert_eq!(store.candidates_for("x").len(), 5);
    }

    #[test]
    fn test_etype_commonness_is_within_type_share() {
        let mut kb = MemoryKb::new();
        kb.insert_surface(
            "jordan",
            vec![
                ("jordan_country".to_string(), 0.5),
                ("jordan_player".to_string(), 0.4),
                ("jordan_river".to_string(), 0.1),
            ],
        );
        kb.insert_type("jordan_country", "GPE");
        kb.insert_type("jordan_player", "PER");
        kb.insert_type("jordan_river", "GPE");
        let store = store(kb);

        let candidates = store.candidates_for("jordan");
        let country = &candidates[0];
        let player = &candidates[1];
        let river = &candidates[2];
        assert!((country.feature(Feature::EtypeCommonness) - 0.5 / 0.6).abs() < 1e-9);
        assert!((player.feature(Feature::EtypeCommonness) - 1.0).abs() < 1e-9);
        assert!((river.feature(Feature::EtypeCommonness) - 0.1 / 0.6).abs() < 1e-9);
    }

    #[test]
    fn test_candidates_for_any_merges_and_renormalizes() {
        let mut kb = MemoryKb::new();
        kb.insert_surface(
            "japan",
            vec![("japan".to_string(), 0.8), ("japan_film".to_string(), 0.2)],
        );
        kb.insert_surface("japanese", vec![("japan".to_string(), 0.6)]);
        let store = store(kb);

        let merged =
            store.candidates_for_any(&["Japan".to_string(), "Japanese".to_string()]);
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].kb_id, "japan");
        // Summed 0.8 + 0.6 = 1.4, renormalized over 1.6 total.
        assert!((merged[0].feature(Feature::Commonness) - 1.4 / 1.6).abs() < 1e-9);
        let total: f64 = merged.iter().map(|c| c.feature(Feature::Commonness)).sum();
        assert!((total - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_attach_candidates_gloss_fallback() {
        let store = store(apple_kb());
        let mut mention = Mention::new("Apple")
            .with_translations(vec!["pomme-inconnue".to_string()]);
        // No gloss hits: falls back to the direct surface lookup.
        store.attach_candidates(&mut mention, "fra");
        assert_eq!(mention.candidates.len(), 2);

        let mut native = Mention::new("Apple");
        store.attach_candidates(&mut native, NATIVE_LANG);
        assert_eq!(native.candidates.len(), 2);
    }

    #[test]
    fn test_reset_observes_new_backing_data() {
        struct FlippingKb {
            hits: std::sync::Mutex<usize>,
        }
        impl KbStore for FlippingKb {
            fn lookup(&self, _surface: &str) -> Option<Vec<(String, f64)>> {
                let mut hits = self.hits.lock().unwrap();
                *hits += 1;
                Some(vec![(format!("gen{hits}"), 1.0)])
            }
            fn lookup_type(&self, _kb_id: &str) -> Option<EntityType> {
                None
            }
        }

        let vectors = Arc::new(VectorSpace::new(
            MemoryEmbeddings::new(),
            Projection::identity(2),
        ));
        let store = CandidateStore::new(
            FlippingKb {
                hits: std::sync::Mutex::new(0),
            },
            vectors,
        );

        let first = store.candidates_for("x");
        let again = store.candidates_for("x");
        assert_eq!(first[0].kb_id, again[0].kb_id);

        store.reset();
        let fresh = store.candidates_for("x");
        assert_ne!(first[0].kb_id, fresh[0].kb_id);
    }
}
