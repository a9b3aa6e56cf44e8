//! Translation dictionary boundary.
//!
//! The external store returns raw `(gloss, priority)` rows for a
//! `(lemma, language)` pair. [`Translator`] aggregates priority per
//! gloss and returns glosses ordered by descending total priority,
//! ties broken by first response order.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::RwLock;

/// Read-only boundary to the translation dictionary service.
pub trait TranslationStore: Send + Sync {
    /// Raw `(gloss, priority)` rows for a lemma in a source language,
    /// in response order. Unknown lemmas yield an empty list.
    fn entries(&self, lemma: &str, lang: &str) -> Vec<(String, f64)>;
}

/// In-memory translation store, JSON-loadable.
///
/// Keyed by language, then lemma.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MemoryTranslations {
    languages: HashMap<String, HashMap<String, Vec<(String, f64)>>>,
}

impl MemoryTranslations {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a gloss row for a lemma.
    pub fn insert(
        &mut self,
        lang: impl Into<String>,
        lemma: impl Into<String>,
        gloss: impl Into<String>,
        priority: f64,
    ) {
        self.languages
            .entry(lang.into())
            .or_default()
            .entry(lemma.into())
            .or_default()
            .push((gloss.into(), priority));
    }
}

impl TranslationStore for MemoryTranslations {
    fn entries(&self, lemma: &str, lang: &str) -> Vec<(String, f64)> {
        self.languages
            .get(lang)
            .and_then(|lemmas| lemmas.get(lemma))
            .cloned()
            .unwrap_or_default()
    }
}

/// Memoizing gloss lookup with priority aggregation.
pub struct Translator<T: TranslationStore> {
    store: T,
    cache: RwLock<HashMap<(String, String), Vec<String>>>,
}

impl<T: TranslationStore> Translator<T> {
    /// Create a translator over a store.
    #[must_use]
    pub fn new(store: T) -> Self {
        Self {
            store,
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// English glosses for a lemma, ordered by descending aggregated
    /// priority; ties keep first response order. An unknown lemma
    /// yields an empty list, not an error.
    #[must_use]
    pub fn glosses(&self, lemma: &str, lang: &str) -> Vec<String> {
        let key = (lemma.to_string(), lang.to_string());
        if let Some(hit) = self.cache.read().expect("gloss cache poisoned").get(&key) {
            return hit.clone();
        }

        // Aggregate in first-seen order so the later stable sort breaks
        // priority ties by response order.
        let mut totals: Vec<(String, f64)> = Vec::new();
        let mut by_gloss: HashMap<String, usize> = HashMap::new();
        for (gloss, priority) in self.store.entries(lemma, lang) {
            match by_gloss.get(&gloss) {
                Some(&idx) => totals[idx].1 += priority,
                None => {
                    by_gloss.insert(gloss.clone(), totals.len());
                    totals.push((gloss, priority));
                }
            }
        }
        totals.sort_by(|a, b| b.1.total_cmp(&a.1));
        let glosses: Vec<String> = totals.into_iter().map(|(g, _)| g).collect();

        self.cache
            .write()
            .expect("gloss cache poisoned")
            .insert(key, glosses.clone());
        glosses
    }

    /// Drop memoized lookups. Run between independent corpus batches.
    pub fn reset(&self) {
        self.cache.write().expect("gloss cache poisoned").clear();
    }
}
