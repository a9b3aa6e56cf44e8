//! Multi-stage NIL clustering.
//!
//! Operates over the whole corpus at once (a batch algorithm, not
//! streaming). Every mention, KB-resolved or not, participates in the
//! surface clusters; only unresolved mentions receive NIL identifiers
//! at the end, and the propagation pass uses the full clusters to
//! reconcile mixed assignments.
//!
//! Each stage consumes the previous stage's cluster set and produces a
//! coarser one; identifiers are reissued sequentially per stage
//! (`NIL0000000`, `NIL0000001`, …) and only the final stage's
//! identifiers are externally visible. Merges are applied in one
//! deterministic pass per stage, in corpus encounter order: the stage 4
//! and 5 "first claimer wins" rules depend on it.

use crate::propagate::{propagate, PropagationOutcome};
use crate::resources::Resources;
use std::collections::{HashMap, HashSet};
use strsim::levenshtein;
use tether::{Corpus, MentionKey, Resolution};

/// Length below which the phonetic fold is suppressed; folding very
/// short strings destroys discriminating power.
const MIN_FOLDED_LEN: usize = 4;

/// Keys at or below this length never approximately merge; collision
/// risk outweighs recall.
const MIN_APPROX_LEN: usize = 6;

/// One surface cluster during a pipeline stage.
#[derive(Debug, Clone)]
struct Cluster {
    label: String,
    key: String,
    members: Vec<MentionKey>,
}

/// Insertion-ordered cluster set; labels are issued in first-encounter
/// order within the stage.
#[derive(Debug, Default)]
struct StageSet {
    clusters: Vec<Cluster>,
    index: HashMap<String, usize>,
}

impl StageSet {
    fn new() -> Self {
        Self::default()
    }

    /// Get the cluster for a key, creating it on first sight.
    fn slot(&mut self, key: &str) -> usize {
        if let Some(&idx) = self.index.get(key) {
            return idx;
        }
        let idx = self.clusters.len();
        self.clusters.push(Cluster {
            label: format!("NIL{idx:07}"),
            key: key.to_string(),
            members: Vec::new(),
        });
        self.index.insert(key.to_string(), idx);
        idx
    }

    fn len(&self) -> usize {
        self.clusters.len()
    }
}

/// Cluster counts after each pipeline stage.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClusterStats {
    /// Distinct lowercased surface texts.
    pub seeded: usize,
    /// After designator/stop-word normalization.
    pub after_normalize: usize,
    /// After the phonetic fold.
    pub after_phonetic: usize,
    /// After the approximate (edit-distance) merge.
    pub after_approximate: usize,
    /// After the cross-language gloss merge.
    pub after_translation: usize,
    /// After manual grouping; `None` when no groups were configured.
    pub after_groups: Option<usize>,
    /// Distinct NIL identifiers assigned.
    pub nil_ids: usize,
    /// Mentions assigned a NIL identifier.
    pub nil_mentions: usize,
}

/// Result of a clustering run.
#[derive(Debug, Clone)]
pub struct ClusterOutcome {
    /// Raw surface text → final cluster label, first occurrence wins.
    pub membership: HashMap<String, String>,
    /// Per-stage cluster counts.
    pub stats: ClusterStats,
    /// Propagation result when the pass was enabled.
    pub propagation: Option<PropagationOutcome>,
}

/// The multi-stage NIL clustering pipeline.
#[derive(Debug, Clone, Default)]
pub struct NilClusterer {
    resources: Resources,
    propagation: bool,
}

impl NilClusterer {
    /// Create a clusterer with empty resources and no propagation.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Supply designators, stop words, and manual groups.
    #[must_use]
    pub fn with_resources(mut self, resources: Resources) -> Self {
        self.resources = resources;
        self
    }

    /// Enable the post-clustering propagation pass.
    #[must_use]
    pub fn with_propagation(mut self, propagation: bool) -> Self {
        self.propagation = propagation;
        self
    }

    /// Cluster the corpus and assign NIL identifiers to every mention
    /// ranking left unresolved.
    pub fn cluster(&self, corpus: &mut Corpus) -> ClusterOutcome {
        let mut stats = ClusterStats::default();

        let mut clusters = seed(corpus);
        stats.seeded = clusters.len();
        log::info!("# initial clusters: {}", stats.seeded);

        clusters = self.normalize(clusters);
        stats.after_normalize = clusters.len();
        log::info!("  # clusters: {} (normalize)", stats.after_normalize);

        clusters = phonetic_fold(clusters);
        stats.after_phonetic = clusters.len();
        log::info!("  # clusters: {} (phonetic)", stats.after_phonetic);

        clusters = approximate_merge(clusters);
        stats.after_approximate = clusters.len();
        log::info!("  # clusters: {} (approximate)", stats.after_approximate);

        clusters = translation_merge(corpus, clusters);
        stats.after_translation = clusters.len();
        log::info!("  # clusters: {} (translation)", stats.after_translation);

        if !self.resources.groups.is_empty() {
            clusters = self.group_merge(clusters);
            stats.after_groups = Some(clusters.len());
            log::info!("  # clusters: {} (groups)", clusters.len());
        }

        let membership = membership_of(corpus, &clusters);
        assign_nil_ids(corpus, &membership, &mut stats);
        log::info!("  # of NIL ids: {}", stats.nil_ids);
        log::info!("  # of NIL mentions: {}", stats.nil_mentions);

        let propagation = if self.propagation {
            Some(propagate(corpus, &membership))
        } else {
            None
        };

        ClusterOutcome {
            membership,
            stats,
            propagation,
        }
    }

    /// Stage 2: strip designators and stop words from each key,
    /// falling back to the original key when nothing survives.
    fn normalize(&self, prev: StageSet) -> StageSet {
        let mut next = StageSet::new();
        for cluster in prev.clusters {
            let tokens: Vec<&str> = cluster
                .key
                .split(' ')
                .filter(|t| !self.resources.is_filtered(t))
                .collect();
            let key = if tokens.is_empty() {
                cluster.key.clone()
            } else {
                tokens.join(" ")
            };
            let slot = next.slot(&key);
            next.clusters[slot].members.extend(cluster.members);
        }
        next
    }

    /// Stage 6: collapse clusters whose text appears in a manual group
    /// into one cluster keyed by the group's first element.
    fn group_merge(&self, prev: StageSet) -> StageSet {
        let texts: HashSet<&str> = prev.clusters.iter().map(|c| c.key.as_str()).collect();
        let active: Vec<&Vec<String>> = self
            .resources
            .groups
            .iter()
            .filter(|g| g.iter().any(|m| texts.contains(m.as_str())))
            .collect();

        let mut next = StageSet::new();
        for group in &active {
            if let Some(head) = group.first() {
                next.slot(head);
            }
        }
        for cluster in prev.clusters {
            let target = active
                .iter()
                .find(|g| g.contains(&cluster.key))
                .and_then(|g| g.first());
            let slot = match target {
                Some(head) => next.slot(head),
                None => next.slot(&cluster.key),
            };
            next.clusters[slot].members.extend(cluster.members);
        }
        next
    }
}

/// Stage 1: one cluster per distinct lowercased surface text, in
/// corpus encounter order.
fn seed(corpus: &Corpus) -> StageSet {
    let mut set = StageSet::new();
    for (key, mention) in corpus.mentions() {
        let slot = set.slot(&mention.text.to_lowercase());
        set.clusters[slot].members.push(key);
    }
    set
}

/// Collapse fancy apostrophes and doubled letters; a cheap proxy for
/// NYSIIS-style phonetic folding.
fn fold_key(key: &str) -> String {
    let mut folded = String::with_capacity(key.len());
    let mut last: Option<char> = None;
    for c in key.chars() {
        let c = match c {
            '\u{02BC}' | '\u{2019}' | '\u{2018}' | '\u{00B4}' | '\u{2032}' => '\'',
            other => other,
        };
        if last != Some(c) {
            folded.push(c);
        }
        last = Some(c);
    }
    folded
}

/// Stage 3: merge clusters sharing a folded key. The fold only applies
/// when the folded text keeps length >= 4.
fn phonetic_fold(prev: StageSet) -> StageSet {
    let mut next = StageSet::new();
    for cluster in prev.clusters {
        let folded = fold_key(&cluster.key);
        let key = if folded.chars().count() < MIN_FOLDED_LEN {
            cluster.key.clone()
        } else {
            folded
        };
        let slot = next.slot(&key);
        next.clusters[slot].members.extend(cluster.members);
    }
    next
}

/// Stage 4: merge keys longer than 5 characters into the closest
/// previously placed key within a length-proportional edit-distance
/// tolerance (`distance < len/8 + 1`). Ties take the smallest distance,
/// then the first-placed cluster. Short keys only merge on exact match.
fn approximate_merge(prev: StageSet) -> StageSet {
    let mut next = StageSet::new();
    for cluster in prev.clusters {
        let len = cluster.key.chars().count();
        let mut best: Option<(usize, usize)> = None;
        if len >= MIN_APPROX_LEN {
            let tolerance = len / 8 + 1;
            for (idx, placed) in next.clusters.iter().enumerate() {
                let distance = levenshtein(&cluster.key, &placed.key);
                if distance < tolerance && best.map_or(true, |(d, _)| distance < d) {
                    best = Some((distance, idx));
                }
            }
        }
        let slot = match best {
            Some((_, idx)) => idx,
            None => next.slot(&cluster.key),
        };
        next.clusters[slot].members.extend(cluster.members);
    }
    next
}

/// Stage 5: cross-language merge on shared translation glosses.
///
/// Glosses are collected per cluster in member encounter order; the
/// first gloss already claimed by an earlier cluster decides the merge
/// target, and all of the cluster's glosses register under the target.
fn translation_merge(corpus: &Corpus, prev: StageSet) -> StageSet {
    let mut next = StageSet::new();
    let mut claimed: HashMap<String, usize> = HashMap::new();

    for cluster in prev.clusters {
        let mut glosses: Vec<String> = Vec::new();
        let mut seen: HashSet<String> = HashSet::new();
        for member in &cluster.members {
            let Some(mention) = corpus.mention(*member) else {
                continue;
            };
            for translation in &mention.translations {
                if translation.is_empty() {
                    continue;
                }
                let gloss = translation.to_lowercase();
                if seen.insert(gloss.clone()) {
                    glosses.push(gloss);
                }
            }
        }

        let slot = match glosses.iter().find_map(|g| claimed.get(g).copied()) {
            Some(idx) => idx,
            None => next.slot(&cluster.key),
        };
        next.clusters[slot].members.extend(cluster.members);
        for gloss in glosses {
            claimed.entry(gloss).or_insert(slot);
        }
    }
    next
}

/// Raw surface text → final cluster label; the first cluster holding a
/// text claims it. Two mentions with identical raw text therefore
/// always receive the same final identifier.
fn membership_of(corpus: &Corpus, clusters: &StageSet) -> HashMap<String, String> {
    let mut membership = HashMap::new();
    for cluster in &clusters.clusters {
        for member in &cluster.members {
            if let Some(mention) = corpus.mention(*member) {
                membership
                    .entry(mention.text.clone())
                    .or_insert_with(|| cluster.label.clone());
            }
        }
    }
    membership
}

/// Assign a NIL entity (one per final cluster, shared through the
/// corpus arena) to every unresolved mention.
fn assign_nil_ids(
    corpus: &mut Corpus,
    membership: &HashMap<String, String>,
    stats: &mut ClusterStats,
) {
    let pending: Vec<(MentionKey, String)> = corpus
        .mentions()
        .filter(|(_, m)| !m.is_resolved())
        .map(|(k, m)| (k, m.text.clone()))
        .collect();

    let mut assigned: HashSet<String> = HashSet::new();
    for (key, text) in pending {
        let Some(label) = membership.get(&text) else {
            continue;
        };
        let id = corpus.nils_mut().intern(label);
        if let Some(mention) = corpus.mention_mut(key) {
            mention.resolution = Some(Resolution::Nil(id));
            stats.nil_mentions += 1;
            assigned.insert(label.clone());
        }
    }
    stats.nil_ids = assigned.len();
}

/// Exact-match clustering: one NIL identifier per distinct raw surface
/// text among unresolved mentions. The trivial baseline beside the full
/// pipeline.
pub fn cluster_exact(corpus: &mut Corpus) -> ClusterStats {
    let mut stats = ClusterStats::default();
    let pending: Vec<(MentionKey, String)> = corpus
        .mentions()
        .filter(|(_, m)| !m.is_resolved())
        .map(|(k, m)| (k, m.text.clone()))
        .collect();

    let mut by_text: HashMap<String, usize> = HashMap::new();
    for (key, text) in pending {
        let id = match by_text.get(&text) {
            Some(&id) => id,
            None => {
                let label = format!("NIL{:07}", by_text.len());
                let id = corpus.nils_mut().intern(&label);
                by_text.insert(text, id);
                id
            }
        };
        if let Some(mention) = corpus.mention_mut(key) {
            mention.resolution = Some(Resolution::Nil(id));
            stats.nil_mentions += 1;
        }
    }
    stats.nil_ids = by_text.len();
    log::info!("  # of NIL ids: {}", stats.nil_ids);
    log::info!("  # of NIL mentions: {}", stats.nil_mentions);
    stats
}

#[cfg(test)]
mod tests {
    use super::*;
    use tether::{Document, Mention};

    fn corpus_of(texts: &[&str]) -> Corpus {
        let mut corpus = Corpus::new();
        corpus.add_document(
            Document::new("d1")
                .with_mentions(texts.iter().map(|t| Mention::new(*t)).collect()),
        );
        corpus
    }

    fn labels(corpus: &Corpus) -> Vec<Option<String>> {
        corpus
            .mentions()
            .map(|(k, _)| corpus.resolution_label(k).map(str::to_string))
            .collect()
    }

    #[test]
    fn test_seed_groups_case_insensitively() {
        let mut corpus = corpus_of(&["Apple", "apple", "Banana"]);
        let outcome = NilClusterer::new().cluster(&mut corpus);
        assert_eq!(outcome.stats.seeded, 2);
        let got = labels(&corpus);
        assert_eq!(got[0], got[1]);
        assert_ne!(got[0], got[2]);
    }

    #[test]
    fn test_normalize_strips_designators() {
        let resources = Resources::new()
            .with_designators(["inc", "corp"])
            .with_stop_words(["the"]);
        let mut corpus = corpus_of(&["Acme Inc", "the Acme Corp", "Acme"]);
        let outcome = NilClusterer::new()
            .with_resources(resources)
            .cluster(&mut corpus);
        assert_eq!(outcome.stats.after_normalize, 1);
        let got = labels(&corpus);
        assert_eq!(got[0], got[1]);
        assert_eq!(got[0], got[2]);
    }

    #[test]
    fn test_normalize_falls_back_when_all_tokens_filtered() {
        let resources = Resources::new().with_designators(["inc"]);
        let mut corpus = corpus_of(&["Inc", "Acme"]);
        let outcome = NilClusterer::new()
            .with_resources(resources)
            .cluster(&mut corpus);
        // "inc" normalizes to nothing and keeps its original key.
        assert_eq!(outcome.stats.after_normalize, 2);
    }

    #[test]
    fn test_phonetic_fold_merges_doubled_letters() {
        let mut corpus = corpus_of(&["shabaab", "shabab"]);
        let outcome = NilClusterer::new().cluster(&mut corpus);
        assert_eq!(outcome.stats.after_phonetic, 1);
    }

    #[test]
    fn test_phonetic_fold_suppressed_for_short_keys() {
        // "oo" folds to "o" (< 4 chars), so the fold must not apply.
        let mut corpus = corpus_of(&["oo", "o"]);
        let outcome = NilClusterer::new().cluster(&mut corpus);
        assert_eq!(outcome.stats.after_phonetic, 2);
    }

    #[test]
    fn test_fold_normalizes_apostrophe_variants() {
        let mut corpus = corpus_of(&["qa\u{2019}eda", "qa'eda"]);
        let outcome = NilClusterer::new().cluster(&mut corpus);
        assert_eq!(outcome.stats.after_phonetic, 1);
    }

    #[test]
    fn test_approximate_merge_boundary() {
        // 8-character keys: tolerance is floor(8/8)+1 = 2, so
        // distance 1 merges and distance 2 does not.
        let mut one_off = corpus_of(&["abcdefgh", "abcdefgx"]);
        let outcome = NilClusterer::new().cluster(&mut one_off);
        assert_eq!(outcome.stats.after_approximate, 1);

        let mut two_off = corpus_of(&["abcdefgh", "abcdefxy"]);
        let outcome = NilClusterer::new().cluster(&mut two_off);
        assert_eq!(outcome.stats.after_approximate, 2);
    }

    #[test]
    fn test_approximate_merge_skips_short_keys() {
        // 5 characters, distance 1: never approximately merged.
        let mut corpus = corpus_of(&["abcde", "abcdx"]);
        let outcome = NilClusterer::new().cluster(&mut corpus);
        assert_eq!(outcome.stats.after_approximate, 2);
    }

    #[test]
    fn test_translation_merge_claims_glosses() {
        let mut corpus = Corpus::new();
        let m1 = Mention::new("manzana").with_translations(vec!["apple".into()]);
        let m2 = Mention::new("pomme").with_translations(vec!["apple".into()]);
        let m3 = Mention::new("tokio").with_translations(vec!["tokyo".into()]);
        corpus.add_document(Document::new("d1").with_mentions(vec![m1, m2, m3]));

        let outcome = NilClusterer::new().cluster(&mut corpus);
        assert_eq!(outcome.stats.after_translation, 2);
        let got = labels(&corpus);
        assert_eq!(got[0], got[1]);
        assert_ne!(got[0], got[2]);
    }

    #[test]
    fn test_group_merge_collapses_synonyms() {
        let resources = Resources::new().with_groups(vec![vec![
            "al-shabab".to_string(),
            "harakat shabab".to_string(),
        ]]);
        let mut corpus = corpus_of(&["al-shabab", "harakat shabab", "acme"]);
        let outcome = NilClusterer::new()
            .with_resources(resources)
            .cluster(&mut corpus);
        assert_eq!(outcome.stats.after_groups, Some(2));
        let got = labels(&corpus);
        assert_eq!(got[0], got[1]);
        assert_ne!(got[0], got[2]);
    }

    #[test]
    fn test_groups_absent_means_no_group_stage() {
        let mut corpus = corpus_of(&["acme"]);
        let outcome = NilClusterer::new().cluster(&mut corpus);
        assert_eq!(outcome.stats.after_groups, None);
    }

    #[test]
    fn test_final_ids_are_dense_and_padded() {
        let mut corpus = corpus_of(&["alpha corporation", "betamax", "gamma rays"]);
        NilClusterer::new().cluster(&mut corpus);
        let mut labels: Vec<String> =
            corpus.nils().iter().map(|e| e.label.clone()).collect();
        labels.sort();
        assert_eq!(labels, vec!["NIL0000000", "NIL0000001", "NIL0000002"]);
        assert!(corpus.nils().iter().all(|e| (e.confidence - 1.0).abs() < 1e-12));
    }

    #[test]
    fn test_exact_match_clustering() {
        let mut corpus = corpus_of(&["Apple", "apple", "Apple"]);
        let stats = cluster_exact(&mut corpus);
        // Raw text keying: "Apple" and "apple" differ.
        assert_eq!(stats.nil_ids, 2);
        assert_eq!(stats.nil_mentions, 3);
        let got = labels(&corpus);
        assert_eq!(got[0], got[2]);
        assert_ne!(got[0], got[1]);
    }
}
