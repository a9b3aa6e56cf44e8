//! Majority-vote propagation across surface clusters.
//!
//! Mentions with identical surface text should not disagree about
//! identity merely because ranking resolved them independently. For
//! each final cluster, the majority identifier wins, but only when it
//! is a real KB id (consensus is never invented among unknowns), and
//! only minority NIL assignments move (one real KB answer never
//! overrides another).

use std::collections::HashMap;
use tether::{Corpus, MentionKey};

/// One reassignment applied by the pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropagationMove {
    /// Surface text of the moved mention.
    pub text: String,
    /// Identifier the mention held before the pass.
    pub from: String,
    /// Identifier the mention holds after the pass.
    pub to: String,
}

/// Result of a propagation pass.
#[derive(Debug, Clone, Default)]
pub struct PropagationOutcome {
    /// Every reassignment, in corpus encounter order.
    pub moves: Vec<PropagationMove>,
}

impl PropagationOutcome {
    /// Number of mentions reassigned.
    #[must_use]
    pub fn reassigned(&self) -> usize {
        self.moves.len()
    }
}

/// Reconcile mixed assignments inside each surface cluster.
///
/// `membership` is the text → final-cluster-label map produced by
/// clustering. Majority selection is deterministic: descending member
/// count, then ascending identifier.
pub fn propagate(
    corpus: &mut Corpus,
    membership: &HashMap<String, String>,
) -> PropagationOutcome {
    // Group every mention by its final cluster, in encounter order.
    let mut order: Vec<String> = Vec::new();
    let mut clusters: HashMap<String, Vec<MentionKey>> = HashMap::new();
    for (key, mention) in corpus.mentions() {
        let Some(label) = membership.get(&mention.text) else {
            continue;
        };
        if !clusters.contains_key(label) {
            order.push(label.clone());
        }
        clusters.entry(label.clone()).or_default().push(key);
    }

    let mut outcome = PropagationOutcome::default();
    for label in order {
        let members = &clusters[&label];

        // Partition members by currently assigned identifier.
        let mut id_order: Vec<String> = Vec::new();
        let mut by_id: HashMap<String, Vec<MentionKey>> = HashMap::new();
        for &key in members {
            let Some(id) = corpus.resolution_label(key).map(str::to_string) else {
                continue;
            };
            if !by_id.contains_key(&id) {
                id_order.push(id.clone());
            }
            by_id.entry(id).or_default().push(key);
        }
        if by_id.len() < 2 {
            continue;
        }

        let mut ranked: Vec<&String> = id_order.iter().collect();
        ranked.sort_by(|a, b| {
            by_id[*b]
                .len()
                .cmp(&by_id[*a].len())
                .then_with(|| a.cmp(b))
        });
        let majority = ranked[0].clone();
        if is_nil_id(&majority) {
            continue;
        }

        let donor_key = by_id[&majority][0];
        let Some(donor) = corpus.mention(donor_key) else {
            continue;
        };
        let donor_resolution = donor.resolution.clone();
        let donor_translations = donor.translations.clone();

        for id in &id_order {
            if *id == majority {
                continue;
            }
            // Equal-sized minorities still move; larger ones never do.
            if by_id[&majority].len() < by_id[id].len() {
                continue;
            }
            if !is_nil_id(id) {
                continue;
            }
            for &key in &by_id[id] {
                let text = corpus
                    .mention(key)
                    .map(|m| m.text.clone())
                    .unwrap_or_default();
                if let Some(mention) = corpus.mention_mut(key) {
                    mention.resolution = donor_resolution.clone();
                    mention.translations = donor_translations.clone();
                }
                outcome.moves.push(PropagationMove {
                    text,
                    from: id.clone(),
                    to: majority.clone(),
                });
            }
        }
    }

    log::info!("  # of mentions propagated: {}", outcome.reassigned());
    for mv in &outcome.moves {
        log::debug!("  {} | {} -> {}", mv.text, mv.from, mv.to);
    }
    outcome
}

/// True when an identifier names a NIL cluster rather than a KB entry.
#[must_use]
pub fn is_nil_id(id: &str) -> bool {
    id.starts_with("NIL")
}
