//! Candidate ranking: salience, optional context signals, calibrated
//! confidence, and selection.
//!
//! A single mutating pass over one mention (no state machine, no
//! cross-mention state; mentions may be ranked independently and in
//! parallel):
//!
//! 1. salience from the type-aware prior,
//! 2. each enabled optional signal's raw value, added on top,
//! 3. sum-to-one rescaling of the combined confidence (not a softmax:
//!    relative magnitudes are preserved rather than amplified),
//! 4. stable descending sort; ties keep retrieval order,
//! 5. the top candidate is value-copied into the mention's resolution.
//!
//! Every absence case (no candidates, no vectors, no declared type)
//! degrades to a zero-signal contribution; nothing here raises.

use crate::mention::{EntityType, Feature, Mention, Resolution};
use crate::vector::{similarity, EmbeddingStore, VectorSpace};
use std::collections::BTreeSet;
use std::sync::Arc;

/// Damping applied to a candidate's raw commonness when its type does
/// not match the mention's declared type. Penalizes without discarding.
pub const TYPE_MISMATCH_DAMPING: f64 = 0.3;

/// Optional ranking signals, enabled per call.
///
/// Signals combine additively on top of salience; enabling several
/// stacks their contributions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RankingSignal {
    /// Cosine similarity between the mention's context vector and each
    /// candidate's entity vector.
    ContextSimilarity,
}

impl RankingSignal {
    /// The feature slot this signal writes and reads.
    #[must_use]
    pub fn feature(&self) -> Feature {
        match self {
            RankingSignal::ContextSimilarity => Feature::ContextSimilarity,
        }
    }
}

/// Scores and ranks a mention's retrieved candidates.
pub struct Ranker<E: EmbeddingStore> {
    vectors: Arc<VectorSpace<E>>,
}

impl<E: EmbeddingStore> Ranker<E> {
    /// Create a ranker sharing the pipeline's vector space.
    #[must_use]
    pub fn new(vectors: Arc<VectorSpace<E>>) -> Self {
        Self { vectors }
    }

    /// Rank the mention's candidates in place and select the top one.
    ///
    /// With an empty candidate list the mention is left unresolved.
    pub fn rank(&self, mention: &mut Mention, signals: &[RankingSignal]) {
        add_salience(mention);

        if signals.contains(&RankingSignal::ContextSimilarity) {
            self.add_context_similarity(mention);
        }

        for candidate in mention.candidates.iter_mut() {
            let mut confidence = candidate.feature(Feature::Salience);
            for signal in signals {
                confidence += candidate.feature(signal.feature());
            }
            candidate.confidence = confidence;
        }

        // Zero total mass would make the rescale undefined; confidences
        // stay as computed in that case.
        let total: f64 = mention.candidates.iter().map(|c| c.confidence).sum();
        if total > 0.0 {
            for candidate in mention.candidates.iter_mut() {
                candidate.confidence /= total;
            }
        }

        mention
            .candidates
            .sort_by(|a, b| b.confidence.total_cmp(&a.confidence));

        if let Some(top) = mention.candidates.first() {
            mention.resolution = Some(Resolution::Kb(top.clone()));
        }
    }

    /// Compute `CONTEXT_SIMILARITY` for every candidate.
    ///
    /// The context set is the mention's surrounding tokens minus its
    /// own tokens, so a mention never scores similarity against itself.
    fn add_context_similarity(&self, mention: &mut Mention) {
        let own: BTreeSet<&String> = mention.tokens.iter().collect();
        let context: BTreeSet<String> = mention
            .context
            .iter()
            .filter(|t| !own.contains(t))
            .cloned()
            .collect();

        mention.context_vector = if context.is_empty() {
            None
        } else {
            self.vectors.context_vector(&context)
        };

        for candidate in mention.candidates.iter_mut() {
            let score = match (&mention.context_vector, &candidate.embedding) {
                (Some(context), Some(entity)) => similarity(context, entity),
                _ => 0.0,
            };
            candidate.set_feature(Feature::ContextSimilarity, score);
        }
    }
}

/// Compute `SALIENCE` for every candidate.
///
/// With a declared person/organization/place type, type-matched
/// candidates take their within-type share (`ETYPE_COMMONNESS`) and
/// everything else takes damped raw commonness. Without a declared
/// type, salience is raw commonness unconditionally.
fn add_salience(mention: &mut Mention) {
    let declared = mention.entity_type.clone().filter(|t| {
        matches!(
            t,
            EntityType::Person | EntityType::Organization | EntityType::Geopolitical
        )
    });

    for candidate in mention.candidates.iter_mut() {
        let salience = match (&declared, &candidate.entity_type) {
            (Some(declared), Some(etype)) if declared == etype => {
                candidate.feature(Feature::EtypeCommonness)
            }
            (Some(_), _) => candidate.feature(Feature::Commonness) * TYPE_MISMATCH_DAMPING,
            (None, _) => candidate.feature(Feature::Commonness),
        };
        candidate.set_feature(Feature::Salience, salience);
    }
}
