//! Mention, candidate, and resolution types for entity linking.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Entity type classification.
///
/// Standard coarse types following TAC/CoNLL conventions.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityType {
    /// Person name (PER)
    Person,
    /// Organization name (ORG)
    Organization,
    /// Geopolitical entity (GPE)
    Geopolitical,
    /// Location (LOC)
    Location,
    /// Facility (FAC)
    Facility,
    /// Other entity type
    Other(String),
}

impl EntityType {
    /// Convert to standard label string (TAC format).
    #[must_use]
    pub fn as_label(&self) -> &str {
        match self {
            EntityType::Person => "PER",
            EntityType::Organization => "ORG",
            EntityType::Geopolitical => "GPE",
            EntityType::Location => "LOC",
            EntityType::Facility => "FAC",
            EntityType::Other(s) => s.as_str(),
        }
    }

    /// Parse from standard label string.
    #[must_use]
    pub fn from_label(label: &str) -> Self {
        match label.to_uppercase().as_str() {
            "PER" | "PERSON" | "B-PER" | "I-PER" => EntityType::Person,
            "ORG" | "ORGANIZATION" | "B-ORG" | "I-ORG" => EntityType::Organization,
            "GPE" | "B-GPE" | "I-GPE" => EntityType::Geopolitical,
            "LOC" | "LOCATION" | "B-LOC" | "I-LOC" => EntityType::Location,
            "FAC" | "FACILITY" | "B-FAC" | "I-FAC" => EntityType::Facility,
            other => EntityType::Other(other.to_string()),
        }
    }
}

impl std::fmt::Display for EntityType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_label())
    }
}

/// Named ranking feature attached to a candidate.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub enum Feature {
    /// Prior popularity of the candidate for a surface form.
    Commonness,
    /// Commonness normalized over same-typed competitors.
    EtypeCommonness,
    /// Type-aware adjusted prior (baseline ranking signal).
    Salience,
    /// Cosine closeness between context vector and entity vector.
    ContextSimilarity,
}

impl Feature {
    /// Convert to the feature's label string.
    #[must_use]
    pub fn as_label(&self) -> &'static str {
        match self {
            Feature::Commonness => "COMMONNESS",
            Feature::EtypeCommonness => "ETYPE_COMMONNESS",
            Feature::Salience => "SALIENCE",
            Feature::ContextSimilarity => "CONTEXT_SIMILARITY",
        }
    }
}

impl std::fmt::Display for Feature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_label())
    }
}

/// A knowledge-base candidate attached to a mention.
///
/// Candidates are built fresh per mention and never shared between
/// mentions; selecting one as the mention's answer takes a value copy
/// (see [`Resolution::Kb`]), so later candidate-list mutation cannot
/// corrupt an already-resolved mention.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    /// Knowledge base identifier.
    pub kb_id: String,
    /// Entity type from the KB, if known.
    pub entity_type: Option<EntityType>,
    /// Entity embedding vector, if the embedding store has one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedding: Option<Vec<f32>>,
    /// Named feature scores.
    pub features: BTreeMap<Feature, f64>,
    /// Final confidence in [0, 1] after ranking.
    pub confidence: f64,
}

impl Candidate {
    /// Create a new candidate with no features and confidence 1.0.
    #[must_use]
    pub fn new(kb_id: impl Into<String>) -> Self {
        Self {
            kb_id: kb_id.into(),
            entity_type: None,
            embedding: None,
            features: BTreeMap::new(),
            confidence: 1.0,
        }
    }

    /// Set the entity type.
    #[must_use]
    pub fn with_type(mut self, entity_type: EntityType) -> Self {
        self.entity_type = Some(entity_type);
        self
    }

    /// Set the embedding.
    #[must_use]
    pub fn with_embedding(mut self, embedding: Vec<f32>) -> Self {
        self.embedding = Some(embedding);
        self
    }

    /// Get a feature score; an absent feature reads as zero signal.
    #[must_use]
    pub fn feature(&self, feature: Feature) -> f64 {
        self.features.get(&feature).copied().unwrap_or(0.0)
    }

    /// Set a feature score.
    pub fn set_feature(&mut self, feature: Feature, score: f64) {
        self.features.insert(feature, score);
    }
}

/// Index of a NIL entity in the corpus-owned arena.
pub type NilId = usize;

/// A mention's resolved answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Resolution {
    /// Resolved to a KB entity. Holds a value copy of the winning
    /// candidate, not a reference into the candidate list.
    Kb(Candidate),
    /// Judged not in the KB; member of a NIL cluster.
    Nil(NilId),
}

impl Resolution {
    /// The KB candidate, if resolved to the KB.
    #[must_use]
    pub fn as_kb(&self) -> Option<&Candidate> {
        match self {
            Resolution::Kb(c) => Some(c),
            Resolution::Nil(_) => None,
        }
    }

    /// True if this is a NIL cluster assignment.
    #[must_use]
    pub fn is_nil(&self) -> bool {
        matches!(self, Resolution::Nil(_))
    }
}

/// A named entity mention in a document.
///
/// Spans use inclusive character offsets (`begin..=end`), the TAC
/// convention of the tab formats this crate ingests and emits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mention {
    /// Raw surface text.
    pub text: String,
    /// Start character offset (inclusive).
    pub begin: usize,
    /// End character offset (inclusive).
    pub end: usize,
    /// Tokenized surface form.
    pub tokens: Vec<String>,
    /// Identifier of the containing document.
    pub doc_id: String,
    /// Surrounding context tokens (typically the sentence).
    pub context: Vec<String>,
    /// Declared entity type, if the upstream tagger produced one.
    pub entity_type: Option<EntityType>,
    /// Translation glosses for non-native-language mentions.
    pub translations: Vec<String>,
    /// Ranked KB candidates (attached by the candidate store / ranker).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub candidates: Vec<Candidate>,
    /// Resolved answer, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolution: Option<Resolution>,
    /// Projected context vector computed during ranking.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context_vector: Option<Vec<f32>>,
    /// Nominal mentions coreferent with this mention.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub nominals: Vec<NominalMention>,
}

impl Mention {
    /// Create a mention with only surface text.
    #[must_use]
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            begin: 0,
            end: 0,
            tokens: Vec::new(),
            doc_id: String::new(),
            context: Vec::new(),
            entity_type: None,
            translations: Vec::new(),
            candidates: Vec::new(),
            resolution: None,
            context_vector: None,
            nominals: Vec::new(),
        }
    }

    /// Set the character span (inclusive offsets).
    #[must_use]
    pub fn with_span(mut self, begin: usize, end: usize) -> Self {
        self.begin = begin;
        self.end = end;
        self
    }

    /// Set the containing document.
    #[must_use]
    pub fn with_doc(mut self, doc_id: impl Into<String>) -> Self {
        self.doc_id = doc_id.into();
        self
    }

    /// Set the tokenized surface form.
    #[must_use]
    pub fn with_tokens(mut self, tokens: Vec<String>) -> Self {
        self.tokens = tokens;
        self
    }

    /// Set the context tokens.
    #[must_use]
    pub fn with_context(mut self, context: Vec<String>) -> Self {
        self.context = context;
        self
    }

    /// Set the declared entity type.
    #[must_use]
    pub fn with_type(mut self, entity_type: EntityType) -> Self {
        self.entity_type = Some(entity_type);
        self
    }

    /// Set the translation glosses.
    #[must_use]
    pub fn with_translations(mut self, translations: Vec<String>) -> Self {
        self.translations = translations;
        self
    }

    /// True once the mention has any resolution (KB or NIL).
    #[must_use]
    pub fn is_resolved(&self) -> bool {
        self.resolution.is_some()
    }

    /// The resolved KB candidate, if the mention resolved to the KB.
    #[must_use]
    pub fn resolved_kb(&self) -> Option<&Candidate> {
        self.resolution.as_ref().and_then(Resolution::as_kb)
    }
}

/// A nominal mention coreferent with a named mention.
///
/// Produced by an upstream coreference system; tether only carries it
/// through so tab output can emit it under the parent's resolution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NominalMention {
    /// Raw surface text.
    pub text: String,
    /// Start character offset (inclusive).
    pub begin: usize,
    /// End character offset (inclusive).
    pub end: usize,
    /// Mention kind tag emitted in tab output (e.g. "NOM").
    pub kind: String,
}

impl NominalMention {
    /// Create a nominal mention.
    #[must_use]
    pub fn new(text: impl Into<String>, begin: usize, end: usize) -> Self {
        Self {
            text: text.into(),
            begin,
            end,
            kind: "NOM".to_string(),
        }
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn entity_type_label_roundtrip(label in "[A-Z]{3,10}") {
            let et = EntityType::from_label(&label);
            let back = EntityType::from_label(et.as_label());
            prop_assert_eq!(back, et);
        }
    }
}
