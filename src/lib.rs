//! # tether
//!
//! Entity linking for Rust: resolve free-text entity mentions to a
//! fixed knowledge base, or flag them NIL for corpus-wide clustering.
//!
//! - **Candidate retrieval**: prior-ranked KB lookup with type and
//!   embedding attachment, multi-surface merging for translated input
//! - **Ranking**: type-aware salience plus optional context-similarity
//!   signals, rescaled to a probability distribution
//! - **NIL clustering**: the batch pipeline lives in the
//!   `tether-coalesce` companion crate
//!
//! ## Pipeline
//!
//! ```text
//! documents → mentions (upstream NER)
//!     → CandidateStore::attach_candidates     prior-ranked KB candidates
//!     → Ranker::rank                          confidence + selection
//!     → tether_coalesce::NilClusterer         NIL ids for the rest
//!     → tether_coalesce::propagate            corpus-wide consistency
//! ```
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use tether::{
//!     CandidateStore, MemoryEmbeddings, MemoryKb, Mention, Projection, Ranker,
//!     RankingSignal, VectorSpace, NATIVE_LANG,
//! };
//!
//! let mut kb = MemoryKb::new();
//! kb.insert_surface("apple", vec![
//!     ("apple_inc".to_string(), 0.7),
//!     ("apple_fruit".to_string(), 0.3),
//! ]);
//! kb.insert_type("apple_inc", "ORG");
//!
//! let vectors = Arc::new(VectorSpace::new(
//!     MemoryEmbeddings::new(),
//!     Projection::identity(2),
//! ));
//! let store = CandidateStore::new(kb, Arc::clone(&vectors));
//! let ranker = Ranker::new(vectors);
//!
//! let mut mention = Mention::new("Apple").with_type(tether::EntityType::Organization);
//! store.attach_candidates(&mut mention, NATIVE_LANG);
//! ranker.rank(&mut mention, &[RankingSignal::ContextSimilarity]);
//!
//! assert_eq!(mention.resolved_kb().unwrap().kb_id, "apple_inc");
//! ```
//!
//! ## Design Notes
//!
//! - External stores (KB lookup, embeddings, translation dictionary)
//!   sit behind read-only traits and are injected at construction;
//!   tests substitute the in-memory implementations.
//! - Missing data (no candidates, no vector, no translation) is never
//!   an error; every absence degrades to a zero/empty signal.
//! - Lookup caches are corpus-scoped: call `reset()` on the stores
//!   between independent runs.
//! - Ranking is independent per mention and safe to parallelize; the
//!   clustering passes in `tether-coalesce` are whole-corpus batch
//!   operations.

#![warn(missing_docs)]

pub mod corpus;
mod error;
pub mod ingest;
pub mod kb;
mod mention;
pub mod ranker;
pub mod translate;
pub mod vector;

pub mod prelude {
    //! Commonly used items, re-exported for convenience.
    //!
    //! ```rust
    //! use tether::prelude::*;
    //!
    //! let mention = Mention::new("Tokyo").with_type(EntityType::Geopolitical);
    //! assert!(!mention.is_resolved());
    //! ```
    pub use crate::corpus::{Corpus, Document, MentionKey, NilTable};
    pub use crate::error::{Error, Result};
    pub use crate::kb::{CandidateStore, KbStore, MemoryKb, NATIVE_LANG};
    pub use crate::mention::{
        Candidate, EntityType, Feature, Mention, NominalMention, Resolution,
    };
    pub use crate::ranker::{Ranker, RankingSignal};
    pub use crate::translate::{MemoryTranslations, TranslationStore, Translator};
    pub use crate::vector::{EmbeddingStore, MemoryEmbeddings, Projection, VectorSpace};
}

// Re-exports
pub use corpus::{Corpus, Document, MentionKey, NilEntity, NilTable};
pub use error::{Error, Result};
pub use kb::{CandidateStore, KbStore, MemoryKb, NATIVE_LANG};
pub use mention::{
    Candidate, EntityType, Feature, Mention, NilId, NominalMention, Resolution,
};
pub use ranker::{Ranker, RankingSignal, TYPE_MISMATCH_DAMPING};
pub use translate::{MemoryTranslations, TranslationStore, Translator};
pub use vector::{similarity, EmbeddingStore, MemoryEmbeddings, Projection, VectorSpace};
