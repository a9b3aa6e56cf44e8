//! # tether-coalesce
//!
//! Corpus-wide NIL clustering and cluster propagation for tether.
//!
//! Mentions that ranking could not resolve to the knowledge base are
//! merged into clusters representing the same unknown entity:
//!
//! 1. **Seed**: one cluster per distinct lowercased surface text
//! 2. **Normalize**: strip designators and stop words
//! 3. **Phonetic fold**: apostrophe variants, doubled letters
//! 4. **Approximate merge**: length-proportional edit distance
//! 5. **Cross-language merge**: shared translation glosses
//! 6. **Manual groups**: externally supplied synonym sets
//!
//! followed by an optional majority-vote propagation pass that
//! reconciles inconsistent assignments within a surface cluster.
//!
//! Both passes are true batch operations: they need the whole corpus
//! materialized, and stage merges apply in one deterministic pass in
//! corpus encounter order.
//!
//! # Example
//!
//! ```
//! use tether::{Corpus, Document, Mention};
//! use tether_coalesce::NilClusterer;
//!
//! let mut corpus = Corpus::new();
//! corpus.add_document(Document::new("doc1").with_mentions(vec![
//!     Mention::new("Acme Corp"),
//!     Mention::new("acme corp"),
//! ]));
//!
//! let outcome = NilClusterer::new().cluster(&mut corpus);
//! assert_eq!(outcome.stats.nil_ids, 1);
//! ```

#![warn(missing_docs)]

pub mod cluster;
pub mod propagate;
pub mod resources;

pub use cluster::{cluster_exact, ClusterOutcome, ClusterStats, NilClusterer};
pub use propagate::{is_nil_id, propagate, PropagationMove, PropagationOutcome};
pub use resources::Resources;
