//! Document ingestion: tagged-text and tab-separated formats.
//!
//! Pure format conversion in and out of the pipeline's mention model.
//! Recoverable input problems (a continuation tag with no opening tag,
//! inconsistent types across one mention's tokens) warn and continue;
//! corrupted invariants (malformed annotations, span/text length
//! mismatches) abort the batch with a typed error.

pub mod bio;
pub mod tab;

pub use bio::read_bio;
pub use tab::{add_run_ids, corpus_rows, read_tab, render};
