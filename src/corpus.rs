//! Corpus container and the NIL entity arena.
//!
//! A [`Corpus`] is an *ordered* sequence of documents, each an ordered
//! sequence of mentions. Every "encounter order" in clustering and
//! propagation derives from this order, so results are deterministic
//! given deterministic input ordering.

use crate::mention::{Mention, NilId, Resolution};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A document with its linked mentions.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Document {
    /// Document identifier.
    pub id: String,
    /// Mentions in document order.
    pub mentions: Vec<Mention>,
}

impl Document {
    /// Create an empty document.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            mentions: Vec::new(),
        }
    }

    /// Add mentions to the document.
    #[must_use]
    pub fn with_mentions(mut self, mentions: Vec<Mention>) -> Self {
        self.mentions = mentions;
        self
    }
}

/// Address of a mention inside a corpus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MentionKey {
    /// Document index in corpus order.
    pub doc: usize,
    /// Mention index within the document.
    pub mention: usize,
}

/// A synthetic entity representing one NIL cluster.
///
/// Shared by every mention assigned to the cluster: mentions hold a
/// [`NilId`] into the corpus arena, so relabeling the entry is visible
/// everywhere at once.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NilEntity {
    /// Synthetic identifier of the form `NIL<7-digit sequence>`.
    pub label: String,
    /// Fixed at 1.0 for NIL assignments.
    pub confidence: f64,
}

/// Arena of NIL entities indexed by [`NilId`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(from = "Vec<NilEntity>", into = "Vec<NilEntity>")]
pub struct NilTable {
    entries: Vec<NilEntity>,
    index: HashMap<String, NilId>,
}

impl From<Vec<NilEntity>> for NilTable {
    fn from(entries: Vec<NilEntity>) -> Self {
        let index = entries
            .iter()
            .enumerate()
            .map(|(id, e)| (e.label.clone(), id))
            .collect();
        Self { entries, index }
    }
}

impl From<NilTable> for Vec<NilEntity> {
    fn from(table: NilTable) -> Self {
        table.entries
    }
}

impl NilTable {
    /// Create an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the id for a label, creating the entity on first sight.
    pub fn intern(&mut self, label: &str) -> NilId {
        if let Some(&id) = self.index.get(label) {
            return id;
        }
        let id = self.entries.len();
        self.entries.push(NilEntity {
            label: label.to_string(),
            confidence: 1.0,
        });
        self.index.insert(label.to_string(), id);
        id
    }

    /// Get an entity by id.
    #[must_use]
    pub fn get(&self, id: NilId) -> Option<&NilEntity> {
        self.entries.get(id)
    }

    /// Get an entity's label by id.
    #[must_use]
    pub fn label(&self, id: NilId) -> Option<&str> {
        self.entries.get(id).map(|e| e.label.as_str())
    }

    /// Rename an entity; every mention holding its id sees the new label.
    pub fn relabel(&mut self, id: NilId, label: impl Into<String>) {
        let label = label.into();
        if let Some(entry) = self.entries.get_mut(id) {
            self.index.remove(&entry.label);
            self.index.insert(label.clone(), id);
            entry.label = label;
        }
    }

    /// Number of distinct NIL entities.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if no NIL entity exists.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate entities in id order.
    pub fn iter(&self) -> impl Iterator<Item = &NilEntity> {
        self.entries.iter()
    }

    /// Drop all entities. Run between independent corpus batches.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.index.clear();
    }
}

/// An ordered collection of documents plus the NIL arena for the batch.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Corpus {
    documents: Vec<Document>,
    nils: NilTable,
}

impl Corpus {
    /// Create an empty corpus.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a document; corpus order is insertion order.
    pub fn add_document(&mut self, document: Document) {
        self.documents.push(document);
    }

    /// Group a flat mention list into documents by `doc_id`, documents
    /// ordered by first appearance, mentions in input order.
    #[must_use]
    pub fn from_mentions(mentions: Vec<Mention>) -> Self {
        let mut corpus = Corpus::new();
        let mut index: HashMap<String, usize> = HashMap::new();
        for mention in mentions {
            let slot = match index.get(&mention.doc_id) {
                Some(&i) => i,
                None => {
                    index.insert(mention.doc_id.clone(), corpus.documents.len());
                    corpus.documents.push(Document::new(mention.doc_id.clone()));
                    corpus.documents.len() - 1
                }
            };
            corpus.documents[slot].mentions.push(mention);
        }
        corpus
    }

    /// Documents in corpus order.
    #[must_use]
    pub fn documents(&self) -> &[Document] {
        &self.documents
    }

    /// Mutable documents in corpus order.
    pub fn documents_mut(&mut self) -> &mut [Document] {
        &mut self.documents
    }

    /// Look up a document by identifier.
    #[must_use]
    pub fn get_document(&self, id: &str) -> Option<&Document> {
        self.documents.iter().find(|d| d.id == id)
    }

    /// Iterate all mentions in corpus order with their addresses.
    pub fn mentions(&self) -> impl Iterator<Item = (MentionKey, &Mention)> {
        self.documents.iter().enumerate().flat_map(|(d, doc)| {
            doc.mentions
                .iter()
                .enumerate()
                .map(move |(m, mention)| (MentionKey { doc: d, mention: m }, mention))
        })
    }

    /// Get a mention by address.
    #[must_use]
    pub fn mention(&self, key: MentionKey) -> Option<&Mention> {
        self.documents.get(key.doc)?.mentions.get(key.mention)
    }

    /// Get a mutable mention by address.
    pub fn mention_mut(&mut self, key: MentionKey) -> Option<&mut Mention> {
        self.documents.get_mut(key.doc)?.mentions.get_mut(key.mention)
    }

    /// The NIL arena.
    #[must_use]
    pub fn nils(&self) -> &NilTable {
        &self.nils
    }

    /// Mutable NIL arena.
    pub fn nils_mut(&mut self) -> &mut NilTable {
        &mut self.nils
    }

    /// The identifier a mention currently resolves to: a KB id, or the
    /// label of its NIL cluster. `None` while unresolved.
    #[must_use]
    pub fn resolution_label(&self, key: MentionKey) -> Option<&str> {
        match self.mention(key)?.resolution.as_ref()? {
            Resolution::Kb(c) => Some(c.kb_id.as_str()),
            Resolution::Nil(id) => self.nils.label(*id),
        }
    }

    /// Total mention count.
    #[must_use]
    pub fn mention_count(&self) -> usize {
        self.documents.iter().map(|d| d.mentions.len()).sum()
    }
}
