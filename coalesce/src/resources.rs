//! Clustering resources: designators, stop words, manual groups.
//!
//! All three are optional. An empty resource set degrades to "no
//! filtering" / "no grouping"; the pipeline runs unchanged.

use std::collections::HashSet;
use std::fs;
use std::path::Path;
use tether::{Error, Result};

/// Externally supplied clustering configuration.
#[derive(Debug, Clone, Default)]
pub struct Resources {
    /// Organizational designator tokens stripped during normalization
    /// (e.g. "inc", "corp"). Lowercased.
    pub designators: HashSet<String>,
    /// Stop words stripped during normalization. Lowercased.
    pub stop_words: HashSet<String>,
    /// Manual synonym groups; each group's first element keys the
    /// collapsed cluster. Entries match lowercased cluster texts.
    pub groups: Vec<Vec<String>>,
}

impl Resources {
    /// Create an empty resource set (no filtering, no grouping).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set designators from an iterator, lowercasing each.
    #[must_use]
    pub fn with_designators<I, S>(mut self, designators: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.designators = designators
            .into_iter()
            .map(|d| d.as_ref().to_lowercase())
            .collect();
        self
    }

    /// Set stop words from an iterator, lowercasing each.
    #[must_use]
    pub fn with_stop_words<I, S>(mut self, stop_words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.stop_words = stop_words
            .into_iter()
            .map(|w| w.as_ref().to_lowercase())
            .collect();
        self
    }

    /// Set manual synonym groups.
    #[must_use]
    pub fn with_groups(mut self, groups: Vec<Vec<String>>) -> Self {
        self.groups = groups;
        self
    }

    /// Load designators from a plain text file, one per line.
    pub fn load_designators(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let data = fs::read_to_string(path)?;
        for line in data.lines() {
            let designator = line.trim().to_lowercase();
            if !designator.is_empty() {
                self.designators.insert(designator);
            }
        }
        Ok(())
    }

    /// Load stop words from a JSON array of strings.
    pub fn load_stop_words(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let data = fs::read_to_string(&path)?;
        let words: Vec<String> = serde_json::from_str(&data)
            .map_err(|e| Error::config(format!("bad stop-word file: {e}")))?;
        self.stop_words.extend(words.into_iter().map(|w| w.to_lowercase()));
        Ok(())
    }

    /// Load synonym groups from a JSON array of string arrays.
    pub fn load_groups(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let data = fs::read_to_string(&path)?;
        let groups: Vec<Vec<String>> = serde_json::from_str(&data)
            .map_err(|e| Error::config(format!("bad group file: {e}")))?;
        self.groups.extend(groups);
        Ok(())
    }

    /// True when a token should be dropped during normalization.
    #[must_use]
    pub fn is_filtered(&self, token: &str) -> bool {
        self.stop_words.contains(token) || self.designators.contains(token)
    }
}
