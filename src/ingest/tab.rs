//! Tab-separated run format (TAC-style) reader and writer.
//!
//! Row layout: `runid  mentionid  mention  docid:beg-end  kbid  etype
//! mtype  confidence [translations]`. The writer emits the columns from
//! `mention` onward; [`add_run_ids`] stamps the first two.

use crate::corpus::{Corpus, NilTable};
use crate::error::{Error, Result};
use crate::mention::{Candidate, EntityType, Mention, Resolution};
use once_cell::sync::Lazy;
use regex::Regex;

static OFFSET: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(.+):(\d+)-(\d+)$").expect("valid offset regex"));

/// Read a tab-separated run into mentions.
///
/// `translations_column` selects an optional glosses column
/// (`|`-separated; `NULL` or empty means none). A `kbid` of `NIL` or
/// `-1` leaves the mention unresolved; any other value (including
/// `NIL`-prefixed cluster labels from a previous run) is carried as a
/// pre-resolved identifier.
pub fn read_tab(data: &str, translations_column: Option<usize>) -> Result<Vec<Mention>> {
    let mut mentions = Vec::new();

    for line in data.lines().filter(|l| !l.is_empty()) {
        let fields: Vec<&str> = line.split('\t').collect();
        if fields.len() < 8 {
            return Err(Error::parse(format!("short tab row {line:?}")));
        }

        let caps = OFFSET
            .captures(fields[3])
            .ok_or_else(|| Error::parse(format!("bad offset {:?} in row {line:?}", fields[3])))?;
        let doc_id = caps[1].to_string();
        let begin: usize = caps[2]
            .parse()
            .map_err(|_| Error::parse(format!("bad begin offset in row {line:?}")))?;
        let end: usize = caps[3]
            .parse()
            .map_err(|_| Error::parse(format!("bad end offset in row {line:?}")))?;
        let confidence: f64 = fields[7]
            .parse()
            .map_err(|_| Error::parse(format!("bad confidence in row {line:?}")))?;

        let kbid = fields[4];
        let resolution = if kbid == "NIL" || kbid == "-1" {
            None
        } else {
            let mut candidate = Candidate::new(kbid);
            candidate.confidence = confidence;
            Some(Resolution::Kb(candidate))
        };

        let translations = translations_column
            .and_then(|col| fields.get(col))
            .filter(|v| !v.is_empty() && **v != "NULL")
            .map(|v| v.trim().split('|').map(str::to_string).collect())
            .unwrap_or_default();

        let mut mention = Mention::new(fields[2])
            .with_span(begin, end)
            .with_doc(doc_id)
            .with_translations(translations);
        mention.entity_type = match fields[5] {
            "" => None,
            label => Some(EntityType::from_label(label)),
        };
        mention.resolution = resolution;
        mentions.push(mention);
    }

    Ok(mentions)
}

fn clean_cell(text: &str) -> String {
    text.replace(['\t', '\n', '\r'], " ")
}

fn resolution_cells(mention: &Mention, nils: &NilTable) -> (String, String) {
    match &mention.resolution {
        None => ("NIL".to_string(), "1.0".to_string()),
        Some(Resolution::Nil(id)) => (
            nils.label(*id).unwrap_or("NIL").to_string(),
            "1.0".to_string(),
        ),
        Some(Resolution::Kb(candidate)) => (
            candidate.kb_id.clone(),
            format!("{:.16}", candidate.confidence),
        ),
    }
}

fn mention_rows(
    mention: &Mention,
    nils: &NilTable,
    add_translations: bool,
) -> Vec<Vec<String>> {
    let (kbid, confidence) = resolution_cells(mention, nils);
    let offset = format!("{}:{}-{}", mention.doc_id, mention.begin, mention.end);
    let etype = mention
        .entity_type
        .as_ref()
        .map(|t| t.as_label().to_string())
        .unwrap_or_default();

    let mut row = vec![
        clean_cell(&mention.text),
        offset,
        kbid.clone(),
        etype.clone(),
        "NAM".to_string(),
        confidence.clone(),
    ];
    if add_translations {
        row.push(mention.translations.join("|"));
    }

    let mut rows = vec![row];
    for nominal in &mention.nominals {
        let mut row = vec![
            clean_cell(&nominal.text),
            format!("{}:{}-{}", mention.doc_id, nominal.begin, nominal.end),
            kbid.clone(),
            etype.clone(),
            nominal.kind.clone(),
            confidence.clone(),
        ];
        if add_translations {
            row.push(mention.translations.join("|"));
        }
        rows.push(row);
    }
    rows
}

/// Emit tab rows for a whole corpus, documents ordered by identifier.
#[must_use]
pub fn corpus_rows(corpus: &Corpus, add_translations: bool) -> Vec<Vec<String>> {
    let mut documents: Vec<_> = corpus.documents().iter().collect();
    documents.sort_by(|a, b| a.id.cmp(&b.id));

    let mut rows = Vec::new();
    for document in documents {
        for mention in &document.mentions {
            rows.extend(mention_rows(mention, corpus.nils(), add_translations));
        }
    }
    rows
}

/// Prepend the run identifier and a dense zero-padded mention id to
/// every row.
pub fn add_run_ids(rows: &mut [Vec<String>], run_id: &str, prefix: &str) {
    let prefix = prefix.replace(' ', "_");
    for (n, row) in rows.iter_mut().enumerate() {
        row.insert(0, format!("{prefix}_MENTION_{n:07}"));
        row.insert(0, run_id.to_string());
    }
}

/// Render rows as tab-separated lines.
#[must_use]
pub fn render(rows: &[Vec<String>]) -> String {
    let mut out = String::new();
    for row in rows {
        out.push_str(&row.join("\t"));
        out.push('\n');
    }
    out
}
