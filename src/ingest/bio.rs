//! BIO-tagged text reader.
//!
//! Input is sentence blocks separated by blank lines; each line is
//! `token docid:beg-end … TAG` where `TAG` is `O` or `B-TYPE`/`I-TYPE`.
//! Character offsets are inclusive, and a mention's surface text is
//! reconstructed from them (inter-token gaps become spaces).

use crate::error::{Error, Result};
use crate::mention::{EntityType, Mention};
use once_cell::sync::Lazy;
use regex::Regex;

static SENTENCE_SPLIT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\n\s*\n").expect("valid sentence-split regex"));
static OFFSET: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(.+):(\d+)-(\d+)$").expect("valid offset regex"));

/// One tagged token inside a mention under construction.
struct TaggedToken {
    text: String,
    doc_id: String,
    begin: usize,
    end: usize,
    entity_type: Option<String>,
}

fn parse_offset(offset: &str, line: &str) -> Result<(String, usize, usize)> {
    let caps = OFFSET
        .captures(offset)
        .ok_or_else(|| Error::parse(format!("bad offset {offset:?} in line {line:?}")))?;
    let doc_id = caps[1].to_string();
    let begin = caps[2]
        .parse()
        .map_err(|_| Error::parse(format!("bad begin offset in line {line:?}")))?;
    let end = caps[3]
        .parse()
        .map_err(|_| Error::parse(format!("bad end offset in line {line:?}")))?;
    Ok((doc_id, begin, end))
}

/// Read BIO-tagged data into mentions.
///
/// Each mention carries its sentence's tokens as context. A `B`-less
/// `I` tag warns and opens a mention anyway; inconsistent entity types
/// across one mention's tokens warn and keep the latest; a surface
/// text that does not match the reconstructed span length is an error.
pub fn read_bio(data: &str) -> Result<Vec<Mention>> {
    let mut mentions = Vec::new();

    for block in SENTENCE_SPLIT.split(data) {
        let lines: Vec<&str> = block.split('\n').filter(|l| !l.is_empty()).collect();
        let mut sentence_mentions: Vec<Vec<TaggedToken>> = Vec::new();
        let mut context: Vec<String> = Vec::new();
        let mut current: Vec<TaggedToken> = Vec::new();

        for line in &lines {
            let fields: Vec<&str> = line.split(' ').collect();
            if fields.len() < 3 {
                return Err(Error::parse(format!("bad annotation line {line:?}")));
            }
            let token = fields[0];
            let (tag, entity_type) = match fields[fields.len() - 1] {
                "O" => ("O", None),
                tagged => {
                    let (tag, etype) = tagged.split_once('-').ok_or_else(|| {
                        Error::parse(format!("bad tag {tagged:?} in line {line:?}"))
                    })?;
                    (tag, Some(etype.to_string()))
                }
            };

            match tag {
                "O" => {
                    if !current.is_empty() {
                        sentence_mentions.push(std::mem::take(&mut current));
                    }
                }
                "B" => {
                    if !current.is_empty() {
                        sentence_mentions.push(std::mem::take(&mut current));
                    }
                    let (doc_id, begin, end) = parse_offset(fields[1], line)?;
                    current.push(TaggedToken {
                        text: token.to_string(),
                        doc_id,
                        begin,
                        end,
                        entity_type,
                    });
                }
                "I" => {
                    if current.is_empty() {
                        log::warn!("No B tag before I tag: {line}, starting mention here");
                    }
                    let (doc_id, begin, end) = parse_offset(fields[1], line)?;
                    current.push(TaggedToken {
                        text: token.to_string(),
                        doc_id,
                        begin,
                        end,
                        entity_type,
                    });
                }
                other => {
                    return Err(Error::parse(format!(
                        "unknown tag {other:?} in line {line:?}"
                    )));
                }
            }

            context.push(token.to_string());
        }
        if !current.is_empty() {
            sentence_mentions.push(current);
        }

        for tokens in sentence_mentions {
            mentions.push(assemble_mention(tokens, &context)?);
        }
    }

    Ok(mentions)
}

fn assemble_mention(tokens: Vec<TaggedToken>, context: &[String]) -> Result<Mention> {
    let mut text = String::new();
    let mut surface_tokens = Vec::new();
    let mut entity_type: Option<String> = None;
    let mut doc_id: Option<String> = None;
    let mut begin = 0;
    let mut end = 0;

    for (i, token) in tokens.iter().enumerate() {
        if i == 0 {
            begin = token.begin;
            text.push_str(&token.text);
        } else {
            let gap = token.begin.saturating_sub(end + 1);
            text.extend(std::iter::repeat(' ').take(gap));
            text.push_str(&token.text);
        }
        surface_tokens.push(token.text.clone());
        end = token.end;

        if let Some(previous) = &entity_type {
            if token.entity_type.as_deref() != Some(previous.as_str()) {
                log::warn!(
                    "Inconsistent entity type: {} {}:{}-{} {:?}, using the latest one",
                    token.text,
                    token.doc_id,
                    token.begin,
                    token.end,
                    token.entity_type
                );
            }
        }
        entity_type = token.entity_type.clone();

        if let Some(previous) = &doc_id {
            if previous != &token.doc_id {
                return Err(Error::parse(format!(
                    "mention spans documents {previous:?} and {:?}",
                    token.doc_id
                )));
            }
        }
        doc_id = Some(token.doc_id.clone());
    }

    let reconstructed = end - begin + 1;
    if text.chars().count() != reconstructed {
        return Err(Error::parse(format!(
            "mention {text:?} length does not match span {begin}-{end}"
        )));
    }

    let mut mention = Mention::new(text)
        .with_span(begin, end)
        .with_doc(doc_id.unwrap_or_default())
        .with_tokens(surface_tokens)
        .with_context(context.to_vec());
    mention.entity_type = entity_type.map(|l| EntityType::from_label(&l));
    Ok(mention)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
John DOC1:0-3 B-PER
Smith DOC1:5-9 I-PER
visited DOC1:11-17 O
Tokyo DOC1:19-23 B-GPE

Apple DOC1:26-30 B-ORG
shares DOC1:32-37 O
";

    #[test]
    fn test_reads_mentions_with_context() {
        let mentions = read_bio(SAMPLE).unwrap();
        assert_eq!(mentions.len(), 3);

        let smith = &mentions[0];
        assert_eq!(smith.text, "John Smith");
        assert_eq!(smith.begin, 0);
        assert_eq!(smith.end, 9);
        assert_eq!(smith.entity_type, Some(EntityType::Person));
        assert_eq!(smith.tokens, vec!["John".to_string(), "Smith".to_string()]);
        assert_eq!(smith.context.len(), 4);

        let apple = &mentions[2];
        assert_eq!(apple.text, "Apple");
        assert_eq!(apple.doc_id, "DOC1");
        assert_eq!(apple.context.len(), 2);
    }

    #[test]
    fn test_i_without_b_is_best_effort() {
        let data = "Smith DOC1:0-4 I-PER\n";
        let mentions = read_bio(data).unwrap();
        assert_eq!(mentions.len(), 1);
        assert_eq!(mentions[0].text, "Smith");
    }

    #[test]
    fn test_length_mismatch_is_an_error() {
        // Span claims 10 characters but the surface has 5.
        let data = "Smith DOC1:0-9 B-PER\n";
        assert!(read_bio(data).is_err());
    }

    #[test]
    fn test_malformed_line_is_an_error() {
        assert!(read_bio("Smith B-PER\n").is_err());
    }

    #[test]
    fn test_cross_document_mention_is_an_error() {
        let data = "John DOC1:0-3 B-PER\nSmith DOC2:5-9 I-PER\n";
        assert!(read_bio(data).is_err());
    }

    #[test]
    fn test_mention_at_sentence_end_is_closed() {
        let data = "met DOC1:0-2 O\nTokyo DOC1:4-8 B-GPE\n";
        let mentions = read_bio(data).unwrap();
        assert_eq!(mentions.len(), 1);
        assert_eq!(mentions[0].text, "Tokyo");
    }
}
