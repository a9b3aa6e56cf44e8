//! End-to-end linking tests over in-memory stores.

use std::sync::Arc;
use tether::{
    CandidateStore, EntityType, Feature, MemoryEmbeddings, MemoryKb, MemoryTranslations,
    Mention, Projection, Ranker, RankingSignal, Translator, VectorSpace, NATIVE_LANG,
};

fn apple_kb() -> MemoryKb {
    let mut kb = MemoryKb::new();
    kb.insert_surface(
        "apple",
        vec![
            ("apple_inc".to_string(), 0.7),
            ("apple_fruit".to_string(), 0.3),
        ],
    );
    kb.insert_type("apple_inc", "ORG");
    kb.insert_type("apple_fruit", "MISC");
    kb
}

fn apple_embeddings() -> MemoryEmbeddings {
    [
        ("computer", vec![1.0, 0.0]),
        ("company", vec![0.9, 0.1]),
        ("apple_inc", vec![1.0, 0.0]),
        ("apple_fruit", vec![0.0, 1.0]),
    ]
    .into_iter()
    .collect()
}

fn pipeline(
    kb: MemoryKb,
    embeddings: MemoryEmbeddings,
) -> (
    CandidateStore<MemoryKb, MemoryEmbeddings>,
    Ranker<MemoryEmbeddings>,
) {
    let vectors = Arc::new(VectorSpace::new(embeddings, Projection::identity(2)));
    (
        CandidateStore::new(kb, Arc::clone(&vectors)),
        Ranker::new(vectors),
    )
}

#[test]
fn apple_with_computer_context_resolves_to_the_company() {
    let (store, ranker) = pipeline(apple_kb(), apple_embeddings());

    let mut mention = Mention::new("Apple")
        .with_tokens(vec!["Apple".to_string()])
        .with_context(
            "is a computer company"
                .split(' ')
                .map(str::to_string)
                .collect(),
        )
        .with_type(EntityType::Organization);
    store.attach_candidates(&mut mention, NATIVE_LANG);
    ranker.rank(&mut mention, &[RankingSignal::ContextSimilarity]);

    let resolved = mention.resolved_kb().expect("candidates exist");
    assert_eq!(resolved.kb_id, "apple_inc");
    assert!(resolved.confidence > 0.5);
    assert!(mention.context_vector.is_some());
}

#[test]
fn empty_candidate_list_leaves_mention_unresolved() {
    let (store, ranker) = pipeline(apple_kb(), apple_embeddings());

    let mut mention = Mention::new("Zorblatt").with_type(EntityType::Organization);
    store.attach_candidates(&mut mention, NATIVE_LANG);
    ranker.rank(&mut mention, &[RankingSignal::ContextSimilarity]);

    assert!(mention.candidates.is_empty());
    assert!(!mention.is_resolved());
}

#[test]
fn confidences_form_a_sorted_distribution() {
    let (store, ranker) = pipeline(apple_kb(), apple_embeddings());

    let mut mention = Mention::new("Apple")
        .with_tokens(vec!["Apple".to_string()])
        .with_context(vec!["computer".to_string()])
        .with_type(EntityType::Organization);
    store.attach_candidates(&mut mention, NATIVE_LANG);
    ranker.rank(&mut mention, &[RankingSignal::ContextSimilarity]);

    let total: f64 = mention.candidates.iter().map(|c| c.confidence).sum();
    assert!((total - 1.0).abs() < 1e-9);
    for pair in mention.candidates.windows(2) {
        assert!(pair[0].confidence >= pair[1].confidence);
    }
}

#[test]
fn mismatched_type_never_wins_on_raw_commonness() {
    // PER mention; the ORG candidate has the larger prior but must be
    // damped below the sole PER candidate's within-type salience.
    let mut kb = MemoryKb::new();
    kb.insert_surface(
        "jordan",
        vec![
            ("jordan_org".to_string(), 0.9),
            ("jordan_per".to_string(), 0.8),
        ],
    );
    kb.insert_type("jordan_org", "ORG");
    kb.insert_type("jordan_per", "PER");
    let (store, ranker) = pipeline(kb, MemoryEmbeddings::new());

    let mut mention = Mention::new("Jordan").with_type(EntityType::Person);
    store.attach_candidates(&mut mention, NATIVE_LANG);
    ranker.rank(&mut mention, &[]);

    assert_eq!(mention.candidates[0].kb_id, "jordan_per");
    let org = mention
        .candidates
        .iter()
        .find(|c| c.kb_id == "jordan_org")
        .unwrap();
    assert!((org.feature(Feature::Salience) - 0.27).abs() < 1e-9);
}

#[test]
fn translated_mention_merges_gloss_lookups() {
    let mut kb = apple_kb();
    kb.insert_surface("pome", vec![("apple_fruit".to_string(), 0.4)]);

    let mut translations = MemoryTranslations::new();
    translations.insert("spa", "manzana", "apple", 2.0);
    translations.insert("spa", "manzana", "pome", 1.0);
    let translator = Translator::new(translations);

    let (store, ranker) = pipeline(kb, apple_embeddings());

    let mut mention = Mention::new("Manzana").with_type(EntityType::Organization);
    mention.translations = translator.glosses("manzana", "spa");
    assert_eq!(mention.translations, vec!["apple", "pome"]);

    store.attach_candidates(&mut mention, "spa");
    ranker.rank(&mut mention, &[]);

    // apple_fruit accumulates prior mass from both glosses.
    let fruit = mention
        .candidates
        .iter()
        .find(|c| c.kb_id == "apple_fruit")
        .unwrap();
    assert!((fruit.feature(Feature::Commonness) - 0.7 / 1.4).abs() < 1e-9);
    let total: f64 = mention
        .candidates
        .iter()
        .map(|c| c.feature(Feature::Commonness))
        .sum();
    assert!((total - 1.0).abs() < 1e-9);
}

#[test]
fn translated_mention_without_gloss_hits_falls_back_to_surface() {
    let mut kb = MemoryKb::new();
    kb.insert_surface("tokio", vec![("tokyo".to_string(), 1.0)]);
    let (store, ranker) = pipeline(kb, MemoryEmbeddings::new());

    let mut mention = Mention::new("Tokio")
        .with_translations(vec!["unknown-gloss".to_string()]);
    store.attach_candidates(&mut mention, "spa");
    ranker.rank(&mut mention, &[]);

    assert_eq!(mention.resolved_kb().unwrap().kb_id, "tokyo");
}

#[test]
fn ranking_is_reproducible_across_identical_mentions() {
    let (store, ranker) = pipeline(apple_kb(), apple_embeddings());

    let build = || {
        Mention::new("Apple")
            .with_tokens(vec!["Apple".to_string()])
            .with_context(vec!["computer".to_string(), "company".to_string()])
            .with_type(EntityType::Organization)
    };
    let mut first = build();
    let mut second = build();
    store.attach_candidates(&mut first, NATIVE_LANG);
    ranker.rank(&mut first, &[RankingSignal::ContextSimilarity]);
    store.attach_candidates(&mut second, NATIVE_LANG);
    ranker.rank(&mut second, &[RankingSignal::ContextSimilarity]);

    assert_eq!(first.candidates, second.candidates);
    assert_eq!(first.resolution, second.resolution);
}
