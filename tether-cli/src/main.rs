//! tether - Entity Linking CLI
//!
//! Resolve entity mentions in annotated documents against a JSON
//! knowledge base, cluster the rest as NIL, and emit TAC-style tab
//! rows.
//!
//! # Usage
//!
//! ```bash
//! # Link a BIO-tagged file against a KB, with context reranking
//! tether link input.bio --kb kb.json --embeddings emb.json --context
//!
//! # Non-native-language input with a translation dictionary
//! tether link input.bio --kb kb.json --lang spa --translations dict.json
//!
//! # Cluster NIL mentions in a pre-linked tab run, then propagate
//! tether cluster run.tab --designators org_suffixes.txt --propagate
//! ```
//!
//! # Store file formats
//!
//! - `--kb`: `{"mentions": {"apple": [["apple_inc", 0.7]]},
//!   "types": {"apple_inc": "ORG"}}`
//! - `--embeddings`: `{"vectors": {"computer": [0.1, 0.9]}}`
//! - `--projection`: `{"weights": [[...]], "bias": [...]}`
//!   (defaults to the identity map at the embedding dimension)
//! - `--translations`: `{"languages": {"spa": {"manzana":
//!   [["apple", 2.0]]}}}`

use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand, ValueEnum};
use tether::{
    ingest, CandidateStore, Corpus, Error, MemoryEmbeddings, MemoryKb, MemoryTranslations,
    Mention, Projection, Ranker, RankingSignal, Result, Translator, VectorSpace, NATIVE_LANG,
};
use tether_coalesce::{NilClusterer, Resources};

/// Entity linking and NIL clustering over annotated documents.
#[derive(Parser)]
#[command(name = "tether", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

/// Input annotation format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum InputFormat {
    /// BIO-tagged text (`token docid:beg-end … B-TYPE`).
    Bio,
    /// TAC tab-separated rows.
    Tab,
}

#[derive(Subcommand)]
enum Command {
    /// Link mentions against a knowledge base and cluster the rest.
    Link {
        /// Input file.
        input: PathBuf,
        /// Input format.
        #[arg(long, value_enum, default_value_t = InputFormat::Bio)]
        format: InputFormat,
        /// Knowledge-base tables (JSON).
        #[arg(long)]
        kb: PathBuf,
        /// Embedding store (JSON); enables context similarity.
        #[arg(long)]
        embeddings: Option<PathBuf>,
        /// Context-vector projection (JSON).
        #[arg(long)]
        projection: Option<PathBuf>,
        /// Key prefix for entity-vector lookups.
        #[arg(long, default_value = "")]
        entity_prefix: String,
        /// Language of the input mentions.
        #[arg(long, default_value = NATIVE_LANG)]
        lang: String,
        /// Translation dictionary (JSON), used for non-native input.
        #[arg(long)]
        translations: Option<PathBuf>,
        /// Enable the context-similarity ranking signal.
        #[arg(long)]
        context: bool,
        /// Candidate retrieval limit per surface form.
        #[arg(long, default_value_t = 10)]
        limit: usize,
        #[command(flatten)]
        clustering: ClusteringArgs,
        #[command(flatten)]
        output: OutputArgs,
    },
    /// NIL-cluster a pre-linked tab run.
    Cluster {
        /// Input tab file.
        input: PathBuf,
        /// Column holding `|`-separated translation glosses.
        #[arg(long)]
        translations_column: Option<usize>,
        #[command(flatten)]
        clustering: ClusteringArgs,
        #[command(flatten)]
        output: OutputArgs,
    },
}

#[derive(Debug, clap::Args)]
struct ClusteringArgs {
    /// Designator word list (one per line).
    #[arg(long)]
    designators: Option<PathBuf>,
    /// Stop-word set (JSON array).
    #[arg(long)]
    stop_words: Option<PathBuf>,
    /// Manual synonym groups (JSON array of arrays).
    #[arg(long)]
    groups: Option<PathBuf>,
    /// Run the majority-vote propagation pass after clustering.
    #[arg(long)]
    propagate: bool,
}

#[derive(Debug, clap::Args)]
struct OutputArgs {
    /// Write tab rows here instead of stdout.
    #[arg(long)]
    output: Option<PathBuf>,
    /// Stamp rows with this run identifier (and mention ids).
    #[arg(long)]
    run_id: Option<String>,
    /// Prefix for stamped mention identifiers.
    #[arg(long, default_value = "tether")]
    mention_prefix: String,
    /// Append the translations column.
    #[arg(long)]
    add_translations: bool,
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    match run(Cli::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Link {
            input,
            format,
            kb,
            embeddings,
            projection,
            entity_prefix,
            lang,
            translations,
            context,
            limit,
            clustering,
            output,
        } => {
            let mut mentions = read_input(&input, format)?;
            let store_kb: MemoryKb = load_json(&kb)?;
            let embedding_store: MemoryEmbeddings = match &embeddings {
                Some(path) => load_json(path)?,
                None => MemoryEmbeddings::new(),
            };
            let projection = match &projection {
                Some(path) => load_json(path)?,
                None => Projection::identity(embedding_store.dimension().unwrap_or(0)),
            };
            let vectors = Arc::new(
                VectorSpace::new(embedding_store, projection).with_entity_prefix(entity_prefix),
            );
            let candidates = CandidateStore::new(store_kb, Arc::clone(&vectors)).with_limit(limit);
            let ranker = Ranker::new(vectors);

            let translator = match &translations {
                Some(path) => Some(Translator::new(load_json::<MemoryTranslations>(path)?)),
                None => None,
            };

            let signals: &[RankingSignal] = if context {
                &[RankingSignal::ContextSimilarity]
            } else {
                &[]
            };

            let mut linked = 0usize;
            for mention in mentions.iter_mut() {
                if lang != NATIVE_LANG && mention.translations.is_empty() {
                    if let Some(translator) = &translator {
                        mention.translations = translator.glosses(&mention.text, &lang);
                    }
                }
                candidates.attach_candidates(mention, &lang);
                ranker.rank(mention, signals);
                if mention.is_resolved() {
                    linked += 1;
                }
            }
            log::info!("linked {linked}/{} mentions to the KB", mentions.len());

            let mut corpus = Corpus::from_mentions(mentions);
            run_clustering(&mut corpus, &clustering)?;
            emit(&corpus, &output)
        }
        Command::Cluster {
            input,
            translations_column,
            clustering,
            output,
        } => {
            let data = fs::read_to_string(&input)?;
            let mentions = ingest::read_tab(&data, translations_column)?;
            let mut corpus = Corpus::from_mentions(mentions);
            run_clustering(&mut corpus, &clustering)?;
            emit(&corpus, &output)
        }
    }
}

fn read_input(path: &Path, format: InputFormat) -> Result<Vec<Mention>> {
    let data = fs::read_to_string(path)?;
    match format {
        InputFormat::Bio => ingest::read_bio(&data),
        InputFormat::Tab => ingest::read_tab(&data, None),
    }
}

fn load_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let data = fs::read_to_string(path)?;
    serde_json::from_str(&data)
        .map_err(|e| Error::config(format!("{}: {e}", path.display())))
}

fn run_clustering(corpus: &mut Corpus, args: &ClusteringArgs) -> Result<()> {
    let mut resources = Resources::new();
    if let Some(path) = &args.designators {
        resources.load_designators(path)?;
    }
    if let Some(path) = &args.stop_words {
        resources.load_stop_words(path)?;
    }
    if let Some(path) = &args.groups {
        resources.load_groups(path)?;
    }

    NilClusterer::new()
        .with_resources(resources)
        .with_propagation(args.propagate)
        .cluster(corpus);
    Ok(())
}

fn emit(corpus: &Corpus, args: &OutputArgs) -> Result<()> {
    let mut rows = ingest::corpus_rows(corpus, args.add_translations);
    if let Some(run_id) = &args.run_id {
        ingest::add_run_ids(&mut rows, run_id, &args.mention_prefix);
    }
    let rendered = ingest::render(&rows);
    match &args.output {
        Some(path) => fs::write(path, rendered)?,
        None => print!("{rendered}"),
    }
    Ok(())
}
