// Copyright 2025-present Harīṣh Tummalachērla
// SPDX-License-Identifier: Apache-2.0

use std::fs;
use std::io::{BufRead, BufReader, Write};
use std::sync::Arc;

use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};

use lutra::{
    ActionRegistry, BatchOutcome, BatchRuleExecutor, CancelToken, Entity, EntityResolver, FieldId,
    FilterStore, Hit, InMemoryStore, LowScoreFilter, MaintenanceOutcome, MatchMode, Progress,
    Query, QueryExecutor, Rule, SearchCondition, SearchIndex, Specifier,
};

mod cli;
use cli::display;
use cli::{Cli, Commands};

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Index { corpus, dir } => run_index(&corpus, &dir),
        Commands::Search {
            corpus,
            dir,
            query,
            all,
            limit,
        } => run_search(&corpus, &dir, &query, all, limit),
        Commands::Filter {
            corpus,
            dir,
            rules,
            rule,
            output,
            chunk_size,
        } => run_filter(&corpus, &dir, &rules, rule, output.as_deref(), chunk_size),
        Commands::Inspect { corpus, dir } => run_inspect(&corpus, &dir),
    };

    if let Err(message) = result {
        eprintln!("{} {}", display::error("error:"), message);
        std::process::exit(1);
    }
}

// =============================================================================
// COMMANDS
// =============================================================================

fn run_index(corpus: &str, dir: &str) -> Result<(), String> {
    let store = load_corpus(corpus)?;
    let index = open_index(dir, &store)?;

    let progress = Arc::new(BarProgress::new("Indexing"));
    let handle = index
        .spawn_reindex_all(progress, CancelToken::new())
        .map_err(|e| e.to_string())?;
    let outcome = handle.join().map_err(|e| e.to_string())?;

    index.shutdown(false).map_err(|e| e.to_string())?;

    let stats = index.stats();
    match outcome {
        MaintenanceOutcome::Completed { processed } => {
            println!(
                "indexed {} of {} entities, {} terms",
                stats.entry_count, processed, stats.term_count
            );
        }
        MaintenanceOutcome::Canceled { processed } => {
            println!("canceled after {processed} entities; rebuild resumes on next startup");
        }
    }
    Ok(())
}

fn run_search(corpus: &str, dir: &str, text: &str, all: bool, limit: usize) -> Result<(), String> {
    let store = load_corpus(corpus)?;
    let index = open_index(dir, &store)?;

    let (query, _warnings) = Query::build(
        vec![
            SearchCondition::text(FieldId::Title, Specifier::Contains, text),
            SearchCondition::text(FieldId::Content, Specifier::Contains, text),
        ],
        MatchMode::Any,
    )
    .map_err(|e| e.to_string())?;

    let hits = QueryExecutor::new(index.clone())
        .execute(&query)
        .map_err(|e| e.to_string())?;
    let tiers = lutra::RelevanceTiers::from_hits(&hits);

    let mut filter = LowScoreFilter::new();
    if all {
        // Burn the one shot so everything shows.
        filter.apply(&[], &tiers);
    }
    let view = filter.apply(&hits, &tiers);

    for hit in view.visible.iter().take(limit) {
        let title = store
            .get(hit.entity_id)
            .map(|e| e.title)
            .unwrap_or_else(|| "<unresolved>".into());
        println!(
            "{} {:>7.2}  {}",
            display::bucket_badge(tiers.bucket_of(hit)),
            hit.raw_score,
            title
        );
    }
    if view.visible.len() > limit {
        println!("{}", display::dim(&format!("... {} more", view.visible.len() - limit)));
    }
    if view.suppressed > 0 {
        println!(
            "{}",
            display::dim(&format!("{} low-relevance hits filtered", view.suppressed))
        );
    }

    index.shutdown(false).map_err(|e| e.to_string())?;
    Ok(())
}

fn run_filter(
    corpus: &str,
    dir: &str,
    rules_path: &str,
    rule_id: u64,
    output: Option<&str>,
    chunk_size: usize,
) -> Result<(), String> {
    let store = load_corpus(corpus)?;
    let index = open_index(dir, &store)?;

    let registry = Arc::new(ActionRegistry::with_defaults());
    let rules: Vec<Rule> = serde_json::from_str(
        &fs::read_to_string(rules_path).map_err(|e| format!("reading {rules_path}: {e}"))?,
    )
    .map_err(|e| format!("parsing {rules_path}: {e}"))?;
    let filters = FilterStore::from_rules(registry.clone(), rules);
    let rule = filters
        .get(rule_id)
        .ok_or_else(|| format!("no rule with id {rule_id}"))?
        .clone();

    let executor = QueryExecutor::new(index.clone());
    let hits: Vec<Hit> = match &rule.query {
        Some(query) => executor.execute(query).map_err(|e| e.to_string())?,
        None => all_visible_hits(&store),
    };
    println!("{} hits for rule '{}'", hits.len(), rule.name);

    let batch = BatchRuleExecutor::new(store.clone(), store.clone(), registry)
        .with_chunk_size(chunk_size);
    let progress = Arc::new(BarProgress::new("Applying"));
    let handle = batch
        .spawn_run(rule, hits, progress, CancelToken::new())
        .map_err(|e| e.to_string())?;

    match handle.join().map_err(|e| e.to_string())? {
        BatchOutcome::NothingToRun => println!("rule has no forcible actions; nothing to run"),
        BatchOutcome::Completed {
            persisted,
            skipped,
            chunks,
        } => println!("{persisted} entities persisted in {chunks} chunks ({skipped} stale skipped)"),
        BatchOutcome::Canceled {
            persisted, chunks, ..
        } => println!("canceled; {persisted} entities from {chunks} completed chunks persisted"),
    }

    if let Some(path) = output {
        write_corpus(path, &store)?;
        println!("mutated corpus written to {path}");
    }

    index.shutdown(false).map_err(|e| e.to_string())?;
    Ok(())
}

fn run_inspect(corpus: &str, dir: &str) -> Result<(), String> {
    let store = load_corpus(corpus)?;
    let index = open_index(dir, &store)?;

    let stats = index.stats();
    let (reindex, cleanup) = index.pending_flags();
    println!("{}", display::bold("index"));
    println!("  entries            {}", stats.entry_count);
    println!("  terms              {}", stats.term_count);
    println!("  integrity signals  {}", stats.integrity_signals);
    println!("  reindex pending    {reindex}");
    println!("  cleanup pending    {cleanup}");

    index.shutdown(false).map_err(|e| e.to_string())?;
    Ok(())
}

// =============================================================================
// HELPERS
// =============================================================================

fn load_corpus(path: &str) -> Result<Arc<InMemoryStore>, String> {
    let file = fs::File::open(path).map_err(|e| format!("reading {path}: {e}"))?;
    let store = Arc::new(InMemoryStore::new());
    for (number, line) in BufReader::new(file).lines().enumerate() {
        let line = line.map_err(|e| format!("reading {path}: {e}"))?;
        if line.trim().is_empty() {
            continue;
        }
        let entity: Entity = serde_json::from_str(&line)
            .map_err(|e| format!("{path}:{}: {e}", number + 1))?;
        store.put(entity);
    }
    Ok(store)
}

fn write_corpus(path: &str, store: &InMemoryStore) -> Result<(), String> {
    let mut file = fs::File::create(path).map_err(|e| format!("writing {path}: {e}"))?;
    for id in store.entity_ids() {
        if let Some(entity) = store.get(id) {
            let line = serde_json::to_string(&entity).map_err(|e| e.to_string())?;
            writeln!(file, "{line}").map_err(|e| e.to_string())?;
        }
    }
    Ok(())
}

fn open_index(dir: &str, store: &Arc<InMemoryStore>) -> Result<Arc<SearchIndex>, String> {
    let index = SearchIndex::new(dir, store.clone() as Arc<dyn lutra::EntityResolver>);
    index.startup().map_err(|e| e.to_string())?;
    Ok(index)
}

fn all_visible_hits(store: &InMemoryStore) -> Vec<Hit> {
    store
        .entity_ids()
        .into_iter()
        .filter_map(|id| store.get(id))
        .filter(|e| e.state.is_visible())
        .map(|e| Hit::new(e.id, 1.0, e.state))
        .collect()
}

/// Indicatif-backed progress sink.
struct BarProgress {
    bar: ProgressBar,
}

impl BarProgress {
    fn new(prefix: &'static str) -> Self {
        let bar = ProgressBar::new(0);
        bar.set_style(
            ProgressStyle::with_template(
                "{spinner:.cyan} {prefix:<10} [{bar:40.cyan/dim}] {pos}/{len} {msg}",
            )
            .unwrap()
            .progress_chars("━━╸"),
        );
        bar.set_prefix(prefix);
        BarProgress { bar }
    }
}

impl Progress for BarProgress {
    fn begin(&self, total: u64) {
        self.bar.set_length(total);
    }

    fn advance(&self, units: u64) {
        self.bar.inc(units);
    }

    fn message(&self, text: &str) {
        self.bar.set_message(text.to_owned());
    }

    fn done(&self) {
        self.bar.finish_and_clear();
    }
}
