// Copyright 2025-present Harīṣh Tummalachērla
// SPDX-License-Identifier: Apache-2.0

//! CLI definitions for the lutra command-line interface.
//!
//! Four subcommands: `index` to build an index from a corpus, `search` to
//! query it with relevance buckets, `filter` to force-apply a saved rule to
//! its matching hits, and `inspect` to examine index state and pending
//! maintenance flags.

pub mod display;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "lutra",
    about = "Search and filter engine for feed-reader entities",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Build the search index from a JSONL corpus of entities
    Index {
        /// Corpus file, one entity JSON object per line
        #[arg(short, long)]
        corpus: String,

        /// Index directory
        #[arg(short, long)]
        dir: String,
    },

    /// Search the index and display bucketed results
    Search {
        /// Corpus file backing entity resolution
        #[arg(short, long)]
        corpus: String,

        /// Index directory
        #[arg(short, long)]
        dir: String,

        /// Search text, matched against title and content
        query: String,

        /// Show LOW-relevance hits too (skip the one-shot filter)
        #[arg(long)]
        all: bool,

        /// Maximum number of results to display
        #[arg(short, long, default_value = "25")]
        limit: usize,
    },

    /// Force-apply one saved rule to the entities its query matches
    Filter {
        /// Corpus file backing entity resolution
        #[arg(short, long)]
        corpus: String,

        /// Index directory
        #[arg(short, long)]
        dir: String,

        /// Rules file (JSON array of rule records)
        #[arg(short, long)]
        rules: String,

        /// Id of the rule to apply
        #[arg(long)]
        rule: u64,

        /// Write the mutated corpus back out as JSONL
        #[arg(short, long)]
        output: Option<String>,

        /// Hits per chunk
        #[arg(long, default_value = "50")]
        chunk_size: usize,
    },

    /// Print index statistics and pending maintenance flags
    Inspect {
        /// Corpus file backing entity resolution
        #[arg(short, long)]
        corpus: String,

        /// Index directory
        #[arg(short, long)]
        dir: String,
    },
}
