// Copyright 2025-present Harīṣh Tummalachērla
// SPDX-License-Identifier: Apache-2.0

//! Terminal display utilities for the lutra CLI.
//!
//! ANSI color only when stdout is a TTY and `NO_COLOR` is unset, so piping
//! into files and pagers stays clean. Relevance buckets get the traffic-light
//! treatment: HIGH green, MEDIUM yellow, LOW dim.

use std::sync::OnceLock;

use lutra::RelevanceBucket;

static COLOR: OnceLock<bool> = OnceLock::new();

/// Whether to emit ANSI escapes at all.
pub fn color_enabled() -> bool {
    *COLOR.get_or_init(|| std::env::var_os("NO_COLOR").is_none() && atty::is(atty::Stream::Stdout))
}

fn paint(text: &str, code: &str) -> String {
    if color_enabled() {
        format!("\x1b[{code}m{text}\x1b[0m")
    } else {
        text.to_owned()
    }
}

pub fn dim(text: &str) -> String {
    paint(text, "2")
}

pub fn bold(text: &str) -> String {
    paint(text, "1")
}

pub fn error(text: &str) -> String {
    paint(text, "31")
}

/// Fixed-width colored badge for a relevance bucket.
pub fn bucket_badge(bucket: RelevanceBucket) -> String {
    match bucket {
        RelevanceBucket::High => paint("HIGH  ", "32"),
        RelevanceBucket::Medium => paint("MEDIUM", "33"),
        RelevanceBucket::Low => dim("LOW   "),
    }
}
