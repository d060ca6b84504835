// Copyright 2025-present Harīṣh Tummalachērla
// SPDX-License-Identifier: Apache-2.0

//! Runs a query against the index and hands back ranked hits.
//!
//! Condition evaluation is set algebra over entity ids. Token conditions
//! (Contains and friends) read posting lists; value conditions (Is, prefix,
//! suffix, state, location) scan the entry table. ALL intersects, ANY
//! unions, and the scope — if present — intersects at the end no matter
//! which mode is active.
//!
//! Index errors pass through untouched. The one deliberate exception is a
//! hit whose entity no longer resolves: that becomes an integrity signal and
//! a skipped hit, never a failed query, because one stale reference should
//! not take down a whole result list.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::error::Result;
use crate::index::tokenizer::{normalize, tokenize_query};
use crate::index::SearchIndex;
use crate::scoring::{field_weight, BASE_MATCH};
use crate::types::{EntityId, FieldId, Hit};

use super::condition::{SearchCondition, Specifier, Value};
use super::model::{MatchMode, Query};

/// Executes queries against one search index.
pub struct QueryExecutor {
    index: Arc<SearchIndex>,
}

/// Matched ids plus how they scored.
struct Evaluation {
    matched: HashSet<EntityId>,
    score: ConditionScore,
}

/// Flat conditions score every match alike; term conditions score per entity.
enum ConditionScore {
    Flat(f32),
    PerEntity(HashMap<EntityId, f32>),
}

impl Evaluation {
    fn score_of(&self, id: EntityId) -> f32 {
        match &self.score {
            ConditionScore::Flat(score) => *score,
            ConditionScore::PerEntity(scores) => scores.get(&id).copied().unwrap_or(BASE_MATCH),
        }
    }
}

impl QueryExecutor {
    pub fn new(index: Arc<SearchIndex>) -> Self {
        QueryExecutor { index }
    }

    /// Execute over the visible set only.
    pub fn execute(&self, query: &Query) -> Result<Vec<Hit>> {
        self.execute_with(query, false)
    }

    /// Execute, optionally admitting entities that have drifted out of the
    /// visible set since they were indexed.
    pub fn execute_with(&self, query: &Query, include_hidden: bool) -> Result<Vec<Hit>> {
        self.index.ensure_open()?;

        let universe: HashSet<EntityId> = self.index.universe().into_iter().collect();

        let evaluations: Vec<Evaluation> = query
            .conditions()
            .iter()
            .map(|c| self.evaluate(c, &universe))
            .collect();

        // A scope-only query starts from the whole universe and lets the
        // scope do the narrowing, in either match mode.
        let mut matched: HashSet<EntityId> = if evaluations.is_empty() {
            universe.clone()
        } else {
            match query.match_mode() {
                MatchMode::All => evaluations
                    .iter()
                    .map(|e| &e.matched)
                    .fold(None::<HashSet<EntityId>>, |acc, set| match acc {
                        None => Some(set.clone()),
                        Some(acc) => Some(acc.intersection(set).copied().collect()),
                    })
                    .unwrap_or_default(),
                MatchMode::Any => evaluations
                    .iter()
                    .flat_map(|e| e.matched.iter().copied())
                    .collect(),
            }
        };

        // The scope is a hard must in both modes.
        if let Some(scope) = query.scope() {
            let scoped = self.evaluate(scope, &universe).matched;
            matched.retain(|id| scoped.contains(id));
        } else if query.conditions().is_empty() {
            // No conditions and no scope never happens via Query::build.
            matched.clear();
        }

        let mut hits = Vec::with_capacity(matched.len());
        for id in matched {
            let Some(cached_state) = self.index.with_entry(id, |entry| entry.state) else {
                continue;
            };

            // Hit construction verifies the reference still points at a
            // (visible) entity; stale ones are counted and skipped.
            match self.index.resolver().resolve(id) {
                Some(entity) if include_hidden || entity.state.is_visible() => {}
                _ => {
                    self.index.record_integrity_signal(id);
                    continue;
                }
            }

            let raw_score: f32 = evaluations
                .iter()
                .filter(|e| e.matched.contains(&id))
                .map(|e| e.score_of(id))
                .sum::<f32>()
                .max(BASE_MATCH);
            hits.push(Hit::new(id, raw_score, cached_state));
        }

        hits.sort_by(|a, b| {
            b.raw_score
                .partial_cmp(&a.raw_score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.entity_id.cmp(&b.entity_id))
        });
        Ok(hits)
    }

    fn evaluate(&self, condition: &SearchCondition, universe: &HashSet<EntityId>) -> Evaluation {
        match &condition.value {
            Value::Text(text) => match condition.specifier {
                Specifier::Contains | Specifier::ContainsAll | Specifier::ContainsNot => {
                    self.evaluate_tokens(condition.field, condition.specifier, text, universe)
                }
                _ => self.evaluate_value(condition, universe),
            },
            Value::States(_) | Value::Scope { .. } => self.evaluate_value(condition, universe),
        }
    }

    /// Posting-list path for the Contains family.
    fn evaluate_tokens(
        &self,
        field: FieldId,
        specifier: Specifier,
        text: &str,
        universe: &HashSet<EntityId>,
    ) -> Evaluation {
        let tokens = tokenize_query(text);
        if tokens.is_empty() {
            // A value of nothing but stop words matches nothing — except for
            // ContainsNot, whose empty prohibition excludes nothing.
            let matched = match specifier {
                Specifier::ContainsNot => universe.clone(),
                _ => HashSet::new(),
            };
            return Evaluation {
                matched,
                score: ConditionScore::Flat(BASE_MATCH),
            };
        }

        let weight = field_weight(field);
        let mut scores: HashMap<EntityId, f32> = HashMap::new();
        let mut sets: Vec<HashSet<EntityId>> = Vec::with_capacity(tokens.len());
        for token in &tokens {
            let entities = self.index.term_entities(token);
            let mut set = HashSet::new();
            for (id, counts) in entities {
                if let Some(&count) = counts.get(&field) {
                    set.insert(id);
                    *scores.entry(id).or_insert(0.0) += count as f32 * weight;
                }
            }
            sets.push(set);
        }

        let union: HashSet<EntityId> = sets.iter().flatten().copied().collect();
        let matched = match specifier {
            Specifier::Contains => union,
            Specifier::ContainsAll => sets
                .into_iter()
                .reduce(|acc, set| acc.intersection(&set).copied().collect())
                .unwrap_or_default(),
            _ => universe.difference(&union).copied().collect(),
        };

        let score = match specifier {
            Specifier::ContainsNot => ConditionScore::Flat(BASE_MATCH),
            _ => ConditionScore::PerEntity(scores),
        };
        Evaluation { matched, score }
    }

    /// Entry-scan path for exact, prefix, suffix, state, and location.
    fn evaluate_value(
        &self,
        condition: &SearchCondition,
        universe: &HashSet<EntityId>,
    ) -> Evaluation {
        let needle = match &condition.value {
            Value::Text(text) => normalize(text),
            _ => String::new(),
        };

        let mut matched = HashSet::new();
        for &id in universe {
            let hit = self
                .index
                .with_entry(id, |entry| match &condition.value {
                    Value::States(states) => match condition.specifier {
                        Specifier::IsNot => !states.contains(&entry.state),
                        _ => states.contains(&entry.state),
                    },
                    Value::Scope {
                        containers,
                        recursive,
                    } => {
                        if *recursive {
                            entry.location.iter().any(|c| containers.contains(c))
                        } else {
                            entry
                                .location
                                .first()
                                .is_some_and(|c| containers.contains(c))
                        }
                    }
                    Value::Text(_) => {
                        let values: Vec<String> = if condition.field == FieldId::Category {
                            entry.categories.clone()
                        } else {
                            entry
                                .field_value(condition.field)
                                .map(|v| vec![v])
                                .unwrap_or_default()
                        };
                        match condition.specifier {
                            Specifier::Is => values.iter().any(|v| v == &needle),
                            Specifier::IsNot => !values.iter().any(|v| v == &needle),
                            Specifier::BeginsWith => values.iter().any(|v| v.starts_with(&needle)),
                            Specifier::EndsWith => values.iter().any(|v| v.ends_with(&needle)),
                            _ => false,
                        }
                    }
                })
                .unwrap_or(false);
            if hit {
                matched.insert(id);
            }
        }

        let score = match &condition.value {
            Value::Text(_) => field_weight(condition.field),
            _ => BASE_MATCH,
        };
        Evaluation {
            matched,
            score: ConditionScore::Flat(score),
        }
    }
}
