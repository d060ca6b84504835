// Copyright 2025-present Harīṣh Tummalachērla
// SPDX-License-Identifier: Apache-2.0

//! Rules and the ordered store that evaluates them.
//!
//! A rule pairs a query (or "match everything") with an ordered action list,
//! an enabled toggle, and a position in the application order. Persistence of
//! the rule records belongs to the application; what is owned here is the
//! ordering discipline and evaluation:
//!
//! - `order` values stay dense and zero-based through every insert, delete,
//!   and reorder. Deletion compacts in the same operation — there is no
//!   window where the sequence is sparse or duplicated.
//! - Reordering is an atomic pairwise swap (move up / move down), never a
//!   full renumbering, so unrelated rules keep their positions.
//! - Action sets are conflict-checked at composition time, every time.
//!
//! A rule that matches everything and is not last shadows everything after
//! it; [`FilterStore::shadowed_by_catch_all`] reports that as an advisory —
//! the arrangement stays legal, because rules are evaluated independently
//! against arriving entities.

mod actions;
mod batch;

pub use actions::{
    Action, ActionConflict, ActionHandler, ActionRegistry, ActionResult, DELETE, LABEL, MARK_READ,
    MARK_UNREAD, MOVE_TO_CONTAINER, NOTIFY,
};
pub use batch::{BatchHandle, BatchOutcome, BatchRuleExecutor, DEFAULT_CHUNK_SIZE};

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::query::Query;
use crate::types::Entity;

/// A saved search filter: query, actions, order, enabled flag.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Rule {
    pub id: u64,
    pub name: String,
    /// `None` together with `match_all` means "every entity". A query may
    /// still be present alongside `match_all` purely for its scope.
    pub query: Option<Query>,
    pub match_all: bool,
    pub enabled: bool,
    /// Dense, unique, zero-based position; maintained by [`FilterStore`] and
    /// persisted as part of the rule record.
    pub order: u32,
    pub actions: Vec<Action>,
}

impl Rule {
    /// Whether this rule claims an entity. Ignores `enabled`; the store's
    /// evaluation applies that filter.
    ///
    /// With `match_all`, the query no longer matters for matching — except
    /// for its scope, which still restricts.
    pub fn matches(&self, entity: &Entity) -> bool {
        if self.match_all {
            return match &self.query {
                Some(query) => query.scope().is_none_or(|scope| scope.matches(entity)),
                None => true,
            };
        }
        self.query.as_ref().is_some_and(|q| q.matches(entity))
    }

    /// Matches every entity with no scope restriction at all.
    pub fn is_catch_all(&self) -> bool {
        self.match_all
            && self
                .query
                .as_ref()
                .is_none_or(|query| query.scope().is_none())
    }
}

/// Advisory produced when an enabled catch-all rule is not last.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatchAllAdvisory {
    pub catch_all: u64,
    /// Rules ordered after the catch-all; they can never receive an entity
    /// the catch-all would not already have claimed.
    pub shadowed: Vec<u64>,
}

/// Ordered collection of rules plus the registry that vets their actions.
pub struct FilterStore {
    rules: Vec<Rule>,
    registry: Arc<ActionRegistry>,
}

impl FilterStore {
    pub fn new(registry: Arc<ActionRegistry>) -> Self {
        FilterStore {
            rules: Vec::new(),
            registry,
        }
    }

    /// Rebuild a store from persisted rule records. Input order values win;
    /// the sequence is normalized to dense zero-based as it is adopted.
    pub fn from_rules(registry: Arc<ActionRegistry>, mut rules: Vec<Rule>) -> Self {
        rules.sort_by_key(|r| r.order);
        for (position, rule) in rules.iter_mut().enumerate() {
            rule.order = position as u32;
        }
        FilterStore { rules, registry }
    }

    pub fn registry(&self) -> &ActionRegistry {
        &self.registry
    }

    /// Rules in application order.
    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn get(&self, id: u64) -> Option<&Rule> {
        self.rules.iter().find(|r| r.id == id)
    }

    /// Append a rule at the end of the order.
    ///
    /// Fails with the offending pair if the action set conflicts; nothing is
    /// stored in that case.
    pub fn add(&mut self, mut rule: Rule) -> Result<(), ActionConflict> {
        if let Some(conflict) = self.registry.check_conflicts(&rule.actions) {
            return Err(conflict);
        }
        rule.order = self.rules.len() as u32;
        self.rules.push(rule);
        Ok(())
    }

    /// Insert at an explicit position, shifting later rules down by one.
    pub fn insert_at(&mut self, position: usize, mut rule: Rule) -> Result<(), ActionConflict> {
        if let Some(conflict) = self.registry.check_conflicts(&rule.actions) {
            return Err(conflict);
        }
        let position = position.min(self.rules.len());
        rule.order = position as u32;
        self.rules.insert(position, rule);
        self.renumber_from(position + 1);
        Ok(())
    }

    /// Delete a rule and compact the remaining order values in the same
    /// operation.
    pub fn remove(&mut self, id: u64) -> Option<Rule> {
        let position = self.rules.iter().position(|r| r.id == id)?;
        let removed = self.rules.remove(position);
        self.renumber_from(position);
        Some(removed)
    }

    /// Swap a rule with its predecessor. Returns false if it is already
    /// first or unknown.
    pub fn move_up(&mut self, id: u64) -> bool {
        match self.rules.iter().position(|r| r.id == id) {
            Some(position) if position > 0 => {
                self.swap_orders(position - 1, position);
                true
            }
            _ => false,
        }
    }

    /// Swap a rule with its successor. Returns false if it is already last
    /// or unknown.
    pub fn move_down(&mut self, id: u64) -> bool {
        match self.rules.iter().position(|r| r.id == id) {
            Some(position) if position + 1 < self.rules.len() => {
                self.swap_orders(position, position + 1);
                true
            }
            _ => false,
        }
    }

    /// Toggle enablement, touching nothing else.
    pub fn set_enabled(&mut self, id: u64, enabled: bool) -> bool {
        match self.rules.iter_mut().find(|r| r.id == id) {
            Some(rule) => {
                rule.enabled = enabled;
                true
            }
            None => false,
        }
    }

    /// Replace a rule's action list, conflict-checked before anything is
    /// stored.
    pub fn update_actions(&mut self, id: u64, actions: Vec<Action>) -> Result<bool, ActionConflict> {
        if let Some(conflict) = self.registry.check_conflicts(&actions) {
            return Err(conflict);
        }
        match self.rules.iter_mut().find(|r| r.id == id) {
            Some(rule) => {
                rule.actions = actions;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Enabled rules claiming `entity`, in application order.
    ///
    /// Every rule is evaluated independently; an earlier match never
    /// short-circuits a later rule.
    pub fn evaluate(&self, entity: &Entity) -> Vec<&Rule> {
        self.rules
            .iter()
            .filter(|r| r.enabled && r.matches(entity))
            .collect()
    }

    /// Report rules shadowed by an enabled catch-all ordered before them.
    pub fn shadowed_by_catch_all(&self) -> Option<CatchAllAdvisory> {
        let position = self
            .rules
            .iter()
            .position(|r| r.enabled && r.is_catch_all())?;
        let shadowed: Vec<u64> = self.rules[position + 1..].iter().map(|r| r.id).collect();
        if shadowed.is_empty() {
            return None;
        }
        Some(CatchAllAdvisory {
            catch_all: self.rules[position].id,
            shadowed,
        })
    }

    fn swap_orders(&mut self, a: usize, b: usize) {
        let (order_a, order_b) = (self.rules[a].order, self.rules[b].order);
        self.rules[a].order = order_b;
        self.rules[b].order = order_a;
        self.rules.swap(a, b);
    }

    fn renumber_from(&mut self, position: usize) {
        for (offset, rule) in self.rules[position..].iter_mut().enumerate() {
            rule.order = (position + offset) as u32;
        }
    }
}
