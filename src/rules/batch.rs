// Copyright 2025-present Harīṣh Tummalachērla
// SPDX-License-Identifier: Apache-2.0

//! Forced application of a rule across an arbitrarily large hit list.
//!
//! The naive version — resolve everything, apply everything, save everything
//! — falls over in three ways this executor is built around:
//!
//! 1. **Memory**: hits are processed in fixed-size chunks, so a rule matching
//!    half the corpus never materializes half the corpus at once. Progress
//!    advances one unit per chunk, which also bounds UI update frequency.
//! 2. **Replacement**: some actions produce a new logical entity rather than
//!    mutating in place. The replacement map carries original id → latest
//!    version, so a later action in the same rule, or a later chunk holding
//!    a duplicate hit, operates on current state instead of a stale one.
//! 3. **Staleness**: a hit whose entity has been deleted since the query ran
//!    is skipped and counted, never allowed to abort the other hundreds of
//!    legitimate actions.
//!
//! Persistence is one bulk save at the end. Cancellation is chunk-atomic:
//! chunks completed before the cancel are persisted, unprocessed ones never
//! ran. The run is idempotent for the built-in actions — re-running over the
//! same hits finds the work already done.

use std::collections::HashMap;
use std::io;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::progress::{CancelToken, Progress};
use crate::store::{EntityGateway, EntityResolver};
use crate::types::{Entity, EntityId, Hit};

use super::actions::{Action, ActionRegistry, ActionResult};
use super::Rule;

/// Hits per chunk; one persistence-save unit and one progress tick.
pub const DEFAULT_CHUNK_SIZE: usize = 50;

/// How a forced rule application ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchOutcome {
    /// The rule has no forcible actions. A legitimate terminal state, not an
    /// error.
    NothingToRun,
    Completed {
        persisted: usize,
        skipped: usize,
        chunks: u64,
    },
    /// Canceled between chunks. Everything processed up to that point has
    /// been persisted.
    Canceled {
        persisted: usize,
        skipped: usize,
        chunks: u64,
    },
}

/// Applies rules to result sets in bounded, cancelable batches.
#[derive(Clone)]
pub struct BatchRuleExecutor {
    resolver: Arc<dyn EntityResolver>,
    gateway: Arc<dyn EntityGateway>,
    registry: Arc<ActionRegistry>,
    chunk_size: usize,
}

/// A batch run on its background thread.
pub struct BatchHandle {
    token: CancelToken,
    join: JoinHandle<Result<BatchOutcome>>,
}

impl BatchHandle {
    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn join(self) -> Result<BatchOutcome> {
        self.join
            .join()
            .map_err(|_| Error::Storage(io::Error::other("batch thread panicked")))?
    }
}

impl BatchRuleExecutor {
    pub fn new(
        resolver: Arc<dyn EntityResolver>,
        gateway: Arc<dyn EntityGateway>,
        registry: Arc<ActionRegistry>,
    ) -> Self {
        BatchRuleExecutor {
            resolver,
            gateway,
            registry,
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    /// Run on a background thread; the handle carries cancel and join.
    pub fn spawn_run(
        &self,
        rule: Rule,
        hits: Vec<Hit>,
        progress: Arc<dyn Progress>,
        token: CancelToken,
    ) -> Result<BatchHandle> {
        let executor = self.clone();
        let thread_token = token.clone();
        let join = thread::Builder::new()
            .name("lutra-batch".into())
            .spawn(move || executor.run(&rule, &hits, progress.as_ref(), &thread_token))
            .map_err(Error::storage)?;
        Ok(BatchHandle { token, join })
    }

    /// The chunk loop. Callers wanting it off their thread use
    /// [`BatchRuleExecutor::spawn_run`].
    pub fn run(
        &self,
        rule: &Rule,
        hits: &[Hit],
        progress: &dyn Progress,
        token: &CancelToken,
    ) -> Result<BatchOutcome> {
        let actions = self.runnable_actions(rule);
        if actions.is_empty() {
            debug!(rule = rule.id, "no forcible actions, nothing to run");
            progress.done();
            return Ok(BatchOutcome::NothingToRun);
        }

        let total_chunks = hits.len().div_ceil(self.chunk_size) as u64;
        progress.begin(total_chunks);
        progress.message(&format!("applying '{}'", rule.name));

        // original id → latest version, surviving across chunks.
        let mut replacements: HashMap<EntityId, Entity> = HashMap::new();
        // original id → latest version, for the single final save.
        let mut pending: HashMap<EntityId, Entity> = HashMap::new();
        let mut skipped = 0usize;
        let mut chunks = 0u64;
        let mut canceled = false;

        for chunk in hits.chunks(self.chunk_size) {
            if token.is_canceled() {
                canceled = true;
                break;
            }

            let mut work = self.resolve_chunk(chunk, &replacements, &mut skipped);
            self.apply_actions(&actions, &mut work);

            for (original, entity, touched) in work {
                if touched {
                    replacements.insert(original, entity.clone());
                    pending.insert(original, entity);
                }
            }

            chunks += 1;
            progress.advance(1);
        }

        // One bulk save for everything the completed chunks touched — also on
        // cancellation, which only spares the chunks that never ran.
        let persisted = pending.len();
        if persisted > 0 {
            self.gateway
                .save_all(pending.into_values().collect())?;
        }
        progress.done();

        debug!(
            rule = rule.id,
            chunks, persisted, skipped, canceled, "batch run finished"
        );
        Ok(if canceled {
            BatchOutcome::Canceled {
                persisted,
                skipped,
                chunks,
            }
        } else {
            BatchOutcome::Completed {
                persisted,
                skipped,
                chunks,
            }
        })
    }

    /// The rule's forcible actions, minus any that conflict with an earlier
    /// kept one. Saved rules are conflict-free already; this guards ad-hoc
    /// rule values built outside a [`super::FilterStore`].
    fn runnable_actions(&self, rule: &Rule) -> Vec<Action> {
        let mut kept: Vec<Action> = Vec::new();
        for action in &rule.actions {
            if !self.registry.is_forcible(&action.kind) {
                continue;
            }
            if let Some(prior) = kept
                .iter()
                .find(|k| self.registry.conflicts(&k.kind, &action.kind))
            {
                warn!(
                    rule = rule.id,
                    kept = %prior.kind,
                    dropped = %action.kind,
                    "skipping action conflicting with an earlier one"
                );
                continue;
            }
            kept.push(action.clone());
        }
        kept
    }

    /// Resolve one chunk's hits to live entities, preferring replacement
    /// versions from earlier chunks. Failures are skips, not errors.
    fn resolve_chunk(
        &self,
        chunk: &[Hit],
        replacements: &HashMap<EntityId, Entity>,
        skipped: &mut usize,
    ) -> Vec<(EntityId, Entity, bool)> {
        let mut work = Vec::with_capacity(chunk.len());
        for hit in chunk {
            if let Some(current) = replacements.get(&hit.entity_id) {
                work.push((hit.entity_id, current.clone(), false));
                continue;
            }
            match self.resolver.resolve(hit.entity_id) {
                Some(entity) if entity.state.is_visible() => {
                    work.push((hit.entity_id, entity, false));
                }
                _ => {
                    warn!(entity = %hit.entity_id, "stale hit skipped during batch run");
                    *skipped += 1;
                }
            }
        }
        work
    }

    /// Apply the kept actions in rule order to every entity in the chunk.
    fn apply_actions(&self, actions: &[Action], work: &mut Vec<(EntityId, Entity, bool)>) {
        for action in actions {
            let Some(handler) = self.registry.handler(&action.kind) else {
                warn!(kind = %action.kind, "unknown action kind, skipping");
                continue;
            };
            for (_, entity, touched) in work.iter_mut() {
                match handler.apply(entity.clone(), &action.data) {
                    ActionResult::Unchanged(same) => *entity = same,
                    ActionResult::Changed(changed) | ActionResult::Replaced(changed) => {
                        *entity = changed;
                        *touched = true;
                    }
                }
            }
        }
    }
}
