// Copyright 2025-present Harīṣh Tummalachērla
// SPDX-License-Identifier: Apache-2.0

//! Actions, the registry that describes them, and conflict checking.
//!
//! An [`Action`] is just a kind string plus an opaque JSON payload; what a
//! kind *means* — whether it can be forced over an arbitrary result set,
//! which kinds it cannot be combined with, and how it transforms an entity —
//! lives in the [`ActionRegistry`]. Rule composition asks the registry for
//! conflicts every time actions are edited, not only at execution time, so a
//! broken pair never reaches a saved rule.
//!
//! Conflict declarations may be one-sided; the check is symmetric in outcome
//! because either side's declaration condemns the pair.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use serde_json::Value as Payload;

use crate::types::{ContainerId, Entity, EntityState};

// =============================================================================
// BUILT-IN ACTION KINDS
// =============================================================================

pub const MARK_READ: &str = "mark-read";
pub const MARK_UNREAD: &str = "mark-unread";
pub const LABEL: &str = "label";
pub const MOVE_TO_CONTAINER: &str = "move-to-container";
pub const DELETE: &str = "delete";
/// Shows a notification for newly arriving entities; meaningless against an
/// existing result set, hence not forcible.
pub const NOTIFY: &str = "notify";

/// One step of a rule: a kind identifier and its payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Action {
    pub kind: String,
    #[serde(default)]
    pub data: Payload,
}

impl Action {
    pub fn new(kind: impl Into<String>) -> Self {
        Action {
            kind: kind.into(),
            data: Payload::Null,
        }
    }

    pub fn with_data(kind: impl Into<String>, data: Payload) -> Self {
        Action {
            kind: kind.into(),
            data,
        }
    }
}

/// A mutually exclusive pair found in an action set.
///
/// This is a validation result, not a fault: composition flows block saving
/// until the user resolves it.
#[derive(Debug, Clone, PartialEq)]
pub struct ActionConflict {
    pub first: Action,
    pub second: Action,
}

/// What applying an action did to the entity.
#[derive(Debug)]
pub enum ActionResult {
    /// Nothing to do; the entity was already in the target state.
    Unchanged(Entity),
    /// In-place mutation; needs persisting.
    Changed(Entity),
    /// A restructuring action produced a transformed version superseding the
    /// input. Later actions in the same rule, and later chunks, must operate
    /// on this version — the batch executor's replacement map carries it.
    Replaced(Entity),
}

/// Transforms an entity according to one action kind.
pub trait ActionHandler: Send + Sync {
    fn apply(&self, entity: Entity, data: &Payload) -> ActionResult;
}

struct Descriptor {
    forcible: bool,
    conflicts_with: HashSet<String>,
    handler: Box<dyn ActionHandler>,
}

/// Registry of action kinds: forcibility, conflicts, handlers.
#[derive(Default)]
pub struct ActionRegistry {
    kinds: HashMap<String, Descriptor>,
}

impl ActionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The standard feed-reader action set.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(MARK_READ, true, [MARK_UNREAD], SetState(EntityState::Read));
        registry.register(MARK_UNREAD, true, [MARK_READ], SetState(EntityState::Unread));
        registry.register(LABEL, true, [] as [&str; 0], ApplyLabel);
        registry.register(MOVE_TO_CONTAINER, true, [DELETE], MoveToContainer);
        registry.register(DELETE, true, [MOVE_TO_CONTAINER], SetState(EntityState::Deleted));
        registry.register(NOTIFY, false, [] as [&str; 0], NoOp);
        registry
    }

    /// Declare a kind. Conflict declarations are per-kind and may be
    /// one-sided.
    pub fn register<'a>(
        &mut self,
        kind: &str,
        forcible: bool,
        conflicts_with: impl IntoIterator<Item = &'a str>,
        handler: impl ActionHandler + 'static,
    ) {
        self.kinds.insert(
            kind.to_owned(),
            Descriptor {
                forcible,
                conflicts_with: conflicts_with.into_iter().map(str::to_owned).collect(),
                handler: Box::new(handler),
            },
        );
    }

    pub fn is_forcible(&self, kind: &str) -> bool {
        self.kinds.get(kind).is_some_and(|d| d.forcible)
    }

    pub fn handler(&self, kind: &str) -> Option<&dyn ActionHandler> {
        self.kinds.get(kind).map(|d| d.handler.as_ref())
    }

    /// Whether two kinds are mutually exclusive. Symmetric in outcome even
    /// when only one side declared the conflict.
    pub fn conflicts(&self, a: &str, b: &str) -> bool {
        let declared = |x: &str, y: &str| {
            self.kinds
                .get(x)
                .is_some_and(|d| d.conflicts_with.contains(y))
        };
        declared(a, b) || declared(b, a)
    }

    /// First conflicting unordered pair in the set, if any.
    ///
    /// The caller must refuse to save or apply the set until this returns
    /// `None`.
    pub fn check_conflicts(&self, actions: &[Action]) -> Option<ActionConflict> {
        for (i, first) in actions.iter().enumerate() {
            for second in &actions[i + 1..] {
                if self.conflicts(&first.kind, &second.kind) {
                    return Some(ActionConflict {
                        first: first.clone(),
                        second: second.clone(),
                    });
                }
            }
        }
        None
    }
}

// =============================================================================
// BUILT-IN HANDLERS
// =============================================================================

struct SetState(EntityState);

impl ActionHandler for SetState {
    fn apply(&self, mut entity: Entity, _data: &Payload) -> ActionResult {
        if entity.state == self.0 {
            return ActionResult::Unchanged(entity);
        }
        entity.state = self.0;
        ActionResult::Changed(entity)
    }
}

/// Adds `data.label` to the entity's categories, once.
struct ApplyLabel;

impl ActionHandler for ApplyLabel {
    fn apply(&self, mut entity: Entity, data: &Payload) -> ActionResult {
        let Some(label) = data.get("label").and_then(Payload::as_str) else {
            return ActionResult::Unchanged(entity);
        };
        if entity.categories.iter().any(|c| c == label) {
            return ActionResult::Unchanged(entity);
        }
        entity.categories.push(label.to_owned());
        ActionResult::Changed(entity)
    }
}

/// Refiles the entity under `data.container`.
///
/// Moving restructures rather than mutates: the whole location chain is
/// replaced, so the result is a transformed version of the entity rather
/// than a field tweak. The batch executor's replacement map exists for
/// exactly this case.
struct MoveToContainer;

impl ActionHandler for MoveToContainer {
    fn apply(&self, mut entity: Entity, data: &Payload) -> ActionResult {
        let Some(container) = data.get("container").and_then(Payload::as_u64) else {
            return ActionResult::Unchanged(entity);
        };
        let target = ContainerId(container);
        if entity.parent() == Some(target) {
            return ActionResult::Unchanged(entity);
        }
        entity.location = vec![target];
        ActionResult::Replaced(entity)
    }
}

struct NoOp;

impl ActionHandler for NoOp {
    fn apply(&self, entity: Entity, _data: &Payload) -> ActionResult {
        ActionResult::Unchanged(entity)
    }
}
