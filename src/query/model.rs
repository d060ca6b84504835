// Copyright 2025-present Harīṣh Tummalachērla
// SPDX-License-Identifier: Apache-2.0

//! The query model: validated condition lists with a split-out scope.
//!
//! `Query::build` is the single constructor. It enforces the structural
//! rules (non-empty, at most one scope) and reports the one thing that is
//! suspicious but legal: a scope condition naming a container that a
//! Location condition in the same query also names. That overlap is
//! ambiguous, not invalid, so it comes back as a warning the editing UI can
//! show next to the save button.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::{ContainerId, Entity};

use super::condition::SearchCondition;

/// AND/OR combination of the non-scope conditions.
///
/// The scope is outside this choice: it is a hard "must" either way, and in
/// `Any` mode it never counts as one of the alternatives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MatchMode {
    All,
    Any,
}

/// Structural validation failures from [`Query::build`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueryError {
    #[error("a query needs at least one condition")]
    Empty,
    #[error("a query can carry at most one scope condition")]
    MultipleScopes,
}

/// Suspicious-but-legal findings from [`Query::build`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryWarning {
    /// The scope and a Location condition target the same container.
    LocationConflict { container: ContainerId },
}

/// A validated, executable query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Query {
    conditions: Vec<SearchCondition>,
    match_mode: MatchMode,
    scope: Option<SearchCondition>,
}

impl Query {
    /// Validate a flat condition list and split out the scope condition.
    ///
    /// The same split serves rule editing (the scope gets its own control)
    /// and evaluation (the scope is applied as a hard restriction).
    pub fn build(
        conditions: Vec<SearchCondition>,
        match_mode: MatchMode,
    ) -> Result<(Query, Vec<QueryWarning>), QueryError> {
        if conditions.is_empty() {
            return Err(QueryError::Empty);
        }

        let (scopes, rest): (Vec<_>, Vec<_>) =
            conditions.into_iter().partition(SearchCondition::is_scope);
        if scopes.len() > 1 {
            return Err(QueryError::MultipleScopes);
        }
        let scope = scopes.into_iter().next();
        if rest.is_empty() && scope.is_none() {
            return Err(QueryError::Empty);
        }

        let mut warnings = Vec::new();
        if let Some(scope_cond) = &scope {
            if let Some(scoped) = scope_cond.named_containers() {
                for condition in &rest {
                    if let Some(named) = condition.named_containers() {
                        if let Some(&container) = scoped.intersection(named).next() {
                            warnings.push(QueryWarning::LocationConflict { container });
                        }
                    }
                }
            }
        }

        Ok((
            Query {
                conditions: rest,
                match_mode,
                scope,
            },
            warnings,
        ))
    }

    /// A scope-only query, used by rules that match everything inside a
    /// container set.
    pub fn scope_only(scope: SearchCondition) -> Result<Query, QueryError> {
        if !scope.is_scope() {
            return Err(QueryError::Empty);
        }
        Ok(Query {
            conditions: Vec::new(),
            match_mode: MatchMode::All,
            scope: Some(scope),
        })
    }

    pub fn conditions(&self) -> &[SearchCondition] {
        &self.conditions
    }

    pub fn match_mode(&self) -> MatchMode {
        self.match_mode
    }

    pub fn scope(&self) -> Option<&SearchCondition> {
        self.scope.as_ref()
    }

    /// Direct evaluation against one entity.
    ///
    /// ALL: every non-scope condition and the scope must hold. ANY: at least
    /// one non-scope condition must hold, and the scope must additionally
    /// hold — it is never one of the alternatives. A query that became
    /// scope-only matches on its scope alone.
    pub fn matches(&self, entity: &Entity) -> bool {
        if let Some(scope) = &self.scope {
            if !scope.matches(entity) {
                return false;
            }
        }
        if self.conditions.is_empty() {
            return self.scope.is_some();
        }
        match self.match_mode {
            MatchMode::All => self.conditions.iter().all(|c| c.matches(entity)),
            MatchMode::Any => self.conditions.iter().any(|c| c.matches(entity)),
        }
    }
}
