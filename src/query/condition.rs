// Copyright 2025-present Harīṣh Tummalachērla
// SPDX-License-Identifier: Apache-2.0

//! Search conditions: one field, one specifier, one value.
//!
//! A condition is immutable once constructed and carries its own direct
//! evaluation against an entity. That direct path serves two masters: rule
//! evaluation over arriving entities (which may not be indexed yet), and the
//! property tests, where it is the oracle the index-backed executor is
//! checked against.
//!
//! Scope conditions are special everywhere: they restrict results to a set of
//! containers and are always a hard "must", regardless of the query's match
//! mode. The query model splits them out of flat condition lists; see
//! `model.rs`.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::index::tokenizer::{normalize, tokenize_query};
use crate::types::{ContainerId, Entity, EntityState, FieldId};

/// How a condition's value relates to the field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Specifier {
    /// At least one value token occurs in the field.
    Contains,
    /// Every value token occurs in the field.
    ContainsAll,
    /// No value token occurs in the field.
    ContainsNot,
    /// The normalized field equals the value (any category, for Category).
    Is,
    IsNot,
    BeginsWith,
    EndsWith,
    /// Container-set restriction; only valid on the Location field.
    Scope,
}

/// The polymorphic condition value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Text(String),
    States(BTreeSet<EntityState>),
    Scope {
        containers: BTreeSet<ContainerId>,
        recursive: bool,
    },
}

/// One search criterion. Construct via the helpers; immutable afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchCondition {
    pub field: FieldId,
    pub specifier: Specifier,
    pub value: Value,
}

impl SearchCondition {
    /// Text criterion over an indexed field.
    pub fn text(field: FieldId, specifier: Specifier, value: impl Into<String>) -> Self {
        SearchCondition {
            field,
            specifier,
            value: Value::Text(value.into()),
        }
    }

    /// State-set criterion (`Is` = state in set, `IsNot` = not in set).
    pub fn states(specifier: Specifier, states: impl IntoIterator<Item = EntityState>) -> Self {
        SearchCondition {
            field: FieldId::State,
            specifier,
            value: Value::States(states.into_iter().collect()),
        }
    }

    /// Scope criterion restricting to a container set.
    pub fn scope(containers: impl IntoIterator<Item = ContainerId>, recursive: bool) -> Self {
        SearchCondition {
            field: FieldId::Location,
            specifier: Specifier::Scope,
            value: Value::Scope {
                containers: containers.into_iter().collect(),
                recursive,
            },
        }
    }

    /// Location as an ordinary criterion rather than the scope.
    ///
    /// Same value shape as [`SearchCondition::scope`] but it participates in
    /// ALL/ANY like any other condition. A query carrying both this and a
    /// scope over the same container draws a location-conflict warning.
    pub fn location_is(containers: impl IntoIterator<Item = ContainerId>, recursive: bool) -> Self {
        SearchCondition {
            field: FieldId::Location,
            specifier: Specifier::Is,
            value: Value::Scope {
                containers: containers.into_iter().collect(),
                recursive,
            },
        }
    }

    /// Whether this is the scope condition the query model splits out.
    #[inline]
    pub fn is_scope(&self) -> bool {
        self.specifier == Specifier::Scope
    }

    /// The containers a Location condition names, scope or not.
    pub(crate) fn named_containers(&self) -> Option<&BTreeSet<ContainerId>> {
        match &self.value {
            Value::Scope { containers, .. } if self.field == FieldId::Location => Some(containers),
            _ => None,
        }
    }

    /// Evaluate directly against an entity, without the index.
    pub fn matches(&self, entity: &Entity) -> bool {
        match (&self.value, self.field) {
            (Value::Scope { containers, recursive }, _) => {
                if *recursive {
                    entity.location.iter().any(|c| containers.contains(c))
                } else {
                    entity.parent().is_some_and(|p| containers.contains(&p))
                }
            }
            (Value::States(states), _) => match self.specifier {
                Specifier::IsNot => !states.contains(&entity.state),
                _ => states.contains(&entity.state),
            },
            (Value::Text(text), field) => self.matches_text(entity, field, text),
        }
    }

    fn matches_text(&self, entity: &Entity, field: FieldId, text: &str) -> bool {
        // Category is a set of values; the other text fields are single.
        let values: Vec<String> = match field {
            FieldId::Category => entity.categories.iter().map(|c| normalize(c)).collect(),
            FieldId::Title => vec![normalize(&entity.title)],
            FieldId::Content => vec![normalize(&entity.content)],
            FieldId::Author => vec![normalize(&entity.author)],
            FieldId::Link => vec![normalize(&entity.link)],
            FieldId::State | FieldId::Location => return false,
        };
        let needle = normalize(text);

        match self.specifier {
            Specifier::Contains | Specifier::ContainsAll | Specifier::ContainsNot => {
                let tokens = tokenize_query(text);
                let field_tokens: std::collections::HashSet<String> =
                    values.iter().flat_map(|v| tokenize_query(v)).collect();
                match self.specifier {
                    Specifier::Contains => {
                        !tokens.is_empty() && tokens.iter().any(|t| field_tokens.contains(t))
                    }
                    Specifier::ContainsAll => {
                        !tokens.is_empty() && tokens.iter().all(|t| field_tokens.contains(t))
                    }
                    _ => tokens.iter().all(|t| !field_tokens.contains(t)),
                }
            }
            Specifier::Is => values.iter().any(|v| v == &needle),
            Specifier::IsNot => !values.iter().any(|v| v == &needle),
            Specifier::BeginsWith => values.iter().any(|v| v.starts_with(&needle)),
            Specifier::EndsWith => values.iter().any(|v| v.ends_with(&needle)),
            Specifier::Scope => false,
        }
    }
}
