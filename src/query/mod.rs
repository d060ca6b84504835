// Copyright 2025-present Harīṣh Tummalachērla
// SPDX-License-Identifier: Apache-2.0

//! Conditions, the validated query model, and the index-backed executor.

mod condition;
mod executor;
mod model;

pub use condition::{SearchCondition, Specifier, Value};
pub use executor::QueryExecutor;
pub use model::{MatchMode, Query, QueryError, QueryWarning};
