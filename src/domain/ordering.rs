//! Ordering and view rules for the todo collection.
//!
//! Backends call into these functions while holding whatever lock or transaction
//! makes the surrounding read-modify-write atomic; nothing here touches storage.

use std::collections::{HashMap, HashSet};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::error::{TodoError, TodoResult};
use super::todo::{Todo, TodoId};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", try_from = "String")]
pub enum Filter {
    #[default]
    All,
    Active,
    Completed,
}

impl Filter {
    pub fn admits(self, todo: &Todo) -> bool {
        match self {
            Filter::All => true,
            Filter::Active => !todo.completed,
            Filter::Completed => todo.completed,
        }
    }

    pub fn next(self) -> Self {
        match self { Filter::All => Filter::Active, Filter::Active => Filter::Completed, Filter::Completed => Filter::All }
    }

    pub fn as_str(self) -> &'static str {
        match self { Filter::All => "all", Filter::Active => "active", Filter::Completed => "completed" }
    }
}

impl FromStr for Filter {
    type Err = TodoError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "" | "all" => Ok(Filter::All),
            "active" => Ok(Filter::Active),
            "completed" => Ok(Filter::Completed),
            other => Err(TodoError::InvalidInput(format!("unknown filter: {other}"))),
        }
    }
}

impl TryFrom<String> for Filter {
    type Error = TodoError;
    fn try_from(s: String) -> Result<Self, Self::Error> { s.parse() }
}

/// A view over the collection: completion filter AND optional case-insensitive search.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ListQuery {
    #[serde(default)]
    pub filter: Filter,
    #[serde(default)]
    pub search: Option<String>,
}

impl ListQuery {
    pub fn all() -> Self { Self::default() }

    pub fn filtered(filter: Filter) -> Self { Self { filter, search: None } }

    pub fn searching(search: impl Into<String>) -> Self { Self { filter: Filter::All, search: Some(search.into()) } }

    /// Applies the view to `todos` and returns the survivors ascending by order.
    pub fn apply(&self, todos: Vec<Todo>) -> Vec<Todo> {
        let needle = self.search.as_deref().filter(|s| !s.is_empty()).map(str::to_lowercase);
        let mut out: Vec<Todo> = todos
            .into_iter()
            .filter(|t| self.filter.admits(t))
            .filter(|t| needle.as_deref().is_none_or(|n| matches_search(t, n)))
            .collect();
        sort_by_order(&mut out);
        out
    }
}

fn matches_search(todo: &Todo, needle_lower: &str) -> bool {
    todo.title.to_lowercase().contains(needle_lower)
        || todo.description.as_deref().is_some_and(|d| d.to_lowercase().contains(needle_lower))
}

/// Ascending by order key; id breaks ties so output never depends on storage iteration order.
pub fn sort_by_order(todos: &mut [Todo]) {
    todos.sort_by(|a, b| a.order.cmp(&b.order).then_with(|| a.id.cmp(&b.id)));
}

/// Order key for an item appended to the end of the full collection.
pub fn next_order(existing: impl IntoIterator<Item = i64>) -> i64 {
    existing.into_iter().max().map_or(0, |m| m + 1)
}

/// One row whose order key (and `updated_at`) must be rewritten by a reorder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reassignment {
    pub id: TodoId,
    pub order: i64,
}

/// Computes the rewrite for `reorder(requested)`.
///
/// `current` is every item as `(id, order)`, in any order. The requested items are
/// placed, in the requested sequence, into the slots they already occupy in the full
/// sequence, then the whole collection is renumbered `0..N-1`. When `requested` covers
/// the full collection this is exactly `requested[i] -> i`.
///
/// Returned rows: every requested id (their `updated_at` is always refreshed) plus
/// any unlisted item whose key changes. Nothing is returned for an empty request.
pub fn plan_reorder(current: &[(TodoId, i64)], requested: &[TodoId]) -> TodoResult<Vec<Reassignment>> {
    if requested.is_empty() {
        return Ok(Vec::new());
    }
    let old: HashMap<&TodoId, i64> = current.iter().map(|(id, o)| (id, *o)).collect();
    let mut seen = HashSet::with_capacity(requested.len());
    for id in requested {
        if !old.contains_key(id) {
            return Err(TodoError::NotFound(id.clone()));
        }
        if !seen.insert(id) {
            return Err(TodoError::InvalidInput(format!("duplicate id in reorder: {id}")));
        }
    }

    let mut sequence: Vec<&(TodoId, i64)> = current.iter().collect();
    sequence.sort_by(|a, b| a.1.cmp(&b.1).then_with(|| a.0.cmp(&b.0)));

    let mut queue = requested.iter();
    let mut plan = Vec::new();
    for (pos, (id, _)) in sequence.into_iter().enumerate() {
        let pos = pos as i64;
        let placed = if seen.contains(id) { queue.next().unwrap_or(id) } else { id };
        if seen.contains(placed) || old[placed] != pos {
            plan.push(Reassignment { id: placed.clone(), order: pos });
        }
    }
    Ok(plan)
}
