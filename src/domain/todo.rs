use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TodoId(pub Uuid);

impl TodoId {
    pub fn new() -> Self { Self(Uuid::new_v4()) }
}

impl Default for TodoId {
    fn default() -> Self { Self::new() }
}

impl std::fmt::Display for TodoId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result { write!(f, "{}", self.0) }
}

impl std::str::FromStr for TodoId {
    type Err = uuid::Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> { Uuid::parse_str(s).map(TodoId) }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Todo {
    pub id: TodoId,
    pub title: String,
    pub description: Option<String>,
    #[serde(default, with = "chrono::serde::ts_milliseconds_option")]
    pub due_date: Option<DateTime<Utc>>,
    pub completed: bool,
    pub order: i64,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTodo {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, with = "chrono::serde::ts_milliseconds_option")]
    pub due_date: Option<DateTime<Utc>>,
}

impl CreateTodo {
    pub fn titled(title: impl Into<String>) -> Self {
        Self { title: title.into(), description: None, due_date: None }
    }
}

/// Everything a backend needs to persist a new item except its order key,
/// which the backend assigns in the same atomic step as the insert.
#[derive(Debug, Clone)]
pub struct NewTodo {
    pub id: TodoId,
    pub title: String,
    pub description: Option<String>,
    pub due_date: Option<DateTime<Utc>>,
    pub now: DateTime<Utc>,
}

impl NewTodo {
    pub fn into_todo(self, order: i64) -> Todo {
        Todo {
            id: self.id,
            title: self.title,
            description: self.description,
            due_date: self.due_date,
            completed: false,
            order,
            created_at: self.now,
            updated_at: self.now,
        }
    }
}

/// Tri-state update for an optional field.
///
/// Deserializes from JSON as: field absent -> `Unchanged` (with `#[serde(default)]`),
/// `null` -> `Clear`, any value -> `Set`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Patch<T> {
    Unchanged,
    Clear,
    Set(T),
}

impl<T> Default for Patch<T> {
    fn default() -> Self { Patch::Unchanged }
}

impl<T> Patch<T> {
    pub fn apply_to(self, slot: &mut Option<T>) {
        match self {
            Patch::Unchanged => {}
            Patch::Clear => *slot = None,
            Patch::Set(v) => *slot = Some(v),
        }
    }

    pub fn try_map<U, E>(self, f: impl FnOnce(T) -> Result<U, E>) -> Result<Patch<U>, E> {
        Ok(match self {
            Patch::Unchanged => Patch::Unchanged,
            Patch::Clear => Patch::Clear,
            Patch::Set(v) => Patch::Set(f(v)?),
        })
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for Patch<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(Option::<T>::deserialize(deserializer)?.map_or(Patch::Clear, Patch::Set))
    }
}

#[derive(Debug, Clone, Default)]
pub struct UpdateTodo {
    pub title: Option<String>,
    pub description: Patch<String>,
    pub due_date: Patch<DateTime<Utc>>,
    pub completed: Option<bool>,
}

impl UpdateTodo {
    pub fn apply_to(self, todo: &mut Todo, now: DateTime<Utc>) {
        if let Some(t) = self.title { todo.title = t; }
        self.description.apply_to(&mut todo.description);
        self.due_date.apply_to(&mut todo.due_date);
        if let Some(c) = self.completed { todo.completed = c; }
        todo.updated_at = now;
    }
}
