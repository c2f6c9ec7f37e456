use async_trait::async_trait;
use super::clock::MonotonicClock;
use super::error::TodoResult;
use super::todo::{NewTodo, Todo, TodoId, UpdateTodo};

/// Storage for the todo collection.
///
/// Every method is atomic on its own: `insert` assigns the order key in the same step
/// that persists the row, `toggle` flips without a separate read, and `reorder`
/// validates and rewrites the whole sequence under one lock or transaction.
///
/// Mutations read `clock` only once they hold their lock or transaction, so the
/// stored `updated_at` of an item never moves backwards.
#[async_trait]
pub trait TodoRepository: Send + Sync + 'static {
    async fn init(&self) -> TodoResult<()>;
    /// Persists `input` with order `1 + max(order)`, or `0` when the collection is empty.
    async fn insert(&self, input: NewTodo) -> TodoResult<Todo>;
    async fn get(&self, id: &TodoId) -> TodoResult<Option<Todo>>;
    /// Every item, ascending by order.
    async fn list(&self) -> TodoResult<Vec<Todo>>;
    async fn patch(&self, id: &TodoId, input: UpdateTodo, clock: &MonotonicClock) -> TodoResult<Option<Todo>>;
    async fn toggle(&self, id: &TodoId, clock: &MonotonicClock) -> TodoResult<Option<Todo>>;
    async fn delete(&self, id: &TodoId) -> TodoResult<bool>;
    /// Applies [`crate::domain::ordering::plan_reorder`]; nothing is written on error.
    async fn reorder(&self, ids: &[TodoId], clock: &MonotonicClock) -> TodoResult<()>;
    async fn delete_completed(&self) -> TodoResult<u64>;
}
