use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::domain::{
    clock::MonotonicClock,
    error::TodoResult,
    ordering::{next_order, plan_reorder, sort_by_order},
    repository::TodoRepository,
    todo::{NewTodo, Todo, TodoId, UpdateTodo},
};

/// Process-local backend. Reads share the lock; each mutation holds the write
/// lock across its whole read-modify-write.
#[derive(Clone, Default)]
pub struct InMemoryTodoRepository {
    items: Arc<RwLock<HashMap<TodoId, Todo>>>,
}

impl InMemoryTodoRepository {
    pub fn new() -> Self { Self::default() }
}

#[async_trait]
impl TodoRepository for InMemoryTodoRepository {
    async fn init(&self) -> TodoResult<()> { Ok(()) }

    async fn insert(&self, input: NewTodo) -> TodoResult<Todo> {
        let mut map = self.items.write().await;
        let order = next_order(map.values().map(|t| t.order));
        let todo = input.into_todo(order);
        map.insert(todo.id.clone(), todo.clone());
        Ok(todo)
    }

    async fn get(&self, id: &TodoId) -> TodoResult<Option<Todo>> { Ok(self.items.read().await.get(id).cloned()) }

    async fn list(&self) -> TodoResult<Vec<Todo>> {
        let mut todos: Vec<Todo> = self.items.read().await.values().cloned().collect();
        sort_by_order(&mut todos);
        Ok(todos)
    }

    async fn patch(&self, id: &TodoId, input: UpdateTodo, clock: &MonotonicClock) -> TodoResult<Option<Todo>> {
        let mut map = self.items.write().await;
        let Some(todo) = map.get_mut(id) else { return Ok(None) };
        input.apply_to(todo, clock.now());
        Ok(Some(todo.clone()))
    }

    async fn toggle(&self, id: &TodoId, clock: &MonotonicClock) -> TodoResult<Option<Todo>> {
        let mut map = self.items.write().await;
        let Some(todo) = map.get_mut(id) else { return Ok(None) };
        todo.completed = !todo.completed;
        todo.updated_at = clock.now();
        Ok(Some(todo.clone()))
    }

    async fn delete(&self, id: &TodoId) -> TodoResult<bool> { Ok(self.items.write().await.remove(id).is_some()) }

    async fn reorder(&self, ids: &[TodoId], clock: &MonotonicClock) -> TodoResult<()> {
        let mut map = self.items.write().await;
        let current: Vec<(TodoId, i64)> = map.values().map(|t| (t.id.clone(), t.order)).collect();
        let plan = plan_reorder(&current, ids)?;
        let now = clock.now();
        for r in plan {
            if let Some(todo) = map.get_mut(&r.id) {
                todo.order = r.order;
                todo.updated_at = now;
            }
        }
        Ok(())
    }

    async fn delete_completed(&self) -> TodoResult<u64> {
        let mut map = self.items.write().await;
        let before = map.len();
        map.retain(|_, t| !t.completed);
        Ok((before - map.len()) as u64)
    }
}
