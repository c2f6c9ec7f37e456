use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info};

use crate::domain::clock::MonotonicClock;
use crate::domain::error::{TodoError, TodoResult};
use crate::domain::ordering::ListQuery;
use crate::domain::repository::TodoRepository;
use crate::domain::todo::{CreateTodo, NewTodo, Todo, TodoId, UpdateTodo};

#[async_trait]
pub trait TodoService: Send + Sync + 'static {
    async fn list(&self, query: ListQuery) -> TodoResult<Vec<Todo>>;
    async fn get(&self, id: TodoId) -> TodoResult<Option<Todo>>;
    async fn create(&self, input: CreateTodo) -> TodoResult<Todo>;
    async fn update(&self, id: TodoId, input: UpdateTodo) -> TodoResult<Todo>;
    async fn toggle_complete(&self, id: TodoId) -> TodoResult<Todo>;
    async fn delete(&self, id: TodoId) -> TodoResult<()>;
    async fn reorder(&self, ids: Vec<TodoId>) -> TodoResult<()>;
    async fn clear_completed(&self) -> TodoResult<u64>;
}

#[derive(Clone)]
pub struct TodoServiceImpl<R: TodoRepository> {
    repo: R,
    clock: Arc<MonotonicClock>,
}

impl<R: TodoRepository> TodoServiceImpl<R> {
    pub fn new(repo: R) -> Self { Self { repo, clock: Arc::new(MonotonicClock::new()) } }
}

fn clean_title(title: &str) -> TodoResult<String> {
    let title = title.trim();
    if title.is_empty() {
        return Err(TodoError::InvalidInput("title must not be blank".into()));
    }
    Ok(title.to_string())
}

#[async_trait]
impl<R: TodoRepository> TodoService for TodoServiceImpl<R> {
    async fn list(&self, query: ListQuery) -> TodoResult<Vec<Todo>> {
        let todos = self.repo.list().await?;
        Ok(query.apply(todos))
    }

    async fn get(&self, id: TodoId) -> TodoResult<Option<Todo>> { self.repo.get(&id).await }

    async fn create(&self, input: CreateTodo) -> TodoResult<Todo> {
        let title = clean_title(&input.title)?;
        let todo = self
            .repo
            .insert(NewTodo { id: TodoId::new(), title, description: input.description, due_date: input.due_date, now: self.clock.now() })
            .await?;
        info!(id = %todo.id, order = todo.order, "created todo");
        Ok(todo)
    }

    async fn update(&self, id: TodoId, mut input: UpdateTodo) -> TodoResult<Todo> {
        if let Some(title) = input.title.take() {
            input.title = Some(clean_title(&title)?);
        }
        let patched = self.repo.patch(&id, input, &self.clock).await?;
        let todo = patched.ok_or(TodoError::NotFound(id))?;
        debug!(id = %todo.id, "updated todo");
        Ok(todo)
    }

    async fn toggle_complete(&self, id: TodoId) -> TodoResult<Todo> {
        let toggled = self.repo.toggle(&id, &self.clock).await?;
        let todo = toggled.ok_or(TodoError::NotFound(id))?;
        debug!(id = %todo.id, completed = todo.completed, "toggled todo");
        Ok(todo)
    }

    async fn delete(&self, id: TodoId) -> TodoResult<()> {
        if !self.repo.delete(&id).await? {
            return Err(TodoError::NotFound(id));
        }
        info!(%id, "deleted todo");
        Ok(())
    }

    async fn reorder(&self, ids: Vec<TodoId>) -> TodoResult<()> {
        self.repo.reorder(&ids, &self.clock).await?;
        info!(count = ids.len(), "reordered todos");
        Ok(())
    }

    async fn clear_completed(&self) -> TodoResult<u64> {
        let removed = self.repo.delete_completed().await?;
        info!(removed, "cleared completed todos");
        Ok(removed)
    }
}
