use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::{routing::{get, post}, Json, Router};
use chrono::DateTime;

use crate::application::todo_service::TodoService;
use crate::domain::ordering::ListQuery;
use crate::domain::todo::{CreateTodo, Todo, TodoId, UpdateTodo};
use crate::http::types::{ApiError, Cleared, ReorderBody, TodoList, UpdateBody};

#[derive(Clone)]
pub struct AppState<S: TodoService> { pub service: S }

pub fn router<S: TodoService + Clone + Send + Sync + 'static>(state: AppState<S>) -> Router {
    Router::new()
        .route("/todos", post(create_todo::<S>).get(list_todos::<S>))
        .route("/todos/:id", get(get_todo::<S>).put(update_todo::<S>).patch(update_todo::<S>).delete(delete_todo::<S>))
        .route("/todos/:id/toggle", post(toggle_todo::<S>))
        .route("/reorder", post(reorder_todos::<S>))
        .route("/clear-completed", post(clear_completed::<S>))
        .with_state(state)
}

async fn list_todos<S: TodoService>(State(state): State<AppState<S>>, Query(query): Query<ListQuery>) -> Result<Json<TodoList>, ApiError> {
    let items = state.service.list(query).await?;
    Ok(Json(TodoList { items }))
}

async fn create_todo<S: TodoService>(State(state): State<AppState<S>>, Json(payload): Json<CreateTodo>) -> Result<Json<Todo>, ApiError> {
    Ok(Json(state.service.create(payload).await?))
}

async fn get_todo<S: TodoService>(State(state): State<AppState<S>>, Path(id): Path<String>) -> Result<Json<Todo>, ApiError> {
    let id = parse_id(&id)?;
    match state.service.get(id.clone()).await? {
        Some(t) => Ok(Json(t)),
        None => Err(ApiError { status: StatusCode::NOT_FOUND, message: format!("todo not found: {id}") }),
    }
}

async fn update_todo<S: TodoService>(State(state): State<AppState<S>>, Path(id): Path<String>, Json(payload): Json<UpdateBody>) -> Result<Json<Todo>, ApiError> {
    let id = parse_id(&id)?;
    let due_date = payload
        .due_date
        .try_map(|ms| DateTime::from_timestamp_millis(ms).ok_or_else(|| ApiError::bad_request("invalid dueDate")))?;
    let input = UpdateTodo { title: payload.title, description: payload.description, due_date, completed: payload.completed };
    Ok(Json(state.service.update(id, input).await?))
}

async fn toggle_todo<S: TodoService>(State(state): State<AppState<S>>, Path(id): Path<String>) -> Result<Json<Todo>, ApiError> {
    let id = parse_id(&id)?;
    Ok(Json(state.service.toggle_complete(id).await?))
}

async fn delete_todo<S: TodoService>(State(state): State<AppState<S>>, Path(id): Path<String>) -> Result<StatusCode, ApiError> {
    let id = parse_id(&id)?;
    state.service.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn reorder_todos<S: TodoService>(State(state): State<AppState<S>>, Json(payload): Json<ReorderBody>) -> Result<StatusCode, ApiError> {
    state.service.reorder(payload.ids).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn clear_completed<S: TodoService>(State(state): State<AppState<S>>) -> Result<Json<Cleared>, ApiError> {
    let removed = state.service.clear_completed().await?;
    Ok(Json(Cleared { removed }))
}

fn parse_id(s: &str) -> Result<TodoId, ApiError> { s.parse().map_err(|_| ApiError::bad_request("invalid id")) }
