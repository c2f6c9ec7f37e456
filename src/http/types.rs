use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};

use crate::domain::error::TodoError;
use crate::domain::todo::{Patch, Todo, TodoId};

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiError {
    #[serde(skip, default = "bad_request")]
    pub status: StatusCode,
    pub message: String,
}

fn bad_request() -> StatusCode { StatusCode::BAD_REQUEST }

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self { Self { status: StatusCode::BAD_REQUEST, message: message.into() } }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response { (self.status, axum::Json(self)).into_response() }
}

impl From<TodoError> for ApiError {
    fn from(e: TodoError) -> Self {
        let status = match &e {
            TodoError::NotFound(_) => StatusCode::NOT_FOUND,
            TodoError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            TodoError::Storage(_) => {
                tracing::error!(error = %e, "storage failure");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        Self { status, message: e.to_string() }
    }
}

#[derive(Debug, Serialize)]
pub struct TodoList { pub items: Vec<Todo> }

#[derive(Debug, Serialize)]
pub struct Cleared { pub removed: u64 }

/// Update body. `description`/`dueDate` accept `null` to clear; `dueDate` is epoch millis.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateBody {
    pub title: Option<String>,
    #[serde(default)]
    pub description: Patch<String>,
    #[serde(default)]
    pub due_date: Patch<i64>,
    pub completed: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct ReorderBody { pub ids: Vec<TodoId> }
