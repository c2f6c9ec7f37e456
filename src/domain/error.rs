use super::todo::TodoId;

#[derive(Debug, thiserror::Error)]
pub enum TodoError {
    #[error("todo not found: {0}")]
    NotFound(TodoId),
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

pub type TodoResult<T> = Result<T, TodoError>;
