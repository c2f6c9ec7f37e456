pub mod clock;
pub mod error;
pub mod ordering;
pub mod repository;
pub mod todo;
