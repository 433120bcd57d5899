//! HTTP API for knowledge search, RAG context and index maintenance

pub mod handlers;
pub mod routes;

pub use handlers::{ApiError, AppState};
pub use routes::build_router;
