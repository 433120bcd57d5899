//! Middleware components for request processing

pub mod auth;
pub mod rate_limiter;
pub mod validator;

pub use auth::{AuthConfig, AuthError, AuthMiddleware};
pub use rate_limiter::{RateLimitConfig, RateLimitError, RateLimiter};
pub use validator::{InputValidator, ValidationError};
