//! Request middleware

pub mod auth;
pub mod error_detail;

pub use auth::{auth_middleware, require_manager, AuthUser, CurrentUser};
pub use error_detail::expose_error_details;
