mod auth;
mod error_handler;

pub use auth::{auth_middleware, ensure_self_or_admin, require_admin, require_alumni_or_admin};
pub use error_handler::{handle_panic, log_errors};
