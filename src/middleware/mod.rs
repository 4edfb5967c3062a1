pub mod auth;
pub mod request;
pub mod response;

pub use auth::{require_auth, CurrentUser, UserPrincipal};
pub use request::{optional_id, parse_id, required, required_id, JsonBody};
pub use response::{ApiResponse, ApiResult};
