//! Authentication with session tokens issued by an external identity provider.

mod identity;
mod middleware;
mod token;

pub use identity::{Identity, get_current_identity};
pub use middleware::{AuthState, auth_guard, auth_guard_api, auth_guard_hx};
pub use token::{Claims, SESSION_COOKIE, decode_session_token, encode_session_token};
