mod code;
mod guard;
mod jwt;
mod middleware;
mod password;
mod session;

pub use code::{generate_verify_code, is_well_formed_code, VERIFY_CODE_TTL_MINUTES};
pub use guard::{decide, route_guard, GuardDecision, DASHBOARD_PATH, SIGN_IN_PATH};
pub use jwt::{create_session_token, verify_session_token, Claims};
pub use middleware::{auth_middleware, AuthUser};
pub use password::{hash_password, verify_password};
pub use session::{clear_session_cookie, extract_session_token, session_cookie, SESSION_COOKIE_NAME};
