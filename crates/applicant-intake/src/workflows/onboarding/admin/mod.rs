//! Admin login, the session guard, and the admin UI pages.

pub mod credentials;
pub mod guard;
pub mod pages;
pub mod session;

pub use credentials::{CredentialVerifier, StaticCredentials};
pub use guard::{
    login_handler, require_admin, AdminError, AdminIdentity, LoginForm, ADMIN_SESSION_KEY,
    DASHBOARD_PATH, LOGIN_PATH,
};
pub use pages::{dashboard_page, login_page, AdminPages};
pub use session::{with_admin_sessions, SESSION_COOKIE_NAME};
