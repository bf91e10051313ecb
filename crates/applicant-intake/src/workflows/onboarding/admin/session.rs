use axum::Router;
use sha2::{Digest, Sha512};
use tower_sessions::cookie::{time::Duration, Key, SameSite};
use tower_sessions::{Expiry, MemoryStore, SessionManagerLayer};

use crate::config::SessionConfig;

pub const SESSION_COOKIE_NAME: &str = "intake.sid";

/// Wraps `router` with signed, inactivity-expiring admin session cookies.
///
/// The signing key is the SHA-512 digest of the configured secret, which
/// gives the 64 bytes the cookie signer requires for any secret length.
pub fn with_admin_sessions(router: Router, config: &SessionConfig) -> Router {
    let key = Key::from(Sha512::digest(config.secret.as_bytes()).as_slice());
    let idle_secs = i64::try_from(config.idle_timeout.as_secs()).unwrap_or(i64::MAX);

    let layer = SessionManagerLayer::new(MemoryStore::default())
        .with_name(SESSION_COOKIE_NAME)
        .with_secure(config.secure_cookies)
        .with_same_site(SameSite::Lax)
        .with_expiry(Expiry::OnInactivity(Duration::seconds(idle_secs)))
        .with_signed(key);

    router.layer(layer)
}
