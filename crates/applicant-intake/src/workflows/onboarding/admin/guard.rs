use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
    Form, Json,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tower_sessions::Session;
use tracing::{error, info, warn};

use super::credentials::CredentialVerifier;

pub const ADMIN_SESSION_KEY: &str = "admin";
pub const LOGIN_PATH: &str = "/login";
pub const DASHBOARD_PATH: &str = "/dashboard";

/// Administrator bound to an authenticated session. Guarded handlers read it
/// from request extensions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminIdentity {
    pub username: String,
}

/// Missing fields read as empty so they fail verification like a wrong password.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
}

#[derive(Debug, thiserror::Error)]
pub enum AdminError {
    #[error("Invalid username or password")]
    InvalidCredentials,
    #[error("session store failure: {0}")]
    Session(#[from] tower_sessions::session::Error),
}

impl IntoResponse for AdminError {
    fn into_response(self) -> Response {
        let status = match &self {
            AdminError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            AdminError::Session(err) => {
                error!(error = %err, "admin session unavailable");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

/// Lets the request through only when the session carries an [`AdminIdentity`];
/// anonymous callers are sent to the login page.
pub async fn require_admin(
    session: Session,
    mut request: Request,
    next: Next,
) -> Result<Response, AdminError> {
    match session.get::<AdminIdentity>(ADMIN_SESSION_KEY).await? {
        Some(identity) => {
            request.extensions_mut().insert(identity);
            Ok(next.run(request).await)
        }
        None => Ok(Redirect::to(LOGIN_PATH).into_response()),
    }
}

pub async fn login_handler(
    State(verifier): State<Arc<dyn CredentialVerifier>>,
    session: Session,
    Form(form): Form<LoginForm>,
) -> Result<Response, AdminError> {
    let Some(identity) = verifier.verify(form.username.trim(), &form.password) else {
        warn!(username = %form.username, "rejected admin login");
        return Err(AdminError::InvalidCredentials);
    };

    session.insert(ADMIN_SESSION_KEY, &identity).await?;
    session.cycle_id().await?;
    info!(username = %identity.username, "admin signed in");

    Ok(Redirect::to(DASHBOARD_PATH).into_response())
}
