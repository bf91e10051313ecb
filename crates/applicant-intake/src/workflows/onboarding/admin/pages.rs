use std::path::{Path, PathBuf};
use std::sync::Arc;

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::error;

/// Location of the admin UI documents inside the public directory.
#[derive(Debug, Clone)]
pub struct AdminPages {
    login: PathBuf,
    dashboard: PathBuf,
}

impl AdminPages {
    pub fn from_public_dir(public_dir: impl AsRef<Path>) -> Self {
        let admin = public_dir.as_ref().join("frontend").join("admin");
        Self {
            login: admin.join("login.html"),
            dashboard: admin.join("dashboard.html"),
        }
    }

    pub fn login(&self) -> &Path {
        &self.login
    }

    pub fn dashboard(&self) -> &Path {
        &self.dashboard
    }
}

pub async fn login_page(State(pages): State<Arc<AdminPages>>) -> Response {
    serve_file(pages.login()).await
}

/// Reached only through the admin guard.
pub async fn dashboard_page(State(pages): State<Arc<AdminPages>>) -> Response {
    serve_file(pages.dashboard()).await
}

async fn serve_file(path: &Path) -> Response {
    match tokio::fs::read(path).await {
        Ok(bytes) => {
            let mime = mime_guess::from_path(path).first_or(mime::TEXT_HTML_UTF_8);
            ([(header::CONTENT_TYPE, mime.to_string())], bytes).into_response()
        }
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": "page not found" })),
        )
            .into_response(),
        Err(err) => {
            error!(path = %path.display(), error = %err, "failed to read admin page");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "page unavailable" })),
            )
                .into_response()
        }
    }
}
