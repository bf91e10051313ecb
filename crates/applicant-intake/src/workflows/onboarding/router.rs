use std::sync::Arc;

use axum::{
    extract::{multipart::MultipartError, FromRef, Multipart, Path, State},
    http::StatusCode,
    middleware,
    response::{IntoResponse, Redirect, Response},
    routing::{delete, get, post, put},
    Extension, Json, Router,
};
use serde_json::{json, Map, Value};
use tracing::{error, info, warn};

use super::admin::{
    dashboard_page, login_handler, login_page, require_admin, AdminIdentity, AdminPages,
    CredentialVerifier, DASHBOARD_PATH, LOGIN_PATH,
};
use super::form::{SubmittedForm, UploadedFile};
use super::repository::ApplicantRepository;
use super::service::{ApplicantIntakeService, IntakeError};

/// Where a browser lands after a successful submission.
pub const LANDING_PAGE: &str = "/home.html";

/// Shared state for the onboarding routes.
pub struct OnboardingState<R> {
    pub service: Arc<ApplicantIntakeService<R>>,
    pub verifier: Arc<dyn CredentialVerifier>,
    pub pages: Arc<AdminPages>,
}

impl<R> OnboardingState<R> {
    pub fn new(
        service: Arc<ApplicantIntakeService<R>>,
        verifier: Arc<dyn CredentialVerifier>,
        pages: AdminPages,
    ) -> Self {
        Self {
            service,
            verifier,
            pages: Arc::new(pages),
        }
    }
}

impl<R> Clone for OnboardingState<R> {
    fn clone(&self) -> Self {
        Self {
            service: Arc::clone(&self.service),
            verifier: Arc::clone(&self.verifier),
            pages: Arc::clone(&self.pages),
        }
    }
}

impl<R> FromRef<OnboardingState<R>> for Arc<ApplicantIntakeService<R>> {
    fn from_ref(state: &OnboardingState<R>) -> Self {
        Arc::clone(&state.service)
    }
}

impl<R> FromRef<OnboardingState<R>> for Arc<dyn CredentialVerifier> {
    fn from_ref(state: &OnboardingState<R>) -> Self {
        Arc::clone(&state.verifier)
    }
}

impl<R> FromRef<OnboardingState<R>> for Arc<AdminPages> {
    fn from_ref(state: &OnboardingState<R>) -> Self {
        Arc::clone(&state.pages)
    }
}

/// Router exposing the public intake form, admin login, and the guarded
/// management endpoints. Callers must wrap it with
/// [`with_admin_sessions`](super::admin::with_admin_sessions).
pub fn onboarding_router<R>(state: OnboardingState<R>) -> Router
where
    R: ApplicantRepository + 'static,
{
    let guarded: Router<OnboardingState<R>> = Router::new()
        .route(DASHBOARD_PATH, get(dashboard_page))
        .route("/users", get(list_handler::<R>))
        .route("/editUserByEmail/:email", put(edit_handler::<R>))
        .route("/deleteUserByEmail/:email", delete(delete_handler::<R>))
        .route_layer(middleware::from_fn(require_admin));

    Router::new()
        .route("/sign_up", post(sign_up_handler::<R>))
        .route(LOGIN_PATH, get(login_page).post(login_handler))
        .merge(guarded)
        .with_state(state)
}

pub(crate) async fn sign_up_handler<R>(
    State(service): State<Arc<ApplicantIntakeService<R>>>,
    multipart: Multipart,
) -> Response
where
    R: ApplicantRepository + 'static,
{
    let form = match read_submission(multipart).await {
        Ok(form) => form,
        Err(err) => {
            warn!(error = %err, "unreadable multipart submission");
            let payload = json!({ "error": err.body_text() });
            return (err.status(), Json(payload)).into_response();
        }
    };

    match run_blocking("Error saving data", move || service.submit(form)).await {
        Ok(_record) => Redirect::to(LANDING_PAGE).into_response(),
        Err(response) => response,
    }
}

pub(crate) async fn list_handler<R>(
    State(service): State<Arc<ApplicantIntakeService<R>>>,
    Extension(admin): Extension<AdminIdentity>,
) -> Response
where
    R: ApplicantRepository + 'static,
{
    match run_blocking("Error fetching users", move || service.list()).await {
        Ok(records) => {
            info!(admin = %admin.username, count = records.len(), "listed applicants");
            (StatusCode::OK, Json(records)).into_response()
        }
        Err(response) => response,
    }
}

pub(crate) async fn edit_handler<R>(
    State(service): State<Arc<ApplicantIntakeService<R>>>,
    Extension(admin): Extension<AdminIdentity>,
    Path(email): Path<String>,
    Json(patch): Json<Map<String, Value>>,
) -> Response
where
    R: ApplicantRepository + 'static,
{
    let target = email.clone();
    let update = move || service.update_by_email(&target, &patch);
    match run_blocking("Error updating user", update).await {
        Ok(record) => {
            info!(admin = %admin.username, %email, "applicant updated");
            (StatusCode::OK, Json(record)).into_response()
        }
        Err(response) => response,
    }
}

pub(crate) async fn delete_handler<R>(
    State(service): State<Arc<ApplicantIntakeService<R>>>,
    Extension(admin): Extension<AdminIdentity>,
    Path(email): Path<String>,
) -> Response
where
    R: ApplicantRepository + 'static,
{
    let target = email.clone();
    let remove = move || service.delete_by_email(&target);
    match run_blocking("Error deleting user", remove).await {
        Ok(_) => {
            info!(admin = %admin.username, %email, "applicant deleted");
            let payload = json!({ "status": "User deleted successfully" });
            (StatusCode::OK, Json(payload)).into_response()
        }
        Err(response) => response,
    }
}

/// Runs a service call on the blocking pool; repository and upload I/O is
/// synchronous. Failures come back as the finished error response.
async fn run_blocking<T, F>(server_message: &'static str, task: F) -> Result<T, Response>
where
    F: FnOnce() -> Result<T, IntakeError> + Send + 'static,
    T: Send + 'static,
{
    match tokio::task::spawn_blocking(task).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(err)) => Err(intake_error_response(err, server_message)),
        Err(err) => {
            error!(error = %err, "{server_message}");
            Err(server_error(server_message))
        }
    }
}

/// Buffers the whole body: the email may arrive after the files it names a
/// directory for. Empty file inputs are skipped.
async fn read_submission(mut multipart: Multipart) -> Result<SubmittedForm, MultipartError> {
    let mut form = SubmittedForm::new();

    while let Some(field) = multipart.next_field().await? {
        let Some(name) = field.name().map(str::to_string) else {
            continue;
        };

        match field.file_name().map(str::to_string) {
            Some(file_name) => {
                let bytes = field.bytes().await?;
                if file_name.is_empty() && bytes.is_empty() {
                    continue;
                }
                form.push_file(UploadedFile {
                    field_name: name,
                    file_name,
                    bytes: bytes.to_vec(),
                });
            }
            None => {
                let value = field.text().await?;
                form.push_field(name, value);
            }
        }
    }

    Ok(form)
}

fn intake_error_response(err: IntakeError, server_message: &'static str) -> Response {
    let status = match &err {
        IntakeError::AlreadyRegistered(_) => StatusCode::CONFLICT,
        IntakeError::NotFound(_) => StatusCode::NOT_FOUND,
        client if client.is_client_error() => StatusCode::BAD_REQUEST,
        _ => {
            error!(error = %err, "{server_message}");
            return server_error(server_message);
        }
    };

    warn!(error = %err, status = status.as_u16(), "rejected request");
    (status, Json(json!({ "error": err.to_string() }))).into_response()
}

fn server_error(message: &'static str) -> Response {
    let payload = json!({ "error": message });
    (StatusCode::INTERNAL_SERVER_ERROR, Json(payload)).into_response()
}
