use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::response::Response;
use axum::Router;
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

use crate::config::SessionConfig;
use crate::workflows::onboarding::admin::{with_admin_sessions, AdminPages, StaticCredentials};
use crate::workflows::onboarding::domain::{
    ApplicantRecord, PostGraduationEntry, PriorEmploymentEntry, RecordId,
};
use crate::workflows::onboarding::form::{SubmittedForm, UploadedFile};
use crate::workflows::onboarding::repository::{ApplicantRepository, RepositoryError};
use crate::workflows::onboarding::router::{onboarding_router, OnboardingState};
use crate::workflows::onboarding::service::ApplicantIntakeService;
use crate::workflows::onboarding::uploads::DiskUploadStore;

pub(super) const EMAIL: &str = "asha@example.com";
pub(super) const ADMIN_USERNAME: &str = "admin";
pub(super) const ADMIN_PASSWORD: &str = "123";

pub(super) fn upload(field: &str, file_name: &str, bytes: &[u8]) -> UploadedFile {
    UploadedFile {
        field_name: field.to_string(),
        file_name: file_name.to_string(),
        bytes: bytes.to_vec(),
    }
}

/// Text fields plus the six mandatory documents, no repeated groups.
pub(super) fn complete_form() -> SubmittedForm {
    SubmittedForm::new()
        .with_field("email", EMAIL)
        .with_field("firstname", "Asha")
        .with_field("lastname", "Rao")
        .with_field("DOB", "1998-04-12")
        .with_field("yop10", "2014")
        .with_field("markType1", "percentage")
        .with_field("percentage1", "91")
        .with_field("graduationnod", "B.Tech")
        .with_field("aadharcardnum", "1234 5678 9012")
        .with_file(upload("resume", "resume.pdf", b"resume-bytes"))
        .with_file(upload("marksheet10", "tenth.pdf", b"tenth-bytes"))
        .with_file(upload("marksheet12", "twelfth.pdf", b"twelfth-bytes"))
        .with_file(upload("graduationmarksheet", "degree.pdf", b"degree-bytes"))
        .with_file(upload("aadharcard", "aadhar.pdf", b"aadhar-bytes"))
        .with_file(upload("pancard", "pan.pdf", b"pan-bytes"))
}

pub(super) fn form_without(field: &str) -> SubmittedForm {
    let complete = complete_form();
    let mut form = SubmittedForm::new();
    for name in ["email", "firstname", "lastname", "DOB"] {
        if let Some(value) = complete.text(name) {
            form.push_field(name, value);
        }
    }
    for file in complete.files() {
        if file.field_name != field {
            form.push_file(file.clone());
        }
    }
    form
}

pub(super) fn with_companies(mut form: SubmittedForm, count: u32) -> SubmittedForm {
    form.push_field("companyCount", count.to_string());
    for index in 1..=count {
        form.push_field(format!("companyname{index}"), format!("Company {index}"));
        form.push_field(format!("companyrole{index}"), "Engineer");
        form.push_field(format!("startdate{index}"), "2020-01-01");
        form.push_field(format!("enddate{index}"), "2021-12-31");
    }
    form
}

pub(super) fn session_config() -> SessionConfig {
    SessionConfig {
        secret: "test-session-secret".to_string(),
        secure_cookies: false,
        idle_timeout: Duration::from_secs(600),
    }
}

pub(super) fn build_service() -> (
    ApplicantIntakeService<MemoryRepository>,
    Arc<MemoryRepository>,
    TempDir,
) {
    build_service_with(MemoryRepository::default())
}

pub(super) fn build_service_with<R>(repository: R) -> (ApplicantIntakeService<R>, Arc<R>, TempDir)
where
    R: ApplicantRepository + 'static,
{
    let uploads = tempfile::tempdir().expect("uploads tempdir");
    let repository = Arc::new(repository);
    let service =
        ApplicantIntakeService::new(repository.clone(), DiskUploadStore::new(uploads.path()));
    (service, repository, uploads)
}

/// Public directory holding the two admin pages.
pub(super) fn public_dir() -> TempDir {
    let dir = tempfile::tempdir().expect("public tempdir");
    let admin = dir.path().join("frontend").join("admin");
    std::fs::create_dir_all(&admin).expect("admin page dir");
    std::fs::write(admin.join("login.html"), "<h1>Admin login</h1>").expect("login page");
    std::fs::write(admin.join("dashboard.html"), "<h1>Applicants</h1>").expect("dashboard page");
    dir
}

pub(super) fn router_with_service<R>(service: ApplicantIntakeService<R>, public: &Path) -> Router
where
    R: ApplicantRepository + 'static,
{
    router_with_sessions(service, public, &session_config())
}

pub(super) fn router_with_sessions<R>(
    service: ApplicantIntakeService<R>,
    public: &Path,
    sessions: &SessionConfig,
) -> Router
where
    R: ApplicantRepository + 'static,
{
    let state = OnboardingState::new(
        Arc::new(service),
        Arc::new(StaticCredentials::new(ADMIN_USERNAME, ADMIN_PASSWORD)),
        AdminPages::from_public_dir(public),
    );
    with_admin_sessions(onboarding_router(state), sessions)
}

/// Hand-assembled `multipart/form-data` payload.
pub(super) struct MultipartBody {
    buffer: Vec<u8>,
}

impl MultipartBody {
    pub(super) const BOUNDARY: &'static str = "intake-test-boundary";

    pub(super) fn from_form(form: &SubmittedForm, text_fields: &[&str]) -> Self {
        let mut body = Self { buffer: Vec::new() };
        for name in text_fields {
            if let Some(value) = form.text(name) {
                body = body.text(name, &value);
            }
        }
        for file in form.files() {
            body = body.file(&file.field_name, &file.file_name, &file.bytes);
        }
        body
    }

    pub(super) fn text(mut self, name: &str, value: &str) -> Self {
        self.buffer.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n",
                Self::BOUNDARY
            )
            .as_bytes(),
        );
        self
    }

    pub(super) fn file(mut self, name: &str, file_name: &str, bytes: &[u8]) -> Self {
        self.buffer.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"{name}\"; filename=\"{file_name}\"\r\nContent-Type: application/pdf\r\n\r\n",
                Self::BOUNDARY
            )
            .as_bytes(),
        );
        self.buffer.extend_from_slice(bytes);
        self.buffer.extend_from_slice(b"\r\n");
        self
    }

    pub(super) fn into_request(mut self, uri: &str) -> Request<Body> {
        self.buffer
            .extend_from_slice(format!("--{}--\r\n", Self::BOUNDARY).as_bytes());
        Request::post(uri)
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={}", Self::BOUNDARY),
            )
            .body(Body::from(self.buffer))
            .expect("multipart request")
    }
}

/// Text field names the fixtures may set.
const FIXTURE_FIELDS: [&str; 25] = [
    "email",
    "firstname",
    "lastname",
    "DOB",
    "yop10",
    "markType1",
    "percentage1",
    "graduationnod",
    "aadharcardnum",
    "companyCount",
    "companyname1",
    "companyrole1",
    "startdate1",
    "enddate1",
    "companyname2",
    "companyrole2",
    "startdate2",
    "enddate2",
    "dynamicFieldName1",
    "dynamicFieldValue1",
    "markType51",
    "grade51",
    "percentage51",
    "dynamicFieldName2",
    "markType52",
];

pub(super) fn sign_up_request(form: &SubmittedForm) -> Request<Body> {
    MultipartBody::from_form(form, &FIXTURE_FIELDS).into_request("/sign_up")
}

/// Logs in through the router and returns the `Cookie` header value for the session.
pub(super) async fn login(router: &Router, username: &str, password: &str) -> (StatusCode, Option<String>) {
    let response = router
        .clone()
        .oneshot(
            Request::post("/login")
                .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                .body(Body::from(format!("username={username}&password={password}")))
                .expect("login request"),
        )
        .await
        .expect("login route executes");

    let cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(';').next())
        .map(str::to_string);
    (response.status(), cookie)
}

pub(super) async fn get_with_cookie(router: &Router, uri: &str, cookie: Option<&str>) -> Response {
    let mut request = Request::get(uri);
    if let Some(cookie) = cookie {
        request = request.header(header::COOKIE, cookie);
    }
    router
        .clone()
        .oneshot(request.body(Body::empty()).expect("request"))
        .await
        .expect("route executes")
}

pub(super) fn location(response: &Response) -> Option<&str> {
    response
        .headers()
        .get(header::LOCATION)
        .and_then(|value| value.to_str().ok())
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 1 << 20)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}

#[derive(Default, Clone)]
pub(super) struct MemoryRepository {
    applicants: Arc<Mutex<Vec<ApplicantRecord>>>,
    post_graduation: Arc<Mutex<Vec<PostGraduationEntry>>>,
    prior_employment: Arc<Mutex<Vec<PriorEmploymentEntry>>>,
    prior_employment_limit: Option<usize>,
}

impl MemoryRepository {
    /// Store that goes offline once `limit` prior-employment rows exist.
    pub(super) fn failing_after_prior_employment(limit: usize) -> Self {
        Self {
            prior_employment_limit: Some(limit),
            ..Self::default()
        }
    }

    pub(super) fn applicant_count(&self) -> usize {
        self.applicants.lock().expect("repository mutex poisoned").len()
    }

    pub(super) fn post_graduation_entries(&self) -> Vec<PostGraduationEntry> {
        self.post_graduation.lock().expect("repository mutex poisoned").clone()
    }

    pub(super) fn prior_employment_entries(&self) -> Vec<PriorEmploymentEntry> {
        self.prior_employment.lock().expect("repository mutex poisoned").clone()
    }
}

impl ApplicantRepository for MemoryRepository {
    fn insert_post_graduation(
        &self,
        entry: PostGraduationEntry,
    ) -> Result<PostGraduationEntry, RepositoryError> {
        let mut guard = self.post_graduation.lock().expect("repository mutex poisoned");
        guard.push(entry.clone());
        Ok(entry)
    }

    fn insert_prior_employment(
        &self,
        entry: PriorEmploymentEntry,
    ) -> Result<PriorEmploymentEntry, RepositoryError> {
        let mut guard = self.prior_employment.lock().expect("repository mutex poisoned");
        if self.prior_employment_limit.is_some_and(|limit| guard.len() >= limit) {
            return Err(RepositoryError::Unavailable("disk full".to_string()));
        }
        guard.push(entry.clone());
        Ok(entry)
    }

    fn insert_applicant(&self, record: ApplicantRecord) -> Result<ApplicantRecord, RepositoryError> {
        let mut guard = self.applicants.lock().expect("repository mutex poisoned");
        if guard.iter().any(|existing| existing.email == record.email) {
            return Err(RepositoryError::Conflict);
        }
        guard.push(record.clone());
        Ok(record)
    }

    fn find_by_email(&self, email: &str) -> Result<Option<ApplicantRecord>, RepositoryError> {
        let guard = self.applicants.lock().expect("repository mutex poisoned");
        Ok(guard.iter().find(|record| record.email == email).cloned())
    }

    fn list_applicants(&self) -> Result<Vec<ApplicantRecord>, RepositoryError> {
        Ok(self.applicants.lock().expect("repository mutex poisoned").clone())
    }

    fn update_applicant(&self, record: ApplicantRecord) -> Result<(), RepositoryError> {
        let mut guard = self.applicants.lock().expect("repository mutex poisoned");
        match guard.iter_mut().find(|existing| existing.email == record.email) {
            Some(existing) => {
                *existing = record;
                Ok(())
            }
            None => Err(RepositoryError::NotFound),
        }
    }

    fn delete_by_email(&self, email: &str) -> Result<Option<ApplicantRecord>, RepositoryError> {
        let mut guard = self.applicants.lock().expect("repository mutex poisoned");
        let position = guard.iter().position(|record| record.email == email);
        Ok(position.map(|index| guard.remove(index)))
    }

    fn remove_post_graduation(&self, id: &RecordId) -> Result<(), RepositoryError> {
        let mut guard = self.post_graduation.lock().expect("repository mutex poisoned");
        guard.retain(|entry| entry.id != *id);
        Ok(())
    }

    fn remove_prior_employment(&self, id: &RecordId) -> Result<(), RepositoryError> {
        let mut guard = self.prior_employment.lock().expect("repository mutex poisoned");
        guard.retain(|entry| entry.id != *id);
        Ok(())
    }
}

/// Store whose email lookup never sees existing applicants, as happens when
/// two submissions for one email race past the duplicate check.
#[derive(Default)]
pub(super) struct StaleLookupRepository {
    pub(super) inner: MemoryRepository,
}

impl ApplicantRepository for StaleLookupRepository {
    fn insert_post_graduation(
        &self,
        entry: PostGraduationEntry,
    ) -> Result<PostGraduationEntry, RepositoryError> {
        self.inner.insert_post_graduation(entry)
    }

    fn insert_prior_employment(
        &self,
        entry: PriorEmploymentEntry,
    ) -> Result<PriorEmploymentEntry, RepositoryError> {
        self.inner.insert_prior_employment(entry)
    }

    fn insert_applicant(&self, record: ApplicantRecord) -> Result<ApplicantRecord, RepositoryError> {
        self.inner.insert_applicant(record)
    }

    fn find_by_email(&self, _email: &str) -> Result<Option<ApplicantRecord>, RepositoryError> {
        Ok(None)
    }

    fn list_applicants(&self) -> Result<Vec<ApplicantRecord>, RepositoryError> {
        self.inner.list_applicants()
    }

    fn update_applicant(&self, record: ApplicantRecord) -> Result<(), RepositoryError> {
        self.inner.update_applicant(record)
    }

    fn delete_by_email(&self, email: &str) -> Result<Option<ApplicantRecord>, RepositoryError> {
        self.inner.delete_by_email(email)
    }

    fn remove_post_graduation(&self, id: &RecordId) -> Result<(), RepositoryError> {
        self.inner.remove_post_graduation(id)
    }

    fn remove_prior_employment(&self, id: &RecordId) -> Result<(), RepositoryError> {
        self.inner.remove_prior_employment(id)
    }
}

pub(super) struct UnavailableRepository;

impl ApplicantRepository for UnavailableRepository {
    fn insert_post_graduation(
        &self,
        _entry: PostGraduationEntry,
    ) -> Result<PostGraduationEntry, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn insert_prior_employment(
        &self,
        _entry: PriorEmploymentEntry,
    ) -> Result<PriorEmploymentEntry, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn insert_applicant(&self, _record: ApplicantRecord) -> Result<ApplicantRecord, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn find_by_email(&self, _email: &str) -> Result<Option<ApplicantRecord>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn list_applicants(&self) -> Result<Vec<ApplicantRecord>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn update_applicant(&self, _record: ApplicantRecord) -> Result<(), RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn delete_by_email(&self, _email: &str) -> Result<Option<ApplicantRecord>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn remove_post_graduation(&self, _id: &RecordId) -> Result<(), RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn remove_prior_employment(&self, _id: &RecordId) -> Result<(), RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }
}
