use std::sync::Arc;

use chrono::Utc;
use serde_json::{Map, Value};
use tracing::{error, info, warn};

use super::domain::{
    ApplicantDocuments, ApplicantRecord, DocumentBytes, PostGraduationEntry, PriorEmploymentEntry,
    RecordId,
};
use super::form::{ApplicantSubmission, FormError, SubmittedForm, UploadedFile};
use super::merge::MergeError;
use super::repository::{ApplicantRepository, RepositoryError};
use super::uploads::{DiskUploadStore, StoredUpload, UploadError};

/// Service composing the form extractor, upload store, and repository.
pub struct ApplicantIntakeService<R> {
    repository: Arc<R>,
    uploads: DiskUploadStore,
}

impl<R> ApplicantIntakeService<R>
where
    R: ApplicantRepository + 'static,
{
    pub fn new(repository: Arc<R>, uploads: DiskUploadStore) -> Self {
        Self {
            repository,
            uploads,
        }
    }

    /// Accepts a submission and persists the applicant with its sub-records.
    ///
    /// Validation runs before anything touches disk or the repository. Once
    /// writes begin, a failure removes the sub-records and the newly created
    /// files of this submission before the error is returned. Files that
    /// already existed are left in place since another record may own them.
    pub fn submit(&self, form: SubmittedForm) -> Result<ApplicantRecord, IntakeError> {
        let submission = ApplicantSubmission::from_form(form)?;

        if self.repository.find_by_email(&submission.email)?.is_some() {
            return Err(IntakeError::AlreadyRegistered(submission.email));
        }

        let mut unit = UnitOfWork::new(&*self.repository, &self.uploads);
        match assemble(&submission, &mut unit) {
            Ok(record) => {
                unit.commit();
                info!(
                    email = %record.email,
                    post_graduation = record.post_graduation.len(),
                    prior_employment = record.prior_employment.len(),
                    "applicant registered"
                );
                Ok(record)
            }
            Err(err) => {
                unit.rollback();
                Err(err)
            }
        }
    }

    pub fn list(&self) -> Result<Vec<ApplicantRecord>, IntakeError> {
        Ok(self.repository.list_applicants()?)
    }

    pub fn get(&self, email: &str) -> Result<ApplicantRecord, IntakeError> {
        self.repository
            .find_by_email(email)?
            .ok_or_else(|| IntakeError::NotFound(email.to_string()))
    }

    /// Applies an edit to the text fields of one applicant.
    pub fn update_by_email(
        &self,
        email: &str,
        patch: &Map<String, Value>,
    ) -> Result<ApplicantRecord, IntakeError> {
        let mut record = self.get(email)?;
        record.merge_patch(patch)?;

        match self.repository.update_applicant(record.clone()) {
            Ok(()) => Ok(record),
            Err(RepositoryError::NotFound) => Err(IntakeError::NotFound(email.to_string())),
            Err(err) => Err(err.into()),
        }
    }

    /// Removes an applicant together with the sub-records it links to.
    pub fn delete_by_email(&self, email: &str) -> Result<ApplicantRecord, IntakeError> {
        let record = self
            .repository
            .delete_by_email(email)?
            .ok_or_else(|| IntakeError::NotFound(email.to_string()))?;

        for id in &record.post_graduation {
            if let Err(err) = self.repository.remove_post_graduation(id) {
                warn!(%id, error = %err, "post-graduation entry left behind after delete");
            }
        }
        for id in &record.prior_employment {
            if let Err(err) = self.repository.remove_prior_employment(id) {
                warn!(%id, error = %err, "prior-employment entry left behind after delete");
            }
        }

        Ok(record)
    }
}

fn assemble<R>(
    submission: &ApplicantSubmission,
    unit: &mut UnitOfWork<'_, R>,
) -> Result<ApplicantRecord, IntakeError>
where
    R: ApplicantRepository + ?Sized,
{
    let email = &submission.email;
    let files = submission.form.files();
    let written = files
        .iter()
        .map(|file| unit.store_file(email, file))
        .collect::<Result<Vec<_>, _>>()?;
    let stored = StoredFiles {
        files,
        stored: &written,
        uploads: unit.uploads,
    };

    let documents = ApplicantDocuments {
        resume: stored.mandatory("resume")?,
        marksheet10: stored.mandatory("marksheet10")?,
        marksheet12: stored.mandatory("marksheet12")?,
        graduationmarksheet: stored.mandatory("graduationmarksheet")?,
        aadharcard: stored.mandatory("aadharcard")?,
        pancard: stored.mandatory("pancard")?,
        diplommarksheet: stored.optional("diplommarksheet")?,
    };

    let mut post_graduation = Vec::with_capacity(submission.post_graduation.len());
    for input in &submission.post_graduation {
        let upload = stored.at(input.upload_position);
        let entry = PostGraduationEntry {
            id: RecordId::generate(),
            email: email.clone(),
            sequence: input.sequence,
            field_name: input.field_name.clone(),
            field_value: input.field_value.clone(),
            mark_type: input.mark_type,
            grade: input.grade.clone(),
            percentage: input.percentage.clone(),
            marksheet_path: format!("/uploads/{}", upload.relative_path),
            marksheet: stored.read(upload)?,
        };
        post_graduation.push(unit.insert_post_graduation(entry)?);
    }

    let mut prior_employment = Vec::with_capacity(submission.prior_employment.len());
    for input in &submission.prior_employment {
        let entry = PriorEmploymentEntry {
            id: RecordId::generate(),
            email: email.clone(),
            company_name: input.company_name.clone(),
            role: input.role.clone(),
            start_date: input.start_date.clone(),
            end_date: input.end_date.clone(),
        };
        prior_employment.push(unit.insert_prior_employment(entry)?);
    }

    let record = ApplicantRecord {
        id: RecordId::generate(),
        email: email.clone(),
        submitted_at: Utc::now(),
        details: submission.details.clone(),
        documents,
        post_graduation,
        prior_employment,
    };

    match unit.repository.insert_applicant(record) {
        Ok(saved) => Ok(saved),
        Err(RepositoryError::Conflict) => Err(IntakeError::AlreadyRegistered(email.clone())),
        Err(err) => Err(err.into()),
    }
}

/// Uploads of one submission, indexed like [`SubmittedForm::files`].
struct StoredFiles<'a> {
    files: &'a [UploadedFile],
    stored: &'a [StoredUpload],
    uploads: &'a DiskUploadStore,
}

impl StoredFiles<'_> {
    fn at(&self, position: usize) -> &StoredUpload {
        &self.stored[position]
    }

    fn read(&self, upload: &StoredUpload) -> Result<DocumentBytes, UploadError> {
        self.uploads.read(upload).map(DocumentBytes)
    }

    fn optional(&self, field: &str) -> Result<Option<DocumentBytes>, UploadError> {
        self.files
            .iter()
            .position(|file| file.field_name == field)
            .map(|position| self.read(self.at(position)))
            .transpose()
    }

    fn mandatory(&self, field: &'static str) -> Result<DocumentBytes, IntakeError> {
        self.optional(field)?
            .ok_or(IntakeError::Form(FormError::MissingDocument { field }))
    }
}

/// Tracks what a submission has written so a failure can undo it.
struct UnitOfWork<'a, R: ?Sized> {
    repository: &'a R,
    uploads: &'a DiskUploadStore,
    files: Vec<StoredUpload>,
    post_graduation: Vec<RecordId>,
    prior_employment: Vec<RecordId>,
}

impl<'a, R> UnitOfWork<'a, R>
where
    R: ApplicantRepository + ?Sized,
{
    fn new(repository: &'a R, uploads: &'a DiskUploadStore) -> Self {
        Self {
            repository,
            uploads,
            files: Vec::new(),
            post_graduation: Vec::new(),
            prior_employment: Vec::new(),
        }
    }

    fn store_file(&mut self, email: &str, file: &UploadedFile) -> Result<StoredUpload, UploadError> {
        let stored = self.uploads.store(email, file)?;
        self.files.push(stored.clone());
        Ok(stored)
    }

    fn insert_post_graduation(
        &mut self,
        entry: PostGraduationEntry,
    ) -> Result<RecordId, RepositoryError> {
        let saved = self.repository.insert_post_graduation(entry)?;
        self.post_graduation.push(saved.id);
        Ok(saved.id)
    }

    fn insert_prior_employment(
        &mut self,
        entry: PriorEmploymentEntry,
    ) -> Result<RecordId, RepositoryError> {
        let saved = self.repository.insert_prior_employment(entry)?;
        self.prior_employment.push(saved.id);
        Ok(saved.id)
    }

    fn commit(self) {}

    fn rollback(self) {
        for id in &self.post_graduation {
            if let Err(err) = self.repository.remove_post_graduation(id) {
                error!(%id, error = %err, "failed to roll back post-graduation entry");
            }
        }
        for id in &self.prior_employment {
            if let Err(err) = self.repository.remove_prior_employment(id) {
                error!(%id, error = %err, "failed to roll back prior-employment entry");
            }
        }
        for upload in self.files.iter().filter(|upload| upload.created) {
            if let Err(err) = self.uploads.remove(upload) {
                error!(path = %upload.relative_path, error = %err, "failed to roll back upload");
            }
        }
    }
}

/// Error raised by the intake service.
#[derive(Debug, thiserror::Error)]
pub enum IntakeError {
    #[error(transparent)]
    Form(#[from] FormError),
    #[error(transparent)]
    Upload(#[from] UploadError),
    #[error("an applicant with email {0} is already registered")]
    AlreadyRegistered(String),
    #[error("User not found")]
    NotFound(String),
    #[error(transparent)]
    Merge(#[from] MergeError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl IntakeError {
    pub fn is_client_error(&self) -> bool {
        match self {
            IntakeError::Form(_)
            | IntakeError::AlreadyRegistered(_)
            | IntakeError::NotFound(_) => true,
            IntakeError::Merge(err) => !matches!(err, MergeError::Rebuild(_)),
            IntakeError::Upload(err) => err.is_client_error(),
            IntakeError::Repository(_) => false,
        }
    }
}
