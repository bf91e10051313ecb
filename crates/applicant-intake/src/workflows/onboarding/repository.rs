use super::domain::{ApplicantRecord, PostGraduationEntry, PriorEmploymentEntry, RecordId};

/// Storage abstraction over the three applicant collections.
pub trait ApplicantRepository: Send + Sync {
    fn insert_post_graduation(
        &self,
        entry: PostGraduationEntry,
    ) -> Result<PostGraduationEntry, RepositoryError>;
    fn insert_prior_employment(
        &self,
        entry: PriorEmploymentEntry,
    ) -> Result<PriorEmploymentEntry, RepositoryError>;
    /// Fails with [`RepositoryError::Conflict`] when the email is already registered.
    fn insert_applicant(&self, record: ApplicantRecord) -> Result<ApplicantRecord, RepositoryError>;
    fn find_by_email(&self, email: &str) -> Result<Option<ApplicantRecord>, RepositoryError>;
    fn list_applicants(&self) -> Result<Vec<ApplicantRecord>, RepositoryError>;
    /// Replaces the record stored under `record.email`.
    fn update_applicant(&self, record: ApplicantRecord) -> Result<(), RepositoryError>;
    /// Removes the record and returns it, or `None` when nothing matched.
    fn delete_by_email(&self, email: &str) -> Result<Option<ApplicantRecord>, RepositoryError>;
    fn remove_post_graduation(&self, id: &RecordId) -> Result<(), RepositoryError>;
    fn remove_prior_employment(&self, id: &RecordId) -> Result<(), RepositoryError>;
}

/// Error enumeration for repository failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}
