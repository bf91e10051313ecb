//! Applicant onboarding: multipart intake, document storage, and the admin
//! management surface.

pub mod admin;
pub mod domain;
pub mod form;
pub mod merge;
pub mod repository;
pub mod router;
pub mod service;
pub mod uploads;

#[cfg(test)]
mod tests;

pub use admin::{with_admin_sessions, AdminIdentity, AdminPages, CredentialVerifier, StaticCredentials};
pub use domain::{
    ApplicantDetails, ApplicantDocuments, ApplicantRecord, DocumentBytes, MarkType,
    PostGraduationEntry, PriorEmploymentEntry, RecordId, MANDATORY_DOCUMENT_FIELDS,
};
pub use form::{ApplicantSubmission, FormError, SubmittedForm, UploadedFile};
pub use merge::MergeError;
pub use repository::{ApplicantRepository, RepositoryError};
pub use router::{onboarding_router, OnboardingState, LANDING_PAGE};
pub use service::{ApplicantIntakeService, IntakeError};
pub use uploads::{DiskUploadStore, StoredUpload, UploadDestination, UploadError};
