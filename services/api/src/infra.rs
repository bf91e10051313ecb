use applicant_intake::workflows::onboarding::{
    ApplicantRecord, ApplicantRepository, PostGraduationEntry, PriorEmploymentEntry, RecordId,
    RepositoryError,
};
use metrics_exporter_prometheus::PrometheusHandle;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{error, info};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// The three applicant collections, as written to the snapshot file.
#[derive(Debug, Default, Serialize, Deserialize)]
struct Collections {
    applicants: Vec<ApplicantRecord>,
    #[serde(rename = "postgraduation")]
    post_graduation: Vec<PostGraduationEntry>,
    #[serde(rename = "prevcompanies")]
    prior_employment: Vec<PriorEmploymentEntry>,
}

/// Mutex-guarded document store. With a snapshot path every successful write
/// rewrites the JSON file, so records survive a restart.
pub(crate) struct DocumentStoreRepository {
    collections: Mutex<Collections>,
    snapshot: Option<PathBuf>,
}

impl DocumentStoreRepository {
    pub(crate) fn in_memory() -> Self {
        Self {
            collections: Mutex::new(Collections::default()),
            snapshot: None,
        }
    }

    /// Loads `snapshot` when it exists; a missing file starts an empty store.
    pub(crate) fn open(snapshot: Option<PathBuf>) -> io::Result<Self> {
        let Some(path) = snapshot else {
            return Ok(Self::in_memory());
        };

        let collections = load(&path)?;
        info!(
            path = %path.display(),
            applicants = collections.applicants.len(),
            "document store loaded"
        );

        Ok(Self {
            collections: Mutex::new(collections),
            snapshot: Some(path),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Collections>, RepositoryError> {
        self.collections
            .lock()
            .map_err(|_| RepositoryError::Unavailable("document store lock poisoned".to_string()))
    }

    fn read<T>(&self, query: impl FnOnce(&Collections) -> T) -> Result<T, RepositoryError> {
        let guard = self.lock()?;
        Ok(query(&guard))
    }

    /// Applies `change` in place, then rewrites the snapshot. When the rewrite
    /// fails the last committed snapshot is reloaded, so the store never holds
    /// a change that is not on disk. `change` must not mutate when it errors.
    fn write<T>(
        &self,
        change: impl FnOnce(&mut Collections) -> Result<T, RepositoryError>,
    ) -> Result<T, RepositoryError> {
        let mut guard = self.lock()?;
        let outcome = change(&mut guard)?;
        let Some(path) = &self.snapshot else {
            return Ok(outcome);
        };

        if let Err(err) = persist(path, &guard) {
            match load(path) {
                Ok(committed) => *guard = committed,
                Err(reload) => error!(
                    path = %path.display(),
                    error = %reload,
                    "document store diverged from its snapshot"
                ),
            }
            return Err(err);
        }
        Ok(outcome)
    }
}

/// Reads a snapshot file; a missing file is an empty store.
fn load(path: &Path) -> io::Result<Collections> {
    match fs::read(path) {
        Ok(bytes) => serde_json::from_slice(&bytes)
            .map_err(|err| io::Error::new(io::ErrorKind::InvalidData, err)),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(Collections::default()),
        Err(err) => Err(err),
    }
}

fn persist(path: &Path, collections: &Collections) -> Result<(), RepositoryError> {
    let bytes = serde_json::to_vec(collections).map_err(|err| unavailable(path, err))?;
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|err| unavailable(path, err))?;
    }
    let staging = path.with_extension("tmp");
    fs::write(&staging, bytes).map_err(|err| unavailable(path, err))?;
    fs::rename(&staging, path).map_err(|err| unavailable(path, err))
}

fn unavailable(path: &Path, err: impl fmt::Display) -> RepositoryError {
    RepositoryError::Unavailable(format!("snapshot {}: {err}", path.display()))
}

impl ApplicantRepository for DocumentStoreRepository {
    fn insert_post_graduation(
        &self,
        entry: PostGraduationEntry,
    ) -> Result<PostGraduationEntry, RepositoryError> {
        self.write(|collections| {
            collections.post_graduation.push(entry.clone());
            Ok(entry)
        })
    }

    fn insert_prior_employment(
        &self,
        entry: PriorEmploymentEntry,
    ) -> Result<PriorEmploymentEntry, RepositoryError> {
        self.write(|collections| {
            collections.prior_employment.push(entry.clone());
            Ok(entry)
        })
    }

    fn insert_applicant(&self, record: ApplicantRecord) -> Result<ApplicantRecord, RepositoryError> {
        self.write(|collections| {
            if collections
                .applicants
                .iter()
                .any(|existing| existing.email == record.email)
            {
                return Err(RepositoryError::Conflict);
            }
            collections.applicants.push(record.clone());
            Ok(record)
        })
    }

    fn find_by_email(&self, email: &str) -> Result<Option<ApplicantRecord>, RepositoryError> {
        self.read(|collections| {
            collections
                .applicants
                .iter()
                .find(|record| record.email == email)
                .cloned()
        })
    }

    fn list_applicants(&self) -> Result<Vec<ApplicantRecord>, RepositoryError> {
        self.read(|collections| collections.applicants.clone())
    }

    fn update_applicant(&self, record: ApplicantRecord) -> Result<(), RepositoryError> {
        self.write(|collections| {
            let existing = collections
                .applicants
                .iter_mut()
                .find(|existing| existing.email == record.email)
                .ok_or(RepositoryError::NotFound)?;
            *existing = record;
            Ok(())
        })
    }

    fn delete_by_email(&self, email: &str) -> Result<Option<ApplicantRecord>, RepositoryError> {
        self.write(|collections| {
            let position = collections
                .applicants
                .iter()
                .position(|record| record.email == email);
            Ok(position.map(|index| collections.applicants.remove(index)))
        })
    }

    fn remove_post_graduation(&self, id: &RecordId) -> Result<(), RepositoryError> {
        self.write(|collections| {
            collections.post_graduation.retain(|entry| entry.id != *id);
            Ok(())
        })
    }

    fn remove_prior_employment(&self, id: &RecordId) -> Result<(), RepositoryError> {
        self.write(|collections| {
            collections.prior_employment.retain(|entry| entry.id != *id);
            Ok(())
        })
    }
}
