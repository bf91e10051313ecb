use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tracing::debug;

use super::form::{dynamic_field_index, UploadedFile};

/// Shared directory for the first dynamic upload of every applicant.
pub const POST_GRADUATION_DIR: &str = "postgraduation";

/// Where an uploaded file lands relative to the uploads root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadDestination {
    SharedPostGraduation,
    DynamicField { email: String, folder_index: u32 },
    Applicant { email: String },
}

impl UploadDestination {
    pub fn resolve(email: &str, field_name: &str) -> Self {
        match dynamic_field_index(field_name) {
            Some(1) => Self::SharedPostGraduation,
            Some(index) => Self::DynamicField {
                email: email.to_string(),
                folder_index: index - 1,
            },
            None => Self::Applicant {
                email: email.to_string(),
            },
        }
    }

    pub fn relative_dir(&self) -> PathBuf {
        match self {
            Self::SharedPostGraduation => PathBuf::from(POST_GRADUATION_DIR),
            Self::DynamicField {
                email,
                folder_index,
            } => Path::new(email).join(format!("field{folder_index}")),
            Self::Applicant { email } => PathBuf::from(email),
        }
    }
}

/// A file persisted by [`DiskUploadStore`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredUpload {
    pub field_name: String,
    /// Path relative to the uploads root, with `/` separators.
    pub relative_path: String,
    pub absolute_path: PathBuf,
    /// False when the write replaced a file that was already on disk.
    pub created: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("User email is required.")]
    MissingEmail,
    #[error("email '{0}' cannot be used as an upload directory")]
    UnusableEmail(String),
    #[error("uploaded file name '{0}' is not usable")]
    InvalidFileName(String),
    #[error("failed to write upload {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl UploadError {
    pub fn is_client_error(&self) -> bool {
        !matches!(self, UploadError::Io { .. })
    }
}

/// Filesystem-backed file intake rooted at a configurable uploads directory.
#[derive(Debug, Clone)]
pub struct DiskUploadStore {
    root: PathBuf,
}

impl DiskUploadStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Writes one file under its original name, creating the destination
    /// directory first. An existing file at the same path is overwritten and
    /// the result is marked as not `created`.
    pub fn store(&self, email: &str, file: &UploadedFile) -> Result<StoredUpload, UploadError> {
        let email = checked_email(email)?;
        let file_name = checked_file_name(&file.file_name)?;
        let destination = UploadDestination::resolve(email, &file.field_name);
        let relative_dir = destination.relative_dir();
        let directory = self.root.join(&relative_dir);

        fs::create_dir_all(&directory).map_err(|source| UploadError::Io {
            path: directory.clone(),
            source,
        })?;

        let absolute_path = directory.join(file_name);
        let created = write_file(&absolute_path, &file.bytes).map_err(|source| UploadError::Io {
            path: absolute_path.clone(),
            source,
        })?;

        debug!(
            field = %file.field_name,
            path = %absolute_path.display(),
            bytes = file.bytes.len(),
            created,
            "stored upload"
        );

        Ok(StoredUpload {
            field_name: file.field_name.clone(),
            relative_path: relative_path_string(&relative_dir.join(file_name)),
            absolute_path,
            created,
        })
    }

    pub fn read(&self, upload: &StoredUpload) -> Result<Vec<u8>, UploadError> {
        fs::read(&upload.absolute_path).map_err(|source| UploadError::Io {
            path: upload.absolute_path.clone(),
            source,
        })
    }

    /// Deletes a stored file; a file that is already gone counts as removed.
    pub fn remove(&self, upload: &StoredUpload) -> Result<(), UploadError> {
        match fs::remove_file(&upload.absolute_path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(UploadError::Io {
                path: upload.absolute_path.clone(),
                source,
            }),
        }
    }
}

/// Returns whether the file was newly created.
fn write_file(path: &Path, bytes: &[u8]) -> io::Result<bool> {
    match fs::OpenOptions::new().write(true).create_new(true).open(path) {
        Ok(mut file) => match file.write_all(bytes) {
            Ok(()) => Ok(true),
            Err(err) => {
                drop(file);
                let _ = fs::remove_file(path);
                Err(err)
            }
        },
        Err(err) if err.kind() == io::ErrorKind::AlreadyExists => {
            fs::write(path, bytes)?;
            Ok(false)
        }
        Err(err) => Err(err),
    }
}

fn checked_email(email: &str) -> Result<&str, UploadError> {
    let email = email.trim();
    if email.is_empty() {
        return Err(UploadError::MissingEmail);
    }

    let unusable = !email.contains('@')
        || email.starts_with('.')
        || email.contains("..")
        || email
            .chars()
            .any(|c| c == '/' || c == '\\' || c == '\0' || c.is_control());
    if unusable {
        return Err(UploadError::UnusableEmail(email.to_string()));
    }

    Ok(email)
}

/// Keeps only the final path component of a client-supplied file name.
fn checked_file_name(raw: &str) -> Result<&str, UploadError> {
    let candidate = raw.rsplit(['/', '\\']).next().unwrap_or_default().trim();
    if candidate.is_empty() || candidate == "." || candidate == ".." || candidate.contains('\0') {
        return Err(UploadError::InvalidFileName(raw.to_string()));
    }
    Ok(candidate)
}

fn relative_path_string(path: &Path) -> String {
    path.components()
        .map(|component| component.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}
