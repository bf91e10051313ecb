use serde_json::{Map, Value};

use super::domain::{ApplicantDetails, ApplicantRecord};

/// Fields that identify a record and never change through an edit.
const IMMUTABLE_FIELDS: [&str; 2] = ["id", "email"];

/// Record attributes that are echoed back by clients but only set at intake.
const READ_ONLY_FIELDS: [&str; 10] = [
    "submitted_at",
    "resume",
    "marksheet10",
    "marksheet12",
    "graduationmarksheet",
    "aadharcard",
    "pancard",
    "diplommarksheet",
    "postgraduationtable",
    "prevcompanies",
];

#[derive(Debug, thiserror::Error)]
pub enum MergeError {
    #[error("field '{0}' cannot be changed")]
    ImmutableField(String),
    #[error("field '{0}' is not editable")]
    UnknownField(String),
    #[error("field '{field}' must be a string, number, or null")]
    InvalidValue { field: String },
    #[error("applicant details could not be rebuilt: {0}")]
    Rebuild(#[from] serde_json::Error),
}

impl ApplicantRecord {
    /// Merges a JSON object into the text fields of the record.
    ///
    /// Keys use the form names (`firstname`, `DOB`, `markType1`, ...). `id` and
    /// `email` may be sent back unchanged but not altered; documents, linkage
    /// and the submission timestamp are skipped. Blank strings clear the field.
    pub fn merge_patch(&mut self, patch: &Map<String, Value>) -> Result<(), MergeError> {
        let mut current = match serde_json::to_value(&self.details)? {
            Value::Object(map) => map,
            _ => Map::new(),
        };

        for (key, value) in patch {
            if IMMUTABLE_FIELDS.contains(&key.as_str()) {
                let unchanged = match key.as_str() {
                    "id" => value.as_str() == Some(self.id.to_string().as_str()),
                    _ => value.as_str() == Some(self.email.as_str()),
                };
                if unchanged {
                    continue;
                }
                return Err(MergeError::ImmutableField(key.clone()));
            }

            if READ_ONLY_FIELDS.contains(&key.as_str()) {
                continue;
            }

            if !current.contains_key(key) {
                return Err(MergeError::UnknownField(key.clone()));
            }

            let normalized = match value {
                Value::Null => Value::Null,
                Value::String(text) if text.trim().is_empty() => Value::Null,
                Value::String(text) => Value::String(text.trim().to_string()),
                Value::Number(number) => Value::String(number.to_string()),
                _ => {
                    return Err(MergeError::InvalidValue { field: key.clone() });
                }
            };
            current.insert(key.clone(), normalized);
        }

        let details: ApplicantDetails = serde_json::from_value(Value::Object(current))?;
        self.details = details;
        Ok(())
    }
}
