use std::collections::HashMap;

use super::domain::{
    ApplicantDetails, CurrentEmployment, DiplomaStage, GraduationStage, IdentityNumbers,
    MarkType, PersonalDetails, TenthGrade, TwelfthGrade, MANDATORY_DOCUMENT_FIELDS,
};

/// Prefix shared by the repeated post-graduation upload fields (`dynamicField1`, ...).
pub const DYNAMIC_FIELD_PREFIX: &str = "dynamicField";

/// File part received with a submission, held in memory until the intake adapter stores it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedFile {
    pub field_name: String,
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl UploadedFile {
    /// Index carried by a `dynamicField{N}` field name, if the name matches the pattern.
    pub fn dynamic_index(&self) -> Option<u32> {
        dynamic_field_index(&self.field_name)
    }
}

pub fn dynamic_field_index(field_name: &str) -> Option<u32> {
    let suffix = field_name.strip_prefix(DYNAMIC_FIELD_PREFIX)?;
    if suffix.is_empty() || !suffix.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    suffix.parse::<u32>().ok().filter(|index| *index > 0)
}

/// Raw multipart body: text fields by name plus file parts in upload order.
#[derive(Debug, Clone, Default)]
pub struct SubmittedForm {
    fields: HashMap<String, String>,
    files: Vec<UploadedFile>,
}

impl SubmittedForm {
    pub fn new() -> Self {
        Self::default()
    }

    /// Repeated text fields keep the last value, matching url-encoded form semantics.
    pub fn push_field(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.fields.insert(name.into(), value.into());
    }

    pub fn push_file(&mut self, file: UploadedFile) {
        self.files.push(file);
    }

    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.push_field(name, value);
        self
    }

    pub fn with_file(mut self, file: UploadedFile) -> Self {
        self.push_file(file);
        self
    }

    /// Trimmed value of a text field; blank values read as absent.
    pub fn text(&self, name: &str) -> Option<String> {
        self.fields
            .get(name)
            .map(|value| value.trim())
            .filter(|value| !value.is_empty())
            .map(str::to_string)
    }

    pub fn files(&self) -> &[UploadedFile] {
        &self.files
    }

    pub fn file(&self, field_name: &str) -> Option<&UploadedFile> {
        self.files.iter().find(|file| file.field_name == field_name)
    }

    pub fn dynamic_files(&self) -> impl Iterator<Item = &UploadedFile> {
        self.files
            .iter()
            .filter(|file| file.dynamic_index().is_some())
    }

    pub fn email(&self) -> Option<String> {
        self.text("email")
    }
}

/// Extraction failures; all of them are caused by the submitted form.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FormError {
    #[error("User email is required.")]
    MissingEmail,
    #[error("{field} file is required.")]
    MissingDocument { field: &'static str },
    #[error("companyCount must be a non-negative integer (found '{0}')")]
    InvalidCompanyCount(String),
    #[error("All company fields are required (company {index} is missing {field}).")]
    IncompleteEmployment { index: u32, field: &'static str },
}

/// Typed company-history group, parsed from `companyname{i}` and friends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmploymentInput {
    pub company_name: String,
    pub role: String,
    pub start_date: String,
    pub end_date: String,
}

/// Typed post-graduation group. `upload_position` points into [`SubmittedForm::files`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostGraduationInput {
    pub sequence: u32,
    pub upload_position: usize,
    pub field_name: Option<String>,
    pub field_value: Option<String>,
    pub mark_type: Option<MarkType>,
    pub grade: Option<String>,
    pub percentage: Option<String>,
}

impl PostGraduationInput {
    /// Keeps only the value matching the mark type; both are dropped for an
    /// unrecognised or missing mark type.
    fn resolve_marks(
        mark_type: Option<MarkType>,
        grade: Option<String>,
        percentage: Option<String>,
    ) -> (Option<String>, Option<String>) {
        match mark_type {
            Some(MarkType::Cgpa) => (grade, None),
            Some(MarkType::Percentage) => (None, percentage),
            None => (None, None),
        }
    }
}

/// Fully validated submission, ready for the record assembler.
#[derive(Debug, Clone)]
pub struct ApplicantSubmission {
    pub email: String,
    pub details: ApplicantDetails,
    pub post_graduation: Vec<PostGraduationInput>,
    pub prior_employment: Vec<EmploymentInput>,
    pub form: SubmittedForm,
}

impl ApplicantSubmission {
    /// Parses the form once, rejecting it before anything is written when a
    /// mandatory document or employment field is missing.
    pub fn from_form(form: SubmittedForm) -> Result<Self, FormError> {
        let email = form.email().ok_or(FormError::MissingEmail)?;

        for field in MANDATORY_DOCUMENT_FIELDS {
            if form.file(field).is_none() {
                return Err(FormError::MissingDocument { field });
            }
        }

        let details = extract_details(&form);
        let prior_employment = extract_employment(&form)?;
        let post_graduation = extract_post_graduation(&form);

        Ok(Self {
            email,
            details,
            post_graduation,
            prior_employment,
            form,
        })
    }
}

fn extract_details(form: &SubmittedForm) -> ApplicantDetails {
    ApplicantDetails {
        personal: PersonalDetails {
            firstname: form.text("firstname"),
            lastname: form.text("lastname"),
            fathername: form.text("fathername"),
            mothername: form.text("mothername"),
            date_of_birth: form.text("DOB"),
            sex: form.text("sex"),
            address: form.text("Address"),
        },
        tenth: TenthGrade {
            year_of_passing: form.text("yop10"),
            mark_type: form.text("markType1"),
            grade: form.text("grade1"),
            percentage: form.text("percentage1"),
        },
        diploma: DiplomaStage {
            name_of_degree: form.text("diplomanod"),
            year_of_passing: form.text("diplomayop"),
            mark_type: form.text("markType2"),
            grade: form.text("grade2"),
            percentage: form.text("percentage2"),
        },
        twelfth: TwelfthGrade {
            year_of_passing: form.text("yop12"),
            mark_type: form.text("markType3"),
            grade: form.text("grade3"),
            percentage: form.text("percentage3"),
        },
        graduation: GraduationStage {
            grade_type: form.text("gradeType"),
            name_of_degree: form.text("graduationnod"),
            year_of_passing: form.text("graduationyop"),
            mark_type: form.text("markType4"),
            grade: form.text("grade4"),
            percentage: form.text("percentage4"),
        },
        identity: IdentityNumbers {
            aadhar_number: form.text("aadharcardnum"),
            pan_number: form.text("pcardnum"),
            passport_number: form.text("passportnum"),
            passport_expiry: form.text("passportexpiry"),
        },
        employment: CurrentEmployment {
            company: form.text("workingcompany"),
            notice_period: form.text("noticeperiod"),
            cost_to_company: form.text("ctc"),
        },
    }
}

fn company_count(form: &SubmittedForm) -> Result<u32, FormError> {
    match form.text("companyCount") {
        None => Ok(0),
        Some(raw) => raw
            .parse::<u32>()
            .map_err(|_| FormError::InvalidCompanyCount(raw)),
    }
}

fn extract_employment(form: &SubmittedForm) -> Result<Vec<EmploymentInput>, FormError> {
    let count = company_count(form)?;
    let mut entries = Vec::new();

    for index in 1..=count {
        let required = |field: &'static str| {
            form.text(&format!("{field}{index}"))
                .ok_or(FormError::IncompleteEmployment { index, field })
        };

        entries.push(EmploymentInput {
            company_name: required("companyname")?,
            role: required("companyrole")?,
            start_date: required("startdate")?,
            end_date: required("enddate")?,
        });
    }

    Ok(entries)
}

fn extract_post_graduation(form: &SubmittedForm) -> Vec<PostGraduationInput> {
    form.files()
        .iter()
        .enumerate()
        .filter(|(_, file)| file.dynamic_index().is_some())
        .zip(1u32..)
        .map(|((upload_position, _), sequence)| {
            let mark_type = form
                .text(&format!("markType5{sequence}"))
                .as_deref()
                .and_then(MarkType::parse);
            let (grade, percentage) = PostGraduationInput::resolve_marks(
                mark_type,
                form.text(&format!("grade5{sequence}")),
                form.text(&format!("percentage5{sequence}")),
            );

            PostGraduationInput {
                sequence,
                upload_position,
                field_name: form.text(&format!("dynamicFieldName{sequence}")),
                field_value: form.text(&format!("dynamicFieldValue{sequence}")),
                mark_type,
                grade,
                percentage,
            }
        })
        .collect()
}
