use std::fmt;

use base64ct::{Base64, Encoding};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use uuid::Uuid;

/// Identifier wrapper shared by applicant records and their sub-records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RecordId(pub Uuid);

impl RecordId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Raw document bytes. Serialized as standard base64 text.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct DocumentBytes(pub Vec<u8>);

impl DocumentBytes {
    pub fn encoded(&self) -> String {
        Base64::encode_string(&self.0)
    }
}

impl fmt::Debug for DocumentBytes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DocumentBytes({} bytes)", self.0.len())
    }
}

impl From<Vec<u8>> for DocumentBytes {
    fn from(value: Vec<u8>) -> Self {
        Self(value)
    }
}

impl Serialize for DocumentBytes {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.encoded())
    }
}

impl<'de> Deserialize<'de> for DocumentBytes {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Base64::decode_vec(&raw)
            .map(Self)
            .map_err(|err| serde::de::Error::custom(format!("invalid base64 document: {err}")))
    }
}

/// Marking scheme reported for an education stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MarkType {
    Cgpa,
    Percentage,
}

impl MarkType {
    /// Returns `None` for blank or unrecognised values.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "cgpa" | "gpa" | "grade" => Some(Self::Cgpa),
            "percentage" | "percent" => Some(Self::Percentage),
            _ => None,
        }
    }
}

/// Upload field names that must accompany every submission.
pub const MANDATORY_DOCUMENT_FIELDS: [&str; 6] = [
    "resume",
    "marksheet10",
    "marksheet12",
    "graduationmarksheet",
    "aadharcard",
    "pancard",
];

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonalDetails {
    pub firstname: Option<String>,
    pub lastname: Option<String>,
    pub fathername: Option<String>,
    pub mothername: Option<String>,
    #[serde(rename = "DOB")]
    pub date_of_birth: Option<String>,
    pub sex: Option<String>,
    #[serde(rename = "Address")]
    pub address: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TenthGrade {
    #[serde(rename = "yop10")]
    pub year_of_passing: Option<String>,
    #[serde(rename = "markType1")]
    pub mark_type: Option<String>,
    #[serde(rename = "grade1")]
    pub grade: Option<String>,
    #[serde(rename = "percentage1")]
    pub percentage: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiplomaStage {
    #[serde(rename = "diplomanod")]
    pub name_of_degree: Option<String>,
    #[serde(rename = "diplomayop")]
    pub year_of_passing: Option<String>,
    #[serde(rename = "markType2")]
    pub mark_type: Option<String>,
    #[serde(rename = "grade2")]
    pub grade: Option<String>,
    #[serde(rename = "percentage2")]
    pub percentage: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TwelfthGrade {
    #[serde(rename = "yop12")]
    pub year_of_passing: Option<String>,
    #[serde(rename = "markType3")]
    pub mark_type: Option<String>,
    #[serde(rename = "grade3")]
    pub grade: Option<String>,
    #[serde(rename = "percentage3")]
    pub percentage: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraduationStage {
    #[serde(rename = "gradeType")]
    pub grade_type: Option<String>,
    #[serde(rename = "graduationnod")]
    pub name_of_degree: Option<String>,
    #[serde(rename = "graduationyop")]
    pub year_of_passing: Option<String>,
    #[serde(rename = "markType4")]
    pub mark_type: Option<String>,
    #[serde(rename = "grade4")]
    pub grade: Option<String>,
    #[serde(rename = "percentage4")]
    pub percentage: Option<String>,
}

/// Government identity numbers; the scanned documents live in [`ApplicantDocuments`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityNumbers {
    #[serde(rename = "aadharcardnum")]
    pub aadhar_number: Option<String>,
    #[serde(rename = "pcardnum")]
    pub pan_number: Option<String>,
    #[serde(rename = "passportnum")]
    pub passport_number: Option<String>,
    #[serde(rename = "passportexpiry")]
    pub passport_expiry: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentEmployment {
    #[serde(rename = "workingcompany")]
    pub company: Option<String>,
    #[serde(rename = "noticeperiod")]
    pub notice_period: Option<String>,
    #[serde(rename = "ctc")]
    pub cost_to_company: Option<String>,
}

/// Every text attribute of an applicant. Flattened on the wire so each field
/// keeps its form name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicantDetails {
    #[serde(flatten)]
    pub personal: PersonalDetails,
    #[serde(flatten)]
    pub tenth: TenthGrade,
    #[serde(flatten)]
    pub diploma: DiplomaStage,
    #[serde(flatten)]
    pub twelfth: TwelfthGrade,
    #[serde(flatten)]
    pub graduation: GraduationStage,
    #[serde(flatten)]
    pub identity: IdentityNumbers,
    #[serde(flatten)]
    pub employment: CurrentEmployment,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicantDocuments {
    pub resume: DocumentBytes,
    pub marksheet10: DocumentBytes,
    pub marksheet12: DocumentBytes,
    pub graduationmarksheet: DocumentBytes,
    pub aadharcard: DocumentBytes,
    pub pancard: DocumentBytes,
    #[serde(default)]
    pub diplommarksheet: Option<DocumentBytes>,
}

/// Primary record, one per email.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicantRecord {
    pub id: RecordId,
    pub email: String,
    pub submitted_at: DateTime<Utc>,
    #[serde(flatten)]
    pub details: ApplicantDetails,
    #[serde(flatten)]
    pub documents: ApplicantDocuments,
    #[serde(rename = "postgraduationtable", with = "id_list")]
    pub post_graduation: Vec<RecordId>,
    #[serde(rename = "prevcompanies", with = "id_list")]
    pub prior_employment: Vec<RecordId>,
}

/// One dynamic post-graduation group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostGraduationEntry {
    pub id: RecordId,
    pub email: String,
    #[serde(rename = "postgraduationNumber")]
    pub sequence: u32,
    #[serde(rename = "dynamicFieldName")]
    pub field_name: Option<String>,
    #[serde(rename = "dynamicFieldValue")]
    pub field_value: Option<String>,
    #[serde(rename = "markType5")]
    pub mark_type: Option<MarkType>,
    #[serde(rename = "grade5")]
    pub grade: Option<String>,
    #[serde(rename = "percentage5")]
    pub percentage: Option<String>,
    #[serde(rename = "postgraduationmarksheet")]
    pub marksheet_path: String,
    #[serde(rename = "marksheetData")]
    pub marksheet: DocumentBytes,
}

/// One indexed prior-employment group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriorEmploymentEntry {
    pub id: RecordId,
    pub email: String,
    #[serde(rename = "companyname")]
    pub company_name: String,
    #[serde(rename = "companyrole")]
    pub role: String,
    #[serde(rename = "startdate")]
    pub start_date: String,
    #[serde(rename = "enddate")]
    pub end_date: String,
}

/// Serializes identifier lists as a single comma-joined string.
mod id_list {
    use super::RecordId;
    use serde::{Deserialize, Deserializer, Serializer};
    use uuid::Uuid;

    pub(super) fn serialize<S: Serializer>(ids: &[RecordId], serializer: S) -> Result<S::Ok, S::Error> {
        let joined = ids
            .iter()
            .map(RecordId::to_string)
            .collect::<Vec<_>>()
            .join(",");
        serializer.serialize_str(&joined)
    }

    pub(super) fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Vec<RecordId>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.split(',')
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .map(|part| {
                Uuid::parse_str(part)
                    .map(RecordId)
                    .map_err(serde::de::Error::custom)
            })
            .collect()
    }
}
