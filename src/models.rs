use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Column order of the job sheet. Every insert writes all of these.
pub const COLUMNS: [&str; 11] = [
    "DateApplied",
    "Company",
    "Location",
    "Position",
    "Link",
    "Salary",
    "JobType",
    "Remote",
    "Status",
    "Source",
    "Notes",
];

pub const DEFAULT_STATUS: &str = "Not applied";

pub type SheetRow = [String; 11];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Platform {
    LinkedIn,
    Handshake,
    Indeed,
    Other,
}

impl Platform {
    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::LinkedIn => "LinkedIn",
            Platform::Handshake => "Handshake",
            Platform::Indeed => "Indeed",
            Platform::Other => "Other",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum JobType {
    #[serde(rename = "Full-time")]
    FullTime,
    #[serde(rename = "Part-time")]
    PartTime,
    Contract,
    Internship,
    #[default]
    #[serde(rename = "")]
    Unspecified,
}

impl JobType {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobType::FullTime => "Full-time",
            JobType::PartTime => "Part-time",
            JobType::Contract => "Contract",
            JobType::Internship => "Internship",
            JobType::Unspecified => "",
        }
    }

    /// Keyword detection over free text. Internships are checked first since
    /// intern postings frequently also say "full-time".
    pub fn detect(text: &str) -> Self {
        let lower = text.to_lowercase();
        if lower.contains("internship") || lower.contains("intern position") {
            JobType::Internship
        } else if lower.contains("full-time") || lower.contains("full time") {
            JobType::FullTime
        } else if lower.contains("part-time") || lower.contains("part time") {
            JobType::PartTime
        } else if lower.contains("contract") {
            JobType::Contract
        } else {
            JobType::Unspecified
        }
    }

    pub fn is_unspecified(&self) -> bool {
        *self == JobType::Unspecified
    }
}

impl fmt::Display for JobType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RemoteType {
    Remote,
    Hybrid,
    #[serde(rename = "On-site")]
    OnSite,
    #[default]
    #[serde(rename = "")]
    Unspecified,
}

impl RemoteType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RemoteType::Remote => "Remote",
            RemoteType::Hybrid => "Hybrid",
            RemoteType::OnSite => "On-site",
            RemoteType::Unspecified => "",
        }
    }

    pub fn detect(text: &str) -> Self {
        let lower = text.to_lowercase();
        if lower.contains("remote") {
            RemoteType::Remote
        } else if lower.contains("hybrid") {
            RemoteType::Hybrid
        } else if lower.contains("on-site") || lower.contains("onsite") || lower.contains("in-person") {
            RemoteType::OnSite
        } else {
            RemoteType::Unspecified
        }
    }

    pub fn is_unspecified(&self) -> bool {
        *self == RemoteType::Unspecified
    }
}

impl fmt::Display for RemoteType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Output of a field extractor: a job record before salary normalization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawFields {
    pub date_added: NaiveDate,
    pub platform: Platform,
    pub company: String,
    pub title: String,
    pub location: String,
    pub salary_raw: String,
    pub job_type: JobType,
    pub remote: RemoteType,
    pub url: String,
    pub status: String,
    pub notes: String,
}

impl RawFields {
    pub fn empty(platform: Platform, url: &str) -> Self {
        Self {
            date_added: chrono::Local::now().date_naive(),
            platform,
            company: String::new(),
            title: String::new(),
            location: String::new(),
            salary_raw: String::new(),
            job_type: JobType::Unspecified,
            remote: RemoteType::Unspecified,
            url: url.trim().to_string(),
            status: DEFAULT_STATUS.to_string(),
            notes: String::new(),
        }
    }

    pub fn append_note(&mut self, note: &str) {
        let note = note.trim();
        if note.is_empty() {
            return;
        }
        if !self.notes.is_empty() {
            self.notes.push_str("; ");
        }
        self.notes.push_str(note);
    }

    /// True when nothing beyond the url was recovered.
    pub fn is_blank(&self) -> bool {
        self.company.is_empty()
            && self.title.is_empty()
            && self.location.is_empty()
            && self.salary_raw.is_empty()
            && self.job_type.is_unspecified()
            && self.remote.is_unspecified()
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct NormalizedSalary {
    pub annual_amount: Option<f64>,
    pub display: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobRecord {
    pub date_added: NaiveDate,
    pub platform: Platform,
    pub company: String,
    pub title: String,
    pub location: String,
    pub salary_raw: String,
    pub salary_normalized: NormalizedSalary,
    pub job_type: JobType,
    pub remote: RemoteType,
    pub url: String,
    pub status: String,
    pub notes: String,
}

impl JobRecord {
    pub fn from_raw(raw: RawFields, salary_normalized: NormalizedSalary) -> Self {
        Self {
            date_added: raw.date_added,
            platform: raw.platform,
            company: raw.company,
            title: raw.title,
            location: raw.location,
            salary_raw: raw.salary_raw,
            salary_normalized,
            job_type: raw.job_type,
            remote: raw.remote,
            url: raw.url,
            status: raw.status,
            notes: raw.notes,
        }
    }

    /// Cells in `COLUMNS` order. Empty values are still written.
    pub fn to_row(&self) -> SheetRow {
        let salary = if self.salary_normalized.display.is_empty() {
            self.salary_raw.clone()
        } else {
            self.salary_normalized.display.clone()
        };

        [
            self.date_added.format("%Y-%m-%d").to_string(),
            self.company.clone(),
            self.location.clone(),
            self.title.clone(),
            self.url.clone(),
            salary,
            self.job_type.as_str().to_string(),
            self.remote.as_str().to_string(),
            self.status.clone(),
            self.platform.as_str().to_string(),
            self.notes.clone(),
        ]
    }
}
