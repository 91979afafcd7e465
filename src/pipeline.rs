use crate::classify::{classify, TEXT_ONLY_PLATFORM};
use crate::config::Config;
use crate::extract::{parse_text, ExtractorKind, FieldExtractor};
use crate::models::{JobRecord, DEFAULT_STATUS};
use crate::salary;
use crate::store::{PersistError, RecordGateway, RowPosition, TabularStore};

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub platform_parsers: bool,
    pub default_status: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            platform_parsers: true,
            default_status: DEFAULT_STATUS.to_string(),
        }
    }
}

impl From<&Config> for PipelineConfig {
    fn from(config: &Config) -> Self {
        Self {
            platform_parsers: config.platform_parsers,
            default_status: config.default_status.clone(),
        }
    }
}

#[derive(Debug, Clone)]
pub enum JobInput {
    /// Fetched (or saved) HTML and the URL it came from.
    Page { markup: String, url: String },
    /// Copied page text, for sites that block fetching.
    Pasted { text: String, url: Option<String> },
}

pub struct Pipeline {
    config: PipelineConfig,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    /// Turn input into a complete record. Never fails; problems end up in `notes`.
    pub fn build(&self, input: &JobInput) -> JobRecord {
        let mut raw = match input {
            JobInput::Page { markup, url } => {
                let platform = classify(Some(url.as_str()));
                let kind = ExtractorKind::for_platform(platform, self.config.platform_parsers);
                tracing::debug!(%platform, extractor = kind.name(), "selected extractor");
                kind.extract(markup, url)
            }
            JobInput::Pasted { text, url } => {
                tracing::debug!(platform = %TEXT_ONLY_PLATFORM, "parsing pasted text");
                parse_text(text, url.as_deref().unwrap_or_default())
            }
        };

        if !self.config.default_status.trim().is_empty() {
            raw.status = self.config.default_status.trim().to_string();
        }

        let salary = salary::normalize(&raw.salary_raw);
        let record = JobRecord::from_raw(raw, salary);
        tracing::info!(
            title = %record.title,
            company = %record.company,
            annual = ?record.salary_normalized.annual_amount,
            "built job record"
        );
        record
    }

    pub fn submit<S: TabularStore>(
        &self,
        gateway: &mut RecordGateway<S>,
        record: &JobRecord,
        replace_most_recent: bool,
    ) -> Result<RowPosition, PersistError> {
        gateway.persist(record, replace_most_recent)
    }
}
