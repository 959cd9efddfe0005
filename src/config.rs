use std::{fs::File, io::Read, path::PathBuf};

use chrono::{DateTime, NaiveDate};
use serde::Deserialize;

/// Where reports go when nothing else is configured
pub const DEFAULT_OUTPUT_DIR: &str = "output";

/// Default number of items per page when talking to GitHub
pub const DEFAULT_PAGE_SIZE: u8 = 100;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("no organization given: pass --org or set GH_ORG")]
    MissingOrganization,
    #[error("no cutoff date given: pass --date YYYY-MM-DD")]
    MissingDate,
    #[error("couldn't understand the date {0:?}: expected YYYY-MM-DD")]
    InvalidDate(String),
    #[error("no repository range given: pass both --start and --finish")]
    MissingRange,
    #[error("repository rows start at 1, got {0}")]
    RowZero(u32),
    #[error("the start row {start} is after the finish row {finish}")]
    StartAfterFinish { start: u32, finish: u32 },
    #[error("the finish row {finish} is past the {len} repositories in the organization")]
    RangeOutOfBounds { finish: u32, len: usize },
    #[error("couldn't read the configuration file: {0}")]
    File(String),
}

/// Optional TOML file with the settings nobody wants to type every time
#[derive(Debug, Default, Deserialize, PartialEq, Eq)]
pub struct FileConfiguration {
    pub token: Option<String>,
    pub organization: Option<String>,
    pub output: Option<PathBuf>,
    pub page_size: Option<u8>,
}

/// Read the configuration file at the given path
pub fn get_configuration(path: &str) -> Result<FileConfiguration, ConfigError> {
    let mut file =
        File::open(path).map_err(|e| ConfigError::File(format!("failed to open {path}: {e}")))?;
    let mut buf = String::new();
    file.read_to_string(&mut buf)
        .map_err(|e| ConfigError::File(format!("failed to read {path}: {e}")))?;
    toml::from_str(&buf).map_err(|e| ConfigError::File(format!("failed to parse {path}: {e}")))
}

/// The slice of repositories to scan, as the operator gives it:
/// 1-based, both ends included.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowBounds {
    start: u32,
    finish: u32,
}

impl RowBounds {
    pub fn new(start: u32, finish: u32) -> Result<Self, ConfigError> {
        if start == 0 {
            return Err(ConfigError::RowZero(start));
        }
        if finish == 0 {
            return Err(ConfigError::RowZero(finish));
        }
        if start > finish {
            return Err(ConfigError::StartAfterFinish { start, finish });
        }
        Ok(Self { start, finish })
    }

    pub fn start(&self) -> u32 {
        self.start
    }

    pub fn finish(&self) -> u32 {
        self.finish
    }

    /// Check the bounds against the number of repositories we actually have
    pub fn resolve(&self, len: usize) -> Result<RunRange, ConfigError> {
        let finish = self.finish as usize - 1;
        if finish >= len {
            return Err(ConfigError::RangeOutOfBounds {
                finish: self.finish,
                len,
            });
        }
        Ok(RunRange {
            start: self.start as usize - 1,
            finish,
        })
    }
}

/// A resolved, 0-based, inclusive range over the repository list
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunRange {
    pub start: usize,
    pub finish: usize,
}

impl RunRange {
    pub fn slice<'a>(&self, repositories: &'a [String]) -> &'a [String] {
        &repositories[self.start..=self.finish]
    }
}

/// Accepts plain calendar dates, and full timestamps of which only the date is kept
pub fn parse_date(value: &str) -> Result<NaiveDate, ConfigError> {
    let value = value.trim();
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(value, "%Y/%m/%d"))
        .or_else(|_| DateTime::parse_from_rfc3339(value).map(|d| d.date_naive()))
        .map_err(|_| ConfigError::InvalidDate(value.to_string()))
}

/// Everything the operator told us, before validation
#[derive(Debug, Default, Clone)]
pub struct ConfigurationInputs {
    pub organization: Option<String>,
    pub date: Option<String>,
    pub start: Option<u32>,
    pub finish: Option<u32>,
    pub resolve_emails: bool,
    pub output_dir: Option<PathBuf>,
}

/// A validated classification run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunConfiguration {
    pub organization: String,
    pub since: NaiveDate,
    pub rows: RowBounds,
    pub resolve_emails: bool,
    pub output_dir: PathBuf,
}

impl ConfigurationInputs {
    /// Fill in what the command line left out, first from the configuration
    /// file, then from `GH_ORG`
    pub fn with_file(self, file: &FileConfiguration) -> Self {
        self.with_sources(file, std::env::var("GH_ORG").ok())
    }

    fn with_sources(mut self, file: &FileConfiguration, env_organization: Option<String>) -> Self {
        if self.organization.is_none() {
            self.organization = file.organization.clone().or(env_organization);
        }
        if self.output_dir.is_none() {
            self.output_dir = file.output.clone();
        }
        self
    }

    pub fn validate(self) -> Result<RunConfiguration, ConfigError> {
        let organization = self
            .organization
            .map(|o| o.trim().to_string())
            .filter(|o| !o.is_empty())
            .ok_or(ConfigError::MissingOrganization)?;
        let since = parse_date(self.date.as_deref().ok_or(ConfigError::MissingDate)?)?;
        let rows = match (self.start, self.finish) {
            (Some(start), Some(finish)) => RowBounds::new(start, finish)?,
            _ => return Err(ConfigError::MissingRange),
        };

        Ok(RunConfiguration {
            organization,
            since,
            rows,
            resolve_emails: self.resolve_emails,
            output_dir: self
                .output_dir
                .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_DIR)),
        })
    }
}
