use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Datelike;
use config::Config;
use serde::Deserialize;

use crate::record::VoteFilter;

pub const SEARCH_COLLECTION: &str = "Voting Data";
pub const RECORD_TABLE_HEADER: [&str; 7] =
    ["ID", "Body", "Title", "Date", "Resolution", "Subjects", "Voting Data"];
pub const MERGED_TABLE_NAME: &str = "records.csv";

/// Query parameter names understood by the catalog search endpoint.
pub mod param {
    pub const COLLECTION: &str = "cc";
    pub const BODY: &str = "fct__2";
    pub const VOTE: &str = "fct__9";
    pub const SUBJECT: &str = "fct__8";
    pub const DATE: &str = "fct__3";
    pub const FIRST_RECORD: &str = "jrec";
    pub const PER_PAGE: &str = "rg";
}

/// Runtime settings: built-in defaults overridden by `UNDL_*` environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub base_url: String,
    pub data_dir: PathBuf,
    pub certificate: PathBuf,
    #[serde(default)]
    pub subjects_file: Option<PathBuf>,
    pub expected_counts_file: PathBuf,
    pub records_per_page: u32,
    pub first_period: i32,
    #[serde(default)]
    pub vote_filter: Option<String>,
}

impl Settings {
    pub fn load() -> Result<Self> {
        let settings = Config::builder()
            .set_default("base_url", "https://digitallibrary.un.org")?
            .set_default("data_dir", "data")?
            .set_default("certificate", "ca-root.pem")?
            .set_default("expected_counts_file", "expected_counts.txt")?
            .set_default("records_per_page", 20)?
            .set_default("first_period", 1946)?
            .add_source(config::Environment::with_prefix("UNDL").try_parsing(true))
            .build()
            .context("Failed to build settings")?;
        settings
            .try_deserialize()
            .context("Invalid UNDL_* settings")
    }

    /// Table file for one period, e.g. `data/records_1999.csv`.
    pub fn period_table(&self, period: i32) -> PathBuf {
        self.data_dir.join(format!("records_{}.csv", period))
    }

    pub fn merged_table(&self) -> PathBuf {
        self.data_dir.join(MERGED_TABLE_NAME)
    }

    /// Root certificate to trust, only if the file is actually present.
    pub fn certificate_if_present(&self) -> Option<&Path> {
        Some(self.certificate.as_path()).filter(|p| p.is_file())
    }

    pub fn vote_filter(&self) -> Result<Option<VoteFilter>> {
        self.vote_filter
            .as_deref()
            .map(|v| {
                VoteFilter::from_label(v)
                    .with_context(|| format!("Unknown vote filter: {:?}", v))
            })
            .transpose()
    }

    pub fn last_period(&self) -> i32 {
        chrono::Local::now().year()
    }
}

#[cfg(test)]
impl Settings {
    pub fn for_tests(data_dir: &Path) -> Self {
        Settings {
            base_url: "https://digitallibrary.un.org".to_string(),
            data_dir: data_dir.to_path_buf(),
            certificate: data_dir.join("ca-root.pem"),
            subjects_file: None,
            expected_counts_file: data_dir.join("expected_counts.txt"),
            records_per_page: 20,
            first_period: 1946,
            vote_filter: None,
        }
    }
}

// ── Tests ──
