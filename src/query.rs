use std::fmt;

use anyhow::{Context, Result};
use reqwest::Url;

use crate::config::{param, SEARCH_COLLECTION};
use crate::record::{GoverningBody, VoteFilter};

/// One search over the catalog. `None` fields match everything.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    pub body: Option<GoverningBody>,
    pub vote: Option<VoteFilter>,
    pub subject: Option<String>,
    pub period: Option<i32>,
}

impl Query {
    /// Search URL for zero-based `page`.
    pub fn search_url(&self, base_url: &str, per_page: u32, page: u32) -> Result<Url> {
        let mut url = Url::parse(base_url)
            .and_then(|u| u.join("search"))
            .with_context(|| format!("Invalid base URL: {}", base_url))?;

        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair(param::COLLECTION, SEARCH_COLLECTION);
            if let Some(body) = self.body {
                pairs.append_pair(param::BODY, body.label());
            }
            if let Some(vote) = self.vote {
                pairs.append_pair(param::VOTE, vote.label());
            }
            if let Some(subject) = &self.subject {
                pairs.append_pair(param::SUBJECT, subject);
            }
            if let Some(period) = self.period {
                pairs.append_pair(param::DATE, &period.to_string());
            }
            let first_record = page as u64 * per_page as u64 + 1;
            pairs.append_pair(param::PER_PAGE, &per_page.to_string());
            pairs.append_pair(param::FIRST_RECORD, &first_record.to_string());
        }

        Ok(url)
    }
}

/// `[Body: General Assembly, Vote: All, Subject: All, Date: 1999]`
impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[Body: {}, Vote: {}, Subject: {}, Date: {}]",
            self.body.map(|b| b.label()).unwrap_or("All"),
            self.vote.map(|v| v.label()).unwrap_or("All"),
            self.subject.as_deref().unwrap_or("All"),
            self.period.map(|p| p.to_string()).unwrap_or_else(|| "All".to_string()),
        )
    }
}

pub fn record_url(base_url: &str, id: &str) -> Result<Url> {
    Url::parse(base_url)
        .and_then(|u| u.join(&format!("record/{}", id)))
        .with_context(|| format!("Invalid record URL for {}", id))
}

// ── Tests ──
