use std::ops::{AddAssign, RangeInclusive};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{error, info, warn};

use crate::config::Settings;
use crate::dataset::{Dataset, Upsert};
use crate::extract;
use crate::fetcher::Fetcher;
use crate::query::Query;
use crate::record::{GoverningBody, VoteFilter};
use crate::search;
use crate::table::FlushReport;

/// Where the per-(body, period) subject queries come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubjectSource {
    /// Ask the catalog which subject facets exist.
    Facets,
    /// Iterate a fixed list.
    Fixed(Vec<String>),
    /// One unfiltered query per body and period.
    Disabled,
}

impl SubjectSource {
    /// Newline-delimited subject list; blank lines are ignored.
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read subjects file {}", path.display()))?;
        let subjects = text
            .lines()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();
        Ok(SubjectSource::Fixed(subjects))
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CrawlCounts {
    /// Records first seen in this run.
    pub created: usize,
    /// Known records that gained a subject.
    pub updated: usize,
    pub pages: usize,
}

impl AddAssign for CrawlCounts {
    fn add_assign(&mut self, rhs: Self) {
        self.created += rhs.created;
        self.updated += rhs.updated;
        self.pages += rhs.pages;
    }
}

#[derive(Debug)]
pub struct PeriodSummary {
    pub period: i32,
    pub cached: usize,
    pub counts: CrawlCounts,
    pub total: usize,
    pub table: PathBuf,
    pub flush: FlushReport,
}

pub struct Crawler<F> {
    fetcher: F,
    settings: Settings,
    vote: Option<VoteFilter>,
    subjects: SubjectSource,
}

impl<F: Fetcher> Crawler<F> {
    pub fn new(fetcher: F, settings: Settings, subjects: SubjectSource) -> Result<Self> {
        let vote = settings.vote_filter()?;
        Ok(Crawler {
            fetcher,
            settings,
            vote,
            subjects,
        })
    }

    /// Crawl each period in order. A failed period is still saved, then ends the run.
    pub async fn crawl_range(&self, periods: RangeInclusive<i32>) -> Result<Vec<PeriodSummary>> {
        let total = periods.clone().count();
        let pb = ProgressBar::new(total as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("[{elapsed_precise}] {bar:40} {pos}/{len} years {msg}")?
                .progress_chars("=> "),
        );

        let mut summaries = Vec::with_capacity(total);
        for period in periods {
            pb.set_message(period.to_string());
            let summary = self.crawl_period(period).await;
            pb.inc(1);
            match summary {
                Ok(s) => summaries.push(s),
                Err(e) => {
                    pb.abandon();
                    return Err(e);
                }
            }
        }

        pb.finish_and_clear();
        Ok(summaries)
    }

    /// One run: preload the period's table, crawl every body, and save the
    /// dataset whether or not the crawl finished.
    pub async fn crawl_period(&self, period: i32) -> Result<PeriodSummary> {
        let table = self.settings.period_table(period);
        let mut dataset = Dataset::preload(&table)?;
        let cached = dataset.len();

        let mut counts = CrawlCounts::default();
        let crawled = self.crawl_bodies(&mut dataset, period, &mut counts).await;
        let flushed = dataset.flush(&table);

        match (crawled, flushed) {
            (Ok(()), Ok(flush)) => {
                info!("Total crawled for {}: {}", period, counts.created);
                Ok(PeriodSummary {
                    period,
                    cached,
                    counts,
                    total: dataset.len(),
                    table,
                    flush,
                })
            }
            (Err(e), Ok(flush)) => {
                warn!(
                    "Crawl of {} aborted; saved {} records gathered so far",
                    period, flush.written
                );
                Err(e.context(format!("Crawl of {} failed", period)))
            }
            (Ok(()), Err(f)) => Err(f),
            (Err(e), Err(f)) => {
                error!("Failed to save records for {}: {:#}", period, f);
                Err(e.context(format!("Crawl of {} failed", period)))
            }
        }
    }

    async fn crawl_bodies(&self, dataset: &mut Dataset, period: i32, counts: &mut CrawlCounts) -> Result<()> {
        for body in GoverningBody::ALL {
            let base = Query {
                body: Some(body),
                vote: self.vote,
                subject: None,
                period: Some(period),
            };

            // Page 0 of the unfiltered query, when it was needed for facets.
            let mut facet_page = None;
            let subjects = match &self.subjects {
                SubjectSource::Disabled => Vec::new(),
                SubjectSource::Fixed(list) => list.clone(),
                SubjectSource::Facets => {
                    let html = self.fetcher.fetch_search(&base, 0).await?;
                    let subjects = search::parse_subjects(&html);
                    facet_page = Some(html);
                    subjects
                }
            };

            if subjects.is_empty() {
                *counts += self.crawl_pages(dataset, &base, facet_page).await?;
                continue;
            }
            for subject in subjects {
                let query = Query {
                    subject: Some(subject),
                    ..base.clone()
                };
                *counts += self.crawl_query(dataset, &query).await?;
            }
        }
        Ok(())
    }

    /// Walk every page of `query` in order, upserting each listed record.
    pub async fn crawl_query(&self, dataset: &mut Dataset, query: &Query) -> Result<CrawlCounts> {
        self.crawl_pages(dataset, query, None).await
    }

    /// Like `crawl_query`, starting from an already fetched page 0 when given.
    async fn crawl_pages(
        &self,
        dataset: &mut Dataset,
        query: &Query,
        mut first_page: Option<String>,
    ) -> Result<CrawlCounts> {
        info!("Accessing: {}", query);
        let body = query.body.map(|b| b.label()).unwrap_or_default();
        let subject = query.subject.as_deref();
        let mut counts = CrawlCounts::default();
        let mut page = 0u32;

        loop {
            let html = match first_page.take() {
                Some(html) => html,
                None => self.fetcher.fetch_search(query, page).await?,
            };
            let results = search::parse_search_page(&html);
            counts.pages += 1;

            for id in &results.record_ids {
                let fetcher = &self.fetcher;
                let id = id.as_str();
                let outcome = dataset
                    .upsert(id, body, subject, move || async move {
                        let html = fetcher.fetch_record(id).await?;
                        extract::parse_record(&html).with_context(|| format!("Record {}", id))
                    })
                    .await?;
                match outcome {
                    Upsert::Created => counts.created += 1,
                    Upsert::Updated => counts.updated += 1,
                    Upsert::Unchanged => {}
                }
            }

            if !results.has_next_page {
                break;
            }
            page += 1;
            info!("Moving to page {}...", page + 1);
        }

        info!("Crawled in this search: {}", counts.created);
        Ok(counts)
    }
}

// ── Tests ──
