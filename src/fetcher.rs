use anyhow::{Context, Result};
use reqwest::{Certificate, Client, Url};
use tracing::debug;

use crate::config::Settings;
use crate::query::{record_url, Query};

const USER_AGENT: &str = concat!("undl_votes/", env!("CARGO_PKG_VERSION"));

/// Source of raw catalog pages. Calls are awaited one at a time; failures are
/// returned to the caller untouched, nothing is retried here.
#[allow(async_fn_in_trait)]
pub trait Fetcher {
    /// HTML of the search results for `query` at zero-based `page`.
    async fn fetch_search(&self, query: &Query, page: u32) -> Result<String>;

    /// HTML of a single record page.
    async fn fetch_record(&self, id: &str) -> Result<String>;
}

pub struct HttpFetcher {
    client: Client,
    base_url: String,
    per_page: u32,
}

impl HttpFetcher {
    pub fn new(settings: &Settings) -> Result<Self> {
        let mut builder = Client::builder().user_agent(USER_AGENT);
        if let Some(path) = settings.certificate_if_present() {
            let pem = std::fs::read(path)
                .with_context(|| format!("Failed to read certificate {}", path.display()))?;
            let cert = Certificate::from_pem(&pem)
                .with_context(|| format!("Invalid PEM certificate {}", path.display()))?;
            builder = builder.add_root_certificate(cert);
            debug!("Trusting root certificate {}", path.display());
        }

        Ok(HttpFetcher {
            client: builder.build().context("Failed to build HTTP client")?,
            base_url: settings.base_url.clone(),
            per_page: settings.records_per_page,
        })
    }

    async fn get(&self, url: Url) -> Result<String> {
        debug!("GET {}", url);
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .with_context(|| format!("Request failed: {}", url))?
            .error_for_status()
            .with_context(|| format!("Bad status: {}", url))?;
        response
            .text()
            .await
            .with_context(|| format!("Failed to read body: {}", url))
    }
}

impl Fetcher for HttpFetcher {
    async fn fetch_search(&self, query: &Query, page: u32) -> Result<String> {
        let url = query.search_url(&self.base_url, self.per_page, page)?;
        self.get(url).await
    }

    async fn fetch_record(&self, id: &str) -> Result<String> {
        let url = record_url(&self.base_url, id)?;
        self.get(url).await
    }
}
