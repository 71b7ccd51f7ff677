use crate::core::ActivityProvider;
use crate::core::config::AnalysisSettings;
use crate::providers::util::{RetryPolicy, is_transient, with_retry};
use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use reqwest::header::{ACCEPT, AUTHORIZATION, HeaderMap, HeaderValue};
use serde_json::Value;
use tracing::{debug, error, info, instrument, warn};

/// Page size requested from the commits endpoint. Only the first page is read.
const PER_PAGE: usize = 100;

// GithubProvider implementation for ActivityProvider
pub struct GithubProvider {
    base_url: String,
    client: reqwest::Client,
    retry: RetryPolicy,
}

impl GithubProvider {
    pub fn new(base_url: &str, token: Option<&str>, settings: &AnalysisSettings) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("application/vnd.github+json"),
        );
        if let Some(token) = token {
            let mut value = HeaderValue::from_str(&format!("Bearer {token}"))
                .context("GitHub token contains invalid header characters")?;
            value.set_sensitive(true);
            headers.insert(AUTHORIZATION, value);
        }

        let client = reqwest::Client::builder()
            .user_agent(concat!("cryptodca/", env!("CARGO_PKG_VERSION")))
            .default_headers(headers)
            .timeout(settings.http_timeout())
            .build()
            .context("Failed to build GitHub HTTP client")?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
            retry: RetryPolicy::from_settings(settings),
        })
    }

    async fn fetch_commit_count(&self, repo: &str, days: u32) -> Result<u32> {
        let since = (Utc::now() - chrono::Duration::days(i64::from(days)))
            .to_rfc3339_opts(SecondsFormat::Secs, true);
        let url = format!(
            "{}/repos/{}/commits?since={}&per_page={}",
            self.base_url, repo, since, PER_PAGE
        );
        debug!("Requesting commit activity from {}", url);

        let response = with_retry(
            || async { self.client.get(&url).send().await },
            &self.retry,
            is_transient,
        )
        .await
        .map_err(|e| anyhow!("Request failed: {} for repo: {}", e, repo))?;

        if !response.status().is_success() {
            return Err(anyhow!("HTTP error: {} for repo: {}", response.status(), repo));
        }

        let data: Value = response
            .json()
            .await
            .with_context(|| format!("Failed to parse commits response for {repo}"))?;

        let Some(commits) = data.as_array() else {
            return Err(anyhow!("Unexpected response type for {}: expected a list", repo));
        };

        if commits.len() >= PER_PAGE {
            warn!(
                repo,
                commits = commits.len(),
                "May be more commits than returned (pagination not implemented)"
            );
        }

        Ok(u32::try_from(commits.len()).unwrap_or(u32::MAX))
    }
}

#[async_trait]
impl ActivityProvider for GithubProvider {
    #[instrument(name = "GithubActivityFetch", skip(self), fields(repo = %repo))]
    async fn commit_count(&self, repo: &str, days: u32) -> u32 {
        match self.fetch_commit_count(repo, days).await {
            Ok(count) => {
                info!(repo, commits = count, days, "GitHub activity fetched");
                count
            }
            Err(e) => {
                error!(repo, error = %e, "GitHub activity fetch failed");
                0
            }
        }
    }
}
