use crate::core::MarketDataProvider;
use crate::core::config::AnalysisSettings;
use crate::core::model::{Fdv, MarketData};
use crate::providers::util::{RetryPolicy, is_transient, with_retry};
use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, info, instrument, warn};

// DefiLlamaProvider implementation for MarketDataProvider
pub struct DefiLlamaProvider {
    base_url: String,
    client: reqwest::Client,
    retry: RetryPolicy,
}

impl DefiLlamaProvider {
    pub fn new(base_url: &str, settings: &AnalysisSettings) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("cryptodca/", env!("CARGO_PKG_VERSION")))
            .timeout(settings.http_timeout())
            .build()
            .context("Failed to build DeFiLlama HTTP client")?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
            retry: RetryPolicy::from_settings(settings),
        })
    }
}

/// Numeric field of the payload, treating zero as absent.
fn non_zero(data: &Value, key: &str) -> Option<f64> {
    data.get(key).and_then(Value::as_f64).filter(|v| *v != 0.0)
}

/// Builds a snapshot from a `/protocol/{slug}` payload.
///
/// Market cap falls back to TVL, and FDV to `fdvTvl`; without either FDV is
/// estimated from market cap.
fn parse_protocol(ticker: &str, slug: &str, data: &Value) -> Result<MarketData> {
    if !data.is_object() {
        return Err(anyhow!("Unexpected response shape for {}", slug));
    }

    let mcap = non_zero(data, "mcap")
        .or_else(|| non_zero(data, "tvl"))
        .unwrap_or(0.0);

    let fdv = match non_zero(data, "fdv").or_else(|| data.get("fdvTvl").and_then(Value::as_f64)) {
        Some(v) => Fdv::Exact(v),
        None => {
            warn!(
                slug,
                "FDV not provided by API, estimating as 1.5x market cap"
            );
            Fdv::estimate_from(mcap)
        }
    };

    let price = data.get("price").and_then(Value::as_f64).unwrap_or(0.0);

    if mcap == 0.0 && fdv.value() == 0.0 {
        return Err(anyhow!("No market data available for {}", slug));
    }

    let market_data = MarketData::new(ticker, price, mcap, fdv, None)
        .with_context(|| format!("Invalid market data for {slug}"))?;

    info!(
        ticker = %market_data.ticker,
        mcap,
        fdv = fdv.value(),
        fdv_estimated = fdv.is_estimated(),
        price,
        "Market data fetched"
    );
    Ok(market_data)
}

#[async_trait]
impl MarketDataProvider for DefiLlamaProvider {
    #[instrument(
        name = "DefiLlamaFetch",
        skip(self),
        fields(ticker = %ticker, slug = %slug)
    )]
    async fn fetch_market_data(&self, ticker: &str, slug: &str) -> Result<MarketData> {
        let url = format!("{}/protocol/{}", self.base_url, slug);
        debug!("Requesting market data from {}", url);

        let response = with_retry(
            || async { self.client.get(&url).send().await },
            &self.retry,
            is_transient,
        )
        .await
        .map_err(|e| anyhow!("Request failed: {} for slug: {}", e, slug))?;

        if !response.status().is_success() {
            return Err(anyhow!("HTTP error: {} for slug: {}", response.status(), slug));
        }

        let text = response.text().await?;
        let data: Value = serde_json::from_str(&text)
            .map_err(|e| anyhow!("Failed to parse JSON response for {}: {}", slug, e))?;

        parse_protocol(ticker, slug, &data)
    }
}
