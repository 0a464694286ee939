use crate::core::config::CoinGeckoProviderConfig;
use crate::core::error::{SyncError, TransportError};
use crate::core::price::{DailyPrice, DayNumber, PriceDataSource, RawSample, SpotQuote};
use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use reqwest::header::{ACCEPT, HeaderMap, HeaderValue};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use tracing::{debug, error, instrument};

const COIN_ID: &str = "bitcoin";

/// Bitcoin prices from the CoinGecko v3 API.
pub struct CoinGeckoProvider {
    base_url: String,
    currency: String,
    client: reqwest::Client,
}

impl CoinGeckoProvider {
    pub fn new(config: &CoinGeckoProviderConfig, currency: &str) -> Result<Self, SyncError> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        if let Some(key) = config.api_key.as_deref().filter(|k| !k.is_empty()) {
            let value = HeaderValue::from_str(key)
                .map_err(|e| TransportError::InvalidRequest(format!("Invalid API key: {e}")))?;
            headers.insert("x-cg-demo-api-key", value);
        }

        let client = reqwest::Client::builder()
            .user_agent("btcwatch/1.0")
            .default_headers(headers)
            .build()
            .map_err(|e| TransportError::InvalidRequest(e.to_string()))?;

        Ok(CoinGeckoProvider {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            currency: currency.to_lowercase(),
            client,
        })
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        query: &[(&str, String)],
    ) -> Result<T, SyncError> {
        let url = format!("{}{}", self.base_url, endpoint);
        debug!(?query, "Requesting {}", url);

        let response = self
            .client
            .get(&url)
            .query(query)
            .send()
            .await
            .map_err(map_request_error)?;

        let status = response.status();
        let text = response.text().await.map_err(map_request_error)?;

        if status.is_client_error() {
            return Err(TransportError::ClientError {
                code: status.as_u16(),
                body: text,
            }
            .into());
        }
        if !status.is_success() {
            return Err(TransportError::ServerError {
                code: status.as_u16(),
                body: text,
            }
            .into());
        }

        serde_json::from_str(&text).map_err(|e| {
            error!(error = ?e, response = %text, "Failed to decode response");
            SyncError::Decoding(e.to_string())
        })
    }
}

fn map_request_error(e: reqwest::Error) -> SyncError {
    let mapped = if e.is_builder() {
        TransportError::InvalidRequest(e.to_string())
    } else if e.is_connect() {
        TransportError::Connectivity(e.to_string())
    } else {
        debug!(error = %e, "Unclassified transport failure");
        TransportError::unknown()
    };
    mapped.into()
}

#[derive(Deserialize, Debug)]
struct SimplePriceResponse {
    bitcoin: Option<HashMap<String, f64>>,
}

#[derive(Deserialize, Debug)]
struct MarketChartResponse {
    prices: Option<Vec<Vec<f64>>>,
}

#[derive(Deserialize, Debug)]
struct HistoryResponse {
    market_data: Option<MarketData>,
}

#[derive(Deserialize, Debug)]
struct MarketData {
    current_price: HashMap<String, f64>,
}

fn to_sample(entry: &[f64]) -> Option<RawSample> {
    match entry {
        [timestamp, price] if timestamp.fract() == 0.0 => {
            Some(RawSample::new(*timestamp as i64, *price))
        }
        _ => {
            debug!(?entry, "Skipping malformed series entry");
            None
        }
    }
}

#[async_trait]
impl PriceDataSource for CoinGeckoProvider {
    fn currency(&self) -> &str {
        &self.currency
    }

    #[instrument(name = "CoinGeckoSpotFetch", skip(self))]
    async fn fetch_spot_price(&self) -> Result<SpotQuote, SyncError> {
        let response: SimplePriceResponse = self
            .get_json(
                "/simple/price",
                &[
                    ("ids", COIN_ID.to_string()),
                    ("vs_currencies", self.currency.clone()),
                    ("precision", "full".to_string()),
                    ("include_last_updated_at", "true".to_string()),
                ],
            )
            .await?;

        let fields = response
            .bitcoin
            .ok_or_else(|| SyncError::Decoding("Price data not available".to_string()))?;
        let price = fields.get(&self.currency).copied().ok_or_else(|| {
            SyncError::Decoding(format!("No {} price in response", self.currency))
        })?;
        let as_of = fields
            .get("last_updated_at")
            .and_then(|ts| Utc.timestamp_opt(*ts as i64, 0).single());

        Ok(SpotQuote {
            price,
            currency: self.currency.clone(),
            as_of,
        })
    }

    #[instrument(name = "CoinGeckoSeriesFetch", skip(self))]
    async fn fetch_daily_series(&self, lookback_days: u32) -> Result<Vec<RawSample>, SyncError> {
        let response: MarketChartResponse = self
            .get_json(
                &format!("/coins/{COIN_ID}/market_chart"),
                &[
                    ("vs_currency", self.currency.clone()),
                    ("days", lookback_days.to_string()),
                    ("interval", "daily".to_string()),
                ],
            )
            .await?;

        Ok(response
            .prices
            .unwrap_or_default()
            .iter()
            .filter_map(|entry| to_sample(entry))
            .collect())
    }

    #[instrument(name = "CoinGeckoDayFetch", skip(self), fields(day = %day))]
    async fn fetch_day_prices(&self, day: DayNumber) -> Result<DailyPrice, SyncError> {
        let response: HistoryResponse = self
            .get_json(
                &format!("/coins/{COIN_ID}/history"),
                &[("date", day.date().format("%d-%m-%Y").to_string())],
            )
            .await?;

        let market_data = response
            .market_data
            .ok_or_else(|| SyncError::Decoding(format!("No market data for {day}")))?;
        let mut daily = DailyPrice::new(day);
        for (currency, price) in &market_data.current_price {
            daily.set_price(currency, *price);
        }
        Ok(daily)
    }
}
