//! Pricing abstractions and core types

use crate::core::error::SyncError;
use async_trait::async_trait;
use chrono::{DateTime, Datelike, NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::Display;

const MILLIS_PER_DAY: i64 = 86_400_000;
// 1970-01-01 counted from 0001-01-01
const EPOCH_DAYS_FROM_CE: i32 = 719_163;

/// A calendar day in UTC, counted as whole days since the Unix epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct DayNumber(i64);

impl DayNumber {
    pub const fn new(days_since_epoch: i64) -> Self {
        Self(days_since_epoch)
    }

    pub fn get(self) -> i64 {
        self.0
    }

    /// The day containing `instant`, in UTC.
    pub fn from_datetime(instant: DateTime<Utc>) -> Self {
        Self(instant.timestamp_millis().div_euclid(MILLIS_PER_DAY))
    }

    /// Returns the day only if `millis` is exactly that day's UTC midnight.
    pub fn from_midnight_millis(millis: i64) -> Option<Self> {
        (millis.rem_euclid(MILLIS_PER_DAY) == 0).then(|| Self(millis / MILLIS_PER_DAY))
    }

    pub fn from_date(date: NaiveDate) -> Self {
        Self(i64::from(date.num_days_from_ce() - EPOCH_DAYS_FROM_CE))
    }

    pub fn midnight(self) -> DateTime<Utc> {
        Utc.timestamp_millis_opt(self.0 * MILLIS_PER_DAY)
            .single()
            .unwrap_or(DateTime::<Utc>::MIN_UTC)
    }

    pub fn date(self) -> NaiveDate {
        self.midnight().date_naive()
    }

    pub fn days_since(self, earlier: DayNumber) -> i64 {
        self.0 - earlier.0
    }

    pub fn minus_days(self, days: i64) -> Self {
        Self(self.0 - days)
    }
}

impl Display for DayNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.date().format("%Y-%m-%d"))
    }
}

/// Prices for one UTC day, keyed by lowercase currency code.
///
/// A `DailyPrice` can only be built from a UTC-midnight timestamp or a
/// [`DayNumber`], so its instant is always the start of its day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyPrice {
    day: DayNumber,
    prices: BTreeMap<String, f64>,
}

impl DailyPrice {
    pub fn new(day: DayNumber) -> Self {
        Self {
            day,
            prices: BTreeMap::new(),
        }
    }

    /// Builds a single-currency entry, rejecting timestamps that are not UTC midnight.
    pub fn from_sample(sample: &RawSample, currency: &str) -> Option<Self> {
        let day = DayNumber::from_midnight_millis(sample.timestamp_millis)?;
        let mut daily = Self::new(day);
        daily.set_price(currency, sample.price);
        Some(daily)
    }

    pub fn day(&self) -> DayNumber {
        self.day
    }

    pub fn date(&self) -> DateTime<Utc> {
        self.day.midnight()
    }

    pub fn price(&self, currency: &str) -> Option<f64> {
        self.prices.get(&currency.to_lowercase()).copied()
    }

    pub fn prices(&self) -> &BTreeMap<String, f64> {
        &self.prices
    }

    pub fn set_price(&mut self, currency: &str, price: f64) {
        self.prices.insert(currency.to_lowercase(), price);
    }
}

/// A spot quote together with the time the source last updated it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpotQuote {
    pub price: f64,
    pub currency: String,
    pub as_of: Option<DateTime<Utc>>,
}

/// One `(timestamp, price)` pair of a raw daily series, not yet day-aligned.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RawSample {
    pub timestamp_millis: i64,
    pub price: f64,
}

impl RawSample {
    pub fn new(timestamp_millis: i64, price: f64) -> Self {
        Self {
            timestamp_millis,
            price,
        }
    }
}

#[async_trait]
pub trait PriceDataSource: Send + Sync {
    /// Quote currency of the spot price and the daily series.
    fn currency(&self) -> &str;

    async fn fetch_spot_price(&self) -> Result<SpotQuote, SyncError>;

    /// Daily series covering the last `lookback_days` days, oldest first.
    async fn fetch_daily_series(&self, lookback_days: u32) -> Result<Vec<RawSample>, SyncError>;

    /// Every currency price the source reports for a single day.
    async fn fetch_day_prices(&self, day: DayNumber) -> Result<DailyPrice, SyncError>;
}
