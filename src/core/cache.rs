use crate::core::error::SyncError;
use crate::core::price::{DailyPrice, DayNumber, RawSample};
use std::collections::BTreeMap;
use tracing::debug;

pub const DEFAULT_WINDOW_SIZE_DAYS: u32 = 14;

/// Bounded window of the most recent daily prices plus the fetch cursor.
///
/// The cursor is the latest day whose merge completed; it never moves back.
#[derive(Debug, Clone)]
pub struct HistoricalPriceCache {
    window_size_days: u32,
    currency: String,
    window: BTreeMap<DayNumber, DailyPrice>,
    cursor: Option<DayNumber>,
}

impl HistoricalPriceCache {
    pub fn new(window_size_days: u32, currency: &str) -> Self {
        Self {
            window_size_days: window_size_days.max(1),
            currency: currency.to_lowercase(),
            window: BTreeMap::new(),
            cursor: None,
        }
    }

    pub fn window_size_days(&self) -> u32 {
        self.window_size_days
    }

    pub fn cursor(&self) -> Option<DayNumber> {
        self.cursor
    }

    pub fn len(&self) -> usize {
        self.window.len()
    }

    pub fn is_empty(&self) -> bool {
        self.window.is_empty()
    }

    /// Number of days to request so the window catches up with `today`.
    ///
    /// Today is always requested again since its value is still moving.
    pub fn required_lookback(&self, today: DayNumber) -> u32 {
        let Some(cursor) = self.cursor else {
            return self.window_size_days;
        };
        let needed = today.days_since(cursor).saturating_add(1);
        needed.clamp(1, i64::from(self.window_size_days)) as u32
    }

    pub fn is_fresh_enough_to_skip(&self, today: DayNumber) -> bool {
        self.cursor == Some(today) && !self.window.is_empty()
    }

    /// Upserts the midnight-aligned samples and purges days outside the window.
    ///
    /// Returns the number of samples kept. Fails with [`SyncError::EmptyResult`]
    /// when nothing usable was supplied and the window holds nothing either, in
    /// which case the cursor is left untouched.
    pub fn merge(&mut self, samples: &[RawSample], today: DayNumber) -> Result<usize, SyncError> {
        let oldest = self.oldest_retained_day(today);
        let mut kept = 0;

        for sample in samples {
            let Some(daily) = DailyPrice::from_sample(sample, &self.currency) else {
                debug!(
                    timestamp = sample.timestamp_millis,
                    "Dropping sample not aligned to UTC midnight"
                );
                continue;
            };
            let day = daily.day();
            if day < oldest || day > today {
                debug!(%day, "Dropping sample outside the window");
                continue;
            }
            self.window
                .entry(day)
                .and_modify(|existing| existing.set_price(&self.currency, sample.price))
                .or_insert(daily);
            kept += 1;
        }

        self.purge(today);

        if self.window.is_empty() {
            debug!("Merge produced no usable samples");
            return Err(SyncError::EmptyResult);
        }

        self.cursor = Some(self.cursor.map_or(today, |cursor| cursor.max(today)));
        debug!(
            kept,
            window = self.window.len(),
            cursor = %today,
            "Merged daily samples"
        );
        Ok(kept)
    }

    /// Window entries, most recent day first.
    pub fn prices(&self) -> Vec<DailyPrice> {
        self.window.values().rev().cloned().collect()
    }

    pub fn get(&self, day: DayNumber) -> Option<&DailyPrice> {
        self.window.get(&day)
    }

    fn oldest_retained_day(&self, today: DayNumber) -> DayNumber {
        today.minus_days(i64::from(self.window_size_days) - 1)
    }

    fn purge(&mut self, today: DayNumber) {
        let oldest = self.oldest_retained_day(today);
        self.window = self.window.split_off(&oldest);
        self.window.retain(|day, _| *day <= today);
    }
}
