//! Shared exchange-rate table with staleness checks and layered fallback.
//!
//! Rates are expressed as "reference-currency units per one unit of the
//! currency", so converting a price is a single multiplication. The table
//! always contains [`REFERENCE_CURRENCY`] at `1.0` and is never empty: a failed
//! refresh serves the previous table, and with no previous table the
//! hardcoded defaults.

use std::collections::BTreeMap;
use std::sync::RwLock;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use storescout_core::REFERENCE_CURRENCY;

use crate::error::ScraperError;

/// Minimum gap between refresh attempts after a failed refresh.
const FAILED_REFRESH_BACKOFF: Duration = Duration::from_secs(60);

/// Approximate rates used when no live or cached table is available.
const DEFAULT_RATES: &[(&str, f64)] = &[
    ("EUR", 1.0),
    ("USD", 0.92),
    ("CAD", 0.68),
    ("GBP", 1.17),
    ("JPY", 0.0062),
    ("AUD", 0.61),
    ("BRL", 0.18),
    ("PLN", 0.23),
    ("SEK", 0.088),
    ("CHF", 1.04),
];

/// Where the rates in a [`RateSnapshot`] came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RateProvenance {
    /// Refreshed within the max age.
    Live,
    /// A previously fetched table served after a failed refresh.
    Cached,
    /// The hardcoded defaults.
    Default,
}

#[derive(Debug, Clone, Serialize)]
pub struct RateSnapshot {
    pub reference_currency: &'static str,
    pub rates: BTreeMap<String, f64>,
    pub refreshed_at: Option<DateTime<Utc>>,
    pub provenance: RateProvenance,
}

impl RateSnapshot {
    #[must_use]
    pub fn defaults() -> Self {
        Self {
            reference_currency: REFERENCE_CURRENCY,
            rates: default_rates(),
            refreshed_at: None,
            provenance: RateProvenance::Default,
        }
    }

    /// Rate for `currency_code`, or `1.0` when the code is unknown.
    ///
    /// Unknown currencies are treated as already being in the reference
    /// currency. This is lossy on purpose.
    #[must_use]
    pub fn rate_for(&self, currency_code: &str) -> f64 {
        if let Some(rate) = self.rates.get(&currency_code.to_uppercase()) {
            *rate
        } else {
            tracing::debug!(currency_code, "no exchange rate for currency; using 1.0");
            1.0
        }
    }

    #[must_use]
    pub fn convert(&self, amount: f64, currency_code: &str) -> f64 {
        amount * self.rate_for(currency_code)
    }
}

fn default_rates() -> BTreeMap<String, f64> {
    DEFAULT_RATES
        .iter()
        .map(|(code, rate)| ((*code).to_string(), *rate))
        .collect()
}

#[derive(Debug, Default)]
struct RateState {
    rates: BTreeMap<String, f64>,
    refreshed_at: Option<Instant>,
    refreshed_at_utc: Option<DateTime<Utc>>,
    last_failure: Option<Instant>,
}

/// Shape of the upstream rate API: `{"base": "EUR", "rates": {"USD": 1.08}}`.
#[derive(Debug, Deserialize)]
struct RateApiResponse {
    #[serde(alias = "base_code")]
    base: Option<String>,
    rates: BTreeMap<String, f64>,
}

/// Process-wide exchange-rate cache. Construct once and share via `Arc`.
pub struct ExchangeRateCache {
    client: Client,
    source_url: Option<String>,
    max_age: Duration,
    state: RwLock<RateState>,
}

impl ExchangeRateCache {
    /// Creates a cache that refreshes from `source_url` when older than `max_age`.
    ///
    /// `source_url = None` disables refreshes; the defaults are then served.
    #[must_use]
    pub fn new(client: Client, source_url: Option<String>, max_age: Duration) -> Self {
        Self {
            client,
            source_url,
            max_age,
            state: RwLock::new(RateState::default()),
        }
    }

    /// Returns the current rate table, refreshing it first when stale.
    ///
    /// Never fails and never returns an empty table.
    pub async fn get_rates(&self) -> RateSnapshot {
        if let Some(snapshot) = self.fresh_snapshot() {
            return snapshot;
        }

        if self.should_attempt_refresh() {
            match self.refresh().await {
                Ok(snapshot) => return snapshot,
                Err(e) => {
                    tracing::warn!(error = %e, "exchange-rate refresh failed; falling back");
                }
            }
        }

        self.fallback_snapshot()
    }

    /// Fetches a new table from the rate source and replaces the cached one.
    ///
    /// # Errors
    ///
    /// Returns [`ScraperError`] when no source is configured, the request
    /// fails, or the payload has no usable rates. The cached table is left
    /// untouched on error.
    pub async fn refresh(&self) -> Result<RateSnapshot, ScraperError> {
        let Some(url) = self.source_url.as_deref() else {
            return Err(ScraperError::InvalidInput(
                "no exchange-rate source configured".to_owned(),
            ));
        };

        match self.fetch_rates(url).await {
            Ok(rates) => {
                let now_utc = Utc::now();
                let mut state = self.write_state();
                state.rates.clone_from(&rates);
                state.refreshed_at = Some(Instant::now());
                state.refreshed_at_utc = Some(now_utc);
                state.last_failure = None;
                drop(state);

                tracing::info!(currencies = rates.len(), "exchange rates refreshed");
                Ok(RateSnapshot {
                    reference_currency: REFERENCE_CURRENCY,
                    rates,
                    refreshed_at: Some(now_utc),
                    provenance: RateProvenance::Live,
                })
            }
            Err(e) => {
                self.write_state().last_failure = Some(Instant::now());
                Err(e)
            }
        }
    }

    /// Drops the cached table so the next lookup refreshes.
    pub fn clear(&self) {
        *self.write_state() = RateState::default();
    }

    async fn fetch_rates(&self, url: &str) -> Result<BTreeMap<String, f64>, ScraperError> {
        let response = self.client.get(url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ScraperError::UnexpectedStatus {
                status: status.as_u16(),
                url: url.to_owned(),
            });
        }

        let body = response.text().await?;
        let parsed: RateApiResponse =
            serde_json::from_str(&body).map_err(|e| ScraperError::Deserialize {
                context: format!("exchange rates from {url}"),
                source: e,
            })?;

        invert_rates(parsed)
    }

    fn fresh_snapshot(&self) -> Option<RateSnapshot> {
        let state = self.read_state();
        let refreshed_at = state.refreshed_at?;
        if state.rates.is_empty() || refreshed_at.elapsed() > self.max_age {
            return None;
        }
        Some(RateSnapshot {
            reference_currency: REFERENCE_CURRENCY,
            rates: state.rates.clone(),
            refreshed_at: state.refreshed_at_utc,
            provenance: RateProvenance::Live,
        })
    }

    fn should_attempt_refresh(&self) -> bool {
        if self.source_url.is_none() {
            return false;
        }
        self.read_state()
            .last_failure
            .is_none_or(|at| at.elapsed() >= FAILED_REFRESH_BACKOFF)
    }

    fn fallback_snapshot(&self) -> RateSnapshot {
        let state = self.read_state();
        if state.rates.is_empty() {
            tracing::debug!("serving default exchange-rate table");
            RateSnapshot::defaults()
        } else {
            tracing::debug!("serving stale cached exchange-rate table");
            RateSnapshot {
                reference_currency: REFERENCE_CURRENCY,
                rates: state.rates.clone(),
                refreshed_at: state.refreshed_at_utc,
                provenance: RateProvenance::Cached,
            }
        }
    }

    // A poisoned lock only means another task panicked mid-write; the
    // table inside is still a complete map, so keep serving it.
    fn read_state(&self) -> std::sync::RwLockReadGuard<'_, RateState> {
        self.state
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn write_state(&self) -> std::sync::RwLockWriteGuard<'_, RateState> {
        self.state
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

/// Converts "units per reference" quotes into "reference per unit" rates.
fn invert_rates(response: RateApiResponse) -> Result<BTreeMap<String, f64>, ScraperError> {
    if let Some(base) = response.base.as_deref() {
        if !base.eq_ignore_ascii_case(REFERENCE_CURRENCY) {
            return Err(ScraperError::InvalidInput(format!(
                "rate source base is {base}, expected {REFERENCE_CURRENCY}"
            )));
        }
    }

    let mut rates: BTreeMap<String, f64> = response
        .rates
        .into_iter()
        .filter(|(_, quote)| quote.is_finite() && *quote > 0.0)
        .map(|(code, quote)| (code.to_uppercase(), 1.0 / quote))
        .collect();
    rates.insert(REFERENCE_CURRENCY.to_owned(), 1.0);

    if rates.len() < 2 {
        return Err(ScraperError::InvalidInput(
            "rate source returned no usable rates".to_owned(),
        ));
    }
    Ok(rates)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_contain_reference_currency_at_one() {
        let snapshot = RateSnapshot::defaults();
        assert!((snapshot.rate_for("EUR") - 1.0).abs() < f64::EPSILON);
        assert_eq!(snapshot.provenance, RateProvenance::Default);
        assert!(snapshot.rates.len() > 1);
    }

    #[test]
    fn unknown_currency_converts_at_one() {
        let snapshot = RateSnapshot::defaults();
        assert!((snapshot.convert(10.0, "XYZ") - 10.0).abs() < f64::EPSILON);
    }

    #[test]
    fn convert_is_case_insensitive() {
        let snapshot = RateSnapshot::defaults();
        let expected = 10.0 * snapshot.rate_for("USD");
        assert!((snapshot.convert(10.0, "usd") - expected).abs() < 1e-12);
    }

    #[test]
    fn invert_rates_inverts_quotes_and_pins_reference() {
        let response = RateApiResponse {
            base: Some("EUR".to_string()),
            rates: BTreeMap::from([
                ("USD".to_string(), 1.25),
                ("EUR".to_string(), 0.5),
                ("BAD".to_string(), 0.0),
            ]),
        };
        let rates = invert_rates(response).expect("valid rates");
        assert!((rates["USD"] - 0.8).abs() < 1e-12);
        assert!((rates["EUR"] - 1.0).abs() < f64::EPSILON);
        assert!(!rates.contains_key("BAD"));
    }

    #[test]
    fn invert_rates_rejects_foreign_base() {
        let response = RateApiResponse {
            base: Some("USD".to_string()),
            rates: BTreeMap::from([("EUR".to_string(), 0.9)]),
        };
        assert!(invert_rates(response).is_err());
    }

    #[test]
    fn invert_rates_rejects_empty_payload() {
        let response = RateApiResponse {
            base: None,
            rates: BTreeMap::new(),
        };
        assert!(invert_rates(response).is_err());
    }

    #[tokio::test]
    async fn no_source_serves_defaults() {
        let cache = ExchangeRateCache::new(Client::new(), None, Duration::from_secs(3600));
        let snapshot = cache.get_rates().await;
        assert_eq!(snapshot.provenance, RateProvenance::Default);
        assert!((snapshot.rate_for("EUR") - 1.0).abs() < f64::EPSILON);
    }
}
