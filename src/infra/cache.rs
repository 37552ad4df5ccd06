//! In-memory cache entries with lazy TTL + request-equality validation.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::domain::CalculationRequest;

/// Cache TTL for delivery cost calculations: 5 minutes.
pub const CALCULATION_CACHE_TTL: Duration = Duration::from_secs(5 * 60);

/// Current wall-clock time as Unix epoch milliseconds.
pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// A cached value together with when and for which request it was produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry<T> {
    pub data: T,
    /// Unix timestamp (milliseconds) when this entry was stored.
    pub timestamp: u64,
    /// The request that produced `data`.
    pub params: CalculationRequest,
}

impl<T> CacheEntry<T> {
    /// Create a new entry stamped with the current time.
    pub fn new(data: T, params: CalculationRequest) -> Self {
        Self::with_timestamp(data, params, now_millis())
    }

    pub fn with_timestamp(data: T, params: CalculationRequest, timestamp: u64) -> Self {
        Self {
            data,
            timestamp,
            params,
        }
    }

    /// Entry age relative to `now` (epoch millis). Clock skew into the past counts as zero.
    pub fn age_at(&self, now: u64) -> Duration {
        Duration::from_millis(now.saturating_sub(self.timestamp))
    }

    /// Fresh while strictly younger than `ttl`.
    pub fn is_fresh_at(&self, now: u64, ttl: Duration) -> bool {
        self.age_at(now) < ttl
    }
}

/// Check whether `cached` may answer `request` right now.
///
/// Returns `false` for a missing entry. Otherwise the entry must be younger
/// than [`CALCULATION_CACHE_TTL`] and its stored params must structurally
/// equal `request`.
pub fn is_cache_valid<T>(cached: Option<&CacheEntry<T>>, request: &CalculationRequest) -> bool {
    is_cache_valid_at(cached, request, now_millis(), CALCULATION_CACHE_TTL)
}

/// [`is_cache_valid`] against an explicit clock and TTL.
pub fn is_cache_valid_at<T>(
    cached: Option<&CacheEntry<T>>,
    request: &CalculationRequest,
    now: u64,
    ttl: Duration,
) -> bool {
    let Some(entry) = cached else {
        return false;
    };
    entry.is_fresh_at(now, ttl) && entry.params == *request
}
