use std::{
    collections::{HashMap, HashSet},
    time::Duration,
};

use tracing::debug;

use super::entities::{
    CalculationRequest, CalculationResponse, DeliveryQuote, StorefrontId, TrackingInfo,
};
use crate::infra::cache::{is_cache_valid_at, now_millis, CacheEntry, CALCULATION_CACHE_TTL};

/// Session-scoped delivery state: cached calculations and tracking lookups,
/// their error messages, and the checkout selection per storefront.
///
/// Every mutation is synchronous and infallible. Nothing here talks to the
/// network; see [`crate::app`] for the fetch layer that feeds it.
#[derive(Clone, Debug)]
pub struct DeliveryState {
    selected_quotes: HashMap<StorefrontId, DeliveryQuote>,
    calculations: HashMap<String, CacheEntry<CalculationResponse>>,
    calculations_error: HashMap<String, String>,
    calculations_loading: HashSet<String>,
    tracking: HashMap<String, TrackingInfo>,
    tracking_error: HashMap<String, String>,
    tracking_loading: HashSet<String>,
    calculation_ttl: Duration,
}

impl Default for DeliveryState {
    fn default() -> Self {
        Self::new()
    }
}

impl DeliveryState {
    pub fn new() -> Self {
        Self::with_calculation_ttl(CALCULATION_CACHE_TTL)
    }

    pub fn with_calculation_ttl(calculation_ttl: Duration) -> Self {
        Self {
            selected_quotes: HashMap::new(),
            calculations: HashMap::new(),
            calculations_error: HashMap::new(),
            calculations_loading: HashSet::new(),
            tracking: HashMap::new(),
            tracking_error: HashMap::new(),
            tracking_loading: HashSet::new(),
            calculation_ttl,
        }
    }

    pub fn calculation_ttl(&self) -> Duration {
        self.calculation_ttl
    }

    // ---- checkout selection -------------------------------------------------

    /// Record `quote` as the chosen option for `storefront_id`, replacing any prior choice.
    pub fn select_quote(&mut self, storefront_id: impl Into<StorefrontId>, quote: DeliveryQuote) {
        let storefront_id = storefront_id.into();
        debug!(
            storefront = %storefront_id,
            provider = %quote.provider_code,
            total_cost = quote.total_cost,
            "selected delivery quote"
        );
        self.selected_quotes.insert(storefront_id, quote);
    }

    pub fn selected_quote(&self, storefront_id: &str) -> Option<&DeliveryQuote> {
        self.selected_quotes.get(storefront_id)
    }

    pub fn selected_quotes(&self) -> &HashMap<StorefrontId, DeliveryQuote> {
        &self.selected_quotes
    }

    pub fn clear_quote(&mut self, storefront_id: &str) {
        self.selected_quotes.remove(storefront_id);
    }

    pub fn clear_all_quotes(&mut self) {
        self.selected_quotes.clear();
    }

    /// Sum of selected totals across storefronts. Mixed currencies are not converted.
    pub fn selected_total(&self) -> f64 {
        self.selected_quotes.values().map(|q| q.total_cost).sum()
    }

    // ---- calculations -------------------------------------------------------

    pub fn calculation(&self, key: &str) -> Option<&CacheEntry<CalculationResponse>> {
        self.calculations.get(key)
    }

    pub fn calculation_error(&self, key: &str) -> Option<&str> {
        self.calculations_error.get(key).map(String::as_str)
    }

    pub fn calculations_len(&self) -> usize {
        self.calculations.len()
    }

    /// The stored response for `request`, if it is still valid for it.
    pub fn cached_calculation(&self, request: &CalculationRequest) -> Option<&CalculationResponse> {
        self.cached_calculation_at(request, now_millis())
    }

    pub fn cached_calculation_at(
        &self,
        request: &CalculationRequest,
        now: u64,
    ) -> Option<&CalculationResponse> {
        let entry = self.calculations.get(&request.cache_key());
        if is_cache_valid_at(entry, request, now, self.calculation_ttl) {
            entry.map(|entry| &entry.data)
        } else {
            None
        }
    }

    /// Store a fresh response under the request's key and drop any error recorded for it.
    pub fn record_calculation(
        &mut self,
        request: CalculationRequest,
        response: CalculationResponse,
    ) {
        let entry = CacheEntry::new(response, request);
        self.insert_calculation_entry(entry);
    }

    /// Store a prebuilt entry, keeping its timestamp.
    pub fn insert_calculation_entry(&mut self, entry: CacheEntry<CalculationResponse>) {
        let key = entry.params.cache_key();
        self.calculations_error.remove(&key);
        self.calculations_loading.remove(&key);
        self.calculations.insert(key, entry);
    }

    pub fn record_calculation_error(
        &mut self,
        key: impl Into<String>,
        message: impl Into<String>,
    ) {
        let key = key.into();
        self.calculations_loading.remove(&key);
        self.calculations_error.insert(key, message.into());
    }

    pub fn mark_calculating(&mut self, key: impl Into<String>) {
        self.calculations_loading.insert(key.into());
    }

    pub fn is_calculating(&self, key: &str) -> bool {
        self.calculations_loading.contains(key)
    }

    /// Empty the calculation cache together with its error map.
    pub fn clear_calculations_cache(&mut self) {
        self.calculations.clear();
        self.calculations_error.clear();
    }

    // ---- tracking -----------------------------------------------------------

    pub fn tracking(&self, tracking_number: &str) -> Option<&TrackingInfo> {
        self.tracking.get(tracking_number)
    }

    pub fn tracking_error(&self, tracking_number: &str) -> Option<&str> {
        self.tracking_error.get(tracking_number).map(String::as_str)
    }

    pub fn tracking_len(&self) -> usize {
        self.tracking.len()
    }

    pub fn record_tracking(&mut self, info: TrackingInfo) {
        let key = info.tracking_number.clone();
        self.tracking_error.remove(&key);
        self.tracking_loading.remove(&key);
        self.tracking.insert(key, info);
    }

    pub fn record_tracking_error(
        &mut self,
        tracking_number: impl Into<String>,
        message: impl Into<String>,
    ) {
        let key = tracking_number.into();
        self.tracking_loading.remove(&key);
        self.tracking_error.insert(key, message.into());
    }

    pub fn mark_tracking(&mut self, tracking_number: impl Into<String>) {
        self.tracking_loading.insert(tracking_number.into());
    }

    pub fn is_tracking(&self, tracking_number: &str) -> bool {
        self.tracking_loading.contains(tracking_number)
    }

    /// Empty the tracking cache together with its error map.
    pub fn clear_tracking_cache(&mut self) {
        self.tracking.clear();
        self.tracking_error.clear();
    }

    /// Drop everything: selections, both caches, errors and in-flight markers.
    pub fn reset(&mut self) {
        self.clear_all_quotes();
        self.clear_calculations_cache();
        self.clear_tracking_cache();
        self.calculations_loading.clear();
        self.tracking_loading.clear();
    }
}
