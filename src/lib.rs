//! Session-scoped delivery quote cache for marketplace checkout.
//!
//! [`domain::DeliveryState`] holds cost calculations (TTL-validated against the
//! originating request), tracking lookups and the quote selected per
//! storefront. [`app`] fills it from the delivery API.

pub mod app;
pub mod config;
pub mod domain;
pub mod infra;

pub use domain::DeliveryState;
pub use infra::cache::{is_cache_valid, CacheEntry, CALCULATION_CACHE_TTL};
