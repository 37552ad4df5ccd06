pub mod cache;
pub mod delivery_api;
