//! Delivery domain: wire entities and the session store that caches them.

pub mod delivery_state;
pub mod entities;

pub use delivery_state::DeliveryState;
pub use entities::{
    CalculationItem, CalculationRequest, CalculationResponse, CalculationResult, DeliveryProvider,
    DeliveryQuote, Location, ShipmentStatus, StorefrontId, TrackingEvent, TrackingInfo,
};
