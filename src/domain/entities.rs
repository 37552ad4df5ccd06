use std::fmt;

use serde::{Deserialize, Serialize};
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

/// Identifier of a seller's storefront. Selections are scoped to it.
pub type StorefrontId = String;

/// A pickup or drop-off point used in a cost calculation.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub city: String,
    #[serde(default)]
    pub postal_code: Option<String>,
    pub country: String,
}

impl Location {
    pub fn new(
        city: impl Into<String>,
        postal_code: Option<&str>,
        country: impl Into<String>,
    ) -> Self {
        Self {
            city: city.into(),
            postal_code: postal_code.map(str::to_string),
            country: country.into(),
        }
    }
}

/// A single parcel line. Dimensions are centimetres, weight is kilograms.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CalculationItem {
    pub weight: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub length: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<f64>,
    #[serde(default = "default_quantity")]
    pub quantity: u32,
}

fn default_quantity() -> u32 {
    1
}

impl CalculationItem {
    pub fn with_weight(weight: f64) -> Self {
        Self {
            weight,
            length: None,
            width: None,
            height: None,
            quantity: 1,
        }
    }

    pub fn with_dimensions(mut self, length: f64, width: f64, height: f64) -> Self {
        self.length = Some(length);
        self.width = Some(width);
        self.height = Some(height);
        self
    }
}

/// Input to a delivery cost calculation. Doubles as the cache equality key.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CalculationRequest {
    pub from_location: Location,
    pub to_location: Location,
    pub items: Vec<CalculationItem>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub insurance_value: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cod_amount: Option<f64>,
}

impl CalculationRequest {
    pub fn new(
        from_location: Location,
        to_location: Location,
        items: Vec<CalculationItem>,
    ) -> Self {
        Self {
            from_location,
            to_location,
            items,
            insurance_value: None,
            cod_amount: None,
        }
    }

    /// Canonical lookup key: compact JSON over the fixed field order.
    ///
    /// Structurally equal requests always produce the same key and any
    /// differing nested field produces a different one.
    pub fn cache_key(&self) -> String {
        // Plain structs of strings and numbers; serialization does not fail.
        serde_json::to_string(self).unwrap_or_else(|_| format!("{self:?}"))
    }

    pub fn total_weight(&self) -> f64 {
        self.items
            .iter()
            .map(|item| item.weight * f64::from(item.quantity))
            .sum()
    }
}

/// A priced offer from one provider for one calculation request.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DeliveryQuote {
    #[serde(default)]
    pub provider_id: Option<i64>,
    pub provider_code: String,
    pub provider_name: String,
    pub total_cost: f64,
    #[serde(default)]
    pub base_price: f64,
    pub currency: String,
    #[serde(default)]
    pub estimated_delivery: Option<String>,
    #[serde(default)]
    pub delivery_days: Option<u32>,
    #[serde(default)]
    pub insurance_cost: Option<f64>,
    #[serde(default)]
    pub cod_fee: Option<f64>,
}

/// Payload of a successful universal calculation.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CalculationResult {
    #[serde(default)]
    pub providers: Vec<DeliveryQuote>,
    #[serde(default)]
    pub recommended: Option<DeliveryQuote>,
    #[serde(default)]
    pub cheapest: Option<DeliveryQuote>,
    #[serde(default)]
    pub fastest: Option<DeliveryQuote>,
}

/// Provider quote(s) for a request, as returned by the delivery API.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CalculationResponse {
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub data: Option<CalculationResult>,
}

impl CalculationResponse {
    pub fn quotes(&self) -> &[DeliveryQuote] {
        self.data
            .as_ref()
            .map(|data| data.providers.as_slice())
            .unwrap_or(&[])
    }

    /// Cheapest quote: the API's highlight when present, else the lowest total.
    pub fn cheapest(&self) -> Option<&DeliveryQuote> {
        self.data
            .as_ref()
            .and_then(|data| data.cheapest.as_ref())
            .or_else(|| {
                self.quotes()
                    .iter()
                    .min_by(|a, b| a.total_cost.total_cmp(&b.total_cost))
            })
    }

    pub fn recommended(&self) -> Option<&DeliveryQuote> {
        self.data.as_ref().and_then(|data| data.recommended.as_ref())
    }
}

/// Shipment lifecycle status as reported by courier providers.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ShipmentStatus {
    Pending,
    PickupScheduled,
    PickedUp,
    InTransit,
    OutForDelivery,
    Delivered,
    FailedDelivery,
    Returned,
    Cancelled,
    Other(String),
}

/// Happy-path order used to compute progress.
const PROGRESS_ORDER: [ShipmentStatus; 6] = [
    ShipmentStatus::Pending,
    ShipmentStatus::PickupScheduled,
    ShipmentStatus::PickedUp,
    ShipmentStatus::InTransit,
    ShipmentStatus::OutForDelivery,
    ShipmentStatus::Delivered,
];

impl ShipmentStatus {
    pub fn as_str(&self) -> &str {
        match self {
            ShipmentStatus::Pending => "pending",
            ShipmentStatus::PickupScheduled => "pickup_scheduled",
            ShipmentStatus::PickedUp => "picked_up",
            ShipmentStatus::InTransit => "in_transit",
            ShipmentStatus::OutForDelivery => "out_for_delivery",
            ShipmentStatus::Delivered => "delivered",
            ShipmentStatus::FailedDelivery => "failed_delivery",
            ShipmentStatus::Returned => "returned",
            ShipmentStatus::Cancelled => "cancelled",
            ShipmentStatus::Other(raw) => raw.as_str(),
        }
    }

    /// Delivery progress in percent along the happy path.
    /// Statuses off that path (failures, returns, unknown codes) report 0.
    pub fn progress_percent(&self) -> u8 {
        if *self == ShipmentStatus::Delivered {
            return 100;
        }
        PROGRESS_ORDER
            .iter()
            .position(|status| status == self)
            .map(|index| {
                ((index + 1) as f64 / PROGRESS_ORDER.len() as f64 * 100.0).round() as u8
            })
            .unwrap_or(0)
    }
}

impl From<String> for ShipmentStatus {
    fn from(raw: String) -> Self {
        match raw.as_str() {
            "pending" => ShipmentStatus::Pending,
            "pickup_scheduled" => ShipmentStatus::PickupScheduled,
            "picked_up" => ShipmentStatus::PickedUp,
            "in_transit" => ShipmentStatus::InTransit,
            "out_for_delivery" => ShipmentStatus::OutForDelivery,
            "delivered" => ShipmentStatus::Delivered,
            "failed_delivery" => ShipmentStatus::FailedDelivery,
            "returned" => ShipmentStatus::Returned,
            "cancelled" => ShipmentStatus::Cancelled,
            _ => ShipmentStatus::Other(raw),
        }
    }
}

impl From<ShipmentStatus> for String {
    fn from(status: ShipmentStatus) -> Self {
        status.as_str().to_string()
    }
}

impl fmt::Display for ShipmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TrackingEvent {
    #[serde(alias = "event_time")]
    pub timestamp: String,
    #[serde(default)]
    pub location: Option<String>,
    pub status: ShipmentStatus,
    #[serde(default)]
    pub description: Option<String>,
}

/// Shipment tracking state for one tracking number.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TrackingInfo {
    pub shipment_id: i64,
    pub tracking_number: String,
    pub status: ShipmentStatus,
    #[serde(default)]
    pub current_location: Option<String>,
    #[serde(default)]
    pub estimated_delivery: Option<String>,
    #[serde(default, alias = "actual_delivery_date")]
    pub actual_delivery: Option<String>,
    #[serde(default)]
    pub events: Vec<TrackingEvent>,
}

impl TrackingInfo {
    pub fn latest_event(&self) -> Option<&TrackingEvent> {
        self.events.last()
    }

    pub fn estimated_delivery_at(&self) -> Option<OffsetDateTime> {
        parse_rfc3339(self.estimated_delivery.as_deref())
    }
}

/// A courier that can be offered at checkout.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DeliveryProvider {
    pub code: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub logo_url: Option<String>,
}

fn parse_rfc3339(raw: Option<&str>) -> Option<OffsetDateTime> {
    raw.and_then(|value| OffsetDateTime::parse(value, &Rfc3339).ok())
}
