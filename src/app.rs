//! Fetch layer: consults the session store first, calls the delivery API on a
//! miss and dispatches the outcome (data or error message) back into the store.

use tracing::{debug, info, warn};

use crate::{
    domain::{CalculationRequest, CalculationResponse, DeliveryState, TrackingInfo},
    infra::delivery_api::DeliveryApiClient,
};

/// Cost calculation for `request`, served from cache while it is valid.
///
/// Returns `None` when the call failed or the API reported no success; the
/// message is then available via [`DeliveryState::calculation_error`].
pub async fn fetch_calculation(
    client: &DeliveryApiClient,
    state: &mut DeliveryState,
    request: &CalculationRequest,
) -> Option<CalculationResponse> {
    if let Some(cached) = state.cached_calculation(request) {
        debug!(
            from = %request.from_location.city,
            to = %request.to_location.city,
            "serving cached delivery quotes"
        );
        return Some(cached.clone());
    }

    let key = request.cache_key();
    state.mark_calculating(key.clone());
    info!(
        from = %request.from_location.city,
        to = %request.to_location.city,
        items = request.items.len(),
        "calculating delivery quotes"
    );

    match client.calculate_universal(request).await {
        Ok(response) if response.success && response.data.is_some() => {
            info!(quotes = response.quotes().len(), "received delivery quotes");
            state.record_calculation(request.clone(), response.clone());
            Some(response)
        }
        Ok(response) => {
            let message = response
                .message
                .unwrap_or_else(|| "Failed to calculate delivery cost".to_string());
            warn!(%message, "delivery calculation rejected");
            state.record_calculation_error(key, message);
            None
        }
        Err(err) => {
            warn!(error = %err, "delivery calculation failed");
            state.record_calculation_error(key, err.to_string());
            None
        }
    }
}

/// Tracking state for `tracking_number`, served from cache when present.
pub async fn fetch_tracking(
    client: &DeliveryApiClient,
    state: &mut DeliveryState,
    tracking_number: &str,
) -> Option<TrackingInfo> {
    let tracking_number = tracking_number.trim();
    if let Some(cached) = state.tracking(tracking_number) {
        debug!(tracking_number, "serving cached tracking info");
        return Some(cached.clone());
    }
    refresh_tracking(client, state, tracking_number).await
}

/// Fetch tracking state from the API even if a cached copy exists.
pub async fn refresh_tracking(
    client: &DeliveryApiClient,
    state: &mut DeliveryState,
    tracking_number: &str,
) -> Option<TrackingInfo> {
    let tracking_number = tracking_number.trim();
    if tracking_number.is_empty() {
        return None;
    }

    state.mark_tracking(tracking_number);
    info!(tracking_number, "looking up shipment");

    match client.track_shipment(tracking_number).await {
        Ok(info) => {
            info!(
                tracking_number,
                status = %info.status,
                events = info.events.len(),
                "received tracking info"
            );
            // Keyed by the number the caller asked for, not by the provider's echo.
            let mut info = info;
            info.tracking_number = tracking_number.to_string();
            state.record_tracking(info.clone());
            Some(info)
        }
        Err(err) => {
            warn!(tracking_number, error = %err, "shipment lookup failed");
            state.record_tracking_error(tracking_number, err.to_string());
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{CalculationItem, Location};
    use mockito::Server;
    use serde_json::json;

    fn request() -> CalculationRequest {
        CalculationRequest::new(
            Location::new("Belgrade", Some("11000"), "RS"),
            Location::new("Novi Sad", Some("21000"), "RS"),
            vec![CalculationItem::with_weight(2.5)],
        )
    }

    fn quotes_body() -> String {
        json!({
            "success": true,
            "data": {
                "providers": [{
                    "provider_code": "post_express",
                    "provider_name": "Post Express",
                    "total_cost": 250.0,
                    "base_price": 200.0,
                    "currency": "RSD"
                }]
            }
        })
        .to_string()
    }

    #[tokio::test]
    async fn second_calculation_is_served_from_cache() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/delivery/calculate-universal")
            .with_status(200)
            .with_body(quotes_body())
            .expect(1)
            .create_async()
            .await;

        let client = DeliveryApiClient::with_base_url(&server.url()).expect("client");
        let mut state = DeliveryState::new();

        let first = fetch_calculation(&client, &mut state, &request()).await;
        let second = fetch_calculation(&client, &mut state, &request()).await;

        mock.assert_async().await;
        assert!(first.is_some());
        assert_eq!(first, second);
        assert!(!state.is_calculating(&request().cache_key()));
    }

    #[tokio::test]
    async fn different_request_misses_cache() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/delivery/calculate-universal")
            .with_status(200)
            .with_body(quotes_body())
            .expect(2)
            .create_async()
            .await;

        let client = DeliveryApiClient::with_base_url(&server.url()).expect("client");
        let mut state = DeliveryState::new();
        let mut to_nis = request();
        to_nis.to_location.city = "Nis".to_string();

        fetch_calculation(&client, &mut state, &request()).await;
        fetch_calculation(&client, &mut state, &to_nis).await;

        mock.assert_async().await;
        assert_eq!(state.calculations_len(), 2);
    }

    #[tokio::test]
    async fn rejected_calculation_records_message() {
        let mut server = Server::new_async().await;
        server
            .mock("POST", "/delivery/calculate-universal")
            .with_status(200)
            .with_body(json!({"success": false, "message": "No providers for route"}).to_string())
            .create_async()
            .await;

        let client = DeliveryApiClient::with_base_url(&server.url()).expect("client");
        let mut state = DeliveryState::new();
        let key = request().cache_key();

        assert!(fetch_calculation(&client, &mut state, &request()).await.is_none());
        assert_eq!(state.calculation_error(&key), Some("No providers for route"));
        assert!(state.calculation(&key).is_none());
        assert!(!state.is_calculating(&key));
    }

    #[tokio::test]
    async fn tracking_failure_is_recorded_per_number() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/shipments/track/INVALID123")
            .with_status(404)
            .with_body(
                json!({"success": false, "message": "Tracking number not found"}).to_string(),
            )
            .create_async()
            .await;

        let client = DeliveryApiClient::with_base_url(&server.url()).expect("client");
        let mut state = DeliveryState::new();

        assert!(fetch_tracking(&client, &mut state, "INVALID123").await.is_none());
        let message = state.tracking_error("INVALID123").expect("error recorded");
        assert!(message.contains("Tracking number not found"));
    }

    #[tokio::test]
    async fn cached_tracking_skips_network_until_refresh() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/shipments/track/PE123456789")
            .with_status(200)
            .with_body(
                json!({
                    "success": true,
                    "data": {
                        "shipment_id": 456,
                        "tracking_number": "PE123456789",
                        "status": "in_transit",
                        "events": []
                    }
                })
                .to_string(),
            )
            .expect(2)
            .create_async()
            .await;

        let client = DeliveryApiClient::with_base_url(&server.url()).expect("client");
        let mut state = DeliveryState::new();

        fetch_tracking(&client, &mut state, "PE123456789").await;
        fetch_tracking(&client, &mut state, "PE123456789").await;
        refresh_tracking(&client, &mut state, "PE123456789").await;

        mock.assert_async().await;
        assert!(state.tracking("PE123456789").is_some());
    }

    #[tokio::test]
    async fn padded_tracking_number_hits_cache() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/shipments/track/PE1")
            .with_status(200)
            .with_body(
                json!({
                    "success": true,
                    "data": {
                        "shipment_id": 7,
                        "tracking_number": "PE1",
                        "status": "picked_up",
                        "events": []
                    }
                })
                .to_string(),
            )
            .expect(1)
            .create_async()
            .await;

        let client = DeliveryApiClient::with_base_url(&server.url()).expect("client");
        let mut state = DeliveryState::new();

        let first = fetch_tracking(&client, &mut state, " PE1 ").await;
        let second = fetch_tracking(&client, &mut state, " PE1 ").await;
        let unpadded = fetch_tracking(&client, &mut state, "PE1").await;

        mock.assert_async().await;
        assert!(first.is_some());
        assert_eq!(first, second);
        assert_eq!(second, unpadded);
        assert_eq!(state.tracking_len(), 1);
    }

    #[tokio::test]
    async fn blank_tracking_number_is_ignored() {
        let client = DeliveryApiClient::with_base_url("http://127.0.0.1:9/").expect("client");
        let mut state = DeliveryState::new();
        assert!(fetch_tracking(&client, &mut state, "   ").await.is_none());
        assert_eq!(state.tracking_len(), 0);
    }
}
