//! Thin asynchronous client for the marketplace delivery API.
//!
//! - Typed accessors for universal cost calculation, shipment tracking and providers.
//! - No caching here: results are dispatched into [`crate::domain::DeliveryState`] by the caller.

use std::time::Duration;

use reqwest::{Client, StatusCode, Url};
use serde::{de::DeserializeOwned, Deserialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::domain::{CalculationRequest, CalculationResponse, DeliveryProvider, TrackingInfo};

pub const DEFAULT_BASE_URL: &str = "http://localhost:3000/api/v1/";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);
const USER_AGENT: &str = concat!("delivery-quotes/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Error)]
pub enum DeliveryApiError {
    #[error("invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
    #[error("http request error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("api returned {status}: {message}")]
    Status { status: u16, message: String },
    #[error("api error: {0}")]
    Api(String),
}

#[derive(Debug, Deserialize)]
struct ApiEnvelope<T> {
    #[serde(default)]
    success: bool,
    data: Option<T>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error: Option<ApiErrorBody>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    #[serde(default)]
    message: Option<String>,
}

impl<T> ApiEnvelope<T> {
    fn failure_message(&self) -> Option<String> {
        self.message
            .clone()
            .or_else(|| self.error.as_ref().and_then(|e| e.message.clone()))
    }
}

#[derive(Clone)]
pub struct DeliveryApiClient {
    http: Client,
    base_url: Url,
}

impl DeliveryApiClient {
    pub fn with_base_url(base: &str) -> Result<Self, DeliveryApiError> {
        Self::build(base, DEFAULT_TIMEOUT)
    }

    pub fn build(base: &str, timeout: Duration) -> Result<Self, DeliveryApiError> {
        // Url::join drops the last segment unless the base ends in '/'.
        let base_url = if base.ends_with('/') {
            Url::parse(base)?
        } else {
            Url::parse(&format!("{base}/"))?
        };
        let http = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()?;
        Ok(Self { http, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Ask every enabled provider for a quote.
    ///
    /// A body with `success: false` is returned as-is so the caller can keep the
    /// API's message; only transport and decoding failures become errors.
    pub async fn calculate_universal(
        &self,
        request: &CalculationRequest,
    ) -> Result<CalculationResponse, DeliveryApiError> {
        let url = self.url("delivery/calculate-universal")?;
        debug!(
            %url,
            from = %request.from_location.city,
            to = %request.to_location.city,
            "requesting delivery quotes"
        );

        let response = self.http.post(url).json(request).send().await?;
        let status = response.status();
        let body = response.text().await?;

        match serde_json::from_str::<CalculationResponse>(&body) {
            Ok(parsed) => Ok(parsed),
            Err(_) if !status.is_success() => Err(status_error(status, &body)),
            Err(err) => Err(DeliveryApiError::Decode(err)),
        }
    }

    pub async fn track_shipment(
        &self,
        tracking_number: &str,
    ) -> Result<TrackingInfo, DeliveryApiError> {
        let mut url = self.url("shipments/track/")?;
        url.path_segments_mut()
            .map_err(|_| DeliveryApiError::Api("base URL cannot hold a path".to_string()))?
            .pop_if_empty()
            .push(tracking_number);

        debug!(%url, "requesting shipment tracking");
        self.fetch_data(self.http.get(url)).await
    }

    pub async fn get_providers(&self) -> Result<Vec<DeliveryProvider>, DeliveryApiError> {
        let url = self.url("delivery/providers")?;
        self.fetch_data(self.http.get(url)).await
    }

    async fn fetch_data<T>(&self, builder: reqwest::RequestBuilder) -> Result<T, DeliveryApiError>
    where
        T: DeserializeOwned,
    {
        let response = builder.send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(status_error(status, &body));
        }

        let envelope: ApiEnvelope<T> = serde_json::from_str(&body)?;
        let message = envelope.failure_message();
        match (envelope.success, envelope.data) {
            (true, Some(data)) => Ok(data),
            (true, None) => Err(DeliveryApiError::Api("response missing data".into())),
            (false, _) => Err(DeliveryApiError::Api(
                message.unwrap_or_else(|| "request was not successful".to_string()),
            )),
        }
    }

    fn url(&self, path: &str) -> Result<Url, url::ParseError> {
        self.base_url.join(path)
    }
}

fn status_error(status: StatusCode, body: &str) -> DeliveryApiError {
    let message = serde_json::from_str::<ApiEnvelope<serde_json::Value>>(body)
        .ok()
        .and_then(|envelope| envelope.failure_message())
        .unwrap_or_else(|| {
            status
                .canonical_reason()
                .unwrap_or("unexpected status")
                .to_string()
        });
    warn!(status = status.as_u16(), %message, "delivery api request failed");
    DeliveryApiError::Status {
        status: status.as_u16(),
        message,
    }
}
