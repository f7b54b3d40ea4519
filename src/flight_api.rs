//! Flight-data API client
//!
//! Exactly one upstream operation per invocation. The HTTP client keeps
//! a long-lived reqwest::Client for connection pooling and caches its
//! OAuth2 access token until shortly before expiry. TLS verification is
//! the reqwest default; there is no opt-out.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use reqwest::{Client, Method};
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration as StdDuration;
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::config::FlightApiConfig;
use crate::error::FlightApiError;
use crate::models::{slot, IntentKind, SlotMap};

/// Seconds knocked off the reported token lifetime before re-fetching.
const TOKEN_EXPIRY_MARGIN_SECS: i64 = 60;

//
// ================= Operations =================
//

/// The upstream operations the Query Agent can invoke.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiOperation {
    OfferSearch,
    OrderCreate,
    OrderChange,
    OrderCancel,
}

impl ApiOperation {
    /// Fixed intent → operation table. Never inferred at runtime.
    pub fn for_intent(kind: IntentKind) -> Option<Self> {
        match kind {
            IntentKind::Search => Some(ApiOperation::OfferSearch),
            IntentKind::Book => Some(ApiOperation::OrderCreate),
            IntentKind::Modify => Some(ApiOperation::OrderChange),
            IntentKind::Cancel => Some(ApiOperation::OrderCancel),
            IntentKind::Unknown => None,
        }
    }

    pub fn endpoint(&self) -> &'static str {
        match self {
            ApiOperation::OfferSearch => "/v2/shopping/flight-offers",
            ApiOperation::OrderCreate => "/v1/booking/flight-orders",
            ApiOperation::OrderChange => "/v1/booking/flight-orders/change",
            ApiOperation::OrderCancel => "/v1/booking/flight-orders/cancel",
        }
    }

    pub fn method(&self) -> Method {
        match self {
            ApiOperation::OfferSearch => Method::GET,
            _ => Method::POST,
        }
    }
}

//
// ================= Trait =================
//

/// Transport seam for the Query Agent. Implementations must be safe for
/// concurrent invocation; the mocks in tests count calls through here.
#[async_trait]
pub trait FlightApi: Send + Sync {
    async fn invoke(&self, operation: ApiOperation, params: &SlotMap)
        -> Result<Value, FlightApiError>;
}

//
// ================= HTTP client =================
//

struct CachedToken {
    access_token: String,
    expires_at: DateTime<Utc>,
}

/// Reusable flight API client (connection-pooled)
pub struct HttpFlightApi {
    client: Client,
    config: FlightApiConfig,
    token: RwLock<Option<CachedToken>>,
}

impl HttpFlightApi {
    pub fn new(config: FlightApiConfig) -> Self {
        let client = Client::builder()
            .pool_idle_timeout(StdDuration::from_secs(90))
            .pool_max_idle_per_host(8)
            .timeout(StdDuration::from_secs(30))
            .build()
            .expect("Failed to build HTTP client");

        Self {
            client,
            config,
            token: RwLock::new(None),
        }
    }

    /// Get or refresh the OAuth2 client-credentials token.
    async fn access_token(&self) -> Result<String, FlightApiError> {
        {
            let cached = self.token.read().await;
            if let Some(token) = cached.as_ref() {
                if Utc::now() < token.expires_at {
                    return Ok(token.access_token.clone());
                }
            }
        }

        info!("Requesting new flight API access token");

        let url = format!("{}/v1/security/oauth2/token", self.config.base_url);
        let response = self
            .client
            .post(&url)
            .form(&[
                ("grant_type", "client_credentials"),
                ("client_id", self.config.client_id.as_str()),
                ("client_secret", self.config.client_secret.as_str()),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            return Err(FlightApiError::Auth(format!(
                "token endpoint returned {}",
                status
            )));
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| FlightApiError::Auth(format!("token response unreadable: {}", e)))?;

        let expires_at =
            Utc::now() + Duration::seconds(token.expires_in - TOKEN_EXPIRY_MARGIN_SECS);

        let access_token = token.access_token.clone();
        let mut cached = self.token.write().await;
        *cached = Some(CachedToken {
            access_token: token.access_token,
            expires_at,
        });

        Ok(access_token)
    }
}

#[async_trait]
impl FlightApi for HttpFlightApi {
    async fn invoke(
        &self,
        operation: ApiOperation,
        params: &SlotMap,
    ) -> Result<Value, FlightApiError> {
        let access_token = self.access_token().await?;
        let url = format!("{}{}", self.config.base_url, operation.endpoint());

        debug!(endpoint = operation.endpoint(), "Calling flight API");

        let request = if operation.method() == Method::GET {
            self.client.get(&url).query(&search_params(params))
        } else {
            self.client.post(&url).json(&order_body(params))
        };

        let response = request.bearer_auth(access_token).send().await?;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(FlightApiError::Status { status, body });
        }

        let payload = response.json::<Value>().await?;
        Ok(payload)
    }
}

/// Query parameters for the offer-search operation, upstream names.
fn search_params(params: &SlotMap) -> Vec<(String, String)> {
    let mut out = Vec::with_capacity(5);

    if let Some(origin) = params.get(slot::ORIGIN) {
        out.push(("originLocationCode".to_string(), origin.clone()));
    }
    if let Some(destination) = params.get(slot::DESTINATION) {
        out.push(("destinationLocationCode".to_string(), destination.clone()));
    }
    if let Some(date) = params.get(slot::DATE) {
        out.push(("departureDate".to_string(), date.clone()));
    }

    out.push(("adults".to_string(), "1".to_string()));
    out.push(("max".to_string(), "10".to_string()));

    out
}

/// JSON body for the order operations.
fn order_body(params: &SlotMap) -> Value {
    let mut data = serde_json::Map::new();

    if let Some(reference) = params.get(slot::BOOKING_REFERENCE) {
        data.insert("bookingReference".to_string(), json!(reference));
    }
    if let Some(origin) = params.get(slot::ORIGIN) {
        data.insert("originLocationCode".to_string(), json!(origin));
    }
    if let Some(destination) = params.get(slot::DESTINATION) {
        data.insert("destinationLocationCode".to_string(), json!(destination));
    }
    if let Some(date) = params.get(slot::DATE) {
        data.insert("departureDate".to_string(), json!(date));
    }

    json!({ "data": data })
}

//
// ================= Fixture transport =================
//

/// Deterministic transport for the demo binary and tests. Answers every
/// operation with a canned payload in the upstream wire shape, so the
/// Query Agent's normalization still runs for real.
pub struct StaticFlightApi {
    payload: Value,
}

impl StaticFlightApi {
    pub fn with_sample_offers() -> Self {
        Self {
            payload: sample_offers_payload(),
        }
    }

    pub fn empty() -> Self {
        Self {
            payload: json!({ "data": [] }),
        }
    }

    pub fn with_payload(payload: Value) -> Self {
        Self { payload }
    }
}

#[async_trait]
impl FlightApi for StaticFlightApi {
    async fn invoke(
        &self,
        _operation: ApiOperation,
        _params: &SlotMap,
    ) -> Result<Value, FlightApiError> {
        Ok(self.payload.clone())
    }
}

/// Two offers in the upstream offer-search shape.
pub fn sample_offers_payload() -> Value {
    json!({
        "data": [
            {
                "validatingAirlineCodes": ["SK"],
                "itineraries": [{
                    "segments": [{
                        "carrierCode": "SK",
                        "number": "903",
                        "departure": { "iataCode": "ARN", "at": "2025-10-10T08:05:00" },
                        "arrival": { "iataCode": "LHR", "at": "2025-10-10T10:00:00" }
                    }]
                }],
                "price": { "total": "230.40", "currency": "EUR" }
            },
            {
                "validatingAirlineCodes": ["BA"],
                "itineraries": [{
                    "segments": [
                        {
                            "carrierCode": "BA",
                            "number": "11",
                            "departure": { "iataCode": "ARN", "at": "2025-10-10T12:30:00" },
                            "arrival": { "iataCode": "AMS", "at": "2025-10-10T14:10:00" }
                        },
                        {
                            "carrierCode": "BA",
                            "number": "430",
                            "departure": { "iataCode": "AMS", "at": "2025-10-10T16:00:00" },
                            "arrival": { "iataCode": "LHR", "at": "2025-10-10T16:55:00" }
                        }
                    ]
                }],
                "price": { "total": "198.00", "currency": "EUR" }
            }
        ]
    })
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_token_lifetime")]
    expires_in: i64,
}

fn default_token_lifetime() -> i64 {
    1799
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operation_table_is_fixed() {
        assert_eq!(
            ApiOperation::for_intent(IntentKind::Search),
            Some(ApiOperation::OfferSearch)
        );
        assert_eq!(
            ApiOperation::for_intent(IntentKind::Book),
            Some(ApiOperation::OrderCreate)
        );
        assert_eq!(
            ApiOperation::for_intent(IntentKind::Modify),
            Some(ApiOperation::OrderChange)
        );
        assert_eq!(
            ApiOperation::for_intent(IntentKind::Cancel),
            Some(ApiOperation::OrderCancel)
        );
        assert_eq!(ApiOperation::for_intent(IntentKind::Unknown), None);
    }

    #[test]
    fn test_offer_search_uses_get() {
        assert_eq!(ApiOperation::OfferSearch.method(), Method::GET);
        assert_eq!(ApiOperation::OrderCancel.method(), Method::POST);
    }

    #[test]
    fn test_search_params_skip_absent_slots() {
        let mut slots = SlotMap::new();
        slots.insert(slot::ORIGIN.to_string(), "ARN".to_string());

        let params = search_params(&slots);
        assert!(params.iter().any(|(k, v)| k == "originLocationCode" && v == "ARN"));
        assert!(!params.iter().any(|(k, _)| k == "destinationLocationCode"));
        assert!(params.iter().any(|(k, v)| k == "adults" && v == "1"));
    }

    #[tokio::test]
    async fn test_static_api_returns_wire_shape() {
        let api = StaticFlightApi::with_sample_offers();
        let payload = api
            .invoke(ApiOperation::OfferSearch, &SlotMap::new())
            .await
            .unwrap();

        let offers = payload.get("data").and_then(Value::as_array).unwrap();
        assert_eq!(offers.len(), 2);
    }
}
