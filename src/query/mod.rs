//! Query Agent
//!
//! Validates required slots, invokes exactly one flight-data API
//! operation, translates upstream errors into the fixed failure
//! taxonomy, and normalizes every payload into one QueryResult shape.
//! Retries are owned here, not by the Orchestrator.

use chrono::NaiveDateTime;
use serde_json::Value;
use std::sync::Arc;
use tokio::time::timeout;
use tracing::{debug, warn};

use crate::config::RetryPolicy;
use crate::error::{FailureKind, FlightApiError, QueryFailure};
use crate::flight_api::{ApiOperation, FlightApi};
use crate::models::{slot, Intent, IntentKind, Offer, QueryResult};

/// Required slots per intent kind, listed in report order: the first
/// absent slot is the one named in the MissingParameter failure.
const REQUIRED_SLOTS: &[(IntentKind, &[&str])] = &[
    (IntentKind::Search, &[slot::ORIGIN, slot::DESTINATION, slot::DATE]),
    (IntentKind::Book, &[slot::DESTINATION, slot::ORIGIN, slot::DATE]),
    (IntentKind::Modify, &[slot::BOOKING_REFERENCE]),
    (IntentKind::Cancel, &[slot::BOOKING_REFERENCE]),
];

/// Data retrieval agent. Stateless across requests; safe for concurrent
/// use when the transport is.
pub struct QueryAgent {
    api: Arc<dyn FlightApi>,
    policy: RetryPolicy,
}

impl QueryAgent {
    pub fn new(api: Arc<dyn FlightApi>) -> Self {
        Self {
            api,
            policy: RetryPolicy::default(),
        }
    }

    pub fn with_policy(api: Arc<dyn FlightApi>, policy: RetryPolicy) -> Self {
        Self { api, policy }
    }

    /// Fetch structured flight data for a classified intent.
    ///
    /// Validation failures return before any transport I/O. Retryable
    /// upstream failures are re-attempted with exponential backoff up to
    /// the policy bound; exhaustion returns the last failure unchanged.
    pub async fn fetch(&self, intent: &Intent) -> Result<QueryResult, QueryFailure> {
        let Some(operation) = ApiOperation::for_intent(intent.kind) else {
            return Err(QueryFailure::new(FailureKind::UnrecognizedIntent));
        };

        if let Some(missing) = missing_slot(intent) {
            debug!(kind = %intent.kind, slot = missing, "Required slot absent");
            return Err(QueryFailure::with_detail(
                FailureKind::MissingParameter,
                missing,
            ));
        }

        let mut attempt: u32 = 0;
        loop {
            let outcome = timeout(
                self.policy.call_timeout,
                self.api.invoke(operation, &intent.slots),
            )
            .await;

            let failure = match outcome {
                Ok(Ok(payload)) => return normalize(&payload),
                Ok(Err(err)) => translate(err),
                Err(_elapsed) => QueryFailure::with_detail(
                    FailureKind::UpstreamUnavailable,
                    "upstream call timed out",
                ),
            };

            if !failure.kind.is_retryable() || attempt >= self.policy.max_retries {
                return Err(failure);
            }

            let delay = self.policy.backoff_base * 2u32.pow(attempt);
            warn!(
                attempt = attempt + 1,
                kind = %failure.kind,
                delay_ms = delay.as_millis() as u64,
                "Flight API call failed - retrying"
            );
            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }
}

fn missing_slot(intent: &Intent) -> Option<&'static str> {
    REQUIRED_SLOTS
        .iter()
        .find(|(kind, _)| *kind == intent.kind)
        .and_then(|(_, required)| {
            required
                .iter()
                .find(|key| intent.slot(key).is_none())
                .copied()
        })
}

/// Map raw client errors onto the failure taxonomy.
fn translate(err: FlightApiError) -> QueryFailure {
    match err {
        FlightApiError::Status { status, body } => {
            let kind = if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
                FailureKind::RateLimited
            } else if status == reqwest::StatusCode::UNAUTHORIZED
                || status == reqwest::StatusCode::FORBIDDEN
            {
                FailureKind::Unauthorized
            } else if status == reqwest::StatusCode::NOT_FOUND {
                FailureKind::NotFound
            } else if status.is_server_error() {
                FailureKind::UpstreamUnavailable
            } else {
                FailureKind::InvalidResponse
            };

            QueryFailure::with_detail(kind, format!("status {}: {}", status.as_u16(), body))
        }
        FlightApiError::Transport(e) => {
            QueryFailure::with_detail(FailureKind::UpstreamUnavailable, e.to_string())
        }
        FlightApiError::Decode(e) => {
            QueryFailure::with_detail(FailureKind::InvalidResponse, e.to_string())
        }
        FlightApiError::Auth(detail) => {
            QueryFailure::with_detail(FailureKind::Unauthorized, detail)
        }
    }
}

/// Normalize an upstream payload into the one shape the Explainer
/// formats. Offer-search responses carry `data` as an array; order
/// responses wrap their offers in `data.flightOffers`.
fn normalize(payload: &Value) -> Result<QueryResult, QueryFailure> {
    let entries = match payload.get("data") {
        Some(Value::Array(entries)) => entries.as_slice(),
        Some(Value::Object(data)) => match data.get("flightOffers") {
            Some(Value::Array(entries)) => entries.as_slice(),
            _ => {
                return Err(QueryFailure::with_detail(
                    FailureKind::InvalidResponse,
                    "data object without flightOffers",
                ))
            }
        },
        _ => {
            return Err(QueryFailure::with_detail(
                FailureKind::InvalidResponse,
                "payload missing data",
            ))
        }
    };

    let mut offers = Vec::with_capacity(entries.len());
    for entry in entries {
        let offer = parse_offer(entry).ok_or_else(|| {
            QueryFailure::with_detail(FailureKind::InvalidResponse, "offer missing required fields")
        })?;
        offers.push(offer);
    }

    Ok(QueryResult { offers })
}

fn parse_offer(entry: &Value) -> Option<Offer> {
    let segments = entry
        .get("itineraries")?
        .as_array()?
        .first()?
        .get("segments")?
        .as_array()?;

    let first = segments.first()?;
    let last = segments.last()?;

    let carrier = entry
        .get("validatingAirlineCodes")
        .and_then(Value::as_array)
        .and_then(|codes| codes.first())
        .and_then(Value::as_str)
        .or_else(|| first.get("carrierCode").and_then(Value::as_str))?
        .to_string();

    let flight_number = first
        .get("carrierCode")
        .and_then(Value::as_str)
        .zip(first.get("number").and_then(Value::as_str))
        .map(|(code, number)| format!("{} {}", code, number));

    let price = entry.get("price")?;

    Some(Offer {
        carrier,
        flight_number,
        origin: segment_code(first, "departure")?,
        destination: segment_code(last, "arrival")?,
        departure: segment_time(first, "departure")?,
        arrival: segment_time(last, "arrival")?,
        stops: (segments.len() - 1) as u32,
        price: price.get("total")?.as_str()?.parse().ok()?,
        currency: price.get("currency")?.as_str()?.to_string(),
    })
}

fn segment_code(segment: &Value, end: &str) -> Option<String> {
    segment
        .get(end)?
        .get("iataCode")?
        .as_str()
        .map(str::to_string)
}

fn segment_time(segment: &Value, end: &str) -> Option<NaiveDateTime> {
    let raw = segment.get(end)?.get("at")?.as_str()?;
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S").ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flight_api::{sample_offers_payload, StaticFlightApi};
    use crate::models::SlotMap;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Transport that always fails with a given status, counting calls.
    struct FailingApi {
        status: reqwest::StatusCode,
        calls: AtomicUsize,
    }

    impl FailingApi {
        fn new(status: reqwest::StatusCode) -> Self {
            Self {
                status,
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl FlightApi for FailingApi {
        async fn invoke(
            &self,
            _operation: ApiOperation,
            _params: &SlotMap,
        ) -> Result<Value, FlightApiError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(FlightApiError::Status {
                status: self.status,
                body: "upstream says no".to_string(),
            })
        }
    }

    fn search_intent() -> Intent {
        let mut slots = SlotMap::new();
        slots.insert(slot::ORIGIN.to_string(), "ARN".to_string());
        slots.insert(slot::DESTINATION.to_string(), "LHR".to_string());
        slots.insert(slot::DATE.to_string(), "2025-10-10".to_string());
        Intent::new(IntentKind::Search, slots)
    }

    fn fast_policy() -> RetryPolicy {
        RetryPolicy {
            max_retries: 2,
            backoff_base: Duration::from_millis(1),
            call_timeout: Duration::from_secs(1),
        }
    }

    #[tokio::test]
    async fn test_missing_slot_skips_transport() {
        let api = Arc::new(FailingApi::new(reqwest::StatusCode::OK));
        let agent = QueryAgent::new(api.clone());

        let intent = Intent::new(IntentKind::Book, SlotMap::new());
        let failure = agent.fetch(&intent).await.unwrap_err();

        assert_eq!(failure.kind, FailureKind::MissingParameter);
        assert_eq!(failure.detail.as_deref(), Some("destination"));
        assert_eq!(api.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_retry_bound_is_exact() {
        let api = Arc::new(FailingApi::new(reqwest::StatusCode::SERVICE_UNAVAILABLE));
        let agent = QueryAgent::with_policy(api.clone(), fast_policy());

        let failure = agent.fetch(&search_intent()).await.unwrap_err();

        assert_eq!(failure.kind, FailureKind::UpstreamUnavailable);
        // 1 initial attempt + max_retries retries, not more, not fewer.
        assert_eq!(api.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_terminal_kinds_are_not_retried() {
        let api = Arc::new(FailingApi::new(reqwest::StatusCode::UNAUTHORIZED));
        let agent = QueryAgent::with_policy(api.clone(), fast_policy());

        let failure = agent.fetch(&search_intent()).await.unwrap_err();

        assert_eq!(failure.kind, FailureKind::Unauthorized);
        assert_eq!(api.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_rate_limit_exhaustion_keeps_kind() {
        let api = Arc::new(FailingApi::new(reqwest::StatusCode::TOO_MANY_REQUESTS));
        let agent = QueryAgent::with_policy(api.clone(), fast_policy());

        let failure = agent.fetch(&search_intent()).await.unwrap_err();

        assert_eq!(failure.kind, FailureKind::RateLimited);
        assert_eq!(api.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_unknown_intent_is_refused() {
        let api = Arc::new(FailingApi::new(reqwest::StatusCode::OK));
        let agent = QueryAgent::new(api.clone());

        let failure = agent.fetch(&Intent::unknown()).await.unwrap_err();

        assert_eq!(failure.kind, FailureKind::UnrecognizedIntent);
        assert_eq!(api.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_normalizes_sample_offers() {
        let api = Arc::new(StaticFlightApi::with_sample_offers());
        let agent = QueryAgent::new(api);

        let result = agent.fetch(&search_intent()).await.unwrap();

        assert_eq!(result.offers.len(), 2);

        let direct = &result.offers[0];
        assert_eq!(direct.carrier, "SK");
        assert_eq!(direct.flight_number.as_deref(), Some("SK 903"));
        assert_eq!(direct.origin, "ARN");
        assert_eq!(direct.destination, "LHR");
        assert_eq!(direct.stops, 0);
        assert!((direct.price - 230.40).abs() < f64::EPSILON);
        assert_eq!(direct.currency, "EUR");

        let connecting = &result.offers[1];
        assert_eq!(connecting.stops, 1);
        assert_eq!(connecting.origin, "ARN");
        assert_eq!(connecting.destination, "LHR");
    }

    #[tokio::test]
    async fn test_empty_offer_list_is_a_success() {
        let api = Arc::new(StaticFlightApi::empty());
        let agent = QueryAgent::new(api);

        let result = agent.fetch(&search_intent()).await.unwrap();
        assert!(result.offers.is_empty());
    }

    #[tokio::test]
    async fn test_malformed_payload_is_invalid_response() {
        let api = Arc::new(StaticFlightApi::with_payload(json!({ "unexpected": true })));
        let agent = QueryAgent::new(api);

        let failure = agent.fetch(&search_intent()).await.unwrap_err();
        assert_eq!(failure.kind, FailureKind::InvalidResponse);
    }

    #[tokio::test]
    async fn test_malformed_offer_entry_is_invalid_response() {
        let api = Arc::new(StaticFlightApi::with_payload(json!({
            "data": [{ "price": { "total": "not-a-number", "currency": "EUR" } }]
        })));
        let agent = QueryAgent::new(api);

        let failure = agent.fetch(&search_intent()).await.unwrap_err();
        assert_eq!(failure.kind, FailureKind::InvalidResponse);
    }

    #[test]
    fn test_order_payload_shape_normalizes() {
        let payload = json!({
            "data": { "flightOffers": sample_offers_payload()["data"] }
        });

        let result = normalize(&payload).unwrap();
        assert_eq!(result.offers.len(), 2);
    }

    #[test]
    fn test_translate_status_table() {
        let failure = |status| {
            translate(FlightApiError::Status {
                status,
                body: String::new(),
            })
        };

        assert_eq!(
            failure(reqwest::StatusCode::TOO_MANY_REQUESTS).kind,
            FailureKind::RateLimited
        );
        assert_eq!(
            failure(reqwest::StatusCode::UNAUTHORIZED).kind,
            FailureKind::Unauthorized
        );
        assert_eq!(
            failure(reqwest::StatusCode::FORBIDDEN).kind,
            FailureKind::Unauthorized
        );
        assert_eq!(
            failure(reqwest::StatusCode::NOT_FOUND).kind,
            FailureKind::NotFound
        );
        assert_eq!(
            failure(reqwest::StatusCode::BAD_GATEWAY).kind,
            FailureKind::UpstreamUnavailable
        );
        assert_eq!(
            failure(reqwest::StatusCode::BAD_REQUEST).kind,
            FailureKind::InvalidResponse
        );
    }

    #[test]
    fn test_missing_slot_report_order() {
        let mut slots = SlotMap::new();
        slots.insert(slot::DESTINATION.to_string(), "LHR".to_string());
        let intent = Intent::new(IntentKind::Book, slots);

        assert_eq!(missing_slot(&intent), Some(slot::ORIGIN));
    }
}
