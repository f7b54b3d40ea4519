//! Main orchestrator - sequences the agent pipeline
//!
//! REQUEST → CLASSIFY → FETCH → EXPLAIN → RESPOND
//!
//! Strictly linear per request; no stage calls back upstream. Every
//! terminal failure becomes a distinct user-safe message here.

use tracing::{debug, info, warn};

use crate::classifier::IntentClassifier;
use crate::error::{FailureKind, FailureReport, QueryFailure};
use crate::explainer::ExplainerAgent;
use crate::models::{slot, Explanation, IntentKind, Request};
use crate::query::QueryAgent;

/// Coordinates classification, data retrieval, and explanation for one
/// request. Holds no mutable state; one instance serves concurrent
/// requests.
pub struct Orchestrator {
    classifier: Box<dyn IntentClassifier>,
    query_agent: QueryAgent,
    explainer: ExplainerAgent,
}

impl Orchestrator {
    pub fn new(
        classifier: Box<dyn IntentClassifier>,
        query_agent: QueryAgent,
        explainer: ExplainerAgent,
    ) -> Self {
        Self {
            classifier,
            query_agent,
            explainer,
        }
    }

    /// Handle one request to a single terminal outcome: an Explanation
    /// or a FailureReport, never both, never neither.
    pub async fn handle(&self, request: &Request) -> Result<Explanation, FailureReport> {
        info!(
            requester_id = %request.requester_id,
            conversation_id = %request.conversation_id,
            query = %request.query_text,
            "Orchestrator: handling request"
        );

        let intent = self.classifier.classify(&request.query_text);
        debug!(
            kind = %intent.kind,
            slot_count = intent.slots.len(),
            "Intent classified"
        );

        if intent.kind == IntentKind::Unknown {
            warn!("Unrecognized intent - downstream agents skipped");
            return Err(FailureReport::new(
                FailureKind::UnrecognizedIntent,
                user_message(FailureKind::UnrecognizedIntent, None),
            ));
        }

        let result = match self.query_agent.fetch(&intent).await {
            Ok(result) => result,
            Err(failure) => {
                warn!(
                    kind = %failure.kind,
                    detail = ?failure.detail,
                    "Query agent failed - no explanation attempted"
                );
                return Err(report_for(&failure));
            }
        };

        debug!(offer_count = result.offers.len(), "Query agent returned data");

        let explanation = self.explainer.explain(&result);
        info!("Request complete");

        Ok(explanation)
    }
}

/// Build the user-facing report for a terminal query failure. Only the
/// MissingParameter kind uses the detail, and only to name the slot.
fn report_for(failure: &QueryFailure) -> FailureReport {
    FailureReport::new(
        failure.kind,
        user_message(failure.kind, failure.detail.as_deref()),
    )
}

/// Fixed failure-kind → message table. No status codes, payloads, or
/// other internals may appear here.
fn user_message(kind: FailureKind, detail: Option<&str>) -> String {
    match kind {
        FailureKind::UnrecognizedIntent => {
            "I did not understand that request. Try asking for flights, for example: \
             \"find flights from ARN to LHR tomorrow\"."
                .to_string()
        }
        FailureKind::MissingParameter => format!(
            "I need one more detail to do that: {}.",
            detail.map(slot_phrase).unwrap_or("the missing information")
        ),
        FailureKind::RateLimited => {
            "The flight system is busy right now. Please try again shortly.".to_string()
        }
        FailureKind::Unauthorized => {
            "I could not sign in to the flight system. Please try again later.".to_string()
        }
        FailureKind::NotFound => {
            "I could not find anything matching that request.".to_string()
        }
        FailureKind::UpstreamUnavailable => {
            "The flight system is not responding right now. Please try again in a few minutes."
                .to_string()
        }
        FailureKind::InvalidResponse => {
            "The flight system returned something I could not read. Please try again.".to_string()
        }
    }
}

fn slot_phrase(key: &str) -> &str {
    match key {
        slot::ORIGIN => "which airport you are leaving from",
        slot::DESTINATION => "which destination you want to fly to",
        slot::DATE => "which date you want to travel",
        slot::BOOKING_REFERENCE => "your booking reference",
        _ => "the missing information",
    }
}
