//! Explainer Agent
//!
//! Pure formatting of normalized query results into user-facing text.
//! Deterministic for identical input; never returns a blank string and
//! never fails upward. An offer that does not format cleanly degrades
//! the whole response to a minimal count summary.

use crate::models::{Explanation, Offer, QueryResult};

const NO_OFFERS_MESSAGE: &str =
    "No flights found for that route and date. A different date or a nearby airport may have more options.";

pub struct ExplainerAgent;

impl ExplainerAgent {
    pub fn new() -> Self {
        Self
    }

    /// Turn a query result into user-ready text plus follow-up hints.
    pub fn explain(&self, result: &QueryResult) -> Explanation {
        if result.offers.is_empty() {
            return Explanation {
                text: NO_OFFERS_MESSAGE.to_string(),
                follow_ups: vec![
                    "Try another travel date".to_string(),
                    "Try a nearby airport".to_string(),
                ],
            };
        }

        let mut lines = Vec::with_capacity(result.offers.len() + 1);
        lines.push(format!(
            "Found {} flight option(s):",
            result.offers.len()
        ));

        for (i, offer) in result.offers.iter().enumerate() {
            match format_offer(i + 1, offer) {
                Some(line) => lines.push(line),
                None => return fallback_summary(result),
            }
        }

        Explanation {
            text: lines.join("\n"),
            follow_ups: vec![
                "Ask to confirm the price of an option".to_string(),
                "Ask about booking classes on this route".to_string(),
            ],
        }
    }
}

impl Default for ExplainerAgent {
    fn default() -> Self {
        Self::new()
    }
}

/// One offer as a single line. None when the fields are unusable.
fn format_offer(position: usize, offer: &Offer) -> Option<String> {
    if offer.carrier.trim().is_empty()
        || offer.origin.trim().is_empty()
        || offer.destination.trim().is_empty()
        || offer.currency.trim().is_empty()
        || !offer.price.is_finite()
    {
        return None;
    }

    let flight = offer
        .flight_number
        .clone()
        .unwrap_or_else(|| offer.carrier.clone());

    let stops = match offer.stops {
        0 => "nonstop".to_string(),
        1 => "1 stop".to_string(),
        n => format!("{} stops", n),
    };

    Some(format!(
        "{}. {} • {} to {} • departs {} • arrives {} • {} • {:.2} {}",
        position,
        flight,
        offer.origin,
        offer.destination,
        offer.departure.format("%Y-%m-%d %H:%M"),
        offer.arrival.format("%H:%M"),
        stops,
        offer.price,
        offer.currency,
    ))
}

/// Minimal summary when detailed formatting is not possible.
fn fallback_summary(result: &QueryResult) -> Explanation {
    Explanation {
        text: format!(
            "Found {} flight option(s), but some details could not be displayed. Ask again with a specific route and date to narrow it down.",
            result.offers.len()
        ),
        follow_ups: vec!["Ask again with a specific route and date".to_string()],
    }
}
