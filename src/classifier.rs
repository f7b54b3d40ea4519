//! Intent Classifier
//!
//! Maps free-text queries onto one of the fixed operation intents:
//! - Search: "find flights from ARN to LHR tomorrow"
//! - Book / Modify / Cancel: act on an itinerary
//! - Unknown: everything else (never an error)
//!
//! Slot extraction (origin, destination, date, booking reference) is
//! best-effort; a slot that cannot be read from the text is left absent.

use crate::models::{slot, Intent, IntentKind, SlotMap};
use chrono::{Datelike, Duration, NaiveDate, Utc, Weekday};

/// Classifier seam so the orchestrator can run against a fully mocked
/// implementation in tests. Total function: always returns an Intent.
pub trait IntentClassifier: Send + Sync {
    fn classify(&self, text: &str) -> Intent;
}

/// Static keyword lists — zero allocation
const CANCEL_KEYWORDS: &[&str] = &[
    "cancel", "refund", "call off", "scrap",
];

const MODIFY_KEYWORDS: &[&str] = &[
    "change", "modify", "reschedule", "rebook", "move my",
];

const BOOK_KEYWORDS: &[&str] = &[
    "book", "reserve", "purchase", "buy a ticket", "buy me",
];

const SEARCH_KEYWORDS: &[&str] = &[
    // Direct search verbs
    "find", "search", "show", "list", "look for",
    // Flight phrasing
    "flight", "flights", "fly", "fare", "fares",
    // Availability phrasing
    "options", "availability", "available seats",
];

/// City and airport aliases the upstream accepts as location codes.
const CITY_CODES: &[(&str, &str)] = &[
    ("stockholm", "ARN"),
    ("london", "LHR"),
    ("hanoi", "HAN"),
    ("paris", "CDG"),
    ("copenhagen", "CPH"),
    ("oslo", "OSL"),
    ("bangkok", "BKK"),
    ("tokyo", "HND"),
];

const WEEKDAYS: &[(&str, Weekday)] = &[
    ("monday", Weekday::Mon),
    ("tuesday", Weekday::Tue),
    ("wednesday", Weekday::Wed),
    ("thursday", Weekday::Thu),
    ("friday", Weekday::Fri),
    ("saturday", Weekday::Sat),
    ("sunday", Weekday::Sun),
];

/// Rule-backed classifier. Deterministic for a given text and reference
/// date; no side effects, no network.
pub struct RuleClassifier {
    reference_date: Option<NaiveDate>,
}

impl RuleClassifier {
    pub fn new() -> Self {
        Self {
            reference_date: None,
        }
    }

    /// Pin the date that relative expressions ("tomorrow", "next friday")
    /// resolve against. Used by tests; defaults to the current UTC date.
    pub fn with_reference_date(date: NaiveDate) -> Self {
        Self {
            reference_date: Some(date),
        }
    }

    fn today(&self) -> NaiveDate {
        self.reference_date
            .unwrap_or_else(|| Utc::now().date_naive())
    }
}

impl Default for RuleClassifier {
    fn default() -> Self {
        Self::new()
    }
}

impl IntentClassifier for RuleClassifier {
    fn classify(&self, text: &str) -> Intent {
        let lowered = text.to_lowercase();

        let kind = classify_kind(&lowered);
        if kind == IntentKind::Unknown {
            return Intent::unknown();
        }

        let mut slots = SlotMap::new();
        extract_route(text, &mut slots);

        if let Some(date) = extract_date(&lowered, self.today()) {
            slots.insert(slot::DATE.to_string(), date.format("%Y-%m-%d").to_string());
        }

        if matches!(kind, IntentKind::Modify | IntentKind::Cancel) {
            if let Some(reference) = extract_booking_reference(text) {
                slots.insert(slot::BOOKING_REFERENCE.to_string(), reference);
            }
        }

        Intent::new(kind, slots)
    }
}

/// Keyword precedence: cancel > modify > book > search. "cancel my
/// booking" must not read as a booking request.
fn classify_kind(lowered: &str) -> IntentKind {
    let hits = |keywords: &[&str]| keywords.iter().any(|kw| lowered.contains(kw));

    if hits(CANCEL_KEYWORDS) {
        IntentKind::Cancel
    } else if hits(MODIFY_KEYWORDS) {
        IntentKind::Modify
    } else if hits(BOOK_KEYWORDS) {
        IntentKind::Book
    } else if hits(SEARCH_KEYWORDS) {
        IntentKind::Search
    } else {
        IntentKind::Unknown
    }
}

/// Pull origin/destination location codes out of the text.
///
/// Recognizes bare IATA codes ("JFK") and known city aliases. A "from"
/// or "to" marker immediately before a location pins its role; otherwise
/// the first code read is the origin and the second the destination.
fn extract_route(text: &str, slots: &mut SlotMap) {
    let tokens: Vec<&str> = text
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|t| !t.is_empty())
        .collect();

    let mut previous: Option<String> = None;

    for token in tokens {
        let code = if is_iata_code(token) {
            Some(token.to_string())
        } else {
            city_code(&token.to_lowercase())
        };

        if let Some(code) = code {
            match previous.as_deref() {
                Some("from") | Some("leaving") | Some("departing") => {
                    slots.entry(slot::ORIGIN.to_string()).or_insert(code);
                }
                Some("to") | Some("into") | Some("towards") => {
                    slots.entry(slot::DESTINATION.to_string()).or_insert(code);
                }
                _ => {
                    if !slots.contains_key(slot::ORIGIN) {
                        slots.insert(slot::ORIGIN.to_string(), code);
                    } else if !slots.contains_key(slot::DESTINATION) {
                        slots.insert(slot::DESTINATION.to_string(), code);
                    }
                }
            }
        }

        previous = Some(token.to_lowercase());
    }
}

fn is_iata_code(token: &str) -> bool {
    token.len() == 3 && token.chars().all(|c| c.is_ascii_uppercase())
}

fn city_code(lowered_token: &str) -> Option<String> {
    CITY_CODES
        .iter()
        .find(|(city, _)| *city == lowered_token)
        .map(|(_, code)| (*code).to_string())
}

/// Resolve a travel date from the text: ISO dates first, then relative
/// expressions against the reference date.
fn extract_date(lowered: &str, today: NaiveDate) -> Option<NaiveDate> {
    for token in lowered.split_whitespace() {
        if let Ok(date) = NaiveDate::parse_from_str(token, "%Y-%m-%d") {
            return Some(date);
        }
    }

    if lowered.contains("today") {
        return Some(today);
    }
    if lowered.contains("tomorrow") {
        return Some(today + Duration::days(1));
    }

    for (name, weekday) in WEEKDAYS {
        if lowered.contains(name) {
            return Some(next_weekday(today, *weekday));
        }
    }

    None
}

/// Next occurrence of the weekday strictly after `today`.
fn next_weekday(today: NaiveDate, target: Weekday) -> NaiveDate {
    let offset = (target.num_days_from_monday() + 7 - today.weekday().num_days_from_monday()) % 7;
    let days = if offset == 0 { 7 } else { offset as i64 };
    today + Duration::days(days)
}

/// A PNR-style token: 5-8 uppercase alphanumerics with at least one
/// digit. The digit requirement keeps IATA codes and ordinary words out.
fn extract_booking_reference(text: &str) -> Option<String> {
    text.split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|t| t.len() >= 5 && t.len() <= 8)
        .filter(|t| t.chars().all(|c| c.is_ascii_uppercase() || c.is_ascii_digit()))
        .find(|t| t.chars().any(|c| c.is_ascii_digit()) && t.chars().any(|c| c.is_ascii_uppercase()))
        .map(|t| t.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classifier() -> RuleClassifier {
        // A Monday, so "next friday" resolves within the same week.
        RuleClassifier::with_reference_date(NaiveDate::from_ymd_opt(2025, 10, 6).unwrap())
    }

    #[test]
    fn test_search_with_route_and_relative_date() {
        let intent = classifier().classify("Find flights from JFK to LAX next Friday");

        assert_eq!(intent.kind, IntentKind::Search);
        assert_eq!(intent.slot(slot::ORIGIN), Some("JFK"));
        assert_eq!(intent.slot(slot::DESTINATION), Some("LAX"));
        assert_eq!(intent.slot(slot::DATE), Some("2025-10-10"));
    }

    #[test]
    fn test_city_aliases_resolve_to_codes() {
        let intent = classifier().classify("show me flights from Stockholm to Hanoi tomorrow");

        assert_eq!(intent.kind, IntentKind::Search);
        assert_eq!(intent.slot(slot::ORIGIN), Some("ARN"));
        assert_eq!(intent.slot(slot::DESTINATION), Some("HAN"));
        assert_eq!(intent.slot(slot::DATE), Some("2025-10-07"));
    }

    #[test]
    fn test_book_without_route_leaves_slots_absent() {
        let intent = classifier().classify("book a flight");

        assert_eq!(intent.kind, IntentKind::Book);
        assert_eq!(intent.slot(slot::ORIGIN), None);
        assert_eq!(intent.slot(slot::DESTINATION), None);
    }

    #[test]
    fn test_cancel_outranks_book() {
        let intent = classifier().classify("cancel my booking ABC123");

        assert_eq!(intent.kind, IntentKind::Cancel);
        assert_eq!(intent.slot(slot::BOOKING_REFERENCE), Some("ABC123"));
    }

    #[test]
    fn test_modify_with_reference() {
        let intent = classifier().classify("reschedule XY12AB to 2025-11-02");

        assert_eq!(intent.kind, IntentKind::Modify);
        assert_eq!(intent.slot(slot::BOOKING_REFERENCE), Some("XY12AB"));
        assert_eq!(intent.slot(slot::DATE), Some("2025-11-02"));
    }

    #[test]
    fn test_unrelated_text_is_unknown() {
        let cases = vec![
            "what's the weather",
            "tell me a joke",
            "",
            "   ",
            "¯\\_(ツ)_/¯",
        ];

        for c in cases {
            let intent = classifier().classify(c);
            assert_eq!(intent.kind, IntentKind::Unknown, "case: {:?}", c);
            assert!(intent.slots.is_empty());
        }
    }

    #[test]
    fn test_total_over_odd_inputs() {
        // Never panics, always yields exactly one kind.
        let cases = vec![
            "FIND FLIGHTS!!! from    ARN",
            "from to from to",
            "0000-99-99 flights",
            "\u{0000}\u{FFFF} fly",
        ];

        for c in cases {
            let _ = classifier().classify(c);
        }
    }

    #[test]
    fn test_iso_date_beats_relative_words() {
        let intent = classifier().classify("find flights ARN to LHR on 2025-12-24 tomorrow");
        assert_eq!(intent.slot(slot::DATE), Some("2025-12-24"));
    }

    #[test]
    fn test_next_weekday_wraps_a_full_week() {
        let monday = NaiveDate::from_ymd_opt(2025, 10, 6).unwrap();
        assert_eq!(
            next_weekday(monday, Weekday::Mon),
            NaiveDate::from_ymd_opt(2025, 10, 13).unwrap()
        );
        assert_eq!(
            next_weekday(monday, Weekday::Tue),
            NaiveDate::from_ymd_opt(2025, 10, 7).unwrap()
        );
    }
}
