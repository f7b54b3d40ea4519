//! Core data models for the flight agent

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

//
// ================= Slots =================
//

/// Slot keys shared by convention between the classifier and the Query Agent.
pub mod slot {
    pub const ORIGIN: &str = "origin";
    pub const DESTINATION: &str = "destination";
    pub const DATE: &str = "date";
    pub const BOOKING_REFERENCE: &str = "booking_reference";
}

/// Extracted slot values, keyed by the constants above.
///
/// A missing slot is an absent key, never an empty string, so the Query
/// Agent can tell "not provided" from "explicitly empty". Ordered map so
/// identical queries serialize identically.
pub type SlotMap = BTreeMap<String, String>;

//
// ================= Request =================
//

/// One inbound user message. Immutable; discarded after the response.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Request {
    pub query_text: String,
    pub requester_id: String,
    pub conversation_id: String,
}

//
// ================= Intent =================
//

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum IntentKind {
    Search,
    Book,
    Modify,
    Cancel,
    Unknown,
}

/// Classified purpose of a query plus its extracted slots.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Intent {
    pub kind: IntentKind,
    pub slots: SlotMap,
}

impl Intent {
    pub fn new(kind: IntentKind, slots: SlotMap) -> Self {
        Self { kind, slots }
    }

    pub fn unknown() -> Self {
        Self {
            kind: IntentKind::Unknown,
            slots: SlotMap::new(),
        }
    }

    pub fn slot(&self, key: &str) -> Option<&str> {
        self.slots.get(key).map(String::as_str)
    }
}

//
// ================= Query results =================
//

/// One normalized flight option, the same shape regardless of which
/// upstream operation produced it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Offer {
    pub carrier: String,
    pub flight_number: Option<String>,
    pub origin: String,
    pub destination: String,
    pub departure: NaiveDateTime,
    pub arrival: NaiveDateTime,
    pub stops: u32,
    pub price: f64,
    pub currency: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct QueryResult {
    pub offers: Vec<Offer>,
}

//
// ================= Explanation =================
//

/// Final user-facing output plus structured metadata for the caller to
/// render (suggested follow-ups).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Explanation {
    pub text: String,
    pub follow_ups: Vec<String>,
}

impl fmt::Display for IntentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            IntentKind::Search => "search",
            IntentKind::Book => "book",
            IntentKind::Modify => "modify",
            IntentKind::Cancel => "cancel",
            IntentKind::Unknown => "unknown",
        };
        write!(f, "{}", s)
    }
}
