//! Timestamp enrichment — runs ahead of every sink.

use chrono::{Local, NaiveDateTime, TimeZone, Utc};
use serde_json::Value;

use crate::event::{EventRecord, TIMESTAMP_KEY, Timestamp};

/// Substitutable time source. `Fixed` makes enrichment deterministic in
/// tests.
#[derive(Debug, Clone, Copy)]
pub enum Clock {
    System,
    Fixed(NaiveDateTime),
}

/// Injects or canonicalizes the `@timestamp` field of an [`EventRecord`].
#[derive(Debug, Clone)]
pub struct TimeStamper {
    clock: Clock,
    utc: bool,
}

impl TimeStamper {
    pub fn new(clock: Clock, utc: bool) -> Self {
        Self { clock, utc }
    }

    fn now(&self) -> Timestamp {
        match (self.clock, self.utc) {
            (Clock::System, true) => Timestamp::Utc(Utc::now()),
            (Clock::System, false) => Timestamp::Naive(Local::now().naive_local()),
            (Clock::Fixed(instant), true) => {
                Timestamp::Utc(Utc.from_utc_datetime(&instant))
            }
            (Clock::Fixed(instant), false) => Timestamp::Naive(instant),
        }
    }

    /// Fold the record's timestamp into its field map.
    ///
    /// A record without one gets "now" from the configured clock; a record
    /// carrying a structured instant gets the canonical ISO-8601 rendering;
    /// a record carrying a string keeps it verbatim. An `@timestamp` placed
    /// straight into the field map is kept as-is; only the explicit
    /// override replaces it.
    pub fn stamp(&self, record: &mut EventRecord) {
        let timestamp = match record.timestamp.take() {
            Some(timestamp) => timestamp,
            None if record.fields.contains_key(TIMESTAMP_KEY) => return,
            None => self.now(),
        };
        record
            .fields
            .insert(TIMESTAMP_KEY.to_string(), Value::String(timestamp.to_iso8601()));
    }
}
