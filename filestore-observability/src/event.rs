use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};
use serde_json::Value;
use std::collections::BTreeMap;

/// Field name under which the event timestamp is emitted.
pub const TIMESTAMP_KEY: &str = "@timestamp";

/// Event name of per-request access-log entries.
pub const ACCESS_EVENT: &str = "http.access";

/// Event name of the single record emitted after the socket is closed.
pub const STOP_EVENT: &str = "stop";

/// A timestamp as carried by an [`EventRecord`] before enrichment.
///
/// Callers may hand over an already-rendered string (passed through
/// verbatim) or a structured instant (canonicalized to ISO-8601). Naive
/// instants render without an offset, UTC instants with `+00:00`, matching
/// what downstream collectors index.
#[derive(Debug, Clone, PartialEq)]
pub enum Timestamp {
    Text(String),
    Utc(DateTime<Utc>),
    Naive(NaiveDateTime),
}

impl Timestamp {
    /// Canonical ISO-8601 rendering. Sub-second digits only appear when
    /// non-zero.
    pub fn to_iso8601(&self) -> String {
        match self {
            Timestamp::Text(text) => text.clone(),
            Timestamp::Utc(instant) => {
                if instant.timestamp_subsec_nanos() == 0 {
                    instant.to_rfc3339_opts(SecondsFormat::Secs, false)
                } else {
                    instant.to_rfc3339_opts(SecondsFormat::AutoSi, false)
                }
            }
            Timestamp::Naive(instant) => format!("{}", instant.format("%Y-%m-%dT%H:%M:%S%.f")),
        }
    }
}

/// A named structured log entry.
///
/// Invariant: after enrichment (see [`crate::timestamp::TimeStamper`]) the
/// field map carries exactly one `@timestamp` entry and `timestamp` has been
/// folded into it.
#[derive(Debug, Clone)]
pub struct EventRecord {
    pub event: String,
    pub fields: BTreeMap<String, Value>,
    /// Explicit timestamp override; `None` means "stamp me at enrichment".
    pub timestamp: Option<Timestamp>,
}

impl EventRecord {
    pub fn new(event: impl Into<String>) -> Self {
        Self {
            event: event.into(),
            fields: BTreeMap::new(),
            timestamp: None,
        }
    }

    /// Builder-style field attachment.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    /// Builder-style explicit timestamp override.
    pub fn at(mut self, timestamp: Timestamp) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    pub fn field(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }
}

/// One per-request access-log record.
///
/// `arrived` is captured once at request arrival and attached as the
/// explicit timestamp so enrichment never substitutes emission time;
/// `duration` is measured on the monotonic clock.
#[derive(Debug, Clone)]
pub struct AccessLogEntry {
    pub path: String,
    pub outcome: u16,
    pub duration: f64,
    pub request: String,
    pub arrived: DateTime<Utc>,
}

impl AccessLogEntry {
    pub fn into_record(self) -> EventRecord {
        EventRecord::new(ACCESS_EVENT)
            .with("path", self.path)
            .with("outcome", self.outcome)
            .with("duration", self.duration)
            .with("request", self.request)
            .at(Timestamp::Utc(self.arrived))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone};

    #[test]
    fn utc_timestamp_renders_with_offset() {
        let instant = Utc.with_ymd_and_hms(2016, 5, 8, 21, 19, 0).unwrap();
        assert_eq!(
            Timestamp::Utc(instant).to_iso8601(),
            "2016-05-08T21:19:00+00:00"
        );
    }

    #[test]
    fn naive_timestamp_renders_without_offset() {
        let instant = NaiveDate::from_ymd_opt(2016, 5, 8)
            .unwrap()
            .and_hms_opt(21, 19, 0)
            .unwrap();
        assert_eq!(Timestamp::Naive(instant).to_iso8601(), "2016-05-08T21:19:00");
    }

    #[test]
    fn text_timestamp_passes_through() {
        let ts = Timestamp::Text("2016-05-08T21:19:00".to_string());
        assert_eq!(ts.to_iso8601(), "2016-05-08T21:19:00");
    }

    #[test]
    fn access_entry_produces_fixed_field_set() {
        let arrived = Utc.with_ymd_and_hms(2016, 5, 8, 21, 19, 0).unwrap();
        let record = AccessLogEntry {
            path: "/hello.txt".to_string(),
            outcome: 201,
            duration: 0.25,
            request: "abc".to_string(),
            arrived,
        }
        .into_record();

        assert_eq!(record.event, ACCESS_EVENT);
        assert_eq!(*record.field("path").unwrap(), "/hello.txt");
        assert_eq!(*record.field("outcome").unwrap(), 201);
        assert_eq!(*record.field("duration").unwrap(), 0.25);
        assert_eq!(*record.field("request").unwrap(), "abc");
        assert_eq!(record.timestamp, Some(Timestamp::Utc(arrived)));
    }
}
