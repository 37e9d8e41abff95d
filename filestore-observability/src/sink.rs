//! Sink resolution — turns a parsed [`LoggingEndpoint`] into a live
//! [`EventLog`]: timestamp enrichment in front of either a local stream
//! writer or the fluent forwarder.

use std::fs::File;
use std::io::{self, Write};
use std::sync::{Arc, Mutex};

use filestore_core::endpoint::{LoggingEndpoint, RenderMode};
use filestore_core::error::FilestoreError;

use crate::event::EventRecord;
use crate::fluent::FluentForwarder;
use crate::render::render_line;
use crate::timestamp::{Clock, TimeStamper};

/// Local stream destination. Every emit writes one complete rendered line
/// under the lock, so overlapping emitters never interleave partial lines.
pub struct LocalWriter {
    inner: Mutex<Box<dyn Write + Send>>,
}

impl LocalWriter {
    /// Open the destination for a `file://` endpoint. `/dev/stdout` and
    /// `/dev/stderr` bind to the process streams; anything else is created
    /// on disk. Open failures are fatal at startup.
    pub fn open(path: &str) -> io::Result<Self> {
        let stream: Box<dyn Write + Send> = match path {
            "/dev/stdout" => Box::new(io::stdout()),
            "/dev/stderr" => Box::new(io::stderr()),
            path => Box::new(File::create(path)?),
        };
        Ok(Self {
            inner: Mutex::new(stream),
        })
    }

    fn write_line(&self, line: &str) {
        let Ok(mut stream) = self.inner.lock() else {
            return;
        };
        if let Err(e) = stream.write_all(line.as_bytes()).and_then(|_| stream.flush()) {
            tracing::error!(error = %e, "Event log write failed");
        }
    }
}

/// Captures records in memory. Used by tests and by anything that needs to
/// observe emissions without a real destination.
#[derive(Clone, Default)]
pub struct MemoryHandle {
    records: Arc<Mutex<Vec<EventRecord>>>,
}

impl MemoryHandle {
    pub fn records(&self) -> Vec<EventRecord> {
        self.records.lock().map(|r| r.clone()).unwrap_or_default()
    }

    fn push(&self, record: EventRecord) {
        if let Ok(mut records) = self.records.lock() {
            records.push(record);
        }
    }
}

enum SinkKind {
    Local { writer: LocalWriter, mode: RenderMode },
    Fluent(FluentForwarder),
    Memory(MemoryHandle),
}

/// The process-wide event log: enrichment plus a concrete sink.
///
/// Constructed once at startup from the endpoint descriptor and passed by
/// reference into everything that emits; there is no hidden global logger.
pub struct EventLog {
    stamper: TimeStamper,
    kind: SinkKind,
}

impl EventLog {
    /// Wire the enrichment processor in front of the sink the endpoint
    /// selects. Fluent endpoints force UTC timestamps regardless of the
    /// caller's preference; local endpoints honor it.
    pub fn resolve(
        endpoint: &LoggingEndpoint,
        mode: RenderMode,
        utc: bool,
        clock: Clock,
    ) -> Result<Self, FilestoreError> {
        match endpoint {
            LoggingEndpoint::File { path } => Ok(Self {
                stamper: TimeStamper::new(clock, utc),
                kind: SinkKind::Local {
                    writer: LocalWriter::open(path)?,
                    mode,
                },
            }),
            LoggingEndpoint::Fluent { host, port, tag } => Ok(Self {
                stamper: TimeStamper::new(clock, true),
                kind: SinkKind::Fluent(FluentForwarder::new(host.clone(), *port, tag.clone())),
            }),
        }
    }

    /// An in-memory event log plus a handle to read back what was emitted.
    pub fn memory(clock: Clock, utc: bool) -> (Self, MemoryHandle) {
        let handle = MemoryHandle::default();
        let log = Self {
            stamper: TimeStamper::new(clock, utc),
            kind: SinkKind::Memory(handle.clone()),
        };
        (log, handle)
    }

    /// Enrich and emit one record.
    pub async fn emit(&self, mut record: EventRecord) {
        self.stamper.stamp(&mut record);
        match &self.kind {
            SinkKind::Local { writer, mode } => writer.write_line(&render_line(&record, *mode)),
            SinkKind::Fluent(forwarder) => forwarder.emit(&record).await,
            SinkKind::Memory(handle) => handle.push(record),
        }
    }

    /// Flush and release the sink. For the fluent sink this drains the
    /// outbound queue (bounded by its flush deadline); local streams are
    /// flushed on every write already.
    pub async fn close(&self) {
        if let SinkKind::Fluent(forwarder) = &self.kind {
            forwarder.close().await;
        }
    }
}
