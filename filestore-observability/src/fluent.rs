//! Fluent forward protocol shipper.
//!
//! Each event becomes one msgpack frame `[tag, unix-seconds, field-map]`
//! with `tag = "<namespace>.<event-name>"`, the shape standard fluentd
//! collectors accept on their forward input.
//!
//! One background task owns the single outbound connection for the process
//! lifetime. Frames are fully encoded before they are queued and fully
//! written before the next frame starts, so concurrent emitters can never
//! interleave partial frames. The queue is bounded; when it is full the
//! producer waits rather than dropping records. Reconnects use exponential
//! backoff.

use chrono::Utc;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Mutex;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

use crate::event::EventRecord;

const QUEUE_CAPACITY: usize = 1024;
const BACKOFF_INITIAL: Duration = Duration::from_millis(100);
const BACKOFF_MAX: Duration = Duration::from_secs(5);
/// Upper bound on how long `close()` waits for queued frames to flush.
const FLUSH_DEADLINE: Duration = Duration::from_secs(1);

/// Encode one forward-protocol frame.
pub fn encode_message(
    tag: &str,
    time: i64,
    fields: &BTreeMap<String, Value>,
) -> Result<Vec<u8>, rmp_serde::encode::Error> {
    rmp_serde::to_vec(&(tag, time, fields))
}

/// Ships events to a fluentd collector over one persistent connection.
pub struct FluentForwarder {
    namespace: String,
    sender: Mutex<Option<mpsc::Sender<Vec<u8>>>>,
    writer: Mutex<Option<JoinHandle<()>>>,
}

impl FluentForwarder {
    /// Spawn the writer task. The connection itself is established lazily on
    /// the first frame, so a collector that is briefly down at startup does
    /// not keep the server from binding.
    pub fn new(host: impl Into<String>, port: u16, namespace: impl Into<String>) -> Self {
        let (tx, rx) = mpsc::channel(QUEUE_CAPACITY);
        let host = host.into();
        let writer = tokio::spawn(write_loop(rx, host, port));
        Self {
            namespace: namespace.into(),
            sender: Mutex::new(Some(tx)),
            writer: Mutex::new(Some(writer)),
        }
    }

    /// Queue one enriched record. Waits when the outbound buffer is full.
    pub async fn emit(&self, record: &EventRecord) {
        let tag = if self.namespace.is_empty() {
            record.event.clone()
        } else {
            format!("{}.{}", self.namespace, record.event)
        };
        let frame = match encode_message(&tag, Utc::now().timestamp(), &record.fields) {
            Ok(frame) => frame,
            Err(e) => {
                error!(error = %e, tag = %tag, "Failed to encode fluent frame");
                return;
            }
        };
        let sender = match self.sender.lock() {
            Ok(guard) => guard.as_ref().cloned(),
            Err(_) => None,
        };
        match sender {
            Some(sender) => {
                if sender.send(frame).await.is_err() {
                    error!(tag = %tag, "Fluent writer is gone, dropping event");
                }
            }
            None => error!(tag = %tag, "Fluent forwarder already closed, dropping event"),
        }
    }

    /// Close the queue and wait (bounded) for buffered frames to flush.
    pub async fn close(&self) {
        if let Ok(mut guard) = self.sender.lock() {
            guard.take();
        }
        let writer = match self.writer.lock() {
            Ok(mut guard) => guard.take(),
            Err(_) => None,
        };
        if let Some(writer) = writer {
            if tokio::time::timeout(FLUSH_DEADLINE, writer).await.is_err() {
                warn!("Fluent writer did not flush within deadline");
            }
        }
    }
}

/// Owns the connection. Runs until the queue is closed and drained.
async fn write_loop(mut rx: mpsc::Receiver<Vec<u8>>, host: String, port: u16) {
    let mut conn: Option<TcpStream> = None;
    let mut backoff = BACKOFF_INITIAL;

    while let Some(frame) = rx.recv().await {
        loop {
            if conn.is_none() {
                match TcpStream::connect((host.as_str(), port)).await {
                    Ok(stream) => {
                        debug!(host = %host, port, "Connected to fluent collector");
                        backoff = BACKOFF_INITIAL;
                        conn = Some(stream);
                    }
                    Err(e) => {
                        warn!(error = %e, host = %host, port, "Fluent connect failed, backing off");
                        tokio::time::sleep(backoff).await;
                        backoff = (backoff * 2).min(BACKOFF_MAX);
                        continue;
                    }
                }
            }
            let written = match conn.as_mut() {
                Some(stream) => match stream.write_all(&frame).await {
                    Ok(()) => true,
                    Err(e) => {
                        warn!(error = %e, "Fluent write failed, reconnecting");
                        false
                    }
                },
                None => false,
            };
            if written {
                break;
            }
            // Stale connection; drop it and retry this frame once the
            // reconnect succeeds.
            conn = None;
        }
    }

    if let Some(mut stream) = conn {
        let _ = stream.flush().await;
        let _ = stream.shutdown().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_is_a_three_element_array() {
        let mut fields = BTreeMap::new();
        fields.insert("a".to_string(), Value::from(1));
        let frame = encode_message("the-app.teh.event", 1462742340, &fields).unwrap();

        let decoded: (String, i64, BTreeMap<String, Value>) =
            rmp_serde::from_slice(&frame).unwrap();
        assert_eq!(decoded.0, "the-app.teh.event");
        assert_eq!(decoded.1, 1462742340);
        assert_eq!(decoded.2.get("a").unwrap(), 1);
    }
}
