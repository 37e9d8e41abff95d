//! End-to-end: real socket, real client, upload then download, then the
//! stop sequence — asserting the full event stream.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use filestore_observability::event::{ACCESS_EVENT, STOP_EVENT};
use filestore_observability::{Clock, EventLog, EventRecord};
use filestore_server::{AppState, HttpServer, build_router};

#[tokio::test]
async fn upload_then_download_produces_two_access_entries_then_stop() {
    let dir = tempfile::tempdir().unwrap();
    let (log, records) = EventLog::memory(Clock::System, true);
    let event_log = Arc::new(log);

    let state = AppState {
        event_log: Arc::clone(&event_log),
        storage: PathBuf::from(dir.path()),
    };
    let app = build_router(state);

    let server = HttpServer::bind("127.0.0.1", 0, Duration::from_secs(1))
        .await
        .unwrap();
    let addr = server.local_addr().unwrap();
    let shutdown = CancellationToken::new();
    let handle = tokio::spawn(server.run(app, shutdown.clone()));

    let client = reqwest::Client::new();
    let put = client
        .put(format!("http://{addr}/hello.txt"))
        .body("Hello, world!")
        .send()
        .await
        .unwrap();
    assert_eq!(put.status().as_u16(), 201);
    let put_id = put
        .headers()
        .get("x-request-id")
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    assert!(!put_id.is_empty());

    let get = client
        .get(format!("http://{addr}/hello.txt"))
        .send()
        .await
        .unwrap();
    assert_eq!(get.status().as_u16(), 200);
    assert_eq!(get.text().await.unwrap(), "Hello, world!");

    shutdown.cancel();
    handle.await.unwrap().unwrap();

    // The stop record follows every access entry: it is only emitted after
    // the controller reached Stopped and the socket closed.
    event_log.emit(EventRecord::new(STOP_EVENT)).await;
    event_log.close().await;

    let records = records.records();
    assert_eq!(records.len(), 3);

    let access: Vec<_> = records.iter().filter(|r| r.event == ACCESS_EVENT).collect();
    assert_eq!(access.len(), 2);
    assert_eq!(*access[0].field("path").unwrap(), "/hello.txt");
    assert_eq!(*access[0].field("outcome").unwrap(), 201);
    assert_eq!(*access[0].field("request").unwrap(), put_id.as_str());
    assert_eq!(*access[1].field("path").unwrap(), "/hello.txt");
    assert_eq!(*access[1].field("outcome").unwrap(), 200);

    assert_eq!(records.last().unwrap().event, STOP_EVENT);
}
