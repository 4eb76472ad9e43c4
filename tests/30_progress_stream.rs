mod common;

use std::sync::{Arc, Mutex};

use anyhow::Result;
use chrono::{DateTime, Utc};

use tagline_web::backend::{BackendClient, JobState};
use tagline_web::progress::{ConnectionState, LiveProgressClient};

use common::{eventually, test_config, MockBackend};

const EVENTS: &str = concat!(
    ": keep-alive\n\n",
    "data: {\"event_type\":\"connected\",\"timestamp\":\"2025-03-01T12:00:00Z\"}\n\n",
    "data: {\"event_type\":\"orchestrator_started\",\"job_id\":\"job-1\",\"total_items\":50,\"timestamp\":\"2025-03-01T12:00:01Z\"}\n\n",
    "data: {\"event_type\":\"orchestrator_progress\",\"job_id\":\"job-1\",\"stage\":\"thumbnails\",\r\n",
    "data: \"processed_items\":25,\"total_items\":50,\"progress_percent\":50,\"timestamp\":\"2025-03-01T12:02:00Z\"}\r\n\r\n",
    "data: {\"event_type\":\"orchestrator_complete\",\"job_id\":\"job-1\",\"processed_items\":50,\"total_items\":50,\"progress_percent\":100,\"timestamp\":\"2025-03-01T12:05:00Z\"}\n\n",
    "data: not json\n\n",
);

async fn client_for(backend: &MockBackend) -> Result<LiveProgressClient> {
    let config = test_config(&backend.base_url);
    let http = BackendClient::new(&config.backend)?.with_token("stream-token");
    Ok(LiveProgressClient::for_backend(http, &config.progress))
}

#[tokio::test]
async fn streams_progress_and_refreshes_status_once() -> Result<()> {
    let backend = MockBackend::spawn().await?;
    backend.log.set_events(EVENTS);
    let client = client_for(&backend).await?;

    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    client.subscribe(move |event| sink.lock().unwrap().push(event.event_type().to_string()));

    client.start();

    // Every connection replays the same completion; only the first one refreshes
    let log = backend.log.clone();
    eventually(|| log.event_requests().len() >= 3).await;
    eventually(|| client.job_status().is_some()).await;
    client.stop().await;

    assert_eq!(backend.log.status_calls(), 1);
    assert_eq!(client.job_status().map(|s| s.status), Some(JobState::Completed));

    let latest = client.latest_progress().expect("latest progress");
    assert_eq!(latest.progress_percent, Some(100.0));

    let seen = seen.lock().unwrap().clone();
    assert_eq!(
        &seen[..4],
        &["connected", "orchestrator_started", "orchestrator_progress", "orchestrator_complete"]
    );
    assert!(!seen.iter().any(|e| e == "heartbeat"));
    assert_eq!(client.state(), ConnectionState::Disconnected);
    Ok(())
}

#[tokio::test]
async fn reconnect_resumes_from_last_event() -> Result<()> {
    let backend = MockBackend::spawn().await?;
    backend.log.set_events(EVENTS);
    let client = client_for(&backend).await?;

    client.start();
    let log = backend.log.clone();
    eventually(|| log.event_requests().len() >= 2).await;
    client.stop().await;

    let requests = backend.log.event_requests();
    assert_eq!(requests[0], None);

    let since: DateTime<Utc> = requests[1]
        .as_deref()
        .expect("since on reconnect")
        .parse()?;
    assert_eq!(since, "2025-03-01T12:05:00Z".parse::<DateTime<Utc>>()?);
    assert_eq!(client.watermark(), Some(since));
    Ok(())
}

#[tokio::test]
async fn gives_up_when_backend_is_unreachable() -> Result<()> {
    // Bind then drop to get a port nobody listens on
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    drop(listener);

    let config = test_config(&format!("http://{}", addr));
    let client = LiveProgressClient::for_backend(BackendClient::new(&config.backend)?, &config.progress);

    let mut state = client.watch_state();
    client.start();

    tokio::time::timeout(std::time::Duration::from_secs(5), async {
        loop {
            if state.changed().await.is_err() || *state.borrow_and_update() == ConnectionState::Disconnected {
                break;
            }
        }
    })
    .await?;

    assert!(!client.is_connected());
    assert!(client.latest_progress().is_none());
    Ok(())
}
