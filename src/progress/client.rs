use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::StreamExt;
use serde::Serialize;
use tokio::sync::watch;
use tokio::task::{JoinHandle, JoinSet};
use uuid::Uuid;

use super::event::{ProgressEvent, ProgressUpdate};
use super::sse::SseMessage;
use super::transport::{HttpTransport, ProgressTransport, StatusSource};
use crate::backend::{BackendClient, JobStatus};
use crate::config::ProgressConfig;

pub type SubscriptionId = Uuid;

type Callback = Arc<dyn Fn(&ProgressEvent) + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Open,
    ErrorBackoff,
}

/// Reconnect schedule: `base_delay * 2^attempt`, capped at `max_delay`,
/// at most `max_retries` reconnects between successful opens.
#[derive(Debug, Clone)]
pub struct BackoffPolicy {
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub max_retries: u32,
}

impl BackoffPolicy {
    pub fn from_config(config: &ProgressConfig) -> Self {
        Self {
            base_delay: config.base_delay(),
            max_delay: config.max_delay(),
            max_retries: config.max_retries,
        }
    }

    pub fn delay(&self, attempt: u32) -> Duration {
        self.base_delay
            .saturating_mul(2u32.saturating_pow(attempt))
            .min(self.max_delay)
    }
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self::from_config(&crate::config::AppConfig::development().progress)
    }
}

/// State shared between the client handle and its connection task
struct Shared {
    state: watch::Sender<ConnectionState>,
    latest: watch::Sender<Option<ProgressUpdate>>,
    status: watch::Sender<Option<JobStatus>>,
    subscribers: Mutex<Vec<(SubscriptionId, Callback)>>,
    watermark: Mutex<Option<DateTime<Utc>>>,
    /// Job whose completion last triggered a status refresh. Replays repeat
    /// the most recent completion, so one id is enough to dedupe them.
    refreshed: Mutex<Option<String>>,
}

struct Running {
    stop: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

/// Best-effort live view of the ingest job over a server-push channel.
///
/// One client owns at most one channel. `start` opens it, `stop` closes it
/// and cancels any pending reconnect; dropping the client aborts the
/// connection task.
pub struct LiveProgressClient {
    transport: Arc<dyn ProgressTransport>,
    status_source: Arc<dyn StatusSource>,
    policy: BackoffPolicy,
    shared: Arc<Shared>,
    task: Mutex<Option<Running>>,
}

impl LiveProgressClient {
    pub fn new(
        transport: Arc<dyn ProgressTransport>,
        status_source: Arc<dyn StatusSource>,
        policy: BackoffPolicy,
    ) -> Self {
        Self {
            transport,
            status_source,
            policy,
            shared: Arc::new(Shared {
                state: watch::Sender::new(ConnectionState::Disconnected),
                latest: watch::Sender::new(None),
                status: watch::Sender::new(None),
                subscribers: Mutex::new(Vec::new()),
                watermark: Mutex::new(None),
                refreshed: Mutex::new(None),
            }),
            task: Mutex::new(None),
        }
    }

    /// Client wired to the backend's SSE and status endpoints
    pub fn for_backend(backend: BackendClient, config: &ProgressConfig) -> Self {
        Self::new(
            Arc::new(HttpTransport::new(backend.clone())),
            Arc::new(backend),
            BackoffPolicy::from_config(config),
        )
    }

    /// Open the channel. No-op while a connection task is already running.
    pub fn start(&self) {
        let mut task = lock(&self.task);
        if let Some(running) = task.as_ref() {
            if !running.handle.is_finished() {
                return;
            }
        }

        let (stop_tx, stop_rx) = watch::channel(false);
        self.shared.state.send_replace(ConnectionState::Connecting);

        let handle = tokio::spawn(run(
            self.transport.clone(),
            self.status_source.clone(),
            self.policy.clone(),
            self.shared.clone(),
            stop_rx,
        ));
        *task = Some(Running {
            stop: stop_tx,
            handle,
        });
    }

    /// Close the channel and cancel any scheduled reconnect
    pub async fn stop(&self) {
        let running = lock(&self.task).take();
        if let Some(Running { stop, handle }) = running {
            let _ = stop.send(true);
            if let Err(e) = handle.await {
                if e.is_panic() {
                    tracing::error!("progress connection task panicked: {}", e);
                }
            }
        }
        self.shared.state.send_replace(ConnectionState::Disconnected);
    }

    /// Manual restart, typically after the client gave up. Resets the retry
    /// counter.
    pub async fn retry(&self) {
        self.stop().await;
        self.start();
    }

    pub fn subscribe<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&ProgressEvent) + Send + Sync + 'static,
    {
        let id = Uuid::new_v4();
        lock(&self.shared.subscribers).push((id, Arc::new(callback)));
        id
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut subscribers = lock(&self.shared.subscribers);
        let before = subscribers.len();
        subscribers.retain(|(sid, _)| *sid != id);
        subscribers.len() != before
    }

    /// Seed the resume watermark, e.g. from a previous session
    pub fn resume_from(&self, since: DateTime<Utc>) {
        *lock(&self.shared.watermark) = Some(since);
    }

    pub fn watermark(&self) -> Option<DateTime<Utc>> {
        *lock(&self.shared.watermark)
    }

    pub fn state(&self) -> ConnectionState {
        *self.shared.state.borrow()
    }

    pub fn is_connected(&self) -> bool {
        self.state() == ConnectionState::Open
    }

    pub fn latest_progress(&self) -> Option<ProgressUpdate> {
        self.shared.latest.borrow().clone()
    }

    pub fn job_status(&self) -> Option<JobStatus> {
        self.shared.status.borrow().clone()
    }

    pub fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.shared.state.subscribe()
    }

    pub fn watch_latest(&self) -> watch::Receiver<Option<ProgressUpdate>> {
        self.shared.latest.subscribe()
    }

    pub fn watch_status(&self) -> watch::Receiver<Option<JobStatus>> {
        self.shared.status.subscribe()
    }
}

impl Drop for LiveProgressClient {
    fn drop(&mut self) {
        if let Some(running) = lock(&self.task).take() {
            running.handle.abort();
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

async fn stopped(stop: &mut watch::Receiver<bool>) {
    loop {
        let requested = *stop.borrow_and_update();
        if requested || stop.changed().await.is_err() {
            return;
        }
    }
}

/// Connection task. Channels are strictly sequential: a new connect only
/// starts after the previous stream has been dropped.
async fn run(
    transport: Arc<dyn ProgressTransport>,
    status_source: Arc<dyn StatusSource>,
    policy: BackoffPolicy,
    shared: Arc<Shared>,
    mut stop: watch::Receiver<bool>,
) {
    let mut attempt: u32 = 0;
    let mut refreshes: JoinSet<()> = JoinSet::new();

    loop {
        shared.state.send_replace(ConnectionState::Connecting);
        let since = *lock(&shared.watermark);

        let connected = tokio::select! {
            _ = stopped(&mut stop) => break,
            result = transport.connect(since) => result,
        };

        match connected {
            Ok(mut stream) => {
                tracing::info!(since = ?since, "progress channel open");
                shared.state.send_replace(ConnectionState::Open);
                attempt = 0;

                let failure = loop {
                    tokio::select! {
                        _ = stopped(&mut stop) => break None,
                        item = stream.next() => match item {
                            Some(Ok(message)) => handle_message(&shared, &status_source, &message, &mut refreshes),
                            Some(Err(e)) => break Some(e.to_string()),
                            None => break Some("closed by server".to_string()),
                        },
                        Some(joined) = refreshes.join_next(), if !refreshes.is_empty() => {
                            if let Err(e) = joined {
                                tracing::warn!("status refresh task failed: {}", e);
                            }
                        }
                    }
                };
                drop(stream);

                match failure {
                    None => break,
                    Some(reason) => tracing::warn!("progress channel lost: {}", reason),
                }
            }
            Err(e) => tracing::warn!("progress channel connect failed: {}", e),
        }

        if attempt >= policy.max_retries {
            tracing::error!(
                "progress channel unavailable after {} reconnect attempts, giving up",
                attempt
            );
            break;
        }

        let delay = policy.delay(attempt);
        attempt += 1;
        shared.state.send_replace(ConnectionState::ErrorBackoff);
        tracing::debug!(attempt, ?delay, "scheduling progress reconnect");

        tokio::select! {
            _ = stopped(&mut stop) => break,
            _ = tokio::time::sleep(delay) => {}
        }
    }

    refreshes.abort_all();
    shared.state.send_replace(ConnectionState::Disconnected);
}

fn handle_message(
    shared: &Arc<Shared>,
    status_source: &Arc<dyn StatusSource>,
    message: &SseMessage,
    refreshes: &mut JoinSet<()>,
) {
    let event = match ProgressEvent::decode(&message.data) {
        Ok(event) => event,
        Err(e) => {
            tracing::warn!("dropping progress message: {}", e);
            return;
        }
    };

    if let Some(update) = event.update() {
        shared.latest.send_replace(Some(update.clone()));
    }

    // Replays after a reconnect may carry older timestamps
    if let Some(ts) = event.timestamp() {
        let mut watermark = lock(&shared.watermark);
        if watermark.map_or(true, |current| ts > current) {
            *watermark = Some(ts);
        }
    }

    let subscribers: Vec<Callback> = lock(&shared.subscribers)
        .iter()
        .map(|(_, callback)| callback.clone())
        .collect();
    for callback in subscribers {
        callback(&event);
    }

    if event.is_complete() {
        let job = event
            .update()
            .and_then(|u| u.job_id.clone())
            .unwrap_or_default();
        let first = {
            let mut last = lock(&shared.refreshed);
            if last.as_deref() == Some(job.as_str()) {
                false
            } else {
                *last = Some(job.clone());
                true
            }
        };
        if first {
            let shared = shared.clone();
            let source = status_source.clone();
            refreshes.spawn(async move {
                match source.fetch_status().await {
                    Ok(status) => {
                        shared.status.send_replace(Some(status));
                    }
                    Err(e) => {
                        tracing::warn!("status refresh after completion failed: {}", e);
                        let mut last = lock(&shared.refreshed);
                        if last.as_deref() == Some(job.as_str()) {
                            *last = None;
                        }
                    }
                }
            });
        }
    }
}
