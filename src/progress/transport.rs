use std::collections::VecDeque;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::stream::{BoxStream, StreamExt};
use thiserror::Error;

use super::sse::{SseDecoder, SseMessage};
use crate::backend::{BackendClient, BackendError, JobStatus};

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("connect failed: {0}")]
    Connect(String),

    #[error("stream failed: {0}")]
    Stream(String),
}

impl From<BackendError> for TransportError {
    fn from(err: BackendError) -> Self {
        TransportError::Connect(err.to_string())
    }
}

/// A live push channel. Dropping it closes the underlying connection.
pub type MessageStream = BoxStream<'static, Result<SseMessage, TransportError>>;

/// Opens push channels for the progress client
#[async_trait]
pub trait ProgressTransport: Send + Sync {
    /// Open a channel, asking for replay of everything after `since`
    async fn connect(&self, since: Option<DateTime<Utc>>) -> Result<MessageStream, TransportError>;
}

/// Pull-based status endpoint, refreshed when a job completes
#[async_trait]
pub trait StatusSource: Send + Sync {
    async fn fetch_status(&self) -> Result<JobStatus, BackendError>;
}

#[async_trait]
impl StatusSource for BackendClient {
    async fn fetch_status(&self) -> Result<JobStatus, BackendError> {
        self.ingest_status().await
    }
}

/// SSE over HTTP against the backend's ingest event endpoint
#[derive(Debug, Clone)]
pub struct HttpTransport {
    backend: BackendClient,
}

impl HttpTransport {
    pub fn new(backend: BackendClient) -> Self {
        Self { backend }
    }
}

#[async_trait]
impl ProgressTransport for HttpTransport {
    async fn connect(&self, since: Option<DateTime<Utc>>) -> Result<MessageStream, TransportError> {
        let resp = self.backend.open_event_stream(since).await?;
        let body = resp.bytes_stream().boxed();

        let messages = futures::stream::unfold(
            (body, SseDecoder::new(), VecDeque::new()),
            |(mut body, mut decoder, mut pending)| async move {
                loop {
                    if let Some(message) = pending.pop_front() {
                        return Some((Ok(message), (body, decoder, pending)));
                    }
                    match body.next().await {
                        Some(Ok(chunk)) => match decoder.feed(&chunk) {
                            Ok(messages) => pending.extend(messages),
                            Err(e) => {
                                return Some((Err(TransportError::Stream(e.to_string())), (body, decoder, pending)))
                            }
                        },
                        Some(Err(e)) => {
                            return Some((Err(TransportError::Stream(e.to_string())), (body, decoder, pending)))
                        }
                        None => return None,
                    }
                }
            },
        );

        Ok(messages.boxed())
    }
}
