//! Live ingest progress over server-sent events.

pub mod client;
pub mod event;
pub mod sse;
pub mod transport;

pub use client::{BackoffPolicy, ConnectionState, LiveProgressClient, SubscriptionId};
pub use event::{EventDecodeError, ProgressEvent, ProgressUpdate};
pub use sse::{SseDecoder, SseError, SseMessage};
pub use transport::{HttpTransport, MessageStream, ProgressTransport, StatusSource, TransportError};
