use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Events pushed by the backend over the ingest event stream
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event_type", rename_all = "snake_case")]
pub enum ProgressEvent {
    Connected {
        #[serde(default, deserialize_with = "lenient_timestamp")]
        timestamp: Option<DateTime<Utc>>,
    },
    Heartbeat {
        #[serde(default, deserialize_with = "lenient_timestamp")]
        timestamp: Option<DateTime<Utc>>,
    },
    OrchestratorStarted(ProgressUpdate),
    OrchestratorProgress(ProgressUpdate),
    OrchestratorComplete(ProgressUpdate),
    OrchestratorError(ProgressUpdate),
}

/// Job state carried by orchestrator events. Every field is optional; the
/// backend only sends what changed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProgressUpdate {
    #[serde(default)]
    pub job_id: Option<String>,
    #[serde(default)]
    pub stage: Option<String>,
    #[serde(default)]
    pub total_items: Option<u64>,
    #[serde(default)]
    pub processed_items: Option<u64>,
    #[serde(default)]
    pub queued_items: Option<u64>,
    #[serde(default)]
    pub progress_percent: Option<f64>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub timestamp: Option<DateTime<Utc>>,
}

/// Timestamps only move the resume watermark, so a bad one must never cost
/// the event. Offset-less values are taken as UTC; anything else becomes
/// `None`.
fn lenient_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<Value>::deserialize(deserializer)?;
    Ok(match raw {
        Some(Value::String(s)) => parse_timestamp(&s),
        _ => None,
    })
}

pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
        .map(|naive| Utc.from_utc_datetime(&naive))
}

#[derive(Debug, Error)]
pub enum EventDecodeError {
    #[error("invalid event payload: {0}")]
    InvalidPayload(#[from] serde_json::Error),

    #[error("processed_items ({processed}) exceeds total_items ({total})")]
    CountMismatch { processed: u64, total: u64 },

    #[error("progress_percent out of range: {0}")]
    PercentOutOfRange(f64),
}

impl ProgressEvent {
    /// Decode one event payload. Unknown `event_type` values, malformed JSON
    /// and inconsistent counts are rejected.
    pub fn decode(payload: &str) -> Result<Self, EventDecodeError> {
        let event: ProgressEvent = serde_json::from_str(payload)?;
        if let Some(update) = event.update() {
            update.validate()?;
        }
        Ok(event)
    }

    pub fn update(&self) -> Option<&ProgressUpdate> {
        match self {
            ProgressEvent::OrchestratorStarted(u)
            | ProgressEvent::OrchestratorProgress(u)
            | ProgressEvent::OrchestratorComplete(u)
            | ProgressEvent::OrchestratorError(u) => Some(u),
            ProgressEvent::Connected { .. } | ProgressEvent::Heartbeat { .. } => None,
        }
    }

    pub fn timestamp(&self) -> Option<DateTime<Utc>> {
        match self {
            ProgressEvent::Connected { timestamp } | ProgressEvent::Heartbeat { timestamp } => *timestamp,
            _ => self.update().and_then(|u| u.timestamp),
        }
    }

    pub fn is_complete(&self) -> bool {
        matches!(self, ProgressEvent::OrchestratorComplete(_))
    }

    pub fn event_type(&self) -> &'static str {
        match self {
            ProgressEvent::Connected { .. } => "connected",
            ProgressEvent::Heartbeat { .. } => "heartbeat",
            ProgressEvent::OrchestratorStarted(_) => "orchestrator_started",
            ProgressEvent::OrchestratorProgress(_) => "orchestrator_progress",
            ProgressEvent::OrchestratorComplete(_) => "orchestrator_complete",
            ProgressEvent::OrchestratorError(_) => "orchestrator_error",
        }
    }
}

impl ProgressUpdate {
    fn validate(&self) -> Result<(), EventDecodeError> {
        if let (Some(processed), Some(total)) = (self.processed_items, self.total_items) {
            if processed > total {
                return Err(EventDecodeError::CountMismatch { processed, total });
            }
        }
        if let Some(percent) = self.progress_percent {
            if !(0.0..=100.0).contains(&percent) {
                return Err(EventDecodeError::PercentOutOfRange(percent));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_progress() {
        let event = ProgressEvent::decode(
            r#"{"event_type":"orchestrator_progress","processed_items":10,"total_items":50,"progress_percent":20,"timestamp":"2025-03-01T12:00:00Z"}"#,
        )
        .unwrap();

        let update = event.update().unwrap();
        assert_eq!(update.processed_items, Some(10));
        assert_eq!(update.progress_percent, Some(20.0));
        assert_eq!(event.timestamp().unwrap().to_rfc3339(), "2025-03-01T12:00:00+00:00");
        assert_eq!(event.event_type(), "orchestrator_progress");
    }

    #[test]
    fn decodes_bare_complete() {
        let event = ProgressEvent::decode(r#"{"event_type":"orchestrator_complete"}"#).unwrap();
        assert!(event.is_complete());
        assert_eq!(event.update(), Some(&ProgressUpdate::default()));
    }

    #[test]
    fn offset_less_timestamp_is_utc() {
        let event = ProgressEvent::decode(
            r#"{"event_type":"orchestrator_progress","processed_items":10,"total_items":50,"progress_percent":20,"timestamp":"2025-03-01T12:00:00.123456"}"#,
        )
        .unwrap();

        assert_eq!(event.update().unwrap().progress_percent, Some(20.0));
        let expected: DateTime<Utc> = "2025-03-01T12:00:00.123456Z".parse().unwrap();
        assert_eq!(event.timestamp(), Some(expected));
    }

    #[test]
    fn unreadable_timestamp_keeps_event() {
        let event =
            ProgressEvent::decode(r#"{"event_type":"orchestrator_progress","progress_percent":40,"timestamp":"yesterday"}"#)
                .unwrap();
        assert_eq!(event.update().unwrap().progress_percent, Some(40.0));
        assert_eq!(event.timestamp(), None);

        let heartbeat = ProgressEvent::decode(r#"{"event_type":"heartbeat","timestamp":1740830400}"#).unwrap();
        assert_eq!(heartbeat, ProgressEvent::Heartbeat { timestamp: None });
    }

    #[test]
    fn parses_space_separated_and_offset_timestamps() {
        let expected: DateTime<Utc> = "2025-03-01T10:00:00Z".parse().unwrap();
        assert_eq!(parse_timestamp("2025-03-01 10:00:00"), Some(expected));
        assert_eq!(parse_timestamp("2025-03-01T12:00:00+02:00"), Some(expected));
    }

    #[test]
    fn heartbeat_ignores_extra_fields() {
        let event = ProgressEvent::decode(r#"{"event_type":"heartbeat","server":"a"}"#).unwrap();
        assert_eq!(event, ProgressEvent::Heartbeat { timestamp: None });
    }

    #[test]
    fn rejects_unknown_and_malformed() {
        assert!(ProgressEvent::decode(r#"{"event_type":"mystery"}"#).is_err());
        assert!(ProgressEvent::decode(r#"{"processed_items":1}"#).is_err());
        assert!(ProgressEvent::decode("{not json").is_err());
    }

    #[test]
    fn rejects_inconsistent_counts() {
        let err = ProgressEvent::decode(
            r#"{"event_type":"orchestrator_progress","processed_items":51,"total_items":50}"#,
        )
        .unwrap_err();
        assert!(matches!(err, EventDecodeError::CountMismatch { processed: 51, total: 50 }));

        assert!(matches!(
            ProgressEvent::decode(r#"{"event_type":"orchestrator_progress","progress_percent":140}"#),
            Err(EventDecodeError::PercentOutOfRange(_))
        ));
    }
}
