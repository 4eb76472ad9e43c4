use serde_json::{json, Value};

use crate::cli::OutputFormat;
use crate::progress::ProgressEvent;

/// Output a success message in the appropriate format
pub fn output_success(output_format: &OutputFormat, message: &str, data: Option<Value>) -> anyhow::Result<()> {
    match output_format {
        OutputFormat::Json => {
            let mut response = json!({
                "success": true,
                "message": message
            });

            if let Some(data_value) = data {
                response["data"] = data_value;
            }

            println!("{}", serde_json::to_string_pretty(&response)?);
        }
        OutputFormat::Text => {
            println!("✓ {}", message);
            if let Some(data_value) = data.filter(|d| !d.is_null()) {
                println!("{}", serde_json::to_string_pretty(&data_value)?);
            }
        }
    }
    Ok(())
}

/// Output an error message in the appropriate format
pub fn output_error(output_format: &OutputFormat, message: &str, error_code: Option<&str>) -> anyhow::Result<()> {
    match output_format {
        OutputFormat::Json => {
            let mut response = json!({
                "success": false,
                "error": message
            });

            if let Some(code) = error_code {
                response["error_code"] = json!(code);
            }

            println!("{}", serde_json::to_string_pretty(&response)?);
        }
        OutputFormat::Text => {
            eprintln!("Error: {}", message);
        }
    }
    Ok(())
}

/// One line per progress event; JSON mode prints the event as received
pub fn output_event(output_format: &OutputFormat, event: &ProgressEvent) -> anyhow::Result<()> {
    match output_format {
        OutputFormat::Json => println!("{}", serde_json::to_string(event)?),
        OutputFormat::Text => println!("{}", describe_event(event)),
    }
    Ok(())
}

pub fn describe_event(event: &ProgressEvent) -> String {
    let Some(update) = event.update() else {
        return event.event_type().to_string();
    };

    let mut line = event.event_type().to_string();
    if let Some(stage) = &update.stage {
        line.push_str(&format!(" [{}]", stage));
    }
    if let (Some(processed), Some(total)) = (update.processed_items, update.total_items) {
        line.push_str(&format!(" {}/{}", processed, total));
    }
    if let Some(percent) = update.progress_percent {
        line.push_str(&format!(" {:.0}%", percent));
    }
    if let Some(queued) = update.queued_items {
        line.push_str(&format!(" queued={}", queued));
    }
    if let Some(error) = &update.error {
        line.push_str(&format!(" error: {}", error));
    }
    line
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn describes_progress_compactly() {
        let event = ProgressEvent::decode(
            r#"{"event_type":"orchestrator_progress","stage":"thumbnails","processed_items":10,"total_items":50,"progress_percent":20}"#,
        )
        .unwrap();
        assert_eq!(describe_event(&event), "orchestrator_progress [thumbnails] 10/50 20%");

        let heartbeat = ProgressEvent::decode(r#"{"event_type":"heartbeat"}"#).unwrap();
        assert_eq!(describe_event(&heartbeat), "heartbeat");
    }
}
