use redaction_core::transform::InvocationLog;
use serde_json::{json, Value};

/// Writes one JSON object per event to stderr, where the Lambda runtime
/// forwards it to CloudWatch Logs.
#[derive(Debug, Clone, Copy)]
pub struct JsonLineLog {
    component: &'static str,
}

impl JsonLineLog {
    pub fn new(component: &'static str) -> Self {
        Self { component }
    }
}

impl InvocationLog for JsonLineLog {
    fn info(&self, event: &str, details: Value) {
        eprintln!(
            "{}",
            log_line(self.component, "info", event, &now_rfc3339(), details)
        );
    }

    fn error(&self, event: &str, details: Value) {
        eprintln!(
            "{}",
            log_line(self.component, "error", event, &now_rfc3339(), details)
        );
    }
}

fn now_rfc3339() -> String {
    chrono::Utc::now().to_rfc3339()
}

pub fn log_line(
    component: &str,
    level: &str,
    event: &str,
    timestamp: &str,
    details: Value,
) -> Value {
    json!({
        "component": component,
        "level": level,
        "event": event,
        "timestamp": timestamp,
        "details": details,
    })
}
