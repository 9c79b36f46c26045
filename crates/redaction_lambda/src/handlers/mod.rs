use serde_json::Value;

pub mod http;
pub mod object_created;
pub mod object_lambda;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    ObjectLambda,
    ObjectCreated,
    Http,
}

pub fn classify_event(event: &Value) -> EventKind {
    if event.get("getObjectContext").is_some() {
        return EventKind::ObjectLambda;
    }

    if is_s3_notification(event) {
        return EventKind::ObjectCreated;
    }

    EventKind::Http
}

fn is_s3_notification(event: &Value) -> bool {
    event
        .get("Records")
        .and_then(Value::as_array)
        .map(|records| {
            !records.is_empty()
                && records.iter().all(|record| {
                    record
                        .get("eventSource")
                        .and_then(Value::as_str)
                        .map(|source| source == "aws:s3")
                        .unwrap_or(false)
                })
        })
        .unwrap_or(false)
}
