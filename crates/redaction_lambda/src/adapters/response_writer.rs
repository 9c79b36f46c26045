use redaction_core::contract::{ContinuationToken, TransformResult};

/// Where an object-lambda invocation must deliver its single response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteBackTarget {
    pub route: String,
    pub token: ContinuationToken,
}

pub trait ResponseWriter {
    fn write_response(&self, target: WriteBackTarget, result: &TransformResult)
        -> Result<(), String>;
}
