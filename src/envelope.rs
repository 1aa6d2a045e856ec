//! Result envelope
//!
//! The only shape that ever crosses the trust boundary back to a requester:
//! `{ id, result }` on success, `{ id, result: { isError, method, error } }` on failure.

use crate::error::StageError;
use crate::request::RequestId;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailureBody {
    #[serde(rename = "isError")]
    pub is_error: bool,
    pub method: String,
    pub error: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EnvelopeResult {
    Failure(FailureBody),
    Success(Value),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultEnvelope {
    pub id: RequestId,
    pub result: EnvelopeResult,
}

impl ResultEnvelope {
    pub fn success(id: RequestId, result: Value) -> Self {
        Self {
            id,
            result: EnvelopeResult::Success(result),
        }
    }

    pub fn failure(id: RequestId, error: &StageError) -> Self {
        Self {
            id,
            result: EnvelopeResult::Failure(FailureBody {
                is_error: true,
                method: error.stage.clone(),
                error: error.cause.clone(),
            }),
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self.result, EnvelopeResult::Failure(_))
    }

    /// Stage tag of a failure envelope.
    pub fn method(&self) -> Option<&str> {
        match &self.result {
            EnvelopeResult::Failure(body) => Some(body.method.as_str()),
            EnvelopeResult::Success(_) => None,
        }
    }

    pub fn success_value(&self) -> Option<&Value> {
        match &self.result {
            EnvelopeResult::Success(value) => Some(value),
            EnvelopeResult::Failure(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use serde_json::json;

    #[test]
    fn failure_serializes_with_is_error_flag() {
        let err = StageError::new(ErrorKind::Rejected, "transfer.reject", json!({"reason": "no"}));
        let envelope = ResultEnvelope::failure(RequestId::from("req-1"), &err);

        let value = serde_json::to_value(&envelope).unwrap();
        assert_eq!(
            value,
            json!({
                "id": "req-1",
                "result": {"isError": true, "method": "transfer.reject", "error": {"reason": "no"}}
            })
        );
        assert!(envelope.is_error());
        assert_eq!(envelope.method(), Some("transfer.reject"));
    }

    #[test]
    fn success_carries_payload_verbatim() {
        let envelope = ResultEnvelope::success(RequestId::from("req-2"), json!({"name": "alice"}));
        let value = serde_json::to_value(&envelope).unwrap();
        assert_eq!(value, json!({"id": "req-2", "result": {"name": "alice"}}));

        let parsed: ResultEnvelope = serde_json::from_value(value).unwrap();
        assert!(!parsed.is_error());
    }
}
