//! Visualization of opaque parameters for human review.
//!
//! A request that cannot be rendered must never reach the approval gate.

use crate::chain::ChainAdapter;
use crate::error::{ErrorKind, StageError};
use serde_json::Value;

pub async fn visualize(
    adapter: &dyn ChainAdapter,
    value: &Value,
    stage: String,
) -> Result<Value, StageError> {
    match adapter.visualize(value).await {
        Ok(Value::Null) => Err(StageError::new(
            ErrorKind::Visualization,
            stage,
            "visualization produced nothing to review",
        )),
        Ok(rendered) => Ok(rendered),
        Err(e) => {
            tracing::warn!(stage = %stage, error = %e, "Visualization failed");
            Err(StageError::from_collaborator(ErrorKind::Visualization, stage, &e))
        }
    }
}
