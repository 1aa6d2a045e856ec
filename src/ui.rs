//! User-facing collaborators
//!
//! The pipeline hands prompts and receipts to a UI layer it does not
//! implement; decisions come back through `ApprovalGate::decide`.

use crate::error::CollaboratorError;
use crate::request::Request;
use async_trait::async_trait;
use serde::Serialize;
use serde_json::{Map, Value};

/// Everything the user reviews before deciding on a request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ApprovalPrompt {
    pub request: Request,
    #[serde(flatten)]
    pub display: Map<String, Value>,
}

impl ApprovalPrompt {
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.display.get(name)
    }
}

/// Best-effort record of a completed signing operation.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Receipt {
    pub request: Request,
    pub result: Value,
    #[serde(rename = "notifyTXT")]
    pub notify_text: String,
    /// Visualization shown at approval time.
    pub receipt: Value,
}

pub trait ApprovalUi: Send + Sync {
    fn present_approval(&self, prompt: &ApprovalPrompt) -> Result<(), CollaboratorError>;

    fn create_receipt(&self, receipt: &Receipt) -> Result<(), CollaboratorError>;
}

/// Fire-and-forget user notifications. Must never block.
pub trait Notifier: Send + Sync {
    fn notify_user(&self, message: &str);
}

/// External signature verification; read-only, needs no approval.
#[async_trait]
pub trait MessageVerifier: Send + Sync {
    async fn verify_message(&self, request: &Request) -> Result<Value, CollaboratorError>;
}

/// Notifier that forwards to the tracing subscriber.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify_user(&self, message: &str) {
        tracing::info!(notify = "request", message, "User notification");
    }
}
