//! Channel-backed UI, recording notifier and canned verifier

use crate::error::CollaboratorError;
use crate::request::Request;
use crate::ui::{ApprovalPrompt, ApprovalUi, MessageVerifier, Notifier, Receipt};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};
use tokio::sync::mpsc;

/// Forwards every prompt to a channel; whoever holds the receiver decides.
pub struct ChannelUi {
    prompts: mpsc::UnboundedSender<ApprovalPrompt>,
    receipts: Mutex<Vec<Receipt>>,
    fail_receipts: AtomicBool,
}

impl ChannelUi {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<ApprovalPrompt>) {
        let (prompts, receiver) = mpsc::unbounded_channel();
        let ui = Self {
            prompts,
            receipts: Mutex::new(Vec::new()),
            fail_receipts: AtomicBool::new(false),
        };
        (ui, receiver)
    }

    pub fn set_failing_receipts(&self, failing: bool) {
        self.fail_receipts.store(failing, Ordering::SeqCst);
    }

    pub fn receipts(&self) -> Vec<Receipt> {
        self.receipts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl ApprovalUi for ChannelUi {
    fn present_approval(&self, prompt: &ApprovalPrompt) -> Result<(), CollaboratorError> {
        self.prompts
            .send(prompt.clone())
            .map_err(|_| CollaboratorError::Failed("approval window closed".to_string()))
    }

    fn create_receipt(&self, receipt: &Receipt) -> Result<(), CollaboratorError> {
        if self.fail_receipts.load(Ordering::SeqCst) {
            return Err(CollaboratorError::Failed("receipt window unavailable".to_string()));
        }
        self.receipts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(receipt.clone());
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct RecordingNotifier {
    messages: Mutex<Vec<String>>,
}

impl RecordingNotifier {
    pub fn messages(&self) -> Vec<String> {
        self.messages
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl Notifier for RecordingNotifier {
    fn notify_user(&self, message: &str) {
        self.messages
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(message.to_string());
    }
}

/// Verifier that accepts (or refuses) every message.
#[derive(Debug, Clone, Copy)]
pub struct MemoryVerifier {
    pub accept: bool,
}

impl Default for MemoryVerifier {
    fn default() -> Self {
        Self { accept: true }
    }
}

#[async_trait]
impl MessageVerifier for MemoryVerifier {
    async fn verify_message(&self, request: &Request) -> Result<Value, CollaboratorError> {
        if !self.accept {
            return Err(CollaboratorError::Failed("signature mismatch".to_string()));
        }
        Ok(json!({ "verified": true, "payload": request.params() }))
    }
}
