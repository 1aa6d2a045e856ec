//! Approval gate
//!
//! Tracks one pending approval per request id and suspends the owning
//! pipeline until the UI reports a decision for that id.
//!
//! Per id: `created -> presented -> {approved | rejected}`. Terminal
//! transitions remove the record, so a second decision for the same id finds
//! nothing and is dropped. Decisions are routed only to the matching id.

use crate::error::CollaboratorError;
use crate::request::RequestId;
use crate::ui::{ApprovalPrompt, ApprovalUi};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

/// Decision reported by the UI layer.
#[derive(Debug, Clone, PartialEq)]
pub enum Decision {
    Approve(Value),
    Reject(Value),
}

impl Decision {
    pub fn approve(payload: Value) -> Self {
        Decision::Approve(payload)
    }

    pub fn reject(reason: Value) -> Self {
        Decision::Reject(reason)
    }
}

/// Proof that the user approved a request.
///
/// Only the gate constructs this; key material is only ever requested by
/// code holding one.
#[derive(Debug)]
pub struct Approval {
    payload: Value,
}

impl Approval {
    pub fn payload(&self) -> &Value {
        &self.payload
    }

    /// Whether the user asked for a receipt of the completed operation.
    pub fn wants_receipt(&self) -> bool {
        let flag = |v: &Value| v.get("receipt").map(is_truthy).unwrap_or(false);
        flag(&self.payload) || self.payload.get("result").map(flag).unwrap_or(false)
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(true),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Rejection {
    /// The user declined; carries the UI's rejection payload.
    Rejected(Value),
    /// No decision arrived before the configured timeout.
    Expired,
}

/// What happened to a reported decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecisionOutcome {
    Delivered,
    /// No pending approval for this id (stale, duplicate or never registered).
    UnknownId,
    /// The request has not been presented yet.
    NotPresented,
    /// The waiting pipeline is gone.
    Abandoned,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApprovalState {
    Created,
    Presented,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum GateError {
    #[error("request {0} already has a pending approval")]
    DuplicateId(RequestId),

    #[error("request {0} is not pending approval")]
    NotPending(RequestId),

    #[error("request {0} was already presented")]
    AlreadyPresented(RequestId),

    #[error("approval UI failed: {0}")]
    Ui(CollaboratorError),
}

struct PendingApproval {
    state: ApprovalState,
    serial: u64,
    decision: oneshot::Sender<Decision>,
}

pub struct ApprovalGate {
    pending: Mutex<HashMap<RequestId, PendingApproval>>,
    timeout: Option<Duration>,
    serial: AtomicU64,
}

impl ApprovalGate {
    /// Create a gate. `None` waits for a decision indefinitely.
    pub fn new(timeout: Option<Duration>) -> Self {
        Self {
            pending: Mutex::new(HashMap::new()),
            timeout,
            serial: AtomicU64::new(0),
        }
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Register a pending approval for `id`.
    pub fn register(self: &Arc<Self>, id: RequestId) -> Result<ApprovalTicket, GateError> {
        let mut pending = self.lock();
        if pending.contains_key(&id) {
            warn!(request_id = %id, "Refusing duplicate approval registration");
            return Err(GateError::DuplicateId(id));
        }

        let serial = self.serial.fetch_add(1, Ordering::Relaxed);
        let (sender, receiver) = oneshot::channel();
        pending.insert(
            id.clone(),
            PendingApproval {
                state: ApprovalState::Created,
                serial,
                decision: sender,
            },
        );
        debug!(request_id = %id, "Approval registered");

        Ok(ApprovalTicket {
            gate: Arc::clone(self),
            id,
            serial,
            receiver: Some(receiver),
        })
    }

    /// Hand the prompt to the UI and mark the request presented.
    pub fn present(
        &self,
        ticket: &ApprovalTicket,
        ui: &dyn ApprovalUi,
        prompt: &ApprovalPrompt,
    ) -> Result<(), GateError> {
        {
            let mut pending = self.lock();
            let record = pending
                .get_mut(&ticket.id)
                .filter(|record| record.serial == ticket.serial)
                .ok_or_else(|| GateError::NotPending(ticket.id.clone()))?;
            if record.state != ApprovalState::Created {
                return Err(GateError::AlreadyPresented(ticket.id.clone()));
            }
            record.state = ApprovalState::Presented;
        }

        // The lock is released: the UI may report a decision synchronously.
        ui.present_approval(prompt).map_err(GateError::Ui)?;
        info!(request_id = %ticket.id, "Approval presented to user");
        Ok(())
    }

    /// Route a UI decision to the pipeline waiting on `id`.
    pub fn decide(&self, id: &RequestId, decision: Decision) -> DecisionOutcome {
        let record = {
            let mut pending = self.lock();
            match pending.get(id).map(|record| record.state) {
                None => {
                    warn!(request_id = %id, "Dropping decision for unknown request id");
                    return DecisionOutcome::UnknownId;
                }
                Some(ApprovalState::Created) => {
                    warn!(request_id = %id, "Dropping decision for request not yet presented");
                    return DecisionOutcome::NotPresented;
                }
                Some(ApprovalState::Presented) => pending.remove(id),
            }
        };

        let Some(record) = record else {
            return DecisionOutcome::UnknownId;
        };
        let approved = matches!(decision, Decision::Approve(_));
        match record.decision.send(decision) {
            Ok(()) => {
                info!(request_id = %id, approved, "Approval decision delivered");
                DecisionOutcome::Delivered
            }
            Err(_) => {
                warn!(request_id = %id, "Decision arrived after the pipeline went away");
                DecisionOutcome::Abandoned
            }
        }
    }

    /// Cancel a pending approval. Equivalent to a rejection.
    pub fn cancel(&self, id: &RequestId) -> bool {
        let record = self.lock().remove(id);
        match record {
            Some(record) => {
                info!(request_id = %id, "Pending approval cancelled");
                let _ = record.decision.send(Decision::Reject(json!("cancelled")));
                true
            }
            None => false,
        }
    }

    pub fn state(&self, id: &RequestId) -> Option<ApprovalState> {
        self.lock().get(id).map(|record| record.state)
    }

    pub fn pending_count(&self) -> usize {
        self.lock().len()
    }

    fn release(&self, id: &RequestId, serial: u64) -> bool {
        let mut pending = self.lock();
        if pending.get(id).map(|r| r.serial) == Some(serial) {
            pending.remove(id);
            return true;
        }
        false
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<RequestId, PendingApproval>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Handle on one pending approval. Dropping it releases the record.
pub struct ApprovalTicket {
    gate: Arc<ApprovalGate>,
    id: RequestId,
    serial: u64,
    receiver: Option<oneshot::Receiver<Decision>>,
}

impl ApprovalTicket {
    pub fn id(&self) -> &RequestId {
        &self.id
    }

    /// Suspend until a decision (or expiry) for this id.
    pub async fn wait(mut self) -> Result<Approval, Rejection> {
        let Some(receiver) = self.receiver.take() else {
            return Err(Rejection::Rejected(json!("approval already consumed")));
        };

        let received = match self.gate.timeout {
            Some(limit) => match tokio::time::timeout(limit, receiver).await {
                Ok(received) => received,
                Err(_) => {
                    // Expiry wins: a late decision finds no record and is dropped.
                    self.gate.release(&self.id, self.serial);
                    warn!(request_id = %self.id, timeout_secs = limit.as_secs(), "Approval expired");
                    return Err(Rejection::Expired);
                }
            },
            None => receiver.await,
        };

        match received {
            Ok(Decision::Approve(payload)) => Ok(Approval { payload }),
            Ok(Decision::Reject(payload)) => Err(Rejection::Rejected(payload)),
            Err(_) => Err(Rejection::Rejected(json!("approval channel closed"))),
        }
    }
}

impl Drop for ApprovalTicket {
    fn drop(&mut self) {
        if self.gate.release(&self.id, self.serial) {
            debug!(request_id = %self.id, "Released abandoned approval");
        }
    }
}
