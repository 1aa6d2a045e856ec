//! Signing orchestrator
//!
//! Runs only after approval: resolves the key reference, fetches key
//! material, assembles and signs the transaction, optionally broadcasts, and
//! emits a best-effort receipt. Every sub-step fails with its own stage tag.

use crate::approval::Approval;
use crate::chain::{ChainHandle, MemoRequest};
use crate::error::{ErrorKind, StageError};
use crate::request::Request;
use crate::ui::{ApprovalUi, Notifier, Receipt};
use crate::wallet::{AccountStore, KeyMaterial, KeyRef, KeyStore};
use serde_json::Value;
use tracing::{debug, info, warn};

pub const NOTIFY_SIGN: &str = "Transaction signed";
pub const NOTIFY_SIGN_AND_BROADCAST: &str = "Transaction signed and broadcast";
pub const NOTIFY_BROADCAST: &str = "Transaction broadcast";

/// What the requester wants done with an approved transaction (`params[0]`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxAction {
    Sign,
    SignAndBroadcast,
    /// Signature already present; broadcast only.
    Broadcast,
}

impl TxAction {
    pub fn from_params(params: &Value) -> Result<Self, String> {
        match params.get(0) {
            None | Some(Value::Null) => Ok(TxAction::SignAndBroadcast),
            Some(Value::String(action)) => match action.as_str() {
                "sign" => Ok(TxAction::Sign),
                "signAndBroadcast" => Ok(TxAction::SignAndBroadcast),
                "broadcast" => Ok(TxAction::Broadcast),
                other => Err(format!("unknown transaction action: {}", other)),
            },
            Some(_) => Ok(TxAction::SignAndBroadcast),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TxAction::Sign => "sign",
            TxAction::SignAndBroadcast => "signAndBroadcast",
            TxAction::Broadcast => "broadcast",
        }
    }

    fn notice(&self) -> &'static str {
        match self {
            TxAction::Sign => NOTIFY_SIGN,
            TxAction::SignAndBroadcast => NOTIFY_SIGN_AND_BROADCAST,
            TxAction::Broadcast => NOTIFY_BROADCAST,
        }
    }
}

/// Sender and recipient a memo is encrypted between.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoParties {
    pub from: String,
    pub to: String,
}

/// Payload field pairs that can name memo parties, in precedence order.
const MEMO_SHAPES: [(&str, &str); 3] = [
    ("from", "to"),
    ("withdraw_from_account", "withdraw_to_account"),
    ("issuer", "issue_to_account"),
];

/// Pick exactly one sender/recipient pair from the payload.
pub fn memo_parties(payload: &Value) -> Option<MemoParties> {
    MEMO_SHAPES.iter().find_map(|(from, to)| {
        let from = payload.get(*from)?.as_str()?;
        let to = payload.get(*to)?.as_str()?;
        Some(MemoParties {
            from: from.to_string(),
            to: to.to_string(),
        })
    })
}

/// A result the requester cannot use: null, false, empty string/array/object.
pub fn is_empty_result(value: &Value) -> bool {
    match value {
        Value::Null | Value::Bool(false) => true,
        Value::String(s) => s.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(fields) => fields.is_empty(),
        _ => false,
    }
}

/// Fetch key material. Requires proof of approval.
pub async fn resolve_key(
    keys: &dyn KeyStore,
    _approval: &Approval,
    key: &KeyRef,
    stage: String,
) -> Result<KeyMaterial, StageError> {
    keys.get_key(key).await.map_err(|e| {
        warn!(stage = %stage, key = %key, error = %e, "Key resolution failed");
        StageError::from_collaborator(ErrorKind::KeyResolution, stage, &e)
    })
}

pub struct SigningOrchestrator<'a> {
    pub chain: &'a ChainHandle,
    pub accounts: &'a dyn AccountStore,
    pub keys: &'a dyn KeyStore,
    pub ui: &'a dyn ApprovalUi,
    pub notifier: &'a dyn Notifier,
}

impl<'a> SigningOrchestrator<'a> {
    /// Copy of `request` whose memo text is replaced by a chain memo object.
    ///
    /// Requests without a memo, or on chains without memo support, are returned unchanged.
    pub async fn attach_memo(&self, request: &Request, stage: &str) -> Result<Request, StageError> {
        let memo = match request.payload.get("memo") {
            Some(Value::String(memo)) if self.chain.family.supports_memo() => memo.clone(),
            _ => return Ok(request.clone()),
        };

        let parties = memo_parties(&request.payload).ok_or_else(|| {
            StageError::validation(
                format!("{}.memo", stage),
                "memo present without a sender/recipient pair",
            )
        })?;

        let params = request.params();
        let memo_request = MemoRequest {
            from: parties.from,
            to: parties.to,
            memo,
            nonce: params.get("optionalNonce").cloned(),
            encrypt: params.get("encryptMemo").and_then(Value::as_bool),
        };

        let memo_object = self
            .chain
            .adapter
            .create_memo_object(memo_request)
            .await
            .map_err(|e| {
                StageError::from_collaborator(ErrorKind::Signing, format!("{}.memo", stage), &e)
            })?;

        let mut augmented = request.clone();
        if let Value::Object(fields) = &mut augmented.payload {
            fields.insert("memo".to_string(), memo_object);
        }
        Ok(augmented)
    }

    /// Sign and/or broadcast an approved request.
    ///
    /// `receipt` is the visualization shown at approval time; when present a
    /// receipt is requested after success.
    pub async fn execute(
        &self,
        approval: &Approval,
        request: &Request,
        receipt: Option<Value>,
    ) -> Result<Value, StageError> {
        let action = TxAction::from_params(request.params())
            .map_err(|e| StageError::validation(request.kind.stage_name(), e))?;
        let tag = |step: &str| format!("{}.{}", action.as_str(), step);
        let adapter = &self.chain.adapter;

        if action == TxAction::Broadcast {
            let result = adapter.broadcast(request.params()).await.map_err(|e| {
                StageError::from_collaborator(ErrorKind::Broadcast, action.as_str(), &e)
            })?;
            return self.finish(action, request, result, None);
        }

        let key_ref = self
            .chain
            .family
            .signing_key_ref(self.accounts, request)
            .map_err(|e| {
                StageError::from_collaborator(ErrorKind::KeyResolution, tag("getActiveKey"), &e)
            })?;
        let key = resolve_key(self.keys, approval, &key_ref, tag("getKey")).await?;

        let transaction = self
            .chain
            .family
            .assemble_transaction(&request.payload)
            .map_err(|e| StageError::validation(tag("assemble"), e))?;

        let signed = adapter.sign(&transaction, &key).await.map_err(|e| {
            StageError::from_collaborator(ErrorKind::Signing, tag("blockchain.sign"), &e)
        })?;
        drop(key);
        debug!(request_id = %request.id, action = action.as_str(), "Transaction signed");

        let result = match action {
            TxAction::Sign => signed,
            _ => adapter.broadcast(&signed).await.map_err(|e| {
                StageError::from_collaborator(ErrorKind::Broadcast, tag("broadcast"), &e)
            })?,
        };

        self.finish(action, request, result, receipt)
    }

    fn finish(
        &self,
        action: TxAction,
        request: &Request,
        result: Value,
        receipt: Option<Value>,
    ) -> Result<Value, StageError> {
        if is_empty_result(&result) {
            return Err(StageError::new(
                ErrorKind::EmptyResult,
                format!("{}.result", action.as_str()),
                "Failed to process approved prompt",
            ));
        }

        let notify_text = action.notice();
        self.notifier.notify_user(notify_text);
        info!(request_id = %request.id, action = action.as_str(), "Approved transaction processed");

        if let Some(snapshot) = receipt {
            let receipt = Receipt {
                request: request.clone(),
                result: result.clone(),
                notify_text: notify_text.to_string(),
                receipt: snapshot,
            };
            if let Err(e) = self.ui.create_receipt(&receipt) {
                warn!(request_id = %request.id, error = %e, "Receipt creation failed");
            }
        }

        Ok(result)
    }
}
