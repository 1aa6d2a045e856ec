//! Scripted chain library
//!
//! Deterministic stand-in for a chain library: signatures are blake3
//! digests, broadcasts echo a transaction id, and any method can be scripted
//! to fail or to return nothing.

use crate::chain::{
    ChainAdapter, MappedOperation, MemoRequest, OperationPlan, OperationType, TransferOrder,
};
use crate::error::CollaboratorError;
use crate::wallet::{Account, KeyMaterial};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Scripted {
    Fail,
    Empty,
}

/// Chain behaviour loadable from a fixture file.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainScript {
    /// Denylist contents; `None` makes every fetch fail.
    #[serde(default)]
    pub blocked: Option<Vec<String>>,
    /// Account name to id resolution.
    #[serde(default)]
    pub names: HashMap<String, String>,
    /// Votes resolve to nothing to sign.
    #[serde(default)]
    pub nothing_to_do: bool,
    /// Methods that fail when called.
    #[serde(default)]
    pub failing: Vec<String>,
}

pub struct ScriptedChain {
    script: HashMap<String, Scripted>,
    blocked: Option<Vec<String>>,
    names: HashMap<String, String>,
    operation_types: Vec<OperationType>,
    nothing_to_do: bool,
    calls: Mutex<Vec<String>>,
}

impl Default for ScriptedChain {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedChain {
    pub fn new() -> Self {
        let operation_types = [
            ("transfer", Some("from")),
            ("account_update", Some("account")),
            ("asset_issue", Some("issuer")),
            ("limit_order_create", Some("seller")),
            ("custom", None),
        ]
        .into_iter()
        .map(|(method, from)| OperationType {
            method: method.to_string(),
            from: from.map(str::to_string),
        })
        .collect();

        Self {
            script: HashMap::new(),
            blocked: Some(Vec::new()),
            names: HashMap::new(),
            operation_types,
            nothing_to_do: false,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn from_script(script: &ChainScript) -> Self {
        let mut chain = Self::new();
        chain.blocked = script.blocked.clone();
        chain.names = script.names.clone();
        chain.nothing_to_do = script.nothing_to_do;
        for method in &script.failing {
            chain = chain.failing(method);
        }
        chain
    }

    pub fn failing(mut self, method: &str) -> Self {
        self.script.insert(method.to_string(), Scripted::Fail);
        self
    }

    /// `method` succeeds but returns `null`.
    pub fn returning_nothing(mut self, method: &str) -> Self {
        self.script.insert(method.to_string(), Scripted::Empty);
        self
    }

    pub fn with_blocked(mut self, blocked: Option<Vec<&str>>) -> Self {
        self.blocked = blocked.map(|ids| ids.into_iter().map(str::to_string).collect());
        self
    }

    pub fn with_name(mut self, name: &str, id: &str) -> Self {
        self.names.insert(name.to_string(), id.to_string());
        self
    }

    pub fn with_nothing_to_do(mut self) -> Self {
        self.nothing_to_do = true;
        self
    }

    /// Methods called so far, in order.
    pub fn calls(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn was_called(&self, method: &str) -> bool {
        self.calls().iter().any(|call| call == method)
    }

    /// Record the call; `Some` short-circuits with the scripted outcome.
    fn enter(&self, method: &str) -> Option<Result<Value, CollaboratorError>> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(method.to_string());
        match self.script.get(method)? {
            Scripted::Fail => Some(Err(CollaboratorError::Failed(format!("{} failed", method)))),
            Scripted::Empty => Some(Ok(Value::Null)),
        }
    }

    fn signature(key: &KeyMaterial, body: &Value) -> String {
        let mut hasher = blake3::Hasher::new();
        hasher.update(key.expose().as_bytes());
        hasher.update(body.to_string().as_bytes());
        hasher.finalize().to_hex().to_string()
    }
}

#[async_trait]
impl ChainAdapter for ScriptedChain {
    async fn visualize(&self, value: &Value) -> Result<Value, CollaboratorError> {
        if let Some(outcome) = self.enter("visualize") {
            return outcome;
        }
        if value.is_null() {
            return Ok(Value::Null);
        }
        Ok(json!({ "display": value }))
    }

    async fn sign(
        &self,
        transaction: &Value,
        key: &KeyMaterial,
    ) -> Result<Value, CollaboratorError> {
        if let Some(outcome) = self.enter("sign") {
            return outcome;
        }
        Ok(json!({
            "transaction": transaction,
            "signatures": [Self::signature(key, transaction)],
        }))
    }

    async fn broadcast(&self, transaction: &Value) -> Result<Value, CollaboratorError> {
        if let Some(outcome) = self.enter("broadcast") {
            return outcome;
        }
        let id = blake3::hash(transaction.to_string().as_bytes()).to_hex().to_string();
        Ok(json!({ "id": &id[..40], "trx": transaction }))
    }

    async fn transfer(
        &self,
        key: &KeyMaterial,
        order: TransferOrder,
    ) -> Result<Value, CollaboratorError> {
        if let Some(outcome) = self.enter("transfer") {
            return outcome;
        }
        let body = json!({
            "from": order.from,
            "to": order.to,
            "amount": order.amount,
            "asset_id": order.asset_id,
            "memo": order.memo.as_ref().map(|memo| memo.memo.clone()),
            "memoSigned": order.memo.as_ref().map(|memo| Self::signature(&memo.key, &json!(memo.memo))),
        });
        let signature = Self::signature(key, &body);
        Ok(json!({ "operation": body, "signature": signature }))
    }

    async fn sign_nft(
        &self,
        key: &KeyMaterial,
        params: &Value,
    ) -> Result<Value, CollaboratorError> {
        if let Some(outcome) = self.enter("sign_nft") {
            return outcome;
        }
        Ok(json!({ "nft": params, "signature": Self::signature(key, params) }))
    }

    async fn sign_message(
        &self,
        key: &KeyMaterial,
        account_name: &str,
        params: &Value,
    ) -> Result<Value, CollaboratorError> {
        if let Some(outcome) = self.enter("sign_message") {
            return outcome;
        }
        Ok(json!({
            "signer": account_name,
            "payload": params,
            "signature": Self::signature(key, params),
        }))
    }

    async fn blocked_accounts(&self) -> Result<Vec<String>, CollaboratorError> {
        if let Some(Err(e)) = self.enter("blocked_accounts") {
            return Err(e);
        }
        self.blocked
            .clone()
            .ok_or_else(|| CollaboratorError::Failed("denylist unavailable".to_string()))
    }

    fn operation_types(&self) -> Vec<OperationType> {
        self.operation_types.clone()
    }

    async fn map_operation_data(
        &self,
        payload: &Value,
    ) -> Result<MappedOperation, CollaboratorError> {
        if let Some(Err(e)) = self.enter("map_operation_data") {
            return Err(e);
        }
        let entity = payload
            .get("params")
            .and_then(|params| params.get("id"))
            .and_then(Value::as_str)
            .ok_or_else(|| CollaboratorError::Failed("vote names no entity".to_string()))?;
        Ok(MappedOperation {
            entity: entity.to_string(),
            description: format!("Vote for {}", entity),
            vote_id: json!(format!("1:{}", entity)),
        })
    }

    async fn get_operation(
        &self,
        payload: &Value,
        account: &Account,
    ) -> Result<OperationPlan, CollaboratorError> {
        if let Some(Err(e)) = self.enter("get_operation") {
            return Err(e);
        }
        if self.nothing_to_do {
            return Ok(OperationPlan::NothingToDo);
        }
        Ok(OperationPlan::Operation(json!({
            "account": account.account_id,
            "votes": [payload.get("vote_id").cloned().unwrap_or_default()],
        })))
    }

    async fn create_memo_object(&self, memo: MemoRequest) -> Result<Value, CollaboratorError> {
        if let Some(outcome) = self.enter("create_memo_object") {
            return outcome;
        }
        Ok(json!({
            "from": memo.from,
            "to": memo.to,
            "nonce": memo.nonce.unwrap_or_else(|| json!(1)),
            "message": blake3::hash(memo.memo.as_bytes()).to_hex().to_string(),
        }))
    }

    async fn format_amount(&self, amount: &Value) -> Result<Value, CollaboratorError> {
        if let Some(outcome) = self.enter("format_amount") {
            return outcome;
        }
        let quantity = amount
            .get("amount")
            .or_else(|| amount.get("satoshis"))
            .cloned()
            .unwrap_or_default();
        let asset = amount.get("asset_id").and_then(Value::as_str).unwrap_or("?");
        Ok(Value::String(format!("{} {}", quantity, asset)))
    }

    async fn resolve_account_id(&self, name: &str) -> Result<String, CollaboratorError> {
        if let Some(Err(e)) = self.enter("resolve_account_id") {
            return Err(e);
        }
        self.names
            .get(name)
            .cloned()
            .ok_or_else(|| CollaboratorError::NotFound(format!("account {}", name)))
    }
}
