//! Chain library capability
//!
//! The pipeline orchestrates a chain-specific library; it never implements
//! cryptography or networking itself. One adapter instance serves one chain.

use crate::error::CollaboratorError;
use crate::wallet::{Account, KeyMaterial};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Maps an operation method to the payload field naming its acting account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationType {
    pub method: String,
    #[serde(default)]
    pub from: Option<String>,
}

/// Vote payload mapped into display terms.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MappedOperation {
    pub entity: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub vote_id: Value,
}

/// Result of turning a vote into a chain operation.
#[derive(Debug, Clone, PartialEq)]
pub enum OperationPlan {
    Operation(Value),
    /// The account already votes this way; nothing to sign.
    NothingToDo,
}

/// Inputs for building an on-chain memo object.
#[derive(Debug, Clone, PartialEq)]
pub struct MemoRequest {
    pub from: String,
    pub to: String,
    pub memo: String,
    pub nonce: Option<Value>,
    pub encrypt: Option<bool>,
}

/// Memo text plus the key that encrypts it.
#[derive(Debug)]
pub struct MemoInput {
    pub key: KeyMaterial,
    pub memo: String,
}

#[derive(Debug)]
pub struct TransferOrder {
    pub from: String,
    pub to: String,
    pub amount: Value,
    pub asset_id: Value,
    pub memo: Option<MemoInput>,
    pub nonce: Option<Value>,
    pub encrypt: Option<bool>,
}

#[async_trait]
pub trait ChainAdapter: Send + Sync {
    /// Human-readable rendering of opaque parameters or an account reference.
    async fn visualize(&self, value: &Value) -> Result<Value, CollaboratorError>;

    async fn sign(&self, transaction: &Value, key: &KeyMaterial)
        -> Result<Value, CollaboratorError>;

    async fn broadcast(&self, transaction: &Value) -> Result<Value, CollaboratorError>;

    async fn transfer(
        &self,
        key: &KeyMaterial,
        order: TransferOrder,
    ) -> Result<Value, CollaboratorError>;

    async fn sign_nft(&self, key: &KeyMaterial, params: &Value)
        -> Result<Value, CollaboratorError>;

    async fn sign_message(
        &self,
        key: &KeyMaterial,
        account_name: &str,
        params: &Value,
    ) -> Result<Value, CollaboratorError>;

    /// Fresh denylist fetch. Never cached by the pipeline.
    async fn blocked_accounts(&self) -> Result<Vec<String>, CollaboratorError>;

    fn operation_types(&self) -> Vec<OperationType>;

    async fn map_operation_data(&self, payload: &Value)
        -> Result<MappedOperation, CollaboratorError>;

    async fn get_operation(
        &self,
        payload: &Value,
        account: &Account,
    ) -> Result<OperationPlan, CollaboratorError>;

    async fn create_memo_object(&self, memo: MemoRequest) -> Result<Value, CollaboratorError>;

    /// Display form of a raw amount.
    async fn format_amount(&self, amount: &Value) -> Result<Value, CollaboratorError>;

    /// Chain id for an account name.
    async fn resolve_account_id(&self, name: &str) -> Result<String, CollaboratorError>;
}
