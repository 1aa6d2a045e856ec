//! Account and app-link store accessors

use crate::error::CollaboratorError;
use crate::request::Request;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::fmt;

/// Opaque reference to a stored key; resolved to material by the key store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct KeyRef(String);

impl KeyRef {
    pub fn new(reference: impl Into<String>) -> Self {
        Self(reference.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for KeyRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A local chain account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    pub account_name: String,
    #[serde(rename = "accountID")]
    pub account_id: String,
    pub chain: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memo_key: Option<KeyRef>,
}

impl Account {
    /// Public identity disclosed to a requester.
    pub fn identity(&self) -> Value {
        json!({
            "name": self.account_name,
            "chain": self.chain,
            "id": self.account_id,
        })
    }
}

/// The app/origin/chain triple a link is keyed by.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkRef {
    pub app_name: String,
    pub origin: String,
    pub chain: String,
}

impl From<&Request> for LinkRef {
    fn from(request: &Request) -> Self {
        Self {
            app_name: request.app_name.clone(),
            origin: request.origin.clone(),
            chain: request.chain.clone(),
        }
    }
}

/// A previously approved association between an app triple and one account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkRecord {
    #[serde(flatten)]
    pub link: LinkRef,
    #[serde(rename = "accountID")]
    pub account_id: String,
}

/// Narrow read accessors over the external account/link store.
///
/// Implementations must be safe under concurrent access; the pipeline does
/// no locking of its own.
pub trait AccountStore: Send + Sync {
    fn safe_account_list(&self) -> Vec<Account>;

    fn existing_links(&self, link: &LinkRef) -> Result<Vec<LinkRecord>, CollaboratorError>;

    /// The link recorded for the request's app/origin/chain, if any.
    fn find_link(&self, request: &Request) -> Option<LinkRecord>;

    fn safe_account(&self, link: &LinkRecord) -> Result<Account, CollaboratorError>;

    fn current_safe_account(&self) -> Result<Account, CollaboratorError>;

    /// Active key of the account the request acts for.
    fn active_key(&self, request: &Request) -> Result<KeyRef, CollaboratorError>;

    /// Active key of the currently selected account.
    fn current_active_key(&self) -> Result<KeyRef, CollaboratorError>;

    /// Single flattened key used by chains without per-account key roles.
    fn chain_key(&self, chain: &str) -> Result<KeyRef, CollaboratorError>;

    /// Key used for message and NFT signatures.
    fn signing_key(&self, request: &Request) -> Result<KeyRef, CollaboratorError>;

    /// Record the account chosen during a link approval.
    fn select_account(&self, account: &Account) -> Result<(), CollaboratorError>;
}
