//! Chain families
//!
//! A family groups chain identifiers that behave identically for key lookup,
//! transaction assembly, memo handling and denylist screening. The family is
//! chosen once per request from the registry; handlers never branch on raw
//! chain identifiers.

use super::ChainAdapter;
use crate::error::CollaboratorError;
use crate::request::Request;
use crate::wallet::{AccountStore, KeyRef};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Prefix of Graphene account object ids (`1.2.<n>`).
const GRAPHENE_ACCOUNT_PREFIX: &str = "1.2.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChainFamily {
    /// Object-id accounts, active keys per account, memo objects (BTS, BTS_TEST, TUSC).
    Graphene,
    /// Named accounts, flat key lookup, raw action signing (EOS, BEOS, TLOS).
    Antelope,
}

impl ChainFamily {
    pub fn name(&self) -> &'static str {
        match self {
            ChainFamily::Graphene => "graphene",
            ChainFamily::Antelope => "antelope",
        }
    }

    pub fn supports_denylist(self) -> bool {
        matches!(self, ChainFamily::Graphene)
    }

    pub fn supports_memo(self) -> bool {
        matches!(self, ChainFamily::Graphene)
    }

    pub fn supports_transfer(self) -> bool {
        matches!(self, ChainFamily::Graphene)
    }

    /// Whether `target` is already a chain account id rather than a name.
    pub fn is_account_id(self, target: &str) -> bool {
        match self {
            ChainFamily::Graphene => target.contains(GRAPHENE_ACCOUNT_PREFIX),
            ChainFamily::Antelope => false,
        }
    }

    /// Every account id embedded anywhere in `value`, deduplicated, in order of appearance.
    pub fn extract_candidate_ids(self, value: &Value) -> Vec<String> {
        match self {
            ChainFamily::Graphene => {
                let text = match value {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                let mut ids = Vec::new();
                for id in scan_object_ids(&text, GRAPHENE_ACCOUNT_PREFIX) {
                    if !ids.contains(&id) {
                        ids.push(id);
                    }
                }
                ids
            }
            ChainFamily::Antelope => Vec::new(),
        }
    }

    /// Key reference used to sign a transaction for this request.
    pub fn signing_key_ref(
        self,
        store: &dyn AccountStore,
        request: &Request,
    ) -> Result<KeyRef, CollaboratorError> {
        match self {
            ChainFamily::Graphene => {
                if request.payload.get("account_id").is_some() {
                    store.active_key(request)
                } else {
                    store.current_active_key()
                }
            }
            ChainFamily::Antelope => store.chain_key(&request.chain),
        }
    }

    /// Build the chain transaction object from a request payload.
    ///
    /// Graphene signs `payload.params`, carrying a prepared memo object along
    /// when one is attached; Antelope signs the raw transaction serialized at
    /// `params[1]`.
    pub fn assemble_transaction(self, payload: &Value) -> Result<Value, String> {
        let params = payload.get("params").unwrap_or(&Value::Null);
        match self {
            ChainFamily::Graphene => {
                let mut transaction = params.clone();
                if let (Value::Object(fields), Some(memo @ Value::Object(_))) =
                    (&mut transaction, payload.get("memo"))
                {
                    fields.insert("memo".to_string(), memo.clone());
                }
                Ok(transaction)
            }
            ChainFamily::Antelope => raw_transaction(params),
        }
    }

    /// Display form of the account that signs a `requestSignature` payload.
    pub async fn visualize_signer(
        self,
        adapter: &dyn ChainAdapter,
        payload: &Value,
    ) -> Result<Value, CollaboratorError> {
        match self {
            ChainFamily::Graphene => {
                let account = payload.get("account_id").cloned().unwrap_or(Value::Null);
                adapter.visualize(&account).await
            }
            ChainFamily::Antelope => Ok(Value::String(
                first_actor(payload.get("authorization")).unwrap_or_default(),
            )),
        }
    }

    /// Actor of the first action in an injected raw transaction.
    pub fn injected_actor(self, params: &Value) -> Option<String> {
        match self {
            ChainFamily::Graphene => None,
            ChainFamily::Antelope => {
                let transaction = raw_transaction(params).ok()?;
                let action = transaction.get("actions")?.get(0)?;
                first_actor(action.get("authorization"))
            }
        }
    }
}

fn raw_transaction(params: &Value) -> Result<Value, String> {
    match params.get(1) {
        Some(Value::String(raw)) => serde_json::from_str(raw)
            .map_err(|e| format!("invalid transaction JSON in params[1]: {}", e)),
        Some(value @ Value::Object(_)) => Ok(value.clone()),
        _ => Err("missing transaction in params[1]".to_string()),
    }
}

fn first_actor(authorization: Option<&Value>) -> Option<String> {
    authorization?
        .get(0)?
        .get("actor")?
        .as_str()
        .map(str::to_string)
}

/// Find `<prefix><digits>` tokens that are not the tail of a longer dotted number.
fn scan_object_ids(text: &str, prefix: &str) -> Vec<String> {
    let bytes = text.as_bytes();
    let mut found = Vec::new();
    let mut start = 0;

    while let Some(pos) = text[start..].find(prefix) {
        let at = start + pos;
        let digits_start = at + prefix.len();
        let digits = bytes[digits_start..]
            .iter()
            .take_while(|b| b.is_ascii_digit())
            .count();
        let boundary = at == 0 || !(bytes[at - 1].is_ascii_digit() || bytes[at - 1] == b'.');

        if digits > 0 && boundary {
            found.push(text[at..digits_start + digits].to_string());
        }
        start = digits_start;
    }

    found
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn graphene_extracts_deduplicated_account_ids() {
        let params = json!({
            "fee": {"asset_id": "1.3.0"},
            "from": "1.2.5",
            "to": "1.2.100",
            "memo": "paying 1.2.5 again"
        });
        let ids = ChainFamily::Graphene.extract_candidate_ids(&params);
        assert_eq!(ids, vec!["1.2.5".to_string(), "1.2.100".to_string()]);
    }

    #[test]
    fn graphene_ignores_longer_dotted_numbers() {
        let ids = ChainFamily::Graphene.extract_candidate_ids(&json!("v21.2.7 and 1.2.x and 2.1.2.8"));
        assert!(ids.is_empty());
    }

    #[test]
    fn antelope_has_no_candidate_ids() {
        let ids = ChainFamily::Antelope.extract_candidate_ids(&json!({"to": "1.2.100"}));
        assert!(ids.is_empty());
    }

    #[test]
    fn antelope_assembles_from_serialized_params() {
        let params = json!([
            "signAndBroadcast",
            "{\"actions\":[{\"authorization\":[{\"actor\":\"alice\"}]}]}"
        ]);
        let tx = ChainFamily::Antelope
            .assemble_transaction(&json!({"params": params}))
            .unwrap();
        assert_eq!(tx["actions"][0]["authorization"][0]["actor"], json!("alice"));
        assert_eq!(
            ChainFamily::Antelope.injected_actor(&params),
            Some("alice".to_string())
        );
    }

    #[test]
    fn antelope_rejects_missing_transaction() {
        let err = ChainFamily::Antelope
            .assemble_transaction(&json!({"params": ["sign"]}))
            .unwrap_err();
        assert!(err.contains("params[1]"));
    }

    #[test]
    fn graphene_carries_prepared_memo_into_transaction() {
        let payload = json!({
            "params": {"from": "1.2.5", "to": "1.2.9"},
            "memo": {"from": "BTS1", "to": "BTS2", "nonce": 7, "message": "ab"}
        });
        let tx = ChainFamily::Graphene.assemble_transaction(&payload).unwrap();
        assert_eq!(tx["memo"]["nonce"], json!(7));
        assert_eq!(tx["to"], json!("1.2.9"));
    }

    #[test]
    fn graphene_transfer_targets_by_id_or_name() {
        assert!(ChainFamily::Graphene.is_account_id("1.2.100"));
        assert!(!ChainFamily::Graphene.is_account_id("alice"));
    }
}
