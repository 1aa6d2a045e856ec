//! Inbound request model

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Caller-supplied correlation key for the whole lifetime of a request.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(String);

impl RequestId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for RequestId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for RequestId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Operation kind requested by the external application.
///
/// Type strings that are not one of the wallet operations name a chain
/// operation and are routed as injected calls.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum RequestKind {
    Link,
    Relink,
    GetAccount,
    RequestSignature,
    InjectedCall(String),
    VoteFor,
    SignNft,
    SignMessage,
    Transfer,
    MessageVerification,
}

impl RequestKind {
    /// Stage prefix used in failure envelopes.
    pub fn stage_name(&self) -> &str {
        match self {
            RequestKind::Link => "REQUEST_LINK",
            RequestKind::Relink => "REQUEST_RELINK",
            RequestKind::GetAccount => "getAccount",
            RequestKind::RequestSignature => "requestSignature",
            RequestKind::InjectedCall(_) => "injectedCall",
            RequestKind::VoteFor => "voteFor",
            RequestKind::SignNft => "signNFT",
            RequestKind::SignMessage => "signMessage",
            RequestKind::Transfer => "transfer",
            RequestKind::MessageVerification => "messageVerification",
        }
    }

    pub fn wire_name(&self) -> &str {
        match self {
            RequestKind::InjectedCall(method) => method,
            other => other.stage_name(),
        }
    }
}

impl From<String> for RequestKind {
    fn from(value: String) -> Self {
        match value.as_str() {
            "REQUEST_LINK" | "link" => RequestKind::Link,
            "REQUEST_RELINK" | "relink" => RequestKind::Relink,
            "getAccount" => RequestKind::GetAccount,
            "requestSignature" => RequestKind::RequestSignature,
            "voteFor" => RequestKind::VoteFor,
            "signNFT" => RequestKind::SignNft,
            "signMessage" => RequestKind::SignMessage,
            "transfer" => RequestKind::Transfer,
            "messageVerification" | "verifyMessage" => RequestKind::MessageVerification,
            _ => RequestKind::InjectedCall(value),
        }
    }
}

impl From<RequestKind> for String {
    fn from(kind: RequestKind) -> Self {
        kind.wire_name().to_string()
    }
}

impl fmt::Display for RequestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.wire_name())
    }
}

/// One external call. Never mutated once the pipeline starts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Request {
    pub id: RequestId,
    pub app_name: String,
    pub origin: String,
    pub chain: String,
    #[serde(rename = "type")]
    pub kind: RequestKind,
    #[serde(default)]
    pub payload: Value,
}

impl Request {
    pub fn new(
        id: impl Into<RequestId>,
        kind: RequestKind,
        chain: impl Into<String>,
        payload: Value,
    ) -> Self {
        Self {
            id: id.into(),
            app_name: String::new(),
            origin: String::new(),
            chain: chain.into(),
            kind,
            payload,
        }
    }

    pub fn with_app(mut self, app_name: impl Into<String>, origin: impl Into<String>) -> Self {
        self.app_name = app_name.into();
        self.origin = origin.into();
        self
    }

    /// `payload.params`, or `Null` when absent.
    pub fn params(&self) -> &Value {
        self.payload.get("params").unwrap_or(&Value::Null)
    }

    pub fn has_payload(&self) -> bool {
        match &self.payload {
            Value::Null => false,
            Value::Object(map) => !map.is_empty(),
            _ => true,
        }
    }
}
