//! Configuration for the request arbiter

use crate::chain::ChainFamily;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Approval timeout override (seconds)
pub const APPROVAL_TIMEOUT_ENV: &str = "ARBITER_APPROVAL_TIMEOUT_SECS";
/// Audit log path override
pub const AUDIT_LOG_ENV: &str = "ARBITER_AUDIT_LOG";

/// One chain identifier and the family that serves it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainEntry {
    pub identifier: String,
    pub family: ChainFamily,
}

impl ChainEntry {
    pub fn new(identifier: &str, family: ChainFamily) -> Self {
        Self {
            identifier: identifier.to_string(),
            family,
        }
    }
}

/// Approval gate settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ApprovalSettings {
    /// Seconds to wait for a decision; absent waits indefinitely
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

impl ApprovalSettings {
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}

/// Main configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Chains this wallet serves
    #[serde(default = "default_chains")]
    pub chains: Vec<ChainEntry>,
    #[serde(default)]
    pub approval: ApprovalSettings,
    /// Path to audit log file
    #[serde(default)]
    pub audit_log_path: Option<String>,
}

fn default_chains() -> Vec<ChainEntry> {
    vec![
        ChainEntry::new("BTS", ChainFamily::Graphene),
        ChainEntry::new("BTS_TEST", ChainFamily::Graphene),
        ChainEntry::new("TUSC", ChainFamily::Graphene),
        ChainEntry::new("EOS", ChainFamily::Antelope),
        ChainEntry::new("BEOS", ChainFamily::Antelope),
        ChainEntry::new("TLOS", ChainFamily::Antelope),
    ]
}

impl Default for Config {
    fn default() -> Self {
        Self {
            chains: default_chains(),
            approval: ApprovalSettings::default(),
            audit_log_path: None,
        }
    }
}

impl Config {
    /// Load a JSON config file, or defaults when no path is given.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => {
                let content = std::fs::read_to_string(path)?;
                serde_json::from_str(&content)
                    .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))
            }
            None => Ok(Self::default()),
        }
    }

    /// Apply `ARBITER_*` environment overrides.
    pub fn with_env_overrides(self) -> Result<Self> {
        self.with_overrides(|name| std::env::var(name).ok())
    }

    fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        if let Some(raw) = lookup(APPROVAL_TIMEOUT_ENV) {
            let secs = raw.trim().parse::<u64>().map_err(|e| {
                Error::Config(format!("{} must be a number of seconds: {}", APPROVAL_TIMEOUT_ENV, e))
            })?;
            tracing::debug!(timeout_secs = secs, "Approval timeout from environment");
            self.approval.timeout_secs = Some(secs);
        }
        if let Some(path) = lookup(AUDIT_LOG_ENV).filter(|path| !path.is_empty()) {
            self.audit_log_path = Some(path);
        }
        Ok(self)
    }

    pub fn family_of(&self, identifier: &str) -> Option<ChainFamily> {
        self.chains
            .iter()
            .find(|entry| entry.identifier == identifier)
            .map(|entry| entry.family)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn defaults_cover_both_families() {
        let config = Config::default();
        assert_eq!(config.family_of("BTS"), Some(ChainFamily::Graphene));
        assert_eq!(config.family_of("TLOS"), Some(ChainFamily::Antelope));
        assert_eq!(config.family_of("ETH"), None);
        assert_eq!(config.approval.timeout(), None);
    }

    #[test]
    fn partial_config_deserializes_with_defaults() {
        let value = serde_json::json!({
            "approval": { "timeout_secs": 90 }
        });
        let parsed: Config = serde_json::from_value(value).expect("parse config");
        assert_eq!(parsed.chains.len(), 6);
        assert_eq!(parsed.approval.timeout(), Some(Duration::from_secs(90)));
        assert!(parsed.audit_log_path.is_none());
    }

    #[test]
    fn explicit_chain_list_replaces_defaults() {
        let value = serde_json::json!({
            "chains": [{ "identifier": "BTS", "family": "graphene" }],
            "audit_log_path": "audit.jsonl"
        });
        let parsed: Config = serde_json::from_value(value).expect("parse config");
        assert_eq!(parsed.chains, vec![ChainEntry::new("BTS", ChainFamily::Graphene)]);
        assert_eq!(parsed.audit_log_path.as_deref(), Some("audit.jsonl"));
    }

    #[test]
    fn environment_overrides_apply() {
        let env: HashMap<&str, &str> = [
            (APPROVAL_TIMEOUT_ENV, "30"),
            (AUDIT_LOG_ENV, "/tmp/arbiter.jsonl"),
        ]
        .into_iter()
        .collect();
        let config = Config::default()
            .with_overrides(|name| env.get(name).map(|v| v.to_string()))
            .unwrap();
        assert_eq!(config.approval.timeout_secs, Some(30));
        assert_eq!(config.audit_log_path.as_deref(), Some("/tmp/arbiter.jsonl"));
    }

    #[test]
    fn malformed_timeout_override_is_rejected() {
        let err = Config::default()
            .with_overrides(|name| (name == APPROVAL_TIMEOUT_ENV).then(|| "soon".to_string()))
            .unwrap_err();
        assert!(err.to_string().contains(APPROVAL_TIMEOUT_ENV));
    }
}
