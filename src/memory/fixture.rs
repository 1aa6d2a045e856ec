//! JSON wallet fixtures

use super::{
    AccountFixture, ChainScript, ChannelUi, MemoryAccountStore, MemoryKeyStore, MemoryVerifier,
    RecordingNotifier, ScriptedChain,
};
use crate::chain::ChainRegistry;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::pipeline::Collaborators;
use crate::ui::ApprovalPrompt;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedReceiver;

/// Complete in-memory wallet description.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Fixture {
    #[serde(flatten)]
    pub wallet: AccountFixture,
    /// Key reference to secret.
    #[serde(default)]
    pub keys: HashMap<String, String>,
    #[serde(default)]
    pub chain: ChainScript,
    #[serde(default)]
    pub locked: bool,
}

impl Fixture {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content)
            .map_err(|e| Error::InvalidArgument(format!("fixture {}: {}", path.display(), e)))
    }
}

/// In-memory collaborators, kept concrete so callers can inspect them.
pub struct MemoryWallet {
    pub accounts: Arc<MemoryAccountStore>,
    pub keys: Arc<MemoryKeyStore>,
    pub ui: Arc<ChannelUi>,
    pub notifier: Arc<RecordingNotifier>,
    pub verifier: Arc<MemoryVerifier>,
    /// Serves every configured chain identifier.
    pub chain: Arc<ScriptedChain>,
    pub registry: ChainRegistry,
}

impl MemoryWallet {
    pub fn from_fixture(
        fixture: &Fixture,
        config: &Config,
    ) -> (Self, UnboundedReceiver<ApprovalPrompt>) {
        let keys = MemoryKeyStore::new(fixture.keys.clone());
        keys.set_locked(fixture.locked);
        Self::from_parts(
            fixture.wallet.clone(),
            keys,
            ScriptedChain::from_script(&fixture.chain),
            config,
        )
    }

    pub fn from_parts(
        accounts: AccountFixture,
        keys: MemoryKeyStore,
        chain: ScriptedChain,
        config: &Config,
    ) -> (Self, UnboundedReceiver<ApprovalPrompt>) {
        let (ui, prompts) = ChannelUi::new();
        let chain = Arc::new(chain);
        let mut registry = ChainRegistry::new();
        for entry in &config.chains {
            registry.register(entry.identifier.clone(), entry.family, chain.clone());
        }

        let wallet = Self {
            accounts: Arc::new(MemoryAccountStore::new(accounts)),
            keys: Arc::new(keys),
            ui: Arc::new(ui),
            notifier: Arc::new(RecordingNotifier::default()),
            verifier: Arc::new(MemoryVerifier::default()),
            chain,
            registry,
        };
        (wallet, prompts)
    }

    pub fn collaborators(&self) -> Collaborators {
        Collaborators {
            accounts: self.accounts.clone(),
            keys: self.keys.clone(),
            ui: self.ui.clone(),
            notifier: self.notifier.clone(),
            verifier: self.verifier.clone(),
            chains: self.registry.clone(),
        }
    }
}
