//! In-memory account and link store

use crate::error::CollaboratorError;
use crate::request::Request;
use crate::wallet::{Account, AccountStore, KeyRef, LinkRecord, LinkRef};
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

/// Accounts, links and key references for one wallet.
///
/// Key maps are keyed by account id, except `chain_keys` which is keyed by
/// chain identifier.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountFixture {
    #[serde(default)]
    pub accounts: Vec<Account>,
    #[serde(default)]
    pub links: Vec<LinkRecord>,
    #[serde(default)]
    pub active_keys: HashMap<String, KeyRef>,
    #[serde(default)]
    pub signing_keys: HashMap<String, KeyRef>,
    #[serde(default)]
    pub chain_keys: HashMap<String, KeyRef>,
    /// Account id of the currently selected account.
    #[serde(default)]
    pub selected: Option<String>,
}

#[derive(Debug)]
pub struct MemoryAccountStore {
    fixture: AccountFixture,
    selected: Mutex<Option<String>>,
}

impl MemoryAccountStore {
    pub fn new(fixture: AccountFixture) -> Self {
        let selected = Mutex::new(fixture.selected.clone());
        Self { fixture, selected }
    }

    /// Account id most recently chosen through `select_account`.
    pub fn selected(&self) -> Option<String> {
        self.selected
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn account_by_id(&self, account_id: &str) -> Option<&Account> {
        self.fixture
            .accounts
            .iter()
            .find(|account| account.account_id == account_id)
    }

    /// Account a request acts for: its `account_id`, else its link.
    fn acting_account_id(&self, request: &Request) -> Result<String, CollaboratorError> {
        if let Some(id) = request.payload.get("account_id").and_then(|v| v.as_str()) {
            if self.account_by_id(id).is_some() {
                return Ok(id.to_string());
            }
        }
        self.find_link(request)
            .map(|link| link.account_id)
            .ok_or_else(|| CollaboratorError::NotFound(format!("no link for {}", request.app_name)))
    }

    fn key_for(map: &HashMap<String, KeyRef>, account_id: &str) -> Result<KeyRef, CollaboratorError> {
        map.get(account_id)
            .cloned()
            .ok_or_else(|| CollaboratorError::NotFound(format!("no key for account {}", account_id)))
    }
}

impl AccountStore for MemoryAccountStore {
    fn safe_account_list(&self) -> Vec<Account> {
        self.fixture.accounts.clone()
    }

    fn existing_links(&self, link: &LinkRef) -> Result<Vec<LinkRecord>, CollaboratorError> {
        Ok(self
            .fixture
            .links
            .iter()
            .filter(|record| &record.link == link)
            .cloned()
            .collect())
    }

    fn find_link(&self, request: &Request) -> Option<LinkRecord> {
        let wanted = LinkRef::from(request);
        self.fixture
            .links
            .iter()
            .find(|record| record.link == wanted)
            .cloned()
    }

    fn safe_account(&self, link: &LinkRecord) -> Result<Account, CollaboratorError> {
        self.fixture
            .accounts
            .iter()
            .find(|account| account.account_id == link.account_id && account.chain == link.link.chain)
            .cloned()
            .ok_or_else(|| CollaboratorError::NotFound(format!("account {}", link.account_id)))
    }

    fn current_safe_account(&self) -> Result<Account, CollaboratorError> {
        let selected = self.selected();
        selected
            .as_deref()
            .and_then(|id| self.account_by_id(id))
            .or_else(|| self.fixture.accounts.first())
            .cloned()
            .ok_or_else(|| CollaboratorError::NotFound("no accounts".to_string()))
    }

    fn active_key(&self, request: &Request) -> Result<KeyRef, CollaboratorError> {
        let account_id = self.acting_account_id(request)?;
        Self::key_for(&self.fixture.active_keys, &account_id)
    }

    fn current_active_key(&self) -> Result<KeyRef, CollaboratorError> {
        let account = self.current_safe_account()?;
        Self::key_for(&self.fixture.active_keys, &account.account_id)
    }

    fn chain_key(&self, chain: &str) -> Result<KeyRef, CollaboratorError> {
        self.fixture
            .chain_keys
            .get(chain)
            .cloned()
            .ok_or_else(|| CollaboratorError::NotFound(format!("no key for chain {}", chain)))
    }

    fn signing_key(&self, request: &Request) -> Result<KeyRef, CollaboratorError> {
        let account_id = self.acting_account_id(request)?;
        Self::key_for(&self.fixture.signing_keys, &account_id)
            .or_else(|_| Self::key_for(&self.fixture.active_keys, &account_id))
    }

    fn select_account(&self, account: &Account) -> Result<(), CollaboratorError> {
        if self.account_by_id(&account.account_id).is_none() {
            return Err(CollaboratorError::NotFound(account.account_id.clone()));
        }
        *self.selected.lock().unwrap_or_else(PoisonError::into_inner) =
            Some(account.account_id.clone());
        Ok(())
    }
}
