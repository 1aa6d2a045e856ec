//! Chain identifier to family/adapter lookup

use super::{ChainAdapter, ChainFamily};
use std::collections::HashMap;
use std::sync::Arc;

/// Resolved chain for one request.
#[derive(Clone)]
pub struct ChainHandle {
    pub identifier: String,
    pub family: ChainFamily,
    pub adapter: Arc<dyn ChainAdapter>,
}

impl std::fmt::Debug for ChainHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChainHandle")
            .field("identifier", &self.identifier)
            .field("family", &self.family)
            .finish()
    }
}

#[derive(Clone, Default)]
pub struct ChainRegistry {
    chains: HashMap<String, ChainHandle>,
}

impl ChainRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(
        &mut self,
        identifier: impl Into<String>,
        family: ChainFamily,
        adapter: Arc<dyn ChainAdapter>,
    ) {
        let identifier = identifier.into();
        tracing::debug!(chain = %identifier, family = family.name(), "Registered chain adapter");
        self.chains.insert(
            identifier.clone(),
            ChainHandle {
                identifier,
                family,
                adapter,
            },
        );
    }

    pub fn with_chain(
        mut self,
        identifier: impl Into<String>,
        family: ChainFamily,
        adapter: Arc<dyn ChainAdapter>,
    ) -> Self {
        self.register(identifier, family, adapter);
        self
    }

    pub fn get(&self, identifier: &str) -> Option<ChainHandle> {
        self.chains.get(identifier).cloned()
    }

    pub fn identifiers(&self) -> impl Iterator<Item = &str> {
        self.chains.keys().map(String::as_str)
    }
}
