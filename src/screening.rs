//! Denylist screening
//!
//! Extracts account ids from a request (raw and visualized forms), fetches
//! the denylist fresh, and reports whether any counterparty is listed.
//! Screening informs the user; it never denies on its own and never throws.

use crate::chain::{ChainAdapter, ChainFamily};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScreeningReport {
    pub is_blocked_account: bool,
    /// The denylist could not be consulted; the target is unknown, not safe.
    pub screening_unavailable: bool,
    #[serde(skip)]
    pub candidates: Vec<String>,
}

impl ScreeningReport {
    fn unavailable(candidates: Vec<String>) -> Self {
        Self {
            is_blocked_account: false,
            screening_unavailable: true,
            candidates,
        }
    }
}

pub struct DenylistScreener<'a> {
    family: ChainFamily,
    adapter: &'a dyn ChainAdapter,
}

impl<'a> DenylistScreener<'a> {
    pub fn new(family: ChainFamily, adapter: &'a dyn ChainAdapter) -> Self {
        Self { family, adapter }
    }

    /// Screen every account id found in any of `sources`.
    pub async fn screen(&self, sources: &[&Value]) -> ScreeningReport {
        let mut candidates: Vec<String> = Vec::new();
        for source in sources {
            for id in self.family.extract_candidate_ids(source) {
                if !candidates.contains(&id) {
                    candidates.push(id);
                }
            }
        }
        self.check(candidates).await
    }

    /// Screen one already-resolved account id.
    pub async fn screen_target(&self, target_id: &str) -> ScreeningReport {
        self.check(vec![target_id.to_string()]).await
    }

    async fn check(&self, candidates: Vec<String>) -> ScreeningReport {
        if !self.family.supports_denylist() {
            debug!(family = self.family.name(), "No denylist for chain family");
            return ScreeningReport::unavailable(candidates);
        }

        let denylist = match self.adapter.blocked_accounts().await {
            Ok(list) if !list.is_empty() => list,
            Ok(_) => {
                warn!("Denylist fetch returned no entries; treating screening as unavailable");
                return ScreeningReport::unavailable(candidates);
            }
            Err(e) => {
                warn!(error = %e, "Denylist fetch failed; treating screening as unavailable");
                return ScreeningReport::unavailable(candidates);
            }
        };

        let is_blocked_account = candidates.iter().any(|id| denylist.contains(id));
        if is_blocked_account {
            warn!(candidates = ?candidates, "Request references a denylisted account");
        }

        ScreeningReport {
            is_blocked_account,
            screening_unavailable: false,
            candidates,
        }
    }
}
