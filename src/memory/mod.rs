//! In-memory collaborators
//!
//! Backs the `replay` command and the crate's tests. Nothing here talks to a
//! real chain or stores real keys.

mod accounts;
mod chain;
mod fixture;
mod keys;
mod ui;

pub use accounts::{AccountFixture, MemoryAccountStore};
pub use chain::{ChainScript, ScriptedChain};
pub use fixture::{Fixture, MemoryWallet};
pub use keys::MemoryKeyStore;
pub use ui::{ChannelUi, MemoryVerifier, RecordingNotifier};
