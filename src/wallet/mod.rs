//! Local wallet state consumed by the pipeline
//!
//! Accounts, app links and key references are owned by an external store;
//! key material is owned by an external key store. This module only defines
//! the narrow accessors the pipeline reads through.

mod keys;
mod store;

pub use keys::{KeyMaterial, KeyStore};
pub use store::{Account, AccountStore, KeyRef, LinkRecord, LinkRef};
