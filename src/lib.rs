//! Request Arbiter
//!
//! Approval-gated request pipeline for a multi-chain wallet. External
//! requesters (web apps, injected scripts) submit requests; each one is
//! validated, visualized, screened against a denylist, shown to the user,
//! and only after explicit approval are keys resolved and transactions signed
//! or broadcast.
//!
//! # Security Model
//!
//! - Key material is only fetched by code holding an `Approval`
//! - Every request resolves with exactly one `ResultEnvelope`
//! - Failures name the stage that produced them
//! - Denylist screening informs the user; it never blocks on its own

pub mod approval;
pub mod arbiter;
pub mod chain;
pub mod config;
pub mod envelope;
pub mod handlers;
pub mod interceptors;
pub mod memory;
pub mod pipeline;
pub mod request;
pub mod screening;
pub mod signing;
pub mod ui;
pub mod visualize;
pub mod wallet;

mod error;

// Re-export commonly used types
pub use approval::{ApprovalGate, Decision, DecisionOutcome};
pub use arbiter::RequestArbiter;
pub use config::{Config, APPROVAL_TIMEOUT_ENV, AUDIT_LOG_ENV};
pub use envelope::ResultEnvelope;
pub use error::{CollaboratorError, Error, ErrorKind, Result, StageError};
pub use pipeline::Collaborators;
pub use request::{Request, RequestId, RequestKind};
