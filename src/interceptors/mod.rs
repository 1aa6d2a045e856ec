//! Request observers
//!
//! Interceptors see every request as it starts and the terminal envelope it
//! resolves with. They observe only; nothing they do changes an outcome.

mod audit_log;

use crate::envelope::ResultEnvelope;
use crate::request::Request;
use async_trait::async_trait;

pub use audit_log::AuditLogInterceptor;

#[async_trait]
pub trait RequestInterceptor: Send + Sync {
    async fn on_request(&self, request: &Request);

    async fn on_complete(&self, request: &Request, envelope: &ResultEnvelope, duration_ms: u64);
}
