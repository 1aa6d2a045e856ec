//! Sequential stage pipeline
//!
//! Each operation is declared as an ordered list of stages sharing one
//! `StageContext`. The first failing stage short-circuits the rest; its
//! stage-tagged error becomes the request's failure envelope.

pub mod stages;

use crate::approval::{Approval, ApprovalGate};
use crate::chain::{ChainHandle, ChainRegistry};
use crate::error::{ErrorKind, StageError};
use crate::request::Request;
use crate::screening::ScreeningReport;
use crate::ui::{ApprovalUi, MessageVerifier, Notifier};
use crate::wallet::{Account, AccountStore, KeyStore, LinkRecord};
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::debug;

/// External collaborators, injected explicitly.
#[derive(Clone)]
pub struct Collaborators {
    pub accounts: Arc<dyn AccountStore>,
    pub keys: Arc<dyn KeyStore>,
    pub ui: Arc<dyn ApprovalUi>,
    pub notifier: Arc<dyn Notifier>,
    pub verifier: Arc<dyn MessageVerifier>,
    pub chains: ChainRegistry,
}

/// Per-request working state, owned by exactly one pipeline run.
pub struct StageContext {
    pub request: Request,
    pub deps: Collaborators,
    pub gate: Arc<ApprovalGate>,
    pub chain: Option<ChainHandle>,
    pub link: Option<LinkRecord>,
    pub account: Option<Account>,
    pub visualized_params: Option<Value>,
    pub visualized_account: Option<Value>,
    pub screening: Option<ScreeningReport>,
    pub vote_payload: Option<Value>,
    pub transfer_target: Option<String>,
    /// Fields shown to the user at approval time.
    pub display: Map<String, Value>,
    pub approval: Option<Approval>,
    pub output: Option<Value>,
}

impl StageContext {
    pub fn new(request: Request, deps: Collaborators, gate: Arc<ApprovalGate>) -> Self {
        let chain = deps.chains.get(&request.chain);
        Self {
            request,
            deps,
            gate,
            chain,
            link: None,
            account: None,
            visualized_params: None,
            visualized_account: None,
            screening: None,
            vote_payload: None,
            transfer_target: None,
            display: Map::new(),
            approval: None,
            output: None,
        }
    }

    /// Operation name prefixing every stage tag.
    pub fn op(&self) -> &str {
        self.request.kind.stage_name()
    }

    pub fn tag(&self, step: &str) -> String {
        format!("{}.{}", self.op(), step)
    }

    pub fn show(&mut self, field: &str, value: Value) {
        self.display.insert(field.to_string(), value);
    }

    pub fn chain(&self) -> Result<ChainHandle, StageError> {
        self.chain.clone().ok_or_else(|| {
            StageError::validation(
                self.op(),
                format!("unsupported chain: {}", self.request.chain),
            )
        })
    }

    pub fn account(&self) -> Result<&Account, StageError> {
        self.account
            .as_ref()
            .ok_or_else(|| StageError::validation(self.op(), "no account resolved for request"))
    }

    /// Recorded approval; signing stages cannot run without one.
    pub fn approval(&self) -> Result<&Approval, StageError> {
        self.approval
            .as_ref()
            .ok_or_else(|| StageError::validation(self.op(), "request has not been approved"))
    }
}

#[async_trait]
pub trait Stage: Send + Sync {
    fn name(&self) -> &'static str;

    async fn run(&self, ctx: &mut StageContext) -> Result<(), StageError>;
}

#[derive(Default)]
pub struct Pipeline {
    stages: Vec<Box<dyn Stage>>,
}

impl Pipeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stage(mut self, stage: impl Stage + 'static) -> Self {
        self.stages.push(Box::new(stage));
        self
    }

    pub fn stage_names(&self) -> Vec<&'static str> {
        self.stages.iter().map(|stage| stage.name()).collect()
    }

    /// Run every stage in order; the last stage must leave an output.
    pub async fn run(&self, ctx: &mut StageContext) -> Result<Value, StageError> {
        for stage in &self.stages {
            debug!(request_id = %ctx.request.id, stage = stage.name(), "Running stage");
            stage.run(ctx).await?;
        }

        ctx.output
            .take()
            .ok_or_else(|| StageError::new(ErrorKind::EmptyResult, ctx.op(), "no result produced"))
    }
}
