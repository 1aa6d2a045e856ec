//! Pipeline stages shared by the operation handlers.
//!
//! Stages before `AwaitApproval` may read account records and render
//! parameters, but never touch key material. Stages after it read the
//! recorded `Approval` and hand it to `resolve_key`.

use super::{Stage, StageContext};
use crate::approval::Rejection;
use crate::chain::{ChainFamily, MemoInput, OperationPlan, TransferOrder};
use crate::error::{ErrorKind, StageError};
use crate::request::Request;
use crate::screening::{DenylistScreener, ScreeningReport};
use crate::signing::{is_empty_result, resolve_key, SigningOrchestrator};
use crate::ui::ApprovalPrompt;
use crate::visualize::visualize;
use crate::wallet::{Account, LinkRef};
use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::{debug, info, warn};

fn display_value<T: serde::Serialize>(stage: &str, value: &T) -> Result<Value, StageError> {
    serde_json::to_value(value).map_err(|e| StageError::validation(stage, e.to_string()))
}

fn show_screening(ctx: &mut StageContext, report: ScreeningReport) {
    ctx.show("isBlockedAccount", json!(report.is_blocked_account));
    ctx.show("screeningUnavailable", json!(report.screening_unavailable));
    ctx.screening = Some(report);
}

/// Fire-and-forget notification built from the request.
pub struct Notify(pub fn(&Request) -> String);

#[async_trait]
impl Stage for Notify {
    fn name(&self) -> &'static str {
        "notify"
    }

    async fn run(&self, ctx: &mut StageContext) -> Result<(), StageError> {
        let message = (self.0)(&ctx.request);
        ctx.deps.notifier.notify_user(&message);
        Ok(())
    }
}

pub struct RequirePayload;

#[async_trait]
impl Stage for RequirePayload {
    fn name(&self) -> &'static str {
        "requirePayload"
    }

    async fn run(&self, ctx: &mut StageContext) -> Result<(), StageError> {
        if ctx.request.has_payload() {
            return Ok(());
        }
        warn!(request_id = %ctx.request.id, "Request arrived without a payload");
        Err(StageError::validation(ctx.op(), "request has no payload"))
    }
}

/// Offer the local accounts for a new link, along with existing links for the app.
pub struct ListAccounts;

#[async_trait]
impl Stage for ListAccounts {
    fn name(&self) -> &'static str {
        "listAccounts"
    }

    async fn run(&self, ctx: &mut StageContext) -> Result<(), StageError> {
        let op = ctx.op().to_string();
        let accounts: Vec<Account> = ctx
            .deps
            .accounts
            .safe_account_list()
            .into_iter()
            .filter(|account| account.chain == ctx.request.chain)
            .collect();
        if accounts.is_empty() {
            warn!(request_id = %ctx.request.id, chain = %ctx.request.chain, "No local accounts to link");
            return Err(StageError::validation(op, "No accounts"));
        }

        let existing = ctx
            .deps
            .accounts
            .existing_links(&LinkRef::from(&ctx.request))
            .map_err(|e| StageError::from_collaborator(ErrorKind::Validation, &op, &e))?;

        let accounts = display_value(&op, &accounts)?;
        let existing = display_value(&op, &existing)?;
        ctx.show("accounts", accounts);
        ctx.show("existingLinks", existing);
        Ok(())
    }
}

/// Resolve the account previously linked to the requesting app.
pub struct RequireLink;

#[async_trait]
impl Stage for RequireLink {
    fn name(&self) -> &'static str {
        "requireLink"
    }

    async fn run(&self, ctx: &mut StageContext) -> Result<(), StageError> {
        let op = ctx.op().to_string();
        let link = match ctx.deps.accounts.find_link(&ctx.request) {
            Some(link) => link,
            None => {
                warn!(request_id = %ctx.request.id, app = %ctx.request.app_name, "No link for app");
                return Err(StageError::validation(op, "No beetApp"));
            }
        };

        let account = ctx
            .deps
            .accounts
            .safe_account(&link)
            .map_err(|e| StageError::from_collaborator(ErrorKind::Validation, &op, &e))?;

        let shown = display_value(&op, &[&account])?;
        ctx.show("accounts", shown);
        ctx.link = Some(link);
        ctx.account = Some(account);
        Ok(())
    }
}

pub struct VisualizeParams;

#[async_trait]
impl Stage for VisualizeParams {
    fn name(&self) -> &'static str {
        "visualizeParams"
    }

    async fn run(&self, ctx: &mut StageContext) -> Result<(), StageError> {
        let chain = ctx.chain()?;
        let rendered = visualize(
            chain.adapter.as_ref(),
            ctx.request.params(),
            ctx.tag("visualizedParams"),
        )
        .await?;

        ctx.show("visualizedParams", rendered.clone());
        ctx.visualized_params = Some(rendered);
        Ok(())
    }
}

/// Render the account that will sign a `requestSignature` payload.
pub struct VisualizeSigner;

#[async_trait]
impl Stage for VisualizeSigner {
    fn name(&self) -> &'static str {
        "visualizeSigner"
    }

    async fn run(&self, ctx: &mut StageContext) -> Result<(), StageError> {
        let chain = ctx.chain()?;
        let stage = ctx.tag("visualizedAccount");
        let rendered = chain
            .family
            .visualize_signer(chain.adapter.as_ref(), &ctx.request.payload)
            .await
            .map_err(|e| StageError::from_collaborator(ErrorKind::Visualization, &stage, &e))?;
        if rendered.is_null() {
            return Err(StageError::new(
                ErrorKind::Visualization,
                stage,
                "signing account could not be rendered",
            ));
        }

        ctx.show("visualizedAccount", rendered.clone());
        ctx.visualized_account = Some(rendered);
        Ok(())
    }
}

/// Screen raw and visualized parameters against the chain denylist.
pub struct ScreenDenylist;

#[async_trait]
impl Stage for ScreenDenylist {
    fn name(&self) -> &'static str {
        "screenDenylist"
    }

    async fn run(&self, ctx: &mut StageContext) -> Result<(), StageError> {
        let chain = ctx.chain()?;
        let visualized = ctx.visualized_params.clone().unwrap_or(Value::Null);
        let report = DenylistScreener::new(chain.family, chain.adapter.as_ref())
            .screen(&[ctx.request.params(), &visualized])
            .await;
        debug!(
            request_id = %ctx.request.id,
            blocked = report.is_blocked_account,
            unavailable = report.screening_unavailable,
            "Screened injected call"
        );

        show_screening(ctx, report);
        Ok(())
    }
}

/// Work out which account an injected operation acts for.
///
/// Graphene consults the operation's `from` field, falling back to the
/// currently selected account; Antelope reads the first action's actor.
pub struct ResolveActingAccount;

#[async_trait]
impl Stage for ResolveActingAccount {
    fn name(&self) -> &'static str {
        "resolveActingAccount"
    }

    async fn run(&self, ctx: &mut StageContext) -> Result<(), StageError> {
        let chain = ctx.chain()?;
        let op = ctx.op().to_string();
        let stage = ctx.tag("visualizedAccount");

        if ctx.visualized_params.is_none() {
            return Err(StageError::new(
                ErrorKind::Visualization,
                ctx.tag("visualizedParams"),
                "parameters were not visualized",
            ));
        }

        let rendered = match chain.family {
            ChainFamily::Graphene => {
                let method = ctx.request.kind.wire_name().to_string();
                let operation = chain
                    .adapter
                    .operation_types()
                    .into_iter()
                    .find(|candidate| candidate.method == method)
                    .ok_or_else(|| {
                        StageError::validation(&op, format!("unknown operation type: {}", method))
                    })?;

                match operation.from.filter(|field| !field.is_empty()) {
                    None => {
                        let account = ctx.deps.accounts.current_safe_account().map_err(|e| {
                            StageError::from_collaborator(ErrorKind::Validation, &op, &e)
                        })?;
                        let name = Value::String(account.account_name.clone());
                        ctx.account = Some(account);
                        name
                    }
                    Some(field) => {
                        let contents = ctx.request.payload.get(&field).cloned().unwrap_or(Value::Null);
                        visualize(chain.adapter.as_ref(), &contents, stage).await?
                    }
                }
            }
            ChainFamily::Antelope => match chain.family.injected_actor(ctx.request.params()) {
                Some(actor) => Value::String(actor),
                None => {
                    return Err(StageError::new(
                        ErrorKind::Visualization,
                        stage,
                        "transaction names no authorizing actor",
                    ))
                }
            },
        };

        ctx.show("visualizedAccount", rendered.clone());
        ctx.visualized_account = Some(rendered);
        Ok(())
    }
}

/// Map a vote into display terms and the payload `getOperation` expects.
pub struct MapVote;

#[async_trait]
impl Stage for MapVote {
    fn name(&self) -> &'static str {
        "mapVote"
    }

    async fn run(&self, ctx: &mut StageContext) -> Result<(), StageError> {
        let chain = ctx.chain()?;
        let op = ctx.op().to_string();
        let account_name = ctx.account()?.account_name.clone();

        let mut payload = ctx.request.payload.clone();
        let Value::Object(fields) = &mut payload else {
            return Err(StageError::validation(op, "vote payload must be an object"));
        };
        fields.insert("action".to_string(), json!("vote"));

        let mapped = chain
            .adapter
            .map_operation_data(&payload)
            .await
            .map_err(|e| StageError::from_collaborator(ErrorKind::Visualization, &op, &e))?;

        let request = &ctx.request;
        let generic = json!({
            "title": "Vote request",
            "message": format!(
                "{} ({}) requests that {} on {} votes for {}",
                request.app_name, request.origin, account_name, chain.identifier, mapped.entity
            ),
            "details": mapped.description,
            "acceptText": "Vote",
            "rejectText": "Reject",
        });
        if let Value::Object(fields) = &mut payload {
            fields.insert("generic".to_string(), generic);
            fields.insert("vote_id".to_string(), mapped.vote_id);
        }

        ctx.show("payload", payload.clone());
        ctx.vote_payload = Some(payload);
        Ok(())
    }
}

/// Transfers are only offered on chains that implement them.
pub struct RequireTransferSupport;

#[async_trait]
impl Stage for RequireTransferSupport {
    fn name(&self) -> &'static str {
        "requireTransferSupport"
    }

    async fn run(&self, ctx: &mut StageContext) -> Result<(), StageError> {
        let chain = ctx.chain()?;
        if chain.family.supports_transfer() {
            return Ok(());
        }
        warn!(request_id = %ctx.request.id, chain = %chain.identifier, "Transfer requested on unsupported chain");
        Err(StageError::validation(
            ctx.op(),
            format!("transfers are not supported on {}", chain.identifier),
        ))
    }
}

/// Resolve the transfer recipient to an account id and format the amount.
pub struct ResolveTransferTarget;

#[async_trait]
impl Stage for ResolveTransferTarget {
    fn name(&self) -> &'static str {
        "resolveTransferTarget"
    }

    async fn run(&self, ctx: &mut StageContext) -> Result<(), StageError> {
        let chain = ctx.chain()?;
        let op = ctx.op().to_string();
        let account_name = ctx.account()?.account_name.clone();
        let params = ctx.request.params();

        let to = params
            .get("to")
            .and_then(Value::as_str)
            .filter(|to| !to.is_empty())
            .ok_or_else(|| StageError::validation(&op, "transfer has no recipient"))?
            .to_string();

        let target = if chain.family.is_account_id(&to) {
            to.clone()
        } else {
            chain.adapter.resolve_account_id(&to).await.map_err(|e| {
                StageError::from_collaborator(ErrorKind::Validation, ctx.tag("resolveTarget"), &e)
            })?
        };

        let amount = params.get("amount").cloned().unwrap_or(Value::Null);
        let to_send = match chain.adapter.format_amount(&amount).await {
            Ok(formatted) if !is_empty_result(&formatted) => formatted,
            Ok(_) => return Err(StageError::new(ErrorKind::Visualization, op, "No toSend")),
            Err(e) => {
                return Err(StageError::from_collaborator(ErrorKind::Visualization, op, &e))
            }
        };

        ctx.show("chain", json!(chain.identifier));
        ctx.show("accountName", json!(account_name));
        ctx.show("toSend", to_send);
        ctx.show("target", json!(target));
        if target != to {
            ctx.show("targetName", json!(to));
        }
        ctx.transfer_target = Some(target);
        Ok(())
    }
}

/// Screen a single resolved recipient against the denylist.
pub struct ScreenTarget;

#[async_trait]
impl Stage for ScreenTarget {
    fn name(&self) -> &'static str {
        "screenTarget"
    }

    async fn run(&self, ctx: &mut StageContext) -> Result<(), StageError> {
        let chain = ctx.chain()?;
        let target = ctx
            .transfer_target
            .clone()
            .ok_or_else(|| StageError::validation(ctx.op(), "transfer recipient was not resolved"))?;

        let report = DenylistScreener::new(chain.family, chain.adapter.as_ref())
            .screen_target(&target)
            .await;
        show_screening(ctx, report);
        Ok(())
    }
}

/// Present the prompt and suspend until the user decides.
pub struct AwaitApproval {
    reject_suffix: &'static str,
}

impl AwaitApproval {
    pub fn new() -> Self {
        Self { reject_suffix: "" }
    }

    /// Tag rejections `<op><suffix>` instead of `<op>`.
    pub fn rejecting_as(reject_suffix: &'static str) -> Self {
        Self { reject_suffix }
    }
}

impl Default for AwaitApproval {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Stage for AwaitApproval {
    fn name(&self) -> &'static str {
        "awaitApproval"
    }

    async fn run(&self, ctx: &mut StageContext) -> Result<(), StageError> {
        let op = ctx.op().to_string();
        let ticket = ctx
            .gate
            .register(ctx.request.id.clone())
            .map_err(|e| StageError::validation(&op, e.to_string()))?;

        let prompt = ApprovalPrompt {
            request: ctx.request.clone(),
            display: ctx.display.clone(),
        };
        ctx.gate
            .present(&ticket, ctx.deps.ui.as_ref(), &prompt)
            .map_err(|e| StageError::validation(&op, e.to_string()))?;

        match ticket.wait().await {
            Ok(approval) => {
                info!(request_id = %ctx.request.id, operation = %op, "Request approved");
                ctx.approval = Some(approval);
                Ok(())
            }
            Err(Rejection::Rejected(reason)) => {
                info!(request_id = %ctx.request.id, operation = %op, "Request rejected");
                Err(StageError::rejected(
                    format!("{}{}", op, self.reject_suffix),
                    reason,
                ))
            }
            Err(Rejection::Expired) => Err(StageError::rejected(
                ctx.tag("timeout"),
                json!("approval timed out"),
            )),
        }
    }
}

/// Record the account the user chose for a new link.
pub struct RecordLink;

#[async_trait]
impl Stage for RecordLink {
    fn name(&self) -> &'static str {
        "recordLink"
    }

    async fn run(&self, ctx: &mut StageContext) -> Result<(), StageError> {
        let op = ctx.op().to_string();
        let payload = ctx.approval()?.payload();
        let chosen: Account = serde_json::from_value(payload.clone())
            .or_else(|_| serde_json::from_value(payload.get("result").cloned().unwrap_or_default()))
            .map_err(|_| StageError::validation(&op, "approval did not name an account"))?;

        if chosen.chain != ctx.request.chain {
            warn!(
                request_id = %ctx.request.id,
                account = %chosen.account_id,
                chain = %chosen.chain,
                "Approved account belongs to another chain"
            );
            return Err(StageError::validation(op, "approved account is on another chain"));
        }

        let is_local = ctx
            .deps
            .accounts
            .safe_account_list()
            .iter()
            .any(|account| account.account_id == chosen.account_id && account.chain == chosen.chain);
        if !is_local {
            warn!(request_id = %ctx.request.id, account = %chosen.account_id, "Approved account is not local");
            return Err(StageError::validation(op, "approved account is not a local account"));
        }

        ctx.deps
            .accounts
            .select_account(&chosen)
            .map_err(|e| StageError::from_collaborator(ErrorKind::Validation, &op, &e))?;

        info!(request_id = %ctx.request.id, account = %chosen.account_name, "Account linked");
        ctx.output = Some(chosen.identity());
        Ok(())
    }
}

/// Disclose the linked account's public identity.
pub struct DiscloseAccount;

#[async_trait]
impl Stage for DiscloseAccount {
    fn name(&self) -> &'static str {
        "discloseAccount"
    }

    async fn run(&self, ctx: &mut StageContext) -> Result<(), StageError> {
        let identity = ctx.account()?.identity();
        ctx.output = Some(identity);
        Ok(())
    }
}

/// Sign, sign-and-broadcast, or broadcast an approved transaction.
pub struct SignTransaction {
    pub attach_memo: bool,
    pub receipts: bool,
}

#[async_trait]
impl Stage for SignTransaction {
    fn name(&self) -> &'static str {
        "signTransaction"
    }

    async fn run(&self, ctx: &mut StageContext) -> Result<(), StageError> {
        let chain = ctx.chain()?;
        let approval = ctx.approval()?;
        let orchestrator = SigningOrchestrator {
            chain: &chain,
            accounts: ctx.deps.accounts.as_ref(),
            keys: ctx.deps.keys.as_ref(),
            ui: ctx.deps.ui.as_ref(),
            notifier: ctx.deps.notifier.as_ref(),
        };

        let request = if self.attach_memo {
            orchestrator.attach_memo(&ctx.request, ctx.op()).await?
        } else {
            ctx.request.clone()
        };
        let receipt = (self.receipts && approval.wants_receipt()).then(|| {
            json!({
                "visualizedAccount": ctx.visualized_account,
                "visualizedParams": ctx.visualized_params,
            })
        });

        let result = orchestrator.execute(approval, &request, receipt).await?;
        ctx.output = Some(result);
        Ok(())
    }
}

/// Turn an approved vote into an operation, then sign and broadcast it.
pub struct CastVote;

#[async_trait]
impl Stage for CastVote {
    fn name(&self) -> &'static str {
        "castVote"
    }

    async fn run(&self, ctx: &mut StageContext) -> Result<(), StageError> {
        let chain = ctx.chain()?;
        let approval = ctx.approval()?;
        let account = ctx.account()?;
        let payload = ctx.vote_payload.as_ref().unwrap_or(&ctx.request.payload);

        let plan = chain
            .adapter
            .get_operation(payload, account)
            .await
            .map_err(|e| {
                StageError::from_collaborator(ErrorKind::Validation, ctx.tag("getOperation"), &e)
            })?;

        let operation = match plan {
            OperationPlan::Operation(operation) => operation,
            OperationPlan::NothingToDo => {
                info!(request_id = %ctx.request.id, "Vote already cast; nothing to sign");
                let identity = account.identity();
                ctx.output = Some(identity);
                return Ok(());
            }
        };

        let key_ref = ctx.deps.accounts.active_key(&ctx.request).map_err(|e| {
            StageError::from_collaborator(ErrorKind::KeyResolution, ctx.tag("getActiveKey"), &e)
        })?;
        let key = resolve_key(ctx.deps.keys.as_ref(), approval, &key_ref, ctx.tag("getKey")).await?;

        let signed = chain.adapter.sign(&operation, &key).await.map_err(|e| {
            StageError::from_collaborator(ErrorKind::Signing, ctx.tag("sign"), &e)
        })?;
        drop(key);

        let result = chain.adapter.broadcast(&signed).await.map_err(|e| {
            StageError::from_collaborator(ErrorKind::Broadcast, ctx.tag("broadcast"), &e)
        })?;
        if is_empty_result(&result) {
            return Err(StageError::new(
                ErrorKind::EmptyResult,
                ctx.tag("broadcast"),
                "no broadcast",
            ));
        }

        ctx.deps.notifier.notify_user("Vote broadcast");
        ctx.output = Some(result);
        Ok(())
    }
}

pub struct SignNft;

#[async_trait]
impl Stage for SignNft {
    fn name(&self) -> &'static str {
        "signNft"
    }

    async fn run(&self, ctx: &mut StageContext) -> Result<(), StageError> {
        let chain = ctx.chain()?;
        let approval = ctx.approval()?;
        let key_ref = ctx.deps.accounts.signing_key(&ctx.request).map_err(|e| {
            StageError::from_collaborator(ErrorKind::KeyResolution, ctx.tag("getSigningKey"), &e)
        })?;
        let key = resolve_key(ctx.deps.keys.as_ref(), approval, &key_ref, ctx.tag("getKey")).await?;

        let result = chain
            .adapter
            .sign_nft(&key, ctx.request.params())
            .await
            .map_err(|e| StageError::from_collaborator(ErrorKind::Signing, "blockchain.signNFT", &e))?;
        if is_empty_result(&result) {
            return Err(StageError::new(
                ErrorKind::EmptyResult,
                "blockchain.signNFT",
                "No signed NFT",
            ));
        }

        ctx.output = Some(result);
        Ok(())
    }
}

pub struct SignMessage;

#[async_trait]
impl Stage for SignMessage {
    fn name(&self) -> &'static str {
        "signMessage"
    }

    async fn run(&self, ctx: &mut StageContext) -> Result<(), StageError> {
        let chain = ctx.chain()?;
        let approval = ctx.approval()?;
        let account_name = ctx.account()?.account_name.clone();
        let key_ref = ctx.deps.accounts.signing_key(&ctx.request).map_err(|e| {
            StageError::from_collaborator(ErrorKind::KeyResolution, ctx.tag("getSigningKey"), &e)
        })?;
        let key = resolve_key(ctx.deps.keys.as_ref(), approval, &key_ref, ctx.tag("getKey")).await?;

        let result = chain
            .adapter
            .sign_message(&key, &account_name, ctx.request.params())
            .await
            .map_err(|e| {
                StageError::from_collaborator(ErrorKind::Signing, "blockchain.signMessage", &e)
            })?;
        if is_empty_result(&result) {
            return Err(StageError::new(
                ErrorKind::EmptyResult,
                "blockchain.signMessage",
                "No signed message",
            ));
        }

        ctx.output = Some(result);
        Ok(())
    }
}

/// Execute an approved transfer, encrypting the memo when one is given.
pub struct Transfer;

#[async_trait]
impl Stage for Transfer {
    fn name(&self) -> &'static str {
        "transfer"
    }

    async fn run(&self, ctx: &mut StageContext) -> Result<(), StageError> {
        let chain = ctx.chain()?;
        let approval = ctx.approval()?;
        let account = ctx.account()?;
        let keys = ctx.deps.keys.as_ref();
        let params = ctx.request.params();

        let key_ref = ctx.deps.accounts.active_key(&ctx.request).map_err(|e| {
            StageError::from_collaborator(ErrorKind::KeyResolution, ctx.tag("getActiveKey"), &e)
        })?;
        let key = resolve_key(keys, approval, &key_ref, ctx.tag("getKey")).await?;

        let memo = match params.get("memo").and_then(Value::as_str) {
            Some(memo) if !memo.is_empty() => {
                let memo_key_ref = account.memo_key.as_ref().ok_or_else(|| {
                    StageError::new(
                        ErrorKind::KeyResolution,
                        ctx.tag("getMemoKey"),
                        "account has no memo key",
                    )
                })?;
                let memo_key = resolve_key(keys, approval, memo_key_ref, ctx.tag("getMemoKey")).await?;
                Some(MemoInput {
                    key: memo_key,
                    memo: memo.to_string(),
                })
            }
            _ => None,
        };

        let amount = params.get("amount").cloned().unwrap_or_default();
        let order = TransferOrder {
            from: account.account_name.clone(),
            to: params
                .get("to")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            amount: amount
                .get("amount")
                .or_else(|| amount.get("satoshis"))
                .cloned()
                .unwrap_or_default(),
            asset_id: amount.get("asset_id").cloned().unwrap_or_default(),
            memo,
            nonce: params.get("optionalNonce").cloned(),
            encrypt: params.get("encryptMemo").and_then(Value::as_bool),
        };

        let result = chain.adapter.transfer(&key, order).await.map_err(|e| {
            StageError::from_collaborator(ErrorKind::Signing, "blockchain.transfer", &e)
        })?;
        drop(key);
        if is_empty_result(&result) {
            return Err(StageError::new(
                ErrorKind::EmptyResult,
                "blockchain.transfer",
                "No blockchain transfer result",
            ));
        }

        info!(request_id = %ctx.request.id, "Transfer completed");
        ctx.deps.notifier.notify_user("Transfer completed");
        ctx.output = Some(result);
        Ok(())
    }
}

/// Delegate signature verification. Read-only; needs no approval.
pub struct VerifyMessage;

#[async_trait]
impl Stage for VerifyMessage {
    fn name(&self) -> &'static str {
        "verifyMessage"
    }

    async fn run(&self, ctx: &mut StageContext) -> Result<(), StageError> {
        let result = ctx
            .deps
            .verifier
            .verify_message(&ctx.request)
            .await
            .map_err(|e| {
                StageError::from_collaborator(ErrorKind::Validation, "blockchain.verifyMessage", &e)
            })?;
        if is_empty_result(&result) {
            return Err(StageError::new(
                ErrorKind::EmptyResult,
                "blockchain.verifyMessage",
                "No blockchain request",
            ));
        }

        ctx.output = Some(result);
        Ok(())
    }
}
