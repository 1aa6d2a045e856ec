//! Request arbiter
//!
//! Entry point for every external request: selects the operation pipeline,
//! runs it, and turns the outcome into exactly one result envelope.

use crate::approval::{ApprovalGate, Decision, DecisionOutcome};
use crate::config::Config;
use crate::envelope::ResultEnvelope;
use crate::handlers::pipeline_for;
use crate::interceptors::RequestInterceptor;
use crate::pipeline::{Collaborators, StageContext};
use crate::request::{Request, RequestId};
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, info_span, warn, Instrument};

pub struct RequestArbiter {
    deps: Collaborators,
    gate: Arc<ApprovalGate>,
    interceptors: Vec<Arc<dyn RequestInterceptor>>,
}

impl RequestArbiter {
    pub fn new(deps: Collaborators, config: &Config) -> Self {
        Self {
            deps,
            gate: Arc::new(ApprovalGate::new(config.approval.timeout())),
            interceptors: Vec::new(),
        }
    }

    pub fn with_interceptor(mut self, interceptor: Arc<dyn RequestInterceptor>) -> Self {
        self.interceptors.push(interceptor);
        self
    }

    pub fn gate(&self) -> &Arc<ApprovalGate> {
        &self.gate
    }

    /// Deliver a UI decision to the request waiting on `id`.
    pub fn decide(&self, id: &RequestId, decision: Decision) -> DecisionOutcome {
        self.gate.decide(id, decision)
    }

    pub fn cancel(&self, id: &RequestId) -> bool {
        self.gate.cancel(id)
    }

    /// Run one request to its terminal envelope. Never panics on collaborator failure.
    pub async fn handle(&self, request: Request) -> ResultEnvelope {
        let started = Instant::now();
        for interceptor in &self.interceptors {
            interceptor.on_request(&request).await;
        }

        let span = info_span!(
            "request",
            id = %request.id,
            kind = %request.kind,
            chain = %request.chain
        );
        let pipeline = pipeline_for(&request.kind);
        let mut ctx = StageContext::new(request.clone(), self.deps.clone(), Arc::clone(&self.gate));
        let outcome = pipeline.run(&mut ctx).instrument(span).await;

        let envelope = match outcome {
            Ok(result) => {
                info!(request_id = %request.id, kind = %request.kind, "Request resolved");
                ResultEnvelope::success(request.id.clone(), result)
            }
            Err(error) => {
                warn!(
                    request_id = %request.id,
                    kind = ?error.kind,
                    stage = %error.stage,
                    "Request failed"
                );
                ResultEnvelope::failure(request.id.clone(), &error)
            }
        };

        let duration_ms = started.elapsed().as_millis() as u64;
        for interceptor in &self.interceptors {
            interceptor.on_complete(&request, &envelope, duration_ms).await;
        }
        envelope
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interceptors::AuditLogInterceptor;
    use crate::memory::{AccountFixture, MemoryKeyStore, MemoryVerifier, MemoryWallet, ScriptedChain};
    use crate::request::RequestKind;
    use crate::ui::ApprovalPrompt;
    use crate::wallet::{Account, KeyRef, LinkRecord, LinkRef};
    use serde_json::{json, Value};
    use tokio::sync::mpsc::UnboundedReceiver;

    const APP: &str = "dex";
    const ORIGIN: &str = "https://dex.example";

    fn account(name: &str, id: &str, chain: &str, memo_key: Option<&str>) -> Account {
        Account {
            account_name: name.to_string(),
            account_id: id.to_string(),
            chain: chain.to_string(),
            memo_key: memo_key.map(KeyRef::new),
        }
    }

    fn link(chain: &str, account_id: &str) -> LinkRecord {
        LinkRecord {
            link: LinkRef {
                app_name: APP.to_string(),
                origin: ORIGIN.to_string(),
                chain: chain.to_string(),
            },
            account_id: account_id.to_string(),
        }
    }

    fn accounts() -> AccountFixture {
        AccountFixture {
            accounts: vec![
                account("alice", "1.2.5", "BTS", Some("alice-memo")),
                account("bobeos", "bobeos", "EOS", None),
            ],
            links: vec![link("BTS", "1.2.5"), link("EOS", "bobeos")],
            active_keys: [("1.2.5".to_string(), KeyRef::new("alice-active"))]
                .into_iter()
                .collect(),
            chain_keys: [("EOS".to_string(), KeyRef::new("eos-key"))]
                .into_iter()
                .collect(),
            ..AccountFixture::default()
        }
    }

    fn keys() -> MemoryKeyStore {
        MemoryKeyStore::default()
            .with_key("alice-active", "5Kalice")
            .with_key("alice-memo", "5Kmemo")
            .with_key("eos-key", "5Keos")
    }

    fn setup(
        accounts: AccountFixture,
        keys: MemoryKeyStore,
        chain: ScriptedChain,
        config: &Config,
    ) -> (RequestArbiter, MemoryWallet, UnboundedReceiver<ApprovalPrompt>) {
        let (wallet, prompts) = MemoryWallet::from_parts(accounts, keys, chain, config);
        let arbiter = RequestArbiter::new(wallet.collaborators(), config);
        (arbiter, wallet, prompts)
    }

    fn standard(chain: ScriptedChain) -> (RequestArbiter, MemoryWallet, UnboundedReceiver<ApprovalPrompt>) {
        setup(accounts(), keys(), chain, &Config::default())
    }

    fn request(id: &str, kind: RequestKind, chain: &str, payload: Value) -> Request {
        Request::new(id, kind, chain, payload).with_app(APP, ORIGIN)
    }

    async fn answer(
        gate: &ApprovalGate,
        prompts: &mut UnboundedReceiver<ApprovalPrompt>,
        decision: Decision,
    ) -> ApprovalPrompt {
        let prompt = prompts.recv().await.expect("approval prompt");
        assert_eq!(
            gate.decide(&prompt.request.id, decision),
            DecisionOutcome::Delivered
        );
        prompt
    }

    fn failure(envelope: &ResultEnvelope) -> (String, Value) {
        let value = serde_json::to_value(envelope).unwrap();
        assert_eq!(value["result"]["isError"], json!(true), "{value}");
        (
            value["result"]["method"].as_str().unwrap().to_string(),
            value["result"]["error"].clone(),
        )
    }

    fn transfer_payload(to: &str, memo: Option<&str>) -> Value {
        let mut params = json!({
            "to": to,
            "amount": {"amount": 100000, "asset_id": "1.3.0"}
        });
        if let Some(memo) = memo {
            params["memo"] = json!(memo);
        }
        json!({ "params": params })
    }

    #[tokio::test]
    async fn visualization_failure_never_reaches_the_user() {
        let (arbiter, wallet, mut prompts) = standard(ScriptedChain::new().failing("visualize"));
        let req = request(
            "sig-1",
            RequestKind::RequestSignature,
            "BTS",
            json!({"params": ["signAndBroadcast", {"fee": 1}], "account_id": "1.2.5"}),
        );

        let envelope = arbiter.handle(req).await;
        let (method, _) = failure(&envelope);
        assert_eq!(method, "requestSignature.visualizedParams");
        assert!(prompts.try_recv().is_err());
        assert!(wallet.keys.requested().is_empty());
        assert!(!wallet.chain.was_called("sign"));
    }

    #[tokio::test]
    async fn request_signature_signs_and_broadcasts_after_approval() {
        let (arbiter, wallet, mut prompts) = standard(ScriptedChain::new());
        let req = request(
            "sig-2",
            RequestKind::RequestSignature,
            "BTS",
            json!({"params": ["signAndBroadcast", {"fee": 1}], "account_id": "1.2.5"}),
        );

        let (envelope, prompt) = tokio::join!(
            arbiter.handle(req),
            answer(arbiter.gate(), &mut prompts, Decision::approve(json!({})))
        );

        assert!(prompt.field("visualizedParams").is_some());
        assert_eq!(prompt.field("visualizedAccount"), Some(&json!({"display": "1.2.5"})));
        let result = envelope.success_value().expect("success");
        assert!(result["id"].is_string());
        assert_eq!(wallet.keys.requested(), vec![KeyRef::new("alice-active")]);
        assert!(wallet
            .notifier
            .messages()
            .iter()
            .any(|m| m == crate::signing::NOTIFY_SIGN_AND_BROADCAST));
    }

    #[tokio::test]
    async fn nft_key_failure_is_tagged_and_skips_signing() {
        let keys = MemoryKeyStore::default();
        let (arbiter, wallet, mut prompts) =
            setup(accounts(), keys, ScriptedChain::new(), &Config::default());
        let req = request("nft-1", RequestKind::SignNft, "BTS", json!({"params": {"nft": 1}}));

        let (envelope, _) = tokio::join!(
            arbiter.handle(req),
            answer(arbiter.gate(), &mut prompts, Decision::approve(json!({})))
        );

        let (method, _) = failure(&envelope);
        assert_eq!(method, "signNFT.getKey");
        assert!(!wallet.chain.was_called("sign_nft"));
    }

    #[tokio::test]
    async fn nft_rejection_uses_reject_tag() {
        let (arbiter, _wallet, mut prompts) = standard(ScriptedChain::new());
        let req = request("nft-2", RequestKind::SignNft, "BTS", json!({"params": {"nft": 1}}));

        let (envelope, _) = tokio::join!(
            arbiter.handle(req),
            answer(arbiter.gate(), &mut prompts, Decision::reject(json!("no thanks")))
        );

        assert_eq!(failure(&envelope), ("signNFT.reject".to_string(), json!("no thanks")));
    }

    #[tokio::test]
    async fn vote_with_nothing_to_do_returns_identity_without_keys() {
        let (arbiter, wallet, mut prompts) = standard(ScriptedChain::new().with_nothing_to_do());
        let req = request("vote-1", RequestKind::VoteFor, "BTS", json!({"params": {"id": "init0"}}));

        let (envelope, prompt) = tokio::join!(
            arbiter.handle(req),
            answer(arbiter.gate(), &mut prompts, Decision::approve(json!({})))
        );

        assert_eq!(prompt.field("payload").unwrap()["vote_id"], json!("1:init0"));
        assert_eq!(
            envelope.success_value(),
            Some(&json!({"name": "alice", "chain": "BTS", "id": "1.2.5"}))
        );
        assert!(wallet.keys.requested().is_empty());
        assert!(!wallet.chain.was_called("sign"));
    }

    #[tokio::test]
    async fn vote_broadcasts_mapped_operation() {
        let (arbiter, wallet, mut prompts) = standard(ScriptedChain::new());
        let req = request("vote-2", RequestKind::VoteFor, "BTS", json!({"params": {"id": "init0"}}));

        let (envelope, _) = tokio::join!(
            arbiter.handle(req),
            answer(arbiter.gate(), &mut prompts, Decision::approve(json!({})))
        );

        let result = envelope.success_value().expect("success");
        assert_eq!(result["trx"]["transaction"]["votes"], json!(["1:init0"]));
        assert!(wallet.chain.was_called("broadcast"));
    }

    #[tokio::test]
    async fn transfer_to_blocked_account_is_flagged_but_proceeds() {
        let chain = ScriptedChain::new().with_blocked(Some(vec!["1.2.100"]));
        let (arbiter, wallet, mut prompts) = standard(chain);
        let req = request("tx-1", RequestKind::Transfer, "BTS", transfer_payload("1.2.100", None));

        let (envelope, prompt) = tokio::join!(
            arbiter.handle(req),
            answer(arbiter.gate(), &mut prompts, Decision::approve(json!({})))
        );

        assert_eq!(prompt.field("isBlockedAccount"), Some(&json!(true)));
        assert_eq!(prompt.field("screeningUnavailable"), Some(&json!(false)));
        assert_eq!(prompt.field("toSend"), Some(&json!("100000 1.3.0")));
        assert!(!envelope.is_error());
        assert!(wallet.chain.was_called("transfer"));
    }

    #[tokio::test]
    async fn transfer_by_name_resolves_target_before_screening() {
        let chain = ScriptedChain::new()
            .with_blocked(Some(vec!["1.2.100"]))
            .with_name("mallory", "1.2.100");
        let (arbiter, _wallet, mut prompts) = standard(chain);
        let req = request("tx-2", RequestKind::Transfer, "BTS", transfer_payload("mallory", None));

        let (_, prompt) = tokio::join!(
            arbiter.handle(req),
            answer(arbiter.gate(), &mut prompts, Decision::reject(json!("nope")))
        );
        assert_eq!(prompt.field("isBlockedAccount"), Some(&json!(true)));
        assert_eq!(prompt.field("target"), Some(&json!("1.2.100")));
        assert_eq!(prompt.field("targetName"), Some(&json!("mallory")));
    }

    #[tokio::test]
    async fn keys_are_not_requested_before_approval() {
        let (arbiter, wallet, mut prompts) = standard(ScriptedChain::new());
        let req = request(
            "tx-3",
            RequestKind::Transfer,
            "BTS",
            transfer_payload("1.2.9", Some("rent")),
        );

        let keys = wallet.keys.clone();
        let responder = async {
            let prompt = prompts.recv().await.expect("prompt");
            assert!(keys.requested().is_empty());
            arbiter.decide(&prompt.request.id, Decision::approve(json!({})));
        };
        let (envelope, _) = tokio::join!(arbiter.handle(req), responder);

        assert!(!envelope.is_error());
        assert_eq!(
            wallet.keys.requested(),
            vec![KeyRef::new("alice-active"), KeyRef::new("alice-memo")]
        );
        assert_eq!(envelope.success_value().unwrap()["operation"]["memo"], json!("rent"));
    }

    #[tokio::test]
    async fn transfer_memo_without_memo_key_fails() {
        let mut wallet_accounts = accounts();
        wallet_accounts.accounts[0].memo_key = None;
        let (arbiter, _wallet, mut prompts) =
            setup(wallet_accounts, keys(), ScriptedChain::new(), &Config::default());
        let req = request("tx-4", RequestKind::Transfer, "BTS", transfer_payload("1.2.9", Some("x")));

        let (envelope, _) = tokio::join!(
            arbiter.handle(req),
            answer(arbiter.gate(), &mut prompts, Decision::approve(json!({})))
        );
        assert_eq!(failure(&envelope).0, "transfer.getMemoKey");
    }

    #[tokio::test]
    async fn transfer_is_refused_on_chains_without_transfers() {
        let (arbiter, _wallet, mut prompts) = standard(ScriptedChain::new());
        let req = request("tx-5", RequestKind::Transfer, "EOS", transfer_payload("bob", None));

        let envelope = arbiter.handle(req).await;
        assert_eq!(failure(&envelope).0, "transfer");
        assert!(prompts.try_recv().is_err());
    }

    #[tokio::test]
    async fn injected_issue_carries_encrypted_memo_and_receipt() {
        let (arbiter, wallet, mut prompts) = standard(ScriptedChain::new());
        let req = request(
            "inj-1",
            RequestKind::InjectedCall("asset_issue".to_string()),
            "BTS",
            json!({
                "params": {"issuer": "1.2.5", "issue_to_account": "1.2.9", "asset_to_issue": {"amount": 5}},
                "issuer": "1.2.5",
                "issue_to_account": "1.2.9",
                "memo": "welcome"
            }),
        );

        let (envelope, prompt) = tokio::join!(
            arbiter.handle(req),
            answer(arbiter.gate(), &mut prompts, Decision::approve(json!({"receipt": true})))
        );

        assert_eq!(prompt.field("visualizedAccount"), Some(&json!({"display": "1.2.5"})));
        let memo = &envelope.success_value().expect("success")["trx"]["transaction"]["memo"];
        assert_eq!(memo["from"], json!("1.2.5"));
        assert_eq!(memo["to"], json!("1.2.9"));
        assert!(wallet.chain.was_called("create_memo_object"));
        assert_eq!(wallet.ui.receipts().len(), 1);
    }

    #[tokio::test]
    async fn injected_call_screens_both_parameter_forms() {
        let chain = ScriptedChain::new().with_blocked(Some(vec!["1.2.9"]));
        let (arbiter, _wallet, mut prompts) = standard(chain);
        let req = request(
            "inj-2",
            RequestKind::InjectedCall("limit_order_create".to_string()),
            "BTS",
            json!({"params": {"seller": "1.2.5", "receiver": "1.2.9"}, "seller": "1.2.5"}),
        );

        let (_, prompt) = tokio::join!(
            arbiter.handle(req),
            answer(arbiter.gate(), &mut prompts, Decision::reject(json!("no")))
        );
        assert_eq!(prompt.field("isBlockedAccount"), Some(&json!(true)));
    }

    #[tokio::test]
    async fn receipt_failure_does_not_fail_the_request() {
        let (arbiter, wallet, mut prompts) = standard(ScriptedChain::new());
        wallet.ui.set_failing_receipts(true);
        let req = request(
            "inj-3",
            RequestKind::InjectedCall("custom".to_string()),
            "BTS",
            json!({"params": {"id": 1}}),
        );

        let (envelope, _) = tokio::join!(
            arbiter.handle(req),
            answer(arbiter.gate(), &mut prompts, Decision::approve(json!({"result": {"receipt": true}})))
        );
        assert!(!envelope.is_error());
        assert!(wallet.ui.receipts().is_empty());
    }

    #[tokio::test]
    async fn antelope_signature_uses_chain_key_and_actor() {
        let (arbiter, wallet, mut prompts) = standard(ScriptedChain::new());
        let raw = r#"{"actions":[{"authorization":[{"actor":"bobeos"}]}]}"#;
        let req = request(
            "eos-1",
            RequestKind::RequestSignature,
            "EOS",
            json!({"params": ["sign", raw], "authorization": [{"actor": "bobeos"}]}),
        );

        let (envelope, prompt) = tokio::join!(
            arbiter.handle(req),
            answer(arbiter.gate(), &mut prompts, Decision::approve(json!({})))
        );

        assert_eq!(prompt.field("visualizedAccount"), Some(&json!("bobeos")));
        let result = envelope.success_value().expect("success");
        assert_eq!(result["transaction"]["actions"][0]["authorization"][0]["actor"], json!("bobeos"));
        assert_eq!(wallet.keys.requested(), vec![KeyRef::new("eos-key")]);
        assert!(!wallet.chain.was_called("broadcast"));
    }

    #[tokio::test]
    async fn rejection_produces_error_envelope() {
        let (arbiter, _wallet, mut prompts) = standard(ScriptedChain::new());
        let req = request("acct-1", RequestKind::GetAccount, "BTS", Value::Null);

        let (envelope, _) = tokio::join!(
            arbiter.handle(req),
            answer(arbiter.gate(), &mut prompts, Decision::reject(json!("denied")))
        );

        assert_eq!(
            serde_json::to_value(&envelope).unwrap(),
            json!({
                "id": "acct-1",
                "result": {"isError": true, "method": "getAccount", "error": "denied"}
            })
        );
    }

    #[tokio::test]
    async fn get_account_without_link_fails_fast() {
        let (arbiter, _wallet, mut prompts) = standard(ScriptedChain::new());
        let req = Request::new("acct-2", RequestKind::GetAccount, "BTS", Value::Null)
            .with_app("stranger", "https://stranger.example");

        let envelope = arbiter.handle(req).await;
        assert_eq!(failure(&envelope), ("getAccount".to_string(), json!("No beetApp")));
        assert!(prompts.try_recv().is_err());
    }

    #[tokio::test]
    async fn link_without_accounts_fails_fast() {
        let (arbiter, _wallet, _prompts) = setup(
            AccountFixture::default(),
            keys(),
            ScriptedChain::new(),
            &Config::default(),
        );
        let req = request("link-1", RequestKind::Link, "BTS", Value::Null);

        let envelope = arbiter.handle(req).await;
        assert_eq!(failure(&envelope), ("REQUEST_LINK".to_string(), json!("No accounts")));
    }

    #[tokio::test]
    async fn link_records_chosen_account() {
        let (arbiter, wallet, mut prompts) = standard(ScriptedChain::new());
        let req = request("link-2", RequestKind::Link, "BTS", Value::Null);
        let chosen = json!({"accountName": "alice", "accountID": "1.2.5", "chain": "BTS"});

        let (envelope, prompt) = tokio::join!(
            arbiter.handle(req),
            answer(arbiter.gate(), &mut prompts, Decision::approve(chosen))
        );

        assert_eq!(prompt.field("existingLinks").unwrap().as_array().unwrap().len(), 1);
        assert_eq!(envelope.success_value().unwrap()["id"], json!("1.2.5"));
        assert_eq!(wallet.accounts.selected().as_deref(), Some("1.2.5"));
    }

    #[tokio::test]
    async fn link_refuses_unknown_account() {
        let (arbiter, _wallet, mut prompts) = standard(ScriptedChain::new());
        let req = request("link-3", RequestKind::Link, "BTS", Value::Null);
        let forged = json!({"accountName": "eve", "accountID": "1.2.666", "chain": "BTS"});

        let (envelope, _) = tokio::join!(
            arbiter.handle(req),
            answer(arbiter.gate(), &mut prompts, Decision::approve(forged))
        );
        assert_eq!(failure(&envelope).0, "REQUEST_LINK");
    }

    #[tokio::test]
    async fn link_refuses_account_from_another_chain() {
        let (arbiter, wallet, mut prompts) = standard(ScriptedChain::new());
        let req = request("link-4", RequestKind::Link, "BTS", Value::Null);
        let other_chain = json!({"accountName": "bobeos", "accountID": "bobeos", "chain": "EOS"});

        let (envelope, prompt) = tokio::join!(
            arbiter.handle(req),
            answer(arbiter.gate(), &mut prompts, Decision::approve(other_chain))
        );

        let offered = prompt.field("accounts").unwrap().as_array().unwrap();
        assert_eq!(offered.len(), 1);
        assert_eq!(offered[0]["chain"], json!("BTS"));
        assert_eq!(failure(&envelope).0, "REQUEST_LINK");
        assert_eq!(wallet.accounts.selected(), None);
    }

    #[tokio::test]
    async fn link_without_accounts_on_the_requested_chain_fails_fast() {
        let (arbiter, _wallet, mut prompts) = standard(ScriptedChain::new());
        let req = request("link-5", RequestKind::Link, "TLOS", Value::Null);

        let envelope = arbiter.handle(req).await;
        assert_eq!(failure(&envelope), ("REQUEST_LINK".to_string(), json!("No accounts")));
        assert!(prompts.try_recv().is_err());
    }

    fn signature_request(id: &str) -> Request {
        request(
            id,
            RequestKind::RequestSignature,
            "BTS",
            json!({"params": ["signAndBroadcast", {"fee": 1}], "account_id": "1.2.5"}),
        )
    }

    #[tokio::test]
    async fn signing_failure_is_tagged_and_never_broadcasts() {
        let (arbiter, wallet, mut prompts) = standard(ScriptedChain::new().failing("sign"));

        let (envelope, _) = tokio::join!(
            arbiter.handle(signature_request("sig-3")),
            answer(arbiter.gate(), &mut prompts, Decision::approve(json!({})))
        );

        let (method, error) = failure(&envelope);
        assert_eq!(method, "signAndBroadcast.blockchain.sign");
        assert_eq!(error, json!("sign failed"));
        assert!(!wallet.chain.was_called("broadcast"));
        assert!(wallet
            .notifier
            .messages()
            .iter()
            .all(|m| m != crate::signing::NOTIFY_SIGN_AND_BROADCAST));
    }

    #[tokio::test]
    async fn broadcast_failure_is_tagged() {
        let (arbiter, wallet, mut prompts) = standard(ScriptedChain::new().failing("broadcast"));

        let (envelope, _) = tokio::join!(
            arbiter.handle(signature_request("sig-4")),
            answer(arbiter.gate(), &mut prompts, Decision::approve(json!({})))
        );

        assert_eq!(failure(&envelope).0, "signAndBroadcast.broadcast");
        assert_eq!(wallet.chain.calls().last().map(String::as_str), Some("broadcast"));
    }

    #[tokio::test]
    async fn empty_broadcast_result_is_a_failure() {
        let (arbiter, _wallet, mut prompts) =
            standard(ScriptedChain::new().returning_nothing("broadcast"));

        let (envelope, _) = tokio::join!(
            arbiter.handle(signature_request("sig-5")),
            answer(arbiter.gate(), &mut prompts, Decision::approve(json!({})))
        );

        assert_eq!(
            failure(&envelope),
            (
                "signAndBroadcast.result".to_string(),
                json!("Failed to process approved prompt")
            )
        );
    }

    #[tokio::test]
    async fn empty_nft_signature_is_a_failure() {
        let (arbiter, wallet, mut prompts) =
            standard(ScriptedChain::new().returning_nothing("sign_nft"));
        let req = request("nft-3", RequestKind::SignNft, "BTS", json!({"params": {"nft": 1}}));

        let (envelope, _) = tokio::join!(
            arbiter.handle(req),
            answer(arbiter.gate(), &mut prompts, Decision::approve(json!({})))
        );

        assert_eq!(failure(&envelope).0, "blockchain.signNFT");
        assert!(wallet.chain.was_called("sign_nft"));
    }

    #[tokio::test]
    async fn empty_transfer_result_is_a_failure() {
        let (arbiter, wallet, mut prompts) =
            standard(ScriptedChain::new().returning_nothing("transfer"));
        let req = request("tx-6", RequestKind::Transfer, "BTS", transfer_payload("1.2.9", None));

        let (envelope, _) = tokio::join!(
            arbiter.handle(req),
            answer(arbiter.gate(), &mut prompts, Decision::approve(json!({})))
        );

        assert_eq!(
            failure(&envelope),
            ("blockchain.transfer".to_string(), json!("No blockchain transfer result"))
        );
        assert!(wallet.notifier.messages().iter().all(|m| m != "Transfer completed"));
    }

    #[tokio::test]
    async fn message_verification_needs_no_approval() {
        let (arbiter, wallet, mut prompts) = standard(ScriptedChain::new());
        let req = request(
            "verify-1",
            RequestKind::MessageVerification,
            "BTS",
            json!({"params": {"message": "hi"}}),
        );

        let envelope = arbiter.handle(req).await;
        assert_eq!(envelope.success_value().unwrap()["verified"], json!(true));
        assert!(prompts.try_recv().is_err());
        assert!(wallet.keys.requested().is_empty());
    }

    #[tokio::test]
    async fn verification_failure_is_tagged() {
        let (wallet, _prompts) =
            MemoryWallet::from_parts(accounts(), keys(), ScriptedChain::new(), &Config::default());
        let mut deps = wallet.collaborators();
        deps.verifier = Arc::new(MemoryVerifier { accept: false });
        let arbiter = RequestArbiter::new(deps, &Config::default());

        let envelope = arbiter
            .handle(request("verify-2", RequestKind::MessageVerification, "BTS", json!({"params": {}})))
            .await;
        assert_eq!(failure(&envelope).0, "blockchain.verifyMessage");
    }

    #[tokio::test]
    async fn concurrent_requests_resolve_independently() {
        let (arbiter, _wallet, mut prompts) = standard(ScriptedChain::new());
        let first = request("con-a", RequestKind::GetAccount, "BTS", Value::Null);
        let second = request("con-b", RequestKind::GetAccount, "BTS", Value::Null);

        let responder = async {
            for _ in 0..2 {
                let prompt = prompts.recv().await.expect("prompt");
                let decision = if prompt.request.id.as_str() == "con-a" {
                    Decision::reject(json!("not you"))
                } else {
                    Decision::approve(json!({}))
                };
                arbiter.decide(&prompt.request.id, decision);
            }
        };
        let (envelopes, _) = tokio::join!(
            futures::future::join_all([arbiter.handle(first), arbiter.handle(second)]),
            responder
        );

        assert!(envelopes[0].is_error());
        assert_eq!(envelopes[0].id.as_str(), "con-a");
        assert!(!envelopes[1].is_error());
        assert_eq!(envelopes[1].id.as_str(), "con-b");
        assert_eq!(arbiter.gate().pending_count(), 0);
    }

    #[tokio::test]
    async fn duplicate_pending_id_is_refused() {
        let (arbiter, _wallet, mut prompts) = standard(ScriptedChain::new());
        let first = request("dup", RequestKind::GetAccount, "BTS", Value::Null);
        let second = request("dup", RequestKind::GetAccount, "BTS", Value::Null);

        let (first, second) = tokio::join!(arbiter.handle(first), async {
            let second = arbiter.handle(second).await;
            answer(arbiter.gate(), &mut prompts, Decision::approve(json!({}))).await;
            second
        });

        assert!(!first.is_error());
        assert_eq!(failure(&second).0, "getAccount");
    }

    #[tokio::test(start_paused = true)]
    async fn unanswered_approval_expires() {
        let config = Config {
            approval: crate::config::ApprovalSettings {
                timeout_secs: Some(30),
            },
            ..Config::default()
        };
        let (arbiter, _wallet, _prompts) = setup(accounts(), keys(), ScriptedChain::new(), &config);
        let req = request("slow", RequestKind::GetAccount, "BTS", Value::Null);

        let envelope = arbiter.handle(req).await;
        assert_eq!(failure(&envelope).0, "getAccount.timeout");
        assert_eq!(arbiter.gate().pending_count(), 0);
    }

    #[tokio::test]
    async fn cancelled_request_resolves_as_rejection() {
        let (arbiter, _wallet, mut prompts) = standard(ScriptedChain::new());
        let req = request("cancel-me", RequestKind::GetAccount, "BTS", Value::Null);

        let canceller = async {
            let prompt = prompts.recv().await.expect("prompt");
            assert!(arbiter.cancel(&prompt.request.id));
        };
        let (envelope, _) = tokio::join!(arbiter.handle(req), canceller);
        assert_eq!(failure(&envelope), ("getAccount".to_string(), json!("cancelled")));
    }

    #[tokio::test]
    async fn audit_log_records_every_request() {
        let temp_file = tempfile::NamedTempFile::new().unwrap();
        let (wallet, _prompts) =
            MemoryWallet::from_parts(accounts(), keys(), ScriptedChain::new(), &Config::default());
        let arbiter = RequestArbiter::new(wallet.collaborators(), &Config::default())
            .with_interceptor(Arc::new(AuditLogInterceptor::new(temp_file.path())));

        arbiter
            .handle(request("audit-1", RequestKind::MessageVerification, "BTS", json!({"params": {}})))
            .await;
        arbiter
            .handle(request("audit-2", RequestKind::SignMessage, "BTS", Value::Null).with_app("nobody", "x"))
            .await;

        let content = std::fs::read_to_string(temp_file.path()).unwrap();
        assert_eq!(content.lines().count(), 4);
        assert!(content.contains("\"stage\":\"signMessage\""));
    }
}
