//! Operation handlers
//!
//! Each request kind is an ordered pipeline of stages. Every pipeline that
//! touches key material passes through `AwaitApproval` first.

use crate::pipeline::stages::*;
use crate::pipeline::Pipeline;
use crate::request::{Request, RequestKind};

fn link_notice(request: &Request) -> String {
    format!(
        "{} ({}) requests a link to an account on {}",
        request.app_name, request.origin, request.chain
    )
}

fn relink_notice(request: &Request) -> String {
    format!(
        "{} ({}) requests to relink its {} account",
        request.app_name, request.origin, request.chain
    )
}

fn account_notice(request: &Request) -> String {
    format!("{} requests your account details", request.app_name)
}

fn signature_notice(request: &Request) -> String {
    let action = request
        .params()
        .get(0)
        .and_then(|action| action.as_str())
        .unwrap_or("signAndBroadcast");
    format!("Signature request type: {}", action)
}

fn injected_notice(request: &Request) -> String {
    format!("{} requests approval of a {} operation", request.app_name, request.kind)
}

fn vote_notice(request: &Request) -> String {
    format!("{} requests a vote", request.app_name)
}

fn nft_notice(request: &Request) -> String {
    format!("{} requests an NFT signature", request.app_name)
}

fn message_notice(request: &Request) -> String {
    format!("{} requests a message signature", request.app_name)
}

fn transfer_notice(request: &Request) -> String {
    format!("{} requests a transfer", request.app_name)
}

fn verify_notice(request: &Request) -> String {
    format!("{} requests message verification", request.app_name)
}

/// The pipeline that serves `kind`.
pub fn pipeline_for(kind: &RequestKind) -> Pipeline {
    match kind {
        RequestKind::Link => Pipeline::new()
            .stage(Notify(link_notice))
            .stage(ListAccounts)
            .stage(AwaitApproval::new())
            .stage(RecordLink),
        RequestKind::Relink => Pipeline::new()
            .stage(RequireLink)
            .stage(Notify(relink_notice))
            .stage(AwaitApproval::new())
            .stage(DiscloseAccount),
        RequestKind::GetAccount => Pipeline::new()
            .stage(RequireLink)
            .stage(Notify(account_notice))
            .stage(AwaitApproval::new())
            .stage(DiscloseAccount),
        RequestKind::RequestSignature => Pipeline::new()
            .stage(Notify(signature_notice))
            .stage(RequirePayload)
            .stage(VisualizeParams)
            .stage(VisualizeSigner)
            .stage(AwaitApproval::new())
            .stage(SignTransaction {
                attach_memo: false,
                receipts: false,
            }),
        RequestKind::InjectedCall(_) => Pipeline::new()
            .stage(RequirePayload)
            .stage(VisualizeParams)
            .stage(ScreenDenylist)
            .stage(ResolveActingAccount)
            .stage(Notify(injected_notice))
            .stage(AwaitApproval::new())
            .stage(SignTransaction {
                attach_memo: true,
                receipts: true,
            }),
        RequestKind::VoteFor => Pipeline::new()
            .stage(RequireLink)
            .stage(MapVote)
            .stage(Notify(vote_notice))
            .stage(AwaitApproval::new())
            .stage(CastVote),
        RequestKind::SignNft => Pipeline::new()
            .stage(RequireLink)
            .stage(Notify(nft_notice))
            .stage(AwaitApproval::rejecting_as(".reject"))
            .stage(SignNft),
        RequestKind::SignMessage => Pipeline::new()
            .stage(RequireLink)
            .stage(Notify(message_notice))
            .stage(AwaitApproval::rejecting_as(".reject"))
            .stage(SignMessage),
        RequestKind::Transfer => Pipeline::new()
            .stage(RequireLink)
            .stage(RequireTransferSupport)
            .stage(ResolveTransferTarget)
            .stage(ScreenTarget)
            .stage(Notify(transfer_notice))
            .stage(AwaitApproval::rejecting_as(".reject"))
            .stage(Transfer),
        RequestKind::MessageVerification => Pipeline::new()
            .stage(Notify(verify_notice))
            .stage(VerifyMessage),
    }
}
