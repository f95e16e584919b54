//! Cancellation workflow: authenticate a cancel request against the order
//! it targets, refund the order's value with one compensating transaction,
//! and drop the local order record.
//!
//! One run per cancel request, no internal retries. Every step either
//! completes or terminates the run with a [`CancelError`]; re-invoking the
//! whole workflow is safe because the checks are read-only and the final
//! deletion is a no-op once the record is gone.

use rand::Rng;
use rust_decimal::Decimal;
use thiserror::Error;

use crate::gateway::TxSource;
use crate::ledger::{LedgerClient, TxSpec, WalletKey};
use crate::models::tag::names;
use crate::models::{tag_value, GqlTransaction};
use crate::store::OrderStore;

const EXCHANGE_NAME: &str = "Verto";
const CANCEL_AR_TRANSFER: &str = "Cancel-AR-Transfer";
const CANCEL_PST_TRANSFER: &str = "Cancel-PST-Transfer";
const SMARTWEAVE_APP_NAME: &str = "SmartWeaveAction";
const SMARTWEAVE_APP_VERSION: &str = "0.3.0";

/// Why a cancellation run terminated without refunding.
#[derive(Debug, Error)]
pub enum CancelError {
    #[error("transaction {0} not found on the ledger")]
    NotFound(String),
    #[error("cancel sender {sender} is not the owner {owner} of order {order}")]
    NotOwner {
        order: String,
        sender: String,
        owner: String,
    },
    #[error("order {order} has invalid type {value:?}")]
    InvalidOrderType { order: String, value: String },
    #[error("transaction {tx_id} is missing the {tag} tag")]
    MissingTag { tx_id: String, tag: &'static str },
    #[error("no open order for ({asset}, {tx_id})")]
    OrderNotFound { asset: String, tx_id: String },
    #[error("gateway query failed: {0}")]
    Gateway(anyhow::Error),
    #[error("could not submit compensating transaction: {0}")]
    Submission(anyhow::Error),
    #[error("order store failed: {0}")]
    Store(anyhow::Error),
}

/// The two cancelable order sides.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderSide {
    Buy,
    Sell,
}

impl OrderSide {
    fn from_tag(value: &str) -> Option<Self> {
        match value {
            "Buy" => Some(OrderSide::Buy),
            "Sell" => Some(OrderSide::Sell),
            _ => None,
        }
    }

    /// Which tag carries the order's asset. Buy orders reference the quoted
    /// token under `Token`; Sell orders reference the contract being
    /// liquidated under `Contract`.
    pub fn asset_tag_name(self) -> &'static str {
        match self {
            OrderSide::Buy => names::TOKEN,
            OrderSide::Sell => names::CONTRACT,
        }
    }
}

/// Outcome of a completed cancellation.
#[derive(Debug, Clone, PartialEq)]
pub struct CancelReceipt {
    /// ID of the cancelled order (its originating transaction).
    pub order_id: String,
    /// ID of the submitted compensating transaction.
    pub refund_tx_id: String,
    /// Address the value was returned to.
    pub recipient: String,
    pub amount: Decimal,
    /// "AR" for Buy orders; the token ticker (or contract ID when the
    /// ticker cannot be resolved) for Sell orders.
    pub asset: String,
}

/// Cancel the order created by `order_id`, on behalf of the cancel-request
/// transaction `cancel_id`.
///
/// Fetches both transactions, checks that the cancel sender owns the order,
/// resolves the refund from the persisted order record, submits exactly one
/// compensating transaction and finally deletes the record. The record is
/// only deleted after a successful submission, so a failed run leaves the
/// order open for retry.
pub async fn cancel<G, L, S>(
    gateway: &G,
    ledger: &L,
    store: &S,
    key: &WalletKey,
    cancel_id: &str,
    order_id: &str,
) -> Result<CancelReceipt, CancelError>
where
    G: TxSource + ?Sized,
    L: LedgerClient + ?Sized,
    S: OrderStore + ?Sized,
{
    // Fetching
    let (cancel_tx, target_tx) = tokio::try_join!(
        gateway.transaction(cancel_id),
        gateway.transaction(order_id),
    )
    .map_err(CancelError::Gateway)?;
    let cancel_tx = cancel_tx.ok_or_else(|| CancelError::NotFound(cancel_id.to_string()))?;
    let target_tx = target_tx.ok_or_else(|| CancelError::NotFound(order_id.to_string()))?;

    // Authenticating: ledger-level signatures are already verified by the
    // gateway, so owner equality is the whole check.
    if cancel_tx.owner.address != target_tx.owner.address {
        return Err(CancelError::NotOwner {
            order: order_id.to_string(),
            sender: cancel_tx.owner.address,
            owner: target_tx.owner.address,
        });
    }

    // Resolving
    let side = order_side(&target_tx)?;
    let asset = tag_value(&target_tx.tags, side.asset_tag_name())
        .ok_or(CancelError::MissingTag {
            tx_id: target_tx.id.clone(),
            tag: side.asset_tag_name(),
        })?
        .to_string();
    let order = store
        .get_order(&asset, order_id)
        .await
        .map_err(CancelError::Store)?
        .ok_or_else(|| CancelError::OrderNotFound {
            asset: asset.clone(),
            tx_id: order_id.to_string(),
        })?;

    // Submitting
    let mut draft = match side {
        OrderSide::Buy => {
            let quantity =
                crate::utils::ar_to_winston(order.amnt).map_err(CancelError::Submission)?;
            let spec = TxSpec {
                target: Some(order.addr.clone()),
                quantity_winston: Some(quantity),
                data: None,
            };
            let mut draft = ledger
                .create_transaction(spec, key)
                .await
                .map_err(CancelError::Submission)?;
            draft.add_tag(names::EXCHANGE, EXCHANGE_NAME);
            draft.add_tag(names::TYPE, CANCEL_AR_TRANSFER);
            draft.add_tag(names::ORDER, order_id);
            draft
        }
        OrderSide::Sell => {
            let input = transfer_input(&order.addr, order.amnt).map_err(CancelError::Submission)?;
            // A short random body keeps otherwise-identical refunds from
            // colliding on the ledger.
            let spec = TxSpec {
                target: Some(order.addr.clone()),
                quantity_winston: None,
                data: Some(nonce().into_bytes()),
            };
            let mut draft = ledger
                .create_transaction(spec, key)
                .await
                .map_err(CancelError::Submission)?;
            draft.add_tag(names::EXCHANGE, EXCHANGE_NAME);
            draft.add_tag(names::TYPE, CANCEL_PST_TRANSFER);
            draft.add_tag(names::ORDER, order_id);
            draft.add_tag(names::APP_NAME, SMARTWEAVE_APP_NAME);
            draft.add_tag(names::APP_VERSION, SMARTWEAVE_APP_VERSION);
            draft.add_tag(names::CONTRACT, &asset);
            draft.add_tag(names::INPUT, &input);
            draft
        }
    };

    ledger
        .sign(&mut draft, key)
        .await
        .map_err(CancelError::Submission)?;
    let refund_tx_id = ledger
        .submit(&draft)
        .await
        .map_err(CancelError::Submission)?;

    // Finalizing: only after a successful submission.
    store
        .delete_order(&asset, order_id)
        .await
        .map_err(CancelError::Store)?;

    let asset_label = match side {
        OrderSide::Buy => "AR".to_string(),
        // Ticker lookup is cosmetic; fall back to the contract ID.
        OrderSide::Sell => resolve_ticker(ledger, &asset).await.unwrap_or_else(|| asset.clone()),
    };
    log::info!(
        "cancelled order {}: sent {} {} back to {} (refund tx {})",
        order_id,
        order.amnt,
        asset_label,
        order.addr,
        refund_tx_id
    );

    Ok(CancelReceipt {
        order_id: order_id.to_string(),
        refund_tx_id,
        recipient: order.addr,
        amount: order.amnt,
        asset: asset_label,
    })
}

fn order_side(target: &GqlTransaction) -> Result<OrderSide, CancelError> {
    let value = tag_value(&target.tags, names::TYPE).ok_or(CancelError::MissingTag {
        tx_id: target.id.clone(),
        tag: names::TYPE,
    })?;
    OrderSide::from_tag(value).ok_or_else(|| CancelError::InvalidOrderType {
        order: target.id.clone(),
        value: value.to_string(),
    })
}

/// SmartWeave `transfer` instruction, with `qty` as a JSON number to match
/// what contracts expect from the original clients.
fn transfer_input(target: &str, qty: Decimal) -> anyhow::Result<String> {
    let qty: serde_json::Number = serde_json::from_str(&qty.to_string())
        .map_err(|e| anyhow::anyhow!("order quantity {} is not a JSON number: {}", qty, e))?;
    let input = serde_json::json!({
        "function": "transfer",
        "target": target,
        "qty": qty,
    });
    Ok(input.to_string())
}

fn nonce() -> String {
    format!("{:04}", rand::thread_rng().gen_range(0..10_000))
}

async fn resolve_ticker<L: LedgerClient + ?Sized>(ledger: &L, contract: &str) -> Option<String> {
    let bytes = ledger.fetch_data(contract).await.ok()?;
    let state: serde_json::Value = serde_json::from_slice(&bytes).ok()?;
    state.get("ticker")?.as_str().map(String::from)
}
