use anyhow::Result;
use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::models::Cursor;

/// A persisted open order awaiting match or cancellation, keyed by
/// `(asset, tx_id)` in the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderRecord {
    /// Address the order's value is returned to on cancellation.
    pub addr: String,
    /// AR amount for Buy orders, token quantity for Sell orders.
    pub amnt: Decimal,
}

/// Durable state owned by the surrounding service: per-asset order tables,
/// the sync cursor, and the tracking low-water-mark.
///
/// The engine re-reads cursor and order records on every pass rather than
/// caching them; writes per `(asset, tx_id)` key are serialized by the
/// implementation.
#[async_trait]
pub trait OrderStore: Send + Sync {
    async fn get_order(&self, asset: &str, tx_id: &str) -> Result<Option<OrderRecord>>;

    async fn delete_order(&self, asset: &str, tx_id: &str) -> Result<()>;

    async fn get_cursor(&self, asset: &str) -> Result<Cursor>;

    async fn put_cursor(&self, asset: &str, cursor: &Cursor) -> Result<()>;

    /// Unix timestamp before which confirmed transactions are ignored
    /// (the post was not tracking this stream yet).
    async fn get_horizon(&self) -> Result<i64>;
}
