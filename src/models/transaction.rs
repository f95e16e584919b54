use serde::{Deserialize, Serialize};

use crate::models::Tag;

/// One ledger transaction as returned by the gateway's GraphQL endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GqlTransaction {
    pub id: String,
    pub owner: GqlOwner,
    #[serde(default)]
    pub quantity: GqlQuantity,
    /// None while the transaction is still unconfirmed (no block yet).
    #[serde(default)]
    pub block: Option<GqlBlock>,
    #[serde(default)]
    pub tags: Vec<Tag>,
}

impl GqlTransaction {
    pub fn is_confirmed(&self) -> bool {
        self.block.is_some()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GqlOwner {
    pub address: String,
}

/// Transferred quantity, as decimal strings straight off the wire.
/// Amounts are only ever parsed into `Decimal`, never floats.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GqlQuantity {
    #[serde(default)]
    pub ar: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GqlBlock {
    pub height: u64,
    pub timestamp: i64,
}

/// Durable bookmark for one asset/recipient stream: the last transaction
/// that produced an order event and was fully processed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cursor {
    pub block: u64,
    pub tx_id: String,
}

impl Cursor {
    pub fn new(block: u64, tx_id: &str) -> Self {
        Self {
            block,
            tx_id: tx_id.to_string(),
        }
    }

    /// Starting point for a stream with no history.
    pub fn genesis() -> Self {
        Self {
            block: 0,
            tx_id: String::new(),
        }
    }
}
