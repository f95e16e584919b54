use rust_decimal::Decimal;
use serde::Serialize;

/// A raw transaction classified into one of the four order semantics the
/// trading post understands. Exactly one event per qualifying transaction.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type")]
pub enum OrderEvent {
    /// AR sent to the post to buy a token; amount is the transfer quantity.
    Buy {
        id: String,
        block: u64,
        sender: String,
        token: String,
        ar_amount: Decimal,
    },
    /// PST transfer into the post offering `qty` of `contract` at `rate`.
    Sell {
        id: String,
        block: u64,
        sender: String,
        contract: String,
        qty: Decimal,
        rate: Decimal,
    },
    /// Request to cancel the open order created by transaction `order`.
    Cancel {
        id: String,
        block: u64,
        sender: String,
        order: String,
    },
    /// Cross-chain swap intent against `chain`.
    Swap {
        id: String,
        block: u64,
        sender: String,
        chain: String,
        ar_amount: Decimal,
        rate: Decimal,
    },
}

impl OrderEvent {
    pub fn id(&self) -> &str {
        match self {
            OrderEvent::Buy { id, .. }
            | OrderEvent::Sell { id, .. }
            | OrderEvent::Cancel { id, .. }
            | OrderEvent::Swap { id, .. } => id,
        }
    }

    pub fn block(&self) -> u64 {
        match self {
            OrderEvent::Buy { block, .. }
            | OrderEvent::Sell { block, .. }
            | OrderEvent::Cancel { block, .. }
            | OrderEvent::Swap { block, .. } => *block,
        }
    }

    pub fn sender(&self) -> &str {
        match self {
            OrderEvent::Buy { sender, .. }
            | OrderEvent::Sell { sender, .. }
            | OrderEvent::Cancel { sender, .. }
            | OrderEvent::Swap { sender, .. } => sender,
        }
    }
}
