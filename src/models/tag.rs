use serde::{Deserialize, Serialize};

/// Tag names of the trading-post wire protocol.
pub mod names {
    pub const EXCHANGE: &str = "Exchange";
    pub const TYPE: &str = "Type";
    pub const TOKEN: &str = "Token";
    pub const CONTRACT: &str = "Contract";
    pub const INPUT: &str = "Input";
    pub const RATE: &str = "Rate";
    pub const ORDER: &str = "Order";
    pub const CHAIN: &str = "Chain";
    pub const APP_NAME: &str = "App-Name";
    pub const APP_VERSION: &str = "App-Version";
}

/// A name/value metadata pair attached to a ledger transaction.
///
/// Tag names are NOT unique within one transaction; the protocol resolves
/// duplicates by taking the first occurrence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub name: String,
    pub value: String,
}

impl Tag {
    pub fn new(name: &str, value: &str) -> Self {
        Self {
            name: name.to_string(),
            value: value.to_string(),
        }
    }
}

/// First-match tag lookup. Case-sensitive exact match on `name`.
pub fn tag_value<'a>(tags: &'a [Tag], name: &str) -> Option<&'a str> {
    tags.iter().find(|t| t.name == name).map(|t| t.value.as_str())
}
