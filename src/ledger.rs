use anyhow::Result;
use async_trait::async_trait;

use crate::models::Tag;

/// Wallet key material (a parsed JWK), loaded by the hosting process and
/// passed by reference into every signing call. The engine never caches it.
#[derive(Clone)]
pub struct WalletKey {
    jwk: serde_json::Value,
}

impl WalletKey {
    pub fn new(jwk: serde_json::Value) -> Self {
        Self { jwk }
    }

    pub fn jwk(&self) -> &serde_json::Value {
        &self.jwk
    }
}

impl std::fmt::Debug for WalletKey {
    // Key material must never end up in logs.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("WalletKey(..)")
    }
}

/// What to put in a new transaction: a value transfer, a data body, or both.
#[derive(Debug, Clone, Default)]
pub struct TxSpec {
    pub target: Option<String>,
    /// Integral winston amount, as a decimal string.
    pub quantity_winston: Option<String>,
    pub data: Option<Vec<u8>>,
}

/// An unsubmitted transaction under construction.
#[derive(Debug, Clone, Default)]
pub struct TxDraft {
    pub target: Option<String>,
    pub quantity_winston: Option<String>,
    pub data: Option<Vec<u8>>,
    pub tags: Vec<Tag>,
}

impl TxDraft {
    pub fn add_tag(&mut self, name: &str, value: &str) {
        self.tags.push(Tag::new(name, value));
    }
}

/// Transaction construction, signing and submission against the ledger.
///
/// Submission is fire-and-forget: `submit` returns the transaction ID and
/// the engine does not poll for confirmation.
#[async_trait]
pub trait LedgerClient: Send + Sync {
    async fn create_transaction(&self, spec: TxSpec, key: &WalletKey) -> Result<TxDraft>;

    async fn sign(&self, draft: &mut TxDraft, key: &WalletKey) -> Result<()>;

    async fn submit(&self, draft: &TxDraft) -> Result<String>;

    /// Fetch the data body of a stored transaction (e.g. a contract's
    /// initial state) as raw bytes.
    async fn fetch_data(&self, tx_id: &str) -> Result<Vec<u8>>;
}
