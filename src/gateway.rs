use anyhow::Result;
use async_trait::async_trait;
use serde_json::json;

use crate::models::GqlTransaction;

/// Largest page the gateway accepts; one sync pass pulls the whole window.
pub const MAX_PAGE_SIZE: i64 = 2_147_483_647;

const TX_QUERY: &str = r#"
query($txID: ID!) {
  transaction(id: $txID) {
    id
    owner { address }
    quantity { ar }
    block { height timestamp }
    tags { name value }
  }
}"#;

const TXS_QUERY: &str = r#"
query($recipients: [String!], $min: Int, $num: Int) {
  transactions(recipients: $recipients, block: { min: $min }, first: $num) {
    edges {
      node {
        id
        owner { address }
        quantity { ar }
        block { height timestamp }
        tags { name value }
      }
    }
  }
}"#;

/// The query transport the engine reads the ledger through.
///
/// Multi-transaction results arrive newest-first, exactly as the gateway
/// returns them; callers reverse before classification.
#[async_trait]
pub trait TxSource: Send + Sync {
    /// Fetch a single transaction by ID. `None` when the gateway has no
    /// transaction under that ID.
    async fn transaction(&self, tx_id: &str) -> Result<Option<GqlTransaction>>;

    /// Fetch transactions sent to `recipient` at or above `min_block`,
    /// newest-first.
    async fn transactions_to(
        &self,
        recipient: &str,
        min_block: u64,
        first: i64,
    ) -> Result<Vec<GqlTransaction>>;
}

/// GraphQL client for an Arweave gateway.
pub struct GatewayApi {
    api_url: String,
    client: reqwest::Client,
}

impl GatewayApi {
    pub fn new(api_url: &str) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(20))
            .build()
            .expect("Failed to build HTTP client");
        Self {
            api_url: crate::utils::remove_trailing_slash(api_url),
            client,
        }
    }

    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    pub fn with_client(api_url: &str, client: reqwest::Client) -> Self {
        Self {
            api_url: crate::utils::remove_trailing_slash(api_url),
            client,
        }
    }

    async fn graphql(&self, query: &str, variables: serde_json::Value) -> Result<serde_json::Value> {
        let url = format!("{}/graphql", self.api_url);
        let body = json!({ "query": query, "variables": variables });
        let response = self.client.post(&url).json(&body).send().await?;
        if response.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(anyhow::anyhow!("rate_limited"));
        }
        let text = response.text().await?;
        let parsed: serde_json::Value = serde_json::from_str(&text)?;
        if let Some(errors) = parsed.get("errors") {
            if errors.as_array().map(|a| !a.is_empty()).unwrap_or(false) {
                return Err(anyhow::anyhow!("graphql errors: {}", errors));
            }
        }
        Ok(parsed)
    }

    async fn fetch_transaction(&self, tx_id: &str) -> Result<Option<GqlTransaction>> {
        let response = self.graphql(TX_QUERY, json!({ "txID": tx_id })).await?;
        let node = response
            .get("data")
            .and_then(|d| d.get("transaction"))
            .cloned()
            .unwrap_or(serde_json::Value::Null);
        if node.is_null() {
            return Ok(None);
        }
        let tx: GqlTransaction = serde_json::from_value(node)?;
        Ok(Some(tx))
    }

    async fn fetch_transactions_to(
        &self,
        recipient: &str,
        min_block: u64,
        first: i64,
    ) -> Result<Vec<GqlTransaction>> {
        let variables = json!({
            "recipients": [recipient],
            "min": min_block,
            "num": first,
        });
        let response = self.graphql(TXS_QUERY, variables).await?;
        let edges = response
            .get("data")
            .and_then(|d| d.get("transactions"))
            .and_then(|t| t.get("edges"))
            .and_then(|e| e.as_array())
            .cloned()
            .unwrap_or_default();

        let mut txs = Vec::with_capacity(edges.len());
        for edge in edges {
            let node = edge.get("node").cloned().unwrap_or(serde_json::Value::Null);
            if node.is_null() {
                continue;
            }
            match serde_json::from_value::<GqlTransaction>(node) {
                Ok(tx) => txs.push(tx),
                Err(e) => log::warn!("skipping undecodable gateway node: {}", e),
            }
        }
        Ok(txs)
    }
}

#[async_trait]
impl TxSource for GatewayApi {
    async fn transaction(&self, tx_id: &str) -> Result<Option<GqlTransaction>> {
        crate::utils::retry(10, 1000, || async { self.fetch_transaction(tx_id).await }).await
    }

    async fn transactions_to(
        &self,
        recipient: &str,
        min_block: u64,
        first: i64,
    ) -> Result<Vec<GqlTransaction>> {
        crate::utils::retry(10, 1000, || async {
            self.fetch_transactions_to(recipient, min_block, first).await
        })
        .await
    }
}
