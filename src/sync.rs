//! One sync pass per call: read the cursor, pull the transaction window from
//! the gateway, classify, persist the advanced cursor, hand the events to
//! the order-book consumer.

use anyhow::Result;
use tokio::sync::Mutex;

use crate::classify::classify;
use crate::gateway::{TxSource, MAX_PAGE_SIZE};
use crate::models::OrderEvent;
use crate::store::OrderStore;

/// Incremental synchronisation of one recipient stream (the trading post's
/// own address). Streams for different assets/recipients are independent;
/// construct one engine per stream and they may run in parallel.
pub struct SyncEngine<G, S> {
    gateway: G,
    store: S,
    recipient: String,
    // Single-flight guard: a stale cursor read from an overlapping pass
    // would re-emit events.
    flight: Mutex<()>,
}

impl<G: TxSource, S: OrderStore> SyncEngine<G, S> {
    pub fn new(gateway: G, store: S, recipient: &str) -> Self {
        Self {
            gateway,
            store,
            recipient: recipient.to_string(),
            flight: Mutex::new(()),
        }
    }

    pub fn recipient(&self) -> &str {
        &self.recipient
    }

    /// Run one pass. On transport failure nothing is written: the cursor
    /// only advances after a fully successful classify, so a retry resumes
    /// cleanly.
    pub async fn sync(&self) -> Result<Vec<OrderEvent>> {
        let _flight = self.flight.lock().await;

        let cursor = self.store.get_cursor(&self.recipient).await?;
        let horizon = self.store.get_horizon().await?;

        let mut batch = self
            .gateway
            .transactions_to(&self.recipient, cursor.block, MAX_PAGE_SIZE)
            .await?;
        // Gateway pages are newest-first; classification needs canonical
        // oldest-first order so Cancels follow the orders they reference.
        batch.reverse();

        let (events, new_cursor) = classify(&batch, &cursor, horizon);
        if !events.is_empty() {
            self.store.put_cursor(&self.recipient, &new_cursor).await?;
            log::debug!(
                "synced {}: {} new events, cursor at block {} ({})",
                self.recipient,
                events.len(),
                new_cursor.block,
                new_cursor.tx_id
            );
        }
        Ok(events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex as StdMutex;

    use anyhow::anyhow;
    use async_trait::async_trait;

    use crate::models::{Cursor, GqlBlock, GqlOwner, GqlQuantity, GqlTransaction, Tag};
    use crate::store::OrderRecord;

    fn buy(id: &str, block: u64) -> GqlTransaction {
        GqlTransaction {
            id: id.to_string(),
            owner: GqlOwner {
                address: "addr1".to_string(),
            },
            quantity: GqlQuantity {
                ar: "1.5".to_string(),
            },
            block: Some(GqlBlock {
                height: block,
                timestamp: 100,
            }),
            tags: vec![Tag::new("Type", "Buy"), Tag::new("Token", "X")],
        }
    }

    /// Serves a fixed window newest-first, as a real gateway would.
    struct FixedGateway {
        newest_first: Vec<GqlTransaction>,
        fail: bool,
    }

    #[async_trait]
    impl TxSource for FixedGateway {
        async fn transaction(&self, tx_id: &str) -> anyhow::Result<Option<GqlTransaction>> {
            Ok(self.newest_first.iter().find(|t| t.id == tx_id).cloned())
        }

        async fn transactions_to(
            &self,
            _recipient: &str,
            min_block: u64,
            _first: i64,
        ) -> anyhow::Result<Vec<GqlTransaction>> {
            if self.fail {
                return Err(anyhow!("gateway down"));
            }
            Ok(self
                .newest_first
                .iter()
                .filter(|t| t.block.as_ref().map(|b| b.height >= min_block).unwrap_or(false))
                .cloned()
                .collect())
        }
    }

    #[derive(Default)]
    struct CursorStore {
        cursors: StdMutex<HashMap<String, Cursor>>,
        puts: StdMutex<u32>,
    }

    #[async_trait]
    impl OrderStore for CursorStore {
        async fn get_order(&self, _asset: &str, _tx_id: &str) -> anyhow::Result<Option<OrderRecord>> {
            Ok(None)
        }

        async fn delete_order(&self, _asset: &str, _tx_id: &str) -> anyhow::Result<()> {
            Ok(())
        }

        async fn get_cursor(&self, asset: &str) -> anyhow::Result<Cursor> {
            Ok(self
                .cursors
                .lock()
                .unwrap()
                .get(asset)
                .cloned()
                .unwrap_or_else(Cursor::genesis))
        }

        async fn put_cursor(&self, asset: &str, cursor: &Cursor) -> anyhow::Result<()> {
            *self.puts.lock().unwrap() += 1;
            self.cursors
                .lock()
                .unwrap()
                .insert(asset.to_string(), cursor.clone());
            Ok(())
        }

        async fn get_horizon(&self) -> anyhow::Result<i64> {
            Ok(0)
        }
    }

    #[tokio::test]
    async fn test_sync_reverses_page_and_advances_cursor() {
        let gateway = FixedGateway {
            newest_first: vec![buy("C", 7), buy("B", 6), buy("A", 5)],
            fail: false,
        };
        let engine = SyncEngine::new(gateway, CursorStore::default(), "post-addr");

        let events = engine.sync().await.unwrap();
        assert_eq!(
            events.iter().map(|e| e.id()).collect::<Vec<_>>(),
            vec!["A", "B", "C"]
        );
        let cursor = engine.store.get_cursor("post-addr").await.unwrap();
        assert_eq!(cursor, Cursor::new(7, "C"));
    }

    #[tokio::test]
    async fn test_second_pass_is_a_no_op() {
        let gateway = FixedGateway {
            newest_first: vec![buy("B", 6), buy("A", 5)],
            fail: false,
        };
        let engine = SyncEngine::new(gateway, CursorStore::default(), "post-addr");

        assert_eq!(engine.sync().await.unwrap().len(), 2);
        assert!(engine.sync().await.unwrap().is_empty());
        // Cursor was only written by the first, event-producing pass.
        assert_eq!(*engine.store.puts.lock().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_transport_failure_leaves_cursor_untouched() {
        let gateway = FixedGateway {
            newest_first: vec![buy("A", 5)],
            fail: true,
        };
        let engine = SyncEngine::new(gateway, CursorStore::default(), "post-addr");

        assert!(engine.sync().await.is_err());
        assert_eq!(*engine.store.puts.lock().unwrap(), 0);
        let cursor = engine.store.get_cursor("post-addr").await.unwrap();
        assert_eq!(cursor, Cursor::genesis());
    }
}
