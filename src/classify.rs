//! Incremental classifier turning raw tagged transactions into order events.
//!
//! Classification is pure computation: no I/O, no state beyond the cursor
//! passed in and handed back. One bad transaction never aborts a batch.

use std::str::FromStr;

use rust_decimal::Decimal;

use crate::models::tag::names;
use crate::models::{tag_value, Cursor, GqlBlock, GqlTransaction, OrderEvent};

/// Classify a batch of raw transactions into order events, resuming after
/// `cursor` and ignoring anything confirmed at or before `horizon`.
///
/// `batch` must be in canonical oldest-first ledger order (the gateway
/// returns newest-first; the sync layer reverses before calling). Ordering
/// is a correctness requirement: a Cancel must never be evaluated before
/// the order it references.
///
/// The returned cursor equals the input cursor when no events were
/// produced; otherwise it points at the last classified event, so a
/// crash-restart resumes exactly there.
pub fn classify(
    batch: &[GqlTransaction],
    cursor: &Cursor,
    horizon: i64,
) -> (Vec<OrderEvent>, Cursor) {
    // Resume one past the cursor transaction. A cursor outside the window
    // (fresh sync, or a pruned page) starts from the top; replaying an
    // already-seen batch therefore reproduces no events.
    let resume = batch
        .iter()
        .position(|tx| tx.id == cursor.tx_id)
        .map(|i| i + 1)
        .unwrap_or(0);

    let mut events = Vec::new();
    for tx in &batch[resume..] {
        // Unconfirmed transactions are not visible yet.
        let block = match &tx.block {
            Some(b) => b,
            None => continue,
        };
        // Confirmed before the post started tracking this stream.
        if block.timestamp <= horizon {
            continue;
        }
        // No Type tag: a plain transfer, not an order. Unknown values
        // (including the post's own Confirmation markers) are skipped too.
        let order_type = match tag_value(&tx.tags, names::TYPE) {
            Some(t) => t,
            None => continue,
        };
        let event = match order_type {
            "Buy" => classify_buy(tx, block),
            "Sell" => classify_sell(tx, block),
            "Cancel" => classify_cancel(tx, block),
            "Swap" => classify_swap(tx, block),
            _ => None,
        };
        if let Some(event) = event {
            events.push(event);
        }
    }

    let new_cursor = match events.last() {
        Some(last) => Cursor::new(last.block(), last.id()),
        None => cursor.clone(),
    };
    (events, new_cursor)
}

fn classify_buy(tx: &GqlTransaction, block: &GqlBlock) -> Option<OrderEvent> {
    let token = require_tag(tx, names::TOKEN)?;
    let ar_amount = parse_decimal(&tx.quantity.ar, tx, "quantity.ar")?;
    Some(OrderEvent::Buy {
        id: tx.id.clone(),
        block: block.height,
        sender: tx.owner.address.clone(),
        token: token.to_string(),
        ar_amount,
    })
}

fn classify_sell(tx: &GqlTransaction, block: &GqlBlock) -> Option<OrderEvent> {
    let contract = require_tag(tx, names::CONTRACT)?;
    let input = require_tag(tx, names::INPUT)?;
    let qty = parse_input_qty(input, tx)?;
    let rate = parse_decimal(require_tag(tx, names::RATE)?, tx, names::RATE)?;
    Some(OrderEvent::Sell {
        id: tx.id.clone(),
        block: block.height,
        sender: tx.owner.address.clone(),
        contract: contract.to_string(),
        qty,
        rate,
    })
}

fn classify_cancel(tx: &GqlTransaction, block: &GqlBlock) -> Option<OrderEvent> {
    let order = require_tag(tx, names::ORDER)?;
    Some(OrderEvent::Cancel {
        id: tx.id.clone(),
        block: block.height,
        sender: tx.owner.address.clone(),
        order: order.to_string(),
    })
}

fn classify_swap(tx: &GqlTransaction, block: &GqlBlock) -> Option<OrderEvent> {
    let chain = require_tag(tx, names::CHAIN)?;
    let ar_amount = parse_decimal(&tx.quantity.ar, tx, "quantity.ar")?;
    let rate = parse_decimal(require_tag(tx, names::RATE)?, tx, names::RATE)?;
    Some(OrderEvent::Swap {
        id: tx.id.clone(),
        block: block.height,
        sender: tx.owner.address.clone(),
        chain: chain.to_string(),
        ar_amount,
        rate,
    })
}

fn require_tag<'a>(tx: &'a GqlTransaction, name: &str) -> Option<&'a str> {
    let value = tag_value(&tx.tags, name);
    if value.is_none() {
        log::debug!("skipping {}: missing {} tag", tx.id, name);
    }
    value
}

fn parse_decimal(raw: &str, tx: &GqlTransaction, field: &str) -> Option<Decimal> {
    match Decimal::from_str(raw) {
        Ok(d) => Some(d),
        Err(e) => {
            log::debug!("skipping {}: unparseable {} {:?}: {}", tx.id, field, raw, e);
            None
        }
    }
}

/// Extract the `qty` field from a SmartWeave `Input` tag.
///
/// An `Input` whose JSON value is itself a string is the double-encoding
/// corruption mode from an earlier protocol version; such transactions are
/// rejected as malformed rather than decoded a second time.
fn parse_input_qty(input: &str, tx: &GqlTransaction) -> Option<Decimal> {
    let parsed: serde_json::Value = match serde_json::from_str(input) {
        Ok(v) => v,
        Err(e) => {
            log::debug!("skipping {}: unparseable Input tag: {}", tx.id, e);
            return None;
        }
    };
    if parsed.is_string() {
        log::debug!("skipping {}: double-encoded Input tag", tx.id);
        return None;
    }
    let qty = match parsed.get("qty") {
        Some(serde_json::Value::Number(n)) => Decimal::from_str(&n.to_string()).ok(),
        Some(serde_json::Value::String(s)) => Decimal::from_str(s).ok(),
        _ => None,
    };
    if qty.is_none() {
        log::debug!("skipping {}: Input tag has no usable qty", tx.id);
    }
    qty
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{GqlOwner, GqlQuantity, Tag};

    fn tx(id: &str, block: u64, timestamp: i64, ar: &str, tags: &[(&str, &str)]) -> GqlTransaction {
        GqlTransaction {
            id: id.to_string(),
            owner: GqlOwner {
                address: "addr1".to_string(),
            },
            quantity: GqlQuantity { ar: ar.to_string() },
            block: Some(GqlBlock {
                height: block,
                timestamp,
            }),
            tags: tags.iter().map(|(n, v)| Tag::new(n, v)).collect(),
        }
    }

    fn buy(id: &str, block: u64) -> GqlTransaction {
        tx(id, block, 100, "1.5", &[("Type", "Buy"), ("Token", "X")])
    }

    fn sell(id: &str, block: u64) -> GqlTransaction {
        tx(
            id,
            block,
            100,
            "0",
            &[
                ("Type", "Sell"),
                ("Contract", "X"),
                ("Input", r#"{"function":"transfer","qty":10}"#),
                ("Rate", "2"),
            ],
        )
    }

    #[test]
    fn test_classifies_buy_then_sell_and_advances_cursor() {
        let batch = vec![buy("A", 5), sell("B", 6)];
        let (events, cursor) = classify(&batch, &Cursor::genesis(), 0);

        assert_eq!(events.len(), 2);
        assert_eq!(
            events[0],
            OrderEvent::Buy {
                id: "A".to_string(),
                block: 5,
                sender: "addr1".to_string(),
                token: "X".to_string(),
                ar_amount: "1.5".parse().unwrap(),
            }
        );
        assert_eq!(
            events[1],
            OrderEvent::Sell {
                id: "B".to_string(),
                block: 6,
                sender: "addr1".to_string(),
                contract: "X".to_string(),
                qty: Decimal::from(10),
                rate: Decimal::from(2),
            }
        );
        assert_eq!(cursor, Cursor::new(6, "B"));
    }

    #[test]
    fn test_resume_is_idempotent() {
        let batch = vec![buy("A", 5), sell("B", 6)];
        let (events, cursor) = classify(&batch, &Cursor::genesis(), 0);
        assert_eq!(events.len(), 2);

        // Replaying the same batch with the resulting cursor yields nothing
        // and leaves the cursor untouched.
        let (replay, replay_cursor) = classify(&batch, &cursor, 0);
        assert!(replay.is_empty());
        assert_eq!(replay_cursor, cursor);
    }

    #[test]
    fn test_resume_mid_batch() {
        let batch = vec![buy("A", 5), buy("B", 6), buy("C", 7)];
        let (events, cursor) = classify(&batch, &Cursor::new(6, "B"), 0);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].id(), "C");
        assert_eq!(cursor, Cursor::new(7, "C"));
    }

    #[test]
    fn test_cursor_outside_window_starts_from_top() {
        let batch = vec![buy("A", 5)];
        let (events, _) = classify(&batch, &Cursor::new(2, "gone"), 0);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].id(), "A");
    }

    #[test]
    fn test_cursor_monotonic_and_unchanged_when_empty() {
        let cursor = Cursor::new(9, "Z");
        let (events, new_cursor) = classify(&[], &cursor, 0);
        assert!(events.is_empty());
        assert_eq!(new_cursor, cursor);

        let batch = vec![buy("A", 12)];
        let (_, advanced) = classify(&batch, &Cursor::new(9, "unseen"), 0);
        assert!(advanced.block >= cursor.block);
    }

    #[test]
    fn test_events_preserve_batch_order() {
        let batch = vec![buy("A", 5), sell("B", 5), buy("C", 8)];
        let (events, _) = classify(&batch, &Cursor::genesis(), 0);
        let blocks: Vec<u64> = events.iter().map(|e| e.block()).collect();
        let mut sorted = blocks.clone();
        sorted.sort_unstable();
        assert_eq!(blocks, sorted);
        assert_eq!(
            events.iter().map(|e| e.id()).collect::<Vec<_>>(),
            vec!["A", "B", "C"]
        );
    }

    #[test]
    fn test_horizon_is_strict() {
        let batch = vec![
            tx("old", 5, 50, "1", &[("Type", "Buy"), ("Token", "X")]),
            tx("edge", 6, 100, "1", &[("Type", "Buy"), ("Token", "X")]),
            tx("new", 7, 101, "1", &[("Type", "Buy"), ("Token", "X")]),
        ];
        let (events, _) = classify(&batch, &Cursor::genesis(), 100);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].id(), "new");
    }

    #[test]
    fn test_unconfirmed_transactions_are_invisible() {
        let mut pending = buy("P", 5);
        pending.block = None;
        let (events, cursor) = classify(&[pending], &Cursor::genesis(), 0);
        assert!(events.is_empty());
        assert_eq!(cursor, Cursor::genesis());
    }

    #[test]
    fn test_plain_transfer_and_confirmation_markers_excluded() {
        let batch = vec![
            tx("transfer", 5, 100, "3.2", &[]),
            tx("conf", 6, 100, "0", &[("Type", "Confirmation"), ("Order", "A")]),
        ];
        let (events, cursor) = classify(&batch, &Cursor::genesis(), 0);
        assert!(events.is_empty());
        assert_eq!(cursor, Cursor::genesis());
    }

    #[test]
    fn test_missing_required_tag_skips_only_that_tx() {
        let batch = vec![
            tx("no-token", 5, 100, "1", &[("Type", "Buy")]),
            tx(
                "no-rate",
                6,
                100,
                "0",
                &[
                    ("Type", "Sell"),
                    ("Contract", "X"),
                    ("Input", r#"{"qty":10}"#),
                ],
            ),
            buy("ok", 7),
        ];
        let (events, cursor) = classify(&batch, &Cursor::genesis(), 0);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].id(), "ok");
        assert_eq!(cursor, Cursor::new(7, "ok"));
    }

    #[test]
    fn test_unparseable_amount_skips() {
        let batch = vec![tx(
            "bad",
            5,
            100,
            "not-a-number",
            &[("Type", "Buy"), ("Token", "X")],
        )];
        let (events, _) = classify(&batch, &Cursor::genesis(), 0);
        assert!(events.is_empty());
    }

    #[test]
    fn test_double_encoded_input_rejected() {
        // Legacy corruption: the Input payload JSON-encoded twice.
        let double = serde_json::to_string(r#"{"function":"transfer","qty":10}"#).unwrap();
        let batch = vec![tx(
            "corrupt",
            5,
            100,
            "0",
            &[
                ("Type", "Sell"),
                ("Contract", "X"),
                ("Input", &double),
                ("Rate", "2"),
            ],
        )];
        let (events, _) = classify(&batch, &Cursor::genesis(), 0);
        assert!(events.is_empty());
    }

    #[test]
    fn test_classifies_cancel_and_swap() {
        let batch = vec![
            tx("c", 5, 100, "0", &[("Type", "Cancel"), ("Order", "A")]),
            tx(
                "s",
                6,
                100,
                "2.5",
                &[("Type", "Swap"), ("Chain", "ETH"), ("Rate", "0.01")],
            ),
        ];
        let (events, cursor) = classify(&batch, &Cursor::genesis(), 0);
        assert_eq!(
            events[0],
            OrderEvent::Cancel {
                id: "c".to_string(),
                block: 5,
                sender: "addr1".to_string(),
                order: "A".to_string(),
            }
        );
        assert_eq!(
            events[1],
            OrderEvent::Swap {
                id: "s".to_string(),
                block: 6,
                sender: "addr1".to_string(),
                chain: "ETH".to_string(),
                ar_amount: "2.5".parse().unwrap(),
                rate: "0.01".parse().unwrap(),
            }
        );
        assert_eq!(cursor, Cursor::new(6, "s"));
    }
}
