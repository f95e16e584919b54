//! # verto-engine-rs
//!
//! Off-ledger reconciliation engine for an Arweave trading post. The ledger
//! itself has no concept of an "order": the post encodes orders as tagged
//! transactions, and this library reads the raw transaction stream through a
//! gateway, classifies it into typed order events behind a durable cursor,
//! and drives the cancellation protocol that refunds open orders with
//! compensating transactions.
//!
//! ## Order events
//!
//! | Type | Required tags | Amount source |
//! |--------|--------------------------|----------------|
//! | Buy | `Token` | AR quantity |
//! | Sell | `Contract`, `Input`, `Rate` | `Input.qty` |
//! | Cancel | `Order` | — |
//! | Swap | `Chain`, `Rate` | AR quantity |
//!
//! Transactions without a `Type` tag (plain transfers), with an unknown
//! `Type` (e.g. the post's own confirmation markers), or missing a required
//! tag are skipped, never fatal. All amounts are fixed-precision decimals.
//!
//! ## Quick start
//!
//! ```no_run
//! use verto_engine_rs::{GatewayApi, SyncEngine};
//!
//! # async fn run(store: impl verto_engine_rs::OrderStore) -> anyhow::Result<()> {
//! let gateway = GatewayApi::new("https://arweave.net");
//! let engine = SyncEngine::new(gateway, store, "post-wallet-address");
//!
//! // One pass: fetch, classify, advance the cursor.
//! for event in engine.sync().await? {
//!     println!("{:?}", event);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! Cancellations run through [`workflows::cancel`], which authenticates the
//! request against the order's owner, submits one compensating transaction
//! via a [`LedgerClient`], and deletes the order record.
//!
//! The gateway, ledger client and order store are seams: the bundled
//! [`GatewayApi`] talks GraphQL to an Arweave gateway, while `LedgerClient`
//! and `OrderStore` are implemented by the hosting service (wallet/signing
//! stack and relational store respectively).

pub mod classify;
pub mod gateway;
pub mod ledger;
pub mod models;
pub mod store;
pub mod sync;
pub mod utils;
pub mod workflows;

pub use classify::classify;
pub use gateway::{GatewayApi, TxSource};
pub use ledger::{LedgerClient, TxDraft, TxSpec, WalletKey};
pub use models::{tag_value, Cursor, GqlTransaction, OrderEvent, Tag};
pub use store::{OrderRecord, OrderStore};
pub use sync::SyncEngine;
pub use workflows::{cancel, CancelError, CancelReceipt, OrderSide};
