//! # Buy-back engine public API
//!
//! The API layer is what the (out-of-scope) HTTP surface talks to. An API instance is created by
//! supplying a backend that implements [`crate::traits::MarketplaceDatabase`], plus the event
//! producers that notification subscribers hang off:
//!
//! ```rust,ignore
//! use buyback_engine::{events::EventProducers, ModerationApi, OrderFlowApi, SqliteDatabase};
//! let db = SqliteDatabase::new_with_url("sqlite://data/market.db", 5).await?;
//! let orders = OrderFlowApi::new(db.clone(), EventProducers::default());
//! let order = orders.create_order(new_order).await?;
//! ```
//!
//! * [`order_flow_api`] drives the buyer's order lifecycle and the inactivity processing.
//! * [`moderation_api`] drives campaign moderation, balance reservation and top-ups.
//! * [`order_objects`] holds the typed patch and report objects shared with the backends.
pub mod moderation_api;
pub mod order_flow_api;
pub mod order_objects;
