//! Buy-Back Engine
//!
//! The buy-back engine powers a cashback marketplace: sellers fund giveaway campaigns for their
//! products from a prepaid balance, buyers purchase at full price and walk a multi-step proof flow,
//! and on approval the seller refunds the price difference as cashback. This library contains the
//! core logic; it has no opinions about the bot or web layer in front of it.
//!
//! The library is divided into three main sections:
//! 1. Storage ([`mod@sqlite`]). SQLite is the supported backend. You should never need to access
//!    the database directly; use the public API instead. The exception is the data types, defined
//!    in the `db_types` module, which are public.
//! 2. The engine public API ([`mod@bbe_api`]): [`OrderFlowApi`] for the buyer's order lifecycle and
//!    [`ModerationApi`] for the seller/moderator side. Backends implement the traits in
//!    [`mod@traits`] to serve these APIs.
//! 3. Events ([`mod@events`]). State transitions that warrant a notification (cashback paid,
//!    campaign activated, reminder due) are published to subscribers through a simple pub-sub
//!    seam, detached from the transaction that produced them.
pub mod bbe_api;
pub mod config;
pub mod db_types;
pub mod events;
pub mod helpers;
pub mod ledger;
pub mod sqlite;
pub mod sweep;
pub mod traits;

pub use bbe_api::{moderation_api::ModerationApi, order_flow_api::OrderFlowApi, order_objects};
pub use sqlite::SqliteDatabase;
pub use sweep::start_sweep_worker;
pub use traits::{
    AuditManagement,
    MarketplaceDatabase,
    MarketplaceError,
    OrderManagement,
    ProductManagement,
    UserManagement,
};
