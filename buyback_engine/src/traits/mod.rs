//! Contracts that storage backends must implement to drive the buy-back engine.
//!
//! The split mirrors how the engine uses its storage:
//!
//! * [`MarketplaceDatabase`] is the highest level of behaviour: every method is a complete, atomic
//!   workflow transition (order creation with its stock decrement, a moderation decision with its
//!   reservation math, a balance top-up with its reactivation walk). No invariant-bearing
//!   computation may span two of these calls.
//! * [`OrderManagement`], [`ProductManagement`] and [`UserManagement`] are plain read/write stores.
//! * [`AuditManagement`] is the append-only history and balance ledger. Writes to it are
//!   best-effort from the engine's point of view: the primary transition is authoritative whether
//!   or not the audit row lands.
mod audit_management;
mod data_objects;
mod marketplace_database;
mod order_management;
mod product_management;
mod user_management;

pub use audit_management::{AuditError, AuditManagement};
pub use data_objects::{
    BalanceTopUp,
    OrderChanged,
    OrderCreated,
    PlanChange,
    ProductChanged,
    ProductRemoval,
    RestockedProduct,
    ReviewOutcome,
};
pub use marketplace_database::{MarketplaceDatabase, MarketplaceError};
pub use order_management::OrderManagement;
pub use product_management::ProductManagement;
pub use user_management::UserManagement;
