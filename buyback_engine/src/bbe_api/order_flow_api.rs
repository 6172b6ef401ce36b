use std::fmt::Debug;

use chrono::{DateTime, Utc};
use log::*;

use crate::{
    bbe_api::order_objects::{OrderPatch, OrderReport, SweepOutcome},
    db_types::{Action, NewHistoryEntry, NewOrder, Order, OrderStatus},
    events::{CashbackPaidEvent, CashbackRejectedEvent, EventProducers, OrderReminderEvent},
    helpers::new_transaction_code,
    traits::{MarketplaceDatabase, MarketplaceError, OrderChanged},
};

/// How many fresh transaction codes we draw before giving up on a collision storm.
const MAX_CODE_ATTEMPTS: usize = 10;

/// `OrderFlowApi` drives the buyer's order lifecycle: creation against campaign stock, step-by-step
/// progress, terminal cashback outcomes, and the inactivity processing that reminds and then
/// cancels stalled orders.
///
/// The backend performs each transition as one atomic transaction; this layer adds the unique-code
/// retry loop, the audit trail, and the notification hooks. Audit and notification emission happen
/// after commit and are best-effort.
pub struct OrderFlowApi<B> {
    db: B,
    producers: EventProducers,
}

impl<B> Debug for OrderFlowApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "OrderFlowApi")
    }
}

impl<B> OrderFlowApi<B> {
    pub fn new(db: B, producers: EventProducers) -> Self {
        Self { db, producers }
    }
}

impl<B> OrderFlowApi<B>
where B: MarketplaceDatabase
{
    /// Creates a new order against a campaign.
    ///
    /// Fails with [`MarketplaceError::OutOfStock`] when the campaign is depleted, writing nothing.
    /// Otherwise the order is stored with a freshly drawn unique transaction code, the campaign's
    /// stock drops by one, and the campaign is archived if that was the last unit.
    pub async fn create_order(&self, order: NewOrder) -> Result<Order, MarketplaceError> {
        let mut last_conflict = None;
        for attempt in 0..MAX_CODE_ATTEMPTS {
            let code = new_transaction_code();
            if self.db.transaction_code_exists(&code).await? {
                debug!("🛒️ Transaction code {code} is taken. Drawing another ({attempt} so far)");
                last_conflict = Some(code);
                continue;
            }
            match self.db.insert_order(order.clone(), code).await {
                Ok(created) => {
                    debug!(
                        "🛒️ Order {} created for product #{}. {} units left",
                        created.order.transaction_code, created.product.id, created.product.remaining_products
                    );
                    if created.order.step == 0 {
                        self.record_history(NewHistoryEntry::for_order(Action::AgreeTerms, &created.order)).await;
                    }
                    if created.stock_depleted {
                        self.record_history(NewHistoryEntry::for_product(Action::Ended, &created.product)).await;
                    }
                    if created.product_status_changed {
                        self.record_history(NewHistoryEntry::for_product(Action::StatusChanged, &created.product))
                            .await;
                    }
                    return Ok(created.order);
                },
                // Lost the uniqueness race between the existence check and the insert. Draw again.
                Err(MarketplaceError::CodeConflict(code)) => {
                    debug!("🛒️ Transaction code {code} was claimed concurrently. Drawing another");
                    last_conflict = Some(code);
                },
                Err(e) => return Err(e),
            }
        }
        error!("🛒️ Could not find a free transaction code after {MAX_CODE_ATTEMPTS} attempts");
        Err(MarketplaceError::CodeConflict(last_conflict.unwrap_or_else(|| "??????".to_string().into())))
    }

    /// Applies a partial update to an order and emits the audit events the transition warrants.
    ///
    /// Every side effect is keyed on the old-to-new transition, never on the new value alone, so
    /// replaying an identical update is a no-op with no duplicate events.
    pub async fn update_order(&self, order_id: i64, patch: OrderPatch) -> Result<OrderChanged, MarketplaceError> {
        let changed = self.db.update_order(order_id, patch).await?;
        self.emit_order_events(&changed).await;
        Ok(changed)
    }

    async fn emit_order_events(&self, changed: &OrderChanged) {
        let old = &changed.old_order;
        let new = &changed.new_order;
        if changed.step_advanced() {
            if let Some(action) = Action::for_step(new.step) {
                self.record_history(
                    NewHistoryEntry::for_order(action, new).with_snapshots(old, new),
                )
                .await;
            }
        }
        if changed.status_transitioned() {
            match new.status {
                OrderStatus::CashbackPaid => {
                    self.record_history(NewHistoryEntry::for_order(Action::CashbackDone, new).with_snapshots(old, new))
                        .await;
                    for producer in &self.producers.cashback_paid_producer {
                        producer.publish_event(CashbackPaidEvent::new(new.clone())).await;
                    }
                },
                OrderStatus::CashbackRejected => {
                    self.record_history(
                        NewHistoryEntry::for_order(Action::CashbackRejected, new).with_snapshots(old, new),
                    )
                    .await;
                    for producer in &self.producers.cashback_rejected_producer {
                        producer.publish_event(CashbackRejectedEvent::new(new.clone())).await;
                    }
                },
                OrderStatus::Cancelled | OrderStatus::CashbackNotPaid => {},
            }
        }
        if let Some(restock) = &changed.restock {
            if restock.reactivated {
                self.record_history(NewHistoryEntry::for_product(Action::StatusChanged, &restock.product)).await;
            }
        }
    }

    /// Fetches an order together with the campaign article and the cashback owed to the buyer.
    pub async fn get_user_report(&self, order_id: i64) -> Result<OrderReport, MarketplaceError> {
        let order = self.db.fetch_order(order_id).await?.ok_or(MarketplaceError::OrderNotFound(order_id))?;
        let product = match order.product_id {
            Some(product_id) => self.db.fetch_product(product_id).await?,
            None => None,
        };
        let (article, cashback) = match product {
            Some(p) => (Some(p.article.clone()), p.wb_price - p.price),
            None => (None, 0.0),
        };
        Ok(OrderReport { order, article, cashback })
    }

    pub async fn fetch_order(&self, order_id: i64) -> Result<Option<Order>, MarketplaceError> {
        self.db.fetch_order(order_id).await
    }

    pub async fn orders_for_user(&self, user_id: i64) -> Result<Vec<Order>, MarketplaceError> {
        self.db.fetch_orders_for_user(user_id).await
    }

    /// Pending orders against a seller's campaigns.
    pub async fn orders_for_seller(&self, seller_id: i64) -> Result<Vec<Order>, MarketplaceError> {
        self.db.fetch_orders_for_seller(seller_id).await
    }

    /// Every order against a seller's campaigns, terminal ones included.
    pub async fn all_orders_for_seller(&self, seller_id: i64) -> Result<Vec<Order>, MarketplaceError> {
        self.db.fetch_all_orders_for_seller(seller_id).await
    }

    /// Removes an order outright. Unlike cancellation, no stock is returned to the campaign.
    pub async fn delete_order(&self, order_id: i64) -> Result<bool, MarketplaceError> {
        self.db.delete_order(order_id).await
    }

    /// One pass of the inactivity processing. Also triggered on demand for ops and tests.
    ///
    /// Orders untouched since `reminder_cutoff` that have never been reminded get a nudge;
    /// orders untouched since `cancel_cutoff` that were already reminded get cancelled through the
    /// regular [`Self::update_order`] path, restocking their campaigns. Each candidate is handled
    /// independently: one failure is logged and skipped, never aborting the batch.
    pub async fn process_inactive_orders(
        &self,
        reminder_cutoff: DateTime<Utc>,
        cancel_cutoff: DateTime<Utc>,
    ) -> Result<SweepOutcome, MarketplaceError> {
        let mut outcome = SweepOutcome::default();

        // Cancellations run first so an order reminded on this pass survives at least one interval.
        for order in self.db.fetch_inactive_after_reminder(cancel_cutoff).await? {
            if order.status.is_terminal() {
                continue;
            }
            match self.update_order(order.id, OrderPatch::default().with_status(OrderStatus::Cancelled)).await {
                Ok(_) => outcome.cancelled.push(order.id),
                Err(e) => {
                    warn!("⏰️ Failed to auto-cancel stalled order #{}: {e}", order.id);
                    outcome.failures += 1;
                },
            }
        }

        for order in self.db.fetch_inactive_orders(reminder_cutoff).await? {
            match self.db.mark_order_reminded(order.id).await {
                Ok(true) => {
                    for producer in &self.producers.order_reminder_producer {
                        producer.publish_event(OrderReminderEvent::new(order.clone())).await;
                    }
                    self.record_history(NewHistoryEntry::for_order(Action::ReminderSent, &order)).await;
                    outcome.reminded.push(order.id);
                },
                Ok(false) => {
                    // Raced with another sweep pass. Nothing to do.
                    trace!("⏰️ Order #{} was reminded concurrently", order.id);
                },
                Err(e) => {
                    warn!("⏰️ Failed to mark order #{} as reminded: {e}", order.id);
                    outcome.failures += 1;
                },
            }
        }

        info!(
            "⏰️ Inactivity pass complete. {} reminded, {} cancelled, {} failures",
            outcome.reminded.len(),
            outcome.cancelled.len(),
            outcome.failures
        );
        Ok(outcome)
    }

    /// Best-effort audit append. The primary transition has already committed; a failed audit row
    /// is logged and swallowed.
    async fn record_history(&self, entry: NewHistoryEntry) {
        let action = entry.action;
        if let Err(e) = self.db.append_history(entry).await {
            warn!("📝️ Dropped audit event {action}: {e}");
        }
    }

    pub fn db(&self) -> &B {
        &self.db
    }
}
