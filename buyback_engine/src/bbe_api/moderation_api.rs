use std::fmt::Debug;

use bbe_common::Credits;
use log::*;

use crate::{
    bbe_api::order_objects::{ProductPatch, ReviewRequest, UserPatch},
    db_types::{Action, NewHistoryEntry, NewProduct, Product, ProductStatus, User, UserRole},
    events::{BalanceIncreasedEvent, EventProducers, ProductActivatedEvent},
    ledger::SellerLedger,
    traits::{BalanceTopUp, MarketplaceDatabase, MarketplaceError, ProductChanged, ProductRemoval, ReviewOutcome},
};

/// `ModerationApi` covers the seller and moderator side of the marketplace: campaign submission and
/// edits, moderator reviews with the funding decision, balance top-ups, and role administration.
///
/// As with order flow, the backend owns atomicity and this layer owns permissions, the audit
/// trail, and notification hooks.
pub struct ModerationApi<B> {
    db: B,
    producers: EventProducers,
}

impl<B> Debug for ModerationApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ModerationApi")
    }
}

impl<B> ModerationApi<B> {
    pub fn new(db: B, producers: EventProducers) -> Self {
        Self { db, producers }
    }
}

impl<B> ModerationApi<B>
where B: MarketplaceDatabase
{
    /// Submits a new campaign. It lands in `Created` and waits for a moderator.
    pub async fn create_product(&self, product: NewProduct) -> Result<Product, MarketplaceError> {
        let product = self.db.insert_product(product).await?;
        debug!("🛡️ Campaign #{} \"{}\" submitted by seller #{}", product.id, product.name, product.seller_id);
        self.record_history(NewHistoryEntry::for_product(Action::ProductCreate, &product)).await;
        Ok(product)
    }

    /// Applies a moderator's verdict to a campaign.
    ///
    /// An approval only goes through to `Active` if the seller's balance covers the plan of every
    /// already-active campaign plus this one; otherwise the campaign lands in `NotPaid` and waits
    /// for a top-up. Any other requested status is applied verbatim. The review row records the
    /// status that actually stuck.
    pub async fn review_product(
        &self,
        product_id: i64,
        moderator_id: i64,
        review: ReviewRequest,
    ) -> Result<ReviewOutcome, MarketplaceError> {
        let moderator = self.require_moderator(moderator_id).await?;
        let outcome = self.db.review_product(product_id, moderator.id, &review).await?;
        info!(
            "🛡️ Moderator #{} reviewed campaign #{product_id}: requested {}, persisted {}",
            moderator.id, outcome.requested, outcome.after.status
        );
        if outcome.status_changed() {
            self.record_history(
                NewHistoryEntry::for_product(Action::StatusChanged, &outcome.after)
                    .by(moderator.id)
                    .with_snapshots(&outcome.before, &outcome.after),
            )
            .await;
        }
        let verdict = if outcome.intent_was_activation() { Action::ModerationDone } else { Action::ModerationFailed };
        self.record_history(NewHistoryEntry::for_product(verdict, &outcome.after).by(moderator.id)).await;
        if outcome.activated {
            for producer in &self.producers.product_activated_producer {
                producer.publish_event(ProductActivatedEvent::new(outcome.after.clone())).await;
            }
        }
        Ok(outcome)
    }

    /// Applies a seller's edit to a campaign.
    ///
    /// A patch that only changes `general_repurchases` is a plan resize and is decided by the
    /// funding rules without going back to moderation. Any other edit resets the campaign to
    /// `Created` for re-review. Edits can never set the status to `Active` directly.
    pub async fn update_product(&self, product_id: i64, patch: ProductPatch) -> Result<ProductChanged, MarketplaceError> {
        if patch.status == Some(ProductStatus::Active) {
            return Err(MarketplaceError::PermissionDenied(
                "a campaign can only be activated by a moderator review".to_string(),
            ));
        }
        if patch.is_empty() {
            let product =
                self.db.fetch_product(product_id).await?.ok_or(MarketplaceError::ProductNotFound(product_id))?;
            return Ok(ProductChanged { before: product.clone(), after: product });
        }
        let changed = if patch.is_plan_resize_only() {
            let new_plan = patch.general_repurchases.unwrap_or_default();
            let resize = self.db.resize_product_plan(product_id, new_plan).await?;
            debug!(
                "🛡️ Campaign #{product_id} plan resized by {} to {new_plan}, now {}",
                resize.delta, resize.after.status
            );
            ProductChanged { before: resize.before, after: resize.after }
        } else {
            self.db.revise_product(product_id, patch).await?
        };
        self.record_history(
            NewHistoryEntry::for_product(Action::ProductChanged, &changed.after)
                .with_snapshots(&changed.before, &changed.after),
        )
        .await;
        if changed.before.status != changed.after.status {
            self.record_history(NewHistoryEntry::for_product(Action::StatusChanged, &changed.after)).await;
        }
        Ok(changed)
    }

    /// Credits a seller's balance and wakes up as many unpaid campaigns as the new balance funds.
    pub async fn increase_balance(&self, user_id: i64, amount: Credits) -> Result<BalanceTopUp, MarketplaceError> {
        let topup = self.db.increase_balance(user_id, amount).await?;
        info!(
            "🛡️ Seller #{user_id} topped up by {amount}. Balance {}, {} campaign(s) activated",
            topup.new_balance,
            topup.activated.len()
        );
        for producer in &self.producers.balance_increased_producer {
            producer.publish_event(BalanceIncreasedEvent::new(user_id, amount, topup.new_balance)).await;
        }
        for product in &topup.activated {
            self.record_history(NewHistoryEntry::for_product(Action::StatusChanged, product)).await;
            for producer in &self.producers.product_activated_producer {
                producer.publish_event(ProductActivatedEvent::new(product.clone())).await;
            }
        }
        Ok(topup)
    }

    /// Removes a campaign. An archived campaign with undelivered stock refunds the leftovers to the
    /// seller's balance first.
    pub async fn delete_product(&self, product_id: i64) -> Result<ProductRemoval, MarketplaceError> {
        let removal = self.db.delete_product(product_id).await?;
        match removal.refunded {
            Some(refund) => info!("🛡️ Campaign #{product_id} removed, {refund} refunded to the seller"),
            None => info!("🛡️ Campaign #{product_id} removed"),
        }
        Ok(removal)
    }

    /// The seller's funding picture, normalized. Campaigns whose reservations the stored balance
    /// can no longer honor are reported as demoted.
    pub async fn seller_ledger(&self, user_id: i64) -> Result<SellerLedger, MarketplaceError> {
        let user = self.db.fetch_user(user_id).await?.ok_or(MarketplaceError::UserNotFound(user_id))?;
        let products = self.db.fetch_products_for_seller(user_id).await?;
        Ok(SellerLedger::normalized(user.balance, &products))
    }

    pub async fn get_product(&self, product_id: i64) -> Result<Option<Product>, MarketplaceError> {
        self.db.fetch_product(product_id).await
    }

    pub async fn products_for_seller(&self, seller_id: i64) -> Result<Vec<Product>, MarketplaceError> {
        self.db.fetch_products_for_seller(seller_id).await
    }

    /// Campaigns waiting in the moderation queue, oldest first.
    pub async fn products_to_review(&self) -> Result<Vec<Product>, MarketplaceError> {
        self.db.fetch_products_to_review().await
    }

    pub async fn ban_user(&self, moderator_id: i64, user_id: i64) -> Result<User, MarketplaceError> {
        let moderator = self.require_moderator(moderator_id).await?;
        let user = self.db.update_user(user_id, UserPatch::default().with_is_banned(true)).await?;
        info!("🛡️ User #{user_id} banned by moderator #{}", moderator.id);
        Ok(user)
    }

    pub async fn unban_user(&self, moderator_id: i64, user_id: i64) -> Result<User, MarketplaceError> {
        let moderator = self.require_moderator(moderator_id).await?;
        let user = self.db.update_user(user_id, UserPatch::default().with_is_banned(false)).await?;
        info!("🛡️ User #{user_id} unbanned by moderator #{}", moderator.id);
        Ok(user)
    }

    /// Grants moderator powers. Admin only.
    pub async fn promote_to_moderator(&self, admin_id: i64, user_id: i64) -> Result<User, MarketplaceError> {
        let admin = self.require_admin(admin_id).await?;
        let user = self.db.update_user(user_id, UserPatch::default().with_role(UserRole::Moderator)).await?;
        info!("🛡️ User #{user_id} promoted to moderator by admin #{}", admin.id);
        Ok(user)
    }

    /// Revokes moderator powers. Admin only.
    pub async fn demote_moderator(&self, admin_id: i64, user_id: i64) -> Result<User, MarketplaceError> {
        let admin = self.require_admin(admin_id).await?;
        let user = self.db.update_user(user_id, UserPatch::default().with_role(UserRole::Client)).await?;
        info!("🛡️ User #{user_id} demoted to client by admin #{}", admin.id);
        Ok(user)
    }

    async fn require_moderator(&self, user_id: i64) -> Result<User, MarketplaceError> {
        let user = self.db.fetch_user(user_id).await?.ok_or(MarketplaceError::UserNotFound(user_id))?;
        if !user.role.can_moderate() {
            return Err(MarketplaceError::PermissionDenied(format!(
                "user #{user_id} ({}) may not moderate campaigns",
                user.role
            )));
        }
        Ok(user)
    }

    async fn require_admin(&self, user_id: i64) -> Result<User, MarketplaceError> {
        let user = self.db.fetch_user(user_id).await?.ok_or(MarketplaceError::UserNotFound(user_id))?;
        if !user.role.is_admin() {
            return Err(MarketplaceError::PermissionDenied(format!(
                "user #{user_id} ({}) is not an administrator",
                user.role
            )));
        }
        Ok(user)
    }

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
