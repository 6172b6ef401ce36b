use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::db_types::{Order, OrderStatus, ProductStatus, UserRole};

//--------------------------------------     OrderPatch      ---------------------------------------------------------
/// A partial update to an order. `None` fields are left untouched; only fields that are present are
/// applied, so replaying the same patch is always safe.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OrderPatch {
    pub step: Option<i64>,
    pub status: Option<OrderStatus>,
    pub card_number: Option<String>,
    pub phone_number: Option<String>,
    pub bank: Option<String>,
    pub receipt_number: Option<String>,
    pub order_date: Option<DateTime<Utc>>,
    pub search_screenshot_path: Option<String>,
    pub cart_screenshot_path: Option<String>,
    pub final_cart_screenshot_path: Option<String>,
    pub delivery_screenshot_path: Option<String>,
    pub barcode_screenshot_path: Option<String>,
    pub review_screenshot_path: Option<String>,
    pub receipt_screenshot_path: Option<String>,
}

impl OrderPatch {
    pub fn with_step(mut self, step: i64) -> Self {
        self.step = Some(step);
        self
    }

    pub fn with_status(mut self, status: OrderStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_card_number<S: Into<String>>(mut self, card_number: S) -> Self {
        self.card_number = Some(card_number.into());
        self
    }

    pub fn with_phone_number<S: Into<String>>(mut self, phone_number: S) -> Self {
        self.phone_number = Some(phone_number.into());
        self
    }

    pub fn with_bank<S: Into<String>>(mut self, bank: S) -> Self {
        self.bank = Some(bank.into());
        self
    }

    pub fn with_receipt_number<S: Into<String>>(mut self, receipt_number: S) -> Self {
        self.receipt_number = Some(receipt_number.into());
        self
    }

    pub fn with_order_date(mut self, order_date: DateTime<Utc>) -> Self {
        self.order_date = Some(order_date);
        self
    }

    pub fn with_search_screenshot_path<S: Into<String>>(mut self, path: S) -> Self {
        self.search_screenshot_path = Some(path.into());
        self
    }

    pub fn with_cart_screenshot_path<S: Into<String>>(mut self, path: S) -> Self {
        self.cart_screenshot_path = Some(path.into());
        self
    }

    pub fn with_final_cart_screenshot_path<S: Into<String>>(mut self, path: S) -> Self {
        self.final_cart_screenshot_path = Some(path.into());
        self
    }

    pub fn with_delivery_screenshot_path<S: Into<String>>(mut self, path: S) -> Self {
        self.delivery_screenshot_path = Some(path.into());
        self
    }

    pub fn with_barcode_screenshot_path<S: Into<String>>(mut self, path: S) -> Self {
        self.barcode_screenshot_path = Some(path.into());
        self
    }

    pub fn with_review_screenshot_path<S: Into<String>>(mut self, path: S) -> Self {
        self.review_screenshot_path = Some(path.into());
        self
    }

    pub fn with_receipt_screenshot_path<S: Into<String>>(mut self, path: S) -> Self {
        self.receipt_screenshot_path = Some(path.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.step.is_none() && self.status.is_none() && !self.touches_artifacts()
    }

    /// True when the patch carries a status and nothing else.
    pub fn is_status_only(&self) -> bool {
        self.status.is_some() && self.step.is_none() && !self.touches_artifacts()
    }

    fn touches_artifacts(&self) -> bool {
        self.card_number.is_some()
            || self.phone_number.is_some()
            || self.bank.is_some()
            || self.receipt_number.is_some()
            || self.order_date.is_some()
            || self.search_screenshot_path.is_some()
            || self.cart_screenshot_path.is_some()
            || self.final_cart_screenshot_path.is_some()
            || self.delivery_screenshot_path.is_some()
            || self.barcode_screenshot_path.is_some()
            || self.review_screenshot_path.is_some()
            || self.receipt_screenshot_path.is_some()
    }
}

//--------------------------------------    ProductPatch     ---------------------------------------------------------
/// A partial update to a campaign, as submitted by its seller.
///
/// A patch that only carries `general_repurchases` is a plan resize and goes through the funding
/// decision; anything else sends the campaign back to moderation. A patch can never set the status
/// to `Active` — only a moderator review does that.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProductPatch {
    pub name: Option<String>,
    pub brand: Option<String>,
    pub article: Option<String>,
    pub category: Option<String>,
    pub key_word: Option<String>,
    pub general_repurchases: Option<i64>,
    pub daily_repurchases: Option<i64>,
    pub price: Option<f64>,
    pub wb_price: Option<f64>,
    pub review_requirements: Option<String>,
    pub image_path: Option<String>,
    pub status: Option<ProductStatus>,
}

impl ProductPatch {
    pub fn with_name<S: Into<String>>(mut self, name: S) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_general_repurchases(mut self, general_repurchases: i64) -> Self {
        self.general_repurchases = Some(general_repurchases);
        self
    }

    pub fn with_price(mut self, price: f64) -> Self {
        self.price = Some(price);
        self
    }

    pub fn with_status(mut self, status: ProductStatus) -> Self {
        self.status = Some(status);
        self
    }

    /// True when the patch only resizes the plan and touches nothing else.
    pub fn is_plan_resize_only(&self) -> bool {
        self.general_repurchases.is_some()
            && self.name.is_none()
            && self.brand.is_none()
            && self.article.is_none()
            && self.category.is_none()
            && self.key_word.is_none()
            && self.daily_repurchases.is_none()
            && self.price.is_none()
            && self.wb_price.is_none()
            && self.review_requirements.is_none()
            && self.image_path.is_none()
            && self.status.is_none()
    }

    pub fn is_empty(&self) -> bool {
        self.general_repurchases.is_none()
            && self.name.is_none()
            && self.brand.is_none()
            && self.article.is_none()
            && self.category.is_none()
            && self.key_word.is_none()
            && self.daily_repurchases.is_none()
            && self.price.is_none()
            && self.wb_price.is_none()
            && self.review_requirements.is_none()
            && self.image_path.is_none()
            && self.status.is_none()
    }
}

//--------------------------------------     UserPatch       ---------------------------------------------------------
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UserPatch {
    pub nickname: Option<String>,
    pub role: Option<UserRole>,
    pub is_seller: Option<bool>,
    pub is_banned: Option<bool>,
    pub has_discount: Option<bool>,
}

impl UserPatch {
    pub fn with_role(mut self, role: UserRole) -> Self {
        self.role = Some(role);
        self
    }

    pub fn with_is_seller(mut self, is_seller: bool) -> Self {
        self.is_seller = Some(is_seller);
        self
    }

    pub fn with_is_banned(mut self, is_banned: bool) -> Self {
        self.is_banned = Some(is_banned);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.nickname.is_none()
            && self.role.is_none()
            && self.is_seller.is_none()
            && self.is_banned.is_none()
            && self.has_discount.is_none()
    }
}

//--------------------------------------    ReviewRequest    ---------------------------------------------------------
/// A moderator's decision on a campaign under review.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewRequest {
    /// The status the moderator wants. `Active` is subject to the funding decision.
    pub status: ProductStatus,
    pub comment: Option<String>,
}

impl ReviewRequest {
    pub fn approve() -> Self {
        Self { status: ProductStatus::Active, comment: None }
    }

    pub fn reject<S: Into<String>>(comment: S) -> Self {
        Self { status: ProductStatus::Rejected, comment: Some(comment.into()) }
    }

    pub fn with_comment<S: Into<String>>(mut self, comment: S) -> Self {
        self.comment = Some(comment.into());
        self
    }
}

//--------------------------------------     OrderReport     ---------------------------------------------------------
/// A buyer-facing summary of an order, augmented with the campaign's article and the cashback owed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderReport {
    pub order: Order,
    pub article: Option<String>,
    /// `wb_price - price`: the amount paid back to the buyer on successful proof.
    pub cashback: f64,
}

//--------------------------------------    SweepOutcome     ---------------------------------------------------------
/// What one pass of the inactivity sweep did.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SweepOutcome {
    /// Orders that received a "continue your purchase" nudge this pass.
    pub reminded: Vec<i64>,
    /// Orders auto-cancelled this pass.
    pub cancelled: Vec<i64>,
    /// Per-order failures that were logged and skipped.
    pub failures: usize,
}

impl SweepOutcome {
    pub fn total(&self) -> usize {
        self.reminded.len() + self.cancelled.len()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn plan_resize_detection() {
        let patch = ProductPatch::default().with_general_repurchases(20);
        assert!(patch.is_plan_resize_only());
        let patch = patch.with_price(99.0);
        assert!(!patch.is_plan_resize_only());
        assert!(ProductPatch::default().is_empty());
    }

    #[test]
    fn order_patch_builders() {
        let patch = OrderPatch::default().with_step(3).with_bank("Alpha");
        assert_eq!(patch.step, Some(3));
        assert_eq!(patch.bank.as_deref(), Some("Alpha"));
        assert!(!patch.is_empty());
        assert!(OrderPatch::default().is_empty());
    }

    #[test]
    fn status_only_detection() {
        let patch = OrderPatch::default().with_status(OrderStatus::Cancelled);
        assert!(patch.is_status_only());
        assert!(!patch.with_step(2).is_status_only());
        let patch = OrderPatch::default()
            .with_status(OrderStatus::Cancelled)
            .with_delivery_screenshot_path("shots/4.png");
        assert!(!patch.is_status_only());
        assert!(!OrderPatch::default().is_status_only());
    }
}
