//! Public data types shared between the engine API and the database backends.

use std::{fmt::Display, str::FromStr};

use bbe_common::Credits;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[error("{0}")]
pub struct ConversionError(String);

//--------------------------------------   ProductStatus     ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
pub enum ProductStatus {
    /// The campaign has been submitted by the seller and awaits moderation.
    Created,
    /// The campaign passed moderation and is funded by the seller's prepaid balance.
    Active,
    /// The campaign passed moderation, but the seller's balance cannot cover its plan.
    NotPaid,
    /// The campaign has been switched off by the seller.
    Disabled,
    /// The campaign was rejected by moderation.
    Rejected,
    /// All stock has been given away. Stock returned by a cancelled order reactivates the campaign.
    Archived,
}

impl ProductStatus {
    pub fn is_funded(&self) -> bool {
        matches!(self, ProductStatus::Active)
    }
}

impl Display for ProductStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ProductStatus::Created => "Created",
            ProductStatus::Active => "Active",
            ProductStatus::NotPaid => "NotPaid",
            ProductStatus::Disabled => "Disabled",
            ProductStatus::Rejected => "Rejected",
            ProductStatus::Archived => "Archived",
        };
        write!(f, "{s}")
    }
}

impl FromStr for ProductStatus {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Created" => Ok(Self::Created),
            "Active" => Ok(Self::Active),
            "NotPaid" => Ok(Self::NotPaid),
            "Disabled" => Ok(Self::Disabled),
            "Rejected" => Ok(Self::Rejected),
            "Archived" => Ok(Self::Archived),
            s => Err(ConversionError(format!("Invalid product status: {s}"))),
        }
    }
}

//--------------------------------------    OrderStatus      ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
pub enum OrderStatus {
    /// The buyer is working through the purchase-and-proof flow. The only non-terminal status.
    CashbackNotPaid,
    /// The seller has paid the cashback out. Terminal.
    CashbackPaid,
    /// The seller or a moderator rejected the cashback claim. Terminal.
    CashbackRejected,
    /// The order was abandoned or withdrawn. Terminal. Stock is returned to the campaign.
    Cancelled,
}

impl OrderStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, OrderStatus::CashbackNotPaid)
    }
}

impl Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            OrderStatus::CashbackNotPaid => "CashbackNotPaid",
            OrderStatus::CashbackPaid => "CashbackPaid",
            OrderStatus::CashbackRejected => "CashbackRejected",
            OrderStatus::Cancelled => "Cancelled",
        };
        write!(f, "{s}")
    }
}

impl FromStr for OrderStatus {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "CashbackNotPaid" => Ok(Self::CashbackNotPaid),
            "CashbackPaid" => Ok(Self::CashbackPaid),
            "CashbackRejected" => Ok(Self::CashbackRejected),
            "Cancelled" => Ok(Self::Cancelled),
            s => Err(ConversionError(format!("Invalid order status: {s}"))),
        }
    }
}

//--------------------------------------      UserRole       ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
pub enum UserRole {
    User,
    Client,
    Seller,
    Moderator,
    Admin,
}

impl UserRole {
    pub fn can_moderate(&self) -> bool {
        matches!(self, UserRole::Moderator | UserRole::Admin)
    }

    pub fn is_admin(&self) -> bool {
        matches!(self, UserRole::Admin)
    }
}

impl Display for UserRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            UserRole::User => "User",
            UserRole::Client => "Client",
            UserRole::Seller => "Seller",
            UserRole::Moderator => "Moderator",
            UserRole::Admin => "Admin",
        };
        write!(f, "{s}")
    }
}

impl FromStr for UserRole {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "User" => Ok(Self::User),
            "Client" => Ok(Self::Client),
            "Seller" => Ok(Self::Seller),
            "Moderator" => Ok(Self::Moderator),
            "Admin" => Ok(Self::Admin),
            s => Err(ConversionError(format!("Invalid user role: {s}"))),
        }
    }
}

//--------------------------------------       Action        ---------------------------------------------------------
/// Tags for the append-only audit trail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
pub enum Action {
    ProductCreate,
    ProductChanged,
    StatusChanged,
    ModerationDone,
    ModerationFailed,
    Ended,
    AgreeTerms,
    FirstStepDone,
    SecondStepDone,
    ThirdStepDone,
    FourthStepDone,
    FifthStepDone,
    SixthStepDone,
    SeventhStepDone,
    CashbackDone,
    CashbackRejected,
    ReminderSent,
}

impl Action {
    /// Maps a buyer step to its audit tag. Step 0 is covered by [`Action::AgreeTerms`] at order creation.
    pub fn for_step(step: i64) -> Option<Action> {
        match step {
            1 => Some(Action::FirstStepDone),
            2 => Some(Action::SecondStepDone),
            3 => Some(Action::ThirdStepDone),
            4 => Some(Action::FourthStepDone),
            5 => Some(Action::FifthStepDone),
            6 => Some(Action::SixthStepDone),
            7 => Some(Action::SeventhStepDone),
            _ => None,
        }
    }
}

impl Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{self:?}")
    }
}

//-------------------------------------- TransactionCode     ---------------------------------------------------------
/// The human-shareable deal code printed on an order. Unique across all orders.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(transparent)]
pub struct TransactionCode(pub String);

impl FromStr for TransactionCode {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.to_string()))
    }
}

impl From<String> for TransactionCode {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl Display for TransactionCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl TransactionCode {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

//--------------------------------------        User         ---------------------------------------------------------
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: i64,
    pub telegram_id: Option<i64>,
    pub nickname: Option<String>,
    pub role: UserRole,
    /// Prepaid giveaway credits. The single source of truth for how many giveaways the seller may fund at once.
    pub balance: Credits,
    pub is_seller: bool,
    pub is_banned: bool,
    pub has_discount: bool,
    pub referrer_bonus: i64,
    /// Who invited this user, if anyone. Stored as a plain id to keep the graph flat.
    pub invited_by: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default)]
pub struct NewUser {
    pub telegram_id: Option<i64>,
    pub nickname: Option<String>,
    pub role: Option<UserRole>,
    pub balance: Credits,
    pub invited_by: Option<i64>,
}

impl NewUser {
    pub fn with_nickname<S: Into<String>>(nickname: S) -> Self {
        Self { nickname: Some(nickname.into()), ..Default::default() }
    }

    pub fn with_role(mut self, role: UserRole) -> Self {
        self.role = Some(role);
        self
    }

    pub fn with_balance(mut self, balance: Credits) -> Self {
        self.balance = balance;
        self
    }
}

//--------------------------------------      Product        ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Product {
    pub id: i64,
    pub seller_id: i64,
    pub name: String,
    pub brand: String,
    pub article: String,
    pub category: String,
    pub key_word: String,
    /// The total number of giveaways the seller asked for.
    pub general_repurchases: i64,
    /// Live stock counter. Never negative. Zero for archived campaigns.
    pub remaining_products: i64,
    pub daily_repurchases: i64,
    /// The discounted price the buyer actually pays.
    pub price: f64,
    /// The marketplace list price. `wb_price - price` is the cashback owed to the buyer.
    pub wb_price: f64,
    pub review_requirements: String,
    pub image_path: Option<String>,
    pub status: ProductStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewProduct {
    pub seller_id: i64,
    pub name: String,
    pub brand: String,
    pub article: String,
    pub category: String,
    pub key_word: String,
    pub general_repurchases: i64,
    pub daily_repurchases: i64,
    pub price: f64,
    pub wb_price: f64,
    pub review_requirements: String,
    pub image_path: Option<String>,
}

impl NewProduct {
    pub fn new<S: Into<String>>(seller_id: i64, name: S, article: S, general_repurchases: i64) -> Self {
        Self {
            seller_id,
            name: name.into(),
            brand: String::new(),
            article: article.into(),
            category: String::new(),
            key_word: String::new(),
            general_repurchases,
            daily_repurchases: 0,
            price: 0.0,
            wb_price: 0.0,
            review_requirements: String::new(),
            image_path: None,
        }
    }

    pub fn with_prices(mut self, price: f64, wb_price: f64) -> Self {
        self.price = price;
        self.wb_price = wb_price;
        self
    }
}

//--------------------------------------       Order         ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Order {
    pub id: i64,
    pub user_id: i64,
    pub seller_id: i64,
    /// Null once the campaign has been deleted; the order record survives for reporting.
    pub product_id: Option<i64>,
    pub transaction_code: TransactionCode,
    /// Buyer progress through the purchase-and-proof flow, 0..=7.
    pub step: i64,
    pub status: OrderStatus,
    pub card_number: Option<String>,
    pub phone_number: Option<String>,
    pub bank: Option<String>,
    pub receipt_number: Option<String>,
    pub order_date: Option<DateTime<Utc>>,
    /// Proof screenshots uploaded by the buyer, one per step of the purchase flow.
    pub search_screenshot_path: Option<String>,
    pub cart_screenshot_path: Option<String>,
    pub final_cart_screenshot_path: Option<String>,
    pub delivery_screenshot_path: Option<String>,
    pub barcode_screenshot_path: Option<String>,
    pub review_screenshot_path: Option<String>,
    pub receipt_screenshot_path: Option<String>,
    /// Set once by the inactivity sweep. Non-null means the buyer has already been nudged.
    pub reminded_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewOrder {
    pub user_id: i64,
    pub seller_id: i64,
    pub product_id: i64,
    pub step: i64,
    pub status: OrderStatus,
}

impl NewOrder {
    pub fn new(user_id: i64, seller_id: i64, product_id: i64) -> Self {
        Self { user_id, seller_id, product_id, step: 0, status: OrderStatus::CashbackNotPaid }
    }

    pub fn at_step(mut self, step: i64) -> Self {
        self.step = step;
        self
    }
}

//--------------------------------------  ModeratorReview    ---------------------------------------------------------
/// Append-only record of a moderation decision. Never mutated.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ModeratorReview {
    pub id: i64,
    pub moderator_id: i64,
    pub product_id: i64,
    pub status_before: ProductStatus,
    pub status_after: ProductStatus,
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
}

//--------------------------------------    HistoryEntry     ---------------------------------------------------------
/// Append-only audit event. Written after the primary state transition commits; consumed for reporting only.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct HistoryEntry {
    pub id: i64,
    pub user_id: Option<i64>,
    pub creator_id: Option<i64>,
    pub product_id: Option<i64>,
    pub order_id: Option<i64>,
    pub action: Action,
    pub json_before: Option<String>,
    pub json_after: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewHistoryEntry {
    pub user_id: Option<i64>,
    pub creator_id: Option<i64>,
    pub product_id: Option<i64>,
    pub order_id: Option<i64>,
    pub action: Action,
    pub json_before: Option<String>,
    pub json_after: Option<String>,
}

impl NewHistoryEntry {
    pub fn new(action: Action) -> Self {
        Self {
            user_id: None,
            creator_id: None,
            product_id: None,
            order_id: None,
            action,
            json_before: None,
            json_after: None,
        }
    }

    pub fn for_order(action: Action, order: &Order) -> Self {
        let mut entry = Self::new(action);
        entry.user_id = Some(order.user_id);
        entry.order_id = Some(order.id);
        entry.product_id = order.product_id;
        entry
    }

    pub fn for_product(action: Action, product: &Product) -> Self {
        let mut entry = Self::new(action);
        entry.user_id = Some(product.seller_id);
        entry.product_id = Some(product.id);
        entry
    }

    pub fn by(mut self, creator_id: i64) -> Self {
        self.creator_id = Some(creator_id);
        self
    }

    /// Attaches before/after snapshots, serialized as JSON. Serialization failures degrade to no snapshot.
    pub fn with_snapshots<T: Serialize>(mut self, before: &T, after: &T) -> Self {
        self.json_before = serde_json::to_string(before).ok();
        self.json_after = serde_json::to_string(after).ok();
        self
    }
}

//--------------------------------------    BalanceEntry     ---------------------------------------------------------
/// One row of the seller's balance ledger. Positive deltas are top-ups or refunds, negative deltas are
/// reservation debits made when a campaign is activated.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct BalanceEntry {
    pub id: i64,
    pub user_id: i64,
    pub delta: Credits,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewBalanceEntry {
    pub user_id: i64,
    pub delta: Credits,
}

impl NewBalanceEntry {
    pub fn new(user_id: i64, delta: Credits) -> Self {
        Self { user_id, delta }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn statuses_round_trip() {
        for s in
            [ProductStatus::Created, ProductStatus::Active, ProductStatus::NotPaid, ProductStatus::Archived]
        {
            assert_eq!(s.to_string().parse::<ProductStatus>().unwrap(), s);
        }
        for s in [
            OrderStatus::CashbackNotPaid,
            OrderStatus::CashbackPaid,
            OrderStatus::CashbackRejected,
            OrderStatus::Cancelled,
        ] {
            assert_eq!(s.to_string().parse::<OrderStatus>().unwrap(), s);
        }
        assert!("Bogus".parse::<OrderStatus>().is_err());
    }

    #[test]
    fn only_cashback_not_paid_is_pending() {
        assert!(!OrderStatus::CashbackNotPaid.is_terminal());
        assert!(OrderStatus::CashbackPaid.is_terminal());
        assert!(OrderStatus::CashbackRejected.is_terminal());
        assert!(OrderStatus::Cancelled.is_terminal());
    }

    #[test]
    fn step_actions() {
        assert_eq!(Action::for_step(1), Some(Action::FirstStepDone));
        assert_eq!(Action::for_step(7), Some(Action::SeventhStepDone));
        assert_eq!(Action::for_step(0), None);
        assert_eq!(Action::for_step(8), None);
    }
}
