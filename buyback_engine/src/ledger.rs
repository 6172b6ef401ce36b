//! Pure reservation arithmetic for a seller's prepaid balance.
//!
//! A seller's `balance` is the number of giveaways they may fund across all of their `Active` campaigns at once.
//! Everything here is derived from the seller's product rows; nothing in this module touches storage.

use bbe_common::Credits;
use log::error;

use crate::db_types::{Product, ProductStatus};

/// A snapshot of a seller's reservation ledger.
///
/// Invariant after [`SellerLedger::normalized`]: `free_balance >= 0` and
/// `reserved_active + free_balance == balance`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SellerLedger {
    pub balance: Credits,
    /// Giveaway stock committed by currently funded (`Active`) campaigns.
    pub reserved_active: Credits,
    /// Stock planned under approved-but-unfunded (`NotPaid`) campaigns.
    pub unpaid_plan: Credits,
    /// `reserved_active + unpaid_plan`.
    pub total_plan: Credits,
    /// `balance - reserved_active`, never reported negative.
    pub free_balance: Credits,
    /// Campaigns that had to be flipped to `NotPaid` to bring `free_balance` back to non-negative.
    /// The caller is responsible for persisting these flips if it wants the correction to stick.
    pub demoted: Vec<i64>,
    /// True when even demoting every funded campaign could not restore a non-negative free balance.
    pub drift_detected: bool,
}

impl SellerLedger {
    /// Computes the raw ledger sums without normalization. `free_balance` may be negative here.
    pub fn new(balance: Credits, products: &[Product]) -> Self {
        let sum = |status: ProductStatus| -> Credits {
            products.iter().filter(|p| p.status == status).map(|p| Credits::from(p.remaining_products)).sum()
        };
        let reserved_active = sum(ProductStatus::Active);
        let unpaid_plan = sum(ProductStatus::NotPaid);
        Self {
            balance,
            reserved_active,
            unpaid_plan,
            total_plan: reserved_active + unpaid_plan,
            free_balance: balance - reserved_active,
            demoted: Vec::new(),
            drift_detected: false,
        }
    }

    /// Computes the ledger and repairs a negative free balance.
    ///
    /// Funded campaigns are walked most-recent-first; each is flipped to `NotPaid`, moving its
    /// `remaining_products` out of the reservation and into the unpaid plan, until the free balance
    /// is non-negative or the campaigns run out. The total plan is unchanged by a demotion, and
    /// `reserved_active + free_balance == balance` holds throughout. A remainder after the walk is
    /// drift; it is clamped to zero and reported.
    pub fn normalized(balance: Credits, products: &[Product]) -> Self {
        let mut ledger = Self::new(balance, products);
        if !ledger.free_balance.is_negative() {
            return ledger;
        }
        let mut funded: Vec<&Product> = products.iter().filter(|p| p.status == ProductStatus::Active).collect();
        funded.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        for product in funded {
            if !ledger.free_balance.is_negative() {
                break;
            }
            let released = Credits::from(product.remaining_products);
            ledger.free_balance += released;
            ledger.unpaid_plan += released;
            ledger.reserved_active -= released;
            ledger.demoted.push(product.id);
        }
        if ledger.free_balance.is_negative() {
            error!(
                "Ledger drift: free balance is still {} after demoting all funded campaigns. Clamping to zero.",
                ledger.free_balance
            );
            ledger.free_balance = Credits::zero();
            ledger.drift_detected = true;
        }
        ledger
    }
}

/// Sum of `general_repurchases` over a seller's `Active` products. This is the figure a moderator's
/// approval decision reserves against (the full requested plan, not just the unspent remainder).
pub fn reserved_plan(products: &[Product]) -> Credits {
    products
        .iter()
        .filter(|p| p.status == ProductStatus::Active)
        .map(|p| Credits::from(p.general_repurchases))
        .sum()
}

/// Sum of `remaining_products` over `Active` and `NotPaid` products: the balance a seller would need
/// to fund every approved campaign simultaneously.
pub fn necessary_balance(products: &[Product]) -> Credits {
    products
        .iter()
        .filter(|p| matches!(p.status, ProductStatus::Active | ProductStatus::NotPaid))
        .map(|p| Credits::from(p.remaining_products))
        .sum()
}

#[cfg(test)]
mod test {
    use chrono::{TimeZone, Utc};

    use super::*;

    fn product(id: i64, status: ProductStatus, general: i64, remaining: i64, day: u32) -> Product {
        let ts = Utc.with_ymd_and_hms(2024, 6, day, 12, 0, 0).unwrap();
        Product {
            id,
            seller_id: 1,
            name: format!("p{id}"),
            brand: String::new(),
            article: format!("art{id}"),
            category: String::new(),
            key_word: String::new(),
            general_repurchases: general,
            remaining_products: remaining,
            daily_repurchases: 0,
            price: 0.0,
            wb_price: 0.0,
            review_requirements: String::new(),
            image_path: None,
            status,
            created_at: ts,
            updated_at: ts,
        }
    }

    #[test]
    fn sums_split_by_status() {
        let products = vec![
            product(1, ProductStatus::Active, 10, 6, 1),
            product(2, ProductStatus::NotPaid, 5, 5, 2),
            product(3, ProductStatus::Archived, 8, 0, 3),
        ];
        let ledger = SellerLedger::new(Credits::from(20), &products);
        assert_eq!(ledger.reserved_active, Credits::from(6));
        assert_eq!(ledger.unpaid_plan, Credits::from(5));
        assert_eq!(ledger.total_plan, Credits::from(11));
        assert_eq!(ledger.free_balance, Credits::from(14));
        assert!(ledger.demoted.is_empty());
    }

    #[test]
    fn normalization_is_noop_when_balance_covers_reservation() {
        let products = vec![product(1, ProductStatus::Active, 10, 10, 1)];
        let ledger = SellerLedger::normalized(Credits::from(10), &products);
        assert_eq!(ledger.free_balance, Credits::zero());
        assert!(ledger.demoted.is_empty());
        assert!(!ledger.drift_detected);
    }

    #[test]
    fn normalization_demotes_newest_first() {
        let products = vec![
            product(1, ProductStatus::Active, 10, 10, 1),
            product(2, ProductStatus::Active, 10, 10, 5),
        ];
        // Balance only covers one of the two funded campaigns.
        let ledger = SellerLedger::normalized(Credits::from(10), &products);
        assert_eq!(ledger.demoted, vec![2]);
        assert_eq!(ledger.free_balance, Credits::zero());
        assert_eq!(ledger.balance, ledger.reserved_active + ledger.free_balance);
        assert!(!ledger.drift_detected);
    }

    #[test]
    fn normalization_conserves_the_balance_when_stock_is_partly_spent() {
        // A funded campaign that has already given away part of its plan reserves only its
        // remaining stock; demoting it must release exactly that much.
        let products = vec![product(1, ProductStatus::Active, 10, 8, 1)];
        let ledger = SellerLedger::normalized(Credits::from(5), &products);
        assert_eq!(ledger.demoted, vec![1]);
        assert!(!ledger.reserved_active.is_negative());
        assert_eq!(ledger.reserved_active + ledger.free_balance, ledger.balance);
        assert_eq!(ledger.unpaid_plan, Credits::from(8));
        assert_eq!(ledger.total_plan, Credits::from(8));
        assert!(!ledger.drift_detected);
    }

    #[test]
    fn normalization_clamps_and_reports_drift() {
        // No funded products to demote, yet the balance is deeply negative relative to reservation:
        // simulate by a funded campaign with zero remaining stock but a large plan.
        let products = vec![product(1, ProductStatus::Active, 100, 0, 1)];
        let ledger = SellerLedger::normalized(Credits::from(-5), &products);
        assert_eq!(ledger.free_balance, Credits::zero());
        assert!(ledger.drift_detected);
    }

    #[test]
    fn necessary_balance_covers_active_and_unpaid() {
        let products = vec![
            product(1, ProductStatus::Active, 10, 4, 1),
            product(2, ProductStatus::NotPaid, 5, 5, 2),
            product(3, ProductStatus::Rejected, 9, 9, 3),
        ];
        assert_eq!(necessary_balance(&products), Credits::from(9));
        assert_eq!(reserved_plan(&products), Credits::from(10));
    }
}
