//! # Domain Types
//!
//! Core domain types used throughout Bazaar Billing.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    Customer     │   │     Product     │   │      Bill       │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id (UUID)      │   │  id (UUID)      │   │  id (UUID)      │       │
//! │  │  email (unique) │   │  name (unique)  │   │  customer_id    │       │
//! │  │  name, phone    │   │  price (MRP)    │   │  total_quantity │       │
//! │  │  address        │   │  rate, stock    │   │  total_amount   │       │
//! │  └─────────────────┘   └─────────────────┘   │  payment_method │       │
//! │                                              └─────────────────┘       │
//! │  ┌─────────────────┐   ┌─────────────────┐                             │
//! │  │    BillItem     │   │    Feedback     │                             │
//! │  │  ─────────────  │   │  ─────────────  │                             │
//! │  │  bill_id (FK)   │   │  customer_id    │                             │
//! │  │  product_id     │   │  rating (1-5)   │                             │
//! │  │  quantity       │   │  comments       │                             │
//! │  │  unit_rate      │   └─────────────────┘                             │
//! │  └─────────────────┘                                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Bill Lifecycle
//! A bill is **open** while `payment_method` is `None` and **paid**
//! (terminal) once a method is recorded. Open bills are resumable; paid
//! bills are never reopened and never deleted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::money::Money;

// =============================================================================
// Customer
// =============================================================================

/// A registered customer.
///
/// Email is the uniqueness key. Customers are immutable after creation;
/// there is no update path.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Customer {
    /// Unique identifier (UUID v4).
    pub id: String,

    pub name: String,

    /// Uniqueness key; at most one customer per email.
    pub email: String,

    /// 10-digit phone number.
    pub phone: String,

    pub address: String,

    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Product
// =============================================================================

/// A product in the catalog.
///
/// Carries two prices: `price_cents` is the MRP printed on the shelf,
/// `rate_cents` is what the shop actually bills, never above the MRP.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Product {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Display name - business identifier, unique in the catalog.
    pub name: String,

    /// MRP in cents (smallest currency unit).
    pub price_cents: i64,

    /// Billed rate in cents; 0 <= rate <= price.
    pub rate_cents: i64,

    /// Current stock level. Never negative.
    pub stock: i64,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Returns the MRP as a Money type.
    #[inline]
    pub fn price(&self) -> Money {
        Money::from_cents(self.price_cents)
    }

    /// Returns the billed rate as a Money type.
    #[inline]
    pub fn rate(&self) -> Money {
        Money::from_cents(self.rate_cents)
    }
}

// =============================================================================
// Payment Method
// =============================================================================

/// How a bill was settled. Recorded on the bill at payment commit;
/// a bill with no method is still open.
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    /// Physical cash over the counter.
    Cash,
    /// Card payment (dummy authorization, no external call).
    Card,
    /// UPI-style transfer against an identifier and reference token.
    Upi,
}

impl PaymentMethod {
    /// Stable lowercase name, matching the stored representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Cash => "cash",
            PaymentMethod::Card => "card",
            PaymentMethod::Upi => "upi",
        }
    }
}

// =============================================================================
// Bill
// =============================================================================

/// A bill: the aggregate root of the ledger.
///
/// ## Totals Invariant
/// `total_quantity` and `total_amount_cents` are maintained transactionally
/// with every line item mutation and always equal the recomputed sums over
/// the bill's current items. They are never edited independently.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Bill {
    /// Unique identifier (UUID v4).
    pub id: String,

    pub customer_id: String,

    /// Σ item.quantity over current line items.
    pub total_quantity: i64,

    /// Σ item.quantity × item.unit_rate over current line items, in cents.
    pub total_amount_cents: i64,

    /// None while open; set exactly once at payment commit.
    pub payment_method: Option<PaymentMethod>,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

impl Bill {
    /// A bill is open (mutable, payable) until a payment method is recorded.
    #[inline]
    pub fn is_open(&self) -> bool {
        self.payment_method.is_none()
    }

    /// Returns the running total as Money.
    #[inline]
    pub fn total_amount(&self) -> Money {
        Money::from_cents(self.total_amount_cents)
    }
}

// =============================================================================
// Bill Item
// =============================================================================

/// A line item on a bill.
///
/// The rate is captured when the line is added or updated and never re-read
/// from the product afterwards, so a later catalog price change cannot
/// silently alter a bill. At most one line per (bill, product) pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct BillItem {
    pub id: String,
    pub bill_id: String,
    pub product_id: String,
    /// Quantity on the bill. Always positive.
    pub quantity: i64,
    /// Rate in cents captured at add/update time (frozen).
    pub unit_rate_cents: i64,
    pub created_at: DateTime<Utc>,
}

impl BillItem {
    /// Returns the captured unit rate as Money.
    #[inline]
    pub fn unit_rate(&self) -> Money {
        Money::from_cents(self.unit_rate_cents)
    }

    /// Line amount: unit rate × quantity.
    #[inline]
    pub fn amount(&self) -> Money {
        self.unit_rate().multiply_quantity(self.quantity)
    }
}

// =============================================================================
// Feedback
// =============================================================================

/// Customer feedback, collected after a settled payment. Append-only.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Feedback {
    pub id: String,
    pub customer_id: String,
    pub feedback_date: DateTime<Utc>,
    /// 1 (worst) to 5 (best).
    pub rating: i64,
    pub comments: String,
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn bill(payment_method: Option<PaymentMethod>) -> Bill {
        Bill {
            id: "b1".to_string(),
            customer_id: "c1".to_string(),
            total_quantity: 0,
            total_amount_cents: 0,
            payment_method,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_bill_open_until_method_recorded() {
        assert!(bill(None).is_open());
        assert!(!bill(Some(PaymentMethod::Cash)).is_open());
    }

    #[test]
    fn test_payment_method_names() {
        assert_eq!(PaymentMethod::Cash.as_str(), "cash");
        assert_eq!(PaymentMethod::Card.as_str(), "card");
        assert_eq!(PaymentMethod::Upi.as_str(), "upi");
    }

    #[test]
    fn test_bill_item_amount() {
        let item = BillItem {
            id: "i1".to_string(),
            bill_id: "b1".to_string(),
            product_id: "p1".to_string(),
            quantity: 3,
            unit_rate_cents: 5000,
            created_at: Utc::now(),
        };
        assert_eq!(item.amount().cents(), 15000);
    }
}
