//! # Payment Processor
//!
//! Drives a bill through its payment step and commits the stock decrement.
//!
//! ## Payment Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Payment State Machine                            │
//! │                                                                         │
//! │  AwaitingMethod ──► Authorizing ──► Settled                            │
//! │        │                 │                                              │
//! │        │                 └──► Failed (declined / short tender)         │
//! │        │                                                                │
//! │        └── only reachable from a bill that is still OPEN               │
//! │                                                                         │
//! │  On success, ONE transaction:                                          │
//! │    1. record payment_method on the bill   (Open → Paid)                │
//! │    2. guarded stock decrement per line item                            │
//! │                                                                         │
//! │  Any decrement failure rolls the WHOLE transaction back: the bill      │
//! │  stays open and queryable, and no stock is partially decremented.      │
//! │                                                                         │
//! │  On failure before commit: bill untouched, no stock effect.            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Card and UPI authorization is a dummy decision point: format checks
//! only, no external gateway call.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{BillingError, BillingResult};
use crate::ledger::BillLine;
use bazaar_core::validation::{
    validate_card_number, validate_cvv, validate_rating, validate_transaction_ref,
    validate_upi_id,
};
use bazaar_core::{Feedback, Money, PaymentMethod};
use bazaar_db::{BillRepository, Database, ProductRepository};

// =============================================================================
// Tender
// =============================================================================

/// What the customer hands over at the counter.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Tender {
    /// Physical cash; must cover the total, change is returned.
    Cash { tendered_cents: i64 },
    /// Card details for the dummy authorizer. Expiry is recorded on the
    /// receipt but not checked.
    Card {
        number: String,
        expiry: String,
        cvv: String,
    },
    /// UPI-style transfer against an identifier and a reference token.
    Upi {
        upi_id: String,
        transaction_ref: String,
    },
}

impl Tender {
    /// The method this tender settles the bill with.
    pub fn method(&self) -> PaymentMethod {
        match self {
            Tender::Cash { .. } => PaymentMethod::Cash,
            Tender::Card { .. } => PaymentMethod::Card,
            Tender::Upi { .. } => PaymentMethod::Upi,
        }
    }
}

/// Outcome of the per-method authorization step.
#[derive(Debug)]
struct Authorization {
    tendered_cents: Option<i64>,
    change_cents: Option<i64>,
    reference: Option<String>,
}

// =============================================================================
// Receipt
// =============================================================================

/// Returned to the front end after a settled payment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentReceipt {
    pub bill_id: String,
    pub customer_id: String,
    pub method: PaymentMethod,
    pub lines: Vec<BillLine>,
    pub total_quantity: i64,
    pub total_amount_cents: i64,
    /// Cash only: what the customer handed over.
    pub tendered_cents: Option<i64>,
    /// Cash only: tendered − total.
    pub change_cents: Option<i64>,
    /// Card: masked number. UPI: transaction reference.
    pub reference: Option<String>,
    pub paid_at: DateTime<Utc>,
}

// =============================================================================
// Payment Processor
// =============================================================================

/// Payment service: authorization plus the stock-commit transaction.
#[derive(Debug, Clone)]
pub struct PaymentProcessor {
    db: Database,
}

impl PaymentProcessor {
    /// Creates a new PaymentProcessor.
    pub fn new(db: Database) -> Self {
        PaymentProcessor { db }
    }

    /// Settles a bill.
    ///
    /// ## Errors
    /// * `InvalidState` - the (bill, customer) pair doesn't resolve, or the
    ///   bill is already paid
    /// * `AuthorizationDeclined` - short tender, malformed card, malformed UPI
    ///   id; the bill is untouched
    /// * `InsufficientStock` - a line's decrement failed after authorization
    ///   (stock shrank since the line was added); the whole transaction is
    ///   rolled back, the bill stays open, no stock moves
    pub async fn pay(
        &self,
        bill_id: &str,
        customer_id: &str,
        tender: Tender,
    ) -> BillingResult<PaymentReceipt> {
        let mut tx = self.db.begin().await?;

        let bill = BillRepository::get_for_customer_in(&mut *tx, bill_id, customer_id)
            .await?
            .ok_or_else(|| {
                BillingError::invalid_state(format!(
                    "no bill {} for customer {}",
                    bill_id, customer_id
                ))
            })?;

        if !bill.is_open() {
            return Err(BillingError::invalid_state(format!(
                "bill {} is already paid",
                bill_id
            )));
        }

        let authorization = authorize(&tender, bill.total_amount_cents)?;

        // Open → Paid. The IS NULL guard makes a double-settle race lose.
        let transitioned =
            BillRepository::set_payment_method_in(&mut *tx, bill_id, tender.method()).await?;
        if !transitioned {
            return Err(BillingError::invalid_state(format!(
                "bill {} is already paid",
                bill_id
            )));
        }

        // Commit the durable stock effect, one guarded decrement per line.
        // All-or-nothing: the first failure rolls back the method record
        // and every decrement applied so far.
        let items = BillRepository::get_items_in(&mut *tx, bill_id).await?;
        for item in &items {
            let applied =
                ProductRepository::decrement_stock_in(&mut *tx, &item.product_id, item.quantity)
                    .await?;
            if !applied {
                let (name, available) =
                    match ProductRepository::get_by_id_in(&mut *tx, &item.product_id).await? {
                        Some(p) => (p.name, p.stock),
                        None => (item.product_id.clone(), 0),
                    };

                warn!(
                    bill_id = %bill_id,
                    product = %name,
                    requested = %item.quantity,
                    available = %available,
                    "Payment failed after authorization: stock decrement refused"
                );

                tx.rollback().await.map_err(bazaar_db::DbError::from)?;

                return Err(BillingError::InsufficientStock {
                    product: name,
                    available,
                    requested: item.quantity,
                });
            }
        }

        tx.commit().await.map_err(bazaar_db::DbError::from)?;

        info!(
            bill_id = %bill_id,
            customer_id = %customer_id,
            method = %tender.method().as_str(),
            total = %Money::from_cents(bill.total_amount_cents),
            "Payment settled"
        );

        let lines = self
            .db
            .bills()
            .item_details(bill_id)
            .await?
            .into_iter()
            .map(BillLine::from)
            .collect();

        Ok(PaymentReceipt {
            bill_id: bill.id,
            customer_id: bill.customer_id,
            method: tender.method(),
            lines,
            total_quantity: bill.total_quantity,
            total_amount_cents: bill.total_amount_cents,
            tendered_cents: authorization.tendered_cents,
            change_cents: authorization.change_cents,
            reference: authorization.reference,
            paid_at: Utc::now(),
        })
    }

    /// Records a feedback entry after a settled payment.
    ///
    /// Optional and independent of payment bookkeeping; skipping it changes
    /// nothing about the bill.
    ///
    /// ## Errors
    /// * `Validation` - rating outside 1-5
    /// * `NotFound` - customer does not exist
    pub async fn record_feedback(
        &self,
        customer_id: &str,
        rating: i64,
        comments: &str,
    ) -> BillingResult<Feedback> {
        validate_rating(rating)?;

        self.db
            .customers()
            .get_by_id(customer_id)
            .await?
            .ok_or_else(|| BillingError::not_found("Customer", customer_id))?;

        let feedback = self
            .db
            .feedback()
            .insert(customer_id, rating, comments.trim())
            .await?;

        info!(customer_id = %customer_id, rating = %rating, "Feedback recorded");

        Ok(feedback)
    }
}

// =============================================================================
// Authorization
// =============================================================================

/// The per-method decision point. Pure: no storage, no external calls.
fn authorize(tender: &Tender, total_cents: i64) -> BillingResult<Authorization> {
    match tender {
        Tender::Cash { tendered_cents } => {
            if *tendered_cents < total_cents {
                return Err(BillingError::declined(format!(
                    "amount tendered {} does not cover total {}",
                    Money::from_cents(*tendered_cents),
                    Money::from_cents(total_cents)
                )));
            }
            Ok(Authorization {
                tendered_cents: Some(*tendered_cents),
                change_cents: Some(*tendered_cents - total_cents),
                reference: None,
            })
        }

        Tender::Card { number, cvv, .. } => {
            validate_card_number(number).map_err(|e| BillingError::declined(e.to_string()))?;
            validate_cvv(cvv).map_err(|e| BillingError::declined(e.to_string()))?;
            Ok(Authorization {
                tendered_cents: None,
                change_cents: None,
                // 16 digits guaranteed by the check above
                reference: Some(format!("card ****{}", &number[12..])),
            })
        }

        Tender::Upi {
            upi_id,
            transaction_ref,
        } => {
            validate_upi_id(upi_id).map_err(|e| BillingError::declined(e.to_string()))?;
            validate_transaction_ref(transaction_ref)
                .map_err(|e| BillingError::declined(e.to_string()))?;
            Ok(Authorization {
                tendered_cents: None,
                change_cents: None,
                reference: Some(transaction_ref.trim().to_string()),
            })
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
