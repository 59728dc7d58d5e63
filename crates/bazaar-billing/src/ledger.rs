//! # Ledger
//!
//! Bill lifecycle and line items. The centerpiece of the system: this is
//! where the totals and stock invariants are enforced.
//!
//! ## Invariants
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  After EVERY ledger operation:                                          │
//! │                                                                         │
//! │  1. bill.total_quantity     == Σ line.quantity                          │
//! │  2. bill.total_amount_cents == Σ line.quantity × line.unit_rate_cents   │
//! │  3. no line has quantity <= 0                                           │
//! │  4. no two lines on a bill share a product                              │
//! │                                                                         │
//! │  Each mutation runs its reads, feasibility checks, line write and      │
//! │  totals delta in ONE transaction - a failed check rolls the whole      │
//! │  thing back, so the invariants cannot be observed broken.              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Stock Netting
//! Both the add and update paths check feasibility against stock netted by
//! every OPEN bill's line items, excluding the line being replaced (its
//! quantity is superseded by the new one). Replacing 7 with 5 on a
//! 10-in-stock product therefore succeeds even while another open bill
//! holds 3.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{BillingError, BillingResult};
use bazaar_core::validation::validate_quantity;
use bazaar_core::{Bill, BillItem, PaymentMethod, Product, MAX_BILL_LINES};
use bazaar_db::{BillItemDetail, BillRepository, Database, DbTransaction, ProductRepository};

// =============================================================================
// Bill View
// =============================================================================

/// One line of a customer-facing bill view.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BillLine {
    pub product_id: String,
    pub product_name: String,
    /// MRP in cents, for display next to the billed rate.
    pub price_cents: i64,
    /// Rate in cents captured when the line was added.
    pub unit_rate_cents: i64,
    pub quantity: i64,
    /// unit_rate × quantity.
    pub amount_cents: i64,
}

impl From<BillItemDetail> for BillLine {
    fn from(detail: BillItemDetail) -> Self {
        let amount_cents = detail.amount_cents();
        BillLine {
            product_id: detail.product_id,
            product_name: detail.product_name,
            price_cents: detail.price_cents,
            unit_rate_cents: detail.unit_rate_cents,
            quantity: detail.quantity,
            amount_cents,
        }
    }
}

/// A bill with its lines and totals, as handed to a front end.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BillView {
    pub bill_id: String,
    pub customer_id: String,
    pub payment_method: Option<PaymentMethod>,
    pub lines: Vec<BillLine>,
    pub total_quantity: i64,
    pub total_amount_cents: i64,
    pub created_at: chrono::DateTime<Utc>,
}

// =============================================================================
// Ledger
// =============================================================================

/// Bill lifecycle service.
///
/// State machine per bill: **Open → Paid** (terminal). The ledger mutates
/// open bills only; the Open → Paid transition itself belongs to the
/// payment processor.
#[derive(Debug, Clone)]
pub struct Ledger {
    db: Database,
}

impl Ledger {
    /// Creates a new Ledger.
    pub fn new(db: Database) -> Self {
        Ledger { db }
    }

    /// Opens a new bill with zero totals for a customer.
    ///
    /// A customer may hold several open bills at once; nothing restricts
    /// parallel baskets.
    ///
    /// ## Errors
    /// * `NotFound` - customer does not exist
    pub async fn open_bill(&self, customer_id: &str) -> BillingResult<Bill> {
        self.db
            .customers()
            .get_by_id(customer_id)
            .await?
            .ok_or_else(|| BillingError::not_found("Customer", customer_id))?;

        let bill = self.db.bills().insert(customer_id).await?;

        info!(bill_id = %bill.id, customer_id = %customer_id, "Bill opened");

        Ok(bill)
    }

    /// Lists a customer's open (resumable) bills, oldest first.
    ///
    /// ## Errors
    /// * `NotFound` - customer does not exist
    pub async fn open_bills_for_customer(&self, customer_id: &str) -> BillingResult<Vec<Bill>> {
        self.db
            .customers()
            .get_by_id(customer_id)
            .await?
            .ok_or_else(|| BillingError::not_found("Customer", customer_id))?;

        Ok(self.db.bills().list_open_for_customer(customer_id).await?)
    }

    /// Adds a product to a bill, or replaces its line if already present.
    ///
    /// ## Behavior
    /// - Brand-new product: inserts a line at the product's current rate and
    ///   grows the totals by `quantity × rate`.
    /// - Product already on the bill: the line's quantity AND rate are
    ///   *replaced* (not summed); the totals absorb the delta.
    ///
    /// ## Errors
    /// * `Validation` - quantity outside [1, 999]
    /// * `NotFound` - bill or product does not exist
    /// * `InvalidState` - bill is already paid
    /// * `InsufficientStock` - quantity exceeds unreserved stock
    pub async fn add_item(
        &self,
        bill_id: &str,
        product_id: &str,
        quantity: i64,
    ) -> BillingResult<Bill> {
        validate_quantity(quantity)?;

        let mut tx = self.db.begin().await?;

        let bill = Self::open_bill_in(&mut tx, bill_id).await?;

        let product = ProductRepository::get_by_id_in(&mut *tx, product_id)
            .await?
            .ok_or_else(|| BillingError::not_found("Product", product_id))?;

        Self::check_unreserved_stock(&mut tx, &product, bill_id, quantity).await?;

        let existing = BillRepository::get_item_in(&mut *tx, bill_id, product_id).await?;

        let (quantity_delta, amount_delta) = match existing {
            Some(line) => {
                BillRepository::update_item_in(
                    &mut *tx,
                    bill_id,
                    product_id,
                    quantity,
                    product.rate_cents,
                )
                .await?;
                (
                    quantity - line.quantity,
                    product.rate_cents * quantity - line.unit_rate_cents * line.quantity,
                )
            }
            None => {
                let line_count = BillRepository::get_items_in(&mut *tx, bill_id).await?.len();
                if line_count >= MAX_BILL_LINES {
                    return Err(BillingError::invalid_state(format!(
                        "bill {} cannot have more than {} lines",
                        bill_id, MAX_BILL_LINES
                    )));
                }

                BillRepository::insert_item_in(
                    &mut *tx,
                    &BillItem {
                        id: Uuid::new_v4().to_string(),
                        bill_id: bill_id.to_string(),
                        product_id: product_id.to_string(),
                        quantity,
                        unit_rate_cents: product.rate_cents,
                        created_at: Utc::now(),
                    },
                )
                .await?;
                (quantity, product.rate_cents * quantity)
            }
        };

        BillRepository::apply_totals_delta_in(&mut *tx, bill_id, quantity_delta, amount_delta)
            .await?;

        tx.commit().await.map_err(bazaar_db::DbError::from)?;

        debug!(bill_id = %bill_id, product_id = %product_id, quantity = %quantity, "Line added");

        self.reload_bill(&bill.id).await
    }

    /// Replaces the quantity of an existing line.
    ///
    /// The rate is refreshed from the catalog at update time and the totals
    /// absorb `(rate × new_qty) − (old_rate × old_qty)`.
    ///
    /// ## Errors
    /// * `Validation` - quantity outside [1, 999]
    /// * `NotFound` - bill, product, or line does not exist
    /// * `InvalidState` - bill is already paid
    /// * `InsufficientStock` - new quantity exceeds unreserved stock
    pub async fn update_item(
        &self,
        bill_id: &str,
        product_id: &str,
        new_quantity: i64,
    ) -> BillingResult<Bill> {
        validate_quantity(new_quantity)?;

        let mut tx = self.db.begin().await?;

        let bill = Self::open_bill_in(&mut tx, bill_id).await?;

        let product = ProductRepository::get_by_id_in(&mut *tx, product_id)
            .await?
            .ok_or_else(|| BillingError::not_found("Product", product_id))?;

        let line = BillRepository::get_item_in(&mut *tx, bill_id, product_id)
            .await?
            .ok_or_else(|| BillingError::not_found("Bill item", product_id))?;

        Self::check_unreserved_stock(&mut tx, &product, bill_id, new_quantity).await?;

        BillRepository::update_item_in(
            &mut *tx,
            bill_id,
            product_id,
            new_quantity,
            product.rate_cents,
        )
        .await?;

        let quantity_delta = new_quantity - line.quantity;
        let amount_delta =
            product.rate_cents * new_quantity - line.unit_rate_cents * line.quantity;

        BillRepository::apply_totals_delta_in(&mut *tx, bill_id, quantity_delta, amount_delta)
            .await?;

        tx.commit().await.map_err(bazaar_db::DbError::from)?;

        debug!(bill_id = %bill_id, product_id = %product_id, new_quantity = %new_quantity, "Line updated");

        self.reload_bill(&bill.id).await
    }

    /// Removes a line and subtracts its quantity/amount from the totals.
    ///
    /// ## Errors
    /// * `NotFound` - bill or line does not exist
    /// * `InvalidState` - bill is already paid
    pub async fn delete_item(&self, bill_id: &str, product_id: &str) -> BillingResult<Bill> {
        let mut tx = self.db.begin().await?;

        let bill = Self::open_bill_in(&mut tx, bill_id).await?;

        let line = BillRepository::get_item_in(&mut *tx, bill_id, product_id)
            .await?
            .ok_or_else(|| BillingError::not_found("Bill item", product_id))?;

        BillRepository::delete_item_in(&mut *tx, bill_id, product_id).await?;

        BillRepository::apply_totals_delta_in(
            &mut *tx,
            bill_id,
            -line.quantity,
            -(line.unit_rate_cents * line.quantity),
        )
        .await?;

        tx.commit().await.map_err(bazaar_db::DbError::from)?;

        debug!(bill_id = %bill_id, product_id = %product_id, "Line deleted");

        self.reload_bill(&bill.id).await
    }

    /// Returns a bill with its lines and totals.
    ///
    /// Ownership is always checked by the (bill, customer) pair, never by
    /// bill id alone: a customer can never read someone else's bill.
    ///
    /// ## Errors
    /// * `NotFound` - no bill matches the pair
    pub async fn get_bill_view(
        &self,
        bill_id: &str,
        customer_id: &str,
    ) -> BillingResult<BillView> {
        let bill = self
            .db
            .bills()
            .get_for_customer(bill_id, customer_id)
            .await?
            .ok_or_else(|| BillingError::not_found("Bill", bill_id))?;

        let lines = self
            .db
            .bills()
            .item_details(bill_id)
            .await?
            .into_iter()
            .map(BillLine::from)
            .collect();

        Ok(BillView {
            bill_id: bill.id,
            customer_id: bill.customer_id,
            payment_method: bill.payment_method,
            lines,
            total_quantity: bill.total_quantity,
            total_amount_cents: bill.total_amount_cents,
            created_at: bill.created_at,
        })
    }

    // =========================================================================
    // Internals
    // =========================================================================

    /// Loads a bill inside a transaction and requires it to be open.
    async fn open_bill_in(tx: &mut DbTransaction, bill_id: &str) -> BillingResult<Bill> {
        let bill = BillRepository::get_in(&mut **tx, bill_id)
            .await?
            .ok_or_else(|| BillingError::not_found("Bill", bill_id))?;

        if !bill.is_open() {
            return Err(BillingError::invalid_state(format!(
                "bill {} is already paid",
                bill_id
            )));
        }

        Ok(bill)
    }

    /// Fails with `InsufficientStock` unless `quantity` fits in the
    /// product's stock netted by every open bill except this one's own
    /// (superseded) line.
    async fn check_unreserved_stock(
        tx: &mut DbTransaction,
        product: &Product,
        bill_id: &str,
        quantity: i64,
    ) -> BillingResult<()> {
        let reserved =
            BillRepository::open_reserved_quantity_in(&mut **tx, &product.id, Some(bill_id))
                .await?;

        let available = product.stock - reserved;
        if available < quantity {
            return Err(BillingError::InsufficientStock {
                product: product.name.clone(),
                available,
                requested: quantity,
            });
        }

        Ok(())
    }

    /// Re-reads a bill after a committed mutation.
    async fn reload_bill(&self, bill_id: &str) -> BillingResult<Bill> {
        self.db
            .bills()
            .get_by_id(bill_id)
            .await?
            .ok_or_else(|| BillingError::not_found("Bill", bill_id))
    }
}
