//! # Bill Repository
//!
//! Database operations for bills and their line items.
//!
//! ## Bill Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Bill Lifecycle                                    │
//! │                                                                         │
//! │  1. OPEN                                                                │
//! │     └── insert() → Bill { payment_method: None, totals: 0 }            │
//! │                                                                         │
//! │  2. BUILD                                                               │
//! │     └── insert_item_in / update_item_in / delete_item_in               │
//! │     └── apply_totals_delta_in keeps the running totals in lockstep     │
//! │         (same transaction, guarded by payment_method IS NULL)          │
//! │                                                                         │
//! │  3. PAY (terminal)                                                      │
//! │     └── set_payment_method_in() → Bill { payment_method: Some(..) }    │
//! │     └── stock decrements land in the same transaction                  │
//! │                                                                         │
//! │  A paid bill is never reopened, deleted, or mutated again.             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Ownership
//! Reads that serve a customer-facing view always filter by the
//! (bill_id, customer_id) pair, never by bill_id alone, so one customer can
//! never address another customer's bill.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use bazaar_core::{Bill, BillItem, PaymentMethod};

const BILL_COLUMNS: &str =
    "id, customer_id, total_quantity, total_amount_cents, payment_method, created_at, updated_at";

const ITEM_COLUMNS: &str = "id, bill_id, product_id, quantity, unit_rate_cents, created_at";

/// A bill line joined with its product, as shown on a bill view or receipt.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct BillItemDetail {
    pub product_id: String,
    pub product_name: String,
    /// MRP in cents, read from the catalog for display.
    pub price_cents: i64,
    /// Rate in cents captured when the line was added.
    pub unit_rate_cents: i64,
    pub quantity: i64,
}

impl BillItemDetail {
    /// Line amount: captured rate × quantity.
    pub fn amount_cents(&self) -> i64 {
        self.unit_rate_cents * self.quantity
    }
}

/// Repository for bill and bill item database operations.
#[derive(Debug, Clone)]
pub struct BillRepository {
    pool: SqlitePool,
}

impl BillRepository {
    /// Creates a new BillRepository.
    pub fn new(pool: SqlitePool) -> Self {
        BillRepository { pool }
    }

    /// Opens a new bill with zero totals for a customer.
    pub async fn insert(&self, customer_id: &str) -> DbResult<Bill> {
        let now = Utc::now();
        let bill = Bill {
            id: Uuid::new_v4().to_string(),
            customer_id: customer_id.to_string(),
            total_quantity: 0,
            total_amount_cents: 0,
            payment_method: None,
            created_at: now,
            updated_at: now,
        };

        debug!(id = %bill.id, customer_id = %customer_id, "Opening bill");

        sqlx::query(
            "INSERT INTO bills (id, customer_id, total_quantity, total_amount_cents, created_at, updated_at) \
             VALUES (?, ?, 0, 0, ?, ?)",
        )
        .bind(&bill.id)
        .bind(&bill.customer_id)
        .bind(bill.created_at)
        .bind(bill.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(bill)
    }

    /// Gets a bill by id.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Bill>> {
        let bill = sqlx::query_as::<_, Bill>(&format!(
            "SELECT {BILL_COLUMNS} FROM bills WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(bill)
    }

    /// Gets a bill by the (bill, customer) ownership pair.
    pub async fn get_for_customer(
        &self,
        bill_id: &str,
        customer_id: &str,
    ) -> DbResult<Option<Bill>> {
        let bill = sqlx::query_as::<_, Bill>(&format!(
            "SELECT {BILL_COLUMNS} FROM bills WHERE id = ? AND customer_id = ?"
        ))
        .bind(bill_id)
        .bind(customer_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(bill)
    }

    /// Lists a customer's open (resumable) bills, oldest first.
    pub async fn list_open_for_customer(&self, customer_id: &str) -> DbResult<Vec<Bill>> {
        let bills = sqlx::query_as::<_, Bill>(&format!(
            "SELECT {BILL_COLUMNS} FROM bills \
             WHERE customer_id = ? AND payment_method IS NULL \
             ORDER BY created_at"
        ))
        .bind(customer_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(bills)
    }

    /// Gets all line items of a bill, oldest first.
    pub async fn get_items(&self, bill_id: &str) -> DbResult<Vec<BillItem>> {
        let items = sqlx::query_as::<_, BillItem>(&format!(
            "SELECT {ITEM_COLUMNS} FROM bill_items WHERE bill_id = ? ORDER BY created_at"
        ))
        .bind(bill_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(items)
    }

    /// Gets the line items of a bill joined with product name and MRP,
    /// as needed for a customer-facing bill view.
    pub async fn item_details(&self, bill_id: &str) -> DbResult<Vec<BillItemDetail>> {
        let details = sqlx::query_as::<_, BillItemDetail>(
            "SELECT bi.product_id, p.name AS product_name, p.price_cents, \
                    bi.unit_rate_cents, bi.quantity \
             FROM bill_items bi \
             JOIN products p ON p.id = bi.product_id \
             WHERE bi.bill_id = ? \
             ORDER BY bi.created_at",
        )
        .bind(bill_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(details)
    }

    // =========================================================================
    // Report aggregates
    // =========================================================================

    /// Total amount and bill count for a customer, over all bills.
    pub async fn spend_stats(&self, customer_id: &str) -> DbResult<(i64, i64)> {
        let stats: (i64, i64) = sqlx::query_as(
            "SELECT COALESCE(SUM(total_amount_cents), 0), COUNT(id) \
             FROM bills WHERE customer_id = ?",
        )
        .bind(customer_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(stats)
    }

    /// Per-calendar-month totals over a customer's paid bills.
    pub async fn paid_monthly_totals(&self, customer_id: &str) -> DbResult<Vec<i64>> {
        let totals: Vec<i64> = sqlx::query_scalar(
            "SELECT COALESCE(SUM(total_amount_cents), 0) \
             FROM bills \
             WHERE customer_id = ? AND payment_method IS NOT NULL \
             GROUP BY strftime('%Y-%m', created_at)",
        )
        .bind(customer_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(totals)
    }

    /// Dates of every bill a customer has opened, oldest first.
    pub async fn purchase_dates(&self, customer_id: &str) -> DbResult<Vec<DateTime<Utc>>> {
        let dates: Vec<DateTime<Utc>> = sqlx::query_scalar(
            "SELECT created_at FROM bills WHERE customer_id = ? ORDER BY created_at",
        )
        .bind(customer_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(dates)
    }

    /// Cumulative quantity and revenue (captured rate × quantity) for a
    /// product, over all bill items regardless of payment state.
    pub async fn product_sales(&self, product_id: &str) -> DbResult<(i64, i64)> {
        let stats: (i64, i64) = sqlx::query_as(
            "SELECT COALESCE(SUM(quantity), 0), \
                    COALESCE(SUM(quantity * unit_rate_cents), 0) \
             FROM bill_items WHERE product_id = ?",
        )
        .bind(product_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(stats)
    }

    // =========================================================================
    // Transaction-scoped operations
    // =========================================================================
    // Line mutations and their totals updates must land together; these take
    // an explicit connection so the service layer can run the whole
    // read-check-write sequence in one transaction.

    /// Gets a bill by id on an existing connection/transaction.
    pub async fn get_in(conn: &mut SqliteConnection, bill_id: &str) -> DbResult<Option<Bill>> {
        let bill = sqlx::query_as::<_, Bill>(&format!(
            "SELECT {BILL_COLUMNS} FROM bills WHERE id = ?"
        ))
        .bind(bill_id)
        .fetch_optional(&mut *conn)
        .await?;

        Ok(bill)
    }

    /// Gets a bill by the ownership pair on an existing connection.
    pub async fn get_for_customer_in(
        conn: &mut SqliteConnection,
        bill_id: &str,
        customer_id: &str,
    ) -> DbResult<Option<Bill>> {
        let bill = sqlx::query_as::<_, Bill>(&format!(
            "SELECT {BILL_COLUMNS} FROM bills WHERE id = ? AND customer_id = ?"
        ))
        .bind(bill_id)
        .bind(customer_id)
        .fetch_optional(&mut *conn)
        .await?;

        Ok(bill)
    }

    /// Gets one line of a bill by product, if present.
    pub async fn get_item_in(
        conn: &mut SqliteConnection,
        bill_id: &str,
        product_id: &str,
    ) -> DbResult<Option<BillItem>> {
        let item = sqlx::query_as::<_, BillItem>(&format!(
            "SELECT {ITEM_COLUMNS} FROM bill_items WHERE bill_id = ? AND product_id = ?"
        ))
        .bind(bill_id)
        .bind(product_id)
        .fetch_optional(&mut *conn)
        .await?;

        Ok(item)
    }

    /// Gets all line items of a bill on an existing connection.
    pub async fn get_items_in(
        conn: &mut SqliteConnection,
        bill_id: &str,
    ) -> DbResult<Vec<BillItem>> {
        let items = sqlx::query_as::<_, BillItem>(&format!(
            "SELECT {ITEM_COLUMNS} FROM bill_items WHERE bill_id = ? ORDER BY created_at"
        ))
        .bind(bill_id)
        .fetch_all(&mut *conn)
        .await?;

        Ok(items)
    }

    /// Sums the quantity of a product held by line items of OPEN bills.
    ///
    /// This is the reservation a new claim must be netted against: paid
    /// bills have already taken their stock, open bills have not yet.
    ///
    /// ## Arguments
    /// * `exclude_bill` - When replacing a bill's own line, that line is
    ///   superseded and must not count against the new quantity.
    pub async fn open_reserved_quantity_in(
        conn: &mut SqliteConnection,
        product_id: &str,
        exclude_bill: Option<&str>,
    ) -> DbResult<i64> {
        let reserved: i64 = match exclude_bill {
            Some(bill_id) => {
                sqlx::query_scalar(
                    "SELECT COALESCE(SUM(bi.quantity), 0) \
                     FROM bill_items bi \
                     JOIN bills b ON b.id = bi.bill_id \
                     WHERE bi.product_id = ? AND b.payment_method IS NULL \
                       AND bi.bill_id <> ?",
                )
                .bind(product_id)
                .bind(bill_id)
                .fetch_one(&mut *conn)
                .await?
            }
            None => {
                sqlx::query_scalar(
                    "SELECT COALESCE(SUM(bi.quantity), 0) \
                     FROM bill_items bi \
                     JOIN bills b ON b.id = bi.bill_id \
                     WHERE bi.product_id = ? AND b.payment_method IS NULL",
                )
                .bind(product_id)
                .fetch_one(&mut *conn)
                .await?
            }
        };

        Ok(reserved)
    }

    /// Inserts a new line item.
    pub async fn insert_item_in(conn: &mut SqliteConnection, item: &BillItem) -> DbResult<()> {
        debug!(bill_id = %item.bill_id, product_id = %item.product_id, "Inserting bill item");

        sqlx::query(
            "INSERT INTO bill_items (id, bill_id, product_id, quantity, unit_rate_cents, created_at) \
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(&item.id)
        .bind(&item.bill_id)
        .bind(&item.product_id)
        .bind(item.quantity)
        .bind(item.unit_rate_cents)
        .bind(item.created_at)
        .execute(&mut *conn)
        .await?;

        Ok(())
    }

    /// Replaces the quantity and captured rate of an existing line.
    pub async fn update_item_in(
        conn: &mut SqliteConnection,
        bill_id: &str,
        product_id: &str,
        quantity: i64,
        unit_rate_cents: i64,
    ) -> DbResult<()> {
        debug!(bill_id = %bill_id, product_id = %product_id, quantity = %quantity, "Updating bill item");

        let result = sqlx::query(
            "UPDATE bill_items SET quantity = ?, unit_rate_cents = ? \
             WHERE bill_id = ? AND product_id = ?",
        )
        .bind(quantity)
        .bind(unit_rate_cents)
        .bind(bill_id)
        .bind(product_id)
        .execute(&mut *conn)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Bill item", product_id));
        }

        Ok(())
    }

    /// Deletes a line item.
    pub async fn delete_item_in(
        conn: &mut SqliteConnection,
        bill_id: &str,
        product_id: &str,
    ) -> DbResult<()> {
        debug!(bill_id = %bill_id, product_id = %product_id, "Deleting bill item");

        let result = sqlx::query("DELETE FROM bill_items WHERE bill_id = ? AND product_id = ?")
            .bind(bill_id)
            .bind(product_id)
            .execute(&mut *conn)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Bill item", product_id));
        }

        Ok(())
    }

    /// Applies a (quantity, amount) delta to a bill's running totals.
    ///
    /// Guarded by `payment_method IS NULL`: a paid bill's totals can never
    /// move again, even if a stale caller tries.
    pub async fn apply_totals_delta_in(
        conn: &mut SqliteConnection,
        bill_id: &str,
        quantity_delta: i64,
        amount_delta_cents: i64,
    ) -> DbResult<()> {
        let now = Utc::now();

        let result = sqlx::query(
            "UPDATE bills \
             SET total_quantity = total_quantity + ?, \
                 total_amount_cents = total_amount_cents + ?, \
                 updated_at = ? \
             WHERE id = ? AND payment_method IS NULL",
        )
        .bind(quantity_delta)
        .bind(amount_delta_cents)
        .bind(now)
        .bind(bill_id)
        .execute(&mut *conn)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Bill (open)", bill_id));
        }

        Ok(())
    }

    /// Records the payment method, transitioning the bill Open → Paid.
    ///
    /// ## Returns
    /// * `Ok(true)` - Method recorded; the bill was open
    /// * `Ok(false)` - No open bill matched (already paid or wrong id)
    pub async fn set_payment_method_in(
        conn: &mut SqliteConnection,
        bill_id: &str,
        method: PaymentMethod,
    ) -> DbResult<bool> {
        debug!(bill_id = %bill_id, method = %method.as_str(), "Recording payment method");

        let now = Utc::now();

        let result = sqlx::query(
            "UPDATE bills SET payment_method = ?, updated_at = ? \
             WHERE id = ? AND payment_method IS NULL",
        )
        .bind(method)
        .bind(now)
        .bind(bill_id)
        .execute(&mut *conn)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
