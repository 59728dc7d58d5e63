//! # Report Engine
//!
//! Read-only aggregations over committed ledger and catalog state. Reports
//! never mutate anything and take no locks; read-committed consistency is
//! enough (the several aggregate queries of one report are not required to
//! observe a single point in time).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{BillingError, BillingResult};
use bazaar_core::{Customer, Product};
use bazaar_db::Database;

// =============================================================================
// Report Types
// =============================================================================

/// Per-customer analytics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomerReport {
    pub customer: Customer,
    /// Summed bill totals, in cents, over all of the customer's bills.
    pub total_spend_cents: i64,
    pub bill_count: i64,
    /// total_spend / bill_count (integer cents; 0 when no bills).
    pub avg_spend_per_bill_cents: i64,
    /// Average of per-calendar-month sums over PAID bills only
    /// (0 when nothing has been paid yet).
    pub avg_monthly_spend_cents: i64,
    /// When each bill was opened, oldest first.
    pub purchase_dates: Vec<DateTime<Utc>>,
}

/// Per-product analytics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductReport {
    pub product: Product,
    /// Summed line quantities referencing the product, regardless of the
    /// owning bill's payment state.
    pub total_quantity_sold: i64,
    /// Σ quantity × captured rate over the same lines, in cents.
    pub total_revenue_cents: i64,
}

// =============================================================================
// Report Engine
// =============================================================================

/// Read-only analytics service.
#[derive(Debug, Clone)]
pub struct ReportEngine {
    db: Database,
}

impl ReportEngine {
    /// Creates a new ReportEngine.
    pub fn new(db: Database) -> Self {
        ReportEngine { db }
    }

    /// Builds the analytics report for one customer.
    ///
    /// ## Errors
    /// * `NotFound` - customer does not exist
    pub async fn customer_report(&self, customer_id: &str) -> BillingResult<CustomerReport> {
        let customer = self
            .db
            .customers()
            .get_by_id(customer_id)
            .await?
            .ok_or_else(|| BillingError::not_found("Customer", customer_id))?;

        self.build_customer_report(customer).await
    }

    /// Builds the analytics report for every customer, ordered by id.
    pub async fn all_customers_report(&self) -> BillingResult<Vec<CustomerReport>> {
        let customers = self.db.customers().list_all().await?;

        let mut reports = Vec::with_capacity(customers.len());
        for customer in customers {
            reports.push(self.build_customer_report(customer).await?);
        }

        Ok(reports)
    }

    /// Builds the analytics report for one product.
    ///
    /// ## Errors
    /// * `NotFound` - product does not exist
    pub async fn product_report(&self, product_id: &str) -> BillingResult<ProductReport> {
        let product = self
            .db
            .products()
            .get_by_id(product_id)
            .await?
            .ok_or_else(|| BillingError::not_found("Product", product_id))?;

        self.build_product_report(product).await
    }

    /// Builds the analytics report for every product, ordered by id.
    pub async fn all_products_report(&self) -> BillingResult<Vec<ProductReport>> {
        let products = self.db.products().list_all().await?;

        let mut reports = Vec::with_capacity(products.len());
        for product in products {
            reports.push(self.build_product_report(product).await?);
        }

        Ok(reports)
    }

    // =========================================================================
    // Internals
    // =========================================================================

    async fn build_customer_report(&self, customer: Customer) -> BillingResult<CustomerReport> {
        let bills = self.db.bills();

        let (total_spend_cents, bill_count) = bills.spend_stats(&customer.id).await?;

        let avg_spend_per_bill_cents = if bill_count > 0 {
            total_spend_cents / bill_count
        } else {
            0
        };

        // Averages stay in integer cents; the division truncates.
        let monthly = bills.paid_monthly_totals(&customer.id).await?;
        let avg_monthly_spend_cents = if monthly.is_empty() {
            0
        } else {
            monthly.iter().sum::<i64>() / monthly.len() as i64
        };

        let purchase_dates = bills.purchase_dates(&customer.id).await?;

        Ok(CustomerReport {
            customer,
            total_spend_cents,
            bill_count,
            avg_spend_per_bill_cents,
            avg_monthly_spend_cents,
            purchase_dates,
        })
    }

    async fn build_product_report(&self, product: Product) -> BillingResult<ProductReport> {
        let (total_quantity_sold, total_revenue_cents) =
            self.db.bills().product_sales(&product.id).await?;

        Ok(ProductReport {
            product,
            total_quantity_sold,
            total_revenue_cents,
        })
    }
}
