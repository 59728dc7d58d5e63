//! # Catalog
//!
//! Product records with live stock levels.
//!
//! ## Stock Accounting
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Two Kinds of Stock Claim                           │
//! │                                                                         │
//! │  RESERVATION (reserve)                COMMIT (commit_decrement)         │
//! │  ──────────────────────               ─────────────────────────         │
//! │  • Feasibility check only             • Durable stock subtraction       │
//! │  • Nothing written                    • Happens once, at payment        │
//! │  • Nets against line items of         • Guarded: refuses to take        │
//! │    every currently OPEN bill            stock below zero                │
//! │                                                                         │
//! │  stock 10, bill A holds 7 open:                                        │
//! │     reserve(5) → declined (only 3 unreserved)                          │
//! │     bill A pays → stock 3, reservation gone                            │
//! │     reserve(3) → ok                                                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use tracing::info;

use crate::error::{BillingError, BillingResult};
use bazaar_core::validation::{
    validate_name, validate_price_and_rate, validate_quantity, validate_restock_delta,
    validate_stock,
};
use bazaar_core::Product;
use bazaar_db::{BillRepository, Database, ProductRepository};

/// Product catalog service.
#[derive(Debug, Clone)]
pub struct Catalog {
    db: Database,
}

impl Catalog {
    /// Creates a new Catalog.
    pub fn new(db: Database) -> Self {
        Catalog { db }
    }

    /// Adds a new product to the catalog.
    ///
    /// ## Errors
    /// * `Validation` - empty name, non-positive price, rate outside [0, price],
    ///   negative stock
    /// * `Conflict` - a product with this name already exists
    pub async fn add_product(
        &self,
        name: &str,
        price_cents: i64,
        rate_cents: i64,
        stock: i64,
    ) -> BillingResult<Product> {
        validate_name(name)?;
        validate_price_and_rate(price_cents, rate_cents)?;
        validate_stock(stock)?;

        let name = name.trim();

        if self.db.products().name_exists(name).await? {
            return Err(BillingError::conflict("product name", name));
        }

        let product = self
            .db
            .products()
            .insert(name, price_cents, rate_cents, stock)
            .await?;

        info!(product_id = %product.id, name = %product.name, stock = %stock, "Product added");

        Ok(product)
    }

    /// Finds a product by its display name.
    pub async fn find_by_name(&self, name: &str) -> BillingResult<Product> {
        self.db
            .products()
            .get_by_name(name.trim())
            .await?
            .ok_or_else(|| BillingError::not_found("Product", name.trim()))
    }

    /// Finds a product by id.
    pub async fn find_by_id(&self, product_id: &str) -> BillingResult<Product> {
        self.db
            .products()
            .get_by_id(product_id)
            .await?
            .ok_or_else(|| BillingError::not_found("Product", product_id))
    }

    /// Lists the whole catalog ordered by product id.
    pub async fn list(&self) -> BillingResult<Vec<Product>> {
        Ok(self.db.products().list_all().await?)
    }

    /// Checks whether `quantity` more units of a product can be claimed.
    ///
    /// Nets physical stock against the summed quantity this product holds
    /// across line items of ALL currently open bills, so two open bills
    /// cannot both claim the same units. Writes nothing; stock is only
    /// decremented at payment commit.
    ///
    /// ## Errors
    /// * `NotFound` - product does not exist
    /// * `InsufficientStock` - unreserved stock below `quantity`
    pub async fn reserve(&self, product_id: &str, quantity: i64) -> BillingResult<()> {
        validate_quantity(quantity)?;

        let mut tx = self.db.begin().await?;

        let product = ProductRepository::get_by_id_in(&mut *tx, product_id)
            .await?
            .ok_or_else(|| BillingError::not_found("Product", product_id))?;

        let reserved =
            BillRepository::open_reserved_quantity_in(&mut *tx, product_id, None).await?;

        let available = product.stock - reserved;
        if available < quantity {
            return Err(BillingError::InsufficientStock {
                product: product.name,
                available,
                requested: quantity,
            });
        }

        // Read-only transaction; nothing to write back.
        tx.commit().await.map_err(bazaar_db::DbError::from)?;

        Ok(())
    }

    /// Durably subtracts `quantity` from a product's stock.
    ///
    /// Called once per line item at payment success. The subtraction is
    /// guarded so it either applies in full or not at all; it never leaves
    /// stock negative.
    ///
    /// ## Errors
    /// * `NotFound` - product does not exist
    /// * `InsufficientStock` - stock below `quantity`; nothing applied
    pub async fn commit_decrement(&self, product_id: &str, quantity: i64) -> BillingResult<()> {
        validate_quantity(quantity)?;

        let mut tx = self.db.begin().await?;

        let product = ProductRepository::get_by_id_in(&mut *tx, product_id)
            .await?
            .ok_or_else(|| BillingError::not_found("Product", product_id))?;

        let applied =
            ProductRepository::decrement_stock_in(&mut *tx, product_id, quantity).await?;
        if !applied {
            return Err(BillingError::InsufficientStock {
                product: product.name,
                available: product.stock,
                requested: quantity,
            });
        }

        tx.commit().await.map_err(bazaar_db::DbError::from)?;

        info!(product_id = %product_id, quantity = %quantity, "Stock decremented");

        Ok(())
    }

    /// Adds stock to a product.
    ///
    /// ## Errors
    /// * `Validation` - negative delta
    /// * `NotFound` - product does not exist
    pub async fn restock(&self, product_id: &str, delta: i64) -> BillingResult<Product> {
        validate_restock_delta(delta)?;

        self.db.products().add_stock(product_id, delta).await?;

        let product = self.find_by_id(product_id).await?;

        info!(product_id = %product_id, delta = %delta, stock = %product.stock, "Product restocked");

        Ok(product)
    }
}
