//! # Product Repository
//!
//! Database operations for the product catalog.
//!
//! ## Stock Discipline
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Stock Update Strategy                             │
//! │                                                                         │
//! │  ❌ WRONG: read stock, compute, write absolute value                    │
//! │     (a concurrent writer between read and write is silently lost)      │
//! │                                                                         │
//! │  ✅ CORRECT: conditional delta update                                   │
//! │     UPDATE products SET stock = stock - ?                              │
//! │     WHERE id = ? AND stock >= ?                                        │
//! │                                                                         │
//! │  rows_affected = 0 means the guard failed: stock would have gone       │
//! │  negative, and nothing was applied.                                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use bazaar_core::Product;

const PRODUCT_COLUMNS: &str = "id, name, price_cents, rate_cents, stock, created_at, updated_at";

/// Repository for product database operations.
#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
}

impl ProductRepository {
    /// Creates a new ProductRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ProductRepository { pool }
    }

    /// Inserts a new product and returns the stored record.
    ///
    /// ## Returns
    /// * `Ok(Product)` - Inserted product with generated id
    /// * `Err(DbError::UniqueViolation)` - Name already in the catalog
    pub async fn insert(
        &self,
        name: &str,
        price_cents: i64,
        rate_cents: i64,
        stock: i64,
    ) -> DbResult<Product> {
        let now = Utc::now();
        let product = Product {
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
            price_cents,
            rate_cents,
            stock,
            created_at: now,
            updated_at: now,
        };

        debug!(id = %product.id, name = %product.name, "Inserting product");

        sqlx::query(
            "INSERT INTO products (id, name, price_cents, rate_cents, stock, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&product.id)
        .bind(&product.name)
        .bind(product.price_cents)
        .bind(product.rate_cents)
        .bind(product.stock)
        .bind(product.created_at)
        .bind(product.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(product)
    }

    /// Gets a product by id.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Product>> {
        let product = sqlx::query_as::<_, Product>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(product)
    }

    /// Gets a product by its display name (the business identifier).
    pub async fn get_by_name(&self, name: &str) -> DbResult<Option<Product>> {
        let product = sqlx::query_as::<_, Product>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE name = ?"
        ))
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;

        Ok(product)
    }

    /// Checks whether a product name is already in the catalog.
    pub async fn name_exists(&self, name: &str) -> DbResult<bool> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products WHERE name = ?")
            .bind(name)
            .fetch_one(&self.pool)
            .await?;

        Ok(count > 0)
    }

    /// Lists all products ordered by id.
    pub async fn list_all(&self) -> DbResult<Vec<Product>> {
        let products = sqlx::query_as::<_, Product>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products ORDER BY id"
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(products)
    }

    /// Adds stock to a product (restocking).
    ///
    /// ## Arguments
    /// * `id` - Product id
    /// * `delta` - Non-negative amount to add
    pub async fn add_stock(&self, id: &str, delta: i64) -> DbResult<()> {
        debug!(id = %id, delta = %delta, "Restocking product");

        let now = Utc::now();

        let result = sqlx::query(
            "UPDATE products SET stock = stock + ?, updated_at = ? WHERE id = ?",
        )
        .bind(delta)
        .bind(now)
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", id));
        }

        Ok(())
    }

    /// Attempts a guarded stock decrement outside a transaction.
    ///
    /// ## Returns
    /// * `Ok(true)` - Stock decremented
    /// * `Ok(false)` - Guard failed: decrement would take stock negative
    pub async fn decrement_stock(&self, id: &str, quantity: i64) -> DbResult<bool> {
        let mut conn = self.pool.acquire().await?;
        Self::decrement_stock_in(&mut *conn, id, quantity).await
    }

    // =========================================================================
    // Transaction-scoped operations
    // =========================================================================
    // These take an explicit connection so the service layer can group them
    // with other writes in one atomic transaction.

    /// Gets a product by id on an existing connection/transaction.
    pub async fn get_by_id_in(
        conn: &mut SqliteConnection,
        id: &str,
    ) -> DbResult<Option<Product>> {
        let product = sqlx::query_as::<_, Product>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;

        Ok(product)
    }

    /// Guarded stock decrement on an existing connection/transaction.
    ///
    /// The `stock >= ?` guard makes the check-then-act atomic: either the
    /// full quantity comes off, or nothing does.
    ///
    /// ## Returns
    /// * `Ok(true)` - Stock decremented by `quantity`
    /// * `Ok(false)` - Guard failed; row untouched
    pub async fn decrement_stock_in(
        conn: &mut SqliteConnection,
        id: &str,
        quantity: i64,
    ) -> DbResult<bool> {
        debug!(id = %id, quantity = %quantity, "Decrementing stock");

        let now = Utc::now();

        let result = sqlx::query(
            "UPDATE products SET stock = stock - ?, updated_at = ? \
             WHERE id = ? AND stock >= ?",
        )
        .bind(quantity)
        .bind(now)
        .bind(id)
        .bind(quantity)
        .execute(&mut *conn)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
