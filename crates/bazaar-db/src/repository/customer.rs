//! # Customer Repository
//!
//! Database operations for customers.
//!
//! Customers are created once and never updated; email is the uniqueness
//! key, backed by a UNIQUE index. The (name, email) lookup exists because a
//! returning customer identifies themselves that way at the counter.

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;
use uuid::Uuid;

use crate::error::DbResult;
use bazaar_core::Customer;

const CUSTOMER_COLUMNS: &str = "id, name, email, phone, address, created_at";

/// Repository for customer database operations.
#[derive(Debug, Clone)]
pub struct CustomerRepository {
    pool: SqlitePool,
}

impl CustomerRepository {
    /// Creates a new CustomerRepository.
    pub fn new(pool: SqlitePool) -> Self {
        CustomerRepository { pool }
    }

    /// Inserts a new customer and returns the stored record.
    ///
    /// ## Returns
    /// * `Ok(Customer)` - Inserted customer with generated id
    /// * `Err(DbError::UniqueViolation)` - Email already registered
    pub async fn insert(
        &self,
        name: &str,
        email: &str,
        phone: &str,
        address: &str,
    ) -> DbResult<Customer> {
        let customer = Customer {
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
            email: email.to_string(),
            phone: phone.to_string(),
            address: address.to_string(),
            created_at: Utc::now(),
        };

        debug!(id = %customer.id, email = %customer.email, "Inserting customer");

        sqlx::query(
            "INSERT INTO customers (id, name, email, phone, address, created_at) \
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(&customer.id)
        .bind(&customer.name)
        .bind(&customer.email)
        .bind(&customer.phone)
        .bind(&customer.address)
        .bind(customer.created_at)
        .execute(&self.pool)
        .await?;

        Ok(customer)
    }

    /// Gets a customer by id.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Customer>> {
        let customer = sqlx::query_as::<_, Customer>(&format!(
            "SELECT {CUSTOMER_COLUMNS} FROM customers WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(customer)
    }

    /// Finds a customer by the (name, email) pair.
    ///
    /// Both fields must match exactly; this is how a returning customer
    /// identifies themselves before resuming a bill.
    pub async fn find_by_name_and_email(
        &self,
        name: &str,
        email: &str,
    ) -> DbResult<Option<Customer>> {
        let customer = sqlx::query_as::<_, Customer>(&format!(
            "SELECT {CUSTOMER_COLUMNS} FROM customers WHERE name = ? AND email = ?"
        ))
        .bind(name)
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        Ok(customer)
    }

    /// Checks whether an email is already registered.
    pub async fn email_exists(&self, email: &str) -> DbResult<bool> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM customers WHERE email = ?")
            .bind(email)
            .fetch_one(&self.pool)
            .await?;

        Ok(count > 0)
    }

    /// Lists all customers ordered by id.
    pub async fn list_all(&self) -> DbResult<Vec<Customer>> {
        let customers = sqlx::query_as::<_, Customer>(&format!(
            "SELECT {CUSTOMER_COLUMNS} FROM customers ORDER BY id"
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(customers)
    }

    /// Counts registered customers (for diagnostics).
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM customers")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
