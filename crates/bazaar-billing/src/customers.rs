//! # Customer Directory
//!
//! Customer registration and lookup. A bill can only be opened for a
//! registered customer; a returning customer identifies themselves by the
//! (name, email) pair.

use tracing::info;

use crate::error::{BillingError, BillingResult};
use bazaar_core::validation::{validate_address, validate_email, validate_name, validate_phone};
use bazaar_core::Customer;
use bazaar_db::Database;

/// Customer registration and lookup service.
#[derive(Debug, Clone)]
pub struct CustomerDirectory {
    db: Database,
}

impl CustomerDirectory {
    /// Creates a new CustomerDirectory.
    pub fn new(db: Database) -> Self {
        CustomerDirectory { db }
    }

    /// Registers a new customer.
    ///
    /// All fields are validated before any storage call; a duplicate email
    /// is rejected with `Conflict`. Customers are immutable after creation.
    ///
    /// ## Errors
    /// * `Validation` - empty name/address, malformed email, non-10-digit phone
    /// * `Conflict` - email already registered
    pub async fn register(
        &self,
        name: &str,
        email: &str,
        phone: &str,
        address: &str,
    ) -> BillingResult<Customer> {
        validate_name(name)?;
        validate_email(email)?;
        validate_phone(phone)?;
        validate_address(address)?;

        let name = name.trim();
        let email = email.trim();

        if self.db.customers().email_exists(email).await? {
            return Err(BillingError::conflict("email", email));
        }

        let customer = self
            .db
            .customers()
            .insert(name, email, phone.trim(), address.trim())
            .await?;

        info!(customer_id = %customer.id, "Customer registered");

        Ok(customer)
    }

    /// Finds a returning customer by the (name, email) pair.
    ///
    /// ## Errors
    /// * `NotFound` - no customer matches both fields exactly
    pub async fn find(&self, name: &str, email: &str) -> BillingResult<Customer> {
        self.db
            .customers()
            .find_by_name_and_email(name.trim(), email.trim())
            .await?
            .ok_or_else(|| BillingError::not_found("Customer", email.trim()))
    }

    /// Gets a customer by id.
    pub async fn get(&self, customer_id: &str) -> BillingResult<Customer> {
        self.db
            .customers()
            .get_by_id(customer_id)
            .await?
            .ok_or_else(|| BillingError::not_found("Customer", customer_id))
    }
}
