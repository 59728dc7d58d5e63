//! # Billing Error Types
//!
//! The error surface a front end sees.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Propagation                                    │
//! │                                                                         │
//! │  ValidationError (bazaar-core) ──┐                                     │
//! │                                  ├──► BillingError (this module)       │
//! │  DbError (bazaar-db) ────────────┘         │                           │
//! │                                            ▼                           │
//! │                             Front end maps variants to messages        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every variant is recoverable by the caller: retry with corrected input,
//! a different payment method, or a restock. None is fatal to the process,
//! and a failed operation never leaves partial totals or partial stock
//! effects behind.

use thiserror::Error;

use bazaar_core::ValidationError;
use bazaar_db::DbError;

/// Billing service errors.
#[derive(Debug, Error)]
pub enum BillingError {
    /// Malformed input, rejected before any storage call.
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Entity absent, or an ownership pair that doesn't match.
    #[error("{entity} not found: {key}")]
    NotFound { entity: String, key: String },

    /// Duplicate uniqueness key (customer email, product name).
    #[error("Duplicate {field}: '{value}' already exists")]
    Conflict { field: String, value: String },

    /// A reservation or decrement would take stock negative.
    ///
    /// ## When This Occurs
    /// - Adding a line whose quantity exceeds unreserved stock
    /// - Payment commit racing a restock correction that shrank stock
    #[error("Insufficient stock for {product}: available {available}, requested {requested}")]
    InsufficientStock {
        product: String,
        available: i64,
        requested: i64,
    },

    /// Operation attempted against a bill in the wrong lifecycle state,
    /// or a payment against a nonexistent (bill, customer) pair.
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// The payment method check failed (short card number, malformed UPI
    /// id, tendered cash below the total).
    #[error("Authorization declined: {0}")]
    AuthorizationDeclined(String),

    /// Infrastructure failure in the storage layer.
    #[error("Storage error: {0}")]
    Storage(DbError),
}

impl BillingError {
    /// Creates a NotFound error for a given entity type and key.
    pub fn not_found(entity: impl Into<String>, key: impl Into<String>) -> Self {
        BillingError::NotFound {
            entity: entity.into(),
            key: key.into(),
        }
    }

    /// Creates a Conflict error.
    pub fn conflict(field: impl Into<String>, value: impl Into<String>) -> Self {
        BillingError::Conflict {
            field: field.into(),
            value: value.into(),
        }
    }

    /// Creates an InvalidState error.
    pub fn invalid_state(reason: impl Into<String>) -> Self {
        BillingError::InvalidState(reason.into())
    }

    /// Creates an AuthorizationDeclined error.
    pub fn declined(reason: impl Into<String>) -> Self {
        BillingError::AuthorizationDeclined(reason.into())
    }
}

/// Storage errors keep their categorization where it matters to callers:
/// absence stays NotFound, a uniqueness race stays Conflict, everything
/// else is an infrastructure failure.
impl From<DbError> for BillingError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => BillingError::NotFound { entity, key: id },
            DbError::UniqueViolation { field, value } => BillingError::Conflict { field, value },
            other => BillingError::Storage(other),
        }
    }
}

/// Result type for billing operations.
pub type BillingResult<T> = Result<T, BillingError>;

// =============================================================================
// Unit Tests
// =============================================================================
