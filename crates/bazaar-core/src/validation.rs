//! # Validation Module
//!
//! Input validation utilities for Bazaar Billing.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Front end (CLI / HTTP handler)                               │
//! │  ├── Basic format checks (empty, length)                               │
//! │  └── Immediate user feedback                                           │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE - business rule validation                       │
//! │  └── Runs before any storage call; bad input never reaches SQL         │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                            │
//! │  ├── NOT NULL / CHECK constraints                                      │
//! │  ├── UNIQUE constraints                                                │
//! │  └── Foreign key constraints                                           │
//! │                                                                         │
//! │  Defense in depth: multiple layers catch different errors              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use crate::error::{ValidationError, ValidationResult};
use crate::MAX_ITEM_QUANTITY;

// =============================================================================
// Customer Validators
// =============================================================================

/// Validates a customer or product display name.
///
/// ## Rules
/// - Must not be empty (after trimming)
/// - Must be at most 200 characters
pub fn validate_name(name: &str) -> ValidationResult<()> {
    let name = name.trim();

    if name.is_empty() {
        return Err(ValidationError::Required {
            field: "name".to_string(),
        });
    }

    if name.len() > 200 {
        return Err(ValidationError::TooLong {
            field: "name".to_string(),
            max: 200,
        });
    }

    Ok(())
}

/// Validates an email address.
///
/// ## Rules
/// - Exactly one `@`, with non-empty local and domain parts
/// - Local part: letters, digits, `+ _ . -`
/// - Domain part: letters, digits, `. -`
///
/// ## Example
/// ```rust
/// use bazaar_core::validation::validate_email;
///
/// assert!(validate_email("priya@example.com").is_ok());
/// assert!(validate_email("not-an-email").is_err());
/// assert!(validate_email("two@at@signs").is_err());
/// ```
pub fn validate_email(email: &str) -> ValidationResult<()> {
    let email = email.trim();

    if email.is_empty() {
        return Err(ValidationError::Required {
            field: "email".to_string(),
        });
    }

    let invalid = |reason: &str| ValidationError::InvalidFormat {
        field: "email".to_string(),
        reason: reason.to_string(),
    };

    let mut parts = email.split('@');
    let (local, domain) = match (parts.next(), parts.next(), parts.next()) {
        (Some(local), Some(domain), None) => (local, domain),
        _ => return Err(invalid("must contain exactly one '@'")),
    };

    if local.is_empty() || domain.is_empty() {
        return Err(invalid("must have text before and after '@'"));
    }

    if !local
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '_' | '.' | '-'))
    {
        return Err(invalid("local part has unsupported characters"));
    }

    if !domain
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-'))
    {
        return Err(invalid("domain part has unsupported characters"));
    }

    Ok(())
}

/// Validates a phone number.
///
/// ## Rules
/// - Exactly 10 ASCII digits
pub fn validate_phone(phone: &str) -> ValidationResult<()> {
    let phone = phone.trim();

    if phone.is_empty() {
        return Err(ValidationError::Required {
            field: "phone".to_string(),
        });
    }

    if phone.len() != 10 || !phone.chars().all(|c| c.is_ascii_digit()) {
        return Err(ValidationError::InvalidFormat {
            field: "phone".to_string(),
            reason: "must be exactly 10 digits".to_string(),
        });
    }

    Ok(())
}

/// Validates a postal address.
///
/// ## Rules
/// - Must not be empty
/// - Must be at most 500 characters
pub fn validate_address(address: &str) -> ValidationResult<()> {
    let address = address.trim();

    if address.is_empty() {
        return Err(ValidationError::Required {
            field: "address".to_string(),
        });
    }

    if address.len() > 500 {
        return Err(ValidationError::TooLong {
            field: "address".to_string(),
            max: 500,
        });
    }

    Ok(())
}

// =============================================================================
// Product Validators
// =============================================================================

/// Validates a product's price (MRP) and billed rate together.
///
/// ## Rules
/// - price must be positive (> 0)
/// - rate must be within [0, price]
///
/// ## Example
/// ```rust
/// use bazaar_core::validation::validate_price_and_rate;
///
/// assert!(validate_price_and_rate(6000, 5000).is_ok());
/// assert!(validate_price_and_rate(0, 0).is_err());      // free MRP
/// assert!(validate_price_and_rate(5000, 6000).is_err()); // rate above MRP
/// ```
pub fn validate_price_and_rate(price_cents: i64, rate_cents: i64) -> ValidationResult<()> {
    if price_cents <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "price".to_string(),
        });
    }

    if rate_cents < 0 || rate_cents > price_cents {
        return Err(ValidationError::OutOfRange {
            field: "rate".to_string(),
            min: 0,
            max: price_cents,
        });
    }

    Ok(())
}

/// Validates an initial or restocked stock level.
///
/// ## Rules
/// - Must not be negative; zero is allowed (out of stock)
pub fn validate_stock(stock: i64) -> ValidationResult<()> {
    if stock < 0 {
        return Err(ValidationError::MustNotBeNegative {
            field: "stock".to_string(),
        });
    }

    Ok(())
}

/// Validates a restock delta.
///
/// ## Rules
/// - Must not be negative; restocking only ever adds stock
pub fn validate_restock_delta(delta: i64) -> ValidationResult<()> {
    if delta < 0 {
        return Err(ValidationError::MustNotBeNegative {
            field: "restock delta".to_string(),
        });
    }

    Ok(())
}

// =============================================================================
// Ledger Validators
// =============================================================================

/// Validates a line item quantity.
///
/// ## Rules
/// - Must be positive (> 0)
/// - Must not exceed MAX_ITEM_QUANTITY (999)
pub fn validate_quantity(qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }

    if qty > MAX_ITEM_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: MAX_ITEM_QUANTITY,
        });
    }

    Ok(())
}

// =============================================================================
// Payment Validators
// =============================================================================

/// Validates a card number for the dummy authorizer.
///
/// ## Rules
/// - Exactly 16 ASCII digits (no separators)
pub fn validate_card_number(number: &str) -> ValidationResult<()> {
    if number.len() != 16 || !number.chars().all(|c| c.is_ascii_digit()) {
        return Err(ValidationError::InvalidFormat {
            field: "card number".to_string(),
            reason: "must be exactly 16 digits".to_string(),
        });
    }

    Ok(())
}

/// Validates a card CVV.
///
/// ## Rules
/// - Exactly 3 ASCII digits
pub fn validate_cvv(cvv: &str) -> ValidationResult<()> {
    if cvv.len() != 3 || !cvv.chars().all(|c| c.is_ascii_digit()) {
        return Err(ValidationError::InvalidFormat {
            field: "cvv".to_string(),
            reason: "must be exactly 3 digits".to_string(),
        });
    }

    Ok(())
}

/// Validates a UPI identifier.
///
/// ## Rules
/// - Shaped like `local@provider` with both parts non-empty
pub fn validate_upi_id(upi_id: &str) -> ValidationResult<()> {
    let upi_id = upi_id.trim();

    let mut parts = upi_id.split('@');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(local), Some(provider), None) if !local.is_empty() && !provider.is_empty() => Ok(()),
        _ => Err(ValidationError::InvalidFormat {
            field: "upi id".to_string(),
            reason: "must look like name@provider".to_string(),
        }),
    }
}

/// Validates a transfer reference token.
///
/// ## Rules
/// - Must not be empty
pub fn validate_transaction_ref(reference: &str) -> ValidationResult<()> {
    if reference.trim().is_empty() {
        return Err(ValidationError::Required {
            field: "transaction reference".to_string(),
        });
    }

    Ok(())
}

// =============================================================================
// Feedback Validators
// =============================================================================

/// Validates a feedback rating.
///
/// ## Rules
/// - Must be between 1 and 5 inclusive
pub fn validate_rating(rating: i64) -> ValidationResult<()> {
    if !(1..=5).contains(&rating) {
        return Err(ValidationError::OutOfRange {
            field: "rating".to_string(),
            min: 1,
            max: 5,
        });
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_name() {
        assert!(validate_name("Basmati Rice 1kg").is_ok());
        assert!(validate_name("").is_err());
        assert!(validate_name("   ").is_err());
        assert!(validate_name(&"A".repeat(300)).is_err());
    }

    #[test]
    fn test_validate_email() {
        assert!(validate_email("priya@example.com").is_ok());
        assert!(validate_email("a.b+c_d@sub-domain.example").is_ok());

        assert!(validate_email("").is_err());
        assert!(validate_email("no-at-sign").is_err());
        assert!(validate_email("@nodomain").is_err());
        assert!(validate_email("nolocal@").is_err());
        assert!(validate_email("two@at@signs").is_err());
        assert!(validate_email("spa ce@example.com").is_err());
    }

    #[test]
    fn test_validate_phone() {
        assert!(validate_phone("9876543210").is_ok());
        assert!(validate_phone("123").is_err());
        assert!(validate_phone("98765432100").is_err());
        assert!(validate_phone("98765abcde").is_err());
        assert!(validate_phone("").is_err());
    }

    #[test]
    fn test_validate_price_and_rate() {
        assert!(validate_price_and_rate(6000, 5000).is_ok());
        assert!(validate_price_and_rate(6000, 6000).is_ok());
        assert!(validate_price_and_rate(6000, 0).is_ok());

        assert!(validate_price_and_rate(0, 0).is_err());
        assert!(validate_price_and_rate(-100, 0).is_err());
        assert!(validate_price_and_rate(5000, 6000).is_err());
        assert!(validate_price_and_rate(5000, -1).is_err());
    }

    #[test]
    fn test_validate_quantity() {
        assert!(validate_quantity(1).is_ok());
        assert!(validate_quantity(999).is_ok());

        assert!(validate_quantity(0).is_err());
        assert!(validate_quantity(-1).is_err());
        assert!(validate_quantity(1000).is_err());
    }

    #[test]
    fn test_validate_stock_and_delta() {
        assert!(validate_stock(0).is_ok());
        assert!(validate_stock(10).is_ok());
        assert!(validate_stock(-1).is_err());

        assert!(validate_restock_delta(0).is_ok());
        assert!(validate_restock_delta(25).is_ok());
        assert!(validate_restock_delta(-5).is_err());
    }

    #[test]
    fn test_validate_card_fields() {
        assert!(validate_card_number("1234567812345678").is_ok());
        assert!(validate_card_number("123456781234567").is_err()); // 15 digits
        assert!(validate_card_number("1234-5678-1234-5678").is_err());

        assert!(validate_cvv("123").is_ok());
        assert!(validate_cvv("12").is_err());
        assert!(validate_cvv("12a").is_err());
    }

    #[test]
    fn test_validate_upi() {
        assert!(validate_upi_id("priya@okbank").is_ok());
        assert!(validate_upi_id("priya").is_err());
        assert!(validate_upi_id("@okbank").is_err());
        assert!(validate_upi_id("priya@").is_err());

        assert!(validate_transaction_ref("TXN1234567890").is_ok());
        assert!(validate_transaction_ref("   ").is_err());
    }

    #[test]
    fn test_validate_rating() {
        for r in 1..=5 {
            assert!(validate_rating(r).is_ok());
        }
        assert!(validate_rating(0).is_err());
        assert!(validate_rating(6).is_err());
    }
}
