//! # bazaar-billing: Billing Services for Bazaar Billing
//!
//! The typed service surface of the system. A front end (CLI, HTTP handler)
//! supplies validated primitives and receives typed results or a
//! [`BillingError`]; this crate does no text formatting, no prompting, and
//! no direct I/O beyond the database handle it is given.
//!
//! ## Components
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         bazaar-billing                                  │
//! │                                                                         │
//! │  ┌──────────────┐     reserve / commit_decrement    ┌──────────────┐   │
//! │  │    Ledger    │ ──────────────────────────────►   │   Catalog    │   │
//! │  │ (bills+lines)│                                   │ (products +  │   │
//! │  └──────┬───────┘                                   │  stock)      │   │
//! │         │ finalized totals                          └──────▲───────┘   │
//! │         ▼                                                  │           │
//! │  ┌──────────────┐     durable stock decrement              │           │
//! │  │   Payment    │ ───────────────────────────────────────── ┘           │
//! │  │  Processor   │                                                      │
//! │  └──────────────┘                                                      │
//! │                                                                         │
//! │  ┌──────────────┐     committed state only, never mutates              │
//! │  │ ReportEngine │ ◄── bills, bill_items, products, customers           │
//! │  └──────────────┘                                                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use bazaar_billing::{Billing, Tender};
//! use bazaar_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("./bazaar.db")).await?;
//! let billing = Billing::new(db);
//!
//! let customer = billing
//!     .customers()
//!     .register("Priya", "priya@example.com", "9876543210", "12 Bazaar St")
//!     .await?;
//! let rice = billing.catalog().add_product("Rice", 6000, 5000, 100).await?;
//!
//! let bill = billing.ledger().open_bill(&customer.id).await?;
//! billing.ledger().add_item(&bill.id, &rice.id, 2).await?;
//!
//! let receipt = billing
//!     .payments()
//!     .pay(&bill.id, &customer.id, Tender::Cash { tendered_cents: 20000 })
//!     .await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod catalog;
pub mod customers;
pub mod error;
pub mod ledger;
pub mod payment;
pub mod report;

// =============================================================================
// Re-exports
// =============================================================================

pub use catalog::Catalog;
pub use customers::CustomerDirectory;
pub use error::{BillingError, BillingResult};
pub use ledger::{BillLine, BillView, Ledger};
pub use payment::{PaymentProcessor, PaymentReceipt, Tender};
pub use report::{CustomerReport, ProductReport, ReportEngine};

use bazaar_db::Database;

// =============================================================================
// Facade
// =============================================================================

/// One handle over all billing services, sharing a database pool.
///
/// Cloning is cheap; every accessor hands out a service over the same pool.
#[derive(Debug, Clone)]
pub struct Billing {
    db: Database,
}

impl Billing {
    /// Creates the billing facade over a connected database.
    pub fn new(db: Database) -> Self {
        Billing { db }
    }

    /// Customer registration and lookup.
    pub fn customers(&self) -> CustomerDirectory {
        CustomerDirectory::new(self.db.clone())
    }

    /// Product catalog and stock.
    pub fn catalog(&self) -> Catalog {
        Catalog::new(self.db.clone())
    }

    /// Bill lifecycle and line items.
    pub fn ledger(&self) -> Ledger {
        Ledger::new(self.db.clone())
    }

    /// Payment authorization and settlement.
    pub fn payments(&self) -> PaymentProcessor {
        PaymentProcessor::new(self.db.clone())
    }

    /// Read-only analytics.
    pub fn reports(&self) -> ReportEngine {
        ReportEngine::new(self.db.clone())
    }

    /// The underlying database handle.
    pub fn database(&self) -> &Database {
        &self.db
    }
}
