//! # Repository Module
//!
//! Database repository implementations for Bazaar Billing.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Repository Pattern Explained                         │
//! │                                                                         │
//! │  The Repository pattern abstracts database access behind a clean API.  │
//! │                                                                         │
//! │  Service call                                                          │
//! │       │                                                                 │
//! │       │  db.products().get_by_name("Rice")                             │
//! │       ▼                                                                 │
//! │  ProductRepository                                                     │
//! │  ├── get_by_name(&self, name)                                          │
//! │  ├── insert(&self, ...)                                                │
//! │  └── decrement_stock_in(conn, id, qty)   ← transaction-scoped          │
//! │       │                                                                 │
//! │       │  Parameterized SQL (always bound, never string-built)          │
//! │       ▼                                                                 │
//! │  SQLite Database                                                       │
//! │                                                                         │
//! │  The *_in variants take an explicit connection so the service layer    │
//! │  can group reads, checks and writes into one atomic transaction.       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`customer::CustomerRepository`] - Customer creation and lookup
//! - [`product::ProductRepository`] - Catalog CRUD and guarded stock updates
//! - [`bill::BillRepository`] - Bills, line items, totals, report aggregates
//! - [`feedback::FeedbackRepository`] - Append-only feedback entries

pub mod bill;
pub mod customer;
pub mod feedback;
pub mod product;
