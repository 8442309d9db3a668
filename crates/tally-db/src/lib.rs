//! # tally-db: Database Layer for the Tally Retail Core
//!
//! This crate provides database access for the Tally ledger engine.
//! It uses SQLite for local storage with sqlx for async operations.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                        Tally Data Flow                              │
//! │                                                                     │
//! │  tally-engine service (checkout, refund, shift close, ...)          │
//! │       │                                                             │
//! │       ▼                                                             │
//! │  ┌─────────────────────────────────────────────────────────────┐   │
//! │  │                   tally-db (THIS CRATE)                     │   │
//! │  │                                                             │   │
//! │  │   ┌─────────────┐   ┌──────────────┐   ┌──────────────┐    │   │
//! │  │   │  Database   │   │ Repositories │   │  Migrations  │    │   │
//! │  │   │  (pool.rs)  │   │ product.rs   │   │  (embedded)  │    │   │
//! │  │   │             │   │ movement.rs  │   │              │    │   │
//! │  │   │ SqlitePool  │◄──│ sale.rs      │   │ 001_init.sql │    │   │
//! │  │   │ begin()     │   │ shift.rs     │   │ ...          │    │   │
//! │  │   └─────────────┘   └──────────────┘   └──────────────┘    │   │
//! │  │                                                             │   │
//! │  └─────────────────────────────────────────────────────────────┘   │
//! │       │                                                             │
//! │       ▼                                                             │
//! │  SQLite database file (WAL mode)                                    │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation, configuration and transactions
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`repository`] - Repository implementations (product, movement, sale, shift)
//!
//! ## Usage
//!
//! ```rust,ignore
//! use tally_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("path/to/tally.db")).await?;
//!
//! // Single-statement access through repositories
//! let product = db.products().get_by_sku("biz-1", "COKE-330").await?;
//!
//! // Multi-statement units of work
//! let mut tx = db.begin().await?;
//! // ... repository *_tx calls ...
//! tx.commit().await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::DbError;
pub use pool::{Database, DbConfig};

// Repository re-exports for convenience
pub use repository::movement::MovementRepository;
pub use repository::product::ProductRepository;
pub use repository::sale::SaleRepository;
pub use repository::shift::{CashMovementTotals, ShiftRepository};
