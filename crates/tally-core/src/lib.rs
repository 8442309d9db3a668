//! # tally-core: Pure Business Logic for the Tally Retail Core
//!
//! This crate is the **heart** of the Tally ledger engine. It contains all
//! business logic as pure functions with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                      Tally Architecture                             │
//! │                                                                     │
//! │  ┌─────────────────────────────────────────────────────────────┐   │
//! │  │           Presentation / RPC collaborator (external)        │   │
//! │  └────────────────────────────┬────────────────────────────────┘   │
//! │                               │                                     │
//! │  ┌────────────────────────────▼────────────────────────────────┐   │
//! │  │                  tally-engine (services)                    │   │
//! │  │   StockLedger • SalesEngine • RefundProcessor • CashShifts  │   │
//! │  └────────────────────────────┬────────────────────────────────┘   │
//! │                               │                                     │
//! │  ┌────────────────────────────▼────────────────────────────────┐   │
//! │  │              ★ tally-core (THIS CRATE) ★                    │   │
//! │  │                                                             │   │
//! │  │  ┌─────────┐ ┌─────────┐ ┌────────────┐ ┌──────────────┐   │   │
//! │  │  │  types  │ │  money  │ │ validation │ │ permissions  │   │   │
//! │  │  │ Product │ │  Money  │ │   rules    │ │    matrix    │   │   │
//! │  │  │  Sale   │ │ prorate │ │   checks   │ │              │   │   │
//! │  │  └─────────┘ └─────────┘ └────────────┘ └──────────────┘   │   │
//! │  │                                                             │   │
//! │  │  NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS         │   │
//! │  └────────────────────────────┬────────────────────────────────┘   │
//! │                               │                                     │
//! │  ┌────────────────────────────▼────────────────────────────────┐   │
//! │  │                 tally-db (Database Layer)                   │   │
//! │  │          SQLite queries, migrations, repositories           │   │
//! │  └─────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Product, StockMovement, Sale, CashShift, ...)
//! - [`money`] - Money type with integer arithmetic (no floating point!)
//! - [`error`] - Domain error types
//! - [`validation`] - Business rule validation
//! - [`permissions`] - The single role/action capability matrix
//!
//! ## Design Principles
//!
//! 1. **Pure Functions**: Every function is deterministic - same input = same output
//! 2. **No I/O**: Database, network, file system access is FORBIDDEN here
//! 3. **Integer Money**: All monetary values are in cents (i64) to avoid float errors
//! 4. **Explicit Errors**: All errors are typed, never strings or panics

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod money;
pub mod permissions;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================
// These allow users to do `use tally_core::Money` instead of
// `use tally_core::money::Money`

pub use error::{CoreError, ValidationError};
pub use money::Money;
pub use permissions::{is_allowed, Action, Role};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Default tenant ID for single-tenant deployments.
///
/// ## Why a constant?
/// The schema is multi-tenant (every row carries tenant_id), but most
/// installations run one tenant. This constant is used until dynamic
/// tenant resolution lands.
pub const DEFAULT_TENANT_ID: &str = "00000000-0000-0000-0000-000000000001";

/// Maximum quantity of a single line in a cart or refund request.
///
/// ## Business Reason
/// Prevents accidental over-ordering (e.g., typing 1000 instead of 10).
pub const MAX_LINE_QUANTITY: i64 = 999;

/// Maximum number of lines in a single cart.
pub const MAX_CART_LINES: usize = 100;
