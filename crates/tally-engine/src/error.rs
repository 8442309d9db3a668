//! # Engine Error Types
//!
//! The error taxonomy service callers see.
//!
//! ## Propagation Rules
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │  Validation-class errors  → detected BEFORE any write,              │
//! │                             returned with zero side effects         │
//! │                                                                     │
//! │  ConcurrencyConflict      → a guard failed on a racing write;       │
//! │                             returned to the caller for an explicit  │
//! │                             retry decision. The engine NEVER        │
//! │                             silently retries a financial write.     │
//! │                                                                     │
//! │  Persistence              → storage/schema unavailable; surfaced    │
//! │                             verbatim, requires operator action      │
//! │                                                                     │
//! │  Every failure leaves every invariant intact: there is no error     │
//! │  path that commits a sale without its movements, or applies a       │
//! │  refund partially.                                                  │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

use tally_core::{CoreError, ValidationError};
use tally_db::DbError;

/// Errors returned by the engine services.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Malformed input, rejected before any write.
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Checkout of an empty cart.
    #[error("Cannot check out an empty cart")]
    EmptyCart,

    /// A stock decrement would drive an enforced product below zero.
    ///
    /// Also reported by the losing side of a last-unit race: at commit
    /// time a lost race and a plain stock-out are indistinguishable.
    #[error("Insufficient stock for {sku}: available {available}, requested {requested}")]
    InsufficientStock {
        sku: String,
        available: i64,
        requested: i64,
    },

    /// A refund line exceeds its remaining refundable quantity.
    #[error("Refund of {requested} exceeds remaining {remaining} for product {product_id}")]
    OverRefund {
        product_id: String,
        requested: i64,
        remaining: i64,
    },

    /// The business already has an open shift.
    #[error("Business {business_id} already has an open shift: {shift_id}")]
    ShiftAlreadyOpen {
        business_id: String,
        shift_id: String,
    },

    /// The shift is closed (or closed mid-call); closed is terminal.
    #[error("Shift {0} is already closed")]
    ShiftAlreadyClosed(String),

    /// Product cannot be found.
    #[error("Product not found: {0}")]
    ProductNotFound(String),

    /// Sale cannot be found.
    #[error("Sale not found: {0}")]
    SaleNotFound(String),

    /// Shift cannot be found.
    #[error("Shift not found: {0}")]
    ShiftNotFound(String),

    /// An optimistic guard failed on state this same call had verified.
    ///
    /// The caller decides whether to retry; nothing was committed.
    #[error("Concurrent modification of {entity} {id}")]
    ConcurrencyConflict { entity: &'static str, id: String },

    /// Storage failure (connection, schema, constraint). Fatal to the
    /// requested operation; not auto-recovered.
    #[error("Persistence error: {0}")]
    Persistence(#[from] DbError),
}

impl From<CoreError> for EngineError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::ProductNotFound(id) => EngineError::ProductNotFound(id),
            CoreError::SaleNotFound(id) => EngineError::SaleNotFound(id),
            CoreError::EmptyCart => EngineError::EmptyCart,
            CoreError::InsufficientStock {
                sku,
                available,
                requested,
            } => EngineError::InsufficientStock {
                sku,
                available,
                requested,
            },
            CoreError::OverRefund {
                product_id,
                requested,
                remaining,
            } => EngineError::OverRefund {
                product_id,
                requested,
                remaining,
            },
            CoreError::Validation(e) => EngineError::Validation(e),
            // Remaining core errors are shape violations of the same class
            // as validation failures
            other => EngineError::Validation(ValidationError::InvalidFormat {
                field: "request".to_string(),
                reason: other.to_string(),
            }),
        }
    }
}

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_core_error_mapping() {
        let err: EngineError = CoreError::InsufficientStock {
            sku: "SKU-1".to_string(),
            available: 0,
            requested: 1,
        }
        .into();
        assert!(matches!(err, EngineError::InsufficientStock { .. }));

        let err: EngineError = CoreError::EmptyCart.into();
        assert!(matches!(err, EngineError::EmptyCart));
    }

    #[test]
    fn test_db_error_wraps_as_persistence() {
        let err: EngineError = DbError::PoolExhausted.into();
        assert!(matches!(err, EngineError::Persistence(_)));
    }
}
