//! # Validation Module
//!
//! Input validation for ledger, checkout, refund and shift operations.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                              │
//! │                                                                     │
//! │  Layer 1: Service entry (tally-engine)                              │
//! │  ├── THIS MODULE: shape and range checks                            │
//! │  └── Rejected before any write - zero side effects                  │
//! │           │                                                         │
//! │           ▼                                                         │
//! │  Layer 2: Transaction guards (tally-db)                             │
//! │  ├── Conditional UPDATEs (stock, refunded_quantity, status)         │
//! │  └── Catch races the entry checks cannot see                        │
//! │           │                                                         │
//! │           ▼                                                         │
//! │  Layer 3: Database (SQLite)                                         │
//! │  ├── NOT NULL / UNIQUE / CHECK constraints                          │
//! │  └── Foreign key constraints                                        │
//! │                                                                     │
//! │  Defense in depth: each layer catches different errors              │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```

use crate::error::{CoreError, ValidationError};
use crate::types::MovementKind;
use crate::MAX_LINE_QUANTITY;

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// String Validators
// =============================================================================

/// Validates a SKU (Stock Keeping Unit).
///
/// ## Rules
/// - Must not be empty
/// - Must be at most 50 characters
/// - Only alphanumeric characters, hyphens, underscores
///
/// ## Example
/// ```rust
/// use tally_core::validation::validate_sku;
///
/// assert!(validate_sku("COKE-330").is_ok());
/// assert!(validate_sku("").is_err());
/// ```
pub fn validate_sku(sku: &str) -> ValidationResult<()> {
    let sku = sku.trim();

    if sku.is_empty() {
        return Err(ValidationError::Required {
            field: "sku".to_string(),
        });
    }

    if sku.len() > 50 {
        return Err(ValidationError::TooLong {
            field: "sku".to_string(),
            max: 50,
        });
    }

    if !sku
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-' || c == '_')
    {
        return Err(ValidationError::InvalidFormat {
            field: "sku".to_string(),
            reason: "must contain only letters, numbers, hyphens, and underscores".to_string(),
        });
    }

    Ok(())
}

/// Validates a product name.
pub fn validate_product_name(name: &str) -> ValidationResult<()> {
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

/// Validates a free-text reason attached to a movement or adjustment.
///
/// Empty is allowed (not every movement needs commentary); length is
/// capped to keep ledger rows bounded.
pub fn validate_reason(reason: &str) -> ValidationResult<()> {
    if reason.len() > 500 {
        return Err(ValidationError::TooLong {
            field: "reason".to_string(),
            max: 500,
        });
    }

    Ok(())
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a line quantity.
///
/// ## Rules
/// - Must be positive (> 0)
/// - Must not exceed MAX_LINE_QUANTITY (999)
pub fn validate_quantity(qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }

    if qty > MAX_LINE_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: MAX_LINE_QUANTITY,
        });
    }

    Ok(())
}

/// Validates a non-negative amount in cents (prices, discounts).
///
/// Zero is allowed (free items, no discount).
pub fn validate_non_negative_cents(field: &str, cents: i64) -> ValidationResult<()> {
    if cents < 0 {
        return Err(ValidationError::MustBeNonNegative {
            field: field.to_string(),
        });
    }

    Ok(())
}

/// Validates a strictly positive amount in cents (cash movements).
pub fn validate_positive_cents(field: &str, cents: i64) -> ValidationResult<()> {
    if cents <= 0 {
        return Err(ValidationError::MustBePositive {
            field: field.to_string(),
        });
    }

    Ok(())
}

// =============================================================================
// Movement Validators
// =============================================================================

/// Validates a movement delta against its kind's sign rule.
///
/// ## Rules
/// ```text
/// arrival / return   → delta > 0
/// sale / damaged     → delta < 0
/// adjustment         → delta ≠ 0 (either direction)
/// zero               → always rejected
/// ```
///
/// Zero deltas are rejected for every kind: a movement that changes
/// nothing has no place in an append-only ledger.
pub fn validate_movement_delta(kind: MovementKind, delta: i64) -> Result<(), CoreError> {
    if delta == 0 {
        return Err(ValidationError::Required {
            field: "quantity_delta".to_string(),
        }
        .into());
    }

    let violation = match kind.required_sign() {
        1 if delta < 0 => Some("positive"),
        -1 if delta > 0 => Some("negative"),
        _ => None,
    };

    if let Some(expected) = violation {
        return Err(CoreError::InvalidMovementDelta {
            kind: kind.as_str().to_string(),
            expected,
            delta,
        });
    }

    Ok(())
}

// =============================================================================
// UUID Validators
// =============================================================================

/// Validates a UUID string format.
///
/// ## Example
/// ```rust
/// use tally_core::validation::validate_uuid;
///
/// assert!(validate_uuid("550e8400-e29b-41d4-a716-446655440000").is_ok());
/// assert!(validate_uuid("not-a-uuid").is_err());
/// ```
pub fn validate_uuid(id: &str) -> ValidationResult<()> {
    if id.trim().is_empty() {
        return Err(ValidationError::Required {
            field: "id".to_string(),
        });
    }

    uuid::Uuid::parse_str(id).map_err(|_| ValidationError::InvalidFormat {
        field: "id".to_string(),
        reason: "must be a valid UUID".to_string(),
    })?;

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_validate_sku() {
        assert!(validate_sku("COKE-330").is_ok());
        assert!(validate_sku("ABC123").is_ok());
        assert!(validate_sku("product_1").is_ok());

        assert!(validate_sku("").is_err());
        assert!(validate_sku("   ").is_err());
        assert!(validate_sku("has space").is_err());
        assert!(validate_sku(&"A".repeat(100)).is_err());
    }

    #[test]
    fn test_validate_product_name() {
        assert!(validate_product_name("Cola 330ml").is_ok());
        assert!(validate_product_name("").is_err());
        assert!(validate_product_name(&"A".repeat(300)).is_err());
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
    fn test_validate_cents() {
        assert!(validate_non_negative_cents("price", 0).is_ok());
        assert!(validate_non_negative_cents("price", 1099).is_ok());
        assert!(validate_non_negative_cents("price", -1).is_err());

        assert!(validate_positive_cents("amount", 1).is_ok());
        assert!(validate_positive_cents("amount", 0).is_err());
        assert!(validate_positive_cents("amount", -5).is_err());
    }

    #[rstest]
    #[case(MovementKind::Arrival, 10, true)]
    #[case(MovementKind::Arrival, -10, false)]
    #[case(MovementKind::Return, 2, true)]
    #[case(MovementKind::Return, -2, false)]
    #[case(MovementKind::Sale, -5, true)]
    #[case(MovementKind::Sale, 5, false)]
    #[case(MovementKind::Damaged, -1, true)]
    #[case(MovementKind::Damaged, 1, false)]
    #[case(MovementKind::Adjustment, 7, true)]
    #[case(MovementKind::Adjustment, -7, true)]
    fn test_movement_delta_signs(
        #[case] kind: MovementKind,
        #[case] delta: i64,
        #[case] ok: bool,
    ) {
        assert_eq!(validate_movement_delta(kind, delta).is_ok(), ok);
    }

    #[rstest]
    #[case(MovementKind::Arrival)]
    #[case(MovementKind::Sale)]
    #[case(MovementKind::Adjustment)]
    #[case(MovementKind::Return)]
    #[case(MovementKind::Damaged)]
    fn test_zero_delta_always_rejected(#[case] kind: MovementKind) {
        assert!(validate_movement_delta(kind, 0).is_err());
    }

    #[test]
    fn test_validate_uuid() {
        assert!(validate_uuid("550e8400-e29b-41d4-a716-446655440000").is_ok());
        assert!(validate_uuid("").is_err());
        assert!(validate_uuid("not-a-uuid").is_err());
    }
}
