//! # Permissions Module
//!
//! The single capability evaluator for the retail suite.
//!
//! ## Why One Matrix
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │  BEFORE: role checks scattered through every screen                 │
//! │                                                                     │
//! │    if role == "manager" || role == "owner" { ... }                  │
//! │    if role != "cashier" { ... }        ← drifts, contradicts itself │
//! │                                                                     │
//! │  AFTER: one evaluator, one table                                    │
//! │                                                                     │
//! │    is_allowed(role, Action::CloseShift) ← answered in exactly one   │
//! │                                           place, tested exhaustively│
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The core does not enforce authorization (sessions live outside this
//! crate); the presentation collaborator asks this matrix before invoking
//! a service operation.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

// =============================================================================
// Roles & Actions
// =============================================================================

/// A user's role within a business.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Business owner: everything.
    Owner,
    /// Store manager: day-to-day operations including corrections.
    Manager,
    /// Till operator: selling and register duties.
    Cashier,
    /// Read-only access for accountants and dashboards.
    Auditor,
}

/// An operation a caller may attempt against the core.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    /// Create or edit catalog products.
    ManageProducts,
    /// Record arrival/adjustment/damaged movements.
    RecordMovement,
    /// Run a checkout.
    Checkout,
    /// Process a refund.
    Refund,
    /// Open a register shift.
    OpenShift,
    /// Close a register shift.
    CloseShift,
    /// Record drops/payouts/float additions.
    RecordCashMovement,
    /// Read sales, ledger and shift reports.
    ViewReports,
}

// =============================================================================
// The Matrix
// =============================================================================

/// Evaluates whether `role` may perform `action`.
///
/// This is the whole authorization matrix; there is deliberately no other
/// place in the workspace that branches on a role.
///
/// | action              | Owner | Manager | Cashier | Auditor |
/// |---------------------|-------|---------|---------|---------|
/// | ManageProducts      |  ✓    |   ✓     |         |         |
/// | RecordMovement      |  ✓    |   ✓     |         |         |
/// | Checkout            |  ✓    |   ✓     |   ✓     |         |
/// | Refund              |  ✓    |   ✓     |         |         |
/// | OpenShift           |  ✓    |   ✓     |   ✓     |         |
/// | CloseShift          |  ✓    |   ✓     |   ✓     |         |
/// | RecordCashMovement  |  ✓    |   ✓     |   ✓     |         |
/// | ViewReports         |  ✓    |   ✓     |         |   ✓     |
pub const fn is_allowed(role: Role, action: Action) -> bool {
    match (role, action) {
        // Owner can do everything
        (Role::Owner, _) => true,

        // Manager: everything operational
        (Role::Manager, _) => true,

        // Cashier: the till, not the catalog and not corrections
        (Role::Cashier, Action::Checkout)
        | (Role::Cashier, Action::OpenShift)
        | (Role::Cashier, Action::CloseShift)
        | (Role::Cashier, Action::RecordCashMovement) => true,
        (Role::Cashier, _) => false,

        // Auditor: read-only
        (Role::Auditor, Action::ViewReports) => true,
        (Role::Auditor, _) => false,
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    const ALL_ACTIONS: [Action; 8] = [
        Action::ManageProducts,
        Action::RecordMovement,
        Action::Checkout,
        Action::Refund,
        Action::OpenShift,
        Action::CloseShift,
        Action::RecordCashMovement,
        Action::ViewReports,
    ];

    #[test]
    fn test_owner_and_manager_allow_everything() {
        for action in ALL_ACTIONS {
            assert!(is_allowed(Role::Owner, action));
            assert!(is_allowed(Role::Manager, action));
        }
    }

    #[test]
    fn test_cashier_till_only() {
        assert!(is_allowed(Role::Cashier, Action::Checkout));
        assert!(is_allowed(Role::Cashier, Action::OpenShift));
        assert!(is_allowed(Role::Cashier, Action::CloseShift));
        assert!(is_allowed(Role::Cashier, Action::RecordCashMovement));

        assert!(!is_allowed(Role::Cashier, Action::ManageProducts));
        assert!(!is_allowed(Role::Cashier, Action::RecordMovement));
        assert!(!is_allowed(Role::Cashier, Action::Refund));
        assert!(!is_allowed(Role::Cashier, Action::ViewReports));
    }

    #[test]
    fn test_auditor_read_only() {
        assert!(is_allowed(Role::Auditor, Action::ViewReports));
        for action in ALL_ACTIONS {
            if action != Action::ViewReports {
                assert!(!is_allowed(Role::Auditor, action), "{:?}", action);
            }
        }
    }
}
