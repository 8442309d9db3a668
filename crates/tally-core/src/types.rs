//! # Domain Types
//!
//! Core domain types for the Tally ledger and cash-reconciliation engine.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                │
//! │                                                                     │
//! │  ┌───────────────┐   ┌────────────────┐   ┌──────────────────┐     │
//! │  │    Product    │   │ StockMovement  │   │      Sale        │     │
//! │  │ ───────────── │   │ ────────────── │   │ ──────────────── │     │
//! │  │ id (UUID)     │◄──│ product_id     │   │ id (UUID)        │     │
//! │  │ sku (business)│   │ quantity_delta │   │ payment_method   │     │
//! │  │ current_stock │   │ kind           │   │ sales_amount     │     │
//! │  └───────────────┘   └────────────────┘   └────────┬─────────┘     │
//! │                                                    │               │
//! │  ┌───────────────┐   ┌────────────────┐   ┌────────▼─────────┐     │
//! │  │   CashShift   │   │ CashMovement   │   │    SaleItem      │     │
//! │  │ ───────────── │   │ ────────────── │   │ ──────────────── │     │
//! │  │ status        │◄──│ shift_id       │   │ price snapshot   │     │
//! │  │ variance      │   │ kind, amount   │   │ refunded_quantity│     │
//! │  └───────────────┘   └────────────────┘   └──────────────────┘     │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Dual-Key Identity Pattern
//! Every entity has:
//! - `id`: UUID v4 - immutable, used for database relations
//! - Business ID: (sku, etc.) - human-readable, potentially mutable
//!
//! ## Mutability Rules
//! StockMovement, CashMovement and RefundAdjustment rows are append-only:
//! corrections are new rows, never updates. The only mutable shared state
//! is `Product.current_stock` and `SaleItem.refunded_quantity`, and both
//! are written exclusively by the ledger/refund operations.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::Money;

// =============================================================================
// Product
// =============================================================================

/// A product available for sale.
///
/// `current_stock` is a derived cache: it always equals the product's
/// opening stock plus the sum of all committed movement deltas, and is
/// only ever written in the same transaction as the movement that
/// explains the change.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Product {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Tenant this product belongs to.
    pub tenant_id: String,

    /// Business (store) this product belongs to.
    pub business_id: String,

    /// Stock Keeping Unit - business identifier, unique per business.
    pub sku: String,

    /// Display name.
    pub name: String,

    /// Sale price in cents (smallest currency unit).
    pub price_cents: i64,

    /// Cost in cents (for profit calculations).
    pub cost_cents: i64,

    /// Current stock level, derived from the movement ledger.
    pub current_stock: i64,

    /// Whether to track inventory for this product.
    pub track_inventory: bool,

    /// Allow selling when stock is zero or negative.
    pub allow_negative_stock: bool,

    /// Whether product is active (soft delete).
    pub is_active: bool,

    /// When the product was created.
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,

    /// When the product was last updated.
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Returns the sale price as a Money type.
    #[inline]
    pub fn price(&self) -> Money {
        Money::from_cents(self.price_cents)
    }

    /// Returns the cost as a Money type.
    #[inline]
    pub fn cost(&self) -> Money {
        Money::from_cents(self.cost_cents)
    }

    /// Checks whether stock is enforced when decrementing this product.
    ///
    /// Enforcement is on when inventory is tracked and negative stock is
    /// not allowed; only then can a decrement fail for lack of stock.
    #[inline]
    pub fn enforces_stock(&self) -> bool {
        self.track_inventory && !self.allow_negative_stock
    }

    /// Checks if `quantity` units can be sold at the current stock level.
    pub fn can_sell(&self, quantity: i64) -> bool {
        !self.enforces_stock() || self.current_stock >= quantity
    }
}

// =============================================================================
// Stock Movement
// =============================================================================

/// The kind of a stock movement.
///
/// The kind constrains the sign of `quantity_delta`:
///
/// | kind       | delta     |
/// |------------|-----------|
/// | arrival    | positive  |
/// | sale       | negative  |
/// | adjustment | any ≠ 0   |
/// | return     | positive  |
/// | damaged    | negative  |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum MovementKind {
    /// Stock received from a supplier.
    Arrival,
    /// Stock sold (written by checkout).
    Sale,
    /// Manual correction, either direction.
    Adjustment,
    /// Stock restored by a refund.
    Return,
    /// Stock written off as damaged.
    Damaged,
}

impl MovementKind {
    /// Required delta sign for this kind: `1` (positive), `-1` (negative),
    /// `0` (either, but never zero).
    pub const fn required_sign(&self) -> i8 {
        match self {
            MovementKind::Arrival | MovementKind::Return => 1,
            MovementKind::Sale | MovementKind::Damaged => -1,
            MovementKind::Adjustment => 0,
        }
    }

    /// Stable lowercase name, matching the database representation.
    pub const fn as_str(&self) -> &'static str {
        match self {
            MovementKind::Arrival => "arrival",
            MovementKind::Sale => "sale",
            MovementKind::Adjustment => "adjustment",
            MovementKind::Return => "return",
            MovementKind::Damaged => "damaged",
        }
    }
}

/// An immutable, signed stock-quantity change record.
///
/// The movement ledger is the authority on stock: `Product.current_stock`
/// is derived from it and must always equal the sum of committed deltas.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct StockMovement {
    pub id: String,
    pub product_id: String,
    pub business_id: String,
    /// Signed change in stock. Never zero.
    pub quantity_delta: i64,
    pub kind: MovementKind,
    /// Human-entered explanation ("weekly delivery", "refund #...", ...).
    pub reason: String,
    /// Who caused the movement (user id or system actor).
    pub actor: String,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Payment Method
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    /// Physical cash payment. Feeds the register's expected-cash balance.
    Cash,
    /// Card payment on external terminal.
    Card,
    /// Mobile wallet payment.
    Mobile,
}

impl PaymentMethod {
    /// Parses a user-supplied payment method string.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "cash" => Some(PaymentMethod::Cash),
            "card" => Some(PaymentMethod::Card),
            "mobile" => Some(PaymentMethod::Mobile),
            _ => None,
        }
    }
}

// =============================================================================
// Sale
// =============================================================================

/// A completed sale transaction.
///
/// Sales are immutable once committed: the money fields are never
/// rewritten, not even by refunds. Refunds append [`RefundAdjustment`]
/// rows and update per-line `refunded_quantity`; `is_refunded` flips to
/// true only when every line is fully refunded.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Sale {
    pub id: String,
    pub tenant_id: String,
    pub business_id: String,
    pub payment_method: PaymentMethod,
    /// Final amount charged: max(0, subtotal - discounts).
    pub sales_amount_cents: i64,
    /// Total discount across all lines.
    pub discount_cents: i64,
    /// Total cost of goods sold (cost snapshot × quantity).
    pub cost_cents: i64,
    /// sales_amount - cost.
    pub profit_cents: i64,
    /// profit / sales_amount × 100; 0 when sales_amount is 0.
    pub profit_percentage: f64,
    /// True once every line's refunded_quantity equals its quantity.
    pub is_refunded: bool,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl Sale {
    /// Returns the final charged amount as Money.
    #[inline]
    pub fn sales_amount(&self) -> Money {
        Money::from_cents(self.sales_amount_cents)
    }

    /// Returns the profit as Money.
    #[inline]
    pub fn profit(&self) -> Money {
        Money::from_cents(self.profit_cents)
    }
}

// =============================================================================
// Sale Item
// =============================================================================

/// A line item in a sale.
///
/// Uses the snapshot pattern: price, cost and SKU are frozen at sale time
/// and never reflect later catalog changes. `refunded_quantity` is the
/// load-bearing field of refund processing - it is what makes refunding
/// the same units twice impossible.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct SaleItem {
    pub id: String,
    pub sale_id: String,
    pub product_id: String,
    /// SKU at time of sale (frozen).
    pub sku_snapshot: String,
    /// Quantity sold.
    pub quantity: i64,
    /// Unit price in cents at time of sale (frozen).
    pub unit_price_cents: i64,
    /// Unit cost in cents at time of sale (frozen).
    pub unit_cost_cents: i64,
    /// Discount applied to this line, in cents.
    pub discount_cents: i64,
    /// Units already refunded. Invariant: 0 ≤ refunded_quantity ≤ quantity.
    pub refunded_quantity: i64,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl SaleItem {
    /// Gross line total before discount (unit price × quantity).
    #[inline]
    pub fn gross_cents(&self) -> i64 {
        self.unit_price_cents * self.quantity
    }

    /// Net amount actually paid for this line (gross minus discount).
    #[inline]
    pub fn net_paid(&self) -> Money {
        Money::from_cents(self.gross_cents() - self.discount_cents)
    }

    /// Units that may still be refunded.
    #[inline]
    pub fn remaining_refundable(&self) -> i64 {
        self.quantity - self.refunded_quantity
    }

    /// Refund value of `quantity` units, prorated from net paid.
    ///
    /// Proration from net paid (not gross price) means a discounted line
    /// never refunds more than the customer actually handed over.
    pub fn refund_value(&self, quantity: i64) -> Money {
        self.net_paid().prorate(quantity, self.quantity)
    }
}

// =============================================================================
// Refund Adjustment
// =============================================================================

/// An immutable financial-adjustment record written by a refund.
///
/// One row per refund call. The original Sale's totals are never mutated;
/// reporting reconstructs net revenue as `sale - Σ adjustments`, which
/// keeps the full audit trail intact.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct RefundAdjustment {
    pub id: String,
    pub sale_id: String,
    pub business_id: String,
    /// Money returned to the customer, in cents. Always positive.
    pub amount_cents: i64,
    /// Total units returned across all lines of this refund.
    pub quantity: i64,
    pub reason: String,
    pub actor: String,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Cash Shift
// =============================================================================

/// Lifecycle status of a register session.
///
/// Transitions open → closed exactly once; closed is terminal.
/// Reconciliation mistakes are fixed by opening a new shift, never by
/// reopening a closed one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum ShiftStatus {
    Open,
    Closed,
}

/// One register's open-to-close trading session.
///
/// At most one open shift exists per business at any time (enforced by a
/// partial unique index). `expected_cents` and `variance_cents` are
/// computed once, at close, and the row is read-only afterwards.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct CashShift {
    pub id: String,
    pub business_id: String,
    pub user_id: String,
    pub status: ShiftStatus,
    /// Starting cash placed in the register at open.
    pub opening_float_cents: i64,
    /// Physically counted cash at close. None while open.
    pub counted_cents: Option<i64>,
    /// Computed expected cash at close. None while open.
    pub expected_cents: Option<i64>,
    /// counted - expected. None while open.
    pub variance_cents: Option<i64>,
    #[ts(as = "String")]
    pub opened_at: DateTime<Utc>,
    #[ts(as = "Option<String>")]
    pub closed_at: Option<DateTime<Utc>>,
}

impl CashShift {
    /// Checks if the shift is still trading.
    #[inline]
    pub fn is_open(&self) -> bool {
        self.status == ShiftStatus::Open
    }
}

// =============================================================================
// Cash Movement
// =============================================================================

/// The kind of a cash movement within a shift.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum CashMovementKind {
    /// Cash removed from the register to a safe.
    Drop,
    /// Cash removed to cover an expense.
    Payout,
    /// Cash added to the register float.
    FloatAdd,
}

impl CashMovementKind {
    /// Sign of this kind's effect on the register balance.
    pub const fn balance_sign(&self) -> i64 {
        match self {
            CashMovementKind::FloatAdd => 1,
            CashMovementKind::Drop | CashMovementKind::Payout => -1,
        }
    }
}

/// An immutable cash movement recorded during an open shift.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct CashMovement {
    pub id: String,
    pub shift_id: String,
    pub business_id: String,
    pub kind: CashMovementKind,
    /// Always positive; the kind carries the direction.
    pub amount_cents: i64,
    pub reason: String,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_movement_kind_signs() {
        assert_eq!(MovementKind::Arrival.required_sign(), 1);
        assert_eq!(MovementKind::Return.required_sign(), 1);
        assert_eq!(MovementKind::Sale.required_sign(), -1);
        assert_eq!(MovementKind::Damaged.required_sign(), -1);
        assert_eq!(MovementKind::Adjustment.required_sign(), 0);
    }

    #[test]
    fn test_payment_method_parse() {
        assert_eq!(PaymentMethod::parse("cash"), Some(PaymentMethod::Cash));
        assert_eq!(PaymentMethod::parse(" Card "), Some(PaymentMethod::Card));
        assert_eq!(PaymentMethod::parse("mobile"), Some(PaymentMethod::Mobile));
        assert_eq!(PaymentMethod::parse("cheque"), None);
        assert_eq!(PaymentMethod::parse(""), None);
    }

    #[test]
    fn test_cash_movement_balance_signs() {
        assert_eq!(CashMovementKind::FloatAdd.balance_sign(), 1);
        assert_eq!(CashMovementKind::Drop.balance_sign(), -1);
        assert_eq!(CashMovementKind::Payout.balance_sign(), -1);
    }

    fn item(quantity: i64, unit_price_cents: i64, discount_cents: i64, refunded: i64) -> SaleItem {
        SaleItem {
            id: "i-1".to_string(),
            sale_id: "s-1".to_string(),
            product_id: "p-1".to_string(),
            sku_snapshot: "SKU-1".to_string(),
            quantity,
            unit_price_cents,
            unit_cost_cents: 0,
            discount_cents,
            refunded_quantity: refunded,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_sale_item_net_paid() {
        // 3 × $10.00 with $1.00 off → net $29.00
        let it = item(3, 1000, 100, 0);
        assert_eq!(it.gross_cents(), 3000);
        assert_eq!(it.net_paid().cents(), 2900);
    }

    #[test]
    fn test_sale_item_refund_value_prorates_discount() {
        let it = item(3, 1000, 100, 0);
        // One unit: 2900 / 3 → 967, not the gross 1000
        assert_eq!(it.refund_value(1).cents(), 967);
        // All units: exactly net paid
        assert_eq!(it.refund_value(3).cents(), 2900);
    }

    #[test]
    fn test_remaining_refundable() {
        let it = item(5, 1000, 0, 2);
        assert_eq!(it.remaining_refundable(), 3);
    }

    #[test]
    fn test_product_stock_enforcement() {
        let mut product = Product {
            id: "p-1".to_string(),
            tenant_id: "t-1".to_string(),
            business_id: "b-1".to_string(),
            sku: "SKU-1".to_string(),
            name: "Widget".to_string(),
            price_cents: 1000,
            cost_cents: 600,
            current_stock: 3,
            track_inventory: true,
            allow_negative_stock: false,
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        assert!(product.enforces_stock());
        assert!(product.can_sell(3));
        assert!(!product.can_sell(4));

        product.allow_negative_stock = true;
        assert!(product.can_sell(100));

        product.allow_negative_stock = false;
        product.track_inventory = false;
        assert!(product.can_sell(100));
    }
}
