//! # tally-engine: Service Layer for the Tally Retail Core
//!
//! The four components behind the narrow boundary the presentation layer
//! calls. Everything above this crate (pages, routing, auth, billing) is
//! thin glue; everything below it is storage.
//!
//! ## Components
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                        tally-engine                                 │
//! │                                                                     │
//! │  ┌──────────────┐                ┌──────────────────┐               │
//! │  │ SalesEngine  │───────────────►│   StockLedger    │               │
//! │  └──────┬───────┘   decrements   └──────▲───────────┘               │
//! │         │                               │ restocks                  │
//! │         │ cash sales       ┌────────────┴────┐                      │
//! │         ▼                  │ RefundProcessor │                      │
//! │  ┌──────────────────┐      └─────────────────┘                      │
//! │  │ CashShiftManager │                                               │
//! │  └──────────────────┘                                               │
//! │                                                                     │
//! │  Every mutating operation:                                          │
//! │   • validates before any write (zero side effects on rejection)     │
//! │   • runs as ONE transaction (fully commits or fully fails)          │
//! │   • returns the authoritative post-commit state                     │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust,ignore
//! use tally_db::{Database, DbConfig};
//! use tally_engine::{Cart, CartLine, SalesEngine};
//!
//! let db = Database::new(DbConfig::new("./tally.db")).await?;
//! let sales = SalesEngine::new(db.clone());
//!
//! let completed = sales.checkout(Cart { /* ... */ }).await?;
//! // `completed` is the committed truth - replace any local view with it
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod refunds;
pub mod sales;
pub mod shifts;
pub mod stock_ledger;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{EngineError, EngineResult};
pub use refunds::{RefundLine, RefundOutcome, RefundProcessor, RefundRequest};
pub use sales::{Cart, CartLine, CompletedSale, SalesEngine};
pub use shifts::CashShiftManager;
pub use stock_ledger::{MovementOutcome, NewMovement, StockLedger};

// =============================================================================
// Test Support
// =============================================================================

/// Shared fixtures for the service tests.
#[cfg(test)]
pub(crate) mod testing {
    use chrono::Utc;
    use tally_core::{Product, DEFAULT_TENANT_ID};
    use tally_db::{Database, DbConfig};
    use uuid::Uuid;

    /// A fresh, isolated in-memory database with migrations applied.
    pub async fn test_db() -> Database {
        Database::new(DbConfig::in_memory())
            .await
            .expect("in-memory database")
    }

    /// Seeds one product under business `biz-1`: price $100.00, cost
    /// $60.00, the given opening stock, inventory enforced.
    pub async fn seed_product(db: &Database, sku: &str, stock: i64) -> Product {
        let now = Utc::now();
        let product = Product {
            id: Uuid::new_v4().to_string(),
            tenant_id: DEFAULT_TENANT_ID.to_string(),
            business_id: "biz-1".to_string(),
            sku: sku.to_string(),
            name: format!("Product {sku}"),
            price_cents: 10_000,
            cost_cents: 6_000,
            current_stock: stock,
            track_inventory: true,
            allow_negative_stock: false,
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        db.products().insert(&product).await.expect("seed product");
        product
    }
}

// =============================================================================
// Cross-Component Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{seed_product, test_db};
    use tally_core::{CashMovementKind, MovementKind, PaymentMethod};

    /// A full register day: receive stock, open a shift, sell for cash,
    /// take a refund, drop cash, close - and every counter reconciles.
    #[tokio::test]
    async fn test_full_trading_day_reconciles() {
        let db = test_db().await;
        let product = seed_product(&db, "SKU-1", 0).await;

        let ledger = StockLedger::new(db.clone());
        let sales = SalesEngine::new(db.clone());
        let refunds = RefundProcessor::new(db.clone());
        let register = CashShiftManager::new(db.clone());

        // Morning delivery: 30 units through the ledger
        ledger
            .record_movement(NewMovement {
                product_id: product.id.clone(),
                quantity_delta: 30,
                kind: MovementKind::Arrival,
                reason: "morning delivery".to_string(),
                actor: "manager-1".to_string(),
            })
            .await
            .unwrap();

        let shift = register.open_shift("biz-1", "cashier-1", 20_000).await.unwrap();

        // Two cash sales: 4 + 2 units at $100 each
        let first = sales
            .checkout(Cart {
                business_id: "biz-1".to_string(),
                payment_method: PaymentMethod::Cash,
                actor: "cashier-1".to_string(),
                lines: vec![CartLine {
                    product_id: product.id.clone(),
                    quantity: 4,
                    discount_cents: 0,
                }],
            })
            .await
            .unwrap();
        sales
            .checkout(Cart {
                business_id: "biz-1".to_string(),
                payment_method: PaymentMethod::Cash,
                actor: "cashier-1".to_string(),
                lines: vec![CartLine {
                    product_id: product.id.clone(),
                    quantity: 2,
                    discount_cents: 0,
                }],
            })
            .await
            .unwrap();

        // One unit of the first sale comes back
        refunds
            .process_refund(RefundRequest {
                sale_id: first.sale.id.clone(),
                lines: vec![RefundLine {
                    product_id: product.id.clone(),
                    quantity: 1,
                }],
                reason: "wrong size".to_string(),
                actor: "manager-1".to_string(),
            })
            .await
            .unwrap();

        // Stock: 30 − 4 − 2 + 1 = 25, and the ledger agrees
        let current = db.products().get_by_id(&product.id).await.unwrap().unwrap();
        assert_eq!(current.current_stock, 25);
        assert_eq!(ledger.recorded_balance(&product.id).await.unwrap(), 25);
        assert_eq!(ledger.history(&product.id, 10).await.unwrap().len(), 4);

        // Afternoon safe drop
        register
            .record_cash_movement(&shift.id, CashMovementKind::Drop, 40_000, "safe drop")
            .await
            .unwrap();

        // Drawer: 20_000 float + 60_000 cash sales − 40_000 drop.
        // The refund adjusts the books, not the drawer formula.
        let expected = 20_000 + 60_000 - 40_000;
        assert_eq!(register.live_balance(&shift.id).await.unwrap(), expected);

        let closed = register.close_shift(&shift.id, expected - 500).await.unwrap();
        assert_eq!(closed.expected_cents, Some(expected));
        assert_eq!(closed.variance_cents, Some(-500));

        // The audit trail survives: original sale amount is untouched,
        // the refund lives in its own adjustment record
        let sale_after = sales.get_sale(&first.sale.id).await.unwrap();
        assert_eq!(sale_after.sale.sales_amount_cents, 40_000);
        assert_eq!(sale_after.items[0].refunded_quantity, 1);
        let adjustments = refunds.adjustments(&first.sale.id).await.unwrap();
        assert_eq!(adjustments.len(), 1);
        assert_eq!(adjustments[0].amount_cents, 10_000);
    }
}
