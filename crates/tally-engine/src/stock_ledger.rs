//! # Stock Ledger Service
//!
//! The authoritative record of stock-affecting events per product.
//!
//! ## The One Rule
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │  current_stock(p) == opening_stock(p) + Σ quantity_delta            │
//! │                                                                     │
//! │  ...over all committed movements for p, at EVERY observation        │
//! │  point. The ledger keeps this true by writing the movement row      │
//! │  and the counter delta in the same transaction, and by being the    │
//! │  ONLY writer of current_stock in the whole workspace.               │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::error::{EngineError, EngineResult};
use tally_core::validation::{validate_movement_delta, validate_reason};
use tally_core::{MovementKind, Product, StockMovement};
use tally_db::repository::movement::MovementRepository;
use tally_db::repository::product::ProductRepository;
use tally_db::Database;

// =============================================================================
// Requests & Outcomes
// =============================================================================

/// A request to record one stock movement.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewMovement {
    pub product_id: String,
    /// Signed change; the kind constrains the allowed sign.
    pub quantity_delta: i64,
    pub kind: MovementKind,
    pub reason: String,
    pub actor: String,
}

/// The authoritative post-commit state after recording a movement.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MovementOutcome {
    pub movement: StockMovement,
    /// The product as committed, including the updated stock counter.
    pub product: Product,
}

// =============================================================================
// Service
// =============================================================================

/// Append-only stock ledger over the shared store.
#[derive(Debug, Clone)]
pub struct StockLedger {
    db: Database,
}

impl StockLedger {
    /// Creates a new StockLedger service.
    pub fn new(db: Database) -> Self {
        StockLedger { db }
    }

    /// Appends an immutable movement and applies its delta to the
    /// product's stock counter, atomically.
    ///
    /// ## Validation (before any write)
    /// - delta sign must match the kind (damaged must be negative, ...)
    /// - zero deltas are always rejected
    ///
    /// ## Concurrency
    /// Negative deltas on stock-enforcing products use the guarded
    /// conditional UPDATE; a failed guard rolls the whole call back and
    /// reports [`EngineError::InsufficientStock`].
    pub async fn record_movement(&self, request: NewMovement) -> EngineResult<MovementOutcome> {
        validate_movement_delta(request.kind, request.quantity_delta)?;
        validate_reason(&request.reason)?;

        let mut tx = self.db.begin().await?;

        let product = ProductRepository::get_by_id_tx(&mut tx, &request.product_id)
            .await?
            .ok_or_else(|| EngineError::ProductNotFound(request.product_id.clone()))?;

        let delta = request.quantity_delta;
        let rows = if delta < 0 && product.enforces_stock() {
            ProductRepository::apply_stock_delta_guarded(&mut tx, &product.id, delta).await?
        } else {
            ProductRepository::apply_stock_delta(&mut tx, &product.id, delta).await?
        };

        if rows == 0 {
            // Guard rejected the write; dropping the transaction rolls back
            return Err(EngineError::InsufficientStock {
                sku: product.sku,
                available: product.current_stock,
                requested: -delta,
            });
        }

        let movement = StockMovement {
            id: Uuid::new_v4().to_string(),
            product_id: product.id.clone(),
            business_id: product.business_id.clone(),
            quantity_delta: delta,
            kind: request.kind,
            reason: request.reason,
            actor: request.actor,
            created_at: Utc::now(),
        };
        MovementRepository::insert_tx(&mut tx, &movement).await?;

        let product = ProductRepository::get_by_id_tx(&mut tx, &movement.product_id)
            .await?
            .ok_or(EngineError::ConcurrencyConflict {
                entity: "Product",
                id: movement.product_id.clone(),
            })?;

        tx.commit().await.map_err(tally_db::DbError::from)?;

        info!(
            product_id = %movement.product_id,
            delta = %movement.quantity_delta,
            kind = ?movement.kind,
            stock = %product.current_stock,
            "Stock movement recorded"
        );

        Ok(MovementOutcome { movement, product })
    }

    /// Movement history for a product, newest first.
    ///
    /// Pure read: restartable, safe to call concurrently and repeatedly.
    pub async fn history(&self, product_id: &str, limit: u32) -> EngineResult<Vec<StockMovement>> {
        Ok(self.db.movements().history(product_id, limit).await?)
    }

    /// Sum of all committed deltas for a product (audit read).
    pub async fn recorded_balance(&self, product_id: &str) -> EngineResult<i64> {
        Ok(self.db.movements().sum_deltas(product_id).await?)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
