//! # Stock Movement Repository
//!
//! The append-only movement ledger.
//!
//! ## Ledger Discipline
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │  Every stock change is TWO writes in ONE transaction:               │
//! │                                                                     │
//! │  1. INSERT INTO stock_movements (...)        ← the explanation      │
//! │  2. UPDATE products SET current_stock + δ    ← the cached counter   │
//! │                                                                     │
//! │  There is no UPDATE or DELETE on stock_movements, ever.             │
//! │  Corrections are new movements (kind = adjustment).                 │
//! │                                                                     │
//! │  Invariant: current_stock == opening + Σ quantity_delta, at every   │
//! │  observation point. `sum_deltas` exists so audits can check it.     │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```

use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use crate::error::DbResult;
use tally_core::StockMovement;

/// Column list shared by every movement SELECT.
const MOVEMENT_COLUMNS: &str =
    "id, product_id, business_id, quantity_delta, kind, reason, actor, created_at";

/// Repository for the stock movement ledger.
#[derive(Debug, Clone)]
pub struct MovementRepository {
    pool: SqlitePool,
}

impl MovementRepository {
    /// Creates a new MovementRepository.
    pub fn new(pool: SqlitePool) -> Self {
        MovementRepository { pool }
    }

    /// Appends a movement row inside a caller-owned transaction.
    ///
    /// Always paired with the matching `current_stock` update in the same
    /// transaction; tally-engine owns that pairing.
    pub async fn insert_tx(conn: &mut SqliteConnection, movement: &StockMovement) -> DbResult<()> {
        debug!(
            product_id = %movement.product_id,
            delta = %movement.quantity_delta,
            kind = ?movement.kind,
            "Appending stock movement"
        );

        sqlx::query(
            "INSERT INTO stock_movements (
                id, product_id, business_id, quantity_delta, kind, reason, actor, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        )
        .bind(&movement.id)
        .bind(&movement.product_id)
        .bind(&movement.business_id)
        .bind(movement.quantity_delta)
        .bind(movement.kind)
        .bind(&movement.reason)
        .bind(&movement.actor)
        .bind(movement.created_at)
        .execute(conn)
        .await?;

        Ok(())
    }

    /// Movement history for a product, newest first.
    ///
    /// Pure read: safe to call concurrently and repeatedly.
    pub async fn history(&self, product_id: &str, limit: u32) -> DbResult<Vec<StockMovement>> {
        let sql = format!(
            "SELECT {MOVEMENT_COLUMNS} FROM stock_movements \
             WHERE product_id = ?1 \
             ORDER BY created_at DESC, id DESC \
             LIMIT ?2"
        );
        let movements = sqlx::query_as::<_, StockMovement>(&sql)
            .bind(product_id)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;

        Ok(movements)
    }

    /// Recent movements across a business, newest first (reporting).
    pub async fn list_for_business(
        &self,
        business_id: &str,
        limit: u32,
    ) -> DbResult<Vec<StockMovement>> {
        let sql = format!(
            "SELECT {MOVEMENT_COLUMNS} FROM stock_movements \
             WHERE business_id = ?1 \
             ORDER BY created_at DESC, id DESC \
             LIMIT ?2"
        );
        let movements = sqlx::query_as::<_, StockMovement>(&sql)
            .bind(business_id)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;

        Ok(movements)
    }

    /// Sum of all committed deltas for a product.
    ///
    /// The audit read behind the stock invariant: for a product created
    /// with opening stock S, `S + sum_deltas == current_stock` always.
    pub async fn sum_deltas(&self, product_id: &str) -> DbResult<i64> {
        let sum: i64 = sqlx::query_scalar(
            "SELECT COALESCE(SUM(quantity_delta), 0) FROM stock_movements WHERE product_id = ?1",
        )
        .bind(product_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(sum)
    }
}

/// Helper to generate a new movement ID.
pub fn generate_movement_id() -> String {
    Uuid::new_v4().to_string()
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use crate::repository::product::{generate_product_id, ProductRepository};
    use chrono::Utc;
    use tally_core::{MovementKind, Product, DEFAULT_TENANT_ID};

    async fn setup() -> (Database, Product) {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let now = Utc::now();
        let product = Product {
            id: generate_product_id(),
            tenant_id: DEFAULT_TENANT_ID.to_string(),
            business_id: "biz-1".to_string(),
            sku: "SKU-1".to_string(),
            name: "Widget".to_string(),
            price_cents: 1000,
            cost_cents: 600,
            current_stock: 0,
            track_inventory: true,
            allow_negative_stock: false,
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        db.products().insert(&product).await.unwrap();
        (db, product)
    }

    fn movement(product: &Product, delta: i64, kind: MovementKind) -> StockMovement {
        StockMovement {
            id: generate_movement_id(),
            product_id: product.id.clone(),
            business_id: product.business_id.clone(),
            quantity_delta: delta,
            kind,
            reason: String::new(),
            actor: "tester".to_string(),
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_append_and_history_newest_first() {
        let (db, product) = setup().await;
        let repo = db.movements();

        for delta in [10, -3, 5] {
            let kind = if delta > 0 {
                MovementKind::Arrival
            } else {
                MovementKind::Sale
            };
            let mut tx = db.begin().await.unwrap();
            MovementRepository::insert_tx(&mut tx, &movement(&product, delta, kind))
                .await
                .unwrap();
            ProductRepository::apply_stock_delta(&mut tx, &product.id, delta)
                .await
                .unwrap();
            tx.commit().await.unwrap();
        }

        let history = repo.history(&product.id, 10).await.unwrap();
        assert_eq!(history.len(), 3);
        assert_eq!(history[0].quantity_delta, 5);
        assert_eq!(history[2].quantity_delta, 10);

        assert_eq!(repo.sum_deltas(&product.id).await.unwrap(), 12);

        let current = db
            .products()
            .get_by_id(&product.id)
            .await
            .unwrap()
            .unwrap()
            .current_stock;
        assert_eq!(current, 12);
    }

    #[tokio::test]
    async fn test_sum_deltas_empty_is_zero() {
        let (db, product) = setup().await;
        assert_eq!(db.movements().sum_deltas(&product.id).await.unwrap(), 0);
    }
}
