//! # Product Repository
//!
//! Database operations for the product catalog and its stock counter.
//!
//! ## Stock Update Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │  ❌ WRONG: Absolute update (loses concurrent writes)               │
//! │     UPDATE products SET current_stock = 7 WHERE id = ?             │
//! │                                                                     │
//! │  ✅ CORRECT: Delta update                                           │
//! │     UPDATE products SET current_stock = current_stock - 3          │
//! │                                                                     │
//! │  ✅ GUARDED: Delta update that cannot go below zero                 │
//! │     UPDATE products                                                 │
//! │     SET current_stock = current_stock + :delta                     │
//! │     WHERE id = :id AND current_stock + :delta >= 0                 │
//! │                                                                     │
//! │  The guarded form is an atomic decrement-if-available: two sales   │
//! │  of the last unit can never both pass, regardless of interleaving. │
//! │  rows_affected() == 0 means the guard rejected the write.          │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Stock-delta writes take a `&mut SqliteConnection` so they always run
//! inside a caller-owned transaction next to the movement row that
//! explains them; there is deliberately no pool-level stock write.

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use tally_core::Product;

/// Column list shared by every product SELECT.
const PRODUCT_COLUMNS: &str = "id, tenant_id, business_id, sku, name, price_cents, cost_cents, \
     current_stock, track_inventory, allow_negative_stock, is_active, created_at, updated_at";

/// Repository for product database operations.
#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
}

impl ProductRepository {
    /// Creates a new ProductRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ProductRepository { pool }
    }

    /// Gets a product by its ID.
    ///
    /// ## Returns
    /// * `Ok(Some(Product))` - Product found
    /// * `Ok(None)` - Product not found
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Product>> {
        let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ?1");
        let product = sqlx::query_as::<_, Product>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(product)
    }

    /// Gets a product by its SKU within a business.
    pub async fn get_by_sku(&self, business_id: &str, sku: &str) -> DbResult<Option<Product>> {
        let sql =
            format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE business_id = ?1 AND sku = ?2");
        let product = sqlx::query_as::<_, Product>(&sql)
            .bind(business_id)
            .bind(sku)
            .fetch_optional(&self.pool)
            .await?;

        Ok(product)
    }

    /// Lists active products for a business, ordered by name.
    ///
    /// A fresh authoritative snapshot on every call; callers must not
    /// cache and locally mutate the result.
    pub async fn list(&self, business_id: &str, limit: u32) -> DbResult<Vec<Product>> {
        let sql = format!(
            "SELECT {PRODUCT_COLUMNS} FROM products \
             WHERE business_id = ?1 AND is_active = 1 \
             ORDER BY name LIMIT ?2"
        );
        let products = sqlx::query_as::<_, Product>(&sql)
            .bind(business_id)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;

        Ok(products)
    }

    /// Inserts a new product.
    ///
    /// ## Returns
    /// * `Ok(Product)` - Inserted product
    /// * `Err(DbError::UniqueViolation)` - SKU already exists in business
    pub async fn insert(&self, product: &Product) -> DbResult<Product> {
        debug!(sku = %product.sku, business_id = %product.business_id, "Inserting product");

        let result = sqlx::query(
            "INSERT INTO products (
                id, tenant_id, business_id, sku, name,
                price_cents, cost_cents, current_stock,
                track_inventory, allow_negative_stock, is_active,
                created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
        )
        .bind(&product.id)
        .bind(&product.tenant_id)
        .bind(&product.business_id)
        .bind(&product.sku)
        .bind(&product.name)
        .bind(product.price_cents)
        .bind(product.cost_cents)
        .bind(product.current_stock)
        .bind(product.track_inventory)
        .bind(product.allow_negative_stock)
        .bind(product.is_active)
        .bind(product.created_at)
        .bind(product.updated_at)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(product.clone()),
            Err(e) => {
                let db_err: DbError = e.into();
                if db_err.is_unique_violation() {
                    Err(DbError::duplicate("sku", &product.sku))
                } else {
                    Err(db_err)
                }
            }
        }
    }

    /// Updates an existing product's catalog fields.
    ///
    /// `current_stock` is intentionally NOT written here - the stock
    /// counter only moves together with a ledger row.
    pub async fn update(&self, product: &Product) -> DbResult<()> {
        debug!(id = %product.id, "Updating product");

        let now = Utc::now();

        let result = sqlx::query(
            "UPDATE products SET
                sku = ?2,
                name = ?3,
                price_cents = ?4,
                cost_cents = ?5,
                track_inventory = ?6,
                allow_negative_stock = ?7,
                is_active = ?8,
                updated_at = ?9
             WHERE id = ?1",
        )
        .bind(&product.id)
        .bind(&product.sku)
        .bind(&product.name)
        .bind(product.price_cents)
        .bind(product.cost_cents)
        .bind(product.track_inventory)
        .bind(product.allow_negative_stock)
        .bind(product.is_active)
        .bind(now)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", &product.id));
        }

        Ok(())
    }

    /// Soft-deletes a product by setting is_active = false.
    ///
    /// Historical sales and movements still reference the row, so it is
    /// never physically deleted.
    pub async fn soft_delete(&self, id: &str) -> DbResult<()> {
        debug!(id = %id, "Soft-deleting product");

        let now = Utc::now();

        let result = sqlx::query(
            "UPDATE products SET is_active = 0, updated_at = ?2 WHERE id = ?1",
        )
        .bind(id)
        .bind(now)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", id));
        }

        Ok(())
    }

    /// Counts active products for a business (for diagnostics).
    pub async fn count(&self, business_id: &str) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM products WHERE business_id = ?1 AND is_active = 1",
        )
        .bind(business_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }

    // =========================================================================
    // Transaction participants
    // =========================================================================

    /// Reads a product inside a caller-owned transaction.
    pub async fn get_by_id_tx(
        conn: &mut SqliteConnection,
        id: &str,
    ) -> DbResult<Option<Product>> {
        let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ?1");
        let product = sqlx::query_as::<_, Product>(&sql)
            .bind(id)
            .fetch_optional(conn)
            .await?;

        Ok(product)
    }

    /// Applies a stock delta without a floor guard.
    ///
    /// For positive deltas, and for negative deltas on products that do
    /// not enforce stock (untracked or negative-allowed).
    ///
    /// ## Returns
    /// Rows affected: 0 means the product does not exist.
    pub async fn apply_stock_delta(
        conn: &mut SqliteConnection,
        product_id: &str,
        delta: i64,
    ) -> DbResult<u64> {
        debug!(id = %product_id, delta = %delta, "Applying stock delta");

        let now = Utc::now();

        let result = sqlx::query(
            "UPDATE products SET
                current_stock = current_stock + ?2,
                updated_at = ?3
             WHERE id = ?1",
        )
        .bind(product_id)
        .bind(delta)
        .bind(now)
        .execute(conn)
        .await?;

        Ok(result.rows_affected())
    }

    /// Applies a negative stock delta with a zero floor guard.
    ///
    /// The atomic decrement-if-available of the checkout path: the WHERE
    /// clause re-checks availability at write time, so a concurrent sale
    /// that got there first makes this call affect zero rows instead of
    /// driving stock negative.
    ///
    /// ## Returns
    /// Rows affected: 0 means the guard rejected the write (or the
    /// product does not exist - callers distinguish by re-reading).
    pub async fn apply_stock_delta_guarded(
        conn: &mut SqliteConnection,
        product_id: &str,
        delta: i64,
    ) -> DbResult<u64> {
        debug!(id = %product_id, delta = %delta, "Applying guarded stock delta");

        let now = Utc::now();

        let result = sqlx::query(
            "UPDATE products SET
                current_stock = current_stock + ?2,
                updated_at = ?3
             WHERE id = ?1 AND current_stock + ?2 >= 0",
        )
        .bind(product_id)
        .bind(delta)
        .bind(now)
        .execute(conn)
        .await?;

        Ok(result.rows_affected())
    }
}

/// Helper to generate a new product ID.
pub fn generate_product_id() -> String {
    Uuid::new_v4().to_string()
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use tally_core::DEFAULT_TENANT_ID;

    fn sample_product(business_id: &str, sku: &str, stock: i64) -> Product {
        let now = Utc::now();
        Product {
            id: generate_product_id(),
            tenant_id: DEFAULT_TENANT_ID.to_string(),
            business_id: business_id.to_string(),
            sku: sku.to_string(),
            name: format!("Product {sku}"),
            price_cents: 1000,
            cost_cents: 600,
            current_stock: stock,
            track_inventory: true,
            allow_negative_stock: false,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn test_insert_and_get() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.products();

        let product = sample_product("biz-1", "SKU-1", 50);
        repo.insert(&product).await.unwrap();

        let found = repo.get_by_id(&product.id).await.unwrap().unwrap();
        assert_eq!(found.sku, "SKU-1");
        assert_eq!(found.current_stock, 50);

        let by_sku = repo.get_by_sku("biz-1", "SKU-1").await.unwrap().unwrap();
        assert_eq!(by_sku.id, product.id);
    }

    #[tokio::test]
    async fn test_duplicate_sku_rejected() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.products();

        repo.insert(&sample_product("biz-1", "SKU-1", 10))
            .await
            .unwrap();
        let err = repo
            .insert(&sample_product("biz-1", "SKU-1", 10))
            .await
            .unwrap_err();
        assert!(err.is_unique_violation());

        // Same SKU in another business is fine
        repo.insert(&sample_product("biz-2", "SKU-1", 10))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_guarded_delta_rejects_overdraw() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.products();

        let product = sample_product("biz-1", "SKU-1", 3);
        repo.insert(&product).await.unwrap();

        let mut tx = db.begin().await.unwrap();
        let rows = ProductRepository::apply_stock_delta_guarded(&mut *tx, &product.id, -3)
            .await
            .unwrap();
        assert_eq!(rows, 1);
        let rows = ProductRepository::apply_stock_delta_guarded(&mut *tx, &product.id, -1)
            .await
            .unwrap();
        assert_eq!(rows, 0);
        tx.commit().await.unwrap();

        let found = repo.get_by_id(&product.id).await.unwrap().unwrap();
        assert_eq!(found.current_stock, 0);
    }

    #[tokio::test]
    async fn test_soft_delete_hides_from_list() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.products();

        let product = sample_product("biz-1", "SKU-1", 1);
        repo.insert(&product).await.unwrap();
        assert_eq!(repo.count("biz-1").await.unwrap(), 1);

        repo.soft_delete(&product.id).await.unwrap();
        assert_eq!(repo.count("biz-1").await.unwrap(), 0);
        assert!(repo.list("biz-1", 10).await.unwrap().is_empty());

        // Still reachable by id for history
        assert!(repo.get_by_id(&product.id).await.unwrap().is_some());
    }
}
