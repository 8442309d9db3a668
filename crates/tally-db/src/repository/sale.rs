//! # Sale Repository
//!
//! Database operations for sales, sale items and refund adjustments.
//!
//! ## Write Discipline
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │  Checkout (one transaction, owned by SalesEngine):                  │
//! │    INSERT sale row                                                  │
//! │    INSERT item rows (price/cost snapshots)                          │
//! │    per line: guarded stock decrement + movement row                 │
//! │                                                                     │
//! │  Refund (one transaction, owned by RefundProcessor):                │
//! │    per line: CAS increment of refunded_quantity                     │
//! │    INSERT refund_adjustments row (audit; sale totals untouched)     │
//! │    per line: stock increment + return movement row                  │
//! │    UPDATE sales SET is_refunded = 1 (only when fully refunded)      │
//! │                                                                     │
//! │  Sale money fields are written once at checkout and never again.    │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## The refunded_quantity CAS
//! `increment_refunded_tx` re-checks `refunded_quantity + n <= quantity`
//! in its WHERE clause. Two racing refunds that both read a stale value
//! cannot both pass: the second one affects zero rows and the caller
//! rolls the whole refund back.

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use crate::error::DbResult;
use tally_core::{RefundAdjustment, Sale, SaleItem};

/// Column list shared by every sale SELECT.
const SALE_COLUMNS: &str = "id, tenant_id, business_id, payment_method, sales_amount_cents, \
     discount_cents, cost_cents, profit_cents, profit_percentage, is_refunded, created_at";

/// Column list shared by every sale item SELECT.
const ITEM_COLUMNS: &str = "id, sale_id, product_id, sku_snapshot, quantity, unit_price_cents, \
     unit_cost_cents, discount_cents, refunded_quantity, created_at";

/// Column list shared by every refund adjustment SELECT.
const ADJUSTMENT_COLUMNS: &str =
    "id, sale_id, business_id, amount_cents, quantity, reason, actor, created_at";

/// Repository for sale database operations.
#[derive(Debug, Clone)]
pub struct SaleRepository {
    pool: SqlitePool,
}

impl SaleRepository {
    /// Creates a new SaleRepository.
    pub fn new(pool: SqlitePool) -> Self {
        SaleRepository { pool }
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Gets a sale by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Sale>> {
        let sql = format!("SELECT {SALE_COLUMNS} FROM sales WHERE id = ?1");
        let sale = sqlx::query_as::<_, Sale>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(sale)
    }

    /// Gets all items for a sale, in insertion order.
    pub async fn get_items(&self, sale_id: &str) -> DbResult<Vec<SaleItem>> {
        let sql = format!(
            "SELECT {ITEM_COLUMNS} FROM sale_items WHERE sale_id = ?1 ORDER BY created_at, id"
        );
        let items = sqlx::query_as::<_, SaleItem>(&sql)
            .bind(sale_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(items)
    }

    /// Gets all refund adjustments for a sale, oldest first.
    pub async fn get_adjustments(&self, sale_id: &str) -> DbResult<Vec<RefundAdjustment>> {
        let sql = format!(
            "SELECT {ADJUSTMENT_COLUMNS} FROM refund_adjustments \
             WHERE sale_id = ?1 ORDER BY created_at, id"
        );
        let adjustments = sqlx::query_as::<_, RefundAdjustment>(&sql)
            .bind(sale_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(adjustments)
    }

    /// Lists sales for a business in a time window, newest first (reporting).
    pub async fn list(
        &self,
        business_id: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        limit: u32,
    ) -> DbResult<Vec<Sale>> {
        let sql = format!(
            "SELECT {SALE_COLUMNS} FROM sales \
             WHERE business_id = ?1 AND created_at >= ?2 AND created_at < ?3 \
             ORDER BY created_at DESC, id DESC \
             LIMIT ?4"
        );
        let sales = sqlx::query_as::<_, Sale>(&sql)
            .bind(business_id)
            .bind(from)
            .bind(to)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;

        Ok(sales)
    }

    /// Sum of cash sale totals for a business in `[from, to)`.
    ///
    /// Feeds the register's expected-cash computation. When `to` is None
    /// the window is open-ended (a still-trading shift).
    pub async fn cash_sales_between(
        &self,
        business_id: &str,
        from: DateTime<Utc>,
        to: Option<DateTime<Utc>>,
    ) -> DbResult<i64> {
        let total: i64 = match to {
            Some(to) => {
                sqlx::query_scalar(
                    "SELECT COALESCE(SUM(sales_amount_cents), 0) FROM sales \
                     WHERE business_id = ?1 AND payment_method = 'cash' \
                       AND created_at >= ?2 AND created_at < ?3",
                )
                .bind(business_id)
                .bind(from)
                .bind(to)
                .fetch_one(&self.pool)
                .await?
            }
            None => {
                sqlx::query_scalar(
                    "SELECT COALESCE(SUM(sales_amount_cents), 0) FROM sales \
                     WHERE business_id = ?1 AND payment_method = 'cash' \
                       AND created_at >= ?2",
                )
                .bind(business_id)
                .bind(from)
                .fetch_one(&self.pool)
                .await?
            }
        };

        Ok(total)
    }

    // =========================================================================
    // Transaction participants
    // =========================================================================

    /// Inserts a sale row inside a caller-owned transaction.
    pub async fn insert_sale_tx(conn: &mut SqliteConnection, sale: &Sale) -> DbResult<()> {
        debug!(id = %sale.id, amount = %sale.sales_amount_cents, "Inserting sale");

        sqlx::query(
            "INSERT INTO sales (
                id, tenant_id, business_id, payment_method,
                sales_amount_cents, discount_cents, cost_cents,
                profit_cents, profit_percentage, is_refunded, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
        )
        .bind(&sale.id)
        .bind(&sale.tenant_id)
        .bind(&sale.business_id)
        .bind(sale.payment_method)
        .bind(sale.sales_amount_cents)
        .bind(sale.discount_cents)
        .bind(sale.cost_cents)
        .bind(sale.profit_cents)
        .bind(sale.profit_percentage)
        .bind(sale.is_refunded)
        .bind(sale.created_at)
        .execute(conn)
        .await?;

        Ok(())
    }

    /// Inserts a sale item row inside a caller-owned transaction.
    ///
    /// ## Snapshot Pattern
    /// SKU, price and cost are copied onto the item so the sale history
    /// survives later catalog edits.
    pub async fn insert_item_tx(conn: &mut SqliteConnection, item: &SaleItem) -> DbResult<()> {
        debug!(sale_id = %item.sale_id, product_id = %item.product_id, "Adding sale item");

        sqlx::query(
            "INSERT INTO sale_items (
                id, sale_id, product_id, sku_snapshot, quantity,
                unit_price_cents, unit_cost_cents, discount_cents,
                refunded_quantity, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        )
        .bind(&item.id)
        .bind(&item.sale_id)
        .bind(&item.product_id)
        .bind(&item.sku_snapshot)
        .bind(item.quantity)
        .bind(item.unit_price_cents)
        .bind(item.unit_cost_cents)
        .bind(item.discount_cents)
        .bind(item.refunded_quantity)
        .bind(item.created_at)
        .execute(conn)
        .await?;

        Ok(())
    }

    /// Reads a sale inside a caller-owned transaction.
    pub async fn get_by_id_tx(
        conn: &mut SqliteConnection,
        sale_id: &str,
    ) -> DbResult<Option<Sale>> {
        let sql = format!("SELECT {SALE_COLUMNS} FROM sales WHERE id = ?1");
        let sale = sqlx::query_as::<_, Sale>(&sql)
            .bind(sale_id)
            .fetch_optional(conn)
            .await?;

        Ok(sale)
    }

    /// Reads a sale's items inside a caller-owned transaction.
    pub async fn get_items_tx(
        conn: &mut SqliteConnection,
        sale_id: &str,
    ) -> DbResult<Vec<SaleItem>> {
        let sql = format!(
            "SELECT {ITEM_COLUMNS} FROM sale_items WHERE sale_id = ?1 ORDER BY created_at, id"
        );
        let items = sqlx::query_as::<_, SaleItem>(&sql)
            .bind(sale_id)
            .fetch_all(conn)
            .await?;

        Ok(items)
    }

    /// CAS increment of an item's refunded quantity.
    ///
    /// The WHERE clause re-validates the over-refund boundary at write
    /// time, which is what serializes racing refunds on the same sale.
    ///
    /// ## Returns
    /// Rows affected: 0 means the guard rejected the increment.
    pub async fn increment_refunded_tx(
        conn: &mut SqliteConnection,
        item_id: &str,
        quantity: i64,
    ) -> DbResult<u64> {
        let result = sqlx::query(
            "UPDATE sale_items SET
                refunded_quantity = refunded_quantity + ?2
             WHERE id = ?1 AND refunded_quantity + ?2 <= quantity",
        )
        .bind(item_id)
        .bind(quantity)
        .execute(conn)
        .await?;

        Ok(result.rows_affected())
    }

    /// Inserts a refund adjustment row inside a caller-owned transaction.
    pub async fn insert_adjustment_tx(
        conn: &mut SqliteConnection,
        adjustment: &RefundAdjustment,
    ) -> DbResult<()> {
        debug!(
            sale_id = %adjustment.sale_id,
            amount = %adjustment.amount_cents,
            "Recording refund adjustment"
        );

        sqlx::query(
            "INSERT INTO refund_adjustments (
                id, sale_id, business_id, amount_cents, quantity, reason, actor, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        )
        .bind(&adjustment.id)
        .bind(&adjustment.sale_id)
        .bind(&adjustment.business_id)
        .bind(adjustment.amount_cents)
        .bind(adjustment.quantity)
        .bind(&adjustment.reason)
        .bind(&adjustment.actor)
        .bind(adjustment.created_at)
        .execute(conn)
        .await?;

        Ok(())
    }

    /// Marks a sale as fully refunded.
    ///
    /// Only called once every item's refunded_quantity equals its
    /// quantity; the status guard makes the flip idempotent.
    ///
    /// ## Returns
    /// Rows affected: 0 means the sale was already flagged (or missing).
    pub async fn mark_refunded_tx(conn: &mut SqliteConnection, sale_id: &str) -> DbResult<u64> {
        let result = sqlx::query("UPDATE sales SET is_refunded = 1 WHERE id = ?1 AND is_refunded = 0")
            .bind(sale_id)
            .execute(conn)
            .await?;

        Ok(result.rows_affected())
    }
}

/// Generates a new sale ID.
pub fn generate_sale_id() -> String {
    Uuid::new_v4().to_string()
}

/// Generates a new sale item ID.
pub fn generate_sale_item_id() -> String {
    Uuid::new_v4().to_string()
}

/// Generates a new refund adjustment ID.
pub fn generate_adjustment_id() -> String {
    Uuid::new_v4().to_string()
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use tally_core::{PaymentMethod, DEFAULT_TENANT_ID};

    fn sample_sale(business_id: &str, amount: i64, method: PaymentMethod) -> Sale {
        Sale {
            id: generate_sale_id(),
            tenant_id: DEFAULT_TENANT_ID.to_string(),
            business_id: business_id.to_string(),
            payment_method: method,
            sales_amount_cents: amount,
            discount_cents: 0,
            cost_cents: 0,
            profit_cents: amount,
            profit_percentage: 100.0,
            is_refunded: false,
            created_at: Utc::now(),
        }
    }

    fn sample_item(sale: &Sale, quantity: i64) -> SaleItem {
        SaleItem {
            id: generate_sale_item_id(),
            sale_id: sale.id.clone(),
            product_id: "p-1".to_string(),
            sku_snapshot: "SKU-1".to_string(),
            quantity,
            unit_price_cents: 1000,
            unit_cost_cents: 600,
            discount_cents: 0,
            refunded_quantity: 0,
            created_at: Utc::now(),
        }
    }

    async fn insert_sale(db: &Database, sale: &Sale, items: &[SaleItem]) {
        let mut tx = db.begin().await.unwrap();
        SaleRepository::insert_sale_tx(&mut tx, sale).await.unwrap();
        for item in items {
            SaleRepository::insert_item_tx(&mut tx, item).await.unwrap();
        }
        tx.commit().await.unwrap();
    }

    fn product_row(id: &str) -> tally_core::Product {
        let now = Utc::now();
        tally_core::Product {
            id: id.to_string(),
            tenant_id: DEFAULT_TENANT_ID.to_string(),
            business_id: "biz-1".to_string(),
            sku: "SKU-1".to_string(),
            name: "Widget".to_string(),
            price_cents: 1000,
            cost_cents: 600,
            current_stock: 100,
            track_inventory: true,
            allow_negative_stock: false,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn test_insert_and_read_back() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        db.products().insert(&product_row("p-1")).await.unwrap();

        let sale = sample_sale("biz-1", 5000, PaymentMethod::Cash);
        let item = sample_item(&sale, 5);
        insert_sale(&db, &sale, &[item]).await;

        let found = db.sales().get_by_id(&sale.id).await.unwrap().unwrap();
        assert_eq!(found.sales_amount_cents, 5000);
        assert_eq!(found.payment_method, PaymentMethod::Cash);
        assert!(!found.is_refunded);

        let items = db.sales().get_items(&sale.id).await.unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].quantity, 5);
        assert_eq!(items[0].refunded_quantity, 0);
    }

    #[tokio::test]
    async fn test_refund_cas_guard() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        db.products().insert(&product_row("p-1")).await.unwrap();

        let sale = sample_sale("biz-1", 5000, PaymentMethod::Cash);
        let item = sample_item(&sale, 5);
        insert_sale(&db, &sale, std::slice::from_ref(&item)).await;

        let mut tx = db.begin().await.unwrap();
        // 3 of 5: passes
        let rows = SaleRepository::increment_refunded_tx(&mut tx, &item.id, 3)
            .await
            .unwrap();
        assert_eq!(rows, 1);
        // 3 more would exceed quantity: guard rejects
        let rows = SaleRepository::increment_refunded_tx(&mut tx, &item.id, 3)
            .await
            .unwrap();
        assert_eq!(rows, 0);
        // exactly the remaining 2: passes
        let rows = SaleRepository::increment_refunded_tx(&mut tx, &item.id, 2)
            .await
            .unwrap();
        assert_eq!(rows, 1);
        tx.commit().await.unwrap();

        let items = db.sales().get_items(&sale.id).await.unwrap();
        assert_eq!(items[0].refunded_quantity, 5);
    }

    #[tokio::test]
    async fn test_mark_refunded_is_idempotent() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        db.products().insert(&product_row("p-1")).await.unwrap();

        let sale = sample_sale("biz-1", 1000, PaymentMethod::Card);
        insert_sale(&db, &sale, &[]).await;

        let mut tx = db.begin().await.unwrap();
        assert_eq!(
            SaleRepository::mark_refunded_tx(&mut tx, &sale.id)
                .await
                .unwrap(),
            1
        );
        assert_eq!(
            SaleRepository::mark_refunded_tx(&mut tx, &sale.id)
                .await
                .unwrap(),
            0
        );
        tx.commit().await.unwrap();
    }

    #[tokio::test]
    async fn test_cash_sales_between_filters_method_and_window() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        db.products().insert(&product_row("p-1")).await.unwrap();

        let start = Utc::now();

        let cash = sample_sale("biz-1", 1000, PaymentMethod::Cash);
        let card = sample_sale("biz-1", 2000, PaymentMethod::Card);
        let other_biz = sample_sale("biz-2", 4000, PaymentMethod::Cash);
        insert_sale(&db, &cash, &[]).await;
        insert_sale(&db, &card, &[]).await;
        insert_sale(&db, &other_biz, &[]).await;

        let total = db
            .sales()
            .cash_sales_between("biz-1", start, None)
            .await
            .unwrap();
        assert_eq!(total, 1000);

        // A window starting after the sales sees nothing
        let later = Utc::now();
        let total = db
            .sales()
            .cash_sales_between("biz-1", later, None)
            .await
            .unwrap();
        assert_eq!(total, 0);
    }
}
