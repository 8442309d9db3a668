//! # Sales Engine
//!
//! Turns a shopping cart into an immutable Sale record and the matching
//! stock-decrement movements, atomically.
//!
//! ## Checkout Transaction
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │  validate cart (no writes)                                          │
//! │       │                                                             │
//! │       ▼                                                             │
//! │  BEGIN                                                              │
//! │    per line:                                                        │
//! │      snapshot product (price, cost, sku)                            │
//! │      guarded decrement  ── 0 rows? ──► ROLLBACK, InsufficientStock  │
//! │      append sale movement                                           │
//! │    INSERT sale + items                                              │
//! │  COMMIT                                                             │
//! │                                                                     │
//! │  Two checkouts racing for the last unit: the guard re-checks        │
//! │  availability at write time, so exactly one commits. There is no    │
//! │  observable state where a Sale exists without its movements.        │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::error::{EngineError, EngineResult};
use tally_core::validation::{validate_non_negative_cents, validate_quantity};
use tally_core::{
    Money, MovementKind, PaymentMethod, Sale, SaleItem, StockMovement, DEFAULT_TENANT_ID,
    MAX_CART_LINES,
};
use tally_db::repository::movement::MovementRepository;
use tally_db::repository::product::ProductRepository;
use tally_db::repository::sale::SaleRepository;
use tally_db::Database;

// =============================================================================
// Requests & Outcomes
// =============================================================================

/// One line of a cart.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CartLine {
    pub product_id: String,
    pub quantity: i64,
    /// Discount on this line in cents; 0 for none.
    pub discount_cents: i64,
}

/// A checkout request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Cart {
    pub business_id: String,
    pub payment_method: PaymentMethod,
    /// Who rang the sale up.
    pub actor: String,
    pub lines: Vec<CartLine>,
}

/// The authoritative post-commit state of a checkout.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletedSale {
    pub sale: Sale,
    pub items: Vec<SaleItem>,
}

// =============================================================================
// Service
// =============================================================================

/// Checkout service over the shared store.
#[derive(Debug, Clone)]
pub struct SalesEngine {
    db: Database,
}

impl SalesEngine {
    /// Creates a new SalesEngine service.
    pub fn new(db: Database) -> Self {
        SalesEngine { db }
    }

    /// Checks a cart out into an immutable Sale.
    ///
    /// ## Totals
    /// ```text
    /// subtotal     = Σ price_at_sale × quantity
    /// discount     = Σ line discounts
    /// final_total  = max(0, subtotal − discount)
    /// cost         = Σ cost_at_sale × quantity
    /// profit       = final_total − cost
    /// profit_pct   = final_total > 0 ? profit / final_total × 100 : 0
    /// ```
    ///
    /// ## Errors
    /// - [`EngineError::EmptyCart`] - no lines
    /// - [`EngineError::Validation`] - bad quantity/discount, unknown or
    ///   foreign product
    /// - [`EngineError::InsufficientStock`] - an enforced product cannot
    ///   cover its line (including losing a last-unit race)
    pub async fn checkout(&self, cart: Cart) -> EngineResult<CompletedSale> {
        if cart.lines.is_empty() {
            return Err(EngineError::EmptyCart);
        }
        if cart.lines.len() > MAX_CART_LINES {
            return Err(tally_core::ValidationError::OutOfRange {
                field: "cart lines".to_string(),
                min: 1,
                max: MAX_CART_LINES as i64,
            }
            .into());
        }
        for line in &cart.lines {
            validate_quantity(line.quantity)?;
            validate_non_negative_cents("discount", line.discount_cents)?;
        }

        let sale_id = Uuid::new_v4().to_string();
        let now = Utc::now();

        let mut tx = self.db.begin().await?;

        let mut items = Vec::with_capacity(cart.lines.len());
        let mut subtotal = Money::zero();
        let mut discount_total = Money::zero();
        let mut cost_total = Money::zero();

        for line in &cart.lines {
            let product = ProductRepository::get_by_id_tx(&mut tx, &line.product_id)
                .await?
                .ok_or_else(|| EngineError::ProductNotFound(line.product_id.clone()))?;

            if product.business_id != cart.business_id {
                return Err(tally_core::ValidationError::InvalidFormat {
                    field: "product_id".to_string(),
                    reason: format!("product {} belongs to another business", product.id),
                }
                .into());
            }

            // Decrement-if-available: the guard re-checks stock at write
            // time, which serializes concurrent sales of the same product
            let rows = if product.enforces_stock() {
                ProductRepository::apply_stock_delta_guarded(&mut tx, &product.id, -line.quantity)
                    .await?
            } else {
                ProductRepository::apply_stock_delta(&mut tx, &product.id, -line.quantity).await?
            };

            if rows == 0 {
                return Err(EngineError::InsufficientStock {
                    sku: product.sku,
                    available: product.current_stock,
                    requested: line.quantity,
                });
            }

            MovementRepository::insert_tx(
                &mut tx,
                &StockMovement {
                    id: Uuid::new_v4().to_string(),
                    product_id: product.id.clone(),
                    business_id: product.business_id.clone(),
                    quantity_delta: -line.quantity,
                    kind: MovementKind::Sale,
                    reason: format!("sale {sale_id}"),
                    actor: cart.actor.clone(),
                    created_at: now,
                },
            )
            .await?;

            subtotal += product.price().multiply_quantity(line.quantity);
            discount_total += Money::from_cents(line.discount_cents);
            cost_total += product.cost().multiply_quantity(line.quantity);

            items.push(SaleItem {
                id: Uuid::new_v4().to_string(),
                sale_id: sale_id.clone(),
                product_id: product.id,
                sku_snapshot: product.sku,
                quantity: line.quantity,
                unit_price_cents: product.price_cents,
                unit_cost_cents: product.cost_cents,
                discount_cents: line.discount_cents,
                refunded_quantity: 0,
                created_at: now,
            });
        }

        let final_total = (subtotal - discount_total).max_zero();
        let profit = final_total - cost_total;
        let profit_percentage = if final_total.is_positive() {
            profit.cents() as f64 / final_total.cents() as f64 * 100.0
        } else {
            0.0
        };

        let sale = Sale {
            id: sale_id,
            tenant_id: DEFAULT_TENANT_ID.to_string(),
            business_id: cart.business_id,
            payment_method: cart.payment_method,
            sales_amount_cents: final_total.cents(),
            discount_cents: discount_total.cents(),
            cost_cents: cost_total.cents(),
            profit_cents: profit.cents(),
            profit_percentage,
            is_refunded: false,
            created_at: now,
        };

        SaleRepository::insert_sale_tx(&mut tx, &sale).await?;
        for item in &items {
            SaleRepository::insert_item_tx(&mut tx, item).await?;
        }

        tx.commit().await.map_err(tally_db::DbError::from)?;

        info!(
            sale_id = %sale.id,
            business_id = %sale.business_id,
            amount = %sale.sales_amount_cents,
            lines = items.len(),
            method = ?sale.payment_method,
            "Checkout committed"
        );

        Ok(CompletedSale { sale, items })
    }

    /// Fetches a committed sale with its items (reporting read).
    pub async fn get_sale(&self, sale_id: &str) -> EngineResult<CompletedSale> {
        let sale = self
            .db
            .sales()
            .get_by_id(sale_id)
            .await?
            .ok_or_else(|| EngineError::SaleNotFound(sale_id.to_string()))?;
        let items = self.db.sales().get_items(sale_id).await?;

        Ok(CompletedSale { sale, items })
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
