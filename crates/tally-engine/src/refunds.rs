//! # Refund Processor
//!
//! Reverses part or all of a Sale's line items, restores stock, and
//! tracks refunded quantities per line to prevent double refunds.
//!
//! ## Refund Transaction
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │  validate request (no writes)                                       │
//! │       │                                                             │
//! │       ▼                                                             │
//! │  BEGIN                                                              │
//! │    read sale + items                                                │
//! │    every line: requested ≤ remaining?  ── no ──► OverRefund         │
//! │    per line: CAS refunded_quantity    ── 0 rows ──► OverRefund      │
//! │    INSERT refund_adjustments row (audit; sale totals untouched)     │
//! │    per line: restock + return movement                              │
//! │    all lines fully refunded? → is_refunded = 1                      │
//! │  COMMIT                                                             │
//! │                                                                     │
//! │  Either every selected line refunds and restocks together, or       │
//! │  none do. Per-line refunded_quantity is the load-bearing guard:     │
//! │  two refunds racing on the same sale cannot both credit the same    │
//! │  units, because the second CAS affects zero rows and the whole      │
//! │  call rolls back.                                                   │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::error::{EngineError, EngineResult};
use tally_core::validation::{validate_quantity, validate_reason};
use tally_core::{
    Money, MovementKind, RefundAdjustment, Sale, SaleItem, StockMovement,
};
use tally_db::repository::movement::MovementRepository;
use tally_db::repository::product::ProductRepository;
use tally_db::repository::sale::SaleRepository;
use tally_db::Database;

// =============================================================================
// Requests & Outcomes
// =============================================================================

/// One requested refund line.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefundLine {
    pub product_id: String,
    pub quantity: i64,
}

/// A refund request against one sale.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefundRequest {
    pub sale_id: String,
    pub lines: Vec<RefundLine>,
    pub reason: String,
    pub actor: String,
}

/// The authoritative post-commit state of a refund.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefundOutcome {
    /// The sale as committed (is_refunded may have flipped).
    pub sale: Sale,
    /// All items with their updated refunded quantities.
    pub items: Vec<SaleItem>,
    /// The immutable audit record for this refund.
    pub adjustment: RefundAdjustment,
}

// =============================================================================
// Service
// =============================================================================

/// Refund service over the shared store.
#[derive(Debug, Clone)]
pub struct RefundProcessor {
    db: Database,
}

impl RefundProcessor {
    /// Creates a new RefundProcessor service.
    pub fn new(db: Database) -> Self {
        RefundProcessor { db }
    }

    /// Processes a refund of the requested lines.
    ///
    /// ## Refund Amount
    /// Prorated from *net paid*, not gross price:
    /// ```text
    /// effective_unit = (price_at_sale × quantity − discount) / quantity
    /// line_refund    = effective_unit × requested_quantity
    /// ```
    /// so a discounted line never refunds more than was actually paid.
    ///
    /// ## Errors
    /// - [`EngineError::SaleNotFound`] - unknown sale
    /// - [`EngineError::Validation`] - empty request, bad quantity, a
    ///   product the sale does not contain, duplicate lines
    /// - [`EngineError::OverRefund`] - any line exceeds its remaining
    ///   refundable quantity; the entire call fails with no effect
    pub async fn process_refund(&self, request: RefundRequest) -> EngineResult<RefundOutcome> {
        if request.lines.is_empty() {
            return Err(tally_core::ValidationError::Required {
                field: "lines".to_string(),
            }
            .into());
        }
        for line in &request.lines {
            validate_quantity(line.quantity)?;
        }
        validate_reason(&request.reason)?;

        let now = Utc::now();

        let mut tx = self.db.begin().await?;

        let sale = SaleRepository::get_by_id_tx(&mut tx, &request.sale_id)
            .await?
            .ok_or_else(|| EngineError::SaleNotFound(request.sale_id.clone()))?;
        let items = SaleRepository::get_items_tx(&mut tx, &sale.id).await?;

        // Resolve every requested line against the sale before any write
        let mut selected: Vec<(&SaleItem, i64)> = Vec::with_capacity(request.lines.len());
        for line in &request.lines {
            let item = items
                .iter()
                .find(|i| i.product_id == line.product_id)
                .ok_or_else(|| {
                    EngineError::Validation(tally_core::ValidationError::InvalidFormat {
                        field: "product_id".to_string(),
                        reason: format!("sale has no line for product {}", line.product_id),
                    })
                })?;

            if selected.iter().any(|(chosen, _)| chosen.id == item.id) {
                return Err(tally_core::ValidationError::Duplicate {
                    field: "product_id".to_string(),
                    value: line.product_id.clone(),
                }
                .into());
            }

            let remaining = item.remaining_refundable();
            if line.quantity > remaining {
                return Err(EngineError::OverRefund {
                    product_id: line.product_id.clone(),
                    requested: line.quantity,
                    remaining,
                });
            }

            selected.push((item, line.quantity));
        }

        // Apply the per-line CAS increments; a zero-row result means a
        // concurrent refund consumed the remaining quantity after our read
        let mut refund_amount = Money::zero();
        let mut refund_units: i64 = 0;
        for (item, quantity) in &selected {
            let rows = SaleRepository::increment_refunded_tx(&mut tx, &item.id, *quantity).await?;
            if rows == 0 {
                return Err(EngineError::OverRefund {
                    product_id: item.product_id.clone(),
                    requested: *quantity,
                    remaining: item.remaining_refundable(),
                });
            }

            refund_amount += item.refund_value(*quantity);
            refund_units += *quantity;
        }

        // One immutable audit record per refund; the sale's own money
        // fields stay exactly as sold
        let adjustment = RefundAdjustment {
            id: Uuid::new_v4().to_string(),
            sale_id: sale.id.clone(),
            business_id: sale.business_id.clone(),
            amount_cents: refund_amount.cents(),
            quantity: refund_units,
            reason: request.reason,
            actor: request.actor.clone(),
            created_at: now,
        };
        SaleRepository::insert_adjustment_tx(&mut tx, &adjustment).await?;

        // Restock every refunded line through the ledger
        for (item, quantity) in &selected {
            MovementRepository::insert_tx(
                &mut tx,
                &StockMovement {
                    id: Uuid::new_v4().to_string(),
                    product_id: item.product_id.clone(),
                    business_id: sale.business_id.clone(),
                    quantity_delta: *quantity,
                    kind: MovementKind::Return,
                    reason: format!("refund {}", adjustment.id),
                    actor: request.actor.clone(),
                    created_at: now,
                },
            )
            .await?;

            let rows =
                ProductRepository::apply_stock_delta(&mut tx, &item.product_id, *quantity).await?;
            if rows == 0 {
                return Err(EngineError::ConcurrencyConflict {
                    entity: "Product",
                    id: item.product_id.clone(),
                });
            }
        }

        // Flip is_refunded once every line reaches full refund
        let items = SaleRepository::get_items_tx(&mut tx, &sale.id).await?;
        let fully_refunded = items.iter().all(|i| i.remaining_refundable() == 0);
        if fully_refunded && !sale.is_refunded {
            SaleRepository::mark_refunded_tx(&mut tx, &sale.id).await?;
        }

        let sale = SaleRepository::get_by_id_tx(&mut tx, &sale.id)
            .await?
            .ok_or(EngineError::ConcurrencyConflict {
                entity: "Sale",
                id: request.sale_id.clone(),
            })?;

        tx.commit().await.map_err(tally_db::DbError::from)?;

        info!(
            sale_id = %sale.id,
            adjustment_id = %adjustment.id,
            amount = %adjustment.amount_cents,
            units = %adjustment.quantity,
            fully_refunded = %sale.is_refunded,
            "Refund committed"
        );

        Ok(RefundOutcome {
            sale,
            items,
            adjustment,
        })
    }

    /// All refund adjustments recorded against a sale (reporting read).
    pub async fn adjustments(&self, sale_id: &str) -> EngineResult<Vec<RefundAdjustment>> {
        Ok(self.db.sales().get_adjustments(sale_id).await?)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sales::{Cart, CartLine, SalesEngine};
    use crate::testing::{seed_product, test_db};
    use tally_core::PaymentMethod;

    async fn sell(
        db: &Database,
        product_id: &str,
        quantity: i64,
        discount_cents: i64,
    ) -> crate::sales::CompletedSale {
        SalesEngine::new(db.clone())
            .checkout(Cart {
                business_id: "biz-1".to_string(),
                payment_method: PaymentMethod::Cash,
                actor: "cashier-1".to_string(),
                lines: vec![CartLine {
                    product_id: product_id.to_string(),
                    quantity,
                    discount_cents,
                }],
            })
            .await
            .unwrap()
    }

    fn refund_of(sale_id: &str, product_id: &str, quantity: i64) -> RefundRequest {
        RefundRequest {
            sale_id: sale_id.to_string(),
            lines: vec![RefundLine {
                product_id: product_id.to_string(),
                quantity,
            }],
            reason: "customer return".to_string(),
            actor: "manager-1".to_string(),
        }
    }

    /// Partial refund: sell 5, refund 2 → stock 47, refunded_quantity 2,
    /// sale not yet flagged refunded (3 units remain sold).
    #[tokio::test]
    async fn test_partial_refund() {
        let db = test_db().await;
        let product = seed_product(&db, "SKU-1", 50).await;
        let completed = sell(&db, &product.id, 5, 0).await;

        let processor = RefundProcessor::new(db.clone());
        let outcome = processor
            .process_refund(refund_of(&completed.sale.id, &product.id, 2))
            .await
            .unwrap();

        assert_eq!(outcome.items[0].refunded_quantity, 2);
        assert!(!outcome.sale.is_refunded);
        // 2 units at full price (no discount)
        assert_eq!(outcome.adjustment.amount_cents, 2 * product.price_cents);
        assert_eq!(outcome.adjustment.quantity, 2);

        let after = db.products().get_by_id(&product.id).await.unwrap().unwrap();
        assert_eq!(after.current_stock, 47);
    }

    /// Round-trip: checkout q then full refund of q restores stock and
    /// flags the sale refunded.
    #[tokio::test]
    async fn test_full_refund_round_trip() {
        let db = test_db().await;
        let product = seed_product(&db, "SKU-1", 50).await;
        let completed = sell(&db, &product.id, 5, 0).await;

        let processor = RefundProcessor::new(db.clone());
        let outcome = processor
            .process_refund(refund_of(&completed.sale.id, &product.id, 5))
            .await
            .unwrap();

        assert!(outcome.sale.is_refunded);
        assert_eq!(outcome.items[0].remaining_refundable(), 0);

        let after = db.products().get_by_id(&product.id).await.unwrap().unwrap();
        assert_eq!(after.current_stock, 50);

        // The ledger shows both sides: the sale and the return
        let history = db.movements().history(&product.id, 10).await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].kind, MovementKind::Return);
        assert_eq!(history[0].quantity_delta, 5);
    }

    /// Two-step full refund: the second refund flips is_refunded.
    #[tokio::test]
    async fn test_refund_in_two_steps() {
        let db = test_db().await;
        let product = seed_product(&db, "SKU-1", 50).await;
        let completed = sell(&db, &product.id, 5, 0).await;

        let processor = RefundProcessor::new(db.clone());
        let first = processor
            .process_refund(refund_of(&completed.sale.id, &product.id, 3))
            .await
            .unwrap();
        assert!(!first.sale.is_refunded);

        let second = processor
            .process_refund(refund_of(&completed.sale.id, &product.id, 2))
            .await
            .unwrap();
        assert!(second.sale.is_refunded);

        // Two separate audit records, amounts summing to the sale total
        let adjustments = processor.adjustments(&completed.sale.id).await.unwrap();
        assert_eq!(adjustments.len(), 2);
        let refunded: i64 = adjustments.iter().map(|a| a.amount_cents).sum();
        assert_eq!(refunded, completed.sale.sales_amount_cents);
    }

    /// Boundary: requesting more than remaining fails with OverRefund and
    /// leaves stock and refunded_quantity unchanged.
    #[tokio::test]
    async fn test_over_refund_boundary() {
        let db = test_db().await;
        let product = seed_product(&db, "SKU-1", 50).await;
        let completed = sell(&db, &product.id, 5, 0).await;

        let processor = RefundProcessor::new(db.clone());
        processor
            .process_refund(refund_of(&completed.sale.id, &product.id, 5))
            .await
            .unwrap();

        // Fully refunded; one more unit must fail
        let err = processor
            .process_refund(refund_of(&completed.sale.id, &product.id, 1))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            EngineError::OverRefund {
                requested: 1,
                remaining: 0,
                ..
            }
        ));

        // No state change from the failed call
        let after = db.products().get_by_id(&product.id).await.unwrap().unwrap();
        assert_eq!(after.current_stock, 50);
        let items = db.sales().get_items(&completed.sale.id).await.unwrap();
        assert_eq!(items[0].refunded_quantity, 5);
        assert_eq!(
            processor.adjustments(&completed.sale.id).await.unwrap().len(),
            1
        );
    }

    /// Discounted line: refund is prorated from net paid, not gross.
    #[tokio::test]
    async fn test_refund_prorates_discount() {
        let db = test_db().await;
        let product = seed_product(&db, "SKU-1", 50).await;
        // 5 units, $10.00 off the line
        let completed = sell(&db, &product.id, 5, 1000).await;

        let net_paid = 5 * product.price_cents - 1000;
        assert_eq!(completed.sale.sales_amount_cents, net_paid);

        let processor = RefundProcessor::new(db.clone());
        let outcome = processor
            .process_refund(refund_of(&completed.sale.id, &product.id, 2))
            .await
            .unwrap();

        // 2/5 of net paid, rounded half-up
        let expected = (net_paid as i128 * 2 + 2) / 5;
        assert_eq!(outcome.adjustment.amount_cents, expected as i64);
        assert!(outcome.adjustment.amount_cents < 2 * product.price_cents);
    }

    #[tokio::test]
    async fn test_unknown_sale_and_foreign_product() {
        let db = test_db().await;
        let product = seed_product(&db, "SKU-1", 50).await;
        let other = seed_product(&db, "SKU-2", 50).await;
        let completed = sell(&db, &product.id, 1, 0).await;

        let processor = RefundProcessor::new(db.clone());

        let err = processor
            .process_refund(refund_of("no-such-sale", &product.id, 1))
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::SaleNotFound(_)));

        // A product the sale does not contain
        let err = processor
            .process_refund(refund_of(&completed.sale.id, &other.id, 1))
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Validation(_)));
    }
}
