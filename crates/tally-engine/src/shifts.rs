//! # Cash Shift Manager
//!
//! Manages the lifecycle of a physical cash register session and its
//! expected-vs-counted reconciliation.
//!
//! ## Lifecycle & Balance
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │  open_shift(float)                                                  │
//! │       │                                                             │
//! │       ▼                                                             │
//! │  OPEN ── record_cash_movement(drop / payout / float_add)            │
//! │   │   ── cash sales accumulate via SalesEngine                      │
//! │   │                                                                 │
//! │   │   live_balance = float + cash_sales + Σ float_add               │
//! │   │                  − Σ drop − Σ payout                            │
//! │   ▼                                                                 │
//! │  close_shift(counted)                                               │
//! │       expected = live_balance     (re-derived from source tables,   │
//! │       variance = counted − expected        never a cached drawer)   │
//! │       │                                                             │
//! │       ▼                                                             │
//! │  CLOSED (terminal - fix mistakes by opening a new shift)            │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use crate::error::{EngineError, EngineResult};
use tally_core::validation::{validate_non_negative_cents, validate_positive_cents, validate_reason};
use tally_core::{CashMovement, CashMovementKind, CashShift, ShiftStatus};
use tally_db::Database;

// =============================================================================
// Service
// =============================================================================

/// Register session service over the shared store.
#[derive(Debug, Clone)]
pub struct CashShiftManager {
    db: Database,
}

impl CashShiftManager {
    /// Creates a new CashShiftManager service.
    pub fn new(db: Database) -> Self {
        CashShiftManager { db }
    }

    /// Opens a shift for a business.
    ///
    /// ## Errors
    /// [`EngineError::ShiftAlreadyOpen`] if the business already has an
    /// open shift. The pre-check gives a friendly error with the existing
    /// shift's id; the partial unique index catches the race the
    /// pre-check cannot see.
    pub async fn open_shift(
        &self,
        business_id: &str,
        user_id: &str,
        opening_float_cents: i64,
    ) -> EngineResult<CashShift> {
        validate_non_negative_cents("opening_float", opening_float_cents)?;

        if let Some(existing) = self.db.shifts().find_open(business_id).await? {
            return Err(EngineError::ShiftAlreadyOpen {
                business_id: business_id.to_string(),
                shift_id: existing.id,
            });
        }

        let shift = CashShift {
            id: Uuid::new_v4().to_string(),
            business_id: business_id.to_string(),
            user_id: user_id.to_string(),
            status: ShiftStatus::Open,
            opening_float_cents,
            counted_cents: None,
            expected_cents: None,
            variance_cents: None,
            opened_at: Utc::now(),
            closed_at: None,
        };

        match self.db.shifts().insert(&shift).await {
            Ok(()) => {}
            Err(e) if e.is_unique_violation() => {
                // Lost the open race to another register
                let winner = self
                    .db
                    .shifts()
                    .find_open(business_id)
                    .await?
                    .map(|s| s.id)
                    .unwrap_or_default();
                return Err(EngineError::ShiftAlreadyOpen {
                    business_id: business_id.to_string(),
                    shift_id: winner,
                });
            }
            Err(e) => return Err(e.into()),
        }

        info!(
            shift_id = %shift.id,
            business_id = %business_id,
            float = %opening_float_cents,
            "Shift opened"
        );

        Ok(shift)
    }

    /// Records a cash movement against an open shift.
    ///
    /// Only legal while the shift is OPEN; the guarded insert re-checks
    /// that at write time.
    pub async fn record_cash_movement(
        &self,
        shift_id: &str,
        kind: CashMovementKind,
        amount_cents: i64,
        reason: &str,
    ) -> EngineResult<CashMovement> {
        validate_positive_cents("amount", amount_cents)?;
        validate_reason(reason)?;

        let shift = self.get_shift(shift_id).await?;
        if !shift.is_open() {
            return Err(EngineError::ShiftAlreadyClosed(shift_id.to_string()));
        }

        let movement = CashMovement {
            id: Uuid::new_v4().to_string(),
            shift_id: shift.id.clone(),
            business_id: shift.business_id.clone(),
            kind,
            amount_cents,
            reason: reason.to_string(),
            created_at: Utc::now(),
        };

        let rows = self
            .db
            .shifts()
            .insert_cash_movement_if_open(&movement)
            .await?;
        if rows == 0 {
            // The shift closed between our read and the insert
            return Err(EngineError::ShiftAlreadyClosed(shift_id.to_string()));
        }

        info!(
            shift_id = %shift_id,
            kind = ?kind,
            amount = %amount_cents,
            "Cash movement recorded"
        );

        Ok(movement)
    }

    /// Computes the expected cash in the register right now.
    ///
    /// Pure and idempotent: no side effects, and the result only changes
    /// as new cash sales or cash movements are recorded.
    ///
    /// ```text
    /// opening_float + cash_sales_since_open + Σ float_add − Σ drop − Σ payout
    /// ```
    ///
    /// Cash sales are re-derived from the sales table on every call;
    /// there is no incremental drawer cache to drift.
    pub async fn live_balance(&self, shift_id: &str) -> EngineResult<i64> {
        let shift = self.get_shift(shift_id).await?;
        self.balance_of(&shift).await
    }

    /// Closes a shift, computing expected cash and variance exactly once.
    ///
    /// ## Errors
    /// [`EngineError::ShiftAlreadyClosed`] if the shift is closed -
    /// including when a racing close wins the compare-and-set first.
    pub async fn close_shift(&self, shift_id: &str, counted_cents: i64) -> EngineResult<CashShift> {
        validate_non_negative_cents("counted_cash", counted_cents)?;

        let shift = self.get_shift(shift_id).await?;
        if !shift.is_open() {
            return Err(EngineError::ShiftAlreadyClosed(shift_id.to_string()));
        }

        let expected_cents = self.balance_of(&shift).await?;
        let variance_cents = counted_cents - expected_cents;
        let closed_at = Utc::now();

        let rows = self
            .db
            .shifts()
            .close_cas(shift_id, counted_cents, expected_cents, variance_cents, closed_at)
            .await?;
        if rows == 0 {
            // A concurrent close won; its figures stand, ours are discarded
            return Err(EngineError::ShiftAlreadyClosed(shift_id.to_string()));
        }

        let closed = self.get_shift(shift_id).await?;

        info!(
            shift_id = %shift_id,
            expected = %expected_cents,
            counted = %counted_cents,
            variance = %variance_cents,
            "Shift closed"
        );

        Ok(closed)
    }

    /// Fetches a shift (reporting read).
    pub async fn get_shift(&self, shift_id: &str) -> EngineResult<CashShift> {
        self.db
            .shifts()
            .get_by_id(shift_id)
            .await?
            .ok_or_else(|| EngineError::ShiftNotFound(shift_id.to_string()))
    }

    /// Lists a shift's cash movements, oldest first (reporting read).
    pub async fn cash_movements(&self, shift_id: &str) -> EngineResult<Vec<CashMovement>> {
        Ok(self.db.shifts().list_cash_movements(shift_id).await?)
    }

    /// Lists shifts for a business, newest first (reporting read).
    pub async fn shifts(&self, business_id: &str, limit: u32) -> EngineResult<Vec<CashShift>> {
        Ok(self.db.shifts().list(business_id, limit).await?)
    }

    /// Balance formula over a loaded shift row.
    async fn balance_of(&self, shift: &CashShift) -> EngineResult<i64> {
        let cash_sales = self
            .db
            .sales()
            .cash_sales_between(&shift.business_id, shift.opened_at, shift.closed_at)
            .await?;
        let totals = self.db.shifts().cash_movement_totals(&shift.id).await?;

        Ok(shift.opening_float_cents + cash_sales + totals.net_cents())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
