//! # Cash Shift Repository
//!
//! Database operations for register sessions and their cash movements.
//!
//! ## Lifecycle Guards
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │  OPEN                                                               │
//! │    INSERT cash_shifts (status = 'open')                             │
//! │    └── partial unique index (business_id WHERE status='open')       │
//! │        turns a racing second open into a UniqueViolation            │
//! │                                                                     │
//! │  RECORD MOVEMENT                                                    │
//! │    INSERT ... SELECT ... WHERE shift is still open                  │
//! │    └── rows_affected 0 ⇒ the shift closed under the caller          │
//! │                                                                     │
//! │  CLOSE                                                              │
//! │    UPDATE ... WHERE id = ? AND status = 'open'                      │
//! │    └── compare-and-set: two closes cannot both win, so expected /   │
//! │        variance are computed and persisted exactly once             │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::debug;
use uuid::Uuid;

use crate::error::DbResult;
use tally_core::{CashMovement, CashMovementKind, CashShift};

/// Column list shared by every shift SELECT.
const SHIFT_COLUMNS: &str = "id, business_id, user_id, status, opening_float_cents, \
     counted_cents, expected_cents, variance_cents, opened_at, closed_at";

/// Column list shared by every cash movement SELECT.
const CASH_MOVEMENT_COLUMNS: &str =
    "id, shift_id, business_id, kind, amount_cents, reason, created_at";

/// Summed cash movements of one shift, by kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CashMovementTotals {
    pub drops_cents: i64,
    pub payouts_cents: i64,
    pub float_adds_cents: i64,
}

impl CashMovementTotals {
    /// Net effect on the register balance: float adds minus drops/payouts.
    pub fn net_cents(&self) -> i64 {
        self.float_adds_cents - self.drops_cents - self.payouts_cents
    }
}

/// Repository for cash shift database operations.
#[derive(Debug, Clone)]
pub struct ShiftRepository {
    pool: SqlitePool,
}

impl ShiftRepository {
    /// Creates a new ShiftRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ShiftRepository { pool }
    }

    /// Inserts a new shift row.
    ///
    /// ## Returns
    /// * `Err(DbError::UniqueViolation)` - the business already has an
    ///   open shift (raced past the caller's pre-check)
    pub async fn insert(&self, shift: &CashShift) -> DbResult<()> {
        debug!(id = %shift.id, business_id = %shift.business_id, "Opening shift");

        sqlx::query(
            "INSERT INTO cash_shifts (
                id, business_id, user_id, status, opening_float_cents,
                counted_cents, expected_cents, variance_cents, opened_at, closed_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        )
        .bind(&shift.id)
        .bind(&shift.business_id)
        .bind(&shift.user_id)
        .bind(shift.status)
        .bind(shift.opening_float_cents)
        .bind(shift.counted_cents)
        .bind(shift.expected_cents)
        .bind(shift.variance_cents)
        .bind(shift.opened_at)
        .bind(shift.closed_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Gets a shift by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<CashShift>> {
        let sql = format!("SELECT {SHIFT_COLUMNS} FROM cash_shifts WHERE id = ?1");
        let shift = sqlx::query_as::<_, CashShift>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(shift)
    }

    /// Finds the open shift for a business, if any.
    pub async fn find_open(&self, business_id: &str) -> DbResult<Option<CashShift>> {
        let sql = format!(
            "SELECT {SHIFT_COLUMNS} FROM cash_shifts \
             WHERE business_id = ?1 AND status = 'open'"
        );
        let shift = sqlx::query_as::<_, CashShift>(&sql)
            .bind(business_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(shift)
    }

    /// Lists shifts for a business, newest first (reporting).
    pub async fn list(&self, business_id: &str, limit: u32) -> DbResult<Vec<CashShift>> {
        let sql = format!(
            "SELECT {SHIFT_COLUMNS} FROM cash_shifts \
             WHERE business_id = ?1 \
             ORDER BY opened_at DESC, id DESC \
             LIMIT ?2"
        );
        let shifts = sqlx::query_as::<_, CashShift>(&sql)
            .bind(business_id)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;

        Ok(shifts)
    }

    /// Appends a cash movement, guarded on the shift still being open.
    ///
    /// INSERT..SELECT keeps the open-check and the append in one
    /// statement, so a close landing in between cannot orphan a movement
    /// into a closed shift.
    ///
    /// ## Returns
    /// Rows affected: 0 means the shift is not open (closed or missing).
    pub async fn insert_cash_movement_if_open(
        &self,
        movement: &CashMovement,
    ) -> DbResult<u64> {
        debug!(
            shift_id = %movement.shift_id,
            kind = ?movement.kind,
            amount = %movement.amount_cents,
            "Recording cash movement"
        );

        let result = sqlx::query(
            "INSERT INTO cash_movements (
                id, shift_id, business_id, kind, amount_cents, reason, created_at
            )
             SELECT ?1, ?2, ?3, ?4, ?5, ?6, ?7
             WHERE EXISTS (
                 SELECT 1 FROM cash_shifts WHERE id = ?2 AND status = 'open'
             )",
        )
        .bind(&movement.id)
        .bind(&movement.shift_id)
        .bind(&movement.business_id)
        .bind(movement.kind)
        .bind(movement.amount_cents)
        .bind(&movement.reason)
        .bind(movement.created_at)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    /// Lists a shift's cash movements, oldest first.
    pub async fn list_cash_movements(&self, shift_id: &str) -> DbResult<Vec<CashMovement>> {
        let sql = format!(
            "SELECT {CASH_MOVEMENT_COLUMNS} FROM cash_movements \
             WHERE shift_id = ?1 ORDER BY created_at, id"
        );
        let movements = sqlx::query_as::<_, CashMovement>(&sql)
            .bind(shift_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(movements)
    }

    /// Sums a shift's cash movements by kind.
    pub async fn cash_movement_totals(&self, shift_id: &str) -> DbResult<CashMovementTotals> {
        let rows: Vec<(CashMovementKind, i64)> = sqlx::query_as(
            "SELECT kind, COALESCE(SUM(amount_cents), 0) \
             FROM cash_movements WHERE shift_id = ?1 GROUP BY kind",
        )
        .bind(shift_id)
        .fetch_all(&self.pool)
        .await?;

        let mut totals = CashMovementTotals::default();
        for (kind, sum) in rows {
            match kind {
                CashMovementKind::Drop => totals.drops_cents = sum,
                CashMovementKind::Payout => totals.payouts_cents = sum,
                CashMovementKind::FloatAdd => totals.float_adds_cents = sum,
            }
        }

        Ok(totals)
    }

    /// Compare-and-set close.
    ///
    /// The `status = 'open'` guard means exactly one close call wins;
    /// the loser affects zero rows and never persists its own
    /// expected/variance figures.
    ///
    /// ## Returns
    /// Rows affected: 0 means the shift was not open.
    pub async fn close_cas(
        &self,
        shift_id: &str,
        counted_cents: i64,
        expected_cents: i64,
        variance_cents: i64,
        closed_at: DateTime<Utc>,
    ) -> DbResult<u64> {
        let result = sqlx::query(
            "UPDATE cash_shifts SET
                status = 'closed',
                counted_cents = ?2,
                expected_cents = ?3,
                variance_cents = ?4,
                closed_at = ?5
             WHERE id = ?1 AND status = 'open'",
        )
        .bind(shift_id)
        .bind(counted_cents)
        .bind(expected_cents)
        .bind(variance_cents)
        .bind(closed_at)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }
}

/// Generates a new shift ID.
pub fn generate_shift_id() -> String {
    Uuid::new_v4().to_string()
}

/// Generates a new cash movement ID.
pub fn generate_cash_movement_id() -> String {
    Uuid::new_v4().to_string()
}

// =============================================================================
// Unit Tests
// =============================================================================
