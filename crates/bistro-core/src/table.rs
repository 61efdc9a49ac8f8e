//! # Table Occupancy
//!
//! The table state machine. The backend applies [`claim`] atomically; the
//! engine uses the same rules to pre-check and to explain conflicts.
//!
//! ```text
//!   available ──claim(o)──► occupied(o) ──vacate(o)──► available
//!                              │  ▲
//!                              └──┘ claim(o) again: idempotent
//!
//!   reserved  ──claim(*)──► TableConflict
//!   occupied(p) ─claim(o)─► TableConflict { held_by: p }
//! ```

use crate::types::{TableInfo, TableStatus};

/// A claim that would steal a table from another order, or take a reserved one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableConflict {
    pub table_id: String,
    pub status: TableStatus,
    /// Order currently holding the table, if any.
    pub held_by: Option<String>,
}

/// True when the table is bound to `order_id`.
pub fn is_held_by(table: &TableInfo, order_id: &str) -> bool {
    table.status == TableStatus::Occupied && table.current_order_id.as_deref() == Some(order_id)
}

/// True when `order_id` may take (or keep) the table.
pub fn can_be_claimed_by(table: &TableInfo, order_id: &str) -> bool {
    match table.status {
        TableStatus::Available => table.current_order_id.is_none(),
        TableStatus::Occupied => is_held_by(table, order_id),
        TableStatus::Reserved => false,
    }
}

/// Binds the table to `order_id`.
///
/// Claiming a table already held by the same order returns it unchanged.
pub fn claim(table: &TableInfo, order_id: &str) -> Result<TableInfo, TableConflict> {
    if !can_be_claimed_by(table, order_id) {
        return Err(TableConflict {
            table_id: table.id.clone(),
            status: table.status,
            held_by: table.current_order_id.clone(),
        });
    }

    Ok(TableInfo {
        status: TableStatus::Occupied,
        current_order_id: Some(order_id.to_string()),
        ..table.clone()
    })
}

/// Frees the table if `order_id` holds it.
///
/// Returns `None` when the table is held by someone else (or nobody), in
/// which case nothing changes.
pub fn vacate(table: &TableInfo, order_id: &str) -> Option<TableInfo> {
    if !is_held_by(table, order_id) {
        return None;
    }

    Some(TableInfo {
        status: TableStatus::Available,
        current_order_id: None,
        ..table.clone()
    })
}

// =============================================================================
// Unit Tests
// =============================================================================
