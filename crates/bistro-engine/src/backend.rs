//! # Order Backend
//!
//! The authoritative store for orders, lines and tables, seen through the
//! narrow set of primitives the engine needs.
//!
//! ## Contract
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        OrderBackend Contract                            │
//! │                                                                         │
//! │  • Every call is a round-trip; the engine keeps no authoritative copy  │
//! │  • item_count on an order is maintained by the backend                 │
//! │  • create_order refuses a second empty open order per session          │
//! │  • claim_table is an atomic compare-and-set: available (or held by     │
//! │    the same order) → occupied(order), otherwise TableOccupied          │
//! │  • vacate_table only frees a table held by the given order             │
//! │  • Unauthorized means the session was revoked                          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use async_trait::async_trait;
use thiserror::Error;

use bistro_core::{Order, OrderLine, OrderStatus, TableInfo};

use crate::error::Conflict;

/// Result type alias for collaborator calls.
pub type BackendResult<T> = Result<T, BackendError>;

/// Failure reported by any collaborator (backend, catalog, payments, ...).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BackendError {
    /// The referenced entity does not exist.
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// The request lost a race against shared state.
    #[error("conflict: {0}")]
    Conflict(Conflict),

    /// The caller's credentials are no longer accepted.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// The collaborator is down or failed internally.
    #[error("unavailable: {0}")]
    Unavailable(String),
}

impl BackendError {
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        BackendError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }
}

/// Persistence primitives for orders, lines and tables.
#[async_trait]
pub trait OrderBackend: Send + Sync {
    // =========================================================================
    // Orders
    // =========================================================================

    /// Returns the next order sequence number for the terminal.
    async fn next_order_seq(&self, terminal_id: &str) -> BackendResult<u64>;

    /// Persists a new empty order.
    async fn create_order(&self, order: Order) -> BackendResult<Order>;

    async fn fetch_order(&self, order_id: &str) -> BackendResult<Order>;

    /// Open orders owned by a session.
    async fn list_active_orders(&self, session_id: &str) -> BackendResult<Vec<Order>>;

    /// Writes the order header (totals, promo, table, type, checkout fields).
    ///
    /// `status` and `item_count` are owned by the backend and ignored here.
    async fn save_order(&self, order: &Order) -> BackendResult<Order>;

    /// Marks an open order Completed, storing its header.
    async fn finalize_order(&self, order: &Order) -> BackendResult<Order>;

    /// Moves an open order to Closed or Cancelled.
    async fn close_order(&self, order_id: &str, status: OrderStatus) -> BackendResult<Order>;

    // =========================================================================
    // Lines
    // =========================================================================

    async fn list_lines(&self, order_id: &str) -> BackendResult<Vec<OrderLine>>;

    async fn fetch_line(&self, line_id: &str) -> BackendResult<OrderLine>;

    async fn insert_line(&self, line: OrderLine) -> BackendResult<OrderLine>;

    async fn update_line_qty(&self, line_id: &str, qty: i64) -> BackendResult<OrderLine>;

    async fn delete_line(&self, line_id: &str) -> BackendResult<()>;

    // =========================================================================
    // Tables
    // =========================================================================

    async fn list_tables(&self) -> BackendResult<Vec<TableInfo>>;

    async fn fetch_table(&self, table_id: &str) -> BackendResult<TableInfo>;

    /// Atomically binds a table to an order.
    async fn claim_table(&self, table_id: &str, order_id: &str) -> BackendResult<TableInfo>;

    /// Frees a table if `order_id` holds it; otherwise returns it unchanged.
    async fn vacate_table(&self, table_id: &str, order_id: &str) -> BackendResult<TableInfo>;
}
