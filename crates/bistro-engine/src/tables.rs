//! # Table Assignment Manager
//!
//! Binds physical tables to dine-in orders and releases them.
//!
//! ## Operations
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  assign_table(order, table, covers)                                    │
//! │    DineIn only, covers 1..=50                                          │
//! │    claim new table (atomic) ──► save order ──► vacate previous table   │
//! │    save fails → the fresh claim is vacated again                       │
//! │    table held elsewhere / reserved → Conflict(TableOccupied)           │
//! │                                                                         │
//! │  clear_table(order)                                                    │
//! │    only while the order has no items; no-op without a table            │
//! │                                                                         │
//! │  release_table(order)                                                  │
//! │    settlement: open + empty  → Closed, table freed                     │
//! │                open + items  → Conflict(CheckoutRequired)              │
//! │                settled       → table freed                             │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The backend's atomic claim is the only exclusivity point. The local
//! pre-check just avoids a round-trip for an obvious conflict.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, warn};

use bistro_core::table::can_be_claimed_by;
use bistro_core::validation::{validate_covers, validate_id};
use bistro_core::{Order, OrderStatus, TableInfo, ValidationError};

use crate::error::{Conflict, EngineResult};
use crate::gateway::Gateway;
use crate::services::Service;

pub struct TableAssignmentManager {
    gateway: Arc<Gateway>,
}

impl TableAssignmentManager {
    pub fn new(gateway: Arc<Gateway>) -> Self {
        TableAssignmentManager { gateway }
    }

    pub async fn list_tables(&self) -> EngineResult<Vec<TableInfo>> {
        debug!("list_tables");
        self.gateway
            .call(
                Service::Orders,
                "list_tables",
                self.gateway.services().orders.list_tables(),
            )
            .await
    }

    /// Binds a table to a dine-in order.
    ///
    /// Re-assigning the table the order already holds only updates covers.
    pub async fn assign_table(&self, order_id: &str, table_id: &str, covers: u32) -> EngineResult<Order> {
        debug!(order_id, table_id, covers, "assign_table");
        validate_id("table_id", table_id)?;
        validate_covers(covers)?;

        let mut order = self.gateway.open_order(order_id).await?;
        if !order.order_type.requires_table() {
            return Err(ValidationError::not_allowed("table", "only dine-in orders can hold a table").into());
        }

        let orders = &self.gateway.services().orders;
        let table = self
            .gateway
            .call(Service::Orders, "fetch_table", orders.fetch_table(table_id))
            .await?;

        if !can_be_claimed_by(&table, order_id) {
            info!(order_id, table_id, status = ?table.status, "Table not available");
            return Err(Conflict::TableOccupied {
                table_id: table.id.clone(),
                held_by: table.current_order_id.clone(),
            }
            .into());
        }

        let already_held = order.table_id.as_deref() == Some(table_id);
        self.gateway
            .call(Service::Orders, "claim_table", orders.claim_table(table_id, order_id))
            .await?;

        let previous = order.table_id.replace(table_id.to_string());
        order.covers = Some(covers);
        order.updated_at = Utc::now();
        let saved = match self.gateway.save_order(&order).await {
            Ok(saved) => saved,
            Err(err) => {
                if !already_held {
                    self.undo_claim(table_id, order_id).await;
                }
                return Err(err);
            }
        };

        if let Some(previous) = previous.filter(|p| p != table_id) {
            self.gateway
                .call(Service::Orders, "vacate_table", orders.vacate_table(&previous, order_id))
                .await?;
            info!(order_id, from = %previous, to = table_id, "Order moved to another table");
        }

        info!(order_id, table_id, covers, "Table assigned");
        Ok(saved)
    }

    /// Gives back a table claimed for an order whose header never recorded it.
    async fn undo_claim(&self, table_id: &str, order_id: &str) {
        let vacated = self
            .gateway
            .call(
                Service::Orders,
                "vacate_table",
                self.gateway.services().orders.vacate_table(table_id, order_id),
            )
            .await;

        match vacated {
            Ok(_) => info!(order_id, table_id, "Table claim rolled back"),
            Err(err) => warn!(order_id, table_id, error = %err, "Failed to roll back table claim"),
        }
    }

    /// Detaches the table from an order that has no items yet.
    pub async fn clear_table(&self, order_id: &str) -> EngineResult<Order> {
        debug!(order_id, "clear_table");
        let mut order = self.gateway.open_order(order_id).await?;

        if order.table_id.is_none() {
            return Ok(order);
        }

        let lines = self.gateway.lines(order_id).await?;
        if lines.iter().any(|l| l.qty > 0) {
            return Err(Conflict::TableInUse {
                order_id: order_id.to_string(),
            }
            .into());
        }

        self.gateway.detach_table(&mut order).await?;
        order.updated_at = Utc::now();
        self.gateway.save_order(&order).await
    }

    /// Frees the order's table as part of settling the order.
    pub async fn release_table(&self, order_id: &str) -> EngineResult<Order> {
        debug!(order_id, "release_table");
        validate_id("order_id", order_id)?;

        let mut order = self.gateway.fetch_order(order_id).await?;

        if order.status.is_open() {
            let lines = self.gateway.lines(order_id).await?;
            if lines.iter().any(|l| l.qty > 0) {
                return Err(Conflict::CheckoutRequired {
                    order_id: order_id.to_string(),
                }
                .into());
            }
        }

        if order.table_id.is_some() {
            self.gateway.detach_table(&mut order).await?;
            order.updated_at = Utc::now();
            order = self.gateway.save_order(&order).await?;
        }

        if order.status.is_open() {
            order = self
                .gateway
                .call(
                    Service::Orders,
                    "close_order",
                    self.gateway
                        .services()
                        .orders
                        .close_order(order_id, OrderStatus::Closed),
                )
                .await?;
            info!(order_id, "Empty order closed on table release");
        }

        Ok(order)
    }
}
