//! # Order Line Editor
//!
//! Adds, adjusts and removes lines on an open order.
//!
//! ## Add Line Flow
//! ```text
//! add_line(order, item, qty, addons)
//!      │
//!      ├── qty ∉ 1..=999                  → Validation
//!      ├── order not open                 → Conflict
//!      ├── item unknown / inactive        → NotFound / Validation
//!      ├── item has add-on groups         → validate + resolve selection
//!      │     └── violated                 → Validation (group, limits)
//!      │
//!      ├── no add-ons and an add-on-free line for the item exists
//!      │     └── bump that line's qty
//!      ├── otherwise insert a new line (≤ 100 lines per order)
//!      │
//!      └── reprice → authoritative {order, lines}
//! ```
//!
//! Add-ons are frozen on the line. Changing them means removing the line and
//! adding it again.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info};

use bistro_core::addons::resolve_selection;
use bistro_core::validation::{ensure_line_capacity, validate_add_quantity, validate_id, validate_line_quantity};
use bistro_core::{OrderLine, OrderSnapshot, SelectedAddon, ValidationError, MAX_LINE_QUANTITY};

use crate::error::EngineResult;
use crate::gateway::Gateway;
use crate::services::Service;

pub struct OrderLineEditor {
    gateway: Arc<Gateway>,
}

impl OrderLineEditor {
    pub fn new(gateway: Arc<Gateway>) -> Self {
        OrderLineEditor { gateway }
    }

    /// Adds an item to an order.
    pub async fn add_line(
        &self,
        order_id: &str,
        item_id: &str,
        qty: i64,
        selection: &[SelectedAddon],
    ) -> EngineResult<OrderSnapshot> {
        debug!(order_id, item_id, qty, addons = selection.len(), "add_line");
        validate_id("item_id", item_id)?;
        validate_add_quantity(qty)?;

        let order = self.gateway.open_order(order_id).await?;
        let item = self
            .gateway
            .call(
                Service::Catalog,
                "fetch_item",
                self.gateway.services().catalog.fetch_item(item_id),
            )
            .await?;

        if !item.is_active {
            return Err(ValidationError::not_allowed("item", format!("{} is not available", item.name)).into());
        }

        let addons = if item.addon_groups.is_empty() {
            if let Some(stray) = selection.iter().find(|s| s.qty > 0) {
                return Err(ValidationError::UnknownAddon {
                    addon_id: stray.addon_id.clone(),
                    group_id: stray.group_id.clone(),
                }
                .into());
            }
            Vec::new()
        } else {
            resolve_selection(&item.addon_groups, selection)?
        };

        let orders = &self.gateway.services().orders;
        let lines = self.gateway.lines(&order.id).await?;

        let mergeable = addons.is_empty().then(|| {
            lines
                .iter()
                .find(|l| l.item_id == item.id && !l.has_addons() && l.qty > 0)
        });

        match mergeable.flatten() {
            Some(existing) => {
                let new_qty = existing.qty + qty;
                if new_qty > MAX_LINE_QUANTITY {
                    return Err(ValidationError::OutOfRange {
                        field: "quantity".to_string(),
                        min: 1,
                        max: MAX_LINE_QUANTITY,
                    }
                    .into());
                }
                self.gateway
                    .call(Service::Orders, "update_line_qty", orders.update_line_qty(&existing.id, new_qty))
                    .await?;
                info!(order_id, line_id = %existing.id, qty = new_qty, "Line quantity increased");
            }
            None => {
                ensure_line_capacity(lines.len())?;
                let line = OrderLine::new(&order.id, &item, addons, qty, Utc::now());
                let line = self
                    .gateway
                    .call(Service::Orders, "insert_line", orders.insert_line(line))
                    .await?;
                info!(order_id, line_id = %line.id, item_id, qty, "Line added");
            }
        }

        self.gateway.reprice(&order.id).await
    }

    /// Sets a line's quantity. Zero removes the line.
    ///
    /// Setting the quantity a line already has changes nothing.
    pub async fn set_line_qty(&self, line_id: &str, qty: i64) -> EngineResult<OrderSnapshot> {
        debug!(line_id, qty, "set_line_qty");
        validate_id("line_id", line_id)?;
        validate_line_quantity(qty)?;

        if qty == 0 {
            return self.remove_line(line_id).await;
        }

        let line = self.fetch_line(line_id).await?;
        let order = self.gateway.open_order(&line.order_id).await?;

        if line.qty != qty {
            self.gateway
                .call(
                    Service::Orders,
                    "update_line_qty",
                    self.gateway.services().orders.update_line_qty(line_id, qty),
                )
                .await?;
            info!(order_id = %order.id, line_id, from = line.qty, to = qty, "Line quantity set");
        }

        self.gateway.reprice(&order.id).await
    }

    /// Removes a line from its order.
    pub async fn remove_line(&self, line_id: &str) -> EngineResult<OrderSnapshot> {
        debug!(line_id, "remove_line");
        validate_id("line_id", line_id)?;

        let line = self.fetch_line(line_id).await?;
        let order = self.gateway.open_order(&line.order_id).await?;

        self.gateway
            .call(
                Service::Orders,
                "delete_line",
                self.gateway.services().orders.delete_line(line_id),
            )
            .await?;
        info!(order_id = %order.id, line_id, item_id = %line.item_id, "Line removed");

        self.gateway.reprice(&order.id).await
    }

    async fn fetch_line(&self, line_id: &str) -> EngineResult<OrderLine> {
        self.gateway
            .call(
                Service::Orders,
                "fetch_line",
                self.gateway.services().orders.fetch_line(line_id),
            )
            .await
    }
}
