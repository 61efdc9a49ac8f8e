//! # Order Registry
//!
//! Owns the session's open orders ("tabs") and the current order view.
//!
//! ## Tab Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  start_order ──► Open (empty) ──add_line──► Open (items) ──┐            │
//! │       │               │                          │         │            │
//! │       │               │ close / cancel           │ close / │ checkout   │
//! │       │               ▼                          ▼ cancel  ▼            │
//! │       │         Closed / Cancelled        Closed / Cancelled  Completed │
//! │       │                                                                 │
//! │       └── an empty open order already exists → EmptyOrderExists        │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Synchronization
//! The registry never edits its view by hand. Every mutation elsewhere in
//! the engine hands the freshly fetched snapshot to [`OrderRegistry::sync`],
//! which is the only writer of the current view and the active list.

use std::sync::{Arc, Mutex, PoisonError};

use chrono::Utc;
use tracing::{debug, info, warn};

use bistro_core::validation::validate_id;
use bistro_core::{generate_order_number, Order, OrderSnapshot, OrderStatus, OrderType};

use crate::error::{Conflict, EngineError, EngineResult};
use crate::gateway::Gateway;
use crate::services::Service;
use crate::session::SessionContext;

#[derive(Debug, Default)]
struct RegistryState {
    current: Option<OrderSnapshot>,
    active: Vec<Order>,
}

pub struct OrderRegistry {
    gateway: Arc<Gateway>,
    session: SessionContext,
    order_prefix: String,
    state: Mutex<RegistryState>,
}

impl OrderRegistry {
    pub fn new(gateway: Arc<Gateway>, session: SessionContext, order_prefix: impl Into<String>) -> Self {
        OrderRegistry {
            gateway,
            session,
            order_prefix: order_prefix.into(),
            state: Mutex::new(RegistryState::default()),
        }
    }

    pub fn session(&self) -> &SessionContext {
        &self.session
    }

    fn with_state<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&mut RegistryState) -> R,
    {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut state)
    }

    // =========================================================================
    // Operations
    // =========================================================================

    /// Opens a new empty order for this session and makes it current.
    pub async fn start_order(&self, order_type: OrderType) -> EngineResult<Order> {
        debug!(session_id = %self.session.session_id, %order_type, "start_order");

        let active = self.fetch_active().await?;
        if let Some(empty) = active.iter().find(|o| o.is_empty_open()) {
            info!(order_id = %empty.id, "Empty open order already exists");
            return Err(Conflict::EmptyOrderExists {
                order_id: empty.id.clone(),
            }
            .into());
        }

        let orders = &self.gateway.services().orders;
        let seq = self
            .gateway
            .call(
                Service::Orders,
                "next_order_seq",
                orders.next_order_seq(&self.session.terminal_id),
            )
            .await?;

        let number = generate_order_number(&self.order_prefix, seq);
        let order = Order::open(number, &self.session.session_id, order_type, Utc::now());
        let order = self
            .gateway
            .call(Service::Orders, "create_order", orders.create_order(order))
            .await?;

        info!(order_id = %order.id, number = %order.number, %order_type, "Order started");
        let snapshot = OrderSnapshot {
            order: order.clone(),
            lines: Vec::new(),
        };
        self.with_state(|state| state.current = Some(snapshot.clone()));
        self.sync(&snapshot);
        Ok(order)
    }

    /// Makes an order current, fetching its authoritative snapshot.
    ///
    /// If the order is gone the current view is cleared, the active list is
    /// refreshed and `NotFound` is returned.
    pub async fn select_order(&self, order_id: &str) -> EngineResult<OrderSnapshot> {
        debug!(order_id, "select_order");
        validate_id("order_id", order_id)?;

        match self.gateway.snapshot(order_id).await {
            Ok(snapshot) => {
                self.with_state(|state| state.current = Some(snapshot.clone()));
                self.sync(&snapshot);
                Ok(snapshot)
            }
            Err(err @ EngineError::NotFound { .. }) => {
                warn!(order_id, "Selected order no longer exists");
                self.forget(order_id);
                if let Err(refresh_err) = self.list_active_orders().await {
                    warn!(error = %refresh_err, "Could not refresh active orders");
                }
                Err(err)
            }
            Err(err) => Err(err),
        }
    }

    /// Lists the session's open orders.
    pub async fn list_active_orders(&self) -> EngineResult<Vec<Order>> {
        debug!(session_id = %self.session.session_id, "list_active_orders");
        let active = self.fetch_active().await?;
        self.with_state(|state| {
            state.active = active.clone();
            if let Some(current) = &state.current {
                if !active.iter().any(|o| o.id == current.order.id) {
                    state.current = None;
                }
            }
        });
        Ok(active)
    }

    /// Re-fetches the current order, if any.
    pub async fn refresh_current(&self) -> EngineResult<Option<OrderSnapshot>> {
        let current_id = self.with_state(|state| state.current.as_ref().map(|c| c.order.id.clone()));
        match current_id {
            Some(order_id) => self.select_order(&order_id).await.map(Some),
            None => Ok(None),
        }
    }

    /// Fetches an order's snapshot without changing which order is current.
    pub async fn get_order(&self, order_id: &str) -> EngineResult<OrderSnapshot> {
        debug!(order_id, "get_order");
        validate_id("order_id", order_id)?;
        let snapshot = self.gateway.snapshot(order_id).await?;
        self.sync(&snapshot);
        Ok(snapshot)
    }

    /// Last synchronized snapshot of the current order.
    pub fn current(&self) -> Option<OrderSnapshot> {
        self.with_state(|state| state.current.clone())
    }

    /// Active orders as of the last sync.
    pub fn cached_active(&self) -> Vec<Order> {
        self.with_state(|state| state.active.clone())
    }

    /// Changes the order type and reprices.
    ///
    /// Leaving DineIn frees the bound table.
    pub async fn set_order_type(&self, order_id: &str, order_type: OrderType) -> EngineResult<OrderSnapshot> {
        debug!(order_id, %order_type, "set_order_type");
        let mut order = self.gateway.open_order(order_id).await?;

        if order.order_type != order_type {
            if order.order_type.requires_table() && !order_type.requires_table() {
                self.gateway.detach_table(&mut order).await?;
            }
            info!(order_id, from = %order.order_type, to = %order_type, "Order type changed");
            order.order_type = order_type;
            order.updated_at = Utc::now();
            self.gateway.save_order(&order).await?;
        }

        self.gateway.reprice(order_id).await
    }

    /// Sets the city the delivery fee is quoted for and reprices.
    pub async fn set_delivery_city(&self, order_id: &str, city_id: &str) -> EngineResult<OrderSnapshot> {
        debug!(order_id, city_id, "set_delivery_city");
        validate_id("city_id", city_id)?;
        let mut order = self.gateway.open_order(order_id).await?;

        let city = self
            .gateway
            .call(
                Service::Geography,
                "fetch_city",
                self.gateway.services().geography.fetch_city(city_id),
            )
            .await?;

        if order.delivery_city_id.as_deref() != Some(city.id.as_str()) {
            order.delivery_city_id = Some(city.id.clone());
            order.updated_at = Utc::now();
            self.gateway.save_order(&order).await?;
        }

        self.gateway.reprice(order_id).await
    }

    /// Closes an open order without checkout.
    pub async fn close_order(&self, order_id: &str) -> EngineResult<Order> {
        self.settle(order_id, OrderStatus::Closed).await
    }

    /// Cancels an open order.
    pub async fn cancel_order(&self, order_id: &str) -> EngineResult<Order> {
        self.settle(order_id, OrderStatus::Cancelled).await
    }

    async fn settle(&self, order_id: &str, status: OrderStatus) -> EngineResult<Order> {
        debug!(order_id, %status, "settle_order");
        let mut order = self.gateway.open_order(order_id).await?;

        if order.table_id.is_some() {
            self.gateway.detach_table(&mut order).await?;
            order.updated_at = Utc::now();
            self.gateway.save_order(&order).await?;
        }

        let order = self
            .gateway
            .call(
                Service::Orders,
                "close_order",
                self.gateway.services().orders.close_order(order_id, status),
            )
            .await?;

        info!(order_id, %status, "Order settled");
        self.sync_order(&order);
        Ok(order)
    }

    // =========================================================================
    // Synchronization
    // =========================================================================

    /// Re-synchronizes the view from a freshly fetched snapshot.
    pub fn sync(&self, snapshot: &OrderSnapshot) {
        self.with_state(|state| {
            let order = &snapshot.order;
            upsert_active(&mut state.active, order);

            let is_current = state
                .current
                .as_ref()
                .map_or(false, |c| c.order.id == order.id);
            if is_current {
                state.current = order.status.is_open().then(|| snapshot.clone());
            } else if state.current.is_none() && order.status.is_open() {
                state.current = Some(snapshot.clone());
            }
        });
    }

    /// Re-synchronizes after a mutation that only returned the order header.
    pub fn sync_order(&self, order: &Order) {
        self.with_state(|state| {
            upsert_active(&mut state.active, order);

            if let Some(current) = state.current.as_mut() {
                if current.order.id == order.id {
                    if order.status.is_open() {
                        current.order = order.clone();
                    } else {
                        state.current = None;
                    }
                }
            }
        });
    }

    fn forget(&self, order_id: &str) {
        self.with_state(|state| {
            state.active.retain(|o| o.id != order_id);
            if state
                .current
                .as_ref()
                .map_or(false, |c| c.order.id == order_id)
            {
                state.current = None;
            }
        });
    }

    async fn fetch_active(&self) -> EngineResult<Vec<Order>> {
        self.gateway
            .call(
                Service::Orders,
                "list_active_orders",
                self.gateway
                    .services()
                    .orders
                    .list_active_orders(&self.session.session_id),
            )
            .await
    }
}

fn upsert_active(active: &mut Vec<Order>, order: &Order) {
    match active.iter().position(|o| o.id == order.id) {
        Some(idx) if order.status.is_open() => active[idx] = order.clone(),
        Some(idx) => {
            active.remove(idx);
        }
        None if order.status.is_open() => active.push(order.clone()),
        None => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn order(id: &str, status: OrderStatus) -> Order {
        let mut order = Order::open("T1-0001", "s-1", OrderType::Pickup, Utc::now());
        order.id = id.to_string();
        order.status = status;
        order
    }

    #[test]
    fn test_upsert_active() {
        let mut active = Vec::new();
        upsert_active(&mut active, &order("a", OrderStatus::Open));
        upsert_active(&mut active, &order("b", OrderStatus::Open));
        assert_eq!(active.len(), 2);

        let mut updated = order("a", OrderStatus::Open);
        updated.item_count = 3;
        upsert_active(&mut active, &updated);
        assert_eq!(active[0].item_count, 3);

        upsert_active(&mut active, &order("a", OrderStatus::Completed));
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].id, "b");

        upsert_active(&mut active, &order("c", OrderStatus::Cancelled));
        assert_eq!(active.len(), 1);
    }
}
