//! # In-Memory Backend
//!
//! A reference implementation of every collaborator trait, backed by plain
//! maps behind a mutex. The demo terminal and the test suites run against it.
//!
//! ## Failure Injection
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  set_print_failure(Some(..))   print_order         → Unavailable       │
//! │  set_link_failure(Some(..))    create_payment_link → Unavailable       │
//! │  set_orders_unavailable(..)    every order call    → Unavailable       │
//! │  revoke_session(reason)        every call          → Unauthorized      │
//! │  set_latency(Some(d))          every call sleeps d first               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tracing::debug;

use bistro_core::promo::normalize_code;
use bistro_core::table;
use bistro_core::{
    Block, CatalogItem, City, GeoState, Order, OrderLine, OrderSnapshot, OrderStatus, PaymentLink,
    PaymentMethod, Promo, TableInfo,
};

use crate::backend::{BackendError, BackendResult, OrderBackend};
use crate::error::Conflict;
use crate::services::{CatalogService, GeographyService, PaymentService, PrintService, PromoDirectory};

#[derive(Debug, Default)]
struct Store {
    orders: HashMap<String, Order>,
    /// Insertion order is the display order.
    lines: Vec<OrderLine>,
    tables: Vec<TableInfo>,
    items: HashMap<String, CatalogItem>,
    promos: HashMap<String, Promo>,
    states: HashMap<String, GeoState>,
    cities: HashMap<String, City>,
    blocks: HashMap<String, Block>,
    methods: Vec<PaymentMethod>,
    sequences: HashMap<String, u64>,
    printed: Vec<String>,
    links_issued: u64,
}

impl Store {
    fn order_mut(&mut self, order_id: &str) -> BackendResult<&mut Order> {
        self.orders
            .get_mut(order_id)
            .ok_or_else(|| BackendError::not_found("order", order_id))
    }

    fn open_order_mut(&mut self, order_id: &str) -> BackendResult<&mut Order> {
        let order = self.order_mut(order_id)?;
        if !order.status.is_open() {
            return Err(BackendError::Conflict(Conflict::OrderNotOpen {
                order_id: order.id.clone(),
                status: order.status,
            }));
        }
        Ok(order)
    }

    fn table_mut(&mut self, table_id: &str) -> BackendResult<&mut TableInfo> {
        self.tables
            .iter_mut()
            .find(|t| t.id == table_id)
            .ok_or_else(|| BackendError::not_found("table", table_id))
    }

    fn line_index(&self, line_id: &str) -> BackendResult<usize> {
        self.lines
            .iter()
            .position(|l| l.id == line_id)
            .ok_or_else(|| BackendError::not_found("line", line_id))
    }

    /// Recomputes `item_count` after a line change.
    fn recount(&mut self, order_id: &str) {
        let count = self
            .lines
            .iter()
            .filter(|l| l.order_id == order_id && l.qty > 0)
            .count();
        if let Some(order) = self.orders.get_mut(order_id) {
            order.item_count = count;
            order.updated_at = Utc::now();
        }
    }
}

#[derive(Debug, Default)]
struct Faults {
    revoked: Option<String>,
    orders_unavailable: Option<String>,
    save: Option<String>,
    finalize: Option<String>,
    revoke_on_finalize: Option<String>,
    print: Option<String>,
    links: Option<String>,
    latency: Option<Duration>,
}

/// In-memory implementation of every collaborator.
#[derive(Debug, Default)]
pub struct InMemoryBackend {
    store: Mutex<Store>,
    faults: Mutex<Faults>,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn store(&self) -> MutexGuard<'_, Store> {
        self.store.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn faults(&self) -> MutexGuard<'_, Faults> {
        self.faults.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Applies latency and session revocation shared by every call.
    async fn enter(&self) -> BackendResult<()> {
        let (latency, revoked) = {
            let faults = self.faults();
            (faults.latency, faults.revoked.clone())
        };

        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }

        match revoked {
            Some(reason) => Err(BackendError::Unauthorized(reason)),
            None => Ok(()),
        }
    }

    async fn enter_orders(&self) -> BackendResult<()> {
        self.enter().await?;
        match self.faults().orders_unavailable.clone() {
            Some(message) => Err(BackendError::Unavailable(message)),
            None => Ok(()),
        }
    }

    // =========================================================================
    // Seeding
    // =========================================================================

    pub fn with_item(self, item: CatalogItem) -> Self {
        self.store().items.insert(item.id.clone(), item);
        self
    }

    pub fn with_table(self, table: TableInfo) -> Self {
        self.store().tables.push(table);
        self
    }

    pub fn with_promo(self, promo: Promo) -> Self {
        self.store().promos.insert(normalize_code(&promo.code), promo);
        self
    }

    pub fn with_state(self, state: GeoState) -> Self {
        self.store().states.insert(state.id.clone(), state);
        self
    }

    pub fn with_city(self, city: City) -> Self {
        self.store().cities.insert(city.id.clone(), city);
        self
    }

    pub fn with_block(self, block: Block) -> Self {
        self.store().blocks.insert(block.id.clone(), block);
        self
    }

    pub fn with_payment_method(self, method: PaymentMethod) -> Self {
        self.store().methods.push(method);
        self
    }

    /// Replaces a catalog item (e.g. a price change after lines were added).
    pub fn upsert_item(&self, item: CatalogItem) {
        self.store().items.insert(item.id.clone(), item);
    }

    /// Deletes an order and its lines, as another terminal would.
    pub fn purge_order(&self, order_id: &str) {
        let mut store = self.store();
        store.orders.remove(order_id);
        store.lines.retain(|l| l.order_id != order_id);
    }

    // =========================================================================
    // Failure Injection
    // =========================================================================

    pub fn set_print_failure(&self, message: Option<&str>) {
        self.faults().print = message.map(str::to_string);
    }

    pub fn set_link_failure(&self, message: Option<&str>) {
        self.faults().links = message.map(str::to_string);
    }

    pub fn set_orders_unavailable(&self, message: Option<&str>) {
        self.faults().orders_unavailable = message.map(str::to_string);
    }

    /// Fails only `save_order`; every other order call still succeeds.
    pub fn set_save_failure(&self, message: Option<&str>) {
        self.faults().save = message.map(str::to_string);
    }

    pub fn set_finalize_failure(&self, message: Option<&str>) {
        self.faults().finalize = message.map(str::to_string);
    }

    /// Revokes the session right after the next successful `finalize_order`.
    pub fn revoke_session_on_finalize(&self, reason: &str) {
        self.faults().revoke_on_finalize = Some(reason.to_string());
    }

    /// Every call fails with `Unauthorized` until [`Self::restore_session`].
    pub fn revoke_session(&self, reason: &str) {
        self.faults().revoked = Some(reason.to_string());
    }

    pub fn restore_session(&self) {
        self.faults().revoked = None;
    }

    pub fn set_latency(&self, latency: Option<Duration>) {
        self.faults().latency = latency;
    }

    // =========================================================================
    // Inspection
    // =========================================================================

    pub fn order(&self, order_id: &str) -> Option<Order> {
        self.store().orders.get(order_id).cloned()
    }

    pub fn table(&self, table_id: &str) -> Option<TableInfo> {
        self.store().tables.iter().find(|t| t.id == table_id).cloned()
    }

    /// Ids of orders printed so far, in print order.
    pub fn printed_orders(&self) -> Vec<String> {
        self.store().printed.clone()
    }
}

// =============================================================================
// OrderBackend
// =============================================================================

#[async_trait]
impl OrderBackend for InMemoryBackend {
    async fn next_order_seq(&self, terminal_id: &str) -> BackendResult<u64> {
        self.enter_orders().await?;
        let mut store = self.store();
        let seq = store.sequences.entry(terminal_id.to_string()).or_insert(0);
        *seq += 1;
        Ok(*seq)
    }

    async fn create_order(&self, order: Order) -> BackendResult<Order> {
        self.enter_orders().await?;
        let mut store = self.store();

        if let Some(empty) = store
            .orders
            .values()
            .find(|o| o.session_id == order.session_id && o.is_empty_open())
        {
            return Err(BackendError::Conflict(Conflict::EmptyOrderExists {
                order_id: empty.id.clone(),
            }));
        }

        debug!(order_id = %order.id, number = %order.number, "memory: create_order");
        store.orders.insert(order.id.clone(), order.clone());
        Ok(order)
    }

    async fn fetch_order(&self, order_id: &str) -> BackendResult<Order> {
        self.enter_orders().await?;
        let mut store = self.store();
        store.order_mut(order_id).map(|o| o.clone())
    }

    async fn list_active_orders(&self, session_id: &str) -> BackendResult<Vec<Order>> {
        self.enter_orders().await?;
        let store = self.store();
        let mut orders: Vec<Order> = store
            .orders
            .values()
            .filter(|o| o.session_id == session_id && o.status.is_open())
            .cloned()
            .collect();
        orders.sort_by(|a, b| a.opened_at.cmp(&b.opened_at).then_with(|| a.number.cmp(&b.number)));
        Ok(orders)
    }

    async fn save_order(&self, order: &Order) -> BackendResult<Order> {
        self.enter_orders().await?;
        if let Some(message) = self.faults().save.clone() {
            return Err(BackendError::Unavailable(message));
        }
        let mut store = self.store();
        let stored = store.order_mut(&order.id)?;

        *stored = Order {
            status: stored.status,
            item_count: stored.item_count,
            opened_at: stored.opened_at,
            completed_at: stored.completed_at,
            ..order.clone()
        };
        Ok(stored.clone())
    }

    async fn finalize_order(&self, order: &Order) -> BackendResult<Order> {
        self.enter_orders().await?;
        if let Some(message) = self.faults().finalize.clone() {
            return Err(BackendError::Unavailable(message));
        }
        let completed = {
            let mut store = self.store();
            let stored = store.open_order_mut(&order.id)?;

            *stored = Order {
                status: OrderStatus::Completed,
                item_count: stored.item_count,
                opened_at: stored.opened_at,
                completed_at: Some(order.completed_at.unwrap_or_else(Utc::now)),
                ..order.clone()
            };
            stored.clone()
        };

        let mut faults = self.faults();
        if let Some(reason) = faults.revoke_on_finalize.take() {
            faults.revoked = Some(reason);
        }
        Ok(completed)
    }

    async fn close_order(&self, order_id: &str, status: OrderStatus) -> BackendResult<Order> {
        self.enter_orders().await?;
        let mut store = self.store();
        let stored = store.open_order_mut(order_id)?;
        stored.status = status;
        stored.updated_at = Utc::now();
        Ok(stored.clone())
    }

    async fn list_lines(&self, order_id: &str) -> BackendResult<Vec<OrderLine>> {
        self.enter_orders().await?;
        let mut store = self.store();
        store.order_mut(order_id)?;
        Ok(store
            .lines
            .iter()
            .filter(|l| l.order_id == order_id)
            .cloned()
            .collect())
    }

    async fn fetch_line(&self, line_id: &str) -> BackendResult<OrderLine> {
        self.enter_orders().await?;
        let store = self.store();
        let idx = store.line_index(line_id)?;
        Ok(store.lines[idx].clone())
    }

    async fn insert_line(&self, line: OrderLine) -> BackendResult<OrderLine> {
        self.enter_orders().await?;
        let mut store = self.store();
        store.open_order_mut(&line.order_id)?;

        let order_id = line.order_id.clone();
        store.lines.push(line.clone());
        store.recount(&order_id);
        Ok(line)
    }

    async fn update_line_qty(&self, line_id: &str, qty: i64) -> BackendResult<OrderLine> {
        self.enter_orders().await?;
        let mut store = self.store();
        let idx = store.line_index(line_id)?;
        let order_id = store.lines[idx].order_id.clone();
        store.open_order_mut(&order_id)?;

        let updated = store.lines[idx].with_qty(qty);
        store.lines[idx] = updated.clone();
        store.recount(&order_id);
        Ok(updated)
    }

    async fn delete_line(&self, line_id: &str) -> BackendResult<()> {
        self.enter_orders().await?;
        let mut store = self.store();
        let idx = store.line_index(line_id)?;
        let order_id = store.lines[idx].order_id.clone();
        store.open_order_mut(&order_id)?;

        store.lines.remove(idx);
        store.recount(&order_id);
        Ok(())
    }

    async fn list_tables(&self) -> BackendResult<Vec<TableInfo>> {
        self.enter_orders().await?;
        Ok(self.store().tables.clone())
    }

    async fn fetch_table(&self, table_id: &str) -> BackendResult<TableInfo> {
        self.enter_orders().await?;
        let mut store = self.store();
        store.table_mut(table_id).map(|t| t.clone())
    }

    async fn claim_table(&self, table_id: &str, order_id: &str) -> BackendResult<TableInfo> {
        self.enter_orders().await?;
        let mut store = self.store();
        let current = store.table_mut(table_id)?;

        let claimed = table::claim(current, order_id).map_err(|conflict| {
            BackendError::Conflict(Conflict::TableOccupied {
                table_id: conflict.table_id,
                held_by: conflict.held_by,
            })
        })?;
        *current = claimed.clone();
        Ok(claimed)
    }

    async fn vacate_table(&self, table_id: &str, order_id: &str) -> BackendResult<TableInfo> {
        self.enter_orders().await?;
        let mut store = self.store();
        let current = store.table_mut(table_id)?;

        if let Some(freed) = table::vacate(current, order_id) {
            *current = freed;
        }
        Ok(current.clone())
    }
}

// =============================================================================
// Catalog, Promos, Geography
// =============================================================================

#[async_trait]
impl CatalogService for InMemoryBackend {
    async fn fetch_item(&self, item_id: &str) -> BackendResult<CatalogItem> {
        self.enter().await?;
        self.store()
            .items
            .get(item_id)
            .cloned()
            .ok_or_else(|| BackendError::not_found("item", item_id))
    }
}

#[async_trait]
impl PromoDirectory for InMemoryBackend {
    async fn find_promo(&self, code: &str) -> BackendResult<Option<Promo>> {
        self.enter().await?;
        Ok(self.store().promos.get(&normalize_code(code)).cloned())
    }
}

#[async_trait]
impl GeographyService for InMemoryBackend {
    async fn fetch_state(&self, state_id: &str) -> BackendResult<GeoState> {
        self.enter().await?;
        self.store()
            .states
            .get(state_id)
            .cloned()
            .ok_or_else(|| BackendError::not_found("state", state_id))
    }

    async fn fetch_city(&self, city_id: &str) -> BackendResult<City> {
        self.enter().await?;
        self.store()
            .cities
            .get(city_id)
            .cloned()
            .ok_or_else(|| BackendError::not_found("city", city_id))
    }

    async fn fetch_block(&self, block_id: &str) -> BackendResult<Block> {
        self.enter().await?;
        self.store()
            .blocks
            .get(block_id)
            .cloned()
            .ok_or_else(|| BackendError::not_found("block", block_id))
    }
}

// =============================================================================
// Payments & Printing
// =============================================================================

#[async_trait]
impl PaymentService for InMemoryBackend {
    async fn list_methods(&self) -> BackendResult<Vec<PaymentMethod>> {
        self.enter().await?;
        Ok(self.store().methods.clone())
    }

    async fn create_payment_link(&self, order: &Order, method: &PaymentMethod) -> BackendResult<PaymentLink> {
        self.enter().await?;
        if let Some(message) = self.faults().links.clone() {
            return Err(BackendError::Unavailable(message));
        }

        let mut store = self.store();
        store.links_issued += 1;
        let reference = format!("PL-{:06}", store.links_issued);
        debug!(order_id = %order.id, method = %method.slug, %reference, "memory: payment link issued");

        Ok(PaymentLink {
            url: format!("https://pay.bistro.local/{}/{}", method.slug, reference),
            reference,
        })
    }
}

#[async_trait]
impl PrintService for InMemoryBackend {
    async fn print_order(&self, snapshot: &OrderSnapshot) -> BackendResult<()> {
        self.enter().await?;
        if let Some(message) = self.faults().print.clone() {
            return Err(BackendError::Unavailable(message));
        }

        self.store().printed.push(snapshot.order.id.clone());
        Ok(())
    }
}
