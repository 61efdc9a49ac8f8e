//! # Domain Types
//!
//! Core domain types shared by the pure logic and the engine.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │     Order       │   │   OrderLine     │   │   TableInfo     │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id (UUID)      │◄──│  order_id (FK)  │   │  id             │       │
//! │  │  number         │   │  item_id        │   │  status         │       │
//! │  │  order_type     │   │  unit_price     │   │  current_order ─┼──►    │
//! │  │  status         │   │  addons[]       │   │    (back-ref)   │       │
//! │  │  totals         │   │  qty            │   └─────────────────┘       │
//! │  │  table_id ──────┼─► │  line_total     │                             │
//! │  └─────────────────┘   └─────────────────┘                             │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │  CatalogItem    │   │   AddonGroup    │   │     Addon       │       │
//! │  │  price          │──►│  is_required    │──►│  price          │       │
//! │  │  addon_groups[] │   │  max_select     │   │  (surcharge)    │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Snapshot Pattern
//! An `OrderLine` freezes the item name, unit price and add-on prices at the
//! moment it is created. Later catalog edits never change an open order.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use ts_rs::TS;
use uuid::Uuid;

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::Money;

// =============================================================================
// Order Type
// =============================================================================

/// How the order is fulfilled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum OrderType {
    /// Delivered to an address; carries a delivery fee.
    Delivery,
    /// Collected by the customer at the counter.
    #[default]
    Pickup,
    /// Served at a physical table.
    DineIn,
}

impl OrderType {
    /// Only dine-in orders may hold a table.
    pub fn requires_table(&self) -> bool {
        matches!(self, OrderType::DineIn)
    }

    /// Only delivery orders add the delivery fee to the grand total.
    pub fn charges_delivery(&self) -> bool {
        matches!(self, OrderType::Delivery)
    }
}

impl fmt::Display for OrderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderType::Delivery => write!(f, "delivery"),
            OrderType::Pickup => write!(f, "pickup"),
            OrderType::DineIn => write!(f, "dine_in"),
        }
    }
}

impl FromStr for OrderType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "delivery" => Ok(OrderType::Delivery),
            "pickup" | "takeaway" | "take_away" => Ok(OrderType::Pickup),
            "dine_in" | "dine-in" | "dinein" => Ok(OrderType::DineIn),
            other => Err(ValidationError::InvalidFormat {
                field: "order_type".to_string(),
                reason: format!(
                    "unknown order type '{}'. Valid options: delivery, pickup, dine_in",
                    other
                ),
            }),
        }
    }
}

// =============================================================================
// Order Status
// =============================================================================

/// Lifecycle status of an order.
///
/// ```text
///            ┌──────────► Completed   (checkout)
///   Open ────┼──────────► Closed      (operator close / table release)
///            └──────────► Cancelled   (operator cancel)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    /// Order is being composed (lines, promo, table may change).
    #[default]
    Open,
    /// Order was checked out.
    Completed,
    /// Order was closed without checkout.
    Closed,
    /// Order was cancelled by the operator.
    Cancelled,
}

impl OrderStatus {
    #[inline]
    pub fn is_open(&self) -> bool {
        matches!(self, OrderStatus::Open)
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderStatus::Open => write!(f, "open"),
            OrderStatus::Completed => write!(f, "completed"),
            OrderStatus::Closed => write!(f, "closed"),
            OrderStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

// =============================================================================
// Order
// =============================================================================

/// An order ("tab") owned by a terminal session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Order {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Human-readable number shown to staff and printed on tickets.
    pub number: String,

    /// Terminal session that opened this order.
    pub session_id: String,

    pub order_type: OrderType,
    pub status: OrderStatus,

    /// Σ line_total over lines with qty > 0.
    pub subtotal: Money,

    /// Promo discount (may exceed subtotal for fixed-amount promos).
    pub discount_total: Money,

    /// Fee charged for delivery orders; zero for every other type.
    pub delivery_fee: Money,

    /// max(0, subtotal − discount) + delivery fee.
    pub grand_total: Money,

    /// Attached promo code (normalized, upper case).
    pub promocode: Option<String>,

    /// Bound table (dine-in only).
    pub table_id: Option<String>,

    /// Number of guests at the table (dine-in only).
    pub covers: Option<u32>,

    /// City the delivery fee is quoted for (delivery only).
    pub delivery_city_id: Option<String>,

    /// Composed delivery address captured at checkout.
    pub delivery_address: Option<String>,

    /// Payment method slug captured at checkout.
    pub payment_method: Option<String>,

    /// Number of lines with qty > 0, maintained by the backend.
    pub item_count: usize,

    #[ts(as = "String")]
    pub opened_at: DateTime<Utc>,

    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,

    #[ts(as = "Option<String>")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl Order {
    /// Creates a new empty open order.
    pub fn open(
        number: impl Into<String>,
        session_id: impl Into<String>,
        order_type: OrderType,
        now: DateTime<Utc>,
    ) -> Self {
        Order {
            id: Uuid::new_v4().to_string(),
            number: number.into(),
            session_id: session_id.into(),
            order_type,
            status: OrderStatus::Open,
            subtotal: Money::zero(),
            discount_total: Money::zero(),
            delivery_fee: Money::zero(),
            grand_total: Money::zero(),
            promocode: None,
            table_id: None,
            covers: None,
            delivery_city_id: None,
            delivery_address: None,
            payment_method: None,
            item_count: 0,
            opened_at: now,
            updated_at: now,
            completed_at: None,
        }
    }

    /// True when the order is open and has no lines.
    pub fn is_empty_open(&self) -> bool {
        self.status.is_open() && self.item_count == 0
    }

    /// Fails unless the order still accepts mutations.
    pub fn ensure_open(&self) -> CoreResult<()> {
        if !self.status.is_open() {
            return Err(CoreError::OrderNotOpen {
                order_id: self.id.clone(),
                status: self.status,
            });
        }
        Ok(())
    }

    /// Totals currently stored on the header.
    pub fn totals(&self) -> crate::pricing::Totals {
        crate::pricing::Totals {
            subtotal: self.subtotal,
            discount_total: self.discount_total,
            delivery_fee: self.delivery_fee,
            grand_total: self.grand_total,
        }
    }

    /// Copies computed totals onto the order header.
    pub fn apply_totals(&mut self, totals: &crate::pricing::Totals) {
        self.subtotal = totals.subtotal;
        self.discount_total = totals.discount_total;
        self.delivery_fee = totals.delivery_fee;
        self.grand_total = totals.grand_total;
    }
}

// =============================================================================
// Order Line
// =============================================================================

/// A frozen add-on on an order line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct LineAddon {
    pub addon_id: String,
    pub group_id: String,
    /// Add-on name at time of adding (frozen).
    pub name: String,
    /// Surcharge at time of adding (frozen).
    pub price: Money,
    pub qty: u32,
}

/// A line item on an order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct OrderLine {
    pub id: String,
    pub order_id: String,
    pub item_id: String,
    /// Item name at time of adding (frozen).
    pub name: String,
    /// Base price locked at line creation.
    pub unit_price: Money,
    /// Add-ons locked at line creation. Immutable afterwards.
    pub addons: Vec<LineAddon>,
    /// Σ addon price × addon qty, charged once per unit.
    pub addon_surcharge: Money,
    pub qty: i64,
    /// (unit_price + addon_surcharge) × qty.
    pub line_total: Money,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl OrderLine {
    /// Creates a line with its price and add-ons frozen from the catalog.
    pub fn new(
        order_id: impl Into<String>,
        item: &CatalogItem,
        addons: Vec<LineAddon>,
        qty: i64,
        now: DateTime<Utc>,
    ) -> Self {
        let addon_surcharge = crate::pricing::addon_surcharge(&addons);
        OrderLine {
            id: Uuid::new_v4().to_string(),
            order_id: order_id.into(),
            item_id: item.id.clone(),
            name: item.name.clone(),
            unit_price: item.price,
            addons,
            addon_surcharge,
            qty,
            line_total: crate::pricing::line_total(item.price, addon_surcharge, qty),
            created_at: now,
        }
    }

    #[inline]
    pub fn has_addons(&self) -> bool {
        !self.addons.is_empty()
    }

    /// Price of one unit including add-ons.
    #[inline]
    pub fn unit_total(&self) -> Money {
        self.unit_price + self.addon_surcharge
    }

    /// Returns a copy with a new quantity and recomputed line total.
    pub fn with_qty(&self, qty: i64) -> Self {
        OrderLine {
            qty,
            line_total: crate::pricing::line_total(self.unit_price, self.addon_surcharge, qty),
            ..self.clone()
        }
    }
}

/// The authoritative `{order, lines}` pair returned by every mutation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct OrderSnapshot {
    pub order: Order,
    pub lines: Vec<OrderLine>,
}

// =============================================================================
// Catalog
// =============================================================================

/// A selectable modifier with a surcharge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Addon {
    pub id: String,
    pub group_id: String,
    pub name: String,
    pub price: Money,
}

/// A named set of add-ons with selection rules.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct AddonGroup {
    pub id: String,
    pub item_id: String,
    pub name: String,
    pub is_required: bool,
    /// `None` or `Some(0)` means unbounded.
    pub max_select: Option<u32>,
    pub addons: Vec<Addon>,
}

impl AddonGroup {
    /// Returns the positive selection limit, if any.
    pub fn limit(&self) -> Option<u32> {
        self.max_select.filter(|max| *max > 0)
    }

    pub fn find_addon(&self, addon_id: &str) -> Option<&Addon> {
        self.addons.iter().find(|a| a.id == addon_id)
    }
}

/// An add-on chosen by the operator when adding a line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SelectedAddon {
    pub addon_id: String,
    pub group_id: String,
    pub qty: u32,
}

impl SelectedAddon {
    pub fn new(addon_id: impl Into<String>, group_id: impl Into<String>, qty: u32) -> Self {
        SelectedAddon {
            addon_id: addon_id.into(),
            group_id: group_id.into(),
            qty,
        }
    }
}

/// A sellable catalog item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CatalogItem {
    pub id: String,
    pub name: String,
    pub price: Money,
    pub is_active: bool,
    pub addon_groups: Vec<AddonGroup>,
}

// =============================================================================
// Tables
// =============================================================================

/// Occupancy status of a physical table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum TableStatus {
    #[default]
    Available,
    /// Held for a booking; not assignable from the terminal.
    Reserved,
    Occupied,
}

/// A physical table and its occupancy back-reference.
///
/// The table does not own the order: `current_order_id` is only a pointer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TableInfo {
    pub id: String,
    pub name: String,
    pub capacity: u32,
    pub status: TableStatus,
    pub current_order_id: Option<String>,
}

// =============================================================================
// Payment
// =============================================================================

/// A payment method offered at checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PaymentMethod {
    pub slug: String,
    pub name: String,
    pub is_active: bool,
    /// Online/redirect methods need an external payment link.
    pub requires_link: bool,
}

/// A link the customer follows to pay online.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PaymentLink {
    pub url: String,
    pub reference: String,
}

// =============================================================================
// Geography
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct GeoState {
    pub id: String,
    pub name: String,
}

/// A delivery city with its fee and (informational) minimum order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct City {
    pub id: String,
    pub state_id: String,
    pub name: String,
    pub delivery_fee: Money,
    pub min_order: Money,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Block {
    pub id: String,
    pub city_id: String,
    pub name: String,
}

// =============================================================================
// Helpers
// =============================================================================

/// Generates a human-readable order number: `{prefix}-{seq:04}`.
///
/// ## Example
/// ```rust
/// use bistro_core::types::generate_order_number;
///
/// assert_eq!(generate_order_number("T1", 7), "T1-0007");
/// ```
pub fn generate_order_number(prefix: &str, seq: u64) -> String {
    format!("{}-{:04}", prefix, seq)
}

// =============================================================================
// Unit Tests
// =============================================================================
