//! # bistro-core: Pure Business Logic for Bistro POS
//!
//! Everything the order engine decides without talking to anyone: money
//! math, pricing, add-on rules, promo rules, table transitions and checkout
//! form checks.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Bistro POS Architecture                          │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    Terminal (apps/terminal)                     │   │
//! │  │    Tabs ──► Lines ──► Promo ──► Table ──► Checkout             │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ Command / Response                     │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    bistro-engine                                │   │
//! │  │    Registry, Editor, PromoEngine, Tables, Checkout             │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ bistro-core (THIS CRATE) ★                      │   │
//! │  │                                                                 │   │
//! │  │   ┌─────────┐ ┌─────────┐ ┌─────────┐ ┌─────────┐ ┌─────────┐  │   │
//! │  │   │  money  │ │ pricing │ │ addons  │ │  promo  │ │  table  │  │   │
//! │  │   └─────────┘ └─────────┘ └─────────┘ └─────────┘ └─────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO BACKEND • NO NETWORK • PURE FUNCTIONS            │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Order, OrderLine, catalog, tables, geography)
//! - [`money`] - Money type with 3-decimal integer arithmetic
//! - [`pricing`] - Totals computation
//! - [`addons`] - Add-on group constraint validation
//! - [`promo`] - Promo eligibility and discount rules
//! - [`table`] - Table occupancy state machine
//! - [`checkout`] - Checkout form and address composition
//! - [`validation`] - Input validators
//! - [`error`] - Domain error types
//!
//! ## Example Usage
//!
//! ```rust
//! use bistro_core::money::Money;
//! use bistro_core::pricing::compute;
//! use bistro_core::types::OrderType;
//!
//! let totals = compute(OrderType::Pickup, &[], None, None);
//! assert_eq!(totals.grand_total, Money::zero());
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod addons;
pub mod checkout;
pub mod error;
pub mod money;
pub mod pricing;
pub mod promo;
pub mod table;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use checkout::{CheckoutForm, DeliveryAddress};
pub use error::{CoreError, CoreResult, ValidationError};
pub use money::{Money, Percentage};
pub use pricing::Totals;
pub use promo::{Promo, PromoDiscount};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum quantity on a single order line.
///
/// Catches typos like 1000 instead of 10.
pub const MAX_LINE_QUANTITY: i64 = 999;

/// Maximum number of lines on one order.
pub const MAX_LINES_PER_ORDER: usize = 100;

/// Maximum guests seated for one dine-in order.
pub const MAX_COVERS: u32 = 50;

/// Maximum length of a promo code after normalization.
pub const MAX_PROMO_CODE_LEN: usize = 32;

/// Fractional digits carried by [`Money`].
pub const CURRENCY_DECIMALS: u32 = 3;
