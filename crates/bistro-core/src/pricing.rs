//! # Pricing Calculator
//!
//! Derives order totals from lines, order type, promo and delivery fee.
//!
//! ## Formula
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  line_total   = (unit_price + addon_surcharge) × qty                   │
//! │  subtotal     = Σ line_total            (lines with qty > 0)           │
//! │  discount     = promo(subtotal)         (0 if below promo.min_total)   │
//! │  delivery_fee = fee if Delivery else 0                                 │
//! │  grand_total  = max(0, subtotal − discount) + delivery_fee             │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every function here is deterministic and side-effect free. All values are
//! exact 3-decimal fixed point; see [`Money`].

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::Money;
use crate::promo::Promo;
use crate::types::{LineAddon, OrderLine, OrderType};

/// Computed order totals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Totals {
    pub subtotal: Money,
    pub discount_total: Money,
    pub delivery_fee: Money,
    pub grand_total: Money,
}

/// Per-unit add-on surcharge: Σ addon price × addon qty.
pub fn addon_surcharge(addons: &[LineAddon]) -> Money {
    addons
        .iter()
        .map(|a| a.price.multiply_quantity(a.qty as i64))
        .sum()
}

/// Line total for a quantity, including the per-unit add-on surcharge.
#[inline]
pub fn line_total(unit_price: Money, addon_surcharge: Money, qty: i64) -> Money {
    (unit_price + addon_surcharge).multiply_quantity(qty)
}

/// Σ line_total over lines with qty > 0.
///
/// Line totals are recomputed from the frozen prices instead of trusting the
/// stored `line_total`.
pub fn subtotal(lines: &[OrderLine]) -> Money {
    lines
        .iter()
        .filter(|l| l.qty > 0)
        .map(|l| line_total(l.unit_price, l.addon_surcharge, l.qty))
        .sum()
}

/// Computes the full set of totals for an order.
///
/// ## Arguments
/// * `order_type` - Only `Delivery` adds the delivery fee
/// * `lines` - Current order lines
/// * `promo` - Attached promo, if any
/// * `delivery_fee` - Fee quoted for the delivery city, if known
///
/// ## Example
/// ```rust
/// use bistro_core::money::Money;
/// use bistro_core::pricing::compute;
/// use bistro_core::types::OrderType;
///
/// let totals = compute(OrderType::Delivery, &[], None, Some(Money::from_mils(1000)));
/// assert_eq!(totals.subtotal, Money::zero());
/// assert_eq!(totals.grand_total.mils(), 1000);
/// ```
pub fn compute(
    order_type: OrderType,
    lines: &[OrderLine],
    promo: Option<&Promo>,
    delivery_fee: Option<Money>,
) -> Totals {
    let subtotal = subtotal(lines);

    let discount_total = match promo {
        Some(promo) if subtotal >= promo.min_total => promo.discount_for(subtotal),
        _ => Money::zero(),
    };

    let delivery_fee = if order_type.charges_delivery() {
        delivery_fee.unwrap_or_default()
    } else {
        Money::zero()
    };

    let grand_total = (subtotal - discount_total).non_negative() + delivery_fee;

    Totals {
        subtotal,
        discount_total,
        delivery_fee,
        grand_total,
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
