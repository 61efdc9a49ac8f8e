//! # Checkout Form
//!
//! The fields the operator fills in at checkout and the checks that can be
//! made on them without calling any service.
//!
//! ## Rules by Order Type
//! ```text
//! ┌──────────────┬────────────────┬──────────────────────────────────────┐
//! │ Order type   │ payment_method │ address                              │
//! ├──────────────┼────────────────┼──────────────────────────────────────┤
//! │ Delivery     │ required       │ state + city + block ids, and a      │
//! │              │                │ non-empty composed address           │
//! │ Pickup       │ required       │ ignored                              │
//! │ DineIn       │ required       │ ignored                              │
//! └──────────────┴────────────────┴──────────────────────────────────────┘
//! ```
//!
//! Whether the referenced method/state/city/block actually exist is checked
//! by the engine against the payment and geography services.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::ValidationError;
use crate::types::OrderType;
use crate::validation::ValidationResult;

/// Structured delivery address as entered at the terminal.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(default)]
pub struct DeliveryAddress {
    pub state_id: Option<String>,
    pub city_id: Option<String>,
    pub block_id: Option<String>,
    pub street: String,
    pub building: String,
    pub floor: String,
    pub apartment: String,
    pub landmark: String,
}

/// Everything the operator supplies to complete an order.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(default)]
pub struct CheckoutForm {
    /// Slug of the selected payment method.
    pub payment_method: Option<String>,
    pub customer_name: Option<String>,
    pub customer_phone: Option<String>,
    pub address: DeliveryAddress,
    pub notes: Option<String>,
}

/// Joins the free-text address parts into one line.
///
/// Empty parts are skipped.
///
/// ## Example
/// ```rust
/// use bistro_core::checkout::{compose_address, DeliveryAddress};
///
/// let address = DeliveryAddress {
///     street: "Main St 12".to_string(),
///     floor: "3".to_string(),
///     ..Default::default()
/// };
/// assert_eq!(compose_address(&address), "Main St 12, Floor 3");
/// ```
pub fn compose_address(address: &DeliveryAddress) -> String {
    let parts = [
        (None, address.street.trim()),
        (Some("Building"), address.building.trim()),
        (Some("Floor"), address.floor.trim()),
        (Some("Apt"), address.apartment.trim()),
        (None, address.landmark.trim()),
    ];

    parts
        .iter()
        .filter(|(_, value)| !value.is_empty())
        .map(|(label, value)| match label {
            Some(label) => format!("{} {}", label, value),
            None => value.to_string(),
        })
        .collect::<Vec<_>>()
        .join(", ")
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

/// Validates the form for an order type.
///
/// ## Returns
/// The selected payment method slug.
pub fn validate_checkout_form(order_type: OrderType, form: &CheckoutForm) -> ValidationResult<String> {
    let payment_method =
        present(&form.payment_method).ok_or_else(|| ValidationError::required("payment_method"))?;

    if order_type.charges_delivery() {
        let address = &form.address;
        for (field, value) in [
            ("state", &address.state_id),
            ("city", &address.city_id),
            ("block", &address.block_id),
        ] {
            if present(value).is_none() {
                return Err(ValidationError::required(field));
            }
        }

        if compose_address(address).is_empty() {
            return Err(ValidationError::required("address"));
        }
    }

    Ok(payment_method.to_string())
}

// =============================================================================
// Unit Tests
// =============================================================================
