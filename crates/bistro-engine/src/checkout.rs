//! # Checkout Coordinator
//!
//! Validates the checkout form, finalizes the order and runs the
//! post-completion side effects.
//!
//! ## Completion Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  complete(order, form)                                                 │
//! │     │                                                                   │
//! │     ├── order open, ≥ 1 item                                           │
//! │     ├── form fields for the order type                                 │
//! │     ├── payment method exists and is active                            │
//! │     ├── DineIn: table bound                                            │
//! │     ├── Delivery: state ⊃ city ⊃ block, reprice for the city           │
//! │     │                                                                   │
//! │     ▼                                                                   │
//! │  price locally, then one finalize write (Completed)                    │
//! │     ▲── any failure up to here: order untouched                        │
//! │     │                                                                   │
//! │     │   side effects, each non-fatal unless the session is lost:       │
//! │     ├── payment link     (methods that require one)                    │
//! │     ├── print ticket     (checkout.print_on_complete)                  │
//! │     └── release table    (DineIn)                                      │
//! │     │                                                                   │
//! │     ▼                                                                   │
//! │  CheckoutOutcome { order, payment_link, side_effect_failures }         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use bistro_core::checkout::{compose_address, validate_checkout_form};
use bistro_core::{CheckoutForm, City, Order, OrderSnapshot, OrderType, PaymentLink, PaymentMethod, ValidationError};

use crate::error::{EngineError, EngineResult};
use crate::gateway::Gateway;
use crate::services::Service;

/// Post-completion step that may fail without undoing the checkout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SideEffect {
    PaymentLink,
    Print,
    TableRelease,
}

/// A side effect that failed after the order was completed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SideEffectFailure {
    pub effect: SideEffect,
    pub message: String,
}

/// Result of a successful checkout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckoutOutcome {
    /// The completed order, re-fetched after all side effects.
    pub order: Order,
    pub payment_link: Option<PaymentLink>,
    pub side_effect_failures: Vec<SideEffectFailure>,
}

impl CheckoutOutcome {
    pub fn is_clean(&self) -> bool {
        self.side_effect_failures.is_empty()
    }
}

pub struct CheckoutCoordinator {
    gateway: Arc<Gateway>,
    print_on_complete: bool,
}

impl CheckoutCoordinator {
    pub fn new(gateway: Arc<Gateway>, print_on_complete: bool) -> Self {
        CheckoutCoordinator {
            gateway,
            print_on_complete,
        }
    }

    /// Completes an order.
    pub async fn complete(&self, order_id: &str, form: &CheckoutForm) -> EngineResult<CheckoutOutcome> {
        debug!(order_id, payment_method = ?form.payment_method, "complete");

        let mut order = self.gateway.open_order(order_id).await?;
        let lines = self.gateway.lines(order_id).await?;
        if !lines.iter().any(|l| l.qty > 0) {
            return Err(ValidationError::not_allowed("order", "cannot complete an order with no items").into());
        }

        let slug = validate_checkout_form(order.order_type, form)?;
        let method = self.resolve_payment_method(&slug).await?;

        match order.order_type {
            OrderType::DineIn => {
                if order.table_id.is_none() {
                    return Err(ValidationError::required("table").into());
                }
            }
            OrderType::Delivery => {
                let (city, address) = self.resolve_delivery(form).await?;
                order.delivery_city_id = Some(city.id.clone());
                order.delivery_address = Some(address);

                if order.subtotal < city.min_order {
                    info!(
                        order_id,
                        city = %city.name,
                        subtotal = %order.subtotal,
                        min_order = %city.min_order,
                        "Order is below the city minimum"
                    );
                }
            }
            OrderType::Pickup => {}
        }

        // Nothing is written before finalize; the form's city fee is priced locally.
        order.payment_method = Some(method.slug.clone());
        let totals = self.gateway.totals_for(&order, &lines).await?;
        order.apply_totals(&totals);

        let now = Utc::now();
        order.completed_at = Some(now);
        order.updated_at = now;
        let completed = self
            .gateway
            .call(
                Service::Orders,
                "finalize_order",
                self.gateway.services().orders.finalize_order(&order),
            )
            .await?;
        info!(
            order_id,
            number = %completed.number,
            grand_total = %completed.grand_total,
            payment_method = %method.slug,
            "Order completed"
        );

        let mut failures = Vec::new();

        let payment_link = if method.requires_link {
            match self.request_payment_link(&completed, &method).await {
                Ok(link) => Some(link),
                Err(err) if err.is_session_fatal() => return Err(session_lost(order_id, err)),
                Err(err) => {
                    warn!(order_id, error = %err, "Payment link request failed");
                    failures.push(SideEffectFailure {
                        effect: SideEffect::PaymentLink,
                        message: err.to_string(),
                    });
                    None
                }
            }
        } else {
            None
        };

        if self.print_on_complete {
            let snapshot = OrderSnapshot {
                order: completed.clone(),
                lines,
            };
            if let Err(err) = self.print(&snapshot).await {
                if err.is_session_fatal() {
                    return Err(session_lost(order_id, err));
                }
                warn!(order_id, error = %err, "Ticket printing failed");
                failures.push(SideEffectFailure {
                    effect: SideEffect::Print,
                    message: err.to_string(),
                });
            }
        }

        let mut order = completed;
        if order.order_type.requires_table() {
            match self.release_table(&mut order).await {
                Ok(released) => order = released,
                Err(err) if err.is_session_fatal() => return Err(session_lost(order_id, err)),
                Err(err) => {
                    warn!(order_id, error = %err, "Table release after checkout failed");
                    failures.push(SideEffectFailure {
                        effect: SideEffect::TableRelease,
                        message: err.to_string(),
                    });
                }
            }
        }

        Ok(CheckoutOutcome {
            order,
            payment_link,
            side_effect_failures: failures,
        })
    }

    async fn resolve_payment_method(&self, slug: &str) -> EngineResult<PaymentMethod> {
        let methods = self
            .gateway
            .call(
                Service::Payments,
                "list_methods",
                self.gateway.services().payments.list_methods(),
            )
            .await?;

        methods
            .into_iter()
            .find(|m| m.slug == slug && m.is_active)
            .ok_or_else(|| {
                ValidationError::not_allowed("payment_method", format!("{} is not available", slug)).into()
            })
    }

    /// Resolves state ⊃ city ⊃ block and composes the full address line.
    async fn resolve_delivery(&self, form: &CheckoutForm) -> EngineResult<(City, String)> {
        let address = &form.address;
        let geography = &self.gateway.services().geography;

        // Presence was checked by validate_checkout_form.
        let state_id = address.state_id.as_deref().unwrap_or_default().trim();
        let city_id = address.city_id.as_deref().unwrap_or_default().trim();
        let block_id = address.block_id.as_deref().unwrap_or_default().trim();

        let state = self
            .gateway
            .call(Service::Geography, "fetch_state", geography.fetch_state(state_id))
            .await
            .map_err(|e| unresolved("state", e))?;
        let city = self
            .gateway
            .call(Service::Geography, "fetch_city", geography.fetch_city(city_id))
            .await
            .map_err(|e| unresolved("city", e))?;
        let block = self
            .gateway
            .call(Service::Geography, "fetch_block", geography.fetch_block(block_id))
            .await
            .map_err(|e| unresolved("block", e))?;

        if city.state_id != state.id {
            return Err(ValidationError::not_allowed("city", format!("{} is not in {}", city.name, state.name)).into());
        }
        if block.city_id != city.id {
            return Err(ValidationError::not_allowed("block", format!("{} is not in {}", block.name, city.name)).into());
        }

        let street = compose_address(address);
        let full = format!("{}, {}, {}", street, block.name, city.name);
        Ok((city, full))
    }

    async fn request_payment_link(&self, order: &Order, method: &PaymentMethod) -> EngineResult<PaymentLink> {
        self.gateway
            .call(
                Service::Payments,
                "create_payment_link",
                self.gateway.services().payments.create_payment_link(order, method),
            )
            .await
    }

    async fn print(&self, snapshot: &OrderSnapshot) -> EngineResult<()> {
        self.gateway
            .call(
                Service::Printer,
                "print_order",
                self.gateway.services().printer.print_order(snapshot),
            )
            .await
    }

    async fn release_table(&self, order: &mut Order) -> EngineResult<Order> {
        self.gateway.detach_table(order).await?;
        order.updated_at = Utc::now();
        self.gateway.save_order(order).await
    }
}

/// The order is already completed; the operator signs in again and re-fetches it.
fn session_lost(order_id: &str, err: EngineError) -> EngineError {
    error!(order_id, error = %err, "Session lost after the order was completed");
    err
}

/// An unknown geography reference is bad input, not a missing resource.
fn unresolved(field: &str, err: EngineError) -> EngineError {
    match err {
        EngineError::NotFound { id, .. } => {
            ValidationError::not_allowed(field, format!("unknown {} '{}'", field, id)).into()
        }
        other => other,
    }
}
