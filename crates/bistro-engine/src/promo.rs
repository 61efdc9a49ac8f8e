//! # Promo Engine
//!
//! Attaches and detaches promo codes, repricing the order each time.
//!
//! Every rejection is reported as the same `invalid or expired promo code`
//! validation error; the concrete reason is only logged at debug level.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info};

use bistro_core::pricing;
use bistro_core::validation::validate_promo_code;
use bistro_core::{Order, ValidationError};

use crate::error::EngineResult;
use crate::gateway::Gateway;
use crate::services::Service;

pub struct PromoEngine {
    gateway: Arc<Gateway>,
}

impl PromoEngine {
    pub fn new(gateway: Arc<Gateway>) -> Self {
        PromoEngine { gateway }
    }

    /// Applies a promo code, replacing any promo already attached.
    pub async fn apply_promo(&self, order_id: &str, code: &str) -> EngineResult<Order> {
        debug!(order_id, code, "apply_promo");

        let code = match validate_promo_code(code) {
            Ok(code) => code,
            Err(reason) => {
                debug!(order_id, %reason, "Promo rejected");
                return Err(ValidationError::InvalidPromo.into());
            }
        };

        let mut order = self.gateway.open_order(order_id).await?;
        let lines = self.gateway.lines(order_id).await?;
        let subtotal = pricing::subtotal(&lines);

        let promo = self
            .gateway
            .call(
                Service::Promos,
                "find_promo",
                self.gateway.services().promos.find_promo(&code),
            )
            .await?;

        let promo = match promo {
            Some(promo) => promo,
            None => {
                debug!(order_id, code = %code, reason = "unknown code", "Promo rejected");
                return Err(ValidationError::InvalidPromo.into());
            }
        };

        if let Err(reason) = promo.check_eligibility(subtotal, Utc::now()) {
            debug!(order_id, code = %code, %reason, "Promo rejected");
            return Err(ValidationError::InvalidPromo.into());
        }

        if order.promocode.as_deref() != Some(promo.code.as_str()) {
            if let Some(previous) = &order.promocode {
                debug!(order_id, previous = %previous, "Replacing attached promo");
            }
            order.promocode = Some(promo.code.clone());
            order.updated_at = Utc::now();
            self.gateway.save_order(&order).await?;
        }

        let snapshot = self.gateway.reprice(order_id).await?;
        info!(
            order_id,
            code = %promo.code,
            discount = %snapshot.order.discount_total,
            "Promo applied"
        );
        Ok(snapshot.order)
    }

    /// Detaches the promo, if any, and reprices.
    pub async fn remove_promo(&self, order_id: &str) -> EngineResult<Order> {
        debug!(order_id, "remove_promo");
        let mut order = self.gateway.open_order(order_id).await?;

        let Some(code) = order.promocode.take() else {
            return Ok(order);
        };

        order.updated_at = Utc::now();
        self.gateway.save_order(&order).await?;
        info!(order_id, code = %code, "Promo removed");

        Ok(self.gateway.reprice(order_id).await?.order)
    }
}
