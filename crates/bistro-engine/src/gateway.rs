//! # Collaborator Gateway
//!
//! Every call the engine makes to a collaborator goes through [`Gateway::call`].
//!
//! ## Call Pipeline
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  call(service, operation, future)                                      │
//! │       │                                                                 │
//! │       ├── session invalidated?  → Authentication (no call made)        │
//! │       │                                                                 │
//! │       ├── timeout expired?      → Timeout { operation }                │
//! │       │                                                                 │
//! │       └── BackendError mapping:                                        │
//! │             NotFound      → NotFound                                   │
//! │             Conflict      → Conflict                                   │
//! │             Unauthorized  → invalidate session, Authentication         │
//! │             Unavailable   → Backend        (order service)             │
//! │                             ExternalService (everything else)          │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! It also hosts the read-modify-write helpers shared by every component,
//! most importantly [`Gateway::reprice`].

use std::future::Future;
use std::time::Duration;

use chrono::Utc;
use tokio::time::timeout;
use tracing::{debug, error, info, warn};

use bistro_core::pricing;
use bistro_core::{Order, OrderLine, OrderSnapshot};

use crate::backend::{BackendError, BackendResult};
use crate::error::{EngineError, EngineResult};
use crate::services::{Service, Services};
use crate::session::SessionGuard;

pub struct Gateway {
    services: Services,
    session: SessionGuard,
    request_timeout: Duration,
}

impl Gateway {
    pub fn new(services: Services, session: SessionGuard, request_timeout: Duration) -> Self {
        Gateway {
            services,
            session,
            request_timeout,
        }
    }

    pub fn services(&self) -> &Services {
        &self.services
    }

    pub fn session(&self) -> &SessionGuard {
        &self.session
    }

    /// Runs one collaborator call with the session check, timeout and error
    /// mapping applied.
    pub async fn call<T, F>(&self, service: Service, operation: &'static str, fut: F) -> EngineResult<T>
    where
        F: Future<Output = BackendResult<T>>,
    {
        self.session.ensure_active()?;

        match timeout(self.request_timeout, fut).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(err)) => Err(self.map_error(service, operation, err)),
            Err(_) => {
                warn!(%service, operation, timeout_ms = self.request_timeout.as_millis() as u64, "Collaborator call timed out");
                Err(EngineError::Timeout {
                    operation: operation.to_string(),
                })
            }
        }
    }

    fn map_error(&self, service: Service, operation: &'static str, err: BackendError) -> EngineError {
        match err {
            BackendError::NotFound { entity, id } => EngineError::NotFound { entity, id },
            BackendError::Conflict(conflict) => {
                debug!(%service, operation, %conflict, "Collaborator reported conflict");
                EngineError::Conflict(conflict)
            }
            BackendError::Unauthorized(reason) => {
                self.session.invalidate(reason.clone());
                EngineError::Authentication(reason)
            }
            BackendError::Unavailable(message) => match service {
                Service::Orders => {
                    error!(operation, %message, "Order backend failed");
                    EngineError::Backend(message)
                }
                other => EngineError::external(other.to_string(), message),
            },
        }
    }

    // =========================================================================
    // Order Helpers
    // =========================================================================

    pub async fn fetch_order(&self, order_id: &str) -> EngineResult<Order> {
        self.call(Service::Orders, "fetch_order", self.services.orders.fetch_order(order_id))
            .await
    }

    /// Fetches an order and fails with `Conflict` unless it is still open.
    pub async fn open_order(&self, order_id: &str) -> EngineResult<Order> {
        let order = self.fetch_order(order_id).await?;
        order.ensure_open()?;
        Ok(order)
    }

    pub async fn lines(&self, order_id: &str) -> EngineResult<Vec<OrderLine>> {
        self.call(Service::Orders, "list_lines", self.services.orders.list_lines(order_id))
            .await
    }

    /// Fetches the authoritative `{order, lines}` pair.
    pub async fn snapshot(&self, order_id: &str) -> EngineResult<OrderSnapshot> {
        let order = self.fetch_order(order_id).await?;
        let lines = self.lines(order_id).await?;
        Ok(OrderSnapshot { order, lines })
    }

    pub async fn save_order(&self, order: &Order) -> EngineResult<Order> {
        self.call(Service::Orders, "save_order", self.services.orders.save_order(order))
            .await
    }

    /// Recomputes totals from the authoritative lines and persists them.
    ///
    /// The header is only written when the totals changed, so repeating a
    /// mutation yields the same snapshot.
    pub async fn reprice(&self, order_id: &str) -> EngineResult<OrderSnapshot> {
        let OrderSnapshot { mut order, lines } = self.snapshot(order_id).await?;

        let totals = self.totals_for(&order, &lines).await?;
        if totals != order.totals() {
            debug!(
                order_id,
                subtotal = %totals.subtotal,
                discount = %totals.discount_total,
                delivery_fee = %totals.delivery_fee,
                grand_total = %totals.grand_total,
                "Order repriced"
            );
            order.apply_totals(&totals);
            order.updated_at = Utc::now();
            order = self.save_order(&order).await?;
        }

        Ok(OrderSnapshot { order, lines })
    }

    /// Prices a header against its lines without writing anything.
    ///
    /// Resolves the attached promo and, for delivery, the header's city fee.
    pub async fn totals_for(&self, order: &Order, lines: &[OrderLine]) -> EngineResult<pricing::Totals> {
        let order_id = order.id.as_str();
        let promo = match &order.promocode {
            Some(code) => {
                let promo = self
                    .call(Service::Promos, "find_promo", self.services.promos.find_promo(code))
                    .await?;
                if promo.is_none() {
                    warn!(order_id, code = %code, "Attached promo no longer exists, no discount applied");
                }
                promo
            }
            None => None,
        };

        let delivery_fee = match (&order.delivery_city_id, order.order_type.charges_delivery()) {
            (Some(city_id), true) => Some(
                self.call(Service::Geography, "fetch_city", self.services.geography.fetch_city(city_id))
                    .await?
                    .delivery_fee,
            ),
            _ => None,
        };

        Ok(pricing::compute(order.order_type, lines, promo.as_ref(), delivery_fee))
    }

    /// Frees the order's table (if any) and clears `table_id`/`covers` on the
    /// in-memory header. The caller persists the header.
    pub async fn detach_table(&self, order: &mut Order) -> EngineResult<()> {
        if let Some(table_id) = order.table_id.clone() {
            self.call(
                Service::Orders,
                "vacate_table",
                self.services.orders.vacate_table(&table_id, &order.id),
            )
            .await?;
            info!(order_id = %order.id, table_id = %table_id, "Table vacated");
        }
        order.table_id = None;
        order.covers = None;
        Ok(())
    }
}
