//! # Order Engine
//!
//! The facade the terminal talks to. It wires the components to one shared
//! [`Gateway`] and hands every fresh snapshot back to the [`OrderRegistry`].
//!
//! ## Wiring
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                            OrderEngine                                  │
//! │                                                                         │
//! │   execute(Command) ──► component ──► Gateway ──► collaborators         │
//! │         │                  │                                            │
//! │         │                  └── fresh snapshot ──► registry.sync()      │
//! │         ▼                                                               │
//! │     Response                                                            │
//! │                                                                         │
//! │   ┌──────────┐ ┌──────────┐ ┌──────────┐ ┌──────────┐ ┌──────────┐     │
//! │   │ Registry │ │  Editor  │ │  Promo   │ │  Tables  │ │ Checkout │     │
//! │   └──────────┘ └──────────┘ └──────────┘ └──────────┘ └──────────┘     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::sync::Arc;

use tokio::sync::watch;
use tracing::{debug, warn};

use bistro_core::{CheckoutForm, Order, OrderSnapshot, OrderType, SelectedAddon, TableInfo};

use crate::checkout::{CheckoutCoordinator, CheckoutOutcome};
use crate::command::{Command, ErrorPayload, Response};
use crate::config::EngineConfig;
use crate::editor::OrderLineEditor;
use crate::error::EngineResult;
use crate::gateway::Gateway;
use crate::promo::PromoEngine;
use crate::registry::OrderRegistry;
use crate::services::Services;
use crate::session::{SessionContext, SessionGuard, SessionStatus};
use crate::tables::TableAssignmentManager;

pub struct OrderEngine {
    gateway: Arc<Gateway>,
    default_order_type: OrderType,
    registry: OrderRegistry,
    editor: OrderLineEditor,
    promos: PromoEngine,
    tables: TableAssignmentManager,
    checkout: CheckoutCoordinator,
}

impl OrderEngine {
    pub fn new(config: &EngineConfig, services: Services, session: SessionContext) -> Self {
        let gateway = Arc::new(Gateway::new(
            services,
            SessionGuard::new(),
            config.request_timeout(),
        ));

        OrderEngine {
            registry: OrderRegistry::new(gateway.clone(), session, config.terminal.order_prefix.clone()),
            editor: OrderLineEditor::new(gateway.clone()),
            promos: PromoEngine::new(gateway.clone()),
            tables: TableAssignmentManager::new(gateway.clone()),
            checkout: CheckoutCoordinator::new(gateway.clone(), config.checkout.print_on_complete),
            default_order_type: config.terminal.default_order_type,
            gateway,
        }
    }

    // =========================================================================
    // Session
    // =========================================================================

    pub fn session(&self) -> &SessionContext {
        self.registry.session()
    }

    pub fn session_guard(&self) -> &SessionGuard {
        self.gateway.session()
    }

    /// Observes session invalidation (and reactivation).
    pub fn subscribe_session(&self) -> watch::Receiver<SessionStatus> {
        self.gateway.session().subscribe()
    }

    // =========================================================================
    // Orders
    // =========================================================================

    pub async fn start_order(&self, order_type: Option<OrderType>) -> EngineResult<Order> {
        self.registry
            .start_order(order_type.unwrap_or(self.default_order_type))
            .await
    }

    pub async fn get_order(&self, order_id: &str) -> EngineResult<OrderSnapshot> {
        self.registry.get_order(order_id).await
    }

    pub async fn select_order(&self, order_id: &str) -> EngineResult<OrderSnapshot> {
        self.registry.select_order(order_id).await
    }

    pub async fn list_active_orders(&self) -> EngineResult<Vec<Order>> {
        self.registry.list_active_orders().await
    }

    pub async fn refresh_current(&self) -> EngineResult<Option<OrderSnapshot>> {
        self.registry.refresh_current().await
    }

    pub fn current(&self) -> Option<OrderSnapshot> {
        self.registry.current()
    }

    pub async fn set_order_type(&self, order_id: &str, order_type: OrderType) -> EngineResult<OrderSnapshot> {
        let snapshot = self.registry.set_order_type(order_id, order_type).await?;
        self.registry.sync(&snapshot);
        Ok(snapshot)
    }

    pub async fn set_delivery_city(&self, order_id: &str, city_id: &str) -> EngineResult<OrderSnapshot> {
        let snapshot = self.registry.set_delivery_city(order_id, city_id).await?;
        self.registry.sync(&snapshot);
        Ok(snapshot)
    }

    pub async fn close_order(&self, order_id: &str) -> EngineResult<Order> {
        self.registry.close_order(order_id).await
    }

    pub async fn cancel_order(&self, order_id: &str) -> EngineResult<Order> {
        self.registry.cancel_order(order_id).await
    }

    // =========================================================================
    // Lines
    // =========================================================================

    pub async fn add_line(
        &self,
        order_id: &str,
        item_id: &str,
        qty: i64,
        addons: &[SelectedAddon],
    ) -> EngineResult<OrderSnapshot> {
        let snapshot = self.editor.add_line(order_id, item_id, qty, addons).await?;
        self.registry.sync(&snapshot);
        Ok(snapshot)
    }

    pub async fn set_line_qty(&self, line_id: &str, qty: i64) -> EngineResult<OrderSnapshot> {
        let snapshot = self.editor.set_line_qty(line_id, qty).await?;
        self.registry.sync(&snapshot);
        Ok(snapshot)
    }

    pub async fn remove_line(&self, line_id: &str) -> EngineResult<OrderSnapshot> {
        let snapshot = self.editor.remove_line(line_id).await?;
        self.registry.sync(&snapshot);
        Ok(snapshot)
    }

    // =========================================================================
    // Promo
    // =========================================================================

    pub async fn apply_promo(&self, order_id: &str, code: &str) -> EngineResult<Order> {
        let order = self.promos.apply_promo(order_id, code).await?;
        self.registry.sync_order(&order);
        Ok(order)
    }

    pub async fn remove_promo(&self, order_id: &str) -> EngineResult<Order> {
        let order = self.promos.remove_promo(order_id).await?;
        self.registry.sync_order(&order);
        Ok(order)
    }

    // =========================================================================
    // Tables
    // =========================================================================

    pub async fn list_tables(&self) -> EngineResult<Vec<TableInfo>> {
        self.tables.list_tables().await
    }

    pub async fn assign_table(&self, order_id: &str, table_id: &str, covers: u32) -> EngineResult<Order> {
        let order = self.tables.assign_table(order_id, table_id, covers).await?;
        self.registry.sync_order(&order);
        Ok(order)
    }

    pub async fn clear_table(&self, order_id: &str) -> EngineResult<Order> {
        let order = self.tables.clear_table(order_id).await?;
        self.registry.sync_order(&order);
        Ok(order)
    }

    pub async fn release_table(&self, order_id: &str) -> EngineResult<Order> {
        let order = self.tables.release_table(order_id).await?;
        self.registry.sync_order(&order);
        Ok(order)
    }

    // =========================================================================
    // Checkout
    // =========================================================================

    pub async fn complete_order(&self, order_id: &str, form: &CheckoutForm) -> EngineResult<CheckoutOutcome> {
        let outcome = self.checkout.complete(order_id, form).await?;
        self.registry.sync_order(&outcome.order);
        Ok(outcome)
    }

    // =========================================================================
    // Command Dispatch
    // =========================================================================

    /// Runs one command.
    pub async fn execute(&self, command: Command) -> EngineResult<Response> {
        debug!(command = command.name(), "execute");

        let response = match command {
            Command::StartOrder { order_type } => Response::Order(self.start_order(order_type).await?),
            Command::GetOrder { order_id } => Response::Snapshot(self.get_order(&order_id).await?),
            Command::SelectOrder { order_id } => Response::Snapshot(self.select_order(&order_id).await?),
            Command::ListActiveOrders => Response::Orders(self.list_active_orders().await?),
            Command::SetOrderType {
                order_id,
                order_type,
            } => Response::Snapshot(self.set_order_type(&order_id, order_type).await?),
            Command::SetDeliveryCity { order_id, city_id } => {
                Response::Snapshot(self.set_delivery_city(&order_id, &city_id).await?)
            }
            Command::CloseOrder { order_id } => {
                self.close_order(&order_id).await?;
                Response::Ack { order_id }
            }
            Command::CancelOrder { order_id } => {
                self.cancel_order(&order_id).await?;
                Response::Ack { order_id }
            }
            Command::AddLine {
                order_id,
                item_id,
                qty,
                addons,
            } => Response::Snapshot(self.add_line(&order_id, &item_id, qty, &addons).await?),
            Command::SetLineQty { line_id, qty } => Response::Snapshot(self.set_line_qty(&line_id, qty).await?),
            Command::RemoveLine { line_id } => Response::Snapshot(self.remove_line(&line_id).await?),
            Command::ApplyPromo { order_id, code } => Response::Order(self.apply_promo(&order_id, &code).await?),
            Command::RemovePromo { order_id } => Response::Order(self.remove_promo(&order_id).await?),
            Command::ListTables => Response::Tables(self.list_tables().await?),
            Command::AssignTable {
                order_id,
                table_id,
                covers,
            } => Response::Order(self.assign_table(&order_id, &table_id, covers).await?),
            Command::ClearTable { order_id } => Response::Order(self.clear_table(&order_id).await?),
            Command::ReleaseTable { order_id } => Response::Order(self.release_table(&order_id).await?),
            Command::CompleteOrder { order_id, form } => {
                Response::Checkout(self.complete_order(&order_id, &form).await?)
            }
        };

        Ok(response)
    }

    /// Runs one command, folding failures into [`Response::Error`].
    pub async fn handle(&self, command: Command) -> Response {
        let name = command.name();
        match self.execute(command).await {
            Ok(response) => response,
            Err(err) => {
                if err.is_session_fatal() {
                    warn!(command = name, error = %err, "Command failed, session invalidated");
                } else {
                    debug!(command = name, error = %err, "Command failed");
                }
                Response::Error(ErrorPayload::from(&err))
            }
        }
    }
}
