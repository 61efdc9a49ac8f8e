//! # Command Surface
//!
//! Typed requests the terminal sends to the engine and the responses it
//! gets back.
//!
//! ## Wire Format
//! Both enums are adjacently tagged:
//! ```json
//! { "type": "AddLine", "payload": { "order_id": "...", "item_id": "burger", "qty": 2 } }
//! { "type": "Snapshot", "payload": { "order": { ... }, "lines": [ ... ] } }
//! { "type": "Error", "payload": { "code": "CONFLICT", "message": "...", "recoverable": true } }
//! ```
//!
//! ## Command → Response
//! ```text
//! ┌──────────────────────────────────────┬──────────────────────────────────┐
//! │ StartOrder                           │ Order                            │
//! │ GetOrder / SelectOrder               │ Snapshot                         │
//! │ ListActiveOrders                     │ Orders                           │
//! │ SetOrderType / SetDeliveryCity       │ Snapshot                         │
//! │ AddLine / SetLineQty / RemoveLine    │ Snapshot                         │
//! │ ApplyPromo / RemovePromo             │ Order                            │
//! │ ListTables                           │ Tables                           │
//! │ AssignTable / ClearTable /           │ Order                            │
//! │   ReleaseTable                       │                                  │
//! │ CompleteOrder                        │ Checkout                         │
//! │ CloseOrder / CancelOrder             │ Ack                              │
//! │ (any failure)                        │ Error                            │
//! └──────────────────────────────────────┴──────────────────────────────────┘
//! ```

use serde::{Deserialize, Serialize};

use bistro_core::{CheckoutForm, Order, OrderSnapshot, OrderType, SelectedAddon, TableInfo, ValidationError};

use crate::checkout::CheckoutOutcome;
use crate::error::EngineError;

/// Every operation the engine exposes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum Command {
    // =========================================================================
    // Orders
    // =========================================================================
    StartOrder {
        #[serde(default)]
        order_type: Option<OrderType>,
    },
    GetOrder {
        order_id: String,
    },
    SelectOrder {
        order_id: String,
    },
    ListActiveOrders,
    SetOrderType {
        order_id: String,
        order_type: OrderType,
    },
    SetDeliveryCity {
        order_id: String,
        city_id: String,
    },
    CloseOrder {
        order_id: String,
    },
    CancelOrder {
        order_id: String,
    },

    // =========================================================================
    // Lines
    // =========================================================================
    AddLine {
        order_id: String,
        item_id: String,
        qty: i64,
        #[serde(default)]
        addons: Vec<SelectedAddon>,
    },
    SetLineQty {
        line_id: String,
        qty: i64,
    },
    RemoveLine {
        line_id: String,
    },

    // =========================================================================
    // Promo
    // =========================================================================
    ApplyPromo {
        order_id: String,
        code: String,
    },
    RemovePromo {
        order_id: String,
    },

    // =========================================================================
    // Tables
    // =========================================================================
    ListTables,
    AssignTable {
        order_id: String,
        table_id: String,
        covers: u32,
    },
    ClearTable {
        order_id: String,
    },
    ReleaseTable {
        order_id: String,
    },

    // =========================================================================
    // Checkout
    // =========================================================================
    CompleteOrder {
        order_id: String,
        form: CheckoutForm,
    },
}

impl Command {
    /// Short operation name for logs.
    pub fn name(&self) -> &'static str {
        match self {
            Command::StartOrder { .. } => "start_order",
            Command::GetOrder { .. } => "get_order",
            Command::SelectOrder { .. } => "select_order",
            Command::ListActiveOrders => "list_active_orders",
            Command::SetOrderType { .. } => "set_order_type",
            Command::SetDeliveryCity { .. } => "set_delivery_city",
            Command::CloseOrder { .. } => "close_order",
            Command::CancelOrder { .. } => "cancel_order",
            Command::AddLine { .. } => "add_line",
            Command::SetLineQty { .. } => "set_line_qty",
            Command::RemoveLine { .. } => "remove_line",
            Command::ApplyPromo { .. } => "apply_promo",
            Command::RemovePromo { .. } => "remove_promo",
            Command::ListTables => "list_tables",
            Command::AssignTable { .. } => "assign_table",
            Command::ClearTable { .. } => "clear_table",
            Command::ReleaseTable { .. } => "release_table",
            Command::CompleteOrder { .. } => "complete_order",
        }
    }
}

/// What the engine answers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum Response {
    Order(Order),
    Snapshot(OrderSnapshot),
    Orders(Vec<Order>),
    Tables(Vec<TableInfo>),
    Checkout(CheckoutOutcome),
    Ack { order_id: String },
    Error(ErrorPayload),
}

impl Response {
    /// Answer for an input line that did not parse as a [`Command`].
    pub fn unreadable_command(reason: impl Into<String>) -> Self {
        let err = EngineError::from(ValidationError::InvalidFormat {
            field: "command".to_string(),
            reason: reason.into(),
        });
        Response::Error(ErrorPayload::from(&err))
    }
}

// =============================================================================
// Error Payload
// =============================================================================

/// Machine-readable error category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    ValidationError,
    Conflict,
    NotFound,
    ExternalService,
    Unauthenticated,
    Timeout,
    BackendError,
    ConfigError,
}

/// Error as the terminal receives it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorPayload {
    pub code: ErrorCode,
    pub message: String,
    /// False when the operator must re-authenticate.
    pub recoverable: bool,
    /// True when the terminal should re-fetch the orders it shows.
    pub refetch: bool,
}

impl From<&EngineError> for ErrorPayload {
    fn from(err: &EngineError) -> Self {
        let code = match err {
            EngineError::Validation(_) => ErrorCode::ValidationError,
            EngineError::Conflict(_) => ErrorCode::Conflict,
            EngineError::NotFound { .. } => ErrorCode::NotFound,
            EngineError::ExternalService { .. } => ErrorCode::ExternalService,
            EngineError::Authentication(_) => ErrorCode::Unauthenticated,
            EngineError::Timeout { .. } => ErrorCode::Timeout,
            EngineError::Backend(_) => ErrorCode::BackendError,
            EngineError::Config(_) => ErrorCode::ConfigError,
        };

        ErrorPayload {
            code,
            message: err.to_string(),
            recoverable: err.is_recoverable(),
            refetch: err.requires_refetch(),
        }
    }
}
