//! # Engine Error Types
//!
//! What a terminal sees when an operation fails.
//!
//! ## Error Categories
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Engine Error Categories                            │
//! │                                                                         │
//! │  ┌─────────────────┐  ┌─────────────────┐  ┌─────────────────────────┐ │
//! │  │  Operator input │  │  Shared state   │  │  Collaborators          │ │
//! │  │                 │  │                 │  │                         │ │
//! │  │  Validation     │  │  Conflict       │  │  ExternalService        │ │
//! │  │                 │  │  NotFound       │  │  Timeout                │ │
//! │  │                 │  │                 │  │  Backend                │ │
//! │  └─────────────────┘  └─────────────────┘  └─────────────────────────┘ │
//! │                                                                         │
//! │  ┌─────────────────┐  ┌─────────────────┐                              │
//! │  │  Session        │  │  Configuration  │                              │
//! │  │                 │  │                 │                              │
//! │  │  Authentication │  │  Config         │                              │
//! │  └─────────────────┘  └─────────────────┘                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Only `Authentication` ends the session. Everything else leaves the
//! terminal usable, though `Conflict`, `NotFound`, `Timeout` and `Backend`
//! mean the caller's view may be stale.

use bistro_core::{CoreError, OrderStatus, ValidationError};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

// =============================================================================
// Conflict
// =============================================================================

/// Shared-state conflicts: the request was well-formed but the world moved.
#[derive(Debug, Error, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Conflict {
    /// The session already has an open order with no items.
    ///
    /// The caller can select `order_id` instead of starting another.
    #[error("open order with no items already exists ({order_id})")]
    EmptyOrderExists { order_id: String },

    /// Table is reserved or held by another order.
    #[error("table {table_id} is not available")]
    TableOccupied {
        table_id: String,
        held_by: Option<String>,
    },

    /// Order is no longer open.
    #[error("order {order_id} is {status}")]
    OrderNotOpen { order_id: String, status: OrderStatus },

    /// The table cannot be detached from an order that already has items.
    #[error("cannot detach table from order {order_id}: it has items")]
    TableInUse { order_id: String },

    /// An open order with items must be checked out before its table is released.
    #[error("order {order_id} must be checked out before releasing its table")]
    CheckoutRequired { order_id: String },
}

// =============================================================================
// Engine Error
// =============================================================================

/// Engine error type covering every operation failure.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// Operator input rejected; nothing was changed.
    #[error("{0}")]
    Validation(#[from] ValidationError),

    /// Shared state prevented the operation; nothing was changed.
    #[error("{0}")]
    Conflict(#[from] Conflict),

    /// Referenced entity does not exist (any more).
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// A side-effect collaborator (payments, printing, ...) failed.
    #[error("{service} failed: {message}")]
    ExternalService { service: String, message: String },

    /// The session is no longer authorized. Re-authenticate to continue.
    #[error("session is not authorized: {0}")]
    Authentication(String),

    /// A collaborator did not answer in time.
    #[error("{operation} timed out")]
    Timeout { operation: String },

    /// The order backend is unavailable or failed internally.
    #[error("backend error: {0}")]
    Backend(String),

    /// Configuration could not be loaded, saved or validated.
    #[error("configuration error: {0}")]
    Config(String),
}

impl EngineError {
    /// Creates a not found error.
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        EngineError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    /// Creates an external service error.
    pub fn external(service: impl Into<String>, message: impl Into<String>) -> Self {
        EngineError::ExternalService {
            service: service.into(),
            message: message.into(),
        }
    }

    /// Returns true if the terminal can keep working after this error.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, EngineError::Authentication(_) | EngineError::Config(_))
    }

    /// Returns true if the session must re-authenticate.
    pub fn is_session_fatal(&self) -> bool {
        matches!(self, EngineError::Authentication(_))
    }

    /// Returns true if the caller should re-fetch authoritative state.
    pub fn requires_refetch(&self) -> bool {
        matches!(
            self,
            EngineError::Conflict(_)
                | EngineError::NotFound { .. }
                | EngineError::Timeout { .. }
                | EngineError::Backend(_)
        )
    }
}

// =============================================================================
// Error Conversions
// =============================================================================

impl From<CoreError> for EngineError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::OrderNotOpen { order_id, status } => {
                EngineError::Conflict(Conflict::OrderNotOpen { order_id, status })
            }
            CoreError::TooManyLines { max } => EngineError::Validation(ValidationError::OutOfRange {
                field: "order lines".to_string(),
                min: 0,
                max: max as i64,
            }),
            CoreError::Validation(e) => EngineError::Validation(e),
        }
    }
}

impl From<std::io::Error> for EngineError {
    fn from(err: std::io::Error) -> Self {
        EngineError::Config(err.to_string())
    }
}

impl From<toml::de::Error> for EngineError {
    fn from(err: toml::de::Error) -> Self {
        EngineError::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for EngineError {
    fn from(err: toml::ser::Error) -> Self {
        EngineError::Config(err.to_string())
    }
}
