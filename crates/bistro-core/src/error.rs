//! # Error Types
//!
//! Domain-specific error types for bistro-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  bistro-core errors (this file)                                        │
//! │  ├── CoreError        - Order-state rule violations                    │
//! │  └── ValidationError  - Input / constraint failures                    │
//! │                                                                         │
//! │  bistro-engine errors (separate crate)                                 │
//! │  └── EngineError      - What the terminal sees: Validation, Conflict,  │
//! │                         NotFound, ExternalService, Authentication      │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → EngineError → Terminal UI         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Principles
//! 1. Use `thiserror` for derive macros (not manual impl)
//! 2. Include context in error messages (group name, limits, field)
//! 3. Errors are enum variants, never String
//! 4. A ValidationError never implies a partial mutation

use thiserror::Error;

use crate::types::OrderStatus;

// =============================================================================
// Core Error
// =============================================================================

/// Order-state rule violations.
///
/// These are detected against an already-fetched snapshot, before any
/// mutation is sent to the backend.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CoreError {
    /// Order is not in a state that allows the requested operation.
    ///
    /// ## When This Occurs
    /// - Adding a line to a completed order
    /// - Applying a promo to a cancelled order
    /// - Checking out an order twice
    #[error("Order {order_id} is {status}, cannot perform operation")]
    OrderNotOpen { order_id: String, status: OrderStatus },

    /// Order has reached the maximum number of lines.
    #[error("Order cannot have more than {max} lines")]
    TooManyLines { max: usize },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// Raised before any backend mutation; the operation has no effect.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Invalid format (e.g., malformed amount).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// A required add-on group received no selection.
    ///
    /// ## User Workflow
    /// ```text
    /// Add "Burger" with no "Cooking level" chosen
    ///      │
    ///      ▼
    /// AddonGroupRequired { group: "Cooking level" }
    ///      │
    ///      ▼
    /// UI: "Cooking level: select at least one option"
    /// ```
    #[error("{group}: select at least one option")]
    AddonGroupRequired { group_id: String, group: String },

    /// An add-on group received more selections than it allows.
    #[error("{group}: at most {max} option(s) allowed, {selected} selected")]
    AddonGroupLimit {
        group_id: String,
        group: String,
        max: u32,
        selected: u64,
    },

    /// Selected add-on does not exist on the item (or not in the named group).
    #[error("Add-on {addon_id} is not available in group {group_id}")]
    UnknownAddon { addon_id: String, group_id: String },

    /// Promo code rejected. The message is intentionally uniform.
    #[error("invalid or expired promo code")]
    InvalidPromo,

    /// Value is not allowed in the current context.
    #[error("{field}: {reason}")]
    NotAllowed { field: String, reason: String },
}

impl ValidationError {
    /// Creates a Required error for a field.
    pub fn required(field: impl Into<String>) -> Self {
        ValidationError::Required {
            field: field.into(),
        }
    }

    /// Creates a NotAllowed error.
    pub fn not_allowed(field: impl Into<String>, reason: impl Into<String>) -> Self {
        ValidationError::NotAllowed {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_addon_error_messages_name_the_group() {
        let err = ValidationError::AddonGroupRequired {
            group_id: "g-1".to_string(),
            group: "Cooking level".to_string(),
        };
        assert_eq!(err.to_string(), "Cooking level: select at least one option");

        let err = ValidationError::AddonGroupLimit {
            group_id: "g-2".to_string(),
            group: "Sauces".to_string(),
            max: 2,
            selected: 3,
        };
        assert_eq!(
            err.to_string(),
            "Sauces: at most 2 option(s) allowed, 3 selected"
        );
    }

    #[test]
    fn test_promo_message_is_uniform() {
        assert_eq!(
            ValidationError::InvalidPromo.to_string(),
            "invalid or expired promo code"
        );
    }

    #[test]
    fn test_order_not_open_message() {
        let err = CoreError::OrderNotOpen {
            order_id: "o-1".to_string(),
            status: OrderStatus::Completed,
        };
        assert_eq!(
            err.to_string(),
            "Order o-1 is completed, cannot perform operation"
        );
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let core_err: CoreError = ValidationError::required("payment_method").into();
        assert!(matches!(core_err, CoreError::Validation(_)));
    }
}
