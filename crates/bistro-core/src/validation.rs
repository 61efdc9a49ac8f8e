//! # Validation Module
//!
//! Input validation for operator commands, run before any backend call.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Command deserialization                                      │
//! │  └── Type validation (serde)                                           │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE                                                  │
//! │  ├── Quantity / covers ranges                                          │
//! │  └── Identifier and promo-code shape                                   │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Backend                                                      │
//! │  ├── Referenced entities exist                                         │
//! │  └── Atomic table claim                                                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use bistro_core::validation::{validate_add_quantity, validate_covers};
//!
//! validate_add_quantity(2).unwrap();
//! validate_covers(4).unwrap();
//! ```

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::{MAX_COVERS, MAX_LINES_PER_ORDER, MAX_LINE_QUANTITY, MAX_PROMO_CODE_LEN};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates the quantity of a line being added.
///
/// ## Rules
/// - Must be at least 1
/// - Must not exceed MAX_LINE_QUANTITY (999)
pub fn validate_add_quantity(qty: i64) -> ValidationResult<()> {
    if !(1..=MAX_LINE_QUANTITY).contains(&qty) {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: MAX_LINE_QUANTITY,
        });
    }

    Ok(())
}

/// Validates a new quantity for an existing line.
///
/// ## Rules
/// - Zero is allowed (removes the line)
/// - Must not exceed MAX_LINE_QUANTITY (999)
///
/// ## Example
/// ```rust
/// use bistro_core::validation::validate_line_quantity;
///
/// assert!(validate_line_quantity(0).is_ok());
/// assert!(validate_line_quantity(-1).is_err());
/// ```
pub fn validate_line_quantity(qty: i64) -> ValidationResult<()> {
    if !(0..=MAX_LINE_QUANTITY).contains(&qty) {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 0,
            max: MAX_LINE_QUANTITY,
        });
    }

    Ok(())
}

/// Validates the number of guests seated at a table.
pub fn validate_covers(covers: u32) -> ValidationResult<()> {
    if covers == 0 || covers > MAX_COVERS {
        return Err(ValidationError::OutOfRange {
            field: "covers".to_string(),
            min: 1,
            max: MAX_COVERS as i64,
        });
    }

    Ok(())
}

// =============================================================================
// Collection Validators
// =============================================================================

/// Checks that another line fits on the order.
///
/// ## Rules
/// - Must not exceed MAX_LINES_PER_ORDER (100)
pub fn ensure_line_capacity(current_lines: usize) -> CoreResult<()> {
    if current_lines >= MAX_LINES_PER_ORDER {
        return Err(CoreError::TooManyLines {
            max: MAX_LINES_PER_ORDER,
        });
    }

    Ok(())
}

// =============================================================================
// String Validators
// =============================================================================

/// Validates an operator-typed promo code.
///
/// ## Returns
/// The normalized (trimmed, upper case) code.
///
/// ## Example
/// ```rust
/// use bistro_core::validation::validate_promo_code;
///
/// assert_eq!(validate_promo_code(" save10 ").unwrap(), "SAVE10");
/// assert!(validate_promo_code("   ").is_err());
/// ```
pub fn validate_promo_code(code: &str) -> ValidationResult<String> {
    let code = crate::promo::normalize_code(code);

    if code.is_empty() {
        return Err(ValidationError::required("promo code"));
    }

    if code.len() > MAX_PROMO_CODE_LEN {
        return Err(ValidationError::TooLong {
            field: "promo code".to_string(),
            max: MAX_PROMO_CODE_LEN,
        });
    }

    Ok(code)
}

/// Validates that an identifier is present.
///
/// Identifiers are opaque to the engine; only emptiness is checked.
pub fn validate_id(field: &str, id: &str) -> ValidationResult<()> {
    if id.trim().is_empty() {
        return Err(ValidationError::required(field));
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
