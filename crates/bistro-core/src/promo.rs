//! # Promo Rules
//!
//! Promo definitions and the eligibility/discount rules the PromoEngine
//! applies.
//!
//! ## Eligibility Checks (in order)
//! ```text
//! applyPromo("  save10 ")
//!      │
//!      ▼
//! normalize_code ──► "SAVE10"
//!      │
//!      ├── !active               → Inactive
//!      ├── now < starts_at       → NotStarted
//!      ├── now > ends_at         → Expired
//!      ├── subtotal < min_total  → BelowMinimum
//!      │
//!      └── OK → discount_for(subtotal)
//! ```
//!
//! Every rejection reaches the operator as the same
//! `"invalid or expired promo code"` message; the specific reason is only
//! logged.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use ts_rs::TS;

use crate::money::{Money, Percentage};

/// How a promo computes its discount.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum PromoDiscount {
    /// Percentage of the subtotal.
    Percent(Percentage),
    /// Fixed amount.
    Amount(Money),
}

/// A promotional code definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Promo {
    pub code: String,
    pub discount: PromoDiscount,
    /// Minimum subtotal for the promo to apply.
    pub min_total: Money,
    /// Upper bound on the discount; `None` means unbounded.
    pub max_discount: Option<Money>,
    #[ts(as = "String")]
    pub starts_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub ends_at: DateTime<Utc>,
    pub active: bool,
}

/// Why a promo was rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PromoRejection {
    Inactive,
    NotStarted,
    Expired,
    BelowMinimum { min_total: Money, subtotal: Money },
}

impl fmt::Display for PromoRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PromoRejection::Inactive => write!(f, "promo is inactive"),
            PromoRejection::NotStarted => write!(f, "promo has not started"),
            PromoRejection::Expired => write!(f, "promo has expired"),
            PromoRejection::BelowMinimum {
                min_total,
                subtotal,
            } => write!(f, "subtotal {} is below minimum {}", subtotal, min_total),
        }
    }
}

impl Promo {
    /// True when `now` is inside `[starts_at, ends_at]` (inclusive).
    pub fn is_within_window(&self, now: DateTime<Utc>) -> bool {
        self.starts_at <= now && now <= self.ends_at
    }

    /// Checks whether the promo may be applied to an order with `subtotal`.
    pub fn check_eligibility(
        &self,
        subtotal: Money,
        now: DateTime<Utc>,
    ) -> Result<(), PromoRejection> {
        if !self.active {
            return Err(PromoRejection::Inactive);
        }
        if now < self.starts_at {
            return Err(PromoRejection::NotStarted);
        }
        if now > self.ends_at {
            return Err(PromoRejection::Expired);
        }
        if subtotal < self.min_total {
            return Err(PromoRejection::BelowMinimum {
                min_total: self.min_total,
                subtotal,
            });
        }
        Ok(())
    }

    /// Discount for a subtotal: `min(value% or value, max_discount)`.
    ///
    /// ## Example
    /// ```rust
    /// use bistro_core::money::{Money, Percentage};
    /// use bistro_core::promo::{Promo, PromoDiscount};
    /// use chrono::Utc;
    ///
    /// let promo = Promo {
    ///     code: "SAVE10".to_string(),
    ///     discount: PromoDiscount::Percent(Percentage::from_percent(10)),
    ///     min_total: Money::from_mils(5000),
    ///     max_discount: None,
    ///     starts_at: Utc::now(),
    ///     ends_at: Utc::now(),
    ///     active: true,
    /// };
    /// assert_eq!(promo.discount_for(Money::from_mils(6250)).mils(), 625);
    /// ```
    pub fn discount_for(&self, subtotal: Money) -> Money {
        let raw = match self.discount {
            PromoDiscount::Percent(rate) => subtotal.percentage(rate),
            PromoDiscount::Amount(amount) => amount,
        };
        match self.max_discount {
            Some(cap) => raw.min(cap),
            None => raw,
        }
    }
}

/// Normalizes an operator-typed code: trimmed, upper case.
pub fn normalize_code(code: &str) -> String {
    code.trim().to_uppercase()
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn save10(now: DateTime<Utc>) -> Promo {
        Promo {
            code: "SAVE10".to_string(),
            discount: PromoDiscount::Percent(Percentage::from_percent(10)),
            min_total: Money::from_mils(5000),
            max_discount: None,
            starts_at: now - Duration::hours(1),
            ends_at: now + Duration::hours(1),
            active: true,
        }
    }

    #[test]
    fn test_normalize_code() {
        assert_eq!(normalize_code("  save10 "), "SAVE10");
        assert_eq!(normalize_code("Save10"), "SAVE10");
    }

    #[test]
    fn test_eligible() {
        let now = Utc::now();
        assert!(save10(now)
            .check_eligibility(Money::from_mils(6250), now)
            .is_ok());
    }

    #[test]
    fn test_rejections() {
        let now = Utc::now();
        let mut promo = save10(now);

        assert_eq!(
            promo.check_eligibility(Money::from_mils(4999), now),
            Err(PromoRejection::BelowMinimum {
                min_total: Money::from_mils(5000),
                subtotal: Money::from_mils(4999),
            })
        );

        assert_eq!(
            promo.check_eligibility(Money::from_mils(6250), now + Duration::hours(2)),
            Err(PromoRejection::Expired)
        );

        assert_eq!(
            promo.check_eligibility(Money::from_mils(6250), now - Duration::hours(2)),
            Err(PromoRejection::NotStarted)
        );

        promo.active = false;
        assert_eq!(
            promo.check_eligibility(Money::from_mils(6250), now),
            Err(PromoRejection::Inactive)
        );
    }

    #[test]
    fn test_window_is_inclusive() {
        let now = Utc::now();
        let promo = save10(now);
        assert!(promo.is_within_window(promo.starts_at));
        assert!(promo.is_within_window(promo.ends_at));
    }

    #[test]
    fn test_discount_capped() {
        let now = Utc::now();
        let mut promo = save10(now);
        promo.max_discount = Some(Money::from_mils(500));
        assert_eq!(promo.discount_for(Money::from_mils(6250)).mils(), 500);

        promo.discount = PromoDiscount::Amount(Money::from_mils(2000));
        assert_eq!(promo.discount_for(Money::from_mils(6250)).mils(), 500);

        promo.max_discount = None;
        assert_eq!(promo.discount_for(Money::from_mils(6250)).mils(), 2000);
    }
}
