//! # Add-on Constraint Validator
//!
//! Validates an add-on selection against an item's group rules, then
//! resolves it into frozen [`LineAddon`] snapshots.
//!
//! ## Rules
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Every selection: qty ≤ MAX_LINE_QUANTITY   → OutOfRange                │
//! │                                                                         │
//! │  For each group, in the order the catalog lists them:                   │
//! │                                                                         │
//! │    selected = Σ qty of selections in this group                        │
//! │                                                                         │
//! │    1. is_required && selected == 0        → AddonGroupRequired         │
//! │    2. max_select > 0 && selected > max    → AddonGroupLimit            │
//! │                                                                         │
//! │  First failure wins. Zero-qty selections are dropped, nothing else is   │
//! │  normalized.                                                            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use crate::error::ValidationError;
use crate::types::{AddonGroup, LineAddon, SelectedAddon};
use crate::validation::ValidationResult;
use crate::MAX_LINE_QUANTITY;

/// Σ qty of the selections that target `group_id`.
///
/// Summed in `u64`; callers compare against a `u32` limit.
pub fn selected_count(group_id: &str, selection: &[SelectedAddon]) -> u64 {
    selection
        .iter()
        .filter(|s| s.group_id == group_id)
        .map(|s| u64::from(s.qty))
        .sum()
}

/// Checks `selection` against `groups`.
///
/// ## Returns
/// The selection with zero-qty entries dropped, or the first violated rule.
///
/// ## Example
/// ```rust
/// use bistro_core::addons::validate_selection;
/// use bistro_core::types::{AddonGroup, SelectedAddon};
///
/// let groups = vec![AddonGroup {
///     id: "size".to_string(),
///     item_id: "coffee".to_string(),
///     name: "Size".to_string(),
///     is_required: true,
///     max_select: Some(1),
///     addons: vec![],
/// }];
///
/// assert!(validate_selection(&groups, &[]).is_err());
/// assert!(validate_selection(&groups, &[SelectedAddon::new("large", "size", 1)]).is_ok());
/// ```
pub fn validate_selection(
    groups: &[AddonGroup],
    selection: &[SelectedAddon],
) -> ValidationResult<Vec<SelectedAddon>> {
    if selection.iter().any(|s| i64::from(s.qty) > MAX_LINE_QUANTITY) {
        return Err(ValidationError::OutOfRange {
            field: "addon quantity".to_string(),
            min: 0,
            max: MAX_LINE_QUANTITY,
        });
    }

    for group in groups {
        let selected = selected_count(&group.id, selection);

        if group.is_required && selected == 0 {
            return Err(ValidationError::AddonGroupRequired {
                group_id: group.id.clone(),
                group: group.name.clone(),
            });
        }

        if let Some(max) = group.limit() {
            if selected > u64::from(max) {
                return Err(ValidationError::AddonGroupLimit {
                    group_id: group.id.clone(),
                    group: group.name.clone(),
                    max,
                    selected,
                });
            }
        }
    }

    Ok(selection.iter().filter(|s| s.qty > 0).cloned().collect())
}

/// Validates and resolves a selection into priced, frozen add-ons.
///
/// Every selected add-on must exist inside the group it names.
pub fn resolve_selection(
    groups: &[AddonGroup],
    selection: &[SelectedAddon],
) -> ValidationResult<Vec<LineAddon>> {
    let validated = validate_selection(groups, selection)?;

    validated
        .into_iter()
        .map(|selected| {
            let addon = groups
                .iter()
                .find(|g| g.id == selected.group_id)
                .and_then(|g| g.find_addon(&selected.addon_id))
                .ok_or_else(|| ValidationError::UnknownAddon {
                    addon_id: selected.addon_id.clone(),
                    group_id: selected.group_id.clone(),
                })?;

            Ok(LineAddon {
                addon_id: addon.id.clone(),
                group_id: addon.group_id.clone(),
                name: addon.name.clone(),
                price: addon.price,
                qty: selected.qty,
            })
        })
        .collect()
}

// =============================================================================
// Unit Tests
// =============================================================================
