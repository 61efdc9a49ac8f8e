//! End-to-end order flows through `OrderEngine` against the in-memory backend.

use std::sync::Arc;
use std::time::Duration;

use chrono::{Duration as ChronoDuration, Utc};

use bistro_core::{
    Addon, AddonGroup, Block, CatalogItem, CheckoutForm, City, DeliveryAddress, GeoState, Money,
    OrderStatus, OrderType, PaymentMethod, Percentage, Promo, PromoDiscount, SelectedAddon,
    TableInfo, TableStatus, ValidationError,
};
use bistro_engine::{
    Command, Conflict, EngineConfig, EngineError, ErrorCode, InMemoryBackend, OrderEngine, Response,
    Services, SessionContext, SessionStatus, SideEffect,
};

// =============================================================================
// Fixtures
// =============================================================================

fn item(id: &str, name: &str, price_mils: i64) -> CatalogItem {
    CatalogItem {
        id: id.to_string(),
        name: name.to_string(),
        price: Money::from_mils(price_mils),
        is_active: true,
        addon_groups: vec![],
    }
}

fn addon(id: &str, group_id: &str, name: &str, price_mils: i64) -> Addon {
    Addon {
        id: id.to_string(),
        group_id: group_id.to_string(),
        name: name.to_string(),
        price: Money::from_mils(price_mils),
    }
}

fn steak() -> CatalogItem {
    CatalogItem {
        addon_groups: vec![
            AddonGroup {
                id: "doneness".to_string(),
                item_id: "steak".to_string(),
                name: "Doneness".to_string(),
                is_required: true,
                max_select: Some(1),
                addons: vec![
                    addon("rare", "doneness", "Rare", 0),
                    addon("medium", "doneness", "Medium", 0),
                ],
            },
            AddonGroup {
                id: "extras".to_string(),
                item_id: "steak".to_string(),
                name: "Extras".to_string(),
                is_required: false,
                max_select: Some(2),
                addons: vec![
                    addon("cheese", "extras", "Cheese", 300),
                    addon("egg", "extras", "Egg", 200),
                ],
            },
        ],
        ..item("steak", "Steak", 9_000)
    }
}

fn table(id: &str, status: TableStatus) -> TableInfo {
    TableInfo {
        id: id.to_string(),
        name: id.to_uppercase(),
        capacity: 4,
        status,
        current_order_id: None,
    }
}

fn promo(code: &str, discount: PromoDiscount, min_total_mils: i64) -> Promo {
    let now = Utc::now();
    Promo {
        code: code.to_string(),
        discount,
        min_total: Money::from_mils(min_total_mils),
        max_discount: None,
        starts_at: now - ChronoDuration::days(1),
        ends_at: now + ChronoDuration::days(1),
        active: true,
    }
}

fn method(slug: &str, is_active: bool, requires_link: bool) -> PaymentMethod {
    PaymentMethod {
        slug: slug.to_string(),
        name: slug.to_uppercase(),
        is_active,
        requires_link,
    }
}

fn backend() -> Arc<InMemoryBackend> {
    let now = Utc::now();
    let expired = Promo {
        starts_at: now - ChronoDuration::days(10),
        ends_at: now - ChronoDuration::days(1),
        ..promo("OLD", PromoDiscount::Percent(Percentage::from_percent(50)), 0)
    };

    Arc::new(
        InMemoryBackend::new()
            .with_item(item("burger", "Burger", 2_500))
            .with_item(item("fries", "Fries", 1_250))
            .with_item(steak())
            .with_item(CatalogItem {
                is_active: false,
                ..item("soup", "Soup", 1_500)
            })
            .with_table(table("t-1", TableStatus::Available))
            .with_table(table("t-2", TableStatus::Available))
            .with_table(table("t-3", TableStatus::Reserved))
            .with_promo(promo("SAVE10", PromoDiscount::Percent(Percentage::from_percent(10)), 5_000))
            .with_promo(promo("FLAT5", PromoDiscount::Amount(Money::from_mils(5_000)), 0))
            .with_promo(expired)
            .with_state(GeoState {
                id: "st-1".to_string(),
                name: "Capital".to_string(),
            })
            .with_state(GeoState {
                id: "st-2".to_string(),
                name: "North".to_string(),
            })
            .with_city(City {
                id: "c-1".to_string(),
                state_id: "st-1".to_string(),
                name: "Capital City".to_string(),
                delivery_fee: Money::from_mils(1_000),
                min_order: Money::from_mils(10_000),
            })
            .with_city(City {
                id: "c-2".to_string(),
                state_id: "st-2".to_string(),
                name: "Harbor".to_string(),
                delivery_fee: Money::from_mils(2_000),
                min_order: Money::zero(),
            })
            .with_block(Block {
                id: "b-1".to_string(),
                city_id: "c-1".to_string(),
                name: "Block 1".to_string(),
            })
            .with_payment_method(method("cash", true, false))
            .with_payment_method(method("online", true, true))
            .with_payment_method(method("voucher", false, false)),
    )
}

fn engine_for(backend: &Arc<InMemoryBackend>, session_id: &str) -> OrderEngine {
    OrderEngine::new(
        &EngineConfig::default(),
        Services::from_shared(backend.clone()),
        SessionContext::new(session_id, "term-1"),
    )
}

fn cash() -> CheckoutForm {
    CheckoutForm {
        payment_method: Some("cash".to_string()),
        ..Default::default()
    }
}

fn delivery_form(state_id: &str, city_id: &str, block_id: &str) -> CheckoutForm {
    CheckoutForm {
        payment_method: Some("cash".to_string()),
        customer_name: Some("Dana".to_string()),
        address: DeliveryAddress {
            state_id: Some(state_id.to_string()),
            city_id: Some(city_id.to_string()),
            block_id: Some(block_id.to_string()),
            street: "Main St 12".to_string(),
            floor: "2".to_string(),
            ..Default::default()
        },
        ..Default::default()
    }
}

/// Opens a Pickup order with 2 × burger and 1 × fries (subtotal 6.250).
async fn order_with_two_lines(engine: &OrderEngine) -> String {
    let order = engine.start_order(Some(OrderType::Pickup)).await.unwrap();
    engine.add_line(&order.id, "burger", 2, &[]).await.unwrap();
    engine.add_line(&order.id, "fries", 1, &[]).await.unwrap();
    order.id
}

// =============================================================================
// Pricing
// =============================================================================

#[tokio::test]
async fn test_two_lines_pickup_totals() {
    let backend = backend();
    let engine = engine_for(&backend, "s-1");
    let order_id = order_with_two_lines(&engine).await;

    let snapshot = engine.get_order(&order_id).await.unwrap();
    assert_eq!(snapshot.lines.len(), 2);
    assert_eq!(snapshot.order.subtotal.to_string(), "6.250");
    assert_eq!(snapshot.order.grand_total.to_string(), "6.250");
    assert_eq!(snapshot.order.item_count, 2);
}

#[tokio::test]
async fn test_delivery_adds_city_fee() {
    let backend = backend();
    let engine = engine_for(&backend, "s-1");
    let order_id = order_with_two_lines(&engine).await;

    let snapshot = engine.set_order_type(&order_id, OrderType::Delivery).await.unwrap();
    assert_eq!(snapshot.order.delivery_fee, Money::zero());

    let snapshot = engine.set_delivery_city(&order_id, "c-1").await.unwrap();
    assert_eq!(snapshot.order.delivery_fee.to_string(), "1.000");
    assert_eq!(snapshot.order.grand_total.to_string(), "7.250");

    // Back to pickup drops the fee.
    let snapshot = engine.set_order_type(&order_id, OrderType::Pickup).await.unwrap();
    assert_eq!(snapshot.order.grand_total.to_string(), "6.250");
}

#[tokio::test]
async fn test_percent_promo_on_pickup() {
    let backend = backend();
    let engine = engine_for(&backend, "s-1");
    let order_id = order_with_two_lines(&engine).await;

    let order = engine.apply_promo(&order_id, "  save10 ").await.unwrap();
    assert_eq!(order.promocode.as_deref(), Some("SAVE10"));
    assert_eq!(order.discount_total.to_string(), "0.625");
    assert_eq!(order.grand_total.to_string(), "5.625");
}

#[tokio::test]
async fn test_fixed_promo_never_makes_total_negative() {
    let backend = backend();
    let engine = engine_for(&backend, "s-1");
    let order = engine.start_order(Some(OrderType::Pickup)).await.unwrap();
    engine.add_line(&order.id, "fries", 1, &[]).await.unwrap();

    let order = engine.apply_promo(&order.id, "FLAT5").await.unwrap();
    assert_eq!(order.discount_total.to_string(), "5.000");
    assert_eq!(order.grand_total, Money::zero());
}

#[tokio::test]
async fn test_addon_surcharge_is_per_unit() {
    let backend = backend();
    let engine = engine_for(&backend, "s-1");
    let order = engine.start_order(Some(OrderType::Pickup)).await.unwrap();

    let selection = [
        SelectedAddon::new("rare", "doneness", 1),
        SelectedAddon::new("cheese", "extras", 1),
        SelectedAddon::new("egg", "extras", 1),
    ];
    let snapshot = engine.add_line(&order.id, "steak", 2, &selection).await.unwrap();

    let line = &snapshot.lines[0];
    assert_eq!(line.addon_surcharge.to_string(), "0.500");
    assert_eq!(line.line_total.to_string(), "19.000");
    assert_eq!(snapshot.order.subtotal.to_string(), "19.000");
}

// =============================================================================
// Line Editing
// =============================================================================

#[tokio::test]
async fn test_required_addon_group_rejects_line() {
    let backend = backend();
    let engine = engine_for(&backend, "s-1");
    let order = engine.start_order(Some(OrderType::Pickup)).await.unwrap();

    let err = engine.add_line(&order.id, "steak", 1, &[]).await.unwrap_err();
    assert_eq!(
        err,
        EngineError::Validation(ValidationError::AddonGroupRequired {
            group_id: "doneness".to_string(),
            group: "Doneness".to_string(),
        })
    );

    let snapshot = engine.get_order(&order.id).await.unwrap();
    assert!(snapshot.lines.is_empty());
}

#[tokio::test]
async fn test_addon_group_limit_rejects_line() {
    let backend = backend();
    let engine = engine_for(&backend, "s-1");
    let order = engine.start_order(Some(OrderType::Pickup)).await.unwrap();

    let selection = [
        SelectedAddon::new("rare", "doneness", 1),
        SelectedAddon::new("cheese", "extras", 2),
        SelectedAddon::new("egg", "extras", 1),
    ];
    let err = engine.add_line(&order.id, "steak", 1, &selection).await.unwrap_err();
    assert!(matches!(
        err,
        EngineError::Validation(ValidationError::AddonGroupLimit { max: 2, selected: 3, .. })
    ));
}

#[tokio::test]
async fn test_huge_addon_quantity_is_rejected() {
    let backend = backend();
    let engine = engine_for(&backend, "s-1");
    let order = engine.start_order(Some(OrderType::Pickup)).await.unwrap();

    let selection = [
        SelectedAddon::new("rare", "doneness", 1),
        SelectedAddon::new("cheese", "extras", u32::MAX),
        SelectedAddon::new("egg", "extras", 1),
    ];
    let err = engine.add_line(&order.id, "steak", 1, &selection).await.unwrap_err();
    assert!(matches!(
        err,
        EngineError::Validation(ValidationError::OutOfRange { max: 999, .. })
    ));
    assert!(engine.get_order(&order.id).await.unwrap().lines.is_empty());
}

#[tokio::test]
async fn test_inactive_item_and_bad_quantity_are_rejected() {
    let backend = backend();
    let engine = engine_for(&backend, "s-1");
    let order = engine.start_order(Some(OrderType::Pickup)).await.unwrap();

    let err = engine.add_line(&order.id, "soup", 1, &[]).await.unwrap_err();
    assert!(matches!(err, EngineError::Validation(ValidationError::NotAllowed { .. })));

    let err = engine.add_line(&order.id, "burger", 0, &[]).await.unwrap_err();
    assert!(matches!(err, EngineError::Validation(ValidationError::OutOfRange { .. })));

    let err = engine.add_line(&order.id, "pizza", 1, &[]).await.unwrap_err();
    assert!(matches!(err, EngineError::NotFound { .. }));
}

#[tokio::test]
async fn test_same_item_merges_into_one_line() {
    let backend = backend();
    let engine = engine_for(&backend, "s-1");
    let order = engine.start_order(Some(OrderType::Pickup)).await.unwrap();

    engine.add_line(&order.id, "burger", 1, &[]).await.unwrap();
    let snapshot = engine.add_line(&order.id, "burger", 2, &[]).await.unwrap();

    assert_eq!(snapshot.lines.len(), 1);
    assert_eq!(snapshot.lines[0].qty, 3);
    assert_eq!(snapshot.order.subtotal.to_string(), "7.500");
}

#[tokio::test]
async fn test_set_line_qty_is_idempotent() {
    let backend = backend();
    let engine = engine_for(&backend, "s-1");
    let order_id = order_with_two_lines(&engine).await;
    let line_id = engine.get_order(&order_id).await.unwrap().lines[0].id.clone();

    let first = engine.set_line_qty(&line_id, 3).await.unwrap();
    let second = engine.set_line_qty(&line_id, 3).await.unwrap();

    assert_eq!(first, second);
    assert_eq!(first.order.subtotal.to_string(), "8.750");
}

#[tokio::test]
async fn test_zero_quantity_removes_line() {
    let backend = backend();
    let engine = engine_for(&backend, "s-1");
    let order_id = order_with_two_lines(&engine).await;
    let line_id = engine.get_order(&order_id).await.unwrap().lines[1].id.clone();

    let snapshot = engine.set_line_qty(&line_id, 0).await.unwrap();
    assert_eq!(snapshot.lines.len(), 1);
    assert_eq!(snapshot.order.item_count, 1);
    assert_eq!(snapshot.order.grand_total.to_string(), "5.000");

    let err = engine.remove_line(&line_id).await.unwrap_err();
    assert!(matches!(err, EngineError::NotFound { .. }));
}

#[tokio::test]
async fn test_line_keeps_price_after_catalog_change() {
    let backend = backend();
    let engine = engine_for(&backend, "s-1");
    let order_id = order_with_two_lines(&engine).await;

    backend.upsert_item(item("burger", "Burger", 9_999));
    let line_id = engine.get_order(&order_id).await.unwrap().lines[0].id.clone();
    let snapshot = engine.set_line_qty(&line_id, 1).await.unwrap();

    assert_eq!(snapshot.lines[0].unit_price.to_string(), "2.500");
    assert_eq!(snapshot.order.subtotal.to_string(), "3.750");
}

// =============================================================================
// Promo
// =============================================================================

#[tokio::test]
async fn test_promo_round_trip_restores_totals() {
    let backend = backend();
    let engine = engine_for(&backend, "s-1");
    let order_id = order_with_two_lines(&engine).await;
    let before = engine.get_order(&order_id).await.unwrap().order;

    engine.apply_promo(&order_id, "SAVE10").await.unwrap();
    let after = engine.remove_promo(&order_id).await.unwrap();

    assert_eq!(after.promocode, None);
    assert_eq!(after.totals(), before.totals());
}

#[tokio::test]
async fn test_every_promo_rejection_reads_the_same() {
    let backend = backend();
    let engine = engine_for(&backend, "s-1");
    let order = engine.start_order(Some(OrderType::Pickup)).await.unwrap();
    engine.add_line(&order.id, "fries", 1, &[]).await.unwrap();

    // Expired, unknown, below minimum, blank.
    for code in ["OLD", "NOPE", "SAVE10", "   "] {
        let err = engine.apply_promo(&order.id, code).await.unwrap_err();
        assert_eq!(err, EngineError::Validation(ValidationError::InvalidPromo));
        assert_eq!(err.to_string(), "invalid or expired promo code");
    }

    let snapshot = engine.get_order(&order.id).await.unwrap();
    assert_eq!(snapshot.order.promocode, None);
}

#[tokio::test]
async fn test_applying_a_second_promo_replaces_the_first() {
    let backend = backend();
    let engine = engine_for(&backend, "s-1");
    let order_id = order_with_two_lines(&engine).await;

    engine.apply_promo(&order_id, "SAVE10").await.unwrap();
    let order = engine.apply_promo(&order_id, "FLAT5").await.unwrap();

    assert_eq!(order.promocode.as_deref(), Some("FLAT5"));
    assert_eq!(order.discount_total.to_string(), "5.000");
    assert_eq!(order.grand_total.to_string(), "1.250");
}

// =============================================================================
// Orders
// =============================================================================

#[tokio::test]
async fn test_only_one_empty_order_per_session() {
    let backend = backend();
    let engine = engine_for(&backend, "s-1");
    let first = engine.start_order(None).await.unwrap();
    assert_eq!(first.number, "POS-0001");
    assert_eq!(first.order_type, OrderType::Pickup);
    assert_eq!(engine.current().unwrap().order.id, first.id);

    let err = engine.start_order(None).await.unwrap_err();
    assert_eq!(
        err,
        EngineError::Conflict(Conflict::EmptyOrderExists {
            order_id: first.id.clone()
        })
    );

    engine.add_line(&first.id, "burger", 1, &[]).await.unwrap();
    let second = engine.start_order(Some(OrderType::DineIn)).await.unwrap();
    assert_eq!(second.number, "POS-0002");
    assert_eq!(engine.current().unwrap().order.id, second.id);

    let active = engine.list_active_orders().await.unwrap();
    assert_eq!(active.len(), 2);
}

#[tokio::test]
async fn test_settled_orders_reject_mutations() {
    let backend = backend();
    let engine = engine_for(&backend, "s-1");
    let order_id = order_with_two_lines(&engine).await;

    let closed = engine.cancel_order(&order_id).await.unwrap();
    assert_eq!(closed.status, OrderStatus::Cancelled);

    let err = engine.add_line(&order_id, "burger", 1, &[]).await.unwrap_err();
    assert!(matches!(
        err,
        EngineError::Conflict(Conflict::OrderNotOpen {
            status: OrderStatus::Cancelled,
            ..
        })
    ));
    assert!(engine.list_active_orders().await.unwrap().is_empty());
    assert!(engine.current().is_none());
}

#[tokio::test]
async fn test_selecting_a_vanished_order_clears_the_view() {
    let backend = backend();
    let engine = engine_for(&backend, "s-1");
    let order_id = order_with_two_lines(&engine).await;
    assert_eq!(engine.current().map(|c| c.order.id), Some(order_id.clone()));

    backend.purge_order(&order_id);

    let err = engine.select_order(&order_id).await.unwrap_err();
    assert!(matches!(err, EngineError::NotFound { .. }));
    assert!(engine.current().is_none());
}

// =============================================================================
// Tables
// =============================================================================

#[tokio::test]
async fn test_occupied_table_cannot_be_taken() {
    let backend = backend();
    let engine = engine_for(&backend, "s-1");

    let x = engine.start_order(Some(OrderType::DineIn)).await.unwrap();
    engine.assign_table(&x.id, "t-1", 2).await.unwrap();
    engine.add_line(&x.id, "burger", 1, &[]).await.unwrap();

    let y = engine.start_order(Some(OrderType::DineIn)).await.unwrap();
    let err = engine.assign_table(&y.id, "t-1", 2).await.unwrap_err();
    assert_eq!(
        err,
        EngineError::Conflict(Conflict::TableOccupied {
            table_id: "t-1".to_string(),
            held_by: Some(x.id.clone()),
        })
    );

    let y = engine.get_order(&y.id).await.unwrap().order;
    assert_eq!(y.table_id, None);

    let err = engine.assign_table(&y.id, "t-3", 2).await.unwrap_err();
    assert!(matches!(err, EngineError::Conflict(Conflict::TableOccupied { held_by: None, .. })));
}

#[tokio::test]
async fn test_failed_assignment_gives_the_table_back() {
    let backend = backend();
    let engine = engine_for(&backend, "s-1");
    let order = engine.start_order(Some(OrderType::DineIn)).await.unwrap();

    backend.set_save_failure(Some("db write failed"));
    let err = engine.assign_table(&order.id, "t-1", 2).await.unwrap_err();
    assert_eq!(err, EngineError::Backend("db write failed".to_string()));
    backend.set_save_failure(None);

    let table = backend.table("t-1").unwrap();
    assert_eq!(table.status, TableStatus::Available);
    assert_eq!(table.current_order_id, None);
    assert_eq!(backend.order(&order.id).unwrap().table_id, None);

    let other = engine_for(&backend, "s-2");
    let next = other.start_order(Some(OrderType::DineIn)).await.unwrap();
    assert!(other.assign_table(&next.id, "t-1", 4).await.is_ok());
}

#[tokio::test]
async fn test_failed_covers_update_keeps_the_table() {
    let backend = backend();
    let engine = engine_for(&backend, "s-1");
    let order = engine.start_order(Some(OrderType::DineIn)).await.unwrap();
    engine.assign_table(&order.id, "t-1", 2).await.unwrap();

    backend.set_save_failure(Some("db write failed"));
    assert!(engine.assign_table(&order.id, "t-1", 4).await.is_err());
    backend.set_save_failure(None);

    let table = backend.table("t-1").unwrap();
    assert_eq!(table.current_order_id, Some(order.id.clone()));
    assert_eq!(backend.order(&order.id).unwrap().covers, Some(2));
}

#[tokio::test]
async fn test_concurrent_claims_have_one_winner() {
    let backend = backend();
    let a = engine_for(&backend, "s-a");
    let b = engine_for(&backend, "s-b");

    let order_a = a.start_order(Some(OrderType::DineIn)).await.unwrap();
    let order_b = b.start_order(Some(OrderType::DineIn)).await.unwrap();

    let (ra, rb) = tokio::join!(
        a.assign_table(&order_a.id, "t-2", 2),
        b.assign_table(&order_b.id, "t-2", 4)
    );
    assert_eq!(ra.is_ok() as u8 + rb.is_ok() as u8, 1);

    let table = backend.table("t-2").unwrap();
    assert_eq!(table.status, TableStatus::Occupied);
    let winner = if ra.is_ok() { &order_a.id } else { &order_b.id };
    assert_eq!(table.current_order_id.as_ref(), Some(winner));
}

#[tokio::test]
async fn test_moving_between_tables_frees_the_old_one() {
    let backend = backend();
    let engine = engine_for(&backend, "s-1");
    let order = engine.start_order(Some(OrderType::DineIn)).await.unwrap();

    engine.assign_table(&order.id, "t-1", 2).await.unwrap();
    let moved = engine.assign_table(&order.id, "t-2", 3).await.unwrap();

    assert_eq!(moved.table_id.as_deref(), Some("t-2"));
    assert_eq!(moved.covers, Some(3));
    assert_eq!(backend.table("t-1").unwrap().status, TableStatus::Available);
    assert_eq!(backend.table("t-2").unwrap().status, TableStatus::Occupied);
}

#[tokio::test]
async fn test_table_rules_for_orders_with_items() {
    let backend = backend();
    let engine = engine_for(&backend, "s-1");
    let order = engine.start_order(Some(OrderType::DineIn)).await.unwrap();
    engine.assign_table(&order.id, "t-1", 2).await.unwrap();
    engine.add_line(&order.id, "burger", 1, &[]).await.unwrap();

    let err = engine.clear_table(&order.id).await.unwrap_err();
    assert!(matches!(err, EngineError::Conflict(Conflict::TableInUse { .. })));

    let err = engine.release_table(&order.id).await.unwrap_err();
    assert!(matches!(err, EngineError::Conflict(Conflict::CheckoutRequired { .. })));

    assert_eq!(backend.table("t-1").unwrap().status, TableStatus::Occupied);
}

#[tokio::test]
async fn test_releasing_an_empty_tab_closes_it() {
    let backend = backend();
    let engine = engine_for(&backend, "s-1");
    let order = engine.start_order(Some(OrderType::DineIn)).await.unwrap();
    engine.assign_table(&order.id, "t-1", 2).await.unwrap();

    let released = engine.release_table(&order.id).await.unwrap();
    assert_eq!(released.status, OrderStatus::Closed);
    assert_eq!(released.table_id, None);
    assert_eq!(backend.table("t-1").unwrap().status, TableStatus::Available);
}

#[tokio::test]
async fn test_tables_only_for_dine_in() {
    let backend = backend();
    let engine = engine_for(&backend, "s-1");
    let order = engine.start_order(Some(OrderType::Pickup)).await.unwrap();

    let err = engine.assign_table(&order.id, "t-1", 2).await.unwrap_err();
    assert!(matches!(err, EngineError::Validation(ValidationError::NotAllowed { .. })));

    let dine_in = engine.set_order_type(&order.id, OrderType::DineIn).await.unwrap();
    engine.assign_table(&dine_in.order.id, "t-1", 2).await.unwrap();

    // Leaving dine-in frees the table.
    let snapshot = engine.set_order_type(&order.id, OrderType::Pickup).await.unwrap();
    assert_eq!(snapshot.order.table_id, None);
    assert_eq!(backend.table("t-1").unwrap().status, TableStatus::Available);
}

// =============================================================================
// Checkout
// =============================================================================

#[tokio::test]
async fn test_dine_in_checkout_releases_table_and_prints() {
    let backend = backend();
    let engine = engine_for(&backend, "s-1");
    let order = engine.start_order(Some(OrderType::DineIn)).await.unwrap();
    engine.add_line(&order.id, "burger", 2, &[]).await.unwrap();

    let err = engine.complete_order(&order.id, &cash()).await.unwrap_err();
    assert_eq!(err, EngineError::Validation(ValidationError::required("table")));

    engine.assign_table(&order.id, "t-1", 2).await.unwrap();
    let outcome = engine.complete_order(&order.id, &cash()).await.unwrap();

    assert!(outcome.is_clean());
    assert_eq!(outcome.order.status, OrderStatus::Completed);
    assert_eq!(outcome.order.payment_method.as_deref(), Some("cash"));
    assert!(outcome.order.completed_at.is_some());
    assert_eq!(outcome.order.table_id, None);
    assert_eq!(outcome.payment_link, None);
    assert_eq!(backend.table("t-1").unwrap().status, TableStatus::Available);
    assert_eq!(backend.printed_orders(), vec![order.id.clone()]);
    assert!(engine.list_active_orders().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_delivery_checkout_composes_address() {
    let backend = backend();
    let engine = engine_for(&backend, "s-1");
    let order = engine.start_order(Some(OrderType::Delivery)).await.unwrap();
    engine.add_line(&order.id, "burger", 2, &[]).await.unwrap();

    let outcome = engine
        .complete_order(&order.id, &delivery_form("st-1", "c-1", "b-1"))
        .await
        .unwrap();

    assert_eq!(outcome.order.delivery_fee.to_string(), "1.000");
    assert_eq!(outcome.order.grand_total.to_string(), "6.000");
    assert_eq!(
        outcome.order.delivery_address.as_deref(),
        Some("Main St 12, Floor 2, Block 1, Capital City")
    );
}

#[tokio::test]
async fn test_checkout_rejections_leave_order_open() {
    let backend = backend();
    let engine = engine_for(&backend, "s-1");
    let order = engine.start_order(Some(OrderType::Delivery)).await.unwrap();

    let err = engine.complete_order(&order.id, &cash()).await.unwrap_err();
    assert!(matches!(err, EngineError::Validation(ValidationError::NotAllowed { .. })));

    engine.add_line(&order.id, "fries", 1, &[]).await.unwrap();

    // Missing address.
    let err = engine.complete_order(&order.id, &cash()).await.unwrap_err();
    assert_eq!(err, EngineError::Validation(ValidationError::required("state")));

    // City outside the state.
    let err = engine
        .complete_order(&order.id, &delivery_form("st-1", "c-2", "b-1"))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Validation(ValidationError::NotAllowed { .. })));

    // Unknown block.
    let err = engine
        .complete_order(&order.id, &delivery_form("st-1", "c-1", "b-404"))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Validation(ValidationError::NotAllowed { .. })));

    // Inactive payment method.
    let mut form = delivery_form("st-1", "c-1", "b-1");
    form.payment_method = Some("voucher".to_string());
    let err = engine.complete_order(&order.id, &form).await.unwrap_err();
    assert!(matches!(err, EngineError::Validation(ValidationError::NotAllowed { .. })));

    let snapshot = engine.get_order(&order.id).await.unwrap();
    assert_eq!(snapshot.order.status, OrderStatus::Open);
    assert!(backend.printed_orders().is_empty());
}

#[tokio::test]
async fn test_side_effect_failures_do_not_undo_checkout() {
    let backend = backend();
    let engine = engine_for(&backend, "s-1");
    let order_id = order_with_two_lines(&engine).await;

    backend.set_print_failure(Some("printer offline"));
    backend.set_link_failure(Some("gateway down"));

    let form = CheckoutForm {
        payment_method: Some("online".to_string()),
        ..Default::default()
    };
    let outcome = engine.complete_order(&order_id, &form).await.unwrap();

    assert_eq!(outcome.order.status, OrderStatus::Completed);
    assert_eq!(outcome.payment_link, None);
    let effects: Vec<SideEffect> = outcome.side_effect_failures.iter().map(|f| f.effect).collect();
    assert_eq!(effects, vec![SideEffect::PaymentLink, SideEffect::Print]);
    assert_eq!(backend.order(&order_id).unwrap().status, OrderStatus::Completed);
}

#[tokio::test]
async fn test_failed_finalize_leaves_order_untouched() {
    let backend = backend();
    let engine = engine_for(&backend, "s-1");
    let order = engine.start_order(Some(OrderType::Delivery)).await.unwrap();
    engine.add_line(&order.id, "burger", 2, &[]).await.unwrap();
    let before = backend.order(&order.id).unwrap();

    backend.set_finalize_failure(Some("ledger offline"));
    let err = engine
        .complete_order(&order.id, &delivery_form("st-1", "c-1", "b-1"))
        .await
        .unwrap_err();
    assert_eq!(err, EngineError::Backend("ledger offline".to_string()));

    let after = backend.order(&order.id).unwrap();
    assert_eq!(after, before);
    assert_eq!(after.status, OrderStatus::Open);
    assert_eq!(after.payment_method, None);
    assert_eq!(after.delivery_address, None);
    assert!(backend.printed_orders().is_empty());

    backend.set_finalize_failure(None);
    let outcome = engine
        .complete_order(&order.id, &delivery_form("st-1", "c-1", "b-1"))
        .await
        .unwrap();
    assert_eq!(outcome.order.grand_total.to_string(), "6.000");
}

#[tokio::test]
async fn test_session_lost_after_completion_is_reported() {
    let backend = backend();
    let engine = engine_for(&backend, "s-1");
    let order_id = order_with_two_lines(&engine).await;

    backend.revoke_session_on_finalize("token expired");
    let err = engine.complete_order(&order_id, &cash()).await.unwrap_err();
    assert_eq!(err, EngineError::Authentication("token expired".to_string()));
    assert!(!engine.session_guard().status().is_active());

    assert_eq!(backend.order(&order_id).unwrap().status, OrderStatus::Completed);
    assert!(backend.printed_orders().is_empty());
}

#[tokio::test]
async fn test_online_payment_gets_a_link() {
    let backend = backend();
    let engine = engine_for(&backend, "s-1");
    let order_id = order_with_two_lines(&engine).await;

    let form = CheckoutForm {
        payment_method: Some("online".to_string()),
        ..Default::default()
    };
    let outcome = engine.complete_order(&order_id, &form).await.unwrap();

    let link = outcome.payment_link.as_ref().unwrap();
    assert_eq!(link.reference, "PL-000001");
    assert!(outcome.is_clean());
}

// =============================================================================
// Session & Collaborator Failures
// =============================================================================

#[tokio::test]
async fn test_revoked_session_invalidates_engine() {
    let backend = backend();
    let engine = engine_for(&backend, "s-1");
    let order_id = order_with_two_lines(&engine).await;
    let mut status = engine.subscribe_session();

    backend.revoke_session("token revoked");
    let err = engine.add_line(&order_id, "burger", 1, &[]).await.unwrap_err();
    assert_eq!(err, EngineError::Authentication("token revoked".to_string()));

    status.changed().await.unwrap();
    assert_eq!(
        *status.borrow(),
        SessionStatus::Invalidated {
            reason: "token revoked".to_string()
        }
    );

    // Fails fast even once the backend would accept calls again.
    backend.restore_session();
    let err = engine.get_order(&order_id).await.unwrap_err();
    assert!(err.is_session_fatal());

    engine.session_guard().reactivate();
    assert!(engine.get_order(&order_id).await.is_ok());
}

#[tokio::test(start_paused = true)]
async fn test_slow_backend_times_out() {
    let backend = backend();
    let engine = engine_for(&backend, "s-1");
    let order_id = order_with_two_lines(&engine).await;

    backend.set_latency(Some(Duration::from_secs(30)));
    let err = engine.get_order(&order_id).await.unwrap_err();
    assert_eq!(
        err,
        EngineError::Timeout {
            operation: "fetch_order".to_string()
        }
    );
    assert!(err.requires_refetch());
    assert!(engine.session_guard().status().is_active());

    backend.set_latency(None);
    assert!(engine.get_order(&order_id).await.is_ok());
}

#[tokio::test]
async fn test_backend_outage_is_reported_as_backend_error() {
    let backend = backend();
    let engine = engine_for(&backend, "s-1");
    let order_id = order_with_two_lines(&engine).await;

    backend.set_orders_unavailable(Some("database locked"));
    let err = engine.get_order(&order_id).await.unwrap_err();
    assert_eq!(err, EngineError::Backend("database locked".to_string()));
    assert!(err.is_recoverable());
}

// =============================================================================
// Command Surface
// =============================================================================

#[tokio::test]
async fn test_commands_round_trip_through_handle() {
    let backend = backend();
    let engine = engine_for(&backend, "s-1");

    let order = match engine.handle(Command::StartOrder { order_type: None }).await {
        Response::Order(order) => order,
        other => panic!("unexpected response: {:?}", other),
    };

    let cmd: Command = serde_json::from_value(serde_json::json!({
        "type": "AddLine",
        "payload": { "order_id": order.id, "item_id": "burger", "qty": 2 }
    }))
    .unwrap();
    match engine.handle(cmd).await {
        Response::Snapshot(snapshot) => assert_eq!(snapshot.order.grand_total.to_string(), "5.000"),
        other => panic!("unexpected response: {:?}", other),
    }

    let response = engine
        .handle(Command::ApplyPromo {
            order_id: order.id.clone(),
            code: "OLD".to_string(),
        })
        .await;
    match response {
        Response::Error(payload) => {
            assert_eq!(payload.code, ErrorCode::ValidationError);
            assert_eq!(payload.message, "invalid or expired promo code");
            assert!(payload.recoverable);
            assert!(!payload.refetch);
        }
        other => panic!("unexpected response: {:?}", other),
    }

    let response = engine
        .handle(Command::CloseOrder {
            order_id: order.id.clone(),
        })
        .await;
    assert_eq!(response, Response::Ack { order_id: order.id });
}
