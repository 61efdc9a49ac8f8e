//! Demo menu, floor plan and delivery zones for the in-memory backend.

use chrono::{Duration, Utc};

use bistro_core::{
    Addon, AddonGroup, Block, CatalogItem, City, GeoState, Money, PaymentMethod, Percentage, Promo,
    PromoDiscount, TableInfo, TableStatus,
};
use bistro_engine::InMemoryBackend;

fn item(id: &str, name: &str, price_mils: i64, addon_groups: Vec<AddonGroup>) -> CatalogItem {
    CatalogItem {
        id: id.to_string(),
        name: name.to_string(),
        price: Money::from_mils(price_mils),
        is_active: true,
        addon_groups,
    }
}

fn group(
    id: &str,
    item_id: &str,
    name: &str,
    is_required: bool,
    max_select: Option<u32>,
    addons: &[(&str, &str, i64)],
) -> AddonGroup {
    AddonGroup {
        id: id.to_string(),
        item_id: item_id.to_string(),
        name: name.to_string(),
        is_required,
        max_select,
        addons: addons
            .iter()
            .map(|(addon_id, addon_name, price)| Addon {
                id: addon_id.to_string(),
                group_id: id.to_string(),
                name: addon_name.to_string(),
                price: Money::from_mils(*price),
            })
            .collect(),
    }
}

fn table(id: &str, name: &str, capacity: u32) -> TableInfo {
    TableInfo {
        id: id.to_string(),
        name: name.to_string(),
        capacity,
        status: TableStatus::Available,
        current_order_id: None,
    }
}

/// Builds the demo backend.
pub fn demo_backend() -> InMemoryBackend {
    let now = Utc::now();

    InMemoryBackend::new()
        .with_item(item(
            "burger",
            "Classic Burger",
            2_500,
            vec![
                group("burger-doneness", "burger", "Doneness", true, Some(1), &[
                    ("medium", "Medium", 0),
                    ("well-done", "Well done", 0),
                ]),
                group("burger-extras", "burger", "Extras", false, Some(3), &[
                    ("cheese", "Cheese", 300),
                    ("bacon", "Bacon", 500),
                    ("egg", "Fried egg", 250),
                ]),
            ],
        ))
        .with_item(item("fries", "Fries", 1_250, vec![]))
        .with_item(item("lemonade", "Lemonade", 900, vec![]))
        .with_table(table("t-1", "Table 1", 2))
        .with_table(table("t-2", "Table 2", 4))
        .with_table(TableInfo {
            status: TableStatus::Reserved,
            ..table("t-3", "Terrace", 6)
        })
        .with_promo(Promo {
            code: "SAVE10".to_string(),
            discount: PromoDiscount::Percent(Percentage::from_percent(10)),
            min_total: Money::from_mils(5_000),
            max_discount: Some(Money::from_mils(3_000)),
            starts_at: now - Duration::days(30),
            ends_at: now + Duration::days(30),
            active: true,
        })
        .with_state(GeoState {
            id: "capital".to_string(),
            name: "Capital".to_string(),
        })
        .with_city(City {
            id: "downtown".to_string(),
            state_id: "capital".to_string(),
            name: "Downtown".to_string(),
            delivery_fee: Money::from_mils(1_000),
            min_order: Money::from_mils(5_000),
        })
        .with_block(Block {
            id: "block-4".to_string(),
            city_id: "downtown".to_string(),
            name: "Block 4".to_string(),
        })
        .with_payment_method(PaymentMethod {
            slug: "cash".to_string(),
            name: "Cash".to_string(),
            is_active: true,
            requires_link: false,
        })
        .with_payment_method(PaymentMethod {
            slug: "online".to_string(),
            name: "Online payment".to_string(),
            is_active: true,
            requires_link: true,
        })
}
