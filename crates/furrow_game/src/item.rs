//! Tradeable items and the starting catalog

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ItemKind {
    Crop,
    Animal,
    Generic,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    pub id: String,
    pub name: String,
    pub kind: ItemKind,
    pub buying_value: i64,
    pub selling_value: i64,
    pub quantity: u32,
}

impl Item {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        kind: ItemKind,
        buying_value: i64,
        selling_value: i64,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            kind,
            buying_value,
            selling_value,
            quantity: 0,
        }
    }

    /// Copy carrying a single unit.
    pub fn single(&self) -> Self {
        Self {
            quantity: 1,
            ..self.clone()
        }
    }
}

pub fn default_crops() -> Vec<Item> {
    vec![
        Item::new("pumpkin", "Pumpkin", ItemKind::Crop, 25, 40),
        Item::new("watermelon", "Watermelon", ItemKind::Crop, 30, 50),
    ]
}

pub fn default_animals() -> Vec<Item> {
    vec![
        Item::new("chicken", "Chicken", ItemKind::Animal, 40, 65),
        Item::new("cow", "Cow", ItemKind::Animal, 80, 130),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_prices_start_at_cell_price() {
        let all: Vec<Item> = default_crops().into_iter().chain(default_animals()).collect();
        assert!(all.iter().all(|item| item.buying_value >= 25));
        assert!(all.iter().all(|item| item.selling_value > item.buying_value));
        assert!(all.iter().all(|item| item.quantity == 0));
    }

    #[test]
    fn wire_names_are_camel_case() {
        let json = serde_json::to_value(default_crops()[0].single()).unwrap();
        assert_eq!(json["buyingValue"], 25);
        assert_eq!(json["sellingValue"], 40);
        assert_eq!(json["quantity"], 1);
        assert_eq!(json["kind"], "Crop");
    }
}
