use std::collections::BTreeMap;

use furrow_render::Color;
use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::item::Item;

pub const STARTING_MONEY: i64 = 500;
pub const WINNING_MONEY: i64 = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlayerType {
    Human,
    Robot,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Village {
    pub name: String,
    /// Top-left of the village block, in world pixels.
    pub position: Option<Vec2>,
}

/// Banner and clothing colors chosen at creation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerColors {
    #[serde(rename = "color")]
    pub banner: Color,
    pub braces_color: Color,
    pub shirt_color: Color,
    pub hat_color: Color,
    pub button_color: Color,
}

impl PlayerColors {
    /// Every piece in the banner color.
    pub fn uniform(banner: Color) -> Self {
        Self {
            banner,
            braces_color: banner,
            shirt_color: banner,
            hat_color: banner,
            button_color: banner,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Player {
    pub name: String,
    pub village: Village,
    #[serde(flatten)]
    pub colors: PlayerColors,
    #[serde(rename = "type")]
    pub kind: PlayerType,
    pub money: i64,
    pub debt_money: i64,
    pub buy_inventory: BTreeMap<String, Item>,
    pub sell_inventory: BTreeMap<String, Item>,
}

impl Player {
    pub fn new(
        name: impl Into<String>,
        village_name: impl Into<String>,
        colors: PlayerColors,
        kind: PlayerType,
    ) -> Self {
        Self {
            name: name.into(),
            village: Village {
                name: village_name.into(),
                position: None,
            },
            colors,
            kind,
            money: STARTING_MONEY,
            debt_money: 0,
            buy_inventory: BTreeMap::new(),
            sell_inventory: BTreeMap::new(),
        }
    }

    pub fn is_bot(&self) -> bool {
        self.kind == PlayerType::Robot
    }

    pub fn is_bankrupt(&self) -> bool {
        self.money <= 0
    }

    pub fn has_won(&self) -> bool {
        self.money >= WINNING_MONEY && self.debt_money <= 0
    }

    /// Either end condition holds.
    pub fn has_finished(&self) -> bool {
        self.is_bankrupt() || self.has_won()
    }

    pub(crate) fn stock(inventory: &mut BTreeMap<String, Item>, item: &Item) {
        inventory
            .entry(item.id.clone())
            .and_modify(|held| held.quantity += 1)
            .or_insert_with(|| item.single());
    }

    /// Take one unit of `id` out of the buy inventory.
    pub(crate) fn unstock(&mut self, id: &str) -> Option<Item> {
        let held = self.buy_inventory.get_mut(id)?;
        let unit = held.single();
        held.quantity = held.quantity.saturating_sub(1);
        if held.quantity == 0 {
            self.buy_inventory.remove(id);
        }
        Some(unit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::default_crops;

    fn farmer() -> Player {
        Player::new("Ann", "Annville", PlayerColors::uniform(Color::RED), PlayerType::Human)
    }

    #[test]
    fn end_conditions() {
        let mut player = farmer();
        assert!(!player.has_finished());

        player.money = 0;
        assert!(player.is_bankrupt() && player.has_finished());

        player.money = 1000;
        player.debt_money = 10;
        assert!(!player.has_finished());
        player.debt_money = 0;
        assert!(player.has_won());
    }

    #[test]
    fn inventory_counts_units() {
        let mut player = farmer();
        let pumpkin = &default_crops()[0];
        Player::stock(&mut player.buy_inventory, pumpkin);
        Player::stock(&mut player.buy_inventory, pumpkin);
        assert_eq!(player.buy_inventory["pumpkin"].quantity, 2);

        assert_eq!(player.unstock("pumpkin").map(|i| i.quantity), Some(1));
        assert_eq!(player.buy_inventory["pumpkin"].quantity, 1);
        assert!(player.unstock("pumpkin").is_some());
        assert!(!player.buy_inventory.contains_key("pumpkin"));
        assert!(player.unstock("pumpkin").is_none());
    }

    #[test]
    fn colors_are_flattened_on_the_wire() {
        let json = serde_json::to_value(farmer()).unwrap();
        assert_eq!(json["type"], "Human");
        assert_eq!(json["color"]["r"], 1.0);
        assert!(json.get("hatColor").is_some());
        assert_eq!(json["debtMoney"], 0);
        assert_eq!(json["village"]["name"], "Annville");
    }
}
