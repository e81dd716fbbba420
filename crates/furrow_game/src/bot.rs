//! Computer-controlled players
//!
//! A bot fills its empty land with items when it has any, and buys land
//! otherwise. Every random choice comes from the world's generator, so a
//! bot turn replays exactly from the same world.

use furrow_core::event::EventBus;
use tracing::{debug, trace};

use crate::error::WorldError;
use crate::events::ItemPlaced;
use crate::save::{Save, CELL_PRICE};

/// Catalog draws an item purchase may take before giving up.
pub const ITEM_ATTEMPTS: usize = 20;

/// What one bot turn did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BotReport {
    pub cells_bought: usize,
    pub items_placed: usize,
    pub earned: i64,
    pub maintenance: i64,
}

/// Play the turn of the current player, if it is a live bot.
pub fn play_turn(save: &mut Save, events: &mut EventBus) -> Result<BotReport, WorldError> {
    let player = save.current_player_id;
    let mut report = BotReport::default();
    if save.is_dead(player) || !save.player(player)?.is_bot() {
        return Ok(report);
    }

    let action = save.owned_cells_with_no_item(player).len();
    if action == 0 {
        if buy_land(save, player)? {
            report.cells_bought = 1;
        }
    } else {
        for _ in 0..action {
            if add_item(save, player, events)? {
                report.items_placed += 1;
            }
        }
    }

    report.earned = save.sell_inventory(player)?;
    report.maintenance = maintenance_cost(save, player)?;
    debug!(player, ?report, "bot turn played");
    Ok(report)
}

/// Buy a random free cell next to the bot's land.
pub fn buy_land(save: &mut Save, player: usize) -> Result<bool, WorldError> {
    if save.player(player)?.money < CELL_PRICE {
        return Ok(false);
    }
    let cells = save.close_cells_available(player);
    let Some(index) = save.rng.pick_index(cells.len()) else {
        return Ok(false);
    };
    let (x, y) = cells[index];
    save.buy_cell(player, x, y)?;
    Ok(true)
}

/// Buy a random affordable item and put it on a random empty owned cell.
pub fn add_item(
    save: &mut Save,
    player: usize,
    events: &mut EventBus,
) -> Result<bool, WorldError> {
    if save.owned_cells_with_no_item(player).is_empty() {
        return Ok(false);
    }
    let catalog: Vec<_> = save.catalog().cloned().collect();

    for _ in 0..ITEM_ATTEMPTS {
        let Some(index) = save.rng.pick_index(catalog.len()) else {
            return Ok(false);
        };
        let item = &catalog[index];
        if save.player(player)?.money < item.buying_value {
            trace!(player, item = %item.id, "cannot afford");
            continue;
        }

        save.buy_item(player, &item.id)?;
        let cells = save.owned_cells_with_no_item(player);
        let Some(cell) = save.rng.pick_index(cells.len()) else {
            return Ok(false);
        };
        let (x, y) = cells[cell];
        save.place_item(player, &item.id, x, y)?;
        events.dispatch(&ItemPlaced {
            player,
            x,
            y,
            item: item.id.clone(),
        });
        return Ok(true);
    }
    Ok(false)
}

/// One coin per owned cell.
pub fn maintenance_cost(save: &mut Save, player: usize) -> Result<i64, WorldError> {
    let cost = save.owned_cells(player).len() as i64;
    save.player_mut(player)?.money -= cost;
    Ok(cost)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::save::tests::world;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn bot_turn_world() -> Save {
        let mut save = world(42, 6, 6, 1);
        save.current_player_id = 1;
        save
    }

    #[test]
    fn broke_bot_only_pays_upkeep() {
        let mut save = bot_turn_world();
        save.players[1].money = 20;
        let mut events = EventBus::new();
        let placed = Rc::new(RefCell::new(0));
        let counter = placed.clone();
        events.subscribe::<ItemPlaced, _>(move |_| *counter.borrow_mut() += 1);

        let before = save.rng.clone();
        assert!(!buy_land(&mut save, 1).unwrap());
        assert_eq!(save.rng, before, "no draw without money");

        let report = play_turn(&mut save, &mut events).unwrap();
        assert_eq!(report.items_placed, 0);
        assert_eq!(report.maintenance, 4);
        assert_eq!(save.players[1].money, 16);
        assert_eq!(*placed.borrow(), 0);
        assert!(save.buy_turn_items.is_empty());

        // four empty cells, twenty failed draws each
        let mut expected = before;
        for _ in 0..4 * ITEM_ATTEMPTS {
            expected.next_u32();
        }
        assert_eq!(save.rng, expected);
    }

    #[test]
    fn funded_bot_fills_its_land() {
        let mut save = bot_turn_world();
        let mut events = EventBus::new();
        let placed = Rc::new(RefCell::new(Vec::new()));
        let sink = placed.clone();
        events.subscribe::<ItemPlaced, _>(move |e| sink.borrow_mut().push((e.x, e.y)));

        let report = play_turn(&mut save, &mut events).unwrap();
        assert_eq!(report.items_placed, 4);
        assert!(save.owned_cells_with_no_item(1).is_empty());
        assert_eq!(placed.borrow().len(), 4);

        let spent: i64 = save
            .owned_cells(1)
            .iter()
            .filter_map(|&(x, y)| save.cells[x][y].item.as_ref())
            .map(|item| save.catalog_item(&item.id).map_or(0, |i| i.buying_value))
            .sum();
        assert_eq!(save.players[1].money, 500 - spent - 4);
        let logged: u32 = save.buy_turn_items.iter().map(|item| item.quantity).sum();
        assert_eq!(logged, 4, "each purchase is logged once");
    }

    #[test]
    fn full_land_means_buying_more() {
        let mut save = bot_turn_world();
        let pumpkin = save.crop_items[0].single();
        for (x, y) in save.owned_cells(1) {
            save.cells[x][y].item = Some(pumpkin.clone());
        }
        save.players[1].sell_inventory.insert("cow".into(), {
            let mut cows = save.animal_items[1].single();
            cows.quantity = 2;
            cows
        });

        let report = play_turn(&mut save, &mut EventBus::new()).unwrap();
        assert_eq!(report.cells_bought, 1);
        assert_eq!(report.earned, 260);
        assert_eq!(save.owned_cells(1).len(), 5);
        assert_eq!(save.players[1].money, 500 - CELL_PRICE + 260 - 5);
        assert_eq!(save.sell_turn_items[0].id, "cow");
    }

    #[test]
    fn humans_are_left_alone() {
        let mut save = world(42, 6, 6, 1);
        let before = save.clone();
        assert_eq!(play_turn(&mut save, &mut EventBus::new()).unwrap(), BotReport::default());
        assert_eq!(save, before);
    }

    #[test]
    fn bot_turns_replay_from_the_seed() {
        let mut a = bot_turn_world();
        let mut b = bot_turn_world();
        play_turn(&mut a, &mut EventBus::new()).unwrap();
        play_turn(&mut b, &mut EventBus::new()).unwrap();
        assert_eq!(a, b);
    }
}
