use furrow_render::Rect;
use serde::{Deserialize, Serialize};

use crate::item::Item;
use crate::player::Player;

/// Side of a cell, in pixels.
pub const CELL_SIZE: f32 = 24.0;
/// Offset of the map from the world origin, in pixels.
pub const MAP_MARGIN: f32 = 5.0;

/// Background texture region of a cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CellSprite {
    pub texture: String,
    pub region: Rect,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cell {
    pub sprite: CellSprite,
    /// `[x0, y0, x1, y1]` in world pixels.
    pub view_rectangle: [f32; 4],
    pub owner_id: Option<usize>,
    pub item: Option<Item>,
}

impl Cell {
    pub fn new(sprite: CellSprite, view_rectangle: [f32; 4]) -> Self {
        Self {
            sprite,
            view_rectangle,
            owner_id: None,
            item: None,
        }
    }

    /// View rectangle of the cell at grid position `(x, y)`.
    pub fn view_rectangle_at(x: usize, y: usize) -> [f32; 4] {
        let x0 = MAP_MARGIN + x as f32 * CELL_SIZE;
        let y0 = MAP_MARGIN + y as f32 * CELL_SIZE;
        [x0, y0, x0 + CELL_SIZE, y0 + CELL_SIZE]
    }

    pub fn is_owned(&self) -> bool {
        self.owner_id.is_some()
    }

    pub fn is_owned_by(&self, player: usize) -> bool {
        self.owner_id == Some(player)
    }

    pub fn has_item(&self) -> bool {
        self.item.is_some()
    }

    pub fn is_owned_by_bot(&self, players: &[Player]) -> bool {
        self.owner_id
            .and_then(|owner| players.get(owner))
            .is_some_and(Player::is_bot)
    }

    pub fn set_owner(&mut self, owner: Option<usize>) {
        self.owner_id = owner;
    }

    pub fn contains(&self, x: f32, y: f32) -> bool {
        let [x0, y0, x1, y1] = self.view_rectangle;
        x >= x0 && x < x1 && y >= y0 && y < y1
    }
}
