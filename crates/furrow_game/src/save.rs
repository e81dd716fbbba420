//! World state
//!
//! Everything a game needs to resume: the map, the players and the market
//! logs. Persisted as JSON under the field names below. The generator is
//! never written out; it is rebuilt from `seed` on load, so a reloaded
//! world replays the sequence it started with.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use furrow_core::math::DeterministicRng;
use furrow_core::time::TIME_PER_TURN_SECS;
use furrow_render::{Color, Rect};
use furrow_services::{next_save_path, read_json, write_json};
use glam::Vec2;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

use crate::cell::{Cell, CellSprite, CELL_SIZE, MAP_MARGIN};
use crate::error::WorldError;
use crate::item::{default_animals, default_crops, Item};
use crate::player::{Player, PlayerColors, PlayerType};

/// Price of one cell of land.
pub const CELL_PRICE: i64 = 25;
pub const GRASS_TEXTURE: &str = "terrain/grass.png";
/// Grass variants per axis in the terrain sheet.
const GRASS_VARIANTS: i32 = 5;

/// Grid coordinates of a cell.
pub type CellPos = (usize, usize);

/// Parameters of a new world.
#[derive(Debug, Clone, PartialEq)]
pub struct WorldSettings {
    pub name: String,
    pub player_name: String,
    pub village_name: String,
    pub colors: PlayerColors,
    pub map_width: usize,
    pub map_height: usize,
    /// Taken from the wall clock when absent.
    pub seed: Option<i64>,
    pub number_of_bots: usize,
    pub max_borrow: i64,
    /// Interest added on borrowing, in percent.
    pub debt_rate: i64,
    pub bot_difficulty: u32,
}

impl Default for WorldSettings {
    fn default() -> Self {
        Self {
            name: "Farm".to_string(),
            player_name: "Player".to_string(),
            village_name: "Village".to_string(),
            colors: PlayerColors::uniform(Color::WHITE),
            map_width: 16,
            map_height: 16,
            seed: None,
            number_of_bots: 1,
            max_borrow: 500,
            debt_rate: 10,
            bot_difficulty: 1,
        }
    }
}

fn unseeded() -> DeterministicRng {
    DeterministicRng::new(0)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Save {
    pub name: String,
    pub turn: u32,
    pub turn_time_passed: u32,
    pub time_passed: u32,
    pub map_width: usize,
    pub map_height: usize,
    pub seed: i64,
    pub max_borrow: i64,
    pub debt_rate: i64,
    pub current_player_id: usize,
    pub players: Vec<Player>,
    #[serde(rename = "buyTurnItemDataBase")]
    pub buy_turn_items: Vec<Item>,
    #[serde(rename = "buyItemDatabasePerTurn")]
    pub buy_items_per_turn: Vec<Vec<Item>>,
    #[serde(rename = "sellTurnItemDataBase")]
    pub sell_turn_items: Vec<Item>,
    #[serde(rename = "sellItemDatabasePerTurn")]
    pub sell_items_per_turn: Vec<Vec<Item>>,
    #[serde(rename = "cropItem")]
    pub crop_items: Vec<Item>,
    #[serde(rename = "animalItem")]
    pub animal_items: Vec<Item>,
    /// Column-major: `cells[x][y]`.
    pub cells: Vec<Vec<Cell>>,
    pub capacity: u32,
    pub start_with_bots: bool,
    pub bot_difficulty: u32,
    pub dead_players: BTreeSet<usize>,

    #[serde(skip, default = "unseeded")]
    pub rng: DeterministicRng,
    #[serde(skip)]
    pub path: Option<PathBuf>,
    #[serde(skip)]
    pub local_player_id: usize,
}

impl Save {
    /// Build a new world. The same settings and seed always give the same
    /// map, bot colors and villages.
    pub fn generate(settings: WorldSettings) -> Result<Self, WorldError> {
        let (width, height) = (settings.map_width, settings.map_height);
        if width < 2 || height < 2 {
            return Err(WorldError::InvalidMapSize { width, height });
        }
        let seed = settings.seed.unwrap_or_else(wall_clock_seed);
        let mut random = DeterministicRng::new(seed);

        let mut cells = Vec::with_capacity(width);
        for x in 0..width {
            let mut column = Vec::with_capacity(height);
            for y in 0..height {
                let rx = random.generate_in_range(1, GRASS_VARIANTS);
                let ry = random.generate_in_range(1, GRASS_VARIANTS);
                let sprite = CellSprite {
                    texture: GRASS_TEXTURE.to_string(),
                    region: Rect::new(
                        CELL_SIZE * rx as f32,
                        CELL_SIZE * ry as f32,
                        CELL_SIZE,
                        CELL_SIZE,
                    ),
                };
                column.push(Cell::new(sprite, Cell::view_rectangle_at(x, y)));
            }
            cells.push(column);
        }

        let mut save = Save {
            name: settings.name,
            turn: 0,
            turn_time_passed: 0,
            time_passed: 0,
            map_width: width,
            map_height: height,
            seed,
            max_borrow: settings.max_borrow,
            debt_rate: settings.debt_rate,
            current_player_id: 0,
            players: Vec::new(),
            buy_turn_items: Vec::new(),
            buy_items_per_turn: Vec::new(),
            sell_turn_items: Vec::new(),
            sell_items_per_turn: Vec::new(),
            crop_items: default_crops(),
            animal_items: default_animals(),
            cells,
            capacity: 1,
            start_with_bots: settings.number_of_bots > 0,
            bot_difficulty: settings.bot_difficulty,
            dead_players: BTreeSet::new(),
            rng: DeterministicRng::new(seed),
            path: None,
            local_player_id: 0,
        };

        let human_block = (width / 2 - 1, height / 2 - 1);
        save.players.push(Player::new(
            settings.player_name,
            settings.village_name,
            settings.colors,
            PlayerType::Human,
        ));
        save.claim_village(0, human_block);

        let mut used_colors = Vec::new();
        let mut used_locations = vec![human_block];
        for i in 0..settings.number_of_bots {
            let color = generate_color(&mut random, &mut used_colors);
            let block = generate_map_location(&mut random, width, height, &mut used_locations)?;
            let id = save.players.len();
            save.players.push(Player::new(
                format!("Robot {}", i + 1),
                format!("Village de Robot {}", i + 1),
                PlayerColors::uniform(color),
                PlayerType::Robot,
            ));
            save.claim_village(id, block);
        }

        debug!(seed, width, height, players = save.players.len(), "world generated");
        Ok(save)
    }

    /// Read a save file, rebuilding everything that is not persisted.
    pub fn load(path: &Path) -> Result<Self, WorldError> {
        let mut save: Save = read_json(path)?;
        save.restore();
        save.path = Some(path.to_path_buf());
        info!(path = %path.display(), turn = save.turn, "world loaded");
        Ok(save)
    }

    /// Decode a world received from the authority.
    pub fn from_value(value: serde_json::Value) -> Result<Self, WorldError> {
        let mut save: Save = serde_json::from_value(value)?;
        save.restore();
        Ok(save)
    }

    pub fn to_value(&self) -> Result<serde_json::Value, WorldError> {
        Ok(serde_json::to_value(self)?)
    }

    /// Write to this world's file, allocating `save-<N>.json` in `dir` the
    /// first time.
    pub fn save_to_dir(&mut self, dir: &Path) -> Result<PathBuf, WorldError> {
        let path = match &self.path {
            Some(path) => path.clone(),
            None => next_save_path(dir)?,
        };
        write_json(&path, self)?;
        info!(path = %path.display(), "world saved");
        self.path = Some(path.clone());
        Ok(path)
    }

    fn restore(&mut self) {
        self.rng = DeterministicRng::new(self.seed);
        for violation in self.repair() {
            error!(%violation, "repaired world state");
        }
    }

    /// Fix states no valid sequence of turns can reach. Returns what was
    /// changed.
    pub fn repair(&mut self) -> Vec<String> {
        let mut fixed = Vec::new();
        if !self.players.is_empty() && self.current_player_id >= self.players.len() {
            fixed.push(format!("current player {} reset", self.current_player_id));
            self.current_player_id = 0;
        }
        if self.cells.len() != self.map_width
            || self.cells.iter().any(|column| column.len() != self.map_height)
        {
            fixed.push("map size taken from cells".to_string());
            self.map_width = self.cells.len();
            self.map_height = self.cells.first().map_or(0, Vec::len);
        }
        let players = self.players.len();
        for (x, column) in self.cells.iter_mut().enumerate() {
            for (y, cell) in column.iter_mut().enumerate() {
                let Some(owner) = cell.owner_id else { continue };
                if owner >= players || self.dead_players.contains(&owner) {
                    fixed.push(format!("cell ({x}, {y}) released from player {owner}"));
                    cell.owner_id = None;
                    cell.item = None;
                }
            }
        }
        fixed
    }

    // ------------------------------------------------------------------
    // Players
    // ------------------------------------------------------------------

    /// Add a human after the existing humans. Bots move up one id and keep
    /// their land.
    pub fn add_player(
        &mut self,
        name: impl Into<String>,
        village_name: impl Into<String>,
        colors: PlayerColors,
    ) -> Result<usize, WorldError> {
        let id = self.players.iter().filter(|p| !p.is_bot()).count();
        let mut used = self.used_locations();
        let block = generate_map_location(&mut self.rng, self.map_width, self.map_height, &mut used)?;

        let shift = |player: usize| if player >= id { player + 1 } else { player };
        for cell in self.cells.iter_mut().flatten() {
            cell.owner_id = cell.owner_id.map(shift);
        }
        self.dead_players = self.dead_players.iter().copied().map(shift).collect();
        if !self.players.is_empty() {
            self.current_player_id = shift(self.current_player_id);
        }

        self.players
            .insert(id, Player::new(name, village_name, colors, PlayerType::Human));
        self.claim_village(id, block);
        info!(player = id, "player joined");
        Ok(id)
    }

    pub fn player(&self, id: usize) -> Result<&Player, WorldError> {
        self.players.get(id).ok_or(WorldError::UnknownPlayer(id))
    }

    pub fn player_mut(&mut self, id: usize) -> Result<&mut Player, WorldError> {
        self.players.get_mut(id).ok_or(WorldError::UnknownPlayer(id))
    }

    pub fn current_player(&self) -> Option<&Player> {
        self.players.get(self.current_player_id)
    }

    pub fn local_player(&self) -> Option<&Player> {
        self.players.get(self.local_player_id)
    }

    pub fn is_local_player_turn(&self) -> bool {
        self.current_player_id == self.local_player_id
    }

    pub fn is_current_player_bot(&self) -> bool {
        self.current_player().is_some_and(Player::is_bot)
    }

    pub fn used_colors(&self) -> Vec<Color> {
        let mut colors: Vec<Color> = Vec::new();
        for player in &self.players {
            let banner = player.colors.banner;
            if !colors.iter().any(|c| c.to_rgba8() == banner.to_rgba8()) {
                colors.push(banner);
            }
        }
        colors
    }

    /// Village blocks in grid coordinates.
    pub fn used_locations(&self) -> Vec<CellPos> {
        let mut locations = Vec::new();
        for player in &self.players {
            let Some(position) = player.village.position else {
                continue;
            };
            let block = (
                ((position.x - MAP_MARGIN) / CELL_SIZE) as usize,
                ((position.y - MAP_MARGIN) / CELL_SIZE) as usize,
            );
            if !locations.contains(&block) {
                locations.push(block);
            }
        }
        locations
    }

    fn claim_village(&mut self, player: usize, (x, y): CellPos) {
        if let Some(p) = self.players.get_mut(player) {
            p.village.position = Some(Vec2::new(
                MAP_MARGIN + x as f32 * CELL_SIZE,
                MAP_MARGIN + y as f32 * CELL_SIZE,
            ));
        }
        for (cx, cy) in [(x, y), (x + 1, y), (x, y + 1), (x + 1, y + 1)] {
            if let Some(cell) = self.cell_mut(cx, cy) {
                cell.set_owner(Some(player));
            }
        }
    }

    pub fn is_dead(&self, player: usize) -> bool {
        self.dead_players.contains(&player)
    }

    /// Retire a player and release its land. Returns false when it was
    /// already out.
    pub fn mark_dead(&mut self, player: usize) -> Result<bool, WorldError> {
        self.player(player)?;
        if !self.dead_players.insert(player) {
            return Ok(false);
        }
        for cell in self.cells.iter_mut().flatten() {
            if cell.is_owned_by(player) {
                cell.owner_id = None;
                cell.item = None;
            }
        }
        info!(player, "player out");
        Ok(true)
    }

    /// The first human has gone bankrupt or won. A world without humans
    /// counts as finished.
    pub fn human_finished(&self) -> bool {
        self.players
            .iter()
            .find(|p| !p.is_bot())
            .map_or(true, Player::has_finished)
    }

    /// Some live bot has gone bankrupt or won.
    pub fn bot_finished(&self) -> bool {
        self.players
            .iter()
            .enumerate()
            .any(|(id, p)| p.is_bot() && !self.is_dead(id) && p.has_finished())
    }

    /// Live players meeting an end condition.
    pub fn finished_players(&self) -> Vec<usize> {
        self.players
            .iter()
            .enumerate()
            .filter(|(id, p)| !self.is_dead(*id) && p.has_finished())
            .map(|(id, _)| id)
            .collect()
    }

    // ------------------------------------------------------------------
    // Map
    // ------------------------------------------------------------------

    pub fn cell(&self, x: usize, y: usize) -> Option<&Cell> {
        self.cells.get(x)?.get(y)
    }

    pub fn cell_mut(&mut self, x: usize, y: usize) -> Option<&mut Cell> {
        self.cells.get_mut(x)?.get_mut(y)
    }

    fn cell_checked(&self, x: usize, y: usize) -> Result<&Cell, WorldError> {
        self.cell(x, y).ok_or(WorldError::CellOutOfBounds { x, y })
    }

    /// Every cell with its coordinates, column by column.
    pub fn cells_iter(&self) -> impl Iterator<Item = (CellPos, &Cell)> {
        self.cells.iter().enumerate().flat_map(|(x, column)| {
            column.iter().enumerate().map(move |(y, cell)| ((x, y), cell))
        })
    }

    /// Cell under a world-space point.
    pub fn cell_at(&self, point: Vec2) -> Option<CellPos> {
        let x = (point.x - MAP_MARGIN) / CELL_SIZE;
        let y = (point.y - MAP_MARGIN) / CELL_SIZE;
        if x < 0.0 || y < 0.0 {
            return None;
        }
        let pos = (x as usize, y as usize);
        self.cell(pos.0, pos.1).map(|_| pos)
    }

    pub fn owned_cells(&self, player: usize) -> Vec<CellPos> {
        self.cells_iter()
            .filter(|(_, cell)| cell.is_owned_by(player))
            .map(|(pos, _)| pos)
            .collect()
    }

    pub fn owned_cells_with_no_item(&self, player: usize) -> Vec<CellPos> {
        self.cells_iter()
            .filter(|(_, cell)| cell.is_owned_by(player) && !cell.has_item())
            .map(|(pos, _)| pos)
            .collect()
    }

    fn touches_land_of(&self, player: usize, (x, y): CellPos) -> bool {
        let neighbours = [
            x.checked_sub(1).map(|x| (x, y)),
            Some((x + 1, y)),
            y.checked_sub(1).map(|y| (x, y)),
            Some((x, y + 1)),
        ];
        neighbours
            .into_iter()
            .flatten()
            .any(|(nx, ny)| self.cell(nx, ny).is_some_and(|c| c.is_owned_by(player)))
    }

    /// Unowned cells sharing an edge with land of `player`.
    pub fn close_cells_available(&self, player: usize) -> Vec<CellPos> {
        self.cells_iter()
            .filter(|(pos, cell)| !cell.is_owned() && self.touches_land_of(player, *pos))
            .map(|(pos, _)| pos)
            .collect()
    }

    pub fn buy_cell(&mut self, player: usize, x: usize, y: usize) -> Result<(), WorldError> {
        if self.cell_checked(x, y)?.is_owned() {
            return Err(WorldError::CellTaken { x, y });
        }
        if !self.touches_land_of(player, (x, y)) {
            return Err(WorldError::NotAdjacent { player, x, y });
        }
        pay(self.player_mut(player)?, CELL_PRICE)?;
        if let Some(cell) = self.cell_mut(x, y) {
            cell.set_owner(Some(player));
        }
        debug!(player, x, y, "cell bought");
        Ok(())
    }

    // ------------------------------------------------------------------
    // Items and market
    // ------------------------------------------------------------------

    /// Items on sale, crops first.
    pub fn catalog(&self) -> impl Iterator<Item = &Item> {
        self.crop_items.iter().chain(self.animal_items.iter())
    }

    pub fn catalog_item(&self, id: &str) -> Option<&Item> {
        self.catalog().find(|item| item.id == id)
    }

    /// Buy one unit of `id` into the player's inventory.
    pub fn buy_item(&mut self, player: usize, id: &str) -> Result<(), WorldError> {
        let item = self
            .catalog_item(id)
            .cloned()
            .ok_or_else(|| WorldError::UnknownItem(id.to_string()))?;
        let buyer = self.player_mut(player)?;
        pay(buyer, item.buying_value)?;
        Player::stock(&mut buyer.buy_inventory, &item);
        self.fill_turn_item_database(&item, true);
        Ok(())
    }

    /// Put one unit from the player's inventory on an empty cell it owns.
    pub fn place_item(
        &mut self,
        player: usize,
        id: &str,
        x: usize,
        y: usize,
    ) -> Result<(), WorldError> {
        let cell = self.cell_checked(x, y)?;
        if !cell.is_owned_by(player) {
            return Err(WorldError::NotOwner { player, x, y });
        }
        if cell.has_item() {
            return Err(WorldError::CellOccupied { x, y });
        }
        let unit = self
            .player_mut(player)?
            .unstock(id)
            .ok_or_else(|| WorldError::NotInInventory {
                player,
                item: id.to_string(),
            })?;
        if let Some(cell) = self.cell_mut(x, y) {
            cell.item = Some(unit);
        }
        Ok(())
    }

    /// Pick up the item of an owned cell into the sell inventory.
    pub fn collect_item(&mut self, player: usize, x: usize, y: usize) -> Result<Item, WorldError> {
        let cell = self.cell_checked(x, y)?;
        if !cell.is_owned_by(player) {
            return Err(WorldError::NotOwner { player, x, y });
        }
        self.player(player)?;
        let item = self
            .cell_mut(x, y)
            .and_then(|cell| cell.item.take())
            .ok_or(WorldError::EmptyCell { x, y })?;
        let seller = self.player_mut(player)?;
        Player::stock(&mut seller.sell_inventory, &item);
        Ok(item)
    }

    /// Sell everything in the player's sell inventory at current prices.
    /// Returns the money earned.
    pub fn sell_inventory(&mut self, player: usize) -> Result<i64, WorldError> {
        let inventory = std::mem::take(&mut self.player_mut(player)?.sell_inventory);
        let mut earned = 0;
        for mut item in inventory.into_values() {
            if let Some(listed) = self.catalog_item(&item.id) {
                item.selling_value = listed.selling_value;
            }
            self.fill_turn_item_database(&item, false);
            earned += item.quantity as i64 * item.selling_value;
        }
        self.player_mut(player)?.money += earned;
        Ok(earned)
    }

    /// Record one trade of `item` in this turn's log.
    pub fn fill_turn_item_database(&mut self, item: &Item, buy: bool) {
        let log = if buy {
            &mut self.buy_turn_items
        } else {
            &mut self.sell_turn_items
        };
        match log.iter_mut().find(|logged| logged.id == item.id) {
            Some(logged) => logged.quantity += 1,
            None => log.push(item.single()),
        }
    }

    /// Append this turn's logs to the per-turn history.
    pub fn fill_item_database_per_turn(&mut self) {
        self.buy_items_per_turn.push(self.buy_turn_items.clone());
        self.sell_items_per_turn.push(self.sell_turn_items.clone());
    }

    pub fn clear_turn_item_database(&mut self) {
        self.buy_turn_items.clear();
        self.sell_turn_items.clear();
    }

    // ------------------------------------------------------------------
    // Money
    // ------------------------------------------------------------------

    pub fn borrow(&mut self, player: usize, amount: i64) -> Result<(), WorldError> {
        if amount <= 0 {
            return Err(WorldError::InvalidAmount(amount));
        }
        let (limit, rate) = (self.max_borrow, self.debt_rate);
        let borrower = self.player_mut(player)?;
        if borrower.debt_money + amount > limit {
            return Err(WorldError::BorrowLimit {
                requested: amount,
                limit,
            });
        }
        borrower.money += amount;
        borrower.debt_money += amount + amount * rate / 100;
        Ok(())
    }

    /// Pay back up to `amount` of debt. Returns what was repaid.
    pub fn repay(&mut self, player: usize, amount: i64) -> Result<i64, WorldError> {
        if amount <= 0 {
            return Err(WorldError::InvalidAmount(amount));
        }
        let debtor = self.player_mut(player)?;
        let amount = amount.min(debtor.debt_money);
        pay(debtor, amount)?;
        debtor.debt_money -= amount;
        Ok(amount)
    }

    // ------------------------------------------------------------------
    // Time and turns
    // ------------------------------------------------------------------

    /// Count `seconds` of play. Returns true once the current turn has
    /// used its time budget.
    pub fn advance_time(&mut self, seconds: u32) -> bool {
        self.time_passed += seconds;
        self.turn_time_passed += seconds;
        self.turn_time_passed >= TIME_PER_TURN_SECS
    }

    /// Hand the turn to the next player. After the last player the turn
    /// counter moves on and the market log is archived and cleared.
    /// Returns true when a new round started.
    pub fn advance_turn(&mut self) -> bool {
        self.turn_time_passed = 0;
        if self.current_player_id + 1 >= self.players.len() {
            self.turn += 1;
            self.current_player_id = 0;
            self.fill_item_database_per_turn();
            self.clear_turn_item_database();
            true
        } else {
            self.current_player_id += 1;
            false
        }
    }
}

fn pay(player: &mut Player, amount: i64) -> Result<(), WorldError> {
    if player.money < amount {
        return Err(WorldError::InsufficientFunds {
            needed: amount,
            available: player.money,
        });
    }
    player.money -= amount;
    Ok(())
}

fn wall_clock_seed() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as i64)
        .unwrap_or_default()
}

/// Draw colors until one differs from every color in `used`.
fn generate_color(random: &mut DeterministicRng, used: &mut Vec<[u8; 4]>) -> Color {
    loop {
        let r = random.generate_in_range(0, 255) as u8;
        let g = random.generate_in_range(0, 255) as u8;
        let b = random.generate_in_range(0, 255) as u8;
        let a = random.generate_in_range(0, 255) as u8;
        let rgba = [r, g, b, a];
        if !used.contains(&rgba) {
            used.push(rgba);
            return Color::from_rgba8(r, g, b, a);
        }
    }
}

fn blocks_overlap(a: CellPos, b: CellPos) -> bool {
    a.0 < b.0 + 2 && a.0 + 2 > b.0 && a.1 < b.1 + 2 && a.1 + 2 > b.1
}

fn is_free(block: CellPos, used: &[CellPos]) -> bool {
    !used.iter().any(|&other| blocks_overlap(block, other))
}

/// Draw 2x2 blocks until one overlaps none in `used`. Fails without
/// drawing when no such block exists.
fn generate_map_location(
    random: &mut DeterministicRng,
    width: usize,
    height: usize,
    used: &mut Vec<CellPos>,
) -> Result<CellPos, WorldError> {
    let any_free = (0..width.saturating_sub(1))
        .any(|x| (0..height.saturating_sub(1)).any(|y| is_free((x, y), used)));
    if !any_free {
        return Err(WorldError::NoVillageSpace);
    }
    loop {
        let x = random.generate_in_range(0, width as i32 - 2) as usize;
        let y = random.generate_in_range(0, height as i32 - 2) as usize;
        if is_free((x, y), used) {
            used.push((x, y));
            return Ok((x, y));
        }
    }
}
