//! The farm map
//!
//! Terrain tiles live in the scene registry and are drawn by a render
//! system; ownership, items and the HUD are drawn straight from the world.

use std::cell::Cell as Slot;
use std::collections::HashMap;
use std::rc::Rc;
use std::sync::Arc;
use std::time::Duration;

use furrow_core::ecs::{Registry, SystemDescriptor, SystemHandle};
use furrow_render::{Camera2D, DrawParams, Font, RenderBackend, Sprite, SpriteBatch, Texture};
use glam::Vec2;
use tracing::{debug, info, warn};

use crate::cell::CELL_SIZE;
use crate::components::{GridPosition, SpriteRenderer, Transform};
use crate::context::AppContext;
use crate::error::WorldError;
use crate::events::{GameOver, ItemPlaced};
use crate::save::{CellPos, Save};
use crate::scene::{Scene, Transition};
use crate::turn::TurnController;

/// Camera pan speed in world pixels per second.
pub const CAMERA_SPEED: f32 = 300.0;
const ZOOM_STEP: f32 = 0.1;

const TERRAIN_Z: i32 = 0;
const OVERLAY_Z: i32 = 1;
const ITEM_Z: i32 = 2;
const HUD_Z: i32 = 10;

const HUD_FONT: &str = "default.ttf";
const HUD_FONT_SIZE: u32 = 16;
/// Key code of `1`; `1`..`9` pick catalog entries.
const FIRST_DIGIT_KEY: i32 = 49;

pub struct WorldScene {
    save: Save,
    turns: TurnController,
    registry: Registry,
    camera: Camera2D,
    render_system: Option<SystemHandle>,
    item_textures: HashMap<String, Texture>,
    font: Option<Arc<Font>>,
    selected_item: usize,
    show_territory: bool,
    game_over: Rc<Slot<Option<GameOver>>>,
}

impl WorldScene {
    pub fn new(save: Save) -> Self {
        Self {
            save,
            turns: TurnController::new(),
            registry: Registry::new(),
            camera: Camera2D::default(),
            render_system: None,
            item_textures: HashMap::new(),
            font: None,
            selected_item: 0,
            show_territory: false,
            game_over: Rc::new(Slot::new(None)),
        }
    }

    pub fn save(&self) -> &Save {
        &self.save
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn turns(&self) -> &TurnController {
        &self.turns
    }

    /// Id of the catalog entry placed by `putItem`.
    pub fn selected_item(&self) -> Option<&str> {
        self.save
            .catalog()
            .nth(self.selected_item)
            .map(|item| item.id.as_str())
    }

    fn spawn_tiles(
        &mut self,
        ctx: &mut AppContext,
        backend: &mut dyn RenderBackend,
    ) -> Result<(), WorldError> {
        let mut sheets: HashMap<String, Texture> = HashMap::new();
        for ((x, y), cell) in self.save.cells_iter() {
            let texture = match sheets.get(&cell.sprite.texture) {
                Some(texture) => *texture,
                None => {
                    let texture = ctx.resources.textures.load(backend, &cell.sprite.texture)?;
                    sheets.insert(cell.sprite.texture.clone(), texture);
                    texture
                }
            };
            let origin = Vec2::new(cell.view_rectangle[0], cell.view_rectangle[1]);
            let tile = self.registry.create_entity();
            self.registry.add_component(tile, GridPosition { x, y })?;
            self.registry.add_component(tile, Transform::at(origin))?;
            self.registry.add_component(
                tile,
                SpriteRenderer::new(Sprite::new(texture, cell.sprite.region), TERRAIN_Z),
            )?;
        }
        Ok(())
    }

    fn center_on_village(&mut self) {
        let Some(village) = self.save.local_player().and_then(|p| p.village.position) else {
            return;
        };
        let center = village + Vec2::splat(CELL_SIZE);
        self.camera.position = center - self.camera.viewport / (2.0 * self.camera.zoom);
    }

    fn move_camera(&mut self, dt: Duration, ctx: &AppContext) {
        let mut direction = Vec2::ZERO;
        if ctx.is_action_down("goUp") {
            direction.y -= 1.0;
        }
        if ctx.is_action_down("goDown") {
            direction.y += 1.0;
        }
        if ctx.is_action_down("goLeft") {
            direction.x -= 1.0;
        }
        if ctx.is_action_down("goRight") {
            direction.x += 1.0;
        }
        if direction != Vec2::ZERO {
            let step = direction.normalize() * CAMERA_SPEED * dt.as_secs_f32() / self.camera.zoom;
            self.camera.move_by(step);
        }
        let scroll = ctx.input.scroll().y;
        if scroll != 0.0 {
            self.camera.set_zoom(self.camera.zoom + scroll * ZOOM_STEP);
        }
    }

    fn select_item(&mut self, ctx: &AppContext) {
        let count = self.save.catalog().count().min(9);
        for index in 0..count {
            if ctx.input.is_key_pressed(FIRST_DIGIT_KEY + index as i32) {
                self.selected_item = index;
            }
        }
    }

    /// Mouse actions of the local player. Rule violations are reported and
    /// leave the world untouched.
    fn player_actions(&mut self, ctx: &mut AppContext) -> Result<(), WorldError> {
        let point = self.camera.screen_to_world(ctx.input.mouse_position());
        let Some(pos) = self.save.cell_at(point) else {
            return Ok(());
        };
        let result = if ctx.is_action_pressed("putItem") {
            self.put(pos, ctx)
        } else if ctx.is_action_pressed("getItem") {
            self.take(pos)
        } else {
            return Ok(());
        };
        match result {
            Ok(()) => Ok(()),
            Err(err @ (WorldError::Storage(_) | WorldError::Net(_))) => Err(err),
            Err(err) => {
                debug!(%err, x = pos.0, y = pos.1, "action refused");
                Ok(())
            }
        }
    }

    /// Buy a free cell, or put the selected item on an empty owned one.
    fn put(&mut self, (x, y): CellPos, ctx: &mut AppContext) -> Result<(), WorldError> {
        let player = self.save.local_player_id;
        let Some(cell) = self.save.cell(x, y) else {
            return Ok(());
        };
        if !cell.is_owned() {
            return self.save.buy_cell(player, x, y);
        }
        let Some(item) = self.selected_item().map(str::to_string) else {
            return Ok(());
        };
        if !cell.is_owned_by(player) {
            return Err(WorldError::NotOwner { player, x, y });
        }
        if cell.has_item() {
            return Err(WorldError::CellOccupied { x, y });
        }
        self.save.buy_item(player, &item)?;
        self.save.place_item(player, &item, x, y)?;
        ctx.events.dispatch(&ItemPlaced { player, x, y, item });
        Ok(())
    }

    fn take(&mut self, (x, y): CellPos) -> Result<(), WorldError> {
        let item = self.save.collect_item(self.save.local_player_id, x, y)?;
        debug!(item = %item.id, x, y, "item collected");
        Ok(())
    }

    fn end_local_turn(&mut self, ctx: &mut AppContext) -> Result<(), WorldError> {
        if ctx.session.has_authority() {
            let earned = self.save.sell_inventory(self.save.local_player_id)?;
            if earned > 0 {
                info!(earned, "harvest sold");
            }
        }
        self.turns
            .end_turn(&mut self.save, &mut ctx.session, &mut ctx.events)?;
        Ok(())
    }

    fn hud_line(&self) -> Option<String> {
        let player = self.save.local_player()?;
        let mut line = format!(
            "Turn {}  {}  money {}  debt {}  [{}]",
            self.save.turn,
            player.name,
            player.money,
            player.debt_money,
            self.selected_item().unwrap_or("-"),
        );
        if let Some(over) = self.game_over.get() {
            if over.player == self.save.local_player_id {
                line.push_str(if over.won { "  You won" } else { "  You lost" });
            }
        }
        Some(line)
    }
}

impl Scene for WorldScene {
    fn name(&self) -> &str {
        "world"
    }

    fn initialize(
        &mut self,
        ctx: &mut AppContext,
        backend: &mut dyn RenderBackend,
    ) -> Result<(), WorldError> {
        let system = SystemDescriptor::new("tile_render")
            .reads::<Transform>()
            .reads::<SpriteRenderer>();
        self.render_system = Some(self.registry.register_system(system)?);
        self.spawn_tiles(ctx, backend)?;

        let ids: Vec<String> = self.save.catalog().map(|item| item.id.clone()).collect();
        for id in ids {
            let texture = ctx.resources.textures.load(backend, &format!("items/{id}.png"))?;
            self.item_textures.insert(id, texture);
        }
        self.font = Some(ctx.resources.fonts.load(backend, HUD_FONT, HUD_FONT_SIZE));

        let slot = self.game_over.clone();
        ctx.events.subscribe::<GameOver, _>(move |event| slot.set(Some(*event)));

        let window = ctx.config.window_size;
        self.camera.resize(Vec2::new(window.x as f32, window.y as f32));
        self.center_on_village();
        self.turns.resume(&self.save);
        info!(
            world = %self.save.name,
            players = self.save.players.len(),
            tiles = self.registry.entity_count(),
            "world scene ready"
        );
        Ok(())
    }

    fn update(&mut self, dt: Duration, ctx: &mut AppContext) -> Result<Transition, WorldError> {
        self.turns
            .handle_messages(&mut self.save, &mut ctx.session, &mut ctx.events)?;

        self.move_camera(dt, ctx);
        self.select_item(ctx);
        self.show_territory = ctx.is_action_down("showTerritory");

        if self.save.is_local_player_turn() && !self.save.is_dead(self.save.local_player_id) {
            if ctx.session.has_authority() {
                self.player_actions(ctx)?;
            }
            if ctx.is_action_pressed("endTurn") {
                self.end_local_turn(ctx)?;
            }
        }

        self.turns
            .update(dt, &mut self.save, &mut ctx.session, &mut ctx.events)?;
        self.registry.flush_kills();
        Ok(Transition::Stay)
    }

    fn render(&self, batch: &mut SpriteBatch, _ctx: &AppContext) {
        if let Some(system) = self.render_system {
            for tile in self.registry.system_entities(system) {
                let (Some(transform), Some(renderer)) = (
                    self.registry.get_component::<Transform>(tile),
                    self.registry.get_component::<SpriteRenderer>(tile),
                ) else {
                    continue;
                };
                let params = DrawParams::at_z(renderer.z_index)
                    .with_tint(renderer.tint)
                    .with_rotation(transform.rotation)
                    .with_scale(transform.scale);
                batch.sprite(&renderer.sprite, transform.position, params);
            }
        }

        let size = Vec2::splat(CELL_SIZE);
        for (_, cell) in self.save.cells_iter() {
            let origin = Vec2::new(cell.view_rectangle[0], cell.view_rectangle[1]);
            if let Some(owner) = cell.owner_id.and_then(|id| self.save.players.get(id)) {
                let color = owner.colors.banner;
                if self.show_territory {
                    batch.filled_rectangle(
                        origin,
                        size,
                        DrawParams::at_z(OVERLAY_Z).with_tint(color.with_alpha(0.4)),
                    );
                }
                batch.rectangle(origin, size, 1.0, DrawParams::at_z(OVERLAY_Z).with_tint(color));
            }
            let Some(texture) = cell
                .item
                .as_ref()
                .and_then(|item| self.item_textures.get(&item.id))
            else {
                continue;
            };
            let scale = size / Vec2::new(texture.width() as f32, texture.height() as f32);
            batch.sprite(
                &Sprite::whole(*texture),
                origin,
                DrawParams::at_z(ITEM_Z).with_scale(scale),
            );
        }

        if let (Some(font), Some(line)) = (&self.font, self.hud_line()) {
            let position = self.camera.screen_to_world(Vec2::splat(8.0));
            let params = DrawParams::at_z(HUD_Z).with_scale(Vec2::splat(1.0 / self.camera.zoom));
            batch.text(&line, font, position, params);
        }
    }

    fn camera(&self) -> Option<&Camera2D> {
        Some(&self.camera)
    }

    fn registry_mut(&mut self) -> Option<&mut Registry> {
        Some(&mut self.registry)
    }

    fn resize(&mut self, viewport: Vec2) {
        self.camera.resize(viewport);
    }

    /// Authority nodes write the world back before leaving.
    fn destroy(&mut self, ctx: &mut AppContext, _backend: &mut dyn RenderBackend) {
        if !ctx.session.has_authority() {
            return;
        }
        if let Err(err) = self.save.save_to_dir(&ctx.save_dir) {
            warn!(%err, "world could not be saved");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::save::tests::world;
    use crate::scene::SceneManager;
    use furrow_net::{ServerHub, Session};
    use furrow_render::RecordingBackend;
    use furrow_services::input::keys;
    use furrow_services::GameConfig;

    const FRAME: Duration = Duration::from_millis(16);

    fn context(saves: &std::path::Path) -> AppContext {
        AppContext::new(GameConfig::default(), "no-assets", saves)
    }

    fn ready(save: Save, ctx: &mut AppContext, backend: &mut RecordingBackend) -> WorldScene {
        let mut scene = WorldScene::new(save);
        scene.initialize(ctx, backend).unwrap();
        scene
    }

    /// Press and release a mouse button over the centre of a cell.
    fn click(scene: &mut WorldScene, ctx: &mut AppContext, button: i32, (x, y): CellPos) {
        let [x0, y0, _, _] = scene.save.cells[x][y].view_rectangle;
        let world = Vec2::new(x0, y0) + Vec2::splat(CELL_SIZE / 2.0);
        ctx.input.begin_frame();
        ctx.input.set_mouse_position(scene.camera.world_to_screen(world));
        ctx.input.set_mouse_button(button, true);
        scene.update(FRAME, ctx).unwrap();
        ctx.input.begin_frame();
        ctx.input.set_mouse_button(button, false);
    }

    #[test]
    fn tiles_become_entities() {
        let dir = tempfile::tempdir().unwrap();
        let mut ctx = context(dir.path());
        let mut backend = RecordingBackend::new();
        let scene = ready(world(42, 6, 6, 1), &mut ctx, &mut backend);

        assert_eq!(scene.registry().entity_count(), 36);
        let system = scene.render_system.unwrap();
        assert_eq!(scene.registry().system_entities(system).len(), 36);
        assert_eq!(scene.selected_item(), Some("pumpkin"));
        // village block (2, 2) is centred
        let centre = scene.camera.position + scene.camera.viewport / 2.0;
        let village = scene.save().players[0].village.position.unwrap();
        assert_eq!(centre, village + Vec2::splat(CELL_SIZE));
    }

    #[test]
    fn frame_draws_tiles_borders_and_hud() {
        let dir = tempfile::tempdir().unwrap();
        let mut ctx = context(dir.path());
        let mut backend = RecordingBackend::new();
        let mut batch = SpriteBatch::new(&mut backend, 4096).unwrap();
        let mut scenes = SceneManager::new();
        scenes.change_scene(Box::new(WorldScene::new(world(42, 6, 6, 1))));
        scenes.update(FRAME, &mut ctx, &mut backend).unwrap();

        let stats = scenes.render(&mut batch, &ctx, &mut backend).unwrap();
        // 36 tiles, 8 owned cells with 4-sided borders, empty HUD font
        assert_eq!(stats.elements, 36 + 8 * 4);
        assert_eq!(stats.dropped, 0);
    }

    #[test]
    fn local_player_buys_plants_and_harvests() {
        let dir = tempfile::tempdir().unwrap();
        let mut ctx = context(dir.path());
        let mut backend = RecordingBackend::new();
        let mut scene = ready(world(42, 6, 6, 1), &mut ctx, &mut backend);
        let placed = Rc::new(Slot::new(0));
        let counter = placed.clone();
        ctx.events
            .subscribe::<ItemPlaced, _>(move |_| counter.set(counter.get() + 1));

        // human village is (2, 2)..(3, 3); (4, 2) touches it
        click(&mut scene, &mut ctx, keys::MOUSE_LEFT, (4, 2));
        assert!(scene.save().cells[4][2].is_owned_by(0));
        assert_eq!(scene.save().players[0].money, 500 - 25);

        click(&mut scene, &mut ctx, keys::MOUSE_LEFT, (2, 2));
        assert_eq!(scene.save().cells[2][2].item.as_ref().unwrap().id, "pumpkin");
        assert_eq!(scene.save().players[0].money, 500 - 25 - 25);
        assert_eq!(placed.get(), 1);

        // occupied: refused without touching the money
        click(&mut scene, &mut ctx, keys::MOUSE_LEFT, (2, 2));
        assert_eq!(scene.save().players[0].money, 450);

        click(&mut scene, &mut ctx, keys::MOUSE_RIGHT, (2, 2));
        assert!(!scene.save().cells[2][2].has_item());
        assert_eq!(scene.save().players[0].sell_inventory["pumpkin"].quantity, 1);

        ctx.input.set_key(keys::ENTER, true);
        scene.update(FRAME, &mut ctx).unwrap();
        assert_eq!(scene.save().players[0].money, 450 + 40);
        assert!(scene.save().players[0].sell_inventory.is_empty());
        // the bot played in the same update and handed the turn back
        assert_eq!(scene.save().turn, 1);
        assert_eq!(scene.save().current_player_id, 0);
    }

    #[test]
    fn digit_keys_pick_the_item() {
        let dir = tempfile::tempdir().unwrap();
        let mut ctx = context(dir.path());
        let mut backend = RecordingBackend::new();
        let mut scene = ready(world(42, 6, 6, 1), &mut ctx, &mut backend);

        ctx.input.set_key(FIRST_DIGIT_KEY + 3, true);
        scene.update(FRAME, &mut ctx).unwrap();
        assert_eq!(scene.selected_item(), Some("cow"));
    }

    #[test]
    fn clients_only_ask_to_end_the_turn() {
        let dir = tempfile::tempdir().unwrap();
        let mut hub = ServerHub::new();
        let mut ctx = context(dir.path()).with_session(Session::Client(hub.connect_local()));
        let mut backend = RecordingBackend::new();
        let mut scene = ready(world(42, 6, 6, 1), &mut ctx, &mut backend);

        click(&mut scene, &mut ctx, keys::MOUSE_LEFT, (4, 2));
        assert!(!scene.save().cells[4][2].is_owned());

        ctx.input.set_key(keys::ENTER, true);
        scene.update(FRAME, &mut ctx).unwrap();
        assert_eq!(scene.save().current_player_id, 0);
        assert_eq!(hub.drain().len(), 1);

        scene.destroy(&mut ctx, &mut backend);
        assert!(scene.save().path.is_none(), "clients never write the world");
    }

    #[test]
    fn leaving_the_scene_saves_the_world() {
        let dir = tempfile::tempdir().unwrap();
        let mut ctx = context(dir.path());
        let mut backend = RecordingBackend::new();
        let mut scenes = SceneManager::new();
        scenes.change_scene(Box::new(WorldScene::new(world(42, 6, 6, 1))));
        scenes.update(FRAME, &mut ctx, &mut backend).unwrap();

        scenes.shutdown(&mut ctx, &mut backend);
        let saved = Save::load(&dir.path().join("save-1.json")).unwrap();
        assert_eq!(saved.seed, 42);
        assert_eq!(saved.players.len(), 2);
        assert_eq!(ctx.events.listener_count::<GameOver>(), 0);
    }
}
