//! Launch options
//!
//! Read from the free-form `game` section of the config file.

use std::path::PathBuf;

use furrow_game::{Save, WorldError, WorldSettings};
use furrow_net::NetMode;
use furrow_services::GameConfig;
use serde::Deserialize;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Launch {
    pub net_mode: NetMode,
    /// Listen address of the server, or the server to join.
    pub address: String,
    pub asset_dir: PathBuf,
    pub save_dir: PathBuf,
    /// World to resume instead of generating one.
    pub save: Option<PathBuf>,
    pub seed: Option<i64>,
    pub map_width: usize,
    pub map_height: usize,
    pub bots: usize,
    pub player_name: String,
    pub village_name: String,
    /// Seat of this node in the world's player list.
    pub player_id: usize,
}

impl Default for Launch {
    fn default() -> Self {
        let world = WorldSettings::default();
        Self {
            net_mode: NetMode::Standalone,
            address: "127.0.0.1:7777".to_string(),
            asset_dir: PathBuf::from("assets"),
            save_dir: PathBuf::from("saves"),
            save: None,
            seed: None,
            map_width: world.map_width,
            map_height: world.map_height,
            bots: world.number_of_bots,
            player_name: world.player_name,
            village_name: world.village_name,
            player_id: 0,
        }
    }
}

impl Launch {
    pub fn from_config(config: &GameConfig) -> Result<Self, serde_json::Error> {
        let section: serde_json::Map<String, serde_json::Value> = config
            .game
            .iter()
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();
        serde_json::from_value(serde_json::Value::Object(section))
    }

    /// The world this node starts with. Clients replace it with the
    /// server's copy as soon as it arrives.
    pub fn world(&self) -> Result<Save, WorldError> {
        let mut save = match &self.save {
            Some(path) => Save::load(path)?,
            None => Save::generate(WorldSettings {
                player_name: self.player_name.clone(),
                village_name: self.village_name.clone(),
                map_width: self.map_width,
                map_height: self.map_height,
                seed: self.seed,
                number_of_bots: self.bots,
                ..WorldSettings::default()
            })?,
        };
        save.local_player_id = self.player_id;
        Ok(save)
    }
}
