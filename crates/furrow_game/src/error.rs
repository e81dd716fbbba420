use furrow_asset::AssetError;
use furrow_core::ecs::{RegistryError, SystemRegistrationError};
use furrow_net::NetError;
use furrow_render::BatchError;
use furrow_services::SaveDirError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum WorldError {
    #[error("map must be at least 2x2, got {width}x{height}")]
    InvalidMapSize { width: usize, height: usize },

    #[error("no free 2x2 block left for a village")]
    NoVillageSpace,

    #[error("no player with id {0}")]
    UnknownPlayer(usize),

    #[error("no cell at ({x}, {y})")]
    CellOutOfBounds { x: usize, y: usize },

    #[error("cell ({x}, {y}) is already owned")]
    CellTaken { x: usize, y: usize },

    #[error("cell ({x}, {y}) is not next to land of player {player}")]
    NotAdjacent { player: usize, x: usize, y: usize },

    #[error("cell ({x}, {y}) does not belong to player {player}")]
    NotOwner { player: usize, x: usize, y: usize },

    #[error("cell ({x}, {y}) already holds an item")]
    CellOccupied { x: usize, y: usize },

    #[error("cell ({x}, {y}) holds no item")]
    EmptyCell { x: usize, y: usize },

    #[error("unknown item {0:?}")]
    UnknownItem(String),

    #[error("player {player} does not hold {item:?}")]
    NotInInventory { player: usize, item: String },

    #[error("{needed} needed, {available} available")]
    InsufficientFunds { needed: i64, available: i64 },

    #[error("borrowing {requested} would exceed the limit of {limit}")]
    BorrowLimit { requested: i64, limit: i64 },

    #[error("invalid amount {0}")]
    InvalidAmount(i64),

    #[error("world is not serializable: {0}")]
    Encode(#[from] serde_json::Error),

    #[error(transparent)]
    Storage(#[from] SaveDirError),

    #[error(transparent)]
    Net(#[from] NetError),

    #[error(transparent)]
    Asset(#[from] AssetError),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    System(#[from] SystemRegistrationError),

    #[error(transparent)]
    Render(#[from] BatchError),
}
