//! Events published on the application bus

/// The turn was handed to the next player.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TurnEnded {
    pub turn: u32,
    pub current_player: usize,
    /// A full round completed and `turn` advanced.
    pub new_round: bool,
}

/// An item was put down on a cell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemPlaced {
    pub player: usize,
    pub x: usize,
    pub y: usize,
    pub item: String,
}

/// A player reached an end condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GameOver {
    pub player: usize,
    pub won: bool,
}
