pub mod config;
pub mod error;
pub mod game;
pub mod game_loop;
pub mod leaderboard;
pub mod room;
pub mod room_manager;
pub mod transport;

use serde::{Deserialize, Serialize};

pub const MIN_PLAYERS: usize = 1;
pub const MAX_PLAYERS: usize = 4;
pub const ROOM_CODE_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
pub const ROOM_CODE_LENGTH: usize = 4;

/// Transport-level connection id, unique for the lifetime of the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ClientId(pub u64);

impl std::fmt::Display for ClientId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
