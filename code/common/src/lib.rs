pub mod codec;
pub mod entities;
pub mod geometry;
pub mod map;
pub mod nav;
pub mod phase;
pub mod protocol;
pub mod roles;
pub mod score;

pub use entities::*;
pub use geometry::{Circle, Obstacle, Rect};
pub use map::{MapId, MapLayout, World};
pub use phase::Phase;
pub use protocol::*;
pub use roles::{Role, RoleStats};

/// Simulation rate of every room.
pub const TICK_RATE: u32 = 20;
/// Fixed tick duration in seconds.
pub const DT: f32 = 1.0 / TICK_RATE as f32;
