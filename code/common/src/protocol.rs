use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::entities::{BossAttack, EnemyKind, InputState, PlayerId, ScoreCounters};
use crate::map::MapId;
use crate::phase::Phase;
use crate::roles::Role;

/// Four-character room code, upper-case alphanumeric.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomCode(pub String);

impl RoomCode {
    /// Codes are matched case-insensitively.
    pub fn normalized(raw: &str) -> Self {
        Self(raw.trim().to_ascii_uppercase())
    }
}

impl std::fmt::Display for RoomCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

// --- Client -> Server ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ClientMessage {
    CreateRoom {
        #[serde(default)]
        name: String,
    },
    JoinRoom {
        #[serde(default)]
        name: String,
        room_code: String,
    },
    SelectRole {
        role: Role,
    },
    Ready,
    StartGame,
    Input(InputState),
    TriviaResult {
        success: bool,
    },
    Chat {
        msg: String,
    },
    #[serde(rename = "webrtc_signal")]
    WebrtcSignal {
        target_id: PlayerId,
        signal_data: Value,
    },
    DevSkipPhase,
}

// --- Server -> Client ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ServerMessage {
    RoomCreated {
        room_code: RoomCode,
        player_id: PlayerId,
    },
    RoomJoined {
        room_code: RoomCode,
        player_id: PlayerId,
    },
    LobbyUpdate {
        room_code: RoomCode,
        players: Vec<LobbyPlayer>,
        can_start: bool,
    },
    AssignId {
        player_id: PlayerId,
    },
    GameStart,
    GameState(Box<GameSnapshot>),
    GameOver {
        victory: bool,
        scores: Vec<FinalScore>,
        time_remaining: f32,
    },
    Error {
        message: String,
    },
    #[serde(rename = "webrtc_signal")]
    WebrtcSignal {
        sender_id: PlayerId,
        signal_data: Value,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LobbyPlayer {
    pub id: PlayerId,
    pub name: String,
    pub role: Option<Role>,
    pub ready: bool,
    pub is_host: bool,
}

/// Full world state broadcast once per tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameSnapshot {
    pub phase: Phase,
    pub timer: f32,
    pub phase_timer: f32,
    pub objective_progress: f32,
    pub door_unlocked: bool,
    pub weakpoint_active: bool,
    pub players: Vec<PlayerView>,
    pub enemies: Vec<EnemyView>,
    pub boss: Option<BossView>,
    pub projectiles: Vec<ProjectileView>,
    pub turrets: Vec<TurretView>,
    pub objective: Option<ObjectiveView>,
    pub events: Vec<GameEvent>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerView {
    pub id: PlayerId,
    pub name: String,
    pub role: Role,
    pub x: f32,
    pub y: f32,
    pub map: MapId,
    pub hp: f32,
    pub max_hp: f32,
    pub alive: bool,
    pub respawn_timer: Option<f32>,
    pub ability_active: bool,
    pub ability_cd: f32,
    pub trivia_pending: bool,
    pub angle: f32,
    pub score: ScoreCounters,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnemyView {
    pub id: u32,
    pub x: f32,
    pub y: f32,
    pub map: MapId,
    pub hp: f32,
    pub max_hp: f32,
    #[serde(rename = "type")]
    pub kind: EnemyKind,
    pub variant: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BossView {
    pub x: f32,
    pub y: f32,
    pub map: MapId,
    pub hp: f32,
    pub max_hp: f32,
    pub attack_type: BossAttack,
    pub aggro_phase: bool,
    pub phase: u8,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectileView {
    pub id: u32,
    pub x: f32,
    pub y: f32,
    pub vx: f32,
    pub vy: f32,
    pub map: MapId,
    pub is_player_projectile: bool,
    pub is_turret_projectile: bool,
    pub penetrating: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TurretView {
    pub x: f32,
    pub y: f32,
    pub map: MapId,
    pub timer: f32,
    pub owner: PlayerId,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectiveView {
    pub index: usize,
    pub x: f32,
    pub y: f32,
    pub map: MapId,
    pub desc: String,
    pub kind: ObjectiveKindTag,
    pub progress: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ObjectiveKindTag {
    Repair,
    Confirm,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TriviaDifficulty {
    Easy,
    Medium,
    Hard,
}

/// Discrete effects embedded in the next `gameState`. Purely informational for clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum GameEvent {
    Damage {
        x: f32,
        y: f32,
        value: f32,
        #[serde(skip_serializing_if = "Option::is_none", default)]
        color: Option<String>,
    },
    Heal {
        x: f32,
        y: f32,
        value: f32,
    },
    Kill {
        x: f32,
        y: f32,
    },
    Melee {
        x: f32,
        y: f32,
        angle: f32,
    },
    TurretShot {
        x1: f32,
        y1: f32,
        x2: f32,
        y2: f32,
    },
    Announcement {
        text: String,
        duration: f32,
        #[serde(skip_serializing_if = "Option::is_none", default)]
        color: Option<String>,
    },
    StartTrivia {
        player_id: PlayerId,
        difficulty: TriviaDifficulty,
        time_limit: f32,
        phase: Phase,
    },
    BossDeath {
        x: f32,
        y: f32,
    },
    Chat {
        name: String,
        msg: String,
        color: String,
    },
    MapChange {
        player_id: PlayerId,
        map: MapId,
    },
}

impl GameEvent {
    pub fn announcement(text: impl Into<String>, duration: f32, color: Option<&str>) -> Self {
        GameEvent::Announcement {
            text: text.into(),
            duration,
            color: color.map(str::to_string),
        }
    }
}

/// One row of the end-of-game scoreboard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinalScore {
    pub id: PlayerId,
    pub name: String,
    pub role: Role,
    #[serde(flatten)]
    pub counters: ScoreCounters,
    pub alive: bool,
    /// Leaderboard points awarded for this game.
    pub points: u32,
}
