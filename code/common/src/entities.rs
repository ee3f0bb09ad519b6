use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::map::MapId;
use crate::roles::{Role, RoleStats};

pub const PLAYER_RADIUS: f32 = 18.0;
pub const ENEMY_RADIUS: f32 = 16.0;
pub const ELITE_RADIUS: f32 = 22.0;
pub const BOSS_RADIUS: f32 = 45.0;
pub const PROJECTILE_RADIUS: f32 = 6.0;

/// Incoming damage multiplier while a damage-reduction window is open.
pub const DAMAGE_REDUCTION_FACTOR: f32 = 0.7;
/// Seconds after dealing or taking damage during which a player counts as in combat.
pub const COMBAT_WINDOW: f32 = 3.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerId(pub u32);

impl std::fmt::Display for PlayerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(pub u32);

/// Latest key/mouse state sent by a client. Level-triggered; edges are derived server-side.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct InputState {
    pub w: bool,
    pub a: bool,
    pub s: bool,
    pub d: bool,
    pub mouse_x: f32,
    pub mouse_y: f32,
    pub attack: bool,
    pub interact: bool,
    pub ability: bool,
}

impl InputState {
    /// Unit movement direction, or zero when no key is held.
    pub fn move_axis(&self) -> Vec2 {
        let mut axis = Vec2::ZERO;
        if self.w {
            axis.y -= 1.0;
        }
        if self.s {
            axis.y += 1.0;
        }
        if self.a {
            axis.x -= 1.0;
        }
        if self.d {
            axis.x += 1.0;
        }
        axis.normalize_or_zero()
    }

    pub fn aim_point(&self) -> Vec2 {
        Vec2::new(self.mouse_x, self.mouse_y)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreCounters {
    pub damage_dealt: f32,
    pub healing_done: f32,
    pub enemies_killed: u32,
    /// Seconds of repair work, engineer-equivalent.
    pub repairs_done: f32,
    pub trivia_correct: u32,
}

impl ScoreCounters {
    /// Ordering key of the end-of-game scoreboard.
    pub fn rank_value(&self) -> f32 {
        self.damage_dealt
            + self.healing_done
            + self.enemies_killed as f32 * 50.0
            + self.repairs_done * 100.0
    }
}

#[derive(Debug, Clone)]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
    pub role: Role,
    pub position: Vec2,
    pub map: MapId,
    pub hp: f32,
    pub max_hp: f32,
    pub alive: bool,
    /// `None` while alive, or while dead with no scheduled revival.
    pub respawn_timer: Option<f32>,
    pub attack_cooldown: f32,
    pub ability_cooldown: f32,
    /// Remaining seconds of the role ability effect.
    pub ability_timer: f32,
    pub damage_reduction_timer: f32,
    pub combat_timer: f32,
    pub aim_angle: f32,
    pub score: ScoreCounters,
    pub input: InputState,
    pub prev_interact: bool,
    /// Seconds since the last interact press, used for double-tap detection.
    pub since_interact_press: Option<f32>,
    /// Movement and attacks are locked while a trivia challenge is open.
    pub trivia_pending: bool,
}

impl Player {
    pub fn new(id: PlayerId, name: String, role: Role, position: Vec2) -> Self {
        let max_hp = role.stats().max_hp;
        Self {
            id,
            name,
            role,
            position,
            map: MapId::Ship,
            hp: max_hp,
            max_hp,
            alive: true,
            respawn_timer: None,
            attack_cooldown: 0.0,
            ability_cooldown: 0.0,
            ability_timer: 0.0,
            damage_reduction_timer: 0.0,
            combat_timer: 0.0,
            aim_angle: 0.0,
            score: ScoreCounters::default(),
            input: InputState::default(),
            prev_interact: false,
            since_interact_press: None,
            trivia_pending: false,
        }
    }

    pub fn stats(&self) -> RoleStats {
        self.role.stats()
    }

    pub fn ability_active(&self) -> bool {
        self.ability_timer > 0.0
    }

    pub fn damage_reduction_active(&self) -> bool {
        self.damage_reduction_timer > 0.0
    }

    pub fn in_combat(&self) -> bool {
        self.combat_timer > 0.0
    }

    /// Applies incoming damage after the reduction window and returns the amount taken.
    pub fn apply_damage(&mut self, amount: f32) -> f32 {
        let amount = if self.damage_reduction_active() {
            amount * DAMAGE_REDUCTION_FACTOR
        } else {
            amount
        };
        let taken = amount.min(self.hp).max(0.0);
        self.hp -= taken;
        self.combat_timer = COMBAT_WINDOW;
        taken
    }

    /// Restores up to `amount` HP, never past max. Returns the amount restored.
    pub fn heal(&mut self, amount: f32) -> f32 {
        let restored = amount.min(self.max_hp - self.hp).max(0.0);
        self.hp += restored;
        restored
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnemyKind {
    Common,
    Elite,
}

#[derive(Debug, Clone)]
pub struct Enemy {
    pub id: EntityId,
    pub kind: EnemyKind,
    pub variant: &'static str,
    pub position: Vec2,
    pub map: MapId,
    pub hp: f32,
    pub max_hp: f32,
    pub damage: f32,
    pub speed: f32,
    pub attack_cooldown: f32,
    pub path: Vec<Vec2>,
    pub repath_timer: f32,
    /// Set once when HP reaches zero so a kill is counted a single time.
    pub dead: bool,
}

impl Enemy {
    pub fn radius(&self) -> f32 {
        match self.kind {
            EnemyKind::Common => ENEMY_RADIUS,
            EnemyKind::Elite => ELITE_RADIUS,
        }
    }

    /// Returns the damage actually removed from HP.
    pub fn apply_damage(&mut self, amount: f32) -> f32 {
        let taken = amount.min(self.hp).max(0.0);
        self.hp -= taken;
        taken
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BossAttack {
    Idle,
    Charging,
    Burst,
}

#[derive(Debug, Clone)]
pub struct Boss {
    pub position: Vec2,
    pub map: MapId,
    pub hp: f32,
    pub max_hp: f32,
    /// 0..=3, one step per quarter of HP lost.
    pub phase: u8,
    pub attack: BossAttack,
    pub attack_cooldown: f32,
    pub charge_target: Vec2,
    pub charge_timer: f32,
    pub stun_timer: f32,
    pub aggro_timer: f32,
    pub patrol_target: Vec2,
}

impl Boss {
    pub fn aggro(&self) -> bool {
        self.aggro_timer > 0.0
    }

    pub fn apply_damage(&mut self, amount: f32) -> f32 {
        let taken = amount.min(self.hp).max(0.0);
        self.hp -= taken;
        taken
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProjectileOwner {
    Player(PlayerId),
    Hostile,
}

impl ProjectileOwner {
    pub fn is_hostile(self) -> bool {
        matches!(self, ProjectileOwner::Hostile)
    }

    /// Player credited for damage done by the projectile.
    pub fn credited_player(self) -> Option<PlayerId> {
        match self {
            ProjectileOwner::Player(id) => Some(id),
            ProjectileOwner::Hostile => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Projectile {
    pub id: EntityId,
    pub position: Vec2,
    pub velocity: Vec2,
    pub damage: f32,
    pub owner: ProjectileOwner,
    pub life: f32,
    pub map: MapId,
    pub penetrating: bool,
    /// Targets already struck by a penetrating projectile.
    pub struck: Vec<Target>,
    /// Spawned during the current tick and not yet advanced.
    pub fresh: bool,
}

/// Something a projectile or attack can hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    Enemy(EntityId),
    Boss,
}

#[derive(Debug, Clone)]
pub struct Turret {
    pub id: EntityId,
    pub owner: PlayerId,
    pub position: Vec2,
    pub map: MapId,
    pub life: f32,
    pub cooldown: f32,
    pub range: f32,
    pub damage: f32,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn player(role: Role) -> Player {
        Player::new(PlayerId(1), "p".into(), role, Vec2::ZERO)
    }

    #[test]
    fn damage_is_monotone_and_clamped() {
        let mut p = player(Role::Scout);
        let mut last = p.hp;
        for _ in 0..20 {
            let taken = p.apply_damage(13.0);
            assert!(p.hp >= 0.0);
            assert!((last - p.hp - taken).abs() < 1e-4);
            if last > 0.0 {
                assert!(p.hp < last);
            }
            last = p.hp;
        }
        assert_eq!(p.hp, 0.0);
        assert_eq!(p.apply_damage(5.0), 0.0);
    }

    #[test]
    fn reduction_window_scales_damage() {
        let mut p = player(Role::Vanguard);
        p.damage_reduction_timer = 2.0;
        let taken = p.apply_damage(100.0);
        assert!((taken - 70.0).abs() < 1e-4);
        assert!((p.hp - 150.0).abs() < 1e-4);
        assert!(p.in_combat());
    }

    #[test]
    fn heal_never_exceeds_max() {
        let mut p = player(Role::Medic);
        p.apply_damage(30.0);
        assert_eq!(p.heal(100.0), 30.0);
        assert_eq!(p.hp, p.max_hp);
        assert_eq!(p.heal(10.0), 0.0);
    }

    #[test]
    fn enemy_damage_clamps_at_zero() {
        let mut enemy = Enemy {
            id: EntityId(1),
            kind: EnemyKind::Common,
            variant: "orc1",
            position: Vec2::ZERO,
            map: MapId::Ship,
            hp: 70.0,
            max_hp: 70.0,
            damage: 12.0,
            speed: 100.0,
            attack_cooldown: 0.0,
            path: Vec::new(),
            repath_timer: 0.0,
            dead: false,
        };
        assert_eq!(enemy.apply_damage(50.0), 50.0);
        assert_eq!(enemy.apply_damage(50.0), 20.0);
        assert_eq!(enemy.hp, 0.0);
    }

    #[test]
    fn diagonal_input_is_normalized() {
        let input = InputState {
            w: true,
            d: true,
            ..Default::default()
        };
        assert!((input.move_axis().length() - 1.0).abs() < 1e-5);
        assert_eq!(InputState::default().move_axis(), Vec2::ZERO);
    }

    #[test]
    fn input_tolerates_missing_fields() {
        let input: InputState = serde_json::from_str(r#"{"w":true,"mouseX":12.5}"#).unwrap();
        assert!(input.w);
        assert!(!input.attack);
        assert_eq!(input.mouse_x, 12.5);
    }
}
