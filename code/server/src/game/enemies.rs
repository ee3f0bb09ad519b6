use derelict_common::entities::{Enemy, EnemyKind, PLAYER_RADIUS};
use derelict_common::geometry::constrain;
use derelict_common::MapId;
use glam::Vec2;
use rand::Rng;
use tracing::debug;

use super::Encounter;

pub const ENEMY_ATTACK_COOLDOWN: f32 = 1.0;
/// Extra reach beyond touching distance.
pub const ENEMY_REACH_MARGIN: f32 = 5.0;
pub const REPATH_INTERVAL: f32 = 0.5;
pub const REPATH_JITTER: f32 = 0.2;
/// A waypoint closer than this is considered reached.
pub const WAYPOINT_REACHED: f32 = 32.0;

pub const COMMON_BASE_HP: f32 = 70.0;
pub const ELITE_BASE_HP: f32 = 120.0;
pub const ELITE_DAMAGE: f32 = 18.0;
pub const ELITE_SPEED: f32 = 80.0;
/// Enemy speed bonus once two repair objectives are done.
pub const LATE_SPEED_MULTIPLIER: f32 = 1.1;

const COMMON_VARIANTS: [&str; 3] = ["orc1", "orc2", "orc3"];
const ELITE_VARIANT: &str = "hound";

impl Encounter {
    pub(super) fn update_enemies(&mut self, dt: f32) {
        self.enemies.retain(|e| !e.dead);

        for index in 0..self.enemies.len() {
            let (position, map) = (self.enemies[index].position, self.enemies[index].map);
            let Some((target_index, target)) = self
                .players
                .iter()
                .enumerate()
                .filter(|(_, p)| p.alive && p.map == map)
                .map(|(i, p)| (i, p.position))
                .min_by(|a, b| a.1.distance(position).total_cmp(&b.1.distance(position)))
            else {
                continue;
            };

            let enemy = &mut self.enemies[index];
            enemy.attack_cooldown = (enemy.attack_cooldown - dt).max(0.0);
            enemy.repath_timer -= dt;
            if enemy.repath_timer <= 0.0 {
                enemy.path = match self.world.map(map).nav.find_path(position, target) {
                    Some(path) => path,
                    None => {
                        debug!(enemy = enemy.id.0, "no path to target, moving directly");
                        Vec::new()
                    }
                };
                enemy.repath_timer = REPATH_INTERVAL + self.rng.random_range(0.0..REPATH_JITTER);
            }

            if enemy.path.first().is_some_and(|w| w.distance(position) < WAYPOINT_REACHED) {
                enemy.path.remove(0);
            }
            let heading = enemy.path.first().copied().unwrap_or(target);

            let reach = PLAYER_RADIUS + enemy.radius() + ENEMY_REACH_MARGIN;
            let distance = position.distance(target);
            if distance > reach {
                let offset = heading - position;
                let step = (enemy.speed * dt).min(offset.length());
                let layout = self.world.layout(map);
                enemy.position = constrain(
                    position + offset.normalize_or_zero() * step,
                    enemy.radius(),
                    &layout.zones,
                    &layout.obstacles,
                );
            } else if enemy.attack_cooldown <= 0.0 {
                enemy.attack_cooldown = ENEMY_ATTACK_COOLDOWN;
                let damage = enemy.damage;
                self.damage_player(target_index, damage);
            }
        }
    }

    /// Adds one enemy scaled by the current difficulty.
    pub(super) fn spawn_enemy(&mut self, kind: EnemyKind, map: MapId, position: Vec2) {
        let speed_bonus = if self.repairs_completed >= 2 {
            LATE_SPEED_MULTIPLIER
        } else {
            1.0
        };
        let (variant, max_hp, damage, speed) = match kind {
            EnemyKind::Common => {
                let variant = COMMON_VARIANTS[self.rng.random_range(0..COMMON_VARIANTS.len())];
                (
                    variant,
                    COMMON_BASE_HP * self.difficulty.hp_scale,
                    self.difficulty.damage_base,
                    self.difficulty.speed_base * speed_bonus,
                )
            }
            EnemyKind::Elite => (
                ELITE_VARIANT,
                ELITE_BASE_HP * self.difficulty.hp_scale,
                ELITE_DAMAGE,
                ELITE_SPEED * speed_bonus,
            ),
        };

        let id = self.next_id();
        self.enemies.push(Enemy {
            id,
            kind,
            variant,
            position,
            map,
            hp: max_hp,
            max_hp,
            damage,
            speed,
            attack_cooldown: 0.0,
            path: Vec::new(),
            repath_timer: 0.0,
            dead: false,
        });
    }
}
