use derelict_common::entities::{BOSS_RADIUS, BossAttack, EnemyKind, PLAYER_RADIUS, ProjectileOwner};
use derelict_common::geometry::{Rect, push_out_of_obstacles};
use derelict_common::map::{MAP_SCALE, SpawnGroup};
use derelict_common::protocol::GameEvent;
use derelict_common::MapId;
use glam::Vec2;
use rand::Rng;

use super::Encounter;
use crate::error::SimulationError;

pub const BOSS_ATTACK_COOLDOWN: f32 = 2.5;
pub const BOSS_ENRAGED_ATTACK_COOLDOWN: f32 = 1.5;
/// Cooldown drains this much faster while enraged.
pub const BOSS_ENRAGED_COOLDOWN_RATE: f32 = 1.5;
pub const BOSS_ENRAGE_DURATION: f32 = 5.0;
pub const BOSS_CHARGE_SPEED: f32 = 350.0;
pub const BOSS_CHARGE_DURATION: f32 = 1.5;
pub const BOSS_CHARGE_DAMAGE: f32 = 35.0;
pub const BOSS_CHARGE_STUN: f32 = 0.5;
/// A charge ends when the boss gets this close to its target point.
pub const BOSS_CHARGE_ARRIVAL: f32 = 20.0;
pub const BOSS_PATROL_SPEED: f32 = 40.0;
pub const BOSS_DRIFT_SPEED: f32 = 60.0;
pub const BOSS_BURST_SPREAD: f32 = 0.3;
pub const BOSS_BURST_SPEED: f32 = 300.0;
pub const BOSS_BURST_DAMAGE: f32 = 25.0;
pub const BOSS_BURST_LIFETIME: f32 = 1.5;
const ADD_JITTER: f32 = 20.0;

/// Region of the planet the boss never leaves.
pub fn boss_arena() -> Rect {
    Rect::new(290.0, 23.0, 170.0, 120.0).scaled(MAP_SCALE)
}

/// Boss phase for the given HP, one step per quarter lost.
pub fn boss_phase_for(hp: f32, max_hp: f32) -> u8 {
    let lost = (1.0 - hp / max_hp).clamp(0.0, 1.0);
    ((lost * 4.0).floor() as u8).min(3)
}

impl Encounter {
    pub(super) fn update_boss(&mut self, dt: f32) -> Result<(), SimulationError> {
        let Some(boss) = self.boss.as_mut() else {
            return Ok(());
        };
        if boss.hp <= 0.0 {
            return self.defeat_boss();
        }

        let phase = boss_phase_for(boss.hp, boss.max_hp);
        let enraged = phase > boss.phase;
        if enraged {
            boss.phase = phase;
            boss.aggro_timer = BOSS_ENRAGE_DURATION;
        } else {
            boss.aggro_timer = (boss.aggro_timer - dt).max(0.0);
        }
        if enraged {
            self.spawn_boss_adds()?;
            self.announce("BOSS ENRAGED!", 2.0, Some("#e63946"));
        }

        let Some(boss) = self.boss.as_mut() else {
            return Ok(());
        };
        if boss.stun_timer > 0.0 {
            boss.stun_timer = (boss.stun_timer - dt).max(0.0);
            return Ok(());
        }

        let position = boss.position;
        let target = self
            .players
            .iter()
            .filter(|p| p.alive && p.map == boss.map)
            .map(|p| p.position)
            .min_by(|a, b| a.distance(position).total_cmp(&b.distance(position)));

        let rate = if boss.aggro() {
            BOSS_ENRAGED_COOLDOWN_RATE
        } else {
            1.0
        };
        boss.attack_cooldown -= dt * rate;
        let (attack, ready) = (boss.attack, boss.attack_cooldown <= 0.0);

        match (attack, target) {
            (BossAttack::Charging, _) => self.continue_charge(dt),
            (_, Some(target)) if ready => self.start_boss_attack(target),
            _ => self.drift(dt, target),
        }

        let arena = boss_arena();
        if let Some(boss) = self.boss.as_mut() {
            let clamped = boss.position.clamp(arena.min, arena.max);
            let obstacles = &self.world.layout(boss.map).obstacles;
            boss.position = push_out_of_obstacles(clamped, BOSS_RADIUS, obstacles);
        }
        Ok(())
    }

    fn start_boss_attack(&mut self, target: Vec2) {
        let charge = self.rng.random_bool(0.5);
        let Some(boss) = self.boss.as_mut() else {
            return;
        };
        boss.attack_cooldown = if boss.aggro() {
            BOSS_ENRAGED_ATTACK_COOLDOWN
        } else {
            BOSS_ATTACK_COOLDOWN
        };

        if charge {
            boss.attack = BossAttack::Charging;
            boss.charge_target = target;
            boss.charge_timer = BOSS_CHARGE_DURATION;
            return;
        }

        boss.attack = BossAttack::Burst;
        let (origin, map) = (boss.position, boss.map);
        let toward = target - origin;
        let aim = toward.y.atan2(toward.x);
        for offset in [-BOSS_BURST_SPREAD, 0.0, BOSS_BURST_SPREAD] {
            let direction = Vec2::new((aim + offset).cos(), (aim + offset).sin());
            self.push_projectile(
                map,
                origin,
                direction * BOSS_BURST_SPEED,
                BOSS_BURST_LIFETIME,
                BOSS_BURST_DAMAGE,
                ProjectileOwner::Hostile,
                false,
                true,
            );
        }
    }

    fn continue_charge(&mut self, dt: f32) {
        let Some(boss) = self.boss.as_mut() else {
            return;
        };
        let offset = boss.charge_target - boss.position;
        let step = (BOSS_CHARGE_SPEED * dt).min(offset.length());
        boss.position += offset.normalize_or_zero() * step;
        boss.charge_timer -= dt;

        let (position, map) = (boss.position, boss.map);
        let hit = self.players.iter().position(|p| {
            p.alive && p.map == map && p.position.distance(position) < BOSS_RADIUS + PLAYER_RADIUS
        });
        if let Some(index) = hit {
            self.damage_player(index, BOSS_CHARGE_DAMAGE);
            if let Some(boss) = self.boss.as_mut() {
                boss.stun_timer = BOSS_CHARGE_STUN;
                boss.attack = BossAttack::Idle;
            }
            return;
        }

        if let Some(boss) = self.boss.as_mut() {
            if boss.position.distance(boss.charge_target) < BOSS_CHARGE_ARRIVAL || boss.charge_timer <= 0.0 {
                boss.attack = BossAttack::Idle;
            }
        }
    }

    /// Slow follow after a burst, otherwise patrol between random arena points.
    fn drift(&mut self, dt: f32, target: Option<Vec2>) {
        let arena = boss_arena();
        let next_patrol = Vec2::new(
            self.rng.random_range(arena.min.x..arena.max.x),
            self.rng.random_range(arena.min.y..arena.max.y),
        );
        let Some(boss) = self.boss.as_mut() else {
            return;
        };

        let (goal, speed) = match (boss.attack, target) {
            (BossAttack::Burst, Some(target)) => (target, BOSS_DRIFT_SPEED),
            _ => {
                if boss.position.distance(boss.patrol_target) < BOSS_CHARGE_ARRIVAL {
                    boss.patrol_target = next_patrol;
                }
                (boss.patrol_target, BOSS_PATROL_SPEED)
            }
        };
        let offset = goal - boss.position;
        let step = (speed * dt).min(offset.length());
        boss.position += offset.normalize_or_zero() * step;
    }

    fn spawn_boss_adds(&mut self) -> Result<(), SimulationError> {
        let count = self.rng.random_range(3..=4);
        for _ in 0..count {
            let position = self.pick_spawn_point(MapId::Planet, SpawnGroup::BossAdds, ADD_JITTER)?;
            self.spawn_enemy(EnemyKind::Common, MapId::Planet, position);
        }
        Ok(())
    }

    fn defeat_boss(&mut self) -> Result<(), SimulationError> {
        if let Some(boss) = self.boss.take() {
            self.events.push(GameEvent::BossDeath {
                x: boss.position.x,
                y: boss.position.y,
            });
        }
        self.complete_phase()
    }
}
