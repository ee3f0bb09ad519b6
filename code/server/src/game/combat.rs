use derelict_common::entities::{
    BOSS_RADIUS, COMBAT_WINDOW, PLAYER_RADIUS, PROJECTILE_RADIUS, PlayerId, Projectile, ProjectileOwner,
    Target, Turret,
};
use derelict_common::geometry::line_of_fire_clear;
use derelict_common::protocol::GameEvent;
use derelict_common::roles::{ABILITY_COOLDOWN, AbilityKind, AttackKind};
use glam::Vec2;

use super::Encounter;

/// Half-angle of the melee cone, in radians.
pub const MELEE_HALF_ANGLE: f32 = std::f32::consts::FRAC_PI_3;
pub const FORTIFY_DURATION: f32 = 6.0;
pub const FORTIFY_MELEE_DAMAGE: f32 = 40.0;
pub const DAMAGE_REDUCTION_DURATION: f32 = 4.0;
pub const HEAL_RANGE: f32 = 200.0;
pub const HEAL_PER_SECOND: f32 = 20.0;
pub const HEAL_BURST_RADIUS: f32 = 300.0;
pub const HEAL_BURST_FRACTION: f32 = 0.35;
pub const TURRET_OFFSET: f32 = 60.0;
pub const TURRET_LIFETIME: f32 = 10.0;
pub const TURRET_RANGE: f32 = 200.0;
pub const TURRET_DAMAGE: f32 = 12.0;
pub const TURRET_FIRE_COOLDOWN: f32 = 0.5;
pub const PIERCING_DAMAGE: f32 = 80.0;
pub const PIERCING_SPEED: f32 = 700.0;
pub const PIERCING_LIFETIME: f32 = 1.0;
pub const WEAKPOINT_DURATION: f32 = 8.0;
pub const WEAKPOINT_MULTIPLIER: f32 = 1.35;
/// Lifetimes at or below this count as expired.
const LIFETIME_EPSILON: f32 = 1e-4;

impl Encounter {
    fn aim_direction(&self, index: usize) -> Vec2 {
        let angle = self.players[index].aim_angle;
        Vec2::new(angle.cos(), angle.sin())
    }

    pub(super) fn attack(&mut self, index: usize) {
        let stats = self.players[index].stats();
        {
            let player = &mut self.players[index];
            player.attack_cooldown = stats.attack_cooldown;
            player.combat_timer = COMBAT_WINDOW;
        }
        match stats.attack {
            AttackKind::Melee => self.melee(index),
            AttackKind::Projectile => {
                let player = &self.players[index];
                let (map, origin, id) = (player.map, player.position, player.id);
                let velocity = self.aim_direction(index) * stats.projectile_speed;
                self.push_projectile(
                    map,
                    origin,
                    velocity,
                    stats.range / stats.projectile_speed,
                    stats.damage,
                    ProjectileOwner::Player(id),
                    false,
                    true,
                );
            }
            AttackKind::HealBeam => {}
        }
    }

    fn melee(&mut self, index: usize) {
        let player = &self.players[index];
        let stats = player.stats();
        let (origin, map, id, angle) = (player.position, player.map, player.id, player.aim_angle);
        let damage = if player.ability_active() {
            FORTIFY_MELEE_DAMAGE
        } else {
            stats.damage
        };
        let facing = Vec2::new(angle.cos(), angle.sin());
        let in_cone = |target: Vec2, radius: f32| {
            let offset = target - origin;
            let distance = offset.length();
            if distance > stats.range + radius {
                return false;
            }
            distance <= f32::EPSILON || facing.dot(offset / distance).clamp(-1.0, 1.0).acos() <= MELEE_HALF_ANGLE
        };

        let hits: Vec<usize> = self
            .enemies
            .iter()
            .enumerate()
            .filter(|(_, e)| !e.dead && e.map == map && in_cone(e.position, e.radius()))
            .map(|(i, _)| i)
            .collect();
        let boss_hit = self
            .boss
            .as_ref()
            .is_some_and(|b| b.map == map && b.hp > 0.0 && in_cone(b.position, BOSS_RADIUS));

        for enemy in hits {
            self.strike_enemy(enemy, damage, Some(id));
        }
        if boss_hit {
            self.strike_boss(damage, Some(id));
        }
        self.events.push(GameEvent::Melee {
            x: origin.x + facing.x * 40.0,
            y: origin.y + facing.y * 40.0,
            angle,
        });
    }

    /// Continuous heal on the nearest wounded ally in range.
    pub(super) fn heal_beam(&mut self, index: usize, dt: f32) {
        let healer = &self.players[index];
        let (origin, map, healer_id) = (healer.position, healer.map, healer.id);
        let target = self
            .players
            .iter()
            .enumerate()
            .filter(|(_, p)| p.id != healer_id && p.alive && p.map == map && p.hp < p.max_hp)
            .map(|(i, p)| (i, p.position.distance(origin)))
            .filter(|(_, d)| *d < HEAL_RANGE)
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(i, _)| i);
        let Some(target) = target else {
            return;
        };

        let restored = self.players[target].heal(HEAL_PER_SECOND * dt);
        self.players[index].score.healing_done += restored;
        if self.rng_chance(0.1) {
            let at = self.players[target].position;
            self.events.push(GameEvent::Heal {
                x: at.x,
                y: at.y - 20.0,
                value: HEAL_PER_SECOND,
            });
        }
    }

    pub(super) fn use_ability(&mut self, index: usize) {
        let player = &self.players[index];
        if player.ability_cooldown > 0.0 || player.ability_active() {
            return;
        }
        let ability = player.stats().ability;
        self.players[index].ability_cooldown = ABILITY_COOLDOWN;

        match ability {
            AbilityKind::Fortify => {
                let player = &mut self.players[index];
                player.ability_timer = FORTIFY_DURATION;
                player.damage_reduction_timer = DAMAGE_REDUCTION_DURATION;
                self.announce("OVERDRIVE ACTIVATED", 2.0, Some("#4cc9f0"));
            }
            AbilityKind::DeployTurret => {
                let position = self.players[index].position + self.aim_direction(index) * TURRET_OFFSET;
                let (owner, map) = (self.players[index].id, self.players[index].map);
                let id = self.next_id();
                self.turrets.push(Turret {
                    id,
                    owner,
                    position,
                    map,
                    life: TURRET_LIFETIME,
                    cooldown: 0.0,
                    range: TURRET_RANGE,
                    damage: TURRET_DAMAGE,
                });
                self.announce("TURRET DEPLOYED", 2.0, Some("#f4a261"));
            }
            AbilityKind::PiercingScan => {
                let player = &self.players[index];
                let (map, origin, owner) = (player.map, player.position, player.id);
                let velocity = self.aim_direction(index) * PIERCING_SPEED;
                self.push_projectile(
                    map,
                    origin,
                    velocity,
                    PIERCING_LIFETIME,
                    PIERCING_DAMAGE,
                    ProjectileOwner::Player(owner),
                    true,
                    true,
                );
                self.weakpoint_timer = WEAKPOINT_DURATION;
                self.announce("WEAKPOINT SCAN ACTIVE", 2.0, Some("#06d6a0"));
            }
            AbilityKind::HealBurst => {
                let (origin, map) = (self.players[index].position, self.players[index].map);
                let mut total = 0.0;
                let mut healed = Vec::new();
                for ally in &mut self.players {
                    if !ally.alive || ally.map != map || ally.position.distance(origin) > HEAL_BURST_RADIUS {
                        continue;
                    }
                    let restored = ally.heal(ally.max_hp * HEAL_BURST_FRACTION);
                    ally.damage_reduction_timer = DAMAGE_REDUCTION_DURATION;
                    total += restored;
                    healed.push((ally.position, restored));
                }
                for (at, value) in healed {
                    self.events.push(GameEvent::Heal {
                        x: at.x,
                        y: at.y - 20.0,
                        value,
                    });
                }
                self.players[index].score.healing_done += total;
                self.announce("FIELD SURGE", 2.0, Some("#ef476f"));
            }
        }
    }

    fn credit_damage(&mut self, credit: Option<PlayerId>, dealt: f32) {
        let Some(player) = credit.and_then(|id| self.players.iter_mut().find(|p| p.id == id)) else {
            return;
        };
        player.score.damage_dealt += dealt;
        player.combat_timer = COMBAT_WINDOW;
    }

    /// Damages an enemy and credits the dealer. A kill is counted once.
    pub(super) fn strike_enemy(&mut self, index: usize, amount: f32, credit: Option<PlayerId>) {
        let Some(enemy) = self.enemies.get_mut(index) else {
            return;
        };
        if enemy.dead {
            return;
        }
        let dealt = enemy.apply_damage(amount);
        let at = enemy.position;
        let killed = enemy.hp <= 0.0;
        if killed {
            enemy.dead = true;
        }

        self.events.push(GameEvent::Damage {
            x: at.x,
            y: at.y,
            value: dealt,
            color: None,
        });
        self.credit_damage(credit, dealt);
        if killed {
            self.events.push(GameEvent::Kill { x: at.x, y: at.y });
            if let Some(player) = credit.and_then(|id| self.players.iter_mut().find(|p| p.id == id)) {
                player.score.enemies_killed += 1;
            }
        }
    }

    /// Damages the boss, amplified while the weakpoint window is open.
    pub(super) fn strike_boss(&mut self, amount: f32, credit: Option<PlayerId>) {
        let multiplier = if self.weakpoint_active() {
            WEAKPOINT_MULTIPLIER
        } else {
            1.0
        };
        let Some(boss) = self.boss.as_mut() else {
            return;
        };
        let dealt = boss.apply_damage(amount * multiplier);
        let at = boss.position;
        self.events.push(GameEvent::Damage {
            x: at.x,
            y: at.y,
            value: dealt,
            color: (multiplier > 1.0).then(|| "#06d6a0".to_string()),
        });
        self.credit_damage(credit, dealt);
    }

    pub(super) fn update_projectiles(&mut self, dt: f32) {
        let in_flight = std::mem::take(&mut self.projectiles);
        let mut survivors = Vec::with_capacity(in_flight.len());

        for mut projectile in in_flight {
            if projectile.fresh {
                projectile.fresh = false;
                survivors.push(projectile);
                continue;
            }
            projectile.position += projectile.velocity * dt;
            projectile.life -= dt;
            if projectile.life <= LIFETIME_EPSILON {
                continue;
            }
            let obstacles = &self.world.layout(projectile.map).obstacles;
            if obstacles
                .iter()
                .any(|o| o.overlaps_circle(projectile.position, PROJECTILE_RADIUS))
            {
                continue;
            }
            if self.resolve_hits(&mut projectile) {
                survivors.push(projectile);
            }
        }

        survivors.append(&mut self.projectiles);
        self.projectiles = survivors;
    }

    /// Applies projectile hits. Returns whether the projectile keeps flying.
    fn resolve_hits(&mut self, projectile: &mut Projectile) -> bool {
        if projectile.owner.is_hostile() {
            let hit = self.players.iter().position(|p| {
                p.alive
                    && p.map == projectile.map
                    && p.position.distance(projectile.position) < PLAYER_RADIUS + PROJECTILE_RADIUS
            });
            return match hit {
                Some(index) => {
                    self.damage_player(index, projectile.damage);
                    false
                }
                None => true,
            };
        }

        let credit = projectile.owner.credited_player();
        let candidates: Vec<usize> = self
            .enemies
            .iter()
            .enumerate()
            .filter(|(_, e)| {
                !e.dead
                    && e.map == projectile.map
                    && !projectile.struck.contains(&Target::Enemy(e.id))
                    && e.position.distance(projectile.position) < e.radius() + PROJECTILE_RADIUS
            })
            .map(|(i, _)| i)
            .collect();

        for index in candidates {
            let id = self.enemies[index].id;
            self.strike_enemy(index, projectile.damage, credit);
            if !projectile.penetrating {
                return false;
            }
            projectile.struck.push(Target::Enemy(id));
        }

        let boss_hit = self.boss.as_ref().is_some_and(|b| {
            b.hp > 0.0
                && b.map == projectile.map
                && !projectile.struck.contains(&Target::Boss)
                && b.position.distance(projectile.position) < BOSS_RADIUS + PROJECTILE_RADIUS
        });
        if boss_hit {
            self.strike_boss(projectile.damage, credit);
            if !projectile.penetrating {
                return false;
            }
            projectile.struck.push(Target::Boss);
        }
        true
    }

    pub(super) fn update_turrets(&mut self, dt: f32) {
        for turret in &mut self.turrets {
            turret.life -= dt;
            turret.cooldown = (turret.cooldown - dt).max(0.0);
        }
        self.turrets.retain(|t| t.life > 0.0);

        for index in 0..self.turrets.len() {
            let turret = &self.turrets[index];
            if turret.cooldown > 0.0 {
                continue;
            }
            let (origin, map, range, damage, owner) =
                (turret.position, turret.map, turret.range, turret.damage, turret.owner);
            let obstacles = &self.world.layout(map).obstacles;

            let enemy = self
                .enemies
                .iter()
                .enumerate()
                .filter(|(_, e)| !e.dead && e.map == map)
                .map(|(i, e)| (Target::Enemy(e.id), i, e.position, e.position.distance(origin)))
                .filter(|(_, _, at, d)| *d <= range && line_of_fire_clear(origin, *at, obstacles));
            let boss = self
                .boss
                .iter()
                .filter(|b| b.map == map && b.hp > 0.0)
                .map(|b| (Target::Boss, 0, b.position, b.position.distance(origin)))
                .filter(|(_, _, at, d)| *d <= range && line_of_fire_clear(origin, *at, obstacles));
            let Some((target, enemy_index, at, _)) = enemy.chain(boss).min_by(|a, b| a.3.total_cmp(&b.3)) else {
                continue;
            };

            self.turrets[index].cooldown = TURRET_FIRE_COOLDOWN;
            match target {
                Target::Boss => self.strike_boss(damage, Some(owner)),
                _ => self.strike_enemy(enemy_index, damage, Some(owner)),
            }
            self.events.push(GameEvent::TurretShot {
                x1: origin.x,
                y1: origin.y,
                x2: at.x,
                y2: at.y,
            });
        }
    }
}
