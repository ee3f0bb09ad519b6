use std::ops::RangeInclusive;

use derelict_common::entities::{ENEMY_RADIUS, EnemyKind};
use derelict_common::geometry::constrain;
use derelict_common::map::SpawnGroup;
use derelict_common::{MapId, Phase};
use glam::Vec2;
use rand::Rng;

use super::Encounter;
use crate::error::SimulationError;

/// Waves are skipped while more than this many enemies live on the phase's map.
pub const MAX_CONCURRENT_ENEMIES: usize = 20;
pub const SPAWN_JITTER: f32 = 20.0;

/// Per-phase wave bookkeeping, reset on every phase change.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SpawnState {
    pub wave_timer: f32,
    pub spawned: u32,
    pub warning_sent: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SpawnRule {
    pub group: SpawnGroup,
    pub map: MapId,
    pub per_wave: RangeInclusive<u32>,
    pub interval: f32,
    pub phase_cap: u32,
    pub elite_chance: f64,
    /// Seconds into the phase before the first wave.
    pub first_wave_after: f32,
    /// Seconds into the phase at which the incoming-hostiles warning fires.
    pub warning_at: Option<f32>,
}

const fn rule(group: SpawnGroup, per_wave: RangeInclusive<u32>, interval: f32, phase_cap: u32, elite_chance: f64) -> SpawnRule {
    SpawnRule {
        group,
        map: MapId::Ship,
        per_wave,
        interval,
        phase_cap,
        elite_chance,
        first_wave_after: 0.0,
        warning_at: None,
    }
}

/// Spawn rule of a phase. Cinematic, intro and boss phases have none.
pub fn spawn_rule(phase: Phase) -> Option<SpawnRule> {
    let rule = match phase {
        Phase::Repair1 => SpawnRule {
            first_wave_after: 15.0,
            warning_at: Some(10.0),
            ..rule(SpawnGroup::Corridor, 2..=3, 5.0, 15, 0.0)
        },
        Phase::Confirm1 => rule(SpawnGroup::Corridor, 1..=2, 6.0, 10, 0.0),
        Phase::Repair2 => rule(SpawnGroup::Left3, 3..=4, 4.0, 45, 0.0),
        Phase::Confirm2 => rule(SpawnGroup::Left3, 2..=3, 5.0, 15, 0.0),
        Phase::Repair3 => rule(SpawnGroup::Right3, 4..=5, 3.0, 60, 0.3),
        Phase::Confirm3 => rule(SpawnGroup::Right3, 2..=3, 4.0, 20, 0.3),
        Phase::Final => rule(SpawnGroup::Engine, 1..=2, 8.0, 30, 0.0),
        Phase::Cinematic | Phase::Intro | Phase::Boss => return None,
    };
    Some(rule)
}

impl Encounter {
    pub(super) fn update_spawning(&mut self, dt: f32) -> Result<(), SimulationError> {
        let Some(rule) = spawn_rule(self.phase) else {
            return Ok(());
        };

        if let Some(warning_at) = rule.warning_at {
            if !self.spawn.warning_sent && self.phase_timer >= warning_at {
                self.spawn.warning_sent = true;
                self.announce("WARNING: HOSTILES INBOUND", 3.0, Some("#ffd166"));
            }
        }
        if self.phase_timer < rule.first_wave_after || self.spawn.spawned >= rule.phase_cap {
            return Ok(());
        }

        self.spawn.wave_timer -= dt;
        if self.spawn.wave_timer > 0.0 {
            return Ok(());
        }
        self.spawn.wave_timer = rule.interval;

        let living = self.enemies.iter().filter(|e| !e.dead && e.map == rule.map).count();
        if living > MAX_CONCURRENT_ENEMIES {
            return Ok(());
        }

        let wave = self
            .rng
            .random_range(rule.per_wave.clone())
            .min(rule.phase_cap - self.spawn.spawned);
        for _ in 0..wave {
            let position = self.pick_spawn_point(rule.map, rule.group, SPAWN_JITTER)?;
            let kind = if rule.elite_chance > 0.0 && self.rng.random_bool(rule.elite_chance) {
                EnemyKind::Elite
            } else {
                EnemyKind::Common
            };
            self.spawn_enemy(kind, rule.map, position);
            self.spawn.spawned += 1;
        }
        Ok(())
    }

    /// Random entry of a spawn list, jittered and kept inside walkable space.
    pub(super) fn pick_spawn_point(&mut self, map: MapId, group: SpawnGroup, jitter: f32) -> Result<Vec2, SimulationError> {
        let layout = self.world.layout(map);
        let points = layout.spawn_points(group);
        if points.is_empty() {
            return Err(SimulationError::EmptySpawnGroup(group));
        }
        let base = points[self.rng.random_range(0..points.len())];
        let offset = Vec2::new(
            self.rng.random_range(-jitter..=jitter),
            self.rng.random_range(-jitter..=jitter),
        );
        Ok(constrain(base + offset, ENEMY_RADIUS, &layout.zones, &layout.obstacles))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn no_spawns_outside_objective_phases() {
        for phase in [Phase::Cinematic, Phase::Intro, Phase::Boss] {
            assert!(spawn_rule(phase).is_none());
        }
        for phase in Phase::iter().filter(|p| p.is_repair() || p.is_confirm()) {
            assert!(spawn_rule(phase).is_some(), "{phase:?}");
        }
    }

    #[test]
    fn only_the_first_repair_has_a_grace_window() {
        let first = spawn_rule(Phase::Repair1).unwrap();
        assert_eq!(first.first_wave_after, 15.0);
        assert_eq!(first.warning_at, Some(10.0));
        let later = spawn_rule(Phase::Repair2).unwrap();
        assert_eq!(later.first_wave_after, 0.0);
        assert_eq!(later.warning_at, None);
    }

    #[test]
    fn elites_only_on_the_right_wing() {
        for phase in Phase::iter() {
            let Some(rule) = spawn_rule(phase) else {
                continue;
            };
            assert_eq!(rule.elite_chance > 0.0, rule.group == SpawnGroup::Right3, "{phase:?}");
        }
    }
}
