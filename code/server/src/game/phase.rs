use derelict_common::entities::{Boss, BossAttack};
use derelict_common::{MapId, Phase};
use glam::Vec2;

use super::objectives::objective_for;
use super::spawning::SpawnState;
use super::{Encounter, FINAL_TIMER_CAP, RESPAWN_TIME};
use crate::error::SimulationError;

pub const BOSS_MAX_HP: f32 = 2000.0;

impl Encounter {
    /// Leaves the current phase and enters the next one in the fixed sequence.
    /// Completing `final` ends the mission as a victory.
    pub(super) fn complete_phase(&mut self) -> Result<(), SimulationError> {
        let finished = self.phase;
        if objective_for(finished).is_some() {
            self.difficulty.nudge();
            self.objectives_completed += 1;
            if finished.is_repair() {
                self.repairs_completed += 1;
            }
        }

        let Some(next) = finished.next() else {
            self.announce("ENGINE ONLINE! MISSION COMPLETE!", 3.0, Some("#06d6a0"));
            self.finish(true);
            return Ok(());
        };

        self.objective_progress = 0.0;
        self.phase_timer = 0.0;
        self.spawn = SpawnState::default();
        self.trivia = None;
        self.trivia_cooldown = 0.0;
        for player in &mut self.players {
            player.trivia_pending = false;
        }
        self.phase = next;

        match finished {
            Phase::Repair1 => self.announce("CORE STABILIZED!", 3.0, Some("#06d6a0")),
            Phase::Repair2 | Phase::Repair3 => self.announce("POWER GRID RESTORED!", 3.0, Some("#06d6a0")),
            Phase::Confirm1 | Phase::Confirm2 => self.announce("ACCESS GRANTED", 2.0, Some("#06d6a0")),
            Phase::Confirm3 => {
                self.door_unlocked = true;
                self.announce("AIRLOCK UNLOCKED! THE GUARDIAN AWAITS OUTSIDE", 3.0, Some("#ffd166"));
            }
            _ => {}
        }

        match next {
            Phase::Boss => self.enter_boss_phase(),
            Phase::Final => self.enter_final_phase(),
            phase => {
                if let Some(objective) = objective_for(phase) {
                    self.announce(&objective.description.to_uppercase(), 3.0, None);
                }
            }
        }
        Ok(())
    }

    fn enter_boss_phase(&mut self) {
        self.enemies.clear();
        let center = boss_arena_center();
        self.boss = Some(Boss {
            position: center,
            map: MapId::Planet,
            hp: BOSS_MAX_HP,
            max_hp: BOSS_MAX_HP,
            phase: 0,
            attack: BossAttack::Idle,
            attack_cooldown: super::boss::BOSS_ATTACK_COOLDOWN,
            charge_target: center,
            charge_timer: 0.0,
            stun_timer: 0.0,
            aggro_timer: 0.0,
            patrol_target: center,
        });
        self.announce("ALIEN GUARDIAN EMERGES", 3.0, Some("#7b2cbf"));
    }

    fn enter_final_phase(&mut self) {
        self.timer = self.timer.min(FINAL_TIMER_CAP);
        for player in &mut self.players {
            if !player.alive && player.respawn_timer.is_none() {
                player.respawn_timer = Some(RESPAWN_TIME);
            }
        }
        self.announce("BOSS DEFEATED! GET TO THE ENGINE CORE!", 3.0, Some("#06d6a0"));
    }

    /// Operator shortcut: completes the current phase as if its objective was met.
    pub fn skip_phase(&mut self) -> Result<(), SimulationError> {
        if self.outcome.is_some() {
            return Ok(());
        }
        if self.phase == Phase::Boss {
            self.boss = None;
        }
        self.complete_phase()
    }
}

/// Boss spawn point, the middle of its arena on the planet.
pub fn boss_arena_center() -> Vec2 {
    let arena = super::boss::boss_arena();
    arena.center()
}
