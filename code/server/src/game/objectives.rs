use derelict_common::entities::PlayerId;
use derelict_common::map::MAP_SCALE;
use derelict_common::protocol::{GameEvent, TriviaDifficulty};
use derelict_common::{MapId, Phase};
use glam::Vec2;

use super::Encounter;
use crate::error::SimulationError;

pub const INTERACT_RANGE: f32 = 80.0;
pub const FAST_REPAIR_MULTIPLIER: f32 = 1.5;
pub const TRIVIA_TIME_LIMIT: f32 = 15.0;
/// Extra time before an unanswered challenge counts as failed.
pub const TRIVIA_GRACE: f32 = 5.0;
pub const TRIVIA_RETRY_COOLDOWN: f32 = 10.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ObjectiveKind {
    /// Hold interact in range until progress reaches 1.
    Repair { nominal_time: f32 },
    /// Single press opens a client-side challenge.
    Confirm { difficulty: TriviaDifficulty },
}

/// Static target of one objective phase.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Objective {
    pub index: usize,
    pub map: MapId,
    pub point: Vec2,
    pub description: &'static str,
    pub kind: ObjectiveKind,
}

const fn repair(index: usize, x: f32, y: f32, description: &'static str, nominal_time: f32) -> Objective {
    Objective {
        index,
        map: MapId::Ship,
        point: Vec2::new(x * MAP_SCALE, y * MAP_SCALE),
        description,
        kind: ObjectiveKind::Repair { nominal_time },
    }
}

const fn confirm(index: usize, x: f32, y: f32, description: &'static str, difficulty: TriviaDifficulty) -> Objective {
    Objective {
        index,
        map: MapId::Ship,
        point: Vec2::new(x * MAP_SCALE, y * MAP_SCALE),
        description,
        kind: ObjectiveKind::Confirm { difficulty },
    }
}

const OBJECTIVES: [Objective; 7] = [
    repair(0, 512.0, 200.0, "Stabilize Core System", 45.0),
    confirm(1, 512.0, 250.0, "Authenticate Core Access", TriviaDifficulty::Easy),
    repair(2, 250.0, 490.0, "Restore Left Power Grid", 75.0),
    confirm(3, 250.0, 540.0, "Verify Power Routing", TriviaDifficulty::Medium),
    repair(4, 774.0, 490.0, "Restore Right Power Grid", 45.0),
    confirm(5, 774.0, 540.0, "Unlock Airlock Controls", TriviaDifficulty::Hard),
    repair(6, 512.0, 870.0, "Activate Engine Core", 30.0),
];

/// Objective worked on during `phase`, if it has one.
pub fn objective_for(phase: Phase) -> Option<&'static Objective> {
    let index = match phase {
        Phase::Repair1 => 0,
        Phase::Confirm1 => 1,
        Phase::Repair2 => 2,
        Phase::Confirm2 => 3,
        Phase::Repair3 => 4,
        Phase::Confirm3 => 5,
        Phase::Final => 6,
        Phase::Cinematic | Phase::Intro | Phase::Boss => return None,
    };
    OBJECTIVES.get(index)
}

impl Encounter {
    pub(super) fn update_objective(&mut self, dt: f32) -> Result<(), SimulationError> {
        self.trivia_cooldown = (self.trivia_cooldown - dt).max(0.0);

        match self.phase {
            Phase::Intro => {
                if self.phase_timer >= super::INTRO_DURATION {
                    self.complete_phase()?;
                }
                Ok(())
            }
            phase if phase.is_repair() => self.update_repair(dt),
            phase if phase.is_confirm() => {
                self.expire_trivia(dt);
                Ok(())
            }
            _ => Ok(()),
        }
    }

    fn update_repair(&mut self, dt: f32) -> Result<(), SimulationError> {
        let objective = objective_for(self.phase).ok_or(SimulationError::MissingObjective(self.phase))?;
        let ObjectiveKind::Repair { nominal_time } = objective.kind else {
            return Err(SimulationError::MissingObjective(self.phase));
        };

        let mut gained = 0.0;
        for player in &mut self.players {
            if !player.alive
                || !player.input.interact
                || player.trivia_pending
                || player.map != objective.map
                || player.position.distance(objective.point) > INTERACT_RANGE
            {
                continue;
            }
            let rate = if player.role.is_fast_repairer() {
                FAST_REPAIR_MULTIPLIER
            } else {
                1.0
            };
            let step = dt / nominal_time * rate;
            gained += step;
            player.score.repairs_done += step * nominal_time;
        }

        self.objective_progress = (self.objective_progress + gained).min(1.0);
        if self.objective_progress >= 1.0 {
            self.complete_phase()?;
        }
        Ok(())
    }

    /// Opens a challenge for the player at `index` if one can start. Called on a fresh interact press.
    pub(super) fn try_start_trivia(&mut self, index: usize) -> Result<(), SimulationError> {
        if !self.phase.is_confirm() || self.trivia.is_some() || self.trivia_cooldown > 0.0 {
            return Ok(());
        }
        let objective = objective_for(self.phase).ok_or(SimulationError::MissingObjective(self.phase))?;
        let ObjectiveKind::Confirm { difficulty } = objective.kind else {
            return Err(SimulationError::MissingObjective(self.phase));
        };
        let Some(player) = self.players.get_mut(index) else {
            return Ok(());
        };
        if player.map != objective.map || player.position.distance(objective.point) > INTERACT_RANGE {
            return Ok(());
        }

        player.trivia_pending = true;
        let player_id = player.id;
        self.trivia = Some(super::TriviaChallenge {
            player: player_id,
            elapsed: 0.0,
        });
        self.events.push(GameEvent::StartTrivia {
            player_id,
            difficulty,
            time_limit: TRIVIA_TIME_LIMIT,
            phase: self.phase,
        });
        Ok(())
    }

    fn expire_trivia(&mut self, dt: f32) {
        let Some(challenge) = self.trivia.as_mut() else {
            return;
        };
        challenge.elapsed += dt;
        if challenge.elapsed > TRIVIA_TIME_LIMIT + TRIVIA_GRACE {
            let player = challenge.player;
            self.fail_trivia(player);
        }
    }

    fn fail_trivia(&mut self, player: PlayerId) {
        self.trivia = None;
        self.trivia_cooldown = TRIVIA_RETRY_COOLDOWN;
        if let Some(p) = self.player_mut(player) {
            p.trivia_pending = false;
        }
        self.announce("AUTHENTICATION FAILED - RETRY IN 10s", 3.0, Some("#ff4d4d"));
    }

    /// Applies a challenge answer. Answers from anyone but the challenged player are ignored.
    pub fn submit_trivia_result(&mut self, player: PlayerId, success: bool) -> Result<(), SimulationError> {
        if self.outcome.is_some() || !self.trivia.is_some_and(|t| t.player == player) {
            return Ok(());
        }
        if !success {
            self.fail_trivia(player);
            return Ok(());
        }

        self.trivia = None;
        let index = self.player_index(player)?;
        let p = &mut self.players[index];
        p.trivia_pending = false;
        p.score.trivia_correct += 1;
        self.complete_phase()
    }

    /// Releases a challenge held by a player who can no longer answer it.
    pub(super) fn release_trivia(&mut self, player: PlayerId) {
        if self.trivia.is_some_and(|t| t.player == player) {
            self.trivia = None;
        }
        if let Some(p) = self.player_mut(player) {
            p.trivia_pending = false;
        }
    }
}
