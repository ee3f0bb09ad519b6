mod boss;
mod combat;
mod enemies;
pub mod objectives;
mod phase;
mod players;
pub mod spawning;

use std::sync::Arc;

use derelict_common::entities::{Boss, Enemy, EntityId, Player, PlayerId, Projectile, ProjectileOwner, Turret};
use derelict_common::protocol::{
    BossView, EnemyView, FinalScore, GameEvent, GameSnapshot, ObjectiveKindTag, ObjectiveView,
    PlayerView, ProjectileView, TurretView,
};
use derelict_common::score::leaderboard_points;
use derelict_common::{InputState, MapId, Phase, Role, World};
use glam::Vec2;
use rand::Rng;
use rand::rngs::StdRng;

use crate::error::SimulationError;
use self::objectives::{ObjectiveKind, objective_for};
use self::spawning::SpawnState;

pub const MISSION_DURATION: f32 = 600.0;
pub const CINEMATIC_DURATION: f32 = 6.0;
pub const INTRO_DURATION: f32 = 15.0;
/// Mission timer ceiling once the boss is down.
pub const FINAL_TIMER_CAP: f32 = 60.0;
pub const RESPAWN_TIME: f32 = 5.0;

/// Per-server encounter tuning.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EncounterRules {
    /// Players killed while the boss lives stay down until it dies.
    pub permadeath_during_boss_phase: bool,
    pub mission_duration: f32,
}

impl Default for EncounterRules {
    fn default() -> Self {
        Self {
            permadeath_during_boss_phase: true,
            mission_duration: MISSION_DURATION,
        }
    }
}

/// Enemy stat accumulators raised every time an objective completes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Difficulty {
    pub hp_scale: f32,
    pub damage_base: f32,
    pub speed_base: f32,
}

impl Default for Difficulty {
    fn default() -> Self {
        Self {
            hp_scale: 1.0,
            damage_base: 12.0,
            speed_base: 100.0,
        }
    }
}

impl Difficulty {
    fn nudge(&mut self) {
        self.hp_scale += 0.1;
        self.damage_base += 1.0;
        self.speed_base += 2.5;
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct TriviaChallenge {
    player: PlayerId,
    elapsed: f32,
}

/// One participant as the room hands it over at game start.
#[derive(Debug, Clone)]
pub struct RosterEntry {
    pub id: PlayerId,
    pub name: String,
    pub role: Role,
}

/// Mutable world of one running game. Advanced only by [`Encounter::tick`].
pub struct Encounter {
    world: Arc<World>,
    rules: EncounterRules,
    rng: StdRng,
    phase: Phase,
    timer: f32,
    phase_timer: f32,
    objective_progress: f32,
    door_unlocked: bool,
    weakpoint_timer: f32,
    difficulty: Difficulty,
    objectives_completed: u32,
    repairs_completed: u32,
    spawn: SpawnState,
    trivia: Option<TriviaChallenge>,
    trivia_cooldown: f32,
    players: Vec<Player>,
    enemies: Vec<Enemy>,
    boss: Option<Boss>,
    projectiles: Vec<Projectile>,
    turrets: Vec<Turret>,
    events: Vec<GameEvent>,
    next_entity_id: u32,
    outcome: Option<bool>,
}

/// Ship starting slots, in join order.
const START_POSITIONS: [(f32, f32); 4] = [(500.0, 700.0), (524.0, 700.0), (500.0, 730.0), (524.0, 730.0)];

impl Encounter {
    pub fn new(world: Arc<World>, rules: EncounterRules, roster: &[RosterEntry], rng: StdRng) -> Self {
        let players = roster
            .iter()
            .enumerate()
            .map(|(slot, entry)| {
                let (x, y) = START_POSITIONS[slot % START_POSITIONS.len()];
                let position = Vec2::new(x, y) * derelict_common::map::MAP_SCALE;
                Player::new(entry.id, entry.name.clone(), entry.role, position)
            })
            .collect();

        Self {
            world,
            rules,
            rng,
            phase: Phase::Cinematic,
            timer: rules.mission_duration,
            phase_timer: 0.0,
            objective_progress: 0.0,
            door_unlocked: false,
            weakpoint_timer: 0.0,
            difficulty: Difficulty::default(),
            objectives_completed: 0,
            repairs_completed: 0,
            spawn: SpawnState::default(),
            trivia: None,
            trivia_cooldown: 0.0,
            players,
            enemies: Vec::new(),
            boss: None,
            projectiles: Vec::new(),
            turrets: Vec::new(),
            events: Vec::new(),
            next_entity_id: 1,
            outcome: None,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Mission time left, in seconds.
    pub fn time_remaining(&self) -> f32 {
        self.timer
    }

    pub fn phase_timer(&self) -> f32 {
        self.phase_timer
    }

    pub fn objective_progress(&self) -> f32 {
        self.objective_progress
    }

    pub fn difficulty(&self) -> Difficulty {
        self.difficulty
    }

    pub fn door_unlocked(&self) -> bool {
        self.door_unlocked
    }

    pub fn weakpoint_active(&self) -> bool {
        self.weakpoint_timer > 0.0
    }

    /// `Some(victory)` once the mission has ended.
    pub fn outcome(&self) -> Option<bool> {
        self.outcome
    }

    pub fn players(&self) -> &[Player] {
        &self.players
    }

    pub fn player(&self, id: PlayerId) -> Option<&Player> {
        self.players.iter().find(|p| p.id == id)
    }

    pub fn player_mut(&mut self, id: PlayerId) -> Option<&mut Player> {
        self.players.iter_mut().find(|p| p.id == id)
    }

    pub fn enemies(&self) -> &[Enemy] {
        &self.enemies
    }

    pub fn boss(&self) -> Option<&Boss> {
        self.boss.as_ref()
    }

    pub fn boss_mut(&mut self) -> Option<&mut Boss> {
        self.boss.as_mut()
    }

    pub fn projectiles(&self) -> &[Projectile] {
        &self.projectiles
    }

    pub fn turrets(&self) -> &[Turret] {
        &self.turrets
    }

    /// Stores the latest input of a player. Returns false for unknown ids.
    pub fn set_input(&mut self, id: PlayerId, input: InputState) -> bool {
        match self.player_mut(id) {
            Some(player) => {
                player.input = input;
                true
            }
            None => false,
        }
    }

    /// Drops a disconnected player. The game continues with whoever is left.
    pub fn remove_player(&mut self, id: PlayerId) {
        self.players.retain(|p| p.id != id);
        if self.trivia.is_some_and(|t| t.player == id) {
            self.trivia = None;
        }
    }

    pub fn push_event(&mut self, event: GameEvent) {
        self.events.push(event);
    }

    /// Places a projectile directly into the world. It moves from the next tick on.
    pub fn spawn_projectile(
        &mut self,
        map: MapId,
        position: Vec2,
        velocity: Vec2,
        life: f32,
        damage: f32,
        owner: ProjectileOwner,
    ) -> EntityId {
        self.push_projectile(map, position, velocity, life, damage, owner, false, false)
    }

    #[allow(clippy::too_many_arguments)]
    fn push_projectile(
        &mut self,
        map: MapId,
        position: Vec2,
        velocity: Vec2,
        life: f32,
        damage: f32,
        owner: ProjectileOwner,
        penetrating: bool,
        fresh: bool,
    ) -> EntityId {
        let id = self.next_id();
        self.projectiles.push(Projectile {
            id,
            position,
            velocity,
            damage,
            owner,
            life,
            map,
            penetrating,
            struck: Vec::new(),
            fresh,
        });
        id
    }

    fn next_id(&mut self) -> EntityId {
        let id = EntityId(self.next_entity_id);
        self.next_entity_id += 1;
        id
    }

    fn rng_chance(&mut self, probability: f64) -> bool {
        self.rng.random_bool(probability)
    }

    fn announce(&mut self, text: &str, duration: f32, color: Option<&str>) {
        self.events.push(GameEvent::announcement(text, duration, color));
    }

    fn player_index(&self, id: PlayerId) -> Result<usize, SimulationError> {
        self.players
            .iter()
            .position(|p| p.id == id)
            .ok_or(SimulationError::UnknownPlayer(id))
    }

    /// Advances the world by one tick.
    ///
    /// Update order is fixed: players, enemies, boss, projectiles, turrets, spawning,
    /// objectives, then the win/loss check.
    pub fn tick(&mut self, dt: f32) -> Result<(), SimulationError> {
        if self.outcome.is_some() {
            return Ok(());
        }

        if !self.phase.simulates() {
            self.phase_timer += dt;
            if self.phase_timer >= CINEMATIC_DURATION {
                self.complete_phase()?;
            }
            return Ok(());
        }

        self.timer = (self.timer - dt).max(0.0);
        self.phase_timer += dt;
        self.weakpoint_timer = (self.weakpoint_timer - dt).max(0.0);

        self.update_players(dt)?;
        self.update_enemies(dt);
        self.update_boss(dt)?;
        self.update_projectiles(dt);
        self.update_turrets(dt);
        self.update_spawning(dt)?;
        self.update_objective(dt)?;
        self.check_mission_end();
        Ok(())
    }

    fn check_mission_end(&mut self) {
        if self.outcome.is_some() {
            return;
        }
        if self.timer <= 0.0 {
            self.outcome = Some(false);
            return;
        }
        if !self.players.is_empty() && self.players.iter().all(|p| !p.alive) {
            self.outcome = Some(false);
        }
    }

    fn finish(&mut self, victory: bool) {
        if self.outcome.is_none() {
            self.outcome = Some(victory);
        }
    }

    /// Builds the broadcast state and drains this tick's events.
    pub fn snapshot(&mut self) -> GameSnapshot {
        let objective = objective_for(self.phase).map(|objective| ObjectiveView {
            index: objective.index,
            x: objective.point.x,
            y: objective.point.y,
            map: objective.map,
            desc: objective.description.to_string(),
            kind: match objective.kind {
                ObjectiveKind::Repair { .. } => ObjectiveKindTag::Repair,
                ObjectiveKind::Confirm { .. } => ObjectiveKindTag::Confirm,
            },
            progress: self.objective_progress,
        });

        GameSnapshot {
            phase: self.phase,
            timer: self.timer,
            phase_timer: self.phase_timer,
            objective_progress: self.objective_progress,
            door_unlocked: self.door_unlocked,
            weakpoint_active: self.weakpoint_active(),
            players: self
                .players
                .iter()
                .map(|p| PlayerView {
                    id: p.id,
                    name: p.name.clone(),
                    role: p.role,
                    x: p.position.x,
                    y: p.position.y,
                    map: p.map,
                    hp: p.hp,
                    max_hp: p.max_hp,
                    alive: p.alive,
                    respawn_timer: p.respawn_timer,
                    ability_active: p.ability_active(),
                    ability_cd: p.ability_cooldown,
                    trivia_pending: p.trivia_pending,
                    angle: p.aim_angle,
                    score: p.score,
                })
                .collect(),
            enemies: self
                .enemies
                .iter()
                .filter(|e| !e.dead)
                .map(|e| EnemyView {
                    id: e.id.0,
                    x: e.position.x,
                    y: e.position.y,
                    map: e.map,
                    hp: e.hp,
                    max_hp: e.max_hp,
                    kind: e.kind,
                    variant: e.variant.to_string(),
                })
                .collect(),
            boss: self.boss.as_ref().map(|b| BossView {
                x: b.position.x,
                y: b.position.y,
                map: b.map,
                hp: b.hp,
                max_hp: b.max_hp,
                attack_type: b.attack,
                aggro_phase: b.aggro(),
                phase: b.phase,
            }),
            projectiles: self
                .projectiles
                .iter()
                .map(|p| ProjectileView {
                    id: p.id.0,
                    x: p.position.x,
                    y: p.position.y,
                    vx: p.velocity.x,
                    vy: p.velocity.y,
                    map: p.map,
                    is_player_projectile: !p.owner.is_hostile(),
                    // Turret shots are hitscan and never become projectiles.
                    is_turret_projectile: false,
                    penetrating: p.penetrating,
                })
                .collect(),
            turrets: self
                .turrets
                .iter()
                .map(|t| TurretView {
                    x: t.position.x,
                    y: t.position.y,
                    map: t.map,
                    timer: t.life,
                    owner: t.owner,
                })
                .collect(),
            objective,
            events: std::mem::take(&mut self.events),
        }
    }

    /// Scoreboard rows, best first by the in-game ranking.
    pub fn final_scores(&self) -> Vec<FinalScore> {
        let victory = self.outcome.unwrap_or(false);
        let mut scores: Vec<FinalScore> = self
            .players
            .iter()
            .map(|p| FinalScore {
                id: p.id,
                name: p.name.clone(),
                role: p.role,
                counters: p.score,
                alive: p.alive,
                points: leaderboard_points(&p.score, victory, p.alive),
            })
            .collect();
        scores.sort_by(|a, b| b.counters.rank_value().total_cmp(&a.counters.rank_value()));
        scores
    }
}

#[cfg(test)]
mod tests;
