use derelict_common::entities::PLAYER_RADIUS;
use derelict_common::geometry::constrain;
use derelict_common::protocol::GameEvent;
use derelict_common::{Phase, Role};

use super::{Encounter, RESPAWN_TIME};
use crate::error::SimulationError;

/// Two interact presses closer than this inside an airlock move the player across maps.
pub const DOUBLE_TAP_WINDOW: f32 = 0.4;
pub const VANGUARD_REGEN_PER_SECOND: f32 = 5.0;
pub const RESPAWN_HP_FRACTION: f32 = 0.5;
pub const CHAT_MAX_CHARS: usize = 100;

const DAMAGE_TAKEN_COLOR: &str = "#ff4d4d";

impl Encounter {
    pub(super) fn update_players(&mut self, dt: f32) -> Result<(), SimulationError> {
        for index in 0..self.players.len() {
            if !self.players[index].alive {
                self.tick_respawn(index, dt);
                continue;
            }

            let interact_pressed = {
                let player = &mut self.players[index];
                player.attack_cooldown = (player.attack_cooldown - dt).max(0.0);
                player.ability_cooldown = (player.ability_cooldown - dt).max(0.0);
                player.ability_timer = (player.ability_timer - dt).max(0.0);
                player.damage_reduction_timer = (player.damage_reduction_timer - dt).max(0.0);
                player.combat_timer = (player.combat_timer - dt).max(0.0);
                if let Some(since) = player.since_interact_press.as_mut() {
                    *since += dt;
                }

                let aim = player.input.aim_point() - player.position;
                if aim.length_squared() > f32::EPSILON {
                    player.aim_angle = aim.y.atan2(aim.x);
                }

                let pressed = player.input.interact && !player.prev_interact;
                player.prev_interact = player.input.interact;
                pressed
            };

            if interact_pressed {
                self.handle_interact_press(index)?;
            }

            if self.players[index].trivia_pending {
                continue;
            }

            self.move_player(index, dt);
            self.regenerate(index, dt);

            let input = self.players[index].input;
            if self.players[index].role == Role::Medic {
                self.heal_beam(index, dt);
            } else if input.attack && self.players[index].attack_cooldown <= 0.0 {
                self.attack(index);
            }
            if input.ability {
                self.use_ability(index);
            }
        }
        Ok(())
    }

    fn tick_respawn(&mut self, index: usize, dt: f32) {
        let player = &mut self.players[index];
        let Some(timer) = player.respawn_timer.as_mut() else {
            return;
        };
        *timer -= dt;
        if *timer <= 0.0 {
            let spawn = self.world.layout(player.map).respawn;
            player.alive = true;
            player.hp = player.max_hp * RESPAWN_HP_FRACTION;
            player.respawn_timer = None;
            player.position = spawn;
            player.attack_cooldown = 0.0;
            player.damage_reduction_timer = 0.0;
            player.combat_timer = 0.0;
        }
    }

    fn handle_interact_press(&mut self, index: usize) -> Result<(), SimulationError> {
        let (in_airlock, double_tap) = {
            let player = &mut self.players[index];
            let airlock = self.world.layout(player.map).airlock;
            let in_airlock = airlock.contains(player.position);
            let double_tap = player
                .since_interact_press
                .is_some_and(|since| since <= DOUBLE_TAP_WINDOW);
            player.since_interact_press = if double_tap { None } else { Some(0.0) };
            (in_airlock, double_tap)
        };

        if !in_airlock {
            return self.try_start_trivia(index);
        }
        if !double_tap {
            return Ok(());
        }
        if !self.door_unlocked {
            self.announce("AIRLOCK SEALED", 1.5, Some(DAMAGE_TAKEN_COLOR));
            return Ok(());
        }

        let player = &mut self.players[index];
        let destination = player.map.other();
        player.map = destination;
        player.position = self.world.layout(destination).arrival;
        let player_id = player.id;
        self.events.push(GameEvent::MapChange {
            player_id,
            map: destination,
        });
        Ok(())
    }

    fn move_player(&mut self, index: usize, dt: f32) {
        let player = &mut self.players[index];
        let axis = player.input.move_axis();
        if axis == glam::Vec2::ZERO {
            return;
        }
        let layout = self.world.layout(player.map);
        let target = player.position + axis * player.stats().speed * dt;
        player.position = constrain(target, PLAYER_RADIUS, &layout.zones, &layout.obstacles);
    }

    fn regenerate(&mut self, index: usize, dt: f32) {
        let player = &mut self.players[index];
        if player.role == Role::Vanguard && player.in_combat() {
            player.heal(VANGUARD_REGEN_PER_SECOND * dt);
        }
    }

    /// Applies hostile damage to a player and handles the death that may follow.
    pub(super) fn damage_player(&mut self, index: usize, amount: f32) -> f32 {
        let Some(player) = self.players.get_mut(index) else {
            return 0.0;
        };
        if !player.alive {
            return 0.0;
        }
        let taken = player.apply_damage(amount);
        let (x, y) = (player.position.x, player.position.y);
        let died = player.hp <= 0.0;
        self.events.push(GameEvent::Damage {
            x,
            y,
            value: taken,
            color: Some(DAMAGE_TAKEN_COLOR.to_string()),
        });
        if died {
            self.kill_player(index);
        }
        taken
    }

    fn kill_player(&mut self, index: usize) {
        let permadeath = self.rules.permadeath_during_boss_phase && self.phase == Phase::Boss;
        let player = &mut self.players[index];
        player.alive = false;
        player.hp = 0.0;
        player.ability_timer = 0.0;
        player.respawn_timer = if permadeath { None } else { Some(RESPAWN_TIME) };
        let (id, x, y) = (player.id, player.position.x, player.position.y);
        self.events.push(GameEvent::Kill { x, y });
        self.release_trivia(id);
    }

    /// In-game chat line, shown with the sender's role color.
    pub fn push_chat(&mut self, player: derelict_common::PlayerId, msg: &str) {
        let Some(sender) = self.player(player) else {
            return;
        };
        let event = GameEvent::Chat {
            name: sender.name.clone(),
            msg: msg.chars().take(CHAT_MAX_CHARS).collect(),
            color: sender.role.color().to_string(),
        };
        self.events.push(event);
    }
}
