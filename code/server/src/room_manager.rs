use std::collections::HashMap;
use std::sync::Arc;

use derelict_common::codec::{DecodeError, decode_client_message};
use derelict_common::protocol::{ClientMessage, RoomCode, ServerMessage};
use derelict_common::{PlayerId, World};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, error, info, warn};

use crate::config::ServerConfig;
use crate::error::CommandError;
use crate::game::EncounterRules;
use crate::leaderboard::LeaderboardStore;
use crate::room::{Member, Room, sanitize_name};
use crate::{ClientId, ROOM_CODE_ALPHABET, ROOM_CODE_LENGTH};

/// Sink for outbound messages. Sending never blocks and never fails the caller.
pub trait Outbox {
    fn send(&mut self, client_id: ClientId, message: &ServerMessage);

    fn broadcast(&mut self, client_ids: &[ClientId], message: &ServerMessage) {
        for client_id in client_ids {
            self.send(*client_id, message);
        }
    }
}

/// Recording outbox used by tests.
impl Outbox for Vec<(ClientId, ServerMessage)> {
    fn send(&mut self, client_id: ClientId, message: &ServerMessage) {
        self.push((client_id, message.clone()));
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ManagerSettings {
    pub rules: EncounterRules,
    pub allow_dev_commands: bool,
}

impl Default for ManagerSettings {
    fn default() -> Self {
        Self {
            rules: EncounterRules::default(),
            allow_dev_commands: false,
        }
    }
}

impl From<&ServerConfig> for ManagerSettings {
    fn from(config: &ServerConfig) -> Self {
        Self {
            rules: config.rules(),
            allow_dev_commands: config.allow_dev_commands,
        }
    }
}

#[derive(Debug, Clone)]
struct Session {
    player_id: PlayerId,
    room: Option<RoomCode>,
}

/// Owns every room and connection session. Driven by one task, so nothing here locks.
pub struct RoomManager {
    world: Arc<World>,
    settings: ManagerSettings,
    leaderboard: Arc<dyn LeaderboardStore>,
    rooms: HashMap<RoomCode, Room>,
    sessions: HashMap<ClientId, Session>,
    rng: StdRng,
    next_player_id: u32,
}

impl RoomManager {
    pub fn new(
        world: Arc<World>,
        settings: ManagerSettings,
        leaderboard: Arc<dyn LeaderboardStore>,
        rng: StdRng,
    ) -> Self {
        Self {
            world,
            settings,
            leaderboard,
            rooms: HashMap::new(),
            sessions: HashMap::new(),
            rng,
            next_player_id: 1,
        }
    }

    pub fn room(&self, code: &RoomCode) -> Option<&Room> {
        self.rooms.get(code)
    }

    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    pub fn player_id(&self, client_id: ClientId) -> Option<PlayerId> {
        self.sessions.get(&client_id).map(|s| s.player_id)
    }

    pub fn room_of(&self, client_id: ClientId) -> Option<&RoomCode> {
        self.sessions.get(&client_id)?.room.as_ref()
    }

    /// Registers a new connection and tells it its player id.
    pub fn connect(&mut self, client_id: ClientId, out: &mut impl Outbox) -> PlayerId {
        let player_id = PlayerId(self.next_player_id);
        self.next_player_id += 1;
        self.sessions.insert(
            client_id,
            Session {
                player_id,
                room: None,
            },
        );
        debug!(%client_id, %player_id, "client connected");
        out.send(client_id, &ServerMessage::AssignId { player_id });
        player_id
    }

    /// Decodes and applies one text frame. Garbage is dropped, bad commands get an error reply.
    pub fn handle_text(&mut self, client_id: ClientId, text: &str, out: &mut impl Outbox) {
        let message = match decode_client_message(text) {
            Ok(message) => message,
            Err(DecodeError::Unparsable(err)) => {
                debug!(%client_id, error = %err, "dropping unparsable frame");
                return;
            }
            Err(DecodeError::Invalid(err)) => {
                debug!(%client_id, error = %err, "rejecting malformed command");
                reply_error(out, client_id, &CommandError::Malformed);
                return;
            }
        };

        if let Err(err) = self.handle_message(client_id, message, out) {
            debug!(%client_id, error = %err, "command rejected");
            reply_error(out, client_id, &err);
        }
    }

    pub fn handle_message(
        &mut self,
        client_id: ClientId,
        message: ClientMessage,
        out: &mut impl Outbox,
    ) -> Result<(), CommandError> {
        let session = self.sessions.get(&client_id).cloned().ok_or(CommandError::NotInRoom)?;

        match message {
            ClientMessage::CreateRoom { name } => {
                if session.room.is_some() {
                    return Err(CommandError::AlreadyInRoom);
                }
                let code = self.generate_room_code();
                let mut room = Room::new(code.clone());
                room.add_member(Member {
                    client_id,
                    player_id: session.player_id,
                    name: sanitize_name(&name),
                    role: None,
                    ready: false,
                })?;
                info!(room = %code, %client_id, "room created");
                out.send(
                    client_id,
                    &ServerMessage::RoomCreated {
                        room_code: code.clone(),
                        player_id: session.player_id,
                    },
                );
                out.send(client_id, &room.lobby_update());
                self.rooms.insert(code.clone(), room);
                self.set_room(client_id, Some(code));
            }

            ClientMessage::JoinRoom { name, room_code } => {
                if session.room.is_some() {
                    return Err(CommandError::AlreadyInRoom);
                }
                let code = RoomCode::normalized(&room_code);
                let room = self.rooms.get_mut(&code).ok_or(CommandError::RoomNotFound)?;
                room.add_member(Member {
                    client_id,
                    player_id: session.player_id,
                    name: sanitize_name(&name),
                    role: None,
                    ready: false,
                })?;
                debug!(room = %code, %client_id, "client joined room");
                out.send(
                    client_id,
                    &ServerMessage::RoomJoined {
                        room_code: code.clone(),
                        player_id: session.player_id,
                    },
                );
                out.broadcast(&room.client_ids(), &room.lobby_update());
                self.set_room(client_id, Some(code));
            }

            ClientMessage::SelectRole { role } => {
                let room = self.room_mut(&session)?;
                room.select_role(client_id, role)?;
                out.broadcast(&room.client_ids(), &room.lobby_update());
            }

            ClientMessage::Ready => {
                let room = self.room_mut(&session)?;
                room.toggle_ready(client_id)?;
                out.broadcast(&room.client_ids(), &room.lobby_update());
            }

            ClientMessage::StartGame => {
                let seed = self.rng.random::<u64>();
                let world = Arc::clone(&self.world);
                let rules = self.settings.rules;
                let room = self.room_mut(&session)?;
                if !room.is_host(client_id) {
                    return Err(CommandError::NotHost);
                }
                room.start(world, rules, StdRng::seed_from_u64(seed))?;
                info!(room = %room.code(), players = room.members().len(), "game started");
                out.broadcast(&room.client_ids(), &ServerMessage::GameStart);
            }

            ClientMessage::Input(input) => {
                if let Some(encounter) = self.encounter_mut(&session) {
                    encounter.set_input(session.player_id, input);
                }
            }

            ClientMessage::TriviaResult { success } => {
                if let Some(encounter) = self.encounter_mut(&session) {
                    if let Err(err) = encounter.submit_trivia_result(session.player_id, success) {
                        error!(%client_id, error = %err, "trivia result failed");
                    }
                }
            }

            ClientMessage::Chat { msg } => {
                if let Some(encounter) = self.encounter_mut(&session) {
                    encounter.push_chat(session.player_id, &msg);
                }
            }

            ClientMessage::WebrtcSignal {
                target_id,
                signal_data,
            } => {
                let room = self.room_mut(&session)?;
                let target = room
                    .members()
                    .iter()
                    .find(|m| m.player_id == target_id)
                    .map(|m| m.client_id);
                if let Some(target) = target {
                    out.send(
                        target,
                        &ServerMessage::WebrtcSignal {
                            sender_id: session.player_id,
                            signal_data,
                        },
                    );
                }
            }

            ClientMessage::DevSkipPhase => {
                if !self.settings.allow_dev_commands {
                    return Err(CommandError::DevCommandsDisabled);
                }
                let room = self.room_mut(&session)?;
                if !room.is_host(client_id) {
                    return Err(CommandError::NotHost);
                }
                let code = room.code().clone();
                let encounter = room.encounter_mut().ok_or(CommandError::NoGame)?;
                match encounter.skip_phase() {
                    Ok(()) => info!(room = %code, phase = ?encounter.phase(), "phase skipped by host"),
                    Err(err) => error!(room = %code, error = %err, "phase skip failed"),
                }
            }
        }
        Ok(())
    }

    /// Forgets a connection. An emptied room is closed, otherwise the others see the new lobby.
    pub fn disconnect(&mut self, client_id: ClientId, out: &mut impl Outbox) {
        let Some(session) = self.sessions.remove(&client_id) else {
            return;
        };
        debug!(%client_id, "client disconnected");
        let Some(code) = session.room else {
            return;
        };
        let Some(room) = self.rooms.get_mut(&code) else {
            return;
        };

        room.remove_member(client_id);
        if room.is_empty() {
            self.rooms.remove(&code);
            info!(room = %code, "room closed");
        } else if !room.in_game() {
            out.broadcast(&room.client_ids(), &room.lobby_update());
        }
    }

    /// Advances every running game by `dt` and broadcasts the results.
    pub fn tick(&mut self, dt: f32, out: &mut impl Outbox) {
        for (code, room) in self.rooms.iter_mut() {
            let Some(encounter) = room.encounter_mut() else {
                continue;
            };
            if let Err(err) = encounter.tick(dt) {
                error!(room = %code, error = %err, "tick failed");
            }
            let snapshot = encounter.snapshot();
            let outcome = encounter.outcome();
            let clients = room.client_ids();
            out.broadcast(&clients, &ServerMessage::GameState(Box::new(snapshot)));

            let Some(victory) = outcome else {
                continue;
            };
            let Some(finished) = room.end_game() else {
                continue;
            };
            let scores = finished.final_scores();
            info!(room = %code, victory, "game ended");
            out.broadcast(
                &clients,
                &ServerMessage::GameOver {
                    victory,
                    scores: scores.clone(),
                    time_remaining: finished.time_remaining(),
                },
            );
            if let Err(err) = self.leaderboard.record_game(&scores, victory) {
                warn!(room = %code, error = %err, "failed to record leaderboard");
            }
            out.broadcast(&clients, &room.lobby_update());
        }
    }

    fn set_room(&mut self, client_id: ClientId, room: Option<RoomCode>) {
        if let Some(session) = self.sessions.get_mut(&client_id) {
            session.room = room;
        }
    }

    fn room_mut(&mut self, session: &Session) -> Result<&mut Room, CommandError> {
        let code = session.room.as_ref().ok_or(CommandError::NotInRoom)?;
        self.rooms.get_mut(code).ok_or(CommandError::NotInRoom)
    }

    fn encounter_mut(&mut self, session: &Session) -> Option<&mut crate::game::Encounter> {
        self.room_mut(session).ok()?.encounter_mut()
    }

    fn generate_room_code(&mut self) -> RoomCode {
        loop {
            let code: String = (0..ROOM_CODE_LENGTH)
                .map(|_| ROOM_CODE_ALPHABET[self.rng.random_range(0..ROOM_CODE_ALPHABET.len())] as char)
                .collect();
            let code = RoomCode(code);
            if !self.rooms.contains_key(&code) {
                return code;
            }
        }
    }
}

fn reply_error(out: &mut impl Outbox, client_id: ClientId, err: &CommandError) {
    out.send(
        client_id,
        &ServerMessage::Error {
            message: err.to_string(),
        },
    );
}
