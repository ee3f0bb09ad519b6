use std::collections::HashSet;
use std::sync::Arc;

use derelict_common::protocol::{LobbyPlayer, RoomCode, ServerMessage};
use derelict_common::{PlayerId, Role, World};
use rand::rngs::StdRng;

use crate::error::CommandError;
use crate::game::{Encounter, EncounterRules, RosterEntry};
use crate::{ClientId, MAX_PLAYERS, MIN_PLAYERS};

pub const MAX_NAME_CHARS: usize = 16;

/// Lobby seat of one connected client.
#[derive(Debug, Clone, PartialEq)]
pub struct Member {
    pub client_id: ClientId,
    pub player_id: PlayerId,
    pub name: String,
    pub role: Option<Role>,
    pub ready: bool,
}

/// Trims a requested display name, falling back to `Player` when nothing is left.
pub fn sanitize_name(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return "Player".to_string();
    }
    trimmed.chars().take(MAX_NAME_CHARS).collect()
}

pub struct Room {
    code: RoomCode,
    /// Join order, used for start slots and host hand-over.
    members: Vec<Member>,
    host: Option<ClientId>,
    encounter: Option<Encounter>,
}

impl Room {
    pub fn new(code: RoomCode) -> Self {
        Self {
            code,
            members: Vec::new(),
            host: None,
            encounter: None,
        }
    }

    pub fn code(&self) -> &RoomCode {
        &self.code
    }

    pub fn host(&self) -> Option<ClientId> {
        self.host
    }

    pub fn is_host(&self, client_id: ClientId) -> bool {
        self.host == Some(client_id)
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn members(&self) -> &[Member] {
        &self.members
    }

    pub fn member(&self, client_id: ClientId) -> Option<&Member> {
        self.members.iter().find(|m| m.client_id == client_id)
    }

    fn member_mut(&mut self, client_id: ClientId) -> Result<&mut Member, CommandError> {
        self.members
            .iter_mut()
            .find(|m| m.client_id == client_id)
            .ok_or(CommandError::NotInRoom)
    }

    pub fn client_ids(&self) -> Vec<ClientId> {
        self.members.iter().map(|m| m.client_id).collect()
    }

    pub fn in_game(&self) -> bool {
        self.encounter.is_some()
    }

    pub fn encounter(&self) -> Option<&Encounter> {
        self.encounter.as_ref()
    }

    pub fn encounter_mut(&mut self) -> Option<&mut Encounter> {
        self.encounter.as_mut()
    }

    pub fn add_member(&mut self, member: Member) -> Result<(), CommandError> {
        if self.in_game() {
            return Err(CommandError::GameInProgress);
        }
        if self.members.len() >= MAX_PLAYERS {
            return Err(CommandError::RoomFull);
        }
        if self.host.is_none() {
            self.host = Some(member.client_id);
        }
        self.members.push(member);
        Ok(())
    }

    /// Removes a member and hands the host seat to the earliest remaining joiner.
    pub fn remove_member(&mut self, client_id: ClientId) -> Option<Member> {
        let index = self.members.iter().position(|m| m.client_id == client_id)?;
        let member = self.members.remove(index);
        if self.host == Some(client_id) {
            self.host = self.members.first().map(|m| m.client_id);
        }
        if let Some(encounter) = self.encounter.as_mut() {
            encounter.remove_player(member.player_id);
        }
        Some(member)
    }

    /// Picks a role. Re-selecting clears the ready flag.
    pub fn select_role(&mut self, client_id: ClientId, role: Role) -> Result<(), CommandError> {
        if self.in_game() {
            return Err(CommandError::GameInProgress);
        }
        if self
            .members
            .iter()
            .any(|m| m.client_id != client_id && m.role == Some(role))
        {
            return Err(CommandError::RoleTaken);
        }
        let member = self.member_mut(client_id)?;
        member.role = Some(role);
        member.ready = false;
        Ok(())
    }

    pub fn toggle_ready(&mut self, client_id: ClientId) -> Result<(), CommandError> {
        if self.in_game() {
            return Err(CommandError::GameInProgress);
        }
        let member = self.member_mut(client_id)?;
        if member.role.is_none() {
            return Err(CommandError::NoRole);
        }
        member.ready = !member.ready;
        Ok(())
    }

    /// Player count in range, every seat has a distinct role, and all non-hosts are ready.
    pub fn can_start(&self) -> bool {
        if !(MIN_PLAYERS..=MAX_PLAYERS).contains(&self.members.len()) {
            return false;
        }
        let mut roles = HashSet::new();
        self.members.iter().all(|m| {
            let unique_role = m.role.is_some_and(|role| roles.insert(role));
            unique_role && (m.ready || self.is_host(m.client_id))
        })
    }

    pub fn lobby_update(&self) -> ServerMessage {
        ServerMessage::LobbyUpdate {
            room_code: self.code.clone(),
            players: self
                .members
                .iter()
                .map(|m| LobbyPlayer {
                    id: m.player_id,
                    name: m.name.clone(),
                    role: m.role,
                    ready: m.ready,
                    is_host: self.is_host(m.client_id),
                })
                .collect(),
            can_start: self.can_start(),
        }
    }

    pub fn start(&mut self, world: Arc<World>, rules: EncounterRules, rng: StdRng) -> Result<(), CommandError> {
        if self.in_game() {
            return Err(CommandError::GameInProgress);
        }
        if !self.can_start() {
            return Err(CommandError::CannotStart);
        }
        let roster: Vec<RosterEntry> = self
            .members
            .iter()
            .filter_map(|m| {
                m.role.map(|role| RosterEntry {
                    id: m.player_id,
                    name: m.name.clone(),
                    role,
                })
            })
            .collect();
        self.encounter = Some(Encounter::new(world, rules, &roster, rng));
        Ok(())
    }

    /// Drops the finished encounter and sends everyone back to the lobby with roles kept.
    pub fn end_game(&mut self) -> Option<Encounter> {
        for member in &mut self.members {
            member.ready = false;
        }
        self.encounter.take()
    }
}
