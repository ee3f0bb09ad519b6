use derelict_common::map::SpawnGroup;
use derelict_common::{PlayerId, Phase};
use thiserror::Error;

/// Rejected client command. The display text is sent back in `error{message}`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CommandError {
    #[error("Unknown or malformed command")]
    Malformed,
    #[error("Room not found")]
    RoomNotFound,
    #[error("Room is full")]
    RoomFull,
    #[error("Game already in progress")]
    GameInProgress,
    #[error("Role already taken")]
    RoleTaken,
    #[error("Already in a room")]
    AlreadyInRoom,
    #[error("Not in a room")]
    NotInRoom,
    #[error("Only the host can do that")]
    NotHost,
    #[error("Select a role first")]
    NoRole,
    #[error("Cannot start game")]
    CannotStart,
    #[error("No game in progress")]
    NoGame,
    #[error("Dev commands are disabled")]
    DevCommandsDisabled,
}

/// Inconsistent state found while advancing an encounter.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SimulationError {
    #[error("no objective defined for phase {0:?}")]
    MissingObjective(Phase),
    #[error("spawn group {0:?} has no points on its map")]
    EmptySpawnGroup(SpawnGroup),
    #[error("player {0} is not part of this encounter")]
    UnknownPlayer(PlayerId),
}
