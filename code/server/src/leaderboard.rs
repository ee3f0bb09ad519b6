use std::collections::HashMap;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use derelict_common::Role;
use derelict_common::protocol::FinalScore;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::mpsc::{self, UnboundedSender};
use tracing::warn;

pub const DEFAULT_LIMIT: usize = 50;

#[derive(Error, Debug)]
pub enum LeaderboardError {
    #[error("leaderboard i/o failed: {0}")]
    Io(#[from] io::Error),
    #[error("leaderboard json is invalid: {0}")]
    Json(#[from] serde_json::Error),
}

/// Lifetime totals of one player name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardRecord {
    pub name: String,
    pub total_score: u64,
    pub missions_completed: u32,
    pub games_played: u32,
    pub enemies_killed: u64,
    pub damage_dealt: f64,
    pub healing_done: f64,
    pub last_role: Option<Role>,
}

impl LeaderboardRecord {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            total_score: 0,
            missions_completed: 0,
            games_played: 0,
            enemies_killed: 0,
            damage_dealt: 0.0,
            healing_done: 0.0,
            last_role: None,
        }
    }

    fn absorb(&mut self, score: &FinalScore, victory: bool) {
        self.total_score += u64::from(score.points);
        self.games_played += 1;
        if victory {
            self.missions_completed += 1;
        }
        self.enemies_killed += u64::from(score.counters.enemies_killed);
        self.damage_dealt += f64::from(score.counters.damage_dealt);
        self.healing_done += f64::from(score.counters.healing_done);
        self.last_role = Some(score.role);
    }
}

/// Cross-room score storage keyed by display name.
pub trait LeaderboardStore: Send + Sync {
    /// Folds one finished game into the stored records.
    fn record_game(&self, scores: &[FinalScore], victory: bool) -> Result<(), LeaderboardError>;

    /// Best records first, at most `limit` of them.
    fn top(&self, limit: usize) -> Vec<LeaderboardRecord>;
}

fn merge(records: &mut HashMap<String, LeaderboardRecord>, scores: &[FinalScore], victory: bool) {
    for score in scores {
        records
            .entry(score.name.clone())
            .or_insert_with(|| LeaderboardRecord::new(&score.name))
            .absorb(score, victory);
    }
}

fn ranked(records: &HashMap<String, LeaderboardRecord>, limit: usize) -> Vec<LeaderboardRecord> {
    let mut list: Vec<LeaderboardRecord> = records.values().cloned().collect();
    list.sort_by(|a, b| b.total_score.cmp(&a.total_score).then_with(|| a.name.cmp(&b.name)));
    list.truncate(limit);
    list
}

#[derive(Default)]
pub struct InMemoryLeaderboard {
    records: Mutex<HashMap<String, LeaderboardRecord>>,
}

impl InMemoryLeaderboard {
    pub fn new() -> Self {
        Self::default()
    }
}

impl LeaderboardStore for InMemoryLeaderboard {
    fn record_game(&self, scores: &[FinalScore], victory: bool) -> Result<(), LeaderboardError> {
        merge(&mut self.records.lock(), scores, victory);
        Ok(())
    }

    fn top(&self, limit: usize) -> Vec<LeaderboardRecord> {
        ranked(&self.records.lock(), limit)
    }
}

/// Records kept in memory and rewritten to a JSON file after every game.
pub struct JsonFileLeaderboard {
    path: PathBuf,
    records: Mutex<HashMap<String, LeaderboardRecord>>,
    writer: Option<UnboundedSender<Vec<u8>>>,
}

impl JsonFileLeaderboard {
    /// Loads existing records. A missing file starts an empty board.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, LeaderboardError> {
        let path = path.into();
        let records = match fs::read_to_string(&path) {
            Ok(text) => serde_json::from_str::<Vec<LeaderboardRecord>>(&text)?
                .into_iter()
                .map(|r| (r.name.clone(), r))
                .collect(),
            Err(err) if err.kind() == io::ErrorKind::NotFound => HashMap::new(),
            Err(err) => return Err(err.into()),
        };
        Ok(Self {
            path,
            records: Mutex::new(records),
            writer: None,
        })
    }

    /// Hands file writes to a blocking task so `record_game` only touches memory.
    /// Must be called inside a tokio runtime.
    pub fn with_background_writer(mut self) -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel::<Vec<u8>>();
        let path = self.path.clone();
        tokio::task::spawn_blocking(move || {
            while let Some(mut bytes) = rx.blocking_recv() {
                // Only the newest snapshot matters.
                while let Ok(newer) = rx.try_recv() {
                    bytes = newer;
                }
                if let Err(err) = write_atomic(&path, &bytes) {
                    warn!(path = %path.display(), error = %err, "failed to write leaderboard");
                }
            }
        });
        self.writer = Some(tx);
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl LeaderboardStore for JsonFileLeaderboard {
    fn record_game(&self, scores: &[FinalScore], victory: bool) -> Result<(), LeaderboardError> {
        // Lock spans the hand-off: snapshots reach the file in order.
        let mut records = self.records.lock();
        merge(&mut records, scores, victory);
        let bytes = serde_json::to_vec_pretty(&ranked(&records, usize::MAX))?;
        match &self.writer {
            Some(writer) => {
                if let Err(mpsc::error::SendError(bytes)) = writer.send(bytes) {
                    write_atomic(&self.path, &bytes)?;
                }
            }
            None => write_atomic(&self.path, &bytes)?,
        }
        Ok(())
    }

    fn top(&self, limit: usize) -> Vec<LeaderboardRecord> {
        ranked(&self.records.lock(), limit)
    }
}

/// Writes through a sibling temp file and renames it over `path`.
fn write_atomic(path: &Path, bytes: &[u8]) -> io::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    let mut file = fs::File::create(&tmp)?;
    file.write_all(bytes)?;
    file.sync_all()?;
    drop(file);
    fs::rename(&tmp, path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use derelict_common::entities::{PlayerId, ScoreCounters};
    use tempfile::TempDir;

    fn score(name: &str, kills: u32, points: u32) -> FinalScore {
        FinalScore {
            id: PlayerId(1),
            name: name.to_string(),
            role: Role::Scout,
            counters: ScoreCounters {
                enemies_killed: kills,
                damage_dealt: 600.0,
                ..Default::default()
            },
            alive: true,
            points,
        }
    }

    #[test]
    fn records_accumulate_per_name() {
        let board = InMemoryLeaderboard::new();
        board.record_game(&[score("ash", 5, 10)], true).unwrap();
        board.record_game(&[score("ash", 3, 4), score("bishop", 1, 30)], false).unwrap();

        let top = board.top(DEFAULT_LIMIT);
        assert_eq!(top[0].name, "bishop");
        let ash = &top[1];
        assert_eq!(ash.total_score, 14);
        assert_eq!(ash.games_played, 2);
        assert_eq!(ash.missions_completed, 1);
        assert_eq!(ash.enemies_killed, 8);
        assert_eq!(ash.last_role, Some(Role::Scout));
    }

    #[test]
    fn top_respects_limit() {
        let board = InMemoryLeaderboard::new();
        let scores: Vec<_> = (0..5).map(|i| score(&format!("p{i}"), 0, i)).collect();
        board.record_game(&scores, false).unwrap();
        let top = board.top(2);
        assert_eq!(top.len(), 2);
        assert_eq!(top[0].total_score, 4);
    }

    #[test]
    fn file_board_survives_reopen() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("leaderboard.json");

        let board = JsonFileLeaderboard::open(&path).unwrap();
        assert!(board.top(DEFAULT_LIMIT).is_empty());
        board.record_game(&[score("ripley", 12, 28)], true).unwrap();

        let reopened = JsonFileLeaderboard::open(&path).unwrap();
        let top = reopened.top(DEFAULT_LIMIT);
        assert_eq!(top.len(), 1);
        assert_eq!(top[0].total_score, 28);
        assert_eq!(top[0].missions_completed, 1);
        assert!(!path.with_extension("json.tmp").exists());
    }

    #[test]
    fn missing_parent_directory_is_created() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("data").join("leaderboard.json");
        let board = JsonFileLeaderboard::open(&path).unwrap();
        board.record_game(&[score("hicks", 2, 3)], false).unwrap();
        assert!(path.exists());
    }

    #[tokio::test]
    async fn background_writer_persists_off_the_caller() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("leaderboard.json");
        let board = JsonFileLeaderboard::open(&path).unwrap().with_background_writer();
        board.record_game(&[score("vasquez", 7, 11)], false).unwrap();
        board.record_game(&[score("vasquez", 3, 4)], true).unwrap();
        assert_eq!(board.top(1)[0].total_score, 15);

        let mut persisted = Vec::new();
        for _ in 0..200 {
            persisted = JsonFileLeaderboard::open(&path).map(|b| b.top(1)).unwrap_or_default();
            if persisted.first().is_some_and(|r| r.total_score == 15) {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        assert_eq!(persisted[0].total_score, 15);
        assert_eq!(persisted[0].games_played, 2);
    }

    #[test]
    fn corrupt_file_is_reported() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("leaderboard.json");
        fs::write(&path, "not json").unwrap();
        assert!(matches!(
            JsonFileLeaderboard::open(&path),
            Err(LeaderboardError::Json(_))
        ));
    }
}
