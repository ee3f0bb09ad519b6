use crate::entities::ScoreCounters;

const KILLS_PER_STEP: u32 = 5;
const DAMAGE_PER_STEP: f32 = 1000.0;
const HEALING_PER_STEP: f32 = 500.0;
const REPAIR_SECONDS_PER_STEP: f32 = 30.0;
const POINTS_PER_STEP: u32 = 5;
const POINTS_PER_TRIVIA: u32 = 5;
const VICTORY_BONUS: u32 = 10;
const SURVIVOR_BONUS: u32 = 3;

/// Leaderboard points earned in one game.
pub fn leaderboard_points(counters: &ScoreCounters, victory: bool, alive: bool) -> u32 {
    let steps = |value: f32, per_step: f32| (value.max(0.0) / per_step).floor() as u32;

    let mut points = counters.enemies_killed / KILLS_PER_STEP * POINTS_PER_STEP;
    points += steps(counters.damage_dealt, DAMAGE_PER_STEP) * POINTS_PER_STEP;
    points += steps(counters.healing_done, HEALING_PER_STEP) * POINTS_PER_STEP;
    points += steps(counters.repairs_done, REPAIR_SECONDS_PER_STEP) * POINTS_PER_STEP;
    points += counters.trivia_correct * POINTS_PER_TRIVIA;
    if victory {
        points += VICTORY_BONUS;
    }
    if alive {
        points += SURVIVOR_BONUS;
    }
    points
}
