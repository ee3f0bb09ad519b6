use std::sync::Arc;

use derelict_common::entities::{EnemyKind, PlayerId, ProjectileOwner, Target, Turret};
use derelict_common::protocol::GameEvent;
use derelict_common::{DT, InputState, MapId, MapLayout, Obstacle, Phase, Rect, Role, World};
use glam::Vec2;
use rand::SeedableRng;
use rand::rngs::StdRng;
use strum::IntoEnumIterator;

use super::combat::{
    DAMAGE_REDUCTION_DURATION, FORTIFY_MELEE_DAMAGE, PIERCING_DAMAGE, TURRET_DAMAGE, TURRET_FIRE_COOLDOWN,
    TURRET_LIFETIME, TURRET_RANGE, WEAKPOINT_DURATION,
};
use super::objectives::objective_for;
use super::spawning::{MAX_CONCURRENT_ENEMIES, spawn_rule};
use super::{Encounter, EncounterRules, RosterEntry};

fn roster(roles: &[Role]) -> Vec<RosterEntry> {
    roles
        .iter()
        .enumerate()
        .map(|(i, role)| RosterEntry {
            id: PlayerId(i as u32 + 1),
            name: format!("p{}", i + 1),
            role: *role,
        })
        .collect()
}

fn encounter_with(rules: EncounterRules, roles: &[Role]) -> Encounter {
    Encounter::new(
        Arc::new(World::builtin()),
        rules,
        &roster(roles),
        StdRng::seed_from_u64(7),
    )
}

fn encounter(roles: &[Role]) -> Encounter {
    encounter_with(EncounterRules::default(), roles)
}

fn encounter_in(world: World, roles: &[Role]) -> Encounter {
    Encounter::new(
        Arc::new(world),
        EncounterRules::default(),
        &roster(roles),
        StdRng::seed_from_u64(7),
    )
}

fn planet_with(obstacles: Vec<Obstacle>) -> World {
    World::new(MapLayout::ship(), MapLayout::planet().with_obstacles(obstacles))
}

/// Moves the first player onto the planet at `at`, facing +x.
fn stand_on_planet(game: &mut Encounter, at: Vec2) {
    let player = &mut game.players[0];
    player.map = MapId::Planet;
    player.position = at;
    player.aim_angle = 0.0;
}

fn damage_events(game: &mut Encounter) -> Vec<f32> {
    game.snapshot()
        .events
        .into_iter()
        .filter_map(|e| match e {
            GameEvent::Damage { value, .. } => Some(value),
            _ => None,
        })
        .collect()
}

fn advance_to(encounter: &mut Encounter, phase: Phase) {
    while encounter.phase() != phase {
        encounter.skip_phase().unwrap();
    }
}

fn run(encounter: &mut Encounter, ticks: usize) {
    for _ in 0..ticks {
        encounter.tick(DT).unwrap();
    }
}

fn hold(encounter: &mut Encounter, id: PlayerId, input: InputState) {
    assert!(encounter.set_input(id, input));
}

#[test]
fn cinematic_hands_over_to_intro_after_six_seconds() {
    let mut game = encounter(&[Role::Vanguard, Role::Medic]);
    run(&mut game, 110);
    assert_eq!(game.phase(), Phase::Cinematic);
    assert_eq!(game.time_remaining(), 600.0);

    run(&mut game, 15);
    assert_eq!(game.phase(), Phase::Intro);
    assert_eq!(game.objective_progress(), 0.0);
}

#[test]
fn intro_ends_after_grace_period() {
    let mut game = encounter(&[Role::Scout]);
    advance_to(&mut game, Phase::Intro);
    run(&mut game, 290);
    assert_eq!(game.phase(), Phase::Intro);
    run(&mut game, 20);
    assert_eq!(game.phase(), Phase::Repair1);
    assert!(game.time_remaining() < 600.0);
}

#[test]
fn skipping_walks_the_fixed_sequence() {
    let phases: Vec<Phase> = Phase::iter().collect();
    for n in 0..phases.len() {
        let mut game = encounter(&[Role::Engineer]);
        for _ in 0..n {
            game.skip_phase().unwrap();
            assert_eq!(game.objective_progress(), 0.0);
        }
        assert_eq!(game.phase(), phases[n]);
        assert_eq!(game.outcome(), None);
    }

    let mut game = encounter(&[Role::Engineer]);
    advance_to(&mut game, Phase::Final);
    game.skip_phase().unwrap();
    assert_eq!(game.outcome(), Some(true));
}

#[test]
fn completed_objectives_raise_difficulty() {
    let mut game = encounter(&[Role::Scout]);
    advance_to(&mut game, Phase::Repair1);
    let before = game.difficulty();
    game.skip_phase().unwrap();
    let after = game.difficulty();
    assert!((after.hp_scale - before.hp_scale - 0.1).abs() < 1e-5);
    assert_eq!(after.damage_base, before.damage_base + 1.0);
    assert_eq!(after.speed_base, before.speed_base + 2.5);
}

#[test]
fn dead_player_respawns_at_half_health() {
    let mut game = encounter(&[Role::Scout, Role::Engineer]);
    advance_to(&mut game, Phase::Intro);

    game.damage_player(0, 1_000.0);
    let fallen = game.player(PlayerId(1)).unwrap();
    assert!(!fallen.alive);
    assert_eq!(fallen.hp, 0.0);
    assert_eq!(fallen.respawn_timer, Some(5.0));

    run(&mut game, 1);
    let timer = game.player(PlayerId(1)).unwrap().respawn_timer.unwrap();
    assert!(timer < 5.0);

    let mut ticks = 0;
    while !game.player(PlayerId(1)).unwrap().alive {
        game.tick(DT).unwrap();
        ticks += 1;
        assert!(ticks <= 110, "player never respawned");
    }
    let revived = game.player(PlayerId(1)).unwrap();
    assert_eq!(revived.hp, revived.max_hp * 0.5);
    assert_eq!(revived.hp, 70.0);
    assert_eq!(revived.respawn_timer, None);
    assert_eq!(revived.position, World::builtin().layout(MapId::Ship).respawn);
}

#[test]
fn projectile_disappears_when_its_lifetime_runs_out() {
    let mut game = encounter(&[Role::Engineer]);
    advance_to(&mut game, Phase::Intro);
    let id = game.spawn_projectile(
        MapId::Ship,
        Vec2::new(1500.0, 1500.0),
        Vec2::new(100.0, 0.0),
        1.0,
        5.0,
        ProjectileOwner::Player(PlayerId(1)),
    );

    for tick in 1..=19 {
        game.tick(DT).unwrap();
        let snapshot = game.snapshot();
        assert!(snapshot.projectiles.iter().any(|p| p.id == id.0), "missing after tick {tick}");
    }
    game.tick(DT).unwrap();
    assert!(game.snapshot().projectiles.is_empty());
}

#[test]
fn fresh_player_shots_do_not_move_on_their_first_tick() {
    let mut game = encounter(&[Role::Scout]);
    advance_to(&mut game, Phase::Intro);
    let origin = game.player(PlayerId(1)).unwrap().position;
    hold(
        &mut game,
        PlayerId(1),
        InputState {
            attack: true,
            mouse_x: origin.x + 100.0,
            mouse_y: origin.y,
            ..Default::default()
        },
    );
    run(&mut game, 1);
    let shot = &game.projectiles()[0];
    assert_eq!(shot.position, origin);
    run(&mut game, 1);
    assert!(game.projectiles()[0].position.x > origin.x);
}

#[test]
fn everyone_down_is_a_loss() {
    let mut game = encounter(&[Role::Vanguard, Role::Engineer]);
    advance_to(&mut game, Phase::Repair2);
    game.damage_player(0, 1_000.0);
    game.damage_player(1, 1_000.0);
    assert_eq!(game.outcome(), None);

    run(&mut game, 1);
    assert_eq!(game.outcome(), Some(false));
    let scores = game.final_scores();
    assert_eq!(scores.len(), 2);
    assert!(scores.iter().all(|s| !s.alive && s.points == 0));
}

#[test]
fn timer_expiry_is_a_loss() {
    let rules = EncounterRules {
        mission_duration: 1.0,
        ..EncounterRules::default()
    };
    let mut game = encounter_with(rules, &[Role::Medic]);
    advance_to(&mut game, Phase::Intro);
    run(&mut game, 25);
    assert_eq!(game.outcome(), Some(false));
    assert_eq!(game.time_remaining(), 0.0);
}

#[test]
fn engineers_repair_faster() {
    let objective = objective_for(Phase::Repair1).unwrap();
    let mut progress = Vec::new();
    for role in [Role::Vanguard, Role::Engineer] {
        let mut game = encounter(&[role]);
        advance_to(&mut game, Phase::Repair1);
        game.player_mut(PlayerId(1)).unwrap().position = objective.point;
        hold(
            &mut game,
            PlayerId(1),
            InputState {
                interact: true,
                ..Default::default()
            },
        );
        run(&mut game, 20);
        progress.push(game.objective_progress());
    }
    assert!((progress[0] - 1.0 / 45.0).abs() < 1e-4);
    assert!((progress[1] - 1.5 / 45.0).abs() < 1e-4);
}

#[test]
fn repair_completion_advances_phase() {
    let objective = objective_for(Phase::Repair1).unwrap();
    let mut game = encounter(&[Role::Engineer]);
    advance_to(&mut game, Phase::Repair1);
    game.player_mut(PlayerId(1)).unwrap().position = objective.point;
    hold(
        &mut game,
        PlayerId(1),
        InputState {
            interact: true,
            ..Default::default()
        },
    );
    // 45 s at x1.5 needs 600 ticks.
    for _ in 0..605 {
        // Keep the repairer alive through the first waves.
        game.player_mut(PlayerId(1)).unwrap().hp = 170.0;
        game.tick(DT).unwrap();
        if game.phase() != Phase::Repair1 {
            break;
        }
    }
    assert_eq!(game.phase(), Phase::Confirm1);
    assert_eq!(game.objective_progress(), 0.0);
    assert!(game.player(PlayerId(1)).unwrap().score.repairs_done > 44.0);
}

fn open_trivia(game: &mut Encounter) {
    let objective = objective_for(game.phase()).unwrap();
    game.player_mut(PlayerId(1)).unwrap().position = objective.point;
    hold(game, PlayerId(1), InputState::default());
    run(game, 1);
    hold(
        game,
        PlayerId(1),
        InputState {
            interact: true,
            ..Default::default()
        },
    );
    game.tick(DT).unwrap();
}

#[test]
fn trivia_success_completes_confirm_phase() {
    let mut game = encounter(&[Role::Scout, Role::Medic]);
    advance_to(&mut game, Phase::Confirm1);
    open_trivia(&mut game);

    let events = game.snapshot().events;
    assert!(events.iter().any(|e| matches!(
        e,
        GameEvent::StartTrivia { player_id: PlayerId(1), time_limit, .. } if *time_limit == 15.0
    )));
    assert!(game.player(PlayerId(1)).unwrap().trivia_pending);

    // Only the challenged player can answer.
    game.submit_trivia_result(PlayerId(2), true).unwrap();
    assert_eq!(game.phase(), Phase::Confirm1);

    game.submit_trivia_result(PlayerId(1), true).unwrap();
    assert_eq!(game.phase(), Phase::Repair2);
    let player = game.player(PlayerId(1)).unwrap();
    assert!(!player.trivia_pending);
    assert_eq!(player.score.trivia_correct, 1);
}

#[test]
fn trivia_failure_imposes_retry_cooldown() {
    let mut game = encounter(&[Role::Scout]);
    advance_to(&mut game, Phase::Confirm2);
    open_trivia(&mut game);
    game.snapshot();

    game.submit_trivia_result(PlayerId(1), false).unwrap();
    assert_eq!(game.phase(), Phase::Confirm2);
    assert!(!game.player(PlayerId(1)).unwrap().trivia_pending);

    open_trivia(&mut game);
    let events = game.snapshot().events;
    assert!(!events.iter().any(|e| matches!(e, GameEvent::StartTrivia { .. })));
}

#[test]
fn pending_trivia_locks_movement() {
    let mut game = encounter(&[Role::Vanguard]);
    advance_to(&mut game, Phase::Confirm1);
    open_trivia(&mut game);
    let locked_at = game.player(PlayerId(1)).unwrap().position;
    hold(
        &mut game,
        PlayerId(1),
        InputState {
            d: true,
            interact: true,
            ..Default::default()
        },
    );
    run(&mut game, 5);
    assert_eq!(game.player(PlayerId(1)).unwrap().position, locked_at);
}

fn double_tap(game: &mut Encounter, id: PlayerId) {
    for interact in [false, true, false, true] {
        hold(
            game,
            id,
            InputState {
                interact,
                ..Default::default()
            },
        );
        game.tick(DT).unwrap();
    }
}

#[test]
fn sealed_airlock_keeps_players_aboard() {
    let world = World::builtin();
    let mut game = encounter(&[Role::Scout]);
    advance_to(&mut game, Phase::Intro);
    game.player_mut(PlayerId(1)).unwrap().position = world.layout(MapId::Ship).airlock.center();
    double_tap(&mut game, PlayerId(1));
    assert_eq!(game.player(PlayerId(1)).unwrap().map, MapId::Ship);
}

#[test]
fn unlocked_airlock_moves_player_to_the_planet() {
    let world = World::builtin();
    let mut game = encounter(&[Role::Scout, Role::Vanguard]);
    advance_to(&mut game, Phase::Boss);
    assert!(game.door_unlocked());
    game.snapshot();

    game.player_mut(PlayerId(1)).unwrap().position = world.layout(MapId::Ship).airlock.center();
    double_tap(&mut game, PlayerId(1));
    let player = game.player(PlayerId(1)).unwrap();
    assert_eq!(player.map, MapId::Planet);
    assert_eq!(player.position, world.layout(MapId::Planet).arrival);
    assert!(game.snapshot().events.iter().any(|e| matches!(
        e,
        GameEvent::MapChange {
            player_id: PlayerId(1),
            map: MapId::Planet
        }
    )));
}

#[test]
fn boss_phase_clears_enemies_and_spawns_the_boss() {
    let mut game = encounter(&[Role::Vanguard]);
    advance_to(&mut game, Phase::Repair2);
    run(&mut game, 40);
    assert!(!game.enemies().is_empty());

    advance_to(&mut game, Phase::Boss);
    assert!(game.enemies().is_empty());
    let boss = game.boss().unwrap();
    assert_eq!(boss.map, MapId::Planet);
    assert_eq!(boss.hp, boss.max_hp);
}

#[test]
fn boss_fight_deaths_are_permanent_until_the_boss_falls() {
    let mut game = encounter(&[Role::Scout, Role::Medic]);
    advance_to(&mut game, Phase::Boss);
    game.damage_player(0, 1_000.0);
    assert_eq!(game.player(PlayerId(1)).unwrap().respawn_timer, None);

    game.boss_mut().unwrap().hp = 0.0;
    run(&mut game, 1);
    assert_eq!(game.phase(), Phase::Final);
    assert!(game.boss().is_none());
    assert!(game.time_remaining() <= 60.0);
    assert!(game.player(PlayerId(1)).unwrap().respawn_timer.is_some());
    assert!(game
        .snapshot()
        .events
        .iter()
        .any(|e| matches!(e, GameEvent::BossDeath { .. })));
}

#[test]
fn boss_permadeath_can_be_disabled() {
    let rules = EncounterRules {
        permadeath_during_boss_phase: false,
        ..EncounterRules::default()
    };
    let mut game = encounter_with(rules, &[Role::Scout, Role::Medic]);
    advance_to(&mut game, Phase::Boss);
    game.damage_player(0, 1_000.0);
    assert_eq!(game.player(PlayerId(1)).unwrap().respawn_timer, Some(5.0));
}

#[test]
fn boss_enrages_at_quarter_thresholds() {
    let mut game = encounter(&[Role::Scout]);
    advance_to(&mut game, Phase::Boss);
    game.snapshot();
    let boss = game.boss_mut().unwrap();
    boss.hp = boss.max_hp * 0.7;
    run(&mut game, 1);

    let boss = game.boss().unwrap();
    assert_eq!(boss.phase, 1);
    assert!(boss.aggro());
    let adds = game.enemies().iter().filter(|e| e.map == MapId::Planet).count();
    assert!((3..=4).contains(&adds));
}

#[test]
fn melee_hits_only_inside_the_cone() {
    let mut game = encounter(&[Role::Vanguard]);
    advance_to(&mut game, Phase::Repair2);
    run(&mut game, 1);
    let origin = game.player(PlayerId(1)).unwrap().position;
    game.spawn_enemy(derelict_common::EnemyKind::Common, MapId::Ship, origin + Vec2::new(40.0, 0.0));
    game.spawn_enemy(derelict_common::EnemyKind::Common, MapId::Ship, origin - Vec2::new(40.0, 0.0));
    let ahead = game.enemies().len() - 2;

    hold(
        &mut game,
        PlayerId(1),
        InputState {
            attack: true,
            mouse_x: origin.x + 200.0,
            mouse_y: origin.y,
            ..Default::default()
        },
    );
    game.update_players(DT).unwrap();
    let enemies = game.enemies();
    assert!(enemies[ahead].hp < enemies[ahead].max_hp);
    assert_eq!(enemies[ahead + 1].hp, enemies[ahead + 1].max_hp);
    assert_eq!(game.player(PlayerId(1)).unwrap().score.damage_dealt, 28.0);
}

#[test]
fn chat_is_colored_by_role_and_truncated() {
    let mut game = encounter(&[Role::Medic]);
    game.push_chat(PlayerId(1), &"x".repeat(300));
    let events = game.snapshot().events;
    match &events[0] {
        GameEvent::Chat { name, msg, color } => {
            assert_eq!(name, "p1");
            assert_eq!(msg.len(), 100);
            assert_eq!(color, Role::Medic.color());
        }
        other => panic!("unexpected event {other:?}"),
    }
}

#[test]
fn snapshot_drains_events() {
    let mut game = encounter(&[Role::Medic]);
    game.push_chat(PlayerId(1), "hi");
    assert_eq!(game.snapshot().events.len(), 1);
    assert!(game.snapshot().events.is_empty());
}

#[test]
fn turret_hits_instantly_then_waits_for_its_cooldown() {
    let mut game = encounter_in(planet_with(Vec::new()), &[Role::Engineer]);
    advance_to(&mut game, Phase::Intro);
    stand_on_planet(&mut game, Vec2::new(1000.0, 1000.0));
    game.use_ability(0);

    let turret = game.turrets()[0].position;
    assert_eq!(turret, Vec2::new(1060.0, 1000.0));
    game.spawn_enemy(EnemyKind::Common, MapId::Planet, turret + Vec2::new(100.0, 0.0));
    let full = game.enemies()[0].max_hp;

    game.update_turrets(DT);
    assert_eq!(game.enemies()[0].hp, full - TURRET_DAMAGE);
    assert!(game.projectiles().is_empty());
    assert_eq!(game.turrets()[0].cooldown, TURRET_FIRE_COOLDOWN);
    assert!(game
        .snapshot()
        .events
        .iter()
        .any(|e| matches!(e, GameEvent::TurretShot { .. })));

    for _ in 0..9 {
        game.update_turrets(DT);
    }
    assert_eq!(game.enemies()[0].hp, full - TURRET_DAMAGE);

    for _ in 0..3 {
        game.update_turrets(DT);
    }
    assert_eq!(game.enemies()[0].hp, full - 2.0 * TURRET_DAMAGE);
    assert_eq!(game.player(PlayerId(1)).unwrap().score.damage_dealt, 2.0 * TURRET_DAMAGE);
}

#[test]
fn turret_holds_fire_without_line_of_sight() {
    let wall = Obstacle::Rect(Rect::new(1040.0, 960.0, 20.0, 80.0));
    let mut game = encounter_in(planet_with(vec![wall]), &[Role::Engineer]);
    advance_to(&mut game, Phase::Intro);

    let origin = Vec2::new(1000.0, 1000.0);
    let id = game.next_id();
    game.turrets.push(Turret {
        id,
        owner: PlayerId(1),
        position: origin,
        map: MapId::Planet,
        life: TURRET_LIFETIME,
        cooldown: 0.0,
        range: TURRET_RANGE,
        damage: TURRET_DAMAGE,
    });
    game.spawn_enemy(EnemyKind::Common, MapId::Planet, origin + Vec2::new(100.0, 0.0));
    game.snapshot();

    for _ in 0..20 {
        game.update_turrets(DT);
    }
    let enemy = &game.enemies()[0];
    assert_eq!(enemy.hp, enemy.max_hp);
    assert_eq!(game.turrets()[0].cooldown, 0.0);
    assert!(!game
        .snapshot()
        .events
        .iter()
        .any(|e| matches!(e, GameEvent::TurretShot { .. })));
}

#[test]
fn piercing_shot_hits_each_enemy_in_line_once() {
    let mut game = encounter_in(planet_with(Vec::new()), &[Role::Scout]);
    advance_to(&mut game, Phase::Intro);
    let origin = Vec2::new(1000.0, 1000.0);
    stand_on_planet(&mut game, origin);
    for offset in [30.0, 60.0] {
        game.spawn_enemy(EnemyKind::Common, MapId::Planet, origin + Vec2::new(offset, 0.0));
    }
    for enemy in &mut game.enemies {
        enemy.max_hp = 500.0;
        enemy.hp = 500.0;
    }

    game.use_ability(0);
    assert!(game.weakpoint_active());
    assert!(game.projectiles()[0].penetrating);

    // Small steps keep the shot overlapping each enemy for several updates.
    for _ in 0..20 {
        game.update_projectiles(0.01);
    }
    for enemy in game.enemies() {
        assert_eq!(enemy.hp, 500.0 - PIERCING_DAMAGE);
    }
    let shot = &game.projectiles()[0];
    let ids: Vec<Target> = game.enemies().iter().map(|e| Target::Enemy(e.id)).collect();
    assert_eq!(shot.struck, ids);
    assert_eq!(
        game.player(PlayerId(1)).unwrap().score.damage_dealt,
        2.0 * PIERCING_DAMAGE
    );
}

#[test]
fn weakpoint_scan_amplifies_boss_damage() {
    let mut game = encounter(&[Role::Scout]);
    advance_to(&mut game, Phase::Boss);
    game.snapshot();

    game.strike_boss(100.0, Some(PlayerId(1)));
    assert_eq!(game.boss().unwrap().hp, 1900.0);

    game.use_ability(0);
    assert_eq!(game.weakpoint_timer, WEAKPOINT_DURATION);
    game.strike_boss(100.0, Some(PlayerId(1)));
    assert!((game.boss().unwrap().hp - 1765.0).abs() < 1e-3);

    let dealt = game.player(PlayerId(1)).unwrap().score.damage_dealt;
    assert!((dealt - 235.0).abs() < 1e-3);
    let events = game.snapshot().events;
    assert!(events.iter().any(|e| matches!(
        e,
        GameEvent::Damage { color: Some(color), .. } if color == "#06d6a0"
    )));
}

#[test]
fn heal_burst_restores_nearby_allies_and_shields_them() {
    let mut game = encounter(&[Role::Medic, Role::Vanguard, Role::Scout]);
    advance_to(&mut game, Phase::Intro);
    game.players[1].hp = 100.0;
    game.players[2].hp = 50.0;
    game.players[2].position = objective_for(Phase::Repair1).unwrap().point;

    game.use_ability(0);

    let vanguard = game.player(PlayerId(2)).unwrap();
    assert!((vanguard.hp - 177.0).abs() < 1e-3);
    assert_eq!(vanguard.damage_reduction_timer, DAMAGE_REDUCTION_DURATION);
    let medic = game.player(PlayerId(1)).unwrap();
    assert_eq!(medic.hp, medic.max_hp);
    assert_eq!(medic.damage_reduction_timer, DAMAGE_REDUCTION_DURATION);
    assert!((medic.score.healing_done - 77.0).abs() < 1e-3);

    let far = game.player(PlayerId(3)).unwrap();
    assert_eq!(far.hp, 50.0);
    assert_eq!(far.damage_reduction_timer, 0.0);

    let taken = game.damage_player(1, 100.0);
    assert!((taken - 70.0).abs() < 1e-3);

    // The shield lapses after four seconds.
    run(&mut game, 81);
    assert_eq!(game.player(PlayerId(2)).unwrap().damage_reduction_timer, 0.0);
}

#[test]
fn fortified_vanguard_swings_harder() {
    let mut game = encounter(&[Role::Vanguard]);
    advance_to(&mut game, Phase::Intro);
    let origin = game.players[0].position;
    game.players[0].aim_angle = 0.0;
    game.spawn_enemy(EnemyKind::Common, MapId::Ship, origin + Vec2::new(40.0, 0.0));

    game.use_ability(0);
    let vanguard = game.player(PlayerId(1)).unwrap();
    assert!(vanguard.ability_active());
    assert!(vanguard.damage_reduction_active());

    game.attack(0);
    let enemy = &game.enemies()[0];
    assert_eq!(enemy.hp, enemy.max_hp - FORTIFY_MELEE_DAMAGE);
    assert_eq!(damage_events(&mut game), vec![FORTIFY_MELEE_DAMAGE]);
}

#[test]
fn first_repair_waves_wait_for_the_grace_window() {
    let mut game = encounter(&[Role::Vanguard, Role::Engineer]);
    advance_to(&mut game, Phase::Repair1);
    run(&mut game, 290);
    assert!(game.enemies().is_empty());
    assert!(game.spawn.warning_sent);

    run(&mut game, 20);
    let spawned = game.enemies().len();
    assert!((2..=3).contains(&spawned), "{spawned}");
    assert_eq!(game.spawn.spawned as usize, spawned);
}

#[test]
fn waves_stop_at_the_phase_cap() {
    let mut game = encounter(&[Role::Vanguard]);
    advance_to(&mut game, Phase::Repair1);
    game.phase_timer = 20.0;
    for _ in 0..5_000 {
        game.update_spawning(DT).unwrap();
    }
    let cap = spawn_rule(Phase::Repair1).unwrap().phase_cap;
    assert_eq!(game.spawn.spawned, cap);
    assert_eq!(game.enemies().len(), cap as usize);
}

#[test]
fn crowded_map_skips_the_wave() {
    let mut game = encounter(&[Role::Vanguard]);
    advance_to(&mut game, Phase::Repair2);
    let at = game.world.layout(MapId::Ship).respawn;
    for _ in 0..=MAX_CONCURRENT_ENEMIES {
        game.spawn_enemy(EnemyKind::Common, MapId::Ship, at);
    }

    game.update_spawning(DT).unwrap();
    assert_eq!(game.enemies().len(), MAX_CONCURRENT_ENEMIES + 1);
    assert_eq!(game.spawn.spawned, 0);
    assert_eq!(game.spawn.wave_timer, spawn_rule(Phase::Repair2).unwrap().interval);

    game.enemies.truncate(MAX_CONCURRENT_ENEMIES);
    game.spawn.wave_timer = 0.0;
    game.update_spawning(DT).unwrap();
    let wave = game.enemies().len() - MAX_CONCURRENT_ENEMIES;
    assert!((3..=4).contains(&wave), "{wave}");
}

#[test]
fn unreachable_target_is_chased_in_a_straight_line() {
    let target = Vec2::new(2000.0, 2000.0);
    let walled_in = Obstacle::Rect(Rect::new(1800.0, 1800.0, 400.0, 400.0));
    let mut game = encounter_in(planet_with(vec![walled_in]), &[Role::Vanguard]);
    advance_to(&mut game, Phase::Intro);
    stand_on_planet(&mut game, target);

    let start = Vec2::new(1500.0, 2000.0);
    assert_eq!(game.world.map(MapId::Planet).nav.find_path(start, target), None);
    game.spawn_enemy(EnemyKind::Common, MapId::Planet, start);

    game.update_enemies(DT);
    let enemy = &game.enemies()[0];
    assert!(enemy.path.is_empty());
    assert!(enemy.position.x > start.x);
    assert!((enemy.position.y - start.y).abs() < 1e-3);
    assert!(enemy.repath_timer > 0.0);
}

#[test]
fn reachable_target_gets_a_path() {
    let mut game = encounter_in(planet_with(Vec::new()), &[Role::Vanguard]);
    advance_to(&mut game, Phase::Intro);
    stand_on_planet(&mut game, Vec2::new(2000.0, 2000.0));
    game.spawn_enemy(EnemyKind::Common, MapId::Planet, Vec2::new(1500.0, 1800.0));

    game.update_enemies(DT);
    assert!(!game.enemies()[0].path.is_empty());
}
