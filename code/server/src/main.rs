use std::path::Path;
use std::sync::Arc;

use clap::Parser;
use derelict_common::map::{GeometryLoadError, load_tiled_obstacles_from};
use derelict_common::{MapLayout, Obstacle, World};
use derelict_server::config::ServerConfig;
use derelict_server::leaderboard::{JsonFileLeaderboard, LeaderboardStore};
use derelict_server::room_manager::{ManagerSettings, RoomManager};
use derelict_server::{game_loop, transport};
use rand::SeedableRng;
use rand::rngs::StdRng;
use tokio::sync::mpsc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let config = ServerConfig::parse();

    let ship = MapLayout::ship().with_obstacles(load_obstacles(&config.ship_collisions));
    let planet = MapLayout::planet().with_obstacles(load_obstacles(&config.planet_collisions));
    let world = Arc::new(World::new(ship, planet));

    let board = JsonFileLeaderboard::open(&config.leaderboard)?.with_background_writer();
    let leaderboard: Arc<dyn LeaderboardStore> = Arc::new(board);
    info!(path = %config.leaderboard.display(), "leaderboard loaded");

    let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();
    let manager = RoomManager::new(
        world,
        ManagerSettings::from(&config),
        Arc::clone(&leaderboard),
        StdRng::from_os_rng(),
    );
    let game = tokio::spawn(game_loop::run(manager, inbound_rx));

    let addr = config.bind_addr()?;
    let routes = transport::routes(inbound_tx, leaderboard, config.static_dir.clone());
    let (bound, server) = warp::serve(routes).try_bind_with_graceful_shutdown(addr, async {
        let _ = tokio::signal::ctrl_c().await;
        info!("Shutting down...");
    })?;
    info!(%bound, static_dir = %config.static_dir.display(), "server listening");

    server.await;
    game.abort();
    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

/// A missing or broken collision file leaves the map with walkable zones only.
fn load_obstacles(path: &Path) -> Vec<Obstacle> {
    match load_tiled_obstacles_from(path) {
        Ok(obstacles) => {
            info!(path = %path.display(), count = obstacles.len(), "collision geometry loaded");
            obstacles
        }
        Err(err @ GeometryLoadError::Io(_)) => {
            warn!(path = %path.display(), error = %err, "collision file missing, map has no obstacles");
            Vec::new()
        }
        Err(err) => {
            warn!(path = %path.display(), error = %err, "collision file invalid, map has no obstacles");
            Vec::new()
        }
    }
}
