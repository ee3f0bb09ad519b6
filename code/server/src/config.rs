use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;

use crate::game::EncounterRules;

/// Authoritative server for the co-op survival mission.
#[derive(Parser, Debug, Clone)]
#[command(author, version, about)]
pub struct ServerConfig {
    /// Address to bind.
    #[arg(long, default_value = "0.0.0.0")]
    pub host: String,

    /// Port for HTTP and websocket traffic.
    #[arg(short, long, default_value_t = 3000)]
    pub port: u16,

    /// Directory with the browser client.
    #[arg(long, default_value = "public")]
    pub static_dir: PathBuf,

    /// Tiled collision export for the ship interior.
    #[arg(long, default_value = "public/assets/ship_collisions.json")]
    pub ship_collisions: PathBuf,

    /// Tiled collision export for the planet surface.
    #[arg(long, default_value = "public/assets/planet_collisions.json")]
    pub planet_collisions: PathBuf,

    /// Leaderboard file, created on first write.
    #[arg(long, default_value = "leaderboard.json")]
    pub leaderboard: PathBuf,

    /// Accept `devSkipPhase` from room hosts.
    #[arg(long)]
    pub allow_dev_commands: bool,

    /// Let players killed during the boss fight respawn normally.
    #[arg(long)]
    pub no_boss_permadeath: bool,
}

impl ServerConfig {
    pub fn bind_addr(&self) -> anyhow::Result<SocketAddr> {
        Ok(format!("{}:{}", self.host, self.port).parse()?)
    }

    pub fn rules(&self) -> EncounterRules {
        EncounterRules {
            permadeath_during_boss_phase: !self.no_boss_permadeath,
            ..EncounterRules::default()
        }
    }
}
