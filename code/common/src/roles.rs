use serde::{Deserialize, Serialize};
use strum_macros::EnumIter;

/// Shared cooldown of every role ability, in seconds.
pub const ABILITY_COOLDOWN: f32 = 30.0;

#[derive(EnumIter, Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Vanguard,
    Engineer,
    Scout,
    Medic,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttackKind {
    /// Cone hit-test in front of the player.
    Melee,
    /// Spawns a projectile along the aim direction.
    Projectile,
    /// Heals the nearest wounded ally instead of attacking.
    HealBeam,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AbilityKind {
    /// Melee damage buff plus a damage-reduction window.
    Fortify,
    /// Deploys a turret in front of the caster.
    DeployTurret,
    /// Piercing shot that also exposes the boss weakpoint.
    PiercingScan,
    /// Area heal that also grants damage reduction.
    HealBurst,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RoleStats {
    pub max_hp: f32,
    pub damage: f32,
    pub range: f32,
    pub speed: f32,
    pub attack_cooldown: f32,
    pub projectile_speed: f32,
    pub attack: AttackKind,
    pub ability: AbilityKind,
}

impl Role {
    pub fn stats(self) -> RoleStats {
        match self {
            Role::Vanguard => RoleStats {
                max_hp: 220.0,
                damage: 28.0,
                range: 55.0,
                speed: 200.0,
                attack_cooldown: 0.6,
                projectile_speed: 0.0,
                attack: AttackKind::Melee,
                ability: AbilityKind::Fortify,
            },
            Role::Engineer => RoleStats {
                max_hp: 170.0,
                damage: 18.0,
                range: 250.0,
                speed: 200.0,
                attack_cooldown: 0.8,
                projectile_speed: 500.0,
                attack: AttackKind::Projectile,
                ability: AbilityKind::DeployTurret,
            },
            Role::Scout => RoleStats {
                max_hp: 140.0,
                damage: 22.0,
                range: 200.0,
                speed: 230.0 * 1.15,
                attack_cooldown: 0.4,
                projectile_speed: 600.0,
                attack: AttackKind::Projectile,
                ability: AbilityKind::PiercingScan,
            },
            Role::Medic => RoleStats {
                max_hp: 160.0,
                damage: 10.0,
                range: 200.0,
                speed: 200.0,
                attack_cooldown: 0.7,
                projectile_speed: 400.0,
                attack: AttackKind::HealBeam,
                ability: AbilityKind::HealBurst,
            },
        }
    }

    /// Name color used for chat lines.
    pub fn color(self) -> &'static str {
        match self {
            Role::Vanguard => "#4cc9f0",
            Role::Engineer => "#f4a261",
            Role::Scout => "#ffd166",
            Role::Medic => "#ef476f",
        }
    }

    /// Repairs progress faster for this role.
    pub fn is_fast_repairer(self) -> bool {
        matches!(self, Role::Engineer)
    }
}
