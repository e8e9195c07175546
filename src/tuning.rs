//! Data-driven ball balance
//!
//! Every ball kind maps to a row of base stats. Behaviour that is not a plain
//! number (power-up effects, death effects) dispatches on [`BallKind`] in
//! `sim::powerup`, so adding a kind means one enum variant, one table row and
//! one match arm.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::consts::DEFAULT_BASE_DAMAGE;

/// Ball type
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BallKind {
    Classic,
    Strong,
    Explosive,
    Lightning,
    Piercing,
    Phaser,
    Split,
    Cluster,
    Cell,
    Giant,
    Bullet,
    Shotgun,
    Sniper,
    Homing,
    Spike,
    Fire,
    Doom,
    Builder,
    Vampire,
}

impl BallKind {
    pub const ALL: [BallKind; 19] = [
        BallKind::Classic,
        BallKind::Strong,
        BallKind::Explosive,
        BallKind::Lightning,
        BallKind::Piercing,
        BallKind::Phaser,
        BallKind::Split,
        BallKind::Cluster,
        BallKind::Cell,
        BallKind::Giant,
        BallKind::Bullet,
        BallKind::Shotgun,
        BallKind::Sniper,
        BallKind::Homing,
        BallKind::Spike,
        BallKind::Fire,
        BallKind::Doom,
        BallKind::Builder,
        BallKind::Vampire,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            BallKind::Classic => "classic",
            BallKind::Strong => "strong",
            BallKind::Explosive => "explosive",
            BallKind::Lightning => "lightning",
            BallKind::Piercing => "piercing",
            BallKind::Phaser => "phaser",
            BallKind::Split => "split",
            BallKind::Cluster => "cluster",
            BallKind::Cell => "cell",
            BallKind::Giant => "giant",
            BallKind::Bullet => "bullet",
            BallKind::Shotgun => "shotgun",
            BallKind::Sniper => "sniper",
            BallKind::Homing => "homing",
            BallKind::Spike => "spike",
            BallKind::Fire => "fire",
            BallKind::Doom => "doom",
            BallKind::Builder => "builder",
            BallKind::Vampire => "vampire",
        }
    }
}

/// Base stats for one ball kind
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BallStats {
    pub base_damage: f32,
    pub max_hp: f32,
    /// Launch speed in cells per tick
    pub speed: f32,
    /// Radius multiplier on top of the grid unit
    pub radius_mult: f32,
    pub power_up_uses: u32,
    /// Damage added to the ball each time a power-up is cast
    pub power_up_stack_bonus: f32,
    /// Waits for the next wall/brick contact before dying
    pub dying_grace: bool,
    /// Overlap-mode collisions, no bouncing off bricks
    pub giant: bool,
    /// Explosion damage when the ball dies (0 = none)
    pub death_blast: f32,
    /// Explosion radius in cells
    pub death_blast_radius: f32,
}

impl Default for BallStats {
    fn default() -> Self {
        Self {
            base_damage: DEFAULT_BASE_DAMAGE,
            max_hp: 100.0,
            speed: 0.25,
            radius_mult: 1.0,
            power_up_uses: 1,
            power_up_stack_bonus: 0.0,
            dying_grace: true,
            giant: false,
            death_blast: 0.0,
            death_blast_radius: 0.0,
        }
    }
}

impl BallStats {
    fn with(f: impl FnOnce(&mut BallStats)) -> Self {
        let mut stats = Self::default();
        f(&mut stats);
        stats
    }

    /// Stock row for a kind
    pub fn stock(kind: BallKind) -> Self {
        match kind {
            BallKind::Classic => Self::default(),
            BallKind::Strong => Self::with(|s| {
                s.base_damage = 14.0;
                s.power_up_uses = 3;
                s.power_up_stack_bonus = 5.0;
            }),
            BallKind::Explosive => Self::with(|s| {
                s.base_damage = 8.0;
                s.death_blast = 30.0;
                s.death_blast_radius = 2.0;
            }),
            BallKind::Lightning => Self::with(|s| {
                s.base_damage = 8.0;
                s.power_up_uses = 2;
            }),
            BallKind::Piercing => Self::with(|s| {
                s.base_damage = 9.0;
                s.power_up_uses = 2;
            }),
            BallKind::Phaser => Self::with(|s| {
                s.base_damage = 8.0;
                s.speed = 0.3;
            }),
            BallKind::Split => Self::with(|s| {
                s.base_damage = 8.0;
                s.dying_grace = false;
            }),
            BallKind::Cluster => Self::with(|s| {
                s.base_damage = 7.0;
                s.death_blast = 15.0;
                s.death_blast_radius = 1.5;
            }),
            BallKind::Cell => Self::with(|s| {
                s.base_damage = 6.0;
                s.max_hp = 80.0;
                s.dying_grace = false;
            }),
            BallKind::Giant => Self::with(|s| {
                s.base_damage = 20.0;
                s.max_hp = 60.0;
                s.speed = 0.15;
                s.radius_mult = 3.0;
                s.power_up_uses = 0;
                s.giant = true;
                s.dying_grace = false;
            }),
            BallKind::Bullet => Self::with(|s| {
                s.base_damage = 8.0;
                s.power_up_uses = 3;
            }),
            BallKind::Shotgun => Self::with(|s| {
                s.base_damage = 7.0;
                s.power_up_uses = 2;
            }),
            BallKind::Sniper => Self::with(|s| {
                s.base_damage = 9.0;
                s.power_up_uses = 2;
            }),
            BallKind::Homing => Self::with(|s| {
                s.base_damage = 8.0;
                s.power_up_uses = 2;
            }),
            BallKind::Spike => Self::with(|s| {
                s.base_damage = 9.0;
                s.power_up_uses = 2;
            }),
            BallKind::Fire => Self::with(|s| {
                s.base_damage = 7.0;
            }),
            BallKind::Doom => Self::with(|s| {
                s.base_damage = 12.0;
                s.max_hp = 150.0;
                s.power_up_uses = 0;
                s.death_blast = 60.0;
                s.death_blast_radius = 3.0;
            }),
            BallKind::Builder => Self::with(|s| {
                s.base_damage = 8.0;
                s.power_up_uses = 2;
            }),
            BallKind::Vampire => Self::with(|s| {
                s.base_damage = 9.0;
                s.max_hp = 90.0;
            }),
        }
    }
}

/// Gameplay tuning knobs
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Tuning {
    /// Per-kind stats; kinds missing from the table fall back to defaults
    pub balls: BTreeMap<BallKind, BallStats>,

    // === Mini-balls ===
    pub mini_base_damage: f32,
    pub mini_max_hp: f32,
    /// Mini-ball speed in cells per tick
    pub mini_speed: f32,

    // === Projectiles ===
    /// Projectile speed in cells per tick
    pub projectile_speed: f32,
    pub projectile_lifespan_ticks: u32,
    /// Max homing turn per tick (radians)
    pub homing_turn_rate: f32,
    /// Homing explosion radius in cells
    pub homing_blast_radius: f32,

    // === Self damage ===
    /// HP a ball loses on each wall bounce
    pub wall_hit_self_damage: f32,
    /// HP a piercing ball loses per brick it passes through
    pub pierce_self_damage: f32,

    // === Kind timers ===
    /// Ticks a doom ball lives before detonating
    pub doom_ticks: u32,
    /// Burn damage added per stack
    pub burn_damage_per_stack: f32,

    // === Overlays ===
    pub overlay_period_ticks: u32,
    pub spike_retaliation: f32,
    pub healer_amount: i32,
    pub zapper_damage: f32,
    /// Zapper reach in cells
    pub zapper_range: f32,
    pub sniper_damage: f32,
    pub laser_damage: f32,
    pub mine_damage: f32,
    /// Mine blast radius in cells
    pub mine_radius: f32,
}

impl Default for Tuning {
    fn default() -> Self {
        Self {
            balls: BallKind::ALL
                .iter()
                .map(|&k| (k, BallStats::stock(k)))
                .collect(),

            mini_base_damage: 4.0,
            mini_max_hp: 20.0,
            mini_speed: 0.3,

            projectile_speed: 0.5,
            projectile_lifespan_ticks: 180,
            homing_turn_rate: 0.15,
            homing_blast_radius: 1.0,

            wall_hit_self_damage: 1.0,
            pierce_self_damage: 2.0,

            doom_ticks: 600,
            burn_damage_per_stack: 1.0,

            overlay_period_ticks: 90,
            spike_retaliation: 5.0,
            healer_amount: 5,
            zapper_damage: 3.0,
            zapper_range: 2.5,
            sniper_damage: 6.0,
            laser_damage: 2.0,
            mine_damage: 15.0,
            mine_radius: 1.5,
        }
    }
}

impl Tuning {
    /// Stats for a kind, falling back to defaults for kinds missing from the table
    pub fn ball(&self, kind: BallKind) -> BallStats {
        match self.balls.get(&kind) {
            Some(stats) => *stats,
            None => {
                log::warn!(
                    "No tuning row for ball kind '{}', using defaults",
                    kind.as_str()
                );
                BallStats::default()
            }
        }
    }

    /// Base damage for a kind (falls back to the default constant)
    pub fn base_damage(&self, kind: BallKind) -> f32 {
        self.ball(kind).base_damage
    }

    /// Parse tuning from JSON; absent fields keep their defaults
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}
