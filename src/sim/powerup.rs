//! Power-up effects
//!
//! Casting is split in two: [`Ball::peek_power_up`] describes what a cast
//! would do without touching the ball, [`Ball::use_power_up`] spends a charge
//! and applies the self-targeted part. Both return the same description for
//! the same ball state. Everything that reaches outside the ball (spawns,
//! explosions, heals) is turned into events by `GameState::apply_power_up`.

use serde::{Deserialize, Serialize};

use super::entity::{Ball, BallPhase, ProjectileKind};
use crate::consts::MAX_BURN_STACKS;
use crate::tuning::{BallKind, Tuning};

/// One piece of a power-up cast
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "effect", rename_all = "snake_case")]
pub enum PowerUpEffect {
    /// Blast centred on the ball; radius in cells
    Explode { radius: f32, damage: u32 },
    SpawnMiniBalls { count: u32 },
    SpawnProjectiles {
        kind: ProjectileKind,
        count: u32,
        damage: u32,
    },
    /// Place new bricks in free cells around the ball
    SpawnBricks { count: u32, health: i32 },
    EnterPiercing { contacts: u32 },
    EnterPhasing { ticks: u32 },
    Heal { amount: f32 },
    Ignite { stacks: u32 },
    /// Permanent damage bonus for the rest of the turn
    Empower { bonus: f32 },
    /// Lightning to the nearest bricks
    Zap { targets: u32, damage: u32 },
}

/// The cast for a kind, scaled by the ball's current damage
fn effects_for(ball: &Ball, tuning: &Tuning) -> Vec<PowerUpEffect> {
    use PowerUpEffect::*;

    let stats = tuning.ball(ball.kind);
    let damage = (stats.base_damage + ball.power_up_buff).floor().max(1.0) as u32;

    let mut effects = match ball.kind {
        BallKind::Classic => vec![Explode { radius: 1.0, damage }],
        BallKind::Strong => Vec::new(),
        BallKind::Explosive => vec![Explode {
            radius: 2.0,
            damage: damage * 2,
        }],
        BallKind::Lightning => vec![Zap { targets: 3, damage }],
        BallKind::Piercing => vec![EnterPiercing { contacts: 3 }],
        BallKind::Phaser => vec![EnterPhasing { ticks: 90 }],
        BallKind::Split => vec![SpawnMiniBalls { count: 2 }],
        BallKind::Cluster => vec![SpawnMiniBalls { count: 4 }],
        BallKind::Cell => vec![SpawnMiniBalls { count: 3 }],
        BallKind::Bullet => vec![SpawnProjectiles {
            kind: ProjectileKind::Bullet,
            count: 1,
            damage,
        }],
        BallKind::Shotgun => vec![SpawnProjectiles {
            kind: ProjectileKind::Bullet,
            count: 5,
            damage: (damage / 2).max(1),
        }],
        BallKind::Sniper => vec![SpawnProjectiles {
            kind: ProjectileKind::Sniper,
            count: 1,
            damage: damage * 2,
        }],
        BallKind::Homing => vec![SpawnProjectiles {
            kind: ProjectileKind::Homing,
            count: 2,
            damage,
        }],
        BallKind::Spike => vec![EnterPiercing { contacts: 2 }],
        BallKind::Fire => vec![Ignite {
            stacks: MAX_BURN_STACKS / 2,
        }],
        BallKind::Builder => vec![SpawnBricks {
            count: 3,
            health: damage as i32,
        }],
        BallKind::Vampire => vec![Heal {
            amount: ball.max_hp * 0.25,
        }],
        // Passive kinds
        BallKind::Giant | BallKind::Doom => Vec::new(),
    };

    if stats.power_up_stack_bonus > 0.0 {
        effects.push(Empower {
            bonus: stats.power_up_stack_bonus,
        });
    }
    effects
}

impl Ball {
    /// Whether a cast is possible right now
    pub fn can_use_power_up(&self) -> bool {
        self.power_up_uses > 0
            && !self.is_ghost()
            && matches!(
                self.phase,
                BallPhase::Idle | BallPhase::Aiming | BallPhase::Moving
            )
    }

    /// Describe the cast without spending anything
    pub fn peek_power_up(&self, tuning: &Tuning) -> Vec<PowerUpEffect> {
        if !self.can_use_power_up() {
            return Vec::new();
        }
        effects_for(self, tuning)
    }

    /// Spend a charge and apply the self-targeted effects. Returns exactly
    /// what [`Ball::peek_power_up`] returned for the state before the call.
    pub fn use_power_up(&mut self, tuning: &Tuning) -> Vec<PowerUpEffect> {
        let effects = self.peek_power_up(tuning);
        if effects.is_empty() {
            return effects;
        }

        self.power_up_uses -= 1;
        for effect in &effects {
            match *effect {
                PowerUpEffect::EnterPiercing { contacts } => {
                    self.contacts.piercing_contacts_left += contacts;
                }
                PowerUpEffect::EnterPhasing { ticks } => {
                    self.contacts.phasing_ticks = self.contacts.phasing_ticks.max(ticks);
                }
                PowerUpEffect::Ignite { stacks } => self.ignite(stacks),
                PowerUpEffect::Empower { bonus } => self.power_up_buff += bonus,
                _ => {}
            }
        }
        log::debug!(
            "Ball {} ({}) used power-up, {} left",
            self.id,
            self.kind.as_str(),
            self.power_up_uses
        );
        effects
    }
}
