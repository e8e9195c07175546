//! Combat entities: balls, mini-balls and projectiles
//!
//! Balls and mini-balls share [`Motion`] and [`ContactState`] and are driven
//! through the collision engine via the [`Striker`] trait. Projectiles carry
//! a fixed damage value and resolve separately.

use std::collections::{BTreeMap, BTreeSet};

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::board::BrickId;
use super::damage::StrikeProfile;
use super::equipment::Wielder;
use super::event::{BlastTarget, DamageSource, EntityId, GameEvent, HarmCause};
use super::inventory::{BallRecord, InstanceId};
use crate::consts::*;
use crate::tuning::{BallKind, BallStats, Tuning};
use crate::{direction, heading, normalize_angle};

/// Position and velocity of a round body. Velocity is in pixels per tick.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Motion {
    pub pos: Vec2,
    /// Position before the latest sub-move
    pub prev_pos: Vec2,
    pub vel: Vec2,
    pub radius: f32,
}

impl Motion {
    pub fn at(pos: Vec2, radius: f32) -> Self {
        Self {
            pos,
            prev_pos: pos,
            vel: Vec2::ZERO,
            radius,
        }
    }

    pub fn with_vel(mut self, vel: Vec2) -> Self {
        self.vel = vel;
        self
    }

    #[inline]
    pub fn speed(&self) -> f32 {
        self.vel.length()
    }

    /// Move by `delta`, remembering where we came from
    #[inline]
    pub fn advance(&mut self, delta: Vec2) {
        self.prev_pos = self.pos;
        self.pos += delta;
    }
}

/// Per-brick contact bookkeeping
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContactState {
    /// Bricks passed through during the current traversal
    pub pierced: BTreeSet<BrickId>,
    /// Ticks of damage immunity left, per brick
    pub cooldowns: BTreeMap<BrickId, u32>,
    pub piercing_contacts_left: u32,
    pub phasing_ticks: u32,
}

impl ContactState {
    /// Passing through bricks instead of bouncing
    #[inline]
    pub fn is_bypassing(&self) -> bool {
        self.piercing_contacts_left > 0 || self.phasing_ticks > 0
    }

    pub fn on_cooldown(&self, brick: BrickId) -> bool {
        self.cooldowns.contains_key(&brick)
    }

    pub fn start_cooldown(&mut self, brick: BrickId) {
        self.cooldowns.insert(brick, BRICK_HIT_COOLDOWN_TICKS);
    }

    /// Called once at the start of every tick. The hit tick itself counts as
    /// the first cooldown tick.
    pub fn tick(&mut self) {
        self.cooldowns.retain(|_, ticks| {
            *ticks = ticks.saturating_sub(1);
            *ticks > 0
        });
        self.phasing_ticks = self.phasing_ticks.saturating_sub(1);
    }
}

/// Anything the collision engine can drive into bricks
pub trait Striker {
    fn id(&self) -> EntityId;
    fn motion(&self) -> &Motion;
    fn motion_mut(&mut self) -> &mut Motion;
    fn contacts(&self) -> &ContactState;
    fn contacts_mut(&mut self) -> &mut ContactState;
    fn wielder(&self) -> Wielder;
    fn strike_profile(&self, tuning: &Tuning) -> StrikeProfile;

    /// Overlap-mode collision, no brick or wall bounces
    fn is_giant(&self) -> bool {
        false
    }

    fn is_ghost(&self) -> bool {
        self.wielder().ghost
    }

    /// Record damage dealt in overlap mode. Returns HP to lose now.
    fn absorb_strain(&mut self, _dealt: u32) -> f32 {
        0.0
    }
}

/// Ball lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BallPhase {
    Idle,
    Aiming,
    Moving,
    /// HP ran out; waiting for the next contact (or dying right away)
    Dying,
    Dead,
}

/// Ball radius for a kind and area enchantment
pub fn ball_radius(cell_size: f32, stats: &BallStats, area_factor: f32) -> f32 {
    let radius = cell_size * BALL_RADIUS_FACTOR * stats.radius_mult * area_factor.max(0.0).sqrt();
    if stats.giant {
        radius
    } else {
        radius.min(cell_size / 2.0 * RADIUS_TOLERANCE)
    }
}

/// A player ball
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ball {
    pub id: EntityId,
    pub kind: BallKind,
    pub instance: Option<InstanceId>,
    pub motion: Motion,
    pub contacts: ContactState,
    pub phase: BallPhase,
    pub hp: f32,
    pub max_hp: f32,
    /// Launch speed in pixels per tick
    pub speed: f32,
    pub giant: bool,
    pub dying_grace: bool,
    pub power_up_uses: u32,
    pub power_up_buff: f32,
    pub burn_stacks: u32,
    pub burn_ticks: u32,
    pub spike_angle: f32,
    /// Ticks until a doom ball detonates
    pub doom_ticks: Option<u32>,
    pub nullifier_ticks: u32,
    pub clingy_ticks: u32,
    pub ramp_damage: f32,
    /// Overlap damage not yet converted into HP loss
    pub damage_dealt_for_hp_loss: u32,
    pub wall_hits: u32,
    /// XP orbs counted toward the next orb harvester heal
    pub orb_progress: u32,
    /// Remaining lifetime of an aim preview; `None` for real balls
    pub ghost_ticks: Option<u32>,
}

impl Ball {
    pub fn new(id: EntityId, kind: BallKind, stats: &BallStats, motion: Motion) -> Self {
        Self {
            id,
            kind,
            instance: None,
            motion,
            contacts: ContactState::default(),
            phase: BallPhase::Idle,
            hp: stats.max_hp,
            max_hp: stats.max_hp,
            speed: 0.0,
            giant: stats.giant,
            dying_grace: stats.dying_grace,
            power_up_uses: stats.power_up_uses,
            power_up_buff: 0.0,
            burn_stacks: 0,
            burn_ticks: 0,
            spike_angle: 0.0,
            doom_ticks: None,
            nullifier_ticks: 0,
            clingy_ticks: 0,
            ramp_damage: 0.0,
            damage_dealt_for_hp_loss: 0,
            wall_hits: 0,
            orb_progress: 0,
            ghost_ticks: None,
        }
    }

    /// Attach an inventory record: bonus HP and power-up charges
    pub fn with_record(mut self, instance: InstanceId, record: &BallRecord) -> Self {
        self.instance = Some(instance);
        self.max_hp += record.bonus_hp();
        self.hp = self.max_hp;
        self.power_up_uses += record.bonus_uses();
        self
    }

    pub fn with_speed(mut self, speed: f32) -> Self {
        self.speed = speed;
        self
    }

    /// Turn into an aim preview that expires after `ticks`
    pub fn into_ghost(mut self, ticks: u32) -> Self {
        self.ghost_ticks = Some(ticks);
        self.power_up_uses = 0;
        self
    }

    #[inline]
    pub fn is_ghost(&self) -> bool {
        self.ghost_ticks.is_some()
    }

    /// Moves and collides this tick
    #[inline]
    pub fn is_active(&self) -> bool {
        matches!(self.phase, BallPhase::Moving | BallPhase::Dying)
    }

    #[inline]
    pub fn is_dead(&self) -> bool {
        self.phase == BallPhase::Dead
    }

    /// Waiting to be launched
    pub fn can_launch(&self) -> bool {
        !self.is_ghost() && matches!(self.phase, BallPhase::Idle | BallPhase::Aiming)
    }

    pub fn aim(&mut self) {
        if self.phase == BallPhase::Idle {
            self.phase = BallPhase::Aiming;
        }
    }

    /// Start moving along `dir` at launch speed
    pub fn launch(&mut self, dir: Vec2) {
        if matches!(self.phase, BallPhase::Idle | BallPhase::Aiming) {
            self.motion.vel = dir.normalize_or_zero() * self.speed;
            self.phase = BallPhase::Moving;
        }
    }

    /// Lose HP. Returns true when this hit started the dying phase.
    pub fn take_damage(&mut self, amount: f32) -> bool {
        if self.is_ghost() || matches!(self.phase, BallPhase::Dying | BallPhase::Dead) {
            return false;
        }
        self.hp -= amount;
        if self.hp <= 0.0 {
            self.hp = 0.0;
            self.phase = BallPhase::Dying;
            return true;
        }
        false
    }

    /// Restore HP up to max. Dying balls stay dying.
    pub fn heal(&mut self, amount: f32) -> f32 {
        if self.is_ghost() || matches!(self.phase, BallPhase::Dying | BallPhase::Dead) {
            return 0.0;
        }
        let before = self.hp;
        self.hp = (self.hp + amount.max(0.0)).min(self.max_hp);
        self.hp - before
    }

    /// Skips the dying grace: no grace for the kind, or the doom timer ran out
    pub fn dies_immediately(&self) -> bool {
        !self.dying_grace || self.doom_ticks == Some(0)
    }

    /// Finish dying. Emits the death notification and any death blast.
    pub fn die(&mut self, tuning: &Tuning, cell_size: f32) -> Vec<GameEvent> {
        if self.is_dead() {
            return Vec::new();
        }
        self.phase = BallPhase::Dead;
        self.contacts.pierced.clear();
        if self.is_ghost() {
            return Vec::new();
        }

        log::debug!("Ball {} ({}) died", self.id, self.kind.as_str());
        let mut events = vec![GameEvent::DyingBallDeath {
            entity: self.id,
            kind: self.kind,
            pos: self.motion.pos,
        }];
        let stats = tuning.ball(self.kind);
        if stats.death_blast > 0.0 {
            events.push(GameEvent::Explode {
                pos: self.motion.pos,
                radius: stats.death_blast_radius * cell_size,
                damage: stats.death_blast as u32,
                target: BlastTarget::Bricks,
                source: DamageSource::Explosion {
                    owner: Some(self.id),
                },
            });
        }
        events
    }

    /// Per-tick timers: contacts, burn decay, spike spin, doom, cooldowns,
    /// ghost lifetime
    pub fn tick_timers(&mut self) -> Vec<GameEvent> {
        let mut events = Vec::new();
        self.contacts.tick();
        self.nullifier_ticks = self.nullifier_ticks.saturating_sub(1);
        self.clingy_ticks = self.clingy_ticks.saturating_sub(1);

        if let Some(ticks) = self.ghost_ticks.as_mut() {
            *ticks = ticks.saturating_sub(1);
            if *ticks == 0 {
                self.phase = BallPhase::Dead;
            }
            return events;
        }

        if self.burn_stacks > 0 {
            self.burn_ticks = self.burn_ticks.saturating_sub(1);
            if self.burn_ticks == 0 {
                self.burn_stacks -= 1;
                if self.burn_stacks > 0 {
                    self.burn_ticks = BURN_DECAY_TICKS;
                }
            }
        }

        if !self.is_active() {
            return events;
        }

        if self.kind == BallKind::Spike {
            self.spike_angle = normalize_angle(self.spike_angle + SPIKE_SPIN_PER_TICK);
        }

        if let Some(ticks) = self.doom_ticks.as_mut() {
            if *ticks > 0 {
                *ticks -= 1;
                if *ticks == 0 {
                    events.push(GameEvent::DamageTaken {
                        entity: self.id,
                        amount: self.hp.max(1.0),
                        pos: self.motion.pos,
                        cause: HarmCause::Doom,
                    });
                }
            }
        }
        events
    }

    /// Add one burn stack and refresh its timer
    pub fn ignite(&mut self, stacks: u32) {
        self.burn_stacks = (self.burn_stacks + stacks).min(MAX_BURN_STACKS);
        self.burn_ticks = BURN_DECAY_TICKS;
    }
}

impl Striker for Ball {
    fn id(&self) -> EntityId {
        self.id
    }

    fn motion(&self) -> &Motion {
        &self.motion
    }

    fn motion_mut(&mut self) -> &mut Motion {
        &mut self.motion
    }

    fn contacts(&self) -> &ContactState {
        &self.contacts
    }

    fn contacts_mut(&mut self) -> &mut ContactState {
        &mut self.contacts
    }

    fn wielder(&self) -> Wielder {
        Wielder {
            ghost: self.is_ghost(),
            ..Wielder::main(self.kind, self.instance)
        }
    }

    fn strike_profile(&self, tuning: &Tuning) -> StrikeProfile {
        StrikeProfile {
            wielder: self.wielder(),
            power_up_buff: self.power_up_buff,
            ramp: self.ramp_damage,
            burn: self.burn_stacks as f32 * tuning.burn_damage_per_stack,
            nullified: self.nullifier_ticks > 0,
        }
    }

    fn is_giant(&self) -> bool {
        self.giant
    }

    fn is_ghost(&self) -> bool {
        Ball::is_ghost(self)
    }

    fn absorb_strain(&mut self, dealt: u32) -> f32 {
        self.damage_dealt_for_hp_loss += dealt;
        let loss = self.damage_dealt_for_hp_loss / GIANT_DAMAGE_PER_HP;
        self.damage_dealt_for_hp_loss %= GIANT_DAMAGE_PER_HP;
        loss as f32
    }
}

/// A small ball spawned by a parent ball's power-up
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MiniBall {
    pub id: EntityId,
    pub parent_id: EntityId,
    /// Equipment lookups go through the parent's loadout
    pub parent_kind: BallKind,
    pub parent_instance: Option<InstanceId>,
    pub motion: Motion,
    pub contacts: ContactState,
    pub hp: f32,
    pub max_hp: f32,
    pub ramp_damage: f32,
    pub wall_hits: u32,
    /// Mirrors the parent's nullifier cooldown
    pub nullified: bool,
    pub main_ball_is_dead: bool,
    pub dead: bool,
}

impl MiniBall {
    pub fn new(id: EntityId, parent: &Ball, motion: Motion, hp: f32) -> Self {
        Self {
            id,
            parent_id: parent.id,
            parent_kind: parent.kind,
            parent_instance: parent.instance,
            motion,
            contacts: ContactState::default(),
            hp,
            max_hp: hp,
            ramp_damage: 0.0,
            wall_hits: 0,
            nullified: parent.nullifier_ticks > 0,
            main_ball_is_dead: false,
            dead: false,
        }
    }

    /// Lose HP. Returns the death notification when this killed it.
    pub fn take_damage(&mut self, amount: f32) -> Option<GameEvent> {
        if self.dead {
            return None;
        }
        self.hp -= amount;
        if self.hp <= 0.0 {
            self.hp = 0.0;
            return self.die();
        }
        None
    }

    pub fn heal(&mut self, amount: f32) -> f32 {
        if self.dead {
            return 0.0;
        }
        let before = self.hp;
        self.hp = (self.hp + amount.max(0.0)).min(self.max_hp);
        self.hp - before
    }

    pub fn die(&mut self) -> Option<GameEvent> {
        if self.dead {
            return None;
        }
        self.dead = true;
        self.contacts.pierced.clear();
        Some(GameEvent::MiniBallDied {
            entity: self.id,
            parent: self.parent_id,
            pos: self.motion.pos,
        })
    }

    /// The parent is gone; minis never outlive it
    pub fn orphan(&mut self) -> Option<GameEvent> {
        self.main_ball_is_dead = true;
        self.die()
    }
}

impl Striker for MiniBall {
    fn id(&self) -> EntityId {
        self.id
    }

    fn motion(&self) -> &Motion {
        &self.motion
    }

    fn motion_mut(&mut self) -> &mut Motion {
        &mut self.motion
    }

    fn contacts(&self) -> &ContactState {
        &self.contacts
    }

    fn contacts_mut(&mut self) -> &mut ContactState {
        &mut self.contacts
    }

    fn wielder(&self) -> Wielder {
        Wielder::mini(self.parent_kind, self.parent_instance)
    }

    fn strike_profile(&self, _tuning: &Tuning) -> StrikeProfile {
        StrikeProfile {
            ramp: self.ramp_damage,
            nullified: self.nullified,
            ..StrikeProfile::plain(self.wielder())
        }
    }
}

/// Projectile behaviour
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectileKind {
    /// Straight line, stops at the first brick
    Bullet,
    /// Straight line, passes through every brick once
    Sniper,
    /// Steers toward the nearest brick and explodes
    Homing,
}

/// A projectile fired by a ball
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Projectile {
    pub id: EntityId,
    pub owner: EntityId,
    pub kind: ProjectileKind,
    pub motion: Motion,
    pub damage: u32,
    /// Ticks left before expiry
    pub lifespan: u32,
    pub pierced: BTreeSet<BrickId>,
    pub dead: bool,
}

impl Projectile {
    pub fn new(
        id: EntityId,
        owner: EntityId,
        kind: ProjectileKind,
        motion: Motion,
        damage: u32,
        lifespan: u32,
    ) -> Self {
        Self {
            id,
            owner,
            kind,
            motion,
            damage,
            lifespan,
            pierced: BTreeSet::new(),
            dead: false,
        }
    }

    pub fn source(&self) -> DamageSource {
        DamageSource::Projectile {
            id: self.id,
            owner: self.owner,
        }
    }

    /// Turn toward `target` by at most `max_turn` radians, keeping speed
    pub fn steer(&mut self, target: Vec2, max_turn: f32) {
        let speed = self.motion.speed();
        let to_target = target - self.motion.pos;
        if speed <= 0.0 || to_target.length_squared() <= f32::EPSILON {
            return;
        }
        let current = heading(self.motion.vel);
        let turn = normalize_angle(heading(to_target) - current).clamp(-max_turn, max_turn);
        self.motion.vel = direction(current + turn) * speed;
    }

    /// Terminal event on impact or expiry
    pub fn detonate(&mut self, blast_radius: f32) -> GameEvent {
        self.dead = true;
        match self.kind {
            ProjectileKind::Homing => GameEvent::Explode {
                pos: self.motion.pos,
                radius: blast_radius,
                damage: self.damage,
                target: BlastTarget::Bricks,
                source: self.source(),
            },
            _ => GameEvent::ProjectileExpired {
                entity: self.id,
                kind: self.kind,
                pos: self.motion.pos,
            },
        }
    }

    /// Count down lifespan. Returns the terminal event on expiry.
    pub fn tick_lifespan(&mut self, blast_radius: f32) -> Option<GameEvent> {
        if self.dead {
            return None;
        }
        self.lifespan = self.lifespan.saturating_sub(1);
        (self.lifespan == 0).then(|| self.detonate(blast_radius))
    }
}
