//! Gameplay events and the synchronous observer bus
//!
//! Events are immutable records. Structural ones (`DamageBrick`, `Explode`,
//! `DamageTaken`, `BallHealed`) are requests that the reaction layer turns into
//! state changes; the rest describe what happened and feed equipment
//! reactions and external observers (VFX, audio, progression).

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::board::{BrickId, Overlay, Yields};
use super::collision::Side;
use super::entity::ProjectileKind;
use super::powerup::PowerUpEffect;
use crate::tuning::BallKind;

/// Identifier shared by all combat entities (balls, minis, projectiles)
pub type EntityId = u32;

/// Who caused a brick to lose health
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DamageSource {
    /// Direct contact from a ball or mini-ball
    Entity(EntityId),
    Projectile { id: EntityId, owner: EntityId },
    Explosion { owner: Option<EntityId> },
    /// Chain lightning hop `depth` steps away from the original hit
    Chain { owner: EntityId, depth: u32 },
    Overlay { brick: BrickId },
}

impl DamageSource {
    /// Entity whose equipment reacts to this damage
    pub fn owner(&self) -> Option<EntityId> {
        match *self {
            DamageSource::Entity(id) => Some(id),
            DamageSource::Projectile { owner, .. } => Some(owner),
            DamageSource::Explosion { owner } => owner,
            DamageSource::Chain { owner, .. } => Some(owner),
            DamageSource::Overlay { .. } => None,
        }
    }

    /// How many chain hops produced this damage
    pub fn chain_depth(&self) -> u32 {
        match *self {
            DamageSource::Chain { depth, .. } => depth,
            _ => 0,
        }
    }
}

/// Why an entity lost HP
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HarmCause {
    Wall,
    Retaliation,
    Pierce,
    GiantStrain,
    Doom,
    Explosion,
    Overlay(Overlay),
}

/// What an explosion damages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlastTarget {
    Bricks,
    Entities,
}

/// Harvestable resource kinds handed to the progression system
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Resource {
    Food,
    Wood,
    Gems,
}

/// A gameplay event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GameEvent {
    DamageBrick {
        brick: BrickId,
        amount: u32,
        source: DamageSource,
    },
    Explode {
        pos: Vec2,
        radius: f32,
        damage: u32,
        target: BlastTarget,
        source: DamageSource,
    },
    DamageTaken {
        entity: EntityId,
        amount: f32,
        pos: Vec2,
        cause: HarmCause,
    },
    BallHealed {
        entity: EntityId,
        amount: f32,
    },
    BrickHit {
        brick: BrickId,
        pos: Vec2,
        damage_dealt: u32,
        source: DamageSource,
        /// Body contact (retaliation applies)
        contact: bool,
        /// Executioner kill
        executed: bool,
    },
    BrickDestroyed {
        brick: BrickId,
        pos: Vec2,
        overlay: Option<Overlay>,
        yields: Yields,
        source: Option<DamageSource>,
    },
    BrickHealed {
        brick: BrickId,
        amount: i32,
    },
    WallHit {
        entity: EntityId,
        pos: Vec2,
        side: Side,
        mini: bool,
    },
    DyingBallDeath {
        entity: EntityId,
        kind: BallKind,
        pos: Vec2,
    },
    MiniBallDied {
        entity: EntityId,
        parent: EntityId,
        pos: Vec2,
    },
    PowerUpUsed {
        entity: EntityId,
        kind: BallKind,
        pos: Vec2,
        effects: Vec<PowerUpEffect>,
    },
    #[serde(rename = "spawn_miniballs")]
    SpawnMiniBalls {
        parent: EntityId,
        count: u32,
        pos: Vec2,
    },
    SpawnProjectiles {
        owner: EntityId,
        kind: ProjectileKind,
        count: u32,
        pos: Vec2,
    },
    SpawnBricks {
        owner: EntityId,
        bricks: Vec<BrickId>,
    },
    SpawnBreadcrumb {
        entity: EntityId,
        pos: Vec2,
    },
    ProjectileExpired {
        entity: EntityId,
        kind: ProjectileKind,
        pos: Vec2,
    },
    CoinCollected {
        amount: u32,
        pos: Vec2,
    },
    XpCollected {
        orbs: u32,
        pos: Vec2,
    },
    ResourceCollected {
        resource: Resource,
        amount: u32,
        pos: Vec2,
    },
    TurnEnded {
        tick: u64,
    },
}

/// Event name, used as the subscription key
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    DamageBrick,
    Explode,
    DamageTaken,
    BallHealed,
    BrickHit,
    BrickDestroyed,
    BrickHealed,
    WallHit,
    DyingBallDeath,
    MiniBallDied,
    PowerUpUsed,
    SpawnMiniBalls,
    SpawnProjectiles,
    SpawnBricks,
    SpawnBreadcrumb,
    ProjectileExpired,
    CoinCollected,
    XpCollected,
    ResourceCollected,
    TurnEnded,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::DamageBrick => "damage_brick",
            EventKind::Explode => "explode",
            EventKind::DamageTaken => "damage_taken",
            EventKind::BallHealed => "ball_healed",
            EventKind::BrickHit => "brick_hit",
            EventKind::BrickDestroyed => "brick_destroyed",
            EventKind::BrickHealed => "brick_healed",
            EventKind::WallHit => "wall_hit",
            EventKind::DyingBallDeath => "dying_ball_death",
            EventKind::MiniBallDied => "mini_ball_died",
            EventKind::PowerUpUsed => "power_up_used",
            EventKind::SpawnMiniBalls => "spawn_miniballs",
            EventKind::SpawnProjectiles => "spawn_projectiles",
            EventKind::SpawnBricks => "spawn_bricks",
            EventKind::SpawnBreadcrumb => "spawn_breadcrumb",
            EventKind::ProjectileExpired => "projectile_expired",
            EventKind::CoinCollected => "coin_collected",
            EventKind::XpCollected => "xp_collected",
            EventKind::ResourceCollected => "resource_collected",
            EventKind::TurnEnded => "turn_ended",
        }
    }
}

impl GameEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            GameEvent::DamageBrick { .. } => EventKind::DamageBrick,
            GameEvent::Explode { .. } => EventKind::Explode,
            GameEvent::DamageTaken { .. } => EventKind::DamageTaken,
            GameEvent::BallHealed { .. } => EventKind::BallHealed,
            GameEvent::BrickHit { .. } => EventKind::BrickHit,
            GameEvent::BrickDestroyed { .. } => EventKind::BrickDestroyed,
            GameEvent::BrickHealed { .. } => EventKind::BrickHealed,
            GameEvent::WallHit { .. } => EventKind::WallHit,
            GameEvent::DyingBallDeath { .. } => EventKind::DyingBallDeath,
            GameEvent::MiniBallDied { .. } => EventKind::MiniBallDied,
            GameEvent::PowerUpUsed { .. } => EventKind::PowerUpUsed,
            GameEvent::SpawnMiniBalls { .. } => EventKind::SpawnMiniBalls,
            GameEvent::SpawnProjectiles { .. } => EventKind::SpawnProjectiles,
            GameEvent::SpawnBricks { .. } => EventKind::SpawnBricks,
            GameEvent::SpawnBreadcrumb { .. } => EventKind::SpawnBreadcrumb,
            GameEvent::ProjectileExpired { .. } => EventKind::ProjectileExpired,
            GameEvent::CoinCollected { .. } => EventKind::CoinCollected,
            GameEvent::XpCollected { .. } => EventKind::XpCollected,
            GameEvent::ResourceCollected { .. } => EventKind::ResourceCollected,
            GameEvent::TurnEnded { .. } => EventKind::TurnEnded,
        }
    }
}

/// Observer callback
pub type Subscriber = Box<dyn FnMut(&GameEvent)>;

/// Synchronous pub/sub for external observers.
///
/// Subscribers run in registration order, on the simulation thread, while the
/// event queue drains. They see events but cannot feed new ones back; that is
/// the reaction table's job.
#[derive(Default)]
pub struct EventBus {
    subscribers: Vec<(Option<EventKind>, Subscriber)>,
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("subscribers", &self.subscribers.len())
            .finish()
    }
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe to one event kind
    pub fn subscribe(&mut self, kind: EventKind, handler: impl FnMut(&GameEvent) + 'static) {
        self.subscribers.push((Some(kind), Box::new(handler)));
    }

    /// Subscribe to every event
    pub fn subscribe_all(&mut self, handler: impl FnMut(&GameEvent) + 'static) {
        self.subscribers.push((None, Box::new(handler)));
    }

    /// Invoke every matching subscriber in registration order
    pub fn dispatch(&mut self, event: &GameEvent) {
        let kind = event.kind();
        for (filter, handler) in self.subscribers.iter_mut() {
            if filter.is_none_or(|k| k == kind) {
                handler(event);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.subscribers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subscribers.is_empty()
    }
}
