//! Deterministic simulation module
//!
//! All combat logic lives here. This module must be pure and deterministic:
//! - Fixed timestep only
//! - Seeded RNG only
//! - Stable iteration order (entities by ID, bricks by ID)
//! - No rendering or platform dependencies

pub mod board;
pub mod collision;
pub mod damage;
pub mod entity;
pub mod equipment;
pub mod event;
pub mod inventory;
pub mod powerup;
pub mod reactions;
pub mod state;
pub mod tick;

pub use board::{Board, Brick, BrickId, Overlay, PlacementError, Yields};
pub use collision::{Aabb, Contact, Side, Travel, detect_collision_side, resolve, substep_count};
pub use damage::{Arsenal, StrikeProfile, compute_damage};
pub use entity::{Ball, BallPhase, MiniBall, Motion, Projectile, ProjectileKind, Striker};
pub use equipment::{ActiveEquipment, Equipment, EquipmentId, EquipmentItem, Loadouts, Wielder};
pub use event::{DamageSource, EntityId, EventBus, EventKind, GameEvent, HarmCause};
pub use inventory::{BallRecord, Enchantment, InstanceId, Inventory};
pub use powerup::PowerUpEffect;
pub use reactions::{ReactionTable, process_events};
pub use state::{GameState, TurnPhase};
pub use tick::{TickInput, advance_frame, tick};
