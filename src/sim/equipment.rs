//! Equipment items, loadout storage and the equipment resolver
//!
//! Loadouts are 3-slot arrays keyed either by ball kind (shared by every copy
//! of that kind) or by inventory instance (one specific copy). Instance slots
//! win when present.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::inventory::InstanceId;
use crate::tuning::BallKind;

/// Slots per loadout
pub const SLOT_COUNT: usize = 3;

/// Item behaviour. Fields carry both the tunable value and fixed config.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "id", rename_all = "snake_case")]
pub enum Equipment {
    /// Every hit deals exactly `set_damage`
    TrashBin { set_damage: u32 },
    /// +`buff` damage, but hits deal nothing for `cooldown` ticks after a kill
    Nullifier { buff: f32, cooldown: u32 },
    /// Kills bricks at or below `threshold` health outright
    Executioner { threshold: i32 },
    /// Explodes on wall bounces
    WallExplosion {
        damage: u32,
        /// Blast radius in cells
        radius: f32,
        #[serde(default)]
        mini_explodes: bool,
    },
    Sharpened { bonus: f32 },
    ComboBooster { per_combo: f32, max_bonus: f32 },
    /// Scales the damage accumulated so far
    Padded { multiplier: f32 },
    /// Damage grows per brick hit, resets on wall bounce
    Ramp { per_hit: f32, max_bonus: f32 },
    /// Heals on brick kills
    Vampire { heal: f32 },
    /// Heals once per `orbs_per_heal` xp orbs collected
    OrbHarvester { orbs_per_heal: u32, heal: f32 },
    /// Kills arc to the nearest brick in range
    ChainLightning {
        damage: u32,
        /// Reach in cells
        range: f32,
        max_jumps: u32,
    },
    /// Wall bounces redirect toward the nearest brick
    Clingy { cooldown: u32 },
    /// Drops a breadcrumb every `every` wall bounces
    Breadcrumbs { every: u32 },
}

/// Equipment identity, independent of payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EquipmentId {
    TrashBin,
    Nullifier,
    Executioner,
    WallExplosion,
    Sharpened,
    ComboBooster,
    Padded,
    Ramp,
    Vampire,
    OrbHarvester,
    ChainLightning,
    Clingy,
    Breadcrumbs,
}

impl Equipment {
    pub fn id(&self) -> EquipmentId {
        match self {
            Equipment::TrashBin { .. } => EquipmentId::TrashBin,
            Equipment::Nullifier { .. } => EquipmentId::Nullifier,
            Equipment::Executioner { .. } => EquipmentId::Executioner,
            Equipment::WallExplosion { .. } => EquipmentId::WallExplosion,
            Equipment::Sharpened { .. } => EquipmentId::Sharpened,
            Equipment::ComboBooster { .. } => EquipmentId::ComboBooster,
            Equipment::Padded { .. } => EquipmentId::Padded,
            Equipment::Ramp { .. } => EquipmentId::Ramp,
            Equipment::Vampire { .. } => EquipmentId::Vampire,
            Equipment::OrbHarvester { .. } => EquipmentId::OrbHarvester,
            Equipment::ChainLightning { .. } => EquipmentId::ChainLightning,
            Equipment::Clingy { .. } => EquipmentId::Clingy,
            Equipment::Breadcrumbs { .. } => EquipmentId::Breadcrumbs,
        }
    }
}

/// An item in a slot
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EquipmentItem {
    #[serde(flatten)]
    pub effect: Equipment,
    /// Whether mini-balls spawned by the wearer also get this item
    #[serde(default)]
    pub apply_to_mini: bool,
}

impl EquipmentItem {
    pub fn new(effect: Equipment) -> Self {
        Self {
            effect,
            apply_to_mini: false,
        }
    }

    pub fn for_minis(mut self) -> Self {
        self.apply_to_mini = true;
        self
    }

    pub fn id(&self) -> EquipmentId {
        self.effect.id()
    }
}

pub type Slots = [Option<EquipmentItem>; SLOT_COUNT];

/// Whose equipment to look up
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Wielder {
    /// Own kind, or the parent's kind for mini-balls
    pub kind: BallKind,
    /// Own instance, or the parent's instance for mini-balls
    pub instance: Option<InstanceId>,
    pub mini: bool,
    pub ghost: bool,
}

impl Wielder {
    pub fn main(kind: BallKind, instance: Option<InstanceId>) -> Self {
        Self {
            kind,
            instance,
            mini: false,
            ghost: false,
        }
    }

    pub fn mini(parent_kind: BallKind, parent_instance: Option<InstanceId>) -> Self {
        Self {
            kind: parent_kind,
            instance: parent_instance,
            mini: true,
            ghost: false,
        }
    }
}

/// Equipment slot storage
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Loadouts {
    pub by_kind: BTreeMap<BallKind, Slots>,
    pub by_instance: BTreeMap<InstanceId, Slots>,
}

impl Loadouts {
    /// Put an item in a kind-level slot
    pub fn equip_kind(&mut self, kind: BallKind, slot: usize, item: EquipmentItem) {
        if slot < SLOT_COUNT {
            self.by_kind.entry(kind).or_default()[slot] = Some(item);
        }
    }

    /// Put an item in an instance-level slot
    pub fn equip_instance(&mut self, instance: InstanceId, slot: usize, item: EquipmentItem) {
        if slot < SLOT_COUNT {
            self.by_instance.entry(instance).or_default()[slot] = Some(item);
        }
    }

    /// Resolve the active equipment for a wielder, in slot order
    pub fn resolve(&self, wielder: &Wielder) -> ActiveEquipment<'_> {
        if wielder.ghost {
            return ActiveEquipment::empty(wielder.mini);
        }
        let slots = wielder
            .instance
            .and_then(|id| self.by_instance.get(&id))
            .or_else(|| self.by_kind.get(&wielder.kind));
        let items: Vec<&EquipmentItem> = slots
            .map(|s| s.iter().flatten().collect())
            .unwrap_or_default();
        ActiveEquipment {
            items,
            mini: wielder.mini,
        }
    }
}

/// Resolved, ordered equipment list for one wielder
#[derive(Debug, Clone)]
pub struct ActiveEquipment<'a> {
    items: Vec<&'a EquipmentItem>,
    mini: bool,
}

impl<'a> ActiveEquipment<'a> {
    fn empty(mini: bool) -> Self {
        Self {
            items: Vec::new(),
            mini,
        }
    }

    /// Every resolved item, slot order, ignoring mini applicability
    pub fn items(&self) -> &[&'a EquipmentItem] {
        &self.items
    }

    /// Items that apply to this wielder (minis only get `apply_to_mini` items)
    pub fn applicable(&self) -> impl Iterator<Item = &'a Equipment> + '_ {
        self.items
            .iter()
            .filter(|item| !self.mini || item.apply_to_mini)
            .map(|item| &item.effect)
    }

    /// First applicable item with this id
    pub fn find(&self, id: EquipmentId) -> Option<&'a Equipment> {
        self.applicable().find(|e| e.id() == id)
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
