//! Read-only view of the player's ball inventory
//!
//! The progression system owns these records; the simulation only looks them
//! up. Missing records and kinds always resolve to neutral values.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::tuning::BallKind;

/// Persistent identifier of one owned ball copy
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct InstanceId(pub u64);

/// A stat modifier baked into a ball's inventory record
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Enchantment {
    /// Multiplies damage
    Damage(f32),
    /// Adds max HP
    Health(f32),
    /// Multiplies the area factor (radius scales with its square root)
    Area(f32),
    /// Extra power-up charges
    PowerUpUses(u32),
    /// Multiplies launch speed
    Speed(f32),
}

/// One owned ball
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BallRecord {
    pub kind: BallKind,
    #[serde(default)]
    pub enchantments: Vec<Enchantment>,
}

impl BallRecord {
    pub fn new(kind: BallKind) -> Self {
        Self {
            kind,
            enchantments: Vec::new(),
        }
    }

    pub fn with(mut self, enchantment: Enchantment) -> Self {
        self.enchantments.push(enchantment);
        self
    }

    /// Product of all damage outcomes (1.0 when none)
    pub fn damage_multiplier(&self) -> f32 {
        self.enchantments
            .iter()
            .fold(1.0, |acc, e| match e {
                Enchantment::Damage(m) => acc * m,
                _ => acc,
            })
    }

    pub fn bonus_hp(&self) -> f32 {
        self.enchantments
            .iter()
            .map(|e| match e {
                Enchantment::Health(h) => *h,
                _ => 0.0,
            })
            .sum()
    }

    pub fn area_factor(&self) -> f32 {
        self.enchantments.iter().fold(1.0, |acc, e| match e {
            Enchantment::Area(m) => acc * m,
            _ => acc,
        })
    }

    pub fn bonus_uses(&self) -> u32 {
        self.enchantments
            .iter()
            .map(|e| match e {
                Enchantment::PowerUpUses(n) => *n,
                _ => 0,
            })
            .sum()
    }

    pub fn speed_multiplier(&self) -> f32 {
        self.enchantments.iter().fold(1.0, |acc, e| match e {
            Enchantment::Speed(m) => acc * m,
            _ => acc,
        })
    }
}

/// Additive damage bonuses bought in the shop
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ShopBonuses {
    /// Added to a main ball's base damage, by kind
    pub ball_damage: BTreeMap<BallKind, f32>,
    /// Added to a mini-ball's base damage, by parent kind
    pub mini_damage: BTreeMap<BallKind, f32>,
}

/// Everything the simulation needs from the player's inventory
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Inventory {
    pub records: BTreeMap<InstanceId, BallRecord>,
    /// Damage multiplier for balls spawned without an instance
    pub type_damage_multiplier: BTreeMap<BallKind, f32>,
    pub shop: ShopBonuses,
}

impl Inventory {
    pub fn record(&self, instance: InstanceId) -> Option<&BallRecord> {
        self.records.get(&instance)
    }

    /// Enchantment fold for an instance, or the type-level multiplier
    pub fn damage_multiplier(&self, kind: BallKind, instance: Option<InstanceId>) -> f32 {
        if let Some(record) = instance.and_then(|id| self.records.get(&id)) {
            return record.damage_multiplier();
        }
        self.type_damage_multiplier
            .get(&kind)
            .copied()
            .unwrap_or(1.0)
    }

    pub fn ball_damage_bonus(&self, kind: BallKind) -> f32 {
        self.shop.ball_damage.get(&kind).copied().unwrap_or(0.0)
    }

    pub fn mini_damage_bonus(&self, parent: BallKind) -> f32 {
        self.shop.mini_damage.get(&parent).copied().unwrap_or(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enchantments_fold() {
        let record = BallRecord::new(BallKind::Classic)
            .with(Enchantment::Damage(1.5))
            .with(Enchantment::Health(20.0))
            .with(Enchantment::Damage(2.0))
            .with(Enchantment::Area(4.0))
            .with(Enchantment::PowerUpUses(1))
            .with(Enchantment::PowerUpUses(2));
        assert_eq!(record.damage_multiplier(), 3.0);
        assert_eq!(record.bonus_hp(), 20.0);
        assert_eq!(record.area_factor(), 4.0);
        assert_eq!(record.bonus_uses(), 3);
        assert_eq!(record.speed_multiplier(), 1.0);
    }

    #[test]
    fn test_instance_beats_type_multiplier() {
        let mut inv = Inventory::default();
        inv.type_damage_multiplier.insert(BallKind::Classic, 1.25);
        inv.records.insert(
            InstanceId(7),
            BallRecord::new(BallKind::Classic).with(Enchantment::Damage(2.0)),
        );
        assert_eq!(inv.damage_multiplier(BallKind::Classic, Some(InstanceId(7))), 2.0);
        assert_eq!(inv.damage_multiplier(BallKind::Classic, None), 1.25);
        // Unknown instance falls back to the type multiplier
        assert_eq!(inv.damage_multiplier(BallKind::Classic, Some(InstanceId(99))), 1.25);
        assert_eq!(inv.damage_multiplier(BallKind::Giant, None), 1.0);
    }

    #[test]
    fn test_inventory_json_keys() {
        let mut inv = Inventory::default();
        inv.records.insert(InstanceId(3), BallRecord::new(BallKind::Fire));
        inv.shop.ball_damage.insert(BallKind::Fire, 2.0);
        let json = serde_json::to_string(&inv).unwrap();
        let back: Inventory = serde_json::from_str(&json).unwrap();
        assert_eq!(back.records.get(&InstanceId(3)).map(|r| r.kind), Some(BallKind::Fire));
        assert_eq!(back.ball_damage_bonus(BallKind::Fire), 2.0);
    }
}
