//! Damage pipeline: base stats + enchantments + equipment + transient buffs
//!
//! One call per ball/brick interaction. Steps run in a fixed order and the
//! override checks at the top short-circuit everything below them.

use super::equipment::{ActiveEquipment, Equipment, EquipmentId, Loadouts, Wielder};
use super::inventory::Inventory;
use crate::tuning::Tuning;

/// Read-only lookups the damage pipeline and reactions need
#[derive(Debug, Clone, Copy)]
pub struct Arsenal<'a> {
    pub tuning: &'a Tuning,
    pub loadouts: &'a Loadouts,
    pub inventory: &'a Inventory,
}

impl<'a> Arsenal<'a> {
    pub fn equipment(&self, wielder: &Wielder) -> ActiveEquipment<'a> {
        self.loadouts.resolve(wielder)
    }
}

/// Per-strike inputs captured from the striking entity
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StrikeProfile {
    pub wielder: Wielder,
    /// Accumulated power-up stacking buff (main balls only)
    pub power_up_buff: f32,
    /// Ramp accumulator
    pub ramp: f32,
    /// Burning damage-over-time stack, already converted to damage
    pub burn: f32,
    /// Nullifier cooldown is running
    pub nullified: bool,
}

impl StrikeProfile {
    pub fn plain(wielder: Wielder) -> Self {
        Self {
            wielder,
            power_up_buff: 0.0,
            ramp: 0.0,
            burn: 0.0,
            nullified: false,
        }
    }
}

/// Final integer damage for one hit.
///
/// Always at least 1, except while an applicable nullifier is cooling down,
/// which returns 0.
pub fn compute_damage(profile: &StrikeProfile, arsenal: &Arsenal, combo: u32) -> u32 {
    let wielder = &profile.wielder;
    let equipment = arsenal.equipment(wielder);

    // Overrides
    if let Some(Equipment::TrashBin { set_damage }) = equipment.find(EquipmentId::TrashBin) {
        return (*set_damage).max(1);
    }
    if profile.nullified && equipment.find(EquipmentId::Nullifier).is_some() {
        return 0;
    }

    let multiplier = arsenal
        .inventory
        .damage_multiplier(wielder.kind, wielder.instance);

    let base = if wielder.mini {
        arsenal.tuning.mini_base_damage + arsenal.inventory.mini_damage_bonus(wielder.kind)
    } else {
        arsenal.tuning.base_damage(wielder.kind)
            + arsenal.inventory.ball_damage_bonus(wielder.kind)
            + profile.power_up_buff
    };

    let mut damage = base * multiplier;

    // Slot order matters: multiplicative items scale whatever has accumulated so far
    for effect in equipment.applicable() {
        match *effect {
            Equipment::Sharpened { bonus } => damage += bonus,
            Equipment::ComboBooster {
                per_combo,
                max_bonus,
            } => damage += (combo as f32 * per_combo).min(max_bonus),
            Equipment::Padded { multiplier } => damage *= multiplier,
            Equipment::Nullifier { buff, .. } => damage += buff,
            _ => {}
        }
    }

    damage += profile.ramp + profile.burn;

    let damage = damage.floor();
    if damage.is_finite() && damage >= 1.0 {
        damage as u32
    } else {
        1
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::equipment::EquipmentItem;
    use crate::sim::inventory::{BallRecord, Enchantment, InstanceId};
    use crate::tuning::BallKind;
    use proptest::prelude::*;

    struct Fixture {
        tuning: Tuning,
        loadouts: Loadouts,
        inventory: Inventory,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                tuning: Tuning::default(),
                loadouts: Loadouts::default(),
                inventory: Inventory::default(),
            }
        }

        fn arsenal(&self) -> Arsenal<'_> {
            Arsenal {
                tuning: &self.tuning,
                loadouts: &self.loadouts,
                inventory: &self.inventory,
            }
        }
    }

    fn classic() -> StrikeProfile {
        StrikeProfile::plain(Wielder::main(BallKind::Classic, None))
    }

    #[test]
    fn test_classic_base_damage() {
        let fx = Fixture::new();
        assert_eq!(compute_damage(&classic(), &fx.arsenal(), 0), 10);
    }

    #[test]
    fn test_trash_bin_overrides_everything() {
        let mut fx = Fixture::new();
        fx.loadouts.equip_kind(
            BallKind::Strong,
            1,
            EquipmentItem::new(Equipment::TrashBin { set_damage: 5 }),
        );
        fx.loadouts
            .equip_kind(BallKind::Strong, 0, EquipmentItem::new(Equipment::Sharpened { bonus: 50.0 }));
        fx.inventory.records.insert(
            InstanceId(1),
            BallRecord::new(BallKind::Strong).with(Enchantment::Damage(4.0)),
        );
        let mut profile = StrikeProfile::plain(Wielder::main(BallKind::Strong, Some(InstanceId(1))));
        profile.power_up_buff = 30.0;
        profile.burn = 9.0;
        for combo in [0, 5, 500] {
            assert_eq!(compute_damage(&profile, &fx.arsenal(), combo), 5);
        }
        profile.wielder.instance = None;
        assert_eq!(compute_damage(&profile, &fx.arsenal(), 3), 5);
    }

    #[test]
    fn test_trash_bin_needs_apply_to_mini_for_minis() {
        let mut fx = Fixture::new();
        fx.loadouts.equip_kind(
            BallKind::Split,
            0,
            EquipmentItem::new(Equipment::TrashBin { set_damage: 50 }),
        );
        let mini = StrikeProfile::plain(Wielder::mini(BallKind::Split, None));
        assert_eq!(compute_damage(&mini, &fx.arsenal(), 0), 4);

        fx.loadouts.equip_kind(
            BallKind::Split,
            0,
            EquipmentItem::new(Equipment::TrashBin { set_damage: 50 }).for_minis(),
        );
        assert_eq!(compute_damage(&mini, &fx.arsenal(), 0), 50);
    }

    #[test]
    fn test_nullifier_active_and_inactive() {
        let mut fx = Fixture::new();
        fx.loadouts.equip_kind(
            BallKind::Classic,
            0,
            EquipmentItem::new(Equipment::Nullifier {
                buff: 6.0,
                cooldown: 30,
            }),
        );
        let mut profile = classic();
        assert_eq!(compute_damage(&profile, &fx.arsenal(), 0), 16);
        profile.nullified = true;
        assert_eq!(compute_damage(&profile, &fx.arsenal(), 0), 0);
    }

    #[test]
    fn test_enchantment_multiplies_base_before_equipment() {
        let mut fx = Fixture::new();
        fx.inventory.records.insert(
            InstanceId(2),
            BallRecord::new(BallKind::Classic).with(Enchantment::Damage(1.5)),
        );
        fx.inventory.shop.ball_damage.insert(BallKind::Classic, 2.0);
        fx.loadouts.equip_instance(
            InstanceId(2),
            0,
            EquipmentItem::new(Equipment::Sharpened { bonus: 3.0 }),
        );
        let mut profile = StrikeProfile::plain(Wielder::main(BallKind::Classic, Some(InstanceId(2))));
        profile.power_up_buff = 4.0;
        // (10 + 2 + 4) * 1.5 + 3
        assert_eq!(compute_damage(&profile, &fx.arsenal(), 0), 27);
    }

    #[test]
    fn test_padded_applies_to_running_total_by_slot() {
        let mut fx = Fixture::new();
        fx.loadouts
            .equip_kind(BallKind::Classic, 0, EquipmentItem::new(Equipment::Sharpened { bonus: 10.0 }));
        fx.loadouts
            .equip_kind(BallKind::Classic, 1, EquipmentItem::new(Equipment::Padded { multiplier: 0.5 }));
        fx.loadouts
            .equip_kind(BallKind::Classic, 2, EquipmentItem::new(Equipment::Sharpened { bonus: 10.0 }));
        // ((10 + 10) * 0.5) + 10
        assert_eq!(compute_damage(&classic(), &fx.arsenal(), 0), 20);

        fx.loadouts
            .equip_kind(BallKind::Classic, 0, EquipmentItem::new(Equipment::Padded { multiplier: 0.5 }));
        fx.loadouts
            .equip_kind(BallKind::Classic, 1, EquipmentItem::new(Equipment::Sharpened { bonus: 10.0 }));
        // (10 * 0.5) + 10 + 10
        assert_eq!(compute_damage(&classic(), &fx.arsenal(), 0), 25);
    }

    #[test]
    fn test_combo_booster_caps() {
        let mut fx = Fixture::new();
        fx.loadouts.equip_kind(
            BallKind::Classic,
            0,
            EquipmentItem::new(Equipment::ComboBooster {
                per_combo: 0.5,
                max_bonus: 5.0,
            }),
        );
        assert_eq!(compute_damage(&classic(), &fx.arsenal(), 4), 12);
        assert_eq!(compute_damage(&classic(), &fx.arsenal(), 100), 15);
    }

    #[test]
    fn test_ramp_and_burn_added_last_then_floored() {
        let fx = Fixture::new();
        let mut profile = classic();
        profile.ramp = 2.5;
        profile.burn = 1.9;
        assert_eq!(compute_damage(&profile, &fx.arsenal(), 0), 14);
    }

    #[test]
    fn test_mini_base_with_shop_bonus() {
        let mut fx = Fixture::new();
        fx.inventory.shop.mini_damage.insert(BallKind::Cell, 3.0);
        fx.inventory.type_damage_multiplier.insert(BallKind::Cell, 2.0);
        let mini = StrikeProfile::plain(Wielder::mini(BallKind::Cell, None));
        assert_eq!(compute_damage(&mini, &fx.arsenal(), 0), 14);
    }

    #[test]
    fn test_missing_kind_uses_default_base() {
        let mut fx = Fixture::new();
        fx.tuning.balls.clear();
        let profile = StrikeProfile::plain(Wielder::main(BallKind::Doom, None));
        assert_eq!(compute_damage(&profile, &fx.arsenal(), 0), 10);
    }

    fn any_item() -> impl Strategy<Value = Option<EquipmentItem>> {
        let effect = prop_oneof![
            (0.0f32..20.0).prop_map(|bonus| Equipment::Sharpened { bonus }),
            (-1.0f32..1.0).prop_map(|multiplier| Equipment::Padded { multiplier }),
            (0.0f32..2.0, 0.0f32..30.0)
                .prop_map(|(per_combo, max_bonus)| Equipment::ComboBooster { per_combo, max_bonus }),
            (0.0f32..10.0).prop_map(|buff| Equipment::Nullifier { buff, cooldown: 10 }),
            (0u32..40).prop_map(|set_damage| Equipment::TrashBin { set_damage }),
        ];
        proptest::option::of((effect, any::<bool>()).prop_map(|(effect, apply_to_mini)| {
            EquipmentItem { effect, apply_to_mini }
        }))
    }

    proptest! {
        #[test]
        fn prop_damage_is_at_least_one(
            items in proptest::collection::vec(any_item(), 3),
            kind_idx in 0usize..BallKind::ALL.len(),
            mini in any::<bool>(),
            buff in 0.0f32..50.0,
            ramp in 0.0f32..20.0,
            burn in 0.0f32..10.0,
            enchant in -2.0f32..3.0,
            combo in 0u32..200,
        ) {
            let kind = BallKind::ALL[kind_idx];
            let mut fx = Fixture::new();
            for (slot, item) in items.into_iter().enumerate() {
                if let Some(item) = item {
                    fx.loadouts.equip_kind(kind, slot, item);
                }
            }
            fx.inventory.type_damage_multiplier.insert(kind, enchant);
            let wielder = if mini { Wielder::mini(kind, None) } else { Wielder::main(kind, None) };
            let profile = StrikeProfile { wielder, power_up_buff: buff, ramp, burn, nullified: false };
            prop_assert!(compute_damage(&profile, &fx.arsenal(), combo) >= 1);
        }
    }
}
