use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::WorldError;

/// Carry capacity granted per point of might.
const CARRY_WEIGHT_PER_MIGHT: f64 = 5.0;

/// The fixed equipment slot set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EquipSlot {
    MainHand,
    OffHand,
    Head,
    Chest,
    Legs,
    Feet,
    Neck,
    Ring1,
    Ring2,
}

impl EquipSlot {
    pub const ALL: [EquipSlot; 9] = [
        EquipSlot::MainHand,
        EquipSlot::OffHand,
        EquipSlot::Head,
        EquipSlot::Chest,
        EquipSlot::Legs,
        EquipSlot::Feet,
        EquipSlot::Neck,
        EquipSlot::Ring1,
        EquipSlot::Ring2,
    ];
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub id: u64,
    pub name: String,
    /// Weight in kilograms.
    pub weight: f64,
    /// The slot this item can occupy, if equippable at all.
    pub slot: Option<EquipSlot>,
}

/// A weight-limited item container.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Inventory {
    items: HashMap<u64, Item>,
    pub current_weight: f64,
    pub max_carry_weight: f64,
}

impl Inventory {
    /// Capacity scales with the owner's might: 5 kg per point.
    pub fn for_might(might: f64) -> Self {
        Self {
            items: HashMap::new(),
            current_weight: 0.0,
            max_carry_weight: might.max(0.0) * CARRY_WEIGHT_PER_MIGHT,
        }
    }

    /// Add an item. Fails without mutating anything when the item would
    /// push the total over the carry limit or the ID is already present.
    pub fn add_item(&mut self, item: Item) -> Result<(), WorldError> {
        if self.items.contains_key(&item.id) {
            return Err(WorldError::invariant(format!(
                "item {} already in inventory",
                item.id
            )));
        }
        if self.current_weight + item.weight > self.max_carry_weight {
            return Err(WorldError::invariant(format!(
                "item '{}' ({} kg) exceeds carry weight limit ({:.1}/{:.1} kg)",
                item.name, item.weight, self.current_weight, self.max_carry_weight
            )));
        }
        self.current_weight += item.weight;
        self.items.insert(item.id, item);
        Ok(())
    }

    pub fn remove_item(&mut self, id: u64) -> Result<Item, WorldError> {
        let item = self
            .items
            .remove(&id)
            .ok_or_else(|| WorldError::invariant(format!("item {} not in inventory", id)))?;
        self.current_weight = (self.current_weight - item.weight).max(0.0);
        Ok(item)
    }

    pub fn get(&self, id: u64) -> Option<&Item> {
        self.items.get(&id)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Worn equipment: one item per slot, items stay in the inventory.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Equipment {
    slots: HashMap<EquipSlot, u64>,
}

impl Equipment {
    pub fn new() -> Self {
        Self::default()
    }

    /// Equip an inventory item into its designated slot. Fails without
    /// mutation when the item is absent, not equippable, or aimed at a
    /// slot it does not fit.
    pub fn equip(
        &mut self,
        inventory: &Inventory,
        item_id: u64,
        slot: EquipSlot,
    ) -> Result<Option<u64>, WorldError> {
        let item = inventory
            .get(item_id)
            .ok_or_else(|| WorldError::invariant(format!("item {} not in inventory", item_id)))?;
        match item.slot {
            Some(expected) if expected == slot => {}
            Some(expected) => {
                return Err(WorldError::invariant(format!(
                    "item '{}' fits {:?}, not {:?}",
                    item.name, expected, slot
                )));
            }
            None => {
                return Err(WorldError::invariant(format!(
                    "item '{}' is not equippable",
                    item.name
                )));
            }
        }
        Ok(self.slots.insert(slot, item_id))
    }

    pub fn unequip(&mut self, slot: EquipSlot) -> Option<u64> {
        self.slots.remove(&slot)
    }

    pub fn equipped(&self, slot: EquipSlot) -> Option<u64> {
        self.slots.get(&slot).copied()
    }
}
