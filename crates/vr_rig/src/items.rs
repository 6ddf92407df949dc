//! VR-specific behaviours attached to held items.
//!
//! Items are identified by the host's item name. When a peer switches to an
//! item with a registered behaviour, the behaviour is created the first time
//! and re-enabled on every later switch.

use std::collections::HashMap;
use std::fmt;

pub trait ItemBehaviour {
    fn set_enabled(&mut self, enabled: bool);
    fn is_enabled(&self) -> bool;
}

pub type ItemFactory = fn() -> Box<dyn ItemBehaviour>;

/// Host-assigned id of one item instance in the world.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ItemInstanceId(pub u64);

#[derive(Default)]
pub struct ItemRegistry {
    factories: HashMap<String, ItemFactory>,
}

impl ItemRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, item_name: impl Into<String>, factory: ItemFactory) {
        self.factories.insert(item_name.into(), factory);
    }

    pub fn get(&self, item_name: &str) -> Option<ItemFactory> {
        self.factories.get(item_name).copied()
    }

    pub fn len(&self) -> usize {
        self.factories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }
}

impl fmt::Debug for ItemRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.factories.keys()).finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EquipOutcome {
    Created,
    Reenabled,
    /// No behaviour is registered for the item.
    Unsupported,
}

/// Behaviours attached to item instances.
#[derive(Default)]
pub struct ItemBehaviours {
    attached: HashMap<ItemInstanceId, Box<dyn ItemBehaviour>>,
}

impl ItemBehaviours {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn equip(&mut self, instance: ItemInstanceId, item_name: &str, registry: &ItemRegistry) -> EquipOutcome {
        let Some(factory) = registry.get(item_name) else {
            return EquipOutcome::Unsupported;
        };

        match self.attached.get_mut(&instance) {
            Some(behaviour) => {
                behaviour.set_enabled(true);
                EquipOutcome::Reenabled
            }
            None => {
                log::debug!("attaching {item_name} behaviour to item {}", instance.0);
                let mut behaviour = factory();
                behaviour.set_enabled(true);
                self.attached.insert(instance, behaviour);
                EquipOutcome::Created
            }
        }
    }

    /// Disable the behaviour on `instance`, keeping it for the next equip.
    pub fn unequip(&mut self, instance: ItemInstanceId) {
        if let Some(behaviour) = self.attached.get_mut(&instance) {
            behaviour.set_enabled(false);
        }
    }

    pub fn get(&self, instance: ItemInstanceId) -> Option<&dyn ItemBehaviour> {
        self.attached.get(&instance).map(|b| b.as_ref())
    }

    pub fn len(&self) -> usize {
        self.attached.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attached.is_empty()
    }
}

impl fmt::Debug for ItemBehaviours {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ItemBehaviours").field("attached", &self.attached.len()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Shovel {
        enabled: bool,
    }

    impl ItemBehaviour for Shovel {
        fn set_enabled(&mut self, enabled: bool) {
            self.enabled = enabled;
        }

        fn is_enabled(&self) -> bool {
            self.enabled
        }
    }

    fn registry() -> ItemRegistry {
        let mut registry = ItemRegistry::new();
        registry.register("Shovel", || Box::new(Shovel::default()));
        registry
    }

    #[test]
    fn creates_once_then_reenables() {
        let registry = registry();
        let mut behaviours = ItemBehaviours::new();
        let shovel = ItemInstanceId(7);

        assert_eq!(behaviours.equip(shovel, "Shovel", &registry), EquipOutcome::Created);
        assert!(behaviours.get(shovel).unwrap().is_enabled());

        behaviours.unequip(shovel);
        assert!(!behaviours.get(shovel).unwrap().is_enabled());

        assert_eq!(behaviours.equip(shovel, "Shovel", &registry), EquipOutcome::Reenabled);
        assert!(behaviours.get(shovel).unwrap().is_enabled());
        assert_eq!(behaviours.len(), 1);
    }

    #[test]
    fn unknown_items_are_ignored() {
        let registry = registry();
        let mut behaviours = ItemBehaviours::new();
        assert_eq!(behaviours.equip(ItemInstanceId(1), "Flashlight", &registry), EquipOutcome::Unsupported);
        assert!(behaviours.is_empty());
    }

    #[test]
    fn instances_are_independent() {
        let registry = registry();
        let mut behaviours = ItemBehaviours::new();
        behaviours.equip(ItemInstanceId(1), "Shovel", &registry);
        behaviours.equip(ItemInstanceId(2), "Shovel", &registry);
        behaviours.unequip(ItemInstanceId(1));
        assert!(!behaviours.get(ItemInstanceId(1)).unwrap().is_enabled());
        assert!(behaviours.get(ItemInstanceId(2)).unwrap().is_enabled());
    }
}
