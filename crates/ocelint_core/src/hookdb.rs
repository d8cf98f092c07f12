//! The shared hook database.
//!
//! Hooks from different plugins cooperate through a blackboard of
//! typed slots keyed by string. A slot is created on first access and
//! lives for the duration of one inspection; nothing leaks across
//! source units because every [`crate::Inspector`] starts with a fresh
//! database.

use std::any::Any;
use std::collections::HashMap;

/// Per-inspection scratch space shared between hooks.
#[derive(Default)]
pub struct HookDb {
    slots: HashMap<&'static str, Box<dyn Any + Send>>,
}

impl HookDb {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mutable access to a slot, created with `T::default()` on first
    /// use. Panics if two hooks disagree on the type behind a key,
    /// which is a bug in the plugins, not in the input.
    pub fn slot_mut<T: Default + Send + 'static>(&mut self, key: &'static str) -> &mut T {
        self.slots
            .entry(key)
            .or_insert_with(|| Box::new(T::default()))
            .downcast_mut::<T>()
            .unwrap_or_else(|| panic!("hook db slot `{key}` holds another type"))
    }

    /// Read-only access to a slot, if it was ever written.
    pub fn slot<T: Send + 'static>(&self, key: &str) -> Option<&T> {
        self.slots.get(key).and_then(|slot| slot.downcast_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn slots_default_and_persist() {
        let mut db = HookDb::new();
        assert_eq!(db.slot::<Vec<String>>("seen"), None);

        db.slot_mut::<Vec<String>>("seen").push("Error".into());
        db.slot_mut::<Vec<String>>("seen").push("TypeError".into());
        assert_eq!(db.slot::<Vec<String>>("seen").map(Vec::len), Some(2));
    }

    #[test]
    fn slots_are_independent() {
        let mut db = HookDb::new();
        *db.slot_mut::<usize>("depth") += 3;
        db.slot_mut::<Vec<usize>>("stack").push(1);
        assert_eq!(db.slot::<usize>("depth"), Some(&3));
        assert_eq!(db.slot::<Vec<usize>>("stack"), Some(&vec![1]));
    }
}
