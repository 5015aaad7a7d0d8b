//! In-memory set of [`MappingEntry`] with add/remove/query (`spec.md` §4.6).
//!
//! Edits are rare relative to resolver reads, so reads copy a snapshot
//! vector out from behind a short-held mutex rather than holding the lock
//! for the duration of resolution; this keeps publisher-tick jitter low.

use std::sync::Mutex;

use crate::model::MappingEntry;

#[derive(Default)]
pub struct MappingTable {
    entries: Mutex<Vec<MappingEntry>>,
}

impl MappingTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Upsert by `id`: replaces an existing entry with the same id, or
    /// appends a new one. `spec.md` §9 resolves the add-vs-upsert open
    /// question in favor of upsert.
    pub fn add(&self, entry: MappingEntry) {
        let mut entries = self.entries.lock().expect("mapping table mutex poisoned");
        if let Some(existing) = entries.iter_mut().find(|e| e.id == entry.id) {
            *existing = entry;
        } else {
            entries.push(entry);
        }
    }

    pub fn remove(&self, id: &str) -> bool {
        let mut entries = self.entries.lock().expect("mapping table mutex poisoned");
        let before = entries.len();
        entries.retain(|e| e.id != id);
        entries.len() != before
    }

    /// Copies out the current entry set. Order-independent (persistence
    /// round-trip treats the set as unordered).
    pub fn list(&self) -> Vec<MappingEntry> {
        self.entries.lock().expect("mapping table mutex poisoned").clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Action, AxisId, Device, SignalKey};
    use pretty_assertions::assert_eq;

    fn entry(id: &str, priority: i32) -> MappingEntry {
        MappingEntry {
            id: id.to_string(),
            signal_key: SignalKey::new(Device::Stick, "joy_x"),
            action: Action::Axis(AxisId::LX),
            priority,
            deadband: 0.05,
        }
    }

    #[test]
    fn add_then_list_contains_entry() {
        let table = MappingTable::new();
        table.add(entry("m1", 0));
        assert_eq!(table.list().len(), 1);
    }

    #[test]
    fn add_with_duplicate_id_upserts() {
        let table = MappingTable::new();
        table.add(entry("m1", 0));
        table.add(entry("m1", 42));
        let list = table.list();
        assert_eq!(list.len(), 1);
        assert_eq!(list[0].priority, 42);
    }

    #[test]
    fn remove_deletes_by_id() {
        let table = MappingTable::new();
        table.add(entry("m1", 0));
        table.add(entry("m2", 0));
        assert!(table.remove("m1"));
        assert!(!table.remove("m1"));
        let list = table.list();
        assert_eq!(list.len(), 1);
        assert_eq!(list[0].id, "m2");
    }

    #[test]
    fn save_load_round_trip_is_identity_order_independent() {
        let table = MappingTable::new();
        table.add(entry("a", 1));
        table.add(entry("b", 2));
        let saved = table.list();

        let restored = MappingTable::new();
        for e in saved.iter().rev() {
            restored.add(e.clone());
        }
        let mut a = table.list();
        let mut b = restored.list();
        a.sort_by(|x, y| x.id.cmp(&y.id));
        b.sort_by(|x, y| x.id.cmp(&y.id));
        assert_eq!(a, b);
    }
}
