// dict.rs — Open-addressing string-keyed dictionary
//
// Linear probing from `hash(key) mod capacity`, lazy deletion through
// tombstones. Backs every scope namespace and the string table.
//
// Invariants:
//   - live entries never exceed half the capacity after an insert returns;
//   - a tombstone is never confused with an empty slot during lookup;
//   - an insert whose probe wraps the whole table without meeting an empty
//     slot rehashes in place first, dropping every tombstone.
//
// Iteration order is slot order, not insertion order.

use std::fmt;

use crate::strtab::{hash_bytes, Name};

const MIN_CAPACITY: usize = 8;

enum Slot<V> {
    Empty,
    Tombstone,
    Full(Name, V),
}

/// Outcome of probing for a key.
enum Probe {
    Found(usize),
    Missing { wrapped: bool },
}

/// String-keyed map with open addressing.
pub struct Dict<V> {
    slots: Vec<Slot<V>>,
    live: usize,
    tombstones: usize,
}

impl<V> Default for Dict<V> {
    fn default() -> Self {
        Self {
            slots: Vec::new(),
            live: 0,
            tombstones: 0,
        }
    }
}

impl<V: fmt::Debug> fmt::Debug for Dict<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl<V> Dict<V> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.live
    }

    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    /// Number of slots in the table (live, tombstoned and empty).
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Number of tombstoned slots awaiting reuse or rehash.
    pub fn tombstones(&self) -> usize {
        self.tombstones
    }

    /// Insert a new key. Fails, handing the value back, if the key exists.
    pub fn insert(&mut self, key: Name, value: V) -> Result<(), V> {
        match self.probe(&key) {
            Probe::Found(_) => return Err(value),
            Probe::Missing { wrapped: true } => {
                let cap = self.slots.len();
                self.rebuild(cap);
            }
            Probe::Missing { wrapped: false } => {}
        }

        if (self.live + 1) * 2 > self.slots.len() {
            let cap = (self.slots.len() * 2).max(MIN_CAPACITY);
            self.rebuild(cap);
        }

        let index = self.free_slot(&key);
        if matches!(self.slots[index], Slot::Tombstone) {
            self.tombstones -= 1;
        }
        self.slots[index] = Slot::Full(key, value);
        self.live += 1;
        Ok(())
    }

    pub fn get(&self, key: &str) -> Option<&V> {
        self.get_entry(key).map(|(_, v)| v)
    }

    /// Look up a key, returning the stored key handle alongside the value.
    pub fn get_entry(&self, key: &str) -> Option<(&Name, &V)> {
        match self.probe(key) {
            Probe::Found(i) => match &self.slots[i] {
                Slot::Full(k, v) => Some((k, v)),
                _ => None,
            },
            Probe::Missing { .. } => None,
        }
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut V> {
        match self.probe(key) {
            Probe::Found(i) => match &mut self.slots[i] {
                Slot::Full(_, v) => Some(v),
                _ => None,
            },
            Probe::Missing { .. } => None,
        }
    }

    pub fn contains_key(&self, key: &str) -> bool {
        matches!(self.probe(key), Probe::Found(_))
    }

    /// Remove a key, leaving a tombstone in its slot.
    pub fn remove(&mut self, key: &str) -> Option<V> {
        let Probe::Found(i) = self.probe(key) else {
            return None;
        };
        match std::mem::replace(&mut self.slots[i], Slot::Tombstone) {
            Slot::Full(_, v) => {
                self.live -= 1;
                self.tombstones += 1;
                Some(v)
            }
            other => {
                self.slots[i] = other;
                None
            }
        }
    }

    /// Entries in slot order.
    pub fn iter(&self) -> impl Iterator<Item = (&Name, &V)> {
        self.slots.iter().filter_map(|slot| match slot {
            Slot::Full(k, v) => Some((k, v)),
            _ => None,
        })
    }

    pub fn values(&self) -> impl Iterator<Item = &V> {
        self.iter().map(|(_, v)| v)
    }

    /// Remove every entry, returning them in slot order.
    pub fn drain(&mut self) -> Vec<(Name, V)> {
        let slots = std::mem::take(&mut self.slots);
        self.live = 0;
        self.tombstones = 0;
        slots
            .into_iter()
            .filter_map(|slot| match slot {
                Slot::Full(k, v) => Some((k, v)),
                _ => None,
            })
            .collect()
    }

    // ── Probing ──

    fn home(&self, key: &str) -> usize {
        (hash_bytes(key.as_bytes()) % self.slots.len() as u64) as usize
    }

    fn probe(&self, key: &str) -> Probe {
        let cap = self.slots.len();
        if cap == 0 {
            return Probe::Missing { wrapped: false };
        }
        let mut i = self.home(key);
        for _ in 0..cap {
            match &self.slots[i] {
                Slot::Empty => return Probe::Missing { wrapped: false },
                Slot::Full(k, _) if &**k == key => return Probe::Found(i),
                Slot::Full(..) | Slot::Tombstone => {}
            }
            i = (i + 1) % cap;
        }
        Probe::Missing { wrapped: true }
    }

    /// First empty or tombstoned slot on the probe path of `key`.
    ///
    /// Callers guarantee the load factor, so such a slot always exists.
    fn free_slot(&self, key: &str) -> usize {
        let cap = self.slots.len();
        let mut i = self.home(key);
        while let Slot::Full(..) = self.slots[i] {
            i = (i + 1) % cap;
        }
        i
    }

    /// Re-insert every live entry into a fresh table of `capacity` slots.
    fn rebuild(&mut self, capacity: usize) {
        let old = std::mem::take(&mut self.slots);
        self.slots = (0..capacity).map(|_| Slot::Empty).collect();
        self.tombstones = 0;
        for slot in old {
            if let Slot::Full(k, v) = slot {
                let i = self.free_slot(&k);
                self.slots[i] = Slot::Full(k, v);
            }
        }
    }
}
