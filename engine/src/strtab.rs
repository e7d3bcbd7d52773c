// strtab.rs — Byte-string hashing and identifier interning
//
// Every identifier stored in a scope, node or delegate goes through the
// string table so that equal names share one allocation.
//
// Preconditions: none.
// Postconditions: `intern` returns the same `Name` allocation for equal text.
// Failure modes: none.
// Side effects: none.

use std::rc::Rc;

use crate::dict::Dict;

/// Shared, immutable identifier text.
pub type Name = Rc<str>;

const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

/// 64-bit FNV-1a over raw bytes.
pub fn hash_bytes(bytes: &[u8]) -> u64 {
    let mut h = FNV_OFFSET;
    for &b in bytes {
        h ^= u64::from(b);
        h = h.wrapping_mul(FNV_PRIME);
    }
    h
}

/// Duplicate-free identifier table.
#[derive(Debug, Default)]
pub struct StringTable {
    names: Dict<()>,
}

impl StringTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the shared handle for `text`, allocating it on first use.
    pub fn intern(&mut self, text: &str) -> Name {
        if let Some((name, _)) = self.names.get_entry(text) {
            return name.clone();
        }
        let name: Name = Rc::from(text);
        // Cannot collide: the lookup above just missed.
        let _ = self.names.insert(name.clone(), ());
        name
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}
