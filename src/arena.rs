//! The flattener's per-call key arena and the `FlattenedArray` it backs.
//!
//! A linear bump allocator, sized `8 KiB + 64 * capacity` by default, backs
//! keys no longer than 128 bytes; longer keys fall back to the global
//! allocator. The arena and the pairs it backs share one lifetime and are
//! torn down together. `bumpalo::Bump` allocates raw byte spans rather than
//! a single homogeneous `T`, which is what this arena needs since keys are
//! variable-length strings.

use bumpalo::Bump;
use serde_json::Value;

/// Keys at or under this length are carved out of the arena; longer keys
/// are heap `String`s.
pub const SMALL_KEY_THRESHOLD: usize = 128;

/// Default bytes reserved up front, before accounting for per-pair
/// overhead.
pub const ARENA_BASE_BYTES: usize = 8 * 1024;

/// Owns either an arena-backed key (borrowed from the `Bump`) or a
/// heap-allocated one, so callers never need to know which case applies.
enum KeyStorage<'a> {
    Arena(&'a str),
    Heap(String),
}

impl<'a> KeyStorage<'a> {
    fn as_str(&self) -> &str {
        match self {
            KeyStorage::Arena(s) => s,
            KeyStorage::Heap(s) => s.as_str(),
        }
    }
}

/// A single flattened `(path, leaf value)` pair.
pub struct FlatPair<'a> {
    key: KeyStorage<'a>,
    pub value: Value,
}

impl<'a> FlatPair<'a> {
    pub fn key(&self) -> &str {
        self.key.as_str()
    }
}

/// Growable collection of flattened pairs plus the arena backing their
/// short keys. Growth factor 1.5, initial capacity 64.
pub struct FlattenedArray<'a> {
    arena: &'a Bump,
    pairs: Vec<FlatPair<'a>>,
}

const INITIAL_CAPACITY: usize = 64;
const GROWTH_FACTOR: f64 = 1.5;

impl<'a> FlattenedArray<'a> {
    pub fn new(arena: &'a Bump) -> Self {
        FlattenedArray {
            arena,
            pairs: Vec::with_capacity(INITIAL_CAPACITY),
        }
    }

    /// Appends `(path, value)`, copying `path` into the arena when it is
    /// short enough, onto the heap otherwise. Growth beyond `pairs`'
    /// current capacity follows the 1.5x factor above rather than `Vec`'s
    /// default doubling, by reserving explicitly before it would otherwise
    /// reallocate.
    pub fn push(&mut self, path: &str, value: Value) {
        if self.pairs.len() == self.pairs.capacity() {
            let grown = ((self.pairs.capacity() as f64) * GROWTH_FACTOR).ceil() as usize;
            self.pairs.reserve(grown.saturating_sub(self.pairs.len()));
        }
        let key = if path.len() <= SMALL_KEY_THRESHOLD {
            KeyStorage::Arena(self.arena.alloc_str(path))
        } else {
            KeyStorage::Heap(path.to_owned())
        };
        self.pairs.push(FlatPair { key, value });
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &FlatPair<'a>> {
        self.pairs.iter()
    }

    /// Consumes the array, assembling a flat JSON object that preserves
    /// the order of first insertion. Duplicate keys cannot arise from a
    /// tree with unique sibling keys, but if the host DOM permitted
    /// duplicates, `serde_json::Map::insert` keeps last-wins semantics,
    /// matching this crate's general duplicate-key policy.
    pub fn into_object(self) -> Value {
        let mut map = serde_json::Map::with_capacity(self.pairs.len());
        for pair in self.pairs {
            map.insert(pair.key.as_str().to_owned(), pair.value);
        }
        Value::Object(map)
    }
}

/// Reserves an arena sized per the `8 KiB + 64 * capacity` formula above.
pub fn sized_arena(capacity: usize) -> Bump {
    Bump::with_capacity(ARENA_BASE_BYTES + 64 * capacity)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_keys_round_trip() {
        let arena = sized_arena(INITIAL_CAPACITY);
        let mut arr = FlattenedArray::new(&arena);
        arr.push("a.b.c", Value::from(1));
        assert_eq!(arr.len(), 1);
        assert_eq!(arr.iter().next().unwrap().key(), "a.b.c");
    }

    #[test]
    fn long_keys_fall_back_to_heap() {
        let arena = sized_arena(INITIAL_CAPACITY);
        let mut arr = FlattenedArray::new(&arena);
        let long_key = "a".repeat(SMALL_KEY_THRESHOLD + 1);
        arr.push(&long_key, Value::Null);
        assert_eq!(arr.iter().next().unwrap().key(), long_key);
    }

    #[test]
    fn into_object_preserves_insertion_order() {
        let arena = sized_arena(INITIAL_CAPACITY);
        let mut arr = FlattenedArray::new(&arena);
        arr.push("z", Value::from(1));
        arr.push("a", Value::from(2));
        let obj = arr.into_object();
        let keys: Vec<_> = obj.as_object().unwrap().keys().collect();
        assert_eq!(keys, vec!["z", "a"]);
    }
}
