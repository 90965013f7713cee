//! Computed table for binary operations.
//!
//! Results of [`apply`][crate::xadd::Xadd::apply] are memoized across calls,
//! keyed by the operator and the operand handles. Operands of commutative
//! operators are stored in sorted order so that `f + g` and `g + f` share an
//! entry.

use std::collections::HashMap;
use std::hash::Hash;

use crate::apply::Op;
use crate::reference::NodeId;

/// Key of a memoized binary operation.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct OpKey {
    pub op: Op,
    pub f: NodeId,
    pub g: NodeId,
}

impl OpKey {
    pub fn new(op: Op, f: NodeId, g: NodeId) -> Self {
        if op.is_commutative() && g < f {
            Self { op, f: g, g: f }
        } else {
            Self { op, f, g }
        }
    }
}

/// A memo table backed by [HashMap] that counts hits and misses.
pub struct Cache<K, V> {
    map: HashMap<K, V>,
    hits: usize,
    misses: usize,
}

impl<K, V> Cache<K, V> {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            map: HashMap::with_capacity(capacity),
            hits: 0,
            misses: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn hits(&self) -> usize {
        self.hits
    }

    pub fn misses(&self) -> usize {
        self.misses
    }

    /// Drop all entries. Counters are kept.
    pub fn clear(&mut self) {
        self.map.clear();
    }
}

impl<K, V> Default for Cache<K, V> {
    fn default() -> Self {
        Self::with_capacity(0)
    }
}

impl<K, V> Cache<K, V>
where
    K: Hash + Eq,
    V: Copy,
{
    pub fn get(&mut self, key: &K) -> Option<V> {
        match self.map.get(key) {
            Some(&v) => {
                self.hits += 1;
                Some(v)
            }
            None => {
                self.misses += 1;
                None
            }
        }
    }

    pub fn insert(&mut self, key: K, value: V) {
        self.map.insert(key, value);
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;

    #[test]
    fn test_commutative_key() {
        let a = NodeId::new(5);
        let b = NodeId::new(9);
        assert_eq!(OpKey::new(Op::Sum, a, b), OpKey::new(Op::Sum, b, a));
        assert_eq!(OpKey::new(Op::Max, a, b), OpKey::new(Op::Max, b, a));
        assert_ne!(OpKey::new(Op::Difference, a, b), OpKey::new(Op::Difference, b, a));
    }

    #[test]
    fn test_hits_and_misses() {
        let mut cache = Cache::with_capacity(4);
        let key = OpKey::new(Op::Product, NodeId::new(2), NodeId::new(3));
        assert_eq!(cache.get(&key), None);
        cache.insert(key, NodeId::new(4));
        assert_eq!(cache.get(&key), Some(NodeId::new(4)));
        assert_eq!(cache.hits(), 1);
        assert_eq!(cache.misses(), 1);

        cache.clear();
        assert!(cache.is_empty());
        assert_eq!(cache.get(&key), None);
    }
}
