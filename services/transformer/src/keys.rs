use std::borrow::Borrow;
use std::collections::HashMap;
use std::hash::Hash;

/// Surrogate id for the row at `position` (0-based) of a deduplicated table.
pub fn surrogate_id(position: usize) -> u32 {
    // dimension tables never approach u32::MAX rows
    u32::try_from(position + 1).unwrap_or(u32::MAX)
}

/// Deduplicates keys in first-appearance order and hands out dense 1-based ids.
#[derive(Debug, Clone)]
pub struct KeyAssigner<K> {
    ids: HashMap<K, u32>,
    order: Vec<K>,
}

impl<K> Default for KeyAssigner<K> {
    fn default() -> Self {
        Self {
            ids: HashMap::new(),
            order: Vec::new(),
        }
    }
}

impl<K: Eq + Hash + Clone> KeyAssigner<K> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Id of `key`, assigning the next one on first sight.
    pub fn assign(&mut self, key: K) -> u32 {
        if let Some(&id) = self.ids.get(&key) {
            return id;
        }
        let id = surrogate_id(self.order.len());
        self.ids.insert(key.clone(), id);
        self.order.push(key);
        id
    }

    pub fn get<Q>(&self, key: &Q) -> Option<u32>
    where
        K: Borrow<Q>,
        Q: Eq + Hash + ?Sized,
    {
        self.ids.get(key).copied()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Keys paired with their ids, in id order.
    pub fn into_entries(self) -> impl Iterator<Item = (u32, K)> {
        self.order
            .into_iter()
            .enumerate()
            .map(|(position, key)| (surrogate_id(position), key))
    }
}
