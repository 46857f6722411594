// Ordered, name-indexed collection used for descriptor lists and field trees.

use std::collections::HashMap;
use std::sync::Arc;

/// Anything stored in an OrderedMap is keyed by its own name.
pub trait Named {
    fn name(&self) -> &str;
}

impl<T: Named + ?Sized> Named for Arc<T> {
    fn name(&self) -> &str {
        (**self).name()
    }
}

/// Where an insert landed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slot {
    /// A new entry at the end.
    Appended(usize),
    /// An existing entry with the same name, overwritten at its position.
    Replaced(usize),
}

/// Insertion-ordered values with a name-to-index map.
#[derive(Debug, Clone)]
pub struct OrderedMap<V> {
    entries: Vec<V>,
    index: HashMap<String, usize>,
}

impl<V> Default for OrderedMap<V> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            index: HashMap::new(),
        }
    }
}

impl<V: Named> OrderedMap<V> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `value`, or overwrites the entry with the same name in place.
    pub fn insert_or_replace(&mut self, value: V) -> Slot {
        if let Some(&position) = self.index.get(value.name()) {
            self.entries[position] = value;
            Slot::Replaced(position)
        } else {
            let position = self.entries.len();
            self.index.insert(value.name().to_string(), position);
            self.entries.push(value);
            Slot::Appended(position)
        }
    }

    pub fn get(&self, name: &str) -> Option<&V> {
        self.index.get(name).map(|&i| &self.entries[i])
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut V> {
        match self.index.get(name) {
            Some(&i) => Some(&mut self.entries[i]),
            None => None,
        }
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(Named::name)
    }
}

impl<V> OrderedMap<V> {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, V> {
        self.entries.iter()
    }

    pub fn as_slice(&self) -> &[V] {
        &self.entries
    }

    /// Mutable view of the entries in order. Entry names must not change
    /// through this view.
    pub fn as_mut_slice(&mut self) -> &mut [V] {
        &mut self.entries
    }
}

impl<'a, V> IntoIterator for &'a OrderedMap<V> {
    type Item = &'a V;
    type IntoIter = std::slice::Iter<'a, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Entry(&'static str, u32);

    impl Named for Entry {
        fn name(&self) -> &str {
            self.0
        }
    }

    #[test]
    fn test_replace_keeps_position() {
        let mut map = OrderedMap::new();
        assert_eq!(map.insert_or_replace(Entry("a", 1)), Slot::Appended(0));
        assert_eq!(map.insert_or_replace(Entry("b", 2)), Slot::Appended(1));
        assert_eq!(map.insert_or_replace(Entry("c", 3)), Slot::Appended(2));
        assert_eq!(map.insert_or_replace(Entry("b", 20)), Slot::Replaced(1));

        assert_eq!(map.names().collect::<Vec<_>>(), vec!["a", "b", "c"]);
        assert_eq!(map.get("b"), Some(&Entry("b", 20)));
        assert_eq!(map.len(), 3);
    }

    #[test]
    fn test_lookup() {
        let mut map = OrderedMap::new();
        map.insert_or_replace(Entry("x", 7));
        assert_eq!(map.position("x"), Some(0));
        assert!(map.contains("x"));
        assert!(map.get("y").is_none());
        map.get_mut("x").unwrap().1 = 8;
        assert_eq!(map.as_slice(), &[Entry("x", 8)]);
    }
}
