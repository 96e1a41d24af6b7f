//! Ordered collections of uniquely named records.
//!
//! [`NamedList`] keeps records in file order next to a name → position map.
//! Records expose their name read-only, so the map can only go stale through
//! the list's own mutation methods, each of which keeps it current.

use std::fmt;
use std::ops::Index;

use crate::{Error, FxHashMap, Result};

mod sealed {
    pub trait NameSlot {
        fn set_name(&mut self, name: String);
    }
}

pub(crate) use sealed::NameSlot;

/// A record identified by a name that must be unique within its collection.
pub trait Named: sealed::NameSlot {
    /// Human readable record kind, used in diagnostics.
    const KIND: &'static str;

    /// The record's name.
    fn name(&self) -> &str;
}

/// Implements [`Named`] for a record with a private `name: String` field.
macro_rules! impl_named {
    ($ty:ty, $kind:literal) => {
        impl $crate::named::Named for $ty {
            const KIND: &'static str = $kind;

            fn name(&self) -> &str {
                &self.name
            }
        }

        impl $crate::named::NameSlot for $ty {
            fn set_name(&mut self, name: String) {
                self.name = name;
            }
        }
    };
}

pub(crate) use impl_named;

/// What is wrong with a record's name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameProblem {
    /// The name is empty.
    Empty,
    /// The name was already used by the record at `first`.
    Duplicate { first: usize },
}

/// One offending record found by [`NamedList::validate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameIssue {
    pub kind: &'static str,
    pub index: usize,
    pub name: String,
    pub problem: NameProblem,
}

impl fmt::Display for NameIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.problem {
            NameProblem::Empty => write!(f, "unnamed {} at index {}", self.kind, self.index),
            NameProblem::Duplicate { first } => write!(
                f,
                "duplicate {} '{}' at index {} (first defined at index {})",
                self.kind, self.name, self.index, first
            ),
        }
    }
}

/// An order-preserving list of [`Named`] records with O(1) name lookup.
#[derive(Clone)]
pub struct NamedList<T> {
    items: Vec<T>,
    positions: FxHashMap<String, usize>,
}

impl<T> Default for NamedList<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            positions: FxHashMap::default(),
        }
    }
}

impl<T: Named + fmt::Debug> fmt::Debug for NamedList<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.items.iter()).finish()
    }
}

impl<T: Named> NamedList<T> {
    /// Create an empty list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a list without checking names.
    ///
    /// Used for records read from disk, which may carry empty or duplicate
    /// names; [`validate`](Self::validate) reports them. Lookups resolve a
    /// duplicated name to its first occurrence.
    pub fn from_unchecked(items: Vec<T>) -> Self {
        let mut list = Self {
            items,
            positions: FxHashMap::default(),
        };
        list.rebuild_positions();
        list
    }

    fn rebuild_positions(&mut self) {
        self.positions.clear();
        self.positions.reserve(self.items.len());
        for (i, item) in self.items.iter().enumerate() {
            if !item.name().is_empty() {
                self.positions.entry(item.name().to_owned()).or_insert(i);
            }
        }
    }

    fn check_new_name(&self, name: &str, ignore: Option<usize>) -> Result<()> {
        if name.is_empty() {
            return Err(Error::EmptyName { kind: T::KIND });
        }
        match self.positions.get(name) {
            Some(&i) if Some(i) != ignore => Err(Error::DuplicateName {
                kind: T::KIND,
                name: name.to_owned(),
            }),
            _ => Ok(()),
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.items.iter()
    }

    /// Mutable iteration. Records cannot be renamed through the returned
    /// references, so the name map stays valid.
    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, T> {
        self.items.iter_mut()
    }

    pub fn as_slice(&self) -> &[T] {
        &self.items
    }

    /// Names in list order.
    pub fn names(&self) -> impl Iterator<Item = &str> + '_ {
        self.items.iter().map(Named::name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.positions.contains_key(name)
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.positions.get(name).copied()
    }

    pub fn get(&self, name: &str) -> Option<&T> {
        self.index_of(name).map(|i| &self.items[i])
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut T> {
        self.index_of(name).map(move |i| &mut self.items[i])
    }

    pub fn at(&self, index: usize) -> Option<&T> {
        self.items.get(index)
    }

    pub fn at_mut(&mut self, index: usize) -> Option<&mut T> {
        self.items.get_mut(index)
    }

    /// Name of the record at `index`, if any.
    pub fn name_at(&self, index: usize) -> Option<&str> {
        self.items.get(index).map(Named::name)
    }

    /// Append a record, returning its position.
    pub fn push(&mut self, item: T) -> Result<usize> {
        self.check_new_name(item.name(), None)?;
        let index = self.items.len();
        self.positions.insert(item.name().to_owned(), index);
        self.items.push(item);
        Ok(index)
    }

    /// Insert a record at `index`, shifting later records.
    pub fn insert(&mut self, index: usize, item: T) -> Result<()> {
        self.check_new_name(item.name(), None)?;
        let index = index.min(self.items.len());
        self.items.insert(index, item);
        self.rebuild_positions();
        Ok(())
    }

    /// Append every record, rejecting the whole batch if any name is bad.
    pub fn extend<I: IntoIterator<Item = T>>(&mut self, items: I) -> Result<()> {
        let items: Vec<T> = items.into_iter().collect();
        let mut seen = FxHashMap::default();
        for item in &items {
            self.check_new_name(item.name(), None)?;
            if seen.insert(item.name(), ()).is_some() {
                return Err(Error::DuplicateName {
                    kind: T::KIND,
                    name: item.name().to_owned(),
                });
            }
        }
        drop(seen);
        for item in items {
            self.positions.insert(item.name().to_owned(), self.items.len());
            self.items.push(item);
        }
        Ok(())
    }

    /// Replace the record at `index`, returning the old one.
    ///
    /// The new record may carry a different name as long as no other record
    /// uses it.
    pub fn replace_at(&mut self, index: usize, item: T) -> Result<T> {
        if index >= self.items.len() {
            return Err(Error::NotFound {
                kind: T::KIND,
                name: format!("#{index}"),
            });
        }
        self.check_new_name(item.name(), Some(index))?;
        let old = std::mem::replace(&mut self.items[index], item);
        if old.name() != self.items[index].name() {
            self.rebuild_positions();
        }
        Ok(old)
    }

    /// Replace the record sharing `item`'s name, keeping its position.
    pub fn replace(&mut self, item: T) -> Result<T> {
        let index = self.index_of(item.name()).ok_or_else(|| Error::NotFound {
            kind: T::KIND,
            name: item.name().to_owned(),
        })?;
        Ok(std::mem::replace(&mut self.items[index], item))
    }

    /// Rename the record at `index`.
    pub fn rename(&mut self, index: usize, name: impl Into<String>) -> Result<()> {
        let name = name.into();
        if index >= self.items.len() {
            return Err(Error::NotFound {
                kind: T::KIND,
                name: format!("#{index}"),
            });
        }
        self.check_new_name(&name, Some(index))?;
        self.items[index].set_name(name);
        self.rebuild_positions();
        Ok(())
    }

    /// Remove and return the record at `index`.
    pub fn remove_at(&mut self, index: usize) -> Option<T> {
        if index >= self.items.len() {
            return None;
        }
        let item = self.items.remove(index);
        self.rebuild_positions();
        Some(item)
    }

    /// Remove and return the record called `name`.
    pub fn remove(&mut self, name: &str) -> Option<T> {
        let index = self.index_of(name)?;
        self.remove_at(index)
    }

    /// Keep only the records matching `keep`.
    pub fn retain(&mut self, keep: impl FnMut(&T) -> bool) {
        let before = self.items.len();
        self.items.retain(keep);
        if self.items.len() != before {
            self.rebuild_positions();
        }
    }

    pub fn clear(&mut self) {
        self.items.clear();
        self.positions.clear();
    }

    /// Report every empty or duplicated name, in list order.
    pub fn validate(&self) -> Vec<NameIssue> {
        let mut first_seen: FxHashMap<&str, usize> = FxHashMap::default();
        let mut issues = Vec::new();
        for (index, item) in self.items.iter().enumerate() {
            let name = item.name();
            if name.is_empty() {
                issues.push(NameIssue {
                    kind: T::KIND,
                    index,
                    name: String::new(),
                    problem: NameProblem::Empty,
                });
                continue;
            }
            match first_seen.get(name) {
                Some(&first) => issues.push(NameIssue {
                    kind: T::KIND,
                    index,
                    name: name.to_owned(),
                    problem: NameProblem::Duplicate { first },
                }),
                None => {
                    first_seen.insert(name, index);
                }
            }
        }
        issues
    }
}

impl<T> Index<usize> for NamedList<T> {
    type Output = T;

    fn index(&self, index: usize) -> &T {
        &self.items[index]
    }
}

impl<'a, T> IntoIterator for &'a NamedList<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Item {
        name: String,
        value: i32,
    }

    impl_named!(Item, "item");

    fn item(name: &str, value: i32) -> Item {
        Item {
            name: name.to_owned(),
            value,
        }
    }

    #[test]
    fn test_push_rejects_empty_and_duplicate() {
        let mut list = NamedList::new();
        list.push(item("a", 1)).unwrap();
        assert!(matches!(list.push(item("", 2)), Err(Error::EmptyName { kind: "item" })));
        assert!(matches!(list.push(item("a", 3)), Err(Error::DuplicateName { .. })));
        assert_eq!(list.len(), 1);
    }

    #[test]
    fn test_lookup_follows_structural_changes() {
        let mut list = NamedList::new();
        list.extend([item("a", 1), item("b", 2), item("c", 3)]).unwrap();
        list.insert(0, item("z", 0)).unwrap();
        assert_eq!(list.index_of("c"), Some(3));

        list.remove("b");
        assert_eq!(list.index_of("c"), Some(2));
        assert_eq!(list.get("b"), None);

        list.retain(|i| i.value != 0);
        assert_eq!(list.index_of("a"), Some(0));

        list.clear();
        assert!(!list.contains("a"));
    }

    #[test]
    fn test_replace_keeps_position() {
        let mut list = NamedList::new();
        list.extend([item("a", 1), item("b", 2)]).unwrap();
        let old = list.replace(item("a", 10)).unwrap();
        assert_eq!(old.value, 1);
        assert_eq!(list.index_of("a"), Some(0));
        assert_eq!(list.get("a").map(|i| i.value), Some(10));
        assert!(list.replace(item("q", 0)).is_err());
    }

    #[test]
    fn test_replace_at_and_rename_check_collisions() {
        let mut list = NamedList::new();
        list.extend([item("a", 1), item("b", 2)]).unwrap();
        assert!(list.replace_at(0, item("b", 5)).is_err());
        list.replace_at(0, item("c", 5)).unwrap();
        assert_eq!(list.index_of("c"), Some(0));
        assert!(!list.contains("a"));

        assert!(list.rename(1, "c").is_err());
        list.rename(1, "d").unwrap();
        assert_eq!(list.names().collect::<Vec<_>>(), ["c", "d"]);
    }

    #[test]
    fn test_extend_is_all_or_nothing() {
        let mut list = NamedList::new();
        list.push(item("a", 1)).unwrap();
        assert!(list.extend([item("b", 2), item("b", 3)]).is_err());
        assert!(list.extend([item("c", 2), item("a", 3)]).is_err());
        assert_eq!(list.len(), 1);
    }

    #[test]
    fn test_unchecked_lists_report_every_issue() {
        let list = NamedList::from_unchecked(vec![
            item("eye", 0),
            item("", 1),
            item("eye", 2),
            item("nose", 3),
        ]);
        assert_eq!(list.index_of("eye"), Some(0));

        let issues = list.validate();
        assert_eq!(issues.len(), 2);
        assert_eq!(issues[0].problem, NameProblem::Empty);
        assert_eq!(issues[0].index, 1);
        assert_eq!(issues[1].problem, NameProblem::Duplicate { first: 0 });
        assert_eq!(issues[1].index, 2);
        assert_eq!(issues[1].to_string(), "duplicate item 'eye' at index 2 (first defined at index 0)");
    }
}
