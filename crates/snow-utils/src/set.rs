//! An insertion-ordered set.

use std::fmt;
use std::hash::Hash;
use std::iter::FromIterator;

use indexmap::IndexSet;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// A set of unique elements that iterates in first-insertion order.
///
/// Conflict-graph neighbors, preference snapshots, and thresholded vote
/// winners are all walked in the order they were first added, so that a
/// given submission/poll sequence always produces the same decisions.
/// Removal preserves the relative order of the remaining elements.
///
/// # Examples
///
/// ```
/// use snow_utils::Set;
///
/// let mut set = Set::new();
/// set.add(3);
/// set.add(1);
/// set.add(3); // duplicate, ignored
///
/// assert_eq!(set.len(), 2);
/// assert_eq!(set.to_vec(), vec![3, 1]);
/// ```
#[derive(Clone, Default)]
pub struct Set<T: Eq + Hash> {
    inner: IndexSet<T>,
}

impl<T: Eq + Hash> Set<T> {
    /// Creates a new empty set.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: IndexSet::new(),
        }
    }

    /// Creates a new set with the specified capacity.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            inner: IndexSet::with_capacity(capacity),
        }
    }

    /// Creates a set from an iterator of elements.
    pub fn of<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self {
            inner: iter.into_iter().collect(),
        }
    }

    /// Adds an element to the set.
    ///
    /// Returns `true` if the element was newly inserted. Re-adding an
    /// element does not change its position.
    pub fn add(&mut self, value: T) -> bool {
        self.inner.insert(value)
    }

    /// Adds multiple elements to the set.
    pub fn add_all<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        for item in iter {
            self.inner.insert(item);
        }
    }

    /// Returns `true` if the set contains the element.
    pub fn contains(&self, value: &T) -> bool {
        self.inner.contains(value)
    }

    /// Removes an element from the set, preserving the order of the rest.
    ///
    /// Returns `true` if the element was present.
    pub fn remove(&mut self, value: &T) -> bool {
        self.inner.shift_remove(value)
    }

    /// Removes multiple elements from the set.
    pub fn remove_all<'a, I: IntoIterator<Item = &'a T>>(&mut self, iter: I)
    where
        T: 'a,
    {
        for item in iter {
            self.inner.shift_remove(item);
        }
    }

    /// Returns the number of elements in the set.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Returns `true` if the set is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Removes all elements from the set.
    pub fn clear(&mut self) {
        self.inner.clear();
    }

    /// Returns an iterator over the elements in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.inner.iter()
    }

    /// Adds all elements from another set to this set.
    pub fn union(&mut self, other: &Self)
    where
        T: Clone,
    {
        for item in &other.inner {
            self.inner.insert(item.clone());
        }
    }

    /// Removes all elements that are in the other set.
    pub fn difference(&mut self, other: &Self) {
        self.inner.retain(|x| !other.inner.contains(x));
    }

    /// Returns `true` if this set and the other have any element in common.
    pub fn overlaps(&self, other: &Self) -> bool {
        if self.len() <= other.len() {
            self.inner.iter().any(|x| other.inner.contains(x))
        } else {
            other.inner.iter().any(|x| self.inner.contains(x))
        }
    }

    /// Returns `true` if both sets contain the same elements, in any order.
    pub fn equals(&self, other: &Self) -> bool {
        self.len() == other.len() && self.inner.iter().all(|x| other.inner.contains(x))
    }

    /// Copies the elements into a vector, in insertion order.
    pub fn to_vec(&self) -> Vec<T>
    where
        T: Clone,
    {
        self.inner.iter().cloned().collect()
    }
}

impl<T: Eq + Hash> FromIterator<T> for Set<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self::of(iter)
    }
}

impl<T: Eq + Hash> IntoIterator for Set<T> {
    type Item = T;
    type IntoIter = indexmap::set::IntoIter<T>;

    fn into_iter(self) -> Self::IntoIter {
        self.inner.into_iter()
    }
}

impl<'a, T: Eq + Hash> IntoIterator for &'a Set<T> {
    type Item = &'a T;
    type IntoIter = indexmap::set::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.inner.iter()
    }
}

impl<T: Eq + Hash + fmt::Debug> fmt::Debug for Set<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.inner.iter()).finish()
    }
}

impl<T: Eq + Hash> PartialEq for Set<T> {
    fn eq(&self, other: &Self) -> bool {
        self.equals(other)
    }
}

impl<T: Eq + Hash> Eq for Set<T> {}

impl<T: Eq + Hash + Serialize> Serialize for Set<T> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_seq(self.inner.iter())
    }
}

impl<'de, T: Eq + Hash + Deserialize<'de>> Deserialize<'de> for Set<T> {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let items = <Vec<T>>::deserialize(deserializer)?;
        Ok(Self::of(items))
    }
}
