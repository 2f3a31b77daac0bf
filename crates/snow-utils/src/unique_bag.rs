//! Per-identifier responder sets for poll results.

use std::fmt;
use std::hash::Hash;

use indexmap::IndexMap;

use crate::bag::Bag;

/// A set of poll responders, indexed 0..64.
///
/// Samples are at most 64 respondents, so a single word covers a poll.
#[derive(Clone, Copy, Default, PartialEq, Eq)]
pub struct BitSet(u64);

impl BitSet {
    /// Creates an empty bit set.
    #[must_use]
    pub fn new() -> Self {
        Self(0)
    }

    /// Adds the responder at `index`.
    ///
    /// # Panics
    ///
    /// Panics in debug builds if `index >= 64`.
    pub fn add(&mut self, index: usize) {
        debug_assert!(index < 64, "responder index out of range");
        self.0 |= 1 << index;
    }

    /// Returns `true` if the responder at `index` is present.
    #[must_use]
    pub fn contains(&self, index: usize) -> bool {
        index < 64 && self.0 & (1 << index) != 0
    }

    /// Removes the responder at `index`.
    pub fn remove(&mut self, index: usize) {
        if index < 64 {
            self.0 &= !(1 << index);
        }
    }

    /// Adds every responder in `other` to this set.
    pub fn union(&mut self, other: Self) {
        self.0 |= other.0;
    }

    /// Returns the number of responders in the set.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.count_ones() as usize
    }

    /// Returns `true` if no responders are present.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }
}

impl fmt::Debug for BitSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set()
            .entries((0..64).filter(|i| self.contains(*i)))
            .finish()
    }
}

/// A map from identifier to the set of poll responders that voted for it.
///
/// This is the shape of a raw DAG poll result: each sampled peer answers
/// with the vertex it prefers, and a responder's vote must be counted at
/// most once per identifier even when it reaches the same ancestor along
/// multiple paths. Iteration follows first-insertion order.
///
/// # Examples
///
/// ```
/// use snow_utils::UniqueBag;
///
/// let mut votes = UniqueBag::new();
/// votes.add(0, "v");
/// votes.add(1, "v");
/// votes.add(1, "w");
///
/// assert_eq!(votes.get_set(&"v").len(), 2);
///
/// let bag = votes.bag(2);
/// assert!(bag.threshold().contains(&"v"));
/// assert!(!bag.threshold().contains(&"w"));
/// ```
#[derive(Clone, Default)]
pub struct UniqueBag<T: Eq + Hash + Clone> {
    sets: IndexMap<T, BitSet>,
}

impl<T: Eq + Hash + Clone> UniqueBag<T> {
    /// Creates a new empty unique bag.
    #[must_use]
    pub fn new() -> Self {
        Self {
            sets: IndexMap::new(),
        }
    }

    /// Records a vote for `item` by the responder at `index`.
    pub fn add(&mut self, index: usize, item: T) {
        self.sets.entry(item).or_default().add(index);
    }

    /// Unions a whole responder set into `item`'s entry.
    pub fn union_set(&mut self, item: T, set: BitSet) {
        self.sets.entry(item).or_default().union(set);
    }

    /// Returns the responder set recorded for `item` (empty if absent).
    #[must_use]
    pub fn get_set(&self, item: &T) -> BitSet {
        self.sets.get(item).copied().unwrap_or_default()
    }

    /// Returns the number of identifiers with at least one vote.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sets.len()
    }

    /// Returns `true` if no votes have been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sets.is_empty()
    }

    /// Iterates over `(identifier, responder set)` in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&T, BitSet)> {
        self.sets.iter().map(|(item, set)| (item, *set))
    }

    /// Collapses the responder sets into a counted [`Bag`] with the given
    /// threshold applied.
    #[must_use]
    pub fn bag(&self, threshold: usize) -> Bag<T> {
        let mut bag = Bag::new();
        bag.set_threshold(threshold);
        for (item, set) in &self.sets {
            bag.add_count(item.clone(), set.len());
        }
        bag
    }
}

impl<T: Eq + Hash + Clone + fmt::Debug> fmt::Debug for UniqueBag<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.sets.iter()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bitset() {
        let mut set = BitSet::new();
        assert!(set.is_empty());

        set.add(0);
        set.add(5);
        set.add(63);
        assert_eq!(set.len(), 3);
        assert!(set.contains(0));
        assert!(set.contains(5));
        assert!(!set.contains(1));

        set.remove(5);
        assert_eq!(set.len(), 2);
        assert!(!set.contains(5));
    }

    #[test]
    fn test_bitset_union() {
        let mut a = BitSet::new();
        a.add(1);
        let mut b = BitSet::new();
        b.add(1);
        b.add(2);

        a.union(b);
        assert_eq!(a.len(), 2);
    }

    #[test]
    fn test_duplicate_vote_counted_once() {
        let mut votes = UniqueBag::new();
        votes.add(3, "v");
        votes.add(3, "v");
        assert_eq!(votes.get_set(&"v").len(), 1);
    }

    #[test]
    fn test_bag_conversion() {
        let mut votes = UniqueBag::new();
        votes.add(0, "v");
        votes.add(1, "v");
        votes.add(2, "w");

        let bag = votes.bag(2);
        assert_eq!(bag.count(&"v"), 2);
        assert_eq!(bag.count(&"w"), 1);
        assert_eq!(bag.threshold().to_vec(), vec!["v"]);
    }

    #[test]
    fn test_union_set() {
        let mut votes = UniqueBag::new();
        let mut set = BitSet::new();
        set.add(0);
        set.add(1);
        votes.union_set("v", set);
        votes.add(1, "v");
        assert_eq!(votes.get_set(&"v").len(), 2);
    }
}
