//! A multiset (bag) with threshold support.

use std::fmt;
use std::hash::Hash;

use indexmap::IndexMap;

use crate::set::Set;

/// A multiset that tracks the count of each element.
///
/// Bags carry poll results: each element is a candidate identifier and its
/// count is the number of respondents that voted for it. Setting a
/// threshold maintains the set of elements that have reached at least that
/// many votes. Both the unique-element listing and the threshold set
/// iterate in first-insertion order.
///
/// # Examples
///
/// ```
/// use snow_utils::Bag;
///
/// let mut bag = Bag::new();
/// bag.set_threshold(2);
/// bag.add_count("x", 2);
/// bag.add("y");
///
/// assert_eq!(bag.count(&"x"), 2);
/// assert_eq!(bag.len(), 3);
/// assert!(bag.threshold().contains(&"x"));
/// assert!(!bag.threshold().contains(&"y"));
/// ```
#[derive(Clone, Default)]
pub struct Bag<T: Eq + Hash + Clone> {
    counts: IndexMap<T, usize>,
    size: usize,
    threshold: usize,
    met_threshold: Set<T>,
}

impl<T: Eq + Hash + Clone> Bag<T> {
    /// Creates a new empty bag.
    #[must_use]
    pub fn new() -> Self {
        Self {
            counts: IndexMap::new(),
            size: 0,
            threshold: 0,
            met_threshold: Set::new(),
        }
    }

    /// Creates a bag from an iterator of elements.
    pub fn of<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut bag = Self::new();
        for item in iter {
            bag.add(item);
        }
        bag
    }

    /// Sets the threshold for the threshold set.
    ///
    /// Elements counted at least `threshold` times are included, in the
    /// order they were first added to the bag.
    pub fn set_threshold(&mut self, threshold: usize) {
        if self.threshold == threshold {
            return;
        }

        self.threshold = threshold;
        self.met_threshold.clear();

        for (item, &count) in &self.counts {
            if count >= threshold {
                self.met_threshold.add(item.clone());
            }
        }
    }

    /// Adds a single element to the bag.
    pub fn add(&mut self, item: T) {
        self.add_count(item, 1);
    }

    /// Adds multiple elements to the bag.
    pub fn add_all<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        for item in iter {
            self.add(item);
        }
    }

    /// Adds an element with a specific count. A `count` of 0 is a no-op.
    pub fn add_count(&mut self, item: T, count: usize) {
        if count == 0 {
            return;
        }

        let total_count = self.counts.entry(item.clone()).or_insert(0);
        *total_count += count;
        self.size += count;

        if *total_count >= self.threshold && self.threshold > 0 {
            self.met_threshold.add(item);
        }
    }

    /// Returns the count of the given element.
    #[must_use]
    pub fn count(&self, item: &T) -> usize {
        self.counts.get(item).copied().unwrap_or(0)
    }

    /// Returns the total number of elements, including duplicates.
    #[must_use]
    pub fn len(&self) -> usize {
        self.size
    }

    /// Returns `true` if the bag is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// Returns the unique elements in first-insertion order.
    pub fn list(&self) -> Vec<T> {
        self.counts.keys().cloned().collect()
    }

    /// Returns `true` if both bags hold the same elements with the same
    /// counts.
    pub fn equals(&self, other: &Self) -> bool {
        self.size == other.size
            && self
                .counts
                .iter()
                .all(|(item, &count)| other.count(item) == count)
    }

    /// Returns the set of elements that have met the threshold, in
    /// first-insertion order.
    #[must_use]
    pub fn threshold(&self) -> &Set<T> {
        &self.met_threshold
    }
}

impl<T: Eq + Hash + Clone + fmt::Debug> fmt::Debug for Bag<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Bag(size={}): {{", self.size)?;
        let mut first = true;
        for (item, count) in &self.counts {
            if !first {
                write!(f, ", ")?;
            }
            write!(f, "{:?}: {}", item, count)?;
            first = false;
        }
        write!(f, "}}")
    }
}

impl<T: Eq + Hash + Clone + fmt::Display> fmt::Display for Bag<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Bag (Size = {}):", self.size)?;
        for (item, count) in &self.counts {
            writeln!(f, "    {}: {}", item, count)?;
        }
        Ok(())
    }
}
