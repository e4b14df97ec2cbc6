//! Set operations over ordered sequences.
//!
//! Inputs are treated as sets: duplicates are ignored and each result is
//! duplicate-free. Results keep the first-occurrence order of the sequence
//! being iterated (`old` for matches and deletions, `new` for additions).

use std::collections::HashSet;
use std::hash::Hash;

/// Elements present in both `old` and `new`
pub fn matches<T: Eq + Hash + Clone>(old: &[T], new: &[T]) -> Vec<T> {
    let lookup: HashSet<&T> = new.iter().collect();
    retain_unique(old, |item| lookup.contains(item))
}

/// Elements present in `new` but not in `old`
pub fn additions<T: Eq + Hash + Clone>(old: &[T], new: &[T]) -> Vec<T> {
    let lookup: HashSet<&T> = old.iter().collect();
    retain_unique(new, |item| !lookup.contains(item))
}

/// Elements present in `old` but not in `new`
pub fn deletions<T: Eq + Hash + Clone>(old: &[T], new: &[T]) -> Vec<T> {
    let lookup: HashSet<&T> = new.iter().collect();
    retain_unique(old, |item| !lookup.contains(item))
}

fn retain_unique<T, F>(items: &[T], keep: F) -> Vec<T>
where
    T: Eq + Hash + Clone,
    F: Fn(&T) -> bool,
{
    let mut seen = HashSet::with_capacity(items.len());
    items
        .iter()
        .filter(|item| keep(*item) && seen.insert(*item))
        .cloned()
        .collect()
}
