//! Incremental maintenance of a sorted list.
//!
//! These helpers keep a `Vec` sorted under a comparator while elements are
//! added and removed, and compute the indices listeners expect:
//!
//! - insertions report final indices, after the whole batch has landed
//! - removals report indices in the list as it was before the batch
//! - updates are reported as coalesced contiguous ranges

use std::cmp::Ordering;
use std::ops::Range;

/// Index before the first occupant that sorts strictly after `item`.
///
/// Equal elements keep arrival order: a new element goes after existing
/// ones it compares equal to.
pub fn insertion_point<T>(list: &[T], item: &T, cmp: impl Fn(&T, &T) -> Ordering) -> usize {
    list.partition_point(|occupant| cmp(occupant, item) != Ordering::Greater)
}

/// Insert a batch into a sorted list one element at a time.
///
/// Returns the final index of every inserted element, ascending.
pub fn insert_sorted_batch<T>(
    list: &mut Vec<T>,
    items: impl IntoIterator<Item = T>,
    cmp: impl Fn(&T, &T) -> Ordering,
) -> Vec<usize> {
    let mut indices: Vec<usize> = Vec::new();
    for item in items {
        let at = insertion_point(list, &item, &cmp);
        // Each insert shifts what landed at or after it
        for index in indices.iter_mut() {
            if *index >= at {
                *index += 1;
            }
        }
        list.insert(at, item);
        indices.push(at);
    }
    indices.sort_unstable();
    indices
}

/// Indices of every element matching `doomed`, against the current list.
pub fn capture_removals<T>(list: &[T], doomed: impl Fn(&T) -> bool) -> Vec<usize> {
    list.iter()
        .enumerate()
        .filter_map(|(index, item)| doomed(item).then_some(index))
        .collect()
}

/// Remove the elements at `indices` (pre-removal positions, any order).
///
/// Returns the removed elements in ascending index order. Out-of-range and
/// repeated indices are ignored.
pub fn remove_indices<T>(list: &mut Vec<T>, indices: &[usize]) -> Vec<T> {
    let mut sorted: Vec<usize> = indices.iter().copied().filter(|i| *i < list.len()).collect();
    sorted.sort_unstable();
    sorted.dedup();

    let mut removed: Vec<T> = sorted.iter().rev().map(|i| list.remove(*i)).collect();
    removed.reverse();
    removed
}

/// Sort indices and merge adjacent runs into half-open ranges.
pub fn coalesce_ranges(indices: impl IntoIterator<Item = usize>) -> Vec<Range<usize>> {
    let mut sorted: Vec<usize> = indices.into_iter().collect();
    sorted.sort_unstable();
    sorted.dedup();

    let mut ranges: Vec<Range<usize>> = Vec::new();
    for index in sorted {
        match ranges.last_mut() {
            Some(last) if last.end == index => last.end += 1,
            _ => ranges.push(index..index + 1),
        }
    }
    ranges
}
