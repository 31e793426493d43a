//! Roster diffing: who left a clan between two snapshots.
//!
//! Identity is the account id alone; renamed players or changed stats are
//! not departures.

use std::collections::HashSet;

/// `previous \ current`.
pub fn diff(previous: &HashSet<i64>, current: &HashSet<i64>) -> HashSet<i64> {
    previous.difference(current).copied().collect()
}

/// Departed ids from two rosters in list form, ascending and deduplicated.
pub fn departed(previous: &[i64], current: &[i64]) -> Vec<i64> {
    let previous: HashSet<i64> = previous.iter().copied().collect();
    let current: HashSet<i64> = current.iter().copied().collect();
    let mut left: Vec<i64> = diff(&previous, &current).into_iter().collect();
    left.sort_unstable();
    left
}
