use std::collections::BTreeSet;

use crate::position::Coordinate;

/// Coordinates present in both independently captured sets, sorted.
///
/// Conflicts are only reported; neither source wins.
pub fn find_conflicts(left: &[Coordinate], right: &[Coordinate]) -> Vec<Coordinate> {
    let left = left.iter().collect::<BTreeSet<_>>();
    let right = right.iter().collect::<BTreeSet<_>>();

    left.intersection(&right).map(|&&c| c).collect()
}
