use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use crate::position::{Coordinate, GRID_MAX};

/// Cell mark used when a grid is built from a single source.
pub const DEFAULT_LABEL: char = 'X';

const EMPTY: &str = " [ ] ";
const FILLER: &str = "     ";

/// Occupancy of the even-indexed cells of the 11x11 sensor grid.
///
/// Each occupied cell carries the label of the source that placed it; a
/// later source draws over an earlier one.
#[derive(Debug, Clone, Default)]
pub struct OccupancyGrid {
    occupied: BTreeMap<Coordinate, char>,
    unplaced: BTreeSet<Coordinate>,
}

impl OccupancyGrid {
    pub fn new<I: IntoIterator<Item = Coordinate>>(coordinates: I) -> Self {
        Self::default().with_source(DEFAULT_LABEL, coordinates)
    }

    pub fn with_source<I: IntoIterator<Item = Coordinate>>(mut self, label: char, coordinates: I) -> Self {
        for coordinate in coordinates {
            if coordinate.is_addressable() {
                self.occupied.insert(coordinate, label);
            } else if self.unplaced.insert(coordinate) {
                tracing::warn!("coordinate {} is not an addressable cell", coordinate);
            }
        }
        self
    }

    pub fn label(&self, coordinate: &Coordinate) -> Option<char> {
        self.occupied.get(coordinate).copied()
    }

    pub fn is_occupied(&self, coordinate: &Coordinate) -> bool {
        self.occupied.contains_key(coordinate)
    }

    /// Every addressable cell, row-major from the top row, with its occupancy.
    pub fn cells(&self) -> impl Iterator<Item = (Coordinate, bool)> + '_ {
        (0..=GRID_MAX)
            .rev()
            .step_by(2)
            .flat_map(|y| (0..=GRID_MAX).step_by(2).map(move |x| Coordinate::new(x, y)))
            .map(|c| (c, self.is_occupied(&c)))
    }

    /// Addressable cells no source covered, in rendering order.
    pub fn holes(&self) -> impl Iterator<Item = Coordinate> + '_ {
        self.cells().filter(|(_, occupied)| !occupied).map(|(c, _)| c)
    }

    pub fn occupied_len(&self) -> usize {
        self.occupied.len()
    }

    /// Parsed coordinates that fall outside the addressable cells.
    pub fn unplaced(&self) -> impl Iterator<Item = &Coordinate> {
        self.unplaced.iter()
    }
}

impl fmt::Display for OccupancyGrid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for y in (0..=GRID_MAX).rev() {
            write!(f, "\n\t{y}\t")?;
            for x in 0..=GRID_MAX {
                if x % 2 == 1 || y % 2 == 1 {
                    f.write_str(FILLER)?;
                } else if let Some(label) = self.label(&Coordinate::new(x, y)) {
                    write!(f, " [{label}] ")?;
                } else {
                    f.write_str(EMPTY)?;
                }
            }
            writeln!(f)?;
        }

        write!(f, "\n\t\t")?;
        for x in 0..=GRID_MAX {
            write!(f, "  {x}  ")?;
        }
        writeln!(f)
    }
}
