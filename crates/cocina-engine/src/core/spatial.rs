//! Uniform spatial hash for neighbour lookups during relaxation.
//!
//! Buckets hold particle indices, not particles. The grid is cleared and
//! refilled every relaxation pass since positions move between passes.

use std::collections::HashMap;

use glam::Vec2;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum GridError {
    #[error("cell size must be positive and finite, got {0}")]
    InvalidCellSize(f32),
}

#[derive(Debug, Clone)]
pub struct SpatialHash {
    cell_size: f32,
    inv_cell_size: f32,
    cells: HashMap<(i32, i32), Vec<usize>>,
}

impl SpatialHash {
    pub fn new(cell_size: f32) -> Result<Self, GridError> {
        if !(cell_size.is_finite() && cell_size > 0.0) {
            return Err(GridError::InvalidCellSize(cell_size));
        }
        Ok(Self {
            cell_size,
            inv_cell_size: 1.0 / cell_size,
            cells: HashMap::new(),
        })
    }

    /// Grid sized so that any two overlapping circles of `radius` land in
    /// neighbouring cells.
    pub fn for_radius(radius: f32) -> Result<Self, GridError> {
        Self::new(radius * 2.0)
    }

    pub fn cell_size(&self) -> f32 {
        self.cell_size
    }

    pub fn cell_of(&self, pos: Vec2) -> (i32, i32) {
        (
            (pos.x * self.inv_cell_size).floor() as i32,
            (pos.y * self.inv_cell_size).floor() as i32,
        )
    }

    pub fn insert(&mut self, index: usize, pos: Vec2) {
        let cell = self.cell_of(pos);
        self.cells.entry(cell).or_default().push(index);
    }

    /// Empty every bucket. Bucket allocations are kept for the next pass.
    pub fn clear(&mut self) {
        for bucket in self.cells.values_mut() {
            bucket.clear();
        }
    }

    /// Append all indices in the 3×3 cell block around `(x, y)` to `out`.
    pub fn query_into(&self, x: f32, y: f32, out: &mut Vec<usize>) {
        let (cx, cy) = self.cell_of(Vec2::new(x, y));
        for dy in -1..=1 {
            for dx in -1..=1 {
                if let Some(bucket) = self.cells.get(&(cx + dx, cy + dy)) {
                    out.extend_from_slice(bucket);
                }
            }
        }
    }

    pub fn query(&self, x: f32, y: f32) -> Vec<usize> {
        let mut out = Vec::new();
        self.query_into(x, y, &mut out);
        out
    }

    /// Number of indices currently stored.
    pub fn len(&self) -> usize {
        self.cells.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_bad_cell_size() {
        assert_eq!(SpatialHash::new(0.0).unwrap_err(), GridError::InvalidCellSize(0.0));
        assert!(SpatialHash::new(f32::NAN).is_err());
        assert!(SpatialHash::new(-4.0).is_err());
    }

    #[test]
    fn query_covers_neighbouring_cells() {
        let mut grid = SpatialHash::for_radius(10.0).unwrap();
        grid.insert(0, Vec2::new(5.0, 5.0));
        grid.insert(1, Vec2::new(25.0, 5.0)); // next cell over
        grid.insert(2, Vec2::new(65.0, 5.0)); // three cells away

        let mut found = grid.query(15.0, 5.0);
        found.sort_unstable();
        assert_eq!(found, vec![0, 1]);
    }

    #[test]
    fn negative_coordinates_hash_separately() {
        let grid = SpatialHash::new(20.0).unwrap();
        assert_eq!(grid.cell_of(Vec2::new(-0.5, 0.5)), (-1, 0));
        assert_eq!(grid.cell_of(Vec2::new(0.5, -0.5)), (0, -1));
    }

    #[test]
    fn overlapping_pairs_are_always_found() {
        let radius = 12.0;
        let mut grid = SpatialHash::for_radius(radius).unwrap();
        let a = Vec2::new(47.9, 23.9);
        // Any point closer than 2r lies within one cell of `a`.
        for (i, offset) in [
            Vec2::new(23.9, 0.0),
            Vec2::new(-23.9, 0.0),
            Vec2::new(0.0, 23.9),
            Vec2::new(16.0, -16.0),
        ]
        .into_iter()
        .enumerate()
        {
            grid.clear();
            grid.insert(i, a + offset);
            assert!(grid.query(a.x, a.y).contains(&i), "missed offset {offset:?}");
        }
    }

    #[test]
    fn clear_empties_buckets() {
        let mut grid = SpatialHash::new(8.0).unwrap();
        grid.insert(0, Vec2::ZERO);
        grid.insert(1, Vec2::new(100.0, 100.0));
        assert_eq!(grid.len(), 2);
        grid.clear();
        assert!(grid.is_empty());
        assert!(grid.query(0.0, 0.0).is_empty());
    }
}
