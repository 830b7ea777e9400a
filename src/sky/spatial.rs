//! Uniform spatial hash for proximity pair queries
//!
//! Bodies are bucketed into square cells whose side equals the proximity
//! threshold. Any two bodies closer than the threshold then sit in the same
//! or in horizontally/vertically/diagonally adjacent cells, so visiting each
//! cell together with half of its neighbors yields every candidate pair
//! exactly once.

use hashbrown::HashMap;

use crate::util::vec2::Vec2;

/// Grid cell key - (x, y) cell coordinates
pub type CellKey = (i32, i32);

/// Initial capacity for grid cells (1000x1000 map at 180 units is ~36 cells)
const GRID_INITIAL_CAPACITY: usize = 64;

/// Initial capacity for entry vectors within cells
const CELL_INITIAL_CAPACITY: usize = 4;

/// Entry stored in the grid: index into the caller's body slice plus position
#[derive(Debug, Clone, Copy)]
pub struct GridEntry {
    pub index: usize,
    pub position: Vec2,
}

/// Spatial hash grid keyed by input index
pub struct ProximityGrid {
    /// Inverse cell size for fast position-to-cell conversion
    inv_cell_size: f32,
    /// Map from cell key to entries in that cell
    cells: HashMap<CellKey, Vec<GridEntry>>,
}

impl ProximityGrid {
    /// Create a grid with the given cell size (use the proximity threshold)
    pub fn new(cell_size: f32) -> Self {
        Self {
            inv_cell_size: 1.0 / cell_size,
            cells: HashMap::with_capacity(GRID_INITIAL_CAPACITY),
        }
    }

    /// Build a grid over `positions`, using slice indices as entry ids
    pub fn from_positions(cell_size: f32, positions: impl IntoIterator<Item = Vec2>) -> Self {
        let mut grid = Self::new(cell_size);
        for (index, position) in positions.into_iter().enumerate() {
            grid.insert(GridEntry { index, position });
        }
        grid
    }

    /// Convert world position to cell key
    #[inline]
    fn position_to_cell(&self, position: Vec2) -> CellKey {
        (
            (position.x * self.inv_cell_size).floor() as i32,
            (position.y * self.inv_cell_size).floor() as i32,
        )
    }

    /// Insert an entry into the grid
    #[inline]
    pub fn insert(&mut self, entry: GridEntry) {
        let cell_key = self.position_to_cell(entry.position);
        self.cells
            .entry(cell_key)
            .or_insert_with(|| Vec::with_capacity(CELL_INITIAL_CAPACITY))
            .push(entry);
    }

    /// Visit every candidate pair once.
    ///
    /// Candidates are pairs in the same or neighboring cells; the callback is
    /// responsible for the exact distance test. Visit order follows the hash
    /// map and is not stable, so callers must not depend on it.
    pub fn for_each_candidate_pair<F>(&self, mut callback: F)
    where
        F: FnMut(GridEntry, GridEntry),
    {
        // Same cell plus the right, bottom, bottom-right and bottom-left neighbors
        const HALF_NEIGHBORHOOD: [(i32, i32); 4] = [(1, 0), (0, 1), (1, 1), (-1, 1)];

        for (&(cx, cy), entries) in &self.cells {
            for i in 0..entries.len() {
                for j in (i + 1)..entries.len() {
                    callback(entries[i], entries[j]);
                }
            }

            for (dx, dy) in HALF_NEIGHBORHOOD {
                // Saturated keys at the i32 edge have no neighbor on that side
                let (Some(nx), Some(ny)) = (cx.checked_add(dx), cy.checked_add(dy)) else {
                    continue;
                };
                if let Some(neighbor) = self.cells.get(&(nx, ny)) {
                    for entry in entries {
                        for other in neighbor {
                            callback(*entry, *other);
                        }
                    }
                }
            }
        }
    }

    /// Total number of entries
    pub fn len(&self) -> usize {
        self.cells.values().map(|c| c.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
