//! Cluster detection over a settled grid.
//!
//! A cluster is a 4-directionally connected region of one base type, grown
//! through wildcards, meeting a minimum size. Wildcards join clusters but
//! never seed them.
//!
//! # Claiming policy
//!
//! Cells are claimed globally only when a region *commits* as a cluster.
//! A failed search (region below the minimum size) marks nothing, so a
//! wildcard rejected alongside one seed stays eligible for a different
//! neighboring seed. This keeps detection order-independent for the
//! committed output and makes repeated detection over an unchanged grid
//! idempotent.
//!
//! # Complexity
//!
//! Each cell is expanded at most once per distinct neighboring base type, so
//! a full scan is `O(rows * cols)` with a constant bounded by the alphabet
//! size.
//!
//! # Example
//!
//! ```
//! use tumble_core::cluster::find_clusters;
//! use tumble_core::grid::{Grid, TypeCode};
//!
//! let grid = Grid::parse_rows(&[
//!     "12312",
//!     "12310",
//!     "12321",
//!     "10302",
//!     "12K12",
//! ])
//! .unwrap();
//!
//! let clusters = find_clusters(&grid, TypeCode::new('K'), 4);
//! // The '3' run down column 2 joins the wildcard at (4, 2).
//! assert!(clusters
//!     .iter()
//!     .any(|c| c.type_code == TypeCode::new('3') && c.cells.len() == 5));
//! ```

use serde::{Deserialize, Serialize};

use crate::grid::{Cell, Grid, TypeCode};

/// A committed cluster: one base type plus the cells it claims.
///
/// Cells are unique, sorted row-major, and include the joining wildcards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cluster {
    /// The non-wildcard type that seeded the cluster.
    pub type_code: TypeCode,
    /// Claimed cells (same-type and wildcard), sorted row-major.
    pub cells: Vec<Cell>,
}

impl Cluster {
    /// Groups the cluster's rows by column, deduplicated and sorted.
    ///
    /// This is the shape the explode phase wants: for each affected column,
    /// the distinct row indices to clear.
    #[must_use]
    pub fn rows_by_column(clusters: &[Cluster]) -> Vec<(usize, Vec<usize>)> {
        let mut by_col: std::collections::BTreeMap<usize, Vec<usize>> =
            std::collections::BTreeMap::new();
        for cluster in clusters {
            for cell in &cluster.cells {
                by_col.entry(cell.col).or_default().push(cell.row);
            }
        }
        by_col
            .into_iter()
            .map(|(col, mut rows)| {
                rows.sort_unstable();
                rows.dedup();
                (col, rows)
            })
            .collect()
    }
}

const DIRS: [(isize, isize); 4] = [(1, 0), (-1, 0), (0, 1), (0, -1)];

/// Finds all clusters of at least `min_size` cells in `grid`.
///
/// Scans in row-major order. From each unclaimed non-wildcard seed, a
/// stack-based flood expands into neighbors whose type equals the seed's or
/// is `wildcard`, tracking same-type and wildcard cells separately. The
/// region qualifies iff `same + wild >= min_size` and `same > 0`; on success
/// every region cell is claimed so later seeds cannot reuse it.
///
/// Clusters are returned in seed scan order with cells sorted row-major, so
/// the output is deterministic for a given grid.
#[must_use]
pub fn find_clusters(grid: &Grid, wildcard: TypeCode, min_size: usize) -> Vec<Cluster> {
    let rows = grid.rows();
    let cols = grid.cols();
    let mut claimed = vec![false; rows * cols];
    let mut clusters = Vec::new();

    for (seed, base) in grid.iter() {
        if claimed[seed.to_index(cols)] || base == wildcard {
            continue;
        }

        // Per-seed scratch so a failed search leaves no global trace.
        let mut seen = vec![false; rows * cols];
        let mut stack = vec![seed];
        let mut same = Vec::new();
        let mut wild = Vec::new();
        seen[seed.to_index(cols)] = true;

        while let Some(cell) = stack.pop() {
            let code = grid.get(cell);
            if code == base {
                same.push(cell);
            } else {
                wild.push(cell);
            }

            for (dr, dc) in DIRS {
                let (nr, nc) = (cell.row as isize + dr, cell.col as isize + dc);
                if nr < 0 || nc < 0 || nr as usize >= rows || nc as usize >= cols {
                    continue;
                }
                let next = Cell::new(nr as usize, nc as usize);
                let idx = next.to_index(cols);
                if seen[idx] || claimed[idx] {
                    continue;
                }
                let code = grid.get(next);
                if code == base || code == wildcard {
                    seen[idx] = true;
                    stack.push(next);
                }
            }
        }

        if same.len() + wild.len() >= min_size && !same.is_empty() {
            let mut cells = same;
            cells.append(&mut wild);
            cells.sort_unstable();
            for cell in &cells {
                claimed[cell.to_index(cols)] = true;
            }
            clusters.push(Cluster {
                type_code: base,
                cells,
            });
        }
    }

    clusters
}
