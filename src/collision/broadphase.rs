use std::collections::{HashMap, HashSet};

use glam::Vec3;

use crate::core::{collidable::CollidablePair, collidable::CollidableReference, shape::Aabb};

/// Bodies spanning more cells than this skip the grid and are tested against everything.
const MAX_CELLS_PER_PROXY: i64 = 64;

/// Bounds of one collidable as seen by the broad phase this step.
#[derive(Debug, Clone, Copy)]
pub struct BroadPhaseProxy {
    pub collidable: CollidableReference,
    /// Already expanded by the owner's speculative margin.
    pub bounds: Aabb,
    pub sleeping: bool,
}

type Cell = (i32, i32, i32);

/// Uniform grid spatial partitioning of body bounds.
pub struct SpatialGrid {
    cell_size: f32,
    grid: HashMap<Cell, Vec<usize>>,
}

impl SpatialGrid {
    pub fn new(cell_size: f32) -> Self {
        Self {
            cell_size: cell_size.max(f32::EPSILON),
            grid: HashMap::new(),
        }
    }

    fn world_to_grid(&self, pos: Vec3) -> Cell {
        (
            (pos.x / self.cell_size).floor() as i32,
            (pos.y / self.cell_size).floor() as i32,
            (pos.z / self.cell_size).floor() as i32,
        )
    }

    fn cell_range(&self, bounds: &Aabb) -> (Cell, Cell) {
        (self.world_to_grid(bounds.min), self.world_to_grid(bounds.max))
    }

    fn cell_count((min, max): (Cell, Cell)) -> i64 {
        (max.0 as i64 - min.0 as i64 + 1)
            * (max.1 as i64 - min.1 as i64 + 1)
            * (max.2 as i64 - min.2 as i64 + 1)
    }

    pub fn clear(&mut self) {
        self.grid.clear();
    }

    pub fn insert(&mut self, proxy_index: usize, bounds: &Aabb) {
        let (min_cell, max_cell) = self.cell_range(bounds);
        for x in min_cell.0..=max_cell.0 {
            for y in min_cell.1..=max_cell.1 {
                for z in min_cell.2..=max_cell.2 {
                    self.grid.entry((x, y, z)).or_default().push(proxy_index);
                }
            }
        }
    }

    /// Calls `visit` for every group of proxies sharing a cell.
    pub fn for_each_occupied_cell(&self, mut visit: impl FnMut(&[usize])) {
        for occupants in self.grid.values() {
            if occupants.len() > 1 {
                visit(occupants);
            }
        }
    }
}

/// Pairs found by one broad phase pass.
#[derive(Debug, Default)]
pub struct CandidatePairs {
    /// Pairs with at least one active body, to test right away.
    pub pairs: Vec<CollidablePair>,
    /// Pairs whose bodies are all asleep. Only worth testing once one of them wakes.
    pub deferred: Vec<CollidablePair>,
}

impl CandidatePairs {
    pub fn len(&self) -> usize {
        self.pairs.len() + self.deferred.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Broad phase driver returning candidate collidable pairs.
pub struct BroadPhase {
    grid: SpatialGrid,
}

impl BroadPhase {
    pub fn new(cell_size: f32) -> Self {
        Self {
            grid: SpatialGrid::new(cell_size),
        }
    }

    /// Pairs whose bounds overlap, in a deterministic order.
    ///
    /// Pairs made only of sleeping bodies, or of a sleeping body and a static,
    /// land in [`CandidatePairs::deferred`].
    pub fn find_pairs(
        &mut self,
        bodies: &[BroadPhaseProxy],
        statics: &[BroadPhaseProxy],
    ) -> CandidatePairs {
        self.grid.clear();

        let mut oversized = Vec::new();
        for (index, proxy) in bodies.iter().enumerate() {
            let range = self.grid.cell_range(&proxy.bounds);
            if SpatialGrid::cell_count(range) > MAX_CELLS_PER_PROXY {
                oversized.push(index);
            } else {
                self.grid.insert(index, &proxy.bounds);
            }
        }

        let mut checked: HashSet<(usize, usize)> = HashSet::new();
        let mut body_pairs: Vec<(usize, usize)> = Vec::new();
        let mut consider = |i: usize, j: usize| {
            let key = if i < j { (i, j) } else { (j, i) };
            if key.0 == key.1 || !checked.insert(key) {
                return;
            }
            if bodies[key.0].bounds.intersects(&bodies[key.1].bounds) {
                body_pairs.push(key);
            }
        };

        self.grid.for_each_occupied_cell(|occupants| {
            for (n, &i) in occupants.iter().enumerate() {
                for &j in &occupants[n + 1..] {
                    consider(i, j);
                }
            }
        });
        for &i in &oversized {
            for j in 0..bodies.len() {
                consider(i, j);
            }
        }
        body_pairs.sort_unstable();

        let mut found = CandidatePairs::default();
        for (i, j) in body_pairs {
            let pair = CollidablePair::new(bodies[i].collidable, bodies[j].collidable);
            if bodies[i].sleeping && bodies[j].sleeping {
                found.deferred.push(pair);
            } else {
                found.pairs.push(pair);
            }
        }

        for body in bodies {
            for fixed in statics {
                if !body.bounds.intersects(&fixed.bounds) {
                    continue;
                }
                let pair = CollidablePair::new(body.collidable, fixed.collidable);
                if body.sleeping {
                    found.deferred.push(pair);
                } else {
                    found.pairs.push(pair);
                }
            }
        }

        log::trace!(
            "Broad phase: {} bodies ({} oversized), {} statics, {} pairs, {} deferred",
            bodies.len(),
            oversized.len(),
            statics.len(),
            found.pairs.len(),
            found.deferred.len()
        );
        found
    }
}
