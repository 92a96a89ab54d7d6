//! Connected-cell cache used by the passes.
//!
//! The median and balancing passes ask for a cell's neighbours on the adjacent ranks many
//! times per sweep. The lists are computed once per layout run and stored flat: one slot per
//! `(cell, occupied rank)` pair, with offsets into shared buffers.

use super::{CellId, HierarchyModel};

#[derive(Debug, Clone, Default)]
pub struct ConnectionCache {
    base: Vec<usize>,
    first_rank: Vec<usize>,
    next_offsets: Vec<usize>,
    next: Vec<CellId>,
    previous_offsets: Vec<usize>,
    previous: Vec<CellId>,
}

impl ConnectionCache {
    pub fn new(model: &HierarchyModel) -> Self {
        let mut cache = Self {
            next_offsets: vec![0],
            previous_offsets: vec![0],
            ..Default::default()
        };
        let mut slot = 0;
        for (id, cell) in model.cells() {
            let ranks = cell.occupied_ranks();
            cache.base.push(slot);
            cache.first_rank.push(ranks.start);
            for rank in ranks {
                model.collect_next_layer(id, rank, &mut cache.next);
                cache.next_offsets.push(cache.next.len());
                model.collect_previous_layer(id, rank, &mut cache.previous);
                cache.previous_offsets.push(cache.previous.len());
                slot += 1;
            }
        }
        cache
    }

    /// Number of `(cell, rank)` slots.
    pub fn slot_count(&self) -> usize {
        self.next_offsets.len() - 1
    }

    /// Dense index of `(cell, rank)`, usable to key per-slot scratch buffers.
    pub fn slot(&self, cell: CellId, rank: usize) -> usize {
        let i = cell.index();
        self.base[i] + (rank - self.first_rank[i])
    }

    pub fn next_layer(&self, cell: CellId, rank: usize) -> &[CellId] {
        let s = self.slot(cell, rank);
        &self.next[self.next_offsets[s]..self.next_offsets[s + 1]]
    }

    pub fn previous_layer(&self, cell: CellId, rank: usize) -> &[CellId] {
        let s = self.slot(cell, rank);
        &self.previous[self.previous_offsets[s]..self.previous_offsets[s + 1]]
    }
}
