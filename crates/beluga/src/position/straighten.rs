//! Edge straightening.

use super::{Run, reposition_valid};
use crate::hierarchy::{CellId, HierarchyModel};

pub(super) fn min_path(run: &mut Run<'_>) {
    let intra_cell_spacing = run.options.intra_cell_spacing;
    let edges: Vec<CellId> = run.model.edges().collect();
    for id in edges {
        straighten_edge(run.model, intra_cell_spacing, id);
    }
}

/// Tries to line up the virtual segments of one hierarchical edge.
fn straighten_edge(model: &mut HierarchyModel, intra_cell_spacing: f64, id: CellId) {
    let Some((first, chosen)) = straightened(model, intra_cell_spacing, id) else {
        return;
    };
    let cell = model.cell_mut(id);
    for (k, value) in chosen.into_iter().enumerate() {
        cell.set_x(first + k, value);
        cell.set_working(first + k, value);
    }
}

/// Two candidates are built from the working coordinates: walking up from the bottom-most
/// segment and walking down from the top-most one, each carrying its current value forward
/// while the next segment can legally take it. A candidate wins only when it has more aligned
/// segment pairs than the edge already has; ties go to the downward walk. Returns the first
/// occupied rank and the new coordinates.
fn straightened(
    model: &HierarchyModel,
    intra_cell_spacing: f64,
    id: CellId,
) -> Option<(usize, Vec<f64>)> {
    let cell = model.cell(id);
    let ranks = cell.occupied_ranks();
    let first = ranks.start;
    let values: Vec<f64> = ranks.map(|rank| cell.working(rank)).collect();
    if values.len() < 2 {
        return None;
    }

    let ref_seg_count = values.windows(2).filter(|w| w[0] == w[1]).count();
    if ref_seg_count == values.len() - 1 {
        return None;
    }

    let can_take = |k: usize, value: f64| {
        let rank = first + k;
        reposition_valid(model, intra_cell_spacing, rank, cell.order(rank), value)
    };

    let mut up = values.clone();
    let mut up_seg_count = 0;
    let mut current = values[0];
    for k in 1..values.len() {
        if values[k] == current || can_take(k, current) {
            up[k] = current;
            up_seg_count += 1;
        } else {
            current = values[k];
        }
    }

    let mut down = values.clone();
    let mut down_seg_count = 0;
    current = values[values.len() - 1];
    for k in (0..values.len() - 1).rev() {
        if values[k] == current || can_take(k, current) {
            down[k] = current;
            down_seg_count += 1;
        } else {
            current = values[k];
        }
    }

    if down_seg_count <= ref_seg_count && up_seg_count <= ref_seg_count {
        return None;
    }
    if down_seg_count >= up_seg_count {
        Some((first, down))
    } else {
        Some((first, up))
    }
}
