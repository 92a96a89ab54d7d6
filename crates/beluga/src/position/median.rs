//! Median sweeps and neighbour balancing.
//!
//! Both heuristics only touch working coordinates and only accept a move that keeps the
//! minimum gap to the neighbour on the side the cell moves towards. A rejected move leaves the
//! cell where it is.

use super::{Run, reposition_valid};
use crate::hierarchy::{CellId, ConnectionCache, HierarchyModel};
use std::cmp::Reverse;
use std::collections::VecDeque;

/// Moves below this distance are not worth re-queueing neighbours for.
const BALANCE_TOLERANCE: f64 = 1.0;

/// Median of the working coordinates of `cells` on `rank`: the middle value for an odd
/// count, the mean of the two middle values for an even one.
pub(super) fn median_x_value(
    model: &HierarchyModel,
    cells: &[CellId],
    rank: usize,
) -> Option<f64> {
    if cells.is_empty() {
        return None;
    }
    let mut values: Vec<f64> = cells.iter().map(|&c| model.cell(c).working(rank)).collect();
    values.sort_by(f64::total_cmp);
    let mid = values.len() / 2;
    if values.len() % 2 == 1 {
        Some(values[mid])
    } else {
        Some((values[mid - 1] + values[mid]) / 2.0)
    }
}

/// Processing priority of `cell` against its connections in the reference rank. Straight
/// runs of edge segments weigh the most.
pub(super) fn weighted_value(model: &HierarchyModel, cell: CellId, connected: &[CellId]) -> u32 {
    let is_vertex = model.cell(cell).is_vertex();
    connected
        .iter()
        .map(|&c| match (is_vertex, model.cell(c).is_vertex()) {
            (true, true) => 1,
            (false, false) => 8,
            _ => 2,
        })
        .sum()
}

/// One sweep pair: top-down against the rank above, then bottom-up against the rank below.
pub(super) fn median_pos(run: &mut Run<'_>) {
    let max_rank = run.model.max_rank();
    for rank in (0..max_rank).rev() {
        median_rank(run, rank, true);
    }
    for rank in 1..=max_rank {
        median_rank(run, rank, false);
    }
}

fn median_rank(run: &mut Run<'_>, rank: usize, downward: bool) {
    let reference = if downward { rank + 1 } else { rank - 1 };
    let model: &HierarchyModel = run.model;
    let mut plan: Vec<(u32, usize, CellId, Option<f64>)> = model
        .rank(rank)
        .iter()
        .enumerate()
        .map(|(position, &id)| {
            let connected = if downward {
                run.cache.next_layer(id, rank)
            } else {
                run.cache.previous_layer(id, rank)
            };
            (
                weighted_value(model, id, connected),
                position,
                id,
                median_x_value(model, connected, reference),
            )
        })
        .collect();
    plan.sort_by_key(|&(weight, position, _, _)| (Reverse(weight), position));

    let intra_cell_spacing = run.options.intra_cell_spacing;
    for (_, position, id, median) in plan {
        let Some(target) = median else {
            continue;
        };
        if target == run.model.cell(id).working(rank) {
            continue;
        }
        if reposition_valid(run.model, intra_cell_spacing, rank, position, target) {
            run.model.cell_mut(id).set_working(rank, target);
        }
    }
}

/// Where neighbour balancing would like `cell` on `rank`: the medians of its next-layer and
/// previous-layer connections, weighted by how many connections each side has.
pub(super) fn balance_target(
    model: &HierarchyModel,
    cache: &ConnectionCache,
    cell: CellId,
    rank: usize,
) -> Option<f64> {
    let next = cache.next_layer(cell, rank);
    let previous = cache.previous_layer(cell, rank);
    let count = next.len() + previous.len();
    if count == 0 {
        return None;
    }
    let median_next = median_x_value(model, next, rank + 1).unwrap_or(0.0);
    let median_previous = if previous.is_empty() {
        0.0
    } else {
        median_x_value(model, previous, rank - 1).unwrap_or(0.0)
    };
    Some(
        (median_next * next.len() as f64 + median_previous * previous.len() as f64)
            / count as f64,
    )
}

/// Neighbour balancing. Every occupied slot is queued once; a cell that moves re-queues its
/// neighbours. The queue is capped at ten pops per slot.
pub(super) fn min_node(run: &mut Run<'_>) {
    let mut queue = VecDeque::with_capacity(run.cache.slot_count());
    let mut queued = vec![false; run.cache.slot_count()];
    for (rank, ids) in run.model.ranks().iter().enumerate() {
        for &id in ids {
            queued[run.cache.slot(id, rank)] = true;
            queue.push_back((id, rank));
        }
    }

    let max_tries = queue.len() * 10;
    let mut tries = 0;
    let intra_cell_spacing = run.options.intra_cell_spacing;
    while tries < max_tries {
        let Some((id, rank)) = queue.pop_front() else {
            break;
        };
        tries += 1;
        queued[run.cache.slot(id, rank)] = false;

        let Some(target) = balance_target(run.model, &run.cache, id, rank) else {
            continue;
        };
        let cell = run.model.cell(id);
        let position = cell.order(rank);
        if (target - cell.working(rank)).abs() <= BALANCE_TOLERANCE
            || !reposition_valid(run.model, intra_cell_spacing, rank, position, target)
        {
            continue;
        }
        run.model.cell_mut(id).set_working(rank, target);

        for &next in run.cache.next_layer(id, rank) {
            let slot = run.cache.slot(next, rank + 1);
            if !queued[slot] {
                queued[slot] = true;
                queue.push_back((next, rank + 1));
            }
        }
        for &previous in run.cache.previous_layer(id, rank) {
            let slot = run.cache.slot(previous, rank - 1);
            if !queued[slot] {
                queued[slot] = true;
                queue.push_back((previous, rank - 1));
            }
        }
    }
}
