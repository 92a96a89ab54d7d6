//! Coordinate assignment.
//!
//! One layout run is a linear pipeline over a [`HierarchyModel`]:
//!
//! 1. width/height pass and initial packing (`initial`),
//! 2. median sweeps and neighbour balancing (`median`), repeated `max_iterations` times with
//!    the best assignment kept,
//! 3. edge straightening (`straighten`) after every sweep pair,
//! 4. jetty placement and emission through the [`LayoutAdapter`] (`emit`).
//!
//! Every pass works in rank-relative space (secondary axis along a rank, primary axis across
//! ranks). Orientation is applied only when sizes come in and when geometry goes out.

use crate::adapter::LayoutAdapter;
use crate::error::Warning;
use crate::hierarchy::{CellId, ConnectionCache, HierarchyModel};
use crate::options::CoordinateOptions;
use rustc_hash::FxHashSet as HashSet;
use serde::Serialize;
use tracing::{debug, warn};

mod emit;
mod initial;
mod median;
mod straighten;

/// Summary of one layout run.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CoordinateReport {
    /// Median sweep pairs run. Always `max_iterations`, or `0` without fine tuning.
    pub sweep_pairs: usize,
    pub widest_rank: Option<usize>,
    pub widest_rank_value: f64,
    /// Largest secondary-axis coordinate reached by a vertex box or an edge point.
    pub limit_x: f64,
    pub warnings: Vec<Warning>,
}

/// Assigns coordinates to every cell of `model` and emits vertex locations and edge points
/// through `adapter`.
pub fn assign_coordinates<A>(
    model: &mut HierarchyModel,
    options: &CoordinateOptions,
    adapter: &mut A,
) -> CoordinateReport
where
    A: LayoutAdapter + ?Sized,
{
    model.reset_emission();
    let mut run = Run::new(model, options);
    initial::calculate_widest_rank(&mut run, &*adapter);
    initial::initial_coords(&mut run);
    let sweep_pairs = if options.fine_tuning {
        run.iterate()
    } else {
        0
    };
    emit::set_cell_locations(&mut run, adapter);
    run.into_report(sweep_pairs)
}

/// Lays out disconnected hierarchies side by side. Each one starts `inter_hierarchy_spacing`
/// past the extent reached by the previous one.
pub fn layout_hierarchies<A>(
    models: &mut [HierarchyModel],
    options: &CoordinateOptions,
    adapter: &mut A,
) -> Vec<CoordinateReport>
where
    A: LayoutAdapter + ?Sized,
{
    let mut current = options.clone();
    let mut reports = Vec::with_capacity(models.len());
    for model in models.iter_mut() {
        let report = assign_coordinates(model, &current, adapter);
        current.initial_x = report.limit_x + options.inter_hierarchy_spacing;
        reports.push(report);
    }
    reports
}

/// Re-emits the geometry of an already laid out model.
///
/// Edges emitted before replay their recorded point lists. Returns the secondary-axis extent
/// reached.
pub fn emit_layout<A>(
    model: &mut HierarchyModel,
    options: &CoordinateOptions,
    adapter: &mut A,
) -> f64
where
    A: LayoutAdapter + ?Sized,
{
    let mut run = Run::new(model, options);
    emit::set_cell_locations(&mut run, adapter);
    run.limit_x
}

/// State of one layout run.
pub(crate) struct Run<'a> {
    model: &'a mut HierarchyModel,
    options: &'a CoordinateOptions,
    cache: ConnectionCache,
    rank_widths: Vec<f64>,
    widest_rank: Option<usize>,
    widest_rank_value: f64,
    rank_top_y: Vec<f64>,
    rank_bottom_y: Vec<f64>,
    limit_x: f64,
    warnings: Vec<Warning>,
    inconsistent: HashSet<CellId>,
}

impl<'a> Run<'a> {
    pub(crate) fn new(model: &'a mut HierarchyModel, options: &'a CoordinateOptions) -> Self {
        let cache = ConnectionCache::new(model);
        Self {
            model,
            options,
            cache,
            rank_widths: Vec::new(),
            widest_rank: None,
            widest_rank_value: 0.0,
            rank_top_y: Vec::new(),
            rank_bottom_y: Vec::new(),
            limit_x: options.initial_x,
            warnings: Vec::new(),
            inconsistent: HashSet::default(),
        }
    }

    fn iterate(&mut self) -> usize {
        median::min_node(self);
        commit(self.model);
        let mut best = assignment_cost(self.model, &self.cache);

        for iteration in 0..self.options.max_iterations {
            median::median_pos(self);
            median::min_node(self);

            let cost = assignment_cost(self.model, &self.cache);
            if cost < best {
                commit(self.model);
                best = cost;
            } else {
                restore(self.model);
            }
            debug!(iteration, cost, best, "median sweep pair");

            straighten::min_path(self);
            best = assignment_cost(self.model, &self.cache);
        }
        self.options.max_iterations
    }

    /// Real edges aggregated by a hierarchical edge, counting an empty group as one.
    fn real_edge_count(&mut self, id: CellId) -> usize {
        let count = self
            .model
            .cell(id)
            .edge()
            .map_or(0, |edge| edge.real_edges().len());
        if count == 0 {
            self.flag_inconsistent(id);
            1
        } else {
            count
        }
    }

    fn flag_inconsistent(&mut self, id: CellId) {
        if self.inconsistent.insert(id) {
            warn!(
                cell = id.index(),
                "hierarchical edge aggregates no real edges, treating it as a single edge"
            );
            self.warnings
                .push(Warning::InconsistentEdgeData { cell: id.index() });
        }
    }

    fn into_report(self, sweep_pairs: usize) -> CoordinateReport {
        CoordinateReport {
            sweep_pairs,
            widest_rank: self.widest_rank,
            widest_rank_value: if self.widest_rank.is_some() {
                self.widest_rank_value
            } else {
                0.0
            },
            limit_x: self.limit_x,
            warnings: self.warnings,
        }
    }
}

/// Whether the cell at `position` in `rank` may move to `value` without closing the gap to
/// its neighbour on that side. Moves outward from either end of a rank are always valid.
pub(crate) fn reposition_valid(
    model: &HierarchyModel,
    intra_cell_spacing: f64,
    rank: usize,
    position: usize,
    value: f64,
) -> bool {
    let ids = model.rank(rank);
    let cell = model.cell(ids[position]);
    let current = cell.working(rank);

    if value < current {
        let Some(&left) = position.checked_sub(1).and_then(|p| ids.get(p)) else {
            return true;
        };
        let left = model.cell(left);
        let limit = left.working(rank) + left.width / 2.0 + intra_cell_spacing + cell.width / 2.0;
        value >= limit
    } else if value > current {
        let Some(&right) = ids.get(position + 1) else {
            return true;
        };
        let right = model.cell(right);
        let limit = right.working(rank) - right.width / 2.0 - intra_cell_spacing - cell.width / 2.0;
        value <= limit
    } else {
        true
    }
}

/// Total deviation of the working assignment: for every occupied slot, the distance to each
/// cell it connects to on the next rank.
pub(crate) fn assignment_cost(model: &HierarchyModel, cache: &ConnectionCache) -> f64 {
    let mut cost = 0.0;
    for (id, cell) in model.cells() {
        for rank in cell.occupied_ranks() {
            let x = cell.working(rank);
            for &next in cache.next_layer(id, rank) {
                cost += (x - model.cell(next).working(rank + 1)).abs();
            }
        }
    }
    cost
}

fn commit(model: &mut HierarchyModel) {
    for cell in model.cells_mut() {
        cell.x.clone_from(&cell.working);
    }
}

fn restore(model: &mut HierarchyModel) {
    for cell in model.cells_mut() {
        cell.working.clone_from(&cell.x);
    }
}

#[cfg(test)]
pub(crate) mod test_util {
    use crate::adapter::LayoutRecorder;
    use crate::hierarchy::{HierarchyBuilder, HierarchyModel};
    use crate::model::Size;

    /// Builds a model from `(id, rank)` vertices and `(id, from, to)` edges, all vertices
    /// `size` large.
    pub(crate) fn model_with(
        vertices: &[(&str, usize)],
        edges: &[(&str, &str, &str)],
        size: Size,
    ) -> (HierarchyModel, LayoutRecorder) {
        let mut builder = HierarchyBuilder::new();
        let mut recorder = LayoutRecorder::new();
        for &(id, rank) in vertices {
            builder.add_vertex(id, rank).unwrap();
            recorder.set_bounds(id, size);
        }
        for &(id, from, to) in edges {
            builder.connect(id, from, to).unwrap();
        }
        (builder.build().unwrap(), recorder)
    }

    /// Asserts the minimum gap between every pair of neighbours, on working coordinates.
    pub(crate) fn assert_no_overlap(model: &HierarchyModel, intra_cell_spacing: f64) {
        for (rank, ids) in model.ranks().iter().enumerate() {
            for pair in ids.windows(2) {
                let (left, right) = (model.cell(pair[0]), model.cell(pair[1]));
                let gap = right.working(rank) - right.width() / 2.0
                    - (left.working(rank) + left.width() / 2.0);
                assert!(
                    gap + 1e-9 >= intra_cell_spacing,
                    "rank {rank}: gap {gap} between {:?} and {:?}",
                    pair[0],
                    pair[1]
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::test_util::{assert_no_overlap, model_with};
    use super::*;
    use crate::model::Size;

    fn fan_model() -> (HierarchyModel, crate::adapter::LayoutRecorder) {
        model_with(
            &[("r", 2), ("a", 1), ("b", 1), ("c", 1), ("x", 0), ("y", 0)],
            &[
                ("ra", "r", "a"),
                ("rb", "r", "b"),
                ("rc", "r", "c"),
                ("ax", "a", "x"),
                ("cy", "c", "y"),
                ("ry", "r", "y"),
            ],
            Size::new(40.0, 30.0),
        )
    }

    #[test]
    fn reposition_respects_neighbours() {
        let (mut model, recorder) = fan_model();
        let options = CoordinateOptions::default();
        let mut run = Run::new(&mut model, &options);
        initial::calculate_widest_rank(&mut run, &recorder);
        initial::initial_coords(&mut run);

        let model = &*run.model;
        let ids = model.rank(1).to_vec();
        let b = model.cell(ids[1]);
        let b_x = b.working(1);
        let a = model.cell(ids[0]);
        let limit = a.working(1) + a.width() / 2.0 + 30.0 + b.width() / 2.0;
        assert!(reposition_valid(model, 30.0, 1, 1, limit));
        assert!(!reposition_valid(model, 30.0, 1, 1, limit - 0.5));
        assert!(reposition_valid(model, 30.0, 1, 1, b_x));
        assert!(reposition_valid(model, 30.0, 1, 0, -1.0e6));
        let last = ids.len() - 1;
        assert!(reposition_valid(model, 30.0, 1, last, 1.0e6));
    }

    #[test]
    fn runs_exactly_max_iterations_sweep_pairs() {
        for max_iterations in [0, 1, 8, 13] {
            let (mut model, mut recorder) = fan_model();
            let options = CoordinateOptions {
                max_iterations,
                ..Default::default()
            };
            let report = assign_coordinates(&mut model, &options, &mut recorder);
            assert_eq!(report.sweep_pairs, max_iterations);
        }
    }

    #[test]
    fn fine_tuning_off_keeps_initial_packing() {
        let (mut model, mut recorder) = fan_model();
        let options = CoordinateOptions {
            fine_tuning: false,
            ..Default::default()
        };
        let report = assign_coordinates(&mut model, &options, &mut recorder);
        assert_eq!(report.sweep_pairs, 0);
        // Rank 1 is the widest; its three vertices are packed from zero.
        assert_eq!(model.vertex_coordinate("a"), Some(20.0));
        assert_eq!(model.vertex_coordinate("b"), Some(90.0));
        assert_eq!(model.vertex_coordinate("c"), Some(160.0));
    }

    #[test]
    fn layout_keeps_order_and_spacing() {
        let (mut model, mut recorder) = fan_model();
        let options = CoordinateOptions::default();
        assign_coordinates(&mut model, &options, &mut recorder);
        assert_no_overlap(&model, options.intra_cell_spacing);
        for (rank, ids) in model.ranks().iter().enumerate() {
            for (i, &id) in ids.iter().enumerate() {
                assert_eq!(model.cell(id).order(rank), i);
            }
        }
    }

    #[test]
    fn iteration_leaves_working_and_committed_in_sync() {
        let (mut model, recorder) = fan_model();
        let options = CoordinateOptions::default();
        let mut run = Run::new(&mut model, &options);
        initial::calculate_widest_rank(&mut run, &recorder);
        initial::initial_coords(&mut run);
        run.iterate();
        for (_, cell) in run.model.cells() {
            for rank in cell.occupied_ranks() {
                assert_eq!(cell.x(rank), cell.working(rank));
            }
        }
    }
}
