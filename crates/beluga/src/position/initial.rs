//! Width/height pass and the initial packing that sweeps out from the widest rank.

use super::Run;
use crate::adapter::LayoutAdapter;
use crate::error::Warning;
use crate::hierarchy::CellId;
use tracing::{debug, warn};

/// Resolves every cell's extent, measures each rank and places the ranks along the primary
/// axis. Cells get a left-packed provisional coordinate.
pub(super) fn calculate_widest_rank<A>(run: &mut Run<'_>, adapter: &A)
where
    A: LayoutAdapter + ?Sized,
{
    let options = run.options;
    let orientation = options.orientation;
    let rank_count = run.model.rank_count();
    run.rank_widths = vec![0.0; rank_count];
    run.widest_rank = None;
    run.widest_rank_value = f64::NEG_INFINITY;

    let mut y = -options.inter_rank_cell_spacing;
    let mut last_max_height = 0.0_f64;
    let mut missing = Vec::new();

    for rank in (0..rank_count).rev() {
        let ids: Vec<CellId> = run.model.rank(rank).to_vec();
        let mut max_height = 0.0_f64;
        let mut local_x = options.initial_x;

        for &id in &ids {
            let vertex = run.model.cell(id).vertex_id().map(str::to_owned);
            let (width, height) = match vertex {
                Some(vertex) => {
                    let size = adapter.vertex_bounds(&vertex).unwrap_or_else(|| {
                        missing.push(vertex.clone());
                        Default::default()
                    });
                    let size = orientation.oriented(size);
                    (size.width, size.height)
                }
                None => {
                    let count = run.real_edge_count(id);
                    ((count - 1) as f64 * options.parallel_edge_spacing, 0.0)
                }
            };
            max_height = max_height.max(height);

            let cell = run.model.cell_mut(id);
            cell.width = width;
            cell.height = height;
            local_x += width / 2.0;
            cell.set_x(rank, local_x);
            cell.set_working(rank, local_x);
            local_x += width / 2.0 + options.intra_cell_spacing;
        }

        run.rank_widths[rank] = local_x;
        if local_x > run.widest_rank_value {
            run.widest_rank_value = local_x;
            run.widest_rank = Some(rank);
        }

        let distance = max_height / 2.0 + last_max_height / 2.0 + options.inter_rank_cell_spacing;
        last_max_height = max_height;
        y += orientation.primary_sign() * distance;
        run.model.set_rank_coordinate(rank, y);
        for &id in &ids {
            run.model.cell_mut(id).set_y(rank, y);
        }
    }

    if let Some(widest) = run.widest_rank {
        debug!(
            widest_rank = widest,
            widest_rank_value = run.widest_rank_value,
            "widest rank"
        );
    }

    if !missing.is_empty() {
        warn!(
            vertices = ?missing,
            "no bounds for {} vertices, laying them out as zero-size",
            missing.len()
        );
        run.warnings.push(Warning::MissingBounds { vertices: missing });
    }
}

/// Centres every rank against the widest one, visiting the widest rank down to rank `0`, then
/// the ranks above it.
pub(super) fn initial_coords(run: &mut Run<'_>) {
    let Some(widest) = run.widest_rank else {
        return;
    };
    let max_rank = run.model.max_rank();
    for rank in (0..=widest).rev().chain(widest + 1..=max_rank) {
        rank_coordinates(run, rank);
    }
}

fn rank_coordinates(run: &mut Run<'_>, rank: usize) {
    let intra_cell_spacing = run.options.intra_cell_spacing;
    let mut local_x =
        run.options.initial_x + (run.widest_rank_value - run.rank_widths[rank]) / 2.0;
    let ids: Vec<CellId> = run.model.rank(rank).to_vec();
    for id in ids {
        let cell = run.model.cell_mut(id);
        local_x += cell.width / 2.0;
        cell.set_x(rank, local_x);
        cell.set_working(rank, local_x);
        local_x += cell.width / 2.0 + intra_cell_spacing;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coordinate_system::Orientation;
    use crate::model::Size;
    use crate::options::CoordinateOptions;
    use crate::position::test_util::{assert_no_overlap, model_with};

    #[test]
    fn narrow_ranks_are_centred_under_the_widest() {
        let (mut model, mut recorder) =
            model_with(&[("a", 1), ("b", 0), ("c", 0)], &[], Size::new(20.0, 40.0));
        recorder.set_bounds("a", Size::new(100.0, 40.0));
        let options = CoordinateOptions::default();
        let mut run = Run::new(&mut model, &options);
        calculate_widest_rank(&mut run, &recorder);
        assert_eq!(run.widest_rank, Some(1));
        assert_eq!(run.widest_rank_value, 130.0);
        assert_eq!(run.rank_widths, vec![100.0, 130.0]);

        initial_coords(&mut run);
        assert_eq!(model.vertex_coordinate("a"), Some(50.0));
        assert_eq!(model.vertex_coordinate("b"), Some(25.0));
        assert_eq!(model.vertex_coordinate("c"), Some(75.0));
        assert_no_overlap(&model, options.intra_cell_spacing);
    }

    #[test]
    fn ranks_advance_along_the_primary_axis() {
        let (mut model, recorder) =
            model_with(&[("a", 1), ("b", 0)], &[("ab", "a", "b")], Size::new(20.0, 40.0));
        let options = CoordinateOptions::default();
        let mut run = Run::new(&mut model, &options);
        calculate_widest_rank(&mut run, &recorder);
        assert_eq!(model.rank_coordinate(1), 20.0);
        assert_eq!(model.rank_coordinate(0), 160.0);

        let options = CoordinateOptions {
            orientation: Orientation::South,
            ..Default::default()
        };
        let mut run = Run::new(&mut model, &options);
        calculate_widest_rank(&mut run, &recorder);
        assert_eq!(model.rank_coordinate(1), -220.0);
        assert_eq!(model.rank_coordinate(0), -360.0);
    }

    #[test]
    fn east_west_layouts_swap_vertex_extents() {
        let (mut model, recorder) = model_with(&[("a", 0)], &[], Size::new(80.0, 20.0));
        let options = CoordinateOptions {
            orientation: Orientation::West,
            ..Default::default()
        };
        let mut run = Run::new(&mut model, &options);
        calculate_widest_rank(&mut run, &recorder);
        let a = model.cell(model.vertex("a").unwrap());
        assert_eq!(a.width(), 20.0);
        assert_eq!(a.height(), 80.0);
    }

    #[test]
    fn parallel_groups_are_as_wide_as_their_fan() {
        let (mut model, recorder) = model_with(
            &[("a", 2), ("b", 0)],
            &[("e1", "a", "b"), ("e2", "a", "b"), ("e3", "b", "a")],
            Size::new(40.0, 40.0),
        );
        let options = CoordinateOptions::default();
        let mut run = Run::new(&mut model, &options);
        calculate_widest_rank(&mut run, &recorder);
        let group = model.rank(1)[0];
        assert_eq!(model.cell(group).width(), 20.0);
        assert_eq!(model.cell(group).height(), 0.0);
    }

    #[test]
    fn missing_bounds_warn_once_per_run() {
        let (mut model, _) = model_with(&[("a", 1), ("b", 0)], &[], Size::default());
        let recorder = crate::adapter::LayoutRecorder::new();
        let options = CoordinateOptions::default();
        let mut run = Run::new(&mut model, &options);
        calculate_widest_rank(&mut run, &recorder);
        assert_eq!(
            run.warnings,
            vec![Warning::MissingBounds {
                vertices: vec!["a".to_string(), "b".to_string()]
            }]
        );
        assert_eq!(model.cell(model.vertex("a").unwrap()).width(), 0.0);
    }
}
