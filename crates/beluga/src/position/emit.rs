//! Jetty placement and emission.
//!
//! Vertices are emitted first so each rank's primary-axis extent is known. Jetties (the short
//! stubs where edges leave and enter a vertex) are then spread along every vertex side, and
//! each real edge gets its point list: source jetty, two channel points per virtual segment,
//! target jetty. Everything is computed in rank-relative space and projected through the
//! orientation on the way out.

use super::Run;
use crate::adapter::LayoutAdapter;
use crate::error::Warning;
use crate::hierarchy::{CellId, JettyEnd, JettyPosition};
use crate::model::Point;
use crate::options::EdgeStyle;
use tracing::warn;

pub(super) fn set_cell_locations<A>(run: &mut Run<'_>, adapter: &mut A)
where
    A: LayoutAdapter + ?Sized,
{
    let rank_count = run.model.rank_count();
    run.rank_top_y = vec![f64::INFINITY; rank_count];
    run.rank_bottom_y = vec![f64::NEG_INFINITY; rank_count];

    let vertices: Vec<CellId> = run.model.vertices().collect();
    for &vertex in &vertices {
        set_vertex_location(run, vertex, adapter);
    }

    let half_buffer = run.options.channel_buffer / 2.0;
    for rank in 0..rank_count {
        if run.rank_top_y[rank] > run.rank_bottom_y[rank] {
            let y = run.model.rank_coordinate(rank);
            run.rank_top_y[rank] = y - half_buffer;
            run.rank_bottom_y[rank] = y + half_buffer;
        }
    }

    local_edge_processing(run, &vertices);

    let edges: Vec<CellId> = run.model.edges().collect();
    for edge in edges {
        set_edge_position(run, edge, adapter);
    }
}

fn set_vertex_location<A>(run: &mut Run<'_>, id: CellId, adapter: &mut A)
where
    A: LayoutAdapter + ?Sized,
{
    let cell = run.model.cell(id);
    let Some(vertex) = cell.vertex_id() else {
        return;
    };
    let rank = cell.min_rank();
    let x = cell.x(rank) - cell.width / 2.0;
    let y = cell.y(rank) - cell.height / 2.0;

    run.rank_top_y[rank] = run.rank_top_y[rank].min(y);
    run.rank_bottom_y[rank] = run.rank_bottom_y[rank].max(y + cell.height);
    run.limit_x = run.limit_x.max(x + cell.width);

    let p = run.options.orientation.project(x, y);
    adapter.set_vertex_location(vertex, p.x, p.y);
}

/// Spreads the jetties of every vertex, separately for the edges leaving towards the rank
/// below (source side) and those arriving from the rank above (target side).
fn local_edge_processing(run: &mut Run<'_>, vertices: &[CellId]) {
    for &vertex in vertices {
        let rank = run.model.cell(vertex).min_rank();
        for source_side in [true, false] {
            let (connected, adjacent) = if source_side {
                if rank == 0 {
                    continue;
                }
                (run.cache.previous_layer(vertex, rank), rank - 1)
            } else {
                (run.cache.next_layer(vertex, rank), rank + 1)
            };
            if connected.is_empty() {
                continue;
            }

            let mut sorted = connected.to_vec();
            sorted.sort_by(|&a, &b| {
                let (a, b) = (run.model.cell(a), run.model.cell(b));
                a.x(adjacent).total_cmp(&b.x(adjacent))
            });

            let cell = run.model.cell(vertex);
            let groups: Vec<CellId> = sorted
                .iter()
                .filter_map(|&other| {
                    if run.model.cell(other).is_edge() {
                        return Some(other);
                    }
                    let candidates = if source_side {
                        cell.connects_as_source()
                    } else {
                        cell.connects_as_target()
                    };
                    candidates.iter().copied().find(|&e| {
                        run.model
                            .cell(e)
                            .edge()
                            .is_some_and(|edge| edge.source() == other || edge.target() == other)
                    })
                })
                .collect();

            let counts: Vec<usize> = groups.iter().map(|&g| run.real_edge_count(g)).collect();
            place_jetties(run, vertex, rank, source_side, &groups, &counts);
        }
    }
}

fn place_jetties(
    run: &mut Run<'_>,
    vertex: CellId,
    rank: usize,
    source_side: bool,
    groups: &[CellId],
    counts: &[usize],
) {
    let options = run.options;
    let sep = options.pref_hoz_edge_sep;
    let total: usize = counts.iter().sum();

    let cell = run.model.cell(vertex);
    let mut left = cell.x(rank) - cell.width / 2.0;
    let mut right = left + cell.width;
    let required = (total + 1) as f64 * sep;
    if cell.width > required + 2.0 * sep {
        left += sep;
        right -= sep;
    }
    let spacing = (right - left) / total as f64;

    let mut current_x = left + spacing / 2.0;
    let mut y_offset = options.min_edge_jetty - options.pref_vert_edge_off;
    let middle = total as f64 / 2.0;

    for (j, (&group, &count)) in groups.iter().zip(counts).enumerate() {
        let j = j as f64;
        if j < middle {
            y_offset += options.pref_vert_edge_off;
        } else if j > middle {
            y_offset -= options.pref_vert_edge_off;
        }

        let Some(edge) = run.model.cell_mut(group).edge_mut() else {
            continue;
        };
        let jetties = edge
            .jetties
            .get_or_insert_with(|| vec![JettyPosition::default(); count]);
        if jetties.len() < count {
            jetties.resize(count, JettyPosition::default());
        }
        for jetty in jetties.iter_mut().take(count) {
            let end = JettyEnd {
                offset: current_x,
                jetty: y_offset,
            };
            if source_side {
                jetty.source = end;
            } else {
                jetty.target = end;
            }
            current_x += spacing;
        }
    }
}

/// Lateral offset of the `index`-th member of a parallel group: `0, +s, -s, +2s, -2s, ...`,
/// shifted by half a step for even group sizes so the fan stays centred on the segment.
fn parallel_offset(index: usize, count: usize, spacing: f64) -> f64 {
    let step = index.div_ceil(2) as f64 * spacing;
    let offset = if index % 2 == 1 { step } else { -step };
    if count % 2 == 0 {
        offset - spacing / 2.0
    } else {
        offset
    }
}

/// Primary-axis midpoint of the channel between `rank` and `rank + 1`.
fn channel_between(run: &Run<'_>, rank: usize) -> f64 {
    if run.options.orientation.is_layout_reversed() {
        (run.rank_bottom_y[rank] + run.rank_top_y[rank + 1]) / 2.0
    } else {
        (run.rank_top_y[rank] + run.rank_bottom_y[rank + 1]) / 2.0
    }
}

fn set_edge_position<A>(run: &mut Run<'_>, id: CellId, adapter: &mut A)
where
    A: LayoutAdapter + ?Sized,
{
    let orientation = run.options.orientation;
    let project = |points: &[Point]| -> Vec<Point> {
        points
            .iter()
            .map(|p| orientation.project(p.x, p.y))
            .collect()
    };

    let cell = run.model.cell(id);
    let Some(edge) = cell.edge() else {
        return;
    };
    if edge.is_processed() {
        for (real, points) in &edge.emitted {
            adapter.set_edge_points(real, project(points));
            for p in points {
                run.limit_x = run.limit_x.max(p.x);
            }
        }
        return;
    }

    let (mut min_rank, mut max_rank) = (cell.min_rank(), cell.max_rank());
    if min_rank == max_rank {
        let source_rank = run.model.cell(edge.source()).max_rank();
        let target_rank = run.model.cell(edge.target()).min_rank();
        warn!(
            cell = id.index(),
            rank = min_rank,
            source_rank,
            target_rank,
            "edge spans no ranks, deriving its span from its terminals"
        );
        run.warnings.push(Warning::DegenerateSpan {
            cell: id.index(),
            min_rank,
            max_rank,
        });
        min_rank = target_rank;
        max_rank = source_rank;
    }

    let cell = run.model.cell(id);
    let Some(edge) = cell.edge() else {
        return;
    };
    if edge.real_edges().is_empty() {
        run.flag_inconsistent(id);
        if let Some(edge) = run.model.cell_mut(id).edge_mut() {
            edge.processed = true;
        }
        return;
    }

    let layout_reversed = orientation.is_layout_reversed();
    let curve = run.options.edge_style == EdgeStyle::Curve;
    let spacing = run.options.parallel_edge_spacing;
    let count = edge.real_edges().len();
    let top = &run.rank_top_y;
    let bottom = &run.rank_bottom_y;
    let mut limit_x = run.limit_x;
    let mut emitted = Vec::with_capacity(count);

    for (index, real) in edge.real_edges().iter().enumerate() {
        let reversed = !real.forward;
        let jetty = edge.jetties().and_then(|jetties| jetties.get(index));
        let offset = parallel_offset(index, count, spacing);
        let mut points = Vec::new();

        if let Some(jetty) = jetty {
            let (end, base) = if reversed {
                let base = if layout_reversed {
                    bottom[min_rank]
                } else {
                    top[min_rank]
                };
                (jetty.target, base)
            } else {
                let base = if layout_reversed {
                    top[max_rank]
                } else {
                    bottom[max_rank]
                };
                (jetty.source, base)
            };
            let length = if reversed != layout_reversed {
                -end.jetty
            } else {
                end.jetty
            };
            let y = base + length;
            points.push(Point::new(end.offset, y));
            if curve {
                points.push(Point::new(end.offset, y + length));
            }
            limit_x = limit_x.max(end.offset);
        }

        let ranks: Vec<usize> = if reversed {
            cell.occupied_ranks().collect()
        } else {
            cell.occupied_ranks().rev().collect()
        };
        for rank in ranks {
            let x = cell.x(rank) + offset;
            let mut upper = channel_between(run, rank);
            let mut lower = channel_between(run, rank - 1);
            if reversed {
                std::mem::swap(&mut upper, &mut lower);
            }
            points.push(Point::new(x, upper));
            points.push(Point::new(x, lower));
            limit_x = limit_x.max(x);
        }

        if let Some(jetty) = jetty {
            let (end, rank_y) = if reversed {
                let rank_y = if layout_reversed {
                    top[max_rank]
                } else {
                    bottom[max_rank]
                };
                (jetty.source, rank_y)
            } else {
                let rank_y = if layout_reversed {
                    bottom[min_rank]
                } else {
                    top[min_rank]
                };
                (jetty.target, rank_y)
            };
            let length = if reversed != layout_reversed {
                -end.jetty
            } else {
                end.jetty
            };
            let y = rank_y - length;
            if curve {
                points.push(Point::new(end.offset, y - length));
            }
            points.push(Point::new(end.offset, y));
            limit_x = limit_x.max(end.offset);
        }

        adapter.set_edge_points(&real.id, project(&points));
        emitted.push((real.id.clone(), points));
    }

    run.limit_x = limit_x;
    if let Some(edge) = run.model.cell_mut(id).edge_mut() {
        edge.emitted = emitted;
        edge.processed = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::LayoutRecorder;
    use crate::coordinate_system::Orientation;
    use crate::hierarchy::HierarchyModel;
    use crate::hierarchy::test_support::{cell_id, edge_cell, vertex_cell};
    use crate::model::Size;
    use crate::options::CoordinateOptions;
    use crate::position::test_util::model_with;
    use crate::position::{assign_coordinates, emit_layout};

    #[test]
    fn parallel_offsets_fan_out_symmetrically() {
        let s = 10.0;
        assert_eq!(parallel_offset(0, 1, s), 0.0);
        assert_eq!(
            (0..3).map(|i| parallel_offset(i, 3, s)).collect::<Vec<_>>(),
            vec![0.0, 10.0, -10.0]
        );
        assert_eq!(
            (0..2).map(|i| parallel_offset(i, 2, s)).collect::<Vec<_>>(),
            vec![-5.0, 5.0]
        );
        assert_eq!(
            (0..4).map(|i| parallel_offset(i, 4, s)).collect::<Vec<_>>(),
            vec![-5.0, 5.0, -15.0, 15.0]
        );
    }

    #[test]
    fn vertices_are_emitted_by_their_top_left_corner() {
        let (mut model, mut recorder) =
            model_with(&[("a", 1), ("b", 0)], &[("ab", "a", "b")], Size::new(40.0, 20.0));
        let options = CoordinateOptions::default();
        assign_coordinates(&mut model, &options, &mut recorder);
        let a = recorder.result().vertices["a"];
        let b = recorder.result().vertices["b"];
        assert_eq!(a, Point::new(0.0, 0.0));
        assert_eq!(b, Point::new(0.0, 120.0));
    }

    #[test]
    fn short_edges_run_jetty_to_jetty() {
        let (mut model, mut recorder) =
            model_with(&[("a", 1), ("b", 0)], &[("ab", "a", "b")], Size::new(40.0, 20.0));
        let options = CoordinateOptions::default();
        assign_coordinates(&mut model, &options, &mut recorder);
        // Single stub centred on a 40 wide vertex, jetty 12 below a (bottom 20) and above b
        // (top 120).
        assert_eq!(
            recorder.result().edges["ab"],
            vec![Point::new(20.0, 32.0), Point::new(20.0, 108.0)]
        );
    }

    #[test]
    fn reversed_edges_start_at_the_lower_rank() {
        let (mut model, mut recorder) =
            model_with(&[("a", 1), ("b", 0)], &[("ba", "b", "a")], Size::new(40.0, 20.0));
        let options = CoordinateOptions::default();
        assign_coordinates(&mut model, &options, &mut recorder);
        assert_eq!(
            recorder.result().edges["ba"],
            vec![Point::new(20.0, 108.0), Point::new(20.0, 32.0)]
        );
    }

    #[test]
    fn curve_style_adds_control_points() {
        let (mut model, mut recorder) =
            model_with(&[("a", 1), ("b", 0)], &[("ab", "a", "b")], Size::new(40.0, 20.0));
        let options = CoordinateOptions {
            edge_style: EdgeStyle::Curve,
            ..Default::default()
        };
        assign_coordinates(&mut model, &options, &mut recorder);
        assert_eq!(
            recorder.result().edges["ab"],
            vec![
                Point::new(20.0, 32.0),
                Point::new(20.0, 44.0),
                Point::new(20.0, 96.0),
                Point::new(20.0, 108.0),
            ]
        );
    }

    #[test]
    fn emission_is_idempotent() {
        let (mut model, mut first) = model_with(
            &[("a", 2), ("b", 0)],
            &[("e1", "a", "b"), ("e2", "a", "b"), ("e3", "b", "a")],
            Size::new(60.0, 30.0),
        );
        let options = CoordinateOptions::default();
        let report = assign_coordinates(&mut model, &options, &mut first);
        assert!(model.edges().all(|e| model.cell(e).edge().unwrap().is_processed()));

        let mut second = LayoutRecorder::new();
        let limit_x = emit_layout(&mut model, &options, &mut second);
        assert_eq!(first.result(), second.result());
        assert_eq!(limit_x, report.limit_x);
    }

    #[test]
    fn degenerate_spans_are_rederived_from_terminals() {
        let mut cells = vec![
            vertex_cell("a", 1),
            vertex_cell("b", 0),
            edge_cell(0, 1, 1, 1, &["e"]),
        ];
        cells[0].connects_as_source.push(cell_id(2));
        cells[1].connects_as_target.push(cell_id(2));
        let ranks = vec![vec![cell_id(1)], vec![cell_id(0)]];
        let mut model = HierarchyModel::from_parts(cells, ranks);
        let mut recorder = LayoutRecorder::with_bounds([
            ("a", Size::new(40.0, 20.0)),
            ("b", Size::new(40.0, 20.0)),
        ]);
        let report = assign_coordinates(&mut model, &CoordinateOptions::default(), &mut recorder);
        assert_eq!(
            report.warnings,
            vec![Warning::DegenerateSpan {
                cell: 2,
                min_rank: 1,
                max_rank: 1
            }]
        );
        // Jetties hang off a's bottom (20) and b's top (120), the ranks of its terminals.
        assert_eq!(
            recorder.result().edges["e"],
            vec![Point::new(20.0, 32.0), Point::new(20.0, 108.0)]
        );
    }

    #[test]
    fn empty_groups_are_treated_as_single_edges() {
        let cells = vec![
            vertex_cell("a", 2),
            vertex_cell("b", 0),
            edge_cell(0, 1, 0, 2, &[]),
        ];
        let ranks = vec![vec![cell_id(1)], vec![cell_id(2)], vec![cell_id(0)]];
        let mut model = HierarchyModel::from_parts(cells, ranks);
        let mut recorder = LayoutRecorder::with_bounds([
            ("a", Size::new(40.0, 20.0)),
            ("b", Size::new(40.0, 20.0)),
        ]);
        let report = assign_coordinates(&mut model, &CoordinateOptions::default(), &mut recorder);
        assert_eq!(
            report.warnings,
            vec![Warning::InconsistentEdgeData { cell: 2 }]
        );
        assert_eq!(model.cell(cell_id(2)).width(), 0.0);
        assert!(recorder.result().edges.is_empty());
    }

    #[test]
    fn east_layouts_project_onto_x() {
        let (mut model, mut recorder) =
            model_with(&[("a", 1), ("b", 0)], &[("ab", "a", "b")], Size::new(20.0, 40.0));
        let options = CoordinateOptions {
            orientation: Orientation::East,
            ..Default::default()
        };
        assign_coordinates(&mut model, &options, &mut recorder);
        let a = recorder.result().vertices["a"];
        let b = recorder.result().vertices["b"];
        // Ranks now advance towards negative x; both vertices share the same y.
        assert_eq!(a.y, b.y);
        assert!(b.x < a.x);
        let points = &recorder.result().edges["ab"];
        assert!(points.windows(2).all(|w| w[1].x < w[0].x));
    }
}
