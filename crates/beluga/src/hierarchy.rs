//! Rank model consumed by the coordinate assignment passes.
//!
//! Ranks follow the layering convention where rank `0` holds sinks and the highest rank holds
//! sources. Every rank occupant is a [`Cell`] in one arena: either a vertex, occupying exactly
//! one rank, or a hierarchical edge, occupying every rank strictly between its terminals as a
//! virtual edge segment. Rank order is fixed when the model is built; the passes only ever
//! move coordinates.

mod connections;

pub use connections::ConnectionCache;

use crate::error::{Error, Result};
use crate::model::Point;
use rustc_hash::FxHashMap as HashMap;
use std::collections::BTreeMap;
use std::ops::Range;

/// Highest rank a vertex may be placed on. Every rank up to the highest one used is
/// allocated, so ranks are expected to be dense.
pub const MAX_RANK: usize = u16::MAX as usize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CellId(usize);

impl CellId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// One real graph edge aggregated into a hierarchical edge.
#[derive(Debug, Clone, PartialEq)]
pub struct RealEdge {
    pub id: String,
    /// Whether this edge's own source is the hierarchical source (the higher-rank terminal).
    pub forward: bool,
}

/// Where one end of a real edge leaves its terminal: `offset` is the secondary-axis coordinate
/// of the stub, `jetty` its primary-axis length measured from the rank boundary.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct JettyEnd {
    pub offset: f64,
    pub jetty: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct JettyPosition {
    pub source: JettyEnd,
    pub target: JettyEnd,
}

#[derive(Debug, Clone)]
pub struct EdgeCell {
    pub(crate) source: CellId,
    pub(crate) target: CellId,
    pub(crate) reversed: bool,
    pub(crate) real_edges: Vec<RealEdge>,
    pub(crate) jetties: Option<Vec<JettyPosition>>,
    pub(crate) processed: bool,
    pub(crate) emitted: Vec<(String, Vec<Point>)>,
}

impl EdgeCell {
    fn new(source: CellId, target: CellId, reversed: bool) -> Self {
        Self {
            source,
            target,
            reversed,
            real_edges: Vec::new(),
            jetties: None,
            processed: false,
            emitted: Vec::new(),
        }
    }

    pub fn source(&self) -> CellId {
        self.source
    }

    pub fn target(&self) -> CellId {
        self.target
    }

    /// Whether the first real edge runs against the rank order (from the lower rank up).
    pub fn is_reversed(&self) -> bool {
        self.reversed
    }

    pub fn real_edges(&self) -> &[RealEdge] {
        &self.real_edges
    }

    pub fn jetties(&self) -> Option<&[JettyPosition]> {
        self.jetties.as_deref()
    }

    pub fn is_processed(&self) -> bool {
        self.processed
    }
}

#[derive(Debug, Clone)]
pub enum CellKind {
    Vertex { id: String },
    Edge(EdgeCell),
}

#[derive(Debug, Clone)]
pub struct Cell {
    pub(crate) kind: CellKind,
    pub(crate) min_rank: usize,
    pub(crate) max_rank: usize,
    pub(crate) width: f64,
    pub(crate) height: f64,
    // One entry per occupied rank, see `slot`.
    pub(crate) x: Vec<f64>,
    pub(crate) working: Vec<f64>,
    pub(crate) y: Vec<f64>,
    pub(crate) order: Vec<usize>,
    pub(crate) connects_as_source: Vec<CellId>,
    pub(crate) connects_as_target: Vec<CellId>,
}

impl Cell {
    fn new_vertex(id: String, rank: usize) -> Self {
        Self::with_kind(CellKind::Vertex { id }, rank, rank)
    }

    fn new_edge(edge: EdgeCell, min_rank: usize, max_rank: usize) -> Self {
        Self::with_kind(CellKind::Edge(edge), min_rank, max_rank)
    }

    fn with_kind(kind: CellKind, min_rank: usize, max_rank: usize) -> Self {
        let mut cell = Self {
            kind,
            min_rank,
            max_rank,
            width: 0.0,
            height: 0.0,
            x: Vec::new(),
            working: Vec::new(),
            y: Vec::new(),
            order: Vec::new(),
            connects_as_source: Vec::new(),
            connects_as_target: Vec::new(),
        };
        let slots = cell.occupied_ranks().len();
        cell.x = vec![0.0; slots];
        cell.working = vec![0.0; slots];
        cell.y = vec![0.0; slots];
        cell.order = vec![0; slots];
        cell
    }

    pub fn kind(&self) -> &CellKind {
        &self.kind
    }

    pub fn is_vertex(&self) -> bool {
        matches!(self.kind, CellKind::Vertex { .. })
    }

    pub fn is_edge(&self) -> bool {
        matches!(self.kind, CellKind::Edge(_))
    }

    pub fn vertex_id(&self) -> Option<&str> {
        match &self.kind {
            CellKind::Vertex { id } => Some(id.as_str()),
            CellKind::Edge(_) => None,
        }
    }

    pub fn edge(&self) -> Option<&EdgeCell> {
        match &self.kind {
            CellKind::Edge(e) => Some(e),
            CellKind::Vertex { .. } => None,
        }
    }

    pub(crate) fn edge_mut(&mut self) -> Option<&mut EdgeCell> {
        match &mut self.kind {
            CellKind::Edge(e) => Some(e),
            CellKind::Vertex { .. } => None,
        }
    }

    pub fn min_rank(&self) -> usize {
        self.min_rank
    }

    pub fn max_rank(&self) -> usize {
        self.max_rank
    }

    /// Secondary-axis extent, resolved by the width pass.
    pub fn width(&self) -> f64 {
        self.width
    }

    /// Primary-axis extent, resolved by the width pass.
    pub fn height(&self) -> f64 {
        self.height
    }

    pub fn occupied_ranks(&self) -> Range<usize> {
        match self.kind {
            CellKind::Vertex { .. } => self.min_rank..self.min_rank + 1,
            CellKind::Edge(_) => {
                let first = self.min_rank + 1;
                first..self.max_rank.max(first)
            }
        }
    }

    pub fn occupies(&self, rank: usize) -> bool {
        self.occupied_ranks().contains(&rank)
    }

    fn slot(&self, rank: usize) -> usize {
        debug_assert!(self.occupies(rank), "cell does not occupy rank {rank}");
        rank - self.occupied_ranks().start
    }

    /// Committed secondary-axis coordinate at `rank`.
    pub fn x(&self, rank: usize) -> f64 {
        self.x[self.slot(rank)]
    }

    /// Primary-axis coordinate at `rank`.
    pub fn y(&self, rank: usize) -> f64 {
        self.y[self.slot(rank)]
    }

    /// Position within the rank's order.
    pub fn order(&self, rank: usize) -> usize {
        self.order[self.slot(rank)]
    }

    pub(crate) fn working(&self, rank: usize) -> f64 {
        self.working[self.slot(rank)]
    }

    pub(crate) fn set_x(&mut self, rank: usize, value: f64) {
        let slot = self.slot(rank);
        self.x[slot] = value;
    }

    pub(crate) fn set_working(&mut self, rank: usize, value: f64) {
        let slot = self.slot(rank);
        self.working[slot] = value;
    }

    pub(crate) fn set_y(&mut self, rank: usize, value: f64) {
        let slot = self.slot(rank);
        self.y[slot] = value;
    }

    /// Hierarchical edges this vertex is the (higher-rank) source of.
    pub fn connects_as_source(&self) -> &[CellId] {
        &self.connects_as_source
    }

    /// Hierarchical edges this vertex is the (lower-rank) target of.
    pub fn connects_as_target(&self) -> &[CellId] {
        &self.connects_as_target
    }
}

#[derive(Debug, Clone, Default)]
pub struct HierarchyModel {
    cells: Vec<Cell>,
    ranks: Vec<Vec<CellId>>,
    rank_y: Vec<f64>,
    vertex_index: HashMap<String, CellId>,
}

impl HierarchyModel {
    pub fn rank_count(&self) -> usize {
        self.ranks.len()
    }

    pub fn max_rank(&self) -> usize {
        self.ranks.len().saturating_sub(1)
    }

    pub fn rank(&self, rank: usize) -> &[CellId] {
        &self.ranks[rank]
    }

    pub fn ranks(&self) -> &[Vec<CellId>] {
        &self.ranks
    }

    pub fn cell(&self, id: CellId) -> &Cell {
        &self.cells[id.0]
    }

    pub(crate) fn cell_mut(&mut self, id: CellId) -> &mut Cell {
        &mut self.cells[id.0]
    }

    /// Primary-axis coordinate of `rank`, as placed by the last layout run.
    pub fn rank_coordinate(&self, rank: usize) -> f64 {
        self.rank_y[rank]
    }

    pub(crate) fn set_rank_coordinate(&mut self, rank: usize, y: f64) {
        self.rank_y[rank] = y;
    }

    pub(crate) fn cells_mut(&mut self) -> impl Iterator<Item = &mut Cell> {
        self.cells.iter_mut()
    }

    /// Forgets jetties and cached point lists so the next emission recomputes them.
    pub(crate) fn reset_emission(&mut self) {
        for cell in &mut self.cells {
            if let Some(edge) = cell.edge_mut() {
                edge.jetties = None;
                edge.processed = false;
                edge.emitted.clear();
            }
        }
    }

    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    pub fn cells(&self) -> impl Iterator<Item = (CellId, &Cell)> {
        self.cells.iter().enumerate().map(|(i, c)| (CellId(i), c))
    }

    pub fn vertex(&self, id: &str) -> Option<CellId> {
        self.vertex_index.get(id).copied()
    }

    pub fn vertices(&self) -> impl Iterator<Item = CellId> + '_ {
        self.cells().filter(|(_, c)| c.is_vertex()).map(|(id, _)| id)
    }

    pub fn edges(&self) -> impl Iterator<Item = CellId> + '_ {
        self.cells().filter(|(_, c)| c.is_edge()).map(|(id, _)| id)
    }

    /// Committed secondary-axis coordinate (center) of a vertex.
    pub fn vertex_coordinate(&self, id: &str) -> Option<f64> {
        let cell = self.cell(self.vertex(id)?);
        Some(cell.x(cell.min_rank))
    }

    /// Cells on rank `rank + 1` reachable from `cell` through a hierarchical edge.
    pub fn next_layer_connected(&self, cell: CellId, rank: usize) -> Vec<CellId> {
        let mut out = Vec::new();
        self.collect_next_layer(cell, rank, &mut out);
        out
    }

    /// Cells on rank `rank - 1` reachable from `cell` through a hierarchical edge.
    pub fn previous_layer_connected(&self, cell: CellId, rank: usize) -> Vec<CellId> {
        let mut out = Vec::new();
        self.collect_previous_layer(cell, rank, &mut out);
        out
    }

    fn collect_next_layer(&self, id: CellId, rank: usize, out: &mut Vec<CellId>) {
        let cell = self.cell(id);
        match &cell.kind {
            CellKind::Vertex { .. } => {
                for &e in &cell.connects_as_target {
                    let edge_cell = self.cell(e);
                    match edge_cell.edge() {
                        Some(edge)
                            if edge_cell.max_rank == rank + 1 || spans_no_rank(edge_cell) =>
                        {
                            out.push(edge.source)
                        }
                        Some(_) => out.push(e),
                        None => {}
                    }
                }
            }
            CellKind::Edge(edge) => {
                if rank + 1 == cell.max_rank {
                    out.push(edge.source);
                } else {
                    out.push(id);
                }
            }
        }
    }

    fn collect_previous_layer(&self, id: CellId, rank: usize, out: &mut Vec<CellId>) {
        let cell = self.cell(id);
        match &cell.kind {
            CellKind::Vertex { .. } => {
                for &e in &cell.connects_as_source {
                    let edge_cell = self.cell(e);
                    match edge_cell.edge() {
                        Some(edge)
                            if edge_cell.min_rank + 1 == rank || spans_no_rank(edge_cell) =>
                        {
                            out.push(edge.target)
                        }
                        Some(_) => out.push(e),
                        None => {}
                    }
                }
            }
            CellKind::Edge(edge) => {
                if rank == cell.min_rank + 1 {
                    out.push(edge.target);
                } else {
                    out.push(id);
                }
            }
        }
    }

    #[cfg(test)]
    pub(crate) fn from_parts(cells: Vec<Cell>, ranks: Vec<Vec<CellId>>) -> Self {
        let mut model = Self {
            rank_y: vec![0.0; ranks.len()],
            cells,
            ranks,
            vertex_index: HashMap::default(),
        };
        for (i, cell) in model.cells.iter().enumerate() {
            if let CellKind::Vertex { id } = &cell.kind {
                model.vertex_index.insert(id.clone(), CellId(i));
            }
        }
        model.assign_order();
        model
    }

    fn assign_order(&mut self) {
        for (rank, ids) in self.ranks.iter().enumerate() {
            for (i, id) in ids.iter().enumerate() {
                let cell = &mut self.cells[id.0];
                let slot = cell.slot(rank);
                cell.order[slot] = i;
            }
        }
    }
}

// An edge without intermediate ranks links its terminals directly.
fn spans_no_rank(cell: &Cell) -> bool {
    cell.occupied_ranks().is_empty()
}

/// Builds a [`HierarchyModel`] from vertices with known ranks and the real edges between them.
///
/// Real edges connecting the same pair of vertices are grouped into one hierarchical edge
/// (a parallel group). Rank order defaults to insertion order: a vertex takes its slot when
/// added, an edge takes its slots on every intermediate rank when its group is created.
#[derive(Debug, Default)]
pub struct HierarchyBuilder {
    cells: Vec<Cell>,
    vertex_index: HashMap<String, CellId>,
    edge_index: HashMap<String, CellId>,
    groups: HashMap<(CellId, CellId), CellId>,
    occupants: Vec<Vec<CellId>>,
    orders: BTreeMap<usize, Vec<CellId>>,
}

impl HierarchyBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_vertex(&mut self, id: impl Into<String>, rank: usize) -> Result<CellId> {
        let id = id.into();
        if rank > MAX_RANK {
            return Err(Error::RankOutOfRange {
                rank,
                max_rank: MAX_RANK,
            });
        }
        if self.vertex_index.contains_key(&id) {
            return Err(Error::DuplicateVertex { id });
        }
        let cell_id = CellId(self.cells.len());
        self.cells.push(Cell::new_vertex(id.clone(), rank));
        self.vertex_index.insert(id, cell_id);
        self.occupy(rank, cell_id);
        Ok(cell_id)
    }

    /// Adds the real edge `edge_id` from vertex `from` to vertex `to` and returns the
    /// hierarchical edge it was grouped into.
    pub fn connect(&mut self, edge_id: impl Into<String>, from: &str, to: &str) -> Result<CellId> {
        let edge_id = edge_id.into();
        if self.edge_index.contains_key(&edge_id) {
            return Err(Error::DuplicateEdge { id: edge_id });
        }
        let from_id = self.vertex_or_err(from)?;
        let to_id = self.vertex_or_err(to)?;
        let from_rank = self.cells[from_id.0].min_rank;
        let to_rank = self.cells[to_id.0].min_rank;
        if from_rank == to_rank {
            return Err(Error::NotLayered {
                edge: edge_id,
                from: from.to_string(),
                to: to.to_string(),
                rank: from_rank,
            });
        }

        let forward = from_rank > to_rank;
        let (high, low) = if forward {
            (from_id, to_id)
        } else {
            (to_id, from_id)
        };

        let group = match self.groups.get(&(high, low)) {
            Some(&group) => group,
            None => {
                let group = CellId(self.cells.len());
                let min_rank = self.cells[low.0].min_rank;
                let max_rank = self.cells[high.0].min_rank;
                self.cells.push(Cell::new_edge(
                    EdgeCell::new(high, low, !forward),
                    min_rank,
                    max_rank,
                ));
                for rank in min_rank + 1..max_rank {
                    self.occupy(rank, group);
                }
                self.cells[high.0].connects_as_source.push(group);
                self.cells[low.0].connects_as_target.push(group);
                self.groups.insert((high, low), group);
                group
            }
        };

        if let Some(edge) = self.cells[group.0].edge_mut() {
            edge.real_edges.push(RealEdge {
                id: edge_id.clone(),
                forward,
            });
        }
        self.edge_index.insert(edge_id, group);
        Ok(group)
    }

    pub fn vertex(&self, id: &str) -> Option<CellId> {
        self.vertex_index.get(id).copied()
    }

    /// The hierarchical edge a real edge was grouped into.
    pub fn edge(&self, real_edge_id: &str) -> Option<CellId> {
        self.edge_index.get(real_edge_id).copied()
    }

    /// Replaces the insertion order of `rank`. Checked by [`build`](Self::build).
    pub fn set_rank_order(&mut self, rank: usize, order: Vec<CellId>) -> &mut Self {
        self.orders.insert(rank, order);
        self
    }

    pub fn build(mut self) -> Result<HierarchyModel> {
        let rank_count = self.occupants.len();
        for (rank, order) in std::mem::take(&mut self.orders) {
            if rank >= rank_count {
                return Err(Error::RankOutOfRange {
                    rank,
                    max_rank: rank_count.saturating_sub(1),
                });
            }
            let mut expected = self.occupants[rank].clone();
            let mut given = order.clone();
            expected.sort_unstable();
            given.sort_unstable();
            if expected != given {
                return Err(Error::RankOrderMismatch { rank });
            }
            self.occupants[rank] = order;
        }

        let mut model = HierarchyModel {
            rank_y: vec![0.0; rank_count],
            cells: self.cells,
            ranks: self.occupants,
            vertex_index: self.vertex_index,
        };
        model.assign_order();
        Ok(model)
    }

    fn vertex_or_err(&self, id: &str) -> Result<CellId> {
        self.vertex(id).ok_or_else(|| Error::UnknownVertex { id: id.to_string() })
    }

    fn occupy(&mut self, rank: usize, id: CellId) {
        if self.occupants.len() <= rank {
            self.occupants.resize_with(rank + 1, Vec::new);
        }
        self.occupants[rank].push(id);
    }
}
