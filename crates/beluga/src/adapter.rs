//! Boundary between the passes and the graph that owns the real vertices and edges.

use crate::model::{Point, Size};
use rustc_hash::FxHashMap as HashMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// The graph collaborator coordinate assignment reads bounds from and writes geometry to.
///
/// Coordinates passed to the setters are already projected through the layout orientation.
pub trait LayoutAdapter {
    /// Unrotated bounds of a real vertex, or `None` when unknown.
    fn vertex_bounds(&self, vertex: &str) -> Option<Size>;

    /// Places the top-left corner of a real vertex.
    fn set_vertex_location(&mut self, vertex: &str, x: f64, y: f64);

    /// Replaces the routing points of a real edge.
    fn set_edge_points(&mut self, edge: &str, points: Vec<Point>);
}

/// Geometry recorded by a [`LayoutRecorder`], keyed by id for stable output.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LayoutResult {
    pub vertices: BTreeMap<String, Point>,
    pub edges: BTreeMap<String, Vec<Point>>,
}

/// An adapter serving bounds from a map and recording everything it is told.
#[derive(Debug, Clone, Default)]
pub struct LayoutRecorder {
    bounds: HashMap<String, Size>,
    result: LayoutResult,
}

impl LayoutRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_bounds<I, S>(bounds: I) -> Self
    where
        I: IntoIterator<Item = (S, Size)>,
        S: Into<String>,
    {
        Self {
            bounds: bounds.into_iter().map(|(k, v)| (k.into(), v)).collect(),
            result: LayoutResult::default(),
        }
    }

    pub fn set_bounds(&mut self, vertex: impl Into<String>, size: Size) {
        self.bounds.insert(vertex.into(), size);
    }

    pub fn result(&self) -> &LayoutResult {
        &self.result
    }

    pub fn into_result(self) -> LayoutResult {
        self.result
    }
}

impl LayoutAdapter for LayoutRecorder {
    fn vertex_bounds(&self, vertex: &str) -> Option<Size> {
        self.bounds.get(vertex).copied()
    }

    fn set_vertex_location(&mut self, vertex: &str, x: f64, y: f64) {
        self.result
            .vertices
            .insert(vertex.to_string(), Point::new(x, y));
    }

    fn set_edge_points(&mut self, edge: &str, points: Vec<Point>) {
        self.result.edges.insert(edge.to_string(), points);
    }
}
