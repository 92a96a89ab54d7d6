#![forbid(unsafe_code)]

//! Coordinate assignment for layered (hierarchical) graph layouts.
//!
//! `beluga` takes a graph that has already been split into ranks, with virtual edge segments
//! standing in for edges that cross more than one rank gap, and assigns the secondary-axis
//! coordinate of every rank occupant plus the routing points of every edge. Cycle removal,
//! layering and crossing minimisation happen upstream; their result is handed over as a
//! [`HierarchyModel`].
//!
//! Results leave the crate through a [`LayoutAdapter`]. [`LayoutRecorder`] is the in-crate
//! adapter used by the CLI and the tests.

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod adapter;
pub mod coordinate_system;
pub mod error;
pub mod hierarchy;
pub mod model;
pub mod options;
pub mod position;
pub mod ranked_graph;

pub use adapter::{LayoutAdapter, LayoutRecorder, LayoutResult};
pub use coordinate_system::Orientation;
pub use error::{Error, Result, Warning};
pub use hierarchy::{
    Cell, CellId, CellKind, ConnectionCache, EdgeCell, HierarchyBuilder, HierarchyModel,
    JettyEnd, JettyPosition, MAX_RANK, RealEdge,
};
pub use model::{Point, Size};
pub use options::{CoordinateOptions, EdgeStyle};
pub use position::{CoordinateReport, assign_coordinates, emit_layout, layout_hierarchies};
pub use ranked_graph::{LayoutOutput, RankedEdge, RankedGraph, RankedVertex, layout_ranked_graph};
