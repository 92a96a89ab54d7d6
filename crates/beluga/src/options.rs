use crate::coordinate_system::Orientation;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Edge routing style. All three styles get jetties; only `Curve` adds the extra control
/// point next to each jetty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EdgeStyle {
    Orthogonal,
    #[default]
    Polyline,
    Curve,
}

impl FromStr for EdgeStyle {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "orthogonal" => Ok(Self::Orthogonal),
            "polyline" => Ok(Self::Polyline),
            "curve" => Ok(Self::Curve),
            _ => Err(()),
        }
    }
}

/// Coordinate assignment settings. Every field is optional in serialized form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CoordinateOptions {
    pub orientation: Orientation,
    /// Minimum buffer between cells on the same rank.
    pub intra_cell_spacing: f64,
    /// Minimum distance between cells on adjacent ranks.
    pub inter_rank_cell_spacing: f64,
    /// Distance between parallel edges sharing a virtual segment.
    pub parallel_edge_spacing: f64,
    /// Number of median sweep pairs.
    pub max_iterations: usize,
    /// Preferred horizontal distance between edges leaving a vertex.
    pub pref_hoz_edge_sep: f64,
    /// Preferred vertical offset between neighbouring jetties.
    pub pref_vert_edge_off: f64,
    /// Minimum length of an edge jetty.
    pub min_edge_jetty: f64,
    /// Primary-axis band reserved for a rank that holds no vertex.
    pub channel_buffer: f64,
    pub edge_style: EdgeStyle,
    /// Secondary-axis coordinate placement starts at.
    pub initial_x: f64,
    /// Run the median iteration and straightening passes. When off, the initial packing is
    /// emitted as is.
    pub fine_tuning: bool,
    /// Gap between hierarchies laid out side by side.
    pub inter_hierarchy_spacing: f64,
}

impl Default for CoordinateOptions {
    fn default() -> Self {
        Self {
            orientation: Orientation::North,
            intra_cell_spacing: 30.0,
            inter_rank_cell_spacing: 100.0,
            parallel_edge_spacing: 10.0,
            max_iterations: 8,
            pref_hoz_edge_sep: 5.0,
            pref_vert_edge_off: 2.0,
            min_edge_jetty: 12.0,
            channel_buffer: 4.0,
            edge_style: EdgeStyle::Polyline,
            initial_x: 0.0,
            fine_tuning: true,
            inter_hierarchy_spacing: 60.0,
        }
    }
}
