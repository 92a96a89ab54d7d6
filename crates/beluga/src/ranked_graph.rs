//! A serializable ranked graph, the input format of the CLI.
//!
//! ```json
//! {
//!   "vertices": [
//!     { "id": "a", "rank": 1, "width": 40, "height": 20 },
//!     { "id": "b", "rank": 0, "width": 40, "height": 20 }
//!   ],
//!   "edges": [{ "id": "ab", "source": "a", "target": "b" }],
//!   "rankOrder": { "0": ["b"] }
//! }
//! ```

use crate::adapter::{LayoutRecorder, LayoutResult};
use crate::error::{Error, Result};
use crate::hierarchy::{CellId, HierarchyBuilder, HierarchyModel};
use crate::model::Size;
use crate::options::CoordinateOptions;
use crate::position::{CoordinateReport, assign_coordinates};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RankedVertex {
    pub id: String,
    pub rank: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<f64>,
}

impl RankedVertex {
    /// `None` when neither extent is given.
    pub fn size(&self) -> Option<Size> {
        if self.width.is_none() && self.height.is_none() {
            return None;
        }
        Some(Size::new(
            self.width.unwrap_or_default(),
            self.height.unwrap_or_default(),
        ))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RankedEdge {
    pub id: String,
    pub source: String,
    pub target: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RankedGraph {
    pub vertices: Vec<RankedVertex>,
    #[serde(default)]
    pub edges: Vec<RankedEdge>,
    /// Order overrides per rank. Entries name vertices by id and edge segments by the id of
    /// any real edge in their group.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub rank_order: BTreeMap<usize, Vec<String>>,
}

impl RankedGraph {
    pub fn to_model(&self) -> Result<HierarchyModel> {
        let mut builder = HierarchyBuilder::new();
        for v in &self.vertices {
            builder.add_vertex(v.id.clone(), v.rank)?;
        }
        for e in &self.edges {
            builder.connect(e.id.clone(), &e.source, &e.target)?;
        }
        for (&rank, names) in &self.rank_order {
            let order = names
                .iter()
                .map(|name| {
                    builder
                        .vertex(name)
                        .or_else(|| builder.edge(name))
                        .ok_or_else(|| Error::UnknownCell { name: name.clone() })
                })
                .collect::<Result<Vec<CellId>>>()?;
            builder.set_rank_order(rank, order);
        }
        builder.build()
    }

    /// An adapter serving the vertex sizes of this graph.
    pub fn recorder(&self) -> LayoutRecorder {
        LayoutRecorder::with_bounds(
            self.vertices
                .iter()
                .filter_map(|v| Some((v.id.clone(), v.size()?))),
        )
    }
}

/// Emitted geometry plus the run summary.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LayoutOutput {
    pub result: LayoutResult,
    pub report: CoordinateReport,
}

pub fn layout_ranked_graph(
    graph: &RankedGraph,
    options: &CoordinateOptions,
) -> Result<LayoutOutput> {
    let mut model = graph.to_model()?;
    let mut recorder = graph.recorder();
    let report = assign_coordinates(&mut model, options, &mut recorder);
    Ok(LayoutOutput {
        result: recorder.into_result(),
        report,
    })
}
