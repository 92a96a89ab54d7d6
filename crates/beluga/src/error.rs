use serde::Serialize;

/// Errors raised while building a [`HierarchyModel`](crate::HierarchyModel).
///
/// Coordinate assignment itself never fails; see [`Warning`] for the conditions it recovers
/// from.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("unknown vertex: {id}")]
    UnknownVertex { id: String },

    #[error("duplicate vertex: {id}")]
    DuplicateVertex { id: String },

    #[error("duplicate edge: {id}")]
    DuplicateEdge { id: String },

    #[error("edge {edge} connects {from} and {to} on the same rank ({rank})")]
    NotLayered {
        edge: String,
        from: String,
        to: String,
        rank: usize,
    },

    #[error("rank {rank} is out of range (max rank {max_rank})")]
    RankOutOfRange { rank: usize, max_rank: usize },

    #[error("order given for rank {rank} is not a permutation of that rank's cells")]
    RankOrderMismatch { rank: usize },

    #[error("unknown vertex or edge in rank order: {name}")]
    UnknownCell { name: String },
}

pub type Result<T> = std::result::Result<T, Error>;

/// A condition recovered from during coordinate assignment.
///
/// Each warning is also logged through `tracing` when it is first raised.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Warning {
    /// Vertices the adapter had no bounds for; they were laid out as zero-size.
    #[serde(rename_all = "camelCase")]
    MissingBounds { vertices: Vec<String> },
    /// A hierarchical edge aggregating no real edges; it was treated as a single edge.
    #[serde(rename_all = "camelCase")]
    InconsistentEdgeData { cell: usize },
    /// An edge whose rank span collapsed; the span was re-derived from its terminals.
    #[serde(rename_all = "camelCase")]
    DegenerateSpan {
        cell: usize,
        min_rank: usize,
        max_rank: usize,
    },
}
