//! Errors raised by the graph core.
//!
//! Degenerate inputs (empty graphs, graphs without edges, identical graphs)
//! are valid and never produce one of these.

use thiserror::Error;

use crate::graph::{EdgeId, NodeId};

/// Failure of a graph accessor or of structural validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum GraphError {
    /// A node identifier that does not name a node of the graph.
    #[error("node {0} is out of range")]
    NodeOutOfRange(NodeId),

    /// An edge identifier that does not name an edge of the graph.
    #[error("edge {0} is out of range")]
    EdgeOutOfRange(EdgeId),

    /// An edge whose endpoint is missing from the node set.
    #[error("edge {edge} has dangling endpoint {node}")]
    DanglingEndpoint { edge: EdgeId, node: NodeId },

    #[error("self-loop on node {0}")]
    SelfLoop(NodeId),

    #[error("parallel edge between nodes {0} and {1}")]
    ParallelEdge(NodeId, NodeId),

    /// `u` lists `v` as adjacent but not the other way around.
    #[error("adjacency between nodes {0} and {1} is not symmetric")]
    AsymmetricAdjacency(NodeId, NodeId),

    /// Node identifiers must be exactly `0..node_count`.
    #[error("node identifiers are not dense: {0} is missing")]
    SparseNodeIds(NodeId),

    /// Edge identifiers must be exactly `0..edge_count`.
    #[error("edge identifiers are not dense: {0} is missing")]
    SparseEdgeIds(EdgeId),
}

pub type Result<T> = std::result::Result<T, GraphError>;
