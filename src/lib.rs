// Errors shared by the graph core
pub mod error;

// Graph capability contract and the concrete graph type
pub mod graph;

// Derived-property memoization
pub mod cache;

// Atom and bond attributes, molecules
pub mod molecule;

// Components, cut vertices, bridges, blocks
pub mod connectivity;

// Maximum and maximal cliques
pub mod clique;

// VF2 subgraph isomorphism
pub mod isomorphism;

// Maximum common substructure
pub mod mcs;

// Line graphs and subgraph extraction
pub mod utils;

// Data IO
pub mod loader;

// Python library
#[cfg(feature = "python")]
pub mod python;

pub use error::{GraphError, Result};
pub use graph::{EdgeId, GraphView, Mapping, NodeId, SimpleGraph, Topology};
pub use molecule::Molecule;
