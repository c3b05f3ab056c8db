use std::collections::BTreeSet;

use pyo3::{exceptions::PyValueError, prelude::*};

use crate::{
    isomorphism::{molecule_matches, MatchMode, Vf2Options},
    loader::parse_molfile_str,
    mcs::{molecule_mcs, McsMode, McsOptions},
    Molecule,
};

fn value_error(e: impl std::fmt::Display) -> PyErr {
    PyValueError::new_err(e.to_string())
}

fn parse_mol_block(mol_block: &str) -> PyResult<Molecule> {
    parse_molfile_str(mol_block).map_err(value_error)
}

/// Connected components of the molecule as lists of atom indices.
#[pyfunction]
fn components(mol_block: String) -> PyResult<Vec<BTreeSet<usize>>> {
    parse_mol_block(&mol_block)?
        .connected_components()
        .map_err(value_error)
}

#[pyfunction]
fn cut_vertices(mol_block: String) -> PyResult<BTreeSet<usize>> {
    parse_mol_block(&mol_block)?
        .cut_vertices()
        .map_err(value_error)
}

#[pyfunction]
fn bridges(mol_block: String) -> PyResult<BTreeSet<usize>> {
    parse_mol_block(&mol_block)?.bridges().map_err(value_error)
}

/// Whether `pattern` occurs in `target`, optionally as an induced subgraph.
#[pyfunction]
#[pyo3(signature = (pattern, target, induced = false))]
fn has_substructure(pattern: String, target: String, induced: bool) -> PyResult<bool> {
    let pattern = parse_mol_block(&pattern)?;
    let target = parse_mol_block(&target)?;
    let options = Vf2Options {
        mode: if induced {
            MatchMode::Induced
        } else {
            MatchMode::Subgraph
        },
        ..Default::default()
    };
    let mut matches = molecule_matches(&pattern, &target, options).map_err(value_error)?;
    Ok(matches.next().is_some())
}

/// Size of the maximum common substructure, counted in atoms or, with
/// `edges=True`, in bonds.
#[pyfunction]
#[pyo3(signature = (first, second, edges = false))]
fn mcs_size(first: String, second: String, edges: bool) -> PyResult<usize> {
    let first = parse_mol_block(&first)?;
    let second = parse_mol_block(&second)?;
    let options = McsOptions {
        mode: if edges {
            McsMode::EdgeInduced
        } else {
            McsMode::NodeInduced
        },
        ..Default::default()
    };
    Ok(molecule_mcs(&first, &second, &options)
        .map_err(value_error)?
        .size())
}

/// A Python module implemented in Rust. The name of this function must match
/// the `lib.name` setting in the `Cargo.toml`, else Python will not be able to
/// import the module.
#[pymodule]
fn chemgraph(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_function(wrap_pyfunction!(components, m)?)?;
    m.add_function(wrap_pyfunction!(cut_vertices, m)?)?;
    m.add_function(wrap_pyfunction!(bridges, m)?)?;
    m.add_function(wrap_pyfunction!(has_substructure, m)?)?;
    m.add_function(wrap_pyfunction!(mcs_size, m)?)?;

    Ok(())
}
