//! Reading molecules from MDL `.mol` (V2000) files and SD files.
//!
//! Hydrogen atoms and every bond touching one are dropped. Charges, isotope
//! masses and radicals come from the `M  CHG`, `M  ISO` and `M  RAD` property
//! lines when present, otherwise from the legacy charge column of the atom
//! block. Query bond types 5-8 become [`BondQuery`] attributes.

use std::{collections::HashMap, fs, ops::Range, path::Path};

use thiserror::Error;
use tracing::debug;

use crate::{
    error::GraphError,
    molecule::{
        Atom, AtomAttr, AtomOptions, AtomStereo, Bond, BondAttr, BondOptions, BondOrder,
        BondQuery, BondStereo, Element, FileAtom, FileBond, Molecule,
    },
};

/// Failure to read a `.mol` file. Line numbers are one-based.
#[derive(Debug, Error)]
pub enum ParseMolfileError {
    #[error("unable to read molfile")]
    Io(#[from] std::io::Error),

    #[error("molfile ends at line {0} before its atom and bond blocks")]
    Truncated(usize),

    #[error("line {0}: malformed counts line")]
    BadCountsLine(usize),

    #[error("line {0}: malformed atom line")]
    BadAtomLine(usize),

    #[error("line {line}: unknown element `{symbol}`")]
    BadElement { line: usize, symbol: String },

    #[error("line {0}: malformed bond line")]
    BadBondLine(usize),

    #[error("line {line}: atom {atom} does not exist")]
    BadAtomReference { line: usize, atom: usize },

    #[error("line {0}: malformed property line")]
    BadPropertyLine(usize),

    #[error("invalid molecular graph")]
    Graph(#[from] GraphError),
}

type Result<T> = std::result::Result<T, ParseMolfileError>;

/// Read the first molecule of the file at `p`.
pub fn parse(p: &Path) -> Result<Molecule> {
    let contents = fs::read_to_string(p)?;
    parse_molfile_str(&contents)
}

/// Read every molecule of the SD file at `p`.
pub fn parse_sdf(p: &Path) -> Result<Vec<Molecule>> {
    let contents = fs::read_to_string(p)?;
    parse_sdf_str(&contents)
}

/// Parse a single `.mol` block.
pub fn parse_molfile_str(input: &str) -> Result<Molecule> {
    let lines: Vec<&str> = input.lines().collect();
    parse_record(&lines, 0)
}

/// Parse every record of an SD file; records are separated by `$$$$` lines.
pub fn parse_sdf_str(input: &str) -> Result<Vec<Molecule>> {
    let lines: Vec<&str> = input.lines().collect();
    let mut molecules = Vec::new();
    let mut start = 0;
    for (i, line) in lines.iter().enumerate() {
        if line.trim_end() == "$$$$" {
            if lines[start..i].iter().any(|l| !l.trim().is_empty()) {
                molecules.push(parse_record(&lines[start..i], start)?);
            }
            start = i + 1;
        }
    }
    if lines[start..].iter().any(|l| !l.trim().is_empty()) {
        molecules.push(parse_record(&lines[start..], start)?);
    }
    Ok(molecules)
}

/// Return the characters of `line` in `columns`, cut short at the end of the
/// line, or `None` if the line does not reach the first column.
fn field(line: &str, columns: Range<usize>) -> Option<&str> {
    let end = columns.end.min(line.len());
    line.get(columns.start..end).map(str::trim)
}

fn number<T: std::str::FromStr>(line: &str, columns: Range<usize>) -> Option<T> {
    field(line, columns)?.parse().ok()
}

/// Like [`number`], but a missing or blank field reads as zero.
fn number_or_zero(line: &str, columns: Range<usize>) -> Option<usize> {
    match field(line, columns) {
        None | Some("") => Some(0),
        Some(s) => s.parse().ok(),
    }
}

/// Atom properties collected from the atom block and the property block.
struct AtomRecord {
    element: Element,
    position: [f64; 3],
    options: AtomOptions,
}

fn parse_record(lines: &[&str], offset: usize) -> Result<Molecule> {
    let line_no = |i: usize| offset + i + 1;

    let counts = lines
        .get(3)
        .ok_or(ParseMolfileError::Truncated(line_no(lines.len())))?;
    let (num_atoms, num_bonds) = match (number(counts, 0..3), number(counts, 3..6)) {
        (Some(a), Some(b)) => (a, b),
        _ => return Err(ParseMolfileError::BadCountsLine(line_no(3))),
    };

    let atom_start = 4;
    let bond_start = atom_start + num_atoms;
    let props_start = bond_start + num_bonds;
    if lines.len() < props_start {
        return Err(ParseMolfileError::Truncated(line_no(lines.len())));
    }

    let mut atoms = lines[atom_start..bond_start]
        .iter()
        .enumerate()
        .map(|(i, line)| parse_atom_line(line, line_no(atom_start + i)))
        .collect::<Result<Vec<_>>>()?;

    let mut bonds = Vec::with_capacity(num_bonds);
    for (i, text) in lines[bond_start..props_start].iter().enumerate() {
        let line = line_no(bond_start + i);
        let (a, b, attr) = parse_bond_line(text, line)?;
        for atom in [a, b] {
            if atom == 0 || atom > num_atoms {
                return Err(ParseMolfileError::BadAtomReference { line, atom });
            }
        }
        bonds.push((a - 1, b - 1, attr, i));
    }

    let mut properties = PropertyBlock::default();
    for (i, line) in lines[props_start..].iter().enumerate() {
        if line.starts_with("M  END") {
            break;
        }
        properties.read(line, line_no(props_start + i), num_atoms)?;
    }
    properties.apply(&mut atoms);

    // Build the graph, skipping hydrogens.
    let mut molecule = Molecule::new();
    let mut ids: Vec<Option<usize>> = Vec::with_capacity(atoms.len());
    for (row, record) in atoms.into_iter().enumerate() {
        if record.element == Element::Hydrogen {
            ids.push(None);
            continue;
        }
        let atom = Atom::with_options(record.element, record.options);
        let id = molecule.add_node(AtomAttr::File(FileAtom::new(atom, record.position, row)));
        ids.push(Some(id));
    }
    let dropped = ids.iter().filter(|id| id.is_none()).count();
    for (a, b, attr, row) in bonds {
        let (Some(u), Some(v)) = (ids[a], ids[b]) else {
            continue;
        };
        let attr = match attr {
            BondAttr::Plain(bond) => BondAttr::File(FileBond::new(bond, row)),
            query => query,
        };
        molecule.add_edge(u, v, attr)?;
    }
    debug!(
        atoms = molecule.graph().node_count(),
        bonds = molecule.graph().edge_count(),
        hydrogens = dropped,
        "parsed molfile"
    );
    Ok(molecule)
}

fn parse_atom_line(line: &str, line_no: usize) -> Result<AtomRecord> {
    let bad = || ParseMolfileError::BadAtomLine(line_no);
    let x = number(line, 0..10).ok_or_else(bad)?;
    let y = number(line, 10..20).ok_or_else(bad)?;
    let z = number(line, 20..30).ok_or_else(bad)?;
    let symbol = field(line, 31..34).ok_or_else(bad)?;
    let element: Element = symbol.parse().map_err(|_| ParseMolfileError::BadElement {
        line: line_no,
        symbol: symbol.to_string(),
    })?;

    let mut options = AtomOptions::default();
    match number_or_zero(line, 36..39).ok_or_else(bad)? {
        0 => {}
        4 => options.multiplicity = Some(2),
        code @ (1..=3 | 5..=7) => options.charge = Some(4 - code as i8),
        _ => return Err(bad()),
    }
    match number_or_zero(line, 39..42).ok_or_else(bad)? {
        0 => {}
        parity => options.stereo = Some(AtomStereo::try_from(parity).map_err(|_| bad())?),
    }

    Ok(AtomRecord {
        element,
        position: [x, y, z],
        options,
    })
}

fn parse_bond_line(line: &str, line_no: usize) -> Result<(usize, usize, BondAttr)> {
    let bad = || ParseMolfileError::BadBondLine(line_no);
    let a = number(line, 0..3).ok_or_else(bad)?;
    let b = number(line, 3..6).ok_or_else(bad)?;
    let kind: usize = number(line, 6..9).ok_or_else(bad)?;

    let mut options = BondOptions::default();
    match number_or_zero(line, 9..12).ok_or_else(bad)? {
        0 => {}
        code => options.stereo = Some(BondStereo::try_from(code).map_err(|_| bad())?),
    }

    let attr = match kind {
        1..=4 => {
            let order = BondOrder::try_from(kind).map_err(|_| bad())?;
            BondAttr::Plain(Bond::with_options(order, options))
        }
        5 => BondQuery::new([BondOrder::Single, BondOrder::Double], options).into(),
        6 => BondQuery::new([BondOrder::Single, BondOrder::Aromatic], options).into(),
        7 => BondQuery::new([BondOrder::Double, BondOrder::Aromatic], options).into(),
        8 => BondQuery::new(Vec::<BondOrder>::new(), options).into(),
        _ => return Err(bad()),
    };
    Ok((a, b, attr))
}

/// `M  CHG`, `M  ISO` and `M  RAD` entries, keyed by zero-based atom row.
#[derive(Default)]
struct PropertyBlock {
    seen: bool,
    charges: HashMap<usize, i8>,
    masses: HashMap<usize, u16>,
    radicals: HashMap<usize, u8>,
}

impl PropertyBlock {
    fn read(&mut self, line: &str, line_no: usize, num_atoms: usize) -> Result<()> {
        let Some(tag) = line.get(0..6) else {
            return Ok(());
        };
        if !matches!(tag, "M  CHG" | "M  ISO" | "M  RAD") {
            return Ok(());
        }
        let bad = || ParseMolfileError::BadPropertyLine(line_no);

        let values = line[6..]
            .split_whitespace()
            .map(|t| t.parse::<i32>().map_err(|_| bad()))
            .collect::<Result<Vec<_>>>()?;
        let Some((&count, entries)) = values.split_first() else {
            return Err(bad());
        };
        if count < 0 || entries.len() != 2 * count as usize {
            return Err(bad());
        }

        self.seen = true;
        for pair in entries.chunks_exact(2) {
            let atom = pair[0] as usize;
            if pair[0] < 1 || atom > num_atoms {
                return Err(ParseMolfileError::BadAtomReference {
                    line: line_no,
                    atom,
                });
            }
            let value = pair[1];
            match tag {
                "M  CHG" => {
                    self.charges
                        .insert(atom - 1, i8::try_from(value).map_err(|_| bad())?);
                }
                "M  ISO" => {
                    self.masses
                        .insert(atom - 1, u16::try_from(value).map_err(|_| bad())?);
                }
                _ => {
                    self.radicals
                        .insert(atom - 1, u8::try_from(value).map_err(|_| bad())?);
                }
            }
        }
        Ok(())
    }

    /// Overwrite the atom-block charges and radicals when any property line
    /// was present.
    fn apply(&self, atoms: &mut [AtomRecord]) {
        if !self.seen {
            return;
        }
        for (row, record) in atoms.iter_mut().enumerate() {
            let cleared = AtomOptions {
                charge: None,
                multiplicity: None,
                ..record.options
            };
            record.options = cleared.merge(AtomOptions {
                charge: self.charges.get(&row).copied(),
                multiplicity: self.radicals.get(&row).copied().filter(|&r| r != 0),
                mass: self.masses.get(&row).copied(),
                ..Default::default()
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::graph::GraphView;

    use super::*;

    const ETHANOL: &str = "\
ethanol
  handwritten

  3  2  0  0  0  0  0  0  0  0999 V2000
    0.0000    0.0000    0.0000 C   0  0  0  0  0  0  0  0  0  0  0  0
    1.5000    0.0000    0.0000 C   0  0  0  0  0  0  0  0  0  0  0  0
    2.2500    1.2990    0.0000 O   0  0  0  0  0  0  0  0  0  0  0  0
  1  2  1  0  0  0  0
  2  3  1  0  0  0  0
M  END
";

    const ACETATE: &str = "\
acetate
  handwritten

  5  4  0  0  0  0  0  0  0  0999 V2000
    0.0000    0.0000    0.0000 C   0  0  0  0  0  0  0  0  0  0  0  0
    1.5000    0.0000    0.0000 C   0  0  0  0  0  0  0  0  0  0  0  0
    2.2500    1.2990    0.0000 O   0  0  0  0  0  0  0  0  0  0  0  0
    2.2500   -1.2990    0.0000 O   0  5  0  0  0  0  0  0  0  0  0  0
   -0.5000    0.8000    0.0000 H   0  0  0  0  0  0  0  0  0  0  0  0
  1  2  1  0  0  0  0
  2  3  2  0  0  0  0
  2  4  1  0  0  0  0
  1  5  1  0  0  0  0
M  ISO  1   1  13
M  CHG  1   4  -1
M  END
";

    #[test]
    fn reads_atoms_and_bonds() {
        let mol = parse_molfile_str(ETHANOL).unwrap();
        assert_eq!(mol.node_count(), 3);
        assert_eq!(mol.edge_count(), 2);
        let oxygen = mol.node_attr(2).unwrap();
        assert_eq!(oxygen.symbol(), Some(Element::Oxygen));
        let AtomAttr::File(file) = oxygen else {
            panic!("expected a file atom");
        };
        assert_eq!(file.position(), [2.25, 1.299, 0.0]);
        assert_eq!(file.row(), 2);
        assert_eq!(mol.edge_attr(1).unwrap().order(), Some(BondOrder::Single));
    }

    #[test]
    fn drops_hydrogens_and_reads_properties() {
        let mol = parse_molfile_str(ACETATE).unwrap();
        assert_eq!(mol.node_count(), 4);
        assert_eq!(mol.edge_count(), 3);
        assert_eq!(mol.node_attr(0).unwrap().mass(), Some(13));
        assert_eq!(mol.node_attr(3).unwrap().charge(), Some(-1));
        assert_eq!(mol.node_attr(2).unwrap().charge(), Some(0));
        assert_eq!(mol.edge_attr(1).unwrap().order(), Some(BondOrder::Double));
    }

    #[test]
    fn legacy_charge_column() {
        let text = ETHANOL.replace(
            "2.2500    1.2990    0.0000 O   0  0",
            "2.2500    1.2990    0.0000 O   0  3",
        );
        let mol = parse_molfile_str(&text).unwrap();
        assert_eq!(mol.node_attr(2).unwrap().charge(), Some(1));
    }

    #[test]
    fn property_lines_replace_legacy_charges() {
        let text = ETHANOL
            .replace(
                "2.2500    1.2990    0.0000 O   0  0  0",
                "2.2500    1.2990    0.0000 O   0  3  1",
            )
            .replace("M  END", "M  RAD  1   1   2\nM  END");
        let mol = parse_molfile_str(&text).unwrap();
        let oxygen = mol.node_attr(2).unwrap();
        assert_eq!(oxygen.charge(), Some(0));
        assert_eq!(oxygen.stereo(), Some(AtomStereo::Clockwise));
        assert_eq!(mol.node_attr(0).unwrap().multiplicity(), Some(2));
    }

    #[test]
    fn query_bonds() {
        let text = ETHANOL.replace("  2  3  1  0", "  2  3  8  0");
        let mol = parse_molfile_str(&text).unwrap();
        let bond = mol.edge_attr(1).unwrap();
        assert!(bond.is_query());
        assert_eq!(bond.order(), None);
    }

    #[test]
    fn reports_bad_input() {
        assert!(matches!(
            parse_molfile_str("x\ny\n"),
            Err(ParseMolfileError::Truncated(_))
        ));
        let text = ETHANOL.replace(" O   0", " Xx  0");
        assert!(matches!(
            parse_molfile_str(&text),
            Err(ParseMolfileError::BadElement { line: 7, .. })
        ));
        let text = ETHANOL.replace("  2  3  1  0", "  2  9  1  0");
        assert!(matches!(
            parse_molfile_str(&text),
            Err(ParseMolfileError::BadAtomReference { line: 9, atom: 9 })
        ));
        let text = ETHANOL.replace("  2  3  1  0", "  2  2  1  0");
        assert!(matches!(
            parse_molfile_str(&text),
            Err(ParseMolfileError::Graph(GraphError::SelfLoop(1)))
        ));
    }

    #[test]
    fn reads_every_sdf_record() {
        let sdf = format!("{ETHANOL}$$$$\n{ACETATE}$$$$\n");
        let molecules = parse_sdf_str(&sdf).unwrap();
        assert_eq!(molecules.len(), 2);
        assert_eq!(molecules[1].node_count(), 4);
    }
}
