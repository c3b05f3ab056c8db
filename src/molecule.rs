//! Chemical attributes carried by molecular graphs.
//!
//! The graph core treats node and edge payloads as opaque and only calls
//! caller-supplied predicates on them. This module supplies the payloads used
//! for molecules: atoms and bonds in three shapes (plain, read from a file,
//! and query constraints) behind the tagged unions [`AtomAttr`] and
//! [`BondAttr`], which share one read contract and a `matches` predicate.
//!
//! Optional properties travel in explicit option records ([`AtomOptions`],
//! [`BondOptions`]) where `None` means "unset" and `Some` an explicit value.

use std::{fmt::Display, str::FromStr};

use crate::{
    error::Result,
    graph::{EdgeId, NodeId, SimpleGraph, Topology},
};

/// Thrown by [`Element::from_str`] if the string does not represent a valid
/// chemical element.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct ParseElementError;

macro_rules! periodic_table {
    ( $(($element:ident, $symbol:literal, $number:literal),)* ) => {
        /// Represents a chemical element.
        #[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub enum Element {
            $( $element, )*
        }

        impl Element {
            /// Return the number of protons of this element.
            pub fn atomic_number(&self) -> u8 {
                match &self {
                    $( Element::$element => $number, )*
                }
            }
        }

        impl Display for Element {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                match &self {
                    $( Element::$element => write!(f, "{}", $symbol), )*
                }
            }
        }

        impl FromStr for Element {
            type Err = ParseElementError;
            fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
                match s {
                    $( $symbol => Ok(Element::$element), )*
                    _ => Err(ParseElementError),
                }
            }
        }
    };
}

periodic_table!(
    (Hydrogen, "H", 1),
    (Helium, "He", 2),
    (Lithium, "Li", 3),
    (Beryllium, "Be", 4),
    (Boron, "B", 5),
    (Carbon, "C", 6),
    (Nitrogen, "N", 7),
    (Oxygen, "O", 8),
    (Fluorine, "F", 9),
    (Neon, "Ne", 10),
    (Sodium, "Na", 11),
    (Magnesium, "Mg", 12),
    (Aluminum, "Al", 13),
    (Silicon, "Si", 14),
    (Phosphorus, "P", 15),
    (Sulfur, "S", 16),
    (Chlorine, "Cl", 17),
    (Argon, "Ar", 18),
    (Potassium, "K", 19),
    (Calcium, "Ca", 20),
    (Scandium, "Sc", 21),
    (Titanium, "Ti", 22),
    (Vanadium, "V", 23),
    (Chromium, "Cr", 24),
    (Manganese, "Mn", 25),
    (Iron, "Fe", 26),
    (Cobalt, "Co", 27),
    (Nickel, "Ni", 28),
    (Copper, "Cu", 29),
    (Zinc, "Zn", 30),
    (Gallium, "Ga", 31),
    (Germanium, "Ge", 32),
    (Arsenic, "As", 33),
    (Selenium, "Se", 34),
    (Bromine, "Br", 35),
    (Krypton, "Kr", 36),
    (Rubidium, "Rb", 37),
    (Strontium, "Sr", 38),
    (Yttrium, "Y", 39),
    (Zirconium, "Zr", 40),
    (Niobium, "Nb", 41),
    (Molybdenum, "Mo", 42),
    (Technetium, "Tc", 43),
    (Ruthenium, "Ru", 44),
    (Rhodium, "Rh", 45),
    (Palladium, "Pd", 46),
    (Silver, "Ag", 47),
    (Cadmium, "Cd", 48),
    (Indium, "In", 49),
    (Tin, "Sn", 50),
    (Antimony, "Sb", 51),
    (Tellurium, "Te", 52),
    (Iodine, "I", 53),
    (Xenon, "Xe", 54),
    (Cesium, "Cs", 55),
    (Barium, "Ba", 56),
    (Lanthanum, "La", 57),
    (Cerium, "Ce", 58),
    (Praseodymium, "Pr", 59),
    (Neodymium, "Nd", 60),
    (Promethium, "Pm", 61),
    (Samarium, "Sm", 62),
    (Europium, "Eu", 63),
    (Gadolinium, "Gd", 64),
    (Terbium, "Tb", 65),
    (Dysprosium, "Dy", 66),
    (Holmium, "Ho", 67),
    (Erbium, "Er", 68),
    (Thulium, "Tm", 69),
    (Ytterbium, "Yb", 70),
    (Lutetium, "Lu", 71),
    (Hafnium, "Hf", 72),
    (Tantalum, "Ta", 73),
    (Wolfram, "W", 74),
    (Rhenium, "Re", 75),
    (Osmium, "Os", 76),
    (Iridium, "Ir", 77),
    (Platinum, "Pt", 78),
    (Gold, "Au", 79),
    (Mercury, "Hg", 80),
    (Thallium, "Tl", 81),
    (Lead, "Pb", 82),
    (Bismuth, "Bi", 83),
    (Polonium, "Po", 84),
    (Astatine, "At", 85),
    (Radon, "Rn", 86),
    (Francium, "Fr", 87),
    (Radium, "Ra", 88),
    (Actinium, "Ac", 89),
    (Thorium, "Th", 90),
    (Protactinium, "Pa", 91),
    (Uranium, "U", 92),
    (Neptunium, "Np", 93),
    (Plutonium, "Pu", 94),
    (Americium, "Am", 95),
    (Curium, "Cm", 96),
    (Berkelium, "Bk", 97),
    (Californium, "Cf", 98),
    (Einsteinium, "Es", 99),
    (Fermium, "Fm", 100),
    (Mendelevium, "Md", 101),
    (Nobelium, "No", 102),
    (Lawrencium, "Lr", 103),
    (Rutherfordium, "Rf", 104),
    (Dubnium, "Db", 105),
    (Seaborgium, "Sg", 106),
    (Bohrium, "Bh", 107),
    (Hassium, "Hs", 108),
    (Meitnerium, "Mt", 109),
    (Darmstadtium, "Ds", 110),
    (Roentgenium, "Rg", 111),
    (Copernicium, "Cn", 112),
    (Nihonium, "Nh", 113),
    (Flerovium, "Fl", 114),
    (Moscovium, "Mc", 115),
    (Livermorium, "Lv", 116),
    (Tennessine, "Ts", 117),
    (Oganesson, "Og", 118),
);

/// Tetrahedral parity of an atom.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum AtomStereo {
    Clockwise,
    CounterClockwise,
    Either,
}

/// Thrown by [`AtomStereo::try_from`] for anything other than 1, 2, or 3.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct ParseStereoError;

impl TryFrom<usize> for AtomStereo {
    type Error = ParseStereoError;
    fn try_from(value: usize) -> std::result::Result<Self, Self::Error> {
        match value {
            1 => Ok(AtomStereo::Clockwise),
            2 => Ok(AtomStereo::CounterClockwise),
            3 => Ok(AtomStereo::Either),
            _ => Err(ParseStereoError),
        }
    }
}

/// Optional atom properties. `None` means unset.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash)]
pub struct AtomOptions {
    pub charge: Option<i8>,
    pub multiplicity: Option<u8>,
    pub mass: Option<u16>,
    pub aromatic: Option<bool>,
    pub stereo: Option<AtomStereo>,
}

impl AtomOptions {
    /// Overlay `other` on `self`: every field set in `other` wins.
    pub fn merge(self, other: AtomOptions) -> Self {
        Self {
            charge: other.charge.or(self.charge),
            multiplicity: other.multiplicity.or(self.multiplicity),
            mass: other.mass.or(self.mass),
            aromatic: other.aromatic.or(self.aromatic),
            stereo: other.stereo.or(self.stereo),
        }
    }
}

/// A concrete atom.
///
/// Charge and spin multiplicity always have a value (neutral and singlet by
/// default); isotope mass, aromaticity and stereo may be unset.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Atom {
    element: Element,
    charge: i8,
    multiplicity: u8,
    mass: Option<u16>,
    aromatic: Option<bool>,
    stereo: Option<AtomStereo>,
}

impl Atom {
    /// Construct a neutral, singlet [`Atom`] of type `element`.
    pub fn new(element: Element) -> Self {
        Self::with_options(element, AtomOptions::default())
    }

    pub fn with_options(element: Element, options: AtomOptions) -> Self {
        Self {
            element,
            charge: options.charge.unwrap_or(0),
            multiplicity: options.multiplicity.unwrap_or(1),
            mass: options.mass,
            aromatic: options.aromatic,
            stereo: options.stereo,
        }
    }

    /// Return this [`Atom`]'s element.
    pub fn element(&self) -> Element {
        self.element
    }

    pub fn charge(&self) -> i8 {
        self.charge
    }

    pub fn multiplicity(&self) -> u8 {
        self.multiplicity
    }

    pub fn mass(&self) -> Option<u16> {
        self.mass
    }

    pub fn aromatic(&self) -> Option<bool> {
        self.aromatic
    }

    pub fn stereo(&self) -> Option<AtomStereo> {
        self.stereo
    }

    /// Return the properties of this atom as an option record.
    pub fn options(&self) -> AtomOptions {
        AtomOptions {
            charge: Some(self.charge),
            multiplicity: Some(self.multiplicity),
            mass: self.mass,
            aromatic: self.aromatic,
            stereo: self.stereo,
        }
    }

    /// Pattern-side comparison: element, charge and multiplicity must agree;
    /// an optional property constrains `other` only when set on `self`.
    fn matches(&self, other: &Atom) -> bool {
        self.element == other.element
            && self.charge == other.charge
            && self.multiplicity == other.multiplicity
            && self.mass.is_none_or(|m| other.mass == Some(m))
            && self.aromatic.is_none_or(|a| other.aromatic == Some(a))
            && self.stereo.is_none_or(|s| other.stereo == Some(s))
    }
}

/// An atom read from a structure file, with its position and source row.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct FileAtom {
    atom: Atom,
    position: [f64; 3],
    row: usize,
}

impl FileAtom {
    pub fn new(atom: Atom, position: [f64; 3], row: usize) -> Self {
        Self {
            atom,
            position,
            row,
        }
    }

    pub fn atom(&self) -> &Atom {
        &self.atom
    }

    pub fn position(&self) -> [f64; 3] {
        self.position
    }

    /// Zero-based row of this atom in the file's atom block.
    pub fn row(&self) -> usize {
        self.row
    }
}

/// A set of constraints an atom must satisfy.
///
/// An empty element list accepts any element; each field set in `options`
/// must be matched exactly by the candidate.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct AtomQuery {
    elements: Vec<Element>,
    options: AtomOptions,
}

impl AtomQuery {
    pub fn new(elements: impl IntoIterator<Item = Element>, options: AtomOptions) -> Self {
        let mut elements: Vec<Element> = elements.into_iter().collect();
        elements.sort();
        elements.dedup();
        Self { elements, options }
    }

    /// A query accepting any atom.
    pub fn any() -> Self {
        Self::default()
    }

    pub fn elements(&self) -> &[Element] {
        &self.elements
    }

    pub fn options(&self) -> &AtomOptions {
        &self.options
    }

    pub fn accepts(&self, atom: &Atom) -> bool {
        let o = &self.options;
        (self.elements.is_empty() || self.elements.contains(&atom.element))
            && o.charge.is_none_or(|c| atom.charge == c)
            && o.multiplicity.is_none_or(|m| atom.multiplicity == m)
            && o.mass.is_none_or(|m| atom.mass == Some(m))
            && o.aromatic.is_none_or(|a| atom.aromatic.unwrap_or(false) == a)
            && o.stereo.is_none_or(|s| atom.stereo == Some(s))
    }
}

/// Node payload of a [`Molecule`].
#[derive(Debug, Clone, PartialEq)]
pub enum AtomAttr {
    Plain(Atom),
    File(FileAtom),
    Query(AtomQuery),
}

impl From<Atom> for AtomAttr {
    fn from(atom: Atom) -> Self {
        AtomAttr::Plain(atom)
    }
}

impl From<FileAtom> for AtomAttr {
    fn from(atom: FileAtom) -> Self {
        AtomAttr::File(atom)
    }
}

impl From<AtomQuery> for AtomAttr {
    fn from(query: AtomQuery) -> Self {
        AtomAttr::Query(query)
    }
}

impl AtomAttr {
    /// Return the concrete atom behind this attribute, if it is not a query.
    pub fn atom(&self) -> Option<&Atom> {
        match self {
            AtomAttr::Plain(atom) => Some(atom),
            AtomAttr::File(file) => Some(&file.atom),
            AtomAttr::Query(_) => None,
        }
    }

    pub fn is_query(&self) -> bool {
        matches!(self, AtomAttr::Query(_))
    }

    /// The element, or `None` for a query that does not pin down one.
    pub fn symbol(&self) -> Option<Element> {
        match self {
            AtomAttr::Query(q) => match q.elements.as_slice() {
                [e] => Some(*e),
                _ => None,
            },
            _ => self.atom().map(Atom::element),
        }
    }

    pub fn charge(&self) -> Option<i8> {
        self.read(|a| a.charge)
    }

    pub fn multiplicity(&self) -> Option<u8> {
        self.read(|a| a.multiplicity)
    }

    pub fn mass(&self) -> Option<u16> {
        self.read(|a| a.mass)
    }

    pub fn aromatic(&self) -> Option<bool> {
        self.read(|a| a.aromatic)
    }

    pub fn stereo(&self) -> Option<AtomStereo> {
        self.read(|a| a.stereo)
    }

    fn read<T>(&self, field: impl Fn(&AtomOptions) -> Option<T>) -> Option<T> {
        match self {
            AtomAttr::Query(q) => field(&q.options),
            _ => self.atom().and_then(|a| field(&a.options())),
        }
    }

    /// Return `true` iff `candidate` is compatible with this attribute when
    /// this one sits on the pattern side of a match.
    ///
    /// Queries are evaluated against concrete candidates; two queries match
    /// only when they are identical.
    pub fn matches(&self, candidate: &AtomAttr) -> bool {
        match (self, candidate) {
            (AtomAttr::Query(p), AtomAttr::Query(t)) => p == t,
            (AtomAttr::Query(q), t) => t.atom().is_some_and(|a| q.accepts(a)),
            (p, AtomAttr::Query(q)) => p.atom().is_some_and(|a| q.accepts(a)),
            (p, t) => match (p.atom(), t.atom()) {
                (Some(p), Some(t)) => p.matches(t),
                _ => false,
            },
        }
    }
}

/// The order of a bond as recorded in `.mol` files.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum BondOrder {
    Single,
    Double,
    Triple,
    Aromatic,
}

/// Thrown by [`BondOrder::try_from`] when given anything other than 1-4.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct ParseBondError;

impl TryFrom<usize> for BondOrder {
    type Error = ParseBondError;
    fn try_from(value: usize) -> std::result::Result<Self, Self::Error> {
        match value {
            1 => Ok(BondOrder::Single),
            2 => Ok(BondOrder::Double),
            3 => Ok(BondOrder::Triple),
            4 => Ok(BondOrder::Aromatic),
            _ => Err(ParseBondError),
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum BondStereo {
    Up,
    Down,
    Either,
    CisTransEither,
}

impl TryFrom<usize> for BondStereo {
    type Error = ParseStereoError;
    fn try_from(value: usize) -> std::result::Result<Self, Self::Error> {
        match value {
            1 => Ok(BondStereo::Up),
            6 => Ok(BondStereo::Down),
            4 => Ok(BondStereo::Either),
            3 => Ok(BondStereo::CisTransEither),
            _ => Err(ParseStereoError),
        }
    }
}

/// Optional bond properties. `None` means unset.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash)]
pub struct BondOptions {
    pub aromatic: Option<bool>,
    pub stereo: Option<BondStereo>,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Bond {
    order: BondOrder,
    aromatic: Option<bool>,
    stereo: Option<BondStereo>,
}

impl Bond {
    pub fn new(order: BondOrder) -> Self {
        Self::with_options(order, BondOptions::default())
    }

    pub fn with_options(order: BondOrder, options: BondOptions) -> Self {
        let aromatic = match order {
            BondOrder::Aromatic => Some(true),
            _ => options.aromatic,
        };
        Self {
            order,
            aromatic,
            stereo: options.stereo,
        }
    }

    pub fn order(&self) -> BondOrder {
        self.order
    }

    pub fn aromatic(&self) -> Option<bool> {
        self.aromatic
    }

    pub fn stereo(&self) -> Option<BondStereo> {
        self.stereo
    }

    fn matches(&self, other: &Bond) -> bool {
        self.order == other.order
            && self.aromatic.is_none_or(|a| other.aromatic == Some(a))
            && self.stereo.is_none_or(|s| other.stereo == Some(s))
    }
}

/// A bond read from a structure file, with its source row.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct FileBond {
    bond: Bond,
    row: usize,
}

impl FileBond {
    pub fn new(bond: Bond, row: usize) -> Self {
        Self { bond, row }
    }

    pub fn bond(&self) -> &Bond {
        &self.bond
    }

    pub fn row(&self) -> usize {
        self.row
    }
}

/// Constraints on a bond: any of `orders` (all if empty) plus the set fields
/// of `options`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct BondQuery {
    orders: Vec<BondOrder>,
    options: BondOptions,
}

impl BondQuery {
    pub fn new(orders: impl IntoIterator<Item = BondOrder>, options: BondOptions) -> Self {
        let mut orders: Vec<BondOrder> = orders.into_iter().collect();
        orders.sort();
        orders.dedup();
        Self { orders, options }
    }

    pub fn any() -> Self {
        Self::default()
    }

    pub fn orders(&self) -> &[BondOrder] {
        &self.orders
    }

    pub fn accepts(&self, bond: &Bond) -> bool {
        (self.orders.is_empty() || self.orders.contains(&bond.order))
            && self
                .options
                .aromatic
                .is_none_or(|a| bond.aromatic.unwrap_or(false) == a)
            && self.options.stereo.is_none_or(|s| bond.stereo == Some(s))
    }
}

/// Edge payload of a [`Molecule`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum BondAttr {
    Plain(Bond),
    File(FileBond),
    Query(BondQuery),
}

impl From<Bond> for BondAttr {
    fn from(bond: Bond) -> Self {
        BondAttr::Plain(bond)
    }
}

impl From<FileBond> for BondAttr {
    fn from(bond: FileBond) -> Self {
        BondAttr::File(bond)
    }
}

impl From<BondQuery> for BondAttr {
    fn from(query: BondQuery) -> Self {
        BondAttr::Query(query)
    }
}

impl BondAttr {
    pub fn bond(&self) -> Option<&Bond> {
        match self {
            BondAttr::Plain(bond) => Some(bond),
            BondAttr::File(file) => Some(&file.bond),
            BondAttr::Query(_) => None,
        }
    }

    pub fn is_query(&self) -> bool {
        matches!(self, BondAttr::Query(_))
    }

    /// The bond order, or `None` for a query that allows several.
    pub fn order(&self) -> Option<BondOrder> {
        match self {
            BondAttr::Query(q) => match q.orders.as_slice() {
                [o] => Some(*o),
                _ => None,
            },
            _ => self.bond().map(Bond::order),
        }
    }

    pub fn aromatic(&self) -> Option<bool> {
        match self {
            BondAttr::Query(q) => q.options.aromatic,
            _ => self.bond().and_then(Bond::aromatic),
        }
    }

    pub fn stereo(&self) -> Option<BondStereo> {
        match self {
            BondAttr::Query(q) => q.options.stereo,
            _ => self.bond().and_then(Bond::stereo),
        }
    }

    /// Pattern-side compatibility with `candidate`; see [`AtomAttr::matches`].
    pub fn matches(&self, candidate: &BondAttr) -> bool {
        match (self, candidate) {
            (BondAttr::Query(p), BondAttr::Query(t)) => p == t,
            (BondAttr::Query(q), t) => t.bond().is_some_and(|b| q.accepts(b)),
            (p, BondAttr::Query(q)) => p.bond().is_some_and(|b| q.accepts(b)),
            (p, t) => match (p.bond(), t.bond()) {
                (Some(p), Some(t)) => p.matches(t),
                _ => false,
            },
        }
    }
}

/// Default node matcher for molecules.
pub fn atoms_match(pattern: &AtomAttr, target: &AtomAttr) -> bool {
    pattern.matches(target)
}

/// Default edge matcher for molecules.
pub fn bonds_match(pattern: &BondAttr, target: &BondAttr) -> bool {
    pattern.matches(target)
}

/// A simple, loopless graph with atoms as nodes and bonds as edges.
///
/// Hydrogen atoms are only present when the producer of the molecule put
/// them there; `.mol` files read by [`crate::loader`] drop them.
pub type Molecule = SimpleGraph<AtomAttr, BondAttr>;

impl SimpleGraph<AtomAttr, BondAttr> {
    /// Add a plain, neutral atom of type `element`.
    pub fn add_atom(&mut self, element: Element) -> NodeId {
        self.add_node(AtomAttr::Plain(Atom::new(element)))
    }

    /// Add a plain bond of the given order between atoms `a` and `b`.
    pub fn add_bond(&mut self, a: NodeId, b: NodeId, order: BondOrder) -> Result<EdgeId> {
        self.add_edge(a, b, BondAttr::Plain(Bond::new(order)))
    }

    /// Return `true` iff the molecule fails structural validation, e.g. it
    /// contains a self-loop or a doubled bond.
    pub fn is_malformed(&self) -> bool {
        Topology::of(self).is_err()
    }
}
