//! Table of chemical elements and their standard atomic masses.
//!
//! The built-in table holds all 118 elements with IUPAC abridged standard atomic
//! weights (g/mol). Elements without stable isotopes carry the mass number of
//! their longest-lived isotope. The table is built once per process and shared
//! read-only; a derived table with user overrides can be built once at startup
//! with [`ElementTable::with_overrides`].
use crate::Chemistry::molmass::{Composition, FormulaParseError};
use crate::Utils::load_from_file::{LoadError, load_element_overrides};
use regex::Regex;
use std::collections::HashMap;
use std::sync::OnceLock;
use thiserror::Error;

/// One entry of the element table
#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    pub symbol: String,
    pub name: String,
    /// 0 for user-defined symbols that are not periodic table elements (e.g. D)
    pub atomic_number: u8,
    pub atomic_mass: f64,
}

#[derive(Debug, Error)]
pub enum ElementTableError {
    #[error(transparent)]
    Load(#[from] LoadError),
    #[error("'{0}' is not a valid element symbol")]
    InvalidSymbol(String),
    #[error("Invalid atomic mass {mass} for element '{symbol}'")]
    InvalidMass { symbol: String, mass: f64 },
}

// (symbol, name, standard atomic mass)
const STANDARD_ELEMENTS: [(&str, &str, f64); 118] = [
    ("H", "Hydrogen", 1.008),
    ("He", "Helium", 4.0026),
    ("Li", "Lithium", 6.94),
    ("Be", "Beryllium", 9.0122),
    ("B", "Boron", 10.81),
    ("C", "Carbon", 12.011),
    ("N", "Nitrogen", 14.007),
    ("O", "Oxygen", 15.999),
    ("F", "Fluorine", 18.998),
    ("Ne", "Neon", 20.180),
    ("Na", "Sodium", 22.990),
    ("Mg", "Magnesium", 24.305),
    ("Al", "Aluminium", 26.982),
    ("Si", "Silicon", 28.085),
    ("P", "Phosphorus", 30.974),
    ("S", "Sulfur", 32.06),
    ("Cl", "Chlorine", 35.45),
    ("Ar", "Argon", 39.948),
    ("K", "Potassium", 39.098),
    ("Ca", "Calcium", 40.078),
    ("Sc", "Scandium", 44.956),
    ("Ti", "Titanium", 47.867),
    ("V", "Vanadium", 50.942),
    ("Cr", "Chromium", 51.996),
    ("Mn", "Manganese", 54.938),
    ("Fe", "Iron", 55.845),
    ("Co", "Cobalt", 58.933),
    ("Ni", "Nickel", 58.693),
    ("Cu", "Copper", 63.546),
    ("Zn", "Zinc", 65.38),
    ("Ga", "Gallium", 69.723),
    ("Ge", "Germanium", 72.630),
    ("As", "Arsenic", 74.922),
    ("Se", "Selenium", 78.971),
    ("Br", "Bromine", 79.904),
    ("Kr", "Krypton", 83.798),
    ("Rb", "Rubidium", 85.468),
    ("Sr", "Strontium", 87.62),
    ("Y", "Yttrium", 88.906),
    ("Zr", "Zirconium", 91.224),
    ("Nb", "Niobium", 92.906),
    ("Mo", "Molybdenum", 95.95),
    ("Tc", "Technetium", 98.0),
    ("Ru", "Ruthenium", 101.07),
    ("Rh", "Rhodium", 102.91),
    ("Pd", "Palladium", 106.42),
    ("Ag", "Silver", 107.87),
    ("Cd", "Cadmium", 112.41),
    ("In", "Indium", 114.82),
    ("Sn", "Tin", 118.71),
    ("Sb", "Antimony", 121.76),
    ("Te", "Tellurium", 127.60),
    ("I", "Iodine", 126.90),
    ("Xe", "Xenon", 131.29),
    ("Cs", "Caesium", 132.91),
    ("Ba", "Barium", 137.33),
    ("La", "Lanthanum", 138.91),
    ("Ce", "Cerium", 140.12),
    ("Pr", "Praseodymium", 140.91),
    ("Nd", "Neodymium", 144.24),
    ("Pm", "Promethium", 145.0),
    ("Sm", "Samarium", 150.36),
    ("Eu", "Europium", 151.96),
    ("Gd", "Gadolinium", 157.25),
    ("Tb", "Terbium", 158.93),
    ("Dy", "Dysprosium", 162.50),
    ("Ho", "Holmium", 164.93),
    ("Er", "Erbium", 167.26),
    ("Tm", "Thulium", 168.93),
    ("Yb", "Ytterbium", 173.05),
    ("Lu", "Lutetium", 174.97),
    ("Hf", "Hafnium", 178.49),
    ("Ta", "Tantalum", 180.95),
    ("W", "Tungsten", 183.84),
    ("Re", "Rhenium", 186.21),
    ("Os", "Osmium", 190.23),
    ("Ir", "Iridium", 192.22),
    ("Pt", "Platinum", 195.08),
    ("Au", "Gold", 196.97),
    ("Hg", "Mercury", 200.59),
    ("Tl", "Thallium", 204.38),
    ("Pb", "Lead", 207.2),
    ("Bi", "Bismuth", 208.98),
    ("Po", "Polonium", 209.0),
    ("At", "Astatine", 210.0),
    ("Rn", "Radon", 222.0),
    ("Fr", "Francium", 223.0),
    ("Ra", "Radium", 226.0),
    ("Ac", "Actinium", 227.0),
    ("Th", "Thorium", 232.04),
    ("Pa", "Protactinium", 231.04),
    ("U", "Uranium", 238.03),
    ("Np", "Neptunium", 237.0),
    ("Pu", "Plutonium", 244.0),
    ("Am", "Americium", 243.0),
    ("Cm", "Curium", 247.0),
    ("Bk", "Berkelium", 247.0),
    ("Cf", "Californium", 251.0),
    ("Es", "Einsteinium", 252.0),
    ("Fm", "Fermium", 257.0),
    ("Md", "Mendelevium", 258.0),
    ("No", "Nobelium", 259.0),
    ("Lr", "Lawrencium", 266.0),
    ("Rf", "Rutherfordium", 267.0),
    ("Db", "Dubnium", 268.0),
    ("Sg", "Seaborgium", 269.0),
    ("Bh", "Bohrium", 270.0),
    ("Hs", "Hassium", 277.0),
    ("Mt", "Meitnerium", 278.0),
    ("Ds", "Darmstadtium", 281.0),
    ("Rg", "Roentgenium", 282.0),
    ("Cn", "Copernicium", 285.0),
    ("Nh", "Nihonium", 286.0),
    ("Fl", "Flerovium", 289.0),
    ("Mc", "Moscovium", 290.0),
    ("Lv", "Livermorium", 293.0),
    ("Ts", "Tennessine", 294.0),
    ("Og", "Oganesson", 294.0),
];

fn symbol_pattern() -> &'static Regex {
    static SYMBOL: OnceLock<Regex> = OnceLock::new();
    SYMBOL.get_or_init(|| Regex::new(r"^[A-Z][a-z]?$").expect("symbol pattern is valid"))
}

/// Immutable symbol -> element lookup
#[derive(Debug, Clone)]
pub struct ElementTable {
    elements: Vec<Element>,
    index: HashMap<String, usize>,
}

impl ElementTable {
    fn from_elements(elements: Vec<Element>) -> Self {
        let index = elements
            .iter()
            .enumerate()
            .map(|(i, element)| (element.symbol.clone(), i))
            .collect();
        ElementTable { elements, index }
    }

    /// The built-in table of 118 elements, constructed on first use.
    pub fn standard() -> &'static ElementTable {
        static STANDARD: OnceLock<ElementTable> = OnceLock::new();
        STANDARD.get_or_init(|| {
            let elements = STANDARD_ELEMENTS
                .iter()
                .enumerate()
                .map(|(i, &(symbol, name, atomic_mass))| Element {
                    symbol: symbol.to_string(),
                    name: name.to_string(),
                    atomic_number: (i + 1) as u8,
                    atomic_mass,
                })
                .collect();
            ElementTable::from_elements(elements)
        })
    }

    /// Builds a new table from this one with the atomic masses replaced (or
    /// added, for symbols not in the table) by `overrides`.
    pub fn with_overrides(
        &self,
        overrides: &HashMap<String, f64>,
    ) -> Result<ElementTable, ElementTableError> {
        let mut elements = self.elements.clone();
        // sorted so that appended symbols get a stable position
        let mut symbols: Vec<&String> = overrides.keys().collect();
        symbols.sort();
        for symbol in symbols {
            let mass = overrides[symbol];
            if !symbol_pattern().is_match(symbol) {
                return Err(ElementTableError::InvalidSymbol(symbol.clone()));
            }
            if !mass.is_finite() || mass <= 0.0 {
                return Err(ElementTableError::InvalidMass {
                    symbol: symbol.clone(),
                    mass,
                });
            }
            match self.index.get(symbol) {
                Some(&i) => elements[i].atomic_mass = mass,
                None => elements.push(Element {
                    symbol: symbol.clone(),
                    name: symbol.clone(),
                    atomic_number: 0,
                    atomic_mass: mass,
                }),
            }
        }
        Ok(ElementTable::from_elements(elements))
    }

    /// Built-in table with the overrides from an `ELEMENTS` section of a file
    pub fn standard_with_overrides_from(path: &str) -> Result<ElementTable, ElementTableError> {
        let overrides = load_element_overrides(path)?;
        ElementTable::standard().with_overrides(&overrides)
    }

    pub fn get(&self, symbol: &str) -> Option<&Element> {
        self.index.get(symbol).map(|&i| &self.elements[i])
    }

    pub fn atomic_mass(&self, symbol: &str) -> Option<f64> {
        self.get(symbol).map(|element| element.atomic_mass)
    }

    pub fn contains(&self, symbol: &str) -> bool {
        self.index.contains_key(symbol)
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Element> {
        self.elements.iter()
    }

    /// Unrounded molar mass of an element composition.
    pub fn molar_mass(&self, composition: &Composition) -> Result<f64, FormulaParseError> {
        let mut molar_mass = 0.0;
        for (symbol, count) in composition.iter() {
            let atomic_mass = self
                .atomic_mass(symbol)
                .ok_or_else(|| FormulaParseError::UnknownElement {
                    symbol: symbol.to_string(),
                })?;
            molar_mass += atomic_mass * count as f64;
        }
        Ok(molar_mass)
    }
}
