//! Element-by-element breakdown of a formula: atom counts, mass contributions
//! and mass fractions, printable as a table.
use crate::Chemistry::element_table::ElementTable;
use crate::Chemistry::molmass::{Composition, FormulaParseError, parse_formula, round_mass};
use prettytable::{Table, row};

/// Mass contributed by one element of a formula
#[derive(Debug, Clone, PartialEq)]
pub struct ElementContribution {
    pub symbol: String,
    pub count: u32,
    pub atomic_mass: f64,
    /// count * atomic_mass, g/mol
    pub mass: f64,
    /// share of the molar mass, %
    pub mass_fraction: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FormulaReport {
    pub formula: String,
    pub composition: Composition,
    pub hill_formula: String,
    /// rounded molar mass, g/mol
    pub molar_mass: f64,
    pub contributions: Vec<ElementContribution>,
}

/// Parses the formula and computes the contribution of every element to its
/// molar mass.
pub fn analyze(formula: &str, table: &ElementTable) -> Result<FormulaReport, FormulaParseError> {
    let composition = parse_formula(formula, table)?;
    let unrounded = table.molar_mass(&composition)?;

    let mut contributions = Vec::with_capacity(composition.len());
    for (symbol, count) in composition.iter() {
        let atomic_mass = table
            .atomic_mass(symbol)
            .ok_or_else(|| FormulaParseError::UnknownElement {
                symbol: symbol.to_string(),
            })?;
        let mass = atomic_mass * count as f64;
        let mass_fraction = if unrounded > 0.0 {
            100.0 * mass / unrounded
        } else {
            0.0
        };
        contributions.push(ElementContribution {
            symbol: symbol.to_string(),
            count,
            atomic_mass,
            mass,
            mass_fraction,
        });
    }

    Ok(FormulaReport {
        formula: formula.trim().to_string(),
        hill_formula: composition.hill_formula(),
        composition,
        molar_mass: round_mass(unrounded),
        contributions,
    })
}

impl FormulaReport {
    pub fn to_table(&self) -> Table {
        let mut table = Table::new();
        table.add_row(row!["Element", "Atoms", "Atomic mass (g/mol)", "Mass (g/mol)", "Mass %"]);
        for c in &self.contributions {
            table.add_row(row![
                c.symbol,
                c.count,
                format!("{:.4}", c.atomic_mass),
                format!("{:.4}", c.mass),
                format!("{:.2}", c.mass_fraction)
            ]);
        }
        table.add_row(row!["Total", self.composition.total_atoms(), "", format!("{:.4}", self.molar_mass), "100.00"]);
        table
    }
}
