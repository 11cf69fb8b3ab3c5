/// eng
/// Table of the 118 chemical elements with standard atomic masses (g/mol).
/// The built-in table is created once per process; a table with user-defined
/// masses (isotopes, alternative data sources) can be derived from it.
pub mod element_table;
/// eng
/// Parser and evaluator of chemical formulas. The formula is split into hydrate
/// segments by dots (`CuSO4.5H2O`, `CuSO4·5H2O`), every segment may begin with
/// an integer multiplier, parentheses may be nested and carry a multiplier.
/// Produces the element composition and the molar mass rounded to 4 digits.
/// Unknown elements, unexpected characters and unbalanced parentheses are
/// reported as `FormulaParseError`; no partial result is ever returned.
/// # Examples
/// ```
/// use SpectroKit::Chemistry::element_table::ElementTable;
/// use SpectroKit::Chemistry::molmass::{evaluate, parse_formula};
/// let composition = parse_formula("Ca(OH)2", ElementTable::standard()).unwrap();
/// assert_eq!(composition.get("H"), 2);
/// assert_eq!(evaluate("2H2O"), evaluate("H4O2"));
/// ```
pub mod molmass;
/// Mass contributions and mass fractions of every element of a formula
pub mod formula_report;
