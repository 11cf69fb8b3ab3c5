use crate::Chemistry::element_table::ElementTable;
use crate::Chemistry::formula_report::analyze;
use crate::Chemistry::molmass::{FormulaParseError, evaluate_all, evaluate_with};
use crate::Utils::load_from_file::load_formula_list;
use crate::settings::DEFAULT_CONFIG_FILE;
use clap::Parser;
use log::{error, info, warn};
use std::io::{self, BufRead, Write};

/// Molar masses of chemical formulas, including hydrates and nested groups.
/// Without formulas or --file an interactive menu starts.
#[derive(Parser, Debug, Clone, PartialEq)]
#[command(name = "spectrokit", version)]
pub struct CliArgs {
    /// JSON settings file
    #[arg(long, default_value = DEFAULT_CONFIG_FILE)]
    pub config: String,
    /// Print the element composition table of every formula
    #[arg(long)]
    pub report: bool,
    /// File with a `FORMULAS` section
    #[arg(long)]
    pub file: Option<String>,
    pub formulas: Vec<String>,
}

pub fn format_result(formula: &str, result: &Result<f64, FormulaParseError>) -> String {
    match result {
        Ok(mass) => format!("{} = {:.4} g/mol", formula.trim(), mass),
        Err(e) => format!("{}: error: {}", formula.trim(), e),
    }
}

/// Evaluates every formula and prints one line (or one report) per formula.
/// Returns false if any formula failed.
pub fn run_formulas<W: Write>(
    out: &mut W,
    formulas: &[String],
    table: &ElementTable,
    report: bool,
) -> io::Result<bool> {
    let mut all_ok = true;
    for formula in formulas {
        if report {
            match analyze(formula, table) {
                Ok(report) => {
                    writeln!(
                        out,
                        "{} ({}): M = {:.4} g/mol",
                        report.formula, report.hill_formula, report.molar_mass
                    )?;
                    report.to_table().print(out)?;
                }
                Err(e) => {
                    warn!("failed to evaluate {}: {}", formula, e);
                    writeln!(out, "{}", format_result(formula, &Err(e)))?;
                    all_ok = false;
                }
            }
        } else {
            let result = evaluate_with(formula, table);
            if let Err(e) = &result {
                warn!("failed to evaluate {}: {}", formula, e);
                all_ok = false;
            }
            writeln!(out, "{}", format_result(formula, &result))?;
        }
    }
    Ok(all_ok)
}

/// Runs the command line; returns false if any formula failed
pub fn run_cli(cli: &CliArgs, table: &ElementTable) -> io::Result<bool> {
    let mut formulas = cli.formulas.clone();
    if let Some(file) = &cli.file {
        match load_formula_list(file) {
            Ok(from_file) => formulas.extend(from_file),
            Err(e) => {
                error!("{}", e);
                return Ok(false);
            }
        }
    }
    let stdout = io::stdout();
    if formulas.is_empty() {
        run_interactive_menu(&mut stdout.lock(), &mut io::stdin().lock(), table)?;
        return Ok(true);
    }
    info!("evaluating {} formulas", formulas.len());
    run_formulas(&mut stdout.lock(), &formulas, table, cli.report)
}

/* colors
Blue (\x1b[34m) - Welcome header text
Yellow (\x1b[33m) - Menu options
Cyan (\x1b[36m) - prompts
Reset (\x1b[0m) - Returns to normal color after each colored section
*/
fn show_main_menu<W: Write>(out: &mut W) -> io::Result<()> {
    writeln!(
        out,
        "\x1b[34m\n SpectroKit: molar masses of chemical formulas \n\x1b[0m"
    )?;
    writeln!(out, "\x1b[33m1. Molar mass\x1b[0m")?;
    writeln!(out, "\x1b[33m2. Composition report\x1b[0m")?;
    writeln!(out, "\x1b[33m3. Batch (comma-separated formulas)\x1b[0m")?;
    writeln!(out, "\x1b[33m4. Element lookup\x1b[0m")?;
    writeln!(out, "\x1b[33m0. Exit\x1b[0m")?;
    write!(out, "\x1b[36mEnter your choice: \x1b[0m")?;
    out.flush()
}

/// Prompts and reads one line; None at end of input
fn prompt<W: Write, R: BufRead>(out: &mut W, input: &mut R, text: &str) -> io::Result<Option<String>> {
    write!(out, "\x1b[36m{text}\x1b[0m")?;
    out.flush()?;
    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        return Ok(None);
    }
    Ok(Some(line.trim().to_string()))
}

pub fn run_interactive_menu<W: Write, R: BufRead>(
    out: &mut W,
    input: &mut R,
    table: &ElementTable,
) -> io::Result<()> {
    loop {
        show_main_menu(out)?;
        let mut choice = String::new();
        if input.read_line(&mut choice)? == 0 {
            break;
        }
        match choice.trim() {
            "1" => {
                let Some(formula) = prompt(out, input, "Formula: ")? else {
                    break;
                };
                writeln!(out, "{}", format_result(&formula, &evaluate_with(&formula, table)))?;
            }
            "2" => {
                let Some(formula) = prompt(out, input, "Formula: ")? else {
                    break;
                };
                run_formulas(out, &[formula], table, true)?;
            }
            "3" => {
                let Some(line) = prompt(out, input, "Formulas: ")? else {
                    break;
                };
                let formulas: Vec<&str> = line
                    .split(',')
                    .map(str::trim)
                    .filter(|f| !f.is_empty())
                    .collect();
                for (formula, result) in formulas.iter().zip(evaluate_all(&formulas, table)) {
                    writeln!(out, "{}", format_result(formula, &result))?;
                }
            }
            "4" => {
                let Some(symbol) = prompt(out, input, "Element symbol: ")? else {
                    break;
                };
                match table.get(&symbol) {
                    Some(element) => writeln!(
                        out,
                        "{} ({}), Z = {}, M = {} g/mol",
                        element.symbol, element.name, element.atomic_number, element.atomic_mass
                    )?,
                    None => writeln!(out, "unknown element symbol '{symbol}'")?,
                }
            }
            "0" => {
                writeln!(out, "Goodbye!")?;
                break;
            }
            _ => writeln!(out, "Invalid choice. Please try again.")?,
        }
    }
    Ok(())
}
