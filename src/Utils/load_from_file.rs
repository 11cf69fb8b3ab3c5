use log::{error, info, warn};
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use thiserror::Error;

/// Headers that open a section of an input file
const ELEMENT_HEADERS: [&str; 2] = ["ELEMENTS", "ATOMIC MASSES"];
const FORMULA_HEADERS: [&str; 2] = ["FORMULAS", "SUBSTANCES"];

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("File '{0}' does not exist")]
    FileNotFound(String),
    #[error("Failed to read file '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("No '{header}' header found in file '{path}'")]
    MissingHeader { header: String, path: String },
    #[error("Error parsing atomic masses at line {line}, column {column} (line {file_line} in file): {message}")]
    Json {
        line: usize,
        column: usize,
        file_line: usize,
        message: String,
    },
    #[error("No formulas found in file '{0}'")]
    NoFormulas(String),
}

fn read_lines(file_name: &str) -> Result<Vec<String>, LoadError> {
    let path = Path::new(file_name);
    if !path.exists() {
        return Err(LoadError::FileNotFound(file_name.to_string()));
    }
    let file = File::open(path).map_err(|source| LoadError::Io {
        path: file_name.to_string(),
        source,
    })?;
    BufReader::new(file)
        .lines()
        .collect::<Result<Vec<_>, _>>()
        .map_err(|source| LoadError::Io {
            path: file_name.to_string(),
            source,
        })
}

fn is_header(line: &str) -> bool {
    let trimmed = line.trim().to_uppercase();
    ELEMENT_HEADERS.contains(&trimmed.as_str()) || FORMULA_HEADERS.contains(&trimmed.as_str())
}

/// Any non-empty line made only of uppercase letters, `_` and spaces, e.g.
/// `NOTES` or `ATOMIC MASSES`. Formula lines such as `CO` also match, so formula
/// sections end only at a known header.
fn is_section_end(line: &str) -> bool {
    let trimmed = line.trim();
    trimmed.chars().any(|c| c.is_alphabetic())
        && trimmed.chars().all(|c| c.is_uppercase() || c == '_' || c == ' ')
}

/// Line range of the section opened by one of `headers`: from the line after the
/// header up to the first line accepted by `is_end` or the end of the file.
fn find_section(
    lines: &[String],
    headers: &[&str],
    is_end: fn(&str) -> bool,
    file_name: &str,
) -> Result<(usize, usize), LoadError> {
    let start_index = lines
        .iter()
        .position(|line| headers.contains(&line.trim().to_uppercase().as_str()))
        .map(|i| i + 1)
        .ok_or_else(|| LoadError::MissingHeader {
            header: headers[0].to_string(),
            path: file_name.to_string(),
        })?;
    let end_index = lines[start_index..]
        .iter()
        .position(|line| is_end(line))
        .map_or(lines.len(), |i| start_index + i);
    Ok((start_index, end_index))
}

/// Parses the `ELEMENTS` (or `ATOMIC MASSES`) section of a file: a JSON object
/// mapping element symbols to atomic masses, e.g.
/// ```text
/// ELEMENTS
/// { "O": 16.0, "D": 2.014 }
/// ```
pub fn load_element_overrides(file_name: &str) -> Result<HashMap<String, f64>, LoadError> {
    let lines = read_lines(file_name)?;
    let (start_index, end_index) = find_section(&lines, &ELEMENT_HEADERS, is_section_end, file_name)?;
    let section = lines[start_index..end_index].join("\n");

    match serde_json::from_str::<HashMap<String, f64>>(&section) {
        Ok(overrides) => {
            if overrides.is_empty() {
                warn!("File '{}' contains no atomic mass overrides", file_name);
            }
            info!(
                "Loaded {} atomic mass overrides from file '{}'",
                overrides.len(),
                file_name
            );
            Ok(overrides)
        }
        Err(e) => {
            let (line, column) = (e.line(), e.column());
            // serde_json lines are 1-based and relative to the section
            let actual_line = start_index + line.max(1) - 1;
            error!(
                "Error parsing atomic masses at line {}, column {} (line {} in file): {}",
                line,
                column,
                actual_line + 1,
                e
            );
            if let Some(problem_line) = lines.get(actual_line) {
                error!("Problematic line: {}", problem_line);
                if column >= 1 && column <= problem_line.len() {
                    error!("{}", " ".repeat(column - 1) + "^");
                }
            }
            Err(LoadError::Json {
                line,
                column,
                file_line: actual_line + 1,
                message: e.to_string(),
            })
        }
    }
}

/// Loads formulas listed under a `FORMULAS` (or `SUBSTANCES`) header, separated
/// by commas or newlines.
pub fn load_formula_list(file_name: &str) -> Result<Vec<String>, LoadError> {
    let lines = read_lines(file_name)?;
    let (start_index, end_index) = find_section(&lines, &FORMULA_HEADERS, is_header, file_name)?;
    let formulas: Vec<String> = lines[start_index..end_index]
        .iter()
        .flat_map(|line| line.split(','))
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();
    if formulas.is_empty() {
        return Err(LoadError::NoFormulas(file_name.to_string()));
    }
    info!("Loaded {} formulas from file '{}'", formulas.len(), file_name);
    Ok(formulas)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_load_element_overrides() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(temp_file, "Some header text").unwrap();
        writeln!(temp_file, "ELEMENTS").unwrap();
        writeln!(temp_file, "{{").unwrap();
        writeln!(temp_file, "  \"O\": 16.0,").unwrap();
        writeln!(temp_file, "  \"D\": 2.014").unwrap();
        writeln!(temp_file, "}}").unwrap();
        writeln!(temp_file, "FORMULAS").unwrap();
        writeln!(temp_file, "H2O, D2O").unwrap();

        let file_path = temp_file.path().to_str().unwrap();
        let overrides = load_element_overrides(file_path).unwrap();
        assert_eq!(overrides.len(), 2);
        assert_eq!(overrides["O"], 16.0);
        assert_eq!(overrides["D"], 2.014);

        let formulas = load_formula_list(file_path).unwrap();
        assert_eq!(formulas, vec!["H2O".to_string(), "D2O".to_string()]);
    }

    #[test]
    fn test_atomic_masses_header_is_case_insensitive() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(temp_file, "atomic masses").unwrap();
        writeln!(temp_file, "{{ \"Cl\": 35.453 }}").unwrap();

        let overrides = load_element_overrides(temp_file.path().to_str().unwrap()).unwrap();
        assert_eq!(overrides["Cl"], 35.453);
    }

    #[test]
    fn test_element_section_ends_at_any_uppercase_header() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(temp_file, "ELEMENTS").unwrap();
        writeln!(temp_file, "{{ \"O\": 16.0 }}").unwrap();
        writeln!(temp_file, "NOTES").unwrap();
        writeln!(temp_file, "measured in 2024").unwrap();
        writeln!(temp_file, "LAB RESULTS").unwrap();
        writeln!(temp_file, "nothing yet").unwrap();

        let overrides = load_element_overrides(temp_file.path().to_str().unwrap()).unwrap();
        assert_eq!(overrides.len(), 1);
        assert_eq!(overrides["O"], 16.0);

        assert!(is_section_end("NOTES"));
        assert!(is_section_end("  ATOMIC MASSES "));
        assert!(is_section_end("LAB_RESULTS"));
        assert!(!is_section_end(""));
        assert!(!is_section_end("}"));
        assert!(!is_section_end("  \"O\": 16.0,"));
    }

    #[test]
    fn test_load_element_overrides_errors() {
        assert!(matches!(
            load_element_overrides("definitely_not_a_file_4d1f.txt"),
            Err(LoadError::FileNotFound(_))
        ));

        let mut no_header = NamedTempFile::new().unwrap();
        writeln!(no_header, "{{ \"O\": 16.0 }}").unwrap();
        assert!(matches!(
            load_element_overrides(no_header.path().to_str().unwrap()),
            Err(LoadError::MissingHeader { .. })
        ));

        let mut bad_json = NamedTempFile::new().unwrap();
        writeln!(bad_json, "ELEMENTS").unwrap();
        writeln!(bad_json, "{{").unwrap();
        writeln!(bad_json, "  \"O\": \"heavy\"").unwrap();
        writeln!(bad_json, "}}").unwrap();
        match load_element_overrides(bad_json.path().to_str().unwrap()) {
            Err(LoadError::Json { line, file_line, .. }) => {
                assert_eq!(line, 2);
                assert_eq!(file_line, 3);
            }
            other => panic!("expected a JSON error, got {:?}", other),
        }
    }

    #[test]
    fn test_load_formula_list() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(temp_file, "SUBSTANCES").unwrap();
        writeln!(temp_file, "CuSO4.5H2O, NaCl").unwrap();
        writeln!(temp_file, "").unwrap();
        writeln!(temp_file, "CO").unwrap();
        let formulas = load_formula_list(temp_file.path().to_str().unwrap()).unwrap();
        assert_eq!(formulas, vec!["CuSO4.5H2O", "NaCl", "CO"]);

        let mut empty = NamedTempFile::new().unwrap();
        writeln!(empty, "FORMULAS").unwrap();
        assert!(matches!(
            load_formula_list(empty.path().to_str().unwrap()),
            Err(LoadError::NoFormulas(_))
        ));
    }
}
