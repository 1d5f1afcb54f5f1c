// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Input table loading.
//!
//! All model inputs are flat text tables read once at startup: a section
//! name list, numeric tables delimited by whitespace or commas, and
//! two-column classification tables. Parse failures carry the file and
//! 1-based line number.

use crate::types::{ConfigError, ConfigResult};
use ndarray::Array2;
use std::fs;
use std::path::Path;

fn read_file(path: &Path) -> ConfigResult<String> {
    fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn split_fields(line: &str) -> impl Iterator<Item = &str> {
    line.split(|c: char| c.is_whitespace() || c == ',')
        .filter(|f| !f.is_empty())
}

/// Load a section name list, one name per line. Blank lines are skipped.
pub fn load_name_list(path: &Path) -> ConfigResult<Vec<String>> {
    let content = read_file(path)?;
    Ok(content
        .lines()
        .map(|line| line.trim())
        .filter(|line| !line.is_empty())
        .map(|line| line.to_string())
        .collect())
}

/// Load a numeric table with a fixed column count into a 2-D array.
///
/// Fields may be separated by whitespace or commas. A row with the wrong
/// number of fields, or a field that does not parse as a float, is a
/// configuration error naming the offending line.
pub fn load_table(path: &Path, ncols: usize) -> ConfigResult<Array2<f64>> {
    let content = read_file(path)?;
    let mut values = Vec::new();
    let mut nrows = 0;

    for (lineno, line) in content.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let row = lineno + 1;
        let fields: Vec<&str> = split_fields(line).collect();
        if fields.len() != ncols {
            return Err(ConfigError::MalformedRow {
                path: path.to_path_buf(),
                row,
                detail: format!("expected {} fields, found {}", ncols, fields.len()),
            });
        }
        for field in fields {
            let value = field.parse::<f64>().map_err(|_| ConfigError::MalformedRow {
                path: path.to_path_buf(),
                row,
                detail: format!("'{}' is not a number", field),
            })?;
            values.push(value);
        }
        nrows += 1;
    }

    Array2::from_shape_vec((nrows, ncols), values).map_err(|e| ConfigError::MalformedRow {
        path: path.to_path_buf(),
        row: 0,
        detail: e.to_string(),
    })
}

/// Load a two-column integer table as (index, id) pairs.
pub fn load_pairs(path: &Path) -> ConfigResult<Vec<(i64, i64)>> {
    let table = load_table(path, 2)?;
    Ok(table
        .rows()
        .into_iter()
        .map(|row| (row[0] as i64, row[1] as i64))
        .collect())
}

/// Load a two-column table as (integer id, float value) pairs.
pub fn load_value_pairs(path: &Path) -> ConfigResult<Vec<(i64, f64)>> {
    let table = load_table(path, 2)?;
    Ok(table
        .rows()
        .into_iter()
        .map(|row| (row[0] as i64, row[1]))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::Write;
    use tempfile::tempdir;

    #[test]
    fn test_load_name_list_skips_blanks() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("names.dlist");
        let mut file = File::create(&path).unwrap();
        writeln!(file, "b0s01[1]").unwrap();
        writeln!(file).unwrap();
        writeln!(file, "b0s02[24]").unwrap();

        let names = load_name_list(&path).unwrap();
        assert_eq!(names, vec!["b0s01[1]", "b0s02[24]"]);
    }

    #[test]
    fn test_load_table_whitespace_and_commas() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("table.csv");
        let mut file = File::create(&path).unwrap();
        writeln!(file, "0 1.5 -2").unwrap();
        writeln!(file, "1,2.5,3").unwrap();

        let table = load_table(&path, 3).unwrap();
        assert_eq!(table.nrows(), 2);
        assert_eq!(table[[0, 1]], 1.5);
        assert_eq!(table[[1, 2]], 3.0);
    }

    #[test]
    fn test_load_table_wrong_column_count() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("table.csv");
        let mut file = File::create(&path).unwrap();
        writeln!(file, "0 1 2 3").unwrap();
        writeln!(file, "4 5 6").unwrap();

        let err = load_table(&path, 4).unwrap_err();
        match err {
            ConfigError::MalformedRow { row, .. } => assert_eq!(row, 2),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_load_table_non_numeric_field() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("table.csv");
        let mut file = File::create(&path).unwrap();
        writeln!(file, "0 abc").unwrap();

        let err = load_table(&path, 2).unwrap_err();
        assert!(matches!(err, ConfigError::MalformedRow { row: 1, .. }));
    }

    #[test]
    fn test_load_pairs() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("subsets.txt");
        let mut file = File::create(&path).unwrap();
        writeln!(file, "0 5").unwrap();
        writeln!(file, "1 5").unwrap();
        writeln!(file, "2 10").unwrap();

        let pairs = load_pairs(&path).unwrap();
        assert_eq!(pairs, vec![(0, 5), (1, 5), (2, 10)]);
    }

    #[test]
    fn test_missing_file() {
        let err = load_name_list(Path::new("/nonexistent/names.dlist")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
