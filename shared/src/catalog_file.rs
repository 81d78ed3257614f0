//! Reader for flat-text star lists.
//!
//! One star per line, RA and Dec in degrees as the first two comma separated
//! fields. Surrounding square brackets are optional and further columns
//! (magnitudes, proper motions) are ignored:
//!
//! ```text
//! [0.123456, -19.987654, 7.91, 8.02]
//! ```
//!
//! Blank lines and lines starting with `#` are skipped.

use crate::coordinate::{Coordinate, CoordinateError};
use log::debug;
use std::io::BufRead;
use std::path::Path;
use thiserror::Error;

/// Errors raised while reading a catalog file.
#[derive(Error, Debug)]
pub enum CatalogFileError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Line {line}: expected at least 2 fields, found {found}")]
    MissingFields { line: usize, found: usize },

    #[error("Line {line}: cannot parse {field:?} as a number")]
    InvalidNumber { line: usize, field: String },

    #[error("Line {line}: {source}")]
    InvalidCoordinate {
        line: usize,
        #[source]
        source: CoordinateError,
    },
}

/// Parse a single catalog line. `line_number` is 1-based and only used for errors.
pub fn parse_catalog_line(line: &str, line_number: usize) -> Result<Coordinate, CatalogFileError> {
    let trimmed = line.trim().trim_start_matches('[').trim_end_matches(']');
    let fields: Vec<&str> = trimmed.split(',').map(str::trim).collect();
    if fields.len() < 2 {
        return Err(CatalogFileError::MissingFields {
            line: line_number,
            found: fields.len(),
        });
    }

    let parse = |field: &str| {
        field
            .parse::<f64>()
            .map_err(|_| CatalogFileError::InvalidNumber {
                line: line_number,
                field: field.to_string(),
            })
    };
    let ra = parse(fields[0])?;
    let dec = parse(fields[1])?;

    Coordinate::new(ra, dec).map_err(|source| CatalogFileError::InvalidCoordinate {
        line: line_number,
        source,
    })
}

/// Read every star from a catalog stream, preserving file order.
pub fn read_catalog<R: BufRead>(reader: R) -> Result<Vec<Coordinate>, CatalogFileError> {
    let mut stars = Vec::new();
    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        let content = line.trim();
        if content.is_empty() || content.starts_with('#') {
            continue;
        }
        stars.push(parse_catalog_line(content, index + 1)?);
    }
    Ok(stars)
}

/// Read a catalog file from disk.
pub fn load_catalog(path: &Path) -> Result<Vec<Coordinate>, CatalogFileError> {
    let file = std::fs::File::open(path)?;
    let stars = read_catalog(std::io::BufReader::new(file))?;
    debug!("Read {} catalog stars from {}", stars.len(), path.display());
    Ok(stars)
}
