//! Tile identifiers.
//!
//! A tile id is a fixed-width run of ASCII digits somewhere in a path. The
//! first half of the digits is the row, the second half the column:
//! `078095` is row `078`, column `095`.

use std::fmt;
use std::path::Path;

use regex::Regex;

use crate::error::{DiscoveryError, MalformedTileIdError};

/// Default number of digits in a tile id.
pub const DEFAULT_ID_WIDTH: usize = 6;

/// Widest id whose row and column halves still fit in a `u64`.
pub const MAX_ID_WIDTH: usize = 38;

// =============================================================================
// TileId
// =============================================================================

/// A parsed tile id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TileId {
    digits: String,
}

impl TileId {
    /// The full id, e.g. `078095`.
    pub fn as_str(&self) -> &str {
        &self.digits
    }

    /// Row digits, e.g. `078`.
    pub fn row(&self) -> &str {
        &self.digits[..self.digits.len() / 2]
    }

    /// Column digits, e.g. `095`.
    pub fn col(&self) -> &str {
        &self.digits[self.digits.len() / 2..]
    }

    /// Row as an integer with leading zeros dropped.
    pub fn row_number(&self) -> u64 {
        digits_value(self.row())
    }

    /// Column as an integer with leading zeros dropped.
    pub fn col_number(&self) -> u64 {
        digits_value(self.col())
    }
}

impl fmt::Display for TileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.digits)
    }
}

fn digits_value(digits: &str) -> u64 {
    digits
        .bytes()
        .fold(0u64, |acc, b| acc * 10 + u64::from(b - b'0'))
}

// =============================================================================
// TileIdParser
// =============================================================================

/// Finds tile ids of a fixed width.
#[derive(Debug, Clone)]
pub struct TileIdParser {
    width: usize,
    pattern: Regex,
}

impl TileIdParser {
    /// Create a parser for ids of `width` digits.
    ///
    /// The width must be even and non-zero so the id splits into equal row
    /// and column halves, and at most [`MAX_ID_WIDTH`].
    pub fn new(width: usize) -> Result<Self, DiscoveryError> {
        if width == 0 || width % 2 != 0 || width > MAX_ID_WIDTH {
            return Err(DiscoveryError::InvalidIdWidth(width));
        }
        let source = format!("[0-9]{{{}}}", width);
        let pattern = Regex::new(&source).map_err(|e| DiscoveryError::InvalidPattern {
            pattern: source.clone(),
            message: e.to_string(),
        })?;
        Ok(Self { width, pattern })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    /// Parse the first id found anywhere in `text`.
    pub fn parse(&self, text: &str) -> Result<TileId, MalformedTileIdError> {
        self.pattern
            .find(text)
            .map(|m| TileId {
                digits: m.as_str().to_string(),
            })
            .ok_or_else(|| MalformedTileIdError {
                path: text.to_string(),
                width: self.width,
            })
    }

    /// Parse the id from the final component of a path.
    pub fn parse_file_name(&self, path: &Path) -> Result<TileId, MalformedTileIdError> {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy())
            .unwrap_or_default();
        self.parse(&name).map_err(|_| MalformedTileIdError {
            path: path.display().to_string(),
            width: self.width,
        })
    }

    /// Parse the first id found in the whole path.
    pub fn parse_path(&self, path: &Path) -> Result<TileId, MalformedTileIdError> {
        self.parse(&path.to_string_lossy())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn parser() -> TileIdParser {
        TileIdParser::new(DEFAULT_ID_WIDTH).unwrap()
    }

    // -------------------------------------------------------------------------
    // Parsing Tests
    // -------------------------------------------------------------------------

    #[test]
    fn test_parse_splits_row_and_col() {
        let id = parser().parse("sen2_2021_t078095.tif").unwrap();
        assert_eq!(id.as_str(), "078095");
        assert_eq!(id.row(), "078");
        assert_eq!(id.col(), "095");
        assert_eq!(id.row_number(), 78);
        assert_eq!(id.col_number(), 95);
        assert_eq!(id.to_string(), "078095");
    }

    #[test]
    fn test_row_and_col_reconstruct_id() {
        let parser = parser();
        for text in [
            "tile001001/tile001001.tif",
            "a/b/123456_x.tif",
            "000000",
            "prefix999999suffix",
        ] {
            let id = parser.parse(text).unwrap();
            assert_eq!(format!("{}{}", id.row(), id.col()), id.as_str());
            assert_eq!(id.as_str().len(), 6);
        }
    }

    #[test]
    fn test_first_match_wins() {
        let parser = parser();
        let path = PathBuf::from("data/tile078095/sen2_t111222.tif");
        assert_eq!(parser.parse_path(&path).unwrap().as_str(), "078095");
        assert_eq!(parser.parse_file_name(&path).unwrap().as_str(), "111222");
    }

    #[test]
    fn test_longer_digit_run_takes_leading_digits() {
        assert_eq!(parser().parse("t12345678.tif").unwrap().as_str(), "123456");
    }

    #[test]
    fn test_missing_id_is_malformed() {
        let err = parser().parse("tile12345.tif").unwrap_err();
        assert_eq!(err.path, "tile12345.tif");
        assert_eq!(err.width, 6);
    }

    #[test]
    fn test_file_name_error_reports_full_path() {
        let path = PathBuf::from("tile001001/readme.tif");
        let err = parser().parse_file_name(&path).unwrap_err();
        assert_eq!(err.path, path.display().to_string());
    }

    #[test]
    fn test_non_ascii_digits_ignored() {
        assert!(parser().parse("tile٠١٢٣٤٥.tif").is_err());
    }

    // -------------------------------------------------------------------------
    // Width Tests
    // -------------------------------------------------------------------------

    #[test]
    fn test_custom_width() {
        let parser = TileIdParser::new(4).unwrap();
        let id = parser.parse("r0712.tif").unwrap();
        assert_eq!(id.row(), "07");
        assert_eq!(id.col(), "12");
    }

    #[test]
    fn test_invalid_width() {
        assert!(matches!(
            TileIdParser::new(0),
            Err(DiscoveryError::InvalidIdWidth(0))
        ));
        assert!(matches!(
            TileIdParser::new(5),
            Err(DiscoveryError::InvalidIdWidth(5))
        ));
        assert!(matches!(
            TileIdParser::new(42),
            Err(DiscoveryError::InvalidIdWidth(42))
        ));
    }

    #[test]
    fn test_widest_id_fits_row_number() {
        let parser = TileIdParser::new(MAX_ID_WIDTH).unwrap();
        let digits = "9".repeat(MAX_ID_WIDTH);
        let id = parser.parse(&digits).unwrap();
        assert_eq!(id.row_number(), 9_999_999_999_999_999_999);
        assert_eq!(id.col_number(), 9_999_999_999_999_999_999);
    }
}
