//! Two-line element set parsing
//!
//! Accepts the two shapes found in catalog dumps: a name line followed by
//! the two element lines, or a bare pair of element lines. Bad records are
//! logged and skipped; the batch always continues.

use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;

use chrono::{DateTime, Duration, TimeZone, Utc};
use flate2::read::GzDecoder;
use thiserror::Error;

use crate::error::{EngineError, Result};

// The epoch field ends at column 32 and the mean motion at column 63.
const MIN_LINE_LEN: usize = 64;
const MICROS_PER_DAY: f64 = 86_400_000_000.0;

/// A named two-line element set with its decoded epoch
#[derive(Debug, Clone, PartialEq)]
pub struct OrbitalElementSet {
    pub name: String,
    pub line1: String,
    pub line2: String,
    /// Absolute time the elements are valid at
    pub epoch: DateTime<Utc>,
}

/// Reasons an element-set record is rejected
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ElementError {
    #[error("line {line} is {len} characters, expected at least {MIN_LINE_LEN}")]
    LineTooShort { line: u8, len: usize },

    #[error("catalog number mismatch between lines ({line1:?} vs {line2:?})")]
    CatalogMismatch { line1: String, line2: String },

    #[error("unreadable epoch field {0:?}")]
    BadEpoch(String),
}

impl OrbitalElementSet {
    /// Validate the two element lines and decode the epoch
    pub fn new(
        name: impl Into<String>,
        line1: impl Into<String>,
        line2: impl Into<String>,
    ) -> std::result::Result<Self, ElementError> {
        let line1 = line1.into();
        let line2 = line2.into();

        if line1.len() < MIN_LINE_LEN {
            return Err(ElementError::LineTooShort {
                line: 1,
                len: line1.len(),
            });
        }
        if line2.len() < MIN_LINE_LEN {
            return Err(ElementError::LineTooShort {
                line: 2,
                len: line2.len(),
            });
        }

        let cat1 = catalog_field(&line1);
        let cat2 = catalog_field(&line2);
        if cat1.is_none() || cat1 != cat2 {
            return Err(ElementError::CatalogMismatch {
                line1: cat1.unwrap_or_default().to_string(),
                line2: cat2.unwrap_or_default().to_string(),
            });
        }

        let epoch = parse_epoch(&line1)?;

        Ok(Self {
            name: name.into().trim().to_string(),
            line1,
            line2,
            epoch,
        })
    }

    /// Catalog number as written in columns 3-7 of line 1
    pub fn catalog_number(&self) -> &str {
        catalog_field(&self.line1).unwrap_or_default()
    }
}

fn catalog_field(line: &str) -> Option<&str> {
    line.get(2..7).map(str::trim)
}

/// Decode the `YYDDD.DDDDDDDD` epoch field of line 1
fn parse_epoch(line1: &str) -> std::result::Result<DateTime<Utc>, ElementError> {
    let field = line1
        .get(18..32)
        .ok_or_else(|| ElementError::BadEpoch(line1.to_string()))?;
    let bad = || ElementError::BadEpoch(field.to_string());

    let field_trim = field.trim();
    let yy: i32 = field_trim.get(..2).ok_or_else(bad)?.parse().map_err(|_| bad())?;
    let day: f64 = field_trim.get(2..).ok_or_else(bad)?.parse().map_err(|_| bad())?;
    if !(1.0..367.0).contains(&day) {
        return Err(bad());
    }

    let year = if yy < 57 { 2000 + yy } else { 1900 + yy };
    let jan1 = Utc
        .with_ymd_and_hms(year, 1, 1, 0, 0, 0)
        .single()
        .ok_or_else(bad)?;

    let offset = Duration::microseconds(((day - 1.0) * MICROS_PER_DAY).round() as i64);
    Ok(jan1 + offset)
}

fn is_line1(line: &str) -> bool {
    line.starts_with("1 ")
}

fn is_line2(line: &str) -> bool {
    line.starts_with("2 ")
}

/// Extract element sets from raw lines.
///
/// Lines that fit neither block shape are skipped one at a time, so stray
/// headers or blank lines never desynchronise the scan.
pub fn parse_element_sets<I, S>(lines: I) -> Vec<OrbitalElementSet>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let lines: Vec<String> = lines
        .into_iter()
        .map(|l| l.as_ref().trim().to_string())
        .collect();

    let mut sets = Vec::new();
    let mut i = 0;
    while i < lines.len() {
        if i + 2 < lines.len() && is_line1(&lines[i + 1]) && is_line2(&lines[i + 2]) {
            let name = &lines[i];
            match OrbitalElementSet::new(name.as_str(), &lines[i + 1], &lines[i + 2]) {
                Ok(set) => sets.push(set),
                Err(e) => log::warn!("Skipping element set {:?}: {}", name, e),
            }
            i += 3;
        } else if i + 1 < lines.len() && is_line1(&lines[i]) && is_line2(&lines[i + 1]) {
            let name = lines[i].split_whitespace().nth(1).unwrap_or_default();
            match OrbitalElementSet::new(name, &lines[i], &lines[i + 1]) {
                Ok(set) => sets.push(set),
                Err(e) => log::warn!("Skipping bare element set at line {}: {}", i + 1, e),
            }
            i += 2;
        } else {
            i += 1;
        }
    }

    sets
}

/// Read and parse an element-set file. `.gz` files are decompressed on the fly.
///
/// An empty result is returned as `Ok`; whether that is fatal is up to the caller.
pub fn load_element_sets(path: impl AsRef<Path>) -> Result<Vec<OrbitalElementSet>> {
    let path = path.as_ref();
    log::info!("Loading element sets from {:?}", path);

    let read_err = |source| EngineError::Read {
        path: path.to_path_buf(),
        source,
    };

    let file = File::open(path).map_err(read_err)?;
    let reader: Box<dyn Read> = if path.extension().is_some_and(|ext| ext == "gz") {
        Box::new(GzDecoder::new(BufReader::new(file)))
    } else {
        Box::new(file)
    };

    let lines = BufReader::new(reader)
        .lines()
        .collect::<std::io::Result<Vec<String>>>()
        .map_err(read_err)?;

    let sets = parse_element_sets(&lines);
    log::info!("Loaded {} element sets from {:?}", sets.len(), path);
    Ok(sets)
}

/// Apply the name filter (case-insensitive substring) and then the count limit
pub fn select_element_sets(
    sets: Vec<OrbitalElementSet>,
    name_filter: Option<&str>,
    limit: Option<usize>,
) -> Vec<OrbitalElementSet> {
    let mut selected: Vec<OrbitalElementSet> = match name_filter {
        Some(key) if !key.is_empty() => {
            let key = key.to_lowercase();
            sets.into_iter()
                .filter(|s| s.name.to_lowercase().contains(&key))
                .collect()
        }
        _ => sets,
    };
    if let Some(limit) = limit {
        selected.truncate(limit);
    }
    selected
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;
    use std::io::Write;

    const ISS_L1: &str =
        "1 25544U 98067A   24001.50000000  .00016717  00000-0  10270-3 0  9005";
    const ISS_L2: &str =
        "2 25544  51.6416 247.4627 0006703 130.5360 325.0288 15.72125391563537";

    #[test]
    fn test_three_line_block() {
        let sets = parse_element_sets(["ISS (ZARYA)", ISS_L1, ISS_L2]);
        assert_eq!(sets.len(), 1);
        assert_eq!(sets[0].name, "ISS (ZARYA)");
        assert_eq!(sets[0].catalog_number(), "25544");
    }

    #[test]
    fn test_bare_two_line_block_takes_name_from_line1() {
        let sets = parse_element_sets([ISS_L1, ISS_L2]);
        assert_eq!(sets.len(), 1);
        assert_eq!(sets[0].name, "25544U");
    }

    #[test]
    fn test_epoch_decoding() {
        let set = OrbitalElementSet::new("ISS", ISS_L1, ISS_L2).unwrap();
        let expected = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
        assert_eq!(set.epoch, expected);

        // 1998 epoch, two-digit year >= 57
        let old = ISS_L1.replace("24001.50000000", "98264.51782528");
        let set = OrbitalElementSet::new("OLD", old, ISS_L2).unwrap();
        assert_eq!(set.epoch.date_naive().to_string(), "1998-09-21");
        assert_eq!(set.epoch.hour(), 12);
    }

    #[test]
    fn test_malformed_records_are_skipped() {
        let truncated = &ISS_L1[..40];
        let mismatched = ISS_L2.replacen("25544", "99999", 1);
        let bad_epoch = ISS_L1.replace("24001.50000000", "24xyz.50000000");

        let lines = vec![
            "BROKEN A".to_string(),
            truncated.to_string(),
            ISS_L2.to_string(),
            "BROKEN B".to_string(),
            ISS_L1.to_string(),
            mismatched,
            "BROKEN C".to_string(),
            bad_epoch,
            ISS_L2.to_string(),
            "GOOD".to_string(),
            ISS_L1.to_string(),
            ISS_L2.to_string(),
        ];

        let sets = parse_element_sets(&lines);
        assert_eq!(sets.len(), 1);
        assert_eq!(sets[0].name, "GOOD");
    }

    #[test]
    fn test_blank_and_stray_lines() {
        let sets = parse_element_sets(["", "# catalog dump", "", "SAT A", ISS_L1, ISS_L2, "  "]);
        assert_eq!(sets.len(), 1);
        assert_eq!(sets[0].name, "SAT A");

        assert!(parse_element_sets(Vec::<String>::new()).is_empty());
        assert!(parse_element_sets(["junk", "more junk"]).is_empty());
    }

    #[test]
    fn test_select_filter_then_limit() {
        let sets = parse_element_sets([
            "STARLINK-1", ISS_L1, ISS_L2, "ISS", ISS_L1, ISS_L2, "STARLINK-2", ISS_L1, ISS_L2,
        ]);
        let selected = select_element_sets(sets.clone(), Some("starlink"), Some(1));
        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].name, "STARLINK-1");

        assert_eq!(select_element_sets(sets, None, None).len(), 3);
    }

    #[test]
    fn test_load_gzipped_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("catalog.tle.gz");
        let file = File::create(&path).unwrap();
        let mut gz = flate2::write::GzEncoder::new(file, flate2::Compression::default());
        writeln!(gz, "ISS (ZARYA)\n{}\n{}", ISS_L1, ISS_L2).unwrap();
        gz.finish().unwrap();

        let sets = load_element_sets(&path).unwrap();
        assert_eq!(sets.len(), 1);

        let missing = load_element_sets(dir.path().join("nope.tle"));
        assert!(matches!(missing, Err(EngineError::Read { .. })));
    }
}
