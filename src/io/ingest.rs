//! Line list loading.
//!
//! The calibration only depends on the `LineListLoader` trait. `CsvLineLoader`
//! is the plain delimited-text implementation shipped with the binary:
//!
//! ```text
//! # wavenumber_correction = 1.2e-6
//! # air_correction = 0
//! index,wavenumber,peak,width,damping,eqwidth,itn,hold,tags,id
//! 1,15000.1234,250.0,85.2,0.1,0.0,3,0,F,Fe I
//! ```
//!
//! - leading `#` lines carry header corrections (`key = value`); other `#`
//!   lines are comments
//! - column names are matched case-insensitively, BOM and whitespace stripped
//! - values already include the file's wavenumber correction
//! - rows must be sorted by ascending wavenumber

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use csv::StringRecord;

use crate::domain::{HeaderCorrections, Line, LineFields, LineList};
use crate::error::LoadError;

/// Source of line lists.
pub trait LineListLoader {
    /// Load the list to be calibrated.
    fn load_uncalibrated(&self, path: &Path) -> Result<LineList, LoadError>;

    /// Load the reference list.
    fn load_standard(&self, path: &Path) -> Result<LineList, LoadError>;
}

/// Loader for CSV line lists with `#` header lines.
#[derive(Debug, Clone, Copy, Default)]
pub struct CsvLineLoader;

const UNCALIBRATED_COLUMNS: [&str; 3] = ["index", "wavenumber", "peak"];
// Reference lists often carry positions only.
const STANDARD_COLUMNS: [&str; 2] = ["index", "wavenumber"];

impl LineListLoader for CsvLineLoader {
    fn load_uncalibrated(&self, path: &Path) -> Result<LineList, LoadError> {
        load_csv(path, &UNCALIBRATED_COLUMNS)
    }

    fn load_standard(&self, path: &Path) -> Result<LineList, LoadError> {
        load_csv(path, &STANDARD_COLUMNS)
    }
}

fn load_csv(path: &Path, required: &[&str]) -> Result<LineList, LoadError> {
    let text = std::fs::read_to_string(path).map_err(|source| LoadError::Open {
        path: path.to_path_buf(),
        source,
    })?;
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());

    parse_line_list(&text, path, &name, required)
}

/// Parse a full CSV line list held in memory.
pub(crate) fn parse_line_list(
    text: &str,
    path: &Path,
    name: &str,
    required: &[&str],
) -> Result<LineList, LoadError> {
    let text = text.trim_start_matches('\u{feff}');
    let (corrections, header_lines) = parse_header_block(text, path)?;
    let body = text
        .split_inclusive('\n')
        .skip(header_lines)
        .collect::<String>();

    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(body.as_bytes());

    let headers = reader
        .headers()
        .map_err(|e| malformed_header(path, format!("cannot read column names: {e}")))?
        .clone();
    let header_map = build_header_map(&headers);
    for column in required {
        if !header_map.contains_key(*column) {
            return Err(malformed_header(path, format!("missing required column `{column}`")));
        }
    }

    let mut lines = Vec::new();
    let mut previous = f64::NEG_INFINITY;
    for result in reader.records() {
        let record = result.map_err(|e| {
            let line = e.position().map(|p| p.line() as usize).unwrap_or(0) + header_lines;
            malformed_record(path, line, format!("CSV parse error: {e}"))
        })?;
        let line_no = record.position().map(|p| p.line() as usize).unwrap_or(0) + header_lines;

        let fields = parse_row(&record, &header_map).map_err(|reason| malformed_record(path, line_no, reason))?;
        if fields.wavenumber < previous {
            return Err(malformed_record(
                path,
                line_no,
                format!(
                    "wavenumber {} is below the previous line ({previous}); lists must be sorted",
                    fields.wavenumber
                ),
            ));
        }
        previous = fields.wavenumber;

        let line =
            Line::new(fields, corrections, name).map_err(|e| malformed_record(path, line_no, e.to_string()))?;
        lines.push(line);
    }

    Ok(LineList::new(name, corrections, lines))
}

/// Leading `#` lines. Returns the corrections and how many lines were consumed.
fn parse_header_block(text: &str, path: &Path) -> Result<(HeaderCorrections, usize), LoadError> {
    let mut corrections = HeaderCorrections::default();
    let mut consumed = 0usize;

    for raw in text.lines() {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            consumed += 1;
            continue;
        }
        let Some(comment) = trimmed.strip_prefix('#') else {
            break;
        };
        consumed += 1;

        let Some((key, value)) = comment.split_once('=') else {
            continue;
        };
        let key = normalize_header_name(key);
        let slot = match key.as_str() {
            "wavenumber_correction" => &mut corrections.wavenumber,
            "air_correction" => &mut corrections.air,
            "intensity_calibration" => &mut corrections.intensity,
            _ => continue,
        };
        *slot = parse_f64(value.trim())
            .map_err(|reason| malformed_header(path, format!("`{key}`: {reason}")))?;
    }

    if corrections.wavenumber <= -1.0 {
        return Err(malformed_header(
            path,
            format!(
                "wavenumber_correction {} would make wavenumbers non-positive",
                corrections.wavenumber
            ),
        ));
    }
    Ok((corrections, consumed))
}

fn parse_row(record: &StringRecord, header_map: &HashMap<String, usize>) -> Result<LineFields, String> {
    let index = parse_i32(get_required(record, header_map, "index")?)?;
    let wavenumber = parse_f64(get_required(record, header_map, "wavenumber")?)?;

    Ok(LineFields {
        index,
        wavenumber,
        peak: opt_f64(record, header_map, "peak")?,
        width: opt_f64(record, header_map, "width")?,
        damping: opt_f64(record, header_map, "damping")?,
        eqwidth: opt_f64(record, header_map, "eqwidth")?,
        itn: opt_i32(record, header_map, "itn")?,
        hold: opt_i32(record, header_map, "hold")?,
        tags: get_optional(record, header_map, "tags").unwrap_or_default().to_string(),
        id: get_optional(record, header_map, "id").unwrap_or_default().to_string(),
        eps_total: opt_f64(record, header_map, "eps_total")?,
        eps_even: opt_f64(record, header_map, "eps_even")?,
        eps_odd: opt_f64(record, header_map, "eps_odd")?,
        eps_random: opt_f64(record, header_map, "eps_random")?,
    })
}

fn build_header_map(headers: &StringRecord) -> HashMap<String, usize> {
    headers
        .iter()
        .enumerate()
        .map(|(idx, name)| (normalize_header_name(name), idx))
        .collect()
}

fn normalize_header_name(name: &str) -> String {
    let name = name.trim().trim_start_matches('\u{feff}');
    name.to_ascii_lowercase()
}

fn get_required<'a>(
    record: &'a StringRecord,
    header_map: &HashMap<String, usize>,
    name: &str,
) -> Result<&'a str, String> {
    get_optional(record, header_map, name).ok_or_else(|| format!("missing required value `{name}`"))
}

fn get_optional<'a>(record: &'a StringRecord, header_map: &HashMap<String, usize>, name: &str) -> Option<&'a str> {
    let idx = header_map.get(name)?;
    record.get(*idx).map(str::trim).filter(|s| !s.is_empty())
}

fn opt_f64(record: &StringRecord, header_map: &HashMap<String, usize>, name: &str) -> Result<f64, String> {
    get_optional(record, header_map, name)
        .map(|s| parse_f64(s).map_err(|e| format!("`{name}`: {e}")))
        .unwrap_or(Ok(0.0))
}

fn opt_i32(record: &StringRecord, header_map: &HashMap<String, usize>, name: &str) -> Result<i32, String> {
    get_optional(record, header_map, name)
        .map(|s| parse_i32(s).map_err(|e| format!("`{name}`: {e}")))
        .unwrap_or(Ok(0))
}

fn parse_f64(s: &str) -> Result<f64, String> {
    match s.parse::<f64>() {
        Ok(v) if v.is_finite() => Ok(v),
        _ => Err(format!("invalid number '{s}'")),
    }
}

fn parse_i32(s: &str) -> Result<i32, String> {
    s.parse::<i32>().map_err(|_| format!("invalid integer '{s}'"))
}

fn malformed_header(path: &Path, reason: String) -> LoadError {
    LoadError::MalformedHeader {
        path: PathBuf::from(path),
        reason,
    }
}

fn malformed_record(path: &Path, line: usize, reason: String) -> LoadError {
    LoadError::MalformedRecord {
        path: PathBuf::from(path),
        line,
        reason,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    const FE_LIST: &str = "\
# XGremlin writelines export
# wavenumber_correction = 2.0e-6
# air_correction = 1.5e-7
index,wavenumber,peak,width,tags,id
1,15000.030,250.0,85.0,F,Fe I
2,15100.5,40.0,90.0,,
3,15200.0304,180.0,80.0,H,Fe II
";

    fn write(dir: &TempDir, name: &str, body: &str) -> PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, body).unwrap();
        path
    }

    fn record_line(err: LoadError) -> usize {
        match err {
            LoadError::MalformedRecord { line, .. } => line,
            other => panic!("expected MalformedRecord, got {other:?}"),
        }
    }

    #[test]
    fn loads_header_corrections_and_rows() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "fe.csv", FE_LIST);
        let list = CsvLineLoader.load_uncalibrated(&path).unwrap();

        assert_eq!(list.name(), "fe.csv");
        assert_eq!(list.len(), 3);
        assert_eq!(list.corrections().wavenumber, 2.0e-6);
        assert_eq!(list.corrections().air, 1.5e-7);

        let first = &list.lines()[0];
        assert!((first.wavenumber() - 15000.030).abs() < 1e-9);
        assert!((first.raw_wavenumber() - 15000.030 / (1.0 + 2.0e-6)).abs() < 1e-9);
        assert_eq!(first.tags(), "F");
        assert_eq!(first.id(), "Fe I");
        assert_eq!(list.lines()[1].tags(), "");
    }

    #[test]
    fn header_names_ignore_case_and_bom() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "s.csv", "\u{feff}Index , WaveNumber,PEAK\n1,100.0,5\n2,200.0,6\n");
        let list = CsvLineLoader.load_uncalibrated(&path).unwrap();
        assert_eq!(list.len(), 2);
        assert_eq!(list.lines()[1].peak(), 6.0);
    }

    #[test]
    fn standard_list_needs_no_peak_column() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "std.csv", "index,wavenumber\n1,15000.0\n2,15200.0\n");

        assert_eq!(CsvLineLoader.load_standard(&path).unwrap().len(), 2);
        assert!(matches!(
            CsvLineLoader.load_uncalibrated(&path),
            Err(LoadError::MalformedHeader { .. })
        ));
    }

    #[test]
    fn bad_header_value_is_malformed_header() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "h.csv", "# wavenumber_correction = abc\nindex,wavenumber,peak\n");
        let err = CsvLineLoader.load_uncalibrated(&path).unwrap_err();
        assert!(matches!(err, LoadError::MalformedHeader { .. }), "{err:?}");
    }

    #[test]
    fn bad_values_report_file_line_numbers() {
        let dir = TempDir::new().unwrap();

        let path = write(&dir, "a.csv", "# c\nindex,wavenumber,peak\n1,100.0,5\n2,oops,5\n");
        assert_eq!(record_line(CsvLineLoader.load_uncalibrated(&path).unwrap_err()), 4);

        let path = write(&dir, "b.csv", "index,wavenumber,peak\n1,100.0,-5\n");
        assert_eq!(record_line(CsvLineLoader.load_uncalibrated(&path).unwrap_err()), 2);
    }

    #[test]
    fn descending_wavenumbers_are_rejected() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "u.csv", "index,wavenumber,peak\n1,200.0,5\n2,100.0,5\n");
        assert_eq!(record_line(CsvLineLoader.load_uncalibrated(&path).unwrap_err()), 3);
    }

    #[test]
    fn missing_file_is_open_error() {
        let dir = TempDir::new().unwrap();
        let err = CsvLineLoader.load_uncalibrated(&dir.path().join("nope.csv")).unwrap_err();
        assert!(matches!(err, LoadError::Open { .. }));
    }
}
