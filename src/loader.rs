use std::borrow::Cow;
use std::cell::OnceCell;
use std::path::{Path, PathBuf};

use encoding_rs::Encoding;
use serde::Deserialize;
use tracing::{debug, info};

use crate::error::{DashboardError, Result};
use crate::models::{AgeGroup, Dataset, EmployeeRecord};

pub const DEFAULT_DATA_PATH: &str = "turnover-data-set.csv";
pub const DEFAULT_ENCODING: &str = "ISO-8859-1";

pub const REQUIRED_COLUMNS: [&str; 12] = [
    "stag",
    "event",
    "age",
    "profession",
    "industry",
    "anxiety",
    "extraversion",
    "independ",
    "selfcontrol",
    "novator",
    "head_gender",
    "coach",
];

#[derive(Debug, Deserialize)]
struct CsvRow {
    stag: f64,
    event: u8,
    age: f64,
    profession: String,
    industry: String,
    anxiety: f64,
    extraversion: f64,
    independ: f64,
    selfcontrol: f64,
    novator: f64,
    head_gender: String,
    coach: String,
}

const LATIN1_LABELS: [&str; 6] = [
    "iso-8859-1",
    "iso8859-1",
    "iso_8859-1",
    "latin1",
    "latin-1",
    "l1",
];

/// Declared text encoding of the dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextEncoding {
    /// Strict ISO-8859-1: every byte maps to the code point of the same value.
    Latin1,
    Whatwg(&'static Encoding),
}

impl TextEncoding {
    pub fn name(self) -> &'static str {
        match self {
            TextEncoding::Latin1 => "ISO-8859-1",
            TextEncoding::Whatwg(encoding) => encoding.name(),
        }
    }

    /// Returns `None` when the bytes are not valid in this encoding.
    pub fn decode(self, bytes: &[u8]) -> Option<Cow<'_, str>> {
        match self {
            TextEncoding::Latin1 => Some(encoding_rs::mem::decode_latin1(bytes)),
            TextEncoding::Whatwg(encoding) => {
                let (text, had_errors) = encoding.decode_without_bom_handling(bytes);
                (!had_errors).then_some(text)
            }
        }
    }
}

/// Latin-1 labels decode byte-for-byte; the WHATWG table would treat them
/// as windows-1252. Any other label goes through the WHATWG table.
pub fn resolve_encoding(label: &str) -> Result<TextEncoding> {
    let label = label.trim();
    if LATIN1_LABELS
        .iter()
        .any(|known| known.eq_ignore_ascii_case(label))
    {
        return Ok(TextEncoding::Latin1);
    }
    Encoding::for_label(label.as_bytes())
        .map(TextEncoding::Whatwg)
        .ok_or_else(|| DashboardError::UnknownEncoding(label.to_string()))
}

pub fn load_dataset(path: &Path, encoding: TextEncoding) -> Result<Dataset> {
    let bytes = std::fs::read(path).map_err(|source| DashboardError::FileAccess {
        path: path.to_path_buf(),
        source,
    })?;

    let text = encoding
        .decode(&bytes)
        .ok_or_else(|| DashboardError::Encoding {
            path: path.to_path_buf(),
            encoding: encoding.name(),
        })?;

    let records = parse_records(&text)?;
    info!(
        path = %path.display(),
        encoding = encoding.name(),
        records = records.len(),
        "dataset loaded"
    );

    Ok(Dataset {
        source: path.to_path_buf(),
        records,
    })
}

pub fn parse_records(text: &str) -> Result<Vec<EmployeeRecord>> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(text.as_bytes());

    let headers = reader.headers().map_err(malformed)?.clone();
    for column in REQUIRED_COLUMNS {
        if !headers.iter().any(|header| header == column) {
            return Err(DashboardError::MissingColumn { column });
        }
    }
    debug!(columns = headers.len(), "schema validated");

    let mut records = Vec::new();
    for result in reader.records() {
        let raw = result.map_err(malformed)?;
        let line = raw.position().map(|position| position.line()).unwrap_or(0);
        let row: CsvRow = raw
            .deserialize(Some(&headers))
            .map_err(|err| DashboardError::Malformed {
                line,
                message: err.to_string(),
            })?;
        let turnover = match row.event {
            0 => false,
            1 => true,
            other => {
                return Err(DashboardError::Malformed {
                    line,
                    message: format!("event must be 0 or 1, got {other}"),
                })
            }
        };

        records.push(EmployeeRecord {
            tenure_months: row.stag,
            turnover,
            age: row.age,
            age_group: AgeGroup::from_age(row.age),
            profession: row.profession,
            industry: row.industry,
            anxiety: row.anxiety,
            extraversion: row.extraversion,
            independence: row.independ,
            self_control: row.selfcontrol,
            novelty_seeking: row.novator,
            head_gender: row.head_gender,
            coach: row.coach,
        });
    }

    Ok(records)
}

fn malformed(err: csv::Error) -> DashboardError {
    let line = err.position().map(|position| position.line()).unwrap_or(0);
    DashboardError::Malformed {
        line,
        message: err.to_string(),
    }
}

/// Loads the dataset on first access and hands out the same table for the
/// rest of the process. There is no invalidation.
#[derive(Debug)]
pub struct DatasetCache {
    path: PathBuf,
    encoding: TextEncoding,
    slot: OnceCell<Dataset>,
}

impl DatasetCache {
    pub fn new(path: impl Into<PathBuf>, encoding: TextEncoding) -> Self {
        Self {
            path: path.into(),
            encoding,
            slot: OnceCell::new(),
        }
    }

    pub fn get(&self) -> Result<&Dataset> {
        if let Some(dataset) = self.slot.get() {
            debug!(path = %self.path.display(), "dataset cache hit");
            return Ok(dataset);
        }
        let dataset = load_dataset(&self.path, self.encoding)?;
        Ok(self.slot.get_or_init(|| dataset))
    }

    pub fn is_loaded(&self) -> bool {
        self.slot.get().is_some()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const HEADER: &str =
        "stag,event,gender,age,industry,profession,traffic,coach,head_gender,greywage,way,extraversion,independ,selfcontrol,anxiety,novator";

    fn write_fixture(bytes: &[u8]) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(bytes).unwrap();
        file.flush().unwrap();
        file
    }

    fn latin1() -> TextEncoding {
        resolve_encoding(DEFAULT_ENCODING).unwrap()
    }

    #[test]
    fn loads_legacy_encoded_file_and_derives_age_groups() {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(HEADER.as_bytes());
        bytes.extend_from_slice(b"\n7.03,1,m,35,Banks,HR,rabrecNErab,no,f,white,bus,6.2,4.1,5.7,7.1,8.3\n");
        bytes.extend_from_slice(b"22.96,0,f,24,Caf\xe9,IT,empl,my head,m,white,car,5.0,5.0,5.0,5.0,5.0\n");
        let file = write_fixture(&bytes);

        let dataset = load_dataset(file.path(), latin1()).unwrap();
        assert_eq!(dataset.records.len(), 2);

        let first = &dataset.records[0];
        assert!(first.turnover);
        assert_eq!(first.profession, "HR");
        assert_eq!(first.age_group, Some(AgeGroup::From30To35));
        assert_eq!(first.independence, 4.1);

        let second = &dataset.records[1];
        assert!(!second.turnover);
        assert_eq!(second.industry, "Café");
        assert_eq!(second.coach, "my head");
        assert_eq!(second.age_group, Some(AgeGroup::Under25));
    }

    #[test]
    fn missing_file_is_a_file_access_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_dataset(&dir.path().join("absent.csv"), latin1()).unwrap_err();
        assert!(matches!(err, DashboardError::FileAccess { .. }));
    }

    #[test]
    fn missing_column_fails_the_load() {
        let text = "stag,event,age,profession,industry,anxiety,extraversion,independ,selfcontrol,head_gender,coach\n1,0,30,HR,Banks,5,5,5,5,m,no\n";
        let err = parse_records(text).unwrap_err();
        assert!(matches!(err, DashboardError::MissingColumn { column: "novator" }));
    }

    #[test]
    fn invalid_utf8_is_an_encoding_error() {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(HEADER.as_bytes());
        bytes.extend_from_slice(b"\n1,0,m,30,Caf\xe9,HR,x,no,m,white,bus,1,1,1,1,1\n");
        let file = write_fixture(&bytes);

        let utf8 = resolve_encoding("utf-8").unwrap();
        let err = load_dataset(file.path(), utf8).unwrap_err();
        assert!(matches!(err, DashboardError::Encoding { .. }));
    }

    #[test]
    fn unknown_encoding_label_is_rejected() {
        assert!(matches!(
            resolve_encoding("klingon-1"),
            Err(DashboardError::UnknownEncoding(_))
        ));
    }

    #[test]
    fn event_outside_zero_one_is_malformed() {
        let text = format!("{HEADER}\n1,0,m,30,Banks,HR,x,no,m,white,bus,1,1,1,1,1\n1,2,m,30,Banks,HR,x,no,m,white,bus,1,1,1,1,1\n");
        match parse_records(&text).unwrap_err() {
            DashboardError::Malformed { line, .. } => assert_eq!(line, 3),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn malformed_line_counts_blank_lines() {
        let text = format!("{HEADER}\n1,0,m,30,Banks,HR,x,no,m,white,bus,1,1,1,1,1\n\n\n1,7,m,30,Banks,HR,x,no,m,white,bus,1,1,1,1,1\n");
        match parse_records(&text).unwrap_err() {
            DashboardError::Malformed { line, .. } => assert_eq!(line, 5),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn latin1_labels_decode_bytes_as_code_points() {
        for label in ["ISO-8859-1", "latin1", " iso8859-1 "] {
            assert_eq!(resolve_encoding(label).unwrap(), TextEncoding::Latin1);
        }
        let text = TextEncoding::Latin1.decode(b"\x80\xe9").unwrap();
        assert_eq!(text, "\u{80}\u{e9}");

        let cp1252 = resolve_encoding("windows-1252").unwrap();
        assert_eq!(cp1252.decode(b"\x80").unwrap(), "€");
    }

    #[test]
    fn non_numeric_value_is_malformed() {
        let text = format!("{HEADER}\nabc,0,m,30,Banks,HR,x,no,m,white,bus,1,1,1,1,1\n");
        assert!(matches!(
            parse_records(&text),
            Err(DashboardError::Malformed { .. })
        ));
    }

    #[test]
    fn cache_loads_once_and_warm_matches_cold() {
        let text = format!("{HEADER}\n3.5,1,m,41,Retail,IT,x,yes,f,grey,foot,1,2,3,4,5\n");
        let file = write_fixture(text.as_bytes());

        let cache = DatasetCache::new(file.path(), latin1());
        assert!(!cache.is_loaded());
        let cold = cache.get().unwrap().clone();
        assert!(cache.is_loaded());
        let warm = cache.get().unwrap();
        assert_eq!(&cold, warm);

        let fresh = load_dataset(file.path(), latin1()).unwrap();
        assert_eq!(cold, fresh);
    }

    #[test]
    fn cache_serves_the_first_load_after_file_removal() {
        let text = format!("{HEADER}\n3.5,1,m,41,Retail,IT,x,yes,f,grey,foot,1,2,3,4,5\n");
        let file = write_fixture(text.as_bytes());
        let path = file.path().to_path_buf();

        let cache = DatasetCache::new(&path, latin1());
        cache.get().unwrap();
        drop(file);
        assert_eq!(cache.get().unwrap().records.len(), 1);
        assert_eq!(cache.path(), path.as_path());
    }
}
