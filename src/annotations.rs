use std::io::Write;
use std::path::Path;

use thiserror::Error;

use crate::emotion::{Emotion, EmotionError, map_emotion};

#[derive(Error, Debug)]
pub enum AnnotationError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("Expected an index column and 2 data columns, found {0} columns")]
    ColumnCount(usize),
    #[error("Line {line}: invalid track id {value:?}")]
    InvalidIndex { line: u64, value: String },
    #[error("Line {line}: invalid {column} value {value:?}")]
    InvalidValue {
        line: u64,
        column: &'static str,
        value: String,
    },
}

/// One annotated track. The emotion keeps the mapper's out-of-range
/// indicator instead of dropping the row.
#[derive(Debug, Clone, PartialEq)]
pub struct AnnotationRecord {
    pub id: i64,
    pub arousal: f64,
    pub valence: f64,
    pub emotion: Result<Emotion, EmotionError>,
}

impl AnnotationRecord {
    pub fn new(id: i64, arousal: f64, valence: f64) -> Self {
        Self {
            id,
            arousal,
            valence,
            emotion: map_emotion(valence, arousal),
        }
    }

    /// Label for display/export: the emotion name, or the error message.
    pub fn emotion_label(&self) -> String {
        match &self.emotion {
            Ok(e) => e.to_string(),
            Err(e) => e.to_string(),
        }
    }
}

/// Annotation rows in source-file order.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct AnnotationTable {
    pub rows: Vec<AnnotationRecord>,
}

impl AnnotationTable {
    pub fn get(&self, id: i64) -> Option<&AnnotationRecord> {
        self.rows.iter().find(|r| r.id == id)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &AnnotationRecord> {
        self.rows.iter()
    }

    pub fn write_csv<W: Write>(&self, writer: W) -> Result<(), AnnotationError> {
        let mut wtr = csv::Writer::from_writer(writer);
        wtr.write_record(["id", "arousal", "valence", "Emotion"])?;
        for row in &self.rows {
            wtr.write_record([
                row.id.to_string(),
                row.arousal.to_string(),
                row.valence.to_string(),
                row.emotion_label(),
            ])?;
        }
        wtr.flush()?;
        Ok(())
    }
}

/// Load a `<index>,<arousal>,<valence>` CSV. The header row is required but
/// its names are ignored; the two data columns are always read as arousal
/// then valence.
pub fn load_annotations_from_path(path: &Path) -> Result<AnnotationTable, AnnotationError> {
    let file = std::fs::File::open(path)?;
    let table = read_annotations(file)?;
    log::info!("Loaded {} annotations from {}", table.len(), path.display());
    Ok(table)
}

pub fn read_annotations<R: std::io::Read>(reader: R) -> Result<AnnotationTable, AnnotationError> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let width = rdr.headers()?.len();
    if width != 3 {
        return Err(AnnotationError::ColumnCount(width));
    }

    let mut rows = Vec::new();
    for record in rdr.records() {
        let record = record?;
        let line = record.position().map(|p| p.line()).unwrap_or(0);

        let id = record[0]
            .parse::<i64>()
            .map_err(|_| AnnotationError::InvalidIndex {
                line,
                value: record[0].to_string(),
            })?;
        let arousal = parse_value(&record[1], line, "arousal")?;
        let valence = parse_value(&record[2], line, "valence")?;

        rows.push(AnnotationRecord::new(id, arousal, valence));
    }

    Ok(AnnotationTable { rows })
}

/// Empty cells read as NaN; the row is kept and labelled out of range.
fn parse_value(raw: &str, line: u64, column: &'static str) -> Result<f64, AnnotationError> {
    if raw.is_empty() {
        return Ok(f64::NAN);
    }
    raw.parse::<f64>().map_err(|_| AnnotationError::InvalidValue {
        line,
        column,
        value: raw.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relaxed_row() {
        let csv = "song_id,mean_arousal,mean_valence\n5,0.2,0.8\n";
        let table = read_annotations(csv.as_bytes()).unwrap();
        let row = table.get(5).unwrap();
        assert_eq!(row.arousal, 0.2);
        assert_eq!(row.valence, 0.8);
        assert_eq!(row.emotion, Ok(Emotion::Relaxed));
    }

    #[test]
    fn test_preserves_file_order_and_ignores_header_names() {
        let csv = "x,valence,arousal\n9,0.9,0.9\n3,0.7,0.1\n";
        let table = read_annotations(csv.as_bytes()).unwrap();
        let ids: Vec<i64> = table.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![9, 3]);
        // Column 2 is arousal even when the header says otherwise
        let row = table.get(3).unwrap();
        assert_eq!(row.arousal, 0.7);
        assert_eq!(row.valence, 0.1);
        assert_eq!(row.emotion, Ok(Emotion::Angry));
    }

    #[test]
    fn test_out_of_range_row_keeps_indicator() {
        let csv = "id,a,v\n1,1.5,0.3\n";
        let table = read_annotations(csv.as_bytes()).unwrap();
        let row = table.get(1).unwrap();
        assert!(row.emotion.is_err());
        assert_eq!(
            row.emotion_label(),
            "Invalid input: coordinates should be between 0 and 1."
        );
    }

    #[test]
    fn test_wrong_column_count() {
        let csv = "id,a\n1,0.5\n";
        let err = read_annotations(csv.as_bytes()).unwrap_err();
        assert!(matches!(err, AnnotationError::ColumnCount(2)));
    }

    #[test]
    fn test_invalid_index() {
        let csv = "id,a,v\nabc,0.5,0.5\n";
        let err = read_annotations(csv.as_bytes()).unwrap_err();
        assert!(matches!(err, AnnotationError::InvalidIndex { .. }));
    }

    #[test]
    fn test_invalid_value() {
        let csv = "id,a,v\n1,high,0.5\n";
        let err = read_annotations(csv.as_bytes()).unwrap_err();
        assert!(matches!(
            err,
            AnnotationError::InvalidValue { column: "arousal", .. }
        ));
    }

    #[test]
    fn test_empty_cell_keeps_row_out_of_range() {
        let csv = "id,a,v\n1,,0.5\n2,0.9,0.9\n";
        let table = read_annotations(csv.as_bytes()).unwrap();
        assert_eq!(table.len(), 2);

        let row = table.get(1).unwrap();
        assert!(row.arousal.is_nan());
        assert!(row.emotion.is_err());
        assert_eq!(
            row.emotion_label(),
            "Invalid input: coordinates should be between 0 and 1."
        );
        assert_eq!(table.get(2).unwrap().emotion, Ok(Emotion::Happy));
    }

    #[test]
    fn test_load_from_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("static_annotations.csv");
        std::fs::write(&path, "song_id, arousal, valence\n2, 0.6, 0.6\n4, 0.3, 0.2\n").unwrap();

        let table = load_annotations_from_path(&path).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.get(2).unwrap().emotion, Ok(Emotion::Happy));
        assert_eq!(table.get(4).unwrap().emotion, Ok(Emotion::Sad));
    }

    #[test]
    fn test_write_csv() {
        let table = AnnotationTable {
            rows: vec![AnnotationRecord::new(5, 0.2, 0.8)],
        };
        let mut out = Vec::new();
        table.write_csv(&mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert_eq!(text, "id,arousal,valence,Emotion\n5,0.2,0.8,Relaxed\n");
    }
}
