use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::io::Write;

use crate::analyzer::{FeatureRecord, FeatureTable};
use crate::annotations::{AnnotationRecord, AnnotationTable};
use crate::lyrics::LyricsTable;

/// One annotated track with whatever lyrics and audio features exist for it.
#[derive(Debug, Clone, PartialEq)]
pub struct DatasetRow<'a> {
    pub annotation: &'a AnnotationRecord,
    pub lyrics: Option<&'a str>,
    pub features: Option<&'a FeatureRecord>,
}

/// Attach lyrics and features to each annotation by track id.
///
/// Rows follow annotation order. Feature keys join when they parse as an
/// integer id; other keys are ignored. When two keys name the same id
/// (`01` and `1`), the first in key order wins.
pub fn join<'a>(
    annotations: &'a AnnotationTable,
    lyrics: &'a LyricsTable,
    features: &'a FeatureTable,
) -> Vec<DatasetRow<'a>> {
    let mut by_id: HashMap<i64, &FeatureRecord> = HashMap::new();
    for record in features.rows() {
        let Ok(id) = record.key.parse::<i64>() else {
            log::debug!("Feature key {:?} is not a track id, skipping", record.key);
            continue;
        };
        match by_id.entry(id) {
            Entry::Occupied(kept) => log::warn!(
                "Feature keys {:?} and {:?} both name track {}, keeping {:?}",
                kept.get().key,
                record.key,
                id,
                kept.get().key
            ),
            Entry::Vacant(slot) => {
                slot.insert(record);
            }
        }
    }

    let rows: Vec<DatasetRow<'a>> = annotations
        .iter()
        .map(|annotation| DatasetRow {
            annotation,
            lyrics: lyrics.get(annotation.id),
            features: by_id.get(&annotation.id).copied(),
        })
        .collect();

    let with_lyrics = rows.iter().filter(|r| r.lyrics.is_some()).count();
    let with_features = rows.iter().filter(|r| r.features.is_some()).count();
    log::info!(
        "Joined {} annotations: {} with lyrics, {} with features",
        rows.len(),
        with_lyrics,
        with_features
    );
    rows
}

/// Write joined rows as CSV. Missing lyrics/features leave empty cells.
pub fn write_dataset_csv<W: Write>(
    rows: &[DatasetRow<'_>],
    n_mfcc: usize,
    writer: W,
) -> Result<(), csv::Error> {
    let mut wtr = csv::Writer::from_writer(writer);

    let mut header = vec![
        "id".to_string(),
        "arousal".to_string(),
        "valence".to_string(),
        "Emotion".to_string(),
        "lyrics".to_string(),
    ];
    header.extend(FeatureTable::column_names(n_mfcc).into_iter().skip(1));
    wtr.write_record(&header)?;

    let feature_width = header.len() - 5;
    for row in rows {
        let a = row.annotation;
        let mut record = vec![
            a.id.to_string(),
            a.arousal.to_string(),
            a.valence.to_string(),
            a.emotion_label(),
            row.lyrics.unwrap_or_default().to_string(),
        ];
        match row.features {
            Some(f) => record.extend(f.values().iter().map(|v| v.to_string())),
            None => record.extend(std::iter::repeat_n(String::new(), feature_width)),
        }
        wtr.write_record(&record)?;
    }
    wtr.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotations::read_annotations;
    use crate::emotion::Emotion;
    use std::fs;

    fn features(keys: &[&str]) -> FeatureTable {
        let rows = keys
            .iter()
            .map(|k| FeatureRecord {
                key: k.to_string(),
                rms: 0.2,
                spectral_centroid: 1500.0,
                spectral_bandwidth: 900.0,
                rolloff: 3000.0,
                zero_crossing_rate: 0.07,
                tempo: 98.0,
                tonnetz: -0.02,
                mfcc: vec![-150.0],
            })
            .collect();
        FeatureTable::from_records(rows).unwrap()
    }

    #[test]
    fn test_zero_padded_key_collision_keeps_first() {
        let annotations = read_annotations("id,a,v\n1,0.7,0.8\n".as_bytes()).unwrap();
        let mut rows: Vec<FeatureRecord> = features(&["01", "1"]).rows().to_vec();
        rows[1].tempo = 140.0;
        let table = FeatureTable::from_records(rows).unwrap();

        let lyrics = LyricsTable::default();
        let joined = join(&annotations, &lyrics, &table);
        assert_eq!(joined.len(), 1);
        let attached = joined[0].features.unwrap();
        assert_eq!(attached.key, "01");
        assert_eq!(attached.tempo, 98.0);
    }

    #[test]
    fn test_join_by_id() {
        let csv = "id,a,v\n2,0.7,0.8\n10,0.1,0.2\n3,0.6,0.1\n";
        let annotations = read_annotations(csv.as_bytes()).unwrap();

        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("2.lrc"), "two").unwrap();
        fs::write(dir.path().join("3.lrc"), "three").unwrap();
        let lyrics = crate::lyrics::load_lyrics_from_dir(dir.path()).unwrap();

        let table = features(&["10", "2", "intro"]);

        let rows = join(&annotations, &lyrics, &table);
        let ids: Vec<i64> = rows.iter().map(|r| r.annotation.id).collect();
        assert_eq!(ids, vec![2, 10, 3]);

        assert_eq!(rows[0].lyrics, Some("two"));
        assert!(rows[0].features.is_some());
        assert_eq!(rows[0].annotation.emotion, Ok(Emotion::Happy));

        assert_eq!(rows[1].lyrics, None);
        assert_eq!(rows[1].features.map(|f| f.key.as_str()), Some("10"));

        assert_eq!(rows[2].lyrics, Some("three"));
        assert!(rows[2].features.is_none());
    }

    #[test]
    fn test_write_dataset_csv() {
        let annotations = read_annotations("id,a,v\n1,0.2,0.8\n2,0.9,0.9\n".as_bytes()).unwrap();
        let lyrics = LyricsTable::default();
        let table = features(&["1"]);
        let rows = join(&annotations, &lyrics, &table);

        let mut out = Vec::new();
        write_dataset_csv(&rows, 1, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(
            lines[0],
            "id,arousal,valence,Emotion,lyrics,rms,spectral_centroid,spectral_bandwidth,rolloff,zero_crossing_rate,tempo,tonnetz,mfcc_0"
        );
        assert_eq!(
            lines[1],
            "1,0.2,0.8,Relaxed,,0.2,1500,900,3000,0.07,98,-0.02,-150"
        );
        assert_eq!(lines[2], "2,0.9,0.9,Happy,,,,,,,,,");
    }
}
