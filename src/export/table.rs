//! `Level,Strike` table export

use std::io::Write;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core::{GammaError, GammaResult};
use crate::gamma::GammaLevels;

/// Row label in the level table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LevelName {
    #[serde(rename = "Gamma Flip")]
    GammaFlip,
    #[serde(rename = "Put Wall")]
    PutWall,
    #[serde(rename = "Call Wall")]
    CallWall,
}

impl LevelName {
    pub fn label(&self) -> &'static str {
        match self {
            LevelName::GammaFlip => "Gamma Flip",
            LevelName::PutWall => "Put Wall",
            LevelName::CallWall => "Call Wall",
        }
    }
}

/// One exported level
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LevelRow {
    #[serde(rename = "Level")]
    pub level: LevelName,
    #[serde(rename = "Strike")]
    pub strike: Option<f64>,
}

/// Flip, put wall, call wall in that order
pub fn level_rows(levels: &GammaLevels) -> [LevelRow; 3] {
    [
        LevelRow {
            level: LevelName::GammaFlip,
            strike: levels.gamma_flip,
        },
        LevelRow {
            level: LevelName::PutWall,
            strike: Some(levels.put_wall),
        },
        LevelRow {
            level: LevelName::CallWall,
            strike: Some(levels.call_wall),
        },
    ]
}

/// Write the table; an absent flip leaves its Strike empty
pub fn write_level_table<W: Write>(
    writer: W,
    levels: &GammaLevels,
    delimiter: u8,
    decimals: usize,
) -> GammaResult<()> {
    let mut wtr = csv::WriterBuilder::new()
        .delimiter(delimiter)
        .from_writer(writer);

    wtr.write_record(["Level", "Strike"])?;
    for row in level_rows(levels) {
        let strike = row
            .strike
            .map(|s| format!("{:.*}", decimals, s))
            .unwrap_or_default();
        wtr.write_record([row.level.label(), strike.as_str()])?;
    }
    wtr.flush()?;
    Ok(())
}

/// Render the table as comma-separated text
pub fn level_table_string(levels: &GammaLevels, decimals: usize) -> GammaResult<String> {
    let mut buf = Vec::new();
    write_level_table(&mut buf, levels, b',', decimals)?;
    String::from_utf8(buf).map_err(|e| GammaError::data(format!("non-UTF-8 table output: {}", e)))
}

/// Write the table to a file, tab-delimited for `.tsv`/`.tab`
pub fn write_level_table_file(
    path: impl AsRef<Path>,
    levels: &GammaLevels,
    decimals: usize,
) -> GammaResult<()> {
    let path = path.as_ref();
    let delimiter = crate::data::delimiter_for_path(path);
    let file = std::fs::File::create(path)?;
    write_level_table(file, levels, delimiter, decimals)?;
    debug!(path = %path.display(), "wrote level table");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn levels(flip: Option<f64>) -> GammaLevels {
        GammaLevels {
            gamma_flip: flip,
            put_wall: 90.0,
            call_wall: 105.0,
        }
    }

    #[test]
    fn test_table_text() {
        let text = level_table_string(&levels(Some(96.666_666)), 2).unwrap();
        assert_eq!(
            text,
            "Level,Strike\nGamma Flip,96.67\nPut Wall,90.00\nCall Wall,105.00\n"
        );
    }

    #[test]
    fn test_absent_flip_has_empty_strike() {
        let text = level_table_string(&levels(None), 2).unwrap();
        assert!(text.contains("Gamma Flip,\n"));
        assert_eq!(text.lines().count(), 4);
    }

    #[test]
    fn test_rows_serialize_with_labels() {
        let rows = level_rows(&levels(None));
        let json = serde_json::to_string(&rows[1]).unwrap();
        assert_eq!(json, r#"{"Level":"Put Wall","Strike":90.0}"#);
    }

    #[test]
    fn test_write_file_round_trips_through_loader() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("levels.tsv");
        write_level_table_file(&path, &levels(Some(96.25)), 2).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.starts_with("Level\tStrike\n"));

        let table = crate::data::read_table_from_path(&path, None).unwrap();
        assert_eq!(table.len(), 4);
        assert_eq!(table.cell(1, 1).as_text(), "96.25");
    }
}
