use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::Path;

use csv::{ReaderBuilder, StringRecord, WriterBuilder};
use tracing::info;

use crate::common::EmotionSet;
use crate::error::{Error, Result};

/// Predicted distribution of one trial, with the context needed to rescore it later.
#[derive(Debug, Clone, PartialEq)]
pub struct PredictionRow {
    pub trial: String,
    pub probs: Vec<f64>,
    pub y_true: String,
    pub sub: String,
    pub mapping: String,
    pub intensity: Option<f64>,
}

const TRAILING_COLUMNS: [&str; 4] = ["y_true", "sub", "mapping", "intensity"];

/// Writes rows as `trial, <emotion...>, y_true, sub, mapping, intensity`.
pub fn write_predictions<W: Write>(output: W, emotions: &EmotionSet, rows: &[PredictionRow]) -> Result<()> {
    let mut writer = WriterBuilder::new().delimiter(b'\t').from_writer(output);

    let mut header = vec!["trial".to_string()];
    header.extend(emotions.names().iter().cloned());
    header.extend(TRAILING_COLUMNS.iter().map(|s| s.to_string()));
    writer.write_record(&header)?;

    for row in rows {
        if row.probs.len() != emotions.len() {
            return Err(Error::shape(format!(
                "prediction for trial {} has {} probabilities, expected {}",
                row.trial,
                row.probs.len(),
                emotions.len()
            )));
        }
        let mut record = vec![row.trial.clone()];
        record.extend(row.probs.iter().map(|p| p.to_string()));
        record.push(row.y_true.clone());
        record.push(row.sub.clone());
        record.push(row.mapping.clone());
        record.push(row.intensity.map(|v| v.to_string()).unwrap_or_default());
        writer.write_record(&record)?;
    }
    writer.flush()?;
    Ok(())
}

pub fn save_predictions<P: AsRef<Path>>(path: P, emotions: &EmotionSet, rows: &[PredictionRow]) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
        }
    }
    write_predictions(File::create(path).map_err(|e| Error::io(path, e))?, emotions, rows).map_err(|e| match e {
        Error::Csv(source) => Error::table(path, source),
        other => other,
    })?;
    info!(path = %path.display(), rows = rows.len(), "wrote predictions");
    Ok(())
}

/// Reads a table written by [`write_predictions`] for the same emotion set.
pub fn read_predictions<R: Read>(input: R, emotions: &EmotionSet) -> Result<Vec<PredictionRow>> {
    let mut reader = ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(true)
        .from_reader(input);

    let headers = reader.headers()?.clone();
    let emotion_columns = emotions
        .names()
        .iter()
        .map(|name| column(&headers, name))
        .collect::<Result<Vec<usize>>>()?;
    let trial = column(&headers, "trial")?;
    let y_true = column(&headers, "y_true")?;
    let sub = column(&headers, "sub")?;
    let mapping = column(&headers, "mapping")?;
    let intensity = column(&headers, "intensity")?;

    let mut rows = vec![];
    let mut record = StringRecord::new();
    while reader.read_record(&mut record)? {
        let probs = emotion_columns
            .iter()
            .map(|&i| parse_f64(&record[i]))
            .collect::<Result<Vec<f64>>>()?;
        let intensity = match record[intensity].trim() {
            "" => None,
            cell => Some(parse_f64(cell)?),
        };
        rows.push(PredictionRow {
            trial: record[trial].to_string(),
            probs,
            y_true: record[y_true].to_string(),
            sub: record[sub].to_string(),
            mapping: record[mapping].to_string(),
            intensity,
        });
    }
    Ok(rows)
}

pub fn load_predictions<P: AsRef<Path>>(path: P, emotions: &EmotionSet) -> Result<Vec<PredictionRow>> {
    let path = path.as_ref();
    read_predictions(File::open(path).map_err(|e| Error::io(path, e))?, emotions).map_err(|e| match e {
        Error::Csv(source) => Error::table(path, source),
        other => other,
    })
}

fn column(headers: &StringRecord, name: &str) -> Result<usize> {
    headers
        .iter()
        .position(|h| h == name)
        .ok_or_else(|| Error::invalid(format!("predictions table has no {:?} column", name)))
}

fn parse_f64(cell: &str) -> Result<f64> {
    cell.trim()
        .parse::<f64>()
        .map_err(|_| Error::invalid(format!("{:?} is not a number", cell)))
}
