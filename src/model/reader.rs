use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

use csv::{ReaderBuilder, StringRecord, WriterBuilder};

use super::MappingMatrix;
use crate::error::{Error, Result};

/// Loads a mapping table: tab separated, emotions as rows, AUs as columns.
pub fn load_mapping<P: AsRef<Path>>(path: P) -> Result<MappingMatrix> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|e| Error::io(path, e))?;
    read_mapping(file).map_err(|e| match e {
        Error::Csv(source) => Error::table(path, source),
        other => other,
    })
}

pub fn read_mapping<R: Read>(input: R) -> Result<MappingMatrix> {
    MappingReader::new(input).read()
}

/// Writes a mapping in the format [`load_mapping`] reads.
pub fn write_mapping<W: Write>(mapping: &MappingMatrix, output: W) -> Result<()> {
    let mut writer = WriterBuilder::new().delimiter(b'\t').from_writer(output);

    let mut header = vec![String::new()];
    header.extend(mapping.aus().iter().cloned());
    writer.write_record(&header)?;

    for (i, emotion) in mapping.emotions().iter().enumerate() {
        let mut record = vec![emotion.clone()];
        record.extend(mapping.row(i).iter().map(|v| v.to_string()));
        writer.write_record(&record)?;
    }
    writer.flush()?;
    Ok(())
}

struct MappingReader<R: Read> {
    reader: csv::Reader<R>,
}

impl<R: Read> MappingReader<R> {
    fn new(input: R) -> Self {
        MappingReader {
            reader: ReaderBuilder::new()
                .delimiter(b'\t')
                .has_headers(true)
                .from_reader(input),
        }
    }

    fn read(mut self) -> Result<MappingMatrix> {
        // first header cell names the index column
        let aus: Vec<String> = self
            .reader
            .headers()?
            .iter()
            .skip(1)
            .map(|s| s.trim().to_string())
            .collect();

        let mut emotions = vec![];
        let mut values = Vec::with_capacity(aus.len() * 6);
        let mut record = StringRecord::new();
        while self.reader.read_record(&mut record)? {
            if record.len() != aus.len() + 1 {
                return Err(Error::shape(format!(
                    "mapping row {:?} has {} cells, expected {}",
                    record.get(0).unwrap_or(""),
                    record.len(),
                    aus.len() + 1
                )));
            }
            emotions.push(record[0].trim().to_string());
            for cell in record.iter().skip(1) {
                values.push(self.read_f64(cell)?);
            }
        }

        MappingMatrix::new(emotions, aus, values)
    }

    fn read_f64(&self, cell: &str) -> Result<f64> {
        cell.trim()
            .parse::<f64>()
            .map_err(|_| Error::invalid(format!("mapping value {:?} is not a number", cell)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TABLE: &str = "\tAU1\tAU4\tAU12\n\
                         anger\t0\t1\t0\n\
                         happy\t0\t0\t1\n\
                         sadness\t1\t0.5\t0\n";

    #[test]
    fn test_read_mapping() {
        let z = read_mapping(TABLE.as_bytes()).unwrap();
        assert_eq!(vec!["anger", "happy", "sadness"], z.emotions());
        assert_eq!(vec!["AU1", "AU4", "AU12"], z.aus());
        assert_eq!(Some(0.5), z.get("sadness", "AU4"));
    }

    #[test]
    fn test_read_mapping_rejects_text() {
        let table = "\tAU1\nanger\tyes\n";
        assert!(read_mapping(table.as_bytes()).is_err());
    }

    #[test]
    fn test_write_then_load() {
        let z = read_mapping(TABLE.as_bytes()).unwrap();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mapping.tsv");
        write_mapping(&z, File::create(&path).unwrap()).unwrap();
        assert_eq!(z, load_mapping(&path).unwrap());
    }

    #[test]
    fn test_load_missing_file() {
        match load_mapping("/nonexistent/mapping.tsv") {
            Err(error @ Error::File { .. }) => assert!(error.to_string().contains("/nonexistent/mapping.tsv")),
            other => panic!("expected a file error, got {:?}", other.map(|_| ())),
        }
    }
}
