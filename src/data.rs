use crate::error::{Error, Result};
use std::collections::HashMap;
use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

/// Cell texts treated as missing values. Missing cells never take part in a count.
const NA_VALUES: &[&str] = &[
    "", "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN",
    "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

/// An uploaded CSV file held in memory: ordered headers plus string rows.
#[derive(Debug, Clone)]
pub struct Table {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Table {
    pub fn new(headers: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        Self { headers, rows }
    }

    /// Load a CSV file from disk.
    ///
    /// Returns [`Error::NotFound`] when the file is absent so callers can send
    /// the user back to the upload form instead of failing the request.
    pub fn from_path(path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(|source| match source.kind() {
            io::ErrorKind::NotFound => Error::NotFound {
                path: path.to_path_buf(),
            },
            _ => Error::Io {
                path: path.to_path_buf(),
                source,
            },
        })?;

        Self::read(file, path.to_path_buf())
    }

    /// Parse CSV text from any reader (used for in-memory data).
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        Self::read(reader, PathBuf::from("<memory>"))
    }

    fn read<R: Read>(reader: R, path: PathBuf) -> Result<Self> {
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(reader);

        let parse_err = |source: csv::Error| Error::Parse {
            path: path.clone(),
            source,
        };

        let raw_headers = rdr.headers().map_err(parse_err)?.clone();
        if raw_headers.is_empty() {
            return Err(Error::Parse {
                path: path.clone(),
                source: io::Error::new(io::ErrorKind::InvalidData, "no columns to parse from file")
                    .into(),
            });
        }
        let headers = normalize_headers(raw_headers.iter());

        // Short rows are padded as missing by `column`; long rows have no header to land under.
        let mut rows = Vec::new();
        for (idx, record) in rdr.records().enumerate() {
            let record = record.map_err(parse_err)?;
            if record.len() > headers.len() {
                return Err(Error::Parse {
                    path: path.clone(),
                    source: io::Error::new(
                        io::ErrorKind::InvalidData,
                        format!(
                            "record {} has {} fields, but the header has {}",
                            idx + 1,
                            record.len(),
                            headers.len()
                        ),
                    )
                    .into(),
                });
            }
            rows.push(record.iter().map(|s| s.to_string()).collect());
        }

        Ok(Self { headers, rows })
    }

    /// Column names in file order.
    pub fn columns(&self) -> &[String] {
        &self.headers
    }

    pub fn num_rows(&self) -> usize {
        self.rows.len()
    }

    /// Position of a column. Names match exactly; there is no case folding.
    pub fn column_index(&self, name: &str) -> Result<usize> {
        self.headers
            .iter()
            .position(|h| h == name)
            .ok_or_else(|| Error::ColumnNotFound {
                column: name.to_string(),
            })
    }

    /// All cells of a column, `None` where the cell holds a missing value.
    pub fn column(&self, name: &str) -> Result<Vec<Option<&str>>> {
        let idx = self.column_index(name)?;
        Ok(self
            .rows
            .iter()
            .map(|row| row.get(idx).map(String::as_str).filter(|v| !is_missing(v)))
            .collect())
    }
}

pub fn is_missing(value: &str) -> bool {
    NA_VALUES.contains(&value)
}

/// Give blank headers a positional name and suffix repeated ones (`a`, `a.1`, `a.2`).
fn normalize_headers<'a>(raw: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut counts: HashMap<String, usize> = HashMap::new();
    let mut headers: Vec<String> = Vec::new();

    for (idx, name) in raw.enumerate() {
        let mut col = if name.is_empty() {
            format!("Unnamed: {}", idx)
        } else {
            name.to_string()
        };

        // A suffixed name can itself collide with a literal header, so keep probing.
        let mut cur = counts.get(&col).copied().unwrap_or(0);
        while cur > 0 {
            counts.insert(col.clone(), cur + 1);
            col = format!("{}.{}", col, cur);
            cur = counts.get(&col).copied().unwrap_or(0);
        }
        counts.insert(col.clone(), cur + 1);
        headers.push(col);
    }

    headers
}
