//! Delimited-file reader with delimiter inference.

use super::{Dataset, PropertyType, RawAmenities, RawListing};
use crate::error::{PriceError, Result};
use csv::{ReaderBuilder, StringRecord, Trim};
use std::io::Read;
use std::path::Path;
use tracing::{debug, info};

/// Delimiters tried by [`sniff_delimiter`], in tie-break order.
const CANDIDATE_DELIMITERS: [u8; 4] = [b',', b';', b'\t', b'|'];

/// Columns that must be present in every dataset.
const REQUIRED_COLUMNS: [&str; 4] = ["prix", "surface", "ville", "quartier"];

/// Infer the field delimiter of a delimited text.
///
/// A candidate is *consistent* when it appears the same, non-zero number of
/// times (outside double quotes) on the header line and on each of the next
/// `sample_lines` non-empty lines. Consistent candidates win over inconsistent
/// ones, then the higher header count wins, then the earlier candidate in
/// `, ; \t |`. Falls back to `,` when no candidate appears at all.
pub fn sniff_delimiter(text: &str, sample_lines: usize) -> u8 {
    let mut lines = text.lines().filter(|l| !l.trim().is_empty());
    let header = match lines.next() {
        Some(h) => h,
        None => return b',',
    };
    let sample: Vec<&str> = lines.take(sample_lines).collect();

    let mut best: Option<(bool, usize, u8)> = None;
    for &candidate in &CANDIDATE_DELIMITERS {
        let header_count = count_unquoted(header, candidate);
        if header_count == 0 {
            continue;
        }
        let consistent = sample
            .iter()
            .all(|line| count_unquoted(line, candidate) == header_count);
        let better = match best {
            None => true,
            Some((best_consistent, best_count, _)) => {
                (consistent, header_count) > (best_consistent, best_count)
            }
        };
        if better {
            best = Some((consistent, header_count, candidate));
        }
    }
    best.map(|(_, _, d)| d).unwrap_or(b',')
}

fn count_unquoted(line: &str, delimiter: u8) -> usize {
    let mut in_quotes = false;
    let mut count = 0;
    for &b in line.as_bytes() {
        if b == b'"' {
            in_quotes = !in_quotes;
        } else if b == delimiter && !in_quotes {
            count += 1;
        }
    }
    count
}

/// Canonical header form: BOM stripped, trimmed, lowercased, spaces to `_`,
/// French accents folded (`sécurité` → `securite`).
fn canonical_header(raw: &str) -> String {
    raw.trim_start_matches('\u{feff}')
        .trim()
        .to_lowercase()
        .chars()
        .map(|c| match c {
            'é' | 'è' | 'ê' | 'ë' => 'e',
            'à' | 'â' => 'a',
            'î' | 'ï' => 'i',
            'ô' => 'o',
            'ù' | 'û' => 'u',
            'ç' => 'c',
            ' ' | '-' => '_',
            other => other,
        })
        .collect()
}

/// Parse a numeric cell. Spaces (including non-breaking ones) are ignored;
/// empty, unparseable or non-finite cells are missing.
fn parse_number(cell: &str) -> Option<f64> {
    let cleaned: String = cell
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '\u{a0}' && *c != '\u{202f}')
        .collect();
    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Parse a boolean cell written by pandas (`True`/`False`, `1.0`), by the
/// scraper (`Oui`/`Non`) or by hand (`yes`/`no`).
fn parse_flag(cell: &str) -> Option<bool> {
    match cell.trim().to_lowercase().as_str() {
        "1" | "1.0" | "true" | "oui" | "yes" | "vrai" => Some(true),
        "0" | "0.0" | "false" | "non" | "no" | "faux" => Some(false),
        _ => None,
    }
}

fn parse_text(cell: &str) -> Option<String> {
    let trimmed = cell.trim();
    if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("nan") {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Positions of the known columns in the header.
#[derive(Debug)]
struct ColumnIndex {
    price: usize,
    surface: usize,
    city: usize,
    neighborhood: usize,
    bedrooms: Option<usize>,
    bathrooms: Option<usize>,
    floor: Option<usize>,
    terrace: Option<usize>,
    garage: Option<usize>,
    elevator: Option<usize>,
    pool: Option<usize>,
    security: Option<usize>,
    property_types: Vec<(PropertyType, usize)>,
}

impl ColumnIndex {
    fn from_headers(headers: &StringRecord) -> Result<Self> {
        let names: Vec<String> = headers.iter().map(canonical_header).collect();
        let find = |name: &str| names.iter().position(|n| n == name);

        let missing: Vec<&str> = REQUIRED_COLUMNS
            .iter()
            .copied()
            .filter(|c| find(c).is_none())
            .collect();
        if !missing.is_empty() {
            return Err(PriceError::DatasetFormat(format!(
                "missing required column(s) {:?}; found {:?}",
                missing, names
            )));
        }

        let mut property_types = Vec::new();
        for (idx, name) in names.iter().enumerate() {
            if name.starts_with("bien_") {
                let ty: PropertyType = name.parse()?;
                property_types.push((ty, idx));
            }
        }

        // Presence was checked above.
        let required = |name: &str| find(name).unwrap_or_default();
        Ok(Self {
            price: required("prix"),
            surface: required("surface"),
            city: required("ville"),
            neighborhood: required("quartier"),
            bedrooms: find("nombre_de_chambres"),
            bathrooms: find("nombre_de_salles_de_bain"),
            floor: find("etage"),
            terrace: find("terrasse"),
            garage: find("garage"),
            elevator: find("ascenseur"),
            pool: find("piscine"),
            security: find("securite"),
            property_types,
        })
    }

    fn parse_row(&self, record: &StringRecord) -> RawListing {
        let cell = |idx: usize| record.get(idx).unwrap_or("");
        let number = |idx: Option<usize>| idx.and_then(|i| parse_number(cell(i)));
        let flag = |idx: Option<usize>| idx.and_then(|i| parse_flag(cell(i)));

        RawListing {
            price: parse_number(cell(self.price)),
            surface: parse_number(cell(self.surface)),
            bedrooms: number(self.bedrooms),
            bathrooms: number(self.bathrooms),
            floor: number(self.floor),
            city: parse_text(cell(self.city)),
            neighborhood: parse_text(cell(self.neighborhood)),
            property_types: self
                .property_types
                .iter()
                .filter(|(_, idx)| parse_flag(cell(*idx)) == Some(true))
                .map(|(ty, _)| *ty)
                .collect(),
            amenities: RawAmenities {
                terrace: flag(self.terrace),
                garage: flag(self.garage),
                elevator: flag(self.elevator),
                pool: flag(self.pool),
                security: flag(self.security),
            },
        }
    }
}

/// Loads a delimited listing file into typed [`RawListing`] rows.
#[derive(Clone, Debug)]
pub struct RawDatasetReader {
    delimiter: Option<u8>,
    sample_lines: usize,
}

impl Default for RawDatasetReader {
    fn default() -> Self {
        Self::new()
    }
}

impl RawDatasetReader {
    /// Reader that infers the delimiter from the first lines of the file.
    pub fn new() -> Self {
        Self {
            delimiter: None,
            sample_lines: 5,
        }
    }

    /// Skip inference and use a fixed delimiter.
    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = Some(delimiter);
        self
    }

    /// Number of data lines inspected by delimiter inference.
    pub fn with_sample_lines(mut self, sample_lines: usize) -> Self {
        self.sample_lines = sample_lines;
        self
    }

    /// Read and parse the file at `path`.
    pub fn read<P: AsRef<Path>>(&self, path: P) -> Result<Dataset> {
        let path = path.as_ref();
        info!(path = %path.display(), "reading dataset");
        let file = std::fs::File::open(path)?;
        self.from_reader(file)
    }

    /// Read and parse a whole stream.
    ///
    /// # Errors
    /// [`PriceError::DatasetFormat`] if the stream is not valid UTF-8.
    pub fn from_reader<R: Read>(&self, mut reader: R) -> Result<Dataset> {
        let mut bytes = Vec::new();
        reader.read_to_end(&mut bytes)?;
        let text = String::from_utf8(bytes).map_err(|e| {
            let offset = e.utf8_error().valid_up_to();
            let line = 1 + e.as_bytes()[..offset].iter().filter(|&&b| b == b'\n').count();
            PriceError::DatasetFormat(format!(
                "dataset is not valid UTF-8 (line {line}, byte {offset}); re-encode it as UTF-8"
            ))
        })?;
        self.parse_str(&text)
    }

    /// Parse an in-memory text.
    pub fn parse_str(&self, text: &str) -> Result<Dataset> {
        let text = text.trim_start_matches('\u{feff}');
        if text.trim().is_empty() {
            return Err(PriceError::DatasetFormat("dataset is empty".to_string()));
        }
        let delimiter = self
            .delimiter
            .unwrap_or_else(|| sniff_delimiter(text, self.sample_lines));
        debug!(delimiter = %(delimiter as char).escape_default(), "using delimiter");

        let mut csv_reader = ReaderBuilder::new()
            .delimiter(delimiter)
            .has_headers(true)
            .flexible(true)
            .trim(Trim::All)
            .from_reader(text.as_bytes());

        let columns = ColumnIndex::from_headers(csv_reader.headers()?)?;

        let mut rows = Vec::new();
        for record in csv_reader.records() {
            rows.push(columns.parse_row(&record?));
        }
        info!(rows = rows.len(), "dataset parsed");
        Ok(Dataset::new(rows))
    }
}
