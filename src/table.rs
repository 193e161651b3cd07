//! Reading and writing the delimited tables around the library generator.

use std::fs::File;
use std::io::{BufRead, BufReader, Read, Write};
use std::path::Path;

use flate2::read::MultiGzDecoder;
use log::info;
use serde::Deserialize;

use crate::errors::{DualGuideError, Result};
use crate::gene_pairs::{Annotation, GenePair, GenePairSpec};
use crate::guide::{GuideLibrary, GuideRecord};

pub const GENE_COLUMN: &str = "Target Gene Symbol";
/// Sequence column names accepted for control tables, in order of preference.
pub const CONTROL_SEQUENCE_COLUMNS: [&str; 2] = ["sgRNA Sequence", "sgRNA Seq"];

/// Open a file, transparently decompressing `.gz` inputs.
pub fn open_input(path: &Path) -> Result<Box<dyn BufRead>> {
    let file = File::open(path)?;
    let reader: Box<dyn BufRead> = if path.extension().map_or(false, |ext| ext == "gz") {
        Box::new(BufReader::new(MultiGzDecoder::new(file)))
    } else {
        Box::new(BufReader::new(file))
    };
    Ok(reader)
}

/// Tab for `.tsv`/`.txt` (optionally gzipped), comma otherwise.
pub fn delimiter_for(path: &Path) -> u8 {
    let lossy = path.to_string_lossy();
    let name = lossy.strip_suffix(".gz").unwrap_or(&lossy);
    if name.ends_with(".tsv") || name.ends_with(".txt") {
        b'\t'
    } else {
        b','
    }
}

fn csv_reader<R: Read>(reader: R, delimiter: u8) -> csv::Reader<R> {
    csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader)
}

#[derive(Debug, Deserialize)]
struct GuideRow {
    #[serde(rename = "sgRNA Sequence")]
    sequence: String,
    #[serde(rename = "Target Gene Symbol")]
    gene: String,
}

#[derive(Debug, Deserialize)]
struct GenePairRow {
    #[serde(rename = "Gene Symbol")]
    gene_symbol: String,
    #[serde(rename = "Annotation", default)]
    annotation: String,
}

#[derive(Debug, Deserialize)]
struct GeneRow {
    #[serde(rename = "Gene Symbol")]
    gene_symbol: String,
}

/// Read a guide design table with `sgRNA Sequence` and `Target Gene Symbol` columns.
pub fn read_guides<R: Read>(reader: R, delimiter: u8) -> Result<GuideLibrary> {
    let mut library = GuideLibrary::new();
    for row in csv_reader(reader, delimiter).deserialize() {
        let row: GuideRow = row?;
        library.push(GuideRecord::new(row.sequence, row.gene)?);
    }
    Ok(library)
}

pub fn read_guides_from_path(path: &Path) -> Result<GuideLibrary> {
    let library = read_guides(open_input(path)?, delimiter_for(path))?;
    info!(
        "Loaded {} guide(s) for {} gene(s) from {}",
        library.len(),
        library.gene_count(),
        path.display()
    );
    Ok(library)
}

/// Read a tab-separated gene pair table with `Gene Symbol` and `Annotation` columns.
pub fn read_gene_pairs<R: Read>(reader: R) -> Result<Vec<GenePairSpec>> {
    let mut specs = Vec::new();
    for (i, row) in csv_reader(reader, b'\t').deserialize().enumerate() {
        let row: GenePairRow = row?;
        let pair = GenePair::parse(&row.gene_symbol, i + 1)?;
        specs.push(GenePairSpec::new(pair, Annotation::parse(&row.annotation)));
    }
    Ok(specs)
}

pub fn read_gene_pairs_from_path(path: &Path) -> Result<Vec<GenePairSpec>> {
    let specs = read_gene_pairs(open_input(path)?)?;
    info!("Loaded {} gene pair(s) from {}", specs.len(), path.display());
    Ok(specs)
}

/// Read a tab-separated list of genes from its `Gene Symbol` column.
pub fn read_gene_list<R: Read>(reader: R) -> Result<Vec<String>> {
    let mut genes = Vec::new();
    for row in csv_reader(reader, b'\t').deserialize() {
        let row: GeneRow = row?;
        genes.push(row.gene_symbol);
    }
    Ok(genes)
}

/// Layout of a control table.
#[derive(Debug, Clone)]
pub struct ControlTable {
    /// Lines before the header row
    pub skip_rows: usize,
    /// Sequence column; the first of [`CONTROL_SEQUENCE_COLUMNS`] present if unset
    pub sequence_column: Option<String>,
    /// Label used when the table has no `Target Gene Symbol` column
    pub default_label: String,
}

impl ControlTable {
    pub fn new(default_label: impl Into<String>) -> Self {
        Self {
            skip_rows: 0,
            sequence_column: None,
            default_label: default_label.into(),
        }
    }

    pub fn skip_rows(mut self, rows: usize) -> Self {
        self.skip_rows = rows;
        self
    }

    pub fn sequence_column(mut self, column: Option<String>) -> Self {
        self.sequence_column = column;
        self
    }

    /// Read controls from a tab-separated table; `name` is used in error messages.
    pub fn read<R: BufRead>(&self, mut reader: R, name: &str) -> Result<Vec<GuideRecord>> {
        let mut discard = String::new();
        for _ in 0..self.skip_rows {
            discard.clear();
            reader.read_line(&mut discard)?;
        }

        let mut csv = csv_reader(reader, b'\t');
        let headers = csv.headers()?.clone();
        let find = |column: &str| headers.iter().position(|h| h == column);

        let sequence_idx = match &self.sequence_column {
            Some(column) => find(column.as_str()).ok_or_else(|| DualGuideError::MissingColumn {
                table: name.to_string(),
                column: column.clone(),
            })?,
            None => CONTROL_SEQUENCE_COLUMNS
                .iter()
                .find_map(|column| find(*column))
                .ok_or_else(|| DualGuideError::MissingColumn {
                    table: name.to_string(),
                    column: CONTROL_SEQUENCE_COLUMNS.join("' or '"),
                })?,
        };
        let label_idx = find(GENE_COLUMN);

        let mut controls = Vec::new();
        for record in csv.records() {
            let record = record?;
            let sequence = record.get(sequence_idx).unwrap_or_default();
            if sequence.is_empty() {
                continue;
            }
            let label = label_idx
                .and_then(|i| record.get(i))
                .filter(|label| !label.is_empty())
                .unwrap_or(self.default_label.as_str());
            controls.push(GuideRecord::new(sequence, label)?);
        }
        Ok(controls)
    }

    pub fn read_path(&self, path: &Path) -> Result<Vec<GuideRecord>> {
        let controls = self.read(open_input(path)?, &path.display().to_string())?;
        info!("Loaded {} control(s) from {}", controls.len(), path.display());
        Ok(controls)
    }
}

/// Write gene pair specs in the same layout [`read_gene_pairs`] accepts.
pub fn write_gene_pairs<W: Write>(writer: W, specs: &[GenePairSpec]) -> Result<()> {
    let mut writer = csv::WriterBuilder::new()
        .delimiter(b'\t')
        .from_writer(writer);
    writer.write_record(["Gene Symbol", "Annotation"])?;
    for spec in specs {
        writer.write_record([spec.pair.to_string().as_str(), spec.annotation.as_str()])?;
    }
    writer.flush()?;
    Ok(())
}
