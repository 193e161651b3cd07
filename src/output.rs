//! Output records and the sinks that receive them.

use std::io::Write;

use crate::enumerate::PairCandidate;
use crate::errors::{DualGuideError, Result};
use crate::guide::DELIMITER;
use crate::overlap::OverlapReport;

/// One row of the final library: two guides, an optional joiner, two labels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputRecord {
    pub first_sequence: String,
    pub joiner: Option<String>,
    pub second_sequence: String,
    pub first_label: String,
    pub second_label: String,
}

impl OutputRecord {
    pub fn from_candidate(candidate: &PairCandidate<'_>, joiner: Option<&str>) -> Self {
        Self {
            first_sequence: candidate.left.sequence().to_string(),
            joiner: joiner.map(str::to_string),
            second_sequence: candidate.right.sequence().to_string(),
            first_label: candidate.left.label().to_string(),
            second_label: candidate.right.label().to_string(),
        }
    }

    /// `seq1:joiner:seq2`, or `seq1:seq2` without a joiner.
    pub fn combination(&self) -> String {
        match &self.joiner {
            Some(joiner) => format!(
                "{}{d}{}{d}{}",
                self.first_sequence,
                joiner,
                self.second_sequence,
                d = DELIMITER
            ),
            None => format!("{}{}{}", self.first_sequence, DELIMITER, self.second_sequence),
        }
    }

    /// `label1:label2`
    pub fn gene_pair(&self) -> String {
        format!("{}{}{}", self.first_label, DELIMITER, self.second_label)
    }

    /// Rebuild a record from its two serialized fields.
    pub fn parse(combination: &str, gene_pair: &str) -> Result<Self> {
        let malformed = |value: &str, reason: &str| DualGuideError::MalformedRecord {
            value: value.to_string(),
            reason: reason.to_string(),
        };

        let parts: Vec<&str> = combination.split(DELIMITER).collect();
        let (first, joiner, second) = match parts.as_slice() {
            [first, second] => (*first, None, *second),
            [first, joiner, second] => (*first, Some(joiner.to_string()), *second),
            _ => return Err(malformed(combination, "expected two or three ':' separated fields")),
        };
        let (first_label, second_label) = gene_pair
            .split_once(DELIMITER)
            .filter(|(_, second)| !second.contains(DELIMITER))
            .ok_or_else(|| malformed(gene_pair, "expected two ':' separated labels"))?;

        Ok(Self {
            first_sequence: first.to_string(),
            joiner,
            second_sequence: second.to_string(),
            first_label: first_label.to_string(),
            second_label: second_label.to_string(),
        })
    }
}

/// Column names of the two output fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutputHeader {
    pub combination: &'static str,
    pub genes: &'static str,
}

/// Receives every accepted pair and every pair rejected by the overlap check.
pub trait PairSink {
    fn accept(&mut self, record: &OutputRecord) -> Result<()>;

    fn reject(&mut self, _record: &OutputRecord, _report: &OverlapReport) -> Result<()> {
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Tab-separated writer for the library, with an optional second table of rejected pairs.
pub struct TsvSink<W: Write> {
    writer: csv::Writer<W>,
    rejected: Option<csv::Writer<W>>,
}

fn tsv_writer<W: Write>(inner: W) -> csv::Writer<W> {
    csv::WriterBuilder::new()
        .delimiter(b'\t')
        .has_headers(false)
        .from_writer(inner)
}

impl<W: Write> TsvSink<W> {
    pub fn new(inner: W, header: OutputHeader) -> Result<Self> {
        let mut writer = tsv_writer(inner);
        writer.write_record([header.combination, header.genes])?;
        Ok(Self {
            writer,
            rejected: None,
        })
    }

    /// Also write rejected pairs, with their overlap lengths, to `inner`.
    pub fn with_rejected(mut self, inner: W, header: OutputHeader) -> Result<Self> {
        let mut writer = tsv_writer(inner);
        writer.write_record([
            header.combination,
            header.genes,
            "Direct overlap",
            "Reverse complement overlap",
        ])?;
        self.rejected = Some(writer);
        Ok(self)
    }

    pub fn into_inner(mut self) -> Result<W> {
        self.flush()?;
        self.writer
            .into_inner()
            .map_err(|e| {
                let error = e.error();
                DualGuideError::Io(std::io::Error::new(error.kind(), error.to_string()))
            })
    }
}

impl<W: Write> PairSink for TsvSink<W> {
    fn accept(&mut self, record: &OutputRecord) -> Result<()> {
        self.writer
            .write_record([record.combination(), record.gene_pair()])?;
        Ok(())
    }

    fn reject(&mut self, record: &OutputRecord, report: &OverlapReport) -> Result<()> {
        if let Some(writer) = self.rejected.as_mut() {
            writer.write_record([
                record.combination(),
                record.gene_pair(),
                report.direct.to_string(),
                report.reverse_complement.to_string(),
            ])?;
        }
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        if let Some(writer) = self.rejected.as_mut() {
            writer.flush()?;
        }
        Ok(())
    }
}

/// Collects records in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    pub accepted: Vec<OutputRecord>,
    pub rejected: Vec<OutputRecord>,
}

impl PairSink for MemorySink {
    fn accept(&mut self, record: &OutputRecord) -> Result<()> {
        self.accepted.push(record.clone());
        Ok(())
    }

    fn reject(&mut self, record: &OutputRecord, _report: &OverlapReport) -> Result<()> {
        self.rejected.push(record.clone());
        Ok(())
    }
}
