use std::collections::HashMap;

use bio::alphabets::{dna, Alphabet};
use lazy_static::lazy_static;

use crate::errors::{DualGuideError, Result};

/// Separator used between guides and between labels in serialized records.
pub const DELIMITER: char = ':';

/// Label carried by control guides that have no gene symbol of their own.
pub const NON_TARGETING: &str = "non-targeting";

lazy_static! {
    static ref GUIDE_ALPHABET: Alphabet = Alphabet::new(b"ACGT");
}

/// Check that a sequence only contains A, C, G and T.
pub fn validate_sequence(sequence: &str, label: &str) -> Result<()> {
    if let Some(base) = sequence
        .bytes()
        .find(|&b| !GUIDE_ALPHABET.is_word(std::iter::once(b)))
    {
        return Err(DualGuideError::InvalidSequence {
            sequence: sequence.to_string(),
            label: label.to_string(),
            base: char::from(base),
        });
    }
    Ok(())
}

/// Reverse complement of an A/C/G/T sequence.
pub fn reverse_complement(seq: &str) -> Result<Vec<u8>> {
    validate_sequence(seq, "reverse complement input")?;
    Ok(dna::revcomp(seq.as_bytes()))
}

/// One guide and the label (gene symbol or control token) it targets.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GuideRecord {
    sequence: String,
    label: String,
}

impl GuideRecord {
    /// Build a record, refusing non-ACGT sequences and labels containing the delimiter.
    pub fn new(sequence: impl Into<String>, label: impl Into<String>) -> Result<Self> {
        let sequence = sequence.into();
        let label = label.into();
        validate_sequence(&sequence, &label)?;
        if label.contains(DELIMITER) {
            return Err(DualGuideError::InvalidLabel { label });
        }
        Ok(Self { sequence, label })
    }

    /// A control guide labelled with the non-targeting token.
    pub fn control(sequence: impl Into<String>) -> Result<Self> {
        Self::new(sequence, NON_TARGETING)
    }

    pub fn sequence(&self) -> &str {
        &self.sequence
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Reverse complement of the guide sequence.
    pub fn reverse_complement(&self) -> Vec<u8> {
        dna::revcomp(self.sequence.as_bytes())
    }
}

/// All guides designed for one nuclease system, grouped by target gene.
///
/// Within a gene, guides keep the order in which they were added so that
/// enumeration follows the input table row order.
#[derive(Debug, Default, Clone)]
pub struct GuideLibrary {
    by_gene: HashMap<String, Vec<GuideRecord>>,
    total: usize,
}

impl GuideLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, record: GuideRecord) {
        self.by_gene
            .entry(record.label.clone())
            .or_default()
            .push(record);
        self.total += 1;
    }

    /// Guides targeting `gene`, empty if the gene has none.
    pub fn guides_for(&self, gene: &str) -> &[GuideRecord] {
        self.by_gene.get(gene).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.total
    }

    pub fn is_empty(&self) -> bool {
        self.total == 0
    }

    pub fn gene_count(&self) -> usize {
        self.by_gene.len()
    }
}

impl FromIterator<GuideRecord> for GuideLibrary {
    fn from_iter<I: IntoIterator<Item = GuideRecord>>(iter: I) -> Self {
        let mut library = GuideLibrary::new();
        for record in iter {
            library.push(record);
        }
        library
    }
}
