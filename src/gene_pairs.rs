use itertools::Itertools;
use std::fmt;

use crate::errors::{DualGuideError, Result};
use crate::guide::DELIMITER;

/// How a requested gene pair should be expanded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Annotation {
    /// `GP`: both genes paired with each other and with controls
    GenePair,
    /// `Essential`: the first gene is paired with controls only
    Essential,
    /// Any other annotation; such rows are skipped
    Other(String),
}

impl Annotation {
    pub fn parse(value: &str) -> Self {
        match value.trim() {
            "GP" => Annotation::GenePair,
            "Essential" => Annotation::Essential,
            other => Annotation::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Annotation::GenePair => "GP",
            Annotation::Essential => "Essential",
            Annotation::Other(raw) => raw,
        }
    }
}

/// Two gene symbols, possibly identical for self pairs.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GenePair {
    pub first: String,
    pub second: String,
}

impl GenePair {
    pub fn new(first: impl Into<String>, second: impl Into<String>) -> Self {
        Self {
            first: first.into(),
            second: second.into(),
        }
    }

    /// Parse a `GENEA:GENEB` field; `row` is only used for error reporting.
    pub fn parse(value: &str, row: usize) -> Result<Self> {
        let malformed = |reason: &str| DualGuideError::MalformedSpec {
            value: value.to_string(),
            row,
            reason: reason.to_string(),
        };

        let (first, second) = value
            .trim()
            .split_once(DELIMITER)
            .ok_or_else(|| malformed("expected two gene symbols separated by ':'"))?;
        if second.contains(DELIMITER) {
            return Err(malformed("more than two gene symbols"));
        }
        if first.is_empty() || second.is_empty() {
            return Err(malformed("empty gene symbol"));
        }
        Ok(Self::new(first, second))
    }

    pub fn is_self_pair(&self) -> bool {
        self.first == self.second
    }
}

impl fmt::Display for GenePair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.first, DELIMITER, self.second)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenePairSpec {
    pub pair: GenePair,
    pub annotation: Annotation,
}

impl GenePairSpec {
    pub fn new(pair: GenePair, annotation: Annotation) -> Self {
        Self { pair, annotation }
    }
}

/// Every unordered pair of distinct genes in list order, then every self pair.
/// All pairs are annotated `GP`.
pub fn all_by_all(genes: &[String]) -> Vec<GenePairSpec> {
    let distinct = genes
        .iter()
        .tuple_combinations()
        .map(|(a, b)| GenePair::new(a.as_str(), b.as_str()));
    let selves = genes.iter().map(|g| GenePair::new(g.as_str(), g.as_str()));

    distinct
        .chain(selves)
        .map(|pair| GenePairSpec::new(pair, Annotation::GenePair))
        .collect()
}
