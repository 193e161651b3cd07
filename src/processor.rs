//! Drives a library design over the requested gene pairs.
//!
//! Every candidate pair produced by a design goes through [`Expansion::emit`],
//! which applies the overlap check and hands the result to the sink. Control
//! expansions are guarded by a [`SeenSet`] so that a gene that appears in many
//! gene pairs gets its control pairs generated once.

use std::collections::HashSet;
use std::fmt;

use log::{debug, info, warn};

use crate::enumerate::PairCandidate;
use crate::errors::Result;
use crate::gene_pairs::{Annotation, GenePair, GenePairSpec};
use crate::guide::{GuideLibrary, GuideRecord};
use crate::output::{OutputHeader, OutputRecord, PairSink};
use crate::overlap::OverlapChecker;

/// Which side of the construct the control occupies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ControlSide {
    /// `control:GENE`
    ControlFirst,
    /// `GENE:control`
    ControlSecond,
}

/// A gene's pairing with controls in one orientation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ControlPairing {
    pub gene: String,
    pub side: ControlSide,
}

impl ControlPairing {
    pub fn control_first(gene: &str) -> Self {
        Self {
            gene: gene.to_string(),
            side: ControlSide::ControlFirst,
        }
    }

    pub fn control_second(gene: &str) -> Self {
        Self {
            gene: gene.to_string(),
            side: ControlSide::ControlSecond,
        }
    }
}

impl fmt::Display for ControlPairing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.side {
            ControlSide::ControlFirst => write!(f, "control:{}", self.gene),
            ControlSide::ControlSecond => write!(f, "{}:control", self.gene),
        }
    }
}

/// Control pairings already generated during this run.
#[derive(Debug, Default, Clone)]
pub struct SeenSet {
    keys: HashSet<ControlPairing>,
}

impl SeenSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns false if the pairing was already present.
    pub fn insert(&mut self, key: ControlPairing) -> bool {
        self.keys.insert(key)
    }

    pub fn contains(&self, key: &ControlPairing) -> bool {
        self.keys.contains(key)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

/// Counters for one run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub specs_processed: usize,
    pub specs_skipped: usize,
    pub candidates: usize,
    pub accepted: usize,
    pub rejected: usize,
    /// Distinct (nuclease system, gene) lookups that found no guides
    pub empty_guide_sets: usize,
}

/// Per-run state shared with the design while it expands gene pairs.
pub struct Expansion<'s> {
    checker: OverlapChecker,
    joiner: Option<String>,
    seen: SeenSet,
    missing: HashSet<(String, String)>,
    sink: &'s mut dyn PairSink,
    summary: RunSummary,
}

impl<'s> Expansion<'s> {
    pub fn new(
        checker: OverlapChecker,
        joiner: Option<String>,
        sink: &'s mut dyn PairSink,
    ) -> Self {
        Self {
            checker,
            joiner,
            seen: SeenSet::new(),
            missing: HashSet::new(),
            sink,
            summary: RunSummary::default(),
        }
    }

    /// Filter candidates through the overlap check and write the survivors.
    /// Returns the number of accepted pairs.
    pub fn emit<'a, I>(&mut self, candidates: I) -> Result<usize>
    where
        I: IntoIterator<Item = PairCandidate<'a>>,
    {
        let mut accepted = 0;
        for candidate in candidates {
            self.summary.candidates += 1;
            let report = self.checker.measure(candidate.left, candidate.right);
            let record = OutputRecord::from_candidate(&candidate, self.joiner.as_deref());

            if self.checker.accepts(&report) {
                self.sink.accept(&record)?;
                self.summary.accepted += 1;
                accepted += 1;
            } else {
                info!(
                    "Rejected {} ({}): shares {} bases ({} direct, {} reverse complement)",
                    record.combination(),
                    record.gene_pair(),
                    report.longest(),
                    report.direct,
                    report.reverse_complement
                );
                self.sink.reject(&record, &report)?;
                self.summary.rejected += 1;
            }
        }
        Ok(accepted)
    }

    pub fn is_seen(&self, key: &ControlPairing) -> bool {
        self.seen.contains(key)
    }

    pub fn mark_seen(&mut self, key: ControlPairing) {
        self.seen.insert(key);
    }

    /// Guides for `gene` in `library`. A gene without guides is warned
    /// about and counted once per nuclease system, however often it is looked up.
    pub fn guides<'g>(
        &mut self,
        library: &'g GuideLibrary,
        gene: &str,
        system: &str,
    ) -> &'g [GuideRecord] {
        let guides = library.guides_for(gene);
        if guides.is_empty() && self.missing.insert((system.to_string(), gene.to_string())) {
            warn!("No {} guides found for gene '{}'", system, gene);
            self.summary.empty_guide_sets += 1;
        }
        guides
    }

    pub fn summary(&self) -> RunSummary {
        self.summary
    }

    fn finish(self) -> Result<RunSummary> {
        self.sink.flush()?;
        Ok(self.summary)
    }
}

/// One way of turning gene pairs into guide pairs.
pub trait LibraryDesign {
    /// Column names used for the output table.
    fn header(&self) -> OutputHeader;

    /// Constant sequence placed between the two guides, if any.
    fn joiner(&self) -> Option<&str> {
        None
    }

    /// Expand a `GP` row.
    fn expand_gene_pair(&mut self, pair: &GenePair, ctx: &mut Expansion<'_>) -> Result<()>;

    /// Expand an `Essential` row, which only concerns its first gene.
    fn expand_essential(&mut self, gene: &str, ctx: &mut Expansion<'_>) -> Result<()>;

    /// Control-by-control pairs written after all gene pairs.
    fn calibrate(&mut self, ctx: &mut Expansion<'_>) -> Result<()>;
}

pub struct GenePairProcessor<D: LibraryDesign> {
    design: D,
    checker: OverlapChecker,
}

impl<D: LibraryDesign> GenePairProcessor<D> {
    pub fn new(design: D, checker: OverlapChecker) -> Self {
        Self { design, checker }
    }

    pub fn header(&self) -> OutputHeader {
        self.design.header()
    }

    /// Process every gene pair row in order, then the control-by-control pass.
    pub fn run(
        mut self,
        specs: &[GenePairSpec],
        sink: &mut dyn PairSink,
    ) -> Result<RunSummary> {
        let joiner = self.design.joiner().map(str::to_string);
        let mut ctx = Expansion::new(self.checker, joiner, sink);

        for spec in specs {
            match &spec.annotation {
                Annotation::GenePair => {
                    debug!("Expanding gene pair {}", spec.pair);
                    self.design.expand_gene_pair(&spec.pair, &mut ctx)?;
                    ctx.summary.specs_processed += 1;
                }
                Annotation::Essential => {
                    debug!("Expanding essential gene {}", spec.pair.first);
                    self.design.expand_essential(&spec.pair.first, &mut ctx)?;
                    ctx.summary.specs_processed += 1;
                }
                Annotation::Other(raw) => {
                    warn!("Skipping {} with unhandled annotation '{}'", spec.pair, raw);
                    ctx.summary.specs_skipped += 1;
                }
            }
        }

        self.design.calibrate(&mut ctx)?;
        let summary = ctx.finish()?;

        info!(
            "Processed {} gene pair(s), skipped {}; {} candidate pairs, {} written",
            summary.specs_processed, summary.specs_skipped, summary.candidates, summary.accepted
        );
        if summary.rejected > 0 || summary.empty_guide_sets > 0 {
            warn!(
                "{} pair(s) rejected for overlap, {} gene(s) without guides",
                summary.rejected, summary.empty_guide_sets
            );
        }
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::enumerate::cartesian;
    use crate::output::MemorySink;

    #[test]
    fn test_seen_set() {
        let mut seen = SeenSet::new();
        assert!(seen.is_empty());
        assert!(seen.insert(ControlPairing::control_first("KRAS")));
        assert!(!seen.insert(ControlPairing::control_first("KRAS")));
        // The other orientation is a separate key
        assert!(!seen.contains(&ControlPairing::control_second("KRAS")));
        assert!(seen.insert(ControlPairing::control_second("KRAS")));
        assert_eq!(seen.len(), 2);
    }

    #[test]
    fn test_control_pairing_display() {
        assert_eq!(ControlPairing::control_first("MYC").to_string(), "control:MYC");
        assert_eq!(ControlPairing::control_second("MYC").to_string(), "MYC:control");
    }

    #[test]
    fn test_emit_filters_and_counts() {
        let left = vec![
            GuideRecord::new("AAAAAAAAAAAAAAAAAAAA", "X").unwrap(),
            GuideRecord::new("ACGTACGTACGTACGTACGT", "X").unwrap(),
        ];
        let right = vec![GuideRecord::new("AAAAAAAAAAAAAAAAAAAA", "Y").unwrap()];

        let mut sink = MemorySink::default();
        let joiner = Some("TTTT".to_string());
        let mut ctx = Expansion::new(OverlapChecker::new(12), joiner, &mut sink);
        let accepted = ctx.emit(cartesian(&left, &right)).unwrap();
        let summary = ctx.summary();

        assert_eq!(accepted, 1);
        assert_eq!(summary.candidates, 2);
        assert_eq!(summary.accepted, 1);
        assert_eq!(summary.rejected, 1);
        assert_eq!(
            sink.accepted[0].combination(),
            "ACGTACGTACGTACGTACGT:TTTT:AAAAAAAAAAAAAAAAAAAA"
        );
        assert_eq!(sink.rejected[0].gene_pair(), "X:Y");
    }

    #[test]
    fn test_guides_counts_empty_sets() {
        let library: GuideLibrary = vec![GuideRecord::new("ACGT", "X").unwrap()]
            .into_iter()
            .collect();
        let mut sink = MemorySink::default();
        let mut ctx = Expansion::new(OverlapChecker::default(), None, &mut sink);
        assert_eq!(ctx.guides(&library, "X", "SpCas9").len(), 1);
        assert!(ctx.guides(&library, "Y", "SpCas9").is_empty());
        // Repeated lookups of the same missing set are counted once
        assert!(ctx.guides(&library, "Y", "SpCas9").is_empty());
        assert_eq!(ctx.summary().empty_guide_sets, 1);
        // The same gene missing from another system is a separate set
        assert!(ctx.guides(&library, "Y", "SaCas9").is_empty());
        assert_eq!(ctx.summary().empty_guide_sets, 2);
    }
}
