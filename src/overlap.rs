//! Sequence similarity gate applied to every guide pair before output.
//!
//! Two guides placed in one construct are rejected when they share a long
//! contiguous stretch, either directly or when the first guide is reverse
//! complemented, since such pairs are prone to recombination and synthesis
//! artifacts.

use crate::guide::GuideRecord;

/// Default minimum shared stretch that makes a pair unsafe.
pub const DEFAULT_OVERLAP_THRESHOLD: usize = 12;

/// Length of the longest contiguous substring shared by `a` and `b`.
pub fn longest_common_substring(a: &[u8], b: &[u8]) -> usize {
    if a.is_empty() || b.is_empty() {
        return 0;
    }

    // Rolling row of match lengths ending at (i, j)
    let mut prev = vec![0usize; b.len() + 1];
    let mut curr = vec![0usize; b.len() + 1];
    let mut best = 0;

    for &x in a {
        for (j, &y) in b.iter().enumerate() {
            curr[j + 1] = if x == y { prev[j] + 1 } else { 0 };
            best = best.max(curr[j + 1]);
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    best
}

/// Shared stretch lengths of a pair in both orientations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OverlapReport {
    /// Longest common substring of the two sequences as given
    pub direct: usize,
    /// Longest common substring of revcomp(first) and second
    pub reverse_complement: usize,
}

impl OverlapReport {
    pub fn longest(&self) -> usize {
        self.direct.max(self.reverse_complement)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct OverlapChecker {
    threshold: usize,
}

impl Default for OverlapChecker {
    fn default() -> Self {
        Self::new(DEFAULT_OVERLAP_THRESHOLD)
    }
}

impl OverlapChecker {
    pub fn new(threshold: usize) -> Self {
        Self { threshold }
    }

    pub fn threshold(&self) -> usize {
        self.threshold
    }

    /// Measure both orientations for a pair of guides.
    ///
    /// Records only hold A/C/G/T sequences, so an invalid base is reported
    /// with its gene when the record is built.
    pub fn measure(&self, first: &GuideRecord, second: &GuideRecord) -> OverlapReport {
        let second_seq = second.sequence().as_bytes();
        OverlapReport {
            direct: longest_common_substring(first.sequence().as_bytes(), second_seq),
            reverse_complement: longest_common_substring(&first.reverse_complement(), second_seq),
        }
    }

    /// True when both orientations stay strictly below the threshold.
    pub fn is_safe(&self, first: &GuideRecord, second: &GuideRecord) -> bool {
        self.accepts(&self.measure(first, second))
    }

    pub fn accepts(&self, report: &OverlapReport) -> bool {
        report.direct < self.threshold && report.reverse_complement < self.threshold
    }
}
