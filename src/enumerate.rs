use itertools::Itertools;

use crate::guide::GuideRecord;

/// A pair of guides that may end up in the library, before overlap filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PairCandidate<'a> {
    pub left: &'a GuideRecord,
    pub right: &'a GuideRecord,
}

/// Every combination of `left` with `right`; the left axis varies slowest.
pub fn cartesian<'a>(
    left: &'a [GuideRecord],
    right: &'a [GuideRecord],
) -> impl Iterator<Item = PairCandidate<'a>> + 'a {
    left.iter()
        .cartesian_product(right.iter())
        .map(|(left, right)| PairCandidate { left, right })
}

/// One-to-one pairing of `left[i]` with `right[i]`, stopping at the shorter side.
pub fn positional<'a>(
    left: &'a [GuideRecord],
    right: &'a [GuideRecord],
) -> impl Iterator<Item = PairCandidate<'a>> + 'a {
    left.iter()
        .zip(right.iter())
        .map(|(left, right)| PairCandidate { left, right })
}

/// Pair each guide with its own block of `per_guide` controls.
///
/// Guide `i` is combined with `controls[i * per_guide..(i + 1) * per_guide]`.
/// With `guide_first` false the control is placed on the left.
pub fn blockwise<'a>(
    guides: &'a [GuideRecord],
    controls: &'a [GuideRecord],
    per_guide: usize,
    guide_first: bool,
) -> impl Iterator<Item = PairCandidate<'a>> + 'a {
    guides
        .iter()
        .zip(controls.chunks(per_guide.max(1)))
        .flat_map(move |(guide, block)| {
            block.iter().map(move |control| {
                if guide_first {
                    PairCandidate {
                        left: guide,
                        right: control,
                    }
                } else {
                    PairCandidate {
                        left: control,
                        right: guide,
                    }
                }
            })
        })
}
