extern crate dualguide;

use std::collections::HashSet;

use rand::rngs::SmallRng;
use rand::SeedableRng;

use dualguide::design::{
    Cas12aConfig, Cas12aDesign, DualConfig, DualNucleaseDesign, ASCAS12A_DIRECT_REPEAT,
};
use dualguide::enumerate::cartesian;
use dualguide::gene_pairs::{Annotation, GenePair, GenePairSpec};
use dualguide::guide::{reverse_complement, GuideLibrary, GuideRecord};
use dualguide::output::{MemorySink, OutputRecord, TsvSink};
use dualguide::overlap::{longest_common_substring, OverlapChecker};
use dualguide::pool::ControlPoolAllocator;
use dualguide::processor::GenePairProcessor;

fn random_seq(rng: &mut SmallRng, length: usize) -> String {
    use rand::RngCore;
    let bases = b"ACGT";
    (0..length)
        .map(|_| char::from(bases[rng.next_u32() as usize % 4]))
        .collect()
}

fn random_records(rng: &mut SmallRng, label: &str, n: usize) -> Vec<GuideRecord> {
    (0..n)
        .map(|_| GuideRecord::new(random_seq(rng, 20), label).unwrap())
        .collect()
}

fn guide(seq: &str) -> GuideRecord {
    GuideRecord::new(seq, "G").unwrap()
}

fn spec(pair: &str, annotation: &str) -> GenePairSpec {
    GenePairSpec::new(GenePair::parse(pair, 1).unwrap(), Annotation::parse(annotation))
}

/// Identical poly-A guides share their whole length and are rejected
#[test]
fn test_poly_a_pair_rejected() {
    let seq = "AAAAAAAAAAAAAAAAAAAA";
    let checker = OverlapChecker::new(12);
    assert_eq!(longest_common_substring(seq.as_bytes(), seq.as_bytes()), 20);
    assert!(!checker.is_safe(&guide(seq), &guide(seq)));
}

/// ACGT repeats against TGCA repeats, with the overlap computed explicitly
#[test]
fn test_palindromic_repeat_pair() {
    let a = "ACGTACGTACGTACGTACGT";
    let b = "TGCATGCATGCATGCATGCA";

    let rc_a = reverse_complement(a).unwrap();
    assert_eq!(rc_a, a.as_bytes().to_vec(), "ACGT repeats are their own reverse complement");

    // The two sequences share no dinucleotide, so only single bases match
    let direct = longest_common_substring(a.as_bytes(), b.as_bytes());
    let reverse = longest_common_substring(&rc_a, b.as_bytes());
    assert_eq!(direct, 1);
    assert_eq!(reverse, 1);

    let checker = OverlapChecker::new(12);
    let (ga, gb) = (guide(a), guide(b));
    assert_eq!(checker.is_safe(&ga, &gb), direct < 12 && reverse < 12);
    assert!(checker.is_safe(&ga, &gb));
}

/// The direct overlap is symmetric in its arguments
#[test]
fn test_direct_overlap_symmetric() {
    let mut rng = SmallRng::seed_from_u64(42);
    for _ in 0..200 {
        let a = random_seq(&mut rng, 20);
        let b = random_seq(&mut rng, 20);
        assert_eq!(
            longest_common_substring(a.as_bytes(), b.as_bytes()),
            longest_common_substring(b.as_bytes(), a.as_bytes())
        );
    }
}

/// Both argument orders of the full check, tested separately
#[test]
fn test_full_check_each_direction() {
    let mut rng = SmallRng::seed_from_u64(7);
    let checker = OverlapChecker::new(6);
    for _ in 0..200 {
        let a = random_seq(&mut rng, 20);
        let b = random_seq(&mut rng, 20);
        let (ga, gb) = (guide(&a), guide(&b));

        let ab = checker.measure(&ga, &gb);
        let ba = checker.measure(&gb, &ga);
        let rc_a = reverse_complement(&a).unwrap();
        let rc_b = reverse_complement(&b).unwrap();

        assert_eq!(ab.reverse_complement, longest_common_substring(&rc_a, b.as_bytes()));
        assert_eq!(ba.reverse_complement, longest_common_substring(&rc_b, a.as_bytes()));
        assert_eq!(checker.is_safe(&ga, &gb), ab.direct < 6 && ab.reverse_complement < 6);
        assert_eq!(checker.is_safe(&gb, &ga), ba.direct < 6 && ba.reverse_complement < 6);
    }
}

/// m x n candidates, each (left, right) index pair exactly once
#[test]
fn test_enumeration_complete() {
    let mut rng = SmallRng::seed_from_u64(3);
    for (m, n) in [(1, 1), (2, 3), (5, 4), (0, 3)] {
        let left = random_records(&mut rng, "L", m);
        let right = random_records(&mut rng, "R", n);
        let pairs: Vec<(usize, usize)> = cartesian(&left, &right)
            .map(|c| {
                let i = left.iter().position(|r| std::ptr::eq(r, c.left)).unwrap();
                let j = right.iter().position(|r| std::ptr::eq(r, c.right)).unwrap();
                (i, j)
            })
            .collect();
        let unique: HashSet<_> = pairs.iter().collect();
        assert_eq!(pairs.len(), m * n);
        assert_eq!(unique.len(), m * n);
    }
}

/// An exhausted pool is refilled from its original contents
#[test]
fn test_pool_reset_after_exhaustion() {
    let mut rng = SmallRng::seed_from_u64(5);
    let originals = random_records(&mut rng, "nt", 12);
    let original_set: HashSet<GuideRecord> = originals.iter().cloned().collect();

    let mut allocator = ControlPoolAllocator::new(SmallRng::seed_from_u64(99));
    let pool = allocator.register("nt", originals);

    let mut drawn = HashSet::new();
    for _ in 0..2 {
        for record in allocator.sample(pool, 5).unwrap() {
            assert!(drawn.insert(record), "no reuse before the pool is exhausted");
        }
    }
    assert_eq!(allocator.available(pool), 2);

    let refill = allocator.sample(pool, 5).unwrap();
    assert_eq!(refill.len(), 5);
    assert!(refill.iter().all(|r| original_set.contains(r)));
    assert_eq!(allocator.resets(pool), 1);
}

fn cas12a_fixture(seed: u64) -> (GenePairProcessor<Cas12aDesign<SmallRng>>, Vec<GenePairSpec>) {
    let mut rng = SmallRng::seed_from_u64(1);
    let mut guides = GuideLibrary::new();
    for (gene, count) in [("X", 2), ("Y", 3), ("Z", 2)] {
        for record in random_records(&mut rng, gene, count) {
            guides.push(record);
        }
    }
    let no_site = random_records(&mut rng, "NO_SITE", 150);
    let intergenic = random_records(&mut rng, "INTERGENIC", 150);

    let design = Cas12aDesign::new(
        guides,
        no_site,
        intergenic,
        Cas12aConfig::default(),
        SmallRng::seed_from_u64(seed),
    )
    .unwrap();
    let specs = vec![spec("X:Y", "GP"), spec("X:Z", "GP"), spec("Y:Y", "GP")];
    (GenePairProcessor::new(design, OverlapChecker::new(12)), specs)
}

/// A GP row for genes with 2 and 3 guides expands to 6 direct candidates
#[test]
fn test_gene_pair_direct_candidates() {
    let (processor, _) = cas12a_fixture(1);
    let mut sink = MemorySink::default();
    let summary = processor.run(&[spec("X:Y", "GP")], &mut sink).unwrap();

    let direct = sink
        .accepted
        .iter()
        .chain(sink.rejected.iter())
        .filter(|r| r.gene_pair() == "X:Y")
        .count();
    assert_eq!(direct, 6);
    // Direct pairs, five guides with ten controls each, then 2 x 50 control pairs
    assert_eq!(summary.candidates, 6 + 5 * 10 + 100);
}

/// A gene shared by two GP rows gets its control pairs once
#[test]
fn test_shared_gene_controls_once() {
    let (processor, specs) = cas12a_fixture(1);
    let mut sink = MemorySink::default();
    processor.run(&specs, &mut sink).unwrap();

    let x_controls = sink
        .accepted
        .iter()
        .chain(sink.rejected.iter())
        .filter(|r| r.first_label == "X" && r.second_label.starts_with("NO_SITE"))
        .count();
    // Two X guides, five no-site controls each, generated in a single step
    assert_eq!(x_controls, 10);
}

/// Same inputs and seed give byte-identical output
#[test]
fn test_reproducible_output() {
    let render = |seed: u64| {
        let (processor, specs) = cas12a_fixture(seed);
        let mut sink = TsvSink::new(Vec::new(), processor.header()).unwrap();
        processor.run(&specs, &mut sink).unwrap();
        sink.into_inner().unwrap()
    };

    let first = render(2024);
    let second = render(2024);
    assert!(!first.is_empty());
    assert_eq!(first, second);
    assert_ne!(first, render(2025));
}

/// Every written identifier splits back into the guides and joiner that made it
#[test]
fn test_output_round_trip() {
    let (processor, specs) = cas12a_fixture(8);
    let mut sink = MemorySink::default();
    processor.run(&specs, &mut sink).unwrap();

    for record in &sink.accepted {
        let combination = record.combination();
        let parts: Vec<&str> = combination.split(':').collect();
        assert_eq!(parts, vec![
            record.first_sequence.as_str(),
            ASCAS12A_DIRECT_REPEAT,
            record.second_sequence.as_str(),
        ]);

        let parsed = OutputRecord::parse(&record.combination(), &record.gene_pair()).unwrap();
        assert_eq!(&parsed, record);
        assert_eq!(parsed.joiner.as_deref(), Some(ASCAS12A_DIRECT_REPEAT));
    }
}

/// No pair in the output fails the overlap check
#[test]
fn test_output_passes_overlap_check() {
    let mut rng = SmallRng::seed_from_u64(12);
    let mut sp = GuideLibrary::new();
    let mut sa = GuideLibrary::new();
    for gene in ["A", "B", "C"] {
        for record in random_records(&mut rng, gene, 4) {
            sp.push(record);
        }
        for record in random_records(&mut rng, gene, 4) {
            sa.push(record);
        }
    }
    // Controls that partly copy a guide, so some pairs must be rejected
    let template = sp.guides_for("A")[0].sequence().to_string();
    let mut sp_controls = random_records(&mut rng, "non-targeting", 150);
    let mut sa_controls = random_records(&mut rng, "non-targeting", 150);
    for controls in [&mut sp_controls, &mut sa_controls] {
        for control in controls.iter_mut().take(75) {
            let copy = format!("{}{}", &template[..14], &control.sequence()[14..]);
            *control = GuideRecord::control(copy).unwrap();
        }
    }

    let design = DualNucleaseDesign::new(
        sp,
        sa,
        sp_controls,
        sa_controls,
        DualConfig::default(),
        SmallRng::seed_from_u64(4),
    );
    let checker = OverlapChecker::new(12);
    let mut sink = MemorySink::default();
    let summary = GenePairProcessor::new(design, checker)
        .run(
            &[spec("A:B", "GP"), spec("C:C", "GP"), spec("B:A", "Essential")],
            &mut sink,
        )
        .unwrap();

    assert!(summary.rejected > 0);
    assert_eq!(summary.accepted + summary.rejected, summary.candidates);
    for record in &sink.accepted {
        let (first, second) = (guide(&record.first_sequence), guide(&record.second_sequence));
        assert!(checker.is_safe(&first, &second));
        assert!(record.joiner.is_none());
    }
    for record in &sink.rejected {
        let (first, second) = (guide(&record.first_sequence), guide(&record.second_sequence));
        assert!(!checker.is_safe(&first, &second));
    }
}
