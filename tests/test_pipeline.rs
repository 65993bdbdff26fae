//! Pipeline tests on reads sampled from a synthetic genome
//!
//! Two 8 kb reads share 3 kb of sequence; the pipeline should find that
//! shared stretch on the right strand and report it with read names attached.

use ovlrefine::overlap::{Overlap, RelativeStrand};
use ovlrefine::pipeline::{find_overlaps, PipelineConfig};
use ovlrefine::rescue::RescueConfig;
use ovlrefine::sequence::{Read, ReadSet};

use synthetic_reads::{generate_base_sequence, revcomp};

const GENOME_LEN: usize = 13_000;
const READ_LEN: usize = 8_000;
const SHIFT: usize = 5_000;

fn near(value: u32, expected: u32, tolerance: u32) -> bool {
    value.abs_diff(expected) <= tolerance
}

fn overlap_between(overlaps: &[Overlap], query: u64, target: u64) -> &Overlap {
    let found: Vec<&Overlap> = overlaps
        .iter()
        .filter(|o| o.query_read_id == query && o.target_read_id == target)
        .collect();
    assert_eq!(found.len(), 1, "expected one overlap {query}->{target}: {overlaps:?}");
    found[0]
}

fn reads_from(genome: &[u8], reverse_second: bool) -> ReadSet {
    let first = genome[..READ_LEN].to_vec();
    let mut second = genome[SHIFT..SHIFT + READ_LEN].to_vec();
    if reverse_second {
        second = revcomp(&second);
    }
    vec![Read::new("read1", first), Read::new("read2", second)]
        .into_iter()
        .collect()
}

fn shifted_reads(reverse_second: bool) -> ReadSet {
    reads_from(&generate_base_sequence(GENOME_LEN, 42), reverse_second)
}

/// Forward pairs sit on the diagonal `query - target == SHIFT`
fn assert_on_forward_diagonal(o: &Overlap, shift: i64) {
    assert_eq!(o.query_start as i64 - o.target_start as i64, shift, "{o:?}");
    assert_eq!(o.query_end as i64 - o.target_end as i64, shift, "{o:?}");
}

/// Reverse pairs sit on the anti-diagonal `query + target == GENOME_LEN`
fn assert_on_reverse_diagonal(o: &Overlap) {
    assert_eq!(o.query_start + o.target_end, GENOME_LEN as u32, "{o:?}");
    assert_eq!(o.query_end + o.target_start, GENOME_LEN as u32, "{o:?}");
}

#[test]
fn test_forward_dovetail_overlap() {
    let reads = shifted_reads(false);
    let overlaps = find_overlaps(&reads, &reads, &PipelineConfig::default()).unwrap();

    let o = overlap_between(&overlaps, 0, 1);
    assert_eq!(o.relative_strand, RelativeStrand::Forward);
    assert!(near(o.query_start, 5000, 50), "{o:?}");
    assert!(near(o.query_end, 8000, 50), "{o:?}");
    assert!(near(o.target_start, 0, 50), "{o:?}");
    assert!(near(o.target_end, 3000, 50), "{o:?}");
    assert_on_forward_diagonal(o, SHIFT as i64);
    assert!(o.num_residues >= 3);

    assert_eq!(o.query_read_name, "read1");
    assert_eq!(o.target_read_name, "read2");
    assert_eq!(o.query_length, 8000);
    assert_eq!(o.target_length, 8000);

    // Same overlap seen from the other read
    let back = overlap_between(&overlaps, 1, 0);
    assert!(near(back.query_start, 0, 50), "{back:?}");
    assert!(near(back.target_end, 8000, 50), "{back:?}");
    assert_on_forward_diagonal(back, -(SHIFT as i64));
}

#[test]
fn test_reverse_complement_overlap() {
    let reads = shifted_reads(true);
    let overlaps = find_overlaps(&reads, &reads, &PipelineConfig::default()).unwrap();

    let o = overlap_between(&overlaps, 0, 1);
    assert_eq!(o.relative_strand, RelativeStrand::Reverse);
    assert!(near(o.query_start, 5000, 50), "{o:?}");
    assert!(near(o.query_end, 8000, 50), "{o:?}");
    // read2 is reversed, so the shared part sits at its far end
    assert!(near(o.target_start, 5000, 50), "{o:?}");
    assert!(near(o.target_end, 8000, 50), "{o:?}");
    assert_on_reverse_diagonal(o);
    assert_eq!(o.query_span(), o.target_span());

    let back = overlap_between(&overlaps, 1, 0);
    assert_eq!(back.relative_strand, RelativeStrand::Reverse);
    assert_on_reverse_diagonal(back);
}

/// Genome whose bases `[7900, 8000)` are `N`, so no anchor reaches the last
/// 100 bases of read1 and rescue has a real tail to recover
fn masked_tail_genome() -> Vec<u8> {
    let mut genome = generate_base_sequence(GENOME_LEN, 42);
    genome[READ_LEN - 100..READ_LEN].fill(b'N');
    genome
}

fn raw_and_rescued(reads: &ReadSet) -> (Overlap, Overlap) {
    let without = find_overlaps(reads, reads, &PipelineConfig::default().with_rescue(None)).unwrap();
    let rescue = RescueConfig::with_first_pass(1000, 0.9);
    let with = find_overlaps(reads, reads, &PipelineConfig::default().with_rescue(Some(rescue))).unwrap();
    (
        overlap_between(&without, 0, 1).clone(),
        overlap_between(&with, 0, 1).clone(),
    )
}

#[test]
fn test_rescue_recovers_masked_tail_forward() {
    let reads = reads_from(&masked_tail_genome(), false);
    let (raw, rescued) = raw_and_rescued(&reads);

    assert!(raw.query_end <= 7900, "{raw:?}");
    assert_on_forward_diagonal(&raw, SHIFT as i64);

    assert!(rescued.query_start <= raw.query_start);
    assert!(rescued.target_start <= raw.target_start);
    assert_eq!(rescued.query_end, 8000);
    assert_eq!(rescued.target_end, 3000);
    assert_on_forward_diagonal(&rescued, SHIFT as i64);
}

#[test]
fn test_rescue_recovers_masked_tail_reverse() {
    let reads = reads_from(&masked_tail_genome(), true);
    let (raw, rescued) = raw_and_rescued(&reads);

    assert_eq!(raw.relative_strand, RelativeStrand::Reverse);
    assert!(raw.query_end <= 7900, "{raw:?}");
    assert!(raw.target_start >= 5100, "{raw:?}");
    assert_on_reverse_diagonal(&raw);

    // The masked bases sit at the start of read2's shared part
    assert_eq!(rescued.relative_strand, RelativeStrand::Reverse);
    assert!(rescued.query_start <= raw.query_start);
    assert!(rescued.target_end >= raw.target_end);
    assert_eq!(rescued.query_end, 8000);
    assert_eq!(rescued.target_start, 5000);
    assert_on_reverse_diagonal(&rescued);
}

#[test]
fn test_unrelated_reads_do_not_overlap() {
    let a = generate_base_sequence(5000, 1);
    let b = generate_base_sequence(5000, 2);
    let reads: ReadSet = vec![Read::new("a", a), Read::new("b", b)].into_iter().collect();

    let overlaps = find_overlaps(&reads, &reads, &PipelineConfig::default()).unwrap();
    assert!(overlaps.is_empty(), "{overlaps:?}");
}

#[test]
fn test_self_overlaps_only_when_requested() {
    let reads: ReadSet = vec![Read::new("only", generate_base_sequence(3000, 9))]
        .into_iter()
        .collect();

    let overlaps = find_overlaps(&reads, &reads, &PipelineConfig::default()).unwrap();
    assert!(overlaps.is_empty());

    let mut config = PipelineConfig::default();
    config.matcher = config.matcher.with_skip_self(false);
    let overlaps = find_overlaps(&reads, &reads, &config).unwrap();
    assert!(overlaps
        .iter()
        .any(|o| o.query_read_id == 0 && o.target_read_id == 0));
}
