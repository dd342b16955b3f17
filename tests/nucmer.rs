use std::path::PathBuf;

use pairalign::io::load_sequences;
use pairalign::nucmer::MumFinder;
use pairalign::{Alphabet, NucmerAligner, NucmerConfig, Sequence, SequenceAligner};

fn data_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/data").join(name)
}

fn scenario_config() -> NucmerConfig {
    NucmerConfig::default()
        .with_length_of_mum(3)
        .with_fixed_separation(0)
        .with_minimum_score(2)
        .with_separation_factor(-1.0)
}

/// Pseudo-random reference with a query built from two of its regions, separated by
/// unrelated sequence and carrying a few substitutions.
fn related_pair() -> (Vec<u8>, Vec<u8>) {
    let mut state: u64 = 42;
    let mut random = |len: usize| -> Vec<u8> {
        (0..len)
            .map(|_| {
                state = state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
                b"ACGT"[((state >> 33) % 4) as usize]
            })
            .collect()
    };

    let reference = random(600);

    let mut query = random(30);
    query.extend_from_slice(&reference[100..250]);
    query.extend(random(12));
    query.extend_from_slice(&reference[320..500]);

    for pos in [60, 120, 250, 300] {
        query[pos] = if query[pos] == b'A' { b'C' } else { b'A' };
    }

    (reference, query)
}

#[test]
fn test_nucmer_fixture() {
    let references = load_sequences(data_path("nucmer_reference.fa"), Some(Alphabet::Dna)).unwrap();
    let queries = load_sequences(data_path("nucmer_query.fa"), Some(Alphabet::Dna)).unwrap();

    let aligner = NucmerAligner::new(scenario_config());
    let result = aligner.align_many(&references, &queries).unwrap();

    let blocks: Vec<(&[u8], &[u8], i64)> = result.iter()
        .flat_map(|alignment| alignment.iter())
        .map(|a| (a.first_sequence.symbols(), a.second_sequence.symbols(), a.score))
        .collect();

    assert_eq!(blocks, vec![
        (&b"GCGCATCCCC"[..], &b"GCGC--CCCC"[..], -5),
        (&b"AGCT"[..], &b"AGCT"[..], 12),
    ]);

    assert_eq!(result[0].first_sequence().id(), "r1");
    assert_eq!(result[1].first_sequence().id(), "r2");
    assert_eq!(result[1].second_sequence().id(), "q1");
}

#[test]
fn test_anchors_are_unique_exact_matches() {
    let (reference, query) = related_pair();
    let finder = MumFinder::new(&reference, 15).unwrap();

    let anchors: Vec<_> = finder.matches(&query).collect();
    assert!(!anchors.is_empty());

    for anchor in &anchors {
        let matched = &reference[anchor.reference_start..anchor.reference_end()];
        assert!(anchor.length >= 15);
        assert_eq!(matched, &query[anchor.query_start..anchor.query_end()]);

        let occurrences = reference.windows(matched.len()).filter(|w| *w == matched).count();
        assert_eq!(occurrences, 1);
    }

    for pair in anchors.windows(2) {
        assert!(pair[0].query_start < pair[1].query_start);
        assert!(pair[0].query_end() < pair[1].query_end());
    }
}

#[test]
fn test_blocks_cover_related_regions() {
    let (reference, query) = related_pair();
    let reference = Sequence::new("ref", Alphabet::Dna, reference);
    let query = Sequence::new("qry", Alphabet::Dna, query);

    let config = NucmerConfig::default()
        .with_length_of_mum(15)
        .with_minimum_score(40);
    let aligner = NucmerAligner::new(config);

    let result = aligner.align(&reference, &query).unwrap();
    assert_eq!(result.len(), 1);

    for block in &result[0] {
        let first_end = block.metadata.first_end;
        let second_end = block.metadata.second_end;

        assert_eq!(
            block.first_sequence.ungapped(),
            &reference.symbols()[block.first_offset..first_end],
        );
        assert_eq!(
            block.second_sequence.ungapped(),
            &query.symbols()[block.second_offset..second_end],
        );
        assert_eq!(block.first_sequence.len(), block.second_sequence.len());
    }

    let covered: usize = result[0].iter()
        .map(|block| block.metadata.first_end - block.first_offset)
        .sum();
    assert!(covered >= 300, "only {covered} reference symbols aligned");

    let simple = aligner.align_simple(&reference, &query).unwrap();
    assert_eq!(simple.len(), 1);
}

#[test]
fn test_list_alignment() {
    let mut sequences =
        load_sequences(data_path("nucmer_reference.fa"), Some(Alphabet::Dna)).unwrap();
    sequences.truncate(1);
    sequences.extend(load_sequences(data_path("nucmer_query.fa"), Some(Alphabet::Dna)).unwrap());

    let aligner = NucmerAligner::new(scenario_config());
    let result = aligner.align_list(&sequences).unwrap();

    assert_eq!(result.len(), 1);
    assert_eq!(result[0].aligned_sequences()[0].score, -5);
    assert_eq!(aligner.name(), "NUCmer");
}
