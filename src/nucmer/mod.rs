//! MUM anchored alignment of long, similar sequences.
//!
//! Alignment proceeds in three stages: maximal unique matches between each reference and
//! query are found with a suffix array ([`mum`]), filtered, clustered and chained
//! ([`cluster`]), and finally turned into gapped alignment blocks ([`extend`]).

use serde::Serialize;
use tracing::{debug, span, Level};

use crate::aligner::config::{affine_costs, linear_costs};
use crate::aligner::scoring::{GapCosts, SimilarityMatrix};
use crate::aligner::{validate_pair, SequenceAligner};
use crate::alignment::{PairwiseAlignedSequence, PairwiseSequenceAlignment};
use crate::errors::AlignError;
use crate::sequence::Sequence;

pub mod cluster;
pub mod extend;
pub mod mum;

use cluster::{ClusterBuilder, ClusterParams};
use extend::BlockBuilder;
pub use cluster::Cluster;
pub use mum::{Anchor, MatchUniqueness, MumFinder, MumIter};

pub const DEFAULT_LENGTH_OF_MUM: usize = 20;
pub const DEFAULT_GAP_OPEN_COST: i32 = -13;
pub const DEFAULT_GAP_EXTENSION_COST: i32 = -8;
pub const DEFAULT_FIXED_SEPARATION: i64 = 5;
pub const DEFAULT_MAXIMUM_SEPARATION: i64 = 1000;
pub const DEFAULT_MINIMUM_SCORE: i64 = 200;
pub const DEFAULT_SEPARATION_FACTOR: f32 = 0.05;
pub const DEFAULT_BREAK_LENGTH: usize = 200;

/// Settings of the [`NucmerAligner`].
///
/// Negative values for the separation and score settings are ignored, the previous value
/// is kept. The separation factor only has to exceed -1.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NucmerConfig {
    similarity_matrix: SimilarityMatrix,
    gap_open_cost: i32,
    gap_extension_cost: i32,

    /// Minimum length of a maximal unique match
    length_of_mum: usize,

    /// Diagonal difference always allowed between anchors of one cluster
    fixed_separation: i64,

    /// Maximum query distance between neighbouring anchors of one cluster
    maximum_separation: i64,

    /// Minimum total anchor length of a chain
    minimum_score: i64,

    /// Diagonal difference allowed between anchors, as a fraction of their distance
    separation_factor: f32,

    /// Maximum distance an alignment is extended past the outermost anchors, and the gap
    /// length up to which neighbouring clusters are always joined
    break_length: usize,

    /// Which matches are used as anchors
    match_uniqueness: MatchUniqueness,

    /// Whether alignments are extended past their outermost anchors
    extend: bool,
}

impl Default for NucmerConfig {
    fn default() -> Self {
        Self {
            similarity_matrix: SimilarityMatrix::diagonal(3, -7),
            gap_open_cost: DEFAULT_GAP_OPEN_COST,
            gap_extension_cost: DEFAULT_GAP_EXTENSION_COST,
            length_of_mum: DEFAULT_LENGTH_OF_MUM,
            fixed_separation: DEFAULT_FIXED_SEPARATION,
            maximum_separation: DEFAULT_MAXIMUM_SEPARATION,
            minimum_score: DEFAULT_MINIMUM_SCORE,
            separation_factor: DEFAULT_SEPARATION_FACTOR,
            break_length: DEFAULT_BREAK_LENGTH,
            match_uniqueness: MatchUniqueness::default(),
            extend: true,
        }
    }
}

impl NucmerConfig {
    pub fn with_similarity_matrix(self, similarity_matrix: SimilarityMatrix) -> Self {
        Self { similarity_matrix, ..self }
    }

    pub fn with_gap_open_cost(self, gap_open_cost: i32) -> Self {
        Self { gap_open_cost, ..self }
    }

    pub fn with_gap_extension_cost(self, gap_extension_cost: i32) -> Self {
        Self { gap_extension_cost, ..self }
    }

    pub fn with_length_of_mum(self, length_of_mum: usize) -> Self {
        Self { length_of_mum, ..self }
    }

    pub fn with_fixed_separation(self, fixed_separation: i64) -> Self {
        if fixed_separation < 0 {
            return self;
        }

        Self { fixed_separation, ..self }
    }

    pub fn with_maximum_separation(self, maximum_separation: i64) -> Self {
        if maximum_separation < 0 {
            return self;
        }

        Self { maximum_separation, ..self }
    }

    pub fn with_minimum_score(self, minimum_score: i64) -> Self {
        if minimum_score < 0 {
            return self;
        }

        Self { minimum_score, ..self }
    }

    pub fn with_separation_factor(self, separation_factor: f32) -> Self {
        if separation_factor <= -1.0 {
            return self;
        }

        Self { separation_factor, ..self }
    }

    pub fn with_break_length(self, break_length: usize) -> Self {
        Self { break_length, ..self }
    }

    pub fn with_match_uniqueness(self, match_uniqueness: MatchUniqueness) -> Self {
        Self { match_uniqueness, ..self }
    }

    pub fn with_extension(self, extend: bool) -> Self {
        Self { extend, ..self }
    }

    pub fn similarity_matrix(&self) -> &SimilarityMatrix {
        &self.similarity_matrix
    }

    pub fn gap_open_cost(&self) -> i32 {
        self.gap_open_cost
    }

    pub fn gap_extension_cost(&self) -> i32 {
        self.gap_extension_cost
    }

    pub fn length_of_mum(&self) -> usize {
        self.length_of_mum
    }

    pub fn fixed_separation(&self) -> i64 {
        self.fixed_separation
    }

    pub fn maximum_separation(&self) -> i64 {
        self.maximum_separation
    }

    pub fn minimum_score(&self) -> i64 {
        self.minimum_score
    }

    pub fn separation_factor(&self) -> f32 {
        self.separation_factor
    }

    pub fn break_length(&self) -> usize {
        self.break_length
    }

    pub fn match_uniqueness(&self) -> MatchUniqueness {
        self.match_uniqueness
    }

    pub fn extend(&self) -> bool {
        self.extend
    }

    fn cluster_params(&self) -> ClusterParams {
        ClusterParams {
            fixed_separation: self.fixed_separation,
            maximum_separation: self.maximum_separation,
            separation_factor: self.separation_factor,
            minimum_score: self.minimum_score,
        }
    }
}

/// Aligner for long sequences anchored on maximal unique matches (MUMs).
///
/// Every reference is aligned to every query. Each pair with at least one alignment block
/// yields one [`PairwiseSequenceAlignment`], reference first.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NucmerAligner {
    config: NucmerConfig,
}

impl NucmerAligner {
    pub fn new(config: NucmerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &NucmerConfig {
        &self.config
    }

    /// Align each query to each reference using linear gap costs.
    pub fn align_many_simple<'a>(
        &self,
        references: &'a [Sequence],
        queries: &'a [Sequence],
    ) -> Result<Vec<PairwiseSequenceAlignment<'a>>, AlignError> {
        let costs = linear_costs(self.config.gap_open_cost)?;

        self.run(costs, references, queries)
    }

    /// Align each query to each reference using affine gap costs.
    pub fn align_many<'a>(
        &self,
        references: &'a [Sequence],
        queries: &'a [Sequence],
    ) -> Result<Vec<PairwiseSequenceAlignment<'a>>, AlignError> {
        let costs = affine_costs(self.config.gap_open_cost, self.config.gap_extension_cost)?;

        self.run(costs, references, queries)
    }

    fn run<'a, G: GapCosts>(
        &self,
        costs: G,
        references: &'a [Sequence],
        queries: &'a [Sequence],
    ) -> Result<Vec<PairwiseSequenceAlignment<'a>>, AlignError> {
        let matrix = &self.config.similarity_matrix;

        for reference in references {
            for query in queries {
                validate_pair(matrix, reference, query)?;
            }
        }

        let span = span!(
            Level::INFO,
            "nucmer",
            references = references.len(),
            queries = queries.len()
        );
        let _enter = span.enter();

        let mut alignments = Vec::new();

        for reference in references {
            let finder = MumFinder::new(reference.symbols(), self.config.length_of_mum)?
                .with_uniqueness(self.config.match_uniqueness);

            for query in queries {
                let anchors: Vec<Anchor> = finder.matches(query.symbols()).collect();
                let num_anchors = anchors.len();

                let clusters = ClusterBuilder::new(self.config.cluster_params()).build(anchors);
                let num_clusters = clusters.len();

                let blocks = BlockBuilder::new(
                    reference.symbols(),
                    query.symbols(),
                    matrix,
                    costs,
                    self.config.break_length,
                )
                .with_extension(self.config.extend)
                .build(clusters);

                debug!(
                    reference = reference.id(),
                    query = query.id(),
                    anchors = num_anchors,
                    clusters = num_clusters,
                    blocks = blocks.len(),
                    "aligned pair"
                );

                if blocks.is_empty() {
                    continue;
                }

                let aligned = blocks.iter()
                    .map(|block| {
                        let score =
                            block.score(reference.symbols(), query.symbols(), matrix, costs);

                        PairwiseAlignedSequence::from_pairs(
                            reference,
                            query,
                            matrix,
                            &block.pairs,
                            score,
                            block.reference_start..block.reference_end,
                            block.query_start..block.query_end,
                        )
                    })
                    .collect();

                alignments.push(PairwiseSequenceAlignment::with_aligned_sequences(
                    reference,
                    query,
                    aligned,
                ));
            }
        }

        Ok(alignments)
    }
}

/// Which strands of the query sequences are aligned to the references
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
pub enum QueryStrand {
    #[default]
    Forward,

    /// Only the reverse complement of each query
    Reverse,

    /// Each query followed by its reverse complement
    Both,
}

/// Prepare the query list for the selected strands. Reverse complements are named after
/// their query with a `" Reverse"` suffix. Protein queries have no reverse strand and are
/// kept on the forward strand only.
pub fn query_strands(queries: Vec<Sequence>, strand: QueryStrand) -> Vec<Sequence> {
    match strand {
        QueryStrand::Forward => queries,
        QueryStrand::Reverse => queries.iter()
            .filter_map(Sequence::reverse_complement)
            .collect(),
        QueryStrand::Both => queries.into_iter()
            .flat_map(|query| {
                let reverse = query.reverse_complement();
                std::iter::once(query).chain(reverse)
            })
            .collect(),
    }
}

fn split_reference(sequences: &[Sequence]) -> Result<(&[Sequence], &[Sequence]), AlignError> {
    if sequences.len() < 2 {
        return Err(AlignError::WrongSequenceCount {
            expected: "at least 2",
            actual: sequences.len(),
        });
    }

    Ok(sequences.split_at(1))
}

impl SequenceAligner for NucmerAligner {
    fn name(&self) -> &'static str {
        "NUCmer"
    }

    fn description(&self) -> &'static str {
        "Alignment of long sequences anchored on maximal unique matches"
    }

    fn align_simple<'a>(
        &self,
        first: &'a Sequence,
        second: &'a Sequence,
    ) -> Result<Vec<PairwiseSequenceAlignment<'a>>, AlignError> {
        self.align_many_simple(std::slice::from_ref(first), std::slice::from_ref(second))
    }

    fn align<'a>(
        &self,
        first: &'a Sequence,
        second: &'a Sequence,
    ) -> Result<Vec<PairwiseSequenceAlignment<'a>>, AlignError> {
        self.align_many(std::slice::from_ref(first), std::slice::from_ref(second))
    }

    fn align_list_simple<'a>(
        &self,
        sequences: &'a [Sequence],
    ) -> Result<Vec<PairwiseSequenceAlignment<'a>>, AlignError> {
        let (references, queries) = split_reference(sequences)?;

        self.align_many_simple(references, queries)
    }

    fn align_list<'a>(
        &self,
        sequences: &'a [Sequence],
    ) -> Result<Vec<PairwiseSequenceAlignment<'a>>, AlignError> {
        let (references, queries) = split_reference(sequences)?;

        self.align_many(references, queries)
    }
}

#[cfg(test)]
mod tests {
    use super::{query_strands, MatchUniqueness, NucmerAligner, NucmerConfig, QueryStrand};
    use crate::aligner::SequenceAligner;
    use crate::errors::AlignError;
    use crate::sequence::{Alphabet, Sequence};

    fn dna(id: &str, symbols: &str) -> Sequence {
        Sequence::new(id, Alphabet::Dna, symbols)
    }

    fn small_config() -> NucmerConfig {
        NucmerConfig::default()
            .with_length_of_mum(3)
            .with_fixed_separation(0)
            .with_minimum_score(2)
    }

    #[test]
    fn test_multiple_references() {
        let aligner = NucmerAligner::new(small_config());
        let references = vec![dna("r1", "ATGCGCATCCCC"), dna("r2", "TAGCT")];
        let queries = vec![dna("q1", "CCGCGCCCCCTCAGCT")];

        let result = aligner.align_many(&references, &queries).unwrap();
        assert_eq!(result.len(), 2);

        let first = &result[0];
        assert_eq!(first.first_sequence().id(), "r1");
        assert_eq!(first.len(), 1);

        let block = &first.aligned_sequences()[0];
        assert_eq!(block.first_sequence.symbols(), b"GCGCATCCCC");
        assert_eq!(block.second_sequence.symbols(), b"GCGC--CCCC");
        assert_eq!(block.consensus.as_ref().unwrap().symbols(), b"GCGCATCCCC");
        assert_eq!(block.score, -5);
        assert_eq!((block.first_offset, block.second_offset), (2, 2));

        let second = &result[1];
        assert_eq!(second.first_sequence().id(), "r2");

        let block = &second.aligned_sequences()[0];
        assert_eq!(block.first_sequence.symbols(), b"AGCT");
        assert_eq!(block.second_sequence.symbols(), b"AGCT");
        assert_eq!(block.score, 12);
        assert_eq!((block.first_offset, block.second_offset), (1, 12));
    }

    #[test]
    fn test_single_reference() {
        let aligner = NucmerAligner::new(small_config());
        let reference = dna("r", "ATGCGCATCCCCTAGCT");
        let query = dna("q", "CCGCGCCCCCTCAGCT");

        let result = aligner.align(&reference, &query).unwrap();
        assert_eq!(result.len(), 1);

        let block = &result[0].aligned_sequences()[0];
        assert_eq!(block.first_sequence.symbols(), b"GCGCATCCCCT-AGCT");
        assert_eq!(block.second_sequence.symbols(), b"GCGC--CCCCTCAGCT");
        assert_eq!(block.score, -11);
    }

    #[test]
    fn test_list_uses_first_as_reference() {
        let aligner = NucmerAligner::new(small_config());
        let sequences = vec![dna("r", "TAGCT"), dna("q1", "CCGCGCCCCCTCAGCT"), dna("q2", "GGGGG")];

        let result = aligner.align_list(&sequences).unwrap();
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].second_sequence().id(), "q1");

        assert!(matches!(
            aligner.align_list_simple(&sequences[..1]),
            Err(AlignError::WrongSequenceCount { actual: 1, .. })
        ));
    }

    #[test]
    fn test_no_anchors() {
        let aligner = NucmerAligner::default();
        let (a, b) = (dna("a", "ACGTACGT"), dna("b", "ACGTACGT"));

        assert!(aligner.align(&a, &b).unwrap().is_empty());
    }

    #[test]
    fn test_invalid_length_of_mum() {
        let aligner = NucmerAligner::new(NucmerConfig::default().with_length_of_mum(0));
        let (a, b) = (dna("a", "ACGT"), dna("b", "ACGT"));

        assert!(matches!(aligner.align_simple(&a, &b), Err(AlignError::InvalidLengthOfMum(0))));
    }

    #[test]
    fn test_negative_settings_are_ignored() {
        let config = NucmerConfig::default()
            .with_fixed_separation(-1)
            .with_maximum_separation(-1)
            .with_minimum_score(-5)
            .with_separation_factor(-1.0);

        assert_eq!(config, NucmerConfig::default());
        assert_ne!(config.clone().with_break_length(10), NucmerConfig::default());

        let config = config.with_separation_factor(-0.5);
        assert_eq!(config.separation_factor(), -0.5);
    }

    #[test]
    fn test_query_unique_matches() {
        let reference = dna("r", "TTTTTGATTACAGGCCCCC");
        let query = dna("q", "AAGATTACAGGAAAAGATTACAGGAA");
        let config = NucmerConfig::default()
            .with_length_of_mum(6)
            .with_fixed_separation(0)
            .with_minimum_score(2);

        let aligner = NucmerAligner::new(config.clone());
        assert_eq!(aligner.config().match_uniqueness(), MatchUniqueness::MumReference);
        assert_eq!(aligner.align(&reference, &query).unwrap().len(), 1);

        let aligner = NucmerAligner::new(config.with_match_uniqueness(MatchUniqueness::Mum));
        assert!(aligner.align(&reference, &query).unwrap().is_empty());
    }

    #[test]
    fn test_max_match_uses_repeated_matches() {
        let reference = dna("r", "GATTACAGGTTTTTTTGATTACAGG");
        let query = dna("q", "CCGATTACAGGCC");
        let config = NucmerConfig::default()
            .with_length_of_mum(6)
            .with_minimum_score(2)
            .with_extension(false);

        let aligner = NucmerAligner::new(config.clone());
        assert!(aligner.align(&reference, &query).unwrap().is_empty());

        let aligner = NucmerAligner::new(config.with_match_uniqueness(MatchUniqueness::MaxMatch));
        let result = aligner.align(&reference, &query).unwrap();
        assert_eq!(result.len(), 1);

        let offsets: Vec<(usize, usize)> = result[0].iter()
            .map(|block| (block.first_offset, block.second_offset))
            .collect();
        assert_eq!(offsets, vec![(0, 2), (16, 2)]);
        assert!(result[0].iter().all(|block| block.first_sequence.symbols() == b"GATTACAGG"));
    }

    #[test]
    fn test_no_extension() {
        let reference = dna("r", "TTTTTACGTACAGCATGGGGG");
        let query = dna("q", "AAAAAACGTACTGCATCCCCC");
        let config = small_config().with_length_of_mum(5);

        let extended = NucmerAligner::new(config.clone()).align(&reference, &query).unwrap();
        let block = &extended[0].aligned_sequences()[0];
        assert_eq!(block.first_sequence.symbols(), b"ACGTACAGCAT");
        assert_eq!(block.second_sequence.symbols(), b"ACGTACTGCAT");

        let aligner = NucmerAligner::new(config.with_extension(false));
        assert!(!aligner.config().extend());

        let result = aligner.align(&reference, &query).unwrap();
        let block = &result[0].aligned_sequences()[0];
        assert_eq!(block.first_sequence.symbols(), b"ACGTAC");
        assert_eq!((block.first_offset, block.second_offset), (5, 5));
    }

    #[test]
    fn test_query_strands() {
        let queries = vec![dna("q1", "AACGTTG"), dna("q2", "ggatc")];

        let reverse = query_strands(queries.clone(), QueryStrand::Reverse);
        assert_eq!(reverse, vec![dna("q1 Reverse", "CAACGTT"), dna("q2 Reverse", "gatcc")]);

        let both = query_strands(queries.clone(), QueryStrand::Both);
        let ids: Vec<&str> = both.iter().map(|s| s.id()).collect();
        assert_eq!(ids, vec!["q1", "q1 Reverse", "q2", "q2 Reverse"]);

        assert_eq!(query_strands(queries.clone(), QueryStrand::Forward), queries);

        let protein = vec![Sequence::new("p", Alphabet::Protein, "MKV")];
        assert!(query_strands(protein.clone(), QueryStrand::Reverse).is_empty());
        assert_eq!(query_strands(protein.clone(), QueryStrand::Both), protein);
    }

    #[test]
    fn test_reverse_strand_alignment() {
        let reference = dna("r", "TTGACCGATAGGCATTACGGATCCAGTAGCA");
        let query = dna("q", "TGCCTATCGGTCAA");
        let queries = query_strands(vec![query], QueryStrand::Both);

        let aligner = NucmerAligner::new(small_config().with_length_of_mum(8));
        let result = aligner.align_many(std::slice::from_ref(&reference), &queries).unwrap();

        assert_eq!(result.len(), 1);
        assert_eq!(result[0].second_sequence().id(), "q Reverse");

        let block = &result[0].aligned_sequences()[0];
        assert_eq!(block.first_sequence.symbols(), b"TTGACCGATAGGCA");
        assert_eq!((block.first_offset, block.second_offset), (0, 0));
    }
}
