use tracing::{debug, span, Level};

use crate::alignment::{PairwiseAlignedSequence, PairwiseSequenceAlignment};
use crate::aligner::config::{affine_costs, linear_costs};
use crate::aligner::scoring::{GapCosts, SimilarityMatrix};
use crate::errors::{AlignError, SequenceSide};
use crate::sequence::Sequence;

pub mod config;
pub mod scoring;
pub mod utils;
pub(crate) mod dp;
pub(crate) mod mode;

pub use config::{AlignerConfig, AlignerConfigBuilder};
pub use mode::AlignmentMode;
pub use utils::AlignedPair;

/// Common interface of the pairwise aligners.
///
/// Every call returns an ordered list of alignments, which may be empty. The `simple`
/// variants use linear gap costs, the others affine gap costs.
pub trait SequenceAligner {
    fn name(&self) -> &'static str;

    fn description(&self) -> &'static str;

    fn align_simple<'a>(
        &self,
        first: &'a Sequence,
        second: &'a Sequence,
    ) -> Result<Vec<PairwiseSequenceAlignment<'a>>, AlignError>;

    fn align<'a>(
        &self,
        first: &'a Sequence,
        second: &'a Sequence,
    ) -> Result<Vec<PairwiseSequenceAlignment<'a>>, AlignError>;

    fn align_list_simple<'a>(
        &self,
        sequences: &'a [Sequence],
    ) -> Result<Vec<PairwiseSequenceAlignment<'a>>, AlignError>;

    fn align_list<'a>(
        &self,
        sequences: &'a [Sequence],
    ) -> Result<Vec<PairwiseSequenceAlignment<'a>>, AlignError>;
}

/// Check that neither sequence is empty and that every symbol has a score in the matrix.
pub(crate) fn validate_pair(
    matrix: &SimilarityMatrix,
    first: &Sequence,
    second: &Sequence,
) -> Result<(), AlignError> {
    for (side, seq) in [(SequenceSide::First, first), (SequenceSide::Second, second)] {
        if seq.is_empty() {
            return Err(AlignError::EmptySequence(side));
        }

        if let Some((position, symbol)) = matrix.validate(seq.symbols()) {
            return Err(AlignError::SymbolNotInMatrix { side, symbol, position });
        }
    }

    Ok(())
}

fn expect_pair(sequences: &[Sequence]) -> Result<(&Sequence, &Sequence), AlignError> {
    match sequences {
        [first, second] => Ok((first, second)),
        _ => Err(AlignError::WrongSequenceCount { expected: "exactly 2", actual: sequences.len() }),
    }
}

/// Dynamic programming aligner. The alignment mode selects Needleman-Wunsch (global),
/// Smith-Waterman (local) or overlap (semi-global) alignment.
///
/// Two aligners compare equal when they use the same mode and configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PairwiseAligner {
    mode: AlignmentMode,
    config: AlignerConfig,
}

impl PairwiseAligner {
    pub fn new(mode: AlignmentMode, config: AlignerConfig) -> Self {
        Self { mode, config }
    }

    pub fn needleman_wunsch(config: AlignerConfig) -> Self {
        Self::new(AlignmentMode::Global, config)
    }

    pub fn smith_waterman(config: AlignerConfig) -> Self {
        Self::new(AlignmentMode::Local, config)
    }

    pub fn pairwise_overlap(config: AlignerConfig) -> Self {
        Self::new(AlignmentMode::Overlap, config)
    }

    pub fn mode(&self) -> AlignmentMode {
        self.mode
    }

    pub fn config(&self) -> &AlignerConfig {
        &self.config
    }

    /// Linear gap alignment with the given scoring, independent of the configuration of
    /// this aligner.
    pub fn align_simple_with<'a>(
        &self,
        matrix: &SimilarityMatrix,
        gap_open_cost: i32,
        first: &'a Sequence,
        second: &'a Sequence,
    ) -> Result<Vec<PairwiseSequenceAlignment<'a>>, AlignError> {
        let costs = linear_costs(gap_open_cost)?;

        self.run(matrix, costs, first, second)
    }

    /// Affine gap alignment with the given scoring, independent of the configuration of
    /// this aligner.
    pub fn align_with<'a>(
        &self,
        matrix: &SimilarityMatrix,
        gap_open_cost: i32,
        gap_extension_cost: i32,
        first: &'a Sequence,
        second: &'a Sequence,
    ) -> Result<Vec<PairwiseSequenceAlignment<'a>>, AlignError> {
        let costs = affine_costs(gap_open_cost, gap_extension_cost)?;

        self.run(matrix, costs, first, second)
    }

    fn run<'a, G: GapCosts>(
        &self,
        matrix: &SimilarityMatrix,
        costs: G,
        first: &'a Sequence,
        second: &'a Sequence,
    ) -> Result<Vec<PairwiseSequenceAlignment<'a>>, AlignError> {
        validate_pair(matrix, first, second)?;

        let span = span!(
            Level::INFO,
            "pairwise_align",
            mode = ?self.mode,
            affine = costs.is_affine()
        );
        let _enter = span.enter();

        let result = dp::align(
            first.symbols(),
            second.symbols(),
            matrix,
            costs,
            self.mode.fill_rules(),
        );

        debug!(
            score = result.score,
            first_id = first.id(),
            second_id = second.id(),
            first_offset = result.first_range.start,
            second_offset = result.second_range.start,
            columns = result.pairs.len(),
            "aligned"
        );

        let aligned = PairwiseAlignedSequence::from_pairs(
            first,
            second,
            matrix,
            &result.pairs,
            result.score,
            result.first_range,
            result.second_range,
        );

        Ok(vec![PairwiseSequenceAlignment::with_aligned_sequences(first, second, vec![aligned])])
    }
}

impl SequenceAligner for PairwiseAligner {
    fn name(&self) -> &'static str {
        self.mode.name()
    }

    fn description(&self) -> &'static str {
        self.mode.description()
    }

    fn align_simple<'a>(
        &self,
        first: &'a Sequence,
        second: &'a Sequence,
    ) -> Result<Vec<PairwiseSequenceAlignment<'a>>, AlignError> {
        let costs = self.config.linear_costs()?;

        self.run(self.config.similarity_matrix(), costs, first, second)
    }

    fn align<'a>(
        &self,
        first: &'a Sequence,
        second: &'a Sequence,
    ) -> Result<Vec<PairwiseSequenceAlignment<'a>>, AlignError> {
        let costs = self.config.affine_costs()?;

        self.run(self.config.similarity_matrix(), costs, first, second)
    }

    fn align_list_simple<'a>(
        &self,
        sequences: &'a [Sequence],
    ) -> Result<Vec<PairwiseSequenceAlignment<'a>>, AlignError> {
        let (first, second) = expect_pair(sequences)?;

        self.align_simple(first, second)
    }

    fn align_list<'a>(
        &self,
        sequences: &'a [Sequence],
    ) -> Result<Vec<PairwiseSequenceAlignment<'a>>, AlignError> {
        let (first, second) = expect_pair(sequences)?;

        self.align(first, second)
    }
}
