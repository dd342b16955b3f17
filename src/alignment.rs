//! Alignment results.

use std::fmt::{Display, Formatter};
use std::ops::Range;
use std::slice;

use serde::{Serialize, Serializer};

use crate::aligner::scoring::SimilarityMatrix;
use crate::aligner::utils::{print_alignment, AlignedPair};
use crate::sequence::Sequence;

/// Statistics gathered while building an aligned sequence pair.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AlignmentMetadata {
    /// Exclusive end of the aligned region in the first input sequence
    pub first_end: usize,

    /// Exclusive end of the aligned region in the second input sequence
    pub second_end: usize,

    /// Number of gap symbols inserted into the first sequence
    pub first_gaps: usize,

    /// Number of gap symbols inserted into the second sequence
    pub second_gaps: usize,

    /// Number of columns with identical symbols
    pub identical_count: usize,

    /// Number of columns with identical symbols or a positive substitution score
    pub similarity_count: usize,
}

/// One aligned region of two sequences.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PairwiseAlignedSequence {
    /// Aligned first sequence, padded with gaps to the alignment length
    pub first_sequence: Sequence,

    /// Aligned second sequence, padded with gaps to the alignment length
    pub second_sequence: Sequence,

    pub consensus: Option<Sequence>,

    pub score: i64,

    /// Start of the aligned region in the first input sequence
    pub first_offset: usize,

    /// Start of the aligned region in the second input sequence
    pub second_offset: usize,

    pub metadata: AlignmentMetadata,
}

impl PairwiseAlignedSequence {
    pub fn new(
        first_sequence: Sequence,
        second_sequence: Sequence,
        score: i64,
        first_offset: usize,
        second_offset: usize,
    ) -> Self {
        Self {
            first_sequence,
            second_sequence,
            consensus: None,
            score,
            first_offset,
            second_offset,
            metadata: AlignmentMetadata::default(),
        }
    }

    /// Build the gapped sequences, consensus and statistics from aligned positions in
    /// `first` and `second`.
    pub(crate) fn from_pairs(
        first: &Sequence,
        second: &Sequence,
        matrix: &SimilarityMatrix,
        pairs: &[AlignedPair],
        score: i64,
        first_range: Range<usize>,
        second_range: Range<usize>,
    ) -> Self {
        let gap = first.alphabet().gap_symbol();
        let first_symbols = first.symbols();
        let second_symbols = second.symbols();

        let mut first_aligned = Vec::with_capacity(pairs.len());
        let mut second_aligned = Vec::with_capacity(pairs.len());
        let mut metadata = AlignmentMetadata {
            first_end: first_range.end,
            second_end: second_range.end,
            ..AlignmentMetadata::default()
        };

        for pair in pairs {
            match (pair.first_pos(), pair.second_pos()) {
                (Some(i), Some(j)) => {
                    let (a, b) = (first_symbols[i], second_symbols[j]);
                    first_aligned.push(a);
                    second_aligned.push(b);

                    let identical = a.eq_ignore_ascii_case(&b);
                    if identical {
                        metadata.identical_count += 1;
                    }

                    if identical || matrix.score(a, b) > 0 {
                        metadata.similarity_count += 1;
                    }
                },
                (Some(i), None) => {
                    first_aligned.push(first_symbols[i]);
                    second_aligned.push(gap);
                    metadata.second_gaps += 1;
                },
                (None, Some(j)) => {
                    first_aligned.push(gap);
                    second_aligned.push(second_symbols[j]);
                    metadata.first_gaps += 1;
                },
                (None, None) => (),
            }
        }

        let mut aligned = Self {
            first_sequence: Sequence::new(first.id(), first.alphabet(), first_aligned),
            second_sequence: Sequence::new(second.id(), second.alphabet(), second_aligned),
            consensus: None,
            score,
            first_offset: first_range.start,
            second_offset: second_range.start,
            metadata,
        };
        aligned.consensus = Some(aligned.resolve_consensus());

        aligned
    }

    /// Number of alignment columns
    pub fn len(&self) -> usize {
        self.first_sequence.len()
    }

    pub fn is_empty(&self) -> bool {
        self.first_sequence.is_empty()
    }

    /// Compute the consensus of the aligned pair, column by column.
    pub fn resolve_consensus(&self) -> Sequence {
        let alphabet = self.first_sequence.alphabet();
        let symbols: Vec<u8> = self.first_sequence.symbols().iter()
            .zip(self.second_sequence.symbols())
            .map(|(&a, &b)| alphabet.consensus(a, b))
            .collect();

        Sequence::new("Consensus", alphabet, symbols)
    }

    /// The consensus sequence, computed on first access if not yet available.
    pub fn consensus_or_resolve(&mut self) -> &Sequence {
        let consensus = match self.consensus.take() {
            Some(consensus) => consensus,
            None => self.resolve_consensus(),
        };

        self.consensus.insert(consensus)
    }
}

impl Display for PairwiseAlignedSequence {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let gap = self.first_sequence.alphabet().gap_symbol();

        let rendered = print_alignment(
            self.first_sequence.symbols(),
            self.second_sequence.symbols(),
            gap,
        );

        write!(f, "{rendered}")
    }
}

fn serialize_id<S>(sequence: &&Sequence, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(sequence.id())
}

/// All aligned regions found for one pair of input sequences.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PairwiseSequenceAlignment<'a> {
    #[serde(rename = "first_id", serialize_with = "serialize_id")]
    first_sequence: &'a Sequence,

    #[serde(rename = "second_id", serialize_with = "serialize_id")]
    second_sequence: &'a Sequence,

    aligned_sequences: Vec<PairwiseAlignedSequence>,
}

impl<'a> PairwiseSequenceAlignment<'a> {
    pub fn new(first_sequence: &'a Sequence, second_sequence: &'a Sequence) -> Self {
        Self {
            first_sequence,
            second_sequence,
            aligned_sequences: Vec::new(),
        }
    }

    pub fn with_aligned_sequences(
        first_sequence: &'a Sequence,
        second_sequence: &'a Sequence,
        aligned_sequences: Vec<PairwiseAlignedSequence>,
    ) -> Self {
        Self { first_sequence, second_sequence, aligned_sequences }
    }

    pub fn first_sequence(&self) -> &'a Sequence {
        self.first_sequence
    }

    pub fn second_sequence(&self) -> &'a Sequence {
        self.second_sequence
    }

    pub fn aligned_sequences(&self) -> &[PairwiseAlignedSequence] {
        &self.aligned_sequences
    }

    pub fn push(&mut self, aligned: PairwiseAlignedSequence) {
        self.aligned_sequences.push(aligned);
    }

    pub fn len(&self) -> usize {
        self.aligned_sequences.len()
    }

    pub fn is_empty(&self) -> bool {
        self.aligned_sequences.is_empty()
    }

    pub fn iter(&self) -> slice::Iter<'_, PairwiseAlignedSequence> {
        self.aligned_sequences.iter()
    }
}

impl<'b> IntoIterator for &'b PairwiseSequenceAlignment<'_> {
    type Item = &'b PairwiseAlignedSequence;
    type IntoIter = slice::Iter<'b, PairwiseAlignedSequence>;

    fn into_iter(self) -> Self::IntoIter {
        self.aligned_sequences.iter()
    }
}
