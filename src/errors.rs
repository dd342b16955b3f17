use std::error::Error;
use std::fmt::{Display, Formatter};
use std::io;

/// Identifies which of the two sequences of a pairwise alignment an error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SequenceSide {
    First,
    Second,
}

impl Display for SequenceSide {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::First => write!(f, "first"),
            Self::Second => write!(f, "second"),
        }
    }
}

#[derive(Debug)]
pub enum AlignError {
    /// The aligner configuration has no similarity matrix
    MissingSimilarityMatrix,

    /// The aligner configuration has no gap open cost
    MissingGapOpenCost,

    /// Affine alignment was requested but no gap extension cost is configured
    MissingGapExtensionCost,

    /// Gap costs must be non-positive, and opening a gap may not be cheaper than extending one
    InvalidGapCost { gap_open: i32, gap_extend: Option<i32> },

    /// The minimum MUM length must be at least one
    InvalidLengthOfMum(usize),

    /// An input sequence has no symbols
    EmptySequence(SequenceSide),

    /// A sequence contains a symbol for which the similarity matrix has no score
    SymbolNotInMatrix { side: SequenceSide, symbol: u8, position: usize },

    /// A symbol pair was looked up that the similarity matrix does not define
    UnknownSymbolPair(u8, u8),

    /// The number of sequences passed to a list alignment call is not supported
    WrongSequenceCount { expected: &'static str, actual: usize },

    /// A reference sequence contains the byte reserved as suffix array sentinel
    InvalidReferenceSymbol { position: usize },

    /// A range operation on a sequence was out of bounds
    IndexOutOfRange { start: usize, count: usize, length: usize },

    /// The similarity matrix text could not be parsed
    MatrixFormat { line: usize, reason: String },

    /// Error variant when we couldn't read from a file
    FileReadError { source: io::Error },

    /// Other IO errors
    IOError(io::Error),
}

impl Error for AlignError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match *self {
            Self::FileReadError { ref source } => Some(source),
            Self::IOError(ref source) => Some(source),
            _ => None,
        }
    }
}

impl From<io::Error> for AlignError {
    fn from(value: io::Error) -> Self {
        Self::IOError(value)
    }
}

impl Display for AlignError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match *self {
            Self::MissingSimilarityMatrix =>
                write!(f, "No similarity matrix configured!"),
            Self::MissingGapOpenCost =>
                write!(f, "No gap open cost configured!"),
            Self::MissingGapExtensionCost =>
                write!(f, "Affine gap alignment requested, but no gap extension cost configured!"),
            Self::InvalidGapCost { gap_open, gap_extend: Some(gap_extend) } =>
                write!(
                    f,
                    "Invalid gap costs (open: {gap_open}, extend: {gap_extend}). Costs must be \
                     non-positive, with the open cost negative and not larger than the \
                     extension cost."
                ),
            Self::InvalidGapCost { gap_open, gap_extend: None } =>
                write!(f, "Invalid gap open cost ({gap_open}). The open cost must be negative."),
            Self::InvalidLengthOfMum(len) =>
                write!(f, "Invalid minimum MUM length ({len}), should be at least 1."),
            Self::EmptySequence(side) =>
                write!(f, "The {side} sequence is empty!"),
            Self::SymbolNotInMatrix { side, symbol, position } =>
                write!(
                    f,
                    "Symbol '{}' at position {position} of the {side} sequence is not supported \
                     by the similarity matrix.",
                    symbol.escape_ascii()
                ),
            Self::UnknownSymbolPair(a, b) =>
                write!(
                    f,
                    "The similarity matrix has no score for the pair ('{}', '{}').",
                    a.escape_ascii(),
                    b.escape_ascii()
                ),
            Self::WrongSequenceCount { expected, actual } =>
                write!(f, "Expected {expected} sequences, got {actual}."),
            Self::InvalidReferenceSymbol { position } =>
                write!(f, "Reference sequence contains a reserved symbol at position {position}."),
            Self::IndexOutOfRange { start, count, length } =>
                write!(
                    f,
                    "Range starting at {start} with {count} symbols is out of bounds for \
                     length {length}."
                ),
            Self::MatrixFormat { line, ref reason } =>
                write!(f, "Invalid similarity matrix (line {line}): {reason}"),
            Self::FileReadError { source: _ } =>
                write!(f, "Could not read from file!"),
            Self::IOError(ref err) =>
                err.fmt(f),
        }
    }
}
