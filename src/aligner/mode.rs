use serde::Serialize;

/// Enum representing the kind of alignment to perform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum AlignmentMode {
    /// Needleman-Wunsch: both sequences are consumed end-to-end.
    Global,

    /// Smith-Waterman: the best scoring pair of substrings, scores restart at zero.
    Local,

    /// Semi-global: leading and trailing gaps are free, the alignment runs up to the end
    /// of at least one sequence.
    Overlap,
}

/// Cell at which traceback starts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TracebackStart {
    /// Bottom-right cell `(n, m)`
    LastCell,

    /// Highest scoring cell anywhere in the matrix, if its score is positive
    BestCell,

    /// Highest scoring cell on the last row or last column
    BestOnLastRowOrColumn,
}

/// Boundary conditions, clamping and traceback start used to fill a DP matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct FillRules {
    /// Row 0 and column 0 are zero instead of cumulative gap costs
    pub free_boundary: bool,

    /// Cell scores below zero restart the alignment
    pub clamp_to_zero: bool,

    pub start: TracebackStart,
}

impl FillRules {
    /// Global boundaries, traceback from the best cell anywhere. Used to extend an
    /// alignment from a fixed starting point as far as it scores positively.
    pub(crate) const EXTENSION: FillRules = FillRules {
        free_boundary: false,
        clamp_to_zero: false,
        start: TracebackStart::BestCell,
    };
}

impl AlignmentMode {
    pub(crate) fn fill_rules(&self) -> FillRules {
        match self {
            Self::Global => FillRules {
                free_boundary: false,
                clamp_to_zero: false,
                start: TracebackStart::LastCell,
            },
            Self::Local => FillRules {
                free_boundary: true,
                clamp_to_zero: true,
                start: TracebackStart::BestCell,
            },
            Self::Overlap => FillRules {
                free_boundary: true,
                clamp_to_zero: false,
                start: TracebackStart::BestOnLastRowOrColumn,
            },
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Global => "Needleman-Wunsch",
            Self::Local => "Smith-Waterman",
            Self::Overlap => "Pairwise Overlap",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::Global => "Global alignment consuming both sequences end-to-end",
            Self::Local => "Local alignment of the highest scoring pair of substrings",
            Self::Overlap => "Semi-global alignment without end gap penalties",
        }
    }
}
