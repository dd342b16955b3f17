pub mod errors;
pub mod sequence;
pub mod aligner;
pub mod alignment;
pub mod nucmer;
pub mod io;

pub use aligner::{AlignerConfig, AlignmentMode, PairwiseAligner, SequenceAligner};
pub use alignment::{PairwiseAlignedSequence, PairwiseSequenceAlignment};
pub use nucmer::{NucmerAligner, NucmerConfig};
pub use sequence::{Alphabet, Sequence};
