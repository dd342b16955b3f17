pub mod gap_linear;
pub mod gap_affine;
pub mod matrix;

pub use gap_affine::GapAffine;
pub use gap_linear::GapLinear;
pub use matrix::{MoleculeType, SimilarityMatrix, StandardMatrix};

/// Gap penalty model used during matrix fill. Costs are non-positive scores that are
/// added to the alignment score.
pub trait GapCosts: Copy {
    fn gap_open(&self) -> i32;

    fn gap_extend(&self) -> i32;

    /// Whether opening and extending a gap are scored differently, requiring the
    /// three-matrix formulation.
    fn is_affine(&self) -> bool;

    /// Total score of a gap of the given length: `open + (length - 1) * extend`
    #[inline]
    fn gap_cost(&self, length: usize) -> i64 {
        if length == 0 {
            return 0;
        }

        self.gap_open() as i64 + (length as i64 - 1) * self.gap_extend() as i64
    }
}
