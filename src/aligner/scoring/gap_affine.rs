use crate::aligner::scoring::GapCosts;

/// Affine gap costs: opening a gap costs `cost_gap_open`, each further gap column
/// costs `cost_gap_extend`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GapAffine {
    cost_gap_open: i32,
    cost_gap_extend: i32,
}

impl GapAffine {
    pub fn new(cost_gap_open: i32, cost_gap_extend: i32) -> Self {
        Self { cost_gap_open, cost_gap_extend }
    }
}

impl GapCosts for GapAffine {
    #[inline(always)]
    fn gap_open(&self) -> i32 {
        self.cost_gap_open
    }

    #[inline(always)]
    fn gap_extend(&self) -> i32 {
        self.cost_gap_extend
    }

    #[inline(always)]
    fn is_affine(&self) -> bool {
        true
    }
}
