use crate::aligner::scoring::GapCosts;

/// Linear gap costs: every gap column costs the same.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct GapLinear {
    cost_gap: i32,
}

impl GapLinear {
    pub fn new(cost_gap: i32) -> Self {
        Self { cost_gap }
    }
}

impl GapCosts for GapLinear {
    #[inline(always)]
    fn gap_open(&self) -> i32 {
        self.cost_gap
    }

    #[inline(always)]
    fn gap_extend(&self) -> i32 {
        self.cost_gap
    }

    #[inline(always)]
    fn is_affine(&self) -> bool {
        false
    }
}
