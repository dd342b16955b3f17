use serde::Serialize;

use crate::aligner::scoring::{GapAffine, GapLinear, SimilarityMatrix};
use crate::errors::AlignError;

pub const DEFAULT_GAP_OPEN_COST: i32 = -8;
pub const DEFAULT_GAP_EXTENSION_COST: i32 = -1;

/// Scoring configuration shared by the dynamic programming aligners.
///
/// The configuration is immutable; use [`AlignerConfig::builder`] or the `with_*` methods
/// to derive new configurations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AlignerConfig {
    similarity_matrix: SimilarityMatrix,
    gap_open_cost: i32,
    gap_extension_cost: Option<i32>,
}

impl AlignerConfig {
    /// Configuration for linear gap costs. Affine alignment additionally requires a gap
    /// extension cost, see [`AlignerConfig::with_gap_extension_cost`].
    pub fn new(similarity_matrix: SimilarityMatrix, gap_open_cost: i32) -> Self {
        Self {
            similarity_matrix,
            gap_open_cost,
            gap_extension_cost: None,
        }
    }

    pub fn builder() -> AlignerConfigBuilder {
        AlignerConfigBuilder::default()
    }

    pub fn with_similarity_matrix(self, similarity_matrix: SimilarityMatrix) -> Self {
        Self { similarity_matrix, ..self }
    }

    pub fn with_gap_open_cost(self, gap_open_cost: i32) -> Self {
        Self { gap_open_cost, ..self }
    }

    pub fn with_gap_extension_cost(self, gap_extension_cost: i32) -> Self {
        Self { gap_extension_cost: Some(gap_extension_cost), ..self }
    }

    #[inline]
    pub fn similarity_matrix(&self) -> &SimilarityMatrix {
        &self.similarity_matrix
    }

    #[inline]
    pub fn gap_open_cost(&self) -> i32 {
        self.gap_open_cost
    }

    #[inline]
    pub fn gap_extension_cost(&self) -> Option<i32> {
        self.gap_extension_cost
    }

    pub fn linear_costs(&self) -> Result<GapLinear, AlignError> {
        linear_costs(self.gap_open_cost)
    }

    pub fn affine_costs(&self) -> Result<GapAffine, AlignError> {
        let gap_extend = self.gap_extension_cost
            .ok_or(AlignError::MissingGapExtensionCost)?;

        affine_costs(self.gap_open_cost, gap_extend)
    }
}

impl Default for AlignerConfig {
    fn default() -> Self {
        Self {
            similarity_matrix: SimilarityMatrix::default(),
            gap_open_cost: DEFAULT_GAP_OPEN_COST,
            gap_extension_cost: Some(DEFAULT_GAP_EXTENSION_COST),
        }
    }
}

/// Validate a linear gap cost. Opening a gap must be penalized.
pub fn linear_costs(gap_open: i32) -> Result<GapLinear, AlignError> {
    if gap_open >= 0 {
        return Err(AlignError::InvalidGapCost { gap_open, gap_extend: None });
    }

    Ok(GapLinear::new(gap_open))
}

/// Validate affine gap costs: the open cost is negative, the extension cost non-positive,
/// and opening a gap is at least as expensive as extending one.
pub fn affine_costs(gap_open: i32, gap_extend: i32) -> Result<GapAffine, AlignError> {
    if gap_open >= 0 || gap_extend > 0 || gap_open > gap_extend {
        return Err(AlignError::InvalidGapCost { gap_open, gap_extend: Some(gap_extend) });
    }

    Ok(GapAffine::new(gap_open, gap_extend))
}

/// Step-by-step construction of an [`AlignerConfig`]. Unlike [`AlignerConfig::default`],
/// the builder starts without a similarity matrix and gap open cost.
#[derive(Debug, Clone, Default)]
pub struct AlignerConfigBuilder {
    similarity_matrix: Option<SimilarityMatrix>,
    gap_open_cost: Option<i32>,
    gap_extension_cost: Option<i32>,
}

impl AlignerConfigBuilder {
    pub fn similarity_matrix(mut self, similarity_matrix: SimilarityMatrix) -> Self {
        self.similarity_matrix = Some(similarity_matrix);
        self
    }

    pub fn gap_open_cost(mut self, gap_open_cost: i32) -> Self {
        self.gap_open_cost = Some(gap_open_cost);
        self
    }

    pub fn gap_extension_cost(mut self, gap_extension_cost: i32) -> Self {
        self.gap_extension_cost = Some(gap_extension_cost);
        self
    }

    pub fn build(self) -> Result<AlignerConfig, AlignError> {
        let similarity_matrix = self.similarity_matrix
            .ok_or(AlignError::MissingSimilarityMatrix)?;
        let gap_open_cost = self.gap_open_cost
            .ok_or(AlignError::MissingGapOpenCost)?;

        match self.gap_extension_cost {
            Some(gap_extend) => { affine_costs(gap_open_cost, gap_extend)?; },
            None => { linear_costs(gap_open_cost)?; },
        }

        Ok(AlignerConfig {
            similarity_matrix,
            gap_open_cost,
            gap_extension_cost: self.gap_extension_cost,
        })
    }
}
