//! Dynamic programming matrix fill and traceback.
//!
//! Rows index the first sequence and columns the second. Scores are kept in rolling rows
//! of `i64`, while traceback pointers are stored for the whole matrix. Linear gap costs
//! use a single matrix; affine gap costs use the three-matrix (M, Ix, Iy) formulation.
//!
//! Ties are always resolved in the order diagonal > up > left. For affine gaps, extending
//! an existing gap is preferred over opening a new one on equal scores.

use std::mem;
use std::ops::Range;

use tracing::trace;

use crate::aligner::mode::{FillRules, TracebackStart};
use crate::aligner::scoring::{GapCosts, SimilarityMatrix};
use crate::aligner::utils::AlignedPair;

/// Score representing an unreachable cell. Leaves enough headroom to add gap and
/// substitution scores without overflowing.
pub(crate) const NEG_INF: i64 = i64::MIN / 4;

const STOP: u8 = 0;
const DIAGONAL: u8 = 1;
const UP: u8 = 2;
const LEFT: u8 = 3;

// Affine traceback cells pack the predecessor of M in the two lowest bits, followed by
// one bit per gap matrix indicating the gap was extended rather than opened.
const FROM_START: u8 = 0;
const FROM_M: u8 = 1;
const FROM_IX: u8 = 2;
const FROM_IY: u8 = 3;
const PRED_MASK: u8 = 0b0011;
const IX_EXTEND: u8 = 0b0100;
const IY_EXTEND: u8 = 0b1000;

/// Matrix a cell score belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum DpState {
    /// Substitution (M)
    Match,

    /// Gap in the second sequence (Ix), an "up" move
    GapInSecond,

    /// Gap in the first sequence (Iy), a "left" move
    GapInFirst,
}

#[derive(Debug, Clone, Copy)]
struct StartCell {
    row: usize,
    col: usize,
    score: i64,
    state: DpState,
}

/// Keeps track of the traceback start candidate during matrix fill. Cells are observed in
/// row-major order, so a strictly better score is required to replace the current
/// candidate, resolving ties by lowest row, then lowest column.
struct StartTracker {
    start: TracebackStart,
    last_row: usize,
    last_col: usize,
    best: Option<StartCell>,
}

impl StartTracker {
    fn new(start: TracebackStart, last_row: usize, last_col: usize) -> Self {
        let best = match start {
            // The empty overlap at the top right corner
            TracebackStart::BestOnLastRowOrColumn => Some(StartCell {
                row: 0,
                col: last_col,
                score: 0,
                state: DpState::Match,
            }),
            _ => None,
        };

        Self { start, last_row, last_col, best }
    }

    #[inline(always)]
    fn observe(&mut self, row: usize, col: usize, score: i64, state: DpState) {
        let candidate = match self.start {
            TracebackStart::LastCell => false,
            TracebackStart::BestCell => true,
            TracebackStart::BestOnLastRowOrColumn => row == self.last_row || col == self.last_col,
        };

        if candidate && self.best.map_or(true, |best| score > best.score) {
            self.best = Some(StartCell { row, col, score, state });
        }
    }

    fn finish(self, last_cell: StartCell) -> Option<StartCell> {
        match self.start {
            TracebackStart::LastCell => Some(last_cell),
            TracebackStart::BestCell => self.best.filter(|cell| cell.score > 0),
            TracebackStart::BestOnLastRowOrColumn => self.best,
        }
    }
}

/// Result of matrix fill and traceback, positions relative to the aligned slices.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct DpAlignment {
    pub score: i64,
    pub pairs: Vec<AlignedPair>,
    pub first_range: Range<usize>,
    pub second_range: Range<usize>,
}

impl DpAlignment {
    fn empty() -> Self {
        Self {
            score: 0,
            pairs: Vec::new(),
            first_range: 0..0,
            second_range: 0..0,
        }
    }
}

/// Align two symbol slices. Inputs must have been validated against the similarity
/// matrix; empty inputs are allowed.
pub(crate) fn align<G: GapCosts>(
    first: &[u8],
    second: &[u8],
    matrix: &SimilarityMatrix,
    costs: G,
    rules: FillRules,
) -> DpAlignment {
    let result = if costs.is_affine() {
        AffineMatrix::fill(first, second, matrix, costs, rules).traceback()
    } else {
        LinearMatrix::fill(first, second, matrix, costs, rules).traceback()
    };

    trace!(
        score = result.score,
        first = ?result.first_range,
        second = ?result.second_range,
        "dp traceback"
    );

    result
}

#[inline(always)]
fn best_state(m: i64, ix: i64, iy: i64) -> (i64, DpState) {
    if m >= ix && m >= iy {
        (m, DpState::Match)
    } else if ix >= iy {
        (ix, DpState::GapInSecond)
    } else {
        (iy, DpState::GapInFirst)
    }
}

struct LinearMatrix {
    cols: usize,
    trace: Vec<u8>,
    start: Option<StartCell>,
}

impl LinearMatrix {
    fn fill<G: GapCosts>(
        first: &[u8],
        second: &[u8],
        matrix: &SimilarityMatrix,
        costs: G,
        rules: FillRules,
    ) -> Self {
        let (rows, cols) = (first.len() + 1, second.len() + 1);
        let gap = costs.gap_open() as i64;

        let mut trace = vec![STOP; rows * cols];
        let mut prev = vec![0i64; cols];
        let mut curr = vec![0i64; cols];
        let mut tracker = StartTracker::new(rules.start, first.len(), second.len());

        if !rules.free_boundary {
            for (j, cell) in prev.iter_mut().enumerate().skip(1) {
                *cell = costs.gap_cost(j);
                trace[j] = LEFT;
            }
        }

        for i in 1..rows {
            let a = first[i - 1];
            let row_offset = i * cols;

            if rules.free_boundary {
                curr[0] = 0;
            } else {
                curr[0] = costs.gap_cost(i);
                trace[row_offset] = UP;
            }

            for j in 1..cols {
                let diagonal = prev[j - 1] + matrix.score(a, second[j - 1]) as i64;
                let up = prev[j] + gap;
                let left = curr[j - 1] + gap;

                let (mut score, mut direction) = if diagonal >= up && diagonal >= left {
                    (diagonal, DIAGONAL)
                } else if up >= left {
                    (up, UP)
                } else {
                    (left, LEFT)
                };

                if rules.clamp_to_zero && score <= 0 {
                    score = 0;
                    direction = STOP;
                }

                curr[j] = score;
                trace[row_offset + j] = direction;
                tracker.observe(i, j, score, DpState::Match);
            }

            mem::swap(&mut prev, &mut curr);
        }

        let last_cell = StartCell {
            row: rows - 1,
            col: cols - 1,
            score: prev[cols - 1],
            state: DpState::Match,
        };

        Self { cols, trace, start: tracker.finish(last_cell) }
    }

    fn traceback(&self) -> DpAlignment {
        let Some(start) = self.start else {
            return DpAlignment::empty();
        };

        let (mut i, mut j) = (start.row, start.col);
        let mut pairs = Vec::with_capacity(i + j);

        loop {
            match self.trace[i * self.cols + j] {
                DIAGONAL => {
                    i -= 1;
                    j -= 1;
                    pairs.push(AlignedPair(Some(i), Some(j)));
                },
                UP => {
                    i -= 1;
                    pairs.push(AlignedPair(Some(i), None));
                },
                LEFT => {
                    j -= 1;
                    pairs.push(AlignedPair(None, Some(j)));
                },
                _ => break,
            }
        }

        pairs.reverse();

        DpAlignment {
            score: start.score,
            pairs,
            first_range: i..start.row,
            second_range: j..start.col,
        }
    }
}

struct AffineMatrix {
    cols: usize,
    trace: Vec<u8>,
    start: Option<StartCell>,
}

impl AffineMatrix {
    fn fill<G: GapCosts>(
        first: &[u8],
        second: &[u8],
        matrix: &SimilarityMatrix,
        costs: G,
        rules: FillRules,
    ) -> Self {
        let (rows, cols) = (first.len() + 1, second.len() + 1);
        let open = costs.gap_open() as i64;
        let extend = costs.gap_extend() as i64;

        // M on row 0 and column 0: the alignment may only start there with free boundaries
        let boundary = if rules.free_boundary { 0 } else { NEG_INF };

        let mut trace = vec![FROM_START; rows * cols];
        let mut prev_m = vec![boundary; cols];
        let mut prev_x = vec![NEG_INF; cols];
        let mut prev_y = vec![NEG_INF; cols];
        let mut curr_m = vec![NEG_INF; cols];
        let mut curr_x = vec![NEG_INF; cols];
        let mut curr_y = vec![NEG_INF; cols];
        let mut tracker = StartTracker::new(rules.start, first.len(), second.len());

        prev_m[0] = 0;
        if !rules.free_boundary {
            for j in 1..cols {
                prev_y[j] = costs.gap_cost(j);
                if j > 1 {
                    trace[j] = IY_EXTEND;
                }
            }
        }

        for i in 1..rows {
            let a = first[i - 1];
            let row_offset = i * cols;

            curr_m[0] = boundary;
            curr_y[0] = NEG_INF;
            if rules.free_boundary {
                curr_x[0] = NEG_INF;
            } else {
                curr_x[0] = costs.gap_cost(i);
                if i > 1 {
                    trace[row_offset] = IX_EXTEND;
                }
            }

            for j in 1..cols {
                let (pm, px, py) = (prev_m[j - 1], prev_x[j - 1], prev_y[j - 1]);
                let (mut pred_score, mut pred) = if pm >= px && pm >= py {
                    (pm, FROM_M)
                } else if px >= py {
                    (px, FROM_IX)
                } else {
                    (py, FROM_IY)
                };

                if rules.clamp_to_zero && pred_score <= 0 {
                    pred_score = 0;
                    pred = FROM_START;
                }

                let m = (pred_score + matrix.score(a, second[j - 1]) as i64).max(NEG_INF);

                let x_open = prev_m[j] + open;
                let x_extend = prev_x[j] + extend;
                let (x, x_bits) = if x_extend >= x_open {
                    (x_extend.max(NEG_INF), IX_EXTEND)
                } else {
                    (x_open.max(NEG_INF), 0)
                };

                let y_open = curr_m[j - 1] + open;
                let y_extend = curr_y[j - 1] + extend;
                let (y, y_bits) = if y_extend >= y_open {
                    (y_extend.max(NEG_INF), IY_EXTEND)
                } else {
                    (y_open.max(NEG_INF), 0)
                };

                curr_m[j] = m;
                curr_x[j] = x;
                curr_y[j] = y;
                trace[row_offset + j] = pred | x_bits | y_bits;

                let (score, state) = best_state(m, x, y);
                tracker.observe(i, j, score, state);
            }

            mem::swap(&mut prev_m, &mut curr_m);
            mem::swap(&mut prev_x, &mut curr_x);
            mem::swap(&mut prev_y, &mut curr_y);
        }

        let (score, state) = best_state(prev_m[cols - 1], prev_x[cols - 1], prev_y[cols - 1]);
        let last_cell = StartCell { row: rows - 1, col: cols - 1, score, state };

        Self { cols, trace, start: tracker.finish(last_cell) }
    }

    fn traceback(&self) -> DpAlignment {
        let Some(start) = self.start else {
            return DpAlignment::empty();
        };

        let (mut i, mut j, mut state) = (start.row, start.col, start.state);
        let mut pairs = Vec::with_capacity(i + j);

        loop {
            let cell = self.trace[i * self.cols + j];

            match state {
                DpState::Match => {
                    if i == 0 || j == 0 {
                        break;
                    }

                    i -= 1;
                    j -= 1;
                    pairs.push(AlignedPair(Some(i), Some(j)));

                    state = match cell & PRED_MASK {
                        FROM_M => DpState::Match,
                        FROM_IX => DpState::GapInSecond,
                        FROM_IY => DpState::GapInFirst,
                        _ => break,
                    };
                },
                DpState::GapInSecond => {
                    i -= 1;
                    pairs.push(AlignedPair(Some(i), None));

                    if cell & IX_EXTEND == 0 {
                        state = DpState::Match;
                    }
                },
                DpState::GapInFirst => {
                    j -= 1;
                    pairs.push(AlignedPair(None, Some(j)));

                    if cell & IY_EXTEND == 0 {
                        state = DpState::Match;
                    }
                },
            }
        }

        pairs.reverse();

        DpAlignment {
            score: start.score,
            pairs,
            first_range: i..start.row,
            second_range: j..start.col,
        }
    }
}
