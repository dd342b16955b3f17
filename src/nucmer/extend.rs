//! Turning chains of anchors into gapped alignment blocks.
//!
//! Anchors of a cluster are joined by global alignment of the sequence between them. A
//! block continues into a following cluster when the gap between them is short enough,
//! and is finally extended in both directions as long as the extension scores positively.

use tracing::{debug, trace};

use crate::aligner::dp;
use crate::aligner::mode::FillRules;
use crate::aligner::scoring::{GapCosts, SimilarityMatrix};
use crate::aligner::utils::AlignedPair;
use crate::aligner::AlignmentMode;
use crate::nucmer::cluster::Cluster;
use crate::nucmer::mum::Anchor;

/// Score of a matching column when estimating whether a long gap can be bridged
const VALID_SCORE: i64 = 3;

/// Score of an unmatched column when estimating whether a long gap can be bridged
const GAP_EXTENSION_SCORE: i64 = -7;

/// A gapped alignment of a reference region to a query region
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Block {
    pub reference_start: usize,
    pub query_start: usize,
    pub reference_end: usize,
    pub query_end: usize,
    pub pairs: Vec<AlignedPair>,
}

impl Block {
    /// Whether all anchors of `cluster` lie within the regions covered by this block
    fn covers(&self, cluster: &Cluster) -> bool {
        let (first, last) = (cluster.first(), cluster.last());

        self.reference_start <= first.reference_start
            && last.reference_end() <= self.reference_end
            && self.query_start <= first.query_start
            && last.query_end() <= self.query_end
    }

    /// Append alignment columns, positions being relative to the end of this block.
    fn append(&mut self, pairs: &[AlignedPair], reference_len: usize, query_len: usize) {
        let (r, q) = (self.reference_end, self.query_end);

        self.pairs.extend(pairs.iter().map(|p| {
            AlignedPair::new(p.first_pos().map(|i| r + i), p.second_pos().map(|j| q + j))
        }));

        self.reference_end += reference_len;
        self.query_end += query_len;
    }

    fn append_matches(&mut self, length: usize) {
        let (r, q) = (self.reference_end, self.query_end);

        self.pairs.extend((0..length).map(|k| AlignedPair::new(Some(r + k), Some(q + k))));

        self.reference_end += length;
        self.query_end += length;
    }

    /// Score of the block columns. Substitutions are scored with the similarity matrix.
    /// With affine costs a run of `L` gap columns in one sequence scores
    /// `open + L * extend`, with linear costs every gap column scores `open`.
    pub fn score<G: GapCosts>(
        &self,
        reference: &[u8],
        query: &[u8],
        matrix: &SimilarityMatrix,
        costs: G,
    ) -> i64 {
        let mut score = 0;
        let mut gap_in_query: Option<bool> = None;

        for pair in &self.pairs {
            let in_query = match (pair.first_pos(), pair.second_pos()) {
                (Some(i), Some(j)) => {
                    score += matrix.score(reference[i], query[j]) as i64;
                    gap_in_query = None;
                    continue;
                },
                (Some(_), None) => true,
                (None, Some(_)) => false,
                (None, None) => continue,
            };

            if !costs.is_affine() {
                score += costs.gap_open() as i64;
            } else {
                if gap_in_query != Some(in_query) {
                    score += costs.gap_open() as i64;
                }

                score += costs.gap_extend() as i64;
            }

            gap_in_query = Some(in_query);
        }

        score
    }
}

/// Builds alignment blocks for one reference and query pair.
pub(crate) struct BlockBuilder<'s, G> {
    reference: &'s [u8],
    query: &'s [u8],
    matrix: &'s SimilarityMatrix,
    costs: G,
    break_length: usize,
    extend: bool,
}

impl<'s, G: GapCosts> BlockBuilder<'s, G> {
    pub fn new(
        reference: &'s [u8],
        query: &'s [u8],
        matrix: &'s SimilarityMatrix,
        costs: G,
        break_length: usize,
    ) -> Self {
        Self { reference, query, matrix, costs, break_length, extend: true }
    }

    /// Whether blocks are extended past their outermost anchors. Sequence between anchors
    /// is aligned either way.
    pub fn with_extension(self, extend: bool) -> Self {
        Self { extend, ..self }
    }

    pub fn build(&self, mut clusters: Vec<Cluster>) -> Vec<Block> {
        clusters.sort_by_key(|c| (c.first().reference_start, c.first().query_start));

        let mut fused = vec![false; clusters.len()];
        let mut blocks: Vec<Block> = Vec::new();

        for start in 0..clusters.len() {
            if fused[start] || blocks.iter().any(|b| b.covers(&clusters[start])) {
                continue;
            }

            fused[start] = true;

            let mut block = self.extend_backward(clusters[start].first(), blocks.last());
            let mut current = start;
            let mut first_anchor = 0;

            loop {
                for anchor in &clusters[current].anchors()[first_anchor..] {
                    self.append_anchor(&mut block, anchor);
                }

                match self.next_cluster(&clusters, &fused, current, &block) {
                    Some((next, anchor_index)) => {
                        trace!(from = current, to = next, "fusing clusters");
                        fused[next] = true;
                        current = next;
                        first_anchor = anchor_index;
                    },
                    None => break,
                }
            }

            self.extend_forward(&mut block);

            debug!(
                reference = ?(block.reference_start..block.reference_end),
                query = ?(block.query_start..block.query_end),
                columns = block.pairs.len(),
                "alignment block"
            );

            blocks.push(block);
        }

        blocks
    }

    /// Bridge the sequence between the block end and the anchor with a global alignment,
    /// then add the anchor itself. Parts of the anchor already covered by the block are
    /// skipped.
    fn append_anchor(&self, block: &mut Block, anchor: &Anchor) {
        let skip = block.reference_end.saturating_sub(anchor.reference_start)
            .max(block.query_end.saturating_sub(anchor.query_start));

        if skip >= anchor.length {
            return;
        }

        let reference_start = anchor.reference_start + skip;
        let query_start = anchor.query_start + skip;

        let reference_gap = &self.reference[block.reference_end..reference_start];
        let query_gap = &self.query[block.query_end..query_start];

        if !reference_gap.is_empty() || !query_gap.is_empty() {
            let bridge = dp::align(
                reference_gap,
                query_gap,
                self.matrix,
                self.costs,
                AlignmentMode::Global.fill_rules(),
            );

            block.append(&bridge.pairs, reference_gap.len(), query_gap.len());
        }

        block.append_matches(anchor.length - skip);
    }

    /// Find the first unfused cluster after `current` with an anchor past the end of the
    /// block, if the gap to that anchor can be bridged.
    fn next_cluster(
        &self,
        clusters: &[Cluster],
        fused: &[bool],
        current: usize,
        block: &Block,
    ) -> Option<(usize, usize)> {
        let (index, anchor_index, anchor) = clusters.iter()
            .enumerate()
            .skip(current + 1)
            .filter(|(i, _)| !fused[*i])
            .find_map(|(i, cluster)| {
                cluster.anchors().iter()
                    .position(|a| {
                        a.reference_start >= block.reference_end
                            && a.query_start >= block.query_end
                    })
                    .map(|k| (i, k, cluster.anchors()[k]))
            })?;

        let reference_gap = (anchor.reference_start - block.reference_end) as i64;
        let query_gap = (anchor.query_start - block.query_end) as i64;
        let (low, high) = (reference_gap.min(query_gap), reference_gap.max(query_gap));

        let bridge = high < self.break_length as i64
            || low * VALID_SCORE + (high - low) * GAP_EXTENSION_SCORE >= 0;

        bridge.then_some((index, anchor_index))
    }

    /// Start a block at `anchor`, extended towards the sequence starts. The extension
    /// does not reach back into the previous block.
    fn extend_backward(&self, anchor: &Anchor, previous: Option<&Block>) -> Block {
        if !self.extend {
            return Block {
                reference_start: anchor.reference_start,
                query_start: anchor.query_start,
                reference_end: anchor.reference_start,
                query_end: anchor.query_start,
                pairs: Vec::new(),
            };
        }

        let (reference_floor, query_floor) = previous
            .map_or((0, 0), |b| (b.reference_end, b.query_end));

        let reference_lo = anchor.reference_start.saturating_sub(self.break_length)
            .max(reference_floor.min(anchor.reference_start));
        let query_lo = anchor.query_start.saturating_sub(self.break_length)
            .max(query_floor.min(anchor.query_start));

        let reference_window: Vec<u8> = self.reference[reference_lo..anchor.reference_start]
            .iter().rev().copied().collect();
        let query_window: Vec<u8> = self.query[query_lo..anchor.query_start]
            .iter().rev().copied().collect();

        let extension = dp::align(
            &reference_window,
            &query_window,
            self.matrix,
            self.costs,
            FillRules::EXTENSION,
        );

        let reference_start = anchor.reference_start - extension.first_range.end;
        let query_start = anchor.query_start - extension.second_range.end;

        // Positions in the reversed windows count backwards from the anchor start
        let pairs = extension.pairs.iter()
            .rev()
            .map(|p| AlignedPair::new(
                p.first_pos().map(|i| anchor.reference_start - 1 - i),
                p.second_pos().map(|j| anchor.query_start - 1 - j),
            ))
            .collect();

        Block {
            reference_start,
            query_start,
            reference_end: anchor.reference_start,
            query_end: anchor.query_start,
            pairs,
        }
    }

    fn extend_forward(&self, block: &mut Block) {
        if !self.extend {
            return;
        }

        let reference_hi = (block.reference_end + self.break_length).min(self.reference.len());
        let query_hi = (block.query_end + self.break_length).min(self.query.len());

        let reference_window = &self.reference[block.reference_end..reference_hi];
        let query_window = &self.query[block.query_end..query_hi];

        let extension = dp::align(
            reference_window,
            query_window,
            self.matrix,
            self.costs,
            FillRules::EXTENSION,
        );

        block.append(&extension.pairs, extension.first_range.end, extension.second_range.end);
    }
}

#[cfg(test)]
mod tests {
    use super::{Block, BlockBuilder};
    use crate::aligner::scoring::{GapAffine, GapLinear, SimilarityMatrix};
    use crate::aligner::utils::AlignedPair;
    use crate::nucmer::cluster::{ClusterBuilder, ClusterParams};
    use crate::nucmer::mum::Anchor;

    fn clusters(anchors: Vec<Anchor>) -> Vec<crate::nucmer::cluster::Cluster> {
        let params = ClusterParams {
            fixed_separation: 0,
            maximum_separation: 1000,
            separation_factor: 0.05,
            minimum_score: 2,
        };

        ClusterBuilder::new(params).build(anchors)
    }

    fn render(block: &Block, reference: &[u8], query: &[u8]) -> (String, String) {
        let mut r = String::new();
        let mut q = String::new();

        for pair in &block.pairs {
            r.push(pair.first_pos().map_or('-', |i| reference[i] as char));
            q.push(pair.second_pos().map_or('-', |j| query[j] as char));
        }

        (r, q)
    }

    #[test]
    fn test_fuses_clusters_across_short_gap() {
        let reference = b"ATGCGCATCCCC";
        let query = b"CCGCGCCCCCTCAGCT";
        let matrix = SimilarityMatrix::diagonal(3, -7);
        let costs = GapAffine::new(-13, -8);

        let anchors = vec![
            Anchor::new(3, 1, 3),
            Anchor::new(2, 2, 4),
            Anchor::new(8, 5, 4),
            Anchor::new(8, 6, 4),
        ];

        let blocks = BlockBuilder::new(reference, query, &matrix, costs, 200)
            .build(clusters(anchors));

        assert_eq!(blocks.len(), 1);
        let block = &blocks[0];
        assert_eq!(
            render(block, reference, query),
            ("GCGCATCCCC".to_string(), "GCGC--CCCC".to_string()),
        );
        assert_eq!((block.reference_start, block.query_start), (2, 2));
        assert_eq!((block.reference_end, block.query_end), (12, 10));
        assert_eq!(block.score(reference, query, &matrix, costs), -5);
        assert_eq!(block.score(reference, query, &matrix, GapLinear::new(-13)), -2);
    }

    #[test]
    fn test_extension_in_both_directions() {
        let reference = b"GGACGTACGTTTGAC";
        let query = b"CCACGTACGTTTGTT";
        let matrix = SimilarityMatrix::diagonal(3, -7);
        let costs = GapAffine::new(-13, -8);

        let blocks = BlockBuilder::new(reference, query, &matrix, costs, 200)
            .build(clusters(vec![Anchor::new(4, 4, 6)]));

        assert_eq!(blocks.len(), 1);
        assert_eq!(
            render(&blocks[0], reference, query),
            ("ACGTACGTTTG".to_string(), "ACGTACGTTTG".to_string()),
        );
        assert_eq!((blocks[0].reference_start, blocks[0].reference_end), (2, 13));
        assert_eq!(blocks[0].pairs[0], AlignedPair::new(Some(2), Some(2)));
    }

    #[test]
    fn test_break_length_limits_extension() {
        let reference = b"ACGTACGTTTGAC";
        let query = b"ACGTACGTTTGTT";
        let matrix = SimilarityMatrix::diagonal(3, -7);

        let blocks = BlockBuilder::new(reference, query, &matrix, GapAffine::new(-13, -8), 1)
            .build(clusters(vec![Anchor::new(4, 4, 4)]));

        assert_eq!((blocks[0].reference_start, blocks[0].reference_end), (3, 9));
    }

    #[test]
    fn test_without_extension() {
        let reference = b"GGACGTACGTTTGAC";
        let query = b"CCACGTACGTTTGTT";
        let matrix = SimilarityMatrix::diagonal(3, -7);

        let blocks = BlockBuilder::new(reference, query, &matrix, GapAffine::new(-13, -8), 200)
            .with_extension(false)
            .build(clusters(vec![Anchor::new(4, 4, 6)]));

        assert_eq!(blocks.len(), 1);
        assert_eq!(
            render(&blocks[0], reference, query),
            ("GTACGT".to_string(), "GTACGT".to_string()),
        );
        assert_eq!((blocks[0].reference_start, blocks[0].reference_end), (4, 10));
        assert_eq!((blocks[0].query_start, blocks[0].query_end), (4, 10));
    }

    #[test]
    fn test_without_extension_still_bridges_anchors() {
        let reference = b"ATGCGCATCCCC";
        let query = b"CCGCGCCCCCTCAGCT";
        let matrix = SimilarityMatrix::diagonal(3, -7);

        let anchors = vec![Anchor::new(2, 2, 4), Anchor::new(8, 6, 4)];
        let blocks = BlockBuilder::new(reference, query, &matrix, GapAffine::new(-13, -8), 200)
            .with_extension(false)
            .build(clusters(anchors));

        assert_eq!(blocks.len(), 1);
        assert_eq!(
            render(&blocks[0], reference, query),
            ("GCGCATCCCC".to_string(), "GCGC--CCCC".to_string()),
        );
        assert_eq!((blocks[0].reference_start, blocks[0].query_start), (2, 2));
    }
}
